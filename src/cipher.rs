//! Hook for encrypting whole datagrams.
//!
//! strand does not ship an algorithm; install one with `ReliabilityLayer::set_cipher`.

use std::fmt::Debug;

use crate::error::Result;
use crate::net::constants::DEFAULT_CIPHER_OVERHEAD;

/// A symmetric cipher applied to every datagram of a connection.
pub trait BlockCipher: Debug + Send {
    /// Returns the number of bytes `encrypt` may add to a datagram.
    ///
    /// The usable frame size shrinks by this amount.
    fn overhead(&self) -> usize {
        DEFAULT_CIPHER_OVERHEAD
    }

    /// Encrypts an outgoing datagram.
    fn encrypt(&mut self, plain: &[u8]) -> Vec<u8>;

    /// Decrypts an incoming datagram, failing with `ErrorKind::CouldNotDecrypt` when it was
    /// tampered with.
    fn decrypt(&mut self, encrypted: &[u8]) -> Result<Vec<u8>>;
}
