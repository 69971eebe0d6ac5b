pub use self::fake_socket::FakeSocket;
pub use self::network_emulator::{EmulatedSocket, NetworkEmulator};

mod fake_socket;
mod network_emulator;
