//! Load tester for strand: a server that counts and verifies numbered messages, and a client
//! that sends them with a chosen reliability.

use std::net::SocketAddr;
use std::process;
use std::thread;
use std::time::{Duration, Instant};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use clap::{value_parser, Arg, ArgMatches, Command};
use log::{error, info, warn};

use strand::{
    Config, LinkConditioner, Packet, Result, Socket, SocketEvent, ThroughputMonitoring,
};

fn main() {
    env_logger::init();

    let matches = Command::new("strand-tester")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Sends and verifies numbered messages over strand")
        .subcommand_required(true)
        .subcommand(
            Command::new("server")
                .about("Counts the messages that arrive and checks their numbering")
                .arg(
                    Arg::new("bind")
                        .long("bind")
                        .short('b')
                        .default_value("127.0.0.1:2264")
                        .value_parser(value_parser!(SocketAddr))
                        .help("Address to listen on"),
                ),
        )
        .subcommand(
            Command::new("client")
                .about("Sends numbered messages to a server")
                .arg(
                    Arg::new("connect")
                        .long("connect")
                        .short('c')
                        .default_value("127.0.0.1:2264")
                        .value_parser(value_parser!(SocketAddr))
                        .help("Address of the server"),
                )
                .arg(
                    Arg::new("bind")
                        .long("bind")
                        .short('b')
                        .default_value("127.0.0.1:2265")
                        .value_parser(value_parser!(SocketAddr))
                        .help("Address to send from"),
                )
                .arg(
                    Arg::new("reliability")
                        .long("reliability")
                        .short('r')
                        .default_value("ordered")
                        .value_parser([
                            "unreliable",
                            "sequenced",
                            "reliable",
                            "ordered",
                            "reliable-sequenced",
                        ])
                        .help("Reliability of the messages"),
                )
                .arg(
                    Arg::new("count")
                        .long("count")
                        .short('n')
                        .default_value("10000")
                        .value_parser(value_parser!(u32))
                        .help("Number of messages to send"),
                )
                .arg(
                    Arg::new("size")
                        .long("size")
                        .short('s')
                        .default_value("32")
                        .value_parser(value_parser!(usize))
                        .help("Payload size in bytes, at least 4"),
                )
                .arg(
                    Arg::new("rate")
                        .long("rate")
                        .default_value("1000")
                        .value_parser(value_parser!(u64))
                        .help("Messages per second"),
                )
                .arg(
                    Arg::new("loss")
                        .long("loss")
                        .default_value("0")
                        .value_parser(value_parser!(f64))
                        .help("Share of datagrams the client drops on purpose"),
                ),
        )
        .get_matches();

    let outcome = match matches.subcommand() {
        Some(("server", args)) => run_server(args),
        Some(("client", args)) => run_client(args),
        _ => unreachable!("a subcommand is required"),
    };

    if let Err(e) = outcome {
        error!("strand-tester failed: {}", e);
        process::exit(1);
    }
}

fn run_server(args: &ArgMatches) -> Result<()> {
    let bind = *args.get_one::<SocketAddr>("bind").unwrap_or_else(|| unreachable!());
    let mut socket = Socket::<Instant>::bind(bind)?;
    info!("Listening on {}", socket.local_addr()?);

    let mut throughput = ThroughputMonitoring::new(Duration::from_secs(1), Instant::now());
    let mut expected: u32 = 0;
    let mut out_of_order: u64 = 0;

    loop {
        socket.manual_poll(Instant::now());

        while let Some(event) = socket.recv() {
            match event {
                SocketEvent::Packet(packet) => {
                    let number = match packet.payload().read_u32::<BigEndian>() {
                        Ok(number) => number,
                        Err(e) => {
                            warn!("Message from {} without a number: {}", packet.addr(), e);
                            continue;
                        }
                    };
                    if number != expected {
                        out_of_order += 1;
                    }
                    expected = number.wrapping_add(1);

                    if throughput.tick(Instant::now()) {
                        info!("{} ({} out of order)", throughput, out_of_order);
                    }
                }
                SocketEvent::Connect(addr) => info!("Client connected: {}", addr),
                SocketEvent::Timeout(addr) => info!("Client timed out: {}", addr),
                SocketEvent::Disconnect(addr) => {
                    info!(
                        "Client disconnected: {}, {} messages, {} out of order",
                        addr,
                        throughput.total_measured_ticks(),
                        out_of_order
                    );
                    throughput.reset();
                    expected = 0;
                    out_of_order = 0;
                }
                SocketEvent::Tampered(addr) => warn!("Corrupt datagrams from {}", addr),
            }
        }

        thread::sleep(Duration::from_millis(1));
    }
}

fn run_client(args: &ArgMatches) -> Result<()> {
    let connect = *args.get_one::<SocketAddr>("connect").unwrap_or_else(|| unreachable!());
    let bind = *args.get_one::<SocketAddr>("bind").unwrap_or_else(|| unreachable!());
    let reliability = args
        .get_one::<String>("reliability")
        .map(String::as_str)
        .unwrap_or("ordered");
    let count = *args.get_one::<u32>("count").unwrap_or(&10_000);
    let size = (*args.get_one::<usize>("size").unwrap_or(&32)).max(4);
    let rate = (*args.get_one::<u64>("rate").unwrap_or(&1000)).max(1);
    let loss = *args.get_one::<f64>("loss").unwrap_or(&0.0);

    let mut socket = Socket::<Instant>::bind_with_config(bind, Config::default())?;
    if loss > 0.0 {
        socket.set_link_conditioner(Some(LinkConditioner::new().with_packet_loss(loss)));
    }
    info!(
        "Sending {} {} messages of {} bytes to {}",
        count, reliability, size, connect
    );

    let interval = Duration::from_nanos(1_000_000_000 / rate);
    let started = Instant::now();
    for number in 0..count {
        let mut payload = Vec::with_capacity(size);
        payload.write_u32::<BigEndian>(number)?;
        payload.resize(size, 0);

        let packet = match reliability {
            "unreliable" => Packet::unreliable(connect, payload),
            "sequenced" => Packet::unreliable_sequenced(connect, payload, None),
            "reliable" => Packet::reliable_unordered(connect, payload),
            "reliable-sequenced" => Packet::reliable_sequenced(connect, payload, None),
            _ => Packet::reliable_ordered(connect, payload, None),
        };
        socket.send(packet)?;
        socket.manual_poll(Instant::now());
        thread::sleep(interval);
    }

    // keep polling until everything reliable was acknowledged
    let drain_until = Instant::now() + Duration::from_secs(5);
    while Instant::now() < drain_until {
        socket.manual_poll(Instant::now());
        while socket.recv().is_some() {}
        thread::sleep(Duration::from_millis(1));
    }

    info!("Sent {} messages in {:?}", count, started.elapsed());
    if let Some(statistics) = socket.statistics(&connect) {
        info!("\n{}", statistics);
    }
    Ok(())
}
