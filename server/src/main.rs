mod relay;

use std::io::ErrorKind;
use std::net::UdpSocket;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use shared::protocol::Packet;
use shared::{DEFAULT_PORT, MAX_DATAGRAM_SIZE};

use relay::{Outgoing, Relay};

/// UDP relay that forwards player snapshots between clients.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// World state broadcasts per second.
    #[arg(long, default_value_t = 30)]
    tick_rate: u32,

    /// Seconds of silence before a client is dropped.
    #[arg(long, default_value_t = 5)]
    timeout_secs: u64,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let socket = UdpSocket::bind(("0.0.0.0", cli.port))
        .with_context(|| format!("cannot bind UDP port {}", cli.port))?;
    let tick = Duration::from_secs_f64(1.0 / f64::from(cli.tick_rate.max(1)));
    socket.set_read_timeout(Some(tick / 4))?;
    log::info!("listening on {}, {} Hz", socket.local_addr()?, cli.tick_rate);

    let mut relay = Relay::new(Duration::from_secs(cli.timeout_secs));
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    let mut next_tick = Instant::now() + tick;

    loop {
        match socket.recv_from(&mut buf) {
            Ok((len, from)) => match Packet::decode(&buf[..len]) {
                Ok(packet) => {
                    let replies = relay.handle(from, packet, Instant::now());
                    send_all(&socket, replies);
                }
                Err(err) => log::warn!("malformed datagram from {from}: {err}"),
            },
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            // Windows reports an ICMP port unreachable from a departed client here.
            Err(err) if err.kind() == ErrorKind::ConnectionReset => {}
            Err(err) => return Err(err).context("receive failed"),
        }

        let now = Instant::now();
        if now >= next_tick {
            next_tick = now + tick;
            let before = relay.peer_count();
            let left = relay.expire(now);
            if relay.peer_count() != before {
                log::info!("{} peer(s) connected", relay.peer_count());
            }
            send_all(&socket, left);
            send_all(&socket, relay.world_states());
        }
    }
}

fn send_all(socket: &UdpSocket, datagrams: Vec<Outgoing>) {
    for (to, packet) in datagrams {
        let bytes = match packet.encode() {
            Ok(bytes) => bytes,
            Err(err) => {
                log::error!("cannot encode {:?}: {err}", packet.packet_type());
                continue;
            }
        };
        if let Err(err) = socket.send_to(&bytes, to) {
            log::warn!("send to {to} failed: {err}");
        }
    }
}
