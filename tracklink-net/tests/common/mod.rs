#![allow(dead_code)]
//! Test harness utilities for tracklink-net integration tests.

use std::io;
use std::net::{SocketAddr, TcpStream, UdpSocket};
use std::time::{Duration, Instant};

use rosc::{OscMessage, OscPacket, OscType};

use tracklink_net::framing::write_packet;
use tracklink_net::OscServer;
use tracklink_types::IncomingMessage;

pub const TIMEOUT: Duration = Duration::from_secs(2);

pub fn message(addr: &str, args: Vec<OscType>) -> OscPacket {
    OscPacket::Message(OscMessage {
        addr: addr.to_string(),
        args,
    })
}

/// Send one packet as a UDP datagram.
pub fn send_udp(to: SocketAddr, packet: &OscPacket) -> io::Result<()> {
    let socket = UdpSocket::bind("127.0.0.1:0")?;
    let bytes = rosc::encoder::encode(packet)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("{:?}", e)))?;
    socket.send_to(&bytes, to)?;
    Ok(())
}

/// A TCP client speaking length-prefixed OSC.
pub struct TcpClient {
    stream: TcpStream,
}

impl TcpClient {
    pub fn connect(to: SocketAddr) -> io::Result<Self> {
        Ok(Self {
            stream: TcpStream::connect(to)?,
        })
    }

    pub fn send(&mut self, packet: &OscPacket) -> io::Result<()> {
        write_packet(&mut self.stream, packet)
    }
}

/// Poll the server until `expected` messages have arrived, or timeout.
pub fn collect_messages(server: &OscServer, expected: usize) -> Vec<IncomingMessage> {
    let start = Instant::now();
    let mut all = Vec::new();
    while start.elapsed() < TIMEOUT {
        all.extend(server.poll_messages());
        if all.len() >= expected {
            return all;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!(
        "Timed out waiting for {} messages (have {})",
        expected,
        all.len()
    );
}
