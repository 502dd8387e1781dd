//! OSC listener.
//!
//! Receiver threads decode packets and push messages onto a channel; the
//! owner drains it with [`OscServer::poll_messages`] so dispatch stays on a
//! single thread.

use std::collections::HashMap;
use std::io::{self, BufReader};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, warn};

use tracklink_types::{IncomingMessage, Protocol};

use crate::decode::Decoder;
use crate::framing::read_frame;

/// Largest UDP datagram we accept.
const UDP_BUFFER_LEN: usize = 65_536;
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Open TCP connections: a handle on each socket plus its reader thread.
type Connections = Arc<Mutex<HashMap<u64, (TcpStream, JoinHandle<()>)>>>;

pub struct OscServer {
    protocol: Protocol,
    local_addr: SocketAddr,
    rx: Receiver<IncomingMessage>,
    shutdown: Arc<AtomicBool>,
    listener_thread: Option<JoinHandle<()>>,
    connections: Connections,
}

impl OscServer {
    pub fn bind<A: ToSocketAddrs>(
        protocol: Protocol,
        addr: A,
        decoder: Decoder,
    ) -> io::Result<Self> {
        match protocol {
            Protocol::Udp => Self::bind_udp(addr, decoder),
            Protocol::Tcp => Self::bind_tcp(addr, decoder),
        }
    }

    pub fn bind_udp<A: ToSocketAddrs>(addr: A, decoder: Decoder) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_read_timeout(Some(POLL_INTERVAL))?;
        let local_addr = socket.local_addr()?;
        let (tx, rx) = mpsc::channel();
        let shutdown = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&shutdown);
        let prefix = decoder.prefix().to_string();
        let handle = thread::spawn(move || udp_loop(socket, decoder, tx, flag));

        info!(target: "osc", "listening on udp://{} (prefix {})", local_addr, prefix);
        Ok(Self {
            protocol: Protocol::Udp,
            local_addr,
            rx,
            shutdown,
            listener_thread: Some(handle),
            connections: Connections::default(),
        })
    }

    pub fn bind_tcp<A: ToSocketAddrs>(addr: A, decoder: Decoder) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;
        let (tx, rx) = mpsc::channel();
        let shutdown = Arc::new(AtomicBool::new(false));

        let connections = Connections::default();

        let flag = Arc::clone(&shutdown);
        let conns = Arc::clone(&connections);
        let prefix = decoder.prefix().to_string();
        let handle = thread::spawn(move || accept_loop(listener, decoder, tx, flag, conns));

        info!(target: "osc", "listening on tcp://{} (prefix {})", local_addr, prefix);
        Ok(Self {
            protocol: Protocol::Tcp,
            local_addr,
            rx,
            shutdown,
            listener_thread: Some(handle),
            connections,
        })
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Drain every message received so far, in arrival order.
    pub fn poll_messages(&self) -> Vec<IncomingMessage> {
        self.rx.try_iter().collect()
    }

    /// Block up to `timeout` for the next message.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<IncomingMessage> {
        match self.rx.recv_timeout(timeout) {
            Ok(msg) => Some(msg),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl Drop for OscServer {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.listener_thread.take() {
            let _ = handle.join();
        }

        let open: Vec<(TcpStream, JoinHandle<()>)> = match self.connections.lock() {
            Ok(mut conns) => conns.drain().map(|(_, conn)| conn).collect(),
            Err(_) => Vec::new(),
        };
        for (stream, handle) in open {
            let _ = stream.shutdown(Shutdown::Both);
            let _ = handle.join();
        }
    }
}

fn udp_loop(
    socket: UdpSocket,
    decoder: Decoder,
    tx: Sender<IncomingMessage>,
    shutdown: Arc<AtomicBool>,
) {
    let mut buf = vec![0u8; UDP_BUFFER_LEN];
    while !shutdown.load(Ordering::Relaxed) {
        match socket.recv_from(&mut buf) {
            Ok((n, from)) => {
                for msg in decoder.decode_bytes(&buf[..n]) {
                    debug!(target: "osc", "{} from {}", msg.pattern, from);
                    if tx.send(msg).is_err() {
                        return;
                    }
                }
            }
            Err(ref e)
                if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut =>
            {
                continue
            }
            Err(e) => {
                error!(target: "osc", "udp receive failed: {}", e);
                break;
            }
        }
    }
}

fn accept_loop(
    listener: TcpListener,
    decoder: Decoder,
    tx: Sender<IncomingMessage>,
    shutdown: Arc<AtomicBool>,
    connections: Connections,
) {
    let mut next_id: u64 = 0;
    while !shutdown.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((stream, peer)) => {
                info!(target: "osc", "connection from {}", peer);
                let handle_stream = match stream
                    .set_nonblocking(false)
                    .and_then(|()| stream.try_clone())
                {
                    Ok(s) => s,
                    Err(e) => {
                        warn!(target: "osc", "dropping {}: {}", peer, e);
                        continue;
                    }
                };
                let id = next_id;
                next_id += 1;

                let decoder = decoder.clone();
                let tx = tx.clone();
                let conns = Arc::clone(&connections);
                // Held across the spawn so the reader cannot deregister
                // before it is registered.
                let Ok(mut open) = connections.lock() else {
                    error!(target: "osc", "connection table poisoned");
                    break;
                };
                let handle = thread::spawn(move || {
                    connection_loop(stream, peer, decoder, tx);
                    if let Ok(mut open) = conns.lock() {
                        open.remove(&id);
                    }
                });
                open.insert(id, (handle_stream, handle));
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                error!(target: "osc", "accept failed: {}", e);
                break;
            }
        }
    }
}

fn connection_loop(
    stream: TcpStream,
    peer: SocketAddr,
    decoder: Decoder,
    tx: Sender<IncomingMessage>,
) {
    let mut reader = BufReader::new(stream);
    loop {
        match read_frame(&mut reader) {
            Ok(payload) => {
                for msg in decoder.decode_bytes(&payload) {
                    debug!(target: "osc", "{} from {}", msg.pattern, peer);
                    if tx.send(msg).is_err() {
                        return;
                    }
                }
            }
            Err(ref e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                info!(target: "osc", "{} disconnected", peer);
                return;
            }
            Err(e) => {
                warn!(target: "osc", "closing {}: {}", peer, e);
                return;
            }
        }
    }
}
