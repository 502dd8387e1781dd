//! OSC transport for tracklink.
//!
//! Decodes OSC packets arriving over UDP or length-prefixed TCP into
//! [`IncomingMessage`](tracklink_types::IncomingMessage)s for the dispatcher.

pub mod decode;
pub mod framing;
pub mod server;

pub use decode::Decoder;
pub use server::OscServer;
