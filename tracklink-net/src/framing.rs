//! Length-prefixed framing for OSC over TCP.
//!
//! Wire format: `[u32 length (big-endian)][OSC packet]`

use std::io::{self, Read, Write};

use rosc::OscPacket;

/// Frames larger than this are rejected.
pub const MAX_FRAME_LEN: usize = 1 << 20;

/// Encode and write one framed packet.
pub fn write_packet<W: Write>(writer: &mut W, packet: &OscPacket) -> io::Result<()> {
    let payload = rosc::encoder::encode(packet)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("{:?}", e)))?;
    write_frame(writer, &payload)
}

/// Write an already-encoded payload with its length prefix.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    if payload.len() > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("frame too large: {} bytes", payload.len()),
        ));
    }
    let len = payload.len() as u32;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(payload)?;
    writer.flush()
}

/// Read one frame's payload. `UnexpectedEof` on a clean close.
pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf) as usize;

    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame too large: {} bytes", len),
        ));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(payload)
}

/// Read and decode one framed packet.
pub fn read_packet<R: Read>(reader: &mut R) -> io::Result<OscPacket> {
    let payload = read_frame(reader)?;
    rosc::decoder::decode_udp(&payload)
        .map(|(_, packet)| packet)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("{:?}", e)))
}
