//! Serverbound packets for the handshake/status exchange.

use crate::varint;

/// Protocol version sent in the handshake (1.19).
pub const PROTOCOL_VERSION: u32 = 759;

/// Packet id shared by the handshake and the status request.
pub const HANDSHAKE_PACKET_ID: u8 = 0x00;

/// Length-prefixed status request: length 1, packet id 0.
pub const STATUS_REQUEST: [u8; 2] = [0x01, 0x00];

/// Next-state byte asking the server to switch to the status state.
pub const NEXT_STATE_STATUS: u8 = 0x01;

/// Build a framed handshake announcing `address:port` and requesting the
/// status state.
///
/// Layout after the length prefix: packet id, protocol version (VarInt),
/// address (VarInt length + UTF-8), port (u16 big-endian), next state.
pub fn build_handshake(address: &str, port: u16) -> Vec<u8> {
    let mut body = Vec::with_capacity(address.len() + 16);
    body.push(HANDSHAKE_PACKET_ID);
    varint::encode_into(&mut body, PROTOCOL_VERSION);
    varint::encode_into(&mut body, address.len() as u32);
    body.extend_from_slice(address.as_bytes());
    body.extend_from_slice(&port.to_be_bytes());
    body.push(NEXT_STATE_STATUS);

    let mut packet = varint::encode(body.len() as u32);
    packet.extend_from_slice(&body);
    packet
}

pub fn build_status_request() -> [u8; 2] {
    STATUS_REQUEST
}
