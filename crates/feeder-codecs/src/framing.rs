//! Schema-registry wire framing.
//!
//! Every registry-backed payload is prefixed with a fixed 5-byte header:
//!
//! ```text
//! ┌───────┬──────────────────────────┬──────────────┐
//! │ 0x00  │ schema id (u32, BE)      │ payload ...  │
//! └───────┴──────────────────────────┴──────────────┘
//!  byte 0   bytes 1..5                 bytes 5..
//! ```
//!
//! Protobuf payloads additionally carry a list of message indexes between the
//! header and the message bytes.

/// First byte of every framed payload.
pub const MAGIC_BYTE: u8 = 0x00;

/// Length of the magic byte plus the schema id.
pub const HEADER_LEN: usize = 5;

/// Build the 5-byte header for a schema id.
pub fn header(schema_id: u32) -> [u8; HEADER_LEN] {
    let id = schema_id.to_be_bytes();
    [MAGIC_BYTE, id[0], id[1], id[2], id[3]]
}

/// Prefix a payload with the header for `schema_id`.
pub fn frame(schema_id: u32, payload: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(HEADER_LEN + payload.len());
    framed.extend_from_slice(&header(schema_id));
    framed.extend_from_slice(payload);
    framed
}

/// Split a framed payload into its schema id and body.
///
/// Returns `None` when the input is too short or does not start with the
/// magic byte.
pub fn split_header(bytes: &[u8]) -> Option<(u32, &[u8])> {
    if bytes.len() < HEADER_LEN || bytes[0] != MAGIC_BYTE {
        return None;
    }
    let id = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
    Some((id, &bytes[HEADER_LEN..]))
}

/// Encode the message-index path of a protobuf message type.
///
/// `index` is the position of the message among the top-level messages of
/// its schema. The first message is written as a single `0` byte; any other
/// is a zigzag-varint count (`1`) followed by the zigzag-varint index.
pub fn message_indexes(index: usize) -> Vec<u8> {
    if index == 0 {
        return vec![0];
    }
    let mut out = Vec::new();
    write_zigzag_varint(&mut out, 1);
    write_zigzag_varint(&mut out, index as i64);
    out
}

fn write_zigzag_varint(out: &mut Vec<u8>, value: i64) {
    let mut zigzag = ((value << 1) ^ (value >> 63)) as u64;
    loop {
        let byte = (zigzag & 0x7f) as u8;
        zigzag >>= 7;
        if zigzag == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_is_big_endian() {
        assert_eq!(header(1), [0, 0, 0, 0, 1]);
        assert_eq!(header(0x0102_0304), [0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_frame_and_split() {
        let framed = frame(42, b"payload");
        assert_eq!(framed.len(), HEADER_LEN + 7);
        let (id, body) = split_header(&framed).unwrap();
        assert_eq!(id, 42);
        assert_eq!(body, b"payload");
    }

    #[test]
    fn test_split_rejects_short_or_unmagic() {
        assert!(split_header(&[0, 0, 0]).is_none());
        assert!(split_header(&[1, 0, 0, 0, 1, 9]).is_none());
    }

    #[test]
    fn test_message_indexes() {
        assert_eq!(message_indexes(0), vec![0]);
        assert_eq!(message_indexes(1), vec![2, 2]);
        assert_eq!(message_indexes(2), vec![2, 4]);
        // 64 zigzags to 128, which needs two varint bytes
        assert_eq!(message_indexes(64), vec![2, 0x80, 0x01]);
    }
}
