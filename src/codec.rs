//! Conversion between [`CanFrame`]s and the adapter's frame lines.

use crate::{CanFrame, DecodeError, Direction, FrameDataLen};

/// function to convert a hex char byte to it's binary value
fn from_hex(byte: u8) -> Option<u8> {
    if (b'a'..=b'f').contains(&byte) {
        Some(byte - b'a' + 10)
    } else if (b'A'..=b'F').contains(&byte) {
        Some(byte - b'A' + 10)
    } else if byte.is_ascii_digit() {
        Some(byte - b'0')
    } else {
        None
    }
}

/// Decode the body of a `w` line, i.e. everything after the tag byte.
///
/// The body is `<3 hex id><dlc digit><2 * dlc hex chars>`. Characters after the payload are
/// ignored.
pub fn decode_frame(body: &[u8]) -> Result<CanFrame, DecodeError> {
    let id_chars = body.get(..3).ok_or(DecodeError::MalformedIdentifier)?;
    let id = id_chars.iter().try_fold(0u32, |id, byte| {
        from_hex(*byte)
            .map(|nibble| (id << 4) | nibble as u32)
            .ok_or(DecodeError::MalformedIdentifier)
    })?;

    let len = match body.get(3) {
        Some(byte) if byte.is_ascii_digit() => FrameDataLen::new((byte - b'0') as usize)?,
        _ => return Err(DecodeError::MalformedPayload),
    };

    let hex = body
        .get(4..4 + len.raw() * 2)
        .ok_or(DecodeError::MalformedPayload)?;
    let mut data = [0u8; 8];
    for (byte, pair) in data.iter_mut().zip(hex.chunks_exact(2)) {
        match (from_hex(pair[0]), from_hex(pair[1])) {
            (Some(high), Some(low)) => *byte = high << 4 | low,
            _ => return Err(DecodeError::MalformedPayload),
        }
    }

    CanFrame::from_raw(id, &data[..len.raw()], Direction::Incoming)
}

/// Encode a frame as the `t` line the adapter expects, including the closing `\r`.
pub fn encode_frame(frame: &CanFrame) -> String {
    format!("{}\r", frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_can::{Frame, StandardId};
    use test_log::test;

    #[test]
    fn decode_ignores_trailing_chars() {
        let frame = decode_frame(b"0053AABBCCDDEE").unwrap();
        assert_eq!(frame.raw_id(), 0x005);
        assert_eq!(frame.dlc(), 3);
        assert_eq!(frame.data(), &[0xaa, 0xbb, 0xcc]);
        assert_eq!(frame.direction(), Direction::Incoming);
    }

    #[test]
    fn decode_zero_length() {
        let frame = decode_frame(b"7e80").unwrap();
        assert_eq!(frame.raw_id(), 0x7e8);
        assert!(frame.data().is_empty());
    }

    #[test]
    fn decode_full_frame() {
        let frame = decode_frame(b"7e88deadbeefdeadbeef").unwrap();
        assert_eq!(frame.data(), &[0xde, 0xad, 0xbe, 0xef, 0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn decode_short_payload() {
        assert_eq!(
            decode_frame(b"0055AABBCCDD"),
            Err(DecodeError::MalformedPayload)
        );
    }

    #[test]
    fn decode_bad_identifier() {
        assert_eq!(decode_frame(b"0g53AABBCC"), Err(DecodeError::MalformedIdentifier));
        assert_eq!(decode_frame(b"00"), Err(DecodeError::MalformedIdentifier));
        assert_eq!(decode_frame(b""), Err(DecodeError::MalformedIdentifier));
    }

    #[test]
    fn decode_bad_length() {
        assert_eq!(decode_frame(b"005"), Err(DecodeError::MalformedPayload));
        assert_eq!(decode_frame(b"005xAA"), Err(DecodeError::MalformedPayload));
        assert_eq!(
            decode_frame(b"0059AABBCCDDEEFF001122"),
            Err(DecodeError::DataLen(9))
        );
    }

    #[test]
    fn decode_bad_payload_hex() {
        assert_eq!(decode_frame(b"0052AAZZ"), Err(DecodeError::MalformedPayload));
    }

    #[test]
    fn encode_pads_to_eight_bytes() {
        let frame = CanFrame::new_frame(StandardId::new(0x7e8).unwrap(), &[0x02, 0x10, 0x01]).unwrap();
        assert_eq!(encode_frame(&frame), "t7e830210010000000000\r");
    }

    #[test]
    fn encode_strips_leading_zeros() {
        let frame = CanFrame::new_frame(StandardId::new(0x5).unwrap(), &[]).unwrap();
        assert_eq!(encode_frame(&frame), "t500000000000000000\r");
    }

    #[test]
    fn encode_then_decode() {
        for len in 0..=8 {
            let data: Vec<u8> = (0..len as u8).map(|b| b.wrapping_mul(37)).collect();
            let frame = CanFrame::new_frame(StandardId::new(0x220).unwrap(), &data).unwrap();
            let line = encode_frame(&frame);
            // the adapter echoes received frames with a `w` tag instead of `t`
            let decoded = decode_frame(line[1..].trim_end().as_bytes()).unwrap();
            assert_eq!(decoded.raw_id(), 0x220);
            assert_eq!(decoded.data(), &data[..]);
        }
    }
}
