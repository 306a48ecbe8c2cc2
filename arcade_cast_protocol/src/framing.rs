// Length-delimited framing for the TCP channel gateway.
//
// A frame is a 4-byte big-endian length followed by that many payload bytes.
// The payload is a UTF-8 JSON object, but this module never looks inside it;
// callers serialize and parse separately.
//
// Controller messages are a few dozen bytes, so `MAX_FRAME_SIZE` is kept
// small. An oversized length prefix is treated as a broken peer.

use std::io::{self, Read, Write};

/// Largest payload accepted in either direction (64 KiB).
pub const MAX_FRAME_SIZE: u32 = 64 * 1024;

/// Write one frame and flush.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_FRAME_SIZE)
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "frame too large: {} bytes (max {MAX_FRAME_SIZE})",
                    payload.len()
                ),
            )
        })?;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(payload)?;
    writer.flush()
}

/// Read one frame.
///
/// `UnexpectedEof` means the peer closed before or during a frame;
/// `InvalidData` means the length prefix exceeded `MAX_FRAME_SIZE`.
pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame too large: {len} bytes (max {MAX_FRAME_SIZE})"),
        ));
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn frames_read_back_in_order() {
        let payloads: [&[u8]; 3] = [br#"{"command":"join"}"#, b"", br#"{"command":"leave"}"#];
        let mut wire = Vec::new();
        for payload in payloads {
            write_frame(&mut wire, payload).unwrap();
        }

        let mut cursor = Cursor::new(wire);
        for expected in payloads {
            assert_eq!(read_frame(&mut cursor).unwrap(), expected);
        }
    }

    #[test]
    fn length_prefix_is_big_endian() {
        let mut wire = Vec::new();
        write_frame(&mut wire, b"abc").unwrap();
        assert_eq!(&wire[..4], &[0, 0, 0, 3]);
    }

    #[test]
    fn oversized_write_rejected() {
        let big = vec![b'x'; MAX_FRAME_SIZE as usize + 1];
        let err = write_frame(&mut Vec::new(), &big).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn oversized_length_prefix_rejected() {
        let mut cursor = Cursor::new((MAX_FRAME_SIZE + 1).to_be_bytes().to_vec());
        let err = read_frame(&mut cursor).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn truncated_frame_is_eof() {
        let mut wire = Vec::new();
        write_frame(&mut wire, b"hello").unwrap();
        wire.truncate(6);
        let err = read_frame(&mut Cursor::new(wire)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
