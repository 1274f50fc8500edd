//! Length-prefixed JSON framing over the fork server's pipes

use std::io::{self, Read, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Maximum message size (10 MB)
const MAX_MESSAGE_SIZE: u32 = 10 * 1024 * 1024;

/// Send a length-prefixed message
pub fn send_message<W: Write>(writer: &mut W, data: &[u8]) -> io::Result<()> {
    if data.len() > MAX_MESSAGE_SIZE as usize {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "Message too large"));
    }

    let len = data.len() as u32;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(data)?;
    writer.flush()
}

/// Receive a length-prefixed message
pub fn recv_message<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_le_bytes(len_buf);

    if len > MAX_MESSAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Message too large: {} bytes", len),
        ));
    }

    let mut data = vec![0u8; len as usize];
    reader.read_exact(&mut data)?;
    Ok(data)
}

/// Serialize and send one message
pub fn send_json<W: Write, T: Serialize>(writer: &mut W, message: &T) -> io::Result<()> {
    let json = serde_json::to_vec(message)?;
    send_message(writer, &json)
}

/// Receive and deserialize one message
pub fn recv_json<R: Read, T: DeserializeOwned>(reader: &mut R) -> io::Result<T> {
    let data = recv_message(reader)?;
    serde_json::from_slice(&data).map_err(io::Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::protocol::ForkServerReply;
    use std::io::Cursor;

    #[test]
    fn test_frames_are_read_back_in_order() {
        let mut buf = Vec::new();
        send_json(&mut buf, &ForkServerReply::Exited { code: 0 }).unwrap();
        send_json(&mut buf, &ForkServerReply::Exited { code: 3 }).unwrap();

        let mut reader = Cursor::new(buf);
        let first: ForkServerReply = recv_json(&mut reader).unwrap();
        let second: ForkServerReply = recv_json(&mut reader).unwrap();
        assert_eq!(first, ForkServerReply::Exited { code: 0 });
        assert_eq!(second, ForkServerReply::Exited { code: 3 });

        let err = recv_message(&mut reader).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_oversized_length_is_rejected() {
        let mut reader = Cursor::new((MAX_MESSAGE_SIZE + 1).to_le_bytes().to_vec());
        let err = recv_message(&mut reader).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
