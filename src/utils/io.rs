// Little-endian readers shared by the Ogg and Vorbis decoders

use std::io::Read;

/// Read a single byte
pub fn read_u8<R: Read>(reader: &mut R) -> std::io::Result<u8> {
    let mut buffer = [0u8; 1];
    reader.read_exact(&mut buffer)?;
    Ok(buffer[0])
}

/// Read little-endian 32-bit integer
pub fn read_le_u32<R: Read>(reader: &mut R) -> std::io::Result<u32> {
    let mut buffer = [0u8; 4];
    reader.read_exact(&mut buffer)?;
    Ok(u32::from_le_bytes(buffer))
}

/// Read little-endian signed 32-bit integer
pub fn read_le_i32<R: Read>(reader: &mut R) -> std::io::Result<i32> {
    let mut buffer = [0u8; 4];
    reader.read_exact(&mut buffer)?;
    Ok(i32::from_le_bytes(buffer))
}

/// Read a 32-bit little-endian length followed by that many bytes.
///
/// The length is checked against `limit` before allocating, so a corrupt
/// length field cannot request more memory than the packet holds.
pub fn read_le_u32_prefixed<R: Read>(reader: &mut R, limit: usize) -> std::io::Result<Vec<u8>> {
    let length = read_le_u32(reader)? as usize;
    if length > limit {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("length {} exceeds remaining {} bytes", length, limit),
        ));
    }
    let mut bytes = vec![0u8; length];
    reader.read_exact(&mut bytes)?;
    Ok(bytes)
}

/// Read little-endian 32-bit integer at `offset` of a slice
pub(crate) fn le_u32_at(data: &[u8], offset: usize) -> u32 {
    let mut buffer = [0u8; 4];
    buffer.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(buffer)
}

/// Read little-endian 64-bit integer at `offset` of a slice
pub(crate) fn le_u64_at(data: &[u8], offset: usize) -> u64 {
    let mut buffer = [0u8; 8];
    buffer.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn prefixed_read_rejects_oversized_length() {
        let mut cursor = Cursor::new(vec![0xff, 0xff, 0x00, 0x00, b'a']);
        assert!(read_le_u32_prefixed(&mut cursor, 1).is_err());
    }

    #[test]
    fn prefixed_read_returns_payload() {
        let mut cursor = Cursor::new(vec![3, 0, 0, 0, b'a', b'b', b'c', 9]);
        assert_eq!(read_le_u32_prefixed(&mut cursor, 4).unwrap(), b"abc");
        assert_eq!(read_u8(&mut cursor).unwrap(), 9);
    }
}
