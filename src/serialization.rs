//! Low-level byte serialization for the Solana wire format
//!
//! Messages and transactions are encoded by hand rather than through the SDK so
//! that every byte put on the wire can be printed and checked.

use crate::error::{GravityError, Result};
use solana_sdk::pubkey::Pubkey;
use std::io::{Cursor, Write};

/// Trait for types that can be serialized at the byte level
pub trait ByteSerialize {
    fn serialize_bytes(&self, writer: &mut Vec<u8>) -> Result<()>;
    fn byte_size(&self) -> usize;
}

/// Number of bytes a compact-u16 prefix takes for `value`
pub fn compact_u16_size(value: usize) -> usize {
    if value <= 0x7f {
        1
    } else if value <= 0x3fff {
        2
    } else {
        3
    }
}

/// Compact-u16 encoding (the variable-length length prefix used by Solana)
pub fn encode_compact_u16(value: usize, writer: &mut Vec<u8>) -> Result<()> {
    let value = u16::try_from(value).map_err(|_| {
        GravityError::SerializationError(format!("length {} exceeds compact-u16 range", value))
    })?;

    if value <= 0x7f {
        writer.write_all(&[value as u8])?;
    } else if value <= 0x3fff {
        writer.write_all(&[((value & 0x7f) | 0x80) as u8, (value >> 7) as u8])?;
    } else {
        writer.write_all(&[
            ((value & 0x7f) | 0x80) as u8,
            (((value >> 7) & 0x7f) | 0x80) as u8,
            (value >> 14) as u8,
        ])?;
    }
    Ok(())
}

/// Decode compact-u16, rejecting overflowing and non-canonical encodings
pub fn decode_compact_u16(cursor: &mut Cursor<&[u8]>) -> Result<usize> {
    let mut value: usize = 0;

    for i in 0..3 {
        let byte = decode_u8(cursor)?;

        if i == 2 && byte > 0x03 {
            return Err(GravityError::DeserializationError(
                "compact-u16 overflow".to_string(),
            ));
        }
        if i > 0 && byte == 0 {
            return Err(GravityError::DeserializationError(
                "non-canonical compact-u16 encoding".to_string(),
            ));
        }

        value |= ((byte & 0x7f) as usize) << (7 * i);

        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }

    Err(GravityError::DeserializationError(
        "Invalid compact-u16 encoding".to_string(),
    ))
}

/// Encode a 32-byte public key
pub fn encode_pubkey(pubkey: &Pubkey, writer: &mut Vec<u8>) -> Result<()> {
    writer.write_all(pubkey.as_ref())?;
    Ok(())
}

/// Decode a 32-byte public key
pub fn decode_pubkey(cursor: &mut Cursor<&[u8]>) -> Result<Pubkey> {
    decode_array::<32>(cursor).map(Pubkey::new_from_array)
}

/// Decode a fixed number of bytes
pub fn decode_array<const N: usize>(cursor: &mut Cursor<&[u8]>) -> Result<[u8; N]> {
    let position = cursor.position() as usize;
    let data = cursor.get_ref();

    if position + N > data.len() {
        return Err(GravityError::BufferTooSmall {
            needed: position + N,
            available: data.len(),
        });
    }

    let mut out = [0u8; N];
    out.copy_from_slice(&data[position..position + N]);
    cursor.set_position((position + N) as u64);
    Ok(out)
}

/// Decode length-prefixed byte arrays
pub fn decode_length_prefixed(cursor: &mut Cursor<&[u8]>) -> Result<Vec<u8>> {
    let length = decode_compact_u16(cursor)?;
    let position = cursor.position() as usize;
    let data = cursor.get_ref();

    if position + length > data.len() {
        return Err(GravityError::BufferTooSmall {
            needed: position + length,
            available: data.len(),
        });
    }

    let result = data[position..position + length].to_vec();
    cursor.set_position((position + length) as u64);
    Ok(result)
}

/// Encode length-prefixed byte arrays
pub fn encode_length_prefixed(data: &[u8], writer: &mut Vec<u8>) -> Result<()> {
    encode_compact_u16(data.len(), writer)?;
    writer.write_all(data)?;
    Ok(())
}

/// Decode a u64 in little-endian format
pub fn decode_u64(cursor: &mut Cursor<&[u8]>) -> Result<u64> {
    decode_array::<8>(cursor).map(u64::from_le_bytes)
}

/// Encode a u8
pub fn encode_u8(value: u8, writer: &mut Vec<u8>) -> Result<()> {
    writer.write_all(&[value])?;
    Ok(())
}

/// Decode a u8
pub fn decode_u8(cursor: &mut Cursor<&[u8]>) -> Result<u8> {
    decode_array::<1>(cursor).map(|b| b[0])
}

pub mod helpers {
    use super::*;

    /// Serialize a slice with a compact-u16 length prefix
    pub fn serialize_vec<T: ByteSerialize>(items: &[T], writer: &mut Vec<u8>) -> Result<()> {
        encode_compact_u16(items.len(), writer)?;
        for item in items {
            item.serialize_bytes(writer)?;
        }
        Ok(())
    }

    pub fn vec_byte_size<T: ByteSerialize>(items: &[T]) -> usize {
        compact_u16_size(items.len()) + items.iter().map(|item| item.byte_size()).sum::<usize>()
    }
}
