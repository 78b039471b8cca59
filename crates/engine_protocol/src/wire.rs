//! Primitive wire encodings: fixed-width big-endian integers and floats,
//! VarInt/VarLong, and VarInt-prefixed UTF-8 strings.

use std::io::{self, Read, Write};

use crate::error::CodecError;

/// Upper bound on speculative allocation driven by a decoded length.
pub const MAX_PREALLOCATION: usize = 4096;

const MAX_VARINT_BYTES: usize = 5;
const MAX_VARLONG_BYTES: usize = 10;

pub fn read_array<const N: usize, R: Read + ?Sized>(input: &mut R) -> io::Result<[u8; N]> {
    let mut buf = [0u8; N];
    input.read_exact(&mut buf)?;
    Ok(buf)
}

pub fn read_u8<R: Read + ?Sized>(input: &mut R) -> io::Result<u8> {
    Ok(read_array::<1, R>(input)?[0])
}

pub fn read_bool<R: Read + ?Sized>(input: &mut R) -> Result<bool, CodecError> {
    match read_u8(input)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(CodecError::InvalidBool(other)),
    }
}

/// Read exactly `len` bytes without trusting `len` for the allocation size.
pub fn read_bytes<R: Read + ?Sized>(input: &mut R, len: usize) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::with_capacity(len.min(MAX_PREALLOCATION));
    let limit = u64::try_from(len).map_err(|_| CodecError::InvalidLength(len.to_string()))?;
    Read::take(&mut *input, limit).read_to_end(&mut buf)?;
    if buf.len() != len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("expected {len} bytes, got {}", buf.len()),
        )
        .into());
    }
    Ok(buf)
}

/// Seven bits per byte, least significant group first, high bit set on every
/// byte but the last. Negative values always take five bytes.
pub fn write_varint<W: Write + ?Sized>(out: &mut W, value: i32) -> io::Result<()> {
    let mut v = value as u32;
    loop {
        if v & !0x7F == 0 {
            return out.write_all(&[v as u8]);
        }
        out.write_all(&[(v as u8 & 0x7F) | 0x80])?;
        v >>= 7;
    }
}

pub fn read_varint<R: Read + ?Sized>(input: &mut R) -> Result<i32, CodecError> {
    let mut result = 0u32;
    for i in 0..MAX_VARINT_BYTES {
        let byte = read_u8(input)?;
        result |= u32::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(result as i32);
        }
    }
    Err(CodecError::VarIntTooLong)
}

pub fn write_varlong<W: Write + ?Sized>(out: &mut W, value: i64) -> io::Result<()> {
    let mut v = value as u64;
    loop {
        if v & !0x7F == 0 {
            return out.write_all(&[v as u8]);
        }
        out.write_all(&[(v as u8 & 0x7F) | 0x80])?;
        v >>= 7;
    }
}

pub fn read_varlong<R: Read + ?Sized>(input: &mut R) -> Result<i64, CodecError> {
    let mut result = 0u64;
    for i in 0..MAX_VARLONG_BYTES {
        let byte = read_u8(input)?;
        result |= u64::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(result as i64);
        }
    }
    Err(CodecError::VarIntTooLong)
}

/// Number of bytes `value` takes as a VarInt.
pub fn varint_len(value: i32) -> usize {
    let bits = 32 - (value as u32).leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

/// VarInt byte length followed by the UTF-8 bytes.
pub fn write_string<W: Write + ?Sized>(out: &mut W, value: &str) -> Result<(), CodecError> {
    let len = i32::try_from(value.len())
        .map_err(|_| CodecError::InvalidLength(format!("string of {} bytes", value.len())))?;
    write_varint(out, len)?;
    out.write_all(value.as_bytes())?;
    Ok(())
}

pub fn read_string<R: Read + ?Sized>(input: &mut R) -> Result<String, CodecError> {
    let len = read_varint(input)?;
    let len = usize::try_from(len)
        .map_err(|_| CodecError::InvalidLength(format!("negative string length {len}")))?;
    Ok(String::from_utf8(read_bytes(input, len)?)?)
}
