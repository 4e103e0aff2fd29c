//! Compressed integer codec.
//!
//! Unsigned values are written as little-endian base-128 groups: each byte
//! carries seven value bits, low bits first, and bit 7 is set on every byte
//! except the last. Signed values use the sign-extending form of the same
//! scheme: groups are emitted until the remainder is all sign bits and bit 6
//! of the final group agrees with the sign, and a reader sign-extends from
//! that bit.
//!
//! `width` is the native byte width of the source integer (1, 2, 4 or 8).
//! A value must fit its width, and no encoding is longer than
//! `ceil(8 * width / 7)` bytes.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{FabricError, Result};

const CONTINUATION: u8 = 0x80;
const GROUP_MASK: u8 = 0x7F;
const SIGN_BIT: u8 = 0x40;

/// Longest encoding produced for an integer of `width` bytes.
pub fn max_len(width: usize) -> usize {
    (width * 8).div_ceil(7)
}

/// Number of bytes `value` occupies when written unsigned.
pub fn compressed_unsigned_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

/// Number of bytes `value` occupies when written signed.
pub fn compressed_signed_len(value: i64) -> usize {
    let redundant = if value < 0 {
        value.leading_ones()
    } else {
        value.leading_zeros()
    };
    // One sign bit survives.
    (65 - redundant as usize).div_ceil(7)
}

pub fn put_compressed_unsigned(buf: &mut BytesMut, width: usize, value: u64) -> Result<()> {
    check_width(width)?;
    if width < 8 && value >> (width * 8) != 0 {
        return Err(FabricError::Codec(format!(
            "value {value} does not fit in {width} unsigned bytes"
        )));
    }

    let mut rest = value;
    loop {
        let group = (rest as u8) & GROUP_MASK;
        rest >>= 7;
        if rest == 0 {
            buf.put_u8(group);
            return Ok(());
        }
        buf.put_u8(group | CONTINUATION);
    }
}

pub fn put_compressed_signed(buf: &mut BytesMut, width: usize, value: i64) -> Result<()> {
    check_width(width)?;
    if !fits_signed(width, value) {
        return Err(FabricError::Codec(format!(
            "value {value} does not fit in {width} signed bytes"
        )));
    }

    let mut rest = value;
    loop {
        let group = (rest as u8) & GROUP_MASK;
        rest >>= 7;
        let done = (rest == 0 && group & SIGN_BIT == 0) || (rest == -1 && group & SIGN_BIT != 0);
        if done {
            buf.put_u8(group);
            return Ok(());
        }
        buf.put_u8(group | CONTINUATION);
    }
}

/// Reads an unsigned compressed integer written at `width`.
pub fn get_compressed_unsigned(buf: &mut impl Buf, width: usize) -> Result<u64> {
    check_width(width)?;
    let mut value = 0u64;
    for i in 0..max_len(width) {
        let byte = next_byte(buf)?;
        let shift = 7 * i as u32;
        let group = u64::from(byte & GROUP_MASK);
        if (group << shift) >> shift != group {
            return Err(FabricError::codec("compressed integer overflows 64 bits"));
        }
        value |= group << shift;
        if byte & CONTINUATION == 0 {
            if width < 8 && value >> (width * 8) != 0 {
                return Err(FabricError::Codec(format!(
                    "decoded value {value} exceeds {width} unsigned bytes"
                )));
            }
            return Ok(value);
        }
    }
    Err(overlong(width))
}

/// Reads a signed compressed integer written at `width`.
pub fn get_compressed_signed(buf: &mut impl Buf, width: usize) -> Result<i64> {
    check_width(width)?;
    let mut value = 0i64;
    for i in 0..max_len(width) {
        let byte = next_byte(buf)?;
        let shift = 7 * i as u32;
        value |= i64::from(byte & GROUP_MASK) << shift;
        if byte & CONTINUATION == 0 {
            if shift + 7 < 64 && byte & SIGN_BIT != 0 {
                value |= -1i64 << (shift + 7);
            }
            if !fits_signed(width, value) {
                return Err(FabricError::Codec(format!(
                    "decoded value {value} exceeds {width} signed bytes"
                )));
            }
            return Ok(value);
        }
    }
    Err(overlong(width))
}

fn check_width(width: usize) -> Result<()> {
    match width {
        1 | 2 | 4 | 8 => Ok(()),
        _ => Err(FabricError::Codec(format!("invalid integer width {width}"))),
    }
}

fn fits_signed(width: usize, value: i64) -> bool {
    if width >= 8 {
        return true;
    }
    let bits = width as u32 * 8;
    let min = -(1i64 << (bits - 1));
    let max = (1i64 << (bits - 1)) - 1;
    (min..=max).contains(&value)
}

fn next_byte(buf: &mut impl Buf) -> Result<u8> {
    if !buf.has_remaining() {
        return Err(FabricError::codec("unexpected end of compressed integer"));
    }
    Ok(buf.get_u8())
}

fn overlong(width: usize) -> FabricError {
    FabricError::Codec(format!(
        "compressed integer longer than {} bytes for width {width}",
        max_len(width)
    ))
}
