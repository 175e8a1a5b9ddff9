use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use byteorder::{LittleEndian, ReadBytesExt};

/// Size of an image header: four little-endian u32 fields.
pub const HEADER_BYTES: usize = 16;

/// Reads the four header fields at the head of `bytes`.
pub fn read_header(mut bytes: &[u8], what: &str) -> Result<[u32; 4]> {
    let mut header = [0; 4];
    for x in header.iter_mut() {
        *x = bytes
            .read_u32::<LittleEndian>()
            .with_context(|| format!("truncated {} header", what))?;
    }
    Ok(header)
}

/// Converts a length into a u32 header field.
pub fn to_u32(x: usize) -> Result<u32> {
    u32::try_from(x).map_err(|_| anyhow!("{} overflows a u32 header field.", x))
}

/// Slices `len` bytes at `pos`, failing if the region runs past the end.
/// Returns the region and the position just after it.
pub fn take_region<'a>(
    bytes: &'a [u8],
    pos: usize,
    len: usize,
    what: &str,
) -> Result<(&'a [u8], usize)> {
    let end = pos
        .checked_add(len)
        .filter(|&end| end <= bytes.len())
        .ok_or_else(|| {
            anyhow!(
                "{} region [{}, +{}) exceeds the image of {} bytes",
                what,
                pos,
                len,
                bytes.len()
            )
        })?;
    Ok((&bytes[pos..end], end))
}
