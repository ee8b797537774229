//! Big-endian integer codec.
//!
//! All on-disk integers in the partition map are stored most significant
//! byte first. The `get_*`/`put_*` helpers work at a byte offset inside a
//! record buffer; callers bounds-check the buffer once against the record
//! size before using them.

/// Encode a 16-bit value as big-endian bytes.
#[inline]
pub const fn encode16(value: u16) -> [u8; 2] {
    value.to_be_bytes()
}

/// Encode a 32-bit value as big-endian bytes.
#[inline]
pub const fn encode32(value: u32) -> [u8; 4] {
    value.to_be_bytes()
}

/// Decode big-endian bytes into a native 16-bit value.
#[inline]
pub const fn decode16(bytes: [u8; 2]) -> u16 {
    u16::from_be_bytes(bytes)
}

/// Decode big-endian bytes into a native 32-bit value.
#[inline]
pub const fn decode32(bytes: [u8; 4]) -> u32 {
    u32::from_be_bytes(bytes)
}

#[inline]
pub(crate) fn get_u16(buf: &[u8], offset: usize) -> u16 {
    decode16([buf[offset], buf[offset + 1]])
}

#[inline]
pub(crate) fn get_u32(buf: &[u8], offset: usize) -> u32 {
    decode32([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

#[inline]
pub(crate) fn put_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&encode16(value));
}

#[inline]
pub(crate) fn put_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&encode32(value));
}
