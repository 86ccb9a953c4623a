//! Gzip member framing (RFC 1952)
//!
//! Only the minimal header is produced: no FNAME, FEXTRA, FCOMMENT or MTIME.

use std::io::{self, Write};

pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// CM = 8 (deflate)
pub const CM_DEFLATE: u8 = 0x08;

pub const HEADER_SIZE: usize = 10;
pub const TRAILER_SIZE: usize = 8;

/// Fixed header: magic, deflate, FLG=0, MTIME=0, XFL=0, OS=0
pub const GZIP_HEADER: [u8; HEADER_SIZE] = [
    GZIP_MAGIC[0],
    GZIP_MAGIC[1],
    CM_DEFLATE,
    0x00, // FLG
    0, 0, 0, 0, // MTIME
    0x00, // XFL
    0x00, // OS
];

pub fn write_header<W: Write>(writer: &mut W) -> io::Result<()> {
    writer.write_all(&GZIP_HEADER)
}

/// Build the trailer: CRC32 then ISIZE, both little-endian
pub fn trailer_bytes(crc: u32, isize: u32) -> [u8; TRAILER_SIZE] {
    let mut trailer = [0u8; TRAILER_SIZE];
    trailer[..4].copy_from_slice(&crc.to_le_bytes());
    trailer[4..].copy_from_slice(&isize.to_le_bytes());
    trailer
}

pub fn write_trailer<W: Write>(writer: &mut W, crc: u32, isize: u32) -> io::Result<()> {
    writer.write_all(&trailer_bytes(crc, isize))
}
