//! Little-endian primitives and 7-bit length-prefixed strings.

use std::io::{self, Read, Write};

use crate::common::MAX_NAME_LEN;
use crate::error::{CdcFsError, Result};

pub trait WireWrite: Write {
    fn put_u8(&mut self, v: u8) -> io::Result<()> {
        self.write_all(&[v])
    }

    fn put_u32(&mut self, v: u32) -> io::Result<()> {
        self.write_all(&v.to_le_bytes())
    }

    fn put_u64(&mut self, v: u64) -> io::Result<()> {
        self.write_all(&v.to_le_bytes())
    }

    /// Byte length as a 7-bit varint, then the UTF-8 bytes.
    fn put_string(&mut self, s: &str) -> io::Result<()> {
        let mut len = s.len();
        while len >= 0x80 {
            self.put_u8((len as u8 & 0x7f) | 0x80)?;
            len >>= 7;
        }
        self.put_u8(len as u8)?;
        self.write_all(s.as_bytes())
    }
}

impl<W: Write + ?Sized> WireWrite for W {}

pub trait WireRead: Read {
    fn get_u8(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn get_u32(&mut self) -> io::Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn get_u64(&mut self) -> io::Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    fn get_bytes(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.take(len as u64).read_to_end(&mut buf)?;
        if buf.len() != len {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated byte field"));
        }
        Ok(buf)
    }

    fn get_string(&mut self) -> Result<String> {
        let mut len = 0usize;
        let mut shift = 0;
        loop {
            let b = self.get_u8()?;
            len |= ((b & 0x7f) as usize) << shift;
            if b & 0x80 == 0 {
                break;
            }
            shift += 7;
            if shift > 28 {
                return Err(CdcFsError::InvalidFormat("bad string length prefix".into()));
            }
        }
        if len > MAX_NAME_LEN {
            return Err(CdcFsError::InvalidFormat(format!("string of {} bytes", len)));
        }
        let bytes = self.get_bytes(len)?;
        String::from_utf8(bytes).map_err(|_| CdcFsError::InvalidFormat("string is not UTF-8".into()))
    }
}

impl<R: Read + ?Sized> WireRead for R {}
