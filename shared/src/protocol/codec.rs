//! Little-endian primitives for the wire format.
//!
//! Strings are a `u16` holding `byte_len + 1` followed by UTF-8 bytes; a zero length marks an
//! absent string.

use thiserror::Error;

/// Errors that can occur while decoding a datagram.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("packet truncated: needed {needed} more byte(s) at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    #[error("empty packet")]
    Empty,

    #[error("unknown packet type {0}")]
    UnknownPacketType(u8),

    #[error("invalid animation state {0}")]
    InvalidAnimState(u8),

    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    #[error("string of {0} bytes does not fit the length prefix")]
    StringTooLong(usize),

    #[error("invalid player count {0}")]
    InvalidCount(i32),

    #[error("{0} trailing byte(s) after packet")]
    TrailingBytes(usize),
}

#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn put_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_str(&mut self, v: Option<&str>) -> Result<(), ProtocolError> {
        let Some(s) = v else {
            self.buf.extend_from_slice(&0u16.to_le_bytes());
            return Ok(());
        };
        let len = u16::try_from(s.len() + 1).map_err(|_| ProtocolError::StringTooLong(s.len()))?;
        self.buf.extend_from_slice(&len.to_le_bytes());
        self.buf.extend_from_slice(s.as_bytes());
        Ok(())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        if self.remaining() < n {
            return Err(ProtocolError::Truncated {
                offset: self.pos,
                needed: n - self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn get_u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.take_array::<1>()?[0])
    }

    pub fn get_i32(&mut self) -> Result<i32, ProtocolError> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    pub fn get_f32(&mut self) -> Result<f32, ProtocolError> {
        Ok(f32::from_le_bytes(self.take_array()?))
    }

    pub fn get_str(&mut self) -> Result<Option<String>, ProtocolError> {
        let len = u16::from_le_bytes(self.take_array()?);
        if len == 0 {
            return Ok(None);
        }
        let bytes = self.take(usize::from(len) - 1)?;
        std::str::from_utf8(bytes)
            .map(|s| Some(s.to_owned()))
            .map_err(|_| ProtocolError::InvalidUtf8)
    }

    /// Fail unless every byte was consumed.
    pub fn finish(self) -> Result<(), ProtocolError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(ProtocolError::TrailingBytes(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_prefix_counts_the_terminator_slot() {
        let mut w = Writer::new();
        w.put_str(Some("ab")).unwrap();
        w.put_str(None).unwrap();
        w.put_str(Some("")).unwrap();
        assert_eq!(w.into_bytes(), vec![3, 0, b'a', b'b', 0, 0, 1, 0]);
    }

    #[test]
    fn primitives_are_little_endian() {
        let mut w = Writer::new();
        w.put_i32(-2);
        w.put_f32(1.5);
        let bytes = w.into_bytes();
        assert_eq!(&bytes[..4], &[0xFE, 0xFF, 0xFF, 0xFF]);
        assert_eq!(&bytes[4..], &1.5f32.to_le_bytes());

        let mut r = Reader::new(&bytes);
        assert_eq!(r.get_i32(), Ok(-2));
        assert_eq!(r.get_f32(), Ok(1.5));
        assert_eq!(r.finish(), Ok(()));
    }

    #[test]
    fn short_reads_report_truncation() {
        let mut r = Reader::new(&[1, 2]);
        assert_eq!(
            r.get_i32(),
            Err(ProtocolError::Truncated {
                offset: 0,
                needed: 2
            })
        );

        // Length prefix promises more bytes than exist.
        let mut r = Reader::new(&[10, 0, b'x']);
        assert!(matches!(r.get_str(), Err(ProtocolError::Truncated { .. })));
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let mut r = Reader::new(&[3, 0, 0xC3, 0x28]);
        assert_eq!(r.get_str(), Err(ProtocolError::InvalidUtf8));
    }
}
