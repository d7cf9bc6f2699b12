use thiserror::Error;

/// Errors raised by the protobuf wire reader.
///
/// These surface to the caller only when the tile message itself is corrupt;
/// feature-scoped occurrences are caught and skipped during tile decoding.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of buffer")]
    Truncated,
    #[error("varint exceeds 64 bits")]
    VarintOverflow,
    #[error("unsupported wire type {0}")]
    WireType(u64),
    #[error("invalid utf-8 in string field")]
    Utf8,
    #[error("value out of range for {0}")]
    OutOfRange(&'static str),
    #[error("invalid tag index pairs")]
    TagIndices,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WireType {
    Varint,
    Fixed64,
    Len,
    Fixed32,
}

impl WireType {
    fn from_u64(value: u64) -> Result<Self, DecodeError> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::Len),
            5 => Ok(WireType::Fixed32),
            other => Err(DecodeError::WireType(other)),
        }
    }
}

/// Cursor over a single protobuf message body.
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    pub fn varint(&mut self) -> Result<u64, DecodeError> {
        let mut value = 0u64;
        for i in 0..10 {
            let byte = *self.buf.get(self.pos).ok_or(DecodeError::Truncated)?;
            self.pos += 1;
            value |= u64::from(byte & 0x7f) << (i * 7);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(DecodeError::VarintOverflow)
    }

    /// Reads the next field header as (field number, wire type).
    pub fn field(&mut self) -> Result<(u64, WireType), DecodeError> {
        let key = self.varint()?;
        Ok((key >> 3, WireType::from_u64(key & 0x7)?))
    }

    pub fn skip(&mut self, wire: WireType) -> Result<(), DecodeError> {
        match wire {
            WireType::Varint => {
                self.varint()?;
            }
            WireType::Fixed64 => self.advance(8)?,
            WireType::Len => {
                let len = self.varint()?;
                let len = usize::try_from(len).map_err(|_| DecodeError::Truncated)?;
                self.advance(len)?;
            }
            WireType::Fixed32 => self.advance(4)?,
        }
        Ok(())
    }

    fn advance(&mut self, n: usize) -> Result<(), DecodeError> {
        if self.buf.len() - self.pos < n {
            return Err(DecodeError::Truncated);
        }
        self.pos += n;
        Ok(())
    }

    /// Reads a length-delimited field body.
    pub fn bytes(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.varint()?;
        let len = usize::try_from(len).map_err(|_| DecodeError::Truncated)?;
        if self.buf.len() - self.pos < len {
            return Err(DecodeError::Truncated);
        }
        let body = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(body)
    }

    pub fn string(&mut self) -> Result<&'a str, DecodeError> {
        std::str::from_utf8(self.bytes()?).map_err(|_| DecodeError::Utf8)
    }

    pub fn fixed32(&mut self) -> Result<u32, DecodeError> {
        if self.buf.len() - self.pos < 4 {
            return Err(DecodeError::Truncated);
        }
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.buf[self.pos..self.pos + 4]);
        self.pos += 4;
        Ok(u32::from_le_bytes(raw))
    }

    pub fn fixed64(&mut self) -> Result<u64, DecodeError> {
        if self.buf.len() - self.pos < 8 {
            return Err(DecodeError::Truncated);
        }
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&self.buf[self.pos..self.pos + 8]);
        self.pos += 8;
        Ok(u64::from_le_bytes(raw))
    }
}

/// Protobuf sint64 decoding.
pub(crate) fn zigzag64(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_varint(mut value: u64) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                out.push(byte);
                return out;
            }
            out.push(byte | 0x80);
        }
    }

    #[test]
    fn varint_round_trip() {
        for value in [0u64, 1, 127, 128, 300, 1 << 21, u64::MAX] {
            let bytes = encode_varint(value);
            let mut reader = Reader::new(&bytes);
            assert_eq!(reader.varint().unwrap(), value);
            assert!(reader.is_empty());
        }
    }

    #[test]
    fn varint_truncated() {
        let mut reader = Reader::new(&[0x80, 0x80]);
        assert_eq!(reader.varint(), Err(DecodeError::Truncated));
    }

    #[test]
    fn varint_overflow() {
        let bytes = [0xffu8; 11];
        let mut reader = Reader::new(&bytes);
        assert_eq!(reader.varint(), Err(DecodeError::VarintOverflow));
    }

    #[test]
    fn field_header() {
        // field 3, wire type 2 (len), body "ab"
        let bytes = [0x1a, 0x02, b'a', b'b'];
        let mut reader = Reader::new(&bytes);
        let (field, wire) = reader.field().unwrap();
        assert_eq!(field, 3);
        assert_eq!(wire, WireType::Len);
        assert_eq!(reader.bytes().unwrap(), b"ab");
        assert!(reader.is_empty());
    }

    #[test]
    fn len_field_past_end() {
        // claims 16 bytes, provides 1
        let bytes = [0x1a, 0x10, 0x00];
        let mut reader = Reader::new(&bytes);
        reader.field().unwrap();
        assert_eq!(reader.bytes(), Err(DecodeError::Truncated));
    }

    #[test]
    fn skip_unknown_fields() {
        let mut bytes = Vec::new();
        bytes.extend([0x08]); // field 1, varint
        bytes.extend(encode_varint(5000));
        bytes.extend([0x15, 1, 2, 3, 4]); // field 2, fixed32
        bytes.extend([0x19, 1, 2, 3, 4, 5, 6, 7, 8]); // field 3, fixed64
        let mut reader = Reader::new(&bytes);
        while !reader.is_empty() {
            let (_, wire) = reader.field().unwrap();
            reader.skip(wire).unwrap();
        }
    }

    #[test]
    fn zigzag_sint64() {
        assert_eq!(zigzag64(0), 0);
        assert_eq!(zigzag64(1), -1);
        assert_eq!(zigzag64(2), 1);
        assert_eq!(zigzag64(3), -2);
        assert_eq!(zigzag64(4294967294), 2147483647);
        assert_eq!(zigzag64(4294967295), -2147483648);
    }
}
