use byteorder::{ByteOrder, LittleEndian};
use realm_shared::error::ProtocolError;
use std::fmt;

/// A command can fail to decode for two different reasons: the buffer
/// simply doesn't have all the bytes yet (wait for more network data),
/// or a declared field violates the protocol outright (fatal, disconnect
/// — `spec.md` §4.1 "underflow ⇒ disconnect with protocol error").
#[derive(Debug)]
pub enum DecodeError {
    /// Not enough bytes buffered yet to finish this command.
    Incomplete,
    Protocol(ProtocolError),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Incomplete => write!(f, "incomplete frame"),
            DecodeError::Protocol(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<ProtocolError> for DecodeError {
    fn from(e: ProtocolError) -> Self {
        DecodeError::Protocol(e)
    }
}

pub type DecodeResult<T> = Result<T, DecodeError>;

pub const MAX_STRING_LEN: usize = 4096;

/// Heading, matching the fixed 4-connected compass used by movement and
/// pathfinding (`spec.md` §4.2, §4.5).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Heading {
    North = 1,
    East = 2,
    South = 3,
    West = 4,
}

impl Heading {
    pub fn from_u8(value: u8) -> Result<Heading, ProtocolError> {
        match value {
            1 => Ok(Heading::North),
            2 => Ok(Heading::East),
            3 => Ok(Heading::South),
            4 => Ok(Heading::West),
            _ => Err(ProtocolError::OutOfRange {
                value: value as i64,
                min: 1,
                max: 4,
            }),
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Heading::North => (0, -1),
            Heading::South => (0, 1),
            Heading::East => (1, 0),
            Heading::West => (-1, 0),
        }
    }
}

/// A cursor over a byte slice that validates every declared length
/// against the bytes actually remaining before reading them (§4.2). When
/// the slice simply runs out mid-field (more bytes may still be in
/// flight on the socket), every read returns [`DecodeError::Incomplete`]
/// rather than panicking or fabricating data.
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Reader<'a> {
        Reader { data, pos: 0 }
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    pub fn consumed(&self) -> usize {
        self.pos
    }

    fn need(&mut self, n: usize) -> DecodeResult<()> {
        if self.remaining() < n {
            Err(DecodeError::Incomplete)
        } else {
            Ok(())
        }
    }

    pub fn read_u8(&mut self) -> DecodeResult<u8> {
        self.need(1)?;
        let v = self.data[self.pos];
        self.pos += 1;
        Ok(v)
    }

    pub fn read_u16(&mut self) -> DecodeResult<u16> {
        self.need(2)?;
        let v = LittleEndian::read_u16(&self.data[self.pos..]);
        self.pos += 2;
        Ok(v)
    }

    pub fn read_u32(&mut self) -> DecodeResult<u32> {
        self.need(4)?;
        let v = LittleEndian::read_u32(&self.data[self.pos..]);
        self.pos += 4;
        Ok(v)
    }

    pub fn read_i32(&mut self) -> DecodeResult<i32> {
        self.need(4)?;
        let v = LittleEndian::read_i32(&self.data[self.pos..]);
        self.pos += 4;
        Ok(v)
    }

    /// Length-prefixed (`u16 LE`) UTF-8 string, validated against
    /// `max_len` before the declared length is trusted at all — a
    /// client cannot make the server attempt to buffer or allocate more
    /// than `max_len` bytes no matter what it claims.
    pub fn read_string(&mut self, max_len: usize) -> DecodeResult<String> {
        let len = self.read_u16()? as usize;
        if len > max_len {
            return Err(ProtocolError::StringTooLong { max: max_len }.into());
        }
        self.need(len)?;
        let bytes = &self.data[self.pos..self.pos + len];
        let s = std::str::from_utf8(bytes)
            .map_err(|_| ProtocolError::InvalidEncoding)?
            .to_string();
        self.pos += len;
        Ok(s)
    }

    /// Inventory slot, `1..=20` (`spec.md` §4.2).
    pub fn read_inventory_slot(&mut self) -> DecodeResult<u8> {
        let v = self.read_u8()?;
        if (1..=20).contains(&v) {
            Ok(v)
        } else {
            Err(ProtocolError::OutOfRange {
                value: v as i64,
                min: 1,
                max: 20,
            }
            .into())
        }
    }

    /// Spellbook slot, `1..=35` (`spec.md` §4.2).
    pub fn read_spellbook_slot(&mut self) -> DecodeResult<u8> {
        let v = self.read_u8()?;
        if (1..=35).contains(&v) {
            Ok(v)
        } else {
            Err(ProtocolError::OutOfRange {
                value: v as i64,
                min: 1,
                max: 35,
            }
            .into())
        }
    }

    /// Item/stack quantity, `1..=10000` (`spec.md` §4.2).
    pub fn read_quantity(&mut self) -> DecodeResult<u16> {
        let v = self.read_u16()?;
        if (1..=10000).contains(&v) {
            Ok(v)
        } else {
            Err(ProtocolError::OutOfRange {
                value: v as i64,
                min: 1,
                max: 10000,
            }
            .into())
        }
    }

    /// Map coordinate, `1..=100` (`spec.md` §4.2).
    pub fn read_coordinate(&mut self) -> DecodeResult<u8> {
        let v = self.read_u8()?;
        if (1..=100).contains(&v) {
            Ok(v)
        } else {
            Err(ProtocolError::OutOfRange {
                value: v as i64,
                min: 1,
                max: 100,
            }
            .into())
        }
    }

    pub fn read_heading(&mut self) -> DecodeResult<Heading> {
        let v = self.read_u8()?;
        Heading::from_u8(v).map_err(DecodeError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_does_not_panic() {
        let mut r = Reader::new(&[1, 2]);
        assert!(matches!(r.read_u32(), Err(DecodeError::Incomplete)));
    }

    #[test]
    fn string_length_checked_before_trusting_bytes() {
        // declares a length of 50000 but only two bytes follow; must be
        // rejected as too long before the server ever looks for the data.
        let mut data = vec![];
        data.extend_from_slice(&50000u16.to_le_bytes());
        data.extend_from_slice(b"ab");
        let mut r = Reader::new(&data);
        assert!(matches!(
            r.read_string(255),
            Err(DecodeError::Protocol(ProtocolError::StringTooLong { .. }))
        ));
    }

    #[test]
    fn coordinate_out_of_range_rejected() {
        let mut r = Reader::new(&[0]);
        assert!(matches!(
            r.read_coordinate(),
            Err(DecodeError::Protocol(ProtocolError::OutOfRange { .. }))
        ));
        let mut r = Reader::new(&[101]);
        assert!(matches!(
            r.read_coordinate(),
            Err(DecodeError::Protocol(ProtocolError::OutOfRange { .. }))
        ));
        let mut r = Reader::new(&[50]);
        assert_eq!(r.read_coordinate().unwrap(), 50);
    }

    #[test]
    fn round_trip_string() {
        let mut buf = vec![];
        let s = "alice";
        buf.extend_from_slice(&(s.len() as u16).to_le_bytes());
        buf.extend_from_slice(s.as_bytes());
        let mut r = Reader::new(&buf);
        assert_eq!(r.read_string(20).unwrap(), "alice");
        assert_eq!(r.consumed(), buf.len());
    }
}
