use std::io::{self, Read};

/// Bounded ingress buffer for one connection's read half, in the spirit
/// of the teacher's `Buffer` (`lib/neutronium/src/net/buffer.rs`) but
/// backed by a plain `Vec<u8>` with manual compaction instead of
/// `slice_deque::SliceDeque` — this server doesn't need that crate's
/// contiguous double-ended slice trick, just "append, try to decode,
/// drop what was consumed."
///
/// Overflow (more bytes buffered than `capacity` without a decodable
/// command) means the client is either malicious or desynced; the
/// connection is closed either way (`spec.md` §4.1 backpressure).
pub struct FrameBuffer {
    data: Vec<u8>,
    pos: usize,
    capacity: usize,
}

impl FrameBuffer {
    pub fn new(capacity: usize) -> FrameBuffer {
        FrameBuffer {
            data: Vec::with_capacity(capacity.min(65536)),
            pos: 0,
            capacity,
        }
    }

    /// Discards bytes already consumed by a successful decode, and
    /// compacts the buffer so it doesn't grow unboundedly while partial
    /// frames straddle read calls.
    fn compact(&mut self) {
        if self.pos > 0 {
            self.data.drain(..self.pos);
            self.pos = 0;
        }
    }

    /// Marks `n` bytes at the front as consumed by a successful decode.
    pub fn consume(&mut self, n: usize) {
        self.pos += n;
        self.compact();
    }

    /// Bytes available to decode from.
    pub fn readable(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    /// Reads once from `stream` into the buffer. Returns `Ok(0)` on EOF.
    /// Errors if doing so would exceed `capacity` with no command
    /// decodable yet — the caller should treat that as a protocol
    /// violation and close the connection.
    pub fn fill_from<R: Read>(&mut self, stream: &mut R) -> io::Result<usize> {
        self.compact();
        if self.data.len() >= self.capacity {
            return Err(io::Error::new(io::ErrorKind::Other, "frame buffer overflow"));
        }
        let start = self.data.len();
        let want = self.capacity - start;
        self.data.resize(start + want.min(65536), 0);
        let read = stream.read(&mut self.data[start..])?;
        self.data.truncate(start + read);
        Ok(read)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn fill_and_consume_round_trip() {
        let mut buf = FrameBuffer::new(1024);
        let mut src = Cursor::new(vec![1, 2, 3, 4, 5]);
        let n = buf.fill_from(&mut src).unwrap();
        assert_eq!(n, 5);
        assert_eq!(buf.readable(), &[1, 2, 3, 4, 5]);
        buf.consume(2);
        assert_eq!(buf.readable(), &[3, 4, 5]);
    }

    #[test]
    fn overflow_without_progress_errors() {
        let mut buf = FrameBuffer::new(4);
        let mut src = Cursor::new(vec![1, 2, 3, 4]);
        buf.fill_from(&mut src).unwrap();
        let mut src2 = Cursor::new(vec![5]);
        assert!(buf.fill_from(&mut src2).is_err());
    }
}
