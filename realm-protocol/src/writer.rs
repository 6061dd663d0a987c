/// Bit-exact little-endian packet builder (`spec.md` §4.2's "Message
/// Builders" component). The server is the only writer, so unlike
/// [`crate::reader::Reader`] there is no declared-length validation to
/// perform — just append bytes in wire order.
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Writer {
        Writer { buf: Vec::with_capacity(64) }
    }

    pub fn with_opcode(opcode: u8) -> Writer {
        let mut w = Writer::new();
        w.write_u8(opcode);
        w
    }

    pub fn write_u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn write_u16(&mut self, v: u16) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn write_u32(&mut self, v: u32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn write_i32(&mut self, v: i32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    /// `u16 LE` length prefix followed by UTF-8 bytes.
    pub fn write_string(&mut self, s: &str) -> &mut Self {
        let bytes = s.as_bytes();
        debug_assert!(bytes.len() <= u16::MAX as usize, "string field overflowed u16 length prefix");
        self.write_u16(bytes.len() as u16);
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }
}

impl Default for Writer {
    fn default() -> Self {
        Writer::new()
    }
}
