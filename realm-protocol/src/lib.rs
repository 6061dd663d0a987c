//! Opcode-prefixed, length-validated binary protocol (`spec.md` §4.2,
//! §6). Decoding is total: every branch either produces a fully
//! validated typed command, or a well-typed [`DecodeError`].
//!
//! Framing and field-reading are grounded on the teacher's
//! `SizedRead`/`SizedWrite` traits (`lib/flux/src/shared.rs`) and its
//! `Category`/`Frame` split (`lib/neutronium/src/net/frame.rs`), adapted
//! from that fixed 4-category control protocol to this spec's
//! opcode-per-command / sub-opcode-per-`MULTI_MESSAGE` scheme.

pub mod buffer;
pub mod command;
pub mod event;
pub mod opcodes;
pub mod reader;
pub mod writer;

pub use buffer::FrameBuffer;
pub use command::ClientCommand;
pub use event::ServerEvent;
pub use reader::{DecodeError, Reader};
pub use writer::Writer;
