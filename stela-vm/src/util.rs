//! Test helpers: byte-level image assembly.

use stela_asm::{Image, Opcode};

/// Assembles bytecode images instruction by instruction for tests.
///
/// The builder is deliberately low-level: operands are emitted as explicit
/// words so tests can express malformed images as easily as valid ones.
/// Code offsets come from [`pos`](Self::pos); forward targets are wired up
/// with [`patch`](Self::patch).
#[derive(Debug, Default)]
pub struct ImageBuilder {
    globals: u32,
    publics: Vec<(u32, u32)>,
    pool: Vec<u8>,
    code: Vec<u8>,
}

impl ImageBuilder {
    /// An empty image with no globals, publics, strings, or code.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the global-area size in slots.
    pub fn set_globals(&mut self, globals: u32) -> &mut Self {
        self.globals = globals;
        self
    }

    /// Append a NUL-terminated string to the pool, returning its offset.
    pub fn string(&mut self, s: &str) -> u32 {
        let offset = self.pool.len() as u32;
        self.pool.extend(s.as_bytes());
        self.pool.push(0);
        offset
    }

    /// Register a public symbol.
    pub fn public(&mut self, name: &str, code_offset: u32) -> &mut Self {
        let name_offset = self.string(name);
        self.publics.push((name_offset, code_offset));
        self
    }

    /// Current code offset; the offset of whatever is emitted next.
    pub fn pos(&self) -> u32 {
        self.code.len() as u32
    }

    /// Emit an instruction byte.
    pub fn op(&mut self, op: Opcode) -> &mut Self {
        self.code.push(op.encode());
        self
    }

    /// Emit a raw byte.
    pub fn byte(&mut self, byte: u8) -> &mut Self {
        self.code.push(byte);
        self
    }

    /// Emit a little-endian operand word.
    pub fn word(&mut self, word: u32) -> &mut Self {
        self.code.extend(word.to_le_bytes());
        self
    }

    /// Emit a signed operand word.
    pub fn int(&mut self, value: i32) -> &mut Self {
        self.word(value as u32)
    }

    /// Overwrite the operand word at code offset `at`.
    pub fn patch(&mut self, at: u32, word: u32) -> &mut Self {
        let at = at as usize;
        self.code[at..at + 4].copy_from_slice(&word.to_le_bytes());
        self
    }

    /// Emit the end-marker byte terminating the code section.
    pub fn end_marker(&mut self) -> &mut Self {
        self.code.push(0xff);
        self
    }

    /// The raw image bytes.
    pub fn build_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend((self.pool.len() as u32).to_le_bytes());
        bytes.extend(self.globals.to_le_bytes());
        bytes.extend((self.publics.len() as u32).to_le_bytes());
        for (name_offset, code_offset) in &self.publics {
            bytes.extend(name_offset.to_le_bytes());
            bytes.extend(code_offset.to_le_bytes());
        }
        bytes.extend(&self.pool);
        bytes.extend(&self.code);
        bytes
    }

    /// The parsed image.
    pub fn build(&self) -> Image {
        Image::parse(&self.build_bytes()).expect("builder emitted a parseable image")
    }
}
