//! Threaded code: dispatch handles and the word stream.
//!
//! The converter rewrites the byte stream into a uniform stream of 32-bit
//! words. A slot holds either a [`Handler`] discriminant or the pre-decoded
//! operand of the preceding handler; the dispatch loop advances one word at
//! a time either way.

/// Dispatch handle. One variant per distinct handler of the execution
/// engine; the discriminant is what the word stream stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::FromRepr)]
#[repr(u32)]
pub enum Handler {
    /// Stop the interpreter. Occupies slot 0 and the trailing slot.
    Finish = 0,
    /// Raise an unresolved-jump failure. Occupies slot 1; jump operands
    /// point here until their forward target is emitted.
    BadJump,
    /// Raise an unsupported-opcode failure.
    Unsupported,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `&&`
    And,
    /// `!!`
    Or,
    /// Push an encoded literal. Operand: the fixnum word.
    Const,
    /// Allocate a string from the pool. Operand: pool offset.
    StringLit,
    /// Allocate a tagged tuple. Operands: canonical tag, field count.
    Sexp,
    /// Indexed or indirect assignment.
    Sta,
    /// Indexed read.
    Elem,
    /// Discard the stack top.
    Drop,
    /// Duplicate the stack top.
    Dup,
    /// Swap the two topmost values.
    Swap,
    /// Unconditional branch. Operand: stream index.
    Jmp,
    /// Branch if zero. Operand: stream index.
    CJmpZ,
    /// Branch if non-zero. Operand: stream index.
    CJmpNz,
    /// Load a global. Operand: global index.
    LdGlobal,
    /// Load an activation slot. Operand: unified slot index.
    LdSlot,
    /// Load a captured slot of the current closure. Operand: capture index.
    LdCaptured,
    /// Push the address of a global. Operand: global index.
    LdaGlobal,
    /// Push the address of an activation slot. Operand: unified slot index.
    LdaSlot,
    /// Store into a global. Operand: global index.
    StGlobal,
    /// Store into an activation slot. Operand: unified slot index.
    StSlot,
    /// Store into a captured slot. Operand: capture index.
    StCaptured,
    /// Function prologue. Operands: argument count, local count.
    Begin,
    /// Closure-body prologue. Operands: argument count, local count.
    CBegin,
    /// Allocate a closure. Operands: entry index, capture count, then the
    /// capture list interleaved with 2-bit location bitmap words.
    Closure,
    /// Call the closure beneath `n` arguments. Operand: `n`.
    CallC,
    /// Direct call. Operand: stream index.
    Call,
    /// Function epilogue; also emitted for early returns.
    End,
    /// Tagged-tuple shape test. Operands: canonical tag, field count.
    Tag,
    /// Array shape test. Operand: element count.
    Array,
    /// Pattern-match failure. Operands: line, column.
    Fail,
    /// String-pattern contents test.
    PattEqString,
    /// String shape test.
    PattString,
    /// Array shape test.
    PattArray,
    /// Tuple shape test.
    PattSexp,
    /// Managed-pointer test.
    PattRef,
    /// Fixnum test.
    PattVal,
    /// Closure shape test.
    PattFun,
    /// Builtin `read`.
    Read,
    /// Builtin `write`.
    Write,
    /// Builtin `length`.
    Length,
    /// Builtin `string`.
    StringVal,
    /// Builtin array constructor. Operand: element count.
    BArray,
}

/// The converted word stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code {
    words: Vec<u32>,
}

impl Code {
    /// Slot reserved for the halt handle.
    pub const FINISH_SLOT: usize = 0;
    /// Slot reserved for the unresolved-jump handle.
    pub const BAD_JUMP_SLOT: usize = 1;
    /// Index of the first real instruction.
    pub const ENTRY: usize = 2;

    pub(crate) fn from_words(words: Vec<u32>) -> Self {
        Self { words }
    }

    /// The word at `index`, if any.
    pub fn word(&self, index: usize) -> Option<u32> {
        self.words.get(index).copied()
    }

    /// Stream length in words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether the stream holds no words.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// All words, for diagnostics.
    pub fn words(&self) -> &[u32] {
        &self.words
    }
}
