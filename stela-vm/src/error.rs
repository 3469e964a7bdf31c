//! Interpreter error implementation

use std::io;

use stela_asm::ImageError;
use thiserror::Error;

/// Static validation failures raised while rewriting the byte stream into
/// threaded form. All of these mean the image is ill-formed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConvertError {
    /// A string operand points outside the string pool.
    #[error("string pool offset {offset:#x} out of range at code offset {at:#x}")]
    BadStringIndex {
        /// Code offset of the instruction.
        at: usize,
        /// The offending pool offset.
        offset: u32,
    },
    /// A jump or call target points outside the code section.
    #[error("code offset {target:#x} out of range at code offset {at:#x}")]
    BadCodeIndex {
        /// Code offset of the instruction.
        at: usize,
        /// The offending target offset.
        target: u32,
    },
    /// A call or closure target does not land on a function prologue.
    #[error("target {target:#x} of the call at code offset {at:#x} is not a function entry")]
    NotFunctionEntry {
        /// Code offset of the instruction.
        at: usize,
        /// The offending target offset.
        target: u32,
    },
    /// A variable reference is not valid in the enclosing scope.
    #[error("{detail} at code offset {at:#x}")]
    ScopeError {
        /// Code offset of the instruction.
        at: usize,
        /// What was out of scope.
        detail: &'static str,
    },
    /// A jump crosses a function boundary.
    #[error("jump at code offset {at:#x} targets {target:#x} in a different function")]
    CrossFunctionJump {
        /// Code offset of the jump.
        at: usize,
        /// The target offset.
        target: u32,
    },
    /// A function prologue appears inside another function body.
    #[error("nested function entry at code offset {at:#x}")]
    NestedFunction {
        /// Code offset of the prologue.
        at: usize,
    },
    /// The code section does not terminate with an end-marker byte.
    #[error("no end marker at the end of the code section")]
    MissingEndMarker,
    /// An operand read runs past the end of the code section.
    #[error("truncated instruction at code offset {at:#x}")]
    TruncatedCode {
        /// Code offset of the instruction.
        at: usize,
    },
    /// A count operand does not fit in 31 bits.
    #[error("count operand out of range at code offset {at:#x}")]
    InvalidCount {
        /// Code offset of the instruction.
        at: usize,
    },
    /// A closure capture carries an unknown location designator.
    #[error("unknown capture location {code:#x} at code offset {at:#x}")]
    BadLocation {
        /// Code offset of the closure.
        at: usize,
        /// The offending designator byte.
        code: u8,
    },
    /// `LDA` of a captured slot. Interior addresses of heap objects would
    /// break the collector's root discipline, so the form is rejected
    /// statically.
    #[error("cannot take the address of a captured variable at code offset {at:#x}")]
    AddressOfCapture {
        /// Code offset of the instruction.
        at: usize,
    },
}

/// Dispatch-time failures. The interpreter does not catch these internally;
/// they all abort the program with a diagnostic.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// An instruction with no handler was dispatched.
    #[error("unsupported instruction at stream index {at:#x}")]
    UnsupportedOpcode {
        /// Word-stream index of the instruction.
        at: usize,
    },
    /// A jump whose target was never emitted was taken.
    #[error("unresolved jump at stream index {at:#x}")]
    UnresolvedJump {
        /// Word-stream index of the jump slot.
        at: usize,
    },
    /// A value of the wrong shape reached an operator.
    #[error("type error: expected {expected}")]
    Type {
        /// What the operator required.
        expected: &'static str,
    },
    /// An element index fell outside an object's payload.
    #[error("index {index} out of range for an object of {len} elements")]
    IndexOutOfRange {
        /// The decoded index.
        index: i32,
        /// The payload element count.
        len: usize,
    },
    /// Division or remainder by zero.
    #[error("division by zero")]
    Arithmetic,
    /// An explicit pattern-match failure.
    #[error("match failure at {line}:{col} on {value}")]
    MatchFailure {
        /// Source line carried by the instruction.
        line: u32,
        /// Source column carried by the instruction.
        col: u32,
        /// Printable rendering of the scrutinee.
        value: String,
    },
    /// The heap cannot grow any further.
    #[error("out of memory: {requested} bytes requested")]
    OutOfMemory {
        /// Size of the failed request, in bytes.
        requested: usize,
    },
    /// An instruction consumed more values than the stack holds.
    #[error("operand stack underflow")]
    StackUnderflow,
    /// A frame-relative operation ran with no live activation.
    #[error("no active call frame")]
    NoActivation,
    /// The input channel did not yield a decimal integer.
    #[error("invalid integer input")]
    InvalidInput,
    /// The input or output channel failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Top-level error: every failure of the interpreter maps into one of two
/// diagnostic categories.
#[derive(Debug, Error)]
pub enum VmError {
    /// The image could not be parsed.
    #[error("Ill-formed bytecode: {0}")]
    Image(#[from] ImageError),
    /// The image failed static validation.
    #[error("Ill-formed bytecode: {0}")]
    Convert(#[from] ConvertError),
    /// The program failed at dispatch time.
    #[error("Runtime failure: {0}")]
    Runtime(#[from] RuntimeError),
}
