//! stela VM implementation
//!
//! Loads a compiled bytecode image, rewrites it into a threaded word
//! stream of pre-resolved dispatch handles and pre-decoded operands, and
//! executes it over a copying semi-space heap.

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(unused_must_use)]

pub mod call;
pub mod code;
pub mod consts;
pub mod convert;
pub mod error;
pub mod heap;
pub mod intern;
pub mod interpreter;
pub mod stack;
pub mod value;

#[cfg(any(test, feature = "test-helpers"))]
pub mod util;

#[doc(no_inline)]
pub use stela_asm;

pub mod prelude {
    //! Required implementations for full functionality

    #[doc(no_inline)]
    pub use stela_asm::{Binop, Image, ImageError, Loc, Opcode, Patt, PublicEntry};

    pub use crate::{
        call::Activation,
        code::{Code, Handler},
        convert::convert,
        error::{ConvertError, RuntimeError, VmError},
        heap::{Heap, Kind, Roots},
        interpreter::{ExecuteState, Interpreter},
        stack::Stack,
        value::{Address, Value},
    };

    #[cfg(any(test, feature = "test-helpers"))]
    pub use crate::util::ImageBuilder;
}
