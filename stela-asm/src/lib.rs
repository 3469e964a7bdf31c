//! Atomic types of the stela VM.
//!
//! This crate defines everything the interpreter and its tooling agree on at
//! the wire level: the opcode byte assignments, the variable-location
//! designators, and the binary image format with its loader.

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(unused_must_use)]

mod image;
mod loc;
mod opcode;

pub use image::{Image, ImageError, PublicEntry};
pub use loc::Loc;
pub use opcode::{is_end_marker, Binop, Opcode, Patt};
