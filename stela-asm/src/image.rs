//! Binary image layout and loader.
//!
//! The on-disk image is little-endian throughout:
//!
//! ```text
//! u32 string_pool_size
//! u32 global_area_size
//! u32 public_count
//! public_entry[public_count]     // (u32 name_offset, u32 code_offset)
//! u8  string_pool[string_pool_size]
//! u8  code[remaining]
//! ```
//!
//! The code section size is derived from the file length, not stored.
//! Strings in the pool are NUL-terminated; offsets must point at the start
//! of a string.

use std::mem;

use thiserror::Error;

const WORD_SIZE: usize = mem::size_of::<u32>();
const HEADER_SIZE: usize = 3 * WORD_SIZE;
const PUBLIC_ENTRY_SIZE: usize = 2 * WORD_SIZE;

/// Image loading error variants.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageError {
    /// The buffer ends before the fixed header does.
    #[error("image too short for the {expected}-byte header ({actual} bytes)")]
    TruncatedHeader {
        /// Header size in bytes.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },
    /// A declared section does not fit in the remaining bytes.
    #[error("image too short for the {section} section: {needed} bytes declared, {remaining} remaining")]
    TruncatedSection {
        /// Section name.
        section: &'static str,
        /// Declared section size.
        needed: usize,
        /// Bytes actually available.
        remaining: usize,
    },
    /// A string-pool offset lies outside the pool.
    #[error("string pool offset {offset:#x} out of range")]
    BadStringOffset {
        /// The offending offset.
        offset: u32,
    },
    /// A string-pool entry runs to the end of the pool without a NUL.
    #[error("string at pool offset {offset:#x} is not NUL-terminated")]
    UnterminatedString {
        /// Start offset of the entry.
        offset: u32,
    },
}

/// An entry of the public symbol table: a name in the string pool paired
/// with a code offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicEntry {
    /// Offset of the symbol name in the string pool.
    pub name_offset: u32,
    /// Offset of the symbol body in the code section.
    pub code_offset: u32,
}

/// A parsed bytecode image.
///
/// Parsing validates section bounds only; the code section is rewritten and
/// statically checked by the interpreter's converter before execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    global_area_size: u32,
    publics: Vec<PublicEntry>,
    string_pool: Vec<u8>,
    code: Vec<u8>,
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut word = [0u8; WORD_SIZE];
    word.copy_from_slice(&bytes[at..at + WORD_SIZE]);
    u32::from_le_bytes(word)
}

impl Image {
    /// Parse an image from a raw byte buffer.
    pub fn parse(bytes: &[u8]) -> Result<Self, ImageError> {
        if bytes.len() < HEADER_SIZE {
            return Err(ImageError::TruncatedHeader {
                expected: HEADER_SIZE,
                actual: bytes.len(),
            });
        }

        let string_pool_size = read_u32(bytes, 0) as usize;
        let global_area_size = read_u32(bytes, WORD_SIZE);
        let public_count = read_u32(bytes, 2 * WORD_SIZE) as usize;

        let mut at = HEADER_SIZE;
        let publics_size = public_count
            .checked_mul(PUBLIC_ENTRY_SIZE)
            .filter(|size| at + size <= bytes.len())
            .ok_or(ImageError::TruncatedSection {
                section: "public table",
                needed: public_count.saturating_mul(PUBLIC_ENTRY_SIZE),
                remaining: bytes.len() - at,
            })?;

        let publics = (0..public_count)
            .map(|i| PublicEntry {
                name_offset: read_u32(bytes, at + i * PUBLIC_ENTRY_SIZE),
                code_offset: read_u32(bytes, at + i * PUBLIC_ENTRY_SIZE + WORD_SIZE),
            })
            .collect();
        at += publics_size;

        if at + string_pool_size > bytes.len() {
            return Err(ImageError::TruncatedSection {
                section: "string pool",
                needed: string_pool_size,
                remaining: bytes.len() - at,
            });
        }
        let string_pool = bytes[at..at + string_pool_size].to_vec();
        at += string_pool_size;

        let code = bytes[at..].to_vec();

        Ok(Self {
            global_area_size,
            publics,
            string_pool,
            code,
        })
    }

    /// Number of value slots in the global area.
    pub fn global_area_size(&self) -> usize {
        self.global_area_size as usize
    }

    /// The public symbol table, exposed for diagnostics.
    pub fn publics(&self) -> &[PublicEntry] {
        &self.publics
    }

    /// The raw string pool.
    pub fn string_pool(&self) -> &[u8] {
        &self.string_pool
    }

    /// The code section.
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// The NUL-terminated pool entry starting at `offset`, without the
    /// terminator.
    pub fn string_at(&self, offset: u32) -> Result<&[u8], ImageError> {
        let start = offset as usize;
        if start >= self.string_pool.len() {
            return Err(ImageError::BadStringOffset { offset });
        }

        let tail = &self.string_pool[start..];
        let len = tail
            .iter()
            .position(|&b| b == 0)
            .ok_or(ImageError::UnterminatedString { offset })?;

        Ok(&tail[..len])
    }

    /// The name of a public entry.
    pub fn public_name(&self, entry: &PublicEntry) -> Result<&[u8], ImageError> {
        self.string_at(entry.name_offset)
    }
}
