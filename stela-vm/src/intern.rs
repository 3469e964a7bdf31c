//! Tag interning.
//!
//! Sexp tags are named by offsets into the image string pool. Two distinct
//! offsets may spell the same name, so the converter rewrites every tag
//! operand to the first offset seen with those contents. After that, tag
//! equality is integer equality.

use std::collections::HashMap;

use stela_asm::Image;

use crate::error::ConvertError;

/// Maps tag contents to their canonical string-pool offset.
#[derive(Debug, Default)]
pub struct Interner {
    canonical: HashMap<Vec<u8>, u32>,
}

impl Interner {
    /// A fresh, empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `offset` to the canonical offset for its contents,
    /// registering it if the contents are new. `at` is the code offset of
    /// the referencing instruction, used in diagnostics.
    pub fn intern(&mut self, image: &Image, offset: u32, at: usize) -> Result<u32, ConvertError> {
        let contents = image
            .string_at(offset)
            .map_err(|_| ConvertError::BadStringIndex { at, offset })?;

        Ok(*self
            .canonical
            .entry(contents.to_vec())
            .or_insert(offset))
    }

    /// Number of distinct tag names seen.
    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    /// Whether no tag has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }
}
