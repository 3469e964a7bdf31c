//! Call activation records.

use crate::value::Value;

/// A call activation: the return pointer into the word stream, the bound
/// argument and local slots, and (for closure bodies) the owning closure.
///
/// Activations live on the interpreter's frame stack; the parent link of
/// the chain is implicit in the stack order. Every slot and the closure
/// value are scanned as collector roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    return_ptr: usize,
    closure: Value,
    slots: Vec<Value>,
    entry_height: usize,
}

impl Activation {
    /// Create a zero-filled activation of `slots` value slots. Arguments
    /// occupy the low indices, locals the rest.
    pub fn new(return_ptr: usize, slots: usize) -> Self {
        Self {
            return_ptr,
            closure: Value::ZERO,
            slots: vec![Value::ZERO; slots],
            entry_height: 0,
        }
    }

    /// Word-stream index execution resumes at after `END`/`RET`.
    pub const fn return_ptr(&self) -> usize {
        self.return_ptr
    }

    /// Read a slot.
    pub fn slot(&self, index: usize) -> Value {
        self.slots[index]
    }

    /// Overwrite a slot.
    pub fn set_slot(&mut self, index: usize, value: Value) {
        self.slots[index] = value;
    }

    /// Number of slots, arguments included.
    pub fn slots_len(&self) -> usize {
        self.slots.len()
    }

    /// The closure this activation executes, if any.
    pub const fn closure(&self) -> Value {
        self.closure
    }

    /// Record the owning closure of a closure-body activation.
    pub fn set_closure(&mut self, closure: Value) {
        self.closure = closure;
    }

    /// Operand-stack height right after argument binding, recorded so
    /// `END`/`RET` can assert the body left exactly one value behind.
    pub const fn entry_height(&self) -> usize {
        self.entry_height
    }

    /// Record the post-binding operand-stack height.
    pub fn set_entry_height(&mut self, height: usize) {
        self.entry_height = height;
    }

    /// All collector roots held by this activation.
    pub fn roots_mut(&mut self) -> impl Iterator<Item = &mut Value> {
        std::iter::once(&mut self.closure).chain(self.slots.iter_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_start_zeroed() {
        let act = Activation::new(7, 3);
        assert_eq!(act.return_ptr(), 7);
        assert_eq!(act.slots_len(), 3);
        assert!((0..3).all(|i| act.slot(i) == Value::ZERO));
    }

    #[test]
    fn roots_cover_closure_and_slots() {
        let mut act = Activation::new(0, 2);
        act.set_closure(Value::fixnum(1));
        act.set_slot(0, Value::fixnum(2));
        act.set_slot(1, Value::fixnum(3));

        let roots: Vec<i32> = act.roots_mut().map(|v| v.to_int()).collect();
        assert_eq!(roots, vec![1, 2, 3]);
    }
}
