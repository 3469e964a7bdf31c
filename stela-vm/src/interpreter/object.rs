use super::{ExecuteState, Interpreter};
use crate::error::RuntimeError;
use crate::heap::Kind;
use crate::value::Value;

impl<R, W> Interpreter<R, W> {
    /// Allocate a fresh string from the pooled literal. The offset was
    /// validated during conversion.
    pub(crate) fn op_string(&mut self) -> Result<(), RuntimeError> {
        let offset = self.operand()?;

        let len = self.image.string_at(offset).map_or(0, <[u8]>::len);
        let addr = self.alloc(Kind::String, len)?;
        self.heap
            .copy_bytes_into(addr, self.image.string_at(offset).unwrap_or(&[]));

        self.stack.push(Value::heap_ref(addr));
        Ok(())
    }

    /// Allocate a tagged tuple and fill it from the stack in reverse
    /// order. The allocation happens first: the popped values are still
    /// rooted on the stack if it triggers a collection.
    pub(crate) fn op_sexp(&mut self) -> Result<(), RuntimeError> {
        let tag = self.operand()?;
        let n = self.operand()? as usize;

        let addr = self.alloc(Kind::Sexp, n)?;
        self.heap.set_tag(addr, tag);
        for i in (0..n).rev() {
            let value = self.stack.pop()?;
            self.heap.set_field(addr, i, value);
        }

        self.stack.push(Value::heap_ref(addr));
        Ok(())
    }

    /// Allocate a closure and populate its captures from the sources
    /// described by the interleaved location bitmap words.
    pub(crate) fn op_closure(&mut self) -> Result<(), RuntimeError> {
        let entry = self.operand()? as usize;
        let n = self.operand()? as usize;

        let addr = self.alloc(Kind::Closure, n)?;
        self.heap.set_code_entry(addr, entry);

        let mut filled = 0;
        while filled < n {
            let chunk = (n - filled).min(16);
            let bitmap = self.operand()?;

            for j in 0..chunk {
                let index = self.operand()? as usize;
                let value = match (bitmap >> (2 * j)) & 3 {
                    0 => self.globals[index],
                    1 | 2 => self.frame()?.slot(index),
                    _ => {
                        let closure = self.closure_addr()?;
                        let len = self.heap.fields_len(closure);
                        if index >= len {
                            return Err(RuntimeError::IndexOutOfRange {
                                index: index as i32,
                                len,
                            });
                        }
                        self.heap.field(closure, index)
                    }
                };
                self.heap.set_field(addr, filled + j, value);
            }
            filled += chunk;
        }

        self.stack.push(Value::heap_ref(addr));
        Ok(())
    }

    pub(crate) fn op_tag(&mut self) -> Result<(), RuntimeError> {
        let tag = self.operand()?;
        let n = self.operand()? as usize;
        let x = self.stack.pop()?;

        let matches = self.heap.is_heap_value(x) && {
            let addr = x.raw() as usize;
            self.heap.kind(addr) == Kind::Sexp
                && self.heap.fields_len(addr) == n
                && self.heap.tag(addr) == tag
        };

        self.stack.push(Value::fixnum(matches as i32));
        Ok(())
    }

    pub(crate) fn op_array(&mut self) -> Result<(), RuntimeError> {
        let n = self.operand()? as usize;
        let x = self.stack.pop()?;

        let matches = self.heap.is_heap_value(x) && {
            let addr = x.raw() as usize;
            self.heap.kind(addr) == Kind::Array && self.heap.fields_len(addr) == n
        };

        self.stack.push(Value::fixnum(matches as i32));
        Ok(())
    }

    pub(crate) fn op_fail(&mut self) -> Result<ExecuteState, RuntimeError> {
        let line = self.operand()?;
        let col = self.operand()?;
        let value = self.render(self.stack.top()?);

        Err(RuntimeError::MatchFailure { line, col, value })
    }

    pub(crate) fn op_patt_kind(&mut self, kind: Kind) -> Result<(), RuntimeError> {
        let x = self.stack.pop()?;
        let matches = self.heap.is_heap_value(x) && self.heap.kind(x.raw() as usize) == kind;
        self.stack.push(Value::fixnum(matches as i32));
        Ok(())
    }

    pub(crate) fn op_patt_ref(&mut self) -> Result<(), RuntimeError> {
        let x = self.stack.pop()?;
        let matches = self.heap.is_heap_value(x);
        self.stack.push(Value::fixnum(matches as i32));
        Ok(())
    }

    pub(crate) fn op_patt_val(&mut self) -> Result<(), RuntimeError> {
        let x = self.stack.pop()?;
        self.stack.push(Value::fixnum(x.is_fixnum() as i32));
        Ok(())
    }

    /// String-pattern test: both operands are strings with equal contents.
    pub(crate) fn op_patt_eq_string(&mut self) -> Result<(), RuntimeError> {
        let b = self.stack.pop()?;
        let a = self.stack.pop()?;

        let matches = match (self.string_addr(a), self.string_addr(b)) {
            (Some(a), Some(b)) => self.heap.bytes(a) == self.heap.bytes(b),
            _ => false,
        };

        self.stack.push(Value::fixnum(matches as i32));
        Ok(())
    }

    fn string_addr(&self, value: Value) -> Option<usize> {
        if !self.heap.is_heap_value(value) {
            return None;
        }
        let addr = value.raw() as usize;
        (self.heap.kind(addr) == Kind::String).then_some(addr)
    }
}
