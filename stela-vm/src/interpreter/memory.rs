use super::Interpreter;
use crate::error::RuntimeError;
use crate::heap::Kind;
use crate::value::{Address, Value};

impl<R, W> Interpreter<R, W> {
    pub(crate) fn op_ld_global(&mut self) -> Result<(), RuntimeError> {
        let index = self.operand()? as usize;
        self.stack.push(self.globals[index]);
        Ok(())
    }

    pub(crate) fn op_ld_slot(&mut self) -> Result<(), RuntimeError> {
        let index = self.operand()? as usize;
        let value = self.frame()?.slot(index);
        self.stack.push(value);
        Ok(())
    }

    pub(crate) fn op_ld_captured(&mut self) -> Result<(), RuntimeError> {
        let index = self.operand()? as usize;
        let addr = self.closure_addr()?;

        let len = self.heap.fields_len(addr);
        if index >= len {
            return Err(RuntimeError::IndexOutOfRange {
                index: index as i32,
                len,
            });
        }

        self.stack.push(self.heap.field(addr, index));
        Ok(())
    }

    pub(crate) fn op_lda_global(&mut self) -> Result<(), RuntimeError> {
        let index = self.operand()? as usize;
        self.stack.push(Value::global_addr(index));
        Ok(())
    }

    pub(crate) fn op_lda_slot(&mut self) -> Result<(), RuntimeError> {
        let index = self.operand()? as usize;
        let frame = self
            .frames
            .len()
            .checked_sub(1)
            .ok_or(RuntimeError::NoActivation)?;
        self.stack.push(Value::frame_addr(frame, index));
        Ok(())
    }

    pub(crate) fn op_st_global(&mut self) -> Result<(), RuntimeError> {
        let index = self.operand()? as usize;
        let value = self.stack.top()?;
        self.globals[index] = value;
        Ok(())
    }

    pub(crate) fn op_st_slot(&mut self) -> Result<(), RuntimeError> {
        let index = self.operand()? as usize;
        let value = self.stack.top()?;
        self.frame_mut()?.set_slot(index, value);
        Ok(())
    }

    /// In-place update of the current closure's captured slot.
    pub(crate) fn op_st_captured(&mut self) -> Result<(), RuntimeError> {
        let index = self.operand()? as usize;
        let value = self.stack.top()?;
        let addr = self.closure_addr()?;

        let len = self.heap.fields_len(addr);
        if index >= len {
            return Err(RuntimeError::IndexOutOfRange {
                index: index as i32,
                len,
            });
        }

        self.heap.set_field(addr, index, value);
        Ok(())
    }

    pub(crate) fn op_elem(&mut self) -> Result<(), RuntimeError> {
        let index = self.pop_int()?;
        let xs = self.stack.pop()?;
        let addr = self.heap.heap_addr(xs)?;

        let len = self.heap.fields_len(addr);
        if index < 0 || index as usize >= len {
            return Err(RuntimeError::IndexOutOfRange { index, len });
        }

        let result = match self.heap.kind(addr) {
            Kind::String => Value::fixnum(self.heap.byte(addr, index as usize) as i32),
            Kind::Array | Kind::Sexp => self.heap.field(addr, index as usize),
            Kind::Closure => {
                return Err(RuntimeError::Type {
                    expected: "indexable object",
                })
            }
        };

        self.stack.push(result);
        Ok(())
    }

    /// Indexed assignment when the second-from-top value is a fixnum,
    /// indirect assignment through a variable address otherwise. Either
    /// way the assigned value stays on the stack.
    pub(crate) fn op_sta(&mut self) -> Result<(), RuntimeError> {
        let x = self.stack.pop()?;
        let index_or_addr = self.stack.pop()?;

        if index_or_addr.is_fixnum() {
            let index = index_or_addr.to_int();
            let xs = self.stack.pop()?;
            let addr = self.heap.heap_addr(xs)?;

            let len = self.heap.fields_len(addr);
            if index < 0 || index as usize >= len {
                return Err(RuntimeError::IndexOutOfRange { index, len });
            }

            match self.heap.kind(addr) {
                Kind::String => {
                    if !x.is_fixnum() {
                        return Err(RuntimeError::Type {
                            expected: "integer",
                        });
                    }
                    self.heap.set_byte(addr, index as usize, x.to_int() as u8);
                }
                Kind::Array | Kind::Sexp => self.heap.set_field(addr, index as usize, x),
                Kind::Closure => {
                    return Err(RuntimeError::Type {
                        expected: "assignable object",
                    })
                }
            }
        } else if let Some(address) = index_or_addr.address() {
            match address {
                Address::Global(index) => self.globals[index] = x,
                Address::Frame { frame, slot } => {
                    let activation = self
                        .frames
                        .get_mut(frame)
                        .ok_or(RuntimeError::NoActivation)?;
                    if slot >= activation.slots_len() {
                        return Err(RuntimeError::IndexOutOfRange {
                            index: slot as i32,
                            len: activation.slots_len(),
                        });
                    }
                    activation.set_slot(slot, x);
                }
            }
        } else {
            return Err(RuntimeError::Type {
                expected: "index or variable address",
            });
        }

        self.stack.push(x);
        Ok(())
    }
}
