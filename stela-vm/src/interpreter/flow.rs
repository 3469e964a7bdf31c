use super::Interpreter;
use crate::call::Activation;
use crate::code::Code;
use crate::error::RuntimeError;
use crate::heap::Kind;

impl<R, W> Interpreter<R, W> {
    pub(crate) fn op_jmp(&mut self) -> Result<(), RuntimeError> {
        let target = self.operand()? as usize;
        self.ip = target;
        Ok(())
    }

    pub(crate) fn op_cjmp(&mut self, when_zero: bool) -> Result<(), RuntimeError> {
        let target = self.operand()? as usize;
        let condition = self.pop_int()?;

        if (condition == 0) == when_zero {
            self.ip = target;
        }
        Ok(())
    }

    /// Function prologue: create the activation, bind arguments from the
    /// stack in reverse order, and consume the pending return pointer.
    /// A closure-body prologue additionally pops the closure into the
    /// activation; a plain prologue reached through `CALLC` discards it.
    pub(crate) fn op_begin(&mut self, captured: bool) -> Result<(), RuntimeError> {
        let args = self.operand()? as usize;
        let locals = self.operand()? as usize;

        let mut activation = Activation::new(self.rip, args + locals);
        self.rip = Code::FINISH_SLOT;

        for i in (0..args).rev() {
            activation.set_slot(i, self.stack.pop()?);
        }

        if captured {
            let closure = self.stack.pop()?;
            let addr = self.heap.heap_addr(closure)?;
            if self.heap.kind(addr) != Kind::Closure {
                return Err(RuntimeError::Type {
                    expected: "closure",
                });
            }
            activation.set_closure(closure);
        } else if self.from_callc {
            self.stack.pop()?;
        }
        self.from_callc = false;

        activation.set_entry_height(self.stack.len());
        self.frames.push(activation);
        Ok(())
    }

    pub(crate) fn op_call(&mut self) -> Result<(), RuntimeError> {
        let target = self.operand()? as usize;
        self.rip = self.ip;
        self.ip = target;
        Ok(())
    }

    /// Call the closure sitting beneath its `n` arguments.
    pub(crate) fn op_callc(&mut self) -> Result<(), RuntimeError> {
        let n = self.operand()? as usize;

        let closure = self.stack.peek(n)?;
        let addr = self.heap.heap_addr(closure)?;
        if self.heap.kind(addr) != Kind::Closure {
            return Err(RuntimeError::Type {
                expected: "closure",
            });
        }

        self.rip = self.ip;
        self.ip = self.heap.code_entry(addr);
        self.from_callc = true;
        Ok(())
    }

    pub(crate) fn op_end(&mut self) -> Result<(), RuntimeError> {
        let activation = self.frames.pop().ok_or(RuntimeError::NoActivation)?;

        debug_assert_eq!(
            self.stack.len(),
            activation.entry_height() + 1,
            "a function body leaves exactly its return value behind"
        );

        self.ip = activation.return_ptr();
        Ok(())
    }
}
