use std::io::{BufRead, Write};

use super::Interpreter;
use crate::error::RuntimeError;
use crate::heap::Kind;
use crate::value::Value;

impl<R, W> Interpreter<R, W>
where
    R: BufRead,
    W: Write,
{
    /// Read the next whitespace-delimited signed decimal integer from the
    /// input channel. Leading whitespace is skipped and the trailing
    /// delimiter stays in the channel, so several integers may share a
    /// line.
    pub(crate) fn op_read(&mut self) -> Result<(), RuntimeError> {
        let mut token = Vec::new();
        loop {
            let buf = self.input.fill_buf()?;
            if buf.is_empty() {
                break;
            }

            let mut used = 0;
            let mut done = false;
            for &byte in buf {
                if byte.is_ascii_whitespace() {
                    if token.is_empty() {
                        used += 1;
                        continue;
                    }
                    done = true;
                    break;
                }
                token.push(byte);
                used += 1;
            }

            self.input.consume(used);
            if done {
                break;
            }
        }

        let value: i32 = std::str::from_utf8(&token)
            .ok()
            .and_then(|text| text.parse().ok())
            .ok_or(RuntimeError::InvalidInput)?;

        self.stack.push(Value::fixnum(value));
        Ok(())
    }

    /// Print the decoded integer and a line terminator; leave a
    /// placeholder as the call's value.
    pub(crate) fn op_write(&mut self) -> Result<(), RuntimeError> {
        let value = self.pop_int()?;
        writeln!(self.output, "{value}")?;
        self.stack.push(Value::ZERO);
        Ok(())
    }

    pub(crate) fn op_length(&mut self) -> Result<(), RuntimeError> {
        let x = self.stack.pop()?;
        let addr = self.heap.heap_addr(x)?;
        self.stack
            .push(Value::fixnum(self.heap.fields_len(addr) as i32));
        Ok(())
    }

    /// Render any value into a fresh string object.
    pub(crate) fn op_string_val(&mut self) -> Result<(), RuntimeError> {
        let x = self.stack.pop()?;
        let rendered = self.render(x);

        let addr = self.alloc(Kind::String, rendered.len())?;
        self.heap.copy_bytes_into(addr, rendered.as_bytes());

        self.stack.push(Value::heap_ref(addr));
        Ok(())
    }

    /// Collect `n` stack values into a fresh array, last value in the last
    /// slot.
    pub(crate) fn op_barray(&mut self) -> Result<(), RuntimeError> {
        let n = self.operand()? as usize;

        let addr = self.alloc(Kind::Array, n)?;
        for i in (0..n).rev() {
            let value = self.stack.pop()?;
            self.heap.set_field(addr, i, value);
        }

        self.stack.push(Value::heap_ref(addr));
        Ok(())
    }
}
