use std::io::{BufRead, Write};

use super::Interpreter;
use crate::code::Handler;
use crate::error::RuntimeError;
use crate::heap::Kind;
use crate::value::Value;

/// Outcome of dispatching one stream slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteState {
    /// Keep dispatching.
    Proceed,
    /// The halt handle was reached.
    Finished,
}

impl<R, W> Interpreter<R, W>
where
    R: BufRead,
    W: Write,
{
    /// Dispatch until the program halts or fails.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        loop {
            if self.step()? == ExecuteState::Finished {
                return Ok(());
            }
        }
    }

    /// Dispatch a single handle. The instruction pointer has already
    /// advanced past the handler slot when a handler body runs, so each
    /// handler consumes exactly its own operand slots.
    pub fn step(&mut self) -> Result<ExecuteState, RuntimeError> {
        let at = self.ip;
        let word = self
            .code
            .word(at)
            .ok_or(RuntimeError::UnresolvedJump { at })?;
        let handler = Handler::from_repr(word).ok_or(RuntimeError::UnsupportedOpcode { at })?;
        self.ip += 1;

        match handler {
            Handler::Finish => return Ok(ExecuteState::Finished),
            Handler::BadJump => return Err(RuntimeError::UnresolvedJump { at }),
            Handler::Unsupported => return Err(RuntimeError::UnsupportedOpcode { at }),

            Handler::Add => self.op_binop(|a, b| Ok(a.wrapping_add(b)))?,
            Handler::Sub => self.op_binop(|a, b| Ok(a.wrapping_sub(b)))?,
            Handler::Mul => self.op_binop(|a, b| Ok(a.wrapping_mul(b)))?,
            Handler::Div => self.op_binop(|a, b| {
                if b == 0 {
                    Err(RuntimeError::Arithmetic)
                } else {
                    Ok(a.wrapping_div(b))
                }
            })?,
            Handler::Rem => self.op_binop(|a, b| {
                if b == 0 {
                    Err(RuntimeError::Arithmetic)
                } else {
                    Ok(a.wrapping_rem(b))
                }
            })?,
            Handler::Lt => self.op_binop(|a, b| Ok((a < b) as i32))?,
            Handler::Le => self.op_binop(|a, b| Ok((a <= b) as i32))?,
            Handler::Gt => self.op_binop(|a, b| Ok((a > b) as i32))?,
            Handler::Ge => self.op_binop(|a, b| Ok((a >= b) as i32))?,
            Handler::Eq => self.op_binop(|a, b| Ok((a == b) as i32))?,
            Handler::Ne => self.op_binop(|a, b| Ok((a != b) as i32))?,
            Handler::And => self.op_binop(|a, b| Ok((a != 0 && b != 0) as i32))?,
            Handler::Or => self.op_binop(|a, b| Ok((a != 0 || b != 0) as i32))?,

            Handler::Const => {
                let word = self.operand()?;
                self.stack.push(Value::from_raw(word));
            }
            Handler::StringLit => self.op_string()?,
            Handler::Sexp => self.op_sexp()?,
            Handler::Sta => self.op_sta()?,
            Handler::Elem => self.op_elem()?,

            Handler::Drop => {
                self.stack.pop()?;
            }
            Handler::Dup => {
                let top = self.stack.top()?;
                self.stack.push(top);
            }
            Handler::Swap => self.stack.swap_top()?,

            Handler::Jmp => self.op_jmp()?,
            Handler::CJmpZ => self.op_cjmp(true)?,
            Handler::CJmpNz => self.op_cjmp(false)?,

            Handler::LdGlobal => self.op_ld_global()?,
            Handler::LdSlot => self.op_ld_slot()?,
            Handler::LdCaptured => self.op_ld_captured()?,
            Handler::LdaGlobal => self.op_lda_global()?,
            Handler::LdaSlot => self.op_lda_slot()?,
            Handler::StGlobal => self.op_st_global()?,
            Handler::StSlot => self.op_st_slot()?,
            Handler::StCaptured => self.op_st_captured()?,

            Handler::Begin => self.op_begin(false)?,
            Handler::CBegin => self.op_begin(true)?,
            Handler::Closure => self.op_closure()?,
            Handler::CallC => self.op_callc()?,
            Handler::Call => self.op_call()?,
            Handler::End => self.op_end()?,

            Handler::Tag => self.op_tag()?,
            Handler::Array => self.op_array()?,
            Handler::Fail => return self.op_fail(),

            Handler::PattEqString => self.op_patt_eq_string()?,
            Handler::PattString => self.op_patt_kind(Kind::String)?,
            Handler::PattArray => self.op_patt_kind(Kind::Array)?,
            Handler::PattSexp => self.op_patt_kind(Kind::Sexp)?,
            Handler::PattRef => self.op_patt_ref()?,
            Handler::PattVal => self.op_patt_val()?,
            Handler::PattFun => self.op_patt_kind(Kind::Closure)?,

            Handler::Read => self.op_read()?,
            Handler::Write => self.op_write()?,
            Handler::Length => self.op_length()?,
            Handler::StringVal => self.op_string_val()?,
            Handler::BArray => self.op_barray()?,
        }

        Ok(ExecuteState::Proceed)
    }
}
