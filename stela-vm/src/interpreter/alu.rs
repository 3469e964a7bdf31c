use super::Interpreter;
use crate::error::RuntimeError;
use crate::value::Value;

impl<R, W> Interpreter<R, W> {
    /// Pop `b`, pop `a`, push `f(a, b)` encoded. Both operands must be
    /// fixnums; division-like operators report their own failures through
    /// `f`.
    pub(crate) fn op_binop<F>(&mut self, f: F) -> Result<(), RuntimeError>
    where
        F: FnOnce(i32, i32) -> Result<i32, RuntimeError>,
    {
        let b = self.pop_int()?;
        let a = self.pop_int()?;

        self.stack.push(Value::fixnum(f(a, b)?));
        Ok(())
    }
}
