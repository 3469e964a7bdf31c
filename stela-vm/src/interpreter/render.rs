use itertools::Itertools;

use super::Interpreter;
use crate::heap::Kind;
use crate::value::Value;

impl<R, W> Interpreter<R, W> {
    /// Printable form of a value: integers as decimal, strings quoted,
    /// arrays bracketed, tuples as `Tag (…)`, closures by their entry.
    /// Recursive; the language is strict, so cycles are not expected and
    /// not guarded.
    pub(crate) fn render(&self, value: Value) -> String {
        if value.is_fixnum() {
            return value.to_int().to_string();
        }
        if !self.heap.is_heap_value(value) {
            return String::from("<opaque>");
        }

        let addr = value.raw() as usize;
        match self.heap.kind(addr) {
            Kind::String => {
                format!("\"{}\"", String::from_utf8_lossy(self.heap.bytes(addr)))
            }
            Kind::Array => {
                let fields = (0..self.heap.fields_len(addr))
                    .map(|i| self.render(self.heap.field(addr, i)))
                    .join(", ");
                format!("[{fields}]")
            }
            Kind::Sexp => {
                let tag = self
                    .image
                    .string_at(self.heap.tag(addr))
                    .unwrap_or(b"?");
                let tag = String::from_utf8_lossy(tag);

                if self.heap.fields_len(addr) == 0 {
                    tag.into_owned()
                } else {
                    let fields = (0..self.heap.fields_len(addr))
                        .map(|i| self.render(self.heap.field(addr, i)))
                        .join(", ");
                    format!("{tag} ({fields})")
                }
            }
            Kind::Closure => format!("<closure {:#x}>", self.heap.code_entry(addr)),
        }
    }
}
