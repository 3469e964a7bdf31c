//! One-pass rewrite of the byte stream into threaded form.
//!
//! The converter walks the code section once, emitting for every
//! instruction a dispatch handle followed by its pre-decoded operands:
//! fixnum-encoded literals, validated counts, canonical tag offsets,
//! global and unified activation-slot indices, and word-stream indices for
//! every jump and call target. Forward targets are temporarily wired to
//! the reserved bad-jump slot and patched when the target is reached.
//! Static scope checking happens here, so the dispatch loop never
//! re-validates argument, local, or global indices.

use stela_asm::{is_end_marker, Binop, Image, Loc, Opcode, Patt};
use tracing::debug;

use crate::code::{Code, Handler};
use crate::error::ConvertError;
use crate::intern::Interner;
use crate::value::Value;

/// The function currently being converted.
struct Scope {
    /// Stream index of the prologue handler.
    entry: u32,
    args: u32,
    locals: u32,
    /// Whether the prologue is a closure-body prologue.
    captured: bool,
}

/// A reference to a not-yet-emitted code offset.
struct Forward {
    /// Stream slot to patch once the target is emitted.
    slot: usize,
    /// Code offset of the referencing instruction.
    from: usize,
    /// Call references must land on a prologue; jump references must stay
    /// within the function recorded here.
    call: bool,
    function: Option<u32>,
}

#[derive(Default)]
struct Meta {
    converted: Option<u32>,
    function: Option<u32>,
    forwards: Vec<Forward>,
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn pos(&self) -> usize {
        self.pos
    }

    fn read_u8(&mut self) -> Result<u8, ConvertError> {
        let byte = *self
            .bytes
            .get(self.pos)
            .ok_or(ConvertError::TruncatedCode { at: self.pos })?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_u32(&mut self) -> Result<u32, ConvertError> {
        let end = self
            .pos
            .checked_add(4)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(ConvertError::TruncatedCode { at: self.pos })?;

        let mut word = [0u8; 4];
        word.copy_from_slice(&self.bytes[self.pos..end]);
        self.pos = end;
        Ok(u32::from_le_bytes(word))
    }

    fn read_i32(&mut self) -> Result<i32, ConvertError> {
        self.read_u32().map(|w| w as i32)
    }

    fn read_count(&mut self, at: usize) -> Result<u32, ConvertError> {
        let n = self.read_u32()?;
        if n > i32::MAX as u32 {
            return Err(ConvertError::InvalidCount { at });
        }
        Ok(n)
    }
}

const fn binop_handler(op: Binop) -> Handler {
    match op {
        Binop::Add => Handler::Add,
        Binop::Sub => Handler::Sub,
        Binop::Mul => Handler::Mul,
        Binop::Div => Handler::Div,
        Binop::Rem => Handler::Rem,
        Binop::Lt => Handler::Lt,
        Binop::Le => Handler::Le,
        Binop::Gt => Handler::Gt,
        Binop::Ge => Handler::Ge,
        Binop::Eq => Handler::Eq,
        Binop::Ne => Handler::Ne,
        Binop::And => Handler::And,
        Binop::Or => Handler::Or,
    }
}

const fn patt_handler(op: Patt) -> Handler {
    match op {
        Patt::EqString => Handler::PattEqString,
        Patt::String => Handler::PattString,
        Patt::Array => Handler::PattArray,
        Patt::Sexp => Handler::PattSexp,
        Patt::Ref => Handler::PattRef,
        Patt::Val => Handler::PattVal,
        Patt::Fun => Handler::PattFun,
    }
}

/// Resolve a variable operand to the index the engine consumes: globals
/// keep their index, arguments map to the low activation slots, locals are
/// offset past the arguments, captures keep their index and are
/// bounds-checked at run time against the live closure.
fn slot_operand(
    loc: Loc,
    index: u32,
    scope: Option<&Scope>,
    globals: usize,
    at: usize,
) -> Result<u32, ConvertError> {
    match loc {
        Loc::Global => {
            if index as usize >= globals {
                return Err(ConvertError::ScopeError {
                    at,
                    detail: "global index out of range",
                });
            }
            Ok(index)
        }
        Loc::Local => {
            let scope = scope.ok_or(ConvertError::ScopeError {
                at,
                detail: "local variable used outside of a function",
            })?;
            if index >= scope.locals {
                return Err(ConvertError::ScopeError {
                    at,
                    detail: "local index out of range",
                });
            }
            Ok(index + scope.args)
        }
        Loc::Arg => {
            let scope = scope.ok_or(ConvertError::ScopeError {
                at,
                detail: "argument used outside of a function",
            })?;
            if index >= scope.args {
                return Err(ConvertError::ScopeError {
                    at,
                    detail: "argument index out of range",
                });
            }
            Ok(index)
        }
        Loc::Captured => {
            match scope {
                Some(scope) if scope.captured => Ok(index),
                Some(_) => Err(ConvertError::ScopeError {
                    at,
                    detail: "captured variable used outside of a closure body",
                }),
                None => Err(ConvertError::ScopeError {
                    at,
                    detail: "captured variable used outside of a function",
                }),
            }
        }
    }
}

fn emit_target(
    out: &mut Vec<u32>,
    meta: &mut [Meta],
    code: &[u8],
    at: usize,
    target: u32,
    call: bool,
    scope: Option<&Scope>,
) -> Result<(), ConvertError> {
    let t = target as usize;
    if t >= code.len() {
        return Err(ConvertError::BadCodeIndex { at, target });
    }

    match meta[t].converted {
        Some(slot) => {
            if call {
                if !matches!(Opcode::decode(code[t]), Some(op) if op.is_entry()) {
                    return Err(ConvertError::NotFunctionEntry { at, target });
                }
            } else if meta[t].function != scope.map(|s| s.entry) {
                return Err(ConvertError::CrossFunctionJump { at, target });
            }
            out.push(slot);
        }
        None => {
            meta[t].forwards.push(Forward {
                slot: out.len(),
                from: at,
                call,
                function: scope.map(|s| s.entry),
            });
            out.push(Code::BAD_JUMP_SLOT as u32);
        }
    }

    Ok(())
}

/// Convert a validated image's code section into the threaded word stream.
pub fn convert(image: &Image) -> Result<Code, ConvertError> {
    let code = image.code();
    let globals = image.global_area_size();

    let mut out: Vec<u32> = Vec::with_capacity(code.len() + 3);
    out.push(Handler::Finish as u32);
    out.push(Handler::BadJump as u32);

    let mut meta: Vec<Meta> = Vec::with_capacity(code.len());
    meta.resize_with(code.len(), Meta::default);

    let mut interner = Interner::new();
    let mut scope: Option<Scope> = None;
    let mut reader = Reader::new(code);
    let mut terminated = false;

    while !reader.is_empty() {
        let at = reader.pos();
        let byte = reader.read_u8()?;
        let slot = out.len() as u32;

        meta[at].converted = Some(slot);
        meta[at].function = scope.as_ref().map(|s| s.entry);

        for forward in std::mem::take(&mut meta[at].forwards) {
            out[forward.slot] = slot;
            if forward.call {
                if !matches!(Opcode::decode(byte), Some(op) if op.is_entry()) {
                    return Err(ConvertError::NotFunctionEntry {
                        at: forward.from,
                        target: at as u32,
                    });
                }
            } else if forward.function != scope.as_ref().map(|s| s.entry) {
                return Err(ConvertError::CrossFunctionJump {
                    at: forward.from,
                    target: at as u32,
                });
            }
        }

        if is_end_marker(byte) {
            terminated = true;
            break;
        }

        let Some(op) = Opcode::decode(byte) else {
            // Unknown opcodes become a handle that fails only if reached,
            // permitting partial instruction-set support.
            out.push(Handler::Unsupported as u32);
            continue;
        };

        match op {
            Opcode::Binop(binop) => out.push(binop_handler(binop) as u32),

            Opcode::Const => {
                let imm = reader.read_i32()?;
                out.push(Handler::Const as u32);
                out.push(Value::fixnum(imm).raw());
            }

            Opcode::String => {
                let offset = reader.read_u32()?;
                image
                    .string_at(offset)
                    .map_err(|_| ConvertError::BadStringIndex { at, offset })?;
                out.push(Handler::StringLit as u32);
                out.push(offset);
            }

            Opcode::Sexp | Opcode::Tag => {
                let offset = reader.read_u32()?;
                let tag = interner.intern(image, offset, at)?;
                let n = reader.read_count(at)?;
                let handler = if op == Opcode::Sexp {
                    Handler::Sexp
                } else {
                    Handler::Tag
                };
                out.push(handler as u32);
                out.push(tag);
                out.push(n);
            }

            // Left unimplemented upstream; fails only if dispatched.
            Opcode::Sti => out.push(Handler::Unsupported as u32),

            Opcode::Sta => out.push(Handler::Sta as u32),
            Opcode::Elem => out.push(Handler::Elem as u32),
            Opcode::Drop => out.push(Handler::Drop as u32),
            Opcode::Dup => out.push(Handler::Dup as u32),
            Opcode::Swap => out.push(Handler::Swap as u32),

            Opcode::Jmp | Opcode::CJmpZ | Opcode::CJmpNz => {
                let handler = match op {
                    Opcode::Jmp => Handler::Jmp,
                    Opcode::CJmpZ => Handler::CJmpZ,
                    _ => Handler::CJmpNz,
                };
                out.push(handler as u32);
                let target = reader.read_u32()?;
                emit_target(&mut out, &mut meta, code, at, target, false, scope.as_ref())?;
            }

            Opcode::End | Opcode::Ret => {
                out.push(Handler::End as u32);
                scope = None;
            }

            Opcode::Ld(loc) => {
                let index = reader.read_u32()?;
                let resolved = slot_operand(loc, index, scope.as_ref(), globals, at)?;
                let handler = match loc {
                    Loc::Global => Handler::LdGlobal,
                    Loc::Local | Loc::Arg => Handler::LdSlot,
                    Loc::Captured => Handler::LdCaptured,
                };
                out.push(handler as u32);
                out.push(resolved);
            }

            Opcode::Lda(loc) => {
                if loc == Loc::Captured {
                    return Err(ConvertError::AddressOfCapture { at });
                }
                let index = reader.read_u32()?;
                let resolved = slot_operand(loc, index, scope.as_ref(), globals, at)?;
                let handler = match loc {
                    Loc::Global => Handler::LdaGlobal,
                    _ => Handler::LdaSlot,
                };
                out.push(handler as u32);
                out.push(resolved);
            }

            Opcode::St(loc) => {
                let index = reader.read_u32()?;
                let resolved = slot_operand(loc, index, scope.as_ref(), globals, at)?;
                let handler = match loc {
                    Loc::Global => Handler::StGlobal,
                    Loc::Local | Loc::Arg => Handler::StSlot,
                    Loc::Captured => Handler::StCaptured,
                };
                out.push(handler as u32);
                out.push(resolved);
            }

            Opcode::Begin | Opcode::CBegin => {
                if scope.is_some() {
                    return Err(ConvertError::NestedFunction { at });
                }
                let args = reader.read_count(at)?;
                let locals = reader.read_count(at)?;
                scope = Some(Scope {
                    entry: slot,
                    args,
                    locals,
                    captured: op == Opcode::CBegin,
                });
                let handler = if op == Opcode::Begin {
                    Handler::Begin
                } else {
                    Handler::CBegin
                };
                out.push(handler as u32);
                out.push(args);
                out.push(locals);
            }

            Opcode::Closure => {
                out.push(Handler::Closure as u32);
                let target = reader.read_u32()?;
                emit_target(&mut out, &mut meta, code, at, target, true, scope.as_ref())?;
                let n = reader.read_count(at)?;
                out.push(n);

                // Capture locations are packed two bits apiece, sixteen to
                // a word, each bitmap word preceding its sixteen captures.
                let mut emitted = 0;
                while emitted < n {
                    let chunk = (n - emitted).min(16);
                    let bitmap_slot = out.len();
                    out.push(0);
                    let mut bitmap = 0u32;
                    for j in 0..chunk {
                        let loc_byte = reader.read_u8()?;
                        let loc = Loc::from_wire(loc_byte).ok_or(ConvertError::BadLocation {
                            at,
                            code: loc_byte,
                        })?;
                        let index = reader.read_u32()?;
                        let resolved = slot_operand(loc, index, scope.as_ref(), globals, at)?;
                        bitmap |= loc.wire() << (2 * j);
                        out.push(resolved);
                    }
                    out[bitmap_slot] = bitmap;
                    emitted += chunk;
                }
            }

            Opcode::CallC => {
                out.push(Handler::CallC as u32);
                let n = reader.read_count(at)?;
                out.push(n);
            }

            Opcode::Call => {
                out.push(Handler::Call as u32);
                let target = reader.read_u32()?;
                emit_target(&mut out, &mut meta, code, at, target, true, scope.as_ref())?;
                // The argument count is informational; the callee prologue
                // binds from the stack.
                let _nargs = reader.read_u32()?;
            }

            Opcode::Array => {
                out.push(Handler::Array as u32);
                let n = reader.read_count(at)?;
                out.push(n);
            }

            Opcode::Fail => {
                out.push(Handler::Fail as u32);
                let line = reader.read_count(at)?;
                let col = reader.read_count(at)?;
                out.push(line);
                out.push(col);
            }

            Opcode::Line => {
                let _ = reader.read_u32()?;
            }

            Opcode::Patt(patt) => out.push(patt_handler(patt) as u32),

            Opcode::LRead => out.push(Handler::Read as u32),
            Opcode::LWrite => out.push(Handler::Write as u32),
            Opcode::LLength => out.push(Handler::Length as u32),
            Opcode::LString => out.push(Handler::StringVal as u32),

            Opcode::BArray => {
                out.push(Handler::BArray as u32);
                let n = reader.read_count(at)?;
                out.push(n);
            }
        }
    }

    if !terminated {
        return Err(ConvertError::MissingEndMarker);
    }

    out.push(Handler::Finish as u32);

    debug!(
        source_bytes = code.len(),
        words = out.len(),
        tags = interner.len(),
        "converted code section"
    );

    Ok(Code::from_words(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::ImageBuilder;
    use rstest::rstest;

    fn handler_at(code: &Code, index: usize) -> Handler {
        Handler::from_repr(code.word(index).unwrap()).unwrap()
    }

    #[test]
    fn reserved_slots_frame_the_stream() {
        let mut b = ImageBuilder::new();
        b.op(Opcode::Begin).word(2).word(0);
        b.op(Opcode::End);
        b.end_marker();

        let code = convert(&b.build()).unwrap();
        assert_eq!(handler_at(&code, Code::FINISH_SLOT), Handler::Finish);
        assert_eq!(handler_at(&code, Code::BAD_JUMP_SLOT), Handler::BadJump);
        assert_eq!(handler_at(&code, code.len() - 1), Handler::Finish);
        assert_eq!(handler_at(&code, Code::ENTRY), Handler::Begin);
    }

    #[test]
    fn stream_length_is_bounded_by_source_length() {
        let mut b = ImageBuilder::new();
        b.op(Opcode::Begin).word(2).word(1);
        b.op(Opcode::Const).int(-7);
        b.op(Opcode::St(Loc::Local)).word(0);
        b.op(Opcode::Drop);
        b.op(Opcode::End);
        b.end_marker();

        let image = b.build();
        let code = convert(&image).unwrap();
        assert!(code.len() <= image.code().len() + 3);
    }

    #[test]
    fn const_operand_is_fixnum_encoded() {
        let mut b = ImageBuilder::new();
        b.op(Opcode::Begin).word(2).word(0);
        b.op(Opcode::Const).int(-7);
        b.op(Opcode::End);
        b.end_marker();

        let code = convert(&b.build()).unwrap();
        assert_eq!(code.word(Code::ENTRY + 4), Some(Value::fixnum(-7).raw()));
    }

    #[test]
    fn local_indices_are_offset_past_arguments() {
        let mut b = ImageBuilder::new();
        b.op(Opcode::Begin).word(2).word(3);
        b.op(Opcode::Ld(Loc::Arg)).word(1);
        b.op(Opcode::Ld(Loc::Local)).word(2);
        b.op(Opcode::End);
        b.end_marker();

        let code = convert(&b.build()).unwrap();
        let entry = Code::ENTRY;
        assert_eq!(handler_at(&code, entry + 3), Handler::LdSlot);
        assert_eq!(code.word(entry + 4), Some(1));
        assert_eq!(handler_at(&code, entry + 5), Handler::LdSlot);
        assert_eq!(code.word(entry + 6), Some(2 + 2));
    }

    #[test]
    fn backward_jump_resolves_immediately() {
        let mut b = ImageBuilder::new();
        b.op(Opcode::Begin).word(2).word(0);
        let loop_head = b.pos();
        b.op(Opcode::Const).int(1);
        b.op(Opcode::Drop);
        b.op(Opcode::Jmp).word(loop_head);
        b.op(Opcode::End);
        b.end_marker();

        let code = convert(&b.build()).unwrap();
        // Begin(3 slots) Const(2) Drop(1) then Jmp handler + target.
        assert_eq!(handler_at(&code, Code::ENTRY + 6), Handler::Jmp);
        assert_eq!(code.word(Code::ENTRY + 7), Some(Code::ENTRY as u32 + 3));
    }

    #[test]
    fn forward_jump_is_patched_when_the_target_is_emitted() {
        let mut b = ImageBuilder::new();
        b.op(Opcode::Begin).word(2).word(0);
        let jmp_operand = b.pos() + 1;
        b.op(Opcode::Jmp).word(0);
        b.op(Opcode::Drop);
        let target = b.pos();
        b.op(Opcode::End);
        b.patch(jmp_operand, target);
        b.end_marker();

        let code = convert(&b.build()).unwrap();
        let jmp_slot = Code::ENTRY + 3;
        assert_eq!(handler_at(&code, jmp_slot), Handler::Jmp);
        // Patched past the Drop to the End handler slot.
        assert_eq!(code.word(jmp_slot + 1), Some(jmp_slot as u32 + 3));
    }

    #[test]
    fn sexp_tags_are_interned_to_one_offset() {
        let mut b = ImageBuilder::new();
        let first = b.string("cons");
        let second = b.string("cons");
        b.op(Opcode::Begin).word(2).word(0);
        b.op(Opcode::Const).int(1);
        b.op(Opcode::Sexp).word(first).word(1);
        b.op(Opcode::Drop);
        b.op(Opcode::Const).int(2);
        b.op(Opcode::Sexp).word(second).word(1);
        b.op(Opcode::Drop);
        b.op(Opcode::End);
        b.end_marker();

        let code = convert(&b.build()).unwrap();
        let first_tag = code.word(Code::ENTRY + 6).unwrap();
        let second_tag = code.word(Code::ENTRY + 12).unwrap();
        assert_eq!(first_tag, second_tag);
        assert_eq!(first_tag, first);
    }

    #[test]
    fn line_markers_are_consumed_without_emission() {
        let mut b = ImageBuilder::new();
        b.op(Opcode::Begin).word(2).word(0);
        b.op(Opcode::Line).word(42);
        b.op(Opcode::End);
        b.end_marker();

        let code = convert(&b.build()).unwrap();
        assert_eq!(handler_at(&code, Code::ENTRY + 3), Handler::End);
    }

    #[test]
    fn closure_captures_pack_a_location_bitmap() {
        let mut b = ImageBuilder::new();
        b.set_globals(1);
        b.op(Opcode::Begin).word(2).word(1);
        let closure_target_operand = b.pos() + 1;
        b.op(Opcode::Closure).word(0).word(3);
        b.byte(0).word(0); // G(0)
        b.byte(1).word(0); // L(0)
        b.byte(2).word(1); // A(1)
        b.op(Opcode::Drop);
        b.op(Opcode::End);
        let body = b.pos();
        b.op(Opcode::CBegin).word(1).word(0);
        b.op(Opcode::End);
        b.patch(closure_target_operand, body);
        b.end_marker();

        let code = convert(&b.build()).unwrap();
        let closure_slot = Code::ENTRY + 3;
        assert_eq!(handler_at(&code, closure_slot), Handler::Closure);
        assert_eq!(code.word(closure_slot + 2), Some(3));
        // Bitmap: G(0) | L(1) << 2 | A(2) << 4.
        assert_eq!(code.word(closure_slot + 3), Some(0b10_01_00));
        assert_eq!(code.word(closure_slot + 4), Some(0)); // global 0
        assert_eq!(code.word(closure_slot + 5), Some(2 + 0)); // local 0 unified
        assert_eq!(code.word(closure_slot + 6), Some(1)); // argument 1
    }

    #[test]
    fn sti_defers_to_a_dispatch_time_failure() {
        let mut b = ImageBuilder::new();
        b.op(Opcode::Begin).word(2).word(0);
        b.op(Opcode::Sti);
        b.op(Opcode::End);
        b.end_marker();

        let code = convert(&b.build()).unwrap();
        assert_eq!(handler_at(&code, Code::ENTRY + 3), Handler::Unsupported);
    }

    #[test]
    fn missing_end_marker_is_rejected() {
        let mut b = ImageBuilder::new();
        b.op(Opcode::Begin).word(2).word(0);
        b.op(Opcode::End);

        assert_eq!(convert(&b.build()), Err(ConvertError::MissingEndMarker));
    }

    #[test]
    fn truncated_operand_is_rejected() {
        let mut b = ImageBuilder::new();
        b.op(Opcode::Begin).word(2).word(0);
        b.op(Opcode::Const).byte(1);

        assert!(matches!(
            convert(&b.build()),
            Err(ConvertError::TruncatedCode { .. })
        ));
    }

    #[test]
    fn nested_function_entry_is_rejected() {
        let mut b = ImageBuilder::new();
        b.op(Opcode::Begin).word(2).word(0);
        b.op(Opcode::Begin).word(0).word(0);
        b.end_marker();

        assert_eq!(
            convert(&b.build()),
            Err(ConvertError::NestedFunction { at: 9 })
        );
    }

    #[test]
    fn cross_function_jump_is_rejected() {
        let mut b = ImageBuilder::new();
        b.op(Opcode::Begin).word(2).word(0);
        let target = b.pos();
        b.op(Opcode::Drop);
        b.op(Opcode::End);
        b.op(Opcode::Begin).word(0).word(0);
        b.op(Opcode::Jmp).word(target);
        b.op(Opcode::End);
        b.end_marker();

        assert!(matches!(
            convert(&b.build()),
            Err(ConvertError::CrossFunctionJump { .. })
        ));
    }

    #[test]
    fn forward_cross_function_jump_is_rejected() {
        let mut b = ImageBuilder::new();
        b.op(Opcode::Begin).word(2).word(0);
        let operand = b.pos() + 1;
        b.op(Opcode::Jmp).word(0);
        b.op(Opcode::End);
        b.op(Opcode::Begin).word(0).word(0);
        let target = b.pos();
        b.op(Opcode::End);
        b.patch(operand, target);
        b.end_marker();

        assert!(matches!(
            convert(&b.build()),
            Err(ConvertError::CrossFunctionJump { .. })
        ));
    }

    #[test]
    fn call_target_must_be_a_function_entry() {
        let mut b = ImageBuilder::new();
        b.op(Opcode::Begin).word(2).word(0);
        let target = b.pos();
        b.op(Opcode::Drop);
        b.op(Opcode::Call).word(target).word(0);
        b.op(Opcode::End);
        b.end_marker();

        assert!(matches!(
            convert(&b.build()),
            Err(ConvertError::NotFunctionEntry { .. })
        ));
    }

    #[test]
    fn address_of_captured_slot_is_rejected() {
        let mut b = ImageBuilder::new();
        b.op(Opcode::CBegin).word(1).word(0);
        b.op(Opcode::Lda(Loc::Captured)).word(0);
        b.op(Opcode::End);
        b.end_marker();

        assert_eq!(
            convert(&b.build()),
            Err(ConvertError::AddressOfCapture { at: 9 })
        );
    }

    #[rstest]
    #[case(Opcode::Ld(Loc::Local), 1)]
    #[case(Opcode::Ld(Loc::Arg), 2)]
    #[case(Opcode::St(Loc::Local), 1)]
    #[case(Opcode::Lda(Loc::Arg), 2)]
    fn out_of_range_slot_indices_are_rejected(#[case] op: Opcode, #[case] index: u32) {
        let mut b = ImageBuilder::new();
        b.op(Opcode::Begin).word(2).word(1);
        b.op(op).word(index);
        b.op(Opcode::End);
        b.end_marker();

        assert!(matches!(
            convert(&b.build()),
            Err(ConvertError::ScopeError { .. })
        ));
    }

    #[test]
    fn locals_outside_a_function_are_rejected() {
        let mut b = ImageBuilder::new();
        b.op(Opcode::Ld(Loc::Local)).word(0);
        b.end_marker();

        assert!(matches!(
            convert(&b.build()),
            Err(ConvertError::ScopeError { .. })
        ));
    }

    #[test]
    fn captured_slots_need_a_closure_prologue() {
        let mut b = ImageBuilder::new();
        b.op(Opcode::Begin).word(2).word(0);
        b.op(Opcode::Ld(Loc::Captured)).word(0);
        b.op(Opcode::End);
        b.end_marker();

        assert!(matches!(
            convert(&b.build()),
            Err(ConvertError::ScopeError { .. })
        ));
    }

    #[test]
    fn global_indices_are_bounds_checked() {
        let mut b = ImageBuilder::new();
        b.set_globals(2);
        b.op(Opcode::Begin).word(2).word(0);
        b.op(Opcode::Ld(Loc::Global)).word(2);
        b.op(Opcode::End);
        b.end_marker();

        assert!(matches!(
            convert(&b.build()),
            Err(ConvertError::ScopeError { .. })
        ));
    }

    #[test]
    fn string_operands_are_bounds_checked() {
        let mut b = ImageBuilder::new();
        b.op(Opcode::Begin).word(2).word(0);
        b.op(Opcode::String).word(100);
        b.op(Opcode::End);
        b.end_marker();

        assert!(matches!(
            convert(&b.build()),
            Err(ConvertError::BadStringIndex { offset: 100, .. })
        ));
    }

    #[test]
    fn jump_targets_are_bounds_checked() {
        let mut b = ImageBuilder::new();
        b.op(Opcode::Begin).word(2).word(0);
        b.op(Opcode::Jmp).word(10_000);
        b.op(Opcode::End);
        b.end_marker();

        assert!(matches!(
            convert(&b.build()),
            Err(ConvertError::BadCodeIndex {
                target: 10_000,
                ..
            })
        ));
    }

    #[test]
    fn unknown_opcodes_defer_to_dispatch() {
        let mut b = ImageBuilder::new();
        b.op(Opcode::Begin).word(2).word(0);
        b.byte(0x7f);
        b.op(Opcode::End);
        b.end_marker();

        let code = convert(&b.build()).unwrap();
        assert_eq!(handler_at(&code, Code::ENTRY + 3), Handler::Unsupported);
    }
}
