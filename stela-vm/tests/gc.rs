//! Collector stress: allocation loops whose live set stays O(1).

mod common;

use common::run_with_heap;
use stela_asm::{Binop, Loc, Opcode};
use stela_vm::heap::Heap;
use stela_vm::util::ImageBuilder;

/// Ten thousand 32-byte strings with only a loop counter live. The heap
/// must stay bounded by a small multiple of the working set, nothing may
/// be corrupted, and the program terminates normally.
#[test]
fn allocation_loop_with_constant_live_set_stays_bounded() {
    let mut b = ImageBuilder::new();
    let garbage = b.string("abcdefghijklmnopqrstuvwxyz012345");
    b.op(Opcode::Begin).word(2).word(1);
    b.op(Opcode::Const).int(10_000);
    b.op(Opcode::St(Loc::Local)).word(0);
    b.op(Opcode::Drop);
    let head = b.pos();
    b.op(Opcode::Ld(Loc::Local)).word(0);
    let to_done = b.pos() + 1;
    b.op(Opcode::CJmpZ).word(0);
    b.op(Opcode::String).word(garbage);
    b.op(Opcode::Drop);
    b.op(Opcode::Ld(Loc::Local)).word(0);
    b.op(Opcode::Const).int(1);
    b.op(Opcode::Binop(Binop::Sub));
    b.op(Opcode::St(Loc::Local)).word(0);
    b.op(Opcode::Drop);
    b.op(Opcode::Jmp).word(head);
    let done = b.pos();
    b.op(Opcode::Ld(Loc::Local)).word(0);
    b.op(Opcode::LWrite);
    b.op(Opcode::End);
    b.patch(to_done, done);
    b.end_marker();

    let (output, capacity) = run_with_heap(&b, "", Heap::with_capacity(1024)).unwrap();
    assert_eq!(output, "0\n");
    // Live data never exceeds one string plus bookkeeping, so the initial
    // buffer must suffice.
    assert_eq!(capacity, 1024);
}

/// A growing accumulator list interleaved with garbage forces both
/// collections and growth without corrupting reachable data.
#[test]
fn growth_under_garbage_preserves_reachable_data() {
    let mut b = ImageBuilder::new();
    let garbage = b.string("0123456789abcdef");
    b.set_globals(1);
    // g0 = [g0, i] built 64 times, with a discarded allocation per step.
    b.op(Opcode::Begin).word(2).word(1);
    b.op(Opcode::Const).int(64);
    b.op(Opcode::St(Loc::Local)).word(0);
    b.op(Opcode::Drop);
    let head = b.pos();
    b.op(Opcode::Ld(Loc::Local)).word(0);
    let to_done = b.pos() + 1;
    b.op(Opcode::CJmpZ).word(0);
    b.op(Opcode::String).word(garbage);
    b.op(Opcode::Drop);
    b.op(Opcode::Ld(Loc::Global)).word(0);
    b.op(Opcode::Ld(Loc::Local)).word(0);
    b.op(Opcode::BArray).word(2);
    b.op(Opcode::St(Loc::Global)).word(0);
    b.op(Opcode::Drop);
    b.op(Opcode::Ld(Loc::Local)).word(0);
    b.op(Opcode::Const).int(1);
    b.op(Opcode::Binop(Binop::Sub));
    b.op(Opcode::St(Loc::Local)).word(0);
    b.op(Opcode::Drop);
    b.op(Opcode::Jmp).word(head);
    let done = b.pos();
    // Walk the spine: the innermost pair carries counter value 64.
    b.op(Opcode::Ld(Loc::Global)).word(0);
    b.op(Opcode::Const).int(0);
    b.op(Opcode::Elem);
    b.op(Opcode::Const).int(0);
    b.op(Opcode::Elem);
    b.op(Opcode::Const).int(1);
    b.op(Opcode::Elem);
    b.op(Opcode::LWrite);
    b.op(Opcode::End);
    b.patch(to_done, done);
    b.end_marker();

    // The spine ends [[[…, 3], 2], 1]; two hops in, the counter reads 3.
    let (output, _) = run_with_heap(&b, "", Heap::with_capacity(256)).unwrap();
    assert_eq!(output, "3\n");
}
