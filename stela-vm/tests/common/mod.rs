//! Shared harness: run a built image against in-memory channels.

// Each integration-test target uses its own subset of these helpers.
#![allow(dead_code)]

use stela_vm::error::RuntimeError;
use stela_vm::heap::Heap;
use stela_vm::interpreter::Interpreter;
use stela_vm::util::ImageBuilder;

/// Run the built program with `input` on stdin; return its stdout.
pub fn run(builder: &ImageBuilder, input: &str) -> Result<String, RuntimeError> {
    run_with_heap(builder, input, Heap::default()).map(|(output, _)| output)
}

/// As [`run`], with an explicit heap; also reports the final heap capacity.
pub fn run_with_heap(
    builder: &ImageBuilder,
    input: &str,
    heap: Heap,
) -> Result<(String, usize), RuntimeError> {
    let mut output = Vec::new();

    let mut vm = Interpreter::with_heap(builder.build(), heap, input.as_bytes(), &mut output)
        .expect("program converts");
    let result = vm.run();
    let capacity = vm.heap().capacity();
    drop(vm);

    result.map(|()| {
        (
            String::from_utf8(output).expect("output is ASCII"),
            capacity,
        )
    })
}

/// Run a program expected to succeed.
pub fn run_ok(builder: &ImageBuilder, input: &str) -> String {
    run(builder, input).expect("program runs to completion")
}
