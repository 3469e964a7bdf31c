//! VM parameters

/// Alignment of heap object headers and payloads, in bytes. Keeping both
/// 16-aligned makes every object address 16-aligned, which leaves the low
/// tag bit free and turns interior-pointer detection into a range check.
pub const OBJECT_ALIGN: usize = 16;

/// Size of a heap object header, in bytes.
pub const HEADER_SIZE: usize = 16;

/// First valid heap address. Address zero is reserved for the placeholder
/// value, so the buffer is addressed from a nonzero base.
pub const HEAP_BASE: usize = 16;

/// Initial size of the heap backing buffer, in bytes (both halves).
pub const HEAP_INITIAL_SIZE: usize = 4096;

/// Hard cap on the heap backing buffer. Growth beyond this reports
/// an out-of-memory runtime failure instead of aborting the process.
pub const HEAP_LIMIT: usize = 1 << 30;

/// Number of placeholder values seeded on the operand stack before the
/// top-level routine binds its parameters (`argc`, `argv`, `envp`).
pub const STACK_PLACEHOLDERS: usize = 3;
