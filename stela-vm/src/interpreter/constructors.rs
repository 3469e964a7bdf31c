use stela_asm::Image;

use super::Interpreter;
use crate::code::Code;
use crate::convert::convert;
use crate::error::ConvertError;
use crate::heap::Heap;
use crate::stack::Stack;
use crate::value::Value;

impl<R, W> Interpreter<R, W> {
    /// Convert the image and prepare an interpreter positioned at the
    /// entry slot with a default-sized heap.
    pub fn new(image: Image, input: R, output: W) -> Result<Self, ConvertError> {
        Self::with_heap(image, Heap::default(), input, output)
    }

    /// As [`new`](Self::new), with an explicitly sized heap.
    pub fn with_heap(
        image: Image,
        heap: Heap,
        input: R,
        output: W,
    ) -> Result<Self, ConvertError> {
        let code = convert(&image)?;
        let globals = vec![Value::ZERO; image.global_area_size()];

        Ok(Self {
            image,
            code,
            globals,
            stack: Stack::new(),
            frames: Vec::new(),
            heap,
            ip: Code::ENTRY,
            rip: Code::FINISH_SLOT,
            from_callc: false,
            input,
            output,
        })
    }
}
