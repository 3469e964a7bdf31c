/// Variable-location designator used by `LD`/`LDA`/`ST` and by closure
/// capture lists.
///
/// The two-bit wire code doubles as the low nibble of the load/store opcode
/// bytes and as the per-capture entry in `CLOSURE` location bitmaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[repr(u8)]
pub enum Loc {
    /// A slot of the global area.
    Global = 0,
    /// A local slot of the current activation.
    Local = 1,
    /// An argument slot of the current activation.
    Arg = 2,
    /// A captured slot of the current closure.
    Captured = 3,
}

impl Loc {
    /// Decode the two-bit wire code.
    pub const fn from_wire(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Global),
            1 => Some(Self::Local),
            2 => Some(Self::Arg),
            3 => Some(Self::Captured),
            _ => None,
        }
    }

    /// The two-bit wire code of this designator.
    pub const fn wire(self) -> u32 {
        self as u32
    }
}
