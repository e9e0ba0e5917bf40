//! Operand descriptors: where an instruction input or output lives.

use std::fmt;

use regalloc2::VReg;

use crate::kind::ValueKind;

/// Index of a frame slot. The frame layout turns it into a byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StackSlot {
    pub index: u32,
    /// Bytes reserved for the slot.
    pub width: u32,
}

/// Constant operand value. Float payloads are kept as raw bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Immediate {
    I32(i32),
    I64(i64),
    F32(u32),
    F64(u64),
    V128([u8; 16]),
}

impl Immediate {
    pub fn f32(value: f32) -> Self {
        Self::F32(value.to_bits())
    }

    pub fn f64(value: f64) -> Self {
        Self::F64(value.to_bits())
    }

    pub fn v128(value: u128) -> Self {
        Self::V128(value.to_le_bytes())
    }

    /// Value zero-extended to 64 bits, for scalar immediates.
    pub fn as_u64(self) -> Option<u64> {
        match self {
            Self::I32(v) => Some(v as u32 as u64),
            Self::I64(v) => Some(v as u64),
            Self::F32(bits) => Some(bits as u64),
            Self::F64(bits) => Some(bits),
            Self::V128(_) => None,
        }
    }
}

impl fmt::Display for Immediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I32(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::F32(bits) => write!(f, "{:#010x}", bits),
            Self::F64(bits) => write!(f, "{:#018x}", bits),
            Self::V128(bytes) => write!(f, "{:#034x}", u128::from_le_bytes(*bytes)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    /// Virtual register; the allocation map says where it ended up.
    Register(VReg),
    Stack(StackSlot),
    Immediate(Immediate),
}

/// One instruction input or output.
///
/// The kind never changes after construction; only the location is ever
/// resolved, and it is resolved again for every instruction that reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperandDescriptor {
    kind: ValueKind,
    location: Location,
}

impl OperandDescriptor {
    pub const fn new(kind: ValueKind, location: Location) -> Self {
        Self { kind, location }
    }

    pub const fn reg(kind: ValueKind, vreg: VReg) -> Self {
        Self::new(kind, Location::Register(vreg))
    }

    /// Operand in frame slot `index`, sized for its kind.
    pub const fn stack(kind: ValueKind, index: u32) -> Self {
        Self::new(
            kind,
            Location::Stack(StackSlot {
                index,
                width: kind.bytes(),
            }),
        )
    }

    pub fn imm(kind: ValueKind, value: Immediate) -> Self {
        Self::new(kind, Location::Immediate(value))
    }

    pub const fn kind(&self) -> ValueKind {
        self.kind
    }

    pub const fn location(&self) -> Location {
        self.location
    }
}
