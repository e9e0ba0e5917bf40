//! Value kinds carried by operands.
//!
//! A kind is fixed when the decoder builds an operand descriptor. It picks the
//! register file a value lives in and the exact width/layout of every load or
//! store the emitter performs for it.

use std::fmt;

use regalloc2::RegClass;

/// Lane layout of a 128-bit vector value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaneShape {
    I8x16,
    I16x8,
    I32x4,
    I64x2,
    F32x4,
    F64x2,
    /// One opaque 128-bit lane (`v128` bitwise ops, moves, constants).
    Bits,
}

impl LaneShape {
    /// Number of lanes.
    pub const fn lanes(self) -> u32 {
        match self {
            Self::I8x16 => 16,
            Self::I16x8 => 8,
            Self::I32x4 | Self::F32x4 => 4,
            Self::I64x2 | Self::F64x2 => 2,
            Self::Bits => 1,
        }
    }

    /// Width of a single lane in bytes.
    pub const fn lane_bytes(self) -> u32 {
        16 / self.lanes()
    }

    /// log2 of the lane width in bytes: 0 for 8-bit lanes up to 3 for 64-bit.
    pub const fn lane_size_log2(self) -> u32 {
        match self {
            Self::I8x16 => 0,
            Self::I16x8 => 1,
            Self::I32x4 | Self::F32x4 => 2,
            Self::I64x2 | Self::F64x2 => 3,
            Self::Bits => 4,
        }
    }

    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32x4 | Self::F64x2)
    }

    /// Scalar kind of a single lane, `None` for [`LaneShape::Bits`].
    pub const fn lane_kind(self) -> Option<ValueKind> {
        match self {
            Self::I8x16 => Some(ValueKind::I8),
            Self::I16x8 => Some(ValueKind::I16),
            Self::I32x4 => Some(ValueKind::I32),
            Self::I64x2 => Some(ValueKind::I64),
            Self::F32x4 => Some(ValueKind::F32),
            Self::F64x2 => Some(ValueKind::F64),
            Self::Bits => None,
        }
    }
}

impl fmt::Display for LaneShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::I8x16 => "i8x16",
            Self::I16x8 => "i16x8",
            Self::I32x4 => "i32x4",
            Self::I64x2 => "i64x2",
            Self::F32x4 => "f32x4",
            Self::F64x2 => "f64x2",
            Self::Bits => "v128",
        };
        f.write_str(name)
    }
}

/// Kind of an instruction operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    V128(LaneShape),
}

impl ValueKind {
    pub const V128_BITS: ValueKind = ValueKind::V128(LaneShape::Bits);

    /// Register class a value of this kind is allocated in.
    pub const fn reg_class(self) -> RegClass {
        match self {
            Self::I8 | Self::I16 | Self::I32 | Self::I64 => RegClass::Int,
            Self::F32 | Self::F64 => RegClass::Float,
            Self::V128(_) => RegClass::Vector,
        }
    }

    /// Width in bytes of a load or store of this kind.
    pub const fn bytes(self) -> u32 {
        match self {
            Self::I8 => 1,
            Self::I16 => 2,
            Self::I32 | Self::F32 => 4,
            Self::I64 | Self::F64 => 8,
            Self::V128(_) => 16,
        }
    }

    pub const fn is_vector(self) -> bool {
        matches!(self, Self::V128(_))
    }

    pub const fn shape(self) -> Option<LaneShape> {
        match self {
            Self::V128(shape) => Some(shape),
            _ => None,
        }
    }

    /// Whether an operand declared as `self` satisfies a slot that expects
    /// `expected`. Vector shapes are interchangeable: `v128` is one type and
    /// the lane shape only selects the encoding.
    pub fn satisfies(self, expected: ValueKind) -> bool {
        match (self, expected) {
            (Self::V128(_), Self::V128(_)) => true,
            _ => self == expected,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I8 => f.write_str("i8"),
            Self::I16 => f.write_str("i16"),
            Self::I32 => f.write_str("i32"),
            Self::I64 => f.write_str("i64"),
            Self::F32 => f.write_str("f32"),
            Self::F64 => f.write_str("f64"),
            Self::V128(shape) => write!(f, "{shape}"),
        }
    }
}
