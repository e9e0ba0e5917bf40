//! Decoded instructions as they reach the vector lowering.

use std::fmt;

use smallvec::SmallVec;

use crate::operand::OperandDescriptor;

macro_rules! opcodes {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        /// Every opcode the decoder can hand to the backend.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Opcode {
            $($(#[$meta])* $name),*
        }

        impl Opcode {
            pub const ALL: &'static [Opcode] = &[$(Opcode::$name),*];
        }
    };
}

opcodes! {
    // Scalar families are lowered by the scalar backend. They are listed so
    // a misrouted instruction is reported instead of silently miscompiled.
    I32Add,
    I64Add,
    F32Abs,
    F64Min,

    V128Const,
    V128Move,
    V128Not,
    V128And,
    V128AndNot,
    V128Or,
    V128Xor,
    V128Bitselect,
    V128AnyTrue,

    I8x16Splat,
    I8x16ExtractLaneS,
    I8x16ExtractLaneU,
    I8x16ReplaceLane,
    I8x16Shuffle,
    I8x16Swizzle,
    I8x16Abs,
    I8x16Neg,
    I8x16Popcnt,
    I8x16AllTrue,
    I8x16NarrowI16x8S,
    I8x16NarrowI16x8U,
    I8x16Shl,
    I8x16ShrS,
    I8x16ShrU,
    I8x16Add,
    I8x16AddSatS,
    I8x16AddSatU,
    I8x16Sub,
    I8x16SubSatS,
    I8x16SubSatU,
    I8x16Eq,
    I8x16Ne,
    I8x16LtS,
    I8x16LtU,
    I8x16GtS,
    I8x16GtU,
    I8x16LeS,
    I8x16LeU,
    I8x16GeS,
    I8x16GeU,
    I8x16MinS,
    I8x16MinU,
    I8x16MaxS,
    I8x16MaxU,
    I8x16AvgrU,
    I8x16RelaxedSwizzle,
    I8x16RelaxedLaneselect,

    I16x8Splat,
    I16x8ExtractLaneS,
    I16x8ExtractLaneU,
    I16x8ReplaceLane,
    I16x8Abs,
    I16x8Neg,
    I16x8AllTrue,
    I16x8ExtaddPairwiseI8x16S,
    I16x8ExtaddPairwiseI8x16U,
    I16x8ExtendLowI8x16S,
    I16x8ExtendHighI8x16S,
    I16x8ExtendLowI8x16U,
    I16x8ExtendHighI8x16U,
    I16x8NarrowI32x4S,
    I16x8NarrowI32x4U,
    I16x8Shl,
    I16x8ShrS,
    I16x8ShrU,
    I16x8Add,
    I16x8AddSatS,
    I16x8AddSatU,
    I16x8Sub,
    I16x8SubSatS,
    I16x8SubSatU,
    I16x8Mul,
    I16x8Eq,
    I16x8Ne,
    I16x8LtS,
    I16x8LtU,
    I16x8GtS,
    I16x8GtU,
    I16x8LeS,
    I16x8LeU,
    I16x8GeS,
    I16x8GeU,
    I16x8MinS,
    I16x8MinU,
    I16x8MaxS,
    I16x8MaxU,
    I16x8AvgrU,
    I16x8Q15mulrSatS,
    I16x8ExtmulLowI8x16S,
    I16x8ExtmulHighI8x16S,
    I16x8ExtmulLowI8x16U,
    I16x8ExtmulHighI8x16U,
    I16x8RelaxedQ15mulrS,
    I16x8RelaxedDotI8x16I7x16S,
    I16x8RelaxedLaneselect,

    I32x4Splat,
    I32x4ExtractLane,
    I32x4ReplaceLane,
    I32x4Abs,
    I32x4Neg,
    I32x4AllTrue,
    I32x4ExtaddPairwiseI16x8S,
    I32x4ExtaddPairwiseI16x8U,
    I32x4ExtendLowI16x8S,
    I32x4ExtendHighI16x8S,
    I32x4ExtendLowI16x8U,
    I32x4ExtendHighI16x8U,
    I32x4Shl,
    I32x4ShrS,
    I32x4ShrU,
    I32x4Add,
    I32x4Sub,
    I32x4Mul,
    I32x4Eq,
    I32x4Ne,
    I32x4LtS,
    I32x4LtU,
    I32x4GtS,
    I32x4GtU,
    I32x4LeS,
    I32x4LeU,
    I32x4GeS,
    I32x4GeU,
    I32x4MinS,
    I32x4MinU,
    I32x4MaxS,
    I32x4MaxU,
    I32x4DotI16x8S,
    I32x4ExtmulLowI16x8S,
    I32x4ExtmulHighI16x8S,
    I32x4ExtmulLowI16x8U,
    I32x4ExtmulHighI16x8U,
    I32x4TruncSatF32x4S,
    I32x4TruncSatF32x4U,
    I32x4TruncSatF64x2SZero,
    I32x4TruncSatF64x2UZero,
    I32x4RelaxedTruncF32x4S,
    I32x4RelaxedTruncF32x4U,
    I32x4RelaxedTruncF64x2SZero,
    I32x4RelaxedTruncF64x2UZero,
    I32x4RelaxedDotI8x16I7x16AddS,
    I32x4RelaxedLaneselect,

    I64x2Splat,
    I64x2ExtractLane,
    I64x2ReplaceLane,
    I64x2Abs,
    I64x2Neg,
    I64x2AllTrue,
    I64x2ExtendLowI32x4S,
    I64x2ExtendHighI32x4S,
    I64x2ExtendLowI32x4U,
    I64x2ExtendHighI32x4U,
    I64x2Shl,
    I64x2ShrS,
    I64x2ShrU,
    I64x2Add,
    I64x2Sub,
    I64x2Mul,
    I64x2Eq,
    I64x2Ne,
    I64x2LtS,
    I64x2GtS,
    I64x2LeS,
    I64x2GeS,
    I64x2ExtmulLowI32x4S,
    I64x2ExtmulHighI32x4S,
    I64x2ExtmulLowI32x4U,
    I64x2ExtmulHighI32x4U,
    I64x2RelaxedLaneselect,

    F32x4Splat,
    F32x4ExtractLane,
    F32x4ReplaceLane,
    F32x4Abs,
    F32x4Neg,
    F32x4Sqrt,
    F32x4Ceil,
    F32x4Floor,
    F32x4Trunc,
    F32x4Nearest,
    F32x4Add,
    F32x4Sub,
    F32x4Mul,
    F32x4Div,
    F32x4Min,
    F32x4Max,
    F32x4Pmin,
    F32x4Pmax,
    F32x4Eq,
    F32x4Ne,
    F32x4Lt,
    F32x4Gt,
    F32x4Le,
    F32x4Ge,
    F32x4ConvertI32x4S,
    F32x4ConvertI32x4U,
    F32x4DemoteF64x2Zero,
    F32x4RelaxedMadd,
    F32x4RelaxedNmadd,
    F32x4RelaxedMin,
    F32x4RelaxedMax,

    F64x2Splat,
    F64x2ExtractLane,
    F64x2ReplaceLane,
    F64x2Abs,
    F64x2Neg,
    F64x2Sqrt,
    F64x2Ceil,
    F64x2Floor,
    F64x2Trunc,
    F64x2Nearest,
    F64x2Add,
    F64x2Sub,
    F64x2Mul,
    F64x2Div,
    F64x2Min,
    F64x2Max,
    F64x2Pmin,
    F64x2Pmax,
    F64x2Eq,
    F64x2Ne,
    F64x2Lt,
    F64x2Gt,
    F64x2Le,
    F64x2Ge,
    F64x2ConvertLowI32x4S,
    F64x2ConvertLowI32x4U,
    F64x2PromoteLowF32x4,
    F64x2RelaxedMadd,
    F64x2RelaxedNmadd,
    F64x2RelaxedMin,
    F64x2RelaxedMax,
}

impl Opcode {
    /// Opcodes from the relaxed-simd proposal.
    pub fn is_relaxed(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            I8x16RelaxedSwizzle
                | I8x16RelaxedLaneselect
                | I16x8RelaxedQ15mulrS
                | I16x8RelaxedDotI8x16I7x16S
                | I16x8RelaxedLaneselect
                | I32x4RelaxedTruncF32x4S
                | I32x4RelaxedTruncF32x4U
                | I32x4RelaxedTruncF64x2SZero
                | I32x4RelaxedTruncF64x2UZero
                | I32x4RelaxedDotI8x16I7x16AddS
                | I32x4RelaxedLaneselect
                | I64x2RelaxedLaneselect
                | F32x4RelaxedMadd
                | F32x4RelaxedNmadd
                | F32x4RelaxedMin
                | F32x4RelaxedMax
                | F64x2RelaxedMadd
                | F64x2RelaxedNmadd
                | F64x2RelaxedMin
                | F64x2RelaxedMax
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Immediate carried by the instruction itself rather than by an operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstImmediate {
    Lane(u8),
    Shuffle([u8; 16]),
}

/// A validated instruction: sources first, destination last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: SmallVec<[OperandDescriptor; 4]>,
    pub immediate: Option<InstImmediate>,
}

impl Instruction {
    pub fn new(opcode: Opcode, operands: impl IntoIterator<Item = OperandDescriptor>) -> Self {
        Self {
            opcode,
            operands: operands.into_iter().collect(),
            immediate: None,
        }
    }

    pub fn with_lane(mut self, lane: u8) -> Self {
        self.immediate = Some(InstImmediate::Lane(lane));
        self
    }

    pub fn with_shuffle(mut self, pattern: [u8; 16]) -> Self {
        self.immediate = Some(InstImmediate::Shuffle(pattern));
        self
    }

    pub fn lane(&self) -> Option<u8> {
        match self.immediate {
            Some(InstImmediate::Lane(lane)) => Some(lane),
            _ => None,
        }
    }

    pub fn shuffle(&self) -> Option<[u8; 16]> {
        match self.immediate {
            Some(InstImmediate::Shuffle(pattern)) => Some(pattern),
            _ => None,
        }
    }
}
