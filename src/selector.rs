//! Target-independent opcode classification.
//!
//! Every vector opcode maps to one lowering strategy and a fixed operand
//! signature. Lane width only changes the encoding a target picks, never the
//! strategy. Opcodes missing from the table are unreachable here.

use crate::config::CodegenConfig;
use crate::error::CompileError;
use crate::instruction::{InstImmediate, Instruction, Opcode};
use crate::kind::{LaneShape, ValueKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// `dst = op(a)`
    UnaryVector,
    /// `dst = op(a, b)`
    BinaryVector,
    /// `dst = op(a, b, c)`
    TernaryVector,
    /// `dst = a shifted by a scalar amount`
    ShiftVector,
    /// Scalar replicated into every lane.
    Splat,
    /// One lane out to a scalar.
    ExtractLane,
    /// Vector with one lane replaced by a scalar.
    ReplaceLane,
    /// Vector folded to an `i32` truth value.
    Reduce,
    /// Byte shuffle of two vectors by a constant pattern.
    Shuffle,
    /// Plain copy, including constant materialization.
    Move,
}

/// Strategy and operand kinds for one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub strategy: Strategy,
    sources: [ValueKind; 3],
    arity: usize,
    pub dest: ValueKind,
}

impl Signature {
    fn new(strategy: Strategy, sources: &[ValueKind], dest: ValueKind) -> Self {
        let mut padded = [ValueKind::V128_BITS; 3];
        padded[..sources.len()].copy_from_slice(sources);
        Self {
            strategy,
            sources: padded,
            arity: sources.len(),
            dest,
        }
    }

    pub fn sources(&self) -> &[ValueKind] {
        &self.sources[..self.arity]
    }

    /// Sources plus the destination.
    pub fn operand_count(&self) -> usize {
        self.arity + 1
    }
}

const fn v(shape: LaneShape) -> ValueKind {
    ValueKind::V128(shape)
}

pub fn classify(opcode: Opcode, config: &CodegenConfig) -> Option<Signature> {
    use LaneShape::{Bits, F32x4, F64x2, I8x16, I16x8, I32x4, I64x2};
    use Opcode::*;
    use Strategy::*;

    if opcode.is_relaxed() && !config.relaxed_simd {
        return None;
    }

    let unary = |src: LaneShape, dst: LaneShape| Signature::new(UnaryVector, &[v(src)], v(dst));
    let binary =
        |src: LaneShape, dst: LaneShape| Signature::new(BinaryVector, &[v(src), v(src)], v(dst));
    let ternary =
        |s: LaneShape| Signature::new(TernaryVector, &[v(s), v(s), v(s)], v(s));
    let shift = |s: LaneShape| Signature::new(ShiftVector, &[v(s), ValueKind::I32], v(s));
    let splat = |scalar: ValueKind, s: LaneShape| Signature::new(Splat, &[scalar], v(s));
    let extract = |s: LaneShape, scalar: ValueKind| Signature::new(ExtractLane, &[v(s)], scalar);
    let replace =
        |s: LaneShape, scalar: ValueKind| Signature::new(ReplaceLane, &[v(s), scalar], v(s));
    let reduce = |s: LaneShape| Signature::new(Reduce, &[v(s)], ValueKind::I32);

    let sig = match opcode {
        I32Add | I64Add | F32Abs | F64Min => return None,

        V128Const | V128Move => Signature::new(Move, &[v(Bits)], v(Bits)),
        V128Not => unary(Bits, Bits),
        V128And | V128AndNot | V128Or | V128Xor => binary(Bits, Bits),
        V128Bitselect => ternary(Bits),
        V128AnyTrue => reduce(Bits),

        I8x16Splat => splat(ValueKind::I32, I8x16),
        I8x16ExtractLaneS | I8x16ExtractLaneU => extract(I8x16, ValueKind::I32),
        I8x16ReplaceLane => replace(I8x16, ValueKind::I32),
        I8x16Shuffle => Signature::new(Shuffle, &[v(I8x16), v(I8x16)], v(I8x16)),
        I8x16Abs | I8x16Neg | I8x16Popcnt => unary(I8x16, I8x16),
        I8x16AllTrue => reduce(I8x16),
        I8x16NarrowI16x8S | I8x16NarrowI16x8U => binary(I16x8, I8x16),
        I8x16Shl | I8x16ShrS | I8x16ShrU => shift(I8x16),
        I8x16Swizzle | I8x16RelaxedSwizzle | I8x16Add | I8x16AddSatS | I8x16AddSatU
        | I8x16Sub | I8x16SubSatS | I8x16SubSatU | I8x16Eq | I8x16Ne | I8x16LtS | I8x16LtU
        | I8x16GtS | I8x16GtU | I8x16LeS | I8x16LeU | I8x16GeS | I8x16GeU | I8x16MinS
        | I8x16MinU | I8x16MaxS | I8x16MaxU | I8x16AvgrU => binary(I8x16, I8x16),
        I8x16RelaxedLaneselect => ternary(I8x16),

        I16x8Splat => splat(ValueKind::I32, I16x8),
        I16x8ExtractLaneS | I16x8ExtractLaneU => extract(I16x8, ValueKind::I32),
        I16x8ReplaceLane => replace(I16x8, ValueKind::I32),
        I16x8Abs | I16x8Neg => unary(I16x8, I16x8),
        I16x8AllTrue => reduce(I16x8),
        I16x8ExtaddPairwiseI8x16S | I16x8ExtaddPairwiseI8x16U | I16x8ExtendLowI8x16S
        | I16x8ExtendHighI8x16S | I16x8ExtendLowI8x16U | I16x8ExtendHighI8x16U => {
            unary(I8x16, I16x8)
        }
        I16x8NarrowI32x4S | I16x8NarrowI32x4U => binary(I32x4, I16x8),
        I16x8Shl | I16x8ShrS | I16x8ShrU => shift(I16x8),
        I16x8Add | I16x8AddSatS | I16x8AddSatU | I16x8Sub | I16x8SubSatS | I16x8SubSatU
        | I16x8Mul | I16x8Eq | I16x8Ne | I16x8LtS | I16x8LtU | I16x8GtS | I16x8GtU
        | I16x8LeS | I16x8LeU | I16x8GeS | I16x8GeU | I16x8MinS | I16x8MinU | I16x8MaxS
        | I16x8MaxU | I16x8AvgrU | I16x8Q15mulrSatS | I16x8RelaxedQ15mulrS => {
            binary(I16x8, I16x8)
        }
        I16x8ExtmulLowI8x16S | I16x8ExtmulHighI8x16S | I16x8ExtmulLowI8x16U
        | I16x8ExtmulHighI8x16U | I16x8RelaxedDotI8x16I7x16S => binary(I8x16, I16x8),
        I16x8RelaxedLaneselect => ternary(I16x8),

        I32x4Splat => splat(ValueKind::I32, I32x4),
        I32x4ExtractLane => extract(I32x4, ValueKind::I32),
        I32x4ReplaceLane => replace(I32x4, ValueKind::I32),
        I32x4Abs | I32x4Neg => unary(I32x4, I32x4),
        I32x4AllTrue => reduce(I32x4),
        I32x4ExtaddPairwiseI16x8S | I32x4ExtaddPairwiseI16x8U | I32x4ExtendLowI16x8S
        | I32x4ExtendHighI16x8S | I32x4ExtendLowI16x8U | I32x4ExtendHighI16x8U => {
            unary(I16x8, I32x4)
        }
        I32x4TruncSatF32x4S | I32x4TruncSatF32x4U | I32x4RelaxedTruncF32x4S
        | I32x4RelaxedTruncF32x4U => unary(F32x4, I32x4),
        I32x4TruncSatF64x2SZero | I32x4TruncSatF64x2UZero | I32x4RelaxedTruncF64x2SZero
        | I32x4RelaxedTruncF64x2UZero => unary(F64x2, I32x4),
        I32x4Shl | I32x4ShrS | I32x4ShrU => shift(I32x4),
        I32x4Add | I32x4Sub | I32x4Mul | I32x4Eq | I32x4Ne | I32x4LtS | I32x4LtU | I32x4GtS
        | I32x4GtU | I32x4LeS | I32x4LeU | I32x4GeS | I32x4GeU | I32x4MinS | I32x4MinU
        | I32x4MaxS | I32x4MaxU => binary(I32x4, I32x4),
        I32x4DotI16x8S | I32x4ExtmulLowI16x8S | I32x4ExtmulHighI16x8S
        | I32x4ExtmulLowI16x8U | I32x4ExtmulHighI16x8U => binary(I16x8, I32x4),
        I32x4RelaxedDotI8x16I7x16AddS => {
            Signature::new(TernaryVector, &[v(I8x16), v(I8x16), v(I32x4)], v(I32x4))
        }
        I32x4RelaxedLaneselect => ternary(I32x4),

        I64x2Splat => splat(ValueKind::I64, I64x2),
        I64x2ExtractLane => extract(I64x2, ValueKind::I64),
        I64x2ReplaceLane => replace(I64x2, ValueKind::I64),
        I64x2Abs | I64x2Neg => unary(I64x2, I64x2),
        I64x2AllTrue => reduce(I64x2),
        I64x2ExtendLowI32x4S | I64x2ExtendHighI32x4S | I64x2ExtendLowI32x4U
        | I64x2ExtendHighI32x4U => unary(I32x4, I64x2),
        I64x2Shl | I64x2ShrS | I64x2ShrU => shift(I64x2),
        I64x2Add | I64x2Sub | I64x2Mul | I64x2Eq | I64x2Ne | I64x2LtS | I64x2GtS | I64x2LeS
        | I64x2GeS => binary(I64x2, I64x2),
        I64x2ExtmulLowI32x4S | I64x2ExtmulHighI32x4S | I64x2ExtmulLowI32x4U
        | I64x2ExtmulHighI32x4U => binary(I32x4, I64x2),
        I64x2RelaxedLaneselect => ternary(I64x2),

        F32x4Splat => splat(ValueKind::F32, F32x4),
        F32x4ExtractLane => extract(F32x4, ValueKind::F32),
        F32x4ReplaceLane => replace(F32x4, ValueKind::F32),
        F32x4Abs | F32x4Neg | F32x4Sqrt | F32x4Ceil | F32x4Floor | F32x4Trunc
        | F32x4Nearest => unary(F32x4, F32x4),
        F32x4ConvertI32x4S | F32x4ConvertI32x4U => unary(I32x4, F32x4),
        F32x4DemoteF64x2Zero => unary(F64x2, F32x4),
        F32x4Add | F32x4Sub | F32x4Mul | F32x4Div | F32x4Min | F32x4Max | F32x4Pmin
        | F32x4Pmax | F32x4Eq | F32x4Ne | F32x4Lt | F32x4Gt | F32x4Le | F32x4Ge
        | F32x4RelaxedMin | F32x4RelaxedMax => binary(F32x4, F32x4),
        F32x4RelaxedMadd | F32x4RelaxedNmadd => ternary(F32x4),

        F64x2Splat => splat(ValueKind::F64, F64x2),
        F64x2ExtractLane => extract(F64x2, ValueKind::F64),
        F64x2ReplaceLane => replace(F64x2, ValueKind::F64),
        F64x2Abs | F64x2Neg | F64x2Sqrt | F64x2Ceil | F64x2Floor | F64x2Trunc
        | F64x2Nearest => unary(F64x2, F64x2),
        F64x2ConvertLowI32x4S | F64x2ConvertLowI32x4U => unary(I32x4, F64x2),
        F64x2PromoteLowF32x4 => unary(F32x4, F64x2),
        F64x2Add | F64x2Sub | F64x2Mul | F64x2Div | F64x2Min | F64x2Max | F64x2Pmin
        | F64x2Pmax | F64x2Eq | F64x2Ne | F64x2Lt | F64x2Gt | F64x2Le | F64x2Ge
        | F64x2RelaxedMin | F64x2RelaxedMax => binary(F64x2, F64x2),
        F64x2RelaxedMadd | F64x2RelaxedNmadd => ternary(F64x2),
    };
    Some(sig)
}

/// Check operand count and instruction immediates, plus operand kinds when
/// `verify_operand_kinds` is set.
pub fn check_operands(
    instr: &Instruction,
    sig: &Signature,
    config: &CodegenConfig,
) -> Result<(), CompileError> {
    let opcode = instr.opcode;
    if instr.operands.len() != sig.operand_count() {
        return Err(CompileError::OperandCount {
            opcode,
            expected: sig.operand_count(),
            found: instr.operands.len(),
        });
    }

    match sig.strategy {
        Strategy::ExtractLane | Strategy::ReplaceLane => {
            let lanes = sig.sources()[0].shape().map_or(1, LaneShape::lanes);
            match instr.immediate {
                Some(InstImmediate::Lane(lane)) if u32::from(lane) < lanes => {}
                _ => return Err(CompileError::BadImmediate { opcode }),
            }
        }
        Strategy::Shuffle => match instr.immediate {
            Some(InstImmediate::Shuffle(pattern)) if pattern.iter().all(|&b| b < 32) => {}
            _ => return Err(CompileError::BadImmediate { opcode }),
        },
        _ => {}
    }

    if config.verify_operand_kinds {
        let expected = sig.sources().iter().chain(std::iter::once(&sig.dest));
        for (index, (desc, &expected)) in instr.operands.iter().zip(expected).enumerate() {
            if !desc.kind().satisfies(expected) {
                return Err(CompileError::OperandKind {
                    opcode,
                    index,
                    expected,
                    found: desc.kind(),
                });
            }
        }
    }
    Ok(())
}
