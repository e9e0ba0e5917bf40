//! Per-opcode AArch64 recipes.

use super::encoding::{RawOp, Template as T};
use crate::instruction::Opcode;
use crate::kind::LaneShape;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftKind {
    Left,
    RightSigned,
    RightUnsigned,
}

/// How one opcode turns into machine instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipe {
    /// `op dst, a[, b]`
    Op(RawOp),
    /// `op dst, b, a`
    Swapped(RawOp),
    /// `op dst, a, b` then `not dst, dst`
    Inverted(RawOp),
    /// `first dst, a` then `second dst, dst`
    Chain(RawOp, RawOp),
    /// `op dst, a` into the low half, `op2 dst, b` into the high half
    Narrow(RawOp),
    /// `fcmgt` mask then `bsl`
    PseudoMinMax { cmp: RawOp, max: bool },
    I64x2Mul,
    /// Widening multiply, pairwise add, narrow; `dest` is the result shape.
    Dot(LaneShape),
    /// 8-bit four-way dot product accumulated into 32-bit lanes.
    DotAdd,
    /// `dst = c` then `op dst, a, b`
    Accumulate(RawOp),
    Shift { shape: LaneShape, kind: ShiftKind },
    Splat(LaneShape),
    ExtractLane { shape: LaneShape, signed: bool },
    ReplaceLane(LaneShape),
    AllTrue(LaneShape),
    AnyTrue,
    Shuffle,
    Move,
}

impl Recipe {
    /// Writes `dst` before it has read every source.
    pub fn clobbers_early(self) -> bool {
        matches!(
            self,
            Recipe::Narrow(_) | Recipe::PseudoMinMax { .. } | Recipe::I64x2Mul
        )
    }
}

/// `sxtl`/`uxtl` from lanes of `src`.
const fn widen(t: T, src: LaneShape) -> RawOp {
    t.op().with(1 << (19 + src.lane_size_log2()))
}

pub fn recipe(opcode: Opcode) -> Option<Recipe> {
    use LaneShape::{F32x4, F64x2, I8x16, I16x8, I32x4, I64x2};
    use Opcode::*;
    use Recipe::*;

    let shift = |shape, kind| Shift { shape, kind };
    let extract = |shape, signed| ExtractLane { shape, signed };

    let r = match opcode {
        I32Add | I64Add | F32Abs | F64Min => return None,

        V128Const | V128Move => Move,
        V128Not => Op(T::Not.op()),
        V128And => Op(T::And.op()),
        V128AndNot => Op(T::Bic.op()),
        V128Or => Op(T::Orr.op()),
        V128Xor => Op(T::Eor.op()),
        V128Bitselect | I8x16RelaxedLaneselect | I16x8RelaxedLaneselect
        | I32x4RelaxedLaneselect | I64x2RelaxedLaneselect => Accumulate(T::Bsl.op()),
        V128AnyTrue => AnyTrue,

        I8x16Splat => Splat(I8x16),
        I8x16ExtractLaneS => extract(I8x16, true),
        I8x16ExtractLaneU => extract(I8x16, false),
        I8x16ReplaceLane => ReplaceLane(I8x16),
        I8x16Shuffle => Shuffle,
        I8x16Swizzle | I8x16RelaxedSwizzle => Op(T::Tbl.op()),
        I8x16Abs => Op(T::Abs.size(I8x16)),
        I8x16Neg => Op(T::Neg.size(I8x16)),
        I8x16Popcnt => Op(T::Cnt.size(I8x16)),
        I8x16AllTrue => AllTrue(I8x16),
        I8x16NarrowI16x8S => Narrow(T::Sqxtn.size(I8x16)),
        I8x16NarrowI16x8U => Narrow(T::Sqxtun.size(I8x16)),
        I8x16Shl => shift(I8x16, ShiftKind::Left),
        I8x16ShrS => shift(I8x16, ShiftKind::RightSigned),
        I8x16ShrU => shift(I8x16, ShiftKind::RightUnsigned),
        I8x16Add => Op(T::Add.size(I8x16)),
        I8x16AddSatS => Op(T::Sqadd.size(I8x16)),
        I8x16AddSatU => Op(T::Uqadd.size(I8x16)),
        I8x16Sub => Op(T::Sub.size(I8x16)),
        I8x16SubSatS => Op(T::Sqsub.size(I8x16)),
        I8x16SubSatU => Op(T::Uqsub.size(I8x16)),
        I8x16Eq => Op(T::Cmeq.size(I8x16)),
        I8x16Ne => Inverted(T::Cmeq.size(I8x16)),
        I8x16LtS => Swapped(T::Cmgt.size(I8x16)),
        I8x16LtU => Swapped(T::Cmhi.size(I8x16)),
        I8x16GtS => Op(T::Cmgt.size(I8x16)),
        I8x16GtU => Op(T::Cmhi.size(I8x16)),
        I8x16LeS => Swapped(T::Cmge.size(I8x16)),
        I8x16LeU => Swapped(T::Cmhs.size(I8x16)),
        I8x16GeS => Op(T::Cmge.size(I8x16)),
        I8x16GeU => Op(T::Cmhs.size(I8x16)),
        I8x16MinS => Op(T::Smin.size(I8x16)),
        I8x16MinU => Op(T::Umin.size(I8x16)),
        I8x16MaxS => Op(T::Smax.size(I8x16)),
        I8x16MaxU => Op(T::Umax.size(I8x16)),
        I8x16AvgrU => Op(T::Urhadd.size(I8x16)),

        I16x8Splat => Splat(I16x8),
        I16x8ExtractLaneS => extract(I16x8, true),
        I16x8ExtractLaneU => extract(I16x8, false),
        I16x8ReplaceLane => ReplaceLane(I16x8),
        I16x8Abs => Op(T::Abs.size(I16x8)),
        I16x8Neg => Op(T::Neg.size(I16x8)),
        I16x8AllTrue => AllTrue(I16x8),
        I16x8ExtaddPairwiseI8x16S => Op(T::Saddlp.size(I8x16)),
        I16x8ExtaddPairwiseI8x16U => Op(T::Uaddlp.size(I8x16)),
        I16x8ExtendLowI8x16S => Op(widen(T::Sxtl, I8x16)),
        I16x8ExtendHighI8x16S => Op(widen(T::Sxtl, I8x16).upper()),
        I16x8ExtendLowI8x16U => Op(widen(T::Uxtl, I8x16)),
        I16x8ExtendHighI8x16U => Op(widen(T::Uxtl, I8x16).upper()),
        I16x8NarrowI32x4S => Narrow(T::Sqxtn.size(I16x8)),
        I16x8NarrowI32x4U => Narrow(T::Sqxtun.size(I16x8)),
        I16x8Shl => shift(I16x8, ShiftKind::Left),
        I16x8ShrS => shift(I16x8, ShiftKind::RightSigned),
        I16x8ShrU => shift(I16x8, ShiftKind::RightUnsigned),
        I16x8Add => Op(T::Add.size(I16x8)),
        I16x8AddSatS => Op(T::Sqadd.size(I16x8)),
        I16x8AddSatU => Op(T::Uqadd.size(I16x8)),
        I16x8Sub => Op(T::Sub.size(I16x8)),
        I16x8SubSatS => Op(T::Sqsub.size(I16x8)),
        I16x8SubSatU => Op(T::Uqsub.size(I16x8)),
        I16x8Mul => Op(T::Mul.size(I16x8)),
        I16x8Eq => Op(T::Cmeq.size(I16x8)),
        I16x8Ne => Inverted(T::Cmeq.size(I16x8)),
        I16x8LtS => Swapped(T::Cmgt.size(I16x8)),
        I16x8LtU => Swapped(T::Cmhi.size(I16x8)),
        I16x8GtS => Op(T::Cmgt.size(I16x8)),
        I16x8GtU => Op(T::Cmhi.size(I16x8)),
        I16x8LeS => Swapped(T::Cmge.size(I16x8)),
        I16x8LeU => Swapped(T::Cmhs.size(I16x8)),
        I16x8GeS => Op(T::Cmge.size(I16x8)),
        I16x8GeU => Op(T::Cmhs.size(I16x8)),
        I16x8MinS => Op(T::Smin.size(I16x8)),
        I16x8MinU => Op(T::Umin.size(I16x8)),
        I16x8MaxS => Op(T::Smax.size(I16x8)),
        I16x8MaxU => Op(T::Umax.size(I16x8)),
        I16x8AvgrU => Op(T::Urhadd.size(I16x8)),
        I16x8Q15mulrSatS | I16x8RelaxedQ15mulrS => Op(T::Sqrdmulh.size(I16x8)),
        I16x8ExtmulLowI8x16S => Op(T::Smull.size(I8x16)),
        I16x8ExtmulHighI8x16S => Op(T::Smull.size(I8x16).upper()),
        I16x8ExtmulLowI8x16U => Op(T::Umull.size(I8x16)),
        I16x8ExtmulHighI8x16U => Op(T::Umull.size(I8x16).upper()),
        I16x8RelaxedDotI8x16I7x16S => Dot(I16x8),

        I32x4Splat => Splat(I32x4),
        I32x4ExtractLane => extract(I32x4, false),
        I32x4ReplaceLane => ReplaceLane(I32x4),
        I32x4Abs => Op(T::Abs.size(I32x4)),
        I32x4Neg => Op(T::Neg.size(I32x4)),
        I32x4AllTrue => AllTrue(I32x4),
        I32x4ExtaddPairwiseI16x8S => Op(T::Saddlp.size(I16x8)),
        I32x4ExtaddPairwiseI16x8U => Op(T::Uaddlp.size(I16x8)),
        I32x4ExtendLowI16x8S => Op(widen(T::Sxtl, I16x8)),
        I32x4ExtendHighI16x8S => Op(widen(T::Sxtl, I16x8).upper()),
        I32x4ExtendLowI16x8U => Op(widen(T::Uxtl, I16x8)),
        I32x4ExtendHighI16x8U => Op(widen(T::Uxtl, I16x8).upper()),
        I32x4Shl => shift(I32x4, ShiftKind::Left),
        I32x4ShrS => shift(I32x4, ShiftKind::RightSigned),
        I32x4ShrU => shift(I32x4, ShiftKind::RightUnsigned),
        I32x4Add => Op(T::Add.size(I32x4)),
        I32x4Sub => Op(T::Sub.size(I32x4)),
        I32x4Mul => Op(T::Mul.size(I32x4)),
        I32x4Eq => Op(T::Cmeq.size(I32x4)),
        I32x4Ne => Inverted(T::Cmeq.size(I32x4)),
        I32x4LtS => Swapped(T::Cmgt.size(I32x4)),
        I32x4LtU => Swapped(T::Cmhi.size(I32x4)),
        I32x4GtS => Op(T::Cmgt.size(I32x4)),
        I32x4GtU => Op(T::Cmhi.size(I32x4)),
        I32x4LeS => Swapped(T::Cmge.size(I32x4)),
        I32x4LeU => Swapped(T::Cmhs.size(I32x4)),
        I32x4GeS => Op(T::Cmge.size(I32x4)),
        I32x4GeU => Op(T::Cmhs.size(I32x4)),
        I32x4MinS => Op(T::Smin.size(I32x4)),
        I32x4MinU => Op(T::Umin.size(I32x4)),
        I32x4MaxS => Op(T::Smax.size(I32x4)),
        I32x4MaxU => Op(T::Umax.size(I32x4)),
        I32x4DotI16x8S => Dot(I32x4),
        I32x4ExtmulLowI16x8S => Op(T::Smull.size(I16x8)),
        I32x4ExtmulHighI16x8S => Op(T::Smull.size(I16x8).upper()),
        I32x4ExtmulLowI16x8U => Op(T::Umull.size(I16x8)),
        I32x4ExtmulHighI16x8U => Op(T::Umull.size(I16x8).upper()),
        I32x4TruncSatF32x4S | I32x4RelaxedTruncF32x4S => Op(T::Fcvtzs.size(F32x4)),
        I32x4TruncSatF32x4U | I32x4RelaxedTruncF32x4U => Op(T::Fcvtzu.size(F32x4)),
        I32x4TruncSatF64x2SZero | I32x4RelaxedTruncF64x2SZero => {
            Chain(T::Fcvtzs.size(F64x2), T::Sqxtn.size(I32x4))
        }
        I32x4TruncSatF64x2UZero | I32x4RelaxedTruncF64x2UZero => {
            Chain(T::Fcvtzu.size(F64x2), T::Uqxtn.size(I32x4))
        }
        I32x4RelaxedDotI8x16I7x16AddS => DotAdd,

        I64x2Splat => Splat(I64x2),
        I64x2ExtractLane => extract(I64x2, false),
        I64x2ReplaceLane => ReplaceLane(I64x2),
        I64x2Abs => Op(T::Abs.size(I64x2)),
        I64x2Neg => Op(T::Neg.size(I64x2)),
        I64x2AllTrue => AllTrue(I64x2),
        I64x2ExtendLowI32x4S => Op(widen(T::Sxtl, I32x4)),
        I64x2ExtendHighI32x4S => Op(widen(T::Sxtl, I32x4).upper()),
        I64x2ExtendLowI32x4U => Op(widen(T::Uxtl, I32x4)),
        I64x2ExtendHighI32x4U => Op(widen(T::Uxtl, I32x4).upper()),
        I64x2Shl => shift(I64x2, ShiftKind::Left),
        I64x2ShrS => shift(I64x2, ShiftKind::RightSigned),
        I64x2ShrU => shift(I64x2, ShiftKind::RightUnsigned),
        I64x2Add => Op(T::Add.size(I64x2)),
        I64x2Sub => Op(T::Sub.size(I64x2)),
        Opcode::I64x2Mul => Recipe::I64x2Mul,
        I64x2Eq => Op(T::Cmeq.size(I64x2)),
        I64x2Ne => Inverted(T::Cmeq.size(I64x2)),
        I64x2LtS => Swapped(T::Cmgt.size(I64x2)),
        I64x2GtS => Op(T::Cmgt.size(I64x2)),
        I64x2LeS => Swapped(T::Cmge.size(I64x2)),
        I64x2GeS => Op(T::Cmge.size(I64x2)),
        I64x2ExtmulLowI32x4S => Op(T::Smull.size(I32x4)),
        I64x2ExtmulHighI32x4S => Op(T::Smull.size(I32x4).upper()),
        I64x2ExtmulLowI32x4U => Op(T::Umull.size(I32x4)),
        I64x2ExtmulHighI32x4U => Op(T::Umull.size(I32x4).upper()),

        F32x4Splat => Splat(F32x4),
        F32x4ExtractLane => extract(F32x4, false),
        F32x4ReplaceLane => ReplaceLane(F32x4),
        F32x4Abs => Op(T::Fabs.size(F32x4)),
        F32x4Neg => Op(T::Fneg.size(F32x4)),
        F32x4Sqrt => Op(T::Fsqrt.size(F32x4)),
        F32x4Ceil => Op(T::Frintp.size(F32x4)),
        F32x4Floor => Op(T::Frintm.size(F32x4)),
        F32x4Trunc => Op(T::Frintz.size(F32x4)),
        F32x4Nearest => Op(T::Frintn.size(F32x4)),
        F32x4Add => Op(T::Fadd.size(F32x4)),
        F32x4Sub => Op(T::Fsub.size(F32x4)),
        F32x4Mul => Op(T::Fmul.size(F32x4)),
        F32x4Div => Op(T::Fdiv.size(F32x4)),
        F32x4Min | F32x4RelaxedMin => Op(T::Fmin.size(F32x4)),
        F32x4Max | F32x4RelaxedMax => Op(T::Fmax.size(F32x4)),
        F32x4Pmin => PseudoMinMax {
            cmp: T::Fcmgt.size(F32x4),
            max: false,
        },
        F32x4Pmax => PseudoMinMax {
            cmp: T::Fcmgt.size(F32x4),
            max: true,
        },
        F32x4Eq => Op(T::Fcmeq.size(F32x4)),
        F32x4Ne => Inverted(T::Fcmeq.size(F32x4)),
        F32x4Lt => Swapped(T::Fcmgt.size(F32x4)),
        F32x4Gt => Op(T::Fcmgt.size(F32x4)),
        F32x4Le => Swapped(T::Fcmge.size(F32x4)),
        F32x4Ge => Op(T::Fcmge.size(F32x4)),
        F32x4ConvertI32x4S => Op(T::Scvtf.size(F32x4)),
        F32x4ConvertI32x4U => Op(T::Ucvtf.size(F32x4)),
        F32x4DemoteF64x2Zero => Op(T::Fcvtn.size(F64x2)),
        F32x4RelaxedMadd => Accumulate(T::Fmla.size(F32x4)),
        F32x4RelaxedNmadd => Accumulate(T::Fmls.size(F32x4)),

        F64x2Splat => Splat(F64x2),
        F64x2ExtractLane => extract(F64x2, false),
        F64x2ReplaceLane => ReplaceLane(F64x2),
        F64x2Abs => Op(T::Fabs.size(F64x2)),
        F64x2Neg => Op(T::Fneg.size(F64x2)),
        F64x2Sqrt => Op(T::Fsqrt.size(F64x2)),
        F64x2Ceil => Op(T::Frintp.size(F64x2)),
        F64x2Floor => Op(T::Frintm.size(F64x2)),
        F64x2Trunc => Op(T::Frintz.size(F64x2)),
        F64x2Nearest => Op(T::Frintn.size(F64x2)),
        F64x2Add => Op(T::Fadd.size(F64x2)),
        F64x2Sub => Op(T::Fsub.size(F64x2)),
        F64x2Mul => Op(T::Fmul.size(F64x2)),
        F64x2Div => Op(T::Fdiv.size(F64x2)),
        F64x2Min | F64x2RelaxedMin => Op(T::Fmin.size(F64x2)),
        F64x2Max | F64x2RelaxedMax => Op(T::Fmax.size(F64x2)),
        F64x2Pmin => PseudoMinMax {
            cmp: T::Fcmgt.size(F64x2),
            max: false,
        },
        F64x2Pmax => PseudoMinMax {
            cmp: T::Fcmgt.size(F64x2),
            max: true,
        },
        F64x2Eq => Op(T::Fcmeq.size(F64x2)),
        F64x2Ne => Inverted(T::Fcmeq.size(F64x2)),
        F64x2Lt => Swapped(T::Fcmgt.size(F64x2)),
        F64x2Gt => Op(T::Fcmgt.size(F64x2)),
        F64x2Le => Swapped(T::Fcmge.size(F64x2)),
        F64x2Ge => Op(T::Fcmge.size(F64x2)),
        F64x2ConvertLowI32x4S => Chain(widen(T::Sxtl, I32x4), T::Scvtf.size(F64x2)),
        F64x2ConvertLowI32x4U => Chain(widen(T::Uxtl, I32x4), T::Ucvtf.size(F64x2)),
        F64x2PromoteLowF32x4 => Op(T::Fcvtl.size(F64x2)),
        F64x2RelaxedMadd => Accumulate(T::Fmla.size(F64x2)),
        F64x2RelaxedNmadd => Accumulate(T::Fmls.size(F64x2)),
    };
    Some(r)
}
