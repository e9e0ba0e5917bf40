//! Instruction lowering for AArch64 Advanced SIMD.
//!
//! Each instruction goes through the same steps: classify the opcode, pick
//! its recipe, resolve every source and the destination, materialize
//! sources into registers, emit the recipe, then commit the result. Nothing
//! is emitted before the opcode is known and every operand has resolved.

use regalloc2::PReg;

use super::encoding::{RawEncoder, RawOp, TBL_TWO_REGS, Template};
use super::regs::{
    Aarch64Registers, DST_SCRATCH, GPR_SCRATCH, SRC_SCRATCH, TMP, as_float, same_reg,
};
use super::table::{self, Recipe, ShiftKind};
use crate::context::CodegenContext;
use crate::error::CompileError;
use crate::instruction::Instruction;
use crate::kind::LaneShape;
use crate::masm::{MacroAssembler, ZeroTest};
use crate::materialize::{self, Destination, PhysLoc};
use crate::selector::{self, Signature, Strategy};

/// Lower one instruction.
pub fn lower<M: MacroAssembler>(
    ctx: &mut CodegenContext<M>,
    instr: &Instruction,
) -> Result<(), CompileError> {
    let opcode = instr.opcode;
    let unreachable = || CompileError::UnreachableOpcode { opcode };
    let sig = selector::classify(opcode, &ctx.config).ok_or_else(unreachable)?;
    let recipe = table::recipe(opcode).ok_or_else(unreachable)?;
    selector::check_operands(instr, &sig, &ctx.config)?;
    let (sources, dest) = instr.operands.split_at(sig.sources().len());
    for desc in sources {
        materialize::resolve(ctx, desc)?;
    }
    let dest = materialize::resolve_destination(ctx, opcode, &dest[0])?;

    tracing::trace!(%opcode, strategy = ?sig.strategy, "lowering");

    let mut lowerer = Lowerer { ctx, instr, sig, dest };
    match (sig.strategy, recipe) {
        (Strategy::UnaryVector, recipe) => lowerer.unary(recipe),
        (Strategy::BinaryVector, recipe) => lowerer.binary(recipe),
        (Strategy::TernaryVector, recipe) => lowerer.ternary(recipe),
        (Strategy::ShiftVector, Recipe::Shift { shape, kind }) => lowerer.shift(shape, kind),
        (Strategy::Splat, Recipe::Splat(shape)) => lowerer.splat(shape),
        (Strategy::ExtractLane, Recipe::ExtractLane { shape, signed }) => {
            lowerer.extract_lane(shape, signed)
        }
        (Strategy::ReplaceLane, Recipe::ReplaceLane(shape)) => lowerer.replace_lane(shape),
        (Strategy::Reduce, recipe) => lowerer.reduce(recipe),
        (Strategy::Shuffle, Recipe::Shuffle) => lowerer.shuffle(),
        (Strategy::Move, Recipe::Move) => lowerer.mov(),
        _ => Err(unreachable()),
    }
}

struct Lowerer<'a, M> {
    ctx: &'a mut CodegenContext<M>,
    instr: &'a Instruction,
    sig: Signature,
    dest: Destination,
}

impl<M: MacroAssembler> Lowerer<'_, M> {
    fn unreachable(&self) -> CompileError {
        CompileError::UnreachableOpcode {
            opcode: self.instr.opcode,
        }
    }

    fn raw(&mut self, op: RawOp, rd: PReg, rn: PReg, rm: Option<PReg>) {
        RawEncoder::new(&Aarch64Registers).emit(&mut self.ctx.masm, op, rd, rn, rm);
    }

    /// Source `index` in a register, loaded into `scratch` if needed.
    fn source(&mut self, index: usize, scratch: PReg) -> Result<PReg, CompileError> {
        let desc = self.instr.operands[index];
        let kind = self.sig.sources()[index];
        materialize::materialize(self.ctx, &desc, kind, scratch)
    }

    fn source_into(&mut self, index: usize, dst: PReg) -> Result<(), CompileError> {
        let desc = self.instr.operands[index];
        let kind = self.sig.sources()[index];
        materialize::materialize_into(self.ctx, &desc, kind, dst)
    }

    fn resolve_source(&self, index: usize) -> Result<PhysLoc, CompileError> {
        materialize::resolve(self.ctx, &self.instr.operands[index])
    }

    fn commit(&mut self, dest: Destination, reg: PReg) -> Result<(), CompileError> {
        materialize::commit(self.ctx, dest, reg, self.sig.dest);
        Ok(())
    }

    fn unary(&mut self, recipe: Recipe) -> Result<(), CompileError> {
        let src = self.source(0, SRC_SCRATCH[0])?;
        let dest = self.dest;
        let dst = dest.target_reg(DST_SCRATCH);
        match recipe {
            Recipe::Op(op) => self.raw(op, dst, src, None),
            Recipe::Chain(first, second) => {
                self.raw(first, dst, src, None);
                self.raw(second, dst, dst, None);
            }
            _ => return Err(self.unreachable()),
        }
        self.commit(dest, dst)
    }

    fn binary(&mut self, recipe: Recipe) -> Result<(), CompileError> {
        let a = self.source(0, SRC_SCRATCH[0])?;
        let b = self.source(1, SRC_SCRATCH[1])?;
        let dest = self.dest;
        let mut dst = dest.target_reg(DST_SCRATCH);
        if recipe.clobbers_early() && (same_reg(dst, a) || same_reg(dst, b)) {
            dst = DST_SCRATCH;
        }

        match recipe {
            Recipe::Op(op) => self.raw(op, dst, a, Some(b)),
            Recipe::Swapped(op) => self.raw(op, dst, b, Some(a)),
            Recipe::Inverted(op) => {
                self.raw(op, dst, a, Some(b));
                self.raw(Template::Not.op(), dst, dst, None);
            }
            Recipe::Narrow(op) => {
                self.raw(op, dst, a, None);
                self.raw(op.upper(), dst, b, None);
            }
            Recipe::PseudoMinMax { cmp, max } => {
                // pmin: b < a ? b : a    pmax: a < b ? b : a
                if max {
                    self.raw(cmp, dst, b, Some(a));
                } else {
                    self.raw(cmp, dst, a, Some(b));
                }
                self.raw(Template::Bsl.op(), dst, b, Some(a));
            }
            Recipe::I64x2Mul => self.i64x2_mul(dst, a, b),
            Recipe::Dot(shape) => self.dot(shape, dst, a, b),
            _ => return Err(self.unreachable()),
        }
        self.commit(dest, dst)
    }

    /// 64-bit lane multiply from 32-bit pieces:
    /// `lo(a)*lo(b) + ((lo(a)*hi(b) + hi(a)*lo(b)) << 32)`.
    fn i64x2_mul(&mut self, dst: PReg, a: PReg, b: PReg) {
        let s = LaneShape::I32x4;
        let [t0, t1] = TMP;
        self.raw(Template::Rev64.size(s), t0, b, None);
        self.raw(Template::Mul.size(s), t0, t0, Some(a));
        self.raw(Template::Xtn.size(s), t1, a, None);
        self.raw(Template::Addp.size(s), dst, t0, Some(t0));
        self.raw(Template::Xtn.size(s), t0, b, None);
        self.raw(Template::Shll.size(s), dst, dst, None);
        self.raw(Template::Umlal.size(s), dst, t0, Some(t1));
    }

    /// Signed dot product into lanes of `dest`: widening products of the
    /// low and high halves, then a pairwise add of adjacent products.
    fn dot(&mut self, dest: LaneShape, dst: PReg, a: PReg, b: PReg) {
        let src = narrower(dest);
        let [lo, hi] = TMP;
        self.raw(Template::Smull.size(src), lo, a, Some(b));
        self.raw(Template::Smull.size(src).upper(), hi, a, Some(b));
        self.raw(Template::Addp.size(dest), dst, lo, Some(hi));
    }

    fn ternary(&mut self, recipe: Recipe) -> Result<(), CompileError> {
        let a = self.source(0, SRC_SCRATCH[0])?;
        let b = self.source(1, SRC_SCRATCH[1])?;
        let dest = self.dest;
        let mut dst = dest.target_reg(DST_SCRATCH);

        match recipe {
            Recipe::Accumulate(op) => {
                // dst takes the third operand first; it must not clobber a or b.
                let c_in_dst = matches!(self.resolve_source(2)?, PhysLoc::Reg(c) if c == dst);
                if !c_in_dst && (same_reg(dst, a) || same_reg(dst, b)) {
                    dst = DST_SCRATCH;
                }
                self.source_into(2, dst)?;
                self.raw(op, dst, a, Some(b));
            }
            Recipe::DotAdd => {
                let c = self.source(2, SRC_SCRATCH[2])?;
                let sum = TMP[0];
                self.dot(LaneShape::I16x8, sum, a, b);
                self.raw(Template::Saddlp.size(LaneShape::I16x8), sum, sum, None);
                self.raw(Template::Add.size(LaneShape::I32x4), dst, c, Some(sum));
            }
            _ => return Err(self.unreachable()),
        }
        self.commit(dest, dst)
    }

    fn shift(&mut self, shape: LaneShape, kind: ShiftKind) -> Result<(), CompileError> {
        let esize = shape.lane_bytes() * 8;
        let mask = esize - 1;
        let constant = match self.resolve_source(1)? {
            PhysLoc::Imm(amount) => {
                let amount = amount.as_u64().ok_or(CompileError::BadImmediate {
                    opcode: self.instr.opcode,
                })?;
                Some(amount as u32 & mask)
            }
            _ => None,
        };

        let src = self.source(0, SRC_SCRATCH[0])?;
        let dest = self.dest;
        let dst = dest.target_reg(DST_SCRATCH);

        if let Some(amount) = constant {
            if amount == 0 {
                return self.commit(dest, src);
            }
            let (op, imm) = match kind {
                ShiftKind::Left => (Template::Shl, esize + amount),
                ShiftKind::RightSigned => (Template::Sshr, 2 * esize - amount),
                ShiftKind::RightUnsigned => (Template::Ushr, 2 * esize - amount),
            };
            self.raw(op.op().with(imm << 16), dst, src, None);
            return self.commit(dest, dst);
        }

        let amount = self.source(1, GPR_SCRATCH)?;
        self.ctx.masm.and_imm32(GPR_SCRATCH, amount, mask);
        if kind != ShiftKind::Left {
            self.ctx.masm.neg32(GPR_SCRATCH, GPR_SCRATCH);
        }
        // The shift amount is read from the low byte of each lane.
        let counts = TMP[0];
        self.ctx.masm.splat_gpr(LaneShape::I8x16, counts, GPR_SCRATCH);
        let op = match kind {
            ShiftKind::RightSigned => Template::Sshl,
            ShiftKind::Left | ShiftKind::RightUnsigned => Template::Ushl,
        };
        self.raw(op.size(shape), dst, src, Some(counts));
        self.commit(dest, dst)
    }

    fn splat(&mut self, shape: LaneShape) -> Result<(), CompileError> {
        let dest = self.dest;
        let dst = dest.target_reg(DST_SCRATCH);
        if shape.is_float() {
            let src = self.source(0, as_float(SRC_SCRATCH[0]))?;
            self.ctx.masm.splat_lane(shape, dst, src, 0);
        } else {
            let src = self.source(0, GPR_SCRATCH)?;
            self.ctx.masm.splat_gpr(shape, dst, src);
        }
        self.commit(dest, dst)
    }

    fn lane(&self) -> Result<u8, CompileError> {
        self.instr.lane().ok_or(CompileError::BadImmediate {
            opcode: self.instr.opcode,
        })
    }

    fn extract_lane(&mut self, shape: LaneShape, signed: bool) -> Result<(), CompileError> {
        let lane = self.lane()?;
        let src = self.source(0, SRC_SCRATCH[0])?;
        let dest = self.dest;
        let dst = if shape.is_float() {
            let dst = dest.target_reg(as_float(DST_SCRATCH));
            self.ctx.masm.lane_to_scalar(shape, dst, src, lane);
            dst
        } else {
            let dst = dest.target_reg(GPR_SCRATCH);
            self.ctx.masm.lane_to_gpr(shape, signed, dst, src, lane);
            dst
        };
        self.commit(dest, dst)
    }

    fn replace_lane(&mut self, shape: LaneShape) -> Result<(), CompileError> {
        let lane = self.lane()?;
        let dest = self.dest;
        let mut dst = dest.target_reg(DST_SCRATCH);
        if shape.is_float() {
            let scalar = self.source(1, as_float(SRC_SCRATCH[1]))?;
            if same_reg(dst, scalar) {
                dst = DST_SCRATCH;
            }
            self.source_into(0, dst)?;
            self.ctx.masm.lane_copy(shape, dst, lane, scalar, 0);
        } else {
            self.source_into(0, dst)?;
            let scalar = self.source(1, GPR_SCRATCH)?;
            self.ctx.masm.lane_from_gpr(shape, dst, lane, scalar);
        }
        self.commit(dest, dst)
    }

    fn reduce(&mut self, recipe: Recipe) -> Result<(), CompileError> {
        let src = self.source(0, SRC_SCRATCH[0])?;
        let dest = self.dest;
        let dst = dest.target_reg(GPR_SCRATCH);
        let t = TMP[0];
        match recipe {
            Recipe::AllTrue(LaneShape::I64x2) => {
                // Any zero lane leaves an all-ones mask lane behind.
                self.raw(Template::CmeqZero.size(LaneShape::I64x2), t, src, None);
                self.raw(Template::Umaxp.size(LaneShape::I32x4), t, t, Some(t));
                self.ctx.masm.lane_to_gpr(LaneShape::I64x2, false, GPR_SCRATCH, t, 0);
                self.ctx.masm.set_if(ZeroTest::Zero, dst, GPR_SCRATCH);
            }
            Recipe::AllTrue(shape) => {
                self.raw(Template::Uminv.size(shape), t, src, None);
                self.ctx.masm.lane_to_gpr(shape, false, GPR_SCRATCH, t, 0);
                self.ctx.masm.set_if(ZeroTest::NonZero, dst, GPR_SCRATCH);
            }
            Recipe::AnyTrue => {
                self.raw(Template::Umaxp.size(LaneShape::I32x4), t, src, Some(src));
                self.ctx.masm.lane_to_gpr(LaneShape::I64x2, false, GPR_SCRATCH, t, 0);
                self.ctx.masm.set_if(ZeroTest::NonZero, dst, GPR_SCRATCH);
            }
            _ => return Err(self.unreachable()),
        }
        self.commit(dest, dst)
    }

    fn shuffle(&mut self) -> Result<(), CompileError> {
        let pattern = self.instr.shuffle().ok_or(CompileError::BadImmediate {
            opcode: self.instr.opcode,
        })?;
        // The table is a pair of consecutive registers.
        let [lo, hi, _] = SRC_SCRATCH;
        self.source_into(0, lo)?;
        self.source_into(1, hi)?;
        let dest = self.dest;
        let dst = dest.target_reg(DST_SCRATCH);
        self.ctx
            .masm
            .load_constant(dst, crate::operand::Immediate::V128(pattern));
        self.raw(Template::Tbl.op().with(TBL_TWO_REGS), dst, lo, Some(dst));
        self.commit(dest, dst)
    }

    fn mov(&mut self) -> Result<(), CompileError> {
        match self.dest {
            Destination::Reg(dst) => self.source_into(0, dst),
            dest @ Destination::Mem(_) => {
                let src = self.source(0, SRC_SCRATCH[0])?;
                self.commit(dest, src)
            }
        }
    }
}

/// Lane shape with half-width lanes.
fn narrower(shape: LaneShape) -> LaneShape {
    match shape {
        LaneShape::I16x8 => LaneShape::I8x16,
        LaneShape::I32x4 => LaneShape::I16x8,
        LaneShape::I64x2 => LaneShape::I32x4,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use regalloc2::{RegClass, VReg};

    use super::*;
    use crate::config::CodegenConfig;
    use crate::context::{AllocationMap, FrameLayout};
    use crate::instruction::Opcode;
    use crate::kind::ValueKind;
    use crate::operand::{Immediate, OperandDescriptor};
    use crate::recording::{MasmInst, RecordingMasm};
    use crate::arch::aarch64::regs::FRAME_BASE;

    const I32X4: ValueKind = ValueKind::V128(LaneShape::I32x4);
    const I64X2: ValueKind = ValueKind::V128(LaneShape::I64x2);
    const F32X4: ValueKind = ValueKind::V128(LaneShape::F32x4);

    fn vreg(n: usize) -> VReg {
        VReg::new(n, RegClass::Vector)
    }

    fn preg(n: usize) -> PReg {
        PReg::new(n, RegClass::Vector)
    }

    /// Context with vreg `n` allocated to logical vector register `n`.
    fn ctx() -> CodegenContext<RecordingMasm> {
        let allocation = (0..8)
            .map(|n| (vreg(n), regalloc2::Allocation::reg(preg(n))))
            .chain([(
                VReg::new(20, RegClass::Int),
                regalloc2::Allocation::reg(PReg::new(3, RegClass::Int)),
            )])
            .collect::<AllocationMap>();
        CodegenContext::new(
            RecordingMasm::new(),
            allocation,
            FrameLayout::new(FRAME_BASE, 8),
            CodegenConfig::default(),
        )
    }

    fn reg(kind: ValueKind, n: usize) -> OperandDescriptor {
        OperandDescriptor::reg(kind, vreg(n))
    }

    fn word(op: RawOp, rd: u32, rn: u32, rm: u32) -> u32 {
        op.bits() | rd | rn << 5 | rm << 16
    }

    #[test]
    fn register_only_binary_is_one_word() {
        let mut ctx = ctx();
        let instr = Instruction::new(Opcode::I32x4Add, [reg(I32X4, 1), reg(I32X4, 2), reg(I32X4, 3)]);
        lower(&mut ctx, &instr).unwrap();
        assert_eq!(
            ctx.masm.insts(),
            &[MasmInst::Raw(word(Template::Add.size(LaneShape::I32x4), 3, 1, 2))]
        );
    }

    #[test]
    fn less_than_swaps_operands() {
        let mut ctx = ctx();
        let instr = Instruction::new(Opcode::I32x4LtS, [reg(I32X4, 1), reg(I32X4, 2), reg(I32X4, 3)]);
        lower(&mut ctx, &instr).unwrap();
        assert_eq!(
            ctx.masm.raw_words(),
            vec![word(Template::Cmgt.size(LaneShape::I32x4), 3, 2, 1)]
        );
    }

    #[test]
    fn not_equal_appends_not() {
        let mut ctx = ctx();
        let instr = Instruction::new(Opcode::F32x4Ne, [reg(F32X4, 1), reg(F32X4, 2), reg(F32X4, 3)]);
        lower(&mut ctx, &instr).unwrap();
        assert_eq!(
            ctx.masm.raw_words(),
            vec![
                word(Template::Fcmeq.size(LaneShape::F32x4), 3, 1, 2),
                word(Template::Not.op(), 3, 3, 0),
            ]
        );
    }

    #[test]
    fn narrow_into_source_register_goes_through_scratch() {
        let mut ctx = ctx();
        let i16x8 = ValueKind::V128(LaneShape::I16x8);
        let instr = Instruction::new(
            Opcode::I8x16NarrowI16x8S,
            [reg(i16x8, 1), reg(i16x8, 2), reg(ValueKind::V128(LaneShape::I8x16), 2)],
        );
        lower(&mut ctx, &instr).unwrap();
        let op = Template::Sqxtn.size(LaneShape::I8x16);
        assert_eq!(
            ctx.masm.raw_words(),
            vec![word(op, 29, 1, 0), word(op.upper(), 29, 2, 0)]
        );
        assert_eq!(
            ctx.masm.insts().last(),
            Some(&MasmInst::Mov {
                kind: ValueKind::V128(LaneShape::I8x16),
                dst: preg(2),
                src: DST_SCRATCH,
            })
        );
    }

    #[test]
    fn i64x2_mul_is_seven_words() {
        let mut ctx = ctx();
        let instr = Instruction::new(Opcode::I64x2Mul, [reg(I64X2, 1), reg(I64X2, 2), reg(I64X2, 3)]);
        lower(&mut ctx, &instr).unwrap();
        assert_eq!(ctx.masm.raw_words().len(), 7);
        assert!(ctx.masm.loads().next().is_none());
        assert!(ctx.masm.stores().next().is_none());
    }

    #[test]
    fn dot_is_widening_multiply_then_pairwise_add() {
        let mut ctx = ctx();
        let i16x8 = ValueKind::V128(LaneShape::I16x8);
        let instr = Instruction::new(Opcode::I32x4DotI16x8S, [reg(i16x8, 1), reg(i16x8, 2), reg(I32X4, 3)]);
        lower(&mut ctx, &instr).unwrap();
        let smull = Template::Smull.size(LaneShape::I16x8);
        assert_eq!(
            ctx.masm.raw_words(),
            vec![
                word(smull, 30, 1, 2),
                word(smull.upper(), 31, 1, 2),
                word(Template::Addp.size(LaneShape::I32x4), 3, 30, 31),
            ]
        );
    }

    #[test]
    fn immediate_destination_emits_nothing() {
        let mut ctx = ctx();
        let f64x2 = ValueKind::V128(LaneShape::F64x2);
        let instr = Instruction::new(
            Opcode::F64x2Abs,
            [
                OperandDescriptor::stack(f64x2, 1),
                OperandDescriptor::imm(ValueKind::V128_BITS, Immediate::v128(0)),
            ],
        );
        assert_eq!(
            lower(&mut ctx, &instr),
            Err(CompileError::ImmediateDestination { opcode: Opcode::F64x2Abs })
        );
        assert!(ctx.masm.is_empty());
    }

    #[test]
    fn constant_shift_folds_into_immediate() {
        let mut ctx = ctx();
        let instr = Instruction::new(
            Opcode::I32x4ShrU,
            [
                reg(I32X4, 1),
                OperandDescriptor::imm(ValueKind::I32, Immediate::I32(35)),
                reg(I32X4, 2),
            ],
        );
        lower(&mut ctx, &instr).unwrap();
        // 35 & 31 = 3; ushr encodes 64 - 3
        assert_eq!(
            ctx.masm.raw_words(),
            vec![Template::Ushr.op().with(61 << 16).bits() | 2 | 1 << 5]
        );
    }

    #[test]
    fn zero_shift_is_a_move() {
        let mut ctx = ctx();
        let instr = Instruction::new(
            Opcode::I16x8Shl,
            [
                reg(ValueKind::V128(LaneShape::I16x8), 1),
                OperandDescriptor::imm(ValueKind::I32, Immediate::I32(16)),
                OperandDescriptor::stack(ValueKind::V128(LaneShape::I16x8), 0),
            ],
        );
        lower(&mut ctx, &instr).unwrap();
        assert!(ctx.masm.raw_words().is_empty());
        assert_eq!(ctx.masm.stores().count(), 1);
    }

    #[test]
    fn variable_shift_masks_negates_and_replicates() {
        let mut ctx = ctx();
        let instr = Instruction::new(
            Opcode::I64x2ShrS,
            [
                reg(I64X2, 1),
                OperandDescriptor::reg(ValueKind::I32, VReg::new(20, RegClass::Int)),
                reg(I64X2, 2),
            ],
        );
        lower(&mut ctx, &instr).unwrap();
        let x16 = GPR_SCRATCH;
        assert_eq!(
            &ctx.masm.insts()[..3],
            &[
                MasmInst::AndImm32 { dst: x16, src: PReg::new(3, RegClass::Int), mask: 63 },
                MasmInst::Neg32 { dst: x16, src: x16 },
                MasmInst::SplatGpr { shape: LaneShape::I8x16, dst: TMP[0], src: x16 },
            ]
        );
        assert_eq!(
            ctx.masm.raw_words(),
            vec![word(Template::Sshl.size(LaneShape::I64x2), 2, 1, 30)]
        );
    }

    #[test]
    fn bitselect_moves_mask_into_destination_first() {
        let mut ctx = ctx();
        let v = ValueKind::V128_BITS;
        let instr = Instruction::new(
            Opcode::V128Bitselect,
            [reg(v, 1), reg(v, 2), reg(v, 3), reg(v, 4)],
        );
        lower(&mut ctx, &instr).unwrap();
        assert_eq!(
            ctx.masm.insts(),
            &[
                MasmInst::Mov { kind: v, dst: preg(4), src: preg(3) },
                MasmInst::Raw(word(Template::Bsl.op(), 4, 1, 2)),
            ]
        );
    }

    #[test]
    fn all_true_reduces_into_gpr() {
        let mut ctx = ctx();
        let instr = Instruction::new(
            Opcode::I32x4AllTrue,
            [reg(I32X4, 1), OperandDescriptor::stack(ValueKind::I32, 2)],
        );
        lower(&mut ctx, &instr).unwrap();
        let insts = ctx.masm.insts();
        assert_eq!(insts.len(), 4);
        assert!(matches!(insts[2], MasmInst::SetIf { test: ZeroTest::NonZero, .. }));
        assert!(matches!(insts[3], MasmInst::Store { kind: ValueKind::I32, .. }));
    }

    #[test]
    fn shuffle_uses_consecutive_table_registers() {
        let mut ctx = ctx();
        let i8x16 = ValueKind::V128(LaneShape::I8x16);
        let pattern: [u8; 16] = core::array::from_fn(|i| (i * 2) as u8);
        let instr = Instruction::new(Opcode::I8x16Shuffle, [reg(i8x16, 1), reg(i8x16, 2), reg(i8x16, 3)])
            .with_shuffle(pattern);
        lower(&mut ctx, &instr).unwrap();
        assert_eq!(
            ctx.masm.insts(),
            &[
                MasmInst::Mov { kind: i8x16, dst: SRC_SCRATCH[0], src: preg(1) },
                MasmInst::Mov { kind: i8x16, dst: SRC_SCRATCH[1], src: preg(2) },
                MasmInst::Const { dst: preg(3), value: Immediate::V128(pattern) },
                MasmInst::Raw(Template::Tbl.op().with(TBL_TWO_REGS).bits() | 3 | 26 << 5 | 3 << 16),
            ]
        );
    }

    #[test]
    fn extract_signed_lane_to_stack() {
        let mut ctx = ctx();
        let instr = Instruction::new(
            Opcode::I8x16ExtractLaneS,
            [reg(ValueKind::V128(LaneShape::I8x16), 1), OperandDescriptor::stack(ValueKind::I32, 0)],
        )
        .with_lane(7);
        lower(&mut ctx, &instr).unwrap();
        assert_eq!(
            ctx.masm.insts(),
            &[
                MasmInst::LaneToGpr {
                    shape: LaneShape::I8x16,
                    signed: true,
                    dst: GPR_SCRATCH,
                    src: preg(1),
                    index: 7,
                },
                MasmInst::Store {
                    kind: ValueKind::I32,
                    src: GPR_SCRATCH,
                    dst: crate::masm::Address::new(FRAME_BASE, 0),
                },
            ]
        );
    }

    #[test]
    fn scalar_opcode_emits_nothing() {
        let mut ctx = ctx();
        let instr = Instruction::new(Opcode::I32Add, [reg(I32X4, 1), reg(I32X4, 2), reg(I32X4, 3)]);
        assert_eq!(
            lower(&mut ctx, &instr),
            Err(CompileError::UnreachableOpcode { opcode: Opcode::I32Add })
        );
        assert!(ctx.masm.is_empty());
    }
}
