//! Operand and result materialization.
//!
//! Sources are resolved to a physical location and, when the operation needs
//! a register, loaded into a scratch register the caller picks. Destinations
//! are resolved up front but only written after the operation, by [`commit`].
//! Nothing here is cached: every instruction resolves its operands afresh.

use regalloc2::PReg;

use crate::arch::aarch64::regs::is_allocatable;
use crate::context::CodegenContext;
use crate::error::CompileError;
use crate::instruction::Opcode;
use crate::kind::ValueKind;
use crate::masm::{Address, MacroAssembler};
use crate::operand::{Immediate, Location, OperandDescriptor};

/// Physical home of a source operand for the current instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysLoc {
    Reg(PReg),
    Mem(Address),
    Imm(Immediate),
}

/// Physical home of a destination operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Reg(PReg),
    Mem(Address),
}

impl Destination {
    pub fn reg(self) -> Option<PReg> {
        match self {
            Self::Reg(reg) => Some(reg),
            Self::Mem(_) => None,
        }
    }

    /// The destination register itself, or `fallback` when the result has to
    /// go through a register before reaching memory.
    pub fn target_reg(self, fallback: PReg) -> PReg {
        self.reg().unwrap_or(fallback)
    }
}

pub fn resolve<M>(
    ctx: &CodegenContext<M>,
    desc: &OperandDescriptor,
) -> Result<PhysLoc, CompileError> {
    match desc.location() {
        Location::Register(vreg) => {
            let alloc = ctx
                .allocation
                .get(vreg)
                .ok_or(CompileError::Unallocated { vreg })?;
            if let Some(preg) = alloc.as_reg() {
                if !is_allocatable(preg) {
                    return Err(CompileError::ReservedRegister { vreg, preg });
                }
                Ok(PhysLoc::Reg(preg))
            } else if let Some(slot) = alloc.as_stack() {
                Ok(PhysLoc::Mem(Address::new(
                    ctx.frame.base,
                    ctx.frame.spill_offset(slot),
                )))
            } else {
                Err(CompileError::Unallocated { vreg })
            }
        }
        Location::Stack(slot) => Ok(PhysLoc::Mem(Address::new(
            ctx.frame.base,
            ctx.frame.slot_offset(slot),
        ))),
        Location::Immediate(value) => Ok(PhysLoc::Imm(value)),
    }
}

pub fn resolve_destination<M>(
    ctx: &CodegenContext<M>,
    opcode: Opcode,
    desc: &OperandDescriptor,
) -> Result<Destination, CompileError> {
    match resolve(ctx, desc)? {
        PhysLoc::Reg(reg) => Ok(Destination::Reg(reg)),
        PhysLoc::Mem(addr) => Ok(Destination::Mem(addr)),
        PhysLoc::Imm(_) => Err(CompileError::ImmediateDestination { opcode }),
    }
}

/// Get `desc` into a register: its own if it already has one, otherwise
/// `scratch` after one load (or constant sequence) of exactly `kind`.
pub fn materialize<M: MacroAssembler>(
    ctx: &mut CodegenContext<M>,
    desc: &OperandDescriptor,
    kind: ValueKind,
    scratch: PReg,
) -> Result<PReg, CompileError> {
    Ok(match resolve(ctx, desc)? {
        PhysLoc::Reg(reg) => reg,
        PhysLoc::Mem(addr) => {
            ctx.masm.load(kind, scratch, addr);
            scratch
        }
        PhysLoc::Imm(value) => {
            ctx.masm.load_constant(scratch, value);
            scratch
        }
    })
}

/// Like [`materialize`], but the value always ends up in `dst`.
pub fn materialize_into<M: MacroAssembler>(
    ctx: &mut CodegenContext<M>,
    desc: &OperandDescriptor,
    kind: ValueKind,
    dst: PReg,
) -> Result<(), CompileError> {
    match resolve(ctx, desc)? {
        PhysLoc::Reg(reg) if reg == dst => {}
        PhysLoc::Reg(reg) => ctx.masm.mov(kind, dst, reg),
        PhysLoc::Mem(addr) => ctx.masm.load(kind, dst, addr),
        PhysLoc::Imm(value) => ctx.masm.load_constant(dst, value),
    }
    Ok(())
}

/// Write the result held in `reg` to its destination.
///
/// Memory gets exactly one store of `kind`. A register destination is left
/// alone when it already is `reg`, and receives a move otherwise.
pub fn commit<M: MacroAssembler>(
    ctx: &mut CodegenContext<M>,
    dest: Destination,
    reg: PReg,
    kind: ValueKind,
) {
    match dest {
        Destination::Mem(addr) => ctx.masm.store(kind, reg, addr),
        Destination::Reg(dst) if dst != reg => ctx.masm.mov(kind, dst, reg),
        Destination::Reg(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use regalloc2::{RegClass, SpillSlot, VReg};

    use super::*;
    use crate::config::CodegenConfig;
    use crate::context::{AllocationMap, FrameLayout};
    use crate::kind::LaneShape;
    use crate::recording::{MasmInst, RecordingMasm};

    const F64X2: ValueKind = ValueKind::V128(LaneShape::F64x2);

    fn frame_base() -> PReg {
        PReg::new(19, RegClass::Int)
    }

    fn vreg(n: usize) -> VReg {
        VReg::new(n, RegClass::Vector)
    }

    fn vec_reg(n: usize) -> PReg {
        PReg::new(n, RegClass::Vector)
    }

    fn ctx(allocation: AllocationMap) -> CodegenContext<RecordingMasm> {
        CodegenContext::new(
            RecordingMasm::new(),
            allocation,
            FrameLayout::new(frame_base(), 8),
            CodegenConfig::default(),
        )
    }

    #[test]
    fn register_operand_needs_no_code() {
        let mut alloc = AllocationMap::new();
        alloc.assign(vreg(0), vec_reg(4));
        let mut ctx = ctx(alloc);
        let reg = materialize(&mut ctx, &OperandDescriptor::reg(F64X2, vreg(0)), F64X2, vec_reg(26))
            .unwrap();
        assert_eq!(reg, vec_reg(4));
        assert!(ctx.masm.is_empty());
    }

    #[test]
    fn stack_operand_loads_exact_kind_into_scratch() {
        let mut ctx = ctx(AllocationMap::new());
        let reg = materialize(&mut ctx, &OperandDescriptor::stack(F64X2, 2), F64X2, vec_reg(26))
            .unwrap();
        assert_eq!(reg, vec_reg(26));
        assert_eq!(
            ctx.masm.insts(),
            &[MasmInst::Load {
                kind: F64X2,
                dst: vec_reg(26),
                src: Address::new(frame_base(), 32),
            }]
        );
    }

    #[test]
    fn spilled_vreg_loads_from_spill_area() {
        let mut alloc = AllocationMap::new();
        alloc.spill(vreg(1), SpillSlot::new(1));
        let mut ctx = ctx(alloc);
        materialize(&mut ctx, &OperandDescriptor::reg(F64X2, vreg(1)), F64X2, vec_reg(27)).unwrap();
        assert_eq!(
            ctx.masm.insts(),
            &[MasmInst::Load {
                kind: F64X2,
                dst: vec_reg(27),
                src: Address::new(frame_base(), 8 * 16 + 16),
            }]
        );
    }

    #[test]
    fn immediate_operand_becomes_constant_load() {
        let mut ctx = ctx(AllocationMap::new());
        let value = Immediate::v128(0x0102);
        materialize(&mut ctx, &OperandDescriptor::imm(ValueKind::V128_BITS, value), ValueKind::V128_BITS, vec_reg(26))
            .unwrap();
        assert_eq!(ctx.masm.insts(), &[MasmInst::Const { dst: vec_reg(26), value }]);
    }

    #[test]
    fn unallocated_register_is_fatal() {
        let mut ctx = ctx(AllocationMap::new());
        let err = materialize(&mut ctx, &OperandDescriptor::reg(F64X2, vreg(9)), F64X2, vec_reg(26))
            .unwrap_err();
        assert_eq!(err, CompileError::Unallocated { vreg: vreg(9) });
        assert!(ctx.masm.is_empty());
    }

    #[test]
    fn scratch_register_allocation_is_fatal() {
        let mut alloc = AllocationMap::new();
        alloc.assign(vreg(0), vec_reg(26));
        alloc.assign(vreg(1), PReg::new(17, RegClass::Int));
        let mut ctx = ctx(alloc);
        let err = materialize(&mut ctx, &OperandDescriptor::reg(F64X2, vreg(0)), F64X2, vec_reg(27))
            .unwrap_err();
        assert_eq!(err, CompileError::ReservedRegister { vreg: vreg(0), preg: vec_reg(26) });
        let err = resolve(&ctx, &OperandDescriptor::reg(ValueKind::I64, vreg(1))).unwrap_err();
        assert_eq!(
            err,
            CompileError::ReservedRegister {
                vreg: vreg(1),
                preg: PReg::new(17, RegClass::Int),
            }
        );
        assert!(ctx.masm.is_empty());
    }

    #[test]
    fn commit_stores_only_for_memory() {
        let mut ctx = ctx(AllocationMap::new());
        commit(&mut ctx, Destination::Reg(vec_reg(5)), vec_reg(5), F64X2);
        assert!(ctx.masm.is_empty());

        let addr = Address::new(frame_base(), 16);
        commit(&mut ctx, Destination::Mem(addr), vec_reg(29), F64X2);
        assert_eq!(
            ctx.masm.insts(),
            &[MasmInst::Store { kind: F64X2, src: vec_reg(29), dst: addr }]
        );
    }

    #[test]
    fn immediate_destination_is_rejected() {
        let ctx = ctx(AllocationMap::new());
        let desc = OperandDescriptor::imm(ValueKind::V128_BITS, Immediate::v128(0));
        assert_eq!(
            resolve_destination(&ctx, Opcode::V128Move, &desc),
            Err(CompileError::ImmediateDestination { opcode: Opcode::V128Move })
        );
    }
}
