use dynasmrt::aarch64::Aarch64Relocation;
use dynasmrt::{DynasmApi, VecAssembler, dynasm};
use regalloc2::{PReg, RegClass};

use super::encoding::{RawEncoder, RawOp, RegisterEncoding, Template, lane_imm4, lane_imm5};
use super::regs::{ASM_SCRATCH, Aarch64Registers};
use crate::error::CompileError;
use crate::kind::{LaneShape, ValueKind};
use crate::masm::{Address, MacroAssembler, ZeroTest};
use crate::operand::Immediate;

/// Width of a single load or store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    B,
    H,
    W,
    X,
    S,
    D,
    Q,
}

impl Access {
    fn of(kind: ValueKind) -> Self {
        match kind {
            ValueKind::I8 => Access::B,
            ValueKind::I16 => Access::H,
            ValueKind::I32 => Access::W,
            ValueKind::I64 => Access::X,
            ValueKind::F32 => Access::S,
            ValueKind::F64 => Access::D,
            ValueKind::V128(_) => Access::Q,
        }
    }

    fn bytes(self) -> i32 {
        match self {
            Access::B => 1,
            Access::H => 2,
            Access::W | Access::S => 4,
            Access::X | Access::D => 8,
            Access::Q => 16,
        }
    }
}

/// How an address is encoded.
enum Offset {
    /// `[xN, #imm]` with `imm` a multiple of the access size.
    Scaled(u32),
    /// `[xN, #simm9]`
    Unscaled(i32),
    /// `[xN, xM]`, the offset materialized in the assembler scratch.
    Register(u32),
}

/// AArch64 machine code through dynasm.
pub struct Aarch64Masm {
    ops: VecAssembler<Aarch64Relocation>,
}

impl Default for Aarch64Masm {
    fn default() -> Self {
        Self::new()
    }
}

impl Aarch64Masm {
    pub fn new() -> Self {
        Self {
            ops: VecAssembler::new(0),
        }
    }

    /// Hand over the finished code.
    pub fn finalize(self) -> Result<Vec<u8>, CompileError> {
        self.ops
            .finalize()
            .map_err(|err| CompileError::Finalize(err.to_string()))
    }

    fn hw(reg: PReg) -> u32 {
        Aarch64Registers.hw_index(reg)
    }

    fn raw(&mut self, word: u32) {
        self.ops.push_u32(word);
    }

    fn encode(&mut self, op: RawOp, rd: PReg, rn: PReg) {
        let word = RawEncoder::new(&Aarch64Registers).encode(op, rd, rn, None);
        self.raw(word);
    }

    fn mov_imm64(&mut self, dst: PReg, value: u64) {
        let r = Self::hw(dst);
        let p0 = (value & 0xFFFF) as u32;
        let p1 = ((value >> 16) & 0xFFFF) as u32;
        let p2 = ((value >> 32) & 0xFFFF) as u32;
        let p3 = ((value >> 48) & 0xFFFF) as u32;
        dynasm!(self.ops ; .arch aarch64 ; movz X(r), #p0);
        if p1 != 0 {
            dynasm!(self.ops ; .arch aarch64 ; movk X(r), #p1, LSL #16);
        }
        if p2 != 0 {
            dynasm!(self.ops ; .arch aarch64 ; movk X(r), #p2, LSL #32);
        }
        if p3 != 0 {
            dynasm!(self.ops ; .arch aarch64 ; movk X(r), #p3, LSL #48);
        }
    }

    fn offset_form(&mut self, access: Access, offset: i32) -> Offset {
        let scale = access.bytes();
        if offset >= 0 && offset % scale == 0 && offset / scale < 4096 {
            Offset::Scaled(offset as u32)
        } else if (-256..=255).contains(&offset) {
            Offset::Unscaled(offset)
        } else {
            self.mov_imm64(ASM_SCRATCH, offset as i64 as u64);
            Offset::Register(Self::hw(ASM_SCRATCH))
        }
    }
}

impl MacroAssembler for Aarch64Masm {
    fn load(&mut self, kind: ValueKind, dst: PReg, src: Address) {
        let access = Access::of(kind);
        let rt = Self::hw(dst);
        let rn = Self::hw(src.base);
        match (access, self.offset_form(access, src.offset)) {
            (Access::B, Offset::Scaled(off)) => dynasm!(self.ops ; .arch aarch64 ; ldrb W(rt), [X(rn), #off]),
            (Access::B, Offset::Unscaled(off)) => dynasm!(self.ops ; .arch aarch64 ; ldurb W(rt), [X(rn), #off]),
            (Access::B, Offset::Register(rm)) => dynasm!(self.ops ; .arch aarch64 ; ldrb W(rt), [X(rn), X(rm)]),
            (Access::H, Offset::Scaled(off)) => dynasm!(self.ops ; .arch aarch64 ; ldrh W(rt), [X(rn), #off]),
            (Access::H, Offset::Unscaled(off)) => dynasm!(self.ops ; .arch aarch64 ; ldurh W(rt), [X(rn), #off]),
            (Access::H, Offset::Register(rm)) => dynasm!(self.ops ; .arch aarch64 ; ldrh W(rt), [X(rn), X(rm)]),
            (Access::W, Offset::Scaled(off)) => dynasm!(self.ops ; .arch aarch64 ; ldr W(rt), [X(rn), #off]),
            (Access::W, Offset::Unscaled(off)) => dynasm!(self.ops ; .arch aarch64 ; ldur W(rt), [X(rn), #off]),
            (Access::W, Offset::Register(rm)) => dynasm!(self.ops ; .arch aarch64 ; ldr W(rt), [X(rn), X(rm)]),
            (Access::X, Offset::Scaled(off)) => dynasm!(self.ops ; .arch aarch64 ; ldr X(rt), [X(rn), #off]),
            (Access::X, Offset::Unscaled(off)) => dynasm!(self.ops ; .arch aarch64 ; ldur X(rt), [X(rn), #off]),
            (Access::X, Offset::Register(rm)) => dynasm!(self.ops ; .arch aarch64 ; ldr X(rt), [X(rn), X(rm)]),
            (Access::S, Offset::Scaled(off)) => dynasm!(self.ops ; .arch aarch64 ; ldr S(rt), [X(rn), #off]),
            (Access::S, Offset::Unscaled(off)) => dynasm!(self.ops ; .arch aarch64 ; ldur S(rt), [X(rn), #off]),
            (Access::S, Offset::Register(rm)) => dynasm!(self.ops ; .arch aarch64 ; ldr S(rt), [X(rn), X(rm)]),
            (Access::D, Offset::Scaled(off)) => dynasm!(self.ops ; .arch aarch64 ; ldr D(rt), [X(rn), #off]),
            (Access::D, Offset::Unscaled(off)) => dynasm!(self.ops ; .arch aarch64 ; ldur D(rt), [X(rn), #off]),
            (Access::D, Offset::Register(rm)) => dynasm!(self.ops ; .arch aarch64 ; ldr D(rt), [X(rn), X(rm)]),
            (Access::Q, Offset::Scaled(off)) => dynasm!(self.ops ; .arch aarch64 ; ldr Q(rt), [X(rn), #off]),
            (Access::Q, Offset::Unscaled(off)) => dynasm!(self.ops ; .arch aarch64 ; ldur Q(rt), [X(rn), #off]),
            (Access::Q, Offset::Register(rm)) => dynasm!(self.ops ; .arch aarch64 ; ldr Q(rt), [X(rn), X(rm)]),
        }
    }

    fn store(&mut self, kind: ValueKind, src: PReg, dst: Address) {
        let access = Access::of(kind);
        let rt = Self::hw(src);
        let rn = Self::hw(dst.base);
        match (access, self.offset_form(access, dst.offset)) {
            (Access::B, Offset::Scaled(off)) => dynasm!(self.ops ; .arch aarch64 ; strb W(rt), [X(rn), #off]),
            (Access::B, Offset::Unscaled(off)) => dynasm!(self.ops ; .arch aarch64 ; sturb W(rt), [X(rn), #off]),
            (Access::B, Offset::Register(rm)) => dynasm!(self.ops ; .arch aarch64 ; strb W(rt), [X(rn), X(rm)]),
            (Access::H, Offset::Scaled(off)) => dynasm!(self.ops ; .arch aarch64 ; strh W(rt), [X(rn), #off]),
            (Access::H, Offset::Unscaled(off)) => dynasm!(self.ops ; .arch aarch64 ; sturh W(rt), [X(rn), #off]),
            (Access::H, Offset::Register(rm)) => dynasm!(self.ops ; .arch aarch64 ; strh W(rt), [X(rn), X(rm)]),
            (Access::W, Offset::Scaled(off)) => dynasm!(self.ops ; .arch aarch64 ; str W(rt), [X(rn), #off]),
            (Access::W, Offset::Unscaled(off)) => dynasm!(self.ops ; .arch aarch64 ; stur W(rt), [X(rn), #off]),
            (Access::W, Offset::Register(rm)) => dynasm!(self.ops ; .arch aarch64 ; str W(rt), [X(rn), X(rm)]),
            (Access::X, Offset::Scaled(off)) => dynasm!(self.ops ; .arch aarch64 ; str X(rt), [X(rn), #off]),
            (Access::X, Offset::Unscaled(off)) => dynasm!(self.ops ; .arch aarch64 ; stur X(rt), [X(rn), #off]),
            (Access::X, Offset::Register(rm)) => dynasm!(self.ops ; .arch aarch64 ; str X(rt), [X(rn), X(rm)]),
            (Access::S, Offset::Scaled(off)) => dynasm!(self.ops ; .arch aarch64 ; str S(rt), [X(rn), #off]),
            (Access::S, Offset::Unscaled(off)) => dynasm!(self.ops ; .arch aarch64 ; stur S(rt), [X(rn), #off]),
            (Access::S, Offset::Register(rm)) => dynasm!(self.ops ; .arch aarch64 ; str S(rt), [X(rn), X(rm)]),
            (Access::D, Offset::Scaled(off)) => dynasm!(self.ops ; .arch aarch64 ; str D(rt), [X(rn), #off]),
            (Access::D, Offset::Unscaled(off)) => dynasm!(self.ops ; .arch aarch64 ; stur D(rt), [X(rn), #off]),
            (Access::D, Offset::Register(rm)) => dynasm!(self.ops ; .arch aarch64 ; str D(rt), [X(rn), X(rm)]),
            (Access::Q, Offset::Scaled(off)) => dynasm!(self.ops ; .arch aarch64 ; str Q(rt), [X(rn), #off]),
            (Access::Q, Offset::Unscaled(off)) => dynasm!(self.ops ; .arch aarch64 ; stur Q(rt), [X(rn), #off]),
            (Access::Q, Offset::Register(rm)) => dynasm!(self.ops ; .arch aarch64 ; str Q(rt), [X(rn), X(rm)]),
        }
    }

    fn mov(&mut self, kind: ValueKind, dst: PReg, src: PReg) {
        if kind.reg_class() == RegClass::Int {
            let (d, s) = (Self::hw(dst), Self::hw(src));
            dynasm!(self.ops ; .arch aarch64 ; mov X(d), X(s));
            return;
        }
        // orr vd.16b, vn.16b, vn.16b
        let word = RawEncoder::new(&Aarch64Registers).encode(Template::Orr.op(), dst, src, Some(src));
        self.raw(word);
    }

    fn load_constant(&mut self, dst: PReg, value: Immediate) {
        if dst.class() == RegClass::Int {
            debug_assert!(value.as_u64().is_some(), "v128 constant into a general register");
            if let Some(bits) = value.as_u64() {
                self.mov_imm64(dst, bits);
            }
            return;
        }
        match value {
            Immediate::V128(bytes) => {
                let value = u128::from_le_bytes(bytes);
                if value == 0 {
                    self.encode(Template::MoviZero.op(), dst, dst);
                    return;
                }
                let lo = value as u64;
                let hi = (value >> 64) as u64;
                self.mov_imm64(ASM_SCRATCH, lo);
                self.encode(Template::FmovFromX.op(), dst, ASM_SCRATCH);
                if hi != 0 {
                    self.mov_imm64(ASM_SCRATCH, hi);
                    let ins = Template::InsGeneral.op().with(lane_imm5(LaneShape::I64x2, 1));
                    self.encode(ins, dst, ASM_SCRATCH);
                }
            }
            Immediate::I64(v) => {
                self.mov_imm64(ASM_SCRATCH, v as u64);
                self.encode(Template::FmovFromX.op(), dst, ASM_SCRATCH);
            }
            Immediate::F64(bits) => {
                self.mov_imm64(ASM_SCRATCH, bits);
                self.encode(Template::FmovFromX.op(), dst, ASM_SCRATCH);
            }
            Immediate::I32(v) => {
                self.mov_imm64(ASM_SCRATCH, u64::from(v as u32));
                self.encode(Template::FmovFromW.op(), dst, ASM_SCRATCH);
            }
            Immediate::F32(bits) => {
                self.mov_imm64(ASM_SCRATCH, u64::from(bits));
                self.encode(Template::FmovFromW.op(), dst, ASM_SCRATCH);
            }
        }
    }

    fn lane_to_gpr(&mut self, shape: LaneShape, signed: bool, dst: PReg, src: PReg, index: u8) {
        let template = if signed { Template::Smov } else { Template::Umov };
        let mut op = template.op().with(lane_imm5(shape, index));
        // 64-bit destination register
        if shape.lane_bytes() == 8 || (signed && shape.lane_bytes() == 4) {
            op = op.upper();
        }
        self.encode(op, dst, src);
    }

    fn lane_from_gpr(&mut self, shape: LaneShape, dst: PReg, index: u8, src: PReg) {
        self.encode(Template::InsGeneral.op().with(lane_imm5(shape, index)), dst, src);
    }

    fn lane_copy(&mut self, shape: LaneShape, dst: PReg, dst_index: u8, src: PReg, src_index: u8) {
        let op = Template::InsElement
            .op()
            .with(lane_imm5(shape, dst_index) | lane_imm4(shape, src_index));
        self.encode(op, dst, src);
    }

    fn lane_to_scalar(&mut self, shape: LaneShape, dst: PReg, src: PReg, index: u8) {
        self.encode(Template::DupScalar.op().with(lane_imm5(shape, index)), dst, src);
    }

    fn splat_gpr(&mut self, shape: LaneShape, dst: PReg, src: PReg) {
        self.encode(Template::DupGeneral.op().with(lane_imm5(shape, 0)), dst, src);
    }

    fn splat_lane(&mut self, shape: LaneShape, dst: PReg, src: PReg, index: u8) {
        self.encode(Template::DupElement.op().with(lane_imm5(shape, index)), dst, src);
    }

    fn and_imm32(&mut self, dst: PReg, src: PReg, mask: u32) {
        let (d, s) = (Self::hw(dst), Self::hw(src));
        dynasm!(self.ops ; .arch aarch64 ; and WSP(d), W(s), #mask);
    }

    fn neg32(&mut self, dst: PReg, src: PReg) {
        let (d, s) = (Self::hw(dst), Self::hw(src));
        dynasm!(self.ops ; .arch aarch64 ; neg W(d), W(s));
    }

    fn set_if(&mut self, test: ZeroTest, dst: PReg, src: PReg) {
        let (d, s) = (Self::hw(dst), Self::hw(src));
        dynasm!(self.ops ; .arch aarch64 ; cmp XSP(s), #0);
        match test {
            ZeroTest::Zero => dynasm!(self.ops ; .arch aarch64 ; cset W(d), eq),
            ZeroTest::NonZero => dynasm!(self.ops ; .arch aarch64 ; cset W(d), ne),
        }
    }

    fn emit_custom(&mut self, word: u32) {
        self.raw(word);
    }

    fn offset(&self) -> usize {
        self.ops.offset().0
    }
}
