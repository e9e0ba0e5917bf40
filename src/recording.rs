//! A [`MacroAssembler`] that records primitive calls instead of encoding them.
//!
//! Listings are what tests assert on: they show which loads and stores the
//! materializers issued and the exact raw words the encoder produced.

use std::fmt;

use regalloc2::PReg;

use crate::kind::{LaneShape, ValueKind};
use crate::masm::{Address, MacroAssembler, RegName, ZeroTest};
use crate::operand::Immediate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MasmInst {
    Load { kind: ValueKind, dst: PReg, src: Address },
    Store { kind: ValueKind, src: PReg, dst: Address },
    Mov { kind: ValueKind, dst: PReg, src: PReg },
    Const { dst: PReg, value: Immediate },
    LaneToGpr { shape: LaneShape, signed: bool, dst: PReg, src: PReg, index: u8 },
    LaneFromGpr { shape: LaneShape, dst: PReg, index: u8, src: PReg },
    LaneCopy { shape: LaneShape, dst: PReg, dst_index: u8, src: PReg, src_index: u8 },
    LaneToScalar { shape: LaneShape, dst: PReg, src: PReg, index: u8 },
    SplatGpr { shape: LaneShape, dst: PReg, src: PReg },
    SplatLane { shape: LaneShape, dst: PReg, src: PReg, index: u8 },
    AndImm32 { dst: PReg, src: PReg, mask: u32 },
    Neg32 { dst: PReg, src: PReg },
    SetIf { test: ZeroTest, dst: PReg, src: PReg },
    Raw(u32),
}

impl fmt::Display for MasmInst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Load { kind, dst, src } => write!(f, "load.{kind} {}, {src}", RegName(dst)),
            Self::Store { kind, src, dst } => write!(f, "store.{kind} {}, {dst}", RegName(src)),
            Self::Mov { kind, dst, src } => {
                write!(f, "mov.{kind} {}, {}", RegName(dst), RegName(src))
            }
            Self::Const { dst, value } => write!(f, "const {}, {value}", RegName(dst)),
            Self::LaneToGpr { shape, signed, dst, src, index } => {
                let op = if signed { "smov" } else { "umov" };
                write!(f, "{op}.{shape} {}, {}[{index}]", RegName(dst), RegName(src))
            }
            Self::LaneFromGpr { shape, dst, index, src } => {
                write!(f, "ins.{shape} {}[{index}], {}", RegName(dst), RegName(src))
            }
            Self::LaneCopy { shape, dst, dst_index, src, src_index } => write!(
                f,
                "ins.{shape} {}[{dst_index}], {}[{src_index}]",
                RegName(dst),
                RegName(src)
            ),
            Self::LaneToScalar { shape, dst, src, index } => {
                write!(f, "mov.{shape} {}, {}[{index}]", RegName(dst), RegName(src))
            }
            Self::SplatGpr { shape, dst, src } => {
                write!(f, "dup.{shape} {}, {}", RegName(dst), RegName(src))
            }
            Self::SplatLane { shape, dst, src, index } => {
                write!(f, "dup.{shape} {}, {}[{index}]", RegName(dst), RegName(src))
            }
            Self::AndImm32 { dst, src, mask } => {
                write!(f, "and32 {}, {}, #{mask}", RegName(dst), RegName(src))
            }
            Self::Neg32 { dst, src } => write!(f, "neg32 {}, {}", RegName(dst), RegName(src)),
            Self::SetIf { test, dst, src } => {
                let cond = match test {
                    ZeroTest::Zero => "eq",
                    ZeroTest::NonZero => "ne",
                };
                write!(f, "set.{cond} {}, {}", RegName(dst), RegName(src))
            }
            Self::Raw(word) => write!(f, "raw {word:#010x}"),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct RecordingMasm {
    insts: Vec<MasmInst>,
}

impl RecordingMasm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insts(&self) -> &[MasmInst] {
        &self.insts
    }

    pub fn is_empty(&self) -> bool {
        self.insts.is_empty()
    }

    pub fn loads(&self) -> impl Iterator<Item = &MasmInst> {
        self.insts
            .iter()
            .filter(|inst| matches!(inst, MasmInst::Load { .. }))
    }

    pub fn stores(&self) -> impl Iterator<Item = &MasmInst> {
        self.insts
            .iter()
            .filter(|inst| matches!(inst, MasmInst::Store { .. }))
    }

    pub fn raw_words(&self) -> Vec<u32> {
        self.insts
            .iter()
            .filter_map(|inst| match inst {
                MasmInst::Raw(word) => Some(*word),
                _ => None,
            })
            .collect()
    }

    /// One primitive per line.
    pub fn listing(&self) -> String {
        let mut out = String::new();
        for inst in &self.insts {
            out.push_str(&inst.to_string());
            out.push('\n');
        }
        out
    }

    fn push(&mut self, inst: MasmInst) {
        self.insts.push(inst);
    }
}

impl MacroAssembler for RecordingMasm {
    fn load(&mut self, kind: ValueKind, dst: PReg, src: Address) {
        self.push(MasmInst::Load { kind, dst, src });
    }

    fn store(&mut self, kind: ValueKind, src: PReg, dst: Address) {
        self.push(MasmInst::Store { kind, src, dst });
    }

    fn mov(&mut self, kind: ValueKind, dst: PReg, src: PReg) {
        self.push(MasmInst::Mov { kind, dst, src });
    }

    fn load_constant(&mut self, dst: PReg, value: Immediate) {
        self.push(MasmInst::Const { dst, value });
    }

    fn lane_to_gpr(&mut self, shape: LaneShape, signed: bool, dst: PReg, src: PReg, index: u8) {
        self.push(MasmInst::LaneToGpr { shape, signed, dst, src, index });
    }

    fn lane_from_gpr(&mut self, shape: LaneShape, dst: PReg, index: u8, src: PReg) {
        self.push(MasmInst::LaneFromGpr { shape, dst, index, src });
    }

    fn lane_copy(&mut self, shape: LaneShape, dst: PReg, dst_index: u8, src: PReg, src_index: u8) {
        self.push(MasmInst::LaneCopy { shape, dst, dst_index, src, src_index });
    }

    fn lane_to_scalar(&mut self, shape: LaneShape, dst: PReg, src: PReg, index: u8) {
        self.push(MasmInst::LaneToScalar { shape, dst, src, index });
    }

    fn splat_gpr(&mut self, shape: LaneShape, dst: PReg, src: PReg) {
        self.push(MasmInst::SplatGpr { shape, dst, src });
    }

    fn splat_lane(&mut self, shape: LaneShape, dst: PReg, src: PReg, index: u8) {
        self.push(MasmInst::SplatLane { shape, dst, src, index });
    }

    fn and_imm32(&mut self, dst: PReg, src: PReg, mask: u32) {
        self.push(MasmInst::AndImm32 { dst, src, mask });
    }

    fn neg32(&mut self, dst: PReg, src: PReg) {
        self.push(MasmInst::Neg32 { dst, src });
    }

    fn set_if(&mut self, test: ZeroTest, dst: PReg, src: PReg) {
        self.push(MasmInst::SetIf { test, dst, src });
    }

    fn emit_custom(&mut self, word: u32) {
        self.push(MasmInst::Raw(word));
    }

    /// Four bytes per recorded primitive.
    fn offset(&self) -> usize {
        self.insts.len() * 4
    }
}
