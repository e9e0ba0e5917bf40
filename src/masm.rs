//! The portable assembler contract.
//!
//! Lowering code only talks to a [`MacroAssembler`]. Registers passed in are
//! the allocator's `PReg`s; each implementation maps them to hardware
//! encodings. Anything the primitive set cannot express goes through
//! [`MacroAssembler::emit_custom`] as a finished instruction word.

use std::fmt;

use regalloc2::{PReg, RegClass};

use crate::kind::{LaneShape, ValueKind};
use crate::operand::Immediate;

/// `base + offset`, with `base` a general-purpose register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    pub base: PReg,
    pub offset: i32,
}

impl Address {
    pub const fn new(base: PReg, offset: i32) -> Self {
        Self { base, offset }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, #{}]", RegName(self.base), self.offset)
    }
}

/// Condition for [`MacroAssembler::set_if`], tested against zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZeroTest {
    Zero,
    NonZero,
}

/// Register formatting shared by listings: `x{n}` for integer registers,
/// `v{n}` for float and vector registers.
pub struct RegName(pub PReg);

impl fmt::Display for RegName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.class() {
            RegClass::Int => write!(f, "x{}", self.0.hw_enc()),
            RegClass::Float | RegClass::Vector => write!(f, "v{}", self.0.hw_enc()),
        }
    }
}

pub trait MacroAssembler {
    /// Load a value of exactly `kind` into `dst`.
    fn load(&mut self, kind: ValueKind, dst: PReg, src: Address);

    /// Store the `kind`-sized value in `src`.
    fn store(&mut self, kind: ValueKind, src: PReg, dst: Address);

    /// Register to register copy within one register file.
    fn mov(&mut self, kind: ValueKind, dst: PReg, src: PReg);

    /// Materialize a constant. Scalar integers go to a GPR, floats and
    /// vectors to a vector register.
    fn load_constant(&mut self, dst: PReg, value: Immediate);

    /// Move lane `index` of `src` into GPR `dst`, sign- or zero-extended.
    fn lane_to_gpr(&mut self, shape: LaneShape, signed: bool, dst: PReg, src: PReg, index: u8);

    /// Insert the low bits of GPR `src` into lane `index` of `dst`.
    fn lane_from_gpr(&mut self, shape: LaneShape, dst: PReg, index: u8, src: PReg);

    /// Copy lane `src_index` of `src` into lane `dst_index` of `dst`.
    fn lane_copy(&mut self, shape: LaneShape, dst: PReg, dst_index: u8, src: PReg, src_index: u8);

    /// Copy lane `index` of `src` into `dst` as a scalar, clearing the rest.
    fn lane_to_scalar(&mut self, shape: LaneShape, dst: PReg, src: PReg, index: u8);

    /// Replicate GPR `src` into every lane of `dst`.
    fn splat_gpr(&mut self, shape: LaneShape, dst: PReg, src: PReg);

    /// Replicate lane `index` of `src` into every lane of `dst`.
    fn splat_lane(&mut self, shape: LaneShape, dst: PReg, src: PReg, index: u8);

    /// 32-bit `dst = src & mask`.
    fn and_imm32(&mut self, dst: PReg, src: PReg, mask: u32);

    /// 32-bit `dst = -src`.
    fn neg32(&mut self, dst: PReg, src: PReg);

    /// `dst = (src <test> 0) as u32`, comparing all 64 bits of `src`.
    fn set_if(&mut self, test: ZeroTest, dst: PReg, src: PReg);

    /// Append a finished instruction word.
    fn emit_custom(&mut self, word: u32);

    /// Bytes emitted so far.
    fn offset(&self) -> usize;
}
