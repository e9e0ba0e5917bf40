//! Per-function state the lowering reads: register allocation results, frame
//! layout, configuration, and the assembler being filled.

use std::collections::HashMap;

use regalloc2::{Allocation, PReg, SpillSlot, VReg};

use crate::config::CodegenConfig;
use crate::operand::StackSlot;

/// Byte stride between consecutive frame slots. Every slot can hold a v128.
pub const SLOT_STRIDE: i32 = 16;

/// Where frame slots and allocator spill slots live relative to the frame
/// base register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub base: PReg,
    pub slot_base: i32,
    pub spill_base: i32,
}

impl FrameLayout {
    /// `slot_count` frame slots at the bottom of the frame, spill slots above.
    pub fn new(base: PReg, slot_count: u32) -> Self {
        Self {
            base,
            slot_base: 0,
            spill_base: slot_count as i32 * SLOT_STRIDE,
        }
    }

    pub fn slot_offset(&self, slot: StackSlot) -> i32 {
        self.slot_base + slot.index as i32 * SLOT_STRIDE
    }

    pub fn spill_offset(&self, slot: SpillSlot) -> i32 {
        self.spill_base + slot.index() as i32 * SLOT_STRIDE
    }
}

/// Final location of every virtual register, as handed over by regalloc2.
#[derive(Debug, Default, Clone)]
pub struct AllocationMap {
    allocs: HashMap<VReg, Allocation>,
}

impl AllocationMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, vreg: VReg, alloc: Allocation) {
        self.allocs.insert(vreg, alloc);
    }

    pub fn assign(&mut self, vreg: VReg, preg: PReg) {
        self.insert(vreg, Allocation::reg(preg));
    }

    pub fn spill(&mut self, vreg: VReg, slot: SpillSlot) {
        self.insert(vreg, Allocation::stack(slot));
    }

    /// `None` for unknown registers and for `Allocation::none()`.
    pub fn get(&self, vreg: VReg) -> Option<Allocation> {
        self.allocs
            .get(&vreg)
            .copied()
            .filter(|alloc| !alloc.is_none())
    }
}

impl FromIterator<(VReg, Allocation)> for AllocationMap {
    fn from_iter<I: IntoIterator<Item = (VReg, Allocation)>>(iter: I) -> Self {
        Self {
            allocs: iter.into_iter().collect(),
        }
    }
}

pub struct CodegenContext<M> {
    pub masm: M,
    pub allocation: AllocationMap,
    pub frame: FrameLayout,
    pub config: CodegenConfig,
}

impl<M> CodegenContext<M> {
    pub fn new(masm: M, allocation: AllocationMap, frame: FrameLayout, config: CodegenConfig) -> Self {
        Self {
            masm,
            allocation,
            frame,
            config,
        }
    }
}
