//! Register numbering.
//!
//! The allocator hands out logical vector registers 0..=25, which pack the
//! caller-saved registers first: v0..v7 and v16..v25, then the callee-saved
//! v8..v15. Logical 26..=31 map to v26..v31 and are never allocated; they
//! are the scratch registers below. General-purpose registers map 1:1; x16
//! and x17 are reserved as scratch and x19 holds the frame base.

use regalloc2::{PReg, RegClass};

use super::encoding::RegisterEncoding;

const VECTOR_MAP: [u8; 32] = [
    0, 1, 2, 3, 4, 5, 6, 7, //
    16, 17, 18, 19, 20, 21, 22, 23, 24, 25, //
    8, 9, 10, 11, 12, 13, 14, 15, //
    26, 27, 28, 29, 30, 31,
];

/// Allocatable logical vector registers.
pub const ALLOCATABLE_VECTORS: usize = 26;

/// Whether the allocator may hand out `reg`. General registers other than
/// the reserved scratch and frame base are fine; vector registers must sit
/// below the scratch range.
pub fn is_allocatable(reg: PReg) -> bool {
    match reg.class() {
        RegClass::Int => reg != GPR_SCRATCH && reg != ASM_SCRATCH && reg != FRAME_BASE && reg.hw_enc() < 31,
        RegClass::Float | RegClass::Vector => reg.hw_enc() < ALLOCATABLE_VECTORS,
    }
}

pub const FRAME_BASE: PReg = PReg::new(19, RegClass::Int);
/// GPR scratch available to lowering code.
pub const GPR_SCRATCH: PReg = PReg::new(16, RegClass::Int);
/// GPR scratch owned by the assembler for constants and far offsets.
pub const ASM_SCRATCH: PReg = PReg::new(17, RegClass::Int);

/// Source scratch registers. The first two are consecutive hardware
/// registers, as two-register table lookups require.
pub const SRC_SCRATCH: [PReg; 3] = [
    PReg::new(26, RegClass::Vector),
    PReg::new(27, RegClass::Vector),
    PReg::new(28, RegClass::Vector),
];
/// Result register when the destination is memory or would clobber a source.
pub const DST_SCRATCH: PReg = PReg::new(29, RegClass::Vector);
/// Temporaries for multi-instruction sequences.
pub const TMP: [PReg; 2] = [
    PReg::new(30, RegClass::Vector),
    PReg::new(31, RegClass::Vector),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct Aarch64Registers;

impl RegisterEncoding for Aarch64Registers {
    fn hw_index(&self, reg: PReg) -> u32 {
        match reg.class() {
            RegClass::Int => reg.hw_enc() as u32,
            RegClass::Float | RegClass::Vector => {
                debug_assert!(reg.hw_enc() < VECTOR_MAP.len(), "vector register {reg:?} out of range");
                u32::from(VECTOR_MAP[reg.hw_enc() % VECTOR_MAP.len()])
            }
        }
    }
}

/// Same register in the float/vector view.
pub fn as_float(reg: PReg) -> PReg {
    PReg::new(reg.hw_enc(), RegClass::Float)
}

/// Whether two registers name the same hardware register. Float and vector
/// classes share one register file.
pub fn same_reg(a: PReg, b: PReg) -> bool {
    let is_int = |r: PReg| r.class() == RegClass::Int;
    is_int(a) == is_int(b) && Aarch64Registers.hw_index(a) == Aarch64Registers.hw_index(b)
}
