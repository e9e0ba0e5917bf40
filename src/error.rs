use regalloc2::{PReg, VReg};
use thiserror::Error;

use crate::instruction::Opcode;
use crate::kind::ValueKind;

/// Fatal lowering failure. The function being compiled is abandoned and
/// whatever was emitted for it must be discarded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("{opcode} has no vector lowering")]
    UnreachableOpcode { opcode: Opcode },

    #[error("{opcode} takes {expected} operands, got {found}")]
    OperandCount {
        opcode: Opcode,
        expected: usize,
        found: usize,
    },

    #[error("{opcode} operand {index} is {found}, expected {expected}")]
    OperandKind {
        opcode: Opcode,
        index: usize,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("{opcode} is missing its lane or shuffle immediate, or it is out of range")]
    BadImmediate { opcode: Opcode },

    #[error("{opcode} writes to an immediate")]
    ImmediateDestination { opcode: Opcode },

    #[error("virtual register {vreg} has no allocation")]
    Unallocated { vreg: VReg },

    #[error("virtual register {vreg} is allocated to reserved register {preg:?}")]
    ReservedRegister { vreg: VReg, preg: PReg },

    #[error("failed to finalize machine code: {0}")]
    Finalize(String),
}
