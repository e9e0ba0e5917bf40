//! Operand resolution and instruction emission for WebAssembly SIMD on
//! AArch64.
//!
//! A register allocator has already run. Each [`Instruction`] carries operand
//! descriptors naming virtual registers, frame slots or immediates; lowering
//! resolves them to physical locations, picks an Advanced SIMD encoding for
//! the opcode and element width, and emits through a [`MacroAssembler`].
//!
//! ```ignore
//! let mut ctx = CodegenContext::new(Aarch64Masm::new(), allocation, frame, config);
//! for instr in &body {
//!     wavejit::emit_instruction(&mut ctx, instr)?;
//! }
//! let code = ctx.masm.finalize()?;
//! ```

pub mod arch;
pub mod compile;
pub mod config;
pub mod context;
pub mod error;
pub mod instruction;
pub mod kind;
pub mod masm;
pub mod materialize;
pub mod operand;
pub mod recording;
pub mod selector;

#[cfg(test)]
mod disasm_tests;

pub use arch::aarch64::{Aarch64Masm, Aarch64Registers};
pub use compile::compile_function;
pub use config::CodegenConfig;
pub use context::{AllocationMap, CodegenContext, FrameLayout};
pub use error::CompileError;
pub use instruction::{InstImmediate, Instruction, Opcode};
pub use kind::{LaneShape, ValueKind};
pub use masm::MacroAssembler;
pub use operand::{Immediate, Location, OperandDescriptor, StackSlot};
pub use recording::RecordingMasm;

/// Emit machine code for one instruction.
///
/// On error nothing has been emitted for `instr`, but the caller must still
/// abandon the function being compiled.
pub fn emit_instruction<M: MacroAssembler>(
    ctx: &mut CodegenContext<M>,
    instr: &Instruction,
) -> Result<(), CompileError> {
    let start = ctx.masm.offset();
    arch::aarch64::lower::lower(ctx, instr)?;
    tracing::trace!(
        opcode = %instr.opcode,
        bytes = ctx.masm.offset() - start,
        "emitted"
    );
    Ok(())
}
