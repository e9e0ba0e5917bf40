//! Whole-function driver.

use crate::arch::aarch64::Aarch64Masm;
use crate::config::CodegenConfig;
use crate::context::{AllocationMap, CodegenContext, FrameLayout};
use crate::error::CompileError;
use crate::instruction::Instruction;

/// Lower `instrs` in order into a fresh AArch64 buffer.
///
/// The first failing instruction abandons the whole function: its partially
/// filled buffer is dropped and the error is returned.
pub fn compile_function(
    instrs: &[Instruction],
    allocation: AllocationMap,
    frame: FrameLayout,
    config: CodegenConfig,
) -> Result<Vec<u8>, CompileError> {
    let _span = tracing::debug_span!("compile_function", instrs = instrs.len()).entered();

    let mut ctx = CodegenContext::new(Aarch64Masm::new(), allocation, frame, config);
    for (index, instr) in instrs.iter().enumerate() {
        if let Err(err) = crate::emit_instruction(&mut ctx, instr) {
            tracing::debug!(index, %err, "abandoning function");
            return Err(err);
        }
    }
    let code = ctx.masm.finalize()?;
    tracing::debug!(bytes = code.len(), "compiled function");
    Ok(code)
}
