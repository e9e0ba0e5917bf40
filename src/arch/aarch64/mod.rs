//! AArch64 Advanced SIMD backend.

pub mod encoding;
pub mod lower;
pub mod masm;
pub mod regs;
pub mod table;

pub use encoding::{RawEncoder, RawOp, RegisterEncoding, Template};
pub use masm::Aarch64Masm;
pub use regs::Aarch64Registers;
