/// Knobs for the vector lowering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodegenConfig {
    /// Check every operand kind against the opcode table before emitting.
    /// Upstream validation already guarantees them, so this is a debugging aid.
    pub verify_operand_kinds: bool,
    /// Lower relaxed-simd opcodes. When off they are unreachable opcodes.
    pub relaxed_simd: bool,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            verify_operand_kinds: cfg!(debug_assertions),
            relaxed_simd: true,
        }
    }
}

impl CodegenConfig {
    /// Defaults, overridden by `WAVEJIT_VERIFY_KINDS` and
    /// `WAVEJIT_RELAXED_SIMD` (`1` enables, anything else disables).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| lookup(key).map_or(default, |v| v == "1");
        Self {
            verify_operand_kinds: flag("WAVEJIT_VERIFY_KINDS", defaults.verify_operand_kinds),
            relaxed_simd: flag("WAVEJIT_RELAXED_SIMD", defaults.relaxed_simd),
        }
    }
}
