//! Raw AArch64 Advanced SIMD instruction words.
//!
//! A word is a [`Template`] (fixed opcode bits with every register field
//! zeroed), plus modifier bits picked per use (element size, upper-half `Q`,
//! shift immediates), plus register indices OR'd in at fixed offsets:
//! `rd` at bit 0, `rn` at bit 5, `rm` at bit 16. Registers are translated to
//! hardware indices by an injected [`RegisterEncoding`].

use regalloc2::{PReg, RegClass};

use crate::kind::LaneShape;
use crate::masm::MacroAssembler;

pub const RD_SHIFT: u32 = 0;
pub const RN_SHIFT: u32 = 5;
pub const RM_SHIFT: u32 = 16;
const REG_MASK: u32 = 0x1f;

/// Element size field (`size` or `sz`) position.
const SIZE_SHIFT: u32 = 22;
/// `Q`: full 128-bit operation, or the upper-half ("2") variant.
pub const Q_BIT: u32 = 1 << 30;
/// `tbl` with a two-register table.
pub const TBL_TWO_REGS: u32 = 1 << 13;

/// Logical register to hardware register number.
pub trait RegisterEncoding {
    fn hw_index(&self, reg: PReg) -> u32;
}

/// Which register file a field addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegFile {
    Gpr,
    Vector,
}

impl RegFile {
    /// Whether `reg` lives in this register file. Float and vector registers
    /// share one file.
    pub fn admits(self, reg: PReg) -> bool {
        matches!(
            (self, reg.class()),
            (RegFile::Gpr, RegClass::Int) | (RegFile::Vector, RegClass::Float | RegClass::Vector)
        )
    }
}

/// Register fields and immediate field an encoding uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Form {
    pub rd: RegFile,
    pub rn: Option<RegFile>,
    pub rm: bool,
    /// Bits reserved for an immediate the caller supplies as a modifier.
    pub imm_mask: u32,
}

impl Form {
    const UNARY: Form = Form {
        rd: RegFile::Vector,
        rn: Some(RegFile::Vector),
        rm: false,
        imm_mask: 0,
    };
    const BINARY: Form = Form {
        rm: true,
        ..Form::UNARY
    };
    const SHIFT_IMM: Form = Form {
        imm_mask: 0x7f << 16,
        ..Form::UNARY
    };
    const ELEMENT: Form = Form {
        imm_mask: 0x1f << 16,
        ..Form::UNARY
    };

    /// Every bit a register or immediate field may occupy.
    pub fn field_mask(self) -> u32 {
        let mut mask = REG_MASK << RD_SHIFT;
        if self.rn.is_some() {
            mask |= REG_MASK << RN_SHIFT;
        }
        if self.rm {
            mask |= REG_MASK << RM_SHIFT;
        }
        mask | self.imm_mask
    }
}

macro_rules! templates {
    ($($name:ident = $bits:literal, $form:expr;)*) => {
        /// Fixed opcode bits of each instruction the encoder builds.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Template {
            $($name),*
        }

        impl Template {
            pub const ALL: &'static [Template] = &[$(Template::$name),*];

            pub const fn bits(self) -> u32 {
                match self {
                    $(Template::$name => $bits),*
                }
            }

            pub const fn form(self) -> Form {
                match self {
                    $(Template::$name => $form),*
                }
            }
        }
    };
}

templates! {
    Abs = 0x4e20_b800, Form::UNARY;
    Add = 0x4e20_8400, Form::BINARY;
    Addp = 0x4e20_bc00, Form::BINARY;
    And = 0x4e20_1c00, Form::BINARY;
    Bic = 0x4e60_1c00, Form::BINARY;
    Bsl = 0x6e60_1c00, Form::BINARY;
    Cmeq = 0x6e20_8c00, Form::BINARY;
    CmeqZero = 0x4e20_9800, Form::UNARY;
    Cmge = 0x4e20_3c00, Form::BINARY;
    Cmgt = 0x4e20_3400, Form::BINARY;
    Cmhi = 0x6e20_3400, Form::BINARY;
    Cmhs = 0x6e20_3c00, Form::BINARY;
    Cnt = 0x4e20_5800, Form::UNARY;
    Eor = 0x6e20_1c00, Form::BINARY;
    Fabs = 0x4ea0_f800, Form::UNARY;
    Fadd = 0x4e20_d400, Form::BINARY;
    Fcmeq = 0x4e20_e400, Form::BINARY;
    Fcmge = 0x6e20_e400, Form::BINARY;
    Fcmgt = 0x6ea0_e400, Form::BINARY;
    Fcvtl = 0x0e21_7800, Form::UNARY;
    Fcvtn = 0x0e21_6800, Form::UNARY;
    Fcvtzs = 0x4ea1_b800, Form::UNARY;
    Fcvtzu = 0x6ea1_b800, Form::UNARY;
    Fdiv = 0x6e20_fc00, Form::BINARY;
    Fmax = 0x4e20_f400, Form::BINARY;
    Fmin = 0x4ea0_f400, Form::BINARY;
    Fmla = 0x4e20_cc00, Form::BINARY;
    Fmls = 0x4ea0_cc00, Form::BINARY;
    Fmul = 0x6e20_dc00, Form::BINARY;
    Fneg = 0x6ea0_f800, Form::UNARY;
    Frintm = 0x4e21_9800, Form::UNARY;
    Frintn = 0x4e21_8800, Form::UNARY;
    Frintp = 0x4ea1_8800, Form::UNARY;
    Frintz = 0x4ea1_9800, Form::UNARY;
    Fsqrt = 0x6ea1_f800, Form::UNARY;
    Fsub = 0x4ea0_d400, Form::BINARY;
    Mul = 0x4e20_9c00, Form::BINARY;
    Neg = 0x6e20_b800, Form::UNARY;
    Not = 0x6e20_5800, Form::UNARY;
    Orr = 0x4ea0_1c00, Form::BINARY;
    Rev64 = 0x4e20_0800, Form::UNARY;
    Saddlp = 0x4e20_2800, Form::UNARY;
    Scvtf = 0x4e21_d800, Form::UNARY;
    Shl = 0x4f00_5400, Form::SHIFT_IMM;
    Shll = 0x2e21_3800, Form::UNARY;
    Smax = 0x4e20_6400, Form::BINARY;
    Smin = 0x4e20_6c00, Form::BINARY;
    Smull = 0x0e20_c000, Form::BINARY;
    Sqadd = 0x4e20_0c00, Form::BINARY;
    Sqrdmulh = 0x6e20_b400, Form::BINARY;
    Sqsub = 0x4e20_2c00, Form::BINARY;
    Sqxtn = 0x0e21_4800, Form::UNARY;
    Sqxtun = 0x2e21_2800, Form::UNARY;
    Sshl = 0x4e20_4400, Form::BINARY;
    Sshr = 0x4f00_0400, Form::SHIFT_IMM;
    Sub = 0x6e20_8400, Form::BINARY;
    Sxtl = 0x0f00_a400, Form::UNARY;
    Tbl = 0x4e00_0000, Form::BINARY;
    Uaddlp = 0x6e20_2800, Form::UNARY;
    Ucvtf = 0x6e21_d800, Form::UNARY;
    Umax = 0x6e20_6400, Form::BINARY;
    Umaxp = 0x6e20_a400, Form::BINARY;
    Umin = 0x6e20_6c00, Form::BINARY;
    Uminv = 0x6e31_a800, Form::UNARY;
    Umlal = 0x2e20_8000, Form::BINARY;
    Umull = 0x2e20_c000, Form::BINARY;
    Uqadd = 0x6e20_0c00, Form::BINARY;
    Uqsub = 0x6e20_2c00, Form::BINARY;
    Uqxtn = 0x2e21_4800, Form::UNARY;
    Urhadd = 0x6e20_1400, Form::BINARY;
    Ushl = 0x6e20_4400, Form::BINARY;
    Ushr = 0x6f00_0400, Form::SHIFT_IMM;
    Uxtl = 0x2f00_a400, Form::UNARY;
    Xtn = 0x0e21_2800, Form::UNARY;

    // Lane and register-file moves.
    DupElement = 0x4e00_0400, Form::ELEMENT;
    DupGeneral = 0x4e00_0c00, Form { rn: Some(RegFile::Gpr), ..Form::ELEMENT };
    DupScalar = 0x5e00_0400, Form::ELEMENT;
    FmovFromW = 0x1e27_0000, Form { rn: Some(RegFile::Gpr), ..Form::UNARY };
    FmovFromX = 0x9e67_0000, Form { rn: Some(RegFile::Gpr), ..Form::UNARY };
    InsElement = 0x6e00_0400, Form { imm_mask: (0x1f << 16) | (0xf << 11), ..Form::UNARY };
    InsGeneral = 0x4e00_1c00, Form { rn: Some(RegFile::Gpr), ..Form::ELEMENT };
    MoviZero = 0x6f00_e400, Form { rn: None, ..Form::UNARY };
    Smov = 0x0e00_2c00, Form { rd: RegFile::Gpr, ..Form::ELEMENT };
    Umov = 0x0e00_3c00, Form { rd: RegFile::Gpr, ..Form::ELEMENT };
}

impl Template {
    pub const fn op(self) -> RawOp {
        RawOp {
            template: self,
            modifiers: 0,
        }
    }

    pub const fn size(self, shape: LaneShape) -> RawOp {
        self.op().size(shape)
    }
}

/// A template with its modifier bits chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawOp {
    template: Template,
    modifiers: u32,
}

impl RawOp {
    /// Element size for `shape`: the two-bit `size` field for integer lanes,
    /// the `sz` bit for float lanes.
    pub const fn size(self, shape: LaneShape) -> Self {
        let field = match shape {
            LaneShape::F32x4 | LaneShape::Bits => 0,
            LaneShape::F64x2 => 1,
            _ => shape.lane_size_log2(),
        };
        self.with(field << SIZE_SHIFT)
    }

    /// The "2" variant, operating on the upper half.
    pub const fn upper(self) -> Self {
        self.with(Q_BIT)
    }

    pub const fn with(self, bits: u32) -> Self {
        Self {
            template: self.template,
            modifiers: self.modifiers | bits,
        }
    }

    pub const fn template(self) -> Template {
        self.template
    }

    pub const fn modifiers(self) -> u32 {
        self.modifiers
    }

    pub const fn bits(self) -> u32 {
        self.template.bits() | self.modifiers
    }
}

/// `imm5` for lane `index` of `shape`: lowest set bit marks the element
/// size, the index sits above it.
pub const fn lane_imm5(shape: LaneShape, index: u8) -> u32 {
    let log2 = shape.lane_size_log2();
    (((index as u32) << (log2 + 1)) | (1 << log2)) << 16
}

/// `imm4` of `ins` (element): source lane index scaled by element size.
pub const fn lane_imm4(shape: LaneShape, index: u8) -> u32 {
    ((index as u32) << shape.lane_size_log2()) << 11
}

/// Builds instruction words with registers mapped through `E`.
pub struct RawEncoder<'r, E: ?Sized> {
    regs: &'r E,
}

impl<'r, E: RegisterEncoding + ?Sized> RawEncoder<'r, E> {
    pub fn new(regs: &'r E) -> Self {
        Self { regs }
    }

    pub fn encode(&self, op: RawOp, rd: PReg, rn: PReg, rm: Option<PReg>) -> u32 {
        let form = op.template().form();
        debug_assert!(form.rd.admits(rd), "{:?}: rd {rd:?} in the wrong register file", op.template());
        let mut word = op.bits() | (self.regs.hw_index(rd) << RD_SHIFT);
        if let Some(file) = form.rn {
            debug_assert!(file.admits(rn), "{:?}: rn {rn:?} in the wrong register file", op.template());
            word |= self.regs.hw_index(rn) << RN_SHIFT;
        }
        if let Some(rm) = rm {
            debug_assert!(
                form.rm && RegFile::Vector.admits(rm),
                "{:?}: unexpected rm {rm:?}",
                op.template()
            );
            word |= self.regs.hw_index(rm) << RM_SHIFT;
        }
        word
    }

    /// Encode and append exactly one word.
    pub fn emit<M: MacroAssembler + ?Sized>(
        &self,
        masm: &mut M,
        op: RawOp,
        rd: PReg,
        rn: PReg,
        rm: Option<PReg>,
    ) {
        let word = self.encode(op, rd, rn, rm);
        tracing::trace!(template = ?op.template(), word = format_args!("{word:#010x}"), "raw");
        masm.emit_custom(word);
    }
}

#[cfg(test)]
mod tests {
    use regalloc2::RegClass;

    use super::*;

    struct Identity;

    impl RegisterEncoding for Identity {
        fn hw_index(&self, reg: PReg) -> u32 {
            reg.hw_enc() as u32
        }
    }

    fn v(n: usize) -> PReg {
        PReg::new(n, RegClass::Vector)
    }

    #[test]
    fn template_bits_leave_fields_clear() {
        for &t in Template::ALL {
            assert_eq!(t.bits() & t.form().field_mask(), 0, "{t:?}");
        }
    }

    #[test]
    fn binary_word_places_fields() {
        let enc = RawEncoder::new(&Identity);
        let word = enc.encode(Template::Fmin.size(LaneShape::F64x2), v(3), v(4), Some(v(5)));
        assert_eq!(word, (0x4ea0_f400 | 1 << 22) | 3 | 4 << 5 | 5 << 16);
    }

    #[test]
    fn unary_word_ignores_rm() {
        let enc = RawEncoder::new(&Identity);
        let word = enc.encode(Template::Fabs.size(LaneShape::F64x2), v(1), v(2), None);
        assert_eq!(word, 0x4ee0_f800 | 1 | 2 << 5);
    }

    #[test]
    fn general_register_fields() {
        let enc = RawEncoder::new(&Identity);
        let x = |n| PReg::new(n, RegClass::Int);
        // umov w2, v1.s[0]
        let op = Template::Umov.op().with(lane_imm5(LaneShape::I32x4, 0));
        assert_eq!(enc.encode(op, x(2), v(1), None), 0x0e04_3c00 | 2 | 1 << 5);
        // dup v3.4s, w16
        let op = Template::DupGeneral.op().with(lane_imm5(LaneShape::I32x4, 0));
        assert_eq!(enc.encode(op, v(3), x(16), None), 0x4e04_0c00 | 3 | 16 << 5);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "wrong register file")]
    fn vector_register_in_general_field_is_rejected() {
        let op = Template::Umov.op().with(lane_imm5(LaneShape::I32x4, 0));
        RawEncoder::new(&Identity).encode(op, v(2), v(1), None);
    }

    #[test]
    fn size_field_per_shape() {
        assert_eq!(Template::Add.size(LaneShape::I8x16).bits(), 0x4e20_8400);
        assert_eq!(Template::Add.size(LaneShape::I16x8).bits(), 0x4e60_8400);
        assert_eq!(Template::Add.size(LaneShape::I32x4).bits(), 0x4ea0_8400);
        assert_eq!(Template::Add.size(LaneShape::I64x2).bits(), 0x4ee0_8400);
        assert_eq!(Template::Fadd.size(LaneShape::F32x4).bits(), 0x4e20_d400);
        assert_eq!(Template::Fadd.size(LaneShape::F64x2).bits(), 0x4e60_d400);
        assert_eq!(Template::Smull.size(LaneShape::I8x16).upper().bits(), 0x4e20_c000);
    }

    #[test]
    fn lane_immediates() {
        // mov x0, v1.d[1]
        assert_eq!(lane_imm5(LaneShape::I64x2, 1), 0b11000 << 16);
        // b[5]
        assert_eq!(lane_imm5(LaneShape::I8x16, 5), 0b01011 << 16);
        assert_eq!(lane_imm4(LaneShape::I32x4, 3), 0b1100 << 11);
    }
}
