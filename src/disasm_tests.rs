use std::fmt::Write;

use regalloc2::{PReg, RegClass, VReg};
use yaxpeax_arch::{Decoder, U8Reader};
use yaxpeax_arm::armv8::a64::InstDecoder;

use crate::arch::aarch64::regs::FRAME_BASE;
use crate::selector::{Strategy, classify};
use crate::{
    Aarch64Masm, AllocationMap, CodegenConfig, CodegenContext, FrameLayout, Immediate,
    Instruction, LaneShape, MacroAssembler, Opcode, OperandDescriptor, RecordingMasm, ValueKind,
};

fn disasm_bytes(code: &[u8]) -> String {
    let decoder = InstDecoder::default();
    let mut reader = U8Reader::new(code);
    let mut out = String::new();
    let mut offset = 0usize;
    while offset + 4 <= code.len() {
        match decoder.decode(&mut reader) {
            Ok(inst) => writeln!(&mut out, "{offset:04x}:  {inst}").unwrap(),
            Err(e) => {
                let word = u32::from_le_bytes(code[offset..offset + 4].try_into().unwrap());
                writeln!(&mut out, "{offset:04x}:  <{e}> (0x{word:08x})").unwrap();
            }
        }
        offset += 4;
    }
    out
}

fn context<M: MacroAssembler>(masm: M) -> CodegenContext<M> {
    let mut alloc = AllocationMap::new();
    for n in 0..8 {
        alloc.assign(VReg::new(n, RegClass::Vector), PReg::new(n, RegClass::Vector));
    }
    alloc.assign(VReg::new(8, RegClass::Int), PReg::new(2, RegClass::Int));
    CodegenContext::new(masm, alloc, FrameLayout::new(FRAME_BASE, 4), CodegenConfig::default())
}

fn assemble(instrs: &[Instruction]) -> Vec<u8> {
    let mut ctx = context(Aarch64Masm::new());
    for instr in instrs {
        crate::emit_instruction(&mut ctx, instr).unwrap();
    }
    ctx.masm.finalize().unwrap()
}

fn emit(instrs: &[Instruction]) -> String {
    disasm_bytes(&assemble(instrs))
}

fn vreg(kind: ValueKind, n: usize) -> OperandDescriptor {
    OperandDescriptor::reg(kind, VReg::new(n, RegClass::Vector))
}

fn lines(text: &str) -> Vec<&str> {
    text.lines().collect()
}

#[test]
fn stack_to_stack_unary_loads_computes_stores() {
    let f64x2 = ValueKind::V128(LaneShape::F64x2);
    let text = emit(&[Instruction::new(
        Opcode::F64x2Abs,
        [OperandDescriptor::stack(f64x2, 1), OperandDescriptor::stack(f64x2, 2)],
    )]);
    let lines = lines(&text);
    assert_eq!(lines.len(), 3, "{text}");
    assert!(lines[0].contains("ldr") && lines[0].contains("q26"), "{text}");
    assert!(lines[1].contains("fabs"), "{text}");
    assert!(lines[2].contains("str") && lines[2].contains("q29"), "{text}");
    assert!(!text.contains('<'), "{text}");
}

#[test]
fn logical_registers_are_remapped() {
    let i32x4 = ValueKind::V128(LaneShape::I32x4);
    // logical 0..=2 are hardware v0..v2; none of them move
    let text = emit(&[Instruction::new(
        Opcode::I32x4Mul,
        [vreg(i32x4, 0), vreg(i32x4, 1), vreg(i32x4, 2)],
    )]);
    assert_eq!(lines(&text).len(), 1, "{text}");
    assert!(text.contains("mul") && text.contains("v2"), "{text}");
}

#[test]
fn every_emitted_word_decodes() {
    let i8x16 = ValueKind::V128(LaneShape::I8x16);
    let i16x8 = ValueKind::V128(LaneShape::I16x8);
    let i32x4 = ValueKind::V128(LaneShape::I32x4);
    let i64x2 = ValueKind::V128(LaneShape::I64x2);
    let f32x4 = ValueKind::V128(LaneShape::F32x4);
    let amount = OperandDescriptor::reg(ValueKind::I32, VReg::new(8, RegClass::Int));
    let instrs = [
        Instruction::new(Opcode::I64x2Mul, [vreg(i64x2, 0), vreg(i64x2, 1), vreg(i64x2, 2)]),
        Instruction::new(Opcode::I16x8NarrowI32x4S, [vreg(i32x4, 0), vreg(i32x4, 1), vreg(i16x8, 0)]),
        Instruction::new(Opcode::I32x4DotI16x8S, [vreg(i16x8, 3), vreg(i16x8, 4), vreg(i32x4, 5)]),
        Instruction::new(Opcode::I8x16Shl, [vreg(i8x16, 1), amount, vreg(i8x16, 2)]),
        Instruction::new(
            Opcode::I32x4ShrS,
            [vreg(i32x4, 1), OperandDescriptor::imm(ValueKind::I32, Immediate::I32(7)), vreg(i32x4, 2)],
        ),
        Instruction::new(Opcode::F32x4Pmin, [vreg(f32x4, 1), vreg(f32x4, 2), vreg(f32x4, 1)]),
        Instruction::new(Opcode::I32x4AllTrue, [vreg(i32x4, 3), OperandDescriptor::stack(ValueKind::I32, 0)]),
        Instruction::new(Opcode::V128AnyTrue, [vreg(ValueKind::V128_BITS, 3), OperandDescriptor::stack(ValueKind::I32, 1)]),
        Instruction::new(
            Opcode::I8x16Shuffle,
            [vreg(i8x16, 1), vreg(i8x16, 2), vreg(i8x16, 3)],
        )
        .with_shuffle(core::array::from_fn(|i| (31 - i) as u8)),
        Instruction::new(
            Opcode::I16x8ExtractLaneS,
            [vreg(i16x8, 1), OperandDescriptor::stack(ValueKind::I32, 2)],
        )
        .with_lane(5),
        Instruction::new(
            Opcode::I32x4ReplaceLane,
            [vreg(i32x4, 1), amount, vreg(i32x4, 6)],
        )
        .with_lane(3),
    ];
    let text = emit(&instrs);
    assert!(!text.contains('<'), "{text}");
    assert!(text.contains("tbl"), "{text}");
    assert!(text.contains("umlal"), "{text}");
    assert!(text.contains("sshr"), "{text}");
}

#[test]
fn assembled_words_match_recorded_words() {
    let i64x2 = ValueKind::V128(LaneShape::I64x2);
    let i16x8 = ValueKind::V128(LaneShape::I16x8);
    let instrs = [
        Instruction::new(Opcode::I64x2Mul, [vreg(i64x2, 0), vreg(i64x2, 1), vreg(i64x2, 2)]),
        Instruction::new(Opcode::I16x8LeU, [vreg(i16x8, 3), vreg(i16x8, 4), vreg(i16x8, 5)]),
    ];

    let mut recording = context(RecordingMasm::new());
    for instr in &instrs {
        crate::emit_instruction(&mut recording, instr).unwrap();
    }
    assert_eq!(recording.masm.raw_words().len(), recording.masm.insts().len());

    let words: Vec<u32> = assemble(&instrs)
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes(chunk.try_into().unwrap()))
        .collect();
    assert_eq!(words, recording.masm.raw_words());
}

/// Every classified opcode lowered on its own, all operands in registers:
/// operand `i` sits in register `i + 1` of its class.
fn lower_every_opcode() -> Vec<(Opcode, String)> {
    let config = CodegenConfig::default();
    let mut listings = Vec::new();
    for &opcode in Opcode::ALL {
        let Some(sig) = classify(opcode, &config) else {
            continue;
        };
        let mut alloc = AllocationMap::new();
        let operands: Vec<OperandDescriptor> = sig
            .sources()
            .iter()
            .chain([&sig.dest])
            .enumerate()
            .map(|(i, &kind)| {
                let vreg = VReg::new(32 + i, kind.reg_class());
                alloc.assign(vreg, PReg::new(i + 1, kind.reg_class()));
                OperandDescriptor::reg(kind, vreg)
            })
            .collect();
        let instr = Instruction::new(opcode, operands);
        let instr = match sig.strategy {
            Strategy::ExtractLane | Strategy::ReplaceLane => instr.with_lane(1),
            Strategy::Shuffle => instr.with_shuffle(core::array::from_fn(|i| (i * 3 % 32) as u8)),
            _ => instr,
        };

        let mut ctx = CodegenContext::new(Aarch64Masm::new(), alloc, FrameLayout::new(FRAME_BASE, 4), config);
        crate::emit_instruction(&mut ctx, &instr).unwrap_or_else(|err| panic!("{opcode}: {err}"));
        listings.push((opcode, disasm_bytes(&ctx.masm.finalize().unwrap())));
    }
    listings
}

#[test]
fn every_classified_opcode_decodes() {
    let listings = lower_every_opcode();
    assert!(listings.len() > 200, "only {} opcodes classified", listings.len());
    for (opcode, text) in &listings {
        assert!(!text.is_empty(), "{opcode} emitted nothing");
        assert!(!text.contains('<'), "{opcode}:\n{text}");
    }
}

#[test]
fn every_classified_opcode_listing() {
    let mut out = String::new();
    for (opcode, text) in lower_every_opcode() {
        writeln!(out, "=== {opcode} ===").unwrap();
        out.push_str(&text);
    }
    insta::assert_snapshot!("disasm_every_opcode", out);
}

#[test]
fn contexts_are_send() {
    fn assert_send<T: Send>() {}
    assert_send::<CodegenContext<Aarch64Masm>>();
    assert_send::<CodegenContext<RecordingMasm>>();
}
