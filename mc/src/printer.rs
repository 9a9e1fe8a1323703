//! Renders a program in an assembly-like text form.
//!
//! Purely diagnostic; used by golden tests and for debugging generated
//! code. Output is deterministic for a given program.
use core::fmt::Write;

use crate::insn::{Insn, MemType};
use crate::program::Program;

fn mem_suffix(ty: MemType) -> &'static str {
    match ty {
        MemType::Bool => "b",
        MemType::U8 => "u8",
        MemType::U16 => "u16",
        MemType::U32 => "u32",
        MemType::U64 => "u64",
        MemType::S8 => "s8",
        MemType::S16 => "s16",
        MemType::S32 => "s32",
        MemType::S64 => "s64",
        MemType::Float => "f",
    }
}

fn hex_block(bytes: &[u8]) -> String {
    let mut out = String::from("0x");
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Renders the program as text.
///
/// Total over every constructible program; the instruction type cannot
/// represent an opcode/operand mismatch, so no rendering path fails.
pub fn pretty_print(program: &Program) -> String {
    let mut out = String::new();

    let _ = writeln!(out, ".version {}", program.version());
    let _ = writeln!(out, ".machine {}", hex_block(program.machine_id()));
    if let Some(label) = program.on_init() {
        let _ = writeln!(out, ".on_init {label}");
    }
    if let Some(label) = program.on_packet() {
        let _ = writeln!(out, ".on_packet {label}");
    }
    if let Some(label) = program.on_periodic() {
        let _ = writeln!(out, ".on_periodic {label}");
    }

    for instruction in program.instructions() {
        out.push('\n');
        if let Some(label) = &instruction.label {
            let _ = writeln!(out, "{label}:");
        }
        out.push('\t');

        match &instruction.insn {
            Insn::LdSourceEid => out.push_str("ld src.eid"),
            Insn::LdSourceVal => out.push_str("ld src.val"),
            Insn::LdFalse => out.push_str("ld false"),
            Insn::LdTrue => out.push_str("ld true"),
            Insn::LdSysTime => out.push_str("ld sys.time"),
            Insn::LdU8(v) => {
                let _ = write!(out, "ld u8({v})");
            }
            Insn::LdU16(v) => {
                let _ = write!(out, "ld u16({v})");
            }
            Insn::LdU32(v) => {
                let _ = write!(out, "ld u32({v})");
            }
            Insn::LdU64(v) => {
                let _ = write!(out, "ld u64({v})");
            }
            Insn::LdS8(v) => {
                let _ = write!(out, "ld s8({v})");
            }
            Insn::LdS16(v) => {
                let _ = write!(out, "ld s16({v})");
            }
            Insn::LdS32(v) => {
                let _ = write!(out, "ld s32({v})");
            }
            Insn::LdS64(v) => {
                let _ = write!(out, "ld s64({v})");
            }
            Insn::LdFloat(v) => {
                let _ = write!(out, "ld f({v})");
            }
            Insn::LdMem(ty, address) => {
                let _ = write!(out, "ld {}[{address}]", mem_suffix(*ty));
            }
            Insn::StMem(ty, address) => {
                let _ = write!(out, "st {}[{address}]", mem_suffix(*ty));
            }
            Insn::Mul => out.push_str("mul"),
            Insn::Div => out.push_str("div"),
            Insn::Mod => out.push_str("mod"),
            Insn::Add => out.push_str("add"),
            Insn::Sub => out.push_str("sub"),
            Insn::And => out.push_str("and"),
            Insn::Or => out.push_str("or"),
            Insn::Xor => out.push_str("xor"),
            Insn::Shl => out.push_str("shl"),
            Insn::Shr => out.push_str("shr"),
            Insn::Dup => out.push_str("dup"),
            Insn::DupI(n) => {
                let _ = write!(out, "dup {n}");
            }
            Insn::Rot => out.push_str("rot"),
            Insn::RotI(n) => {
                let _ = write!(out, "rot {n}");
            }
            Insn::Exchange(n) => {
                let _ = write!(out, "exchange {n}");
            }
            Insn::Pop => out.push_str("pop"),
            Insn::PopI(n) => {
                let _ = write!(out, "pop {n}");
            }
            Insn::DtDecompose(mask) => {
                let _ = write!(out, "dt.decomp {mask}");
            }
            Insn::Switch8(table) | Insn::Switch16(table) | Insn::Switch32(table) => {
                let name = match &instruction.insn {
                    Insn::Switch8(_) => "switch8",
                    Insn::Switch16(_) => "switch16",
                    _ => "switch32",
                };
                let _ = writeln!(out, "{name} {{");
                for entry in table.iter() {
                    let _ = writeln!(out, "\t\t{}: {}", entry.value, entry.target);
                }
                out.push_str("\t}");
            }
            Insn::CmpSrcIp(part) => {
                let length = part.length() as usize;
                let _ = write!(
                    out,
                    "cmp.srcip ({}, {})",
                    part.start(),
                    hex_block(&part.block()[..length])
                );
            }
            Insn::CmpLt => out.push_str("cmp.lt"),
            Insn::CmpLe => out.push_str("cmp.le"),
            Insn::CmpGt => out.push_str("cmp.gt"),
            Insn::CmpGe => out.push_str("cmp.ge"),
            Insn::CmpEq => out.push_str("cmp.eq"),
            Insn::CmpNeq => out.push_str("cmp.neq"),
            Insn::ConvB => out.push_str("conv.b"),
            Insn::ConvU8 => out.push_str("conv.u8"),
            Insn::ConvU16 => out.push_str("conv.u16"),
            Insn::ConvU32 => out.push_str("conv.u32"),
            Insn::ConvU64 => out.push_str("conv.u64"),
            Insn::ConvS8 => out.push_str("conv.s8"),
            Insn::ConvS16 => out.push_str("conv.s16"),
            Insn::ConvS32 => out.push_str("conv.s32"),
            Insn::ConvS64 => out.push_str("conv.s64"),
            Insn::ConvF => out.push_str("conv.f"),
            Insn::Jnz(target) => {
                let _ = write!(out, "jnz {target}");
            }
            Insn::Jz(target) => {
                let _ = write!(out, "jz {target}");
            }
            Insn::Jump(target) => {
                let _ = write!(out, "jump {target}");
            }
            Insn::Write => out.push_str("write"),
            Insn::Ret => out.push_str("ret"),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::insn::{DtMask, SwitchEntry, SwitchTable};

    #[test]
    fn pretty_print_when_minimal_program_then_header_and_body() {
        let mut b = Builder::new(0, [0; 16]).unwrap();
        let entry = b.create_label();
        b.on_init(entry.clone());
        b.insert(Some(entry), Insn::LdU32(1), 1).unwrap();
        b.insert(None, Insn::LdU8(1), 2).unwrap();
        b.insert(None, Insn::Write, 3).unwrap();
        b.insert(None, Insn::Ret, 4).unwrap();
        let program = b.finish().unwrap();

        let text = pretty_print(&program);
        assert_eq!(
            text,
            ".version 0\n\
             .machine 0x00000000000000000000000000000000\n\
             .on_init L0\n\
             \nL0:\n\tld u32(1)\
             \n\tld u8(1)\
             \n\twrite\
             \n\tret"
        );
    }

    #[test]
    fn pretty_print_when_machine_id_nonzero_then_hex_rendered() {
        let id: [u8; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15];
        let mut b = Builder::new(0, id).unwrap();
        b.insert(None, Insn::Ret, 0).unwrap();
        let text = pretty_print(&b.finish().unwrap());
        assert!(text.contains(".machine 0x000102030405060708090a0b0c0d0e0f"));
    }

    #[test]
    fn pretty_print_when_switch_then_entries_indented() {
        let mut b = Builder::new(0, [0; 16]).unwrap();
        let case = b.create_label();
        let table = SwitchTable::new(vec![SwitchEntry {
            value: 4,
            target: case.clone(),
        }])
        .unwrap();
        b.insert(None, Insn::Switch32(table), 1).unwrap();
        b.insert(Some(case), Insn::Ret, 2).unwrap();
        let text = pretty_print(&b.finish().unwrap());
        assert!(text.contains("\tswitch32 {\n\t\t4: L0\n\t}"));
    }

    #[test]
    fn pretty_print_when_datetime_mask_then_field_letters() {
        let mut b = Builder::new(0, [0; 16]).unwrap();
        let mask = DtMask::MINUTE.with(DtMask::HOUR).with(DtMask::MONTH);
        b.insert(None, Insn::DtDecompose(mask), 0).unwrap();
        let text = pretty_print(&b.finish().unwrap());
        assert!(text.contains("\tdt.decomp mhM"));
    }

    #[test]
    fn pretty_print_when_called_twice_then_identical_output() {
        let mut b = Builder::new(0, [7; 16]).unwrap();
        let exit = b.create_named_label("exit");
        b.insert(None, Insn::LdFloat(1.5), 1).unwrap();
        b.insert(None, Insn::Jz(exit.clone()), 2).unwrap();
        b.insert(Some(exit), Insn::Ret, 3).unwrap();
        let program = b.finish().unwrap();
        assert_eq!(pretty_print(&program), pretty_print(&program));
    }

    #[test]
    fn pretty_print_when_named_label_then_name_used() {
        let mut b = Builder::new(0, [0; 16]).unwrap();
        let exit = b.create_named_label("exit");
        b.insert(None, Insn::Jump(exit.clone()), 1).unwrap();
        b.insert(Some(exit), Insn::Ret, 2).unwrap();
        let text = pretty_print(&b.finish().unwrap());
        assert!(text.contains("\tjump exit"));
        assert!(text.contains("\nexit:\n\tret"));
    }
}
