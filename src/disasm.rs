//! A small disassembly listing for `--disassemble`. Purely a debugging
//! aid; it has no effect on interpretation.

use std::fmt::Write as _;

use crate::classfile::Method;
use crate::opcode::{instruction_length, mnemonic, read_i16, read_i8, read_u16, read_u8};

/// Renders one line per instruction in `method`'s code, e.g.:
/// `0000 bipush 7` or `0005 invokestatic #2`.
pub fn disassemble(method: &Method) -> String {
    let code = &method.code;
    let mut out = String::new();
    let mut pc = 0usize;

    while pc < code.len() {
        let opcode = code[pc];
        let len = instruction_length(opcode);
        let name = mnemonic(opcode);

        write!(out, "{pc:04} {name}").unwrap();
        match len {
            2 if opcode == crate::opcode::op::BIPUSH => {
                write!(out, " {}", read_i8(code, pc + 1)).unwrap();
            }
            2 => {
                write!(out, " {}", read_u8(code, pc + 1)).unwrap();
            }
            3 if opcode == crate::opcode::op::IINC => {
                let slot = read_u8(code, pc + 1);
                let delta = read_i8(code, pc + 2);
                write!(out, " {slot} {delta}").unwrap();
            }
            3 if is_branch(opcode) => {
                let offset = read_i16(code, pc + 1);
                write!(out, " -> {}", pc as i64 + offset as i64).unwrap();
            }
            3 if opcode == crate::opcode::op::SIPUSH => {
                write!(out, " {}", read_i16(code, pc + 1)).unwrap();
            }
            3 => {
                write!(out, " #{}", read_u16(code, pc + 1)).unwrap();
            }
            _ => {}
        }
        out.push('\n');
        pc += len;
    }

    out
}

fn is_branch(opcode: u8) -> bool {
    use crate::opcode::op::*;
    matches!(
        opcode,
        GOTO | IFEQ
            | IFNE
            | IFLT
            | IFGE
            | IFGT
            | IFLE
            | IF_ICMPEQ
            | IF_ICMPNE
            | IF_ICMPLT
            | IF_ICMPGE
            | IF_ICMPGT
            | IF_ICMPLE
    )
}
