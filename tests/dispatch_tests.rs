//! Exercises individual opcode groups directly against the interpreter,
//! bypassing the binary container, using [`classvm::encoder::MethodBuilder`]
//! to assemble each fixture's bytecode by hand.

use classvm::classfile::Method;
use classvm::encoder::{ClassFileBuilder, MethodBuilder};
use classvm::heap::Heap;
use classvm::interpreter::invoke;
use classvm::opcode::op;
use pretty_assertions::assert_eq;

fn run_method(method: Method) -> Option<i32> {
    let mut builder = ClassFileBuilder::new("Test");
    builder.add_built_method(method.clone());
    let class = builder.finish();
    let mut heap = Heap::new();
    invoke(&class, &mut heap, &method, &[])
}

#[test]
fn iadd_sums_two_pushed_values() {
    let method = MethodBuilder::new("m", "()I", 2, 0)
        .op_i8(op::BIPUSH, 7)
        .op_i8(op::BIPUSH, 5)
        .op(op::IADD)
        .op(op::IRETURN)
        .finish();
    assert_eq!(run_method(method), Some(12));
}

#[test]
fn isub_treats_first_popped_value_as_the_right_operand() {
    let method = MethodBuilder::new("m", "()I", 2, 0)
        .op_i8(op::BIPUSH, 10)
        .op_i8(op::BIPUSH, 3)
        .op(op::ISUB)
        .op(op::IRETURN)
        .finish();
    assert_eq!(run_method(method), Some(7));
}

#[test]
fn imul_handles_large_short_operands() {
    let method = MethodBuilder::new("m", "()I", 2, 0)
        .op_i16(op::SIPUSH, 1000)
        .op_i16(op::SIPUSH, 1000)
        .op(op::IMUL)
        .op(op::IRETURN)
        .finish();
    assert_eq!(run_method(method), Some(1_000_000));
}

#[test]
fn idiv_truncates_toward_zero() {
    let method = MethodBuilder::new("m", "()I", 2, 0)
        .op_i8(op::BIPUSH, -7)
        .op_i8(op::BIPUSH, 2)
        .op(op::IDIV)
        .op(op::IRETURN)
        .finish();
    assert_eq!(run_method(method), Some(-3));
}

#[test]
fn irem_keeps_the_dividends_sign() {
    let method = MethodBuilder::new("m", "()I", 2, 0)
        .op_i8(op::BIPUSH, -7)
        .op_i8(op::BIPUSH, 2)
        .op(op::IREM)
        .op(op::IRETURN)
        .finish();
    assert_eq!(run_method(method), Some(-1));
}

#[test]
#[should_panic(expected = "division by zero")]
fn idiv_by_zero_aborts() {
    let method = MethodBuilder::new("m", "()I", 2, 0)
        .op_i8(op::BIPUSH, 1)
        .op_i8(op::BIPUSH, 0)
        .op(op::IDIV)
        .op(op::IRETURN)
        .finish();
    run_method(method);
}

#[test]
fn iadd_wraps_on_overflow() {
    let mut builder = ClassFileBuilder::new("Test");
    let a = builder.add_integer_constant(i32::MAX);
    let b = builder.add_integer_constant(1);
    let method = MethodBuilder::new("m", "()I", 2, 0)
        .op_u16(op::LDC, a)
        .op_u16(op::LDC, b)
        .op(op::IADD)
        .op(op::IRETURN)
        .finish();
    let idx = builder.add_built_method(method.clone());
    let class = builder.finish();
    let mut heap = Heap::new();
    let result = invoke(&class, &mut heap, &class.methods[idx as usize], &[]);
    assert_eq!(result, Some(i32::MIN));
}

#[test]
fn ishl_shifts_left_arithmetically() {
    let method = MethodBuilder::new("m", "()I", 2, 0)
        .op(op::ICONST_M1)
        .op_i8(op::BIPUSH, 3)
        .op(op::ISHL)
        .op(op::IRETURN)
        .finish();
    assert_eq!(run_method(method), Some(-8));
}

#[test]
fn iushr_zero_extends_a_negative_value() {
    let method = MethodBuilder::new("m", "()I", 2, 0)
        .op(op::ICONST_M1)
        .op_i8(op::BIPUSH, 1)
        .op(op::IUSHR)
        .op(op::IRETURN)
        .finish();
    assert_eq!(run_method(method), Some(2_147_483_647));
}

#[test]
fn ishr_is_sign_preserving() {
    let method = MethodBuilder::new("m", "()I", 2, 0)
        .op(op::ICONST_M1)
        .op_i8(op::BIPUSH, 1)
        .op(op::ISHR)
        .op(op::IRETURN)
        .finish();
    assert_eq!(run_method(method), Some(-1));
}

#[test]
#[should_panic(expected = "negative shift amount")]
fn shift_by_negative_amount_aborts() {
    let method = MethodBuilder::new("m", "()I", 2, 0)
        .op_i8(op::BIPUSH, 1)
        .op_i8(op::BIPUSH, -1)
        .op(op::ISHL)
        .op(op::IRETURN)
        .finish();
    run_method(method);
}

#[test]
fn ineg_negates_top_of_stack() {
    let method = MethodBuilder::new("m", "()I", 1, 0)
        .op_i8(op::BIPUSH, 5)
        .op(op::INEG)
        .op(op::IRETURN)
        .finish();
    assert_eq!(run_method(method), Some(-5));
}

#[test]
fn iand_matches_bitwise_semantics() {
    let method = MethodBuilder::new("m", "()I", 2, 0)
        .op_i8(op::BIPUSH, 0b1100)
        .op_i8(op::BIPUSH, 0b1010)
        .op(op::IAND)
        .op(op::IRETURN)
        .finish();
    assert_eq!(run_method(method), Some(0b1000));
}

#[test]
fn ior_and_ixor_match_bitwise_semantics() {
    let or_method = MethodBuilder::new("m", "()I", 2, 0)
        .op_i8(op::BIPUSH, 0b1100)
        .op_i8(op::BIPUSH, 0b1010)
        .op(op::IOR)
        .op(op::IRETURN)
        .finish();
    assert_eq!(run_method(or_method), Some(0b1110));

    let xor_method = MethodBuilder::new("m", "()I", 2, 0)
        .op_i8(op::BIPUSH, 0b1100)
        .op_i8(op::BIPUSH, 0b1010)
        .op(op::IXOR)
        .op(op::IRETURN)
        .finish();
    assert_eq!(run_method(xor_method), Some(0b0110));
}

#[test]
fn local_slot_family_opcodes_load_and_store() {
    let method = MethodBuilder::new("m", "()I", 2, 2)
        .op_i8(op::BIPUSH, 11)
        .op(op::ISTORE_0)
        .op(op::ILOAD_0)
        .op(op::IRETURN)
        .finish();
    assert_eq!(run_method(method), Some(11));
}

#[test]
fn iinc_adds_a_signed_delta_without_touching_the_stack() {
    // iinc is the one opcode with two distinct immediates (slot, delta),
    // which MethodBuilder's single-immediate helpers can't express, so its
    // bytes are assembled by hand.
    let code = vec![
        op::BIPUSH,
        10,
        op::ISTORE_0,
        op::IINC,
        0,               // slot
        (-3i8) as u8,    // delta
        op::ILOAD_0,
        op::IRETURN,
    ];
    let method = Method {
        code,
        ..method_shell("m", "()I", 1, 1)
    };
    assert_eq!(run_method(method), Some(7));
}

fn method_shell(name: &str, descriptor: &str, max_stack: u16, max_locals: u16) -> Method {
    Method {
        name: name.to_string(),
        descriptor: descriptor.to_string(),
        max_stack,
        max_locals,
        code: Vec::new(),
    }
}

#[test]
fn counting_loop_sums_zero_through_nine() {
    // locals[0] = i, locals[1] = sum, both implicitly zero-initialized.
    // loop:
    //   if i >= 10 goto end
    //   sum += i
    //   i += 1
    //   goto loop
    // end:
    //   return sum
    let mut code = Vec::new();
    code.push(op::ILOAD_0);
    code.push(op::BIPUSH);
    code.push(10u8);
    let if_icmpge_at = code.len();
    code.push(op::IF_ICMPGE);
    code.extend_from_slice(&[0, 0]); // placeholder offset, patched below
    code.push(op::ILOAD_1);
    code.push(op::ILOAD_0);
    code.push(op::IADD);
    code.push(op::ISTORE_1);
    code.push(op::IINC);
    code.push(0); // slot 0
    code.push(1i8 as u8); // delta +1
    let goto_at = code.len();
    code.push(op::GOTO);
    code.extend_from_slice(&[0, 0]); // placeholder, patched below
    let end_at = code.len();
    code.push(op::ILOAD_1);
    code.push(op::IRETURN);

    let if_icmpge_offset = (end_at as i64 - if_icmpge_at as i64) as i16;
    code[if_icmpge_at + 1..if_icmpge_at + 3].copy_from_slice(&if_icmpge_offset.to_be_bytes());
    let goto_offset = (0i64 - goto_at as i64) as i16;
    code[goto_at + 1..goto_at + 3].copy_from_slice(&goto_offset.to_be_bytes());

    let method = Method {
        code,
        ..method_shell("m", "()I", 2, 2)
    };
    assert_eq!(run_method(method), Some(45));
}

#[test]
fn newarray_iastore_iaload_round_trip() {
    let method = MethodBuilder::new("m", "()I", 4, 1)
        .op_i8(op::BIPUSH, 3)
        .op_u8(op::NEWARRAY, 10) // type tag byte is unused by this core
        .op(op::ASTORE_0)
        .op(op::ALOAD_0)
        .op(op::ICONST_0)
        .op_i8(op::BIPUSH, 10)
        .op(op::IASTORE)
        .op(op::ALOAD_0)
        .op(op::ICONST_1)
        .op_i8(op::BIPUSH, 20)
        .op(op::IASTORE)
        .op(op::ALOAD_0)
        .op_i8(op::BIPUSH, 2)
        .op_i8(op::BIPUSH, 30)
        .op(op::IASTORE)
        .op(op::ALOAD_0)
        .op(op::ICONST_1)
        .op(op::IALOAD)
        .op(op::IRETURN)
        .finish();
    assert_eq!(run_method(method), Some(20));
}

#[test]
fn arraylength_reports_the_allocated_length() {
    let method = MethodBuilder::new("m", "()I", 2, 0)
        .op_i8(op::BIPUSH, 6)
        .op_u8(op::NEWARRAY, 10)
        .op(op::ARRAYLENGTH)
        .op(op::IRETURN)
        .finish();
    assert_eq!(run_method(method), Some(6));
}

#[test]
#[should_panic(expected = "negative array length")]
fn negative_length_array_allocation_aborts() {
    let method = MethodBuilder::new("m", "()I", 2, 0)
        .op_i8(op::BIPUSH, -1)
        .op_u8(op::NEWARRAY, 10)
        .op(op::ARRAYLENGTH)
        .op(op::IRETURN)
        .finish();
    run_method(method);
}

#[test]
fn dup_duplicates_top_of_stack_without_consuming_it() {
    let method = MethodBuilder::new("m", "()I", 3, 0)
        .op_i8(op::BIPUSH, 9)
        .op(op::DUP)
        .op(op::IADD)
        .op(op::IRETURN)
        .finish();
    assert_eq!(run_method(method), Some(18));
}

#[test]
fn falling_off_the_end_yields_no_value() {
    let method = MethodBuilder::new("m", "()V", 0, 0).finish();
    assert_eq!(run_method(method), None);
}

#[test]
fn void_return_yields_no_value() {
    let method = MethodBuilder::new("m", "()V", 0, 0).op(op::RETURN).finish();
    assert_eq!(run_method(method), None);
}
