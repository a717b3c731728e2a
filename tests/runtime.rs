use cell_core::{Address, CellError, Opcode, Value, ValueKind, Vm};

fn op(opcode: Opcode) -> Value {
    Value::Opcode(opcode)
}

fn int(value: i64) -> Value {
    Value::Integer(value)
}

#[test]
fn called_body_leaves_its_result() {
    let mut vm = Vm::new();
    let body = vm.assemble(vec![op(Opcode::LoadImmediate), int(17), op(Opcode::Return)]);
    let entry = vm.assemble(vec![Value::Procedure(body), op(Opcode::Halt)]);
    assert_eq!(vm.execute(entry).expect("exec"), int(17));
}

#[test]
fn compiled_body_called_from_stack() {
    let mut vm = Vm::new();
    let entry = vm.assemble(vec![
        op(Opcode::Compile),
        int(3),
        op(Opcode::LoadImmediate),
        int(17),
        op(Opcode::Return),
        op(Opcode::Call),
        op(Opcode::Halt),
    ]);
    assert_eq!(vm.execute(entry).expect("exec"), int(17));
    assert_eq!(vm.stack_depth(), 1);
}

#[test]
fn adds_two_integers() {
    let mut vm = Vm::new();
    let entry = vm.assemble(vec![
        op(Opcode::LoadImmediate),
        int(3),
        op(Opcode::LoadImmediate),
        int(4),
        op(Opcode::AddInt),
        op(Opcode::Halt),
    ]);
    assert_eq!(vm.execute(entry).expect("exec"), int(7));
}

#[test]
fn record_attribute_roundtrip() {
    let mut vm = Vm::new();
    let key = vm.make_string("answer");
    let entry = vm.assemble(vec![
        op(Opcode::LoadImmediate),
        Value::Str(key),
        op(Opcode::LoadImmediate),
        int(42),
        op(Opcode::LoadImmediate),
        Value::Str(key),
        op(Opcode::MakeRecord),
        op(Opcode::SetAttr),
        op(Opcode::GetAttr),
        op(Opcode::Halt),
    ]);
    assert_eq!(vm.execute(entry).expect("exec"), int(42));
}

#[test]
fn string_keys_with_equal_text_address_the_same_attribute() {
    let mut vm = Vm::new();
    let stored = vm.make_string("colour");
    let probe = vm.make_string("colour");
    let entry = vm.assemble(vec![
        op(Opcode::LoadImmediate),
        Value::Str(probe),
        op(Opcode::LoadImmediate),
        int(1),
        op(Opcode::LoadImmediate),
        Value::Str(stored),
        op(Opcode::MakeRecord),
        op(Opcode::SetAttr),
        op(Opcode::GetAttr),
        op(Opcode::Halt),
    ]);
    assert_eq!(vm.execute(entry).expect("exec"), int(1));
}

#[test]
fn calling_empty_procedure_is_out_of_bounds() {
    let mut vm = Vm::new();
    let entry = vm.assemble(vec![
        op(Opcode::Compile),
        int(0),
        op(Opcode::Call),
        op(Opcode::Halt),
    ]);
    assert!(matches!(vm.execute(entry), Err(CellError::OutOfBounds(_))));
}

#[test]
fn host_supplied_empty_procedure_is_out_of_bounds() {
    let mut vm = Vm::new();
    let empty = vm.make_procedure(0);
    let entry = vm.assemble(vec![Value::Procedure(empty), op(Opcode::Halt)]);
    assert!(matches!(vm.execute(entry), Err(CellError::OutOfBounds(_))));
}

#[test]
fn undefined_name_is_unknown_function() {
    let mut vm = Vm::new();
    let name = vm.make_string("nowhere");
    let entry = vm.assemble(vec![Value::Str(name), op(Opcode::Halt)]);
    assert_eq!(
        vm.execute(entry),
        Err(CellError::UnknownFunction("nowhere".into()))
    );
}

#[test]
fn named_call_runs_defined_word() {
    let mut vm = Vm::new();
    let body = vm.assemble(vec![op(Opcode::LoadImmediate), int(5), op(Opcode::Return)]);
    vm.define_word("five", body).expect("define");
    let name = vm.make_string("five");
    let entry = vm.assemble(vec![
        Value::Str(name),
        Value::Str(name),
        op(Opcode::AddInt),
        op(Opcode::Halt),
    ]);
    assert_eq!(vm.execute(entry).expect("exec"), int(10));
}

#[test]
fn named_call_to_empty_word_is_out_of_bounds() {
    let mut vm = Vm::new();
    let empty = vm.make_procedure(0);
    vm.define_word("nothing", empty).expect("define");
    let name = vm.make_string("nothing");
    let entry = vm.assemble(vec![Value::Str(name), op(Opcode::Halt)]);
    assert!(matches!(vm.execute(entry), Err(CellError::OutOfBounds(_))));
}

#[test]
fn compile_binds_known_words_early() {
    let mut vm = Vm::new();
    let body = vm.assemble(vec![op(Opcode::LoadImmediate), int(5), op(Opcode::Return)]);
    vm.define_word("five", body).expect("define");
    let name = vm.make_string("five");
    let entry = vm.assemble(vec![
        op(Opcode::Compile),
        int(2),
        Value::Str(name),
        op(Opcode::Return),
        op(Opcode::Halt),
    ]);
    let compiled = vm
        .execute(entry)
        .expect("exec")
        .expect_procedure("compiled")
        .expect("procedure on top");
    let cells = vm.heap().procedure(compiled).expect("live").cells().to_vec();
    assert_eq!(cells, vec![Value::Procedure(body), op(Opcode::Return)]);
}

#[test]
fn compile_keeps_forward_references_until_call_time() {
    let mut vm = Vm::new();
    let name = vm.make_string("later");
    let entry = vm.assemble(vec![
        op(Opcode::Compile),
        int(2),
        Value::Str(name),
        op(Opcode::Return),
        op(Opcode::Halt),
    ]);
    let compiled = vm
        .execute(entry)
        .expect("compile")
        .expect_procedure("compiled")
        .expect("procedure on top");
    assert_eq!(
        vm.heap().procedure(compiled).expect("live").get(0),
        Some(Value::Str(name))
    );

    let target = vm.assemble(vec![op(Opcode::LoadImmediate), int(9), op(Opcode::Return)]);
    vm.define_word("later", target).expect("define");
    vm.reset();
    let runner = vm.assemble(vec![Value::Procedure(compiled), op(Opcode::Halt)]);
    assert_eq!(vm.execute(runner).expect("run"), int(9));
}

#[test]
fn compile_copies_literals_verbatim() {
    let mut vm = Vm::new();
    let entry = vm.assemble(vec![
        op(Opcode::Compile),
        int(3),
        op(Opcode::LoadImmediate),
        int(11),
        op(Opcode::Return),
        op(Opcode::Halt),
    ]);
    let compiled = vm
        .execute(entry)
        .expect("exec")
        .expect_procedure("compiled")
        .expect("procedure on top");
    assert_eq!(
        vm.render(&Value::Procedure(compiled)),
        "procedure(size=3, [<load_immediate> $11 <return_from_function>])"
    );
}

#[test]
fn balanced_calls_restore_call_depth() {
    let mut vm = Vm::new();
    let inner = vm.assemble(vec![op(Opcode::LoadImmediate), int(1), op(Opcode::Return)]);
    vm.define_word("one", inner).expect("define");
    let name = vm.make_string("one");
    let outer = vm.assemble(vec![
        Value::Procedure(inner),
        Value::Str(name),
        op(Opcode::Return),
    ]);
    let entry = vm.assemble(vec![
        Value::Procedure(outer),
        op(Opcode::LoadImmediate),
        Value::Procedure(inner),
        op(Opcode::Call),
        op(Opcode::Halt),
    ]);

    vm.start(entry).expect("start");
    let depth_before = vm.call_depth();
    while vm.is_running() {
        vm.step().expect("step");
    }
    assert_eq!(vm.call_depth(), depth_before);
    assert_eq!(vm.arguments(), &[int(1), int(1), int(1)]);

    vm.reset();
    assert_eq!(vm.execute(entry).expect("exec"), int(1));
    assert_eq!(vm.call_depth(), 0);
}

#[test]
fn returning_from_outermost_frame_fails_next_fetch() {
    let mut vm = Vm::new();
    let entry = vm.assemble(vec![op(Opcode::LoadImmediate), int(17), op(Opcode::Return)]);
    assert!(matches!(vm.execute(entry), Err(CellError::OutOfBounds(_))));
    assert_eq!(vm.peek(), Some(int(17)));
}

#[test]
fn failure_leaves_partial_state_until_reset() {
    let mut vm = Vm::new();
    let name = vm.make_string("missing");
    let entry = vm.assemble(vec![
        op(Opcode::LoadImmediate),
        int(2),
        Value::Str(name),
    ]);
    assert!(vm.execute(entry).is_err());
    assert_eq!(vm.stack_depth(), 1);
    assert_eq!(vm.call_depth(), 1);
    assert!(vm.is_running());

    vm.reset();
    assert_eq!(vm.stack_depth(), 0);
    assert_eq!(vm.call_depth(), 0);
    assert!(!vm.is_running());
}

#[test]
fn executing_an_address_is_rejected() {
    let mut vm = Vm::new();
    let target = vm.assemble(vec![op(Opcode::Halt)]);
    let entry = vm.assemble(vec![Value::Address(Address {
        block: target,
        offset: 0,
    })]);
    assert!(matches!(
        vm.execute(entry),
        Err(CellError::TypeMismatch { .. })
    ));
}

#[test]
fn set_attr_expects_record_on_top() {
    let mut vm = Vm::new();
    let key = vm.make_string("answer");
    let entry = vm.assemble(vec![
        op(Opcode::MakeRecord),
        op(Opcode::LoadImmediate),
        Value::Str(key),
        op(Opcode::LoadImmediate),
        int(42),
        op(Opcode::SetAttr),
        op(Opcode::Halt),
    ]);
    let err = vm.execute(entry).expect_err("value on top is not a record");
    assert!(matches!(
        err,
        CellError::TypeMismatch { ref context, found: ValueKind::Integer, .. }
            if context == "set_object_attribute.object"
    ));
}
