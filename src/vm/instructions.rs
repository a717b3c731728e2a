//! Builtin handlers. Each one receives the engine and may read the stream,
//! touch either stack, allocate, or stop the machine.

use super::Vm;
use crate::{CellError, CellResult, Value};

/// `-- cell`
pub(crate) fn load_immediate(vm: &mut Vm) -> CellResult<()> {
    let value = vm.read_next()?;
    vm.push(value)
}

/// `size cells... -- procedure`
///
/// Names already bound to a non-empty procedure are embedded directly;
/// anything else is copied verbatim and resolved when it is executed.
pub(crate) fn compile_procedure(vm: &mut Vm) -> CellResult<()> {
    let size = vm.read_next()?.expect_integer("compile_procedure.size")?;
    let size = usize::try_from(size)
        .map_err(|_| CellError::OutOfBounds(format!("negative procedure size {size}")))?;
    let text = (0..size)
        .map(|_| vm.compile_next())
        .collect::<CellResult<Vec<_>>>()?;
    let code = vm.heap_mut().make_procedure(text);
    vm.push(Value::Procedure(code))
}

/// `-- record`
pub(crate) fn create_empty_object(vm: &mut Vm) -> CellResult<()> {
    let record = vm.heap_mut().make_record();
    vm.push(Value::Record(record))
}

/// `value key record -- record`
pub(crate) fn set_object_attribute(vm: &mut Vm) -> CellResult<()> {
    let record = vm.pop()?.expect_record("set_object_attribute.object")?;
    let key = vm.pop()?;
    let value = vm.pop()?;
    vm.heap_mut().set_attr(record, key, value)?;
    vm.push(Value::Record(record))
}

/// `key record -- value`
pub(crate) fn get_object_attribute(vm: &mut Vm) -> CellResult<()> {
    let record = vm.pop()?.expect_record("get_object_attribute.object")?;
    let key = vm.pop()?;
    let value = vm.heap().get_attr(record, key)?;
    vm.push(value)
}

/// `int int -- int`, wrapping on overflow.
pub(crate) fn add_int32(vm: &mut Vm) -> CellResult<()> {
    let lhs = vm.pop()?.expect_integer("add_int32.lhand")?;
    let rhs = vm.pop()?.expect_integer("add_int32.rhand")?;
    vm.push(Value::Integer(lhs.wrapping_add(rhs)))
}

/// `procedure --`
pub(crate) fn execute_stack_procedure(vm: &mut Vm) -> CellResult<()> {
    let code = vm.pop()?.expect_procedure("execute_stack_procedure.code")?;
    vm.call_procedure(code)
}

pub(crate) fn return_from_function(vm: &mut Vm) -> CellResult<()> {
    vm.restore_stack_frame()
}

pub(crate) fn exit_program(vm: &mut Vm) -> CellResult<()> {
    vm.halt();
    Ok(())
}
