use crate::isa::{Instruction, Instructions, OpCode};
use crate::memory_units::Pages;
use crate::{
    Error, HostError, Machine, MemoryInstance, MemoryRef, ModuleInstance, RuntimeArgs, Signature,
    Trap, TrapKind, Value, ValueType,
};
use assert_matches::assert_matches;
use core::fmt;

fn code(instructions: Vec<Instruction>) -> Instructions {
    instructions.into()
}

#[test]
fn host_function_invoked_from_wasm() {
    // Import 0 is a host adder; function 1 calls it with constants.
    let instance = ModuleInstance::builder()
        .push_type(Signature::new(
            &[ValueType::I32, ValueType::I32][..],
            &[ValueType::I32][..],
        ))
        .push_type(Signature::new(&[][..], &[ValueType::I32][..]))
        .push_host_function(
            0,
            |_memory: Option<&MemoryRef>, args: RuntimeArgs| -> Result<Option<Vec<Value>>, Trap> {
                let a: i32 = args.nth_checked(0)?;
                let b: i32 = args.nth_checked(1)?;
                Ok(Some(vec![Value::I32(a + b)]))
            },
        )
        .push_function(
            1,
            &[],
            code(vec![
                Instruction::with_operands(OpCode::I32Const, &[19]),
                Instruction::with_operands(OpCode::I32Const, &[23]),
                Instruction::with_operands(OpCode::Call, &[0]),
                Instruction::plain(OpCode::End),
            ]),
        )
        .build()
        .unwrap();
    let mut machine = Machine::new(&instance);

    let results = machine.call(1, &[], true).unwrap();
    assert_eq!(results, Some(vec![Value::I32(42)]));
}

#[test]
fn host_function_invoked_directly() {
    let instance = ModuleInstance::builder()
        .push_type(Signature::new(&[ValueType::I64][..], &[ValueType::I64][..]))
        .push_host_function(
            0,
            |_memory: Option<&MemoryRef>, args: RuntimeArgs| -> Result<Option<Vec<Value>>, Trap> {
                let v: i64 = args.nth_checked(0)?;
                Ok(Some(vec![Value::I64(v * 2)]))
            },
        )
        .build()
        .unwrap();
    let mut machine = Machine::new(&instance);

    let results = machine.call(0, &[Value::I64(21)], true).unwrap();
    assert_eq!(results, Some(vec![Value::I64(42)]));
}

#[test]
fn host_function_shares_the_linear_memory() {
    let memory = MemoryInstance::alloc(Pages(1), None).unwrap();
    let instance = ModuleInstance::builder()
        .push_type(Signature::new(&[][..], &[][..]))
        .push_type(Signature::new(&[][..], &[ValueType::I32][..]))
        .push_host_function(
            0,
            |memory: Option<&MemoryRef>, _args: RuntimeArgs| -> Result<Option<Vec<Value>>, Trap> {
                let memory = memory.expect("instance has a memory");
                memory
                    .set_value(16, 0xDEAD_BEEFu32)
                    .map_err(|_| Trap::from(TrapKind::MemoryAccessOutOfBounds))?;
                Ok(None)
            },
        )
        // Calls the import, then reads what it wrote.
        .push_function(
            1,
            &[],
            code(vec![
                Instruction::with_operands(OpCode::Call, &[0]),
                Instruction::with_operands(OpCode::I32Const, &[16]),
                Instruction::with_operands(OpCode::I32Load, &[0, 0]),
                Instruction::plain(OpCode::End),
            ]),
        )
        .with_memory(memory)
        .build()
        .unwrap();
    let mut machine = Machine::new(&instance);

    let results = machine.call(1, &[], true).unwrap();
    assert_eq!(results, Some(vec![Value::I32(0xDEAD_BEEFu32 as i32)]));
}

#[test]
fn multi_value_host_results_are_pushed_in_order() {
    let instance = ModuleInstance::builder()
        .push_type(Signature::new(
            &[][..],
            &[ValueType::I32, ValueType::I32][..],
        ))
        .push_type(Signature::new(&[][..], &[ValueType::I32][..]))
        .push_host_function(
            0,
            |_memory: Option<&MemoryRef>, _args: RuntimeArgs| -> Result<Option<Vec<Value>>, Trap> {
                Ok(Some(vec![Value::I32(40), Value::I32(2)]))
            },
        )
        .push_function(
            1,
            &[],
            code(vec![
                Instruction::with_operands(OpCode::Call, &[0]),
                Instruction::plain(OpCode::I32Add),
                Instruction::plain(OpCode::End),
            ]),
        )
        .build()
        .unwrap();
    let mut machine = Machine::new(&instance);

    let results = machine.call(1, &[], true).unwrap();
    assert_eq!(results, Some(vec![Value::I32(42)]));
}

#[derive(Debug, PartialEq)]
struct HostErrorWithCode {
    error_code: u32,
}

impl fmt::Display for HostErrorWithCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "failed with code {}", self.error_code)
    }
}

impl HostError for HostErrorWithCode {}

#[test]
fn host_trap_unwinds_through_wasm_frames() {
    let instance = ModuleInstance::builder()
        .push_type(Signature::new(&[][..], &[][..]))
        .push_host_function(
            0,
            |_memory: Option<&MemoryRef>, _args: RuntimeArgs| -> Result<Option<Vec<Value>>, Trap> {
                Err(HostErrorWithCode { error_code: 228 }.into())
            },
        )
        .push_function(
            0,
            &[],
            code(vec![
                Instruction::with_operands(OpCode::Call, &[0]),
                Instruction::plain(OpCode::End),
            ]),
        )
        .build()
        .unwrap();
    let mut machine = Machine::new(&instance);

    let error = machine.call(1, &[], true).unwrap_err();
    let host_error = error
        .as_host_error()
        .expect("the trap carries the host error");
    assert_eq!(
        host_error.downcast_ref::<HostErrorWithCode>(),
        Some(&HostErrorWithCode { error_code: 228 })
    );

    // The trap still carries the Wasm frame that performed the call.
    let trap = error.as_trap().unwrap();
    assert!(trap.kind().is_host());
    assert_eq!(trap.stack_trace().len(), 1);
    assert_eq!(trap.stack_trace()[0].func_id, 1);
}

#[test]
fn host_results_are_checked_against_the_signature() {
    let instance = ModuleInstance::builder()
        .push_type(Signature::new(&[][..], &[ValueType::I32][..]))
        .push_host_function(
            0,
            |_memory: Option<&MemoryRef>, _args: RuntimeArgs| -> Result<Option<Vec<Value>>, Trap> {
                Ok(Some(vec![Value::I64(1)]))
            },
        )
        .build()
        .unwrap();
    let mut machine = Machine::new(&instance);

    assert_matches!(machine.call(0, &[], true), Err(Error::Function(_)));
}

#[test]
fn host_may_return_nothing() {
    let instance = ModuleInstance::builder()
        .push_type(Signature::new(&[][..], &[][..]))
        .push_host_function(
            0,
            |_memory: Option<&MemoryRef>, _args: RuntimeArgs| -> Result<Option<Vec<Value>>, Trap> {
                Ok(None)
            },
        )
        .build()
        .unwrap();
    let mut machine = Machine::new(&instance);

    let results = machine.call(0, &[], true).unwrap();
    assert_eq!(results, Some(vec![]));
}
