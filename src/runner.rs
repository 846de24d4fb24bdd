#![allow(clippy::unnecessary_wraps)]

use crate::func::FuncInstanceInternal;
use crate::host::RuntimeArgs;
use crate::isa::{Instruction, Instructions, OpCode, BLOCK_TYPE_EMPTY};
use crate::memory::MemoryRef;
use crate::memory_units::Pages;
use crate::module::{ModuleRef, DEFAULT_MEMORY_INDEX};
use crate::nan_preserving_float::{F32, F64};
use crate::types::{Signature, ValueType};
use crate::value::{
    ArithmeticOps, ExtendInto, Float, Integer, LittleEndianConvert, TransmuteInto,
    TruncateSaturateInto, TryTruncateInto, Value, WrapInto,
};
use crate::{Error, FrameInfo, TrapKind};
use alloc::vec::Vec;
use core::{cmp, ops, u32};

/// Default maximum number of levels on the call stack.
///
/// Function calls are evaluated recursively, so every Wasm frame also
/// occupies native stack; the default is deliberately conservative.
pub const DEFAULT_CALL_STACK_LIMIT: usize = 1024;

/// Conversion of a stack slot into the operand view an instruction asks for.
///
/// Operand extraction inside the interpreter reinterprets the stored bits at
/// the requested width and never fails: a validated instruction stream only
/// pops slots of the type it pushed. Typed checking happens at the public
/// boundaries instead.
trait FromStackValue {
    fn from_stack_value(value: Value) -> Self;
}

macro_rules! impl_from_stack_value {
    ($($t:ty, $accessor:ident;)*) => {
        $(
            impl FromStackValue for $t {
                #[inline]
                fn from_stack_value(value: Value) -> Self {
                    value.$accessor() as _
                }
            }
        )*
    };
}

impl_from_stack_value! {
    i8, as_i8;
    u8, as_i8;
    i16, as_i16;
    u16, as_i16;
    i32, as_i32;
    u32, as_u32;
    i64, as_i64;
    u64, as_u64;
}

impl FromStackValue for F32 {
    #[inline]
    fn from_stack_value(value: Value) -> Self {
        value.as_f32()
    }
}

impl FromStackValue for F64 {
    #[inline]
    fn from_stack_value(value: Value) -> Self {
        value.as_f64()
    }
}

/// Interpreter action to execute after executing an instruction.
enum InstructionOutcome {
    /// Continue with the next instruction.
    RunNextInstruction,
    /// The end of the function body was reached.
    ReturnFromFunction,
}

/// Execution state of one function activation.
///
/// Structured control flow is tracked with a flat set of per-frame slots:
/// entering a block records the result arity and the operand stack height,
/// branch instructions raise `do_control_transfer`, and the `end` that
/// observes the raised flag unwinds the operand stack. A predicate popped by
/// a taken conditional branch is kept in `branch_condition_value` and pushed
/// back beneath the saved results when the transfer is consumed.
struct Frame {
    func_id: u32,
    /// Position of the next instruction to execute.
    pc: u32,
    /// Parameters first, then the declared locals zero-initialized.
    locals: Vec<Value>,
    /// Nesting depth of structured blocks; 0 means function body level.
    block_depth: u32,
    /// Operand stack height recorded at entry to the deepest active block.
    stack_size_before_block: usize,
    /// Result arity of the deepest active block.
    number_of_values_to_return: usize,
    /// Whether the deepest active construct is a block or loop (as opposed
    /// to an if).
    is_control_frame: bool,
    /// Raised by a branch, consumed by the matching `end`.
    do_control_transfer: bool,
    /// Predicate popped by a taken `br_if`/`br_table`.
    branch_condition_value: Option<Value>,
    /// Raised by `return`; checked at the head of the dispatch loop.
    should_return: bool,
}

impl Frame {
    fn new(func_id: u32, args: &[Value], local_types: &[ValueType]) -> Frame {
        let mut locals = args.to_vec();
        locals.extend(local_types.iter().map(|ty| Value::default(*ty)));
        Frame {
            func_id,
            pc: 0,
            locals,
            block_depth: 0,
            stack_size_before_block: 0,
            number_of_values_to_return: 0,
            is_control_frame: true,
            do_control_transfer: false,
            branch_condition_value: None,
            should_return: false,
        }
    }
}

/// The operand stack, shared by every active frame.
struct ValueStack {
    entries: Vec<Value>,
}

impl ValueStack {
    fn new() -> ValueStack {
        ValueStack {
            entries: Vec::with_capacity(64),
        }
    }

    #[inline]
    fn push(&mut self, value: Value) {
        self.entries.push(value);
    }

    #[inline]
    fn pop(&mut self) -> Value {
        self.entries
            .pop()
            .expect("operand stack underflow is ruled out by validation; qed")
    }

    #[inline]
    fn pop_as<T>(&mut self) -> T
    where
        T: FromStackValue,
    {
        T::from_stack_value(self.pop())
    }

    #[inline]
    fn pop_pair_as<T>(&mut self) -> (T, T)
    where
        T: FromStackValue,
    {
        let right = self.pop_as();
        let left = self.pop_as();
        (left, right)
    }

    #[inline]
    fn peek(&self) -> Value {
        *self
            .entries
            .last()
            .expect("operand stack underflow is ruled out by validation; qed")
    }

    #[inline]
    fn len(&self) -> usize {
        self.entries.len()
    }

    /// Removes the top `n` entries, returning them in push order.
    fn drain_top(&mut self, n: usize) -> Vec<Value> {
        let at = self.entries.len() - n;
        self.entries.split_off(at)
    }

    /// Drops entries until the stack is no higher than `height`.
    fn shrink_to(&mut self, height: usize) {
        if height < self.entries.len() {
            self.entries.truncate(height);
        }
    }
}

struct CallStack {
    frames: Vec<Frame>,
    limit: usize,
}

impl CallStack {
    fn new(limit: usize) -> CallStack {
        CallStack {
            frames: Vec::new(),
            limit,
        }
    }

    fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    fn is_full(&self) -> bool {
        self.frames.len() + 1 >= self.limit
    }

    fn top(&self) -> &Frame {
        self.frames
            .last()
            .expect("the executing function always has a frame; qed")
    }

    fn top_mut(&mut self) -> &mut Frame {
        self.frames
            .last_mut()
            .expect("the executing function always has a frame; qed")
    }

    fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }
}

/// The execution engine.
///
/// A machine executes functions of a single [`ModuleInstance`]. It owns the
/// operand stack and the call stack; globals, tables and the linear memory
/// live with the instance and survive across calls.
///
/// A machine is single-threaded: host imports run synchronously on the
/// calling thread and every instruction runs to completion. Sharing a
/// machine between threads requires external synchronization.
///
/// [`ModuleInstance`]: struct.ModuleInstance.html
pub struct Machine {
    value_stack: ValueStack,
    call_stack: CallStack,
    instance: ModuleRef,
    memory: Option<MemoryRef>,
}

impl Machine {
    /// Creates a machine executing against the given instance.
    pub fn new(instance: &ModuleRef) -> Machine {
        Machine::with_call_stack_limit(instance, DEFAULT_CALL_STACK_LIMIT)
    }

    /// Creates a machine with a custom call stack depth limit.
    pub fn with_call_stack_limit(instance: &ModuleRef, limit: usize) -> Machine {
        Machine {
            value_stack: ValueStack::new(),
            call_stack: CallStack::new(limit),
            memory: instance.memory_by_index(DEFAULT_MEMORY_INDEX),
            instance: instance.clone(),
        }
    }

    /// Invokes the function with index `func_id`.
    ///
    /// `args` must match the parameter types of the function. An internally
    /// defined function is evaluated to completion; a host import is
    /// dispatched to its handler and the returned values are pushed.
    ///
    /// With `pop_results` the result values are popped off the operand stack
    /// and returned; otherwise `None` is returned and the results are left
    /// on the stack for the calling frame to consume.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Trap`] for Wasm-defined runtime failures, carrying
    /// the call stack captured at the point of failure. Other variants
    /// indicate bugs in the embedding: argument count or type mismatches,
    /// unknown indices, malformed instructions.
    ///
    /// [`Error::Trap`]: enum.Error.html#variant.Trap
    pub fn call(
        &mut self,
        func_id: u32,
        args: &[Value],
        pop_results: bool,
    ) -> Result<Option<Vec<Value>>, Error> {
        let func = self
            .instance
            .func_by_index(func_id)
            .ok_or_else(|| Error::Function(format!("no function with index {}", func_id)))?;
        let signature = self
            .instance
            .signature_by_index(func.type_index())
            .ok_or_else(|| {
                Error::Function(format!(
                    "function {} refers to unknown type {}",
                    func_id,
                    func.type_index()
                ))
            })?
            .clone();
        check_function_args(&signature, args)?;

        match *func.as_internal() {
            FuncInstanceInternal::Host { ref handler, .. } => {
                let results = handler
                    .borrow_mut()
                    .invoke(self.memory.as_ref(), RuntimeArgs::from(args))
                    .map_err(Error::Trap)?;
                let returned = results.as_deref().unwrap_or(&[]);
                if returned.len() != signature.results().len()
                    || returned
                        .iter()
                        .zip(signature.results())
                        .any(|(value, expected)| value.value_type() != *expected)
                {
                    return Err(Error::Function(format!(
                        "host function {} returned mismatching results",
                        func_id
                    )));
                }
                for value in returned {
                    self.value_stack.push(*value);
                }
            }
            FuncInstanceInternal::Internal { ref body, .. } => {
                if self.call_stack.is_full() {
                    return Err(TrapKind::StackOverflow.into());
                }
                self.call_stack.push(Frame::new(func_id, args, body.locals()));
                let outcome = self.eval(body.code());
                // The frame is discarded even when a trap unwinds; the trap
                // captured its snapshot while the frame was still live.
                self.call_stack.pop();
                outcome?;
            }
        }

        if pop_results {
            let mut results = vec![Value::FALSE; signature.results().len()];
            for slot in results.iter_mut().rev() {
                *slot = self.value_stack.pop();
            }
            Ok(Some(results))
        } else {
            Ok(None)
        }
    }

    /// Height of the operand stack, for diagnostics.
    pub(crate) fn stack_height(&self) -> usize {
        self.value_stack.len()
    }

    /// Prints the currently active call frames to stderr, innermost first.
    #[cfg(feature = "std")]
    pub fn print_stack_trace(&self) {
        for frame in self.call_stack.frames.iter().rev() {
            eprintln!("  at function {} (pc {})", frame.func_id, frame.pc);
        }
    }

    fn eval(&mut self, code: &Instructions) -> Result<(), Error> {
        loop {
            let frame = self.call_stack.top();
            if frame.should_return {
                break;
            }
            let pc = frame.pc;
            let instruction = match code.get(pc) {
                Some(instruction) => instruction,
                None => break,
            };
            // Advance before executing so that branch instructions may
            // overwrite the pc without compensation.
            self.call_stack.top_mut().pc = pc + 1;

            match self.run_instruction(instruction) {
                Ok(InstructionOutcome::RunNextInstruction) => {}
                Ok(InstructionOutcome::ReturnFromFunction) => break,
                Err(error) => return Err(self.backtraced(error)),
            }
        }
        Ok(())
    }

    /// Attaches the call-stack snapshot to a freshly raised trap. Traps
    /// propagating out of a nested call already carry theirs.
    fn backtraced(&self, error: Error) -> Error {
        match error {
            Error::Trap(trap) if !trap.has_stack_trace() => {
                let trace = self
                    .call_stack
                    .iter()
                    .map(|frame| FrameInfo {
                        func_id: frame.func_id,
                        pc: frame.pc,
                    })
                    .collect();
                Error::Trap(trap.with_stack_trace(trace))
            }
            other => other,
        }
    }

    fn memory(&self) -> Result<MemoryRef, Error> {
        self.memory
            .clone()
            .ok_or_else(|| Error::Memory("module instance has no linear memory".into()))
    }

    fn block_arity(&self, block_type: i64) -> Result<usize, Error> {
        match block_type {
            BLOCK_TYPE_EMPTY => Ok(0),
            0x7C..=0x7F => Ok(1),
            type_index => self
                .instance
                .signature_by_index(type_index as u32)
                .map(|signature| signature.results().len())
                .ok_or_else(|| {
                    Error::Function(format!("no type with index {} for block", type_index))
                }),
        }
    }

    fn run_instruction(&mut self, instruction: &Instruction) -> Result<InstructionOutcome, Error> {
        match instruction.opcode() {
            OpCode::Unreachable => self.run_unreachable(),
            OpCode::Nop => Ok(InstructionOutcome::RunNextInstruction),

            OpCode::Block | OpCode::Loop => self.run_block(instruction.operand(0)?),
            OpCode::If => self.run_if(instruction),
            OpCode::Else => self.run_else(instruction),
            OpCode::End => self.run_end(),
            OpCode::Br => self.run_br(instruction),
            OpCode::BrIf => self.run_br_if(instruction),
            OpCode::BrTable => self.run_br_table(instruction),
            OpCode::Return => self.run_return(),

            OpCode::Call => self.run_call(instruction.operand(0)? as u32),
            OpCode::CallIndirect => self.run_call_indirect(instruction),

            OpCode::Drop => self.run_drop(),
            OpCode::Select => self.run_select(),

            OpCode::LocalGet => self.run_get_local(instruction.operand(0)? as u32),
            OpCode::LocalSet => self.run_set_local(instruction.operand(0)? as u32),
            OpCode::LocalTee => self.run_tee_local(instruction.operand(0)? as u32),
            OpCode::GlobalGet => self.run_get_global(instruction.operand(0)? as u32),
            OpCode::GlobalSet => self.run_set_global(instruction.operand(0)? as u32),

            OpCode::I32Load => self.run_load::<i32>(instruction),
            OpCode::I64Load => self.run_load::<i64>(instruction),
            OpCode::F32Load => self.run_load::<F32>(instruction),
            OpCode::F64Load => self.run_load::<F64>(instruction),
            OpCode::I32Load8S => self.run_load_extend::<i8, i32>(instruction),
            OpCode::I32Load8U => self.run_load_extend::<u8, i32>(instruction),
            OpCode::I32Load16S => self.run_load_extend::<i16, i32>(instruction),
            OpCode::I32Load16U => self.run_load_extend::<u16, i32>(instruction),
            OpCode::I64Load8S => self.run_load_extend::<i8, i64>(instruction),
            OpCode::I64Load8U => self.run_load_extend::<u8, i64>(instruction),
            OpCode::I64Load16S => self.run_load_extend::<i16, i64>(instruction),
            OpCode::I64Load16U => self.run_load_extend::<u16, i64>(instruction),
            OpCode::I64Load32S => self.run_load_extend::<i32, i64>(instruction),
            OpCode::I64Load32U => self.run_load_extend::<u32, i64>(instruction),

            OpCode::I32Store => self.run_store::<i32>(instruction),
            OpCode::I64Store => self.run_store::<i64>(instruction),
            OpCode::F32Store => self.run_store::<F32>(instruction),
            OpCode::F64Store => self.run_store::<F64>(instruction),
            OpCode::I32Store8 => self.run_store_wrap::<i32, i8>(instruction),
            OpCode::I32Store16 => self.run_store_wrap::<i32, i16>(instruction),
            OpCode::I64Store8 => self.run_store_wrap::<i64, i8>(instruction),
            OpCode::I64Store16 => self.run_store_wrap::<i64, i16>(instruction),
            OpCode::I64Store32 => self.run_store_wrap::<i64, i32>(instruction),

            OpCode::MemorySize => self.run_current_memory(),
            OpCode::MemoryGrow => self.run_grow_memory(),
            OpCode::MemoryInit => self.run_memory_init(instruction),
            OpCode::DataDrop => self.run_data_drop(instruction),
            OpCode::MemoryCopy => self.run_memory_copy(instruction),
            OpCode::MemoryFill => self.run_memory_fill(instruction),

            OpCode::I32Const => self.run_const(Value::I32(instruction.operand(0)? as i32)),
            OpCode::I64Const => self.run_const(Value::I64(instruction.operand(0)?)),
            OpCode::F32Const => self.run_const(Value::decode_f32(instruction.operand(0)? as u32)),
            OpCode::F64Const => self.run_const(Value::decode_f64(instruction.operand(0)? as u64)),

            OpCode::I32Eqz => self.run_eqz::<i32>(),
            OpCode::I32Eq => self.run_eq::<i32>(),
            OpCode::I32Ne => self.run_ne::<i32>(),
            OpCode::I32LtS => self.run_lt::<i32>(),
            OpCode::I32LtU => self.run_lt::<u32>(),
            OpCode::I32GtS => self.run_gt::<i32>(),
            OpCode::I32GtU => self.run_gt::<u32>(),
            OpCode::I32LeS => self.run_lte::<i32>(),
            OpCode::I32LeU => self.run_lte::<u32>(),
            OpCode::I32GeS => self.run_gte::<i32>(),
            OpCode::I32GeU => self.run_gte::<u32>(),

            OpCode::I64Eqz => self.run_eqz::<i64>(),
            OpCode::I64Eq => self.run_eq::<i64>(),
            OpCode::I64Ne => self.run_ne::<i64>(),
            OpCode::I64LtS => self.run_lt::<i64>(),
            OpCode::I64LtU => self.run_lt::<u64>(),
            OpCode::I64GtS => self.run_gt::<i64>(),
            OpCode::I64GtU => self.run_gt::<u64>(),
            OpCode::I64LeS => self.run_lte::<i64>(),
            OpCode::I64LeU => self.run_lte::<u64>(),
            OpCode::I64GeS => self.run_gte::<i64>(),
            OpCode::I64GeU => self.run_gte::<u64>(),

            OpCode::F32Eq => self.run_eq::<F32>(),
            OpCode::F32Ne => self.run_ne::<F32>(),
            OpCode::F32Lt => self.run_lt::<F32>(),
            OpCode::F32Gt => self.run_gt::<F32>(),
            OpCode::F32Le => self.run_lte::<F32>(),
            OpCode::F32Ge => self.run_gte::<F32>(),

            OpCode::F64Eq => self.run_eq::<F64>(),
            OpCode::F64Ne => self.run_ne::<F64>(),
            OpCode::F64Lt => self.run_lt::<F64>(),
            OpCode::F64Gt => self.run_gt::<F64>(),
            OpCode::F64Le => self.run_lte::<F64>(),
            OpCode::F64Ge => self.run_gte::<F64>(),

            OpCode::I32Clz => self.run_clz::<i32>(),
            OpCode::I32Ctz => self.run_ctz::<i32>(),
            OpCode::I32Popcnt => self.run_popcnt::<i32>(),
            OpCode::I32Add => self.run_add::<i32>(),
            OpCode::I32Sub => self.run_sub::<i32>(),
            OpCode::I32Mul => self.run_mul::<i32>(),
            OpCode::I32DivS => self.run_div::<i32, i32>(),
            OpCode::I32DivU => self.run_div::<i32, u32>(),
            OpCode::I32RemS => self.run_rem::<i32, i32>(),
            OpCode::I32RemU => self.run_rem::<i32, u32>(),
            OpCode::I32And => self.run_and::<i32>(),
            OpCode::I32Or => self.run_or::<i32>(),
            OpCode::I32Xor => self.run_xor::<i32>(),
            OpCode::I32Shl => self.run_shl::<i32>(0x1F),
            OpCode::I32ShrS => self.run_shr::<i32, i32>(0x1F),
            OpCode::I32ShrU => self.run_shr::<i32, u32>(0x1F),
            OpCode::I32Rotl => self.run_rotl::<i32>(),
            OpCode::I32Rotr => self.run_rotr::<i32>(),

            OpCode::I64Clz => self.run_clz::<i64>(),
            OpCode::I64Ctz => self.run_ctz::<i64>(),
            OpCode::I64Popcnt => self.run_popcnt::<i64>(),
            OpCode::I64Add => self.run_add::<i64>(),
            OpCode::I64Sub => self.run_sub::<i64>(),
            OpCode::I64Mul => self.run_mul::<i64>(),
            OpCode::I64DivS => self.run_div::<i64, i64>(),
            OpCode::I64DivU => self.run_div::<i64, u64>(),
            OpCode::I64RemS => self.run_rem::<i64, i64>(),
            OpCode::I64RemU => self.run_rem::<i64, u64>(),
            OpCode::I64And => self.run_and::<i64>(),
            OpCode::I64Or => self.run_or::<i64>(),
            OpCode::I64Xor => self.run_xor::<i64>(),
            OpCode::I64Shl => self.run_shl::<i64>(0x3F),
            OpCode::I64ShrS => self.run_shr::<i64, i64>(0x3F),
            OpCode::I64ShrU => self.run_shr::<i64, u64>(0x3F),
            OpCode::I64Rotl => self.run_rotl::<i64>(),
            OpCode::I64Rotr => self.run_rotr::<i64>(),

            OpCode::F32Abs => self.run_abs::<F32>(),
            OpCode::F32Neg => self.run_neg::<F32>(),
            OpCode::F32Ceil => self.run_ceil::<F32>(),
            OpCode::F32Floor => self.run_floor::<F32>(),
            OpCode::F32Trunc => self.run_trunc::<F32>(),
            OpCode::F32Nearest => self.run_nearest::<F32>(),
            OpCode::F32Sqrt => self.run_sqrt::<F32>(),
            OpCode::F32Add => self.run_add::<F32>(),
            OpCode::F32Sub => self.run_sub::<F32>(),
            OpCode::F32Mul => self.run_mul::<F32>(),
            OpCode::F32Div => self.run_div::<F32, F32>(),
            OpCode::F32Min => self.run_min::<F32>(),
            OpCode::F32Max => self.run_max::<F32>(),
            OpCode::F32Copysign => self.run_copysign::<F32>(),

            OpCode::F64Abs => self.run_abs::<F64>(),
            OpCode::F64Neg => self.run_neg::<F64>(),
            OpCode::F64Ceil => self.run_ceil::<F64>(),
            OpCode::F64Floor => self.run_floor::<F64>(),
            OpCode::F64Trunc => self.run_trunc::<F64>(),
            OpCode::F64Nearest => self.run_nearest::<F64>(),
            OpCode::F64Sqrt => self.run_sqrt::<F64>(),
            OpCode::F64Add => self.run_add::<F64>(),
            OpCode::F64Sub => self.run_sub::<F64>(),
            OpCode::F64Mul => self.run_mul::<F64>(),
            OpCode::F64Div => self.run_div::<F64, F64>(),
            OpCode::F64Min => self.run_min::<F64>(),
            OpCode::F64Max => self.run_max::<F64>(),
            OpCode::F64Copysign => self.run_copysign::<F64>(),

            OpCode::I32WrapI64 => self.run_wrap::<i64, i32>(),
            OpCode::I32TruncSF32 => self.run_trunc_to_int::<F32, i32, i32>(),
            OpCode::I32TruncUF32 => self.run_trunc_to_int::<F32, u32, i32>(),
            OpCode::I32TruncSF64 => self.run_trunc_to_int::<F64, i32, i32>(),
            OpCode::I32TruncUF64 => self.run_trunc_to_int::<F64, u32, i32>(),
            OpCode::I64ExtendSI32 => self.run_extend::<i32, i64, i64>(),
            OpCode::I64ExtendUI32 => self.run_extend::<u32, u64, i64>(),
            OpCode::I64TruncSF32 => self.run_trunc_to_int::<F32, i64, i64>(),
            OpCode::I64TruncUF32 => self.run_trunc_to_int::<F32, u64, i64>(),
            OpCode::I64TruncSF64 => self.run_trunc_to_int::<F64, i64, i64>(),
            OpCode::I64TruncUF64 => self.run_trunc_to_int::<F64, u64, i64>(),
            OpCode::F32ConvertSI32 => self.run_extend::<i32, F32, F32>(),
            OpCode::F32ConvertUI32 => self.run_extend::<u32, F32, F32>(),
            OpCode::F32ConvertSI64 => self.run_wrap::<i64, F32>(),
            OpCode::F32ConvertUI64 => self.run_wrap::<u64, F32>(),
            OpCode::F32DemoteF64 => self.run_wrap::<F64, F32>(),
            OpCode::F64ConvertSI32 => self.run_extend::<i32, F64, F64>(),
            OpCode::F64ConvertUI32 => self.run_extend::<u32, F64, F64>(),
            OpCode::F64ConvertSI64 => self.run_extend::<i64, F64, F64>(),
            OpCode::F64ConvertUI64 => self.run_extend::<u64, F64, F64>(),
            OpCode::F64PromoteF32 => self.run_extend::<F32, F64, F64>(),

            OpCode::I32ReinterpretF32 => self.run_reinterpret::<F32, i32>(),
            OpCode::I64ReinterpretF64 => self.run_reinterpret::<F64, i64>(),
            OpCode::F32ReinterpretI32 => self.run_reinterpret::<i32, F32>(),
            OpCode::F64ReinterpretI64 => self.run_reinterpret::<i64, F64>(),

            OpCode::I32Extend8S => self.run_extend::<i8, i32, i32>(),
            OpCode::I32Extend16S => self.run_extend::<i16, i32, i32>(),
            OpCode::I64Extend8S => self.run_extend::<i8, i64, i64>(),
            OpCode::I64Extend16S => self.run_extend::<i16, i64, i64>(),
            OpCode::I64Extend32S => self.run_extend::<i32, i64, i64>(),

            OpCode::I32TruncSatF32S => self.run_trunc_sat::<F32, i32, i32>(),
            OpCode::I32TruncSatF32U => self.run_trunc_sat::<F32, u32, i32>(),
            OpCode::I32TruncSatF64S => self.run_trunc_sat::<F64, i32, i32>(),
            OpCode::I32TruncSatF64U => self.run_trunc_sat::<F64, u32, i32>(),
            OpCode::I64TruncSatF32S => self.run_trunc_sat::<F32, i64, i64>(),
            OpCode::I64TruncSatF32U => self.run_trunc_sat::<F32, u64, i64>(),
            OpCode::I64TruncSatF64S => self.run_trunc_sat::<F64, i64, i64>(),
            OpCode::I64TruncSatF64U => self.run_trunc_sat::<F64, u64, i64>(),
        }
    }

    fn run_unreachable(&mut self) -> Result<InstructionOutcome, Error> {
        Err(TrapKind::Unreachable.into())
    }

    fn run_block(&mut self, block_type: i64) -> Result<InstructionOutcome, Error> {
        let arity = self.block_arity(block_type)?;
        let stack_size = self.value_stack.len();
        let frame = self.call_stack.top_mut();
        frame.block_depth += 1;
        frame.number_of_values_to_return = arity;
        frame.is_control_frame = true;
        frame.stack_size_before_block = cmp::max(stack_size, frame.stack_size_before_block);
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_if(&mut self, instruction: &Instruction) -> Result<InstructionOutcome, Error> {
        let condition: i32 = self.value_stack.pop_as();
        let target = if condition != 0 {
            instruction.branch_target()?
        } else {
            instruction.fallthrough_target()?
        };
        let frame = self.call_stack.top_mut();
        frame.block_depth += 1;
        frame.is_control_frame = false;
        frame.pc = target;
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_else(&mut self, instruction: &Instruction) -> Result<InstructionOutcome, Error> {
        // Reached only by falling out of the taken branch; transfers to the
        // matching `end`.
        let target = instruction.branch_target()?;
        let frame = self.call_stack.top_mut();
        frame.do_control_transfer = true;
        frame.pc = target;
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_br(&mut self, instruction: &Instruction) -> Result<InstructionOutcome, Error> {
        let target = instruction.branch_target()?;
        let frame = self.call_stack.top_mut();
        frame.do_control_transfer = true;
        frame.pc = target;
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_br_if(&mut self, instruction: &Instruction) -> Result<InstructionOutcome, Error> {
        let condition = self.value_stack.pop();
        if condition.as_i32() == 0 {
            let target = instruction.fallthrough_target()?;
            self.call_stack.top_mut().pc = target;
        } else {
            let target = instruction.branch_target()?;
            let frame = self.call_stack.top_mut();
            frame.do_control_transfer = true;
            frame.branch_condition_value = Some(condition);
            frame.pc = target;
        }
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_br_table(&mut self, instruction: &Instruction) -> Result<InstructionOutcome, Error> {
        let condition = self.value_stack.pop();
        let targets = instruction.branch_table()?;
        let index = condition.as_u32() as usize;
        // The last entry is the default target, taken for any out of range
        // index.
        let target = if index < targets.len() - 1 {
            let target = targets[index];
            self.call_stack.top_mut().branch_condition_value = Some(condition);
            target
        } else {
            targets[targets.len() - 1]
        };
        let frame = self.call_stack.top_mut();
        frame.do_control_transfer = true;
        frame.pc = target;
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_return(&mut self) -> Result<InstructionOutcome, Error> {
        self.call_stack.top_mut().should_return = true;
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_end(&mut self) -> Result<InstructionOutcome, Error> {
        let (transfer, keep_count, unwind_to, condition) = {
            let frame = self.call_stack.top_mut();
            if frame.block_depth == 0 {
                return Ok(InstructionOutcome::ReturnFromFunction);
            }
            frame.block_depth -= 1;

            let transfer = frame.do_control_transfer && frame.is_control_frame;
            if transfer {
                frame.do_control_transfer = false;
            }
            (
                transfer,
                frame.number_of_values_to_return,
                frame.stack_size_before_block,
                frame.branch_condition_value,
            )
        };

        if transfer {
            let keep = cmp::min(keep_count, self.value_stack.len());
            let kept = self.value_stack.drain_top(keep);
            self.value_stack.shrink_to(unwind_to);
            // A taken conditional branch leaves its (non-zero) predicate
            // above the unwound stack, beneath the kept results.
            if let Some(condition) = condition {
                if condition.as_i32() != 0 {
                    self.value_stack.push(condition);
                }
            }
            for value in kept {
                self.value_stack.push(value);
            }
        }

        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_call(&mut self, func_index: u32) -> Result<InstructionOutcome, Error> {
        let signature = self
            .instance
            .signature_of_func(func_index)
            .ok_or_else(|| Error::Function(format!("no function with index {}", func_index)))?
            .clone();
        let args = self.pop_call_args(&signature)?;
        self.call(func_index, &args, false)?;
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_call_indirect(&mut self, instruction: &Instruction) -> Result<InstructionOutcome, Error> {
        let type_index = instruction.operand(0)? as u32;
        let table_index = instruction.operand(1)? as u32;
        let entry_index: u32 = self.value_stack.pop_as();
        let table = self
            .instance
            .table_by_index(table_index)
            .ok_or_else(|| Error::Table(format!("no table with index {}", table_index)))?;
        let func_index = table.func_ref(entry_index)?;

        let signature = {
            let expected = self.instance.signature_by_index(type_index).ok_or_else(|| {
                Error::Function(format!("no type with index {}", type_index))
            })?;
            let actual = self.instance.signature_of_func(func_index).ok_or_else(|| {
                Error::Function(format!("no function with index {}", func_index))
            })?;
            if expected != actual {
                return Err(TrapKind::UnexpectedSignature.into());
            }
            actual.clone()
        };

        let args = self.pop_call_args(&signature)?;
        self.call(func_index, &args, false)?;
        Ok(InstructionOutcome::RunNextInstruction)
    }

    /// Pops call arguments in reverse declaration order, checking that each
    /// popped value carries the declared parameter type. A mismatch is a
    /// fault of the embedding, not a Wasm trap.
    fn pop_call_args(&mut self, signature: &Signature) -> Result<Vec<Value>, Error> {
        let params = signature.params();
        let mut args = vec![Value::FALSE; params.len()];
        for index in (0..params.len()).rev() {
            let value = self.value_stack.pop();
            if value.value_type() != params[index] {
                return Err(Error::Value(format!(
                    "expected {} for argument {}, got {}",
                    params[index],
                    index,
                    value.value_type()
                )));
            }
            args[index] = value;
        }
        Ok(args)
    }

    fn run_drop(&mut self) -> Result<InstructionOutcome, Error> {
        let _ = self.value_stack.pop();
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_select(&mut self) -> Result<InstructionOutcome, Error> {
        let condition = self.value_stack.pop();
        let right = self.value_stack.pop();
        let left = self.value_stack.pop();
        let chosen = if condition.as_i32() != 0 { left } else { right };
        self.value_stack.push(chosen);
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_get_local(&mut self, index: u32) -> Result<InstructionOutcome, Error> {
        let value = self.local(index)?;
        self.value_stack.push(value);
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_set_local(&mut self, index: u32) -> Result<InstructionOutcome, Error> {
        let value = self.value_stack.pop();
        self.set_local(index, value)?;
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_tee_local(&mut self, index: u32) -> Result<InstructionOutcome, Error> {
        let value = self.value_stack.peek();
        self.set_local(index, value)?;
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn local(&self, index: u32) -> Result<Value, Error> {
        self.call_stack
            .top()
            .locals
            .get(index as usize)
            .copied()
            .ok_or_else(|| Error::Function(format!("no local with index {}", index)))
    }

    fn set_local(&mut self, index: u32, value: Value) -> Result<(), Error> {
        let frame = self.call_stack.top_mut();
        let slot = frame
            .locals
            .get_mut(index as usize)
            .ok_or_else(|| Error::Function(format!("no local with index {}", index)))?;
        *slot = value;
        Ok(())
    }

    fn run_get_global(&mut self, index: u32) -> Result<InstructionOutcome, Error> {
        let global = self
            .instance
            .global_by_index(index)
            .ok_or_else(|| Error::Global(format!("no global with index {}", index)))?;
        self.value_stack.push(global.get());
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_set_global(&mut self, index: u32) -> Result<InstructionOutcome, Error> {
        let value = self.value_stack.pop();
        let global = self
            .instance
            .global_by_index(index)
            .ok_or_else(|| Error::Global(format!("no global with index {}", index)))?;
        global.set(value)?;
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_load<T>(&mut self, instruction: &Instruction) -> Result<InstructionOutcome, Error>
    where
        T: LittleEndianConvert,
        Value: From<T>,
    {
        let offset = instruction.operand(1)? as u32;
        let base: u32 = self.value_stack.pop_as();
        let address = effective_address(offset, base)?;
        let value: T = self
            .memory()?
            .get_value(address)
            .map_err(|_| TrapKind::MemoryAccessOutOfBounds)?;
        self.value_stack.push(value.into());
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_load_extend<T, U>(&mut self, instruction: &Instruction) -> Result<InstructionOutcome, Error>
    where
        T: LittleEndianConvert + ExtendInto<U>,
        Value: From<U>,
    {
        let offset = instruction.operand(1)? as u32;
        let base: u32 = self.value_stack.pop_as();
        let address = effective_address(offset, base)?;
        let value: T = self
            .memory()?
            .get_value(address)
            .map_err(|_| TrapKind::MemoryAccessOutOfBounds)?;
        let extended: U = value.extend_into();
        self.value_stack.push(extended.into());
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_store<T>(&mut self, instruction: &Instruction) -> Result<InstructionOutcome, Error>
    where
        T: FromStackValue + LittleEndianConvert,
    {
        let offset = instruction.operand(1)? as u32;
        let value: T = self.value_stack.pop_as();
        let base: u32 = self.value_stack.pop_as();
        let address = effective_address(offset, base)?;
        self.memory()?
            .set_value(address, value)
            .map_err(|_| TrapKind::MemoryAccessOutOfBounds)?;
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_store_wrap<T, U>(&mut self, instruction: &Instruction) -> Result<InstructionOutcome, Error>
    where
        T: FromStackValue + WrapInto<U>,
        U: LittleEndianConvert,
    {
        let offset = instruction.operand(1)? as u32;
        let value: T = self.value_stack.pop_as();
        let wrapped: U = value.wrap_into();
        let base: u32 = self.value_stack.pop_as();
        let address = effective_address(offset, base)?;
        self.memory()?
            .set_value(address, wrapped)
            .map_err(|_| TrapKind::MemoryAccessOutOfBounds)?;
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_current_memory(&mut self) -> Result<InstructionOutcome, Error> {
        let pages = self.memory()?.current_size().0;
        self.value_stack.push(Value::I32(pages as u32 as i32));
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_grow_memory(&mut self) -> Result<InstructionOutcome, Error> {
        let additional: u32 = self.value_stack.pop_as();
        let result = match self.memory()?.grow(Pages(additional as usize)) {
            Ok(Pages(previous)) => previous as u32,
            // Returns -1 (or 0xFFFFFFFF) in case of error.
            Err(_) => u32::MAX,
        };
        self.value_stack.push(Value::I32(result as i32));
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_memory_init(&mut self, instruction: &Instruction) -> Result<InstructionOutcome, Error> {
        let segment = instruction.operand(0)? as u32;
        let memory_index = instruction.operand(1)? as u32;
        if memory_index != DEFAULT_MEMORY_INDEX {
            return Err(Error::Memory(format!(
                "memory.init against unsupported memory index {}",
                memory_index
            )));
        }
        let len: u32 = self.value_stack.pop_as();
        let src_offset: u32 = self.value_stack.pop_as();
        let dst: u32 = self.value_stack.pop_as();
        self.memory()?
            .init_passive_segment(segment, dst, src_offset, len)
            .map_err(|_| TrapKind::MemoryAccessOutOfBounds)?;
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_data_drop(&mut self, instruction: &Instruction) -> Result<InstructionOutcome, Error> {
        let segment = instruction.operand(0)? as u32;
        self.memory()?.drop_segment(segment)?;
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_memory_copy(&mut self, instruction: &Instruction) -> Result<InstructionOutcome, Error> {
        let dst_memory = instruction.operand(0)? as u32;
        let src_memory = instruction.operand(1)? as u32;
        if dst_memory != DEFAULT_MEMORY_INDEX || src_memory != DEFAULT_MEMORY_INDEX {
            return Err(Error::Memory(format!(
                "memory.copy against unsupported memory indices {} and {}",
                dst_memory, src_memory
            )));
        }
        let len: u32 = self.value_stack.pop_as();
        let src: u32 = self.value_stack.pop_as();
        let dst: u32 = self.value_stack.pop_as();
        self.memory()?
            .copy(dst, src, len)
            .map_err(|_| TrapKind::MemoryAccessOutOfBounds)?;
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_memory_fill(&mut self, instruction: &Instruction) -> Result<InstructionOutcome, Error> {
        let memory_index = instruction.operand(0)? as u32;
        if memory_index != DEFAULT_MEMORY_INDEX {
            return Err(Error::Memory(format!(
                "memory.fill against unsupported memory index {}",
                memory_index
            )));
        }
        let len: u32 = self.value_stack.pop_as();
        let value: u32 = self.value_stack.pop_as();
        let dst: u32 = self.value_stack.pop_as();
        self.memory()?
            .fill(dst, value as u8, len)
            .map_err(|_| TrapKind::MemoryAccessOutOfBounds)?;
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_const(&mut self, value: Value) -> Result<InstructionOutcome, Error> {
        self.value_stack.push(value);
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_relop<T, F>(&mut self, f: F) -> Result<InstructionOutcome, Error>
    where
        T: FromStackValue,
        F: FnOnce(T, T) -> bool,
    {
        let (left, right) = self.value_stack.pop_pair_as::<T>();
        let result = if f(left, right) {
            Value::TRUE
        } else {
            Value::FALSE
        };
        self.value_stack.push(result);
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_eqz<T>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: FromStackValue + PartialEq<T> + Default,
    {
        let value: T = self.value_stack.pop_as();
        let result = if value == Default::default() {
            Value::TRUE
        } else {
            Value::FALSE
        };
        self.value_stack.push(result);
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_eq<T>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: FromStackValue + PartialEq<T>,
    {
        self.run_relop(|left: T, right: T| left == right)
    }

    fn run_ne<T>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: FromStackValue + PartialEq<T>,
    {
        self.run_relop(|left: T, right: T| left != right)
    }

    fn run_lt<T>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: FromStackValue + PartialOrd<T>,
    {
        self.run_relop(|left: T, right: T| left < right)
    }

    fn run_gt<T>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: FromStackValue + PartialOrd<T>,
    {
        self.run_relop(|left: T, right: T| left > right)
    }

    fn run_lte<T>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: FromStackValue + PartialOrd<T>,
    {
        self.run_relop(|left: T, right: T| left <= right)
    }

    fn run_gte<T>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: FromStackValue + PartialOrd<T>,
    {
        self.run_relop(|left: T, right: T| left >= right)
    }

    fn run_unop<T, U, F>(&mut self, f: F) -> Result<InstructionOutcome, Error>
    where
        F: FnOnce(T) -> U,
        T: FromStackValue,
        Value: From<U>,
    {
        let value: T = self.value_stack.pop_as();
        self.value_stack.push(f(value).into());
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_clz<T>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: Integer<T> + FromStackValue,
        Value: From<T>,
    {
        self.run_unop(|value: T| value.leading_zeros())
    }

    fn run_ctz<T>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: Integer<T> + FromStackValue,
        Value: From<T>,
    {
        self.run_unop(|value: T| value.trailing_zeros())
    }

    fn run_popcnt<T>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: Integer<T> + FromStackValue,
        Value: From<T>,
    {
        self.run_unop(|value: T| value.count_ones())
    }

    fn run_add<T>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: ArithmeticOps<T> + FromStackValue,
        Value: From<T>,
    {
        let (left, right) = self.value_stack.pop_pair_as::<T>();
        self.value_stack.push(left.add(right).into());
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_sub<T>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: ArithmeticOps<T> + FromStackValue,
        Value: From<T>,
    {
        let (left, right) = self.value_stack.pop_pair_as::<T>();
        self.value_stack.push(left.sub(right).into());
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_mul<T>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: ArithmeticOps<T> + FromStackValue,
        Value: From<T>,
    {
        let (left, right) = self.value_stack.pop_pair_as::<T>();
        self.value_stack.push(left.mul(right).into());
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_div<T, U>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: TransmuteInto<U> + FromStackValue,
        U: ArithmeticOps<U> + TransmuteInto<T>,
        Value: From<T>,
    {
        let (left, right) = self.value_stack.pop_pair_as::<T>();
        let (left, right): (U, U) = (left.transmute_into(), right.transmute_into());
        let result = left.div(right)?;
        self.value_stack.push(result.transmute_into().into());
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_rem<T, U>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: TransmuteInto<U> + FromStackValue,
        U: Integer<U> + TransmuteInto<T>,
        Value: From<T>,
    {
        let (left, right) = self.value_stack.pop_pair_as::<T>();
        let (left, right): (U, U) = (left.transmute_into(), right.transmute_into());
        let result = left.rem(right)?;
        self.value_stack.push(result.transmute_into().into());
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_and<T>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: ops::BitAnd<T, Output = T> + FromStackValue,
        Value: From<T>,
    {
        let (left, right) = self.value_stack.pop_pair_as::<T>();
        self.value_stack.push(left.bitand(right).into());
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_or<T>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: ops::BitOr<T, Output = T> + FromStackValue,
        Value: From<T>,
    {
        let (left, right) = self.value_stack.pop_pair_as::<T>();
        self.value_stack.push(left.bitor(right).into());
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_xor<T>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: ops::BitXor<T, Output = T> + FromStackValue,
        Value: From<T>,
    {
        let (left, right) = self.value_stack.pop_pair_as::<T>();
        self.value_stack.push(left.bitxor(right).into());
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_shl<T>(&mut self, mask: T) -> Result<InstructionOutcome, Error>
    where
        T: ops::Shl<T, Output = T> + ops::BitAnd<T, Output = T> + FromStackValue,
        Value: From<T>,
    {
        let (left, right) = self.value_stack.pop_pair_as::<T>();
        self.value_stack.push(left.shl(right & mask).into());
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_shr<T, U>(&mut self, mask: U) -> Result<InstructionOutcome, Error>
    where
        T: TransmuteInto<U> + FromStackValue,
        U: ops::Shr<U, Output = U> + ops::BitAnd<U, Output = U> + TransmuteInto<T>,
        Value: From<T>,
    {
        let (left, right) = self.value_stack.pop_pair_as::<T>();
        let (left, right): (U, U) = (left.transmute_into(), right.transmute_into());
        let result = left.shr(right & mask);
        self.value_stack.push(result.transmute_into().into());
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_rotl<T>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: Integer<T> + FromStackValue,
        Value: From<T>,
    {
        let (left, right) = self.value_stack.pop_pair_as::<T>();
        self.value_stack.push(left.rotl(right).into());
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_rotr<T>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: Integer<T> + FromStackValue,
        Value: From<T>,
    {
        let (left, right) = self.value_stack.pop_pair_as::<T>();
        self.value_stack.push(left.rotr(right).into());
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_abs<T>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: Float<T> + FromStackValue,
        Value: From<T>,
    {
        self.run_unop(|value: T| value.abs())
    }

    fn run_neg<T>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: ops::Neg<Output = T> + FromStackValue,
        Value: From<T>,
    {
        self.run_unop(|value: T| value.neg())
    }

    fn run_ceil<T>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: Float<T> + FromStackValue,
        Value: From<T>,
    {
        self.run_unop(|value: T| value.ceil())
    }

    fn run_floor<T>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: Float<T> + FromStackValue,
        Value: From<T>,
    {
        self.run_unop(|value: T| value.floor())
    }

    fn run_trunc<T>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: Float<T> + FromStackValue,
        Value: From<T>,
    {
        self.run_unop(|value: T| value.trunc())
    }

    fn run_nearest<T>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: Float<T> + FromStackValue,
        Value: From<T>,
    {
        self.run_unop(|value: T| value.nearest())
    }

    fn run_sqrt<T>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: Float<T> + FromStackValue,
        Value: From<T>,
    {
        self.run_unop(|value: T| value.sqrt())
    }

    fn run_min<T>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: Float<T> + FromStackValue,
        Value: From<T>,
    {
        let (left, right) = self.value_stack.pop_pair_as::<T>();
        self.value_stack.push(left.min(right).into());
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_max<T>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: Float<T> + FromStackValue,
        Value: From<T>,
    {
        let (left, right) = self.value_stack.pop_pair_as::<T>();
        self.value_stack.push(left.max(right).into());
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_copysign<T>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: Float<T> + FromStackValue,
        Value: From<T>,
    {
        let (left, right) = self.value_stack.pop_pair_as::<T>();
        self.value_stack.push(left.copysign(right).into());
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_wrap<T, U>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: WrapInto<U> + FromStackValue,
        Value: From<U>,
    {
        self.run_unop(|value: T| value.wrap_into())
    }

    fn run_trunc_to_int<T, U, V>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: TryTruncateInto<U, TrapKind> + FromStackValue,
        U: TransmuteInto<V>,
        Value: From<V>,
    {
        let value: T = self.value_stack.pop_as();
        let truncated: U = value.try_truncate_into()?;
        self.value_stack.push(truncated.transmute_into().into());
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_trunc_sat<T, U, V>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: TruncateSaturateInto<U> + FromStackValue,
        U: TransmuteInto<V>,
        Value: From<V>,
    {
        let value: T = self.value_stack.pop_as();
        let truncated: U = value.truncate_saturate_into();
        self.value_stack.push(truncated.transmute_into().into());
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_extend<T, U, V>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: ExtendInto<U> + FromStackValue,
        U: TransmuteInto<V>,
        Value: From<V>,
    {
        let value: T = self.value_stack.pop_as();
        let extended: U = value.extend_into();
        self.value_stack.push(extended.transmute_into().into());
        Ok(InstructionOutcome::RunNextInstruction)
    }

    fn run_reinterpret<T, U>(&mut self) -> Result<InstructionOutcome, Error>
    where
        T: TransmuteInto<U> + FromStackValue,
        Value: From<U>,
    {
        let value: T = self.value_stack.pop_as();
        self.value_stack.push(value.transmute_into().into());
        Ok(InstructionOutcome::RunNextInstruction)
    }
}

/// Computes the effective address `offset + base`, interpreted as an
/// unsigned 32-bit quantity.
fn effective_address(offset: u32, base: u32) -> Result<u32, TrapKind> {
    match offset.checked_add(base) {
        None => Err(TrapKind::MemoryAccessOutOfBounds),
        Some(address) => Ok(address),
    }
}

/// Checks that the argument vector matches the parameter types of a
/// signature. A mismatch is a fault of the embedding.
fn check_function_args(signature: &Signature, args: &[Value]) -> Result<(), Error> {
    if signature.params().len() != args.len() {
        return Err(Error::Function(format!(
            "expected {} arguments, got {}",
            signature.params().len(),
            args.len()
        )));
    }

    if signature
        .params()
        .iter()
        .zip(args.iter().map(|arg| arg.value_type()))
        .any(|(expected, actual)| *expected != actual)
    {
        return Err(Error::Function(
            "argument types do not match the function signature".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{check_function_args, effective_address, ValueStack};
    use crate::types::{Signature, ValueType};
    use crate::{Error, TrapKind, Value};
    use assert_matches::assert_matches;

    #[test]
    fn effective_address_checks_overflow() {
        assert_eq!(effective_address(4, 8), Ok(12));
        assert_matches!(
            effective_address(u32::MAX, 1),
            Err(TrapKind::MemoryAccessOutOfBounds)
        );
    }

    #[test]
    fn argument_checking() {
        let signature = Signature::new(&[ValueType::I32][..], &[][..]);
        assert!(check_function_args(&signature, &[Value::I32(1)]).is_ok());
        assert_matches!(
            check_function_args(&signature, &[Value::I64(1)]),
            Err(Error::Function(_))
        );
        assert_matches!(check_function_args(&signature, &[]), Err(Error::Function(_)));
    }

    #[test]
    fn value_stack_drain_preserves_order() {
        let mut stack = ValueStack::new();
        stack.push(Value::I32(1));
        stack.push(Value::I32(2));
        stack.push(Value::I32(3));

        let top = stack.drain_top(2);
        assert_eq!(top, vec![Value::I32(2), Value::I32(3)]);
        assert_eq!(stack.len(), 1);

        stack.shrink_to(0);
        assert_eq!(stack.len(), 0);
    }
}
