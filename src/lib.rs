//! # wasmill
//!
//! An embeddable WebAssembly interpreter.
//!
//! The engine executes functions of an already decoded and validated module.
//! Decoding the binary format is the job of an external front end which hands
//! the engine a per-function [`Instructions`] stream with all branch targets
//! resolved to instruction positions. The engine walks that stream with an
//! operand stack and a stack of call frames, implements the full numeric,
//! memory and control-flow semantics of the Wasm MVP together with the
//! sign-extension, saturating float-to-int and bulk-memory proposals, and
//! dispatches imported functions to the host.
//!
//! ## Execution
//!
//! A [`Machine`] is constructed over a [`ModuleInstance`] and invoked through
//! [`Machine::call`]. A call either returns the function results, fails with
//! a [`Trap`] carrying the canonical Wasm trap message and a snapshot of the
//! call stack, or fails with an engine [`Error`] for conditions that are bugs
//! in the embedding rather than Wasm-defined failures.
//!
//! ## Example
//!
//! ```rust
//! use wasmill::{
//!     isa::{Instruction, Instructions, OpCode},
//!     Machine, ModuleInstance, Signature, Value, ValueType,
//! };
//!
//! // (func (param i32) (result i32) local.get 0 i32.const 2 i32.mul)
//! let mut code = Instructions::with_capacity(4);
//! code.push(Instruction::with_operands(OpCode::LocalGet, &[0]));
//! code.push(Instruction::with_operands(OpCode::I32Const, &[2]));
//! code.push(Instruction::plain(OpCode::I32Mul));
//! code.push(Instruction::plain(OpCode::End));
//!
//! let instance = ModuleInstance::builder()
//!     .push_type(Signature::new(&[ValueType::I32][..], &[ValueType::I32][..]))
//!     .push_function(0, &[], code)
//!     .build()
//!     .unwrap();
//!
//! let mut machine = Machine::new(&instance);
//! let results = machine.call(0, &[Value::I32(21)], true).unwrap();
//! assert_eq!(results, Some(vec![Value::I32(42)]));
//! ```

#![warn(missing_docs)]
#![cfg_attr(not(feature = "std"), no_std)]
#![allow(clippy::len_without_is_empty)]
#![allow(clippy::new_ret_no_self)]

#[cfg(not(feature = "std"))]
#[macro_use]
extern crate alloc;
#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::{boxed::Box, string::String, vec::Vec};
use core::fmt;
#[cfg(feature = "std")]
use std::error;

/// Error type which can be thrown by wasm code or by the host environment.
///
/// Under some conditions, wasm execution may produce a `Trap`, which
/// immediately aborts execution. Traps can't be handled by WebAssembly code,
/// but are reported to the embedder.
#[derive(Debug)]
pub struct Trap {
    kind: TrapKind,
    trace: Vec<FrameInfo>,
}

/// A single entry of the call-stack snapshot carried by a [`Trap`].
///
/// Frames are unwound once a trap propagates, so the snapshot stores plain
/// frame metadata instead of live frames.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FrameInfo {
    /// Index of the function the frame was executing.
    pub func_id: u32,
    /// Position of the next instruction at the time the snapshot was taken.
    pub pc: u32,
}

impl Trap {
    /// Create new trap.
    pub fn new(kind: TrapKind) -> Trap {
        Trap {
            kind,
            trace: Vec::new(),
        }
    }

    /// Returns kind of this trap.
    pub fn kind(&self) -> &TrapKind {
        &self.kind
    }

    /// Converts into kind of this trap.
    pub fn into_kind(self) -> TrapKind {
        self.kind
    }

    /// Returns the call-stack snapshot taken when the trap was raised.
    ///
    /// The outermost call is first, the frame that raised the trap is last.
    pub fn stack_trace(&self) -> &[FrameInfo] {
        &self.trace
    }

    pub(crate) fn has_stack_trace(&self) -> bool {
        !self.trace.is_empty()
    }

    pub(crate) fn with_stack_trace(mut self, trace: Vec<FrameInfo>) -> Trap {
        self.trace = trace;
        self
    }
}

impl fmt::Display for Trap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Trap: {}", self.kind)
    }
}

#[cfg(feature = "std")]
impl error::Error for Trap {
    fn description(&self) -> &str {
        "runtime trap"
    }
}

/// Error type which can be thrown by wasm code or by the host environment.
///
/// See [`Trap`] for details.
#[derive(Debug)]
pub enum TrapKind {
    /// Wasm code executed `unreachable` opcode.
    ///
    /// `unreachable` is a special opcode which always traps upon execution.
    Unreachable,

    /// Attempt to load or store at an address which lies outside of the
    /// bounds of the memory, or to materialize a passive data segment that
    /// has been dropped or is read past its end.
    ///
    /// Since addresses are interpreted as unsigned integers, out of bounds
    /// access can't happen with negative addresses (i.e. they will always
    /// wrap).
    MemoryAccessOutOfBounds,

    /// Attempt to access a table element at an index which lies outside of
    /// bounds.
    ///
    /// This typically can happen when `call_indirect` is executed with an
    /// index that lies out of bounds.
    TableAccessOutOfBounds,

    /// Attempt to access a table element which is uninitialized.
    ///
    /// This typically can happen when `call_indirect` is executed.
    ElemUninitialized,

    /// Attempt to divide by zero.
    ///
    /// This trap typically can happen if `div` or `rem` is executed with
    /// zero as divider.
    DivisionByZero,

    /// An integer arithmetic operation caused an overflow.
    ///
    /// This can happen when doing signed division (or taking the remainder)
    /// of -2<sup>N-1</sup> over -1, or when a float-to-int truncation sees a
    /// value outside the range of the destination type.
    IntegerOverflow,

    /// Attempt to make a conversion to an int failed.
    ///
    /// Raised when truncating a NaN into an integer.
    InvalidConversionToInt,

    /// Call stack exhausted.
    ///
    /// This is likely caused by some infinite or very deep recursion.
    StackOverflow,

    /// Attempt to invoke a function through `call_indirect` whose actual
    /// signature differs from the one the call site declares.
    UnexpectedSignature,

    /// Error specified by the host.
    ///
    /// Typically raised from a host function to abort execution.
    Host(Box<dyn host::HostError>),
}

impl PartialEq for TrapKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TrapKind::Unreachable, TrapKind::Unreachable) => true,
            (TrapKind::MemoryAccessOutOfBounds, TrapKind::MemoryAccessOutOfBounds) => true,
            (TrapKind::TableAccessOutOfBounds, TrapKind::TableAccessOutOfBounds) => true,
            (TrapKind::ElemUninitialized, TrapKind::ElemUninitialized) => true,
            (TrapKind::DivisionByZero, TrapKind::DivisionByZero) => true,
            (TrapKind::IntegerOverflow, TrapKind::IntegerOverflow) => true,
            (TrapKind::InvalidConversionToInt, TrapKind::InvalidConversionToInt) => true,
            (TrapKind::StackOverflow, TrapKind::StackOverflow) => true,
            (TrapKind::UnexpectedSignature, TrapKind::UnexpectedSignature) => true,
            (TrapKind::Host(_), TrapKind::Host(_)) => false,
            _ => false,
        }
    }
}

impl TrapKind {
    /// Whether this trap is specified by the host.
    pub fn is_host(&self) -> bool {
        matches!(self, TrapKind::Host(_))
    }

    /// Returns the canonical trap message as expected by the Wasm test
    /// harness.
    pub fn trap_message(&self) -> &str {
        match self {
            TrapKind::Unreachable => "Trapped on unreachable instruction",
            TrapKind::MemoryAccessOutOfBounds => "out of bounds memory access",
            TrapKind::TableAccessOutOfBounds => "undefined element",
            TrapKind::ElemUninitialized => "uninitialized element",
            TrapKind::DivisionByZero => "integer divide by zero",
            TrapKind::IntegerOverflow => "integer overflow",
            TrapKind::InvalidConversionToInt => "invalid conversion to integer",
            TrapKind::StackOverflow => "call stack exhausted",
            TrapKind::UnexpectedSignature => "indirect call type mismatch",
            TrapKind::Host(_) => "host error",
        }
    }
}

impl fmt::Display for TrapKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TrapKind::Host(host_error) => write!(f, "{}", host_error),
            other => write!(f, "{}", other.trap_message()),
        }
    }
}

/// Internal interpreter error.
///
/// Engine errors are failures of the embedding (malformed instruction
/// streams, type mismatches at the host boundary, unsupported constructs),
/// as opposed to [`Trap`]s which are Wasm-defined runtime failures.
#[derive(Debug)]
pub enum Error {
    /// Error while building a module instance. Might occur when provided
    /// with inconsistent definitions (i.e. linkage failure).
    Instantiation(String),
    /// Function-level error.
    Function(String),
    /// Table-level error.
    Table(String),
    /// Memory-level error.
    Memory(String),
    /// Global-level error.
    Global(String),
    /// Value-level error.
    Value(String),
    /// Trap.
    Trap(Trap),
    /// Custom embedder error.
    Host(Box<dyn host::HostError>),
}

impl Error {
    /// Returns a reference to a [`HostError`] if this `Error` represents
    /// some host error.
    ///
    /// I.e. if this error has the variant [`Host`] or [`Trap`][`Trap`] with
    /// a [host][`TrapKind::Host`] trap kind.
    ///
    /// [`HostError`]: trait.HostError.html
    /// [`Host`]: enum.Error.html#variant.Host
    /// [`Trap`]: enum.Error.html#variant.Trap
    /// [`TrapKind::Host`]: enum.TrapKind.html#variant.Host
    pub fn as_host_error(&self) -> Option<&dyn host::HostError> {
        match self {
            Error::Host(host_err) => Some(&**host_err),
            Error::Trap(trap) => match trap.kind() {
                TrapKind::Host(host_err) => Some(&**host_err),
                _ => None,
            },
            _ => None,
        }
    }

    /// Returns the [`Trap`] if this `Error` is a trap.
    pub fn as_trap(&self) -> Option<&Trap> {
        match self {
            Error::Trap(trap) => Some(trap),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Instantiation(ref s) => write!(f, "Instantiation: {}", s),
            Error::Function(ref s) => write!(f, "Function: {}", s),
            Error::Table(ref s) => write!(f, "Table: {}", s),
            Error::Memory(ref s) => write!(f, "Memory: {}", s),
            Error::Global(ref s) => write!(f, "Global: {}", s),
            Error::Value(ref s) => write!(f, "Value: {}", s),
            Error::Trap(ref trap) => write!(f, "Trap: {}", trap.kind()),
            Error::Host(ref e) => write!(f, "User: {}", e),
        }
    }
}

#[cfg(feature = "std")]
impl error::Error for Error {
    fn description(&self) -> &str {
        match *self {
            Error::Instantiation(ref s) => s,
            Error::Function(ref s) => s,
            Error::Table(ref s) => s,
            Error::Memory(ref s) => s,
            Error::Global(ref s) => s,
            Error::Value(ref s) => s,
            Error::Trap(_) => "Trap",
            Error::Host(_) => "Host error",
        }
    }
}

impl<U> From<U> for Error
where
    U: host::HostError + Sized,
{
    fn from(e: U) -> Self {
        Error::Host(Box::new(e))
    }
}

impl<U> From<U> for Trap
where
    U: host::HostError + Sized,
{
    fn from(e: U) -> Self {
        Trap::new(TrapKind::Host(Box::new(e)))
    }
}

impl From<Trap> for Error {
    fn from(e: Trap) -> Error {
        Error::Trap(e)
    }
}

impl From<TrapKind> for Trap {
    fn from(e: TrapKind) -> Trap {
        Trap::new(e)
    }
}

impl From<TrapKind> for Error {
    fn from(e: TrapKind) -> Error {
        Error::Trap(Trap::new(e))
    }
}

mod func;
mod global;
mod host;
pub mod isa;
mod memory;
mod module;
pub mod nan_preserving_float;
mod runner;
mod table;
mod types;
mod value;

#[cfg(test)]
mod tests;

pub use self::func::{FuncBody, FuncInstance, FuncRef};
pub use self::global::{GlobalInstance, GlobalRef};
pub use self::host::{HostError, HostFunction, RuntimeArgs};
pub use self::memory::{MemoryInstance, MemoryRef, LINEAR_MEMORY_PAGE_SIZE};
pub use self::module::{ModuleBuilder, ModuleInstance, ModuleRef};
pub use self::runner::{Machine, DEFAULT_CALL_STACK_LIMIT};
pub use self::table::{TableInstance, TableRef};
pub use self::types::{Signature, ValueType};
pub use self::value::{FromValue, LittleEndianConvert, Value};

/// WebAssembly-specific sizes and units.
pub mod memory_units {
    pub use memory_units::wasm32::*;
    pub use memory_units::{size_of, ByteSize, Bytes, RoundUpTo};
}
