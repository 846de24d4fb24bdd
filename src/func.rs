use crate::host::{HostFuncHandle, HostFunction};
use crate::isa::Instructions;
use crate::types::ValueType;
use alloc::{rc::Rc, vec::Vec};
use core::cell::RefCell;
use core::fmt;

/// Reference to a function (See [`FuncInstance`] for details).
///
/// This reference has a reference-counting semantics.
///
/// [`FuncInstance`]: struct.FuncInstance.html
#[derive(Clone, Debug)]
pub struct FuncRef(Rc<FuncInstance>);

impl ::core::ops::Deref for FuncRef {
    type Target = FuncInstance;
    fn deref(&self) -> &FuncInstance {
        &self.0
    }
}

/// Body of an internally defined function: the declared locals (which do not
/// include the parameters) and the instruction list.
#[derive(Debug)]
pub struct FuncBody {
    locals: Vec<ValueType>,
    code: Instructions,
}

impl FuncBody {
    /// Creates a function body from declared local types and code.
    pub fn new(locals: Vec<ValueType>, code: Instructions) -> FuncBody {
        FuncBody { locals, code }
    }

    /// Types of the declared locals, excluding parameters.
    pub fn locals(&self) -> &[ValueType] {
        &self.locals
    }

    /// The instruction list.
    pub fn code(&self) -> &Instructions {
        &self.code
    }
}

/// Runtime representation of a function.
///
/// A function is a definition inside a module instance: either an internally
/// defined function with a body the engine interprets, or an imported host
/// function dispatched across the host boundary. Both carry the index of
/// their type in the owning module's type section.
pub struct FuncInstance(FuncInstanceInternal);

pub(crate) enum FuncInstanceInternal {
    Internal {
        type_index: u32,
        body: FuncBody,
    },
    Host {
        type_index: u32,
        handler: HostFuncHandle,
    },
}

impl fmt::Debug for FuncInstance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            FuncInstanceInternal::Internal { type_index, .. } => f
                .debug_struct("Internal")
                .field("type_index", &type_index)
                .finish(),
            FuncInstanceInternal::Host { type_index, .. } => f
                .debug_struct("Host")
                .field("type_index", &type_index)
                .finish(),
        }
    }
}

impl FuncInstance {
    /// Allocates an internally defined function.
    pub fn alloc_internal(type_index: u32, body: FuncBody) -> FuncRef {
        FuncRef(Rc::new(FuncInstance(FuncInstanceInternal::Internal {
            type_index,
            body,
        })))
    }

    /// Allocates an imported function backed by the given host handler.
    pub fn alloc_host<H: HostFunction + 'static>(type_index: u32, handler: H) -> FuncRef {
        FuncRef(Rc::new(FuncInstance(FuncInstanceInternal::Host {
            type_index,
            handler: Rc::new(RefCell::new(handler)),
        })))
    }

    /// Index of this function's type in the owning module's type section.
    pub fn type_index(&self) -> u32 {
        match self.0 {
            FuncInstanceInternal::Internal { type_index, .. } => type_index,
            FuncInstanceInternal::Host { type_index, .. } => type_index,
        }
    }

    /// Whether this function is an imported host function.
    pub fn is_host(&self) -> bool {
        matches!(self.0, FuncInstanceInternal::Host { .. })
    }

    /// Returns the body of this function if it is internally defined.
    pub fn body(&self) -> Option<&FuncBody> {
        match self.0 {
            FuncInstanceInternal::Internal { ref body, .. } => Some(body),
            FuncInstanceInternal::Host { .. } => None,
        }
    }

    pub(crate) fn as_internal(&self) -> &FuncInstanceInternal {
        &self.0
    }
}
