use crate::func::{FuncBody, FuncInstance, FuncRef};
use crate::global::GlobalRef;
use crate::host::HostFunction;
use crate::isa::Instructions;
use crate::memory::MemoryRef;
use crate::table::TableRef;
use crate::types::{Signature, ValueType};
use crate::Error;
use alloc::{rc::Rc, vec::Vec};

/// Index of the default linear memory.
pub(crate) const DEFAULT_MEMORY_INDEX: u32 = 0;
/// Index of the default table.
pub(crate) const DEFAULT_TABLE_INDEX: u32 = 0;

/// Reference to a module instance (See [`ModuleInstance`] for details).
///
/// This reference has a reference-counting semantics.
///
/// [`ModuleInstance`]: struct.ModuleInstance.html
#[derive(Clone, Debug)]
pub struct ModuleRef(Rc<ModuleInstance>);

impl ::core::ops::Deref for ModuleRef {
    type Target = ModuleInstance;
    fn deref(&self) -> &ModuleInstance {
        &self.0
    }
}

/// A module instance: the collection of definitions the engine executes
/// against.
///
/// An instance holds the type section (function signatures), the function
/// definitions (internal bodies and host imports), at most one linear memory,
/// at most one table of function references, and the global variables. It is
/// produced by an external front end that decodes, validates and links a
/// module; the [`ModuleBuilder`] is the assembly surface that front end (and
/// the tests of this crate) use.
///
/// [`ModuleBuilder`]: struct.ModuleBuilder.html
#[derive(Debug)]
pub struct ModuleInstance {
    types: Vec<Signature>,
    funcs: Vec<FuncRef>,
    memory: Option<MemoryRef>,
    table: Option<TableRef>,
    globals: Vec<GlobalRef>,
}

impl ModuleInstance {
    /// Starts assembling a new module instance.
    pub fn builder() -> ModuleBuilder {
        ModuleBuilder::default()
    }

    /// Returns the signature at `type_index`.
    pub fn signature_by_index(&self, type_index: u32) -> Option<&Signature> {
        self.types.get(type_index as usize)
    }

    /// Returns a reference to the function at `func_index`.
    pub fn func_by_index(&self, func_index: u32) -> Option<FuncRef> {
        self.funcs.get(func_index as usize).cloned()
    }

    /// Returns the signature of the function at `func_index`.
    pub fn signature_of_func(&self, func_index: u32) -> Option<&Signature> {
        let func = self.funcs.get(func_index as usize)?;
        self.signature_by_index(func.type_index())
    }

    /// Returns the number of function definitions.
    pub fn func_count(&self) -> u32 {
        self.funcs.len() as u32
    }

    /// Returns the linear memory at `index`, if any.
    pub fn memory_by_index(&self, index: u32) -> Option<MemoryRef> {
        if index != DEFAULT_MEMORY_INDEX {
            return None;
        }
        self.memory.clone()
    }

    /// Returns the table at `index`, if any.
    pub fn table_by_index(&self, index: u32) -> Option<TableRef> {
        if index != DEFAULT_TABLE_INDEX {
            return None;
        }
        self.table.clone()
    }

    /// Returns the global variable at `index`.
    pub fn global_by_index(&self, index: u32) -> Option<GlobalRef> {
        self.globals.get(index as usize).cloned()
    }
}

/// Assembles a [`ModuleInstance`] definition by definition.
///
/// Functions refer to signatures by index into the type section, in the
/// order `push_type` was called; function indices likewise follow the order
/// of `push_function`/`push_host_function` calls.
///
/// [`ModuleInstance`]: struct.ModuleInstance.html
#[derive(Default)]
pub struct ModuleBuilder {
    types: Vec<Signature>,
    funcs: Vec<FuncRef>,
    memory: Option<MemoryRef>,
    table: Option<TableRef>,
    globals: Vec<GlobalRef>,
}

impl ModuleBuilder {
    /// Appends a signature to the type section.
    pub fn push_type(mut self, signature: Signature) -> ModuleBuilder {
        self.types.push(signature);
        self
    }

    /// Appends an internally defined function.
    pub fn push_function(
        mut self,
        type_index: u32,
        locals: &[ValueType],
        code: Instructions,
    ) -> ModuleBuilder {
        self.funcs.push(FuncInstance::alloc_internal(
            type_index,
            FuncBody::new(locals.to_vec(), code),
        ));
        self
    }

    /// Appends an imported host function.
    pub fn push_host_function<H: HostFunction + 'static>(
        mut self,
        type_index: u32,
        handler: H,
    ) -> ModuleBuilder {
        self.funcs.push(FuncInstance::alloc_host(type_index, handler));
        self
    }

    /// Sets the linear memory of the instance.
    pub fn with_memory(mut self, memory: MemoryRef) -> ModuleBuilder {
        self.memory = Some(memory);
        self
    }

    /// Sets the table of the instance.
    pub fn with_table(mut self, table: TableRef) -> ModuleBuilder {
        self.table = Some(table);
        self
    }

    /// Appends a global variable.
    pub fn push_global(mut self, global: GlobalRef) -> ModuleBuilder {
        self.globals.push(global);
        self
    }

    /// Finishes assembly.
    ///
    /// # Errors
    ///
    /// Returns `Err` if a function refers to a type index outside of the
    /// type section.
    pub fn build(self) -> Result<ModuleRef, Error> {
        for (index, func) in self.funcs.iter().enumerate() {
            if func.type_index() as usize >= self.types.len() {
                return Err(Error::Instantiation(format!(
                    "function {} refers to unknown type {}",
                    index,
                    func.type_index()
                )));
            }
        }
        Ok(ModuleRef(Rc::new(ModuleInstance {
            types: self.types,
            funcs: self.funcs,
            memory: self.memory,
            table: self.table,
            globals: self.globals,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::ModuleInstance;
    use crate::isa::Instructions;
    use crate::types::Signature;
    use crate::Error;
    use assert_matches::assert_matches;

    #[test]
    fn build_checks_type_indices() {
        let result = ModuleInstance::builder()
            .push_function(0, &[], Instructions::default())
            .build();
        assert_matches!(result, Err(Error::Instantiation(_)));
    }

    #[test]
    fn lookups_resolve() {
        let instance = ModuleInstance::builder()
            .push_type(Signature::new(&[][..], &[][..]))
            .push_function(0, &[], Instructions::default())
            .build()
            .unwrap();

        assert_eq!(instance.func_count(), 1);
        assert!(instance.func_by_index(0).is_some());
        assert!(instance.func_by_index(1).is_none());
        assert!(instance.signature_of_func(0).is_some());
        assert!(instance.memory_by_index(0).is_none());
    }
}
