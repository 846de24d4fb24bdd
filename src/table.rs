use crate::{Error, TrapKind};
use alloc::{rc::Rc, vec::Vec};
use core::{cell::RefCell, fmt, u32};

/// Reference to a table (See [`TableInstance`] for details).
///
/// This reference has a reference-counting semantics.
///
/// [`TableInstance`]: struct.TableInstance.html
#[derive(Clone, Debug)]
pub struct TableRef(Rc<TableInstance>);

impl ::core::ops::Deref for TableRef {
    type Target = TableInstance;
    fn deref(&self) -> &TableInstance {
        &self.0
    }
}

/// Runtime representation of a table.
///
/// A table is an array of function references. It allows wasm code to call
/// functions indirectly through a dynamic index into a table. For example,
/// this allows emulating function pointers by way of table indices.
///
/// A reference is stored as the index of the referenced function definition;
/// slots that were never initialized hold no reference at all.
///
/// A table is created with an initial size but can be grown dynamically via
/// the [`grow`] method. Growth can be limited by an optional maximum size.
///
/// [`grow`]: #method.grow
pub struct TableInstance {
    initial: u32,
    maximum: Option<u32>,
    /// Table memory buffer.
    buffer: RefCell<Vec<Option<u32>>>,
}

impl fmt::Debug for TableInstance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TableInstance")
            .field("initial", &self.initial)
            .field("maximum", &self.maximum)
            .field("buffer.len", &self.buffer.borrow().len())
            .finish()
    }
}

impl TableInstance {
    /// Allocate a table instance.
    ///
    /// The table is allocated with an initial size, specified by
    /// `initial_size`. Maximum size can be specified by `maximum_size`.
    ///
    /// All table elements are allocated uninitialized.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `initial_size` is greater than `maximum_size`.
    pub fn alloc(initial_size: u32, maximum_size: Option<u32>) -> Result<TableRef, Error> {
        if let Some(maximum_size) = maximum_size {
            if initial_size > maximum_size {
                return Err(Error::Table(format!(
                    "maximum size ({}) can't be smaller than initial size ({})",
                    maximum_size, initial_size
                )));
            }
        }
        let table = TableInstance {
            initial: initial_size,
            maximum: maximum_size,
            buffer: RefCell::new(vec![None; initial_size as usize]),
        };
        Ok(TableRef(Rc::new(table)))
    }

    /// Returns size this table was created with.
    pub fn initial_size(&self) -> u32 {
        self.initial
    }

    /// Returns maximum size `TableInstance` can grow to.
    pub fn maximum_size(&self) -> Option<u32> {
        self.maximum
    }

    /// Returns current size of the table.
    pub fn current_size(&self) -> u32 {
        self.buffer.borrow().len() as u32
    }

    /// Increases the size of the table by given number of elements.
    ///
    /// # Errors
    ///
    /// Returns `Err` if tried to allocate more elements than permitted by
    /// the limit.
    pub fn grow(&self, by: u32) -> Result<(), Error> {
        let mut buffer = self.buffer.borrow_mut();
        let maximum_size = self.maximum.unwrap_or(u32::MAX);
        let new_size = self
            .current_size()
            .checked_add(by)
            .and_then(|new_size| {
                if maximum_size < new_size {
                    None
                } else {
                    Some(new_size)
                }
            })
            .ok_or_else(|| {
                Error::Table(format!(
                    "Trying to grow table by {} items when there are already {} items",
                    by,
                    self.current_size(),
                ))
            })?;
        buffer.resize(new_size as usize, None);
        Ok(())
    }

    /// Resolves the function reference stored at `index`.
    ///
    /// Returns the index of the referenced function definition, trapping on
    /// an out of bounds or uninitialized slot.
    pub fn func_ref(&self, index: u32) -> Result<u32, TrapKind> {
        let buffer = self.buffer.borrow();
        buffer
            .get(index as usize)
            .copied()
            .ok_or(TrapKind::TableAccessOutOfBounds)?
            .ok_or(TrapKind::ElemUninitialized)
    }

    /// Sets the table element at `index` to the given function reference.
    pub fn set(&self, index: u32, value: Option<u32>) -> Result<(), Error> {
        let mut buffer = self.buffer.borrow_mut();
        let buffer_len = buffer.len();
        let table_elem = buffer.get_mut(index as usize).ok_or_else(|| {
            Error::Table(format!(
                "trying to update table item with index {} when there are only {} items",
                index, buffer_len
            ))
        })?;
        *table_elem = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::TableInstance;
    use crate::{Error, TrapKind};
    use assert_matches::assert_matches;

    #[test]
    fn func_refs_resolve_or_trap() {
        let table = TableInstance::alloc(2, Some(4)).unwrap();
        table.set(0, Some(7)).unwrap();

        assert_eq!(table.func_ref(0), Ok(7));
        assert_matches!(table.func_ref(1), Err(TrapKind::ElemUninitialized));
        assert_matches!(table.func_ref(2), Err(TrapKind::TableAccessOutOfBounds));
    }

    #[test]
    fn grow_respects_maximum() {
        let table = TableInstance::alloc(1, Some(2)).unwrap();
        table.grow(1).unwrap();
        assert_eq!(table.current_size(), 2);
        assert_matches!(table.grow(1), Err(Error::Table(_)));
    }

    #[test]
    fn set_checks_bounds() {
        let table = TableInstance::alloc(1, None).unwrap();
        assert_matches!(table.set(1, Some(0)), Err(Error::Table(_)));
    }
}
