use crate::memory::MemoryRef;
use crate::value::{FromValue, Value};
use crate::{Trap, TrapKind};
use alloc::{rc::Rc, vec::Vec};
use core::cell::RefCell;
use core::fmt::{Debug, Display};
use downcast_rs::{impl_downcast, DowncastSync};

/// Wrapper around slice of [`Value`] for using it
/// as an argument list conveniently.
///
/// [`Value`]: enum.Value.html
#[derive(Debug)]
pub struct RuntimeArgs<'a>(&'a [Value]);

impl<'a> From<&'a [Value]> for RuntimeArgs<'a> {
    fn from(inner: &'a [Value]) -> Self {
        RuntimeArgs(inner)
    }
}

impl<'a> AsRef<[Value]> for RuntimeArgs<'a> {
    fn as_ref(&self) -> &[Value] {
        self.0
    }
}

impl<'a> RuntimeArgs<'a> {
    /// Extract argument by index `idx`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if cast is invalid or not enough arguments.
    pub fn nth_checked<T>(&self, idx: usize) -> Result<T, Trap>
    where
        T: FromValue,
    {
        self.nth_value_checked(idx)?
            .try_into()
            .ok_or_else(|| TrapKind::UnexpectedSignature.into())
    }

    /// Extract argument as a [`Value`] by index `idx`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if this list has not enough arguments.
    ///
    /// [`Value`]: enum.Value.html
    pub fn nth_value_checked(&self, idx: usize) -> Result<Value, Trap> {
        if self.0.len() <= idx {
            return Err(TrapKind::UnexpectedSignature.into());
        }
        Ok(self.0[idx])
    }

    /// Extract argument by index `idx`.
    ///
    /// # Panics
    ///
    /// Panics if cast is invalid or not enough arguments.
    pub fn nth<T>(&self, idx: usize) -> T
    where
        T: FromValue,
    {
        let value = self.nth_value_checked(idx).expect("Invalid argument index");
        value.try_into().expect("Unexpected argument type")
    }

    /// Total number of arguments.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Trait that allows the host to return custom error.
///
/// It should be useful for representing custom traps,
/// troubles at instantiation time or other host specific conditions.
///
/// Types that implement this trait can automatically be converted to
/// `Trap` and `Error` and will be represented as a boxed `HostError`. You can
/// then use the various methods on `Error` to get your custom error type back.
///
/// # Examples
///
/// ```rust
/// use std::fmt;
/// use wasmill::{Error, HostError};
///
/// #[derive(Debug)]
/// struct MyError {
///     code: u32,
/// }
///
/// impl fmt::Display for MyError {
///     fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
///         write!(f, "MyError, code={}", self.code)
///     }
/// }
///
/// impl HostError for MyError { }
///
/// fn failable_fn() -> Result<(), Error> {
///     let my_error = MyError { code: 1312 };
///     Err(my_error.into())
/// }
///
/// match failable_fn() {
///     Err(err) => {
///         let my_error = err.as_host_error().unwrap();
///         assert_eq!(my_error.downcast_ref::<MyError>().unwrap().code, 1312);
///     }
///     _ => panic!(),
/// }
/// ```
pub trait HostError: 'static + Display + Debug + DowncastSync {}
impl_downcast!(HostError);

/// Trait that allows to implement host functions.
///
/// A host function is invoked with a handle to the linear memory of the
/// calling instance (if the instance has one) and the argument values popped
/// for it. It may return no values, or a result vector which the engine
/// pushes back in order, or raise a [`Trap`] which aborts execution and
/// unwinds through every active Wasm frame.
///
/// The trait is implemented for plain closures of the matching shape:
///
/// ```rust
/// use wasmill::{RuntimeArgs, MemoryRef, Trap, Value};
///
/// let adder = |_memory: Option<&MemoryRef>, args: RuntimeArgs|
///     -> Result<Option<Vec<Value>>, Trap> {
///     let a: u32 = args.nth_checked(0)?;
///     let b: u32 = args.nth_checked(1)?;
///     Ok(Some(vec![Value::I32((a + b) as i32)]))
/// };
/// # let _ = adder;
/// ```
pub trait HostFunction {
    /// Perform the invocation of this host function.
    fn invoke(
        &mut self,
        memory: Option<&MemoryRef>,
        args: RuntimeArgs,
    ) -> Result<Option<Vec<Value>>, Trap>;
}

impl<F> HostFunction for F
where
    F: FnMut(Option<&MemoryRef>, RuntimeArgs) -> Result<Option<Vec<Value>>, Trap>,
{
    fn invoke(
        &mut self,
        memory: Option<&MemoryRef>,
        args: RuntimeArgs,
    ) -> Result<Option<Vec<Value>>, Trap> {
        self(memory, args)
    }
}

pub(crate) type HostFuncHandle = Rc<RefCell<dyn HostFunction>>;

#[cfg(test)]
mod tests {
    use super::{HostError, RuntimeArgs};
    use crate::Value;

    #[test]
    fn i32_runtime_args() {
        let args: RuntimeArgs = (&[Value::I32(0)][..]).into();
        let val: i32 = args.nth_checked(0).unwrap();
        assert_eq!(val, 0);
    }

    #[test]
    fn i64_invalid_arg_cast() {
        let args: RuntimeArgs = (&[Value::I64(90534534545322)][..]).into();
        assert!(args.nth_checked::<i32>(0).is_err());
    }

    #[test]
    fn missing_args_are_checked() {
        let args: RuntimeArgs = (&[][..]).into();
        assert!(args.nth_value_checked(0).is_err());
    }

    // Tests that `HostError` trait is object safe.
    fn _host_error_is_object_safe(_: &dyn HostError) {}
}
