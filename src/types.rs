use alloc::borrow::Cow;
use core::fmt;

/// Type of a value.
///
/// There is no distinction between signed and unsigned integer types. Instead,
/// integers are interpreted by respective operations as either unsigned or
/// signed in two's complement representation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// 32-bit signed or unsigned integer.
    I32,
    /// 64-bit signed or unsigned integer.
    I64,
    /// 32-bit IEEE 754-2008 floating point number.
    F32,
    /// 64-bit IEEE 754-2008 floating point number.
    F64,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ValueType::I32 => write!(f, "i32"),
            ValueType::I64 => write!(f, "i64"),
            ValueType::F32 => write!(f, "f32"),
            ValueType::F64 => write!(f, "f64"),
        }
    }
}

/// Signature of a [function].
///
/// Signature of a function consists of zero or more parameter [types][type]
/// and zero or more result [types][type].
///
/// Two signatures are considered equal if they have equal lists of parameters
/// and equal lists of results.
///
/// [type]: enum.ValueType.html
/// [function]: struct.FuncInstance.html
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    params: Cow<'static, [ValueType]>,
    results: Cow<'static, [ValueType]>,
}

impl Signature {
    /// Creates new signature with given parameter and result types.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use wasmill::{Signature, ValueType};
    ///
    /// // s1: (i32) -> ()
    /// let s1 = Signature::new(&[ValueType::I32][..], &[][..]);
    ///
    /// // s2: () -> i32
    /// let s2 = Signature::new(&[][..], &[ValueType::I32][..]);
    ///
    /// // s3: (i64) -> (i32, i32)
    /// let dynamic_params = vec![ValueType::I64];
    /// let s3 = Signature::new(dynamic_params, &[ValueType::I32, ValueType::I32][..]);
    /// ```
    pub fn new<P, R>(params: P, results: R) -> Signature
    where
        P: Into<Cow<'static, [ValueType]>>,
        R: Into<Cow<'static, [ValueType]>>,
    {
        Signature {
            params: params.into(),
            results: results.into(),
        }
    }

    /// Returns parameter types of this signature.
    pub fn params(&self) -> &[ValueType] {
        self.params.as_ref()
    }

    /// Returns result types of this signature.
    pub fn results(&self) -> &[ValueType] {
        self.results.as_ref()
    }

    /// Returns the number of results of this signature.
    pub fn arity(&self) -> usize {
        self.results.len()
    }
}
