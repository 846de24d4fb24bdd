use crate::nan_preserving_float::{F32, F64};
use crate::types::ValueType;
use crate::TrapKind;
use core::{f32, i32, i64, u32, u64};

/// Runtime representation of a value.
///
/// Wasm code manipulates values of the four basic value types: integers and
/// floating-point (IEEE 754-2008) data of 32 or 64 bit width each,
/// respectively.
///
/// Floats are carried as their bit pattern (see [`F32`]/[`F64`]) so that NaN
/// payloads survive reinterpret casts.
///
/// There is no distinction between signed and unsigned integer types. Instead,
/// integers are interpreted by respective operations as either unsigned or
/// signed in two's complement representation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Value {
    /// Value of 32-bit signed or unsigned integer.
    I32(i32),
    /// Value of 64-bit signed or unsigned integer.
    I64(i64),
    /// Value of 32-bit IEEE 754-2008 floating point number.
    F32(F32),
    /// Value of 64-bit IEEE 754-2008 floating point number.
    F64(F64),
}

/// Trait for creating a value from a [`Value`].
///
/// Typically each implementation can create a value from the specific type.
/// For example, values of type `bool` or `u32` are both represented by
/// [`I32`] and `f64` values are represented by [`F64`].
///
/// [`I32`]: enum.Value.html#variant.I32
/// [`F64`]: enum.Value.html#variant.F64
/// [`Value`]: enum.Value.html
pub trait FromValue
where
    Self: Sized,
{
    /// Create a value of type `Self` from a given [`Value`].
    ///
    /// Returns `None` if the [`Value`] is of type different than expected by
    /// the conversion in question.
    ///
    /// [`Value`]: enum.Value.html
    fn from_value(val: Value) -> Option<Self>;
}

/// Convert one type to another by wrapping.
pub trait WrapInto<T> {
    /// Convert one type to another by wrapping.
    fn wrap_into(self) -> T;
}

/// Convert one type to another by rounding to the nearest integer towards
/// zero, trapping when the result does not fit the target type.
pub trait TryTruncateInto<T, E> {
    /// Convert one type to another by rounding to the nearest integer towards zero.
    fn try_truncate_into(self) -> Result<T, E>;
}

/// Convert one type to another by rounding to the nearest integer towards
/// zero, saturating at the bounds of the target type. NaN becomes zero.
pub trait TruncateSaturateInto<T> {
    /// Convert one type to another by rounding to the nearest integer towards zero.
    fn truncate_saturate_into(self) -> T;
}

/// Convert one type to another by extending with leading zeroes (or sign
/// bits, for signed sources).
pub trait ExtendInto<T> {
    /// Convert one type to another by extending with leading zeroes.
    fn extend_into(self) -> T;
}

/// Reinterprets the bits of a value of one type as another type.
pub trait TransmuteInto<T> {
    /// Reinterprets the bits of a value of one type as another type.
    fn transmute_into(self) -> T;
}

/// Convert from and to little endian byte order.
pub trait LittleEndianConvert
where
    Self: Sized,
{
    /// The little endian byte buffer for this type.
    type Bytes: Default + AsRef<[u8]> + AsMut<[u8]>;

    /// Converts `self` into its little endian byte buffer.
    fn into_le_bytes(self) -> Self::Bytes;

    /// Converts a little endian byte buffer into `Self`.
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
}

/// Arithmetic operations.
pub trait ArithmeticOps<T> {
    /// Add two values.
    fn add(self, other: T) -> T;
    /// Subtract two values.
    fn sub(self, other: T) -> T;
    /// Multiply two values.
    fn mul(self, other: T) -> T;
    /// Divide two values.
    fn div(self, other: T) -> Result<T, TrapKind>;
}

/// Integer value.
pub trait Integer<T>: ArithmeticOps<T> {
    /// Counts leading zeros in the bitwise representation of the value.
    fn leading_zeros(self) -> T;
    /// Counts trailing zeros in the bitwise representation of the value.
    fn trailing_zeros(self) -> T;
    /// Counts 1-bits in the bitwise representation of the value.
    fn count_ones(self) -> T;
    /// Get left bit rotation result.
    fn rotl(self, other: T) -> T;
    /// Get right bit rotation result.
    fn rotr(self, other: T) -> T;
    /// Get division remainder.
    fn rem(self, other: T) -> Result<T, TrapKind>;
}

/// Float-point value.
pub trait Float<T>: ArithmeticOps<T> {
    /// Get absolute value.
    fn abs(self) -> T;
    /// Returns the largest integer less than or equal to a number.
    fn floor(self) -> T;
    /// Returns the smallest integer greater than or equal to a number.
    fn ceil(self) -> T;
    /// Returns the integer part of a number.
    fn trunc(self) -> T;
    /// Returns the nearest integer to a number. Round half-way cases away from 0.0.
    fn round(self) -> T;
    /// Returns the nearest integer to a number. Ties are rounded to even.
    fn nearest(self) -> T;
    /// Takes the square root of a number.
    fn sqrt(self) -> T;
    /// Returns the minimum of the two numbers.
    fn min(self, other: T) -> T;
    /// Returns the maximum of the two numbers.
    fn max(self, other: T) -> T;
    /// Sets sign of this value to the sign of other value.
    fn copysign(self, other: T) -> T;
}

impl Value {
    /// Canonical boolean truth value, as produced by tests and comparisons.
    pub const TRUE: Value = Value::I32(1);
    /// Canonical boolean false value, as produced by tests and comparisons.
    pub const FALSE: Value = Value::I32(0);

    /// Creates new default value of given type.
    pub fn default(value_type: ValueType) -> Self {
        match value_type {
            ValueType::I32 => Value::I32(0),
            ValueType::I64 => Value::I64(0),
            ValueType::F32 => Value::F32(0f32.into()),
            ValueType::F64 => Value::F64(0f64.into()),
        }
    }

    /// Creates new value by interpreting passed u32 as f32.
    pub fn decode_f32(val: u32) -> Self {
        Value::F32(F32::from_bits(val))
    }

    /// Creates new value by interpreting passed u64 as f64.
    pub fn decode_f64(val: u64) -> Self {
        Value::F64(F64::from_bits(val))
    }

    /// Get variable type for this value.
    pub fn value_type(&self) -> ValueType {
        match *self {
            Value::I32(_) => ValueType::I32,
            Value::I64(_) => ValueType::I64,
            Value::F32(_) => ValueType::F32,
            Value::F64(_) => ValueType::F64,
        }
    }

    /// Returns the value viewed as a signed 32-bit integer.
    ///
    /// The raw-view accessors reinterpret the stored bits at the requested
    /// width. A width mismatch can only be produced by a miscompiled or
    /// unvalidated instruction stream, never by well-typed Wasm.
    pub fn as_i32(&self) -> i32 {
        match *self {
            Value::I32(v) => v,
            Value::I64(v) => v as i32,
            Value::F32(v) => v.to_bits() as i32,
            Value::F64(v) => v.to_bits() as i32,
        }
    }

    /// Returns the value viewed as an unsigned 32-bit integer.
    pub fn as_u32(&self) -> u32 {
        self.as_i32() as u32
    }

    /// Returns the value viewed as a signed 64-bit integer.
    pub fn as_i64(&self) -> i64 {
        match *self {
            Value::I32(v) => v as i64,
            Value::I64(v) => v,
            Value::F32(v) => v.to_bits() as i64,
            Value::F64(v) => v.to_bits() as i64,
        }
    }

    /// Returns the value viewed as an unsigned 64-bit integer.
    pub fn as_u64(&self) -> u64 {
        self.as_i64() as u64
    }

    /// Returns the value viewed as a 32-bit float, preserving the bit pattern.
    pub fn as_f32(&self) -> F32 {
        match *self {
            Value::F32(v) => v,
            ref other => F32::from_bits(other.as_u32()),
        }
    }

    /// Returns the value viewed as a 64-bit float, preserving the bit pattern.
    pub fn as_f64(&self) -> F64 {
        match *self {
            Value::F64(v) => v,
            ref other => F64::from_bits(other.as_u64()),
        }
    }

    /// Returns the low 8 bits of the value as a signed byte.
    pub fn as_i8(&self) -> i8 {
        self.as_i32() as i8
    }

    /// Returns the low 16 bits of the value as a signed short.
    pub fn as_i16(&self) -> i16 {
        self.as_i32() as i16
    }

    /// Returns `T` if this particular [`Value`] contains an appropriate type.
    ///
    /// See [`FromValue`] for details.
    ///
    /// [`FromValue`]: trait.FromValue.html
    /// [`Value`]: enum.Value.html
    pub fn try_into<T: FromValue>(self) -> Option<T> {
        FromValue::from_value(self)
    }
}

impl From<i8> for Value {
    fn from(val: i8) -> Self {
        Value::I32(val as i32)
    }
}

impl From<i16> for Value {
    fn from(val: i16) -> Self {
        Value::I32(val as i32)
    }
}

impl From<i32> for Value {
    fn from(val: i32) -> Self {
        Value::I32(val)
    }
}

impl From<i64> for Value {
    fn from(val: i64) -> Self {
        Value::I64(val)
    }
}

impl From<u8> for Value {
    fn from(val: u8) -> Self {
        Value::I32(val as i32)
    }
}

impl From<u16> for Value {
    fn from(val: u16) -> Self {
        Value::I32(val as i32)
    }
}

impl From<u32> for Value {
    fn from(val: u32) -> Self {
        Value::I32(val as i32)
    }
}

impl From<u64> for Value {
    fn from(val: u64) -> Self {
        Value::I64(val as i64)
    }
}

impl From<F32> for Value {
    fn from(val: F32) -> Self {
        Value::F32(val)
    }
}

impl From<F64> for Value {
    fn from(val: F64) -> Self {
        Value::F64(val)
    }
}

impl From<f32> for Value {
    fn from(val: f32) -> Self {
        Value::F32(val.into())
    }
}

impl From<f64> for Value {
    fn from(val: f64) -> Self {
        Value::F64(val.into())
    }
}

impl From<bool> for Value {
    fn from(val: bool) -> Self {
        if val {
            Value::TRUE
        } else {
            Value::FALSE
        }
    }
}

macro_rules! impl_from_value {
    ($expected_rt_ty: ident, $into: ty) => {
        impl FromValue for $into {
            fn from_value(val: Value) -> Option<Self> {
                match val {
                    Value::$expected_rt_ty(val) => Some(val.transmute_into()),
                    _ => None,
                }
            }
        }
    };
}

/// This conversion assumes that boolean values are represented by [`I32`]
/// type.
///
/// [`I32`]: enum.Value.html#variant.I32
impl FromValue for bool {
    fn from_value(val: Value) -> Option<Self> {
        match val {
            Value::I32(val) => Some(val != 0),
            _ => None,
        }
    }
}

impl_from_value!(I32, i32);
impl_from_value!(I64, i64);
impl_from_value!(F32, F32);
impl_from_value!(F64, F64);
impl_from_value!(F32, f32);
impl_from_value!(F64, f64);
impl_from_value!(I32, u32);
impl_from_value!(I64, u64);

macro_rules! impl_wrap_into {
    ($from:ident, $into:ident) => {
        impl WrapInto<$into> for $from {
            #[inline]
            fn wrap_into(self) -> $into {
                self as $into
            }
        }
    };
    ($from:ident, $intermediate:ident, $into:ident) => {
        impl WrapInto<$into> for $from {
            #[inline]
            fn wrap_into(self) -> $into {
                $into::from(self as $intermediate)
            }
        }
    };
}

impl_wrap_into!(i32, i8);
impl_wrap_into!(i32, i16);
impl_wrap_into!(i64, i8);
impl_wrap_into!(i64, i16);
impl_wrap_into!(i64, i32);
impl_wrap_into!(i64, f32, F32);
impl_wrap_into!(u64, f32, F32);
impl_wrap_into!(f64, f32);

impl WrapInto<F32> for F64 {
    #[inline]
    fn wrap_into(self) -> F32 {
        (f64::from(self) as f32).into()
    }
}

macro_rules! impl_try_truncate_into {
    (@primitive $from: ident, $into: ident, $to_primitive:path) => {
        impl TryTruncateInto<$into, TrapKind> for $from {
            #[inline]
            fn try_truncate_into(self) -> Result<$into, TrapKind> {
                // Casting from a float to an integer will round the float towards zero
                if self.is_nan() {
                    return Err(TrapKind::InvalidConversionToInt);
                }
                num_rational::BigRational::from_float(self)
                    .map(|val| val.to_integer())
                    .and_then(|val| $to_primitive(&val))
                    .ok_or(TrapKind::IntegerOverflow)
            }
        }

        impl TruncateSaturateInto<$into> for $from {
            #[inline]
            fn truncate_saturate_into(self) -> $into {
                if self.is_nan() {
                    return <$into as Default>::default();
                }
                if self.is_infinite() && self.is_sign_positive() {
                    return <$into>::MAX;
                }
                if self.is_infinite() && self.is_sign_negative() {
                    return <$into>::MIN;
                }
                self as _
            }
        }
    };
    (@wrapped $from:ident, $intermediate:ident, $into:ident) => {
        impl TryTruncateInto<$into, TrapKind> for $from {
            #[inline]
            fn try_truncate_into(self) -> Result<$into, TrapKind> {
                $intermediate::from(self).try_truncate_into()
            }
        }

        impl TruncateSaturateInto<$into> for $from {
            #[inline]
            fn truncate_saturate_into(self) -> $into {
                $intermediate::from(self).truncate_saturate_into()
            }
        }
    };
}

impl_try_truncate_into!(@primitive f32, i32, num_traits::cast::ToPrimitive::to_i32);
impl_try_truncate_into!(@primitive f32, i64, num_traits::cast::ToPrimitive::to_i64);
impl_try_truncate_into!(@primitive f64, i32, num_traits::cast::ToPrimitive::to_i32);
impl_try_truncate_into!(@primitive f64, i64, num_traits::cast::ToPrimitive::to_i64);
impl_try_truncate_into!(@primitive f32, u32, num_traits::cast::ToPrimitive::to_u32);
impl_try_truncate_into!(@primitive f32, u64, num_traits::cast::ToPrimitive::to_u64);
impl_try_truncate_into!(@primitive f64, u32, num_traits::cast::ToPrimitive::to_u32);
impl_try_truncate_into!(@primitive f64, u64, num_traits::cast::ToPrimitive::to_u64);
impl_try_truncate_into!(@wrapped F32, f32, i32);
impl_try_truncate_into!(@wrapped F32, f32, i64);
impl_try_truncate_into!(@wrapped F64, f64, i32);
impl_try_truncate_into!(@wrapped F64, f64, i64);
impl_try_truncate_into!(@wrapped F32, f32, u32);
impl_try_truncate_into!(@wrapped F32, f32, u64);
impl_try_truncate_into!(@wrapped F64, f64, u32);
impl_try_truncate_into!(@wrapped F64, f64, u64);

macro_rules! impl_extend_into {
    ($from:ident, $into:ident) => {
        impl ExtendInto<$into> for $from {
            #[inline]
            fn extend_into(self) -> $into {
                self as $into
            }
        }
    };
    ($from:ident, $intermediate:ident, $into:ident) => {
        impl ExtendInto<$into> for $from {
            #[inline]
            fn extend_into(self) -> $into {
                $into::from(self as $intermediate)
            }
        }
    };
}

impl_extend_into!(i8, i32);
impl_extend_into!(u8, i32);
impl_extend_into!(i16, i32);
impl_extend_into!(u16, i32);
impl_extend_into!(i8, i64);
impl_extend_into!(u8, i64);
impl_extend_into!(i16, i64);
impl_extend_into!(u16, i64);
impl_extend_into!(i32, i64);
impl_extend_into!(u32, i64);
impl_extend_into!(u32, u64);
impl_extend_into!(i32, f32, F32);
impl_extend_into!(i32, f64, F64);
impl_extend_into!(u32, f32, F32);
impl_extend_into!(u32, f64, F64);
impl_extend_into!(i64, f64, F64);
impl_extend_into!(u64, f64, F64);

impl ExtendInto<F64> for F32 {
    #[inline]
    fn extend_into(self) -> F64 {
        (f32::from(self) as f64).into()
    }
}

macro_rules! impl_transmute_into_self {
    ($type: ident) => {
        impl TransmuteInto<$type> for $type {
            #[inline]
            fn transmute_into(self) -> $type {
                self
            }
        }
    };
}

impl_transmute_into_self!(i32);
impl_transmute_into_self!(i64);
impl_transmute_into_self!(f32);
impl_transmute_into_self!(f64);
impl_transmute_into_self!(F32);
impl_transmute_into_self!(F64);

macro_rules! impl_transmute_into_as {
    ($from: ident, $into: ident) => {
        impl TransmuteInto<$into> for $from {
            #[inline]
            fn transmute_into(self) -> $into {
                self as $into
            }
        }
    };
}

impl_transmute_into_as!(i8, u8);
impl_transmute_into_as!(i32, u32);
impl_transmute_into_as!(u32, i32);
impl_transmute_into_as!(i64, u64);
impl_transmute_into_as!(u64, i64);

macro_rules! impl_transmute_into_npf {
    ($npf:ident, $float:ident, $signed:ident, $unsigned:ident) => {
        impl TransmuteInto<$float> for $npf {
            #[inline]
            fn transmute_into(self) -> $float {
                self.into()
            }
        }

        impl TransmuteInto<$npf> for $float {
            #[inline]
            fn transmute_into(self) -> $npf {
                self.into()
            }
        }

        impl TransmuteInto<$signed> for $npf {
            #[inline]
            fn transmute_into(self) -> $signed {
                self.to_bits() as _
            }
        }

        impl TransmuteInto<$unsigned> for $npf {
            #[inline]
            fn transmute_into(self) -> $unsigned {
                self.to_bits()
            }
        }

        impl TransmuteInto<$npf> for $signed {
            #[inline]
            fn transmute_into(self) -> $npf {
                $npf::from_bits(self as _)
            }
        }

        impl TransmuteInto<$npf> for $unsigned {
            #[inline]
            fn transmute_into(self) -> $npf {
                $npf::from_bits(self)
            }
        }
    };
}

impl_transmute_into_npf!(F32, f32, i32, u32);
impl_transmute_into_npf!(F64, f64, i64, u64);

impl TransmuteInto<i32> for f32 {
    #[inline]
    fn transmute_into(self) -> i32 {
        self.to_bits() as i32
    }
}

impl TransmuteInto<i64> for f64 {
    #[inline]
    fn transmute_into(self) -> i64 {
        self.to_bits() as i64
    }
}

impl TransmuteInto<f32> for i32 {
    #[inline]
    fn transmute_into(self) -> f32 {
        f32::from_bits(self as u32)
    }
}

impl TransmuteInto<f64> for i64 {
    #[inline]
    fn transmute_into(self) -> f64 {
        f64::from_bits(self as u64)
    }
}

macro_rules! impl_little_endian_convert {
    ($( $type:ty ),*) => {
        $(
            impl LittleEndianConvert for $type {
                type Bytes = [u8; ::core::mem::size_of::<$type>()];

                #[inline]
                fn into_le_bytes(self) -> Self::Bytes {
                    self.to_le_bytes()
                }

                #[inline]
                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    Self::from_le_bytes(bytes)
                }
            }
        )*
    };
}

impl_little_endian_convert!(i8, u8, i16, u16, i32, u32, i64, u64);

macro_rules! impl_little_endian_convert_float {
    ($( $float:ident($rep:ty) ),*) => {
        $(
            impl LittleEndianConvert for $float {
                type Bytes = <$rep as LittleEndianConvert>::Bytes;

                #[inline]
                fn into_le_bytes(self) -> Self::Bytes {
                    self.to_bits().into_le_bytes()
                }

                #[inline]
                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    Self::from_bits(<$rep>::from_le_bytes(bytes))
                }
            }
        )*
    };
}

impl_little_endian_convert_float!(F32(u32), F64(u64));

impl LittleEndianConvert for f32 {
    type Bytes = [u8; 4];

    #[inline]
    fn into_le_bytes(self) -> Self::Bytes {
        self.to_bits().to_le_bytes()
    }

    #[inline]
    fn from_le_bytes(bytes: Self::Bytes) -> Self {
        Self::from_bits(u32::from_le_bytes(bytes))
    }
}

impl LittleEndianConvert for f64 {
    type Bytes = [u8; 8];

    #[inline]
    fn into_le_bytes(self) -> Self::Bytes {
        self.to_bits().to_le_bytes()
    }

    #[inline]
    fn from_le_bytes(bytes: Self::Bytes) -> Self {
        Self::from_bits(u64::from_le_bytes(bytes))
    }
}

macro_rules! impl_integer_arithmetic_ops {
    ($type: ident) => {
        impl ArithmeticOps<$type> for $type {
            #[inline]
            fn add(self, other: $type) -> $type {
                self.wrapping_add(other)
            }
            #[inline]
            fn sub(self, other: $type) -> $type {
                self.wrapping_sub(other)
            }
            #[inline]
            fn mul(self, other: $type) -> $type {
                self.wrapping_mul(other)
            }
            #[inline]
            fn div(self, other: $type) -> Result<$type, TrapKind> {
                if other == 0 {
                    Err(TrapKind::DivisionByZero)
                } else {
                    let (result, overflow) = self.overflowing_div(other);
                    if overflow {
                        Err(TrapKind::IntegerOverflow)
                    } else {
                        Ok(result)
                    }
                }
            }
        }
    };
}

impl_integer_arithmetic_ops!(i32);
impl_integer_arithmetic_ops!(u32);
impl_integer_arithmetic_ops!(i64);
impl_integer_arithmetic_ops!(u64);

macro_rules! impl_float_arithmetic_ops {
    ($type: ident) => {
        impl ArithmeticOps<$type> for $type {
            #[inline]
            fn add(self, other: $type) -> $type {
                self + other
            }
            #[inline]
            fn sub(self, other: $type) -> $type {
                self - other
            }
            #[inline]
            fn mul(self, other: $type) -> $type {
                self * other
            }
            #[inline]
            fn div(self, other: $type) -> Result<$type, TrapKind> {
                Ok(self / other)
            }
        }
    };
}

impl_float_arithmetic_ops!(f32);
impl_float_arithmetic_ops!(f64);
impl_float_arithmetic_ops!(F32);
impl_float_arithmetic_ops!(F64);

macro_rules! impl_integer {
    ($type: ident) => {
        impl Integer<$type> for $type {
            #[inline]
            fn leading_zeros(self) -> $type {
                self.leading_zeros() as $type
            }
            #[inline]
            fn trailing_zeros(self) -> $type {
                self.trailing_zeros() as $type
            }
            #[inline]
            fn count_ones(self) -> $type {
                self.count_ones() as $type
            }
            #[inline]
            fn rotl(self, other: $type) -> $type {
                self.rotate_left(other as u32)
            }
            #[inline]
            fn rotr(self, other: $type) -> $type {
                self.rotate_right(other as u32)
            }
            #[inline]
            fn rem(self, other: $type) -> Result<$type, TrapKind> {
                if other == 0 {
                    Err(TrapKind::DivisionByZero)
                } else {
                    Ok(self.wrapping_rem(other))
                }
            }
        }
    };
}

impl_integer!(i32);
impl_integer!(u32);
impl_integer!(i64);
impl_integer!(u64);

#[cfg(feature = "std")]
mod fmath {
    pub use core::primitive::{f32, f64};
}

#[cfg(not(feature = "std"))]
mod fmath {
    pub use super::libm_adapters::f32;
    pub use super::libm_adapters::f64;
}

// We cannot call the math functions directly, because they are not all
// available in `core`. In no-std cases we instead rely on `libm`.
// These wrappers handle that delegation.
macro_rules! impl_float {
    ($type:ident, $fXX:ident, $iXX:ident) => {
        // In this particular instance we want to directly compare floating point numbers.
        #[allow(clippy::float_cmp)]
        impl Float<$type> for $type {
            fn abs(self) -> $type {
                fmath::$fXX::abs($fXX::from(self)).into()
            }
            fn floor(self) -> $type {
                fmath::$fXX::floor($fXX::from(self)).into()
            }
            fn ceil(self) -> $type {
                fmath::$fXX::ceil($fXX::from(self)).into()
            }
            fn trunc(self) -> $type {
                fmath::$fXX::trunc($fXX::from(self)).into()
            }
            fn round(self) -> $type {
                fmath::$fXX::round($fXX::from(self)).into()
            }
            fn nearest(self) -> $type {
                let round = self.round();
                if fmath::$fXX::abs(fmath::$fXX::fract($fXX::from(self))) != 0.5 {
                    return round;
                }

                use core::ops::Rem;
                if round.rem(2.0) == 1.0 {
                    self.floor()
                } else if round.rem(2.0) == -1.0 {
                    self.ceil()
                } else {
                    round
                }
            }
            fn sqrt(self) -> $type {
                fmath::$fXX::sqrt($fXX::from(self)).into()
            }
            // This instruction corresponds to what is sometimes called "minNaN" in other languages.
            fn min(self, other: $type) -> $type {
                if self.is_nan() {
                    return self;
                }
                if other.is_nan() {
                    return other;
                }

                self.min(other)
            }
            // This instruction corresponds to what is sometimes called "maxNaN" in other languages.
            fn max(self, other: $type) -> $type {
                if self.is_nan() {
                    return self;
                }
                if other.is_nan() {
                    return other;
                }

                self.max(other)
            }
            // Pure bit surgery. Works uniformly for NaN sign sources, whose
            // explicit sign bit is transferred like any other.
            fn copysign(self, other: $type) -> $type {
                use core::mem::size_of;

                let sign_mask: $iXX = 1 << ((size_of::<$iXX>() << 3) - 1);
                let self_int: $iXX = self.transmute_into();
                let other_int: $iXX = other.transmute_into();
                ((self_int & !sign_mask) | (other_int & sign_mask)).transmute_into()
            }
        }
    };
}

impl_float!(f32, f32, i32);
impl_float!(f64, f64, i64);
impl_float!(F32, f32, i32);
impl_float!(F64, f64, i64);

#[cfg(not(feature = "std"))]
mod libm_adapters {
    pub mod f32 {
        pub fn abs(v: f32) -> f32 {
            libm::fabsf(v)
        }

        pub fn floor(v: f32) -> f32 {
            libm::floorf(v)
        }

        pub fn ceil(v: f32) -> f32 {
            libm::ceilf(v)
        }

        pub fn trunc(v: f32) -> f32 {
            libm::truncf(v)
        }

        pub fn round(v: f32) -> f32 {
            libm::roundf(v)
        }

        pub fn fract(v: f32) -> f32 {
            v - trunc(v)
        }

        pub fn sqrt(v: f32) -> f32 {
            libm::sqrtf(v)
        }
    }

    pub mod f64 {
        pub fn abs(v: f64) -> f64 {
            libm::fabs(v)
        }

        pub fn floor(v: f64) -> f64 {
            libm::floor(v)
        }

        pub fn ceil(v: f64) -> f64 {
            libm::ceil(v)
        }

        pub fn trunc(v: f64) -> f64 {
            libm::trunc(v)
        }

        pub fn round(v: f64) -> f64 {
            libm::round(v)
        }

        pub fn fract(v: f64) -> f64 {
            v - trunc(v)
        }

        pub fn sqrt(v: f64) -> f64 {
            libm::sqrt(v)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ArithmeticOps, Float, FromValue, Integer, TransmuteInto, TruncateSaturateInto,
        TryTruncateInto, Value,
    };
    use crate::nan_preserving_float::{F32, F64};
    use crate::types::ValueType;
    use crate::TrapKind;
    use assert_matches::assert_matches;
    use rand::Rng;

    #[test]
    fn default_values_are_zero() {
        assert_eq!(Value::default(ValueType::I32), Value::I32(0));
        assert_eq!(Value::default(ValueType::I64), Value::I64(0));
        assert_eq!(Value::default(ValueType::F32).as_u32(), 0);
        assert_eq!(Value::default(ValueType::F64).as_u64(), 0);
    }

    #[test]
    fn raw_views_follow_bits() {
        let v = Value::decode_f32(0x7fc0_0001);
        assert_eq!(v.as_u32(), 0x7fc0_0001);
        assert_eq!(Value::I32(-1).as_i8(), -1);
        assert_eq!(Value::I32(0x7fff_0102).as_i16(), 0x0102);
        assert_eq!(Value::I32(-5).as_i64(), -5);
    }

    #[test]
    fn typed_extraction_is_strict() {
        assert_eq!(Value::I32(7).try_into::<i32>(), Some(7));
        assert_eq!(Value::I64(7).try_into::<i32>(), None);
        assert_eq!(Value::I32(0).try_into::<bool>(), Some(false));
        assert_eq!(f64::from_value(Value::F32(0f32.into())), None);
    }

    #[test]
    fn signed_div_traps() {
        assert_matches!(i32::MIN.div(-1), Err(TrapKind::IntegerOverflow));
        assert_matches!(1i32.div(0), Err(TrapKind::DivisionByZero));
        assert_matches!(i64::MIN.div(-1), Err(TrapKind::IntegerOverflow));
        assert_eq!((-7i32).div(2), Ok(-3));
    }

    #[test]
    fn rem_never_overflows() {
        assert_eq!(i32::MIN.rem(-1), Ok(0));
        assert_matches!(5i64.rem(0), Err(TrapKind::DivisionByZero));
    }

    #[test]
    fn wrapping_arithmetic() {
        assert_eq!(i32::MAX.add(1), i32::MIN);
        assert_eq!(i32::MIN.sub(1), i32::MAX);
        assert_eq!(0x8000_0001u32.mul(2), 2);
    }

    #[test]
    fn truncation_distinguishes_nan_from_overflow() {
        let nan: Result<i32, _> = f32::NAN.try_truncate_into();
        assert_matches!(nan, Err(TrapKind::InvalidConversionToInt));

        let too_big: Result<i32, _> = 2147483648.0f64.try_truncate_into();
        assert_matches!(too_big, Err(TrapKind::IntegerOverflow));

        let negative_to_unsigned: Result<u32, _> = (-1.0f64).try_truncate_into();
        assert_matches!(negative_to_unsigned, Err(TrapKind::IntegerOverflow));

        // Values that truncate into range are fine even when the float itself
        // is fractionally outside of it.
        let fractional: Result<u32, _> = (-0.75f64).try_truncate_into();
        assert_eq!(fractional, Ok(0));
        let at_edge: Result<i32, _> = (-2147483648.5f64).try_truncate_into();
        assert_eq!(at_edge, Ok(i32::MIN));
    }

    #[test]
    fn saturating_truncation_never_traps() {
        assert_eq!(TruncateSaturateInto::<i32>::truncate_saturate_into(f32::NAN), 0);
        assert_eq!(
            TruncateSaturateInto::<i32>::truncate_saturate_into(f32::INFINITY),
            i32::MAX
        );
        assert_eq!(
            TruncateSaturateInto::<i32>::truncate_saturate_into(f32::NEG_INFINITY),
            i32::MIN
        );
        assert_eq!(
            TruncateSaturateInto::<u32>::truncate_saturate_into(-1.5f64),
            0
        );
        assert_eq!(
            TruncateSaturateInto::<u64>::truncate_saturate_into(1e300f64),
            u64::MAX
        );
        assert_eq!(
            TruncateSaturateInto::<i64>::truncate_saturate_into(-3.99f64),
            -3
        );
    }

    #[test]
    fn copysign_moves_only_the_sign_bit() {
        let negative_nan = F32::from_bits(0xffc0_0123);
        let result = Float::copysign(F32::from_float(1.5), negative_nan);
        assert_eq!(result.to_bits(), (1.5f32).to_bits() | 0x8000_0000);

        // A NaN magnitude keeps its payload while taking the new sign.
        let result = Float::copysign(negative_nan, F32::from_float(2.0));
        assert_eq!(result.to_bits(), 0x7fc0_0123);
    }

    #[test]
    fn copysign_of_self_is_identity() {
        let mut rng = rand::thread_rng();
        for _ in 0..1000 {
            let bits: u64 = rng.gen();
            let v = F64::from_bits(bits);
            assert_eq!(Float::copysign(v, v).to_bits(), bits);
        }
    }

    #[test]
    fn nearest_rounds_ties_to_even() {
        assert_eq!(Float::nearest(0.5f64), 0.0);
        assert_eq!(Float::nearest(1.5f64), 2.0);
        assert_eq!(Float::nearest(2.5f64), 2.0);
        assert_eq!(Float::nearest(-0.5f64), -0.0);
        assert_eq!(Float::nearest(-1.5f64), -2.0);
        assert_eq!(Float::nearest(4.2f64), 4.0);
    }

    #[test]
    fn min_max_propagate_nan() {
        assert!(Float::min(f64::NAN, 1.0).is_nan());
        assert!(Float::max(1.0f64, f64::NAN).is_nan());
        assert_eq!(Float::min(1.0f64, 2.0), 1.0);
        assert_eq!(Float::max(1.0f64, 2.0), 2.0);
    }

    #[test]
    fn reinterpret_round_trips_nan_payloads() {
        let mut rng = rand::thread_rng();
        for _ in 0..1000 {
            let bits: u32 = rng.gen();
            let float: F32 = bits.transmute_into();
            let back: u32 = float.transmute_into();
            assert_eq!(back, bits);
        }
    }

    #[test]
    fn rotates_are_modular() {
        assert_eq!(0x8000_0000u32.rotl(1), 1);
        assert_eq!(1u32.rotr(1), 0x8000_0000);
        assert_eq!(1u64.rotl(64), 1);
    }
}
