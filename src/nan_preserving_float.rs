//! Floating point types that hold their IEEE 754 bit pattern.
//!
//! Wasm requires NaN payloads to survive reinterpret casts and value moves,
//! so the engine never stores floats as native `f32`/`f64` (which the
//! platform may silently canonicalize). The wrappers below convert to the
//! native type only for the duration of an arithmetic operation.

use core::{
    cmp::{Ordering, PartialEq, PartialOrd},
    ops::{Add, Div, Mul, Neg, Rem, Sub},
};
use num_traits::float::FloatCore;

macro_rules! impl_binop {
    ($for:ty, $is:ty, $op:ident, $func_name:ident) => {
        impl<T: Into<$for>> $op<T> for $for {
            type Output = Self;

            #[inline]
            fn $func_name(self, other: T) -> Self {
                Self(
                    $op::$func_name(<$is>::from_bits(self.0), <$is>::from_bits(other.into().0))
                        .to_bits(),
                )
            }
        }
    };
}

macro_rules! float {
    (
        $( #[$docs:meta] )*
        struct $for:ident($rep:ty as $is:ty);
    ) => {
        $(#[$docs])*
        #[derive(Copy, Clone)]
        pub struct $for($rep);

        impl_binop!($for, $is, Add, add);
        impl_binop!($for, $is, Sub, sub);
        impl_binop!($for, $is, Mul, mul);
        impl_binop!($for, $is, Div, div);
        impl_binop!($for, $is, Rem, rem);

        impl $for {
            const SIGN_BIT: $rep = 1 << (::core::mem::size_of::<$is>() * 8 - 1);

            /// Creates a float from its underlying bit representation.
            #[inline]
            pub fn from_bits(other: $rep) -> Self {
                $for(other)
            }

            /// Returns the underlying bit representation.
            #[inline]
            pub fn to_bits(self) -> $rep {
                self.0
            }

            /// Creates a wrapped float from a native one.
            #[inline]
            pub fn from_float(fl: $is) -> Self {
                fl.into()
            }

            /// Returns the value as a native float.
            #[inline]
            pub fn to_float(self) -> $is {
                self.into()
            }

            /// Whether the value is a NaN of any payload.
            #[inline]
            pub fn is_nan(self) -> bool {
                self.to_float().is_nan()
            }

            /// Absolute value, by clearing the sign bit.
            #[must_use]
            #[inline]
            pub fn abs(self) -> Self {
                $for(self.0 & !Self::SIGN_BIT)
            }

            /// Fractional part of the value.
            #[must_use]
            #[inline]
            pub fn fract(self) -> Self {
                FloatCore::fract(self.to_float()).into()
            }

            /// IEEE minimum of the two values.
            #[must_use]
            #[inline]
            pub fn min(self, other: Self) -> Self {
                Self::from(self.to_float().min(other.to_float()))
            }

            /// IEEE maximum of the two values.
            #[must_use]
            #[inline]
            pub fn max(self, other: Self) -> Self {
                Self::from(self.to_float().max(other.to_float()))
            }
        }

        impl From<$is> for $for {
            #[inline]
            fn from(other: $is) -> $for {
                $for(other.to_bits())
            }
        }

        impl From<$for> for $is {
            #[inline]
            fn from(other: $for) -> $is {
                <$is>::from_bits(other.0)
            }
        }

        impl Neg for $for {
            type Output = Self;

            #[inline]
            fn neg(self) -> Self {
                $for(self.0 ^ Self::SIGN_BIT)
            }
        }

        // Comparisons go through the native float so that NaN is unordered
        // and `-0.0 == 0.0` holds, as Wasm comparisons require.
        impl<T: Into<$for> + Copy> PartialEq<T> for $for {
            #[inline]
            fn eq(&self, other: &T) -> bool {
                <$is>::from(*self) == <$is>::from((*other).into())
            }
        }

        impl<T: Into<$for> + Copy> PartialOrd<T> for $for {
            #[inline]
            fn partial_cmp(&self, other: &T) -> Option<Ordering> {
                <$is>::from(*self).partial_cmp(&<$is>::from((*other).into()))
            }
        }

        impl ::core::fmt::Debug for $for {
            fn fmt(&self, f: &mut ::core::fmt::Formatter) -> ::core::fmt::Result {
                <$is>::from(*self).fmt(f)
            }
        }
    };
}

float! {
    /// A NaN preserving `f32` type.
    struct F32(u32 as f32);
}

float! {
    /// A NaN preserving `f64` type.
    struct F64(u64 as f64);
}

impl From<u32> for F32 {
    #[inline]
    fn from(other: u32) -> Self {
        Self::from_bits(other)
    }
}

impl From<F32> for u32 {
    #[inline]
    fn from(other: F32) -> Self {
        other.to_bits()
    }
}

impl From<u64> for F64 {
    #[inline]
    fn from(other: u64) -> Self {
        Self::from_bits(other)
    }
}

impl From<F64> for u64 {
    #[inline]
    fn from(other: F64) -> Self {
        other.to_bits()
    }
}

#[cfg(test)]
mod tests {
    use super::{F32, F64};

    use core::{
        fmt::Debug,
        iter,
        ops::{Add, Div, Mul, Neg, Sub},
    };
    use rand::Rng;

    fn arith_matches_native<T, F, I>(iter: I)
    where
        T: Add<Output = T>
            + Div<Output = T>
            + Mul<Output = T>
            + Sub<Output = T>
            + Neg<Output = T>
            + Copy
            + Debug
            + PartialEq,
        F: Into<T>
            + Add<Output = F>
            + Div<Output = F>
            + Mul<Output = F>
            + Sub<Output = F>
            + Neg<Output = F>
            + Copy
            + Debug,
        I: IntoIterator<Item = (F, F)>,
    {
        for (a, b) in iter {
            assert_eq!((a + b).into(), a.into() + b.into());
            assert_eq!((a - b).into(), a.into() - b.into());
            assert_eq!((a * b).into(), a.into() * b.into());
            assert_eq!((a / b).into(), a.into() / b.into());
            assert_eq!((-a).into(), -a.into());
            assert_eq!((-b).into(), -b.into());
        }
    }

    #[test]
    fn f32_arith_matches_native() {
        let mut rng = rand::thread_rng();
        let iter = iter::repeat(()).map(|_| rng.gen());

        arith_matches_native::<F32, f32, _>(iter.take(1000));
    }

    #[test]
    fn f64_arith_matches_native() {
        let mut rng = rand::thread_rng();
        let iter = iter::repeat(()).map(|_| rng.gen());

        arith_matches_native::<F64, f64, _>(iter.take(1000));
    }

    #[test]
    fn neg_keeps_nan_payload_f32() {
        assert_eq!((-F32::from_bits(0xff80_3210)).to_bits(), 0x7f80_3210);
    }

    #[test]
    fn neg_keeps_nan_payload_f64() {
        assert_eq!(
            (-F64::from_bits(0xff80_3210_0000_0000)).to_bits(),
            0x7f80_3210_0000_0000
        );
    }

    #[test]
    fn abs_clears_sign_only() {
        assert_eq!(F32::from_bits(0xffc0_0001).abs().to_bits(), 0x7fc0_0001);
        assert_eq!(F32::from_float(-0.0).abs().to_bits(), 0);
    }

    #[test]
    fn nan_is_unordered() {
        let nan = F64::from_float(f64::NAN);
        assert!(nan != nan);
        assert!(!(nan < nan) && !(nan > nan));
    }
}
