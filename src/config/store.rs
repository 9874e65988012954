//! Storage adapter for value alternatives.
//!
//! Each alternative type of a tagged-union value has a *stored form*: the
//! type itself when it fits in [`INLINE_LIMIT`] bytes, an owning `Box`
//! otherwise. Value enums hold `<T as Store>::Repr` in their variants and
//! route every access through the adapter, so callers always see the
//! logical `T` and never the box.

/// Alternatives larger than this many bytes are stored behind a box.
pub const INLINE_LIMIT: usize = 16;

pub trait Store: Sized {
    type Repr;

    fn store(value: Self) -> Self::Repr;
    fn unstore(repr: Self::Repr) -> Self;
    fn peek(repr: &Self::Repr) -> &Self;
    fn peek_mut(repr: &mut Self::Repr) -> &mut Self;
}

macro_rules! store_inline {
    ($($ty:ty),+ $(,)?) => {$(
        const _: () = assert!(
            std::mem::size_of::<$ty>() <= $crate::config::store::INLINE_LIMIT,
            "inline alternative exceeds the storage threshold",
        );

        impl $crate::config::store::Store for $ty {
            type Repr = $ty;

            fn store(value: Self) -> Self {
                value
            }

            fn unstore(repr: Self) -> Self {
                repr
            }

            fn peek(repr: &Self) -> &Self {
                repr
            }

            fn peek_mut(repr: &mut Self) -> &mut Self {
                repr
            }
        }
    )+};
}

macro_rules! store_boxed {
    ($($ty:ty),+ $(,)?) => {$(
        const _: () = assert!(
            std::mem::size_of::<$ty>() > $crate::config::store::INLINE_LIMIT,
            "boxed alternative fits inline",
        );

        impl $crate::config::store::Store for $ty {
            type Repr = Box<$ty>;

            fn store(value: Self) -> Box<Self> {
                Box::new(value)
            }

            fn unstore(repr: Box<Self>) -> Self {
                *repr
            }

            fn peek(repr: &Box<Self>) -> &Self {
                repr
            }

            fn peek_mut(repr: &mut Box<Self>) -> &mut Self {
                repr
            }
        }
    )+};
}

pub(crate) use store_boxed;
pub(crate) use store_inline;

store_inline!(bool, i64, f64);
store_boxed!(String);
