use std::borrow::Cow;

use ndarray::ArrayView2;

use crate::{MlErr, Result};

mod conv2d;
mod dense;
mod flatten;
mod layer;
mod max_pool;
mod shape;

pub use conv2d::Conv2d;
pub use dense::Dense;
pub use flatten::Flatten;
pub use layer::Layer;
pub use max_pool::MaxPool2d;
pub use shape::MapShape;

/// Fails with `MlErr::SizeMismatch` unless `got == expected`.
pub(crate) fn expect_len(what: &'static str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(MlErr::SizeMismatch {
            what,
            got,
            expected,
        });
    }

    Ok(())
}

/// Borrows the contents of `x` as a row-major slice, copying only when its layout isn't one.
pub(crate) fn row_major<'a>(x: ArrayView2<'a, f32>) -> Cow<'a, [f32]> {
    match x.to_slice() {
        Some(slice) => Cow::Borrowed(slice),
        None => Cow::Owned(x.iter().copied().collect()),
    }
}
