use ndarray::prelude::*;

use super::{MapShape, expect_len};
use crate::Result;

/// Turns `[h, w, c]` maps into plain feature vectors.
///
/// Maps are already stored flattened row-major, so this only checks sizes and keeps the
/// shape around for the model summary.
#[derive(Clone, Debug)]
pub struct Flatten {
    input: MapShape,
}

impl Flatten {
    pub fn new(input: MapShape) -> Self {
        Self { input }
    }

    pub fn input(&self) -> MapShape {
        self.input
    }

    pub fn forward(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        expect_len("flatten input", x.ncols(), self.input.len())?;
        Ok(x.to_owned())
    }

    pub fn backward(&self, d: Array2<f32>) -> Result<Array2<f32>> {
        expect_len("flatten delta", d.ncols(), self.input.len())?;
        Ok(d)
    }
}
