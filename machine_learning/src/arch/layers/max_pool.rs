use ndarray::prelude::*;
use rayon::prelude::*;

use super::{MapShape, expect_len, row_major};
use crate::Result;

/// Max pooling over square windows of every channel of a `[h, w, c]` map.
///
/// Has no parameters, on the forward pass it records which input won each window so the
/// backward pass can route the deltas back to it.
#[derive(Clone, Debug)]
pub struct MaxPool2d {
    input: MapShape,
    output: MapShape,
    pool: usize,
    stride: usize,

    // Forward metadata
    switches: Vec<usize>,
}

impl MaxPool2d {
    /// Creates a new `MaxPool2d` layer.
    ///
    /// # Arguments
    /// * `input` - The shape of the incoming maps.
    /// * `pool` - The side of the pooling window.
    /// * `stride` - The step between windows.
    pub fn new(input: MapShape, pool: usize, stride: usize) -> Self {
        let stride = stride.max(1);
        let side = |n: usize| n.checked_sub(pool).map_or(0, |rest| rest / stride + 1);
        let output = MapShape::new(side(input.h), side(input.w), input.c);

        Self {
            input,
            output,
            pool,
            stride,
            switches: Vec::new(),
        }
    }

    pub fn input(&self) -> MapShape {
        self.input
    }

    pub fn output(&self) -> MapShape {
        self.output
    }

    pub fn forward(&mut self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        expect_len("max pool input", x.ncols(), self.input.len())?;

        let n = x.nrows();
        let (in_len, out_len) = (self.input.len(), self.output.len());
        let src = row_major(x);

        let mut out = vec![0.; n * out_len];
        let mut switches = vec![0; n * out_len];

        out.par_chunks_mut(out_len.max(1))
            .zip(switches.par_chunks_mut(out_len.max(1)))
            .zip(src.par_chunks(in_len.max(1)))
            .for_each(|((out, switches), x)| self.pool_one(x, out, switches));

        self.switches = switches;
        Ok(Array2::from_shape_vec((n, out_len), out)?)
    }

    pub fn backward(&mut self, d: Array2<f32>) -> Result<Array2<f32>> {
        let n = d.nrows();
        let (in_len, out_len) = (self.input.len(), self.output.len());

        expect_len("max pool delta", d.ncols(), out_len)?;
        expect_len("max pool delta rows", n * out_len, self.switches.len())?;

        let d = row_major(d.view());
        let mut dx = vec![0.; n * in_len];

        dx.par_chunks_mut(in_len.max(1))
            .zip(d.par_chunks(out_len.max(1)))
            .zip(self.switches.par_chunks(out_len.max(1)))
            .for_each(|((dx, d), switches)| {
                for (&g, &i) in d.iter().zip(switches) {
                    dx[i] += g;
                }
            });

        Ok(Array2::from_shape_vec((n, in_len), dx)?)
    }

    /// Pools a single map, writing the maxima and the flattened input index of each one.
    fn pool_one(&self, x: &[f32], out: &mut [f32], switches: &mut [usize]) {
        let Self {
            input,
            output,
            pool,
            stride,
            ..
        } = *self;

        for oy in 0..output.h {
            for ox in 0..output.w {
                for ch in 0..output.c {
                    let mut best = f32::NEG_INFINITY;
                    let mut best_idx = input.offset(oy * stride, ox * stride, ch);

                    for dy in 0..pool {
                        for dx in 0..pool {
                            let idx = input.offset(oy * stride + dy, ox * stride + dx, ch);
                            if x[idx] > best {
                                best = x[idx];
                                best_idx = idx;
                            }
                        }
                    }

                    let o = output.offset(oy, ox, ch);
                    out[o] = best;
                    switches[o] = best_idx;
                }
            }
        }
    }
}
