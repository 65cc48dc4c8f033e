use ndarray::{linalg, prelude::*};
use rayon::prelude::*;

use super::{MapShape, expect_len, row_major};
use crate::{Result, arch::activations::ActFn};

/// Geometry shared by the patch extraction routines.
#[derive(Clone, Copy, Debug)]
struct Geometry {
    input: MapShape,
    output: MapShape,
    kernel: usize,
}

impl Geometry {
    fn positions(&self) -> usize {
        self.output.h * self.output.w
    }

    fn patch_len(&self) -> usize {
        self.kernel * self.kernel * self.input.c
    }
}

/// A 2D convolution with stride 1 and no padding over `[h, w, c]` maps.
///
/// The forward pass unrolls every receptive field into a row (im2col) so the convolution
/// becomes a single matrix product against the `(k * k * c, filters)` kernel matrix.
/// Parameters are laid out as that kernel matrix followed by one bias per filter.
#[derive(Clone, Debug)]
pub struct Conv2d {
    geometry: Geometry,
    act_fn: Option<ActFn>,
    size: usize,

    // Forward metadata
    cols: Array2<f32>,
    a: Array2<f32>,
}

impl Conv2d {
    /// Creates a new `Conv2d` layer.
    ///
    /// # Arguments
    /// * `input` - The shape of the incoming maps.
    /// * `filters` - The amount of output channels.
    /// * `kernel` - The side of the square kernel.
    /// * `act_fn` - The activation applied on the outputs, if any.
    pub fn new(input: MapShape, filters: usize, kernel: usize, act_fn: Option<ActFn>) -> Self {
        let output = MapShape::new(
            (input.h + 1).saturating_sub(kernel),
            (input.w + 1).saturating_sub(kernel),
            filters,
        );
        let geometry = Geometry {
            input,
            output,
            kernel,
        };
        let patch_len = geometry.patch_len();

        Self {
            geometry,
            act_fn,
            size: (patch_len + 1) * filters,
            cols: Array2::zeros((0, patch_len)),
            a: Array2::zeros((0, filters)),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn input(&self) -> MapShape {
        self.geometry.input
    }

    pub fn output(&self) -> MapShape {
        self.geometry.output
    }

    /// The amount of inputs feeding each output value.
    pub fn fan_in(&self) -> usize {
        self.geometry.patch_len()
    }

    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let geo = self.geometry;
        expect_len("conv2d input", x.ncols(), geo.input.len())?;

        let n = x.nrows();
        let (positions, patch_len) = (geo.positions(), geo.patch_len());
        let src = row_major(x);

        let mut cols = vec![0.; n * positions * patch_len];
        cols.par_chunks_mut((positions * patch_len).max(1))
            .zip(src.par_chunks(geo.input.len().max(1)))
            .for_each(|(cols, x)| im2col(geo, x, cols));
        let cols = Array2::from_shape_vec((n * positions, patch_len), cols)?;

        let (w, b) = self.view_params(params)?;
        let mut z = Array2::zeros((n * positions, geo.output.c));
        linalg::general_mat_mul(1.0, &cols, &w, 0.0, &mut z);
        z += &b;

        self.cols = cols;

        let a = match &self.act_fn {
            Some(act_fn) => {
                self.a = act_fn.forward(z.view());
                self.a.clone()
            }
            None => z,
        };

        Ok(a.into_shape_with_order((n, geo.output.len()))?)
    }

    pub fn backward(&mut self, params: &[f32], grad: &mut [f32], d: Array2<f32>) -> Result<Array2<f32>> {
        let geo = self.geometry;
        let n = d.nrows();
        let (positions, patch_len) = (geo.positions(), geo.patch_len());

        expect_len("conv2d delta", d.ncols(), geo.output.len())?;
        expect_len("conv2d delta rows", n * positions, self.cols.nrows())?;

        let d = if d.is_standard_layout() {
            d
        } else {
            d.as_standard_layout().into_owned()
        };
        let mut d = d.into_shape_with_order((n * positions, geo.output.c))?;

        if let Some(act_fn) = &self.act_fn {
            act_fn.backward(self.a.view(), d.view_mut());
        }

        let (mut dw, mut db) = self.view_grad(grad)?;
        linalg::general_mat_mul(1.0, &self.cols.t(), &d, 0.0, &mut dw);
        db.assign(&d.sum_axis(Axis(0)));

        let (w, _) = self.view_params(params)?;
        let mut dcols = Array2::zeros((n * positions, patch_len));
        linalg::general_mat_mul(1.0, &d, &w.t(), 0.0, &mut dcols);

        let dcols = row_major(dcols.view());
        let mut dx = vec![0.; n * geo.input.len()];
        dx.par_chunks_mut(geo.input.len().max(1))
            .zip(dcols.par_chunks((positions * patch_len).max(1)))
            .for_each(|(dx, dcols)| col2im(geo, dcols, dx));

        Ok(Array2::from_shape_vec((n, geo.input.len()), dx)?)
    }

    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>)> {
        expect_len("conv2d gradient", grad.len(), self.size)?;

        let filters = self.geometry.output.c;
        let (dw_raw, db_raw) = grad.split_at_mut(self.size - filters);
        let dw = ArrayViewMut2::from_shape((self.geometry.patch_len(), filters), dw_raw)?;
        let db = ArrayViewMut1::from_shape(filters, db_raw)?;
        Ok((dw, db))
    }

    fn view_params<'a>(&self, params: &'a [f32]) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        expect_len("conv2d parameters", params.len(), self.size)?;

        let filters = self.geometry.output.c;
        let (w_raw, b_raw) = params.split_at(self.size - filters);
        let w = ArrayView2::from_shape((self.geometry.patch_len(), filters), w_raw)?;
        let b = ArrayView1::from_shape(filters, b_raw)?;
        Ok((w, b))
    }
}

/// Copies every receptive field of a single map into its own row of `cols`.
///
/// For a fixed kernel row the `kernel * c` values of a field are contiguous in the map, so
/// each field is copied as `kernel` runs.
fn im2col(geo: Geometry, x: &[f32], cols: &mut [f32]) {
    let run = geo.kernel * geo.input.c;
    let patch_len = geo.patch_len();

    for oy in 0..geo.output.h {
        for ox in 0..geo.output.w {
            let row = &mut cols[(oy * geo.output.w + ox) * patch_len..][..patch_len];

            for dy in 0..geo.kernel {
                let start = geo.input.offset(oy + dy, ox, 0);
                row[dy * run..(dy + 1) * run].copy_from_slice(&x[start..start + run]);
            }
        }
    }
}

/// Inverse of `im2col`: accumulates every row of `cols` back into the map it came from.
fn col2im(geo: Geometry, cols: &[f32], dx: &mut [f32]) {
    let run = geo.kernel * geo.input.c;
    let patch_len = geo.patch_len();

    for oy in 0..geo.output.h {
        for ox in 0..geo.output.w {
            let row = &cols[(oy * geo.output.w + ox) * patch_len..][..patch_len];

            for dy in 0..geo.kernel {
                let start = geo.input.offset(oy + dy, ox, 0);
                dx[start..start + run]
                    .iter_mut()
                    .zip(&row[dy * run..(dy + 1) * run])
                    .for_each(|(dx, g)| *dx += g);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn output_shape_uses_valid_padding() {
        let conv = Conv2d::new(MapShape::new(28, 28, 1), 8, 5, None);
        assert_eq!(conv.output(), MapShape::new(24, 24, 8));
        assert_eq!(conv.size(), 5 * 5 * 8 + 8);

        let conv = Conv2d::new(MapShape::new(12, 12, 8), 16, 5, None);
        assert_eq!(conv.output(), MapShape::new(8, 8, 16));
        assert_eq!(conv.size(), 5 * 5 * 8 * 16 + 16);
    }

    #[test]
    fn single_filter_sums_each_window() {
        let mut conv = Conv2d::new(MapShape::new(3, 3, 1), 1, 2, None);
        let params = [1., 1., 1., 1., 0.5];
        let x = array![[1., 2., 3., 4., 5., 6., 7., 8., 9.]];

        let y = conv.forward(&params, x.view()).unwrap();
        assert_eq!(y, array![[12.5, 16.5, 24.5, 28.5]]);
    }

    #[test]
    fn channels_map_to_their_own_filters() {
        // Two filters over a 2-channel 1x1 map, each one picks a different channel.
        let mut conv = Conv2d::new(MapShape::new(1, 1, 2), 2, 1, None);
        let params = [1., 0., 0., 1., 0., 0.];

        let y = conv.forward(&params, array![[3., 7.], [1., 2.]].view()).unwrap();
        assert_eq!(y, array![[3., 7.], [1., 2.]]);
    }

    #[test]
    fn backward_scatters_deltas_over_each_window() {
        let mut conv = Conv2d::new(MapShape::new(3, 3, 1), 1, 2, None);
        let params = [1., 1., 1., 1., 0.];
        let x = array![[1., 2., 3., 4., 5., 6., 7., 8., 9.]];
        let mut grad = [0.; 5];

        conv.forward(&params, x.view()).unwrap();
        let dx = conv
            .backward(&params, &mut grad, array![[1., 1., 1., 1.]])
            .unwrap();

        assert_eq!(dx, array![[1., 2., 1., 2., 4., 2., 1., 2., 1.]]);
        assert_eq!(grad, [12., 16., 24., 28., 4.]);
    }
}
