use ndarray::{linalg, prelude::*};

use super::expect_len;
use crate::{Result, arch::activations::ActFn};

/// A fully connected layer, `a = act_fn(x * w + b)`.
///
/// Its parameters are laid out as the `(n, m)` weight matrix followed by the `m` biases.
#[derive(Clone, Debug)]
pub struct Dense {
    dim: (usize, usize),
    act_fn: Option<ActFn>,
    size: usize,

    // Forward metadata
    x: Array2<f32>,
    a: Array2<f32>,
}

impl Dense {
    /// Creates a new `Dense` layer.
    ///
    /// # Arguments
    /// * `dim` - The amount of inputs and outputs.
    /// * `act_fn` - The activation applied on the outputs, if any.
    pub fn new(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        Self {
            dim,
            size: (dim.0 + 1) * dim.1,
            act_fn,
            x: Array2::zeros((0, dim.0)),
            a: Array2::zeros((0, dim.1)),
        }
    }

    /// Returns the size of this layer.
    ///
    /// # Returns
    /// The amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        expect_len("dense input", x.ncols(), self.dim.0)?;
        let (w, b) = self.view_params(params)?;

        let mut z = Array2::zeros((x.nrows(), self.dim.1));
        linalg::general_mat_mul(1.0, &x, &w, 0.0, &mut z);
        z += &b;

        self.x = x.to_owned();

        let Some(act_fn) = &self.act_fn else {
            return Ok(z);
        };

        self.a = act_fn.forward(z.view());
        Ok(self.a.clone())
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        mut d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        expect_len("dense delta rows", d.nrows(), self.x.nrows())?;
        expect_len("dense delta", d.ncols(), self.dim.1)?;

        if let Some(act_fn) = &self.act_fn {
            act_fn.backward(self.a.view(), d.view_mut());
        }

        let (mut dw, mut db) = self.view_grad(grad)?;
        linalg::general_mat_mul(1.0, &self.x.t(), &d, 0.0, &mut dw);
        db.assign(&d.sum_axis(Axis(0)));

        let (w, _) = self.view_params(params)?;
        let mut dx = Array2::zeros((d.nrows(), self.dim.0));
        linalg::general_mat_mul(1.0, &d, &w.t(), 0.0, &mut dx);

        Ok(dx)
    }

    /// Gives a view of the raw gradient slice as the delta weights and delta biases of this layer.
    ///
    /// # Arguments
    /// * `grad` - A gradient slice.
    ///
    /// # Returns
    /// A tuple containing the delta weights and delta biases.
    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>)> {
        expect_len("dense gradient", grad.len(), self.size)?;

        let w_size = self.size - self.dim.1;
        let (dw_raw, db_raw) = grad.split_at_mut(w_size);
        let dw = ArrayViewMut2::from_shape(self.dim, dw_raw)?;
        let db = ArrayViewMut1::from_shape(self.dim.1, db_raw)?;
        Ok((dw, db))
    }

    /// Gives a view of the raw parameter slice as the weights and biases of this layer.
    ///
    /// # Arguments
    /// * `params` - A slice of parameters.
    ///
    /// # Returns
    /// A tuple containing the weights and biases.
    fn view_params<'a>(&self, params: &'a [f32]) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        expect_len("dense parameters", params.len(), self.size)?;

        let w_size = self.size - self.dim.1;
        let weights = ArrayView2::from_shape(self.dim, &params[..w_size])?;
        let biases = ArrayView1::from_shape(self.dim.1, &params[w_size..])?;
        Ok((weights, biases))
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn forward_is_an_affine_map() {
        let mut dense = Dense::new((2, 3), None);
        let params = [
            1., 0., -1., //
            2., 1., 0., //
            0.5, 0.5, 0.5,
        ];

        let y = dense.forward(&params, array![[1., 1.], [0., 2.]].view()).unwrap();
        assert_eq!(y, array![[3.5, 1.5, -0.5], [4.5, 2.5, 0.5]]);
    }

    #[test]
    fn backward_fills_the_whole_gradient() {
        let mut dense = Dense::new((2, 1), None);
        let params = [2., 3., 1.];
        let mut grad = [0.; 3];

        dense.forward(&params, array![[1., 2.]].view()).unwrap();
        let dx = dense.backward(&params, &mut grad, array![[1.]]).unwrap();

        assert_eq!(grad, [1., 2., 1.]);
        assert_eq!(dx, array![[2., 3.]]);
    }

    #[test]
    fn wrong_parameter_count_is_an_error() {
        let mut dense = Dense::new((2, 2), None);
        assert!(dense.forward(&[0.; 5], array![[1., 1.]].view()).is_err());
        assert!(dense.forward(&[0.; 6], array![[1., 1., 1.]].view()).is_err());
    }
}
