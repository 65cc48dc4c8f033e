use ndarray::{Array2, ArrayView2, ArrayViewMut2, Axis, Zip};

use super::{relu, softmax};

/// The activation applied on top of a layer's pre-activations.
#[derive(Clone, Copy, Debug)]
pub enum ActFn {
    Relu(relu::Relu),
    Softmax(softmax::Softmax),
}
use ActFn::*;

impl ActFn {
    pub fn relu() -> Self {
        Relu(relu::Relu::new())
    }

    pub fn softmax() -> Self {
        Softmax(softmax::Softmax::new())
    }

    /// Computes the activations for a batch of pre-activations, one example per row.
    pub fn forward(&self, z: ArrayView2<f32>) -> Array2<f32> {
        match self {
            Relu(r) => z.mapv(|z| r.f(z)),
            Softmax(s) => {
                let mut a = Array2::zeros(z.raw_dim());
                Zip::from(z.rows())
                    .and(a.rows_mut())
                    .for_each(|z, a| s.f(z, a));
                a
            }
        }
    }

    /// Turns the delta w.r.t. the activations into the delta w.r.t. the pre-activations.
    ///
    /// # Arguments
    /// * `a` - The activations computed on the forward pass.
    /// * `d` - The incoming delta, overwritten in place.
    pub fn backward(&self, a: ArrayView2<f32>, mut d: ArrayViewMut2<f32>) {
        match self {
            Relu(r) => d.zip_mut_with(&a, |d, &a| *d *= r.df(a)),
            Softmax(s) => {
                for (a, d) in a.axis_iter(Axis(0)).zip(d.axis_iter_mut(Axis(0))) {
                    s.df(a, d);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn relu_clamps_negatives() {
        let a = ActFn::relu().forward(array![[-1., 0., 2.]].view());
        assert_eq!(a, array![[0., 0., 2.]]);

        let mut d = array![[5., 5., 5.]];
        ActFn::relu().backward(a.view(), d.view_mut());
        assert_eq!(d, array![[0., 0., 5.]]);
    }

    #[test]
    fn softmax_rows_sum_to_one() {
        let a = ActFn::softmax().forward(array![[1., 2., 3.], [1000., 1000., 1000.]].view());

        for row in a.rows() {
            assert!((row.sum() - 1.).abs() < 1e-6);
        }
        assert!(a[[0, 2]] > a[[0, 1]] && a[[0, 1]] > a[[0, 0]]);
        assert!((a[[1, 0]] - 1. / 3.).abs() < 1e-6);
    }

    #[test]
    fn softmax_jacobian_of_a_uniform_delta_is_zero() {
        let a = ActFn::softmax().forward(array![[0.3, -1., 2.]].view());
        let mut d = array![[1., 1., 1.]];
        ActFn::softmax().backward(a.view(), d.view_mut());
        assert!(d.iter().all(|v| v.abs() < 1e-6));
    }
}
