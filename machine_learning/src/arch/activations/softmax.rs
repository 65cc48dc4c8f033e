use ndarray::{ArrayView1, ArrayViewMut1};

/// Row-wise softmax, turns each row of logits into a probability distribution.
#[derive(Clone, Copy, Debug, Default)]
pub struct Softmax;

impl Softmax {
    pub fn new() -> Self {
        Self
    }

    /// Writes the softmax of `z` into `a`, shifting by the row maximum to keep `exp` finite.
    pub fn f(&self, z: ArrayView1<f32>, mut a: ArrayViewMut1<f32>) {
        let max = z.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        a.zip_mut_with(&z, |a, &z| *a = (z - max).exp());

        let sum = a.sum();
        a.mapv_inplace(|v| v / sum);
    }

    /// Multiplies `d` by the softmax jacobian in place: `d_i = a_i * (d_i - <d, a>)`.
    pub fn df(&self, a: ArrayView1<f32>, mut d: ArrayViewMut1<f32>) {
        let dot = d.dot(&a);
        d.zip_mut_with(&a, |d, &a| *d = a * (*d - dot));
    }
}
