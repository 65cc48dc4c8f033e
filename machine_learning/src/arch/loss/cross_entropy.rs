use ndarray::{Array2, ArrayView2, Zip};

use super::LossFn;

/// Probabilities are clipped to `[EPSILON, 1 - EPSILON]` before taking logs.
const EPSILON: f32 = 1e-7;

/// Categorical cross-entropy between predicted class probabilities and one-hot targets.
#[derive(Default, Clone, Copy, Debug)]
pub struct CategoricalCrossEntropy;

impl CategoricalCrossEntropy {
    /// Returns a new `CategoricalCrossEntropy`.
    pub fn new() -> Self {
        Self
    }
}

impl LossFn for CategoricalCrossEntropy {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        let n = y_pred.nrows();
        if n == 0 {
            return 0.;
        }

        let total = Zip::from(&y_pred)
            .and(&y)
            .fold(0., |acc, &p, &t| acc - t * p.clamp(EPSILON, 1. - EPSILON).ln());

        total / n as f32
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        let n = y_pred.nrows().max(1) as f32;

        Zip::from(&y_pred)
            .and(&y)
            .map_collect(|&p, &t| -t / (p.clamp(EPSILON, 1. - EPSILON) * n))
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn perfect_predictions_have_near_zero_loss() {
        let y = array![[0., 1.], [1., 0.]];
        let loss = CategoricalCrossEntropy.loss(y.view(), y.view());
        assert!(loss < 1e-6);
    }

    #[test]
    fn uniform_predictions_cost_log_of_the_classes() {
        let y_pred = array![[0.25, 0.25, 0.25, 0.25]];
        let y = array![[0., 0., 1., 0.]];
        let loss = CategoricalCrossEntropy.loss(y_pred.view(), y.view());
        assert!((loss - 4f32.ln()).abs() < 1e-6);
    }

    #[test]
    fn gradient_only_flows_through_the_true_class() {
        let y_pred = array![[0.5, 0.5], [0.2, 0.8]];
        let y = array![[1., 0.], [0., 1.]];
        let d = CategoricalCrossEntropy.loss_prime(y_pred.view(), y.view());

        assert_eq!(d[[0, 1]], 0.);
        assert_eq!(d[[1, 0]], 0.);
        assert!((d[[0, 0]] + 1.).abs() < 1e-6);
        assert!((d[[1, 1]] + 1. / 1.6).abs() < 1e-6);
    }
}
