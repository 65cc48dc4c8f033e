use crate::Result;

/// An optimization algorithm, it decides how the parameters move given their gradient.
pub trait Optimizer {
    /// Takes a single optimization step.
    ///
    /// # Arguments
    /// * `grad` - The gradient of the loss w.r.t. every parameter.
    /// * `params` - The parameters that are going to be modified.
    ///
    /// # Returns
    /// An error if `grad` and `params` differ in length.
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()>;
}
