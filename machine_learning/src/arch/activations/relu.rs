/// Rectified linear unit, `max(z, 0)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Relu;

impl Relu {
    pub fn new() -> Self {
        Self
    }

    pub fn f(&self, z: f32) -> f32 {
        z.max(0.)
    }

    /// The derivative expressed through the activation itself, `a > 0` iff `z > 0`.
    pub fn df(&self, a: f32) -> f32 {
        if a > 0. { 1. } else { 0. }
    }
}
