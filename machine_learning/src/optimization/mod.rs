mod adam;
mod optimizer;

pub use adam::Adam;
pub use optimizer::Optimizer;
