mod truncated_normal;
mod variance_scaling;

pub use truncated_normal::TruncatedNormal;
pub use variance_scaling::variance_scaling;
