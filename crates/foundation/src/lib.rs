pub mod math;

// Foundation crate: small, well-tested geometric primitives only.
pub use math::*;
