pub mod camera;
pub mod color;
pub mod graph;
pub mod picking;
pub mod point_cloud;
pub mod prefabs;

pub use camera::*;
pub use color::*;
pub use graph::*;
pub use point_cloud::*;
