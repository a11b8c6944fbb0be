pub mod config;
pub mod connections;
pub mod error;
pub mod field;
pub mod pipeline;
pub mod spatial;

pub use config::color::Rgb;
pub use config::parameters::{GalaxyParameters, ResourceLimits};
pub use connections::builder::{Connection, ConnectionGraphBuilder, Execution, LineSegments};
pub use error::GalaxyError;
pub use field::generator::{PointField, PointFieldGenerator};
pub use pipeline::pipeline::{
    generate_galaxy, generate_galaxy_with, GalaxyGeometry, GalaxyScene, GeometryStats,
};
pub use spatial::spatial_hash::{CellKey, SpatialHashGrid};
