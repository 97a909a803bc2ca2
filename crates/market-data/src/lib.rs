//! Concrete data collaborators for the analysis engines.

pub mod polygon;
pub mod sample;

pub use polygon::PolygonClient;
pub use sample::SampleMarketData;
