//! Local extrema of the distance between points, curves and surfaces.

pub mod canonical;
pub mod curve_curve;
pub mod curve_surface;
pub mod point_curve;
pub mod point_surface;
pub mod surface_surface;
pub mod types;

pub use curve_curve::{curve_curve, line_line};
pub use curve_surface::curve_surface;
pub use point_curve::PointCurveExtrema;
pub use point_surface::PointSurfaceExtrema;
pub use surface_surface::surface_surface;
pub use types::*;
