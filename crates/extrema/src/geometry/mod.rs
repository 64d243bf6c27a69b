pub mod point;
pub mod vector;
pub mod bounding_box;
pub mod curves;
pub mod surfaces;
pub mod intersection;
