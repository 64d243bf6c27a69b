pub mod brep;
pub mod primitives;
pub mod explore;
pub mod classify;
