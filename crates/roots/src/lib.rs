//! Bracketed and Newton-type root solvers used by the extrema engine.
//!
//! Every solver reports its outcome through a [`Status`] carried in the
//! returned result; numerical trouble is never raised as an error.

pub mod bisection;
pub mod function;
pub mod newton;
pub mod roots;
pub mod solver;

pub use bisection::*;
pub use function::*;
pub use newton::*;
pub use roots::*;
pub use solver::*;
