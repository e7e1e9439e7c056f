pub mod frame;
pub mod params;
pub mod shape;

pub use frame::*;
pub use params::*;
pub use shape::*;
