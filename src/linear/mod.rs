//! One-dimensional and stacked symbologies drawn with the same raster
//! layer as Ultracode.

pub mod channel;
pub mod codablock;
pub mod upce;
