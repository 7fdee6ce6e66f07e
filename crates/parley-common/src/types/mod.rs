mod params;
mod turn;

pub use params::*;
pub use turn::*;
