pub mod ports;
pub mod requests;
pub mod resources;

pub use ports::*;
pub use requests::*;
pub use resources::*;
