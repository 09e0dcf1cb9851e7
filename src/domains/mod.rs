pub mod logger;
pub mod platform;

pub use logger::*;
pub use platform::*;
