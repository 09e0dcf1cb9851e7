pub mod envelope;
pub mod error;
pub mod format;

pub use envelope::*;
pub use error::*;
