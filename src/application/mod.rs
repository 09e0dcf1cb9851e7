pub mod dispatch;
pub mod gateway;

pub use dispatch::*;
pub use gateway::*;
