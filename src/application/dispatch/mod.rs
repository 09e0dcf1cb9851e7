pub mod dispatcher;
pub mod mailbox;
pub mod request;
pub mod unit;

pub use dispatcher::*;
pub use mailbox::*;
pub use request::*;
pub use unit::*;
