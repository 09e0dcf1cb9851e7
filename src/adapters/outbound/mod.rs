pub mod console_logger;
pub mod file_logger;
pub mod gcloud_cli;
pub mod multi_logger;
pub mod noop_logger;
pub mod process_runner;

pub use console_logger::*;
pub use file_logger::*;
pub use gcloud_cli::*;
pub use multi_logger::*;
pub use noop_logger::*;
pub use process_runner::*;
