pub mod config;
pub mod error;
pub mod thread;
pub mod types;

pub use config::{BrowserBackend, Config};
pub use error::RecallError;
pub use thread::{Reply, Thread};
pub use types::*;
