pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod feed;
pub mod router;
pub mod scheduler;
pub mod state;

#[cfg(test)]
mod test_support;

pub use config::AppConfig;
pub use context::{AppContext, Poller};
pub use error::{Error, ErrorKind, Result};
