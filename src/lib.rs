pub mod collector;
pub mod config;
pub mod error;
pub mod monitor;
pub mod notifier;
pub mod provider;
pub mod provisioner;
pub mod scheduler;
pub mod storage;
pub mod summary;
pub mod util;

#[cfg(test)]
mod test_utils;

pub use error::{ErrorKind, MonitorError, MonitorResult};
pub use monitor::Monitor;
