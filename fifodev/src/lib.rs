pub mod buffer;
pub mod config;
pub mod device;
pub mod errors;
pub mod mode;
mod queue;
pub mod reader;
pub mod session;
pub mod writer;

#[cfg(test)]
mod tests;

pub use buffer::{UserSink, UserSource};
pub use config::DeviceConfig;
pub use device::{Device, Handle};
pub use errors::{DeviceError, PushError, Result};
pub use mode::Mode;
pub use queue::BoundedQueue;

pub const QUEUE_SIZE: usize = queue::QUEUE_SIZE;
