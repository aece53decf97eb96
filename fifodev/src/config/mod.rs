use serde_derive::{Deserialize, Serialize};

use crate::errors::{DeviceError, Result};
use crate::mode::Mode;
use crate::queue::QUEUE_SIZE;

pub static DEFAULT_DEVICE_NAME: &str = "fifodev";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Prefix for log lines.
    pub name: String,
    /// Maximum number of bytes a session holds.
    pub capacity: usize,
    pub default_mode: Mode,
    /// Re-validate the write size against the live queue length once the
    /// session lock is held, rejecting the whole write instead of cutting it short.
    pub recheck_capacity: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            name: DEFAULT_DEVICE_NAME.to_string(),
            capacity: QUEUE_SIZE,
            default_mode: Mode::Shared,
            recheck_capacity: false,
        }
    }
}

impl DeviceConfig {
    pub fn builder() -> DeviceConfigBuilder {
        DeviceConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(DeviceError::InvalidConfig("name must not be empty".to_string()));
        }
        if self.capacity == 0 {
            return Err(DeviceError::InvalidConfig("capacity must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[derive(Default, Debug)]
pub struct DeviceConfigBuilder {
    config: DeviceConfig,
}

impl DeviceConfigBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    pub fn default_mode(mut self, mode: Mode) -> Self {
        self.config.default_mode = mode;
        self
    }

    pub fn recheck_capacity(mut self, recheck: bool) -> Self {
        self.config.recheck_capacity = recheck;
        self
    }

    pub fn build(self) -> Result<DeviceConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
