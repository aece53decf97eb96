use thiserror::Error;

pub type Result<T, E = DeviceError> = std::result::Result<T, E>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Another handle holds the device in exclusive mode.
    #[error("device is busy")]
    Busy,
    #[error("out of memory")]
    OutOfMemory,
    /// The write would not fit in the queue.
    #[error("queue overflow")]
    Overflow,
    /// The caller's buffer could not be accessed at some offset.
    #[error("bad address in caller buffer")]
    CopyFault,
    #[error("invalid mode command: {0}")]
    InvalidMode(u32),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl DeviceError {
    /// Positive errno matching the error, as host glue returns it negated.
    pub fn errno(&self) -> i32 {
        match self {
            DeviceError::Busy => libc::EBUSY,
            DeviceError::OutOfMemory => libc::ENOMEM,
            DeviceError::Overflow => libc::ENOSPC,
            DeviceError::CopyFault => libc::EFAULT,
            DeviceError::InvalidMode(_) | DeviceError::InvalidConfig(_) => libc::EINVAL,
        }
    }
}

/// Failure to append a single byte to a bounded queue.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PushError {
    #[error("queue is full")]
    Full,
    #[error("queue storage allocation failed")]
    OutOfMemory,
}

impl From<PushError> for DeviceError {
    fn from(err: PushError) -> Self {
        match err {
            PushError::Full => DeviceError::Overflow,
            PushError::OutOfMemory => DeviceError::OutOfMemory,
        }
    }
}
