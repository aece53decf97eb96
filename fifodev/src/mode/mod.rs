use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use serde_derive::{Deserialize, Serialize};

use crate::errors::{DeviceError, Result};

/// Session discipline applied to every subsequent `open`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Mode {
    /// Every handle shares one queue.
    #[default]
    Shared = 0,
    /// One handle at a time, on the shared queue.
    ExclusiveSingle = 1,
    /// Every handle gets its own private queue.
    IsolatedMulti = 2,
}

impl Mode {
    pub fn from_command(cmd: u32) -> Result<Mode> {
        match cmd {
            0 => Ok(Mode::Shared),
            1 => Ok(Mode::ExclusiveSingle),
            2 => Ok(Mode::IsolatedMulti),
            _ => Err(DeviceError::InvalidMode(cmd)),
        }
    }

    #[inline]
    pub fn command(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Shared => "shared",
            Mode::ExclusiveSingle => "exclusive-single",
            Mode::IsolatedMulti => "isolated-multi",
        };
        write!(f, "{} ({})", name, self.command())
    }
}

/// Process-wide mode selector. Stored as a single byte so concurrent opens
/// see either the old or the new mode.
#[derive(Debug)]
pub struct ModeController {
    mode: AtomicU8,
}

impl ModeController {
    pub fn new(initial: Mode) -> ModeController {
        ModeController {
            mode: AtomicU8::new(initial as u8),
        }
    }

    pub fn current_mode(&self) -> Mode {
        let raw = self.mode.load(Ordering::Acquire);
        Mode::from_command(u32::from(raw)).unwrap_or_default()
    }

    /// Replaces the mode and returns the previous one.
    pub fn set_mode(&self, mode: Mode) -> Mode {
        let previous = self.mode.swap(mode as u8, Ordering::AcqRel);
        Mode::from_command(u32::from(previous)).unwrap_or_default()
    }

    /// Applies a raw mode command (`0`, `1` or `2`).
    pub fn set_mode_command(&self, cmd: u32) -> Result<Mode> {
        let mode = Mode::from_command(cmd)?;
        self.set_mode(mode);
        Ok(mode)
    }
}

impl Default for ModeController {
    fn default() -> Self {
        ModeController::new(Mode::default())
    }
}
