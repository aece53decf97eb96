//! Device context: the mode selector, the shared session and the
//! exclusivity gate, plus the handles handed out by [`Device::open`].
//!
//! Handles remember what they acquired at open time. Closing one drains its
//! session, releases the exclusivity gate if it holds it, and frees its
//! private session if it owns one, regardless of the mode in force at close.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{error, info, warn};
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};

use crate::buffer::{UserSink, UserSource};
use crate::config::DeviceConfig;
use crate::errors::{DeviceError, Result};
use crate::mode::{Mode, ModeController};
use crate::reader::QueueReader;
use crate::session::QueueSession;
use crate::writer::QueueWriter;

pub struct Device {
    config: Arc<DeviceConfig>,
    mode: ModeController,
    shared: Arc<QueueSession>,
    exclusive: Arc<Mutex<()>>,
    next_handle: AtomicU64,
}

impl Device {
    /// Brings the device up. The shared session exists before any `open`.
    pub fn new(config: DeviceConfig) -> Result<Device> {
        config.validate()?;
        let shared = Arc::new(QueueSession::new(config.capacity)?);
        info!(
            "{}: registered, capacity {} bytes, mode {}",
            config.name, config.capacity, config.default_mode
        );
        Ok(Device {
            mode: ModeController::new(config.default_mode),
            config: Arc::new(config),
            shared,
            exclusive: Arc::new(Mutex::new(())),
            next_handle: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn current_mode(&self) -> Mode {
        self.mode.current_mode()
    }

    /// Takes effect for subsequent opens only.
    pub fn set_mode(&self, mode: Mode) {
        let previous = self.mode.set_mode(mode);
        if previous != mode {
            info!("{}: mode set to {}", self.config.name, mode);
        }
    }

    /// Mode-set control request: `0` shared, `1` exclusive-single,
    /// `2` isolated-multi.
    pub fn control(&self, cmd: u32) -> Result<()> {
        match self.mode.set_mode_command(cmd) {
            Ok(mode) => {
                info!("{}: mode set to {}", self.config.name, mode);
                Ok(())
            }
            Err(e) => {
                warn!("{}: rejected control command {}", self.config.name, cmd);
                Err(e)
            }
        }
    }

    pub fn open(&self) -> Result<Handle> {
        let mode = self.current_mode();
        let (session, exclusive) = match mode {
            Mode::Shared => (Binding::Shared(Arc::clone(&self.shared)), None),
            Mode::ExclusiveSingle => {
                let guard = self.exclusive.try_lock_arc().ok_or_else(|| {
                    info!("{}: device is busy", self.config.name);
                    DeviceError::Busy
                })?;
                (Binding::Shared(Arc::clone(&self.shared)), Some(guard))
            }
            Mode::IsolatedMulti => {
                let private = QueueSession::new(self.config.capacity).map_err(|e| {
                    error!("{}: failed to allocate private queue", self.config.name);
                    e
                })?;
                (Binding::Private(Box::new(private)), None)
            }
        };

        let id = self.next_handle.fetch_add(1, Ordering::Relaxed);
        info!("{}: handle {} opened in mode {}", self.config.name, id, mode);
        Ok(Handle {
            id,
            mode,
            session,
            exclusive,
            config: Arc::clone(&self.config),
        })
    }

    /// Length of the shared session.
    pub fn shared_len(&self) -> usize {
        self.shared.len()
    }

    /// Tears the device down, draining the shared session.
    pub fn shutdown(self) {
        let dropped = self.shared.drain();
        info!("{}: unregistered, {} bytes discarded", self.config.name, dropped);
    }
}

enum Binding {
    Shared(Arc<QueueSession>),
    Private(Box<QueueSession>),
}

impl Binding {
    #[inline]
    fn get(&self) -> &QueueSession {
        match self {
            Binding::Shared(session) => session,
            Binding::Private(session) => session,
        }
    }
}

/// An open device handle.
///
/// Dropping a handle closes it; [`Handle::close`] makes that explicit.
pub struct Handle {
    id: u64,
    mode: Mode,
    session: Binding,
    exclusive: Option<ArcMutexGuard<RawMutex, ()>>,
    config: Arc<DeviceConfig>,
}

impl Handle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Mode in force when this handle was opened.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_private(&self) -> bool {
        matches!(self.session, Binding::Private(_))
    }

    /// Bytes currently queued in this handle's session.
    pub fn pending(&self) -> usize {
        self.session.get().len()
    }

    pub fn write<S: UserSource + ?Sized>(&self, src: &S) -> Result<usize> {
        self.writer().write(src)
    }

    pub fn read<D: UserSink + ?Sized>(&self, dst: &mut D) -> Result<usize> {
        self.reader().read(dst)
    }

    pub(crate) fn writer(&self) -> QueueWriter<'_> {
        QueueWriter::new(self.session.get(), &self.config.name, self.config.recheck_capacity)
    }

    fn reader(&self) -> QueueReader<'_> {
        QueueReader::new(self.session.get(), &self.config.name)
    }

    pub fn close(self) {
        drop(self)
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        let dropped = self.session.get().drain();
        // Release the gate only after the drain so the next exclusive owner
        // starts from an empty queue.
        self.exclusive.take();
        info!(
            "{}: handle {} closed, {} bytes discarded",
            self.config.name, self.id, dropped
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn device(capacity: usize) -> Result<Device, Box<dyn Error>> {
        Ok(Device::new(DeviceConfig::builder().capacity(capacity).build()?)?)
    }

    #[test]
    fn shared_write_then_short_read() -> Result<(), Box<dyn Error>> {
        let device = device(16)?;
        let handle = device.open()?;
        assert_eq!(handle.write(b"ab")?, 2);

        let mut buf = [0u8; 5];
        assert_eq!(handle.read(&mut buf)?, 2);
        assert_eq!(&buf[..2], b"ab");
        assert_eq!(handle.read(&mut buf)?, 0);
        Ok(())
    }

    #[test]
    fn capacity_four_rejects_fifth_byte() -> Result<(), Box<dyn Error>> {
        let device = device(4)?;
        let handle = device.open()?;
        assert_eq!(handle.write(b"1234")?, 4);
        assert_eq!(handle.write(b"5"), Err(DeviceError::Overflow));
        assert_eq!(handle.pending(), 4);
        Ok(())
    }

    #[test]
    fn close_drains_shared_session() -> Result<(), Box<dyn Error>> {
        let device = device(16)?;
        let handle = device.open()?;
        handle.write(b"left over")?;
        assert_eq!(device.shared_len(), 9);
        handle.close();
        assert_eq!(device.shared_len(), 0);
        Ok(())
    }

    #[test]
    fn control_rejects_unknown_command() -> Result<(), Box<dyn Error>> {
        let device = device(16)?;
        device.control(2)?;
        assert_eq!(device.current_mode(), Mode::IsolatedMulti);
        assert_eq!(device.control(3), Err(DeviceError::InvalidMode(3)));
        assert_eq!(device.current_mode(), Mode::IsolatedMulti);
        Ok(())
    }

    #[test]
    fn exclusive_release_ignores_later_mode_change() -> Result<(), Box<dyn Error>> {
        let device = device(16)?;
        device.set_mode(Mode::ExclusiveSingle);
        let first = device.open()?;
        device.set_mode(Mode::Shared);
        first.close();

        device.set_mode(Mode::ExclusiveSingle);
        let again = device.open()?;
        assert_eq!(again.mode(), Mode::ExclusiveSingle);
        Ok(())
    }

    #[test]
    fn rejects_invalid_config() {
        let cfg = DeviceConfig {
            capacity: 0,
            ..DeviceConfig::default()
        };
        assert!(matches!(Device::new(cfg), Err(DeviceError::InvalidConfig(_))));
    }
}
