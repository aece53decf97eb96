//! Caller-memory access used by the read/write loops.
//!
//! A handle never touches caller memory directly: every byte goes through
//! [`UserSource::copy_byte_from`] or [`UserSink::copy_byte_to`], either of
//! which may fail with [`DeviceError::CopyFault`] part way through a transfer.
//! Plain byte buffers implement both with bounds checking.

use crate::errors::{DeviceError, Result};

/// Caller buffer that bytes are written from.
pub trait UserSource {
    /// Number of bytes the caller asked to transfer.
    fn len(&self) -> usize;

    fn copy_byte_from(&self, offset: usize) -> Result<u8>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Caller buffer that bytes are read into.
pub trait UserSink {
    /// Maximum number of bytes the caller will accept.
    fn len(&self) -> usize;

    fn copy_byte_to(&mut self, offset: usize, byte: u8) -> Result<()>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl UserSource for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn copy_byte_from(&self, offset: usize) -> Result<u8> {
        self.get(offset).copied().ok_or(DeviceError::CopyFault)
    }
}

impl<const N: usize> UserSource for [u8; N] {
    fn len(&self) -> usize {
        N
    }

    fn copy_byte_from(&self, offset: usize) -> Result<u8> {
        self.as_slice().copy_byte_from(offset)
    }
}

impl UserSource for Vec<u8> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn copy_byte_from(&self, offset: usize) -> Result<u8> {
        self.as_slice().copy_byte_from(offset)
    }
}

impl UserSink for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn copy_byte_to(&mut self, offset: usize, byte: u8) -> Result<()> {
        let slot = self.get_mut(offset).ok_or(DeviceError::CopyFault)?;
        *slot = byte;
        Ok(())
    }
}

impl<const N: usize> UserSink for [u8; N] {
    fn len(&self) -> usize {
        N
    }

    fn copy_byte_to(&mut self, offset: usize, byte: u8) -> Result<()> {
        self.as_mut_slice().copy_byte_to(offset, byte)
    }
}

impl UserSink for Vec<u8> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn copy_byte_to(&mut self, offset: usize, byte: u8) -> Result<()> {
        self.as_mut_slice().copy_byte_to(offset, byte)
    }
}
