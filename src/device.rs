//! Per-device tape I/O collaborator, out of scope beyond `close()`.
//! Closing the device file handle before invoking the helper is the
//! one interaction this core has with it.

pub trait TapeDevice: Send + Sync {
    fn close(&self) -> anyhow::Result<()>;
}

/// A device handle that's already closed / has nothing to close --
/// useful for virtual changers and tests that don't model real device
/// files.
pub struct NullTapeDevice;

impl TapeDevice for NullTapeDevice {
    fn close(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
