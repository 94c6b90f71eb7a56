//! Storage backend trait

/// Errors reported by storage backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Backend could not prepare for an image
    Init,
    /// A write was rejected
    Write,
    /// Image does not fit the staging area
    Size,
    /// Image could not be closed or verified
    Finalize,
    /// This platform has no way to store an image
    NotSupported,
}

/// Where an incoming image is staged and how it is committed
///
/// Exactly one implementation is chosen per build target. The session is
/// written against this trait only.
pub trait StorageBackend {
    /// Prepare to receive an image of `size` bytes
    fn begin(&mut self, size: usize) -> Result<(), StorageError>;

    /// Stage the next chunk
    ///
    /// Returns the number of bytes accepted; a short count is fatal to the
    /// transfer.
    fn write(&mut self, data: &[u8]) -> usize;

    /// Close the staged image
    fn end(&mut self) -> Result<(), StorageError>;

    /// Drop the staged image
    ///
    /// Must be safe to call at any time, including on an inactive backend.
    fn abort(&mut self);

    /// Commit the staged image and reset into it
    fn apply(&mut self) -> !;

    /// Largest image this backend can stage
    fn max_size(&self) -> usize;

    /// Bytes accepted since `begin`
    fn bytes_written(&self) -> usize;

    /// Whether an image is currently being staged
    fn is_active(&self) -> bool;

    /// Platform identifier for logs
    fn platform_name(&self) -> &'static str;
}

impl<T: StorageBackend + ?Sized> StorageBackend for &mut T {
    fn begin(&mut self, size: usize) -> Result<(), StorageError> {
        (**self).begin(size)
    }

    fn write(&mut self, data: &[u8]) -> usize {
        (**self).write(data)
    }

    fn end(&mut self) -> Result<(), StorageError> {
        (**self).end()
    }

    fn abort(&mut self) {
        (**self).abort()
    }

    fn apply(&mut self) -> ! {
        (**self).apply()
    }

    fn max_size(&self) -> usize {
        (**self).max_size()
    }

    fn bytes_written(&self) -> usize {
        (**self).bytes_written()
    }

    fn is_active(&self) -> bool {
        (**self).is_active()
    }

    fn platform_name(&self) -> &'static str {
        (**self).platform_name()
    }
}
