//! Host-managed update API
//!
//! Some targets ship a vendor partition updater that already handles
//! erase, alignment and image verification (ESP-IDF `esp_ota_*`, Arduino
//! `Update`). This trait describes that API at its boundary so a thin
//! backend can forward to it.

/// Vendor "begin/write/end" firmware updater
pub trait ManagedUpdater {
    /// Error type reported by the vendor API
    type Error;

    /// Prepare to receive an image of `size` bytes
    fn begin(&mut self, size: usize) -> Result<(), Self::Error>;

    /// Persist the next chunk of the image
    ///
    /// Returns the number of bytes actually accepted. Anything less than
    /// `data.len()` is a failure.
    fn write(&mut self, data: &[u8]) -> usize;

    /// Close the image, optionally verifying it
    fn end(&mut self, verify: bool) -> Result<(), Self::Error>;

    /// Discard the partially written image
    fn abort(&mut self);

    /// Restart into the newly written image
    fn restart(&mut self) -> !;

    /// Total addressable program storage in bytes
    fn flash_size(&self) -> usize;

    /// Platform identifier for logs
    fn platform_name(&self) -> &'static str;
}
