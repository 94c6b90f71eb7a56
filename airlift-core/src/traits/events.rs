//! Host application callbacks

use crate::state::ErrorKind;

/// Notifications for the host application
///
/// Every method has an empty default, so implement only what you need.
/// They run inline on the transport's event path and must return quickly.
pub trait OtaEvents {
    /// An init packet was accepted
    fn on_start(&mut self, _size: u32, _crc: u32) {}

    /// Received byte count moved by at least one percentage point
    fn on_progress(&mut self, _received: u32, _expected: u32, _percent: f32) {}

    /// The image is committed; the device resets right after this returns
    fn on_complete(&mut self) {}

    /// The transfer failed
    fn on_error(&mut self, _kind: ErrorKind, _message: &'static str) {}

    /// The client cancelled the transfer
    fn on_abort(&mut self) {}
}

/// No callbacks
impl OtaEvents for () {}

impl<T: OtaEvents + ?Sized> OtaEvents for &mut T {
    fn on_start(&mut self, size: u32, crc: u32) {
        (**self).on_start(size, crc)
    }

    fn on_progress(&mut self, received: u32, expected: u32, percent: f32) {
        (**self).on_progress(received, expected, percent)
    }

    fn on_complete(&mut self) {
        (**self).on_complete()
    }

    fn on_error(&mut self, kind: ErrorKind, message: &'static str) {
        (**self).on_error(kind, message)
    }

    fn on_abort(&mut self) {
        (**self).on_abort()
    }
}
