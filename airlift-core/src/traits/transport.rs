//! Outbound transport trait
//!
//! The BLE stack owns the characteristics; the session only needs to set a
//! value and notify subscribers.

use airlift_protocol::ProgressPacket;

/// Outbound half of the update service
pub trait Transport {
    /// Set the progress characteristic and notify subscribers
    fn notify_progress(&mut self, packet: &ProgressPacket);

    /// Set the control characteristic to `value` and notify subscribers
    fn notify_control(&mut self, value: u8);
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn notify_progress(&mut self, packet: &ProgressPacket) {
        (**self).notify_progress(packet)
    }

    fn notify_control(&mut self, value: u8) {
        (**self).notify_control(value)
    }
}
