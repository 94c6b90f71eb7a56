//! GATT identifiers for the update service

/// Primary service
pub const SERVICE_UUID: &str = "a4517317-df10-4aed-bcbd-442977fe3fe5";

/// Firmware data characteristic (write, write without response)
pub const DATA_CHARACTERISTIC_UUID: &str = "d026496c-0b77-43fb-bd68-fce361a1be1c";

/// Control characteristic (write, notify)
pub const CONTROL_CHARACTERISTIC_UUID: &str = "98f56d4d-0a27-487b-a01b-03ed15daedc7";

/// Progress characteristic (read, notify)
pub const PROGRESS_CHARACTERISTIC_UUID: &str = "094b7399-a3a0-41f3-bf8b-5d5f3170ceb0";
