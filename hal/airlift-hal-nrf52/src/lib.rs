//! nRF52 support for the Airlift update service
//!
//! Provides the NVMC-backed [`NvmController`](airlift_hal::NvmController)
//! and wires it into a ready-to-use session type:
//!
//! ```ignore
//! let p = embassy_nrf::init(Default::default());
//! let nvmc = Nvmc::new(p.NVMC, BOOTLOADER_RESERVED);
//! let mut session = session(nvmc, transport, events, OtaConfig::default());
//!
//! // from the BLE write handlers
//! session.handle_data(data);
//! session.handle_control(value);
//! ```

#![no_std]

pub mod flash;

use airlift_core::storage::RawFlashBackend;
use airlift_core::{OtaConfig, OtaEvents, Session, Transport};
use embassy_time::Delay;

// Linker script providing `__vector_table`, the application start
use cortex_m_rt as _;

pub use flash::{Nvmc, BOOTLOADER_RESERVED};

/// Raw flash staging on the internal NVMC
pub type Backend<'d> = RawFlashBackend<Nvmc<'d>>;

/// Session running on the internal flash
pub type NrfSession<'d, T, E> = Session<Backend<'d>, T, E, Delay>;

/// Build a session that stages into the upper half of internal flash
pub fn session<'d, T, E>(nvmc: Nvmc<'d>, transport: T, events: E, config: OtaConfig) -> NrfSession<'d, T, E>
where
    T: Transport,
    E: OtaEvents,
{
    Session::new(RawFlashBackend::new(nvmc), transport, events, Delay, config)
}
