//! Transfer session
//!
//! Turns the two inbound streams of the update service (data writes and
//! control commands) into storage operations, integrity checks and
//! notifications.
//!
//! The first data write after idle is the 9-byte init packet; every write
//! after that is raw image bytes. When the received count reaches the
//! declared size the session validates the CRC, closes the backend and
//! applies the image, which resets the device.
//!
//! ```text
//!          init ok            size reached        crc + end ok
//!  Idle ───────────▶ Receiving ───────────▶ Validating ───────────▶ Applying
//!   ▲  │                 │                      │                  (reset)
//!   │  │ apply cmd       │ any fault            │ any fault
//!   │  └─────────────────┼──────────────────────┤
//!   │                    ▼                      ▼
//!   └── abort/reset ── Error ◀──────────────────┘
//! ```
//!
//! Entry points must be called from one task at a time; the session does no
//! locking of its own.

use airlift_protocol::{ControlCommand, InitPacket, ProgressPacket, ACK_VALUE};
use embedded_hal::delay::DelayNs;

use crate::checksum::Crc32;
use crate::config::OtaConfig;
use crate::flow::FlowControl;
use crate::state::{ErrorKind, Event, State};
use crate::traits::{OtaEvents, StorageBackend, StorageError, Transport};

/// The single transfer context of a device
///
/// Created once at startup and reset in place between transfers.
pub struct Session<B, T, E, D> {
    backend: B,
    transport: T,
    events: E,
    delay: D,
    config: OtaConfig,

    state: State,
    expected_size: u32,
    received_size: u32,
    expected_crc: u32,
    crc: Crc32,
    last_notified_percent: u8,
    flow: FlowControl,
}

impl<B, T, E, D> Session<B, T, E, D>
where
    B: StorageBackend,
    T: Transport,
    E: OtaEvents,
    D: DelayNs,
{
    /// Create an idle session
    ///
    /// Nothing is notified until the first event arrives.
    pub fn new(backend: B, transport: T, events: E, delay: D, config: OtaConfig) -> Self {
        if config.flow_control_enabled() {
            info!(
                "update service on {}, ack every {=u32} chunks",
                backend.platform_name(),
                config.ack_interval
            );
        } else {
            info!("update service on {}, no flow control", backend.platform_name());
        }

        Self {
            backend,
            transport,
            events,
            delay,
            config,
            state: State::Idle,
            expected_size: 0,
            received_size: 0,
            expected_crc: 0,
            crc: Crc32::new(),
            last_notified_percent: 0,
            flow: FlowControl::new(config.ack_interval),
        }
    }

    // ------------------------------------------------------------------
    // Inbound events
    // ------------------------------------------------------------------

    /// A write arrived on the data characteristic
    pub fn handle_data(&mut self, data: &[u8]) {
        // Validating and Applying never outlive a call; Error is sticky
        if !self.state.accepts_data() {
            trace!("data ignored in {}", self.state);
            return;
        }

        if self.state == State::Idle {
            self.process_init(data);
        } else {
            self.process_chunk(data);
        }
    }

    /// A write arrived on the control characteristic
    ///
    /// Only the first byte is significant. Unknown commands are ignored.
    pub fn handle_control(&mut self, value: &[u8]) {
        let Some(&byte) = value.first() else {
            return;
        };

        match ControlCommand::from_byte(byte) {
            Some(command) => self.handle_command(command),
            None => warn!("unknown control command {=u8:#x}", byte),
        }
    }

    /// Execute a decoded control command
    pub fn handle_command(&mut self, command: ControlCommand) {
        match command {
            ControlCommand::Abort => {
                info!("abort requested");
                self.abort();
            }
            ControlCommand::Reset => {
                info!("reset requested");
                self.reset();
            }
            ControlCommand::Apply => {
                info!("apply requested");
                self.apply_staged();
            }
            ControlCommand::GetStatus => self.send_progress(),
        }
    }

    /// A client enabled notifications on the progress characteristic
    pub fn on_progress_subscribed(&mut self) {
        self.send_progress();
    }

    /// Cancel on behalf of the client: abort callback, then reset
    pub fn abort(&mut self) {
        if self.state == State::Applying {
            return;
        }
        self.events.on_abort();
        self.reset();
    }

    /// Drop any transfer in progress and return to idle
    ///
    /// Safe to call in any state, any number of times.
    pub fn reset(&mut self) {
        self.backend.abort();
        self.advance(Event::Reset);

        self.expected_size = 0;
        self.received_size = 0;
        self.expected_crc = 0;
        self.crc.reset();
        self.last_notified_percent = 0;
        self.flow.reset();

        self.send_progress();
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn state(&self) -> State {
        self.state
    }

    /// Error that put the session in `Error`, if it is there
    pub fn last_error(&self) -> Option<ErrorKind> {
        self.state.error()
    }

    pub fn expected_size(&self) -> u32 {
        self.expected_size
    }

    pub fn received_size(&self) -> u32 {
        self.received_size
    }

    pub fn expected_crc(&self) -> u32 {
        self.expected_crc
    }

    /// Finalized CRC of the bytes received so far
    pub fn running_crc(&self) -> u32 {
        self.crc.value()
    }

    pub fn chunk_count(&self) -> u32 {
        self.flow.chunk_count()
    }

    pub fn last_notified_percent(&self) -> u8 {
        self.last_notified_percent
    }

    pub fn config(&self) -> &OtaConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Direct access to the backend
    ///
    /// Lets the host stage an image outside a BLE transfer (begin, write,
    /// leave it open) and later finalize it with the apply command. The
    /// session's own counters are not touched.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    /// Progress as a fraction of the declared size, in percent
    pub fn percent(&self) -> f32 {
        if self.expected_size == 0 {
            return 0.0;
        }
        self.received_size as f32 * 100.0 / self.expected_size as f32
    }

    /// Snapshot for the progress characteristic
    pub fn progress(&self) -> ProgressPacket {
        ProgressPacket {
            state: self.state.as_u8(),
            error: self.last_error().map_or(0, ErrorKind::as_u8),
            percent: self.whole_percent(),
            bytes_received: self.received_size,
            bytes_expected: self.expected_size,
            crc: self.crc.value(),
        }
    }

    // ------------------------------------------------------------------
    // Transfer
    // ------------------------------------------------------------------

    fn process_init(&mut self, data: &[u8]) {
        let init = match InitPacket::parse(data) {
            Ok(init) => init,
            Err(_) => {
                warn!("init packet of {=usize} bytes", data.len());
                self.fail(ErrorKind::InitPacketInvalid);
                return;
            }
        };

        self.expected_size = init.firmware_size;
        self.expected_crc = init.firmware_crc;
        info!(
            "init: size={=u32} crc={=u32:#010x} flags={=u8:#x}",
            init.firmware_size,
            init.firmware_crc,
            init.flags
        );

        if !init.wants_verification() {
            info!("no crc declared, verification skipped");
        }

        if init.firmware_size == 0 {
            self.fail(ErrorKind::InitPacketInvalid);
            return;
        }

        let max_size = self.backend.max_size();
        if init.firmware_size as usize > max_size {
            warn!(
                "image too large: {=u32} > {=usize}",
                init.firmware_size,
                max_size
            );
            self.fail(ErrorKind::SizeTooLarge);
            return;
        }

        if let Err(err) = self.backend.begin(init.firmware_size as usize) {
            warn!("storage begin failed: {}", err);
            let kind = match err {
                StorageError::NotSupported => ErrorKind::NotSupported,
                _ => ErrorKind::StorageBeginFailed,
            };
            self.fail(kind);
            return;
        }

        self.received_size = 0;
        self.crc.reset();
        self.last_notified_percent = 0;
        self.flow.reset();
        self.advance(Event::InitAccepted);

        self.send_progress();
        self.events.on_start(self.expected_size, self.expected_crc);
    }

    fn process_chunk(&mut self, data: &[u8]) {
        self.crc.update(data);

        let written = self.backend.write(data);
        if written != data.len() {
            warn!("write failed: {=usize} of {=usize}", written, data.len());
            self.fail(ErrorKind::WriteFailed);
            return;
        }

        self.received_size = self.received_size.saturating_add(written as u32);
        let ack_due = self.flow.on_chunk();

        // The sender must never go past the declared size
        if self.received_size > self.expected_size {
            warn!(
                "received {=u32} of declared {=u32}",
                self.received_size,
                self.expected_size
            );
            self.fail(ErrorKind::SizeMismatch);
            return;
        }

        let percent = self.whole_percent();
        let complete = self.received_size == self.expected_size;
        if percent != self.last_notified_percent || complete {
            self.last_notified_percent = percent;
            self.send_progress();
            let exact = self.percent();
            self.events
                .on_progress(self.received_size, self.expected_size, exact);
        }

        if ack_due {
            self.send_ack();
        }

        if complete {
            self.advance(Event::ImageComplete);
            self.finalize();
        }
    }

    /// Manual apply: finalize whatever the backend already holds
    fn apply_staged(&mut self) {
        if self.state != State::Idle || self.backend.bytes_written() == 0 {
            debug!("nothing staged to apply");
            return;
        }

        self.advance(Event::ApplyRequested);
        self.finalize();
    }

    /// Validate, close and apply. Only returns on failure.
    fn finalize(&mut self) {
        self.send_progress();
        info!(
            "validating: {=u32} bytes in {=u32} chunks",
            self.received_size,
            self.flow.chunk_count()
        );

        if self.config.verify_checksum && self.expected_crc != 0 {
            let actual = self.crc.value();
            info!(
                "crc: calculated={=u32:#010x} expected={=u32:#010x}",
                actual,
                self.expected_crc
            );
            if actual != self.expected_crc {
                self.fail(ErrorKind::ChecksumMismatch);
                return;
            }
        }

        if let Err(err) = self.backend.end() {
            warn!("storage end failed: {}", err);
            self.fail(ErrorKind::FinalizeFailed);
            return;
        }

        info!("update complete, applying");
        self.advance(Event::Validated);
        self.send_progress();
        self.events.on_complete();

        // Let the final notification leave before the radio goes down
        self.delay.delay_ms(self.config.apply_grace_ms);
        self.backend.apply()
    }

    /// Record a fatal error. Every failure path converges here.
    fn fail(&mut self, kind: ErrorKind) {
        error!("update failed: {}", kind.message());
        self.advance(Event::Fault(kind));
        self.backend.abort();
        self.send_progress();
        self.events.on_error(kind, kind.message());
    }

    fn advance(&mut self, event: Event) {
        let next = self.state.transition(event);
        if next != self.state {
            trace!("{} -> {} on {}", self.state, next, event);
        }
        self.state = next;
    }

    fn whole_percent(&self) -> u8 {
        if self.expected_size == 0 {
            return 0;
        }
        let percent = u64::from(self.received_size) * 100 / u64::from(self.expected_size);
        percent.min(100) as u8
    }

    fn send_progress(&mut self) {
        let packet = self.progress();
        self.transport.notify_progress(&packet);
    }

    fn send_ack(&mut self) {
        self.transport.notify_control(ACK_VALUE);
    }
}
