//! State machine definition
//!
//! Session behaviour is a function of the current state and an event.
//! `Applying` has no exits: the device resets out of it.

use airlift_protocol::packet;

use super::events::Event;

/// Session states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Waiting for an init packet
    Idle,
    /// Accepting firmware chunks
    Receiving,
    /// All bytes in, checking the image
    Validating,
    /// Image committed, device about to reset
    Applying,
    /// Fault recorded; sticky until abort or reset
    Error(ErrorKind),
}

/// Fatal conditions, in wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ErrorKind {
    /// Init packet has the wrong length or a zero size
    InitPacketInvalid = 1,
    /// Declared size exceeds what the backend can stage
    SizeTooLarge = 2,
    /// Backend refused to begin
    StorageBeginFailed = 3,
    /// Backend accepted fewer bytes than offered
    WriteFailed = 4,
    /// Running CRC differs from the declared one
    ChecksumMismatch = 5,
    /// Sender went past the declared size
    SizeMismatch = 6,
    /// Backend could not close the image
    FinalizeFailed = 7,
    /// Reserved for a host-side watchdog; never raised here
    Timeout = 8,
    /// Cancelled by the client
    Aborted = 9,
    /// No storage backend for this platform
    NotSupported = 10,
}

impl ErrorKind {
    /// Wire value (0 is reserved for "no error")
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decode a wire value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(ErrorKind::InitPacketInvalid),
            2 => Some(ErrorKind::SizeTooLarge),
            3 => Some(ErrorKind::StorageBeginFailed),
            4 => Some(ErrorKind::WriteFailed),
            5 => Some(ErrorKind::ChecksumMismatch),
            6 => Some(ErrorKind::SizeMismatch),
            7 => Some(ErrorKind::FinalizeFailed),
            8 => Some(ErrorKind::Timeout),
            9 => Some(ErrorKind::Aborted),
            10 => Some(ErrorKind::NotSupported),
            _ => None,
        }
    }

    /// Human-readable description passed to the error callback
    pub fn message(self) -> &'static str {
        packet::error_name(self.as_u8())
    }
}

impl State {
    /// Wire value. 1 is reserved and never produced.
    pub fn as_u8(&self) -> u8 {
        match self {
            State::Idle => packet::STATE_IDLE,
            State::Receiving => packet::STATE_RECEIVING,
            State::Validating => packet::STATE_VALIDATING,
            State::Applying => packet::STATE_APPLYING,
            State::Error(_) => packet::STATE_ERROR,
        }
    }

    /// Error carried by this state, if any
    pub fn error(&self) -> Option<ErrorKind> {
        match self {
            State::Error(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Check if data writes are meaningful in this state
    pub fn accepts_data(&self) -> bool {
        matches!(self, State::Idle | State::Receiving)
    }

    /// Process an event and return the next state
    ///
    /// This is the core state transition logic.
    pub fn transition(self, event: Event) -> Self {
        use Event::*;
        use State::*;

        match (self, event) {
            // Nothing leaves Applying in software
            (Applying, _) => Applying,

            // Error is sticky: only abort and reset clear it
            (Error(_), Abort) | (Error(_), Reset) => Idle,
            (Error(_), _) => self,

            // Idle transitions
            (Idle, InitAccepted) => Receiving,
            (Idle, ApplyRequested) => Validating,

            // Receiving transitions
            (Receiving, ImageComplete) => Validating,

            // Validating transitions
            (Validating, Validated) => Applying,

            // Any live state
            (_, Fault(kind)) => Error(kind),
            (_, Abort) | (_, Reset) => Idle,

            // Default: stay in current state
            _ => self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let state = State::Idle
            .transition(Event::InitAccepted)
            .transition(Event::ImageComplete)
            .transition(Event::Validated);
        assert_eq!(state, State::Applying);
    }

    #[test]
    fn test_manual_apply_from_idle() {
        let validating = State::Idle.transition(Event::ApplyRequested);
        assert_eq!(validating, State::Validating);
        // Only from Idle
        assert_eq!(
            State::Receiving.transition(Event::ApplyRequested),
            State::Receiving
        );
    }

    #[test]
    fn test_fault_from_live_states() {
        for state in [State::Idle, State::Receiving, State::Validating] {
            let next = state.transition(Event::Fault(ErrorKind::WriteFailed));
            assert_eq!(next, State::Error(ErrorKind::WriteFailed));
        }
    }

    #[test]
    fn test_error_is_sticky() {
        let state = State::Error(ErrorKind::ChecksumMismatch);
        for event in [
            Event::InitAccepted,
            Event::ImageComplete,
            Event::ApplyRequested,
            Event::Validated,
            Event::Fault(ErrorKind::SizeMismatch),
        ] {
            assert_eq!(state.transition(event), state);
        }
    }

    #[test]
    fn test_abort_and_reset_clear_error() {
        let state = State::Error(ErrorKind::SizeMismatch);
        assert_eq!(state.transition(Event::Abort), State::Idle);
        assert_eq!(state.transition(Event::Reset), State::Idle);
    }

    #[test]
    fn test_abort_returns_to_idle() {
        for state in [State::Idle, State::Receiving, State::Validating] {
            assert_eq!(state.transition(Event::Abort), State::Idle);
            assert_eq!(state.transition(Event::Reset), State::Idle);
        }
    }

    #[test]
    fn test_applying_is_terminal() {
        for event in [Event::Abort, Event::Reset, Event::Fault(ErrorKind::Timeout)] {
            assert_eq!(State::Applying.transition(event), State::Applying);
        }
    }

    #[test]
    fn test_wire_values() {
        assert_eq!(State::Idle.as_u8(), 0);
        assert_eq!(State::Receiving.as_u8(), 2);
        assert_eq!(State::Validating.as_u8(), 3);
        assert_eq!(State::Applying.as_u8(), 4);
        assert_eq!(State::Error(ErrorKind::Aborted).as_u8(), 5);
        assert_eq!(ErrorKind::InitPacketInvalid.as_u8(), 1);
        assert_eq!(ErrorKind::NotSupported.as_u8(), 10);
    }

    #[test]
    fn test_error_kind_decode() {
        assert_eq!(ErrorKind::from_u8(0), None);
        assert_eq!(ErrorKind::from_u8(5), Some(ErrorKind::ChecksumMismatch));
        assert_eq!(ErrorKind::from_u8(11), None);
        assert_eq!(ErrorKind::ChecksumMismatch.message(), "CRC mismatch");
        for value in 1..=10 {
            let kind = ErrorKind::from_u8(value).unwrap();
            assert_eq!(kind.as_u8(), value);
            assert_ne!(kind.message(), "Unknown");
        }
    }
}
