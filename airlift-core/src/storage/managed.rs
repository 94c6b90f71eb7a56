//! Thin backend over a vendor partition updater
//!
//! The vendor API does its own erasing, alignment and image verification;
//! this type only tracks progress and maps results.

use airlift_hal::ManagedUpdater;

use crate::traits::{StorageBackend, StorageError};

/// Storage backend forwarding to a host-managed updater
pub struct ManagedBackend<U: ManagedUpdater> {
    updater: U,
    bytes_written: usize,
    active: bool,
}

impl<U: ManagedUpdater> ManagedBackend<U> {
    pub fn new(updater: U) -> Self {
        Self {
            updater,
            bytes_written: 0,
            active: false,
        }
    }

    /// Get the wrapped updater
    pub fn updater(&self) -> &U {
        &self.updater
    }
}

impl<U: ManagedUpdater> StorageBackend for ManagedBackend<U> {
    fn begin(&mut self, size: usize) -> Result<(), StorageError> {
        self.bytes_written = 0;

        if self.updater.begin(size).is_err() {
            warn!("updater rejected {=usize} byte image", size);
            return Err(StorageError::Init);
        }

        self.active = true;
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> usize {
        if !self.active {
            return 0;
        }

        let written = self.updater.write(data);
        self.bytes_written += written;
        written
    }

    fn end(&mut self) -> Result<(), StorageError> {
        if !self.active {
            return Err(StorageError::Finalize);
        }

        self.active = false;
        self.updater.end(true).map_err(|_| StorageError::Finalize)
    }

    fn abort(&mut self) {
        if self.active {
            self.updater.abort();
            self.active = false;
        }
        self.bytes_written = 0;
    }

    fn apply(&mut self) -> ! {
        self.updater.restart()
    }

    /// Half of program storage: the updater needs room for two images
    fn max_size(&self) -> usize {
        self.updater.flash_size() / 2
    }

    fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn platform_name(&self) -> &'static str {
        self.updater.platform_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Call {
        Begin(usize),
        Write(usize),
        End(bool),
        Abort,
    }

    #[derive(Default)]
    struct FakeUpdater {
        calls: Vec<Call>,
        reject_begin: bool,
        reject_end: bool,
        /// Accept at most this many bytes per write
        write_limit: Option<usize>,
    }

    impl ManagedUpdater for FakeUpdater {
        type Error = ();

        fn begin(&mut self, size: usize) -> Result<(), ()> {
            self.calls.push(Call::Begin(size));
            if self.reject_begin {
                Err(())
            } else {
                Ok(())
            }
        }

        fn write(&mut self, data: &[u8]) -> usize {
            let n = self.write_limit.map_or(data.len(), |limit| data.len().min(limit));
            self.calls.push(Call::Write(n));
            n
        }

        fn end(&mut self, verify: bool) -> Result<(), ()> {
            self.calls.push(Call::End(verify));
            if self.reject_end {
                Err(())
            } else {
                Ok(())
            }
        }

        fn abort(&mut self) {
            self.calls.push(Call::Abort);
        }

        fn restart(&mut self) -> ! {
            panic!("restart");
        }

        fn flash_size(&self) -> usize {
            4 * 1024 * 1024
        }

        fn platform_name(&self) -> &'static str {
            "fake"
        }
    }

    #[test]
    fn test_max_size_is_half_of_flash() {
        let backend = ManagedBackend::new(FakeUpdater::default());
        assert_eq!(backend.max_size(), 2 * 1024 * 1024);
    }

    #[test]
    fn test_full_transfer() {
        let mut backend = ManagedBackend::new(FakeUpdater::default());
        backend.begin(10).unwrap();
        assert_eq!(backend.write(&[0; 6]), 6);
        assert_eq!(backend.write(&[0; 4]), 4);
        assert_eq!(backend.bytes_written(), 10);
        backend.end().unwrap();
        assert!(!backend.is_active());

        assert_eq!(
            backend.updater().calls,
            vec![Call::Begin(10), Call::Write(6), Call::Write(4), Call::End(true)]
        );
    }

    #[test]
    fn test_begin_rejected() {
        let mut backend = ManagedBackend::new(FakeUpdater {
            reject_begin: true,
            ..Default::default()
        });
        assert_eq!(backend.begin(10), Err(StorageError::Init));
        assert!(!backend.is_active());
        assert_eq!(backend.write(&[0; 4]), 0);
    }

    #[test]
    fn test_short_write_is_reported() {
        let mut backend = ManagedBackend::new(FakeUpdater {
            write_limit: Some(3),
            ..Default::default()
        });
        backend.begin(10).unwrap();
        assert_eq!(backend.write(&[0; 8]), 3);
        assert_eq!(backend.bytes_written(), 3);
    }

    #[test]
    fn test_end_failure() {
        let mut backend = ManagedBackend::new(FakeUpdater {
            reject_end: true,
            ..Default::default()
        });
        backend.begin(4).unwrap();
        backend.write(&[0; 4]);
        assert_eq!(backend.end(), Err(StorageError::Finalize));
        assert!(!backend.is_active());
    }

    #[test]
    fn test_end_without_begin() {
        let mut backend = ManagedBackend::new(FakeUpdater::default());
        assert_eq!(backend.end(), Err(StorageError::Finalize));
        assert!(backend.updater().calls.is_empty());
    }

    #[test]
    fn test_abort_only_reaches_updater_when_active() {
        let mut backend = ManagedBackend::new(FakeUpdater::default());
        backend.abort();
        assert!(backend.updater().calls.is_empty());

        backend.begin(4).unwrap();
        backend.abort();
        backend.abort();
        assert_eq!(
            backend.updater().calls,
            vec![Call::Begin(4), Call::Abort]
        );
        assert_eq!(backend.bytes_written(), 0);
    }
}
