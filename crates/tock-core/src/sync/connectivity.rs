use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::{Error, Result};

/// Source of truth for whether the network is usable
pub trait Connectivity {
    fn is_online(&self) -> bool;

    /// Fail fast with [`Error::NetworkUnavailable`] when offline
    fn ensure_online(&self) -> Result<()> {
        if self.is_online() {
            Ok(())
        } else {
            Err(Error::NetworkUnavailable)
        }
    }
}

/// Shared online/offline flag flipped by platform events
#[derive(Debug, Clone)]
pub struct ConnectivityFlag(Arc<AtomicBool>);

impl ConnectivityFlag {
    pub fn new(online: bool) -> Self {
        Self(Arc::new(AtomicBool::new(online)))
    }

    /// Record the current state; returns `true` on an offline to online transition
    pub fn set_online(&self, online: bool) -> bool {
        let was_online = self.0.swap(online, Ordering::AcqRel);
        online && !was_online
    }
}

impl Default for ConnectivityFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Connectivity for ConnectivityFlag {
    fn is_online(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Gate that never blocks; for tools that always talk to the remote
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOnline;

impl Connectivity for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}
