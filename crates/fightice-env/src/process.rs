//! Shared ownership of the launched game process
//!
//! One process can back two sessions (a two-player match driven by two
//! supervisors). The slot is cloned into each session; the process dies
//! when the last clone is released, or explicitly when the owner session
//! replaces it on a forced restart.

use std::sync::{Arc, Mutex};

use fightice_bridge::GameProcess;
use tracing::debug;

/// Refcounted slot holding the game process for one or two sessions.
#[derive(Clone)]
pub struct SharedGameProcess {
    inner: Arc<ProcessSlot>,
}

struct ProcessSlot {
    port: u16,
    process: Mutex<Option<GameProcess>>,
}

impl SharedGameProcess {
    /// An empty slot bound to a gateway port; filled on first launch.
    pub fn new(port: u16) -> Self {
        Self {
            inner: Arc::new(ProcessSlot {
                port,
                process: Mutex::new(None),
            }),
        }
    }

    /// The gateway port every sharing session connects to
    pub fn port(&self) -> u16 {
        self.inner.port
    }

    /// Install a freshly spawned process. Any previous occupant is killed
    /// as it is replaced.
    pub fn install(&self, process: GameProcess) {
        let mut slot = self.lock();
        if slot.is_some() {
            debug!("replacing game process in shared slot");
        }
        *slot = Some(process);
    }

    /// Best-effort kill of the current occupant; idempotent.
    pub fn kill(&self) {
        self.lock().take();
    }

    /// Whether a process currently occupies the slot
    pub fn is_attached(&self) -> bool {
        self.lock().is_some()
    }

    /// How many sessions currently share this slot
    pub fn sessions(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<GameProcess>> {
        self.inner.process.lock().unwrap_or_else(|e| e.into_inner())
    }
}
