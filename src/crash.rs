/// Crash-state gating.
///
/// A node simulates failure with an in-memory deadline: while `now` is
/// before the deadline every gated operation is refused. The deadline is
/// never persisted and never propagated to peers.
use crate::error::{VestaError, VestaResult};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Deadline distance used by [`CrashGate::force_crash`]: ~3 years, which is
/// effectively forever for any test run or node lifetime.
const FORCE_CRASH_SECS: u64 = 3 * 365 * 24 * 60 * 60;

/// Gate checked by every externally reachable operation except the
/// administrative force-crash/force-restore pair.
#[derive(Debug, Default)]
pub struct CrashGate {
    /// `None` means available; `Some(deadline)` refuses gated operations
    /// until the deadline passes.
    deadline: RwLock<Option<Instant>>,
}

impl CrashGate {
    /// Create a gate in the available state.
    pub fn new() -> Self {
        Self::default()
    }

    /// True while the crash deadline is active.
    pub async fn is_crashed(&self) -> bool {
        match *self.deadline.read().await {
            Some(deadline) => Instant::now() < deadline,
            None => false,
        }
    }

    /// Fail with [`VestaError::Crashed`] while the deadline is active.
    pub async fn check(&self) -> VestaResult<()> {
        if self.is_crashed().await {
            return Err(VestaError::Crashed);
        }
        Ok(())
    }

    /// Make the node unavailable for `seconds`.
    ///
    /// Crashing is itself gated: while already crashed this fails and does
    /// NOT extend the active deadline.
    pub async fn crash(&self, seconds: u64) -> VestaResult<()> {
        let mut deadline = self.deadline.write().await;

        if matches!(*deadline, Some(d) if Instant::now() < d) {
            return Err(VestaError::Crashed);
        }

        *deadline = Some(Instant::now() + Duration::from_secs(seconds));
        Ok(())
    }

    /// Make the node unavailable until restored. Never gated.
    pub async fn force_crash(&self) {
        let mut deadline = self.deadline.write().await;
        *deadline = Some(Instant::now() + Duration::from_secs(FORCE_CRASH_SECS));
    }

    /// Clear the crash deadline. Never gated.
    pub async fn force_restore(&self) {
        let mut deadline = self.deadline.write().await;
        *deadline = None;
    }
}
