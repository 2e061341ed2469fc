use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by the UI thread and the render worker.
#[derive(Debug, Default)]
pub struct ViewStats {
    pub(crate) render_requests: AtomicU64,
    pub(crate) syncs: AtomicU64,
    pub(crate) frames_delivered: AtomicU64,
    pub(crate) frames_skipped: AtomicU64,
    pub(crate) frames_failed: AtomicU64,
    pub(crate) frames_presented: AtomicU64,
    pub(crate) target_creations: AtomicU64,
    pub(crate) target_recreations: AtomicU64,
    pub(crate) updates_posted: AtomicU64,
    pub(crate) resizes_coalesced: AtomicU64,
    pub(crate) renders_deferred: AtomicU64,
}

/// Point-in-time copy of [`ViewStats`].
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct StatsSnapshot {
    /// `Render` requests posted to the worker.
    pub render_requests: u64,
    /// Completed synchronization sub-phases, aborted renders included.
    pub syncs: u64,
    /// Frames handed to the UI thread.
    pub frames_delivered: u64,
    /// Renders whose draw was skipped because the host is about to quit.
    pub frames_skipped: u64,
    /// Renders aborted before drawing or failing while drawing.
    pub frames_failed: u64,
    /// Delivered frames the UI thread stored for painting.
    pub frames_presented: u64,
    /// Frame targets created, first one included.
    pub target_creations: u64,
    /// Frame targets destroyed and recreated because the area changed.
    pub target_recreations: u64,
    pub updates_posted: u64,
    /// Queued resizes dropped in favour of a later one.
    pub resizes_coalesced: u64,
    /// Renders postponed because the previous frame was still drawing.
    pub renders_deferred: u64,
}

impl ViewStats {
    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            render_requests: get(&self.render_requests),
            syncs: get(&self.syncs),
            frames_delivered: get(&self.frames_delivered),
            frames_skipped: get(&self.frames_skipped),
            frames_failed: get(&self.frames_failed),
            frames_presented: get(&self.frames_presented),
            target_creations: get(&self.target_creations),
            target_recreations: get(&self.target_recreations),
            updates_posted: get(&self.updates_posted),
            resizes_coalesced: get(&self.resizes_coalesced),
            renders_deferred: get(&self.renders_deferred),
        }
    }
}
