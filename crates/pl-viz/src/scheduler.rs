//! Frame scheduling
//!
//! Hosts drive rendering at their own cadence; this keeps the bookkeeping
//! explicit instead of hiding it in callbacks registered with the display
//! layer. At most one tick callback is pending at a time, a callback may
//! re-request itself to keep an animation running, and `stop` drops
//! whatever is pending so nothing fires afterwards.

/// Tick callback: timestamp in milliseconds plus the scheduler itself so
/// the callback can request the next tick
pub type TickCallback = Box<dyn FnMut(f64, &mut FrameScheduler)>;

/// Single-slot frame driver
#[derive(Default)]
pub struct FrameScheduler {
    active: bool,
    pending: Option<TickCallback>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow ticks to be scheduled
    pub fn start(&mut self) {
        self.active = true;
    }

    /// Stop scheduling and drop any pending tick
    pub fn stop(&mut self) {
        self.active = false;
        self.pending = None;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Schedule the next tick, replacing any previous request
    ///
    /// Ignored while stopped, so a callback racing a shutdown cannot
    /// resurrect the loop.
    pub fn request(&mut self, callback: TickCallback) {
        if self.active {
            self.pending = Some(callback);
        }
    }

    /// Run the pending tick, if any
    ///
    /// The handle is taken before the call so the callback can request
    /// its successor. Returns whether a callback ran.
    pub fn run_pending(&mut self, timestamp: f64) -> bool {
        match self.pending.take() {
            Some(mut callback) => {
                callback(timestamp, self);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("active", &self.active)
            .field("pending", &self.pending.is_some())
            .finish()
    }
}
