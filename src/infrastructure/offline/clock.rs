use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Millisecond clock that never repeats or goes backwards within a process.
/// Seeded from the newest persisted timestamp so restarts keep the order too.
#[derive(Debug)]
pub struct LogicalClock {
    last: AtomicI64,
}

impl LogicalClock {
    pub fn seeded(last: i64) -> Self {
        Self {
            last: AtomicI64::new(last),
        }
    }

    pub fn tick(&self) -> i64 {
        self.tick_at(Utc::now().timestamp_millis())
    }

    fn tick_at(&self, wall_ms: i64) -> i64 {
        let advance = |last: i64| wall_ms.max(last + 1);
        match self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(advance(last)))
        {
            Ok(previous) | Err(previous) => advance(previous),
        }
    }
}
