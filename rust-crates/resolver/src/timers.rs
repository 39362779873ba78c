use std::future::pending;
use tokio::time::{
    Duration,
    Instant,
    sleep_until,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerSlot {
    Poll,
    SafetyNet,
    Verify,
}

/// Deadlines registered by one resolution. At most one per slot.
#[derive(Debug, Default)]
pub struct Timers {
    armed: Vec<(TimerSlot, Instant)>,
}

impl Timers {
    pub fn arm(&mut self, slot: TimerSlot, delay: Duration) {
        self.arm_at(slot, Instant::now() + delay);
    }

    pub fn arm_at(&mut self, slot: TimerSlot, deadline: Instant) {
        self.disarm(slot);
        self.armed.push((slot, deadline));
    }

    pub fn disarm(&mut self, slot: TimerSlot) -> bool {
        let before = self.armed.len();
        self.armed.retain(|(armed, _)| *armed != slot);
        self.armed.len() != before
    }

    pub fn deadline(&self, slot: TimerSlot) -> Option<Instant> {
        self.armed
            .iter()
            .find(|(armed, _)| *armed == slot)
            .map(|(_, deadline)| *deadline)
    }

    pub fn is_empty(&self) -> bool {
        self.armed.is_empty()
    }

    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.armed.len();
        self.armed.clear();
        cancelled
    }

    /// Earliest deadline. Ties go to the slot armed first.
    pub fn next(&self) -> Option<(TimerSlot, Instant)> {
        self.armed.iter().fold(None, |earliest, &(slot, deadline)| {
            match earliest {
                Some((_, current)) if current <= deadline => earliest,
                _ => Some((slot, deadline)),
            }
        })
    }
}

/// Sleeps until `next` is due. Never completes when nothing is armed.
pub async fn fire(next: Option<(TimerSlot, Instant)>) -> TimerSlot {
    match next {
        Some((slot, deadline)) => {
            sleep_until(deadline).await;
            slot
        }
        None => pending().await,
    }
}
