use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, select, Receiver, Sender};
use parking_lot::Mutex;

/// A one-way, set-once stop flag that blocking waits can select on.
///
/// Triggering drops the only sender of an internal channel, so every
/// `select!` that includes [`StopSignal::receiver`] wakes up at once.
/// Clones share the same flag.
#[derive(Clone)]
pub struct StopSignal {
    inner: Arc<Inner>,
}

struct Inner {
    stopped: AtomicBool,
    sender: Mutex<Option<Sender<()>>>,
    receiver: Receiver<()>,
}

impl StopSignal {
    pub fn new() -> Self {
        let (sender, receiver) = bounded(0);
        Self {
            inner: Arc::new(Inner {
                stopped: AtomicBool::new(false),
                sender: Mutex::new(Some(sender)),
                receiver,
            }),
        }
    }

    /// Triggering more than once has no further effect.
    pub fn trigger(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);
        self.inner.sender.lock().take();
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Becomes ready (disconnected) once the signal is triggered. Never yields a message.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.inner.receiver
    }

    /// Sleeps for `duration` unless the signal fires first.
    ///
    /// Returns `true` if the whole duration passed without a stop.
    pub fn sleep(&self, duration: Duration) -> bool {
        select! {
            recv(self.receiver()) -> _ => false,
            default(duration) => !self.is_stopped(),
        }
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Instant;

    use super::*;

    #[test]
    fn trigger_interrupts_sleep() {
        let stop = StopSignal::new();
        let remote = stop.clone();
        let sleeper = thread::spawn(move || {
            let started = Instant::now();
            let completed = remote.sleep(Duration::from_secs(30));
            (completed, started.elapsed())
        });
        thread::sleep(Duration::from_millis(20));
        stop.trigger();
        let (completed, elapsed) = sleeper.join().unwrap();
        assert!(!completed);
        assert!(elapsed < Duration::from_secs(5));
        assert!(stop.is_stopped());
    }

    #[test]
    fn short_sleep_completes() {
        let stop = StopSignal::new();
        assert!(stop.sleep(Duration::from_millis(1)));
        stop.trigger();
        stop.trigger();
        assert!(!stop.sleep(Duration::from_millis(1)));
    }
}
