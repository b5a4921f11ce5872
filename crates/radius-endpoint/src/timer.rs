//! Delayed one-shot callbacks

use std::sync::Arc;
use std::time::Duration;

/// Task run once by a [`Timer`]
pub type TimerTask = Box<dyn FnOnce() + Send + 'static>;

pub trait Timer: Send + Sync {
    /// Run `task` once, no earlier than `delay` from now
    fn schedule(&self, delay: Duration, task: TimerTask);
}

impl<T: Timer + ?Sized> Timer for Arc<T> {
    fn schedule(&self, delay: Duration, task: TimerTask) {
        (**self).schedule(delay, task)
    }
}

/// Timer backed by the tokio runtime; must be used from within a runtime
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

impl Timer for TokioTimer {
    fn schedule(&self, delay: Duration, task: TimerTask) {
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_tokio_timer_fires_after_delay() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        TokioTimer.schedule(
            Duration::from_millis(20),
            Box::new(move || flag.store(true, Ordering::SeqCst)),
        );

        assert!(!fired.load(Ordering::SeqCst));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(fired.load(Ordering::SeqCst));
    }
}
