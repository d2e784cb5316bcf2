use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Delay applied to search keystrokes before they reach the store
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Delivers the last pushed value once no newer value arrived within `delay`.
///
/// Each `push` cancels the pending timer and starts a new one.
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<T>,
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            delay,
            pending: None,
            tx,
            rx,
        }
    }

    pub fn push(&mut self, value: T) {
        self.cancel();

        let tx = self.tx.clone();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(value);
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Wait for the next settled value
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// A settled value, if one is ready now
    pub fn try_next(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, timeout, Instant};

    #[tokio::test(start_paused = true)]
    async fn test_only_last_value_is_delivered() {
        let mut debouncer = Debouncer::new(SEARCH_DEBOUNCE);
        let start = Instant::now();

        debouncer.push("t");
        advance(Duration::from_millis(100)).await;
        debouncer.push("te");
        advance(Duration::from_millis(100)).await;
        debouncer.push("tech");

        assert_eq!(debouncer.next().await, Some("tech"));
        assert!(start.elapsed() >= Duration::from_millis(500));

        let more = timeout(Duration::from_secs(5), debouncer.next()).await;
        assert!(more.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_before_delay() {
        let mut debouncer = Debouncer::new(SEARCH_DEBOUNCE);
        debouncer.push(1);

        advance(Duration::from_millis(299)).await;
        tokio::task::yield_now().await;
        assert_eq!(debouncer.try_next(), None);

        advance(Duration::from_millis(1)).await;
        assert_eq!(debouncer.next().await, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_value() {
        let mut debouncer = Debouncer::new(SEARCH_DEBOUNCE);
        debouncer.push("stale");
        debouncer.cancel();

        let result = timeout(Duration::from_secs(1), debouncer.next()).await;
        assert!(result.is_err());
    }
}
