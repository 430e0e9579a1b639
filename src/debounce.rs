//! Trailing-edge debounce over a channel.
//!
//! Values sent through a [`DebounceSender`] are coalesced: [`Debounced::next`]
//! yields only the latest value once no newer one has arrived for the delay.
//!
//! ```
//! use std::time::Duration;
//! use qrgen::debounce::debounce;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_time().start_paused(true).build().unwrap().block_on(async {
//! let (tx, mut rx) = debounce(Duration::from_millis(120));
//! tx.send(1);
//! tx.send(2);
//! tx.send(3);
//! assert_eq!(rx.next().await, Some(3));
//! # });
//! ```

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

/// Quiet period used by the live preview.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(120);

/// Creates a debounced channel.
pub fn debounce<T>(delay: Duration) -> (DebounceSender<T>, Debounced<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (DebounceSender { tx }, Debounced { rx, delay })
}

/// Sending half of a debounced channel.
#[derive(Debug)]
pub struct DebounceSender<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for DebounceSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> DebounceSender<T> {
    /// Queues a value. Returns false if the receiver is gone.
    pub fn send(&self, value: T) -> bool {
        self.tx.send(value).is_ok()
    }
}

/// Receiving half of a debounced channel.
#[derive(Debug)]
pub struct Debounced<T> {
    rx: mpsc::UnboundedReceiver<T>,
    delay: Duration,
}

impl<T> Debounced<T> {
    /// The quiet period a value must survive before it is yielded.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Waits for the next settled value.
    ///
    /// Every newer value restarts the quiet period. A pending value is
    /// flushed immediately when all senders are dropped. Returns `None` once
    /// the channel is closed and drained.
    pub async fn next(&mut self) -> Option<T> {
        let mut latest = self.rx.recv().await?;
        loop {
            match timeout(self.delay, self.rx.recv()).await {
                Ok(Some(value)) => latest = value,
                Ok(None) | Err(_) => return Some(latest),
            }
        }
    }
}
