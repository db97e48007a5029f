use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

/// Process-wide interrupt requests.
///
/// Every Ctrl-C bumps a counter shared by all clones. The first request stops
/// the running child and the batch; a second one kills a child that ignored
/// the first. Requests that arrive while no child is running are kept, so the
/// next check sees them.
#[derive(Debug, Clone)]
pub struct Interrupt {
  count: Arc<watch::Sender<u32>>,
}

impl Default for Interrupt {
  /// A handle nothing triggers except [`Interrupt::trigger`].
  fn default() -> Self {
    let (count, _) = watch::channel(0);
    Self { count: Arc::new(count) }
  }
}

impl Interrupt {
  /// Install the Ctrl-C listener for the rest of the process.
  ///
  /// Must be called from inside a tokio runtime, once per process.
  pub fn listen() -> Self {
    let interrupt = Self::default();
    let handle = interrupt.clone();
    tokio::spawn(async move {
      loop {
        match tokio::signal::ctrl_c().await {
          Ok(()) => handle.trigger(),
          Err(e) => {
            warn!(error = %e, "cannot listen for interrupts");
            break;
          }
        }
      }
    });
    interrupt
  }

  pub fn trigger(&self) {
    self.count.send_modify(|n| *n += 1);
    debug!(count = self.count(), "interrupt requested");
  }

  pub fn count(&self) -> u32 {
    *self.count.borrow()
  }

  pub fn requested(&self) -> bool {
    self.count() > 0
  }

  /// Resolves once at least `count` requests have arrived.
  pub async fn reached(&self, count: u32) {
    let mut rx = self.count.subscribe();
    // The sender lives in `self`, so the channel cannot close while waiting.
    let _ = rx.wait_for(|n| *n >= count).await;
  }
}
