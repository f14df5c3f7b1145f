use std::{
    pin::pin,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::{sync::Notify, task::JoinHandle};

#[derive(Debug, Default)]
struct InterruptInner {
    triggered: AtomicBool,
    notify: Notify,
}

/// Interruption signal of a protocol session.
///
/// Clones share the same signal, so a timer can interrupt a command while the session
/// itself is locked by the executing statement.
#[derive(Debug, Default, Clone)]
pub struct Interrupt(Arc<InterruptInner>);

impl Interrupt {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn trigger(&self) {
        self.0.triggered.store(true, Ordering::SeqCst);
        self.0.notify.notify_waiters();
    }

    pub fn is_triggered(&self) -> bool {
        self.0.triggered.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.triggered.store(false, Ordering::SeqCst);
    }

    /// Resolves once the signal is triggered, immediately if it already is.
    pub async fn triggered(&self) {
        loop {
            let mut notified = pin!(self.0.notify.notified());
            notified.as_mut().enable();
            if self.is_triggered() {
                return;
            }
            notified.await;
        }
    }
}

/// Query timeout armed for one execution.
#[derive(Debug)]
pub struct TimerTask {
    handle: JoinHandle<()>,
    fired: Arc<AtomicBool>,
}

impl TimerTask {
    /// Spawn a task triggering `interrupt` once `timeout` elapsed.
    pub fn arm(interrupt: Interrupt, timeout: Duration) -> Self {
        let fired = Arc::new(AtomicBool::new(false));
        let handle = tokio::spawn({
            let fired = fired.clone();
            async move {
                tokio::time::sleep(timeout).await;
                fired.store(true, Ordering::SeqCst);
                log::debug!("Query timeout of {:?} elapsed, interrupting", timeout);
                interrupt.trigger();
            }
        });
        Self { handle, fired }
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    pub fn cancel(self) {
        self.handle.abort();
    }
}

impl Drop for TimerTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
