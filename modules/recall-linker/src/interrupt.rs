// Interrupt delivery for the batch drivers. Ctrl-C presses arrive on a
// channel so drivers can race them against in-flight work, and tests can
// inject them without sending real signals.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::warn;

#[derive(Clone)]
pub struct InterruptSender(mpsc::UnboundedSender<()>);

impl InterruptSender {
    pub fn interrupt(&self) {
        let _ = self.0.send(());
    }
}

pub struct Interrupts {
    rx: mpsc::UnboundedReceiver<()>,
}

impl Interrupts {
    /// Deliver every Ctrl-C the process receives.
    pub fn listen() -> Self {
        let (tx, interrupts) = Self::channel();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                warn!("Keyboard interrupt!");
                tx.interrupt();
            }
        });
        interrupts
    }

    pub fn channel() -> (InterruptSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (InterruptSender(tx), Self { rx })
    }

    /// Resolve on the next interrupt. Never resolves once every sender is gone.
    pub async fn next(&mut self) {
        if self.rx.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }

    /// After a first interrupt: does a second one arrive within `grace`?
    pub async fn confirmed_within(&mut self, grace: Duration) -> bool {
        tokio::time::timeout(grace, self.next()).await.is_ok()
    }
}
