use anyhow::Result;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Running background tasks plus the shutdown channel they watch.
/// Call `shutdown()` to stop the event loop and the query server.
pub struct ServiceHandle {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<(&'static str, JoinHandle<Result<()>>)>,
}

impl ServiceHandle {
    /// Create a new ServiceHandle and return it together with a Receiver clonable by tasks.
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (ServiceHandle { shutdown_tx: tx, tasks: vec![] }, rx)
    }

    /// Track a spawned task so shutdown waits for it.
    pub fn attach(&mut self, name: &'static str, h: JoinHandle<Result<()>>) {
        self.tasks.push((name, h));
    }

    pub fn task_names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(|(n, _)| *n).collect()
    }

    /// Signal shutdown and wait for every task, in attach order.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown_tx.send(true);

        for (name, h) in self.tasks {
            match h.await {
                Ok(Ok(())) => debug!(task = name, "stopped"),
                Ok(Err(e)) => error!(task = name, "service task returned error: {:?}", e),
                Err(e) => error!(task = name, "task join error: {:?}", e),
            }
        }
        Ok(())
    }
}
