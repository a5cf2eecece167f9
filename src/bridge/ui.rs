use std::thread::{self, JoinHandle};

use tokio::sync::mpsc;

type UiTask = Box<dyn FnOnce() + Send + 'static>;

/// Handle to the single thread that owns every UI-facing object.
#[derive(Clone)]
pub struct UiThread {
    sender: mpsc::UnboundedSender<UiTask>,
}

impl UiThread {
    pub fn spawn() -> std::io::Result<(Self, JoinHandle<()>)> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<UiTask>();
        let handle = thread::Builder::new()
            .name("ui".to_string())
            .spawn(move || {
                while let Some(task) = receiver.blocking_recv() {
                    task();
                }
                tracing::debug!(target: "bridge", "ui thread stopped");
            })?;
        Ok((Self { sender }, handle))
    }

    /// Queues `task` on the UI thread. Returns false once the thread is gone.
    pub fn post<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.sender.send(Box::new(task)).is_ok()
    }
}
