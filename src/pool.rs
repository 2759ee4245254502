use std::sync::Arc;
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::artifact::MediaArtifact;
use crate::comments::resolve_comments;
use crate::container::Kind;
use crate::error::Result;
use crate::fetch::Tier;
use crate::providers::Registry;

enum Task {
    Resolve {
        kind: Kind,
        url: String,
        tx: Sender<MediaArtifact>,
    },
    Page {
        url: String,
        tx: Sender<Result<String>>,
    },
}

struct Inner {
    registry: Arc<Registry>,
    tasks: Sender<Task>,
    stop: Sender<()>,
}

/// Runs blocking fetches off the owning thread. Results come back on the
/// per-task receiver; workers never touch page state.
pub struct Pool {
    inner: Arc<Inner>,
    handles: Vec<thread::JoinHandle<()>>,
}

impl Pool {
    pub fn new(registry: Arc<Registry>, workers: usize) -> Self {
        let workers = if workers == 0 { 2 } else { workers };
        let (task_tx, task_rx) = unbounded();
        let (stop_tx, stop_rx) = unbounded();

        let inner = Arc::new(Inner {
            registry,
            tasks: task_tx,
            stop: stop_tx,
        });

        let mut handles = Vec::new();
        for _ in 0..workers {
            let rx_tasks = task_rx.clone();
            let rx_stop = stop_rx.clone();
            let worker_inner = inner.clone();
            handles.push(thread::spawn(move || worker_inner.worker(rx_tasks, rx_stop)));
        }

        Self { inner, handles }
    }

    pub fn resolve(&self, kind: Kind, url: String) -> Receiver<MediaArtifact> {
        let (tx, rx) = unbounded();
        let _ = self.inner.tasks.send(Task::Resolve { kind, url, tx });
        rx
    }

    pub fn fetch_page(&self, url: String) -> Receiver<Result<String>> {
        let (tx, rx) = unbounded();
        let _ = self.inner.tasks.send(Task::Page { url, tx });
        rx
    }

    fn shutdown(&mut self) {
        for _ in &self.handles {
            let _ = self.inner.stop.send(());
        }
        while let Some(handle) = self.handles.pop() {
            let _ = handle.join();
        }
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Inner {
    fn worker(&self, tasks: Receiver<Task>, stop: Receiver<()>) {
        loop {
            crossbeam_channel::select! {
                recv(stop) -> _ => break,
                recv(tasks) -> msg => {
                    match msg {
                        Ok(task) => self.process(task),
                        Err(_) => break,
                    }
                }
            }
        }
    }

    fn process(&self, task: Task) {
        match task {
            Task::Resolve { kind, url, tx } => {
                let artifact = match kind {
                    Kind::Media => self.registry.resolve(&url),
                    Kind::Comments => resolve_comments(self.registry.fetcher().as_ref(), &url)
                        .unwrap_or_else(|err| {
                            tracing::info!(url, error = %err, "comments failed");
                            MediaArtifact::failure(err)
                        }),
                };
                let _ = tx.send(artifact);
            }
            Task::Page { url, tx } => {
                let result = self.registry.fetcher().fetch_text(&url, &[], Tier::Page);
                let _ = tx.send(result);
            }
        }
    }
}
