//! Accelerator stream scheduling primitive
//!
//! Accelerator-side decode stages are submitted as asynchronous
//! operations that execute in submission order, concurrently with host
//! threads. The stream is consumed as a scheduling primitive: jobs go
//! in, [`AcceleratorStream::synchronize`] waits for everything
//! submitted so far.

use std::thread::JoinHandle;

use crossbeam::channel::{bounded, unbounded, Sender};

use crate::error::{Error, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// An ordered asynchronous work queue on the accelerator
pub struct AcceleratorStream {
    sender: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl AcceleratorStream {
    /// Create a stream with its own worker
    pub fn new() -> Self {
        let (sender, receiver) = unbounded::<Job>();
        let worker = std::thread::Builder::new()
            .name("accelerator-stream".into())
            .spawn(move || {
                for job in receiver {
                    job();
                }
            })
            .expect("failed to spawn accelerator stream worker");
        Self {
            sender: Some(sender),
            worker: Some(worker),
        }
    }

    /// Submit a job; it runs after every previously submitted job
    pub fn submit<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| Error::Stream("stream is shut down".into()))?;
        sender
            .send(Box::new(job))
            .map_err(|_| Error::Stream("stream worker is gone".into()))
    }

    /// Block until every job submitted so far has completed
    pub fn synchronize(&self) -> Result<()> {
        let (done_tx, done_rx) = bounded::<()>(1);
        self.submit(move || {
            let _ = done_tx.send(());
        })?;
        done_rx
            .recv()
            .map_err(|_| Error::Stream("stream worker is gone".into()))
    }
}

impl Default for AcceleratorStream {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AcceleratorStream {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop
        self.sender = None;
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
