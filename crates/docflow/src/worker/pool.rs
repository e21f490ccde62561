use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use log::{debug, error, info};

use crate::error::WorkerError;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Work executed for each job id taken off the queue.
pub trait JobHandler: Send + Sync + 'static {
    fn handle(&self, job_id: &str);
}

/// Fixed number of threads fed by a bounded queue of job ids.
///
/// `submit` blocks while the queue is full, pushing backpressure onto the
/// caller (the broker dispatch thread).
pub struct WorkerPool {
    job_sender: RwLock<Option<Sender<String>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shutdown: Arc<AtomicBool>,
    worker_count: usize,
    queue_capacity: usize,
}

impl WorkerPool {
    pub fn new(
        handler: Arc<dyn JobHandler>,
        worker_count: usize,
        queue_capacity: usize,
    ) -> Result<Self, WorkerError> {
        let worker_count = worker_count.max(1);
        let queue_capacity = queue_capacity.max(1);
        let (job_sender, job_receiver) = bounded::<String>(queue_capacity);
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let job_rx = job_receiver.clone();
            let shutdown_flag = Arc::clone(&shutdown);
            let handler = Arc::clone(&handler);

            let handle = thread::Builder::new()
                .name(format!("docflow-worker-{}", worker_id))
                .spawn(move || run_worker(worker_id, job_rx, shutdown_flag, handler))
                .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;
            workers.push(handle);
        }

        info!(
            "Started {} workers (queue capacity {})",
            worker_count, queue_capacity
        );

        Ok(Self {
            job_sender: RwLock::new(Some(job_sender)),
            workers: Mutex::new(workers),
            shutdown,
            worker_count,
            queue_capacity,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Queues a job, blocking while the queue is full.
    pub fn submit(&self, job_id: String) -> Result<(), WorkerError> {
        let guard = self
            .job_sender
            .read()
            .map_err(|_| WorkerError::ChannelClosed)?;
        let sender = guard.as_ref().ok_or(WorkerError::ChannelClosed)?;

        let mut pending = job_id;
        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                return Err(WorkerError::ChannelClosed);
            }
            match sender.send_timeout(pending, POLL_INTERVAL) {
                Ok(()) => return Ok(()),
                Err(SendTimeoutError::Timeout(job_id)) => pending = job_id,
                Err(SendTimeoutError::Disconnected(_)) => return Err(WorkerError::ChannelClosed),
            }
        }
    }

    /// Stops workers after their current job. Queued jobs are abandoned.
    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Closes the queue, lets workers finish everything already queued and
    /// joins them.
    pub fn wait(&self) {
        match self.job_sender.write() {
            Ok(mut sender) => drop(sender.take()),
            Err(_) => error!("Worker queue lock poisoned"),
        }

        let workers = match self.workers.lock() {
            Ok(mut workers) => std::mem::take(&mut *workers),
            Err(_) => {
                error!("Worker handle lock poisoned");
                return;
            }
        };

        for (i, worker) in workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All workers have stopped");
    }
}

fn run_worker(
    worker_id: usize,
    job_receiver: Receiver<String>,
    shutdown: Arc<AtomicBool>,
    handler: Arc<dyn JobHandler>,
) {
    debug!("Worker {} started", worker_id);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("Worker {} received shutdown signal", worker_id);
            break;
        }

        match job_receiver.recv_timeout(POLL_INTERVAL) {
            Ok(job_id) => {
                debug!("Worker {} processing job {}", worker_id, job_id);
                if catch_unwind(AssertUnwindSafe(|| handler.handle(&job_id))).is_err() {
                    error!("Worker {} panicked while processing job {}", worker_id, job_id);
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                debug!("Worker {} job channel disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}
