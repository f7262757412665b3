//! Worker pool over point-to-point local sockets.
//!
//! N long-lived worker processes, each bound to its own Unix-socket
//! endpoint named by slot index. The pool hands out worker ids from an
//! available queue guarded by a mutex; callers that find the queue
//! empty block on a condition variable until a release wakes one of
//! them (first-ready-wins, no FIFO guarantee). An RAII permit returns
//! the id on every dispatch path, so a failed job never consumes a
//! worker permanently.

pub mod protocol;
pub mod service;

use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use log::debug;

use crate::error::PageError;
use crate::pool::protocol::{read_message, write_frame, MatchReply, MatchRequest};

/// Connection retries after the first failed attempt.
const CONNECT_RETRIES: usize = 5;

/// Fixed backoff between connection attempts.
const CONNECT_BACKOFF: Duration = Duration::from_millis(300);

/// Deterministic endpoint path for a worker slot, scoped to the
/// parent process so concurrent runs do not collide.
pub fn endpoint_path(parent_pid: u32, index: usize) -> PathBuf {
    std::env::temp_dir().join(format!("staffnote-match-{parent_pid}-{index}.sock"))
}

struct IdQueue {
    ids: Mutex<Vec<usize>>,
    available: Condvar,
}

impl IdQueue {
    fn new(count: usize) -> Self {
        Self {
            ids: Mutex::new((0..count).collect()),
            available: Condvar::new(),
        }
    }

    fn acquire(&self) -> usize {
        let mut ids = self.ids.lock().expect("pool queue poisoned");
        loop {
            if let Some(id) = ids.pop() {
                return id;
            }
            ids = self.available.wait(ids).expect("pool queue poisoned");
        }
    }

    fn release(&self, id: usize) {
        let mut ids = self.ids.lock().expect("pool queue poisoned");
        // Returned workers go to the front; `acquire` pops from the
        // back, so slots rotate instead of hammering one worker.
        ids.insert(0, id);
        drop(ids);
        self.available.notify_one();
    }
}

/// RAII worker permit; releases its id when dropped.
struct Permit<'a> {
    queue: &'a IdQueue,
    id: usize,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        debug!("worker {} done", self.id);
        self.queue.release(self.id);
    }
}

/// Pool of template-match workers.
pub struct WorkerPool {
    queue: IdQueue,
    endpoints: Vec<PathBuf>,
    children: Vec<Child>,
}

impl WorkerPool {
    /// Spawn `count` worker processes from the `match-worker` binary
    /// at `worker_exe`, each serving one endpoint.
    pub fn spawn(worker_exe: &Path, count: usize, template_dir: &Path) -> std::io::Result<Self> {
        let pid = std::process::id();
        let endpoints: Vec<PathBuf> = (0..count).map(|i| endpoint_path(pid, i)).collect();
        let mut children = Vec::with_capacity(count);
        for endpoint in &endpoints {
            // A stale socket from a crashed run blocks bind.
            let _ = std::fs::remove_file(endpoint);
            let child = Command::new(worker_exe)
                .arg(endpoint)
                .arg(template_dir)
                .spawn()?;
            children.push(child);
        }
        Ok(Self {
            queue: IdQueue::new(count),
            endpoints,
            children,
        })
    }

    /// Attach to externally managed endpoints instead of spawning
    /// processes. The caller is responsible for having something
    /// listen on each path.
    pub fn attach(endpoints: Vec<PathBuf>) -> Self {
        Self {
            queue: IdQueue::new(endpoints.len()),
            endpoints,
            children: Vec::new(),
        }
    }

    /// Path of the `match-worker` binary installed next to the
    /// current executable.
    pub fn default_worker_exe() -> std::io::Result<PathBuf> {
        Ok(std::env::current_exe()?.with_file_name("match-worker"))
    }

    /// Run one job on the next available worker, blocking until a
    /// worker is free. The worker id is returned to the queue whether
    /// the job succeeds or fails.
    pub fn dispatch(&self, request: &MatchRequest) -> Result<Vec<[i32; 4]>, PageError> {
        let permit = Permit {
            queue: &self.queue,
            id: self.queue.acquire(),
        };
        debug!("worker {} start: {}", permit.id, request.template_name);

        let endpoint = &self.endpoints[permit.id];
        let mut stream = connect_with_retry(endpoint)?;
        write_frame(&mut stream, request)?;
        let reply: MatchReply = read_message(&mut stream)?;
        match reply {
            MatchReply::Boxes(boxes) => Ok(boxes),
            MatchReply::Error { error } => Err(PageError::Job(error)),
        }
    }

    /// Number of currently idle workers; test hook.
    pub fn idle_workers(&self) -> usize {
        self.queue.ids.lock().expect("pool queue poisoned").len()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for child in &mut self.children {
            let _ = child.kill();
            let _ = child.wait();
        }
        if !self.children.is_empty() {
            for endpoint in &self.endpoints {
                let _ = std::fs::remove_file(endpoint);
            }
        }
    }
}

/// Connect to a worker endpoint with bounded retry; endpoints may not
/// be listening yet right after process start.
fn connect_with_retry(endpoint: &Path) -> Result<UnixStream, PageError> {
    let mut attempt = 0usize;
    loop {
        match UnixStream::connect(endpoint) {
            Ok(stream) => return Ok(stream),
            Err(source) => {
                if attempt >= CONNECT_RETRIES {
                    return Err(PageError::EndpointUnavailable {
                        endpoint: endpoint.to_path_buf(),
                        attempts: attempt + 1,
                        source,
                    });
                }
                attempt += 1;
                std::thread::sleep(CONNECT_BACKOFF);
            }
        }
    }
}
