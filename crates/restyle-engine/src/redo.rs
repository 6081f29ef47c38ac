//! Background redo queue
//!
//! A single consumer thread works RedoRequests strictly in enqueue order.
//! The worker is spawned lazily when the queue becomes non-empty and exits
//! once it drains. Queue state and the worker-alive flag live behind one
//! mutex, so a job can never be enqueued into a channel nobody is reading.
//! Cancellation is cooperative: the flag is checked before each job and
//! again after generation, so an in-flight job finishes but its result is
//! discarded.

use crate::review::ReviewItem;
use restyle_core::{normalize_rel_key, now_unix, RestyleError, Result};
use restyle_gen::{extension_for_mime, mime_for_path, GenerationClient};
use restyle_index::{FileRecord, IndexStore};
use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// A queued unit of regeneration work
#[derive(Debug, Clone)]
pub struct RedoRequest {
    pub rel_path: String,
    pub prompt: String,
    pub size_class: String,
}

/// Everything a redo job needs, fixed for one loaded folder
pub(crate) struct RedoContext {
    pub store: Arc<IndexStore>,
    pub client: Arc<GenerationClient>,
    pub processed_root: PathBuf,
    pub items: Arc<Mutex<Vec<ReviewItem>>>,
    pub cancel: Arc<AtomicBool>,
}

struct QueueInner {
    jobs: VecDeque<RedoRequest>,
    /// Keys queued or in flight, for single-flight de-duplication
    keys: HashSet<String>,
    worker_alive: bool,
}

pub(crate) struct RedoQueue {
    inner: Arc<Mutex<QueueInner>>,
    ctx: Arc<RedoContext>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl RedoQueue {
    pub fn new(ctx: RedoContext) -> Self {
        Self {
            inner: Arc::new(Mutex::new(QueueInner {
                jobs: VecDeque::new(),
                keys: HashSet::new(),
                worker_alive: false,
            })),
            ctx: Arc::new(ctx),
            handle: Mutex::new(None),
        }
    }

    /// Enqueue a job, starting the worker if none is running. Returns false
    /// when the item is already queued or in flight.
    pub fn enqueue(&self, request: RedoRequest) -> bool {
        let key = normalize_rel_key(&request.rel_path);
        let mut inner = self.inner.lock().unwrap();
        if !inner.keys.insert(key) {
            return false;
        }
        inner.jobs.push_back(request);
        if !inner.worker_alive {
            inner.worker_alive = true;
            let queue = Arc::clone(&self.inner);
            let ctx = Arc::clone(&self.ctx);
            let mut handle = self.handle.lock().unwrap();
            // A previous worker has already marked itself dead; reap it
            if let Some(old) = handle.take() {
                old.join().ok();
            }
            *handle = Some(std::thread::spawn(move || run_worker(queue, ctx)));
        }
        true
    }

    /// Jobs queued or in flight
    pub fn pending(&self) -> usize {
        self.inner.lock().unwrap().keys.len()
    }

    pub fn is_idle(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.keys.is_empty() && !inner.worker_alive
    }

    /// Cooperative cancellation: clear queued work, let any in-flight job
    /// finish, and wait for the worker to exit. Queued jobs are dropped.
    pub fn shutdown(&self) {
        self.ctx.cancel.store(true, Ordering::Relaxed);
        {
            let mut inner = self.inner.lock().unwrap();
            inner.jobs.clear();
            inner.keys.clear();
        }
        if let Some(handle) = self.handle.lock().unwrap().take() {
            handle.join().ok();
        }
    }
}

fn run_worker(queue: Arc<Mutex<QueueInner>>, ctx: Arc<RedoContext>) {
    loop {
        let job = {
            let mut inner = queue.lock().unwrap();
            match inner.jobs.pop_front() {
                Some(job) => job,
                None => {
                    inner.worker_alive = false;
                    return;
                }
            }
        };
        let key = normalize_rel_key(&job.rel_path);
        if !ctx.cancel.load(Ordering::Relaxed) {
            if let Err(e) = process_job(&ctx, &job) {
                tracing::warn!(item = %job.rel_path, error = %e, "redo job failed, skipping");
            }
        }
        queue.lock().unwrap().keys.remove(&key);
    }
}

fn process_job(ctx: &RedoContext, job: &RedoRequest) -> Result<()> {
    let key = normalize_rel_key(&job.rel_path);
    let snapshot = {
        let items = ctx.items.lock().unwrap();
        items
            .iter()
            .find(|i| i.key == key)
            .cloned()
            .ok_or_else(|| RestyleError::Index(format!("Unknown review item: {}", job.rel_path)))?
    };

    let bytes = std::fs::read(&snapshot.original_path)?;
    let mime = mime_for_path(&snapshot.original_path);
    let images = ctx
        .client
        .generate_variations(&bytes, mime, &job.prompt, &job.size_class)?;

    // The folder may have been switched while the request was in flight;
    // discard the result instead of writing into an inactive folder
    if ctx.cancel.load(Ordering::Relaxed) {
        return Ok(());
    }

    for stale in &snapshot.variations {
        std::fs::remove_file(stale).ok();
    }
    std::fs::create_dir_all(&snapshot.variation_dir)?;
    let mut variations = Vec::new();
    let mut outputs = Vec::new();
    let rel_dir = relative_variation_dir(&snapshot, &ctx.processed_root);
    for (i, image) in images.iter().enumerate() {
        let name = format!("{:03}.{}", i + 1, extension_for_mime(&image.mime));
        let path = snapshot.variation_dir.join(&name);
        std::fs::write(&path, &image.bytes)?;
        variations.push(path);
        outputs.push(format!("{}/{}", rel_dir, name));
    }

    let meta = std::fs::metadata(&snapshot.original_path)?;
    let modified_unix = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default();
    ctx.store.upsert_file(
        &ctx.processed_root,
        FileRecord {
            rel_path: snapshot.rel_path.clone(),
            size: meta.len(),
            modified_unix,
            outputs,
            processed_unix: now_unix(),
        },
    )?;
    ctx.store.remove_review(&ctx.processed_root, &snapshot.rel_path)?;

    // Refresh the in-memory item so a cursor pointing at it sees the new
    // previews immediately
    let mut items = ctx.items.lock().unwrap();
    if let Some(item) = items.iter_mut().find(|i| i.key == key) {
        item.variations = variations;
        item.reviewed = false;
        item.selected_index = None;
        item.notes.clear();
        item.transparent = false;
        item.selected_output = None;
    }
    Ok(())
}

fn relative_variation_dir(item: &ReviewItem, processed_root: &std::path::Path) -> String {
    item.variation_dir
        .strip_prefix(processed_root)
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_else(|_| item.variation_dir.to_string_lossy().into_owned())
}
