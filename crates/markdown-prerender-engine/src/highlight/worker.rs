use std::{
    collections::{HashMap, VecDeque},
    io,
    sync::Arc,
    thread::{self, JoinHandle},
};

use parking_lot::{Condvar, Mutex};

use super::{
    CacheState, CallerId, Colorizer, HighlightCacheConfig, HighlightError, HighlightMap,
    HighlightOutcome, Lookup, RenderCache, Submission, TaskId,
};

/// Receives the outcome of one scheduled computation, on the worker thread.
pub type CompletionCallback = Box<dyn FnOnce(HighlightOutcome) + Send + 'static>;

struct HighlightRequest {
    task: TaskId,
    caller: CallerId,
    generation: u64,
    language: String,
    content: String,
    theme: String,
    on_complete: CompletionCallback,
}

#[derive(Default)]
struct RequestQueue {
    pending: VecDeque<HighlightRequest>,
    /// Bumped on every submit or cancel; a request is current while its
    /// generation matches.
    generations: HashMap<CallerId, u64>,
    in_flight: Option<TaskId>,
    next_task: u64,
    shutdown: bool,
}

impl RequestQueue {
    fn supersede(&mut self, caller: CallerId) -> (u64, Vec<CompletionCallback>) {
        let generation = self.generations.entry(caller).or_insert(0);
        *generation += 1;
        let generation = *generation;

        let (stale, kept): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|r| r.caller == caller);
        self.pending = kept.into();
        (generation, stale.into_iter().map(|r| r.on_complete).collect())
    }

    fn is_current(&self, request: &HighlightRequest) -> bool {
        self.generations.get(&request.caller) == Some(&request.generation)
    }

    fn is_busy(&self) -> bool {
        self.in_flight.is_some() || !self.pending.is_empty()
    }
}

struct Shared {
    queue: Mutex<RequestQueue>,
    /// Signalled when work arrives or on shutdown.
    work: Condvar,
    /// Signalled when the queue drains.
    idle: Condvar,
    cache: Mutex<RenderCache>,
    colorizer: Box<dyn Colorizer>,
}

/// Incremental highlight cache with one background worker.
///
/// [`submit`](Self::submit) answers synchronously from the cache and, unless
/// the answer was exact, schedules a computation. Computations run one at a
/// time on the worker thread; each caller has at most one request queued, and
/// a newer submit from the same caller cancels the older one.
///
/// Dropping the cache cancels queued requests and joins the worker.
pub struct HighlightCache {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl HighlightCache {
    pub fn new(config: HighlightCacheConfig, colorizer: impl Colorizer + 'static) -> io::Result<Self> {
        let shared = Arc::new(Shared {
            queue: Mutex::new(RequestQueue::default()),
            work: Condvar::new(),
            idle: Condvar::new(),
            cache: Mutex::new(RenderCache::new(config)),
            colorizer: Box::new(colorizer),
        });
        let worker = thread::Builder::new()
            .name("highlight-worker".into())
            .spawn({
                let shared = Arc::clone(&shared);
                move || run_worker(&shared)
            })?;

        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /// Probes the cache without scheduling anything.
    pub fn lookup(&self, content: &str, language: &str) -> Lookup {
        self.shared.cache.lock().lookup(language, content)
    }

    /// Looks `content` up and, unless it is cached exactly, schedules a
    /// computation whose outcome goes to `on_complete`.
    ///
    /// Any earlier request from `caller` is superseded: a queued one gets
    /// [`HighlightOutcome::Cancelled`] right away, one already running gets it
    /// when it finishes.
    pub fn submit(
        &self,
        content: &str,
        language: &str,
        caller: CallerId,
        theme: &str,
        on_complete: impl FnOnce(HighlightOutcome) + Send + 'static,
    ) -> Submission {
        let lookup = self.lookup(content, language);

        let (task, stale) = {
            let mut queue = self.shared.queue.lock();
            let (generation, stale) = queue.supersede(caller);
            let task = match lookup {
                Lookup::Full(_) => None,
                Lookup::Prefix(_) | Lookup::None => {
                    let task = TaskId(queue.next_task);
                    queue.next_task += 1;
                    queue.pending.push_back(HighlightRequest {
                        task,
                        caller,
                        generation,
                        language: language.to_string(),
                        content: content.to_string(),
                        theme: theme.to_string(),
                        on_complete: Box::new(on_complete),
                    });
                    self.shared.work.notify_one();
                    Some(task)
                }
            };
            (task, stale)
        };

        log::trace!(
            "{caller} submitted {} bytes of {language:?}: {} lookup, {}",
            content.len(),
            lookup.kind_name(),
            task.map_or_else(|| "nothing scheduled".to_string(), |t| format!("scheduled {t}"))
        );
        cancel_all(stale);
        Submission { lookup, task }
    }

    /// Cancels whatever `caller` has queued or running.
    pub fn cancel(&self, caller: CallerId) {
        let (_, stale) = self.shared.queue.lock().supersede(caller);
        cancel_all(stale);
    }

    /// Drops every cached map. Queued requests are unaffected.
    pub fn clear_cache(&self) {
        self.shared.cache.lock().clear();
    }

    pub fn state(&self) -> CacheState {
        if self.shared.queue.lock().is_busy() {
            CacheState::Processing
        } else {
            CacheState::Idle
        }
    }

    /// Blocks until nothing is queued or running, callbacks included.
    pub fn wait_idle(&self) {
        let mut queue = self.shared.queue.lock();
        while queue.is_busy() {
            self.shared.idle.wait(&mut queue);
        }
    }

    /// Number of cached maps.
    pub fn len(&self) -> usize {
        self.shared.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for HighlightCache {
    fn drop(&mut self) {
        self.shared.queue.lock().shutdown = true;
        self.shared.work.notify_all();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("highlight worker panicked");
            }
        }
    }
}

fn cancel_all(callbacks: Vec<CompletionCallback>) {
    for callback in callbacks {
        callback(HighlightOutcome::Cancelled);
    }
}

fn run_worker(shared: &Shared) {
    while let Some(request) = next_request(shared) {
        let result = compute(shared, &request);

        let current = shared.queue.lock().is_current(&request);
        let outcome = match result {
            _ if !current => HighlightOutcome::Cancelled,
            Ok(map) => HighlightOutcome::Success(map),
            Err(err) => {
                log::warn!("highlighting {} failed: {err}", request.task);
                HighlightOutcome::Error(err)
            }
        };
        log::trace!(
            "{} for {} finished: {}",
            request.task,
            request.caller,
            outcome.kind_name()
        );
        (request.on_complete)(outcome);

        let mut queue = shared.queue.lock();
        queue.in_flight = None;
        if !queue.is_busy() {
            shared.idle.notify_all();
        }
    }
}

/// Blocks for the next request. `None` once the cache is shutting down;
/// anything still queued then is cancelled.
fn next_request(shared: &Shared) -> Option<HighlightRequest> {
    let mut queue = shared.queue.lock();
    loop {
        if queue.shutdown {
            let stale: Vec<_> = queue.pending.drain(..).map(|r| r.on_complete).collect();
            shared.idle.notify_all();
            drop(queue);
            cancel_all(stale);
            return None;
        }
        if let Some(request) = queue.pending.pop_front() {
            queue.in_flight = Some(request.task);
            return Some(request);
        }
        shared.work.wait(&mut queue);
    }
}

/// Serves byte-identical content from the cache; otherwise colors it and
/// stores the map, even if the request has been superseded meanwhile.
fn compute(
    shared: &Shared,
    request: &HighlightRequest,
) -> Result<HighlightMap, HighlightError> {
    if let Some(map) = shared
        .cache
        .lock()
        .get_exact(&request.language, &request.content)
    {
        log::trace!("{} served from cache", request.task);
        return Ok(map);
    }

    let map = shared
        .colorizer
        .colorize(&request.content, &request.language, &request.theme)?;
    shared
        .cache
        .lock()
        .insert(&request.language, &request.content, map.clone());
    Ok(map)
}
