//! Runner - interprets a compiled program against an [`Engine`]
//!
//! One task walks the tree. A blocking run parks that task until its
//! container exits. Parallel nodes fork a task per child, bounded by the
//! node's limit, and join them all. Every started container gets a log task
//! that feeds the shared [`Pipe`].
//!
//! Cancellation is cooperative: it is checked before each container starts,
//! and a watcher task stops every started container as soon as the caller's
//! signal fires, which unblocks the pending wait.

use super::pipe::{wait_until_set, Line, LineKind, Pipe, DEFAULT_CAPACITY};
use super::{Engine, EngineError, ExecError, Handle, LogStream, Trace, Tracer};
use crate::core::{BuildStatus, Spec};
use crate::tree::{Node, ParallelNode, RunNode, ValidationError};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{oneshot, watch, Mutex, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

type ExecFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ExecError>> + Send + 'a>>;

/// Configures and starts a run of one program
pub struct Runner {
    spec: Spec,
    engine: Arc<dyn Engine>,
    tracer: Option<Arc<dyn Tracer>>,
    pipe: Pipe,
}

impl Runner {
    pub fn new(spec: Spec, engine: Arc<dyn Engine>) -> Self {
        Self {
            spec,
            engine,
            tracer: None,
            pipe: Pipe::new(DEFAULT_CAPACITY),
        }
    }

    pub fn with_tracer(mut self, tracer: Arc<dyn Tracer>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Number of log lines buffered before log tasks wait for the reader
    pub fn with_buffer(mut self, capacity: usize) -> Self {
        self.pipe = Pipe::new(capacity);
        self
    }

    /// The pipe this run writes its output into
    pub fn pipe(&self) -> Pipe {
        self.pipe.clone()
    }

    /// Start the run in the background
    ///
    /// The program is validated first; an invalid program starts nothing.
    /// When `signal` completes the run is cancelled.
    pub fn run<F>(self, signal: F) -> Result<RunHandle, ExecError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.spec.validate()?;

        let (cancel_tx, _) = watch::channel(false);
        let execution = Arc::new(Execution {
            spec: self.spec,
            engine: self.engine,
            tracer: self.tracer,
            pipe: self.pipe.clone(),
            started: Mutex::new(Vec::new()),
            cancelled: AtomicBool::new(false),
            cancel_tx,
            started_at: Utc::now(),
        });

        let watcher = Arc::clone(&execution);
        let finished = execution.cancel_tx.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                _ = signal => {
                    info!("Cancellation requested");
                    watcher.cancel().await;
                }
                _ = wait_until_set(finished) => {}
            }
        });

        let (done_tx, done_rx) = oneshot::channel();
        tokio::spawn(async move {
            let result = execution.execute().await;
            let _ = done_tx.send(result);
        });

        Ok(RunHandle {
            done: done_rx,
            pipe: self.pipe,
        })
    }
}

/// Handle to a run started by [`Runner::run`]
#[derive(Debug)]
pub struct RunHandle {
    done: oneshot::Receiver<Result<(), ExecError>>,
    pipe: Pipe,
}

impl RunHandle {
    pub fn pipe(&self) -> Pipe {
        self.pipe.clone()
    }

    /// Wait for teardown to finish and return the run's error, if any
    pub async fn wait(self) -> Result<(), ExecError> {
        match self.done.await {
            Ok(result) => result,
            Err(_) => Err(ExecError::Engine(EngineError::Backend(
                "runner stopped before reporting a result".to_string(),
            ))),
        }
    }
}

/// State shared by the tasks of one run
struct Execution {
    spec: Spec,
    engine: Arc<dyn Engine>,
    tracer: Option<Arc<dyn Tracer>>,
    pipe: Pipe,
    started: Mutex<Vec<Handle>>,
    cancelled: AtomicBool,
    cancel_tx: watch::Sender<bool>,
    started_at: DateTime<Utc>,
}

fn body<'a>(node: &'a Option<Box<Node>>, kind: &'static str) -> Result<&'a Node, ExecError> {
    node.as_deref()
        .ok_or(ExecError::Invalid(ValidationError::MissingBody(kind)))
}

fn defer<'a>(node: &'a Option<Box<Node>>, kind: &'static str) -> Result<&'a Node, ExecError> {
    node.as_deref()
        .ok_or(ExecError::Invalid(ValidationError::MissingDefer(kind)))
}

impl Execution {
    async fn execute(self: Arc<Self>) -> Result<(), ExecError> {
        self.setup().await;
        info!("Running program with {} containers", self.spec.containers.len());

        let result = self.exec(&self.spec.program).await;

        self.pipe.close();
        self.cancel().await;
        self.teardown().await;

        match &result {
            Ok(()) => info!("Run finished: {}", BuildStatus::Success),
            Err(e) => info!("Run finished: {} ({})", BuildStatus::from_result(&result), e),
        }
        result
    }

    /// Hook for backends that need per-run resources; nothing to do yet
    async fn setup(&self) {
        debug!("Setting up run");
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Stop every started container. Only the first call does anything.
    async fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cancel_tx.send_replace(true);

        let handles = self.started.lock().await.clone();
        for handle in &handles {
            if let Err(e) = self.engine.container_stop(handle).await {
                warn!("Failed to stop container {}: {}", handle, e);
            }
        }
    }

    /// Remove every started container
    async fn teardown(&self) {
        let handles = std::mem::take(&mut *self.started.lock().await);
        for handle in handles.iter().rev() {
            if let Err(e) = self.engine.container_remove(handle).await {
                warn!("Failed to remove container {}: {}", handle, e);
            }
        }
    }

    fn exec<'a>(self: &'a Arc<Self>, node: &'a Node) -> ExecFuture<'a> {
        Box::pin(async move {
            match node {
                Node::List(list) => {
                    for child in &list.body {
                        self.exec(child).await?;
                    }
                    Ok(())
                }
                Node::Defer(node) => {
                    let result = self.exec(body(&node.body, "defer")?).await;
                    let deferred = self.exec(defer(&node.defer, "defer")?).await;
                    result.and(deferred)
                }
                Node::Error(node) => {
                    let result = self.exec(body(&node.body, "error")?).await;
                    if result.is_err() {
                        if let Err(e) = self.exec(defer(&node.defer, "error")?).await {
                            debug!("Failure handler error ignored: {}", e);
                        }
                    }
                    result
                }
                Node::Recover(node) => {
                    if let Err(e) = self.exec(body(&node.body, "recover")?).await {
                        debug!("Recovered from error: {}", e);
                    }
                    Ok(())
                }
                Node::Parallel(parallel) => self.exec_parallel(parallel).await,
                Node::Run(run) => self.exec_run(run).await,
            }
        })
    }

    /// Join every child; with several failures the lowest index wins
    async fn exec_parallel(self: &Arc<Self>, node: &ParallelNode) -> Result<(), ExecError> {
        let permits = if node.limit > 0 {
            node.limit as usize
        } else {
            node.body.len().max(1)
        };
        let semaphore = Arc::new(Semaphore::new(permits));

        let mut tasks = JoinSet::new();
        for (index, child) in node.body.iter().enumerate() {
            let this = Arc::clone(self);
            let child = child.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                (index, this.exec(&child).await)
            });
        }

        let mut first: Option<(usize, ExecError)> = None;
        while let Some(joined) = tasks.join_next().await {
            let (index, result) = match joined {
                Ok(outcome) => outcome,
                Err(e) => (
                    usize::MAX,
                    Err(ExecError::Engine(EngineError::Backend(format!(
                        "parallel task failed: {}",
                        e
                    )))),
                ),
            };
            if let Err(e) = result {
                if first.as_ref().map_or(true, |(i, _)| index < *i) {
                    first = Some((index, e));
                }
            }
        }

        match first {
            Some((_, e)) => Err(e),
            None => Ok(()),
        }
    }

    async fn exec_run(&self, run: &RunNode) -> Result<(), ExecError> {
        let container = self
            .spec
            .lookup(&run.name)
            .ok_or_else(|| ExecError::NotFound(run.name.clone()))?;
        container
            .validate()
            .map_err(|e| ExecError::Invalid(ValidationError::InvalidContainer(e)))?;

        if let Some(tracer) = self.tracer.as_ref().filter(|_| !container.is_ambassador()) {
            if tracer.trace(container).await? == Trace::Skip {
                debug!("Tracer skipped {}", container.name);
                return Ok(());
            }
        }

        if self.is_cancelled() {
            return Err(ExecError::Cancelled);
        }

        debug!("Starting container {}", container.name);
        let handle = self.engine.container_start(container).await?;
        self.started.lock().await.push(handle.clone());

        // cancel() may have read the registry before this handle was added
        if self.is_cancelled() {
            if let Err(e) = self.engine.container_stop(&handle).await {
                warn!("Failed to stop container {}: {}", handle, e);
            }
            return Err(ExecError::Cancelled);
        }

        let logs = if run.silent {
            None
        } else {
            let stream = self.engine.container_logs(&handle).await?;
            Some(tokio::spawn(stream_logs(
                stream,
                self.pipe.clone(),
                container.alias.clone(),
                self.started_at,
            )))
        };

        if run.detach {
            return Ok(());
        }

        let state = self.engine.container_wait(&handle).await;
        let next_pos = match logs {
            Some(task) => Some(finish_logs(task).await),
            None => None,
        };
        let state = state?;
        debug!("Container {} exited with code {}", container.name, state.exit_code);

        if let Some(pos) = next_pos {
            let line = Line {
                proc: container.alias.clone(),
                time: elapsed(self.started_at),
                kind: LineKind::ExitCode,
                pos,
                out: state.exit_code.to_string(),
            };
            self.pipe.write(line).await;
        }

        if state.oom_killed {
            return Err(ExecError::Oom {
                name: container.name.clone(),
            });
        }
        if state.exit_code != 0 {
            return Err(ExecError::Exit {
                name: container.name.clone(),
                code: state.exit_code,
            });
        }
        Ok(())
    }
}

fn elapsed(since: DateTime<Utc>) -> i64 {
    (Utc::now() - since).num_seconds()
}

/// Copy a container's output into the pipe; returns the next free position
async fn stream_logs(stream: LogStream, pipe: Pipe, proc: String, since: DateTime<Utc>) -> usize {
    let mut lines = BufReader::new(stream).lines();
    let mut pos = 0;
    loop {
        match lines.next_line().await {
            Ok(Some(out)) => {
                let line = Line {
                    proc: proc.clone(),
                    time: elapsed(since),
                    kind: LineKind::Stdout,
                    pos,
                    out,
                };
                if !pipe.write(line).await {
                    break;
                }
                pos += 1;
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Log stream for {} failed: {}", proc, e);
                break;
            }
        }
    }
    pos
}

async fn finish_logs(task: JoinHandle<usize>) -> usize {
    match task.await {
        Ok(pos) => pos,
        Err(e) => {
            warn!("Log task failed: {}", e);
            0
        }
    }
}
