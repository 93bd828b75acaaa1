//! Shared test doubles for the runner tests

#![allow(dead_code)]

use async_trait::async_trait;
use cinder::core::{Container, Spec};
use cinder::execution::{
    Engine, EngineError, ExecError, Handle, Line, LogStream, RunHandle, Runner, State, Trace, Tracer,
};
use cinder::tree::Node;
use std::collections::HashMap;
use std::future::Future;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// How a scripted container behaves
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub exit_code: i32,
    pub oom_killed: bool,
    pub logs: String,
    /// Time spent "running" before the wait returns
    pub delay: Option<Duration>,
    /// Never exit on its own; only a stop releases the wait
    pub block: bool,
    pub start_error: Option<String>,
}

impl Script {
    pub fn exit(code: i32) -> Self {
        Self {
            exit_code: code,
            ..Default::default()
        }
    }

    pub fn blocking() -> Self {
        Self {
            block: true,
            ..Default::default()
        }
    }

    pub fn with_logs(mut self, logs: &str) -> Self {
        self.logs = logs.to_string();
        self
    }

    pub fn with_delay(mut self, millis: u64) -> Self {
        self.delay = Some(Duration::from_millis(millis));
        self
    }
}

/// One recorded engine call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Start(String),
    Stop(String),
    Remove(String),
    Wait(String),
    Logs(String),
}

/// Engine that records every call and serves scripted results
pub struct MockEngine {
    scripts: Mutex<HashMap<String, Script>>,
    handles: Mutex<HashMap<Handle, String>>,
    calls: Mutex<Vec<Call>>,
    stopped: watch::Sender<Vec<Handle>>,
    next_id: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngine {
    pub fn new() -> Self {
        let (stopped, _) = watch::channel(Vec::new());
        Self {
            scripts: Mutex::new(HashMap::new()),
            handles: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            stopped,
            next_id: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    pub fn with_script(self, name: &str, script: Script) -> Self {
        self.scripts.lock().unwrap().insert(name.to_string(), script);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Names of the containers that were started, in order
    pub fn started(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Start(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn called(&self, call: &Call) -> bool {
        self.calls().contains(call)
    }

    /// Highest number of containers waited on at the same time
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn name_of(&self, handle: &Handle) -> Result<String, EngineError> {
        self.handles
            .lock()
            .unwrap()
            .get(handle)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(handle.to_string()))
    }

    fn script_for(&self, name: &str) -> Script {
        self.scripts.lock().unwrap().get(name).cloned().unwrap_or_default()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    async fn until_stopped(&self, handle: &Handle) {
        let mut rx = self.stopped.subscribe();
        loop {
            let stopped = rx.borrow_and_update().contains(handle);
            if stopped || rx.changed().await.is_err() {
                return;
            }
        }
    }
}

#[async_trait]
impl Engine for MockEngine {
    async fn container_start(&self, container: &Container) -> Result<Handle, EngineError> {
        self.record(Call::Start(container.name.clone()));
        if let Some(message) = self.script_for(&container.name).start_error {
            return Err(EngineError::Backend(message));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let handle = Handle::new(format!("{}-{}", container.name, id));
        self.handles
            .lock()
            .unwrap()
            .insert(handle.clone(), container.name.clone());
        Ok(handle)
    }

    async fn container_stop(&self, handle: &Handle) -> Result<(), EngineError> {
        let name = self.name_of(handle)?;
        self.record(Call::Stop(name));
        self.stopped.send_modify(|stopped| stopped.push(handle.clone()));
        Ok(())
    }

    async fn container_remove(&self, handle: &Handle) -> Result<(), EngineError> {
        let name = self.name_of(handle)?;
        self.record(Call::Remove(name));
        Ok(())
    }

    async fn container_wait(&self, handle: &Handle) -> Result<State, EngineError> {
        let name = self.name_of(handle)?;
        self.record(Call::Wait(name.clone()));
        let script = self.script_for(&name);

        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        let result = if script.block {
            self.until_stopped(handle).await;
            Err(EngineError::Cancelled)
        } else {
            if let Some(delay) = script.delay {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = self.until_stopped(handle) => {}
                }
            }
            Ok(State {
                exit_code: script.exit_code,
                oom_killed: script.oom_killed,
            })
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn container_logs(&self, handle: &Handle) -> Result<LogStream, EngineError> {
        let name = self.name_of(handle)?;
        self.record(Call::Logs(name.clone()));
        let logs = self.script_for(&name).logs.into_bytes();
        Ok(Box::new(Cursor::new(logs)))
    }
}

/// Tracer that skips the named containers and records what it saw
#[derive(Default)]
pub struct SkipTracer {
    pub skip: Vec<String>,
    pub seen: Mutex<Vec<String>>,
}

#[async_trait]
impl Tracer for SkipTracer {
    async fn trace(&self, container: &Container) -> Result<Trace, ExecError> {
        self.seen.lock().unwrap().push(container.name.clone());
        if self.skip.contains(&container.name) {
            Ok(Trace::Skip)
        } else {
            Ok(Trace::Run)
        }
    }
}

/// A spec with one plain container per name
pub fn spec(names: &[&str], program: impl Into<Node>) -> Spec {
    Spec {
        containers: names
            .iter()
            .map(|name| Container::new(*name, "alpine:latest"))
            .collect(),
        program: program.into(),
        ..Default::default()
    }
}

/// Drain a run's pipe while waiting for it to finish
pub async fn collect(handle: RunHandle) -> (Result<(), ExecError>, Vec<Line>) {
    let pipe = handle.pipe();
    let reader = tokio::spawn(async move {
        let mut lines = Vec::new();
        while let Some(line) = pipe.next().await {
            lines.push(line);
        }
        lines
    });
    let result = handle.wait().await;
    let lines = reader.await.unwrap_or_default();
    (result, lines)
}

/// Run a spec to completion without cancellation
pub async fn run(spec: Spec, engine: Arc<MockEngine>) -> (Result<(), ExecError>, Vec<Line>) {
    run_until(spec, engine, std::future::pending()).await
}

pub async fn run_until<F>(spec: Spec, engine: Arc<MockEngine>, signal: F) -> (Result<(), ExecError>, Vec<Line>)
where
    F: Future<Output = ()> + Send + 'static,
{
    let handle = Runner::new(spec, engine).run(signal).expect("valid spec");
    collect(handle).await
}
