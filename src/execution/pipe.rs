//! Log pipe - a bounded queue of output lines with an explicit close

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};

/// Default number of lines buffered before writers wait
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Stdout,
    Stderr,
    ExitCode,
    Metadata,
    Progress,
}

/// One line of container output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    /// Alias of the container that produced the line
    pub proc: String,

    /// Seconds since the run started
    pub time: i64,

    #[serde(rename = "type")]
    pub kind: LineKind,

    /// Per-container sequence number
    pub pos: usize,

    pub out: String,
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:L{}:{}s] {}", self.proc, self.pos, self.time, self.out)
    }
}

struct Inner {
    tx: mpsc::Sender<Line>,
    rx: Mutex<mpsc::Receiver<Line>>,
    closed: watch::Sender<bool>,
}

/// Cloneable handle to a shared pipe
#[derive(Clone)]
pub struct Pipe {
    inner: Arc<Inner>,
}

impl Default for Pipe {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl fmt::Debug for Pipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipe").field("closed", &self.is_closed()).finish()
    }
}

/// Resolve once the flag is set or its sender is gone
pub(crate) async fn wait_until_set(mut rx: watch::Receiver<bool>) {
    loop {
        let closed = *rx.borrow_and_update();
        if closed || rx.changed().await.is_err() {
            return;
        }
    }
}

impl Pipe {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (closed, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                tx,
                rx: Mutex::new(rx),
                closed,
            }),
        }
    }

    /// Queue a line; returns false when the pipe is closed and the line was dropped
    pub async fn write(&self, line: Line) -> bool {
        if self.is_closed() {
            return false;
        }
        tokio::select! {
            sent = self.inner.tx.send(line) => sent.is_ok(),
            _ = wait_until_set(self.inner.closed.subscribe()) => false,
        }
    }

    /// Next line, waiting if none is buffered; `None` once closed and drained
    pub async fn next(&self) -> Option<Line> {
        let mut rx = self.inner.rx.lock().await;
        tokio::select! {
            biased;
            line = rx.recv() => line,
            _ = wait_until_set(self.inner.closed.subscribe()) => rx.try_recv().ok(),
        }
    }

    /// Close the pipe; later calls do nothing
    pub fn close(&self) {
        self.inner.closed.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.inner.closed.borrow()
    }
}
