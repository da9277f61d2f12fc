use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// What a model invocation was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationKind {
    Document,
    Clinical,
    Chat,
}

impl fmt::Display for InvocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InvocationKind::Document => "DOCUMENT",
            InvocationKind::Clinical => "CLINICAL",
            InvocationKind::Chat => "CHAT",
        };
        f.write_str(label)
    }
}

/// Running counts of outbound model calls, shared across requests.
#[derive(Clone)]
pub struct RequestCounter {
    document_count: Arc<AtomicU64>,
    clinical_count: Arc<AtomicU64>,
    chat_count: Arc<AtomicU64>,
    started: Instant,
}

impl RequestCounter {
    pub fn new() -> Self {
        Self {
            document_count: Arc::new(AtomicU64::new(0)),
            clinical_count: Arc::new(AtomicU64::new(0)),
            chat_count: Arc::new(AtomicU64::new(0)),
            started: Instant::now(),
        }
    }

    pub fn log_request(&self, kind: InvocationKind, model: &str) -> u64 {
        let count = self.counter(kind).fetch_add(1, Ordering::SeqCst) + 1;

        tracing::info!(
            "MODEL REQUEST #{} | Type: {} | Model: {} | Elapsed: {}s | Documents: {} | Clinical: {} | Chat: {} | Rate: {:.2} req/min",
            self.total_requests(),
            kind,
            model,
            self.elapsed_seconds(),
            self.count(InvocationKind::Document),
            self.count(InvocationKind::Clinical),
            self.count(InvocationKind::Chat),
            self.request_rate()
        );

        count
    }

    pub fn count(&self, kind: InvocationKind) -> u64 {
        self.counter(kind).load(Ordering::SeqCst)
    }

    pub fn total_requests(&self) -> u64 {
        self.count(InvocationKind::Document)
            + self.count(InvocationKind::Clinical)
            + self.count(InvocationKind::Chat)
    }

    fn counter(&self, kind: InvocationKind) -> &AtomicU64 {
        match kind {
            InvocationKind::Document => self.document_count.as_ref(),
            InvocationKind::Clinical => self.clinical_count.as_ref(),
            InvocationKind::Chat => self.chat_count.as_ref(),
        }
    }

    fn elapsed_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    fn request_rate(&self) -> f64 {
        let elapsed = self.started.elapsed().as_secs_f64();
        if elapsed < 1.0 {
            return 0.0;
        }
        (self.total_requests() as f64 / elapsed) * 60.0
    }

    pub fn print_summary(&self) {
        tracing::info!(
            "MODEL SUMMARY | Total: {} requests | Documents: {} | Clinical: {} | Chat: {} | Elapsed: {}s | Avg Rate: {:.2} req/min",
            self.total_requests(),
            self.count(InvocationKind::Document),
            self.count(InvocationKind::Clinical),
            self.count(InvocationKind::Chat),
            self.elapsed_seconds(),
            self.request_rate()
        );
    }
}

impl Default for RequestCounter {
    fn default() -> Self {
        Self::new()
    }
}
