use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::firestore::query::FieldFilter;
use crate::firestore::snapshot::DocumentSnapshot;

pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_PAGE_SIZE: u32 = 500;
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(1_000);

/// Callback invoked before each retry sleep with the operation label and the
/// 1-based attempt number that failed.
pub type RetryObserver = Arc<dyn Fn(&str, u32) + Send + Sync + 'static>;

/// Predicate deciding whether an existing document's fields are exported.
pub type DocumentFilter = Arc<dyn Fn(&DocumentSnapshot) -> bool + Send + Sync + 'static>;

/// Fixed-interval retry policy for `DeadlineExceeded` failures.
///
/// There is no attempt ceiling: a call is retried until it succeeds or fails
/// with a different error.
#[derive(Clone)]
pub struct RetrySettings {
    pub interval: Duration,
    pub logs: bool,
    pub on_retry: Option<RetryObserver>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_RETRY_INTERVAL,
            logs: false,
            on_retry: None,
        }
    }
}

impl RetrySettings {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_logs(mut self, logs: bool) -> Self {
        self.logs = logs;
        self
    }

    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&str, u32) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(observer));
        self
    }
}

impl fmt::Debug for RetrySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrySettings")
            .field("interval", &self.interval)
            .field("logs", &self.logs)
            .field("on_retry", &self.on_retry.is_some())
            .finish()
    }
}

/// Settings that choose between full listing and filtered pagination.
#[derive(Clone, Debug)]
pub struct ListingOptions {
    pub where_clauses: Vec<FieldFilter>,
    pub where_paths: Vec<String>,
    pub page_size: u32,
}

impl Default for ListingOptions {
    fn default() -> Self {
        Self {
            where_clauses: Vec::new(),
            where_paths: Vec::new(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Configuration of an export run.
#[derive(Clone)]
pub struct ExportOptions {
    pub logs: bool,
    pub doc_filter: Option<DocumentFilter>,
    pub listing: ListingOptions,
    pub batch_size: usize,
    pub retry: RetrySettings,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            logs: false,
            doc_filter: None,
            listing: ListingOptions::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            retry: RetrySettings::default(),
        }
    }
}

impl ExportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turns on progress logging, for both traversal and retries.
    pub fn with_logs(mut self, logs: bool) -> Self {
        self.logs = logs;
        self.retry.logs = logs;
        self
    }

    pub fn with_doc_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&DocumentSnapshot) -> bool + Send + Sync + 'static,
    {
        self.doc_filter = Some(Arc::new(filter));
        self
    }

    pub fn with_where_clauses(mut self, clauses: Vec<FieldFilter>) -> Self {
        self.listing.where_clauses = clauses;
        self
    }

    pub fn with_where_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.listing.where_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.listing.page_size = page_size;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_retry_settings(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }

    pub(crate) fn accepts(&self, snapshot: &DocumentSnapshot) -> bool {
        self.doc_filter
            .as_ref()
            .map_or(true, |filter| filter(snapshot))
    }
}

impl fmt::Debug for ExportOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportOptions")
            .field("logs", &self.logs)
            .field("doc_filter", &self.doc_filter.is_some())
            .field("listing", &self.listing)
            .field("batch_size", &self.batch_size)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Configuration of an import run.
#[derive(Clone, Debug)]
pub struct ImportOptions {
    pub logs: bool,
    pub merge_with_existing: bool,
    /// When `false` only the top-level record is written and nested
    /// `__collections__` are ignored.
    pub recursive: bool,
    pub batch_size: usize,
    pub retry: RetrySettings,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            logs: false,
            merge_with_existing: true,
            recursive: true,
            batch_size: DEFAULT_BATCH_SIZE,
            retry: RetrySettings::default(),
        }
    }
}

impl ImportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_logs(mut self, logs: bool) -> Self {
        self.logs = logs;
        self.retry.logs = logs;
        self
    }

    pub fn with_merge(mut self, merge_with_existing: bool) -> Self {
        self.merge_with_existing = merge_with_existing;
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_retry_settings(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }
}
