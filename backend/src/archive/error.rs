//! Error types for archive queries.
//!
//! Every failure raised while talking to an archive carries an [`ErrorContext`]
//! naming the query that produced it, so a failed sub-interval can be traced
//! back to its time window without extra logging at the call site.

use std::fmt;

/// Result type for archive operations
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Structured context for archive errors.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation being performed (e.g., "search", "fetch_image")
    pub operation: Option<String>,
    /// Instrument the query was filtered on
    pub instrument: Option<String>,
    /// Time window of the query, already formatted
    pub interval: Option<String>,
    /// Additional details about the error
    pub details: Option<String>,
    /// Whether this error is retryable
    pub retryable: bool,
}

impl ErrorContext {
    /// Create a new error context with an operation name.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    /// Set the instrument.
    pub fn with_instrument(mut self, instrument: impl Into<String>) -> Self {
        self.instrument = Some(instrument.into());
        self
    }

    /// Set the queried interval.
    pub fn with_interval(mut self, interval: impl ToString) -> Self {
        self.interval = Some(interval.to_string());
        self
    }

    /// Set additional details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Mark this error as retryable.
    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref op) = self.operation {
            parts.push(format!("operation={}", op));
        }
        if let Some(ref instrument) = self.instrument {
            parts.push(format!("instrument={}", instrument));
        }
        if let Some(ref interval) = self.interval {
            parts.push(format!("interval={}", interval));
        }
        if let Some(ref details) = self.details {
            parts.push(format!("details={}", details));
        }
        if self.retryable {
            parts.push("retryable=true".to_string());
        }
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Error type for archive operations
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// Transport-level failures (DNS, refused connection, reset).
    /// These are typically transient and may be retried.
    #[error("Connection error: {message} {context}")]
    ConnectionError {
        message: String,
        context: ErrorContext,
    },

    /// The archive answered but rejected or failed the query.
    #[error("Query error: {message} {context}")]
    QueryError {
        message: String,
        context: ErrorContext,
    },

    /// Requested resource does not exist.
    #[error("Not found: {message} {context}")]
    NotFound {
        message: String,
        context: ErrorContext,
    },

    /// The archive answered with a body that could not be understood.
    #[error("Response error: {message} {context}")]
    ResponseError {
        message: String,
        context: ErrorContext,
    },

    /// Configuration or client initialization error.
    #[error("Configuration error: {message} {context}")]
    ConfigurationError {
        message: String,
        context: ErrorContext,
    },

    /// Timeout waiting for the archive.
    #[error("Timeout error: {message} {context}")]
    TimeoutError {
        message: String,
        context: ErrorContext,
    },
}

impl ArchiveError {
    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::ConnectionError {
            message: message.into(),
            context: ErrorContext::default().retryable(),
        }
    }

    /// Create a connection error with full context.
    pub fn connection_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::ConnectionError {
            message: message.into(),
            context: context.retryable(),
        }
    }

    /// Create a query error.
    pub fn query(message: impl Into<String>) -> Self {
        Self::QueryError {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a query error with context.
    pub fn query_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::QueryError {
            message: message.into(),
            context,
        }
    }

    /// Create a not found error with context.
    pub fn not_found_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::NotFound {
            message: message.into(),
            context,
        }
    }

    /// Create a response error.
    pub fn response(message: impl Into<String>) -> Self {
        Self::ResponseError {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::TimeoutError {
            message: message.into(),
            context: ErrorContext::default().retryable(),
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        self.context().retryable
    }

    /// Get the error context.
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::ConnectionError { context, .. }
            | Self::QueryError { context, .. }
            | Self::NotFound { context, .. }
            | Self::ResponseError { context, .. }
            | Self::ConfigurationError { context, .. }
            | Self::TimeoutError { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::ConnectionError { context, .. }
            | Self::QueryError { context, .. }
            | Self::NotFound { context, .. }
            | Self::ResponseError { context, .. }
            | Self::ConfigurationError { context, .. }
            | Self::TimeoutError { context, .. } => context,
        }
    }

    /// Add or update the operation in the error context.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    /// Replace the error context, keeping the retryable flag if it was already set.
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        let retryable = self.is_retryable() || context.retryable;
        let slot = self.context_mut();
        *slot = context;
        slot.retryable = retryable;
        self
    }
}

impl From<reqwest::Error> for ArchiveError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return ArchiveError::timeout(err.to_string());
        }
        if err.is_decode() {
            return ArchiveError::response(err.to_string());
        }
        if err.is_builder() {
            return ArchiveError::configuration(err.to_string());
        }
        if let Some(status) = err.status() {
            let context = ErrorContext::default().with_details(format!("status={}", status));
            let context = if status.is_server_error() || status.as_u16() == 429 {
                context.retryable()
            } else {
                context
            };
            return ArchiveError::QueryError {
                message: err.to_string(),
                context,
            };
        }
        ArchiveError::connection(err.to_string())
    }
}
