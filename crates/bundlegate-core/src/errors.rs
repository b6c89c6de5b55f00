use bundlegate_core_types::RequestId;

/// Result type alias using GwError
pub type Result<T> = std::result::Result<T, GwError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// The first five kinds form the gateway boundary contract: every error a
/// caller sees from `insert`, `query`, `open`, `delete`, `update` or
/// `get_type` carries one of them. The remaining kinds are produced below
/// the boundary (store client, codecs, staging) and are re-wrapped before
/// they leave a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GwErrorKind {
    // Boundary contract
    InvalidInput,
    UnsupportedOperation,
    PermissionDenied,
    NotFound,
    OperationFailed,

    // Below the boundary
    Io,
    Serialization,
    /// The external store process failed, or produced output we could not trust
    ExternalService,
    Internal,
}

impl GwErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            GwErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            GwErrorKind::UnsupportedOperation => "ERR_UNSUPPORTED_OPERATION",
            GwErrorKind::PermissionDenied => "ERR_PERMISSION_DENIED",
            GwErrorKind::NotFound => "ERR_NOT_FOUND",
            GwErrorKind::OperationFailed => "ERR_OPERATION_FAILED",
            GwErrorKind::Io => "ERR_IO",
            GwErrorKind::Serialization => "ERR_SERIALIZATION",
            GwErrorKind::ExternalService => "ERR_EXTERNAL_SERVICE",
            GwErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Whether this kind may be returned across the gateway boundary as-is
    pub fn is_boundary(&self) -> bool {
        matches!(
            self,
            GwErrorKind::InvalidInput
                | GwErrorKind::UnsupportedOperation
                | GwErrorKind::PermissionDenied
                | GwErrorKind::NotFound
                | GwErrorKind::OperationFailed
        )
    }
}

/// Canonical structured error type
///
/// Carries a classification for programmatic handling plus enough context
/// (operation, bundle id, request id, cause chain) to diagnose a failure
/// after it has been collapsed into one of the boundary kinds.
#[derive(Debug, Clone)]
pub struct GwError {
    kind: GwErrorKind,
    op: Option<String>,
    bundle_id: Option<String>,
    request_id: Option<RequestId>,
    message: String,
    source: Option<Box<GwError>>,
}

impl GwError {
    /// Create a new error with the specified kind
    pub fn new(kind: GwErrorKind) -> Self {
        Self {
            kind,
            op: None,
            bundle_id: None,
            request_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Re-classify `source` under `kind`, keeping its message and chaining it as the cause
    pub fn wrap(kind: GwErrorKind, source: GwError) -> Self {
        Self::new(kind)
            .with_message(source.message.clone())
            .with_source(source)
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add bundle id context
    pub fn with_bundle_id(mut self, id: impl Into<String>) -> Self {
        self.bundle_id = Some(id.into());
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: GwError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> GwErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the bundle id context, if any
    pub fn bundle_id(&self) -> Option<&str> {
        self.bundle_id.as_deref()
    }

    /// Get the request ID context, if any
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&GwError> {
        self.source.as_deref()
    }

    /// Innermost error in the cause chain (self when there is no source)
    pub fn root_cause(&self) -> &GwError {
        let mut current = self;
        while let Some(next) = current.source_error() {
            current = next;
        }
        current
    }
}

impl std::fmt::Display for GwError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(bundle_id) = &self.bundle_id {
            write!(f, " (bundle_id: {})", bundle_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for GwError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|s| s as &(dyn std::error::Error + 'static))
    }
}

impl From<serde_json::Error> for GwError {
    fn from(err: serde_json::Error) -> Self {
        GwError::new(GwErrorKind::Serialization).with_message(err.to_string())
    }
}

// ========== End Error Facility ==========

/// Create an IO error tagged with the failing operation
pub fn io_error(op: &str, err: std::io::Error) -> GwError {
    GwError::new(GwErrorKind::Io)
        .with_op(op.to_string())
        .with_message(err.to_string())
}

/// Create an unsupported-operation error
pub fn unsupported(op: &str) -> GwError {
    GwError::new(GwErrorKind::UnsupportedOperation)
        .with_op(op.to_string())
        .with_message("Not implemented")
}
