use std::fmt;

use tracing_error::SpanTrace;

/// The fallible seams of the registry core. Mutators themselves report
/// success/failure as `bool` per spec §7 — a missing lease is an expected
/// outcome, not an error. `ErrorType` covers the surrounding seams: bad
/// configuration at construction time, and remote-region calls that can
/// genuinely fail (network, deserialization) rather than just come back
/// empty.
#[derive(Debug, thiserror::Error)]
pub enum ErrorType {
    #[error("invalid registry configuration: {0}")]
    InvalidConfig(String),

    #[error("remote region `{region}` request failed")]
    RemoteRegion {
        region: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

/// Wraps an [`ErrorType`] with the span trace active when it was raised, so
/// logs can show the call path without every layer needing its own
/// `#[instrument]` annotation.
pub struct Error {
    pub variant: ErrorType,
    pub span_trace: SpanTrace,
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.variant)
    }
}

impl Error {
    #[must_use]
    pub fn new(variant: ErrorType) -> Self {
        Self {
            variant,
            span_trace: SpanTrace::capture(),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:?}", self.variant)?;
        writeln!(f, "{}", self.span_trace)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.variant)
    }
}

impl From<ErrorType> for Error {
    fn from(variant: ErrorType) -> Self {
        Error::new(variant)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
