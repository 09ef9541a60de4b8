/// Process-level error with a stable exit code.
///
/// Exit-code convention:
///
/// - `2`: the source CSV is unavailable, its schema is malformed, or the
///   requested filters are invalid
/// - `3`: the source loaded but zero observations survived normalization
/// - `4`: runtime failures (exports, terminal IO)
///
/// An empty *query* result is not an error: it is an expected outcome of
/// interactive filtering and is signaled as a plain value (see
/// `app::pipeline::run_query`).
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    /// No readable dataset at any known location, or a broken schema.
    pub fn source_unavailable(message: impl Into<String>) -> Self {
        Self::new(2, message)
    }

    /// The source was readable but no rows survived normalization.
    pub fn empty_dataset(message: impl Into<String>) -> Self {
        Self::new(3, message)
    }

    /// Export or terminal IO failure.
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(4, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
