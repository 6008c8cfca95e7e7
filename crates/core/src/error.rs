/// Errors from local input checks (file policy, parameter ranges).
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unsupported {kind} file type: {detail}")]
    UnsupportedType { kind: &'static str, detail: String },

    #[error("File too large: {size} bytes exceeds the {kind} limit of {limit} bytes")]
    TooLarge {
        kind: &'static str,
        size: u64,
        limit: u64,
    },
}
