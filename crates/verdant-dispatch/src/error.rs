/// Errors raised inside the dispatch subsystem.
///
/// Delivery failures are logged and counted, never fatal, and never
/// retried automatically; they surface to operators only through the
/// escalation engine's observability snapshot.
///
/// # Examples
///
/// ```
/// use verdant_dispatch::DispatchError;
///
/// let err = DispatchError::InvalidConfig("missing smtp_host".to_string());
/// assert!(err.to_string().contains("smtp_host"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Channel configuration is missing a required field or contains an
    /// invalid value.
    #[error("dispatch: invalid channel configuration: {0}")]
    InvalidConfig(String),

    /// The channel type is not registered in the plugin registry.
    #[error("dispatch: unknown channel type '{0}'")]
    UnknownChannelType(String),

    /// A channel config blob failed to deserialize.
    #[error("dispatch: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An external call exceeded its bounded timeout.
    #[error("dispatch: call to {target} timed out after {secs}s")]
    Timeout { target: String, secs: u64 },
}

/// Convenience `Result` alias for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;
