/// Errors raised when a rule fails write-time validation.
///
/// Every variant names the offending field so API callers can surface
/// a precise message. A rule that fails validation is never partially
/// applied and never reaches the evaluator.
///
/// # Examples
///
/// ```
/// use verdant_rules::ValidationError;
///
/// let err = ValidationError::NegativeMargin { margin: -1.5 };
/// assert!(err.to_string().contains("warning_margin"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// `id` is empty.
    #[error("rule field 'id' must not be empty")]
    EmptyId,

    /// `name` is empty.
    #[error("rule field 'name' must not be empty")]
    EmptyName,

    /// `warning_margin` is negative.
    #[error("rule field 'warning_margin' must be >= 0, got {margin}")]
    NegativeMargin { margin: f64 },

    /// `warning_margin` was supplied on a `between` rule, which has no
    /// preventive band.
    #[error("rule field 'warning_margin' is not supported for 'between' conditions")]
    MarginOnRange,

    /// A threshold, bound, margin, or target value is NaN or infinite.
    #[error("rule field '{field}' must be a finite number")]
    NonFiniteNumber { field: &'static str },

    /// `between` bounds are inverted.
    #[error("rule field 'condition': 'between' requires low <= high, got [{low}, {high}]")]
    InvertedRange { low: f64, high: f64 },

    /// `actions` is empty.
    #[error("rule field 'actions' must contain at least one action")]
    NoActions,

    /// An action carries an empty command string.
    #[error("rule field 'actions[{index}].command' must not be empty")]
    EmptyCommand { index: usize },

    /// A rule with this id already exists (create only; `replace` upserts).
    #[error("rule field 'id': a rule with id '{id}' already exists")]
    DuplicateId { id: String },

    /// The referenced rule does not exist.
    #[error("rule field 'id': no rule with id '{id}'")]
    UnknownRule { id: String },
}
