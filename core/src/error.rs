// storefront/src/error.rs
use anyhow::Error as AnyhowError;
use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised by the step engine itself rather than by business logic.
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Step not found: {step_name}")]
  StepNotFound { step_name: String },

  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("Error in step handler or external operation. Source: {source}")]
  HandlerError {
    #[source]
    source: AnyhowError,
  },

  #[error("Internal flow error: {0}")]
  Internal(String),
}

impl From<AnyhowError> for FlowError {
  fn from(err: AnyhowError) -> Self {
    FlowError::HandlerError { source: err }
  }
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;

/// Failures talking to the REST backend.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("HTTP transport failed for {path}: {source}")]
  Transport {
    path: String,
    #[source]
    source: reqwest::Error,
  },

  #[error("Request to {path} timed out after {seconds}s")]
  Timeout { path: String, seconds: u64 },

  #[error("{path} returned {status}: {body}")]
  Status {
    path: String,
    status: StatusCode,
    body: String,
  },

  #[error("Could not decode response from {path}: {message}")]
  Decode { path: String, message: String },

  #[error("Invalid request URL '{0}'")]
  Url(String),
}

impl ApiError {
  /// True for failures worth retrying: transport errors, timeouts and 5xx.
  pub fn is_transient(&self) -> bool {
    match self {
      ApiError::Transport { .. } | ApiError::Timeout { .. } => true,
      ApiError::Status { status, .. } => status.is_server_error(),
      ApiError::Decode { .. } | ApiError::Url(_) => false,
    }
  }

  pub fn is_unauthorized(&self) -> bool {
    matches!(
      self,
      ApiError::Status { status, .. } if *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN
    )
  }

  pub fn status(&self) -> Option<StatusCode> {
    match self {
      ApiError::Status { status, .. } => Some(*status),
      _ => None,
    }
  }
}

/// Application-level error returned by the public storefront API.
///
/// Failures the user can reach during checkout (declines, cancellations,
/// blocked widget script, unrecorded orders) are *not* represented here;
/// they are terminal [`crate::checkout::CheckoutOutcome`] values.
#[derive(Debug, Error)]
pub enum StorefrontError {
  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("API Error: {0}")]
  Api(#[from] ApiError),

  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Quantity {requested} is outside the allowed range 1..={max}")]
  QuantityOutOfRange { requested: u32, max: u32 },

  #[error("A checkout for product {product_id} is already being submitted")]
  CheckoutInProgress { product_id: String },

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Flow Error: {source}")]
  Flow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Error: {0}")]
  Internal(String),
}

impl From<AnyhowError> for StorefrontError {
  fn from(err: AnyhowError) -> Self {
    StorefrontError::Internal(err.to_string())
  }
}

pub type Result<T, E = StorefrontError> = std::result::Result<T, E>;
