#[derive(thiserror::Error, Debug)]
pub enum Error {
  #[error("Failed to parse config: {0}")]
  ConfigError(String),

  #[error("Error while running: {0}")]
  InternalRuntimeError(String),

  #[error("Failed with exit code: {0:?}")]
  Failed(i32),

  #[error("Error: {0}")]
  Error(String),

  #[error("IO error: {0}")]
  IOError(#[from] std::io::Error),

  #[error("Failed to initialize: {0}")]
  InitError(String),

  #[error("Unsupported feature: {0}")]
  UnsupportedFeature(String),
}

impl Error {
  pub fn config_error<T: ToString>(message: T) -> Self {
    Self::ConfigError(message.to_string())
  }

  pub fn internal_runtime_error<T: ToString>(message: T) -> Self {
    Self::InternalRuntimeError(message.to_string())
  }

  pub fn io_error(source: std::io::Error) -> Self {
    Self::IOError(source)
  }

  pub fn failed(exit_code: i32) -> Self {
    Self::Failed(exit_code)
  }

  pub fn unsupported_feature<T: ToString>(message: T) -> Self {
    Self::UnsupportedFeature(message.to_string())
  }

  pub fn init_error<T: ToString>(message: T) -> Self {
    Self::InitError(message.to_string())
  }

  pub fn error<T: ToString>(message: T) -> Self {
    Self::Error(message.to_string())
  }

  /// Process exit code a caller should surface for this error.
  pub fn exit_code(&self) -> i32 {
    match self {
      Self::Failed(code) if *code != 0 => *code,
      _ => 1,
    }
  }
}

// implement Eq and PartialEq for Error so that we can compare errors in tests
impl PartialEq for Error {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Self::ConfigError(a), Self::ConfigError(b)) => a == b,
      (Self::InternalRuntimeError(a), Self::InternalRuntimeError(b)) => a == b,
      (Self::Failed(a), Self::Failed(b)) => a == b,
      (Self::IOError(a), Self::IOError(b)) => a.kind() == b.kind(),
      (Self::Error(a), Self::Error(b)) => a == b,
      (Self::InitError(a), Self::InitError(b)) => a == b,
      (Self::UnsupportedFeature(a), Self::UnsupportedFeature(b)) => a == b,
      _ => false,
    }
  }
}
