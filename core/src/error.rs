use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Tool '{0}' is already registered")]
    DuplicateTool(String),
}

/// Failure talking to one of the hosted services (completion, embeddings,
/// memory store, speech).
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error("{service} request failed transiently: {message}")]
    Transient {
        service: &'static str,
        message: String,
    },

    #[error("{service} API error ({status}): {message}")]
    Status {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("{service} request could not be sent: {message}")]
    Request {
        service: &'static str,
        message: String,
    },

    #[error("{service} returned an unreadable response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },
}

impl ServiceError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Timeouts and connection failures are retryable; malformed requests are not.
    pub fn from_reqwest(service: &'static str, err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode {
                service,
                message: err.to_string(),
            }
        } else if err.is_builder() {
            Self::Request {
                service,
                message: err.to_string(),
            }
        } else {
            Self::Transient {
                service,
                message: err.to_string(),
            }
        }
    }

    /// 429 and 5xx are treated as transient.
    pub fn from_status(service: &'static str, status: reqwest::StatusCode, body: String) -> Self {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            Self::Transient {
                service,
                message: format!("HTTP {}: {}", status.as_u16(), body),
            }
        } else {
            Self::Status {
                service,
                status: status.as_u16(),
                message: body,
            }
        }
    }
}

pub fn is_transient(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ServiceError>()
        .is_some_and(ServiceError::is_transient)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No API key found for provider '{provider}'. Set {vars} or add api_key to the config file")]
    MissingKey { provider: String, vars: String },

    #[error("Unknown provider: {0}. Available: groq, openai, openrouter")]
    UnknownProvider(String),
}
