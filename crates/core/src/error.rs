use thiserror::Error;

/// Errors produced while decoding wire payloads into domain types.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DecodeError {
    #[error("malformed {context}: {source}")]
    Json {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected shape for {context}")]
    UnexpectedShape { context: &'static str },
}

impl DecodeError {
    #[must_use]
    pub fn json(context: &'static str, source: serde_json::Error) -> Self {
        Self::Json { context, source }
    }
}
