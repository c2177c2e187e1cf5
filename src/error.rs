use thiserror::Error;

/// Ways a single exchange can fail. Each one is absorbed by the exchange and
/// turned into the text shown in the chat panel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    /// Transport error or non-success HTTP status
    #[error("{0}")]
    RequestFailure(String),

    /// Success status but `candidates[0].content.parts[0].text` is missing
    #[error("No valid response from the API")]
    MalformedResponse,

    /// The reply text (or its code block) was empty
    #[error("No output returned")]
    EmptyExtraction,
}

impl ExchangeError {
    /// Text shown in place of a response
    pub fn user_message(&self) -> String {
        match self {
            Self::RequestFailure(reason) => format!("Error: {}", reason),
            other => other.to_string(),
        }
    }
}
