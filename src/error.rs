use std::fmt::{Display, Formatter};
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Shown when a draft or edit is submitted with an empty name or email
pub const REQUIRED_FIELDS_MESSAGE: &str = "Name and email are required";

/// The body of a failed response, as far as it could be understood
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorBody {
    /// A plain string, either raw text or a json string
    Text(String),
    /// Any other json value
    Json(Value),
}

impl ErrorBody {

    /// Classifies a raw response body. Returns `None` only for a body without any bytes, \
    /// whitespace is kept as text
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }
        Some(match serde_json::from_str::<Value>(raw) {
            Ok(Value::String(text)) => Self::Text(text),
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(raw.to_string()),
        })
    }

    /// Picks the displayable part of the body, if there is one. \
    /// Objects (and arrays) yield their `message` field, or else their whole serialized form.
    fn describe(&self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text.clone()),
            Self::Json(value @ (Value::Object(_) | Value::Array(_))) => {
                let message = value.get("message").filter(|message| is_truthy(message));
                Some(match message {
                    Some(Value::String(message)) => message.clone(),
                    Some(message) => message.to_string(),
                    None => value.to_string(),
                })
            }
            // Numbers, bools and null carry nothing worth showing
            Self::Json(_) => None,
        }
    }

}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Everything that can go wrong talking to the users endpoint
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// The request never got a response (unreachable host, timeout, broken connection, ...)
    #[error("{message}")]
    Transport { message: String },
    /// The server answered with a non 2xx status
    #[error("Http failure response for {url}: {status}")]
    Status {
        url: Url,
        status: StatusCode,
        body: Option<ErrorBody>,
    },
    /// The server answered with 2xx, but the body was not what we expected
    #[error("Http failure during parsing for {url}")]
    Decode { url: Url, message: String },
}

impl ApiError {

    /// Builds a [`ApiError::Transport`] from an error, keeping its whole source chain
    pub fn transport(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            let cause_text = cause.to_string();
            if !message.contains(&cause_text) {
                message.push_str(": ");
                message.push_str(&cause_text);
            }
            source = cause.source();
        }
        Self::Transport { message }
    }

    /// Normalizes the error into a single human readable string. \
    /// Prefers what the server said, falls back to the generic transport message.
    pub fn describe(&self) -> String {
        let described = match self {
            Self::Transport { message } => message.clone(),
            Self::Status { body: Some(body), .. } => body.describe()
                .unwrap_or_else(|| self.to_string()),
            Self::Status { body: None, .. } | Self::Decode { .. } => self.to_string(),
        };
        if described.is_empty() {
            "Unknown error".to_string()
        } else {
            described
        }
    }

}

/// The commands that talk to the server, used to label their failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Load,
    Add,
    Update,
    Delete,
}

impl Operation {

    /// The prefix shown in front of a failure of this operation
    pub fn label(&self) -> &'static str {
        match self {
            Operation::Load => "Failed to load users",
            Operation::Add => "Failed to add user",
            Operation::Update => "Failed to update user",
            Operation::Delete => "Failed to delete user",
        }
    }

    /// Formats the message displayed, when this operation failed with `error`
    pub fn failure_message(&self, error: &ApiError) -> String {
        format!("{}: {}", self.label(), error.describe())
    }

}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
