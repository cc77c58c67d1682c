// ⚠️ Error taxonomy shared by every layer
//
// Parse      → malformed date / number typed by a user or read from a row
// NotFound   → a menu selection out of range, or a row that no longer exists
// Validation → a required field left empty

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not parse {what} from {input:?}: {reason}")]
    Parse {
        what: &'static str,
        input: String,
        reason: String,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn parse(what: &'static str, input: &str, reason: impl ToString) -> Self {
        Error::Parse {
            what,
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Error::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Error::Validation {
            field,
            message: message.into(),
        }
    }

    /// Errors a user can fix by typing something else
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::Parse { .. } | Error::NotFound { .. } | Error::Validation { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
