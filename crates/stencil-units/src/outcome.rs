//! Tagged result returned at the caller boundary
//!
//! Serialized as `{"ok": true, "data": ...}` or
//! `{"ok": false, "error": {"kind": ..., "message": ...}}`.

use crate::error::{ErrorKind, UnitError, UnitResult};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// Failure half of an [`Outcome`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&UnitError> for OutcomeError {
    fn from(error: &UnitError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl std::fmt::Display for OutcomeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl std::error::Error for OutcomeError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Ok(T),
    Err(OutcomeError),
}

impl<T> Outcome<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Outcome::Ok(data) => Some(data),
            Outcome::Err(_) => None,
        }
    }

    pub fn error(&self) -> Option<&OutcomeError> {
        match self {
            Outcome::Ok(_) => None,
            Outcome::Err(error) => Some(error),
        }
    }

    pub fn into_result(self) -> Result<T, OutcomeError> {
        match self {
            Outcome::Ok(data) => Ok(data),
            Outcome::Err(error) => Err(error),
        }
    }
}

impl<T> From<UnitResult<T>> for Outcome<T> {
    fn from(result: UnitResult<T>) -> Self {
        match result {
            Ok(data) => Outcome::Ok(data),
            Err(error) => Outcome::Err(OutcomeError::from(&error)),
        }
    }
}

impl<T: Serialize> Serialize for Outcome<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Outcome", 2)?;
        match self {
            Outcome::Ok(data) => {
                state.serialize_field("ok", &true)?;
                state.serialize_field("data", data)?;
            }
            Outcome::Err(error) => {
                state.serialize_field("ok", &false)?;
                state.serialize_field("error", error)?;
            }
        }
        state.end()
    }
}
