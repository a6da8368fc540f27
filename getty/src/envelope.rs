//! Tagged result returned across the component boundary.
//!
//! ```json
//! {"success": true, "data": {...}}
//! {"success": false, "error": {"code": 409, "message": "already following", "param": "", "type": "conflict_error"}}
//! ```

use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};

use crate::errors::{ErrorKind, RepoError};

#[derive(Debug, Clone, PartialEq)]
pub enum Envelope<T> {
    Success(T),
    Failure(ErrorBody),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: i32,
    pub message: String,
    pub param: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ErrorBody {
    pub fn new(code: i32, message: impl Into<String>, param: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            param: param.into(),
            kind: kind.into(),
        }
    }

    pub fn from_kind(kind: ErrorKind, message: impl Into<String>, param: impl Into<String>) -> Self {
        Self::new(kind.code(), message, param, kind.as_str())
    }
}

impl From<&RepoError> for ErrorBody {
    fn from(err: &RepoError) -> Self {
        Self::from_kind(err.kind(), err.message(), err.param())
    }
}

impl<T> Envelope<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Success(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Envelope::Success(data) => Some(data),
            Envelope::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorBody> {
        match self {
            Envelope::Success(_) => None,
            Envelope::Failure(error) => Some(error),
        }
    }

    pub fn into_result(self) -> Result<T, ErrorBody> {
        match self {
            Envelope::Success(data) => Ok(data),
            Envelope::Failure(error) => Err(error),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        match self {
            Envelope::Success(data) => Envelope::Success(f(data)),
            Envelope::Failure(error) => Envelope::Failure(error),
        }
    }
}

impl<T> From<Result<T, RepoError>> for Envelope<T> {
    fn from(result: Result<T, RepoError>) -> Self {
        match result {
            Ok(data) => Envelope::Success(data),
            Err(err) => Envelope::Failure(ErrorBody::from(&err)),
        }
    }
}

impl<T: Serialize> Serialize for Envelope<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        match self {
            Envelope::Success(data) => {
                map.serialize_entry("success", &true)?;
                map.serialize_entry("data", data)?;
            }
            Envelope::Failure(error) => {
                map.serialize_entry("success", &false)?;
                map.serialize_entry("error", error)?;
            }
        }
        map.end()
    }
}
