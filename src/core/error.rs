use super::validated::InputErrors;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OdbError {
    #[error("{0}")]
    Input(InputErrors),

    #[error("{kind} {id} does not exist")]
    MissingReference { kind: String, id: String },

    #[error("{}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Aggregate(Vec<OdbError>),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

pub type Result<T> = std::result::Result<T, OdbError>;

impl OdbError {
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input(InputErrors::single(message))
    }

    pub fn missing(kind: impl std::fmt::Display, id: impl std::fmt::Display) -> Self {
        Self::MissingReference {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }

    /// Merges two failures into one, keeping declaration order.
    ///
    /// Adjacent input errors collapse into a single `Input`, and a failure
    /// already present is not repeated, so a bulk request whose candidates
    /// hit the same missing reference reports it once.
    pub fn combine(self, other: OdbError) -> OdbError {
        let mut all = Vec::new();
        push_flat(&mut all, self);
        push_flat(&mut all, other);
        if all.len() == 1 {
            all.remove(0)
        } else {
            OdbError::Aggregate(all)
        }
    }

    /// Attributes input errors to an entity by prefixing their messages.
    /// Reference errors already name what is missing and are left alone.
    pub fn prefixed(self, prefix: impl std::fmt::Display) -> OdbError {
        let prefix = prefix.to_string();
        match self {
            OdbError::Input(errors) => OdbError::Input(errors.prefixed(&prefix)),
            OdbError::Aggregate(all) => {
                OdbError::Aggregate(all.into_iter().map(|e| e.prefixed(&prefix)).collect())
            }
            other => other,
        }
    }

    /// Folds a list of failures into one, `None` when the list is empty.
    pub fn combine_all(errors: impl IntoIterator<Item = OdbError>) -> Option<OdbError> {
        errors.into_iter().reduce(OdbError::combine)
    }

    /// Human readable messages, never empty.
    pub fn messages(&self) -> Vec<String> {
        match self {
            OdbError::Input(errors) => errors.messages().to_vec(),
            OdbError::Aggregate(all) => all.iter().flat_map(|e| e.messages()).collect(),
            other => vec![other.to_string()],
        }
    }

    pub fn is_missing_reference(&self) -> bool {
        match self {
            OdbError::MissingReference { .. } => true,
            OdbError::Aggregate(all) => all.iter().any(|e| e.is_missing_reference()),
            _ => false,
        }
    }

    pub fn is_input(&self) -> bool {
        matches!(self, OdbError::Input(_))
    }
}

// Keeps an aggregate flat, merges neighbouring input errors and drops repeats.
fn push_flat(all: &mut Vec<OdbError>, e: OdbError) {
    match e {
        OdbError::Aggregate(inner) => {
            for x in inner {
                push_flat(all, x);
            }
        }
        OdbError::Input(b) => match all.pop() {
            Some(OdbError::Input(a)) => all.push(OdbError::Input(a.concat(b))),
            Some(prev) => {
                all.push(prev);
                all.push(OdbError::Input(b));
            }
            None => all.push(OdbError::Input(b)),
        },
        other => {
            if !all.contains(&other) {
                all.push(other);
            }
        }
    }
}

impl From<InputErrors> for OdbError {
    fn from(errors: InputErrors) -> Self {
        Self::Input(errors)
    }
}

impl<T> From<std::sync::PoisonError<T>> for OdbError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}
