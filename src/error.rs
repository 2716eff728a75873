use crate::vocab::FacilityKind;
use std::time::Duration;
use thiserror::Error;

/// Failure of an external collaborator (store, similarity responder).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("collaborator did not answer within {0:?}")]
    Timeout(Duration),

    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("malformed collaborator response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SearchError {
    /// The facility table has none of the known neighborhood columns, so
    /// rows cannot be located at all. Distinct from "no row matched".
    #[error("no neighborhood column in {kind} records")]
    NoNeighborhoodColumn { kind: FacilityKind },

    #[error(transparent)]
    Store(#[from] CollaboratorError),
}

/// A stored record lacks a field the engine reads, or holds junk in it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DataShapeError {
    #[error("record `{record}` has no `{field}` field")]
    MissingField { record: String, field: String },

    #[error("record `{record}` field `{field}` holds unusable value `{value}`")]
    InvalidValue {
        record: String,
        field: String,
        value: String,
    },
}
