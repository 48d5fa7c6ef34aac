//! Error taxonomy of the indexing pipeline and the query engine.

use thiserror::Error;

use crate::content::RepositoryError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum IndexError {
    /// A configured extraction rule failed for one item. Recoverable: the
    /// pass driver may skip the item and continue, but must report the
    /// aggregate count.
    #[error("extraction failed for item '{identifier}': {message}")]
    Extraction { identifier: String, message: String },

    /// A configured extraction rule failed startup validation. Fatal before
    /// a pass begins, so a malformed rule never fails item-by-item.
    #[error("invalid search configuration: {0}")]
    Configuration(#[from] EvaluationError),

    /// The backing store rejected a read or write. Propagated, never
    /// retried here; retry policy belongs to the pass driver.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Error, Debug)]
pub enum QueryError {
    /// A filter, sort or pagination call was issued before `scope_to`.
    #[error("scope_to must be the first call on a query builder")]
    MissingScope,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// An extraction-rule expression could not be parsed or evaluated.
#[derive(Error, Debug)]
#[error("evaluation of expression '{expression}' failed: {message}")]
pub struct EvaluationError {
    pub expression: String,
    pub message: String,
}

impl EvaluationError {
    pub fn new(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            message: message.into(),
        }
    }
}
