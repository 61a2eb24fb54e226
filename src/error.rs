use thiserror::Error;

/// One of the backing tables could not be read, fetched or parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatasetError {
    #[error("Dataset '{dataset}' unavailable: {reason}")]
    Unavailable { dataset: String, reason: String },
}

impl DatasetError {
    pub fn unavailable(dataset: impl Into<String>, reason: impl ToString) -> Self {
        DatasetError::Unavailable {
            dataset: dataset.into(),
            reason: reason.to_string(),
        }
    }
}

/// Outcome of a user query that did not produce a breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("Please enter an item name.")]
    EmptyQuery,
    /// No catalog entry matched, even after the blueprint suffix retry
    #[error("Item not found.")]
    NotFound { query: String },
    /// The item exists but has no manufacturing recipe
    #[error("No manufacturing materials found.")]
    NoRecipe { name: String },
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("No item has been looked up yet")]
    NothingToResolve,
    #[error("Internal error: state lock failed")]
    StateLock,
}
