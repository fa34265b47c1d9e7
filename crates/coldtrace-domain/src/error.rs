use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("History store error: {0}")]
    StoreError(String),

    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("Submission failed: {0}")]
    SubmissionFailure(String),

    #[error("Nonce conflict for account {account} at nonce {nonce}")]
    NonceConflict { account: String, nonce: u64 },

    #[error("Repository error: {0}")]
    RepositoryError(#[from] anyhow::Error),
}
