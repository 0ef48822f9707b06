use thiserror::Error;

/// Error codes raised by the auth collaborator.
///
/// These mirror the codes the external provider reports; the client maps
/// them to display strings (with one friendlier rewrite for
/// [`AuthError::PasswordSignInDisabled`]).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Password sign-in is disabled")]
    PasswordSignInDisabled,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("An account already exists for this email")]
    EmailAlreadyRegistered,

    #[error("Sign-in token was not recognised")]
    InvalidToken,

    #[error("Auth service unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by the document-store collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,

    #[error("Store service unavailable: {0}")]
    Unavailable(String),
}

/// Either collaborator's failure, as delivered on subscription channels.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
