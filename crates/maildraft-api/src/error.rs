use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum BackendError {
    #[error("backend returned {status}: {message}")]
    #[diagnostic(code(maildraft::backend::http))]
    Http { status: u16, message: String },

    #[error("transport failure: {0}")]
    #[diagnostic(code(maildraft::backend::transport))]
    Transport(String),

    #[error("failed to decode backend response: {0}")]
    #[diagnostic(code(maildraft::backend::decode))]
    Decode(String),
}
