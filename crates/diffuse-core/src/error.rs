use http::StatusCode;

/// Trait for domain errors that can be converted to HTTP responses
///
/// Implemented by each service crate's error type. Each service renders its
/// own body shape, the trait only fixes how status and message are derived.
pub trait HttpError: std::error::Error {
    /// HTTP status code for this error
    fn status_code(&self) -> StatusCode;

    /// Message safe to expose to API consumers
    fn client_message(&self) -> String {
        self.to_string()
    }
}
