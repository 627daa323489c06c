use thiserror::Error;

/// Failures talking to the telemetry store, fatal for the current request
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("SSL connector error: {0}")]
    Tls(#[from] openssl::error::ErrorStack),
    #[error("Connection error: {0}")]
    Connect(#[source] tokio_postgres::Error),
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),
}
