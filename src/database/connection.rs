use log::{debug, error, warn};
use openssl::ssl::{SslConnector, SslMethod, SslVerifyMode};
use postgres_openssl::MakeTlsConnector;
use std::future::Future;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tokio_postgres::{Connection, NoTls};
use url::Url;

use crate::database::error::DatabaseError;
use crate::database::operations::PgStore;

const CLOSE_TIMEOUT_SECS: u64 = 5;

pub fn create_ssl_connector(sslrootcert_path: &str) -> Result<MakeTlsConnector, DatabaseError> {
    let mut builder = SslConnector::builder(SslMethod::tls())?;
    builder.set_ca_file(sslrootcert_path)?;
    builder.set_verify(SslVerifyMode::PEER);

    Ok(MakeTlsConnector::new(builder.build()))
}

/// Strip the `sslrootcert` parameter from a connection URL
///
/// Returns the URL to hand to tokio-postgres and the CA file, if any.
/// Key/value connection strings are returned unchanged.
pub fn split_tls_params(database_url: &str) -> Result<(String, Option<String>), DatabaseError> {
    if !database_url.contains("://") {
        return Ok((database_url.to_string(), None));
    }

    let url = Url::parse(database_url)?;

    let mut sslrootcert_path = None;
    let mut clean_params = Vec::new();
    for (key, value) in url.query_pairs() {
        if key == "sslrootcert" {
            sslrootcert_path = Some(value.to_string());
        } else {
            clean_params.push((key.into_owned(), value.into_owned()));
        }
    }

    let mut clean_url = url.clone();
    clean_url.set_query(None);
    if !clean_params.is_empty() {
        let query = clean_params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        clean_url.set_query(Some(&query));
    }

    Ok((clean_url.to_string(), sslrootcert_path))
}

fn spawn_connection<S, T>(connection: Connection<S, T>) -> JoinHandle<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            error!("Connection error: {}", e);
        }
    })
}

/// Run `operation` on a fresh store connection and close it afterwards
///
/// The connection lives exactly as long as the operation. It is released on
/// every exit path, including when the operation fails. Nothing is retried.
pub async fn with_connection<F, Fut, T, E>(database_url: &str, operation: F) -> Result<T, E>
where
    F: FnOnce(PgStore) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<DatabaseError>,
{
    let (clean_database_url, sslrootcert_path) = split_tls_params(database_url)?;

    let (client, connection) = match sslrootcert_path {
        Some(path) => {
            let connector = create_ssl_connector(&path)?;
            let (client, connection) = tokio_postgres::connect(&clean_database_url, connector)
                .await
                .map_err(DatabaseError::Connect)?;
            (client, spawn_connection(connection))
        }
        None => {
            let (client, connection) = tokio_postgres::connect(&clean_database_url, NoTls)
                .await
                .map_err(DatabaseError::Connect)?;
            (client, spawn_connection(connection))
        }
    };
    debug!("Store connection opened");

    // The store owns the only client, so the connection winds down once it is dropped
    let result = operation(PgStore::new(client)).await;

    release(connection, Duration::from_secs(CLOSE_TIMEOUT_SECS)).await;
    result
}

/// Wait for a connection task to wind down, aborting it after `grace`
///
/// Returns whether the task finished on its own.
async fn release(mut connection: JoinHandle<()>, grace: Duration) -> bool {
    let closed = timeout(grace, &mut connection).await.is_ok();
    if !closed {
        warn!("Store connection did not close in time, aborting it");
        connection.abort();
    }
    debug!("Store connection closed");
    closed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tokio::sync::oneshot;

    #[test]
    fn sslrootcert_is_split_off() {
        let (url, cert) = split_tls_params(
            "postgresql://viewer:pw@db.local:5432/wsns?sslmode=require&sslrootcert=/etc/ca.pem",
        )
        .unwrap();
        assert_eq!(url, "postgresql://viewer:pw@db.local:5432/wsns?sslmode=require");
        assert_eq!(cert.as_deref(), Some("/etc/ca.pem"));
    }

    #[test]
    fn plain_urls_have_no_tls() {
        let (url, cert) = split_tls_params("postgresql://localhost/wsns").unwrap();
        assert_eq!(url, "postgresql://localhost/wsns");
        assert_eq!(cert, None);

        let (url, cert) = split_tls_params("host=localhost user=viewer dbname=wsns").unwrap();
        assert_eq!(url, "host=localhost user=viewer dbname=wsns");
        assert_eq!(cert, None);
    }

    #[tokio::test]
    async fn refused_connection_fails_without_running_the_operation() {
        let mut ran = false;
        let started = Instant::now();
        let result = with_connection(
            "postgresql://viewer@127.0.0.1:1/wsns?connect_timeout=2",
            |_store| {
                ran = true;
                async { Ok::<_, DatabaseError>(()) }
            },
        )
        .await;
        assert!(matches!(result, Err(DatabaseError::Connect(_))));
        assert!(!ran);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn malformed_url_fails_before_connecting() {
        let mut ran = false;
        let result = with_connection("postgresql://[bad/wsns", |_store| {
            ran = true;
            async { Ok::<_, DatabaseError>(()) }
        })
        .await;
        assert!(matches!(result, Err(DatabaseError::Url(_))));
        assert!(!ran);
    }

    #[tokio::test]
    async fn finished_connection_is_released() {
        let task = tokio::spawn(async {});
        assert!(release(task, Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn stuck_connection_is_aborted() {
        let (alive, gone) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let _alive = alive;
            std::future::pending::<()>().await;
        });
        assert!(!release(task, Duration::from_millis(50)).await);
        // the sender is dropped once the aborted task is torn down
        assert!(timeout(Duration::from_secs(1), gone).await.unwrap().is_err());
    }

    #[test]
    fn malformed_urls_are_errors() {
        assert!(matches!(
            split_tls_params("postgresql://[bad/wsns"),
            Err(DatabaseError::Url(_))
        ));
    }
}
