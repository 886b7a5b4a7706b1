// src/http.rs
//
// Shared HTTP plumbing for the source adapters: one client per adapter
// with a bounded timeout, JSON GET with typed decoding, and bounded
// retries on transient failures only (parse failures are not retried).

use std::time::Duration;

use once_cell::sync::Lazy;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::RetryIf;
use url::Url;

use crate::errors::AdapterError;

/// Fallback client for callers constructed without settings (rate feed
/// probes). Adapters build their own client via [`build_client`].
pub static DEFAULT_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("failed to build default HTTP client")
});

pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(timeout).build()
}

/// GET `url` and decode the JSON body into `T`.
///
/// Transient failures (connect errors, timeouts, non-success statuses) are
/// retried up to `max_retries` times with exponential backoff; a body that
/// decodes wrong fails immediately.
pub async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    headers: &[(&'static str, String)],
    max_retries: u32,
    base_delay: Duration,
) -> Result<T, AdapterError> {
    let strategy = ExponentialBackoff::from_millis(2)
        .factor(base_delay.as_millis() as u64)
        .take(max_retries as usize);

    RetryIf::spawn(
        strategy,
        || get_json_once::<T>(client, url, headers),
        |err: &AdapterError| matches!(err, AdapterError::Unavailable(_)),
    )
    .await
}

async fn get_json_once<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    headers: &[(&'static str, String)],
) -> Result<T, AdapterError> {
    let url = Url::parse(url)
        .map_err(|e| AdapterError::Malformed(format!("invalid url {}: {}", url, e)))?;
    let mut request = client.get(url.clone());
    for (name, value) in headers {
        request = request.header(*name, value.as_str());
    }

    let response = request.send().await.map_err(AdapterError::from)?;
    let status = response.status();
    if !status.is_success() {
        return Err(AdapterError::Unavailable(format!(
            "{} returned {}",
            url, status
        )));
    }

    response.json::<T>().await.map_err(|e| {
        // reqwest reports body decode problems as decode errors; anything
        // else at this point is a transport failure mid-body.
        if e.is_decode() {
            AdapterError::Malformed(e.to_string())
        } else {
            AdapterError::Unavailable(e.to_string())
        }
    })
}
