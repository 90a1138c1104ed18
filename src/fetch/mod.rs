mod basic;
mod client;

pub use basic::BasicClient;
pub use client::{FetchedResponse, HttpClient};

use anyhow::Result;
use reqwest::header::{CACHE_CONTROL, HeaderValue, PRAGMA};

/// Builds a GET for `url` that asks every intermediate cache to revalidate.
pub fn uncached_get(url: &str) -> Result<reqwest::Request> {
    let mut req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let headers = req.headers_mut();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

    Ok(req)
}

/// Fetches `url` bypassing caches.
pub async fn fetch_uncached<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<FetchedResponse> {
    let req = uncached_get(url)?;
    client.execute(req).await
}
