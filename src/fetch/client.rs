use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Request, StatusCode};

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

/// Executes one request against the transit data source.
///
/// An `Err` is a transport failure (unreachable host, timeout, broken body).
/// Non-2xx answers are returned as `Ok` with their status.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> Result<FetchedResponse>;
}
