//! Transport abstraction
//!
//! A `Transport` takes a fully built request and yields a response or a
//! failure. Non-success HTTP statuses are failures carrying the status
//! (`Error::HttpStatus`), so layers above can react to 401 and friends.

use crate::error::Result;
use async_trait::async_trait;
use reqwest::{Request, Response};
use std::sync::Arc;

/// Sends a request and returns the response
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request
    async fn send(&self, request: Request) -> Result<Response>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: Request) -> Result<Response> {
        (**self).send(request).await
    }
}
