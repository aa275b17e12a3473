//! HTTP transport seam and the decorating transport
//!
//! [`HttpTransport`] is the only thing the registry services need from the network:
//! send a request, get a response. [`Transport`] wraps another transport and gives
//! every registered [`RequestModifier`] a chance to mutate each request (for example
//! to add an `Authorization` header) before it is transmitted.

use crate::error::handlers::NetworkErrorHandler;
use crate::error::Result;
use crate::logging::Logger;
use async_trait::async_trait;
use reqwest::{Request, Response};
use std::sync::Arc;

/// Something that sends an HTTP request and returns a response
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response>;
}

#[async_trait]
impl HttpTransport for reqwest::Client {
    async fn send(&self, request: Request) -> Result<Response> {
        let context = format!("{} {}", request.method(), request.url().path());
        self.execute(request)
            .await
            .map_err(|e| NetworkErrorHandler::handle_network_error(&e, &context))
    }
}

/// Mutates an outgoing request before it is transmitted
#[async_trait]
pub trait RequestModifier: Send + Sync {
    async fn modify(&self, request: &mut Request) -> Result<()>;
}

/// Transport that runs its modifiers, in registration order, on every request
#[derive(Clone)]
pub struct Transport {
    inner: Arc<dyn HttpTransport>,
    modifiers: Vec<Arc<dyn RequestModifier>>,
    output: Logger,
}

impl Transport {
    pub fn new(inner: Arc<dyn HttpTransport>, output: Logger) -> Self {
        Self {
            inner,
            modifiers: Vec::new(),
            output,
        }
    }

    pub fn with_modifier(mut self, modifier: Arc<dyn RequestModifier>) -> Self {
        self.modifiers.push(modifier);
        self
    }

    pub fn modifier_count(&self) -> usize {
        self.modifiers.len()
    }
}

#[async_trait]
impl HttpTransport for Transport {
    async fn send(&self, mut request: Request) -> Result<Response> {
        self.output.trace(&format!(
            "Sending {} {}",
            request.method(),
            request.url()
        ));

        for modifier in &self.modifiers {
            modifier.modify(&mut request).await?;
        }

        let response = self.inner.send(request).await?;

        self.output.trace(&format!(
            "Response {} from {}",
            response.status(),
            response.url().path()
        ));
        Ok(response)
    }
}
