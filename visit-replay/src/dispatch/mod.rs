//! The [`Dispatcher`] trait is the interface between the replay engines and
//! the transport delivering tracking requests to the collector.
//!
//! [`HttpDispatcher`] is the implementation used by the command line; tests
//! and embedders can plug in their own.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::redirect::Policy;

use crate::error::DispatchError;
use crate::request::{Method, TrackingRequest};

/// Delivers tracking requests to the collector.
pub trait Dispatcher {
    /// Sends one tracking request and waits for the answer.
    ///
    /// # Arguments
    ///
    /// - `request`: The request to deliver.
    /// - `timeout`: How long to wait for the collector.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the request can't be delivered or the collector
    /// doesn't accept it.
    fn send(&self, request: &TrackingRequest, timeout: Duration) -> Result<(), DispatchError>;
}

impl<D: Dispatcher + ?Sized> Dispatcher for &D {
    fn send(&self, request: &TrackingRequest, timeout: Duration) -> Result<(), DispatchError> {
        (**self).send(request, timeout)
    }
}

/// Delivers tracking requests over HTTP(S).
///
/// Redirects are not followed: a tracker endpoint answering with a redirect
/// is misconfigured.
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    /// The client sending requests. It is cheap to clone and shares its
    /// connection pool between threads.
    client: Client,
}

impl HttpDispatcher {
    /// Constructs a new `HttpDispatcher`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the TLS backend can't be initialised.
    pub fn new() -> Result<Self, DispatchError> {
        let client = Client::builder().redirect(Policy::none()).build()?;
        Ok(HttpDispatcher { client })
    }
}

impl Dispatcher for HttpDispatcher {
    fn send(&self, request: &TrackingRequest, timeout: Duration) -> Result<(), DispatchError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self
                .client
                .post(&request.url)
                .body(request.body.clone().unwrap_or_default()),
        };
        for (name, value) in request.headers() {
            // The client computes the length of the body itself.
            if name == "Content-Length" {
                continue;
            }
            builder = builder.header(name, value);
        }

        let response = builder.timeout(timeout).send()?;
        let status = response.status();
        tracing::trace!(method = %request.method, %status, "Tracking request sent");
        if !status.is_success() {
            return Err(DispatchError::Status(status.as_u16()));
        }
        Ok(())
    }
}
