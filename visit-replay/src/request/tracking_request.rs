//! This module contains [`TrackingRequest`], the request handed to a
//! [`crate::dispatch::Dispatcher`].

use std::fmt;

/// Content type of the body of replayed `POST` requests.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// HTTP method of a tracking request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// The query string is part of the url.
    Get,

    /// The query string is sent as a form encoded body.
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// A fully formed tracking request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingRequest {
    /// The HTTP method.
    pub method: Method,

    /// The url to request.
    pub url: String,

    /// The form encoded body of `POST` requests.
    pub body: Option<String>,

    /// The user agent of the original visitor.
    pub user_agent: String,

    /// The value of the `Accept-Language` header.
    pub accept_language: String,
}

impl TrackingRequest {
    /// Creates a `GET` request. The tracking parameters are in `url`.
    #[must_use]
    pub fn get(url: String, user_agent: &str, accept_language: &str) -> Self {
        TrackingRequest {
            method: Method::Get,
            url,
            body: None,
            user_agent: user_agent.to_string(),
            accept_language: accept_language.to_string(),
        }
    }

    /// Creates a `POST` request sending the tracking parameters in `body`.
    #[must_use]
    pub fn post(url: String, body: String, user_agent: &str, accept_language: &str) -> Self {
        TrackingRequest {
            method: Method::Post,
            url,
            body: Some(body),
            user_agent: user_agent.to_string(),
            accept_language: accept_language.to_string(),
        }
    }

    /// Returns the headers to send with the request.
    ///
    /// Requests with a body also carry `Content-Type` and `Content-Length`.
    #[must_use]
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("User-Agent", self.user_agent.clone()),
            ("Accept-Language", self.accept_language.clone()),
        ];
        if let Some(body) = &self.body {
            headers.push(("Content-Type", FORM_CONTENT_TYPE.to_string()));
            headers.push(("Content-Length", body.len().to_string()));
        }
        headers
    }
}
