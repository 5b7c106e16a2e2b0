//! Request data handed to the router.
//!
//! # Responsibilities
//! - Normalize method names (case-insensitive, GET/POST/PUT/DELETE only)
//! - Split path and query string; decode query and form values
//! - Carry the Referer and request id for redirects and logging
//!
//! # Design Decisions
//! - Owned, framework-independent: the router never sees axum types
//! - Query and form pairs keep their original order

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use url::form_urlencoded;

/// HTTP methods the router accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unsupported HTTP method {0:?}")]
pub struct UnsupportedMethod(pub String);

impl FromStr for Method {
    type Err = UnsupportedMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            _ => Err(UnsupportedMethod(s.to_string())),
        }
    }
}

/// An incoming request as seen by the router and controllers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    /// Path without query string.
    pub path: String,
    pub query: Vec<(String, String)>,
    /// Decoded `application/x-www-form-urlencoded` body.
    pub form: Vec<(String, String)>,
    pub referer: Option<String>,
    pub request_id: Option<String>,
}

impl Request {
    /// Build a request from a method and a path with optional query string.
    pub fn new(method: Method, uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, parse_pairs(query.as_bytes())),
            None => (uri, Vec::new()),
        };
        Self {
            method,
            path: path.to_string(),
            query,
            form: Vec::new(),
            referer: None,
            request_id: None,
        }
    }

    /// Attach a urlencoded form body.
    pub fn with_form_body(mut self, body: &[u8]) -> Self {
        self.form = parse_pairs(body);
        self
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    pub fn query_value(&self, name: &str) -> Option<&str> {
        lookup(&self.query, name)
    }

    pub fn form_value(&self, name: &str) -> Option<&str> {
        lookup(&self.form, name)
    }
}

fn lookup<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
}

fn parse_pairs(input: &[u8]) -> Vec<(String, String)> {
    form_urlencoded::parse(input).into_owned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse_is_case_insensitive() {
        assert_eq!("get".parse::<Method>(), Ok(Method::Get));
        assert_eq!("Delete".parse::<Method>(), Ok(Method::Delete));
        assert!("PATCH".parse::<Method>().is_err());
    }

    #[test]
    fn test_request_splits_query() {
        let req = Request::new(Method::Get, "/users/42?tab=orders&page=2&q=a%20b");
        assert_eq!(req.path, "/users/42");
        assert_eq!(req.query_value("page"), Some("2"));
        assert_eq!(req.query_value("q"), Some("a b"));
        assert_eq!(req.query.len(), 3);
    }

    #[test]
    fn test_form_body() {
        let req = Request::new(Method::Post, "/auth/login").with_form_body(b"email=a%40b.c&password=x+y");
        assert_eq!(req.form_value("email"), Some("a@b.c"));
        assert_eq!(req.form_value("password"), Some("x y"));
    }
}
