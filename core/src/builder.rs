//! Declarative request description and its resolution into an `HttpRequest`.
//!
//! # Design
//! `RequestSpec` is plain, mutable data. `build` is a pure function of the
//! spec and a `ClientConfig`: it touches no network and no shared state, so
//! every failure it reports is local and synchronous.
//!
//! Body parameters accept any `Serialize` value. Conversion to JSON happens on
//! insertion; a value that cannot be converted is kept as a failure and only
//! reported when the request is built, so setters never fail.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::config::ClientConfig;
use crate::error::BuildError;
use crate::http::{HttpMethod, HttpRequest};

#[derive(Debug, Clone, PartialEq)]
enum BodyValue {
    Json(Value),
    Invalid(String),
}

/// Everything needed to describe one HTTP call.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub base_url: String,
    /// Replaces the path of `base_url` entirely when set.
    pub path: Option<String>,
    pub method: HttpMethod,
    pub url_params: HashMap<String, String>,
    pub additional_headers: HashMap<String, String>,
    body_params: Option<BTreeMap<String, BodyValue>>,
}

impl RequestSpec {
    pub fn new(method: HttpMethod, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            path: None,
            method,
            url_params: HashMap::new(),
            additional_headers: HashMap::new(),
            body_params: None,
        }
    }

    pub fn get(base_url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, base_url)
    }

    pub fn post(base_url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, base_url)
    }

    pub fn put(base_url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, base_url)
    }

    pub fn delete(base_url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, base_url)
    }

    pub fn options(base_url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Options, base_url)
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_url_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.url_params.insert(key.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body_param<V: Serialize>(mut self, key: impl Into<String>, value: V) -> Self {
        self.set_body_param(key, value);
        self
    }

    /// Insert a body parameter, replacing any previous value for `key`.
    pub fn set_body_param<V: Serialize>(&mut self, key: impl Into<String>, value: V) {
        let value = match serde_json::to_value(value) {
            Ok(json) => BodyValue::Json(json),
            Err(err) => BodyValue::Invalid(err.to_string()),
        };
        self.body_params
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value);
    }

    /// Replace all body parameters with a JSON object's members.
    pub fn set_body_params(&mut self, params: serde_json::Map<String, Value>) {
        self.body_params = Some(
            params
                .into_iter()
                .map(|(k, v)| (k, BodyValue::Json(v)))
                .collect(),
        );
    }

    pub fn clear_body(&mut self) {
        self.body_params = None;
    }

    pub fn has_body(&self) -> bool {
        self.body_params.is_some()
    }

    /// Resolve into a transport-ready request.
    pub fn build(&self, config: &ClientConfig) -> Result<HttpRequest, BuildError> {
        let url = self.resolve_url()?;
        let body = self.encode_body()?;

        let mut headers = vec![
            ("Accept".to_string(), "application/json".to_string()),
            ("Content-Type".to_string(), "application/json".to_string()),
            ("User-Agent".to_string(), config.user_agent()),
        ];
        let mut overlay: Vec<_> = self.additional_headers.iter().collect();
        overlay.sort();
        for (name, value) in overlay {
            set_header(&mut headers, name, value);
        }

        Ok(HttpRequest {
            method: self.method,
            url,
            headers,
            body,
            timeout: config.timeout,
            bypass_cache: true,
        })
    }

    fn resolve_url(&self) -> Result<Url, BuildError> {
        let mut url = Url::parse(self.base_url.trim()).map_err(|e| BuildError::InvalidUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(BuildError::UnsupportedScheme(url.scheme().to_string()));
        }
        if url.cannot_be_a_base() {
            return Err(BuildError::CannotBeABase(self.base_url.clone()));
        }
        if let Some(path) = &self.path {
            url.set_path(path);
        }
        if !self.url_params.is_empty() {
            let mut params: Vec<_> = self.url_params.iter().collect();
            params.sort();
            url.set_query(None);
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    fn encode_body(&self) -> Result<Option<Vec<u8>>, BuildError> {
        let Some(params) = &self.body_params else {
            return Ok(None);
        };
        let mut object = serde_json::Map::with_capacity(params.len());
        for (key, value) in params {
            match value {
                BodyValue::Json(json) => {
                    object.insert(key.clone(), json.clone());
                }
                BodyValue::Invalid(reason) => {
                    return Err(BuildError::Body {
                        key: key.clone(),
                        reason: reason.clone(),
                    })
                }
            }
        }
        serde_json::to_vec(&object)
            .map(Some)
            .map_err(|e| BuildError::Serialize(e.to_string()))
    }
}

/// Replace a header by case-insensitive name, or append it.
fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    headers.push((name.to_string(), value.to_string()));
}
