//! HTTP request descriptions for sync calls.
//!
//! Transports that talk HTTP build an [`HttpRequest`] from a verb, a target and
//! the call's options, then hand it to whatever client the host provides.

use std::fmt;

use serde::Serialize;

use super::{SyncConfig, SyncOptions, SyncTarget, Verb};
use crate::{
    Result,
    constants::{
        CONTENT_TYPE_FORM, CONTENT_TYPE_JSON, EMULATED_JSON_FIELD, METHOD_OVERRIDE_FIELD,
        METHOD_OVERRIDE_HEADER,
    },
    value::attributes_to_json,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// Methods that emulation rewrites to POST.
    fn needs_override(self) -> bool {
        matches!(self, Method::Put | Method::Patch | Method::Delete)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of an outgoing request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum RequestBody {
    /// Serialized JSON document
    Json(String),
    /// Ordered form fields
    Form(Vec<(String, String)>),
}

/// Transport-independent description of an HTTP request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub content_type: Option<&'static str>,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl HttpRequest {
    /// Maps a sync call onto a request.
    ///
    /// The URL comes from the options or else the target. Create, update and
    /// patch send the options' payload, or the target's full JSON when none
    /// was staged. Emulation settings in the options override `config`.
    pub fn build(
        verb: Verb,
        target: &SyncTarget,
        options: &SyncOptions,
        config: SyncConfig,
    ) -> Result<Self> {
        let emulation = options.emulation.unwrap_or(config);
        let url = match &options.url {
            Some(url) => url.clone(),
            None => target.url()?,
        };

        let real_method = verb.method();
        let mut request = HttpRequest {
            method: real_method,
            url,
            content_type: None,
            headers: Vec::new(),
            body: None,
        };

        if verb.sends_body() {
            let payload = match &options.attrs {
                Some(attrs) => attributes_to_json(attrs),
                None => target.to_json(),
            };
            request.content_type = Some(CONTENT_TYPE_JSON);
            request.body = Some(RequestBody::Json(payload.to_string()));
        }

        if emulation.emulate_json {
            let fields = match request.body.take() {
                Some(RequestBody::Json(json)) => vec![(EMULATED_JSON_FIELD.to_string(), json)],
                _ => Vec::new(),
            };
            request.content_type = Some(CONTENT_TYPE_FORM);
            request.body = Some(RequestBody::Form(fields));
        }

        if emulation.emulate_http && real_method.needs_override() {
            request.method = Method::Post;
            if let Some(RequestBody::Form(fields)) = request.body.as_mut() {
                fields.push((
                    METHOD_OVERRIDE_FIELD.to_string(),
                    real_method.as_str().to_string(),
                ));
            }
            request.headers.push((
                METHOD_OVERRIDE_HEADER.to_string(),
                real_method.as_str().to_string(),
            ));
        }

        Ok(request)
    }

    /// Value of the first header named `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The JSON payload, unwrapping the emulated form field when present.
    pub fn json_body(&self) -> Option<serde_json::Value> {
        let raw = match self.body.as_ref()? {
            RequestBody::Json(json) => json.as_str(),
            RequestBody::Form(fields) => fields
                .iter()
                .find(|(key, _)| key == EMULATED_JSON_FIELD)
                .map(|(_, value)| value.as_str())?,
        };
        serde_json::from_str(raw).ok()
    }
}

impl fmt::Display for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}
