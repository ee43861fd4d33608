use anyhow::{Context, Result};
use reqwest::Method;
use reqwest::blocking::Client;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use std::time::Duration;

use crate::connection::ConnectionContext;
use crate::payload::Payload;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("missing host name (set --host or MAGDA_HOST)")]
    MissingHost { path: String },

    #[error("while connecting to magda registry - {source}")]
    Client {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("resource not found: {path}")]
    NotFound { path: String },

    #[error("unauthorized access: {path}")]
    Unauthorized { path: String },

    #[error("registry returned {status} for {path}: {message}")]
    Service {
        path: String,
        status: u16,
        message: String,
    },
}

impl AdapterError {
    pub fn path(&self) -> &str {
        match self {
            Self::MissingHost { path }
            | Self::Client { path, .. }
            | Self::NotFound { path }
            | Self::Unauthorized { path }
            | Self::Service { path, .. } => path,
        }
    }
}

/// The only way resource modules reach the registry.
pub trait Adapter {
    fn get(&self, path: &str) -> Result<Payload, AdapterError>;
    fn post(&self, path: &str, body: Vec<u8>) -> Result<Payload, AdapterError>;
    fn put(&self, path: &str, body: Vec<u8>) -> Result<Payload, AdapterError>;
    fn patch(&self, path: &str, body: Vec<u8>) -> Result<Payload, AdapterError>;
    fn delete(&self, path: &str) -> Result<Payload, AdapterError>;

    /// True when talking to the registry directly instead of via the gateway.
    fn skip_gateway(&self) -> bool;
}

pub struct RestAdapter {
    client: Client,
    ctx: ConnectionContext,
}

impl RestAdapter {
    pub fn new(ctx: ConnectionContext) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("magda-cli/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("build http client")?;
        Ok(Self { client, ctx })
    }

    fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Payload, AdapterError> {
        if self.ctx.host.is_empty() {
            log::error!("missing 'host' method={} path={}", method, path);
            return Err(AdapterError::MissingHost {
                path: path.to_string(),
            });
        }
        let url = self.ctx.url(path);
        let client_err = |source| AdapterError::Client {
            path: path.to_string(),
            source,
        };

        let mut req = self
            .client
            .request(method.clone(), &url)
            .header(CONTENT_TYPE, "application/json")
            .header(CACHE_CONTROL, "no-cache");
        for (name, value) in self.ctx.auth_headers() {
            req = req.header(name, value);
        }
        if let Some(body) = body {
            req = req.body(body);
        }

        log::debug!(
            "calling magda registry method={} path={} url={}",
            method,
            path,
            url
        );
        let resp = req.send().map_err(|err| {
            log::warn!("http request failed method={} url={}: {}", method, url, err);
            client_err(err)
        })?;
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = resp.bytes().map_err(|err| {
            log::warn!(
                "reading response body failed method={} url={}: {}",
                method,
                url,
                err
            );
            client_err(err)
        })?;

        if status.as_u16() >= 300 {
            let message = String::from_utf8_lossy(&bytes).into_owned();
            log::warn!(
                "http response method={} url={} status={} body={}",
                method,
                url,
                status.as_u16(),
                message
            );
            let path = path.to_string();
            return Err(match status.as_u16() {
                404 => AdapterError::NotFound { path },
                401 => AdapterError::Unauthorized { path },
                code => AdapterError::Service {
                    path,
                    status: code,
                    message,
                },
            });
        }

        let payload = Payload::new(bytes.to_vec(), content_type);
        log::debug!(
            "received status={} content-type={}",
            status.as_u16(),
            payload.content_type().unwrap_or("-")
        );
        Ok(payload)
    }
}

impl Adapter for RestAdapter {
    fn get(&self, path: &str) -> Result<Payload, AdapterError> {
        self.call(Method::GET, path, None)
    }

    fn post(&self, path: &str, body: Vec<u8>) -> Result<Payload, AdapterError> {
        self.call(Method::POST, path, Some(body))
    }

    fn put(&self, path: &str, body: Vec<u8>) -> Result<Payload, AdapterError> {
        self.call(Method::PUT, path, Some(body))
    }

    fn patch(&self, path: &str, body: Vec<u8>) -> Result<Payload, AdapterError> {
        self.call(Method::PATCH, path, Some(body))
    }

    fn delete(&self, path: &str) -> Result<Payload, AdapterError> {
        self.call(Method::DELETE, path, None)
    }

    fn skip_gateway(&self) -> bool {
        self.ctx.skip_gateway
    }
}
