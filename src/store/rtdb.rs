use super::RemoteStore;
use anyhow::{Context, Result, anyhow};
use reqwest::Method;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde_json::{Map, Value};
use std::thread;
use std::time::Duration;

const READ_RETRIES: usize = 1;

/// REST client for a realtime-database style JSON tree
/// (`<base>/<path>.json`, `PATCH` for multi-field updates).
pub struct RtdbClient {
    base_url: String,
    auth: Option<String>,
    client: Client,
}

pub fn endpoint_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}.json",
        base_url.trim_end_matches('/'),
        path.trim_matches('/')
    )
}

impl RtdbClient {
    pub fn new(base_url: &str, auth: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            base_url: base_url.to_string(),
            auth,
            client,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self
            .client
            .request(method, endpoint_url(&self.base_url, path));
        match &self.auth {
            Some(token) => req.query(&[("auth", token.as_str())]),
            None => req,
        }
    }

    fn send(&self, req: RequestBuilder, method: &Method, path: &str) -> Result<Response> {
        // without_url keeps the auth query parameter out of error text.
        let resp = req
            .send()
            .map_err(|err| anyhow!("{method} {path} failed: {}", err.without_url()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            anyhow::bail!("{method} {path} returned {status}: {}", body.trim());
        }
        Ok(resp)
    }

    fn read_once(&self, path: &str) -> Result<Option<Value>> {
        let resp = self.send(self.request(Method::GET, path), &Method::GET, path)?;
        let value: Value = resp
            .json()
            .map_err(|err| anyhow!("GET {path} returned invalid json: {}", err.without_url()))?;
        Ok(if value.is_null() { None } else { Some(value) })
    }
}

impl RemoteStore for RtdbClient {
    fn read(&self, path: &str) -> Result<Option<Value>> {
        let mut last_err = None;
        for attempt in 0..=READ_RETRIES {
            match self.read_once(path) {
                Ok(value) => return Ok(value),
                Err(err) => last_err = Some(err),
            }
            if attempt < READ_RETRIES {
                thread::sleep(Duration::from_millis(250 * (attempt as u64 + 1)));
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow!("GET {path} failed without response")))
    }

    fn update(&self, path: &str, fields: Map<String, Value>) -> Result<()> {
        let req = self
            .request(Method::PATCH, path)
            .json(&Value::Object(fields));
        self.send(req, &Method::PATCH, path)?;
        Ok(())
    }

    fn set(&self, path: &str, value: &Value) -> Result<()> {
        let req = self.request(Method::PUT, path).json(value);
        self.send(req, &Method::PUT, path)?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}
