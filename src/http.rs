//! HTTP request helper shared by every widget

use log::{debug, warn};
use reqwest::header::ACCEPT;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// Ordered, form-serialised parameter set
///
/// Setting an existing key replaces its value in place, like a serialised
/// form hash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormParams(Vec<(String, String)>);

impl FormParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.0.iter().position(|(k, _)| k == key)?;
        Some(self.0.remove(index).1)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Mark the request as the `_action_<name>` / `_internal_<name>` operation
    pub fn flag(&mut self, name: &str) -> &mut Self {
        self.set(name, "1")
    }

    pub fn extend(&mut self, other: &FormParams) -> &mut Self {
        for (k, v) in &other.0 {
            self.set(k.clone(), v.clone());
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = FormParams::new();
        for (k, v) in iter {
            params.set(k, v);
        }
        params
    }
}

/// One `reqwest::Client` plus the endpoint configuration
#[derive(Debug, Clone)]
pub struct ScreenClient {
    client: Client,
    config: ClientConfig,
}

impl ScreenClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder().build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn http(&self) -> &Client {
        &self.client
    }

    pub async fn post_form(&self, url: &str, params: &FormParams) -> Result<Response> {
        debug!("post_form: {} params={}", url, params.len());
        let response = self.client.post(url).form(&params.0).send().await?;
        check_status(response, url).await
    }

    pub async fn get_query(&self, url: &str, query: &[(&str, &str)]) -> Result<Response> {
        debug!("get: {}", url);
        let response = self.client.get(url).query(query).send().await?;
        check_status(response, url).await
    }

    /// GET with `Accept: application/json` content negotiation
    pub async fn get_json_resource(&self, url: &str) -> Result<Response> {
        debug!("get_json: {}", url);
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        check_status(response, url).await
    }

    pub async fn post_json_body<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<Response> {
        debug!("post_json: {}", url);
        let response = self.client.post(url).json(body).send().await?;
        check_status(response, url).await
    }

    pub async fn delete(&self, url: &str) -> Result<Response> {
        debug!("delete: {}", url);
        let response = self.client.delete(url).send().await?;
        check_status(response, url).await
    }
}

async fn check_status(response: Response, url: &str) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    warn!("request_failed: {} status={}", url, status);
    Err(ClientError::Status {
        status,
        url: url.to_string(),
        body,
    })
}

/// Read a JSON body, keeping the raw text when it does not parse
pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let text = response.text().await?;
    parse_json(&text)
}

pub fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|_| ClientError::Malformed {
        expected: "JSON",
        raw: text.to_string(),
    })
}

/// Repository identifiers arrive as JSON numbers or strings
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}
