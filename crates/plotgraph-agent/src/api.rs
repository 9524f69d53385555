//! Named external API targets reachable from `api.call` executor nodes

use async_trait::async_trait;
use plotgraph_core::{Error, Result};
use serde::{Deserialize, Serialize};
use reqwest::Url;
use serde_json::{Map, Value};
use tracing::debug;

#[async_trait]
pub trait ApiTarget: Send + Sync {
    fn name(&self) -> &str;

    async fn call(&self, input: &Value) -> Result<Value>;
}

/// TOML form of an HTTP GET target.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ApiTargetConfig {
    pub name: String,
    pub base_url: String,
    #[serde(default)]
    pub path: String,
    /// Input keys sent as query parameters.
    #[serde(default)]
    pub query: Vec<String>,
}

/// GET `{base_url}{path}` with `{key}` placeholders in `path` taken from the
/// input object and the configured `query` keys sent as query parameters.
/// Each path segment is percent-encoded after substitution, so a value can
/// never introduce a new segment, query or fragment.
pub struct HttpGetTarget {
    client: reqwest::Client,
    config: ApiTargetConfig,
}

impl HttpGetTarget {
    pub fn new(config: ApiTargetConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn url(&self, input: &Value) -> Result<Url> {
        let name = &self.config.name;
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| Error::api(name, format!("invalid base_url: {e}")))?;
        let empty = Map::new();
        let fields = input.as_object().unwrap_or(&empty);
        let segments = self
            .config
            .path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| substitute(s, fields).map_err(|key| Error::api(name, format!("missing path parameter '{key}'"))))
            .collect::<Result<Vec<String>>>()?;
        url.path_segments_mut()
            .map_err(|_| Error::api(name, "base_url cannot carry a path"))?
            .pop_if_empty()
            .extend(&segments);
        Ok(url)
    }

    fn query(&self, input: &Value) -> Vec<(String, String)> {
        self.config
            .query
            .iter()
            .filter_map(|k| input.get(k).and_then(scalar).map(|v| (k.clone(), v)))
            .collect()
    }
}

/// Replace every `{key}` in one path segment. `Err` carries the missing key.
fn substitute(segment: &str, fields: &Map<String, Value>) -> std::result::Result<String, String> {
    let mut out = String::new();
    let mut rest = segment;
    while let Some(open) = rest.find('{') {
        let Some(len) = rest[open..].find('}') else { break };
        let key = &rest[open + 1..open + len];
        let value = fields.get(key).and_then(scalar).ok_or_else(|| key.to_string())?;
        out.push_str(&rest[..open]);
        out.push_str(&value);
        rest = &rest[open + len + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[async_trait]
impl ApiTarget for HttpGetTarget {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn call(&self, input: &Value) -> Result<Value> {
        let url = self.url(input)?;
        let query = self.query(input);
        debug!(target_name = %self.config.name, %url, "api call");

        let response = self
            .client
            .get(url)
            .query(&query)
            .send()
            .await
            .map_err(|e| Error::api(&self.config.name, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::api(&self.config.name, format!("HTTP {status}: {body}")));
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| Error::api(&self.config.name, format!("invalid JSON: {e}")))
    }
}
