//! Minimal Qdrant REST client.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::Result;
use crate::llm::check_status;

/// Exact-match condition on a payload key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordMatch {
    /// Payload key, dotted for nested fields (e.g. `metadata.style`).
    pub key: String,
    /// Required value.
    #[serde(rename = "match")]
    pub matches: MatchValue,
}

/// Value of a [`KeywordMatch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchValue {
    /// The value to match.
    pub value: Value,
}

impl KeywordMatch {
    /// Match `key` against `value`.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            matches: MatchValue {
                value: value.into(),
            },
        }
    }
}

/// Payload filter; every condition in `must` has to hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointFilter {
    /// Required conditions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<KeywordMatch>,
}

/// Body of `POST /collections/{name}/points/scroll`.
#[derive(Debug, Clone, Serialize)]
pub struct ScrollRequest {
    /// Page size.
    pub limit: u32,
    /// Offset returned as `next_page_offset` by the previous page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<Value>,
    /// Optional payload filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<PointFilter>,
    /// Always request payloads.
    pub with_payload: bool,
}

/// A named query vector.
#[derive(Debug, Clone, Serialize)]
pub struct NamedVector {
    /// Vector name in the collection schema.
    pub name: String,
    /// Query embedding.
    pub vector: Vec<f32>,
}

/// Body of `POST /collections/{name}/points/search`.
#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest {
    /// Query vector.
    pub vector: NamedVector,
    /// Maximum number of hits.
    pub limit: u32,
    /// Drop hits scoring below this value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_threshold: Option<f32>,
    /// Optional payload filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<PointFilter>,
    /// Always request payloads.
    pub with_payload: bool,
}

/// Source metadata stored alongside each rug document chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub material: Option<String>,
    #[serde(default)]
    pub page: u32,
    pub pattern: Option<String>,
    pub rug_name: Option<String>,
    #[serde(default)]
    pub source: String,
    pub style: Option<String>,
}

/// Point payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payload {
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub page_content: String,
}

/// A stored point as returned by scroll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Point {
    /// Integer or UUID id.
    pub id: Value,
    pub payload: Payload,
}

/// A search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub id: Value,
    pub score: f32,
    pub payload: Payload,
}

/// One page of scroll results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollPage {
    pub points: Vec<Point>,
    #[serde(default)]
    pub next_page_offset: Option<Value>,
}

/// Qdrant response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: T,
    #[serde(default)]
    time: f64,
}

#[derive(Debug, Deserialize)]
struct CollectionList {
    collections: Vec<CollectionDescription>,
}

#[derive(Debug, Deserialize)]
struct CollectionDescription {
    name: String,
}

/// Client for a Qdrant instance's REST API.
#[derive(Debug, Clone)]
pub struct QdrantClient {
    http: reqwest::Client,
    base_url: Url,
}

impl QdrantClient {
    /// Create a client for the instance at `base_url` (e.g. `http://localhost:6333`).
    pub fn new(http: reqwest::Client, base_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        let resp = check_status(self.http.get(url).send().await?).await?;
        let envelope: Envelope<T> = resp.json().await?;
        debug!(name: "qdrant.request", path, time = envelope.time, "Qdrant GET");
        Ok(envelope.result)
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.endpoint(path)?;
        let resp = check_status(self.http.post(url).json(body).send().await?).await?;
        let envelope: Envelope<T> = resp.json().await?;
        debug!(name: "qdrant.request", path, time = envelope.time, "Qdrant POST");
        Ok(envelope.result)
    }

    /// Names of all collections.
    pub async fn list_collections(&self) -> Result<Vec<String>> {
        let list: CollectionList = self.get("collections").await?;
        Ok(list.collections.into_iter().map(|c| c.name).collect())
    }

    /// Raw collection description (config, status, point count).
    pub async fn collection_info(&self, collection: &str) -> Result<Value> {
        self.get(&format!("collections/{collection}")).await
    }

    /// One page of points matching `request`.
    pub async fn scroll(&self, collection: &str, request: &ScrollRequest) -> Result<ScrollPage> {
        self.post(&format!("collections/{collection}/points/scroll"), request)
            .await
    }

    /// Nearest points to the request vector.
    pub async fn search(&self, collection: &str, request: &SearchRequest) -> Result<Vec<ScoredPoint>> {
        self.post(&format!("collections/{collection}/points/search"), request)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = QdrantClient::new(reqwest::Client::new(), "http://localhost:6333").unwrap();
        assert_eq!(
            client.endpoint("collections/Rug_sage/points/search").unwrap().as_str(),
            "http://localhost:6333/collections/Rug_sage/points/search"
        );

        let proxied = QdrantClient::new(reqwest::Client::new(), "http://host/qdrant").unwrap();
        assert_eq!(
            proxied.endpoint("collections").unwrap().as_str(),
            "http://host/qdrant/collections"
        );
    }

    #[test]
    fn test_search_request_shape() {
        let req = SearchRequest {
            vector: NamedVector {
                name: "text_embedding".into(),
                vector: vec![0.5, 0.25],
            },
            limit: 2,
            score_threshold: Some(0.8),
            filter: Some(PointFilter {
                must: vec![KeywordMatch::new("metadata.style", "Persian")],
            }),
            with_payload: true,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["vector"]["name"], "text_embedding");
        assert_eq!(json["limit"], 2);
        assert_eq!(json["filter"]["must"][0]["match"]["value"], "Persian");
        assert_eq!(json["with_payload"], true);
    }

    #[test]
    fn test_parse_scroll_envelope() {
        let body = r#"{
            "result": {
                "points": [{
                    "id": "5c56c793-69f3-4fbf-87e6-c4bf54c28c26",
                    "payload": {
                        "page_content": "Boteh is a paisley-like motif.",
                        "metadata": {"page": 3, "source": "rugs.pdf", "style": "Persian",
                                     "material": null, "pattern": null, "rug_name": null}
                    }
                }],
                "next_page_offset": null
            },
            "status": "ok",
            "time": 0.002
        }"#;
        let envelope: Envelope<ScrollPage> = serde_json::from_str(body).unwrap();
        let point = &envelope.result.points[0];
        assert_eq!(point.payload.page_content, "Boteh is a paisley-like motif.");
        assert_eq!(point.payload.metadata.as_ref().unwrap().page, 3);
        assert!(envelope.result.next_page_offset.is_none());
    }
}
