use crate::{RecordSource, SourceError};
use serde_json::Value;
use tracing::{debug, info};

/// Search API queried when `FEEDER_API_URL` is not set.
pub const DEFAULT_API_URL: &str = "https://api-adresse.data.gouv.fr/search/?q=%s";

/// Fetches documents from an HTTP search API.
///
/// The URL template's `%s` is replaced with the trimmed, lower-cased query.
/// A JSON array response yields its elements; a JSON object yields the
/// elements of its `features` array.
#[derive(Debug, Clone)]
pub struct ApiSource {
    client: reqwest::Client,
    url_template: String,
}

impl ApiSource {
    pub fn new(url_template: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url_template: url_template.into(),
        }
    }

    /// URL requested for `query`.
    pub fn url_for(&self, query: &str) -> String {
        self.url_template.replace("%s", &query.trim().to_lowercase())
    }
}

/// Split a response body into one serialized document per record.
pub(crate) fn split_documents(body: &str) -> Result<Vec<String>, SourceError> {
    let root: Value = serde_json::from_str(body)?;
    let documents = match root {
        Value::Array(elements) => elements,
        Value::Object(mut members) => match members.remove("features") {
            Some(Value::Array(features)) => features,
            Some(_) => {
                return Err(SourceError::UnexpectedShape(
                    "'features' is not an array".to_string(),
                ))
            }
            None => {
                return Err(SourceError::UnexpectedShape(
                    "object response has no 'features'".to_string(),
                ))
            }
        },
        _ => {
            return Err(SourceError::UnexpectedShape(
                "expected a JSON array or object".to_string(),
            ))
        }
    };
    Ok(documents.iter().map(Value::to_string).collect())
}

#[async_trait::async_trait]
impl RecordSource for ApiSource {
    fn describe(&self) -> String {
        format!("API '{}'", self.url_template)
    }

    async fn fetch(&self, query: &str) -> Result<Vec<String>, SourceError> {
        let url = self.url_for(query);
        info!("Searching records matching the query '{}'", query);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| SourceError::Http {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| SourceError::Http {
            url: url.clone(),
            source,
        })?;
        let documents = split_documents(&body)?;
        debug!("Fetched {} records from {}", documents.len(), url);
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for() {
        let source = ApiSource::new(DEFAULT_API_URL);
        assert_eq!(
            source.url_for("  Nimes "),
            "https://api-adresse.data.gouv.fr/search/?q=nimes"
        );
    }

    #[test]
    fn test_split_feature_collection() {
        let body = r#"{"type":"FeatureCollection","features":[{"properties":{"label":"A"}},{"properties":{"label":"B"}}]}"#;
        let documents = split_documents(body).unwrap();
        assert_eq!(documents.len(), 2);
        let first: Value = serde_json::from_str(&documents[0]).unwrap();
        assert_eq!(first["properties"]["label"], "A");
    }

    #[test]
    fn test_split_array() {
        let documents = split_documents(r#"[1, {"a": true}, "x"]"#).unwrap();
        assert_eq!(documents, vec!["1", r#"{"a":true}"#, r#""x""#]);
    }

    #[test]
    fn test_split_rejects_other_shapes() {
        assert!(matches!(
            split_documents(r#"{"results": []}"#),
            Err(SourceError::UnexpectedShape(_))
        ));
        assert!(matches!(
            split_documents("42"),
            Err(SourceError::UnexpectedShape(_))
        ));
        assert!(matches!(
            split_documents("<html>"),
            Err(SourceError::InvalidJson(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_api() {
        let source = ApiSource::new("http://127.0.0.1:1/search?q=%s");
        assert!(matches!(
            source.fetch("paris").await,
            Err(SourceError::Http { .. })
        ));
    }
}
