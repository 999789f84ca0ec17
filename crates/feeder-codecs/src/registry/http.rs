use super::{RegisteredSchema, SchemaReference, SchemaRegistry};
use crate::error::RegistrationError;
use crate::schema::SchemaDescriptor;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

const CONTENT_TYPE: &str = "application/vnd.schemaregistry.v1+json";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest<'a> {
    schema: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema_type: Option<&'static str>,
    #[serde(skip_serializing_if = "no_references")]
    references: &'a [SchemaReference],
}

impl<'a> RegisterRequest<'a> {
    fn new(descriptor: &'a SchemaDescriptor, references: &'a [SchemaReference]) -> Self {
        Self {
            schema: &descriptor.body,
            schema_type: descriptor.format.registry_type(),
            references,
        }
    }
}

fn no_references(references: &&[SchemaReference]) -> bool {
    references.is_empty()
}

#[derive(Debug, Deserialize)]
struct RegisterResponse {
    id: u32,
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    subject: String,
    id: u32,
    version: u32,
    schema: String,
}

impl From<VersionResponse> for RegisteredSchema {
    fn from(version: VersionResponse) -> Self {
        RegisteredSchema {
            subject: version.subject,
            id: version.id,
            version: version.version,
            schema: version.schema,
        }
    }
}

/// Client for a Confluent-compatible schema registry REST API.
#[derive(Debug, Clone)]
pub struct HttpSchemaRegistry {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSchemaRegistry {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn subject_url(&self, subject: &str, suffix: &str) -> String {
        format!("{}/subjects/{}/versions{}", self.base_url, subject, suffix)
    }

    fn lookup_url(&self, subject: &str) -> String {
        format!("{}/subjects/{}", self.base_url, subject)
    }
}

fn transport(subject: &str, error: reqwest::Error) -> RegistrationError {
    RegistrationError::Transport {
        subject: subject.to_string(),
        message: error.to_string(),
    }
}

async fn rejected(subject: &str, response: reqwest::Response) -> RegistrationError {
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
    RegistrationError::Rejected {
        subject: subject.to_string(),
        status,
        message,
    }
}

#[async_trait::async_trait]
impl SchemaRegistry for HttpSchemaRegistry {
    async fn register(
        &self,
        subject: &str,
        descriptor: &SchemaDescriptor,
        references: &[SchemaReference],
    ) -> Result<u32, RegistrationError> {
        let request = RegisterRequest::new(descriptor, references);

        let response = self
            .client
            .post(self.subject_url(subject, ""))
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport(subject, e))?;

        if !response.status().is_success() {
            return Err(rejected(subject, response).await);
        }

        let registered: RegisterResponse =
            response.json().await.map_err(|e| transport(subject, e))?;
        debug!(
            "Registered '{}' under subject '{}' with id {} at {}",
            descriptor.name, subject, registered.id, self.base_url
        );
        Ok(registered.id)
    }

    async fn latest(&self, subject: &str) -> Result<Option<RegisteredSchema>, RegistrationError> {
        let response = self
            .client
            .get(self.subject_url(subject, "/latest"))
            .header(reqwest::header::ACCEPT, CONTENT_TYPE)
            .send()
            .await
            .map_err(|e| transport(subject, e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(rejected(subject, response).await);
        }

        let version: VersionResponse =
            response.json().await.map_err(|e| transport(subject, e))?;
        Ok(Some(version.into()))
    }

    async fn lookup(
        &self,
        subject: &str,
        descriptor: &SchemaDescriptor,
        references: &[SchemaReference],
    ) -> Result<Option<RegisteredSchema>, RegistrationError> {
        let response = self
            .client
            .post(self.lookup_url(subject))
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .json(&RegisterRequest::new(descriptor, references))
            .send()
            .await
            .map_err(|e| transport(subject, e))?;

        // Unknown subject and unknown schema are both 404
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(rejected(subject, response).await);
        }

        let version: VersionResponse =
            response.json().await.map_err(|e| transport(subject, e))?;
        Ok(Some(version.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{resources, SchemaProvider};

    #[test]
    fn test_subject_urls() {
        let registry = HttpSchemaRegistry::new("http://localhost:8081/");
        assert_eq!(registry.base_url(), "http://localhost:8081");
        assert_eq!(
            registry.subject_url("t-value", "/latest"),
            "http://localhost:8081/subjects/t-value/versions/latest"
        );
        assert_eq!(
            registry.lookup_url("feeder.geo.Point"),
            "http://localhost:8081/subjects/feeder.geo.Point"
        );
    }

    #[test]
    fn test_register_request_body() {
        let provider = SchemaProvider::embedded();

        let avro = provider.load(resources::AVRO_VALUE).unwrap();
        let references = vec![SchemaReference::new(
            "feeder.geo.Point",
            "feeder.geo.Point",
            1,
        )];
        let body = serde_json::to_value(RegisterRequest::new(&avro, &references)).unwrap();
        assert!(body.get("schemaType").is_none());
        assert_eq!(body["references"][0]["subject"], "feeder.geo.Point");
        assert_eq!(body["references"][0]["version"], 1);

        let proto = provider.load(resources::PROTOBUF_KEY).unwrap();
        let body = serde_json::to_value(RegisterRequest::new(&proto, &[])).unwrap();
        assert_eq!(body["schemaType"], "PROTOBUF");
        assert!(body.get("references").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_registry_is_transport_error() {
        let registry = HttpSchemaRegistry::new("http://127.0.0.1:1");
        let err = registry.latest("t-value").await.unwrap_err();
        assert!(matches!(err, RegistrationError::Transport { .. }));

        let point = SchemaProvider::embedded()
            .load(resources::AVRO_POINT)
            .unwrap();
        let err = registry
            .lookup("feeder.geo.Point", &point, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, RegistrationError::Transport { .. }));
    }

    #[test]
    fn test_version_response_parses() {
        let version: VersionResponse = serde_json::from_str(
            r#"{"subject":"feeder.geo.Point","id":7,"version":3,"schema":"{}"}"#,
        )
        .unwrap();
        let registered = RegisteredSchema::from(version);
        assert_eq!(registered.id, 7);
        assert_eq!(registered.version, 3);
    }
}
