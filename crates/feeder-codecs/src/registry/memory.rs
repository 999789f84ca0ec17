use super::{RegisteredSchema, SchemaReference, SchemaRegistry};
use crate::error::RegistrationError;
use crate::schema::{SchemaDescriptor, SchemaFormat};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone)]
struct StoredSchema {
    id: u32,
    format: SchemaFormat,
    body: String,
    references: Vec<SchemaReference>,
}

#[derive(Debug, Default)]
struct State {
    /// Distinct schema bodies; the id is the index plus one
    schemas: Vec<StoredSchema>,
    /// Subject to its versions, oldest first, as schema ids
    subjects: HashMap<String, Vec<u32>>,
}

impl State {
    fn schema(&self, id: u32) -> Option<&StoredSchema> {
        self.schemas.get(id.checked_sub(1)? as usize)
    }

    fn version(&self, subject: &str, version: u32) -> Option<&StoredSchema> {
        let ids = self.subjects.get(subject)?;
        let id = *ids.get(version.checked_sub(1)? as usize)?;
        self.schema(id)
    }

    /// Bodies of all schemas reachable through `references`, dependencies first.
    fn resolve(
        &self,
        subject: &str,
        references: &[SchemaReference],
        out: &mut Vec<String>,
    ) -> Result<(), RegistrationError> {
        for reference in references {
            let stored = self
                .version(&reference.subject, reference.version)
                .ok_or_else(|| RegistrationError::MissingReference {
                    subject: subject.to_string(),
                    reference: reference.name.clone(),
                    version: reference.version,
                })?;
            self.resolve(&reference.subject, &stored.references, out)?;
            if !out.contains(&stored.body) {
                out.push(stored.body.clone());
            }
        }
        Ok(())
    }
}

/// Schema registry kept in process memory.
///
/// Ids are assigned from 1 and shared across subjects for identical bodies.
/// Avro schemas are checked for unresolved named types against their
/// references before they are accepted.
#[derive(Debug, Default)]
pub struct InMemorySchemaRegistry {
    state: Mutex<State>,
}

impl InMemorySchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subjects registered so far, sorted.
    pub async fn subjects(&self) -> Vec<String> {
        let state = self.state.lock().await;
        let mut subjects: Vec<String> = state.subjects.keys().cloned().collect();
        subjects.sort();
        subjects
    }
}

#[async_trait::async_trait]
impl SchemaRegistry for InMemorySchemaRegistry {
    async fn register(
        &self,
        subject: &str,
        descriptor: &SchemaDescriptor,
        references: &[SchemaReference],
    ) -> Result<u32, RegistrationError> {
        let mut state = self.state.lock().await;

        let mut dependencies = Vec::new();
        state.resolve(subject, references, &mut dependencies)?;

        if descriptor.format == SchemaFormat::Avro {
            let mut bodies: Vec<&str> = dependencies.iter().map(String::as_str).collect();
            bodies.push(&descriptor.body);
            apache_avro::Schema::parse_list(&bodies).map_err(|e| {
                RegistrationError::InvalidSchema {
                    subject: subject.to_string(),
                    message: e.to_string(),
                }
            })?;
        }

        let existing = state
            .schemas
            .iter()
            .find(|s| s.format == descriptor.format && s.body == descriptor.body)
            .map(|s| s.id);
        let id = match existing {
            Some(id) => id,
            None => {
                let id = state.schemas.len() as u32 + 1;
                state.schemas.push(StoredSchema {
                    id,
                    format: descriptor.format,
                    body: descriptor.body.clone(),
                    references: references.to_vec(),
                });
                id
            }
        };

        let versions = state.subjects.entry(subject.to_string()).or_default();
        if !versions.contains(&id) {
            versions.push(id);
        }
        debug!(
            "Registered '{}' under subject '{}' with id {}",
            descriptor.name, subject, id
        );
        Ok(id)
    }

    async fn latest(&self, subject: &str) -> Result<Option<RegisteredSchema>, RegistrationError> {
        let state = self.state.lock().await;
        let Some(versions) = state.subjects.get(subject) else {
            return Ok(None);
        };
        let Some((index, id)) = versions.iter().enumerate().last() else {
            return Ok(None);
        };
        Ok(state.schema(*id).map(|stored| RegisteredSchema {
            subject: subject.to_string(),
            id: stored.id,
            version: index as u32 + 1,
            schema: stored.body.clone(),
        }))
    }

    async fn lookup(
        &self,
        subject: &str,
        descriptor: &SchemaDescriptor,
        _references: &[SchemaReference],
    ) -> Result<Option<RegisteredSchema>, RegistrationError> {
        let state = self.state.lock().await;
        let Some(versions) = state.subjects.get(subject) else {
            return Ok(None);
        };
        Ok(versions
            .iter()
            .enumerate()
            .filter_map(|(index, id)| Some((index, state.schema(*id)?)))
            .find(|(_, stored)| {
                stored.format == descriptor.format && stored.body == descriptor.body
            })
            .map(|(index, stored)| RegisteredSchema {
                subject: subject.to_string(),
                id: stored.id,
                version: index as u32 + 1,
                schema: stored.body.clone(),
            }))
    }
}
