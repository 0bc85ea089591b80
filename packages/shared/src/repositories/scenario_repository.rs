use async_trait::async_trait;

use crate::models::scenario::{default_catalog, ScenarioTemplate};
use crate::repositories::errors::scenario_repository_errors::ScenarioRepositoryError;

#[cfg(test)]
use mockall::automock;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ScenarioRepository: Send + Sync {
    async fn list_templates(&self) -> Result<Vec<ScenarioTemplate>, ScenarioRepositoryError>;
}

pub struct InMemoryScenarioRepository {
    templates: Vec<ScenarioTemplate>,
}

impl InMemoryScenarioRepository {
    pub fn new(templates: Vec<ScenarioTemplate>) -> Self {
        Self { templates }
    }

    pub fn with_default_catalog() -> Self {
        Self::new(default_catalog())
    }
}

#[async_trait]
impl ScenarioRepository for InMemoryScenarioRepository {
    async fn list_templates(&self) -> Result<Vec<ScenarioTemplate>, ScenarioRepositoryError> {
        Ok(self.templates.clone())
    }
}
