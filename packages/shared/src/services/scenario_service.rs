use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, error};

use crate::models::scenario::{GeneratedScenario, ScenarioTemplate};
use crate::repositories::scenario_repository::ScenarioRepository;
use crate::services::errors::game_engine_errors::GameEngineError;

#[derive(Clone)]
pub struct ScenarioService {
    repository: Arc<dyn ScenarioRepository>,
}

impl ScenarioService {
    pub fn new(repository: Arc<dyn ScenarioRepository>) -> Self {
        Self { repository }
    }

    /// Draws a template uniformly at random, then a character and one secret
    /// per player from it. The two secrets differ whenever the template
    /// offers more than one.
    pub async fn generate_scenario(&self) -> Result<GeneratedScenario, GameEngineError> {
        let templates = self.repository.list_templates().await?;
        let scenario = draw_scenario(&templates, &mut rand::thread_rng())?;
        debug!(
            "Generated scenario from template {}: {}",
            scenario.template_id, scenario.character
        );
        Ok(scenario)
    }
}

fn draw_scenario<R: Rng + ?Sized>(
    templates: &[ScenarioTemplate],
    rng: &mut R,
) -> Result<GeneratedScenario, GameEngineError> {
    let playable: Vec<&ScenarioTemplate> = templates.iter().filter(|t| t.is_playable()).collect();

    let template = playable.choose(rng).ok_or_else(|| {
        error!("No playable scenario templates in a catalog of {}", templates.len());
        GameEngineError::NoScenarioTemplates
    })?;

    let character = template
        .roles
        .choose(rng)
        .ok_or(GameEngineError::NoScenarioTemplates)?;

    let secrets: Vec<&String> = template.secrets.choose_multiple(rng, 2).collect();
    let (player_one_secret, player_two_secret) = match secrets.as_slice() {
        [first, second] => (first.to_string(), second.to_string()),
        [only] => (only.to_string(), only.to_string()),
        _ => return Err(GameEngineError::NoScenarioTemplates),
    };

    Ok(GeneratedScenario {
        template_id: template.id.clone(),
        character: character.clone(),
        player_one_secret,
        player_two_secret,
    })
}
