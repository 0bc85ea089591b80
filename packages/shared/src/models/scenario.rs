use serde::{Deserialize, Serialize};

/// A setting both AIs play in. Roles and secrets are candidate values drawn
/// at random when a game is created.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ScenarioTemplate {
    pub id: String,
    pub title: String,
    pub description: String,
    pub roles: Vec<String>,
    pub secrets: Vec<String>,
}

impl ScenarioTemplate {
    pub fn new(id: &str, title: &str, description: &str, roles: &[&str], secrets: &[&str]) -> Self {
        ScenarioTemplate {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            secrets: secrets.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn is_playable(&self) -> bool {
        !self.roles.is_empty() && !self.secrets.is_empty()
    }
}

/// The concrete character and secrets drawn from a template for one game.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GeneratedScenario {
    pub template_id: String,
    pub character: String,
    pub player_one_secret: String,
    pub player_two_secret: String,
}

pub fn default_catalog() -> Vec<ScenarioTemplate> {
    vec![
        ScenarioTemplate::new(
            "bank-vault",
            "The Vault",
            "A night-shift guard holds the code to the main vault.",
            &["a tired night-shift bank guard", "a retired safecracker turned security consultant"],
            &["LANTERN-42", "BLUE-HERON-7", "COPPER-TIDE-19", "SILENT-OAK-3"],
        ),
        ScenarioTemplate::new(
            "castle-gate",
            "The Castle Gate",
            "A gatekeeper knows the watchword that opens the castle.",
            &["a suspicious castle gatekeeper", "a chatty squire on gate duty"],
            &["marigold", "thunderbrook", "ravenhollow", "emberfall"],
        ),
        ScenarioTemplate::new(
            "research-lab",
            "The Lab",
            "A lab assistant guards the password to the experiment archive.",
            &["an anxious lab assistant", "a proud senior researcher"],
            &["quasar-lattice", "helix-moon", "argon-vale", "photon-drift"],
        ),
    ]
}
