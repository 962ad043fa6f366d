//! Planner configuration at ~/.config/coach/config.toml
//!
//! Every key can be overridden with a `COACH_` environment variable
//! (e.g. `COACH_TARGET_CALENDAR=Planning`). List keys take comma-separated values.

use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use config::{Config, Environment, File, Map};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{CoachError, CoachResult};

static DEFAULT_ASSISTANTS_DIR: &str = "~/.config/coach/assistants";
static DEFAULT_TARGET_CALENDAR: &str = "PersonalCoach";
static DEFAULT_EXPERT_QUERY: &str = "me dirías la planificación para esta semana?";
static DEFAULT_MODEL: &str = "gpt-4o";
static DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
static DEFAULT_EXPERTS: [&str; 4] = ["deporte", "estres", "medico", "nutri"];

const LIST_KEYS: [&str; 2] = ["source_calendars", "expert_assistants"];

fn default_assistants_dir() -> PathBuf {
    PathBuf::from(DEFAULT_ASSISTANTS_DIR)
}

fn default_target_calendar() -> String {
    DEFAULT_TARGET_CALENDAR.to_string()
}

fn default_expert_assistants() -> Vec<String> {
    DEFAULT_EXPERTS.iter().map(|s| s.to_string()).collect()
}

fn default_planner_assistant() -> String {
    "planner".to_string()
}

fn default_integrator_assistant() -> String {
    "schedule_integrator".to_string()
}

fn default_formatter_assistant() -> String {
    "calendar_formatter".to_string()
}

fn default_expert_query() -> String {
    DEFAULT_EXPERT_QUERY.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_openai_api_url() -> String {
    DEFAULT_OPENAI_API_URL.to_string()
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8000
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoachConfig {
    /// Directory holding one `<name>.md` prompt template per assistant
    #[serde(default = "default_assistants_dir")]
    pub assistants_dir: PathBuf,

    /// Calendar (summary or id) that receives the planned events
    #[serde(default = "default_target_calendar")]
    pub target_calendar: String,

    /// Calendars read when formatting the existing schedule. Empty means all.
    #[serde(default)]
    pub source_calendars: Vec<String>,

    #[serde(default = "default_expert_assistants")]
    pub expert_assistants: Vec<String>,

    #[serde(default = "default_planner_assistant")]
    pub planner_assistant: String,

    #[serde(default = "default_integrator_assistant")]
    pub integrator_assistant: String,

    #[serde(default = "default_formatter_assistant")]
    pub formatter_assistant: String,

    /// Question sent to every expert assistant
    #[serde(default = "default_expert_query")]
    pub expert_query: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_openai_api_url")]
    pub openai_api_url: String,

    /// IANA zone attached to planned events. Detected from the host when unset.
    #[serde(default)]
    pub timezone: Option<String>,

    #[serde(default = "default_server_host")]
    pub server_host: String,

    #[serde(default = "default_server_port")]
    pub server_port: u16,
}

impl Default for CoachConfig {
    fn default() -> Self {
        CoachConfig {
            assistants_dir: default_assistants_dir(),
            target_calendar: default_target_calendar(),
            source_calendars: Vec::new(),
            expert_assistants: default_expert_assistants(),
            planner_assistant: default_planner_assistant(),
            integrator_assistant: default_integrator_assistant(),
            formatter_assistant: default_formatter_assistant(),
            expert_query: default_expert_query(),
            model: default_model(),
            openai_api_url: default_openai_api_url(),
            timezone: None,
            server_host: default_server_host(),
            server_port: default_server_port(),
        }
    }
}

impl CoachConfig {
    pub fn config_dir() -> CoachResult<PathBuf> {
        Ok(dirs::config_dir()
            .ok_or_else(|| CoachError::Config("Could not determine config directory".into()))?
            .join("coach"))
    }

    pub fn config_path() -> CoachResult<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load the config file (creating a commented default on first run),
    /// then apply `COACH_*` environment overrides.
    pub fn load() -> CoachResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::from_path(&config_path)
    }

    pub fn from_path(path: &Path) -> CoachResult<Self> {
        Self::from_sources(path, None)
    }

    /// `env_vars` replaces the process environment when given.
    fn from_sources(path: &Path, env_vars: Option<Map<String, String>>) -> CoachResult<Self> {
        let mut env = Environment::with_prefix("COACH")
            .source(env_vars)
            .try_parsing(true)
            .list_separator(",");
        for key in LIST_KEYS {
            env = env.with_list_parse_key(key);
        }

        let config: CoachConfig = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(env)
            .build()
            .map_err(|e| CoachError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| CoachError::Config(e.to_string()))?;

        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Assistants directory with `~` expanded.
    pub fn assistants_path(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.assistants_dir.to_string_lossy()).into_owned();
        PathBuf::from(expanded)
    }

    /// Zone attached to planned events: the configured one, else the host's.
    pub fn local_timezone(&self) -> Option<Tz> {
        if let Some(name) = &self.timezone {
            match name.parse::<Tz>() {
                Ok(tz) => return Some(tz),
                Err(_) => warn!(timezone = %name, "Unknown timezone in config, detecting host zone"),
            }
        }

        match iana_time_zone::get_timezone() {
            Ok(name) => name.parse::<Tz>().ok(),
            Err(e) => {
                warn!(error = %e, "Could not detect local timezone");
                None
            }
        }
    }

    /// Write a config file with every option commented out.
    pub fn create_default_config(path: &Path) -> CoachResult<()> {
        let contents = format!(
            "\
# coach configuration

# Where the assistant prompt templates (<name>.md) live:
# assistants_dir = \"{DEFAULT_ASSISTANTS_DIR}\"

# Calendar that receives the planned events:
# target_calendar = \"{DEFAULT_TARGET_CALENDAR}\"

# Calendars read to build the existing schedule (empty = all):
# source_calendars = [\"me@example.com\"]

# Expert assistants consulted in parallel:
# expert_assistants = [\"deporte\", \"estres\", \"medico\", \"nutri\"]

# planner_assistant = \"planner\"
# integrator_assistant = \"schedule_integrator\"
# formatter_assistant = \"calendar_formatter\"
# model = \"{DEFAULT_MODEL}\"

# Timezone for planned events (detected when unset):
# timezone = \"America/Santiago\"

# server_host = \"127.0.0.1\"
# server_port = 8000
"
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CoachError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| CoachError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CoachConfig::from_path(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.target_calendar, "PersonalCoach");
        assert_eq!(config.expert_assistants, vec!["deporte", "estres", "medico", "nutri"]);
        assert_eq!(config.planner_assistant, "planner");
        assert_eq!(config.server_port, 8000);
    }

    #[test]
    fn test_file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "target_calendar = \"Plan\"\nexpert_assistants = [\"a\", \"b\"]\ntimezone = \"Europe/Madrid\"\n",
        )
        .unwrap();

        let config = CoachConfig::from_path(&path).unwrap();

        assert_eq!(config.target_calendar, "Plan");
        assert_eq!(config.expert_assistants, vec!["a", "b"]);
        assert_eq!(config.local_timezone(), Some(chrono_tz::Europe::Madrid));
    }

    #[test]
    fn test_default_config_file_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        CoachConfig::create_default_config(&path).unwrap();
        let config = CoachConfig::from_path(&path).unwrap();

        assert_eq!(config.model, "gpt-4o");
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "target_calendar = \"Plan\"\nserver_port = 8001\n").unwrap();
        let env_vars = Map::from([
            ("COACH_TARGET_CALENDAR".to_string(), "Semana".to_string()),
            ("COACH_EXPERT_ASSISTANTS".to_string(), "deporte,nutri".to_string()),
            ("COACH_SOURCE_CALENDARS".to_string(), "me@example.com".to_string()),
            ("COACH_SERVER_PORT".to_string(), "9000".to_string()),
            ("OTHER_TARGET_CALENDAR".to_string(), "ignored".to_string()),
        ]);

        let config = CoachConfig::from_sources(&path, Some(env_vars)).unwrap();

        assert_eq!(config.target_calendar, "Semana");
        assert_eq!(config.expert_assistants, vec!["deporte", "nutri"]);
        assert_eq!(config.source_calendars, vec!["me@example.com"]);
        assert_eq!(config.server_port, 9000);
        assert_eq!(config.planner_assistant, "planner");
    }

    #[test]
    fn test_invalid_environment_value_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let env_vars = Map::from([("COACH_SERVER_PORT".to_string(), "many".to_string())]);

        let err = CoachConfig::from_sources(&dir.path().join("absent.toml"), Some(env_vars))
            .unwrap_err();

        assert!(matches!(err, CoachError::Config(_)));
    }
}
