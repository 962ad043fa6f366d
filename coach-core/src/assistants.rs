//! Assistant prompt templates, one markdown file per assistant.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::error::{CoachError, CoachResult};

const TEMPLATE_EXTENSION: &str = "md";

/// Templates loaded from a directory of `<name>.md` files.
#[derive(Debug, Clone, Default)]
pub struct AssistantStore {
    dir: PathBuf,
    templates: BTreeMap<String, String>,
}

impl AssistantStore {
    /// Load every `*.md` file in `dir`. A missing directory gives an empty store.
    pub fn load(dir: &Path) -> CoachResult<Self> {
        let mut templates = BTreeMap::new();

        if !dir.is_dir() {
            warn!(dir = %dir.display(), "Assistants directory not found, no assistants loaded");
            return Ok(AssistantStore {
                dir: dir.to_path_buf(),
                templates,
            });
        }

        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(TEMPLATE_EXTENSION) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            match std::fs::read_to_string(&path) {
                Ok(contents) => {
                    debug!(assistant = name, "Loaded assistant template");
                    templates.insert(name.to_string(), contents.trim().to_string());
                }
                Err(e) => error!(path = %path.display(), error = %e, "Could not read assistant template"),
            }
        }

        info!(count = templates.len(), dir = %dir.display(), "Loaded assistants");
        Ok(AssistantStore {
            dir: dir.to_path_buf(),
            templates,
        })
    }

    /// Build a store from in-memory templates.
    pub fn from_templates<I, K, V>(templates: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        AssistantStore {
            dir: PathBuf::new(),
            templates: templates
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Trimmed template text.
    pub fn get(&self, name: &str) -> CoachResult<&str> {
        self.templates
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| CoachError::TemplateNotFound(name.to_string()))
    }

    /// Fail with every missing name at once.
    pub fn require<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> CoachResult<()> {
        let missing: Vec<String> = names
            .into_iter()
            .filter(|name| !self.contains(name))
            .map(str::to_string)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CoachError::MissingTemplates {
                dir: self.dir.display().to_string(),
                names: missing,
            })
        }
    }

    /// File content exactly as stored on disk, read fresh.
    pub fn raw_template(&self, name: &str) -> CoachResult<String> {
        validate_name(name)?;

        let path = self.dir.join(format!("{name}.{TEMPLATE_EXTENSION}"));
        if !path.is_file() {
            return Err(CoachError::TemplateNotFound(name.to_string()));
        }

        Ok(std::fs::read_to_string(path)?)
    }
}

fn validate_name(name: &str) -> CoachResult<()> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(CoachError::InvalidTemplateName(name.to_string()));
    }
    Ok(())
}
