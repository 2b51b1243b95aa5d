//! MirrorBot configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use markstore::{Author, DEFAULT_MARKS_BRANCH, FileMarkStorage, GitMarkStorage, MARKS_FILE, MarkStorage};

use crate::encode::{mirror_key, url_encode};
use crate::mirror::MirrorBot;
use crate::scheduler::RunnerConfig;

fn data_dir() -> PathBuf {
    dirs::data_local_dir().unwrap_or_else(std::env::temp_dir).join("mirrorbot")
}

/// Main MirrorBot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cache of source clones, one directory per source URI
    pub storage: PathBuf,

    /// Log level used when neither --verbose nor --debug is given
    #[serde(rename = "log-level")]
    pub log_level: String,

    /// Runner settings
    pub runner: RunnerConfig,

    /// Where marks are kept
    pub marks: MarksConfig,

    /// Configured mirrors
    pub mirrors: Vec<MirrorConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: data_dir().join("storage"),
            log_level: "warn".to_string(),
            runner: RunnerConfig::default(),
            marks: MarksConfig::default(),
            mirrors: Vec::new(),
        }
    }
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        let mut targets = HashSet::new();
        for mirror in &self.mirrors {
            if !targets.insert(&mirror.to) {
                return Err(eyre::eyre!(
                    "Mirror target {} is configured more than once",
                    mirror.to.display()
                ));
            }
        }
        if self.marks.kind == MarksKind::Git {
            if self.marks.url.is_none() {
                return Err(eyre::eyre!("marks.url is required when marks.kind is git"));
            }
            let mut namespaces = HashSet::new();
            for mirror in &self.mirrors {
                let namespace = self.marks_namespace(mirror);
                if !namespaces.insert(namespace.clone()) {
                    return Err(eyre::eyre!(
                        "Marks namespace {} is used by more than one mirror ({}:{})",
                        namespace,
                        mirror.from,
                        mirror.branch
                    ));
                }
            }
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Project-local config: ./mirrorbot.yml
        let local_config = PathBuf::from("mirrorbot.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // User config: ~/.config/mirrorbot/mirrorbot.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("mirrorbot").join("mirrorbot.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Label of a mirror inside a git-backed mark store
    pub fn marks_namespace(&self, mirror: &MirrorConfig) -> String {
        mirror
            .namespace
            .clone()
            .unwrap_or_else(|| mirror_key(&mirror.from, &mirror.branch))
    }

    /// Mark storage of one mirror
    pub fn mark_storage_for(&self, mirror: &MirrorConfig) -> Result<Arc<dyn MarkStorage>> {
        match self.marks.kind {
            MarksKind::File => {
                let path = self
                    .marks
                    .path
                    .join(url_encode(&mirror.to.to_string_lossy()))
                    .join(MARKS_FILE);
                Ok(Arc::new(FileMarkStorage::new(path)))
            }
            MarksKind::Git => {
                let url = self
                    .marks
                    .url
                    .clone()
                    .ok_or_else(|| eyre::eyre!("marks.url is required when marks.kind is git"))?;
                let author = Author::new(&self.marks.author_name, &self.marks.author_email);
                let namespace = self.marks_namespace(mirror);
                let storage = GitMarkStorage::new(url, author, &namespace).with_branch(&self.marks.branch);
                Ok(Arc::new(storage))
            }
        }
    }

    /// One bot per configured mirror
    pub fn bots(&self) -> Result<Vec<MirrorBot>> {
        self.mirrors
            .iter()
            .map(|mirror| {
                let marks = self.mark_storage_for(mirror)?;
                Ok(MirrorBot::new(
                    &mirror.from,
                    &mirror.branch,
                    &mirror.to,
                    &self.storage,
                    marks,
                ))
            })
            .collect()
    }
}

/// Mark storage backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarksKind {
    #[default]
    File,
    Git,
}

/// Mark storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarksConfig {
    pub kind: MarksKind,

    /// Root of the file backend
    pub path: PathBuf,

    /// Backing repository of the git backend
    pub url: Option<String>,

    /// Branch of the backing repository
    pub branch: String,

    #[serde(rename = "author-name")]
    pub author_name: String,

    #[serde(rename = "author-email")]
    pub author_email: String,
}

impl Default for MarksConfig {
    fn default() -> Self {
        Self {
            kind: MarksKind::File,
            path: data_dir().join("marks"),
            url: None,
            branch: DEFAULT_MARKS_BRANCH.to_string(),
            author_name: "mirrorbot".to_string(),
            author_email: "mirrorbot@localhost".to_string(),
        }
    }
}

/// One mirrored branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorConfig {
    pub from: String,
    pub branch: String,
    pub to: PathBuf,

    /// Label inside a git-backed mark store, defaults to the source URI and branch
    #[serde(default)]
    pub namespace: Option<String>,
}
