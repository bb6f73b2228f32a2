//! Configuration file handling for Bommel.
//!
//! The configuration file is stored at `$BOMMEL_HOME/config.json` and names the organization
//! whose Bommel tree is being edited, along with display and statistics settings.

use crate::model::DEFAULT_CURRENCY;
use crate::{utils, Result};
use anyhow::{bail, ensure, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "bommel";
const CONFIG_VERSION: u8 = 1;
const CONFIG_JSON: &str = "config.json";
const LEDGER_JSON: &str = "ledger.json";
const TREE_JSON: &str = "tree.json";
const SNAPSHOT_JSON: &str = "snapshot.json";
const DEFAULT_ORGANIZATION_NAME: &str = "Organization";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$BOMMEL_HOME` and from there it loads `$BOMMEL_HOME/config.json`. It provides
/// paths to the other files that are expected in the bommel home directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
}

impl Config {
    /// Creates the data directory and an initial `config.json` in it.
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the root of data directory, e.g. `$HOME/bommel`
    /// - `organization_id` - The backend id of the organization.
    /// - `organization_name` - Used as the name of the root Bommel if the backend has to create
    ///   it. Defaults to "Organization".
    /// - `currency` - The symbol printed after amounts. Defaults to "€".
    ///
    /// # Errors
    /// - Returns an error if the directory already holds a `config.json` or if any file operation
    ///   fails.
    pub async fn create(
        dir: impl Into<PathBuf>,
        organization_id: i64,
        organization_name: Option<&str>,
        currency: Option<&str>,
    ) -> Result<Self> {
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the bommel home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let config_path = root.join(CONFIG_JSON);
        if config_path.is_file() {
            bail!(
                "A config file already exists at '{}'",
                config_path.display()
            )
        }

        let config_file = ConfigFile {
            organization_id,
            organization_name: non_blank(organization_name, DEFAULT_ORGANIZATION_NAME),
            currency: non_blank(currency, DEFAULT_CURRENCY),
            ..ConfigFile::default()
        };
        config_file.validate()?;
        config_file.save(&config_path).await?;

        Ok(Self {
            root,
            config_path,
            config_file,
        })
    }

    /// This will
    /// - validate that `bommel_home` exists and that the config file exists
    /// - load and validate the config file
    /// - return the loaded configuration object
    pub async fn load(bommel_home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = bommel_home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("Bommel Home is missing, run 'bommel init' first")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        Ok(Self {
            root,
            config_path,
            config_file,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// The local ledger used by the file backend.
    pub fn ledger_path(&self) -> PathBuf {
        self.root.join(LEDGER_JSON)
    }

    /// The working tree, including local edits that have not been pushed.
    pub fn tree_path(&self) -> PathBuf {
        self.root.join(TREE_JSON)
    }

    /// The tree as it was after the last pull or push.
    pub fn snapshot_path(&self) -> PathBuf {
        self.root.join(SNAPSHOT_JSON)
    }

    pub fn organization_id(&self) -> i64 {
        self.config_file.organization_id
    }

    pub fn organization_name(&self) -> &str {
        &self.config_file.organization_name
    }

    pub fn currency(&self) -> &str {
        &self.config_file.currency
    }

    /// Whether statistics count draft transactions unless told otherwise on the command line.
    pub fn include_drafts(&self) -> bool {
        self.config_file.include_drafts
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "bommel",
///   "config_version": 1,
///   "organization_id": 42,
///   "organization_name": "Sportverein Musterstadt",
///   "currency": "€",
///   "include_drafts": false
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "bommel"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// The backend id of the organization
    organization_id: i64,

    /// The name given to the root Bommel when it has to be created
    #[serde(default = "default_organization_name")]
    organization_name: String,

    /// Printed after every amount
    #[serde(default = "default_currency")]
    currency: String,

    /// Count draft transactions in statistics by default
    #[serde(default)]
    include_drafts: bool,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            organization_id: 0,
            organization_name: default_organization_name(),
            currency: default_currency(),
            include_drafts: false,
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile from the specified path and validates it.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if it fails validation.
    async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path)
            .await
            .context("Unable to load the config file")?;
        config.validate()?;
        Ok(config)
    }

    async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        utils::serialize(path.as_ref(), self)
            .await
            .context("Unable to write config file")
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            self.app_name
        );
        ensure!(
            self.organization_id > 0,
            "Invalid organization_id in config file: expected a positive number, got {}",
            self.organization_id
        );
        Ok(())
    }
}

fn default_organization_name() -> String {
    DEFAULT_ORGANIZATION_NAME.to_string()
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn non_blank(value: Option<&str>, default: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}
