use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::CovError;
use crate::logging::Logger;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EmailConfig {
    pub recipients: Vec<String>,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    pub excel_file: PathBuf,
    pub sheet_name: String,
    pub heatmap_output: PathBuf,
    pub latex_template: PathBuf,
    pub report_output_dir: PathBuf,
    pub report_filename: String,
    #[serde(default)]
    pub email: Option<EmailConfig>,
}

impl Config {
    /// Load the settings document, rewriting relative path settings to
    /// absolute ones based on the document's own directory.
    pub fn load(path: &Path, logger: &Logger) -> Result<Self, CovError> {
        if !path.exists() {
            return Err(CovError::InputNotFound(path.to_path_buf()));
        }
        let raw = fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&raw)?;

        let base_dir = base_dir_of(path)?;
        config.excel_file = absolutize(&base_dir, config.excel_file);
        config.heatmap_output = absolutize(&base_dir, config.heatmap_output);
        config.latex_template = absolutize(&base_dir, config.latex_template);
        config.report_output_dir = absolutize(&base_dir, config.report_output_dir);

        logger.debug(&format!("Configuration loaded: {:?}", config));
        Ok(config)
    }

    /// The email block is only required once the notify step runs.
    pub fn email(&self) -> Result<&EmailConfig, CovError> {
        self.email
            .as_ref()
            .ok_or_else(|| CovError::MissingSetting("email".to_string()))
    }

    /// Where the composed report document lands.
    pub fn report_path(&self) -> PathBuf {
        self.report_output_dir.join(&self.report_filename)
    }
}

fn base_dir_of(config_path: &Path) -> Result<PathBuf, CovError> {
    let absolute = if config_path.is_absolute() {
        config_path.to_path_buf()
    } else {
        env::current_dir()?.join(config_path)
    };
    Ok(absolute
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/")))
}

fn absolutize(base_dir: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}
