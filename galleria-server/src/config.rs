use galleria_core::{GalleryError, Result, TranscodeSettings};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub bind_addr: String,
    /// Blob store root, and the default home of the database.
    pub data_dir: PathBuf,
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    /// Gallery used by uploads that do not name one.
    #[serde(default = "default_gallery")]
    pub default_gallery: String,
    #[serde(default)]
    pub transcode: TranscodeSettings,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_gallery() -> String {
    "default".to_string()
}

fn default_max_upload_bytes() -> usize {
    30 * 1024 * 1024
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name(path))
            .add_source(::config::Environment::with_prefix("GALLERIA").separator("__"))
            .build()
            .map_err(|e| GalleryError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| GalleryError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("galleria.db"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.bind_addr.trim().is_empty() {
            return Err(GalleryError::Config("bind_addr must not be empty".to_string()));
        }
        if self.default_gallery.trim().is_empty() {
            return Err(GalleryError::Config(
                "default_gallery must not be empty".to_string(),
            ));
        }

        for (name, variant) in [
            ("large", &self.transcode.large),
            ("thumbnail", &self.transcode.thumbnail),
        ] {
            if variant.max_dimension == 0 {
                return Err(GalleryError::Config(format!(
                    "transcode.{}.max_dimension must be positive",
                    name
                )));
            }
            if !(1..=100).contains(&variant.jpeg_quality) {
                return Err(GalleryError::Config(format!(
                    "transcode.{}.jpeg_quality must be within 1..=100, got {}",
                    name, variant.jpeg_quality
                )));
            }
        }
        Ok(())
    }
}
