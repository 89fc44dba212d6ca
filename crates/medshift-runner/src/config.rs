use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use medshift_core::ClinicId;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub clinic: ClinicConfig,
    pub database: DatabaseConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClinicConfig {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub file: String,
}

impl Config {
    pub fn default_for_clinic(clinic_id: &str) -> Self {
        Self {
            clinic: ClinicConfig {
                id: clinic_id.to_string(),
                name: clinic_id.to_string(),
            },
            database: DatabaseConfig {
                file: "medshift.db".to_string(),
            },
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: Config = toml::from_str(&s).with_context(|| "parse medshift.toml")?;
        Ok(cfg)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let s = toml::to_string_pretty(self).with_context(|| "serialize toml")?;
        std::fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    pub fn clinic_id(&self) -> ClinicId {
        ClinicId::from_str(self.clinic.id.clone())
    }

    pub fn config_path(data_dir: &Path) -> PathBuf {
        data_dir.join("medshift.toml")
    }

    pub fn db_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.database.file)
    }
}
