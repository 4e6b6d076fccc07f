use crate::errors::AppError;
use crate::heart_rate::ble::{HEART_RATE_MEASUREMENT_CHARACTERISTIC_UUID, HEART_RATE_SERVICE_UUID};
use crate::session::SessionConfig;

use config::{Config, ConfigError, File as ConfigFile, FileFormat};
use serde_derive::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tracing::level_filters::LevelFilter;
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BLESettings {
    pub service_uuid: Uuid,
    pub characteristic_uuid: Uuid,
    pub scan_timeout_secs: f64,
    pub connect_timeout_secs: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MiscSettings {
    log_level: String,
    pub report_rr_intervals: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    pub ble: BLESettings,
    pub misc: MiscSettings,
}

impl Settings {
    /// Layers the file at `config_path` (if any) over the built-in defaults.
    pub fn load(config_path: &Path, required: bool) -> Result<Self, ConfigError> {
        let default_log_level = if cfg!(debug_assertions) {
            "debug"
        } else {
            "info"
        };

        let s = Config::builder()
            .add_source(
                ConfigFile::from(config_path)
                    .format(FileFormat::Toml)
                    .required(required),
            )
            .set_default("ble.service_uuid", HEART_RATE_SERVICE_UUID.to_string())?
            .set_default(
                "ble.characteristic_uuid",
                HEART_RATE_MEASUREMENT_CHARACTERISTIC_UUID.to_string(),
            )?
            .set_default("ble.scan_timeout_secs", 10.0)?
            .set_default("ble.connect_timeout_secs", 20.0)?
            .set_default("misc.log_level", default_log_level)?
            .set_default("misc.report_rr_intervals", false)?
            .build()?;

        s.try_deserialize()
    }
    pub fn save(&self, config_path: &Path) -> Result<(), AppError> {
        let toml_string = toml::to_string(self)?;

        let mut file = File::create(config_path).map_err(|e| AppError::CreateFile {
            path: config_path.to_owned(),
            source: e,
        })?;
        file.write_all(toml_string.as_bytes())?;

        Ok(())
    }
    pub fn session_config(&self) -> Result<SessionConfig, AppError> {
        Ok(SessionConfig {
            service_uuid: self.ble.service_uuid,
            characteristic_uuid: self.ble.characteristic_uuid,
            scan_timeout: secs_to_duration("ble.scan_timeout_secs", self.ble.scan_timeout_secs)?,
            connect_timeout: secs_to_duration(
                "ble.connect_timeout_secs",
                self.ble.connect_timeout_secs,
            )?,
        })
    }
    pub fn get_log_level(&self) -> LevelFilter {
        match self.misc.log_level.to_lowercase().as_str() {
            "off" => LevelFilter::OFF,
            "error" => LevelFilter::ERROR,
            "warn" => LevelFilter::WARN,
            "info" => LevelFilter::INFO,
            "debug" => LevelFilter::DEBUG,
            "trace" => LevelFilter::TRACE,
            _ => LevelFilter::INFO,
        }
    }
}

fn secs_to_duration(key: &'static str, secs: f64) -> Result<Duration, AppError> {
    Duration::try_from_secs_f64(secs).map_err(|_| AppError::InvalidTimeout(key, secs))
}
