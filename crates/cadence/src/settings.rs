// Cadence
// Copyright (C) 2025 Throneless Tech

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Layered configuration: compiled defaults, then a TOML file, then
//! `CADENCE_` environment variables. Nested keys use `__` in the
//! environment (`CADENCE_BOT__TOKEN`), and any key may be read from a file
//! by suffixing `_FILE` (`CADENCE_BOT__TOKEN_FILE=/run/secrets/token`).

use cadence_common::error::{CadenceErrorKind, Result};
use chrono::{Duration, FixedOffset};
use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use figment_file_provider_adapter::FileAdapter;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bot: BotSettings,
    pub database: DatabaseSettings,
    pub schedule: ScheduleSettings,
    pub conversation: ConversationSettings,
    pub feedback: Option<ServiceSettings>,
    pub transcription: Option<ServiceSettings>,
    pub api: Option<ApiSettings>,
    pub telemetry: TelemetrySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotSettings {
    /// Distinguishes bot processes sharing one database.
    pub instance_id: String,
    pub token: String,
}

impl Default for BotSettings {
    fn default() -> Self {
        BotSettings {
            instance_id: "cadence".into(),
            token: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        let path = project_dirs()
            .map(|dirs| dirs.data_dir().join("cadence.db"))
            .unwrap_or_else(|| PathBuf::from("cadence.db"));
        DatabaseSettings {
            url: format!("sqlite://{}?mode=rwc", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    /// Offset of the deployment's canonical time zone from UTC.
    pub utc_offset_minutes: i32,
    /// Users delivered to in parallel within one tick.
    pub concurrency: usize,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        ScheduleSettings {
            utc_offset_minutes: 0,
            concurrency: 8,
        }
    }
}

impl ScheduleSettings {
    pub fn offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)).ok_or_else(|| {
            CadenceErrorKind::Config(format!(
                "schedule.utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            ))
            .into()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationSettings {
    pub ttl_seconds: i64,
}

impl Default for ConversationSettings {
    fn default() -> Self {
        ConversationSettings { ttl_seconds: 3600 }
    }
}

impl ConversationSettings {
    pub fn ttl(&self) -> Duration {
        Duration::seconds(self.ttl_seconds.max(1))
    }
}

/// An HTTP collaborator: the feedback generator or the transcriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSettings {
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSettings {
    pub bind: String,
    pub auth: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    pub otlp_endpoint: Option<String>,
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("tech", "throneless", "cadence")
}

fn env() -> FileAdapter {
    FileAdapter::wrap(Env::prefixed("CADENCE_").split("__"))
}

impl Settings {
    /// Loads settings from `path`, or from `cadence.toml` in the platform
    /// config directory when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Settings> {
        let file = path
            .map(Path::to_path_buf)
            .or_else(|| project_dirs().map(|dirs| dirs.config_dir().join("cadence.toml")));

        let mut figment = Figment::new().merge(Serialized::defaults(Settings::default()));
        if let Some(file) = file {
            figment = figment.merge(Toml::file(file));
        }
        Ok(figment.merge(env()).extract()?)
    }

    pub fn from_toml(content: &str) -> Result<Settings> {
        Ok(Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::string(content))
            .extract()?)
    }

    /// Checks what the long-running bot needs beyond what one-off commands
    /// need.
    pub fn validate_for_serve(&self) -> Result<()> {
        if self.bot.token.trim().is_empty() {
            return Err(CadenceErrorKind::Config("bot.token is required".into()).into());
        }
        if self.bot.instance_id.trim().is_empty() {
            return Err(CadenceErrorKind::Config("bot.instance_id cannot be empty".into()).into());
        }
        self.schedule.offset()?;
        Ok(())
    }
}
