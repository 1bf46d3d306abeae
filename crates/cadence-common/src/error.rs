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

use sea_orm::DbErr;
use serde_json::Error as SerdeError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error, thiserror_ext::Box)]
#[thiserror_ext(newtype(name = CadenceError))]
pub enum CadenceErrorKind {
    #[error("API error: `{0}`")]
    Api(String),
    #[error("Configuration error: `{0}`")]
    Config(String),
    #[error("Database error: `{0}`")]
    Db(#[from] DbErr),
    #[error("I/O error: `{0}`")]
    Io(#[from] io::Error),
    #[error("Figment error: `{0}`")]
    Figment(#[from] figment::Error),
    #[error("Serialization/deserialization error: `{0}`")]
    Serde(#[from] SerdeError),
    #[error("Corrupted conversation cursor: `{0}`")]
    CorruptedCursor(String),
    #[error("Channel error: `{0}`")]
    Channel(String),
    #[error("Service error: `{0}`")]
    Service(String),
    #[error("Service timed out after {0} ms")]
    ServiceTimeout(u64),
    #[error("OpenTelemetry build error: `{0}`")]
    OpenTelemetry(#[from] opentelemetry_otlp::ExporterBuildError),
}

pub type Result<T> = std::result::Result<T, CadenceError>;
