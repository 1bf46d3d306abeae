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

//! Request and response bodies shared by the admin API and the CLI.

use serde::{Deserialize, Serialize};

use crate::touch::TouchType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualSendRequest {
    pub touch: TouchType,
    pub user_ids: Vec<i64>,
    /// Deliver even if the touch already went out today.
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Delivered,
    /// The primary message went out but a later part failed.
    Partial { reason: String },
    NoContent,
    AlreadySent,
    /// Manual send to an inactive or unsubscribed user.
    Ineligible { reason: String },
    Transient { reason: String },
    Permanent { reason: String },
    UnknownUser,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub user_id: i64,
    pub touch: TouchType,
    #[serde(flatten)]
    pub outcome: DeliveryOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ManualSendResponse {
    pub reports: Vec<DeliveryReport>,
}
