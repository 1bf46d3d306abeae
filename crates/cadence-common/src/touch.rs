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

use chrono::NaiveTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three fixed touches of a course day, in delivery order.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum TouchType {
    #[sea_orm(string_value = "morning")]
    Morning,
    #[sea_orm(string_value = "day")]
    Day,
    #[sea_orm(string_value = "evening")]
    Evening,
}

impl TouchType {
    pub const ALL: [TouchType; 3] = [TouchType::Morning, TouchType::Day, TouchType::Evening];

    /// Notification time used when a user has no override for this touch.
    pub fn default_time(&self) -> NaiveTime {
        let hour = match self {
            TouchType::Morning => 9,
            TouchType::Day => 12,
            TouchType::Evening => 21,
        };
        NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TouchType::Morning => "morning",
            TouchType::Day => "day",
            TouchType::Evening => "evening",
        }
    }
}

impl fmt::Display for TouchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TouchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" => Ok(TouchType::Morning),
            "day" => Ok(TouchType::Day),
            "evening" => Ok(TouchType::Evening),
            other => Err(format!("unknown touch type `{other}`")),
        }
    }
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionType {
    #[sea_orm(string_value = "trial")]
    Trial,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "free_week")]
    FreeWeek,
    #[sea_orm(string_value = "monthly")]
    Monthly,
    #[default]
    #[sea_orm(string_value = "none")]
    Unsubscribed,
}

impl SubscriptionType {
    /// Only trial and paid subscriptions receive scheduled touches.
    pub const DELIVERABLE: [SubscriptionType; 2] =
        [SubscriptionType::Trial, SubscriptionType::Paid];

    pub fn is_deliverable(&self) -> bool {
        Self::DELIVERABLE.contains(self)
    }
}
