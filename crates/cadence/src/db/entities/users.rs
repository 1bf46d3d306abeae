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

use cadence_common::touch::{SubscriptionType, TouchType};
use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Telegram user id.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,
    pub chat_id: i64,
    pub username: Option<String>,
    pub subscription: SubscriptionType,
    pub started_at: Option<DateTimeUtc>,
    pub paid_at: Option<DateTimeUtc>,
    pub morning_time: Option<Time>,
    pub day_time: Option<Time>,
    pub evening_time: Option<Time>,
    pub morning_sent_at: Option<DateTimeUtc>,
    pub day_sent_at: Option<DateTimeUtc>,
    pub evening_sent_at: Option<DateTimeUtc>,
    pub is_active: bool,
    pub created_at: DateTimeUtc,
}

impl Model {
    /// The override for `touch` if set, else the touch default.
    pub fn notify_time(&self, touch: TouchType) -> Time {
        let custom = match touch {
            TouchType::Morning => self.morning_time,
            TouchType::Day => self.day_time,
            TouchType::Evening => self.evening_time,
        };
        custom.unwrap_or_else(|| touch.default_time())
    }

    pub fn sent_at(&self, touch: TouchType) -> Option<DateTimeUtc> {
        match touch {
            TouchType::Morning => self.morning_sent_at,
            TouchType::Day => self.day_sent_at,
            TouchType::Evening => self.evening_sent_at,
        }
    }
}

impl Column {
    pub fn notify_time(touch: TouchType) -> Self {
        match touch {
            TouchType::Morning => Column::MorningTime,
            TouchType::Day => Column::DayTime,
            TouchType::Evening => Column::EveningTime,
        }
    }

    pub fn sent_at(touch: TouchType) -> Self {
        match touch {
            TouchType::Morning => Column::MorningSentAt,
            TouchType::Day => Column::DaySentAt,
            TouchType::Evening => Column::EveningSentAt,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
