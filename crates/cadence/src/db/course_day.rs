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

use cadence_common::error::Result;
use sea_orm::*;

use super::entities::{prelude::*, *};

pub async fn get(ordinal: i32, db: &DatabaseConnection) -> Result<Option<course_day::Model>> {
    Ok(CourseDay::find_by_id(ordinal).one(db).await?)
}

pub async fn upsert(
    ordinal: i32,
    title: &str,
    is_active: bool,
    db: &DatabaseConnection,
) -> Result<course_day::Model> {
    let Some(existing) = CourseDay::find_by_id(ordinal).one(db).await? else {
        let entry = course_day::ActiveModel {
            ordinal: ActiveValue::Set(ordinal),
            title: ActiveValue::Set(title.to_owned()),
            is_active: ActiveValue::Set(is_active),
        };
        return Ok(entry.insert(db).await?);
    };

    let mut existing: course_day::ActiveModel = existing.into();
    existing.title = ActiveValue::Set(title.to_owned());
    existing.is_active = ActiveValue::Set(is_active);
    Ok(existing.update(db).await?)
}
