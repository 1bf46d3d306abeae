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

use cadence_common::{error::Result, touch::TouchType};
use chrono::{DateTime, Utc};
use sea_orm::*;

use super::entities::{prelude::*, *};
use super::timestamp;

fn active(touch: TouchType) -> Select<TouchContent> {
    TouchContent::find()
        .filter(touch_content::Column::TouchType.eq(touch))
        .filter(touch_content::Column::IsActive.eq(true))
        .order_by_asc(touch_content::Column::Position)
        .order_by_desc(touch_content::Column::UpdatedAt)
        .order_by_desc(touch_content::Column::Id)
}

pub async fn for_day(
    touch: TouchType,
    ordinal: i32,
    db: &DatabaseConnection,
) -> Result<Option<touch_content::Model>> {
    Ok(active(touch)
        .filter(touch_content::Column::CourseDay.eq(ordinal))
        .one(db)
        .await?)
}

pub async fn default_for(
    touch: TouchType,
    db: &DatabaseConnection,
) -> Result<Option<touch_content::Model>> {
    Ok(active(touch)
        .filter(touch_content::Column::CourseDay.is_null())
        .one(db)
        .await?)
}

pub async fn any_for(
    touch: TouchType,
    db: &DatabaseConnection,
) -> Result<Option<touch_content::Model>> {
    Ok(active(touch).one(db).await?)
}

#[derive(Debug, Clone, Default)]
pub struct NewContent {
    pub title: String,
    pub course_day: Option<i32>,
    pub video_file: Option<String>,
    pub video_url: Option<String>,
    pub transcript: Option<String>,
    pub summary: Option<String>,
    pub questions: Option<String>,
    pub is_active: bool,
    pub position: i32,
}

pub async fn create(
    touch: TouchType,
    content: NewContent,
    now: DateTime<Utc>,
    db: &DatabaseConnection,
) -> Result<touch_content::Model> {
    let entry = touch_content::ActiveModel {
        touch_type: ActiveValue::Set(touch),
        course_day: ActiveValue::Set(content.course_day),
        title: ActiveValue::Set(content.title),
        video_file: ActiveValue::Set(content.video_file),
        video_url: ActiveValue::Set(content.video_url),
        transcript: ActiveValue::Set(content.transcript),
        summary: ActiveValue::Set(content.summary),
        questions: ActiveValue::Set(content.questions),
        is_active: ActiveValue::Set(content.is_active),
        position: ActiveValue::Set(content.position),
        updated_at: ActiveValue::Set(timestamp(now)),
        ..Default::default()
    };
    Ok(entry.insert(db).await?)
}

/// Replaces the content item identified by touch type, course day and
/// title, or creates it.
pub async fn upsert(
    touch: TouchType,
    content: NewContent,
    now: DateTime<Utc>,
    db: &DatabaseConnection,
) -> Result<touch_content::Model> {
    let day = match content.course_day {
        Some(day) => touch_content::Column::CourseDay.eq(day),
        None => touch_content::Column::CourseDay.is_null(),
    };
    let Some(existing) = TouchContent::find()
        .filter(touch_content::Column::TouchType.eq(touch))
        .filter(touch_content::Column::Title.eq(&content.title))
        .filter(day)
        .one(db)
        .await?
    else {
        return create(touch, content, now, db).await;
    };

    let mut existing: touch_content::ActiveModel = existing.into();
    existing.video_file = ActiveValue::Set(content.video_file);
    existing.video_url = ActiveValue::Set(content.video_url);
    existing.transcript = ActiveValue::Set(content.transcript);
    existing.summary = ActiveValue::Set(content.summary);
    existing.questions = ActiveValue::Set(content.questions);
    existing.is_active = ActiveValue::Set(content.is_active);
    existing.position = ActiveValue::Set(content.position);
    existing.updated_at = ActiveValue::Set(timestamp(now));
    Ok(existing.update(db).await?)
}
