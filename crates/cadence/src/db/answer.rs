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
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::*;

use super::entities::{prelude::*, *};
use super::timestamp;

#[derive(Debug, Clone)]
pub struct NewAnswer {
    pub user_id: i64,
    pub content_id: i32,
    pub date: NaiveDate,
    pub question_index: i32,
    pub question: String,
    pub text: String,
    pub feedback: Option<String>,
}

pub async fn create(
    answer: NewAnswer,
    now: DateTime<Utc>,
    db: &DatabaseConnection,
) -> Result<answer::Model> {
    let entry = answer::ActiveModel {
        user_id: ActiveValue::Set(answer.user_id),
        content_id: ActiveValue::Set(answer.content_id),
        date: ActiveValue::Set(answer.date),
        question_index: ActiveValue::Set(answer.question_index),
        question: ActiveValue::Set(answer.question),
        text: ActiveValue::Set(answer.text),
        feedback: ActiveValue::Set(answer.feedback),
        created_at: ActiveValue::Set(timestamp(now)),
        ..Default::default()
    };
    Ok(entry.insert(db).await?)
}

pub async fn list_by_user(
    user_id: i64,
    date: NaiveDate,
    db: &DatabaseConnection,
) -> Result<Vec<answer::Model>> {
    let entries = Answer::find()
        .filter(answer::Column::UserId.eq(user_id))
        .filter(answer::Column::Date.eq(date))
        .order_by_asc(answer::Column::Id)
        .all(db)
        .await?;
    Ok(entries)
}
