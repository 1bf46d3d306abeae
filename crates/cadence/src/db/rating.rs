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

use cadence_common::{cursor::RatingField, error::Result};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::*;

use super::entities::{prelude::*, *};
use super::timestamp;

fn column(field: RatingField) -> rating::Column {
    match field {
        RatingField::Energy => rating::Column::Energy,
        RatingField::Happiness => rating::Column::Happiness,
        RatingField::Progress => rating::Column::Progress,
        RatingField::Focus => rating::Column::Focus,
        RatingField::Calm => rating::Column::Calm,
    }
}

pub async fn get(
    user_id: i64,
    date: NaiveDate,
    db: &DatabaseConnection,
) -> Result<Option<rating::Model>> {
    let entry = Rating::find()
        .filter(rating::Column::UserId.eq(user_id))
        .filter(rating::Column::Date.eq(date))
        .one(db)
        .await?;
    Ok(entry)
}

/// Writes one field of the day's rating, creating the row on first use.
/// A repeated answer for the same field overwrites the earlier one.
pub async fn record(
    user_id: i64,
    date: NaiveDate,
    field: RatingField,
    value: u8,
    now: DateTime<Utc>,
    db: &DatabaseConnection,
) -> Result<rating::Model> {
    let value: Value = Some(i32::from(value)).into();
    let Some(existing) = get(user_id, date, db).await? else {
        let mut entry = rating::ActiveModel {
            user_id: ActiveValue::Set(user_id),
            date: ActiveValue::Set(date),
            updated_at: ActiveValue::Set(timestamp(now)),
            ..Default::default()
        };
        entry.set(column(field), value);
        return Ok(entry.insert(db).await?);
    };

    let mut existing: rating::ActiveModel = existing.into();
    existing.set(column(field), value);
    existing.updated_at = ActiveValue::Set(timestamp(now));
    Ok(existing.update(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{at, test_db};

    #[tokio::test]
    async fn last_value_wins_per_field() {
        let db = test_db().await;
        let date = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let now = at("2025-03-03T21:05:00Z");

        record(1, date, RatingField::Energy, 4, now, &db).await.unwrap();
        record(1, date, RatingField::Calm, 9, now, &db).await.unwrap();
        record(1, date, RatingField::Energy, 7, now, &db).await.unwrap();

        let rating = get(1, date, &db).await.unwrap().unwrap();
        assert_eq!(rating.energy, Some(7));
        assert_eq!(rating.calm, Some(9));
        assert_eq!(rating.focus, None);
        assert_eq!(Rating::find().count(&db).await.unwrap(), 1);
    }
}
