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

//! Picks the content item a touch delivers on a given course day.

use cadence_common::{error::Result, touch::TouchType};
use sea_orm::DatabaseConnection;
use tracing::debug;

use crate::db::{self, entities::touch_content};

/// Resolves content for `touch` on course day `ordinal`, trying in turn:
/// content linked to that day, the default content for the touch type, and
/// finally any other active content of the type. Within a tier the lowest
/// position wins, then the most recently updated. An unscheduled user
/// (`ordinal` is `None`) starts at the default tier, and so does a course
/// day that has been switched off.
pub async fn resolve(
    touch: TouchType,
    ordinal: Option<u32>,
    db: &DatabaseConnection,
) -> Result<Option<touch_content::Model>> {
    if let Some(ordinal) = ordinal.and_then(|o| i32::try_from(o).ok()) {
        let day_enabled = db::course_day::get(ordinal, db)
            .await?
            .is_none_or(|day| day.is_active);
        if day_enabled {
            if let Some(content) = db::content::for_day(touch, ordinal, db).await? {
                return Ok(Some(content));
            }
        } else {
            debug!(ordinal, "Course day disabled");
        }
    }

    if let Some(content) = db::content::default_for(touch, db).await? {
        return Ok(Some(content));
    }

    let content = db::content::any_for(touch, db).await?;
    if content.is_none() {
        debug!(%touch, ?ordinal, "No active content");
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::content::NewContent;
    use crate::utils::{at, seed_content, test_db};

    #[tokio::test]
    async fn prefers_day_content_then_default() {
        let db = test_db().await;
        let default = seed_content(TouchType::Morning, None, 0, &db).await;
        let day_two = seed_content(TouchType::Morning, Some(2), 0, &db).await;

        let got = resolve(TouchType::Morning, Some(2), &db).await.unwrap().unwrap();
        assert_eq!(got.id, day_two.id);

        let got = resolve(TouchType::Morning, Some(3), &db).await.unwrap().unwrap();
        assert_eq!(got.id, default.id);

        let got = resolve(TouchType::Morning, None, &db).await.unwrap().unwrap();
        assert_eq!(got.id, default.id);
    }

    #[tokio::test]
    async fn default_alone_serves_every_day() {
        let db = test_db().await;
        let default = seed_content(TouchType::Evening, None, 0, &db).await;
        for ordinal in [None, Some(1), Some(17), Some(400)] {
            let got = resolve(TouchType::Evening, ordinal, &db).await.unwrap().unwrap();
            assert_eq!(got.id, default.id);
        }
    }

    #[tokio::test]
    async fn falls_back_to_any_content_of_the_type() {
        let db = test_db().await;
        let other_day = seed_content(TouchType::Day, Some(9), 0, &db).await;
        seed_content(TouchType::Morning, Some(1), 0, &db).await;

        let got = resolve(TouchType::Day, Some(1), &db).await.unwrap().unwrap();
        assert_eq!(got.id, other_day.id);
        assert!(resolve(TouchType::Evening, Some(1), &db).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn position_then_recency_break_ties() {
        let db = test_db().await;
        let content = |title: &str, position| NewContent {
            title: title.into(),
            course_day: Some(1),
            is_active: true,
            position,
            ..Default::default()
        };
        db::content::create(TouchType::Morning, content("late", 5), at("2025-03-03T00:00:00Z"), &db)
            .await
            .unwrap();
        let older = db::content::create(
            TouchType::Morning,
            content("older", 1),
            at("2025-03-01T00:00:00Z"),
            &db,
        )
        .await
        .unwrap();
        let newer = db::content::create(
            TouchType::Morning,
            content("newer", 1),
            at("2025-03-02T00:00:00Z"),
            &db,
        )
        .await
        .unwrap();
        let mut inactive = content("inactive", 0);
        inactive.is_active = false;
        db::content::create(TouchType::Morning, inactive, at("2025-03-04T00:00:00Z"), &db)
            .await
            .unwrap();

        let got = resolve(TouchType::Morning, Some(1), &db).await.unwrap().unwrap();
        assert_eq!(got.id, newer.id);
        assert_ne!(got.id, older.id);
    }

    #[tokio::test]
    async fn disabled_course_day_skips_its_content() {
        let db = test_db().await;
        let default = seed_content(TouchType::Morning, None, 0, &db).await;
        seed_content(TouchType::Morning, Some(4), 0, &db).await;
        db::course_day::upsert(4, "Rest", false, &db).await.unwrap();

        let got = resolve(TouchType::Morning, Some(4), &db).await.unwrap().unwrap();
        assert_eq!(got.id, default.id);
    }
}
