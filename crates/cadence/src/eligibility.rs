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

//! Decides which users a touch is due for at a given minute.

use cadence_common::{course_day::anchor_date, error::Result, touch::TouchType};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Timelike, Utc};
use sea_orm::DatabaseConnection;

use crate::db::{self, entities::users};

/// A user a touch should go to now, with what delivery needs to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueUser {
    pub user_id: i64,
    pub chat_id: i64,
    pub notify_at: NaiveTime,
    pub anchor: Option<NaiveDate>,
    /// Watermark before this delivery, restored if the send fails transiently.
    pub sent_at: Option<DateTime<Utc>>,
}

impl DueUser {
    pub fn new(user: &users::Model, touch: TouchType, offset: FixedOffset) -> Self {
        DueUser {
            user_id: user.id,
            chat_id: user.chat_id,
            notify_at: user.notify_time(touch),
            anchor: anchor_date(user.started_at, user.paid_at, offset),
            sent_at: user.sent_at(touch),
        }
    }
}

/// The local calendar date of `now` and the instant that date began.
pub fn local_day(now: DateTime<Utc>, offset: FixedOffset) -> (NaiveDate, DateTime<Utc>) {
    let date = now.with_timezone(&offset).date_naive();
    let start = date
        .and_time(NaiveTime::MIN)
        .and_local_timezone(offset)
        .single()
        .map(|start| start.with_timezone(&Utc))
        .unwrap_or(now);
    (date, start)
}

fn same_minute(a: NaiveTime, b: NaiveTime) -> bool {
    a.hour() == b.hour() && a.minute() == b.minute()
}

/// Pure form of the eligibility rule, for a user already loaded.
pub fn is_due(
    user: &users::Model,
    touch: TouchType,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> bool {
    let (date, _) = local_day(now, offset);
    let sent_today = user
        .sent_at(touch)
        .is_some_and(|at| at.with_timezone(&offset).date_naive() >= date);

    user.is_active
        && user.subscription.is_deliverable()
        && !sent_today
        && same_minute(user.notify_time(touch), now.with_timezone(&offset).time())
}

/// Users due for `touch` at the minute containing `now`. A missed minute is
/// never made up.
pub async fn due_users(
    touch: TouchType,
    now: DateTime<Utc>,
    offset: FixedOffset,
    db: &DatabaseConnection,
) -> Result<Vec<DueUser>> {
    let (_, day_start) = local_day(now, offset);
    let candidates = db::user::unsent_since(touch, day_start, db).await?;

    // One row per user id, so each user appears at most once.
    Ok(candidates
        .iter()
        .filter(|user| is_due(user, touch, now, offset))
        .map(|user| DueUser::new(user, touch, offset))
        .collect())
}
