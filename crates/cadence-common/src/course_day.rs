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

//! Course-day arithmetic. A user's course day is the number of business days
//! (Monday to Friday) from their subscription anchor through a calendar date,
//! both ends inclusive.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc};

/// Picks the anchor a subscription counts from: the start of the
/// subscription, else the moment it was paid. Dates are taken in the
/// deployment's canonical offset.
pub fn anchor_date(
    started_at: Option<DateTime<Utc>>,
    paid_at: Option<DateTime<Utc>>,
    offset: FixedOffset,
) -> Option<NaiveDate> {
    started_at
        .or(paid_at)
        .map(|at| at.with_timezone(&offset).date_naive())
}

/// Returns the course-day ordinal for `target`, or `None` when the user is
/// unscheduled: no anchor, a target before the anchor, or no business day in
/// between.
pub fn course_day(anchor: Option<NaiveDate>, target: NaiveDate) -> Option<u32> {
    let anchor = anchor?;
    if target < anchor {
        return None;
    }

    let days = (target - anchor).num_days() + 1;
    let full_weeks = days / 7;
    let remainder = days % 7;

    // anchor + 7n falls on the same weekday as the anchor
    let start = i64::from(anchor.weekday().num_days_from_monday());
    let partial = (0..remainder).filter(|i| (start + i) % 7 < 5).count() as i64;

    match u32::try_from(full_weeks * 5 + partial) {
        Ok(0) | Err(_) => None,
        Ok(ordinal) => Some(ordinal),
    }
}
