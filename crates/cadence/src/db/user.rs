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

use cadence_common::{
    error::Result,
    touch::{SubscriptionType, TouchType},
};
use chrono::{DateTime, NaiveTime, Utc};
use sea_orm::{sea_query::Expr, *};

use super::entities::{prelude::*, *};
use super::timestamp;

pub async fn get(id: i64, db: &DatabaseConnection) -> Result<Option<users::Model>> {
    Ok(Users::find_by_id(id).one(db).await?)
}

/// Registers a user on first contact, or refreshes the chat details and
/// reactivates an existing one.
pub async fn ensure(
    id: i64,
    chat_id: i64,
    username: Option<&str>,
    now: DateTime<Utc>,
    db: &DatabaseConnection,
) -> Result<users::Model> {
    let Some(existing) = Users::find_by_id(id).one(db).await? else {
        let entry = users::ActiveModel {
            id: ActiveValue::Set(id),
            chat_id: ActiveValue::Set(chat_id),
            username: ActiveValue::Set(username.map(str::to_owned)),
            subscription: ActiveValue::Set(SubscriptionType::Unsubscribed),
            is_active: ActiveValue::Set(true),
            created_at: ActiveValue::Set(timestamp(now)),
            ..Default::default()
        };
        return Ok(entry.insert(db).await?);
    };

    if existing.is_active
        && existing.chat_id == chat_id
        && existing.username.as_deref() == username
    {
        return Ok(existing);
    }

    let mut existing: users::ActiveModel = existing.into();
    existing.chat_id = ActiveValue::Set(chat_id);
    existing.username = ActiveValue::Set(username.map(str::to_owned));
    existing.is_active = ActiveValue::Set(true);
    Ok(existing.update(db).await?)
}

pub async fn deactivate(id: i64, db: &DatabaseConnection) -> Result<()> {
    Users::update_many()
        .col_expr(users::Column::IsActive, Expr::value(false))
        .filter(users::Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(())
}

/// Active, subscribed users whose `touch` watermark is empty or older than
/// `day_start`. The time-of-day check is left to the caller.
pub async fn unsent_since(
    touch: TouchType,
    day_start: DateTime<Utc>,
    db: &DatabaseConnection,
) -> Result<Vec<users::Model>> {
    let sent_at = users::Column::sent_at(touch);
    let entries = Users::find()
        .filter(users::Column::IsActive.eq(true))
        .filter(users::Column::Subscription.is_in(SubscriptionType::DELIVERABLE))
        .filter(
            Condition::any()
                .add(sent_at.is_null())
                .add(sent_at.lt(timestamp(day_start))),
        )
        .order_by_asc(users::Column::Id)
        .all(db)
        .await?;
    Ok(entries)
}

/// Moves the `touch` watermark to `now` if it is still unclaimed for the day
/// starting at `day_start`. Returns whether this caller won the claim.
/// With `force` the watermark is taken regardless of its current value.
pub async fn claim(
    id: i64,
    touch: TouchType,
    now: DateTime<Utc>,
    day_start: DateTime<Utc>,
    force: bool,
    db: &DatabaseConnection,
) -> Result<bool> {
    let sent_at = users::Column::sent_at(touch);
    let mut update = Users::update_many()
        .col_expr(sent_at, Expr::value(timestamp(now)))
        .filter(users::Column::Id.eq(id));
    if !force {
        update = update.filter(
            Condition::any()
                .add(sent_at.is_null())
                .add(sent_at.lt(timestamp(day_start))),
        );
    }
    let res = update.exec(db).await?;
    Ok(res.rows_affected == 1)
}

/// Puts back the watermark a claim replaced, unless something else has
/// moved it since.
pub async fn release(
    id: i64,
    touch: TouchType,
    claimed_at: DateTime<Utc>,
    previous: Option<DateTime<Utc>>,
    db: &DatabaseConnection,
) -> Result<()> {
    let sent_at = users::Column::sent_at(touch);
    Users::update_many()
        .col_expr(sent_at, Expr::value(previous.map(timestamp)))
        .filter(users::Column::Id.eq(id))
        .filter(sent_at.eq(timestamp(claimed_at)))
        .exec(db)
        .await?;
    Ok(())
}

/// Sets or clears a notification time override. Returns `false` when the
/// user does not exist.
pub async fn set_notify_time(
    id: i64,
    touch: TouchType,
    time: Option<NaiveTime>,
    db: &DatabaseConnection,
) -> Result<bool> {
    let res = Users::update_many()
        .col_expr(users::Column::notify_time(touch), Expr::value(time))
        .filter(users::Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(res.rows_affected == 1)
}
