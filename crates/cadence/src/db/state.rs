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

use cadence_common::{cursor::Owner, error::Result};
use chrono::{DateTime, Utc};
use sea_orm::*;

use super::entities::{prelude::*, *};
use super::timestamp;

fn by_owner(owner: &Owner) -> Select<ConversationState> {
    ConversationState::find()
        .filter(conversation_state::Column::BotId.eq(&owner.bot_id))
        .filter(conversation_state::Column::UserId.eq(owner.user_id))
}

/// Returns the stored value unless it expired before `now`.
pub async fn get(
    owner: &Owner,
    now: DateTime<Utc>,
    db: &DatabaseConnection,
) -> Result<Option<conversation_state::Model>> {
    let entry = by_owner(owner)
        .filter(conversation_state::Column::ExpiresAt.gt(timestamp(now)))
        .one(db)
        .await?;
    Ok(entry)
}

pub async fn set(
    owner: &Owner,
    value: &str,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
    db: &DatabaseConnection,
) -> Result<()> {
    let Some(existing) = by_owner(owner).one(db).await? else {
        let entry = conversation_state::ActiveModel {
            id: ActiveValue::Set(uuid::Uuid::new_v4().to_string()),
            bot_id: ActiveValue::Set(owner.bot_id.to_owned()),
            user_id: ActiveValue::Set(owner.user_id),
            value: ActiveValue::Set(value.to_owned()),
            expires_at: ActiveValue::Set(timestamp(expires_at)),
            created_at: ActiveValue::Set(timestamp(now)),
            updated_at: ActiveValue::Set(timestamp(now)),
        };
        entry.insert(db).await?;
        return Ok(());
    };

    let mut existing: conversation_state::ActiveModel = existing.into();
    existing.value = ActiveValue::Set(value.to_owned());
    existing.expires_at = ActiveValue::Set(timestamp(expires_at));
    existing.updated_at = ActiveValue::Set(timestamp(now));
    existing.update(db).await?;
    Ok(())
}

pub async fn delete(owner: &Owner, db: &DatabaseConnection) -> Result<()> {
    ConversationState::delete_many()
        .filter(conversation_state::Column::BotId.eq(&owner.bot_id))
        .filter(conversation_state::Column::UserId.eq(owner.user_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Removes every entry that expired at or before `now`, for all bot
/// instances. Returns the number of rows removed.
pub async fn purge_expired(now: DateTime<Utc>, db: &DatabaseConnection) -> Result<u64> {
    let res = ConversationState::delete_many()
        .filter(conversation_state::Column::ExpiresAt.lte(timestamp(now)))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}
