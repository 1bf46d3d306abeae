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
    cursor::{ConversationCursor, Owner},
    error::{CadenceErrorKind, Result},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::DatabaseConnection;
use tracing::debug;

use crate::db;

/// Cursor persistence shared by every process serving one bot instance.
/// Each write pushes the expiry `ttl` past the write; an expired cursor
/// reads as absent.
#[derive(Clone, Debug)]
pub struct ConversationStore {
    db: DatabaseConnection,
    bot_id: String,
    ttl: Duration,
}

impl ConversationStore {
    pub fn new(db: DatabaseConnection, bot_id: impl Into<String>, ttl: Duration) -> Self {
        ConversationStore {
            db,
            bot_id: bot_id.into(),
            ttl,
        }
    }

    pub fn owner(&self, user_id: i64) -> Owner {
        Owner::new(self.bot_id.clone(), user_id)
    }

    pub async fn seed(
        &self,
        owner: &Owner,
        cursor: &ConversationCursor,
        now: DateTime<Utc>,
    ) -> Result<()> {
        debug!(user_id = owner.user_id, touch = %cursor.touch, "Seeding cursor");
        self.save(owner, cursor, now).await
    }

    pub async fn save(
        &self,
        owner: &Owner,
        cursor: &ConversationCursor,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let value = serde_json::to_string(cursor)?;
        db::state::set(owner, &value, now + self.ttl, now, &self.db).await
    }

    /// Reads the cursor; one that no longer decodes is reported as
    /// corrupted rather than silently dropped.
    pub async fn load(
        &self,
        owner: &Owner,
        now: DateTime<Utc>,
    ) -> Result<Option<ConversationCursor>> {
        let Some(entry) = db::state::get(owner, now, &self.db).await? else {
            return Ok(None);
        };
        serde_json::from_str(&entry.value)
            .map(Some)
            .map_err(|err| CadenceErrorKind::CorruptedCursor(err.to_string()).into())
    }

    /// Applies `mutate` to the live cursor and writes it back. Returns the
    /// new cursor, or `None` when there was nothing to update.
    pub async fn update<F>(
        &self,
        owner: &Owner,
        now: DateTime<Utc>,
        mutate: F,
    ) -> Result<Option<ConversationCursor>>
    where
        F: FnOnce(&mut ConversationCursor),
    {
        let Some(mut cursor) = self.load(owner, now).await? else {
            return Ok(None);
        };
        mutate(&mut cursor);
        self.save(owner, &cursor, now).await?;
        Ok(Some(cursor))
    }

    pub async fn clear(&self, owner: &Owner) -> Result<()> {
        db::state::delete(owner, &self.db).await
    }

    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        db::state::purge_expired(now, &self.db).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{at, test_db};
    use cadence_common::touch::TouchType;
    use chrono::NaiveDate;

    fn cursor() -> ConversationCursor {
        ConversationCursor::questions(
            TouchType::Morning,
            3,
            100,
            NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            vec!["One?".into(), "Two?".into()],
        )
    }

    #[tokio::test]
    async fn update_slides_the_expiry() {
        let db = test_db().await;
        let store = ConversationStore::new(db, "bot", Duration::hours(1));
        let owner = store.owner(1);

        store.seed(&owner, &cursor(), at("2025-03-03T09:00:00Z")).await.unwrap();
        let updated = store
            .update(&owner, at("2025-03-03T09:50:00Z"), |c| c.index = 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.index, 1);

        // past the original expiry, inside the refreshed one
        let loaded = store.load(&owner, at("2025-03-03T10:30:00Z")).await.unwrap();
        assert_eq!(loaded, Some(updated));
        assert!(store.load(&owner, at("2025-03-03T10:51:00Z")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn other_processes_see_the_same_cursor() {
        let db = test_db().await;
        let one_off = ConversationStore::new(db.clone(), "bot", Duration::hours(1));
        let long_running = ConversationStore::new(db, "bot", Duration::hours(1));
        let now = at("2025-03-03T09:00:00Z");

        one_off.seed(&one_off.owner(5), &cursor(), now).await.unwrap();
        let seen = long_running.load(&long_running.owner(5), now).await.unwrap();
        assert_eq!(seen, Some(cursor()));

        long_running.clear(&long_running.owner(5)).await.unwrap();
        assert!(one_off.load(&one_off.owner(5), now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn undecodable_cursor_is_corrupted() {
        let db = test_db().await;
        let store = ConversationStore::new(db.clone(), "bot", Duration::hours(1));
        let owner = store.owner(1);
        let now = at("2025-03-03T09:00:00Z");
        db::state::set(&owner, "{\"state\":", at("2025-03-03T10:00:00Z"), now, &db)
            .await
            .unwrap();

        let err = store.load(&owner, now).await.unwrap_err();
        assert!(matches!(err.inner(), CadenceErrorKind::CorruptedCursor(_)));
        assert!(store.update(&owner, now, |_| {}).await.is_err());
    }
}
