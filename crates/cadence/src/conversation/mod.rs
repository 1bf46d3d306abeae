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

//! Inbound message handling. Any process serving the bot can pick up a
//! dialogue another process started, because every step goes through the
//! shared conversation store.

pub mod rating;
pub mod sequencer;
pub mod sessions;
pub mod store;

use cadence_common::{
    channel::{CallbackToken, Inbound, InboundKind},
    error::{CadenceErrorKind, Result},
    touch::TouchType,
};
use chrono::{DateTime, NaiveTime, Utc};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::channels::Messenger;
use crate::db;
use crate::texts;
use sequencer::{Input, Outcome, Reply, Sequencer};
use sessions::LocalSessions;
use store::ConversationStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    /// `None` restores the default time.
    SetTime(TouchType, Option<NaiveTime>),
    Usage,
}

/// Recognises slash commands, tolerating a `@botname` suffix.
pub fn parse_command(text: &str) -> Option<Command> {
    let mut words = text.split_whitespace();
    let head = words.next()?.strip_prefix('/')?;
    let name = head.split('@').next().unwrap_or(head).to_ascii_lowercase();
    match name.as_str() {
        "start" => Some(Command::Start),
        "time" => {
            let (Some(touch), Some(time), None) = (words.next(), words.next(), words.next()) else {
                return Some(Command::Usage);
            };
            let Ok(touch) = touch.parse::<TouchType>() else {
                return Some(Command::Usage);
            };
            if time.eq_ignore_ascii_case("default") {
                return Some(Command::SetTime(touch, None));
            }
            match NaiveTime::parse_from_str(time, "%H:%M") {
                Ok(time) => Some(Command::SetTime(touch, Some(time))),
                Err(_) => Some(Command::Usage),
            }
        }
        _ => None,
    }
}

#[derive(Clone)]
pub struct Dialogue {
    db: DatabaseConnection,
    messenger: Arc<dyn Messenger>,
    store: ConversationStore,
    sessions: LocalSessions,
    sequencer: Sequencer,
}

impl Dialogue {
    pub fn new(
        db: DatabaseConnection,
        messenger: Arc<dyn Messenger>,
        store: ConversationStore,
        sequencer: Sequencer,
    ) -> Self {
        Dialogue {
            db,
            messenger,
            store,
            sessions: LocalSessions::new(),
            sequencer,
        }
    }

    pub fn sessions(&self) -> &LocalSessions {
        &self.sessions
    }

    pub async fn handle(&self, inbound: Inbound, now: DateTime<Utc>) -> Result<()> {
        let Inbound {
            user_id,
            chat_id,
            username,
            kind,
        } = inbound;
        db::user::ensure(user_id, chat_id, username.as_deref(), now, &self.db).await?;

        let input = match kind {
            InboundKind::Text(text) => match parse_command(&text) {
                Some(command) => return self.command(user_id, chat_id, command).await,
                None => Input::Text(text),
            },
            InboundKind::Voice { file_id } => Input::Voice { file_id },
            InboundKind::Callback(CallbackToken::Rate(n)) => Input::Rate(n),
            InboundKind::Callback(CallbackToken::VoiceConfirm) => Input::ConfirmVoice,
            InboundKind::Callback(CallbackToken::VoiceRerecord) => Input::Rerecord,
            InboundKind::Callback(CallbackToken::Ack { touch, content_id }) => {
                info!(user_id, %touch, content_id, "Touch acknowledged");
                return self
                    .reply(chat_id, &[Reply::text(texts::DAY_ACKNOWLEDGED)])
                    .await;
            }
        };
        self.resume(user_id, chat_id, input, now).await
    }

    async fn command(&self, user_id: i64, chat_id: i64, command: Command) -> Result<()> {
        debug!(user_id, ?command, "Command");
        let reply = match command {
            Command::Start => {
                self.store.clear(&self.store.owner(user_id)).await?;
                self.sessions.remove(user_id);
                texts::WELCOME.to_owned()
            }
            Command::SetTime(touch, time) => {
                db::user::set_notify_time(user_id, touch, time, &self.db).await?;
                match time {
                    Some(time) => texts::time_set(touch, time),
                    None => texts::time_reset(touch),
                }
            }
            Command::Usage => texts::TIME_USAGE.to_owned(),
        };
        self.reply(chat_id, &[Reply::text(reply)]).await
    }

    async fn resume(
        &self,
        user_id: i64,
        chat_id: i64,
        input: Input,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let owner = self.store.owner(user_id);
        let cursor = match self.store.load(&owner, now).await {
            Ok(cursor) => cursor,
            Err(err) if matches!(err.inner(), CadenceErrorKind::CorruptedCursor(_)) => {
                warn!(user_id, "Resetting corrupted cursor: {err}");
                self.store.clear(&owner).await?;
                self.sessions.remove(user_id);
                return self
                    .reply(chat_id, &[Reply::text(texts::SESSION_RESET)])
                    .await;
            }
            Err(err) => return Err(err),
        };

        let local = self.sessions.get(user_id);
        if self.sessions.reconcile(user_id, cursor.as_ref()) {
            info!(
                user_id,
                local_index = ?local.map(|c| c.index),
                stored_index = ?cursor.as_ref().map(|c| c.index),
                "Local session rehydrated from store"
            );
        }
        let Some(cursor) = cursor else {
            return self
                .reply(chat_id, &[Reply::text(texts::NOTHING_PENDING)])
                .await;
        };

        let transition = self.sequencer.step(user_id, cursor, input, now).await?;
        match transition.outcome {
            Outcome::Continue(cursor) => {
                self.store.save(&owner, &cursor, now).await?;
                self.sessions.put(user_id, cursor);
            }
            Outcome::Finished | Outcome::Corrupted => {
                self.store.clear(&owner).await?;
                self.sessions.remove(user_id);
            }
        }
        self.reply(chat_id, &transition.replies).await
    }

    async fn reply(&self, chat_id: i64, replies: &[Reply]) -> Result<()> {
        for reply in replies {
            if let Err(err) = self
                .messenger
                .send_text(chat_id, &reply.text, reply.keyboard.as_ref())
                .await
            {
                warn!(chat_id, "Failed to send reply: {err}");
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{RecordingMessenger, at, seed_user, test_db};
    use cadence_common::cursor::{ConversationCursor, DialogueState};
    use cadence_common::touch::SubscriptionType;
    use chrono::{Duration, NaiveDate};

    async fn dialogue() -> (Dialogue, Arc<RecordingMessenger>, DatabaseConnection) {
        let db = test_db().await;
        let messenger = Arc::new(RecordingMessenger::default());
        let store = ConversationStore::new(db.clone(), "bot", Duration::hours(1));
        let sequencer = Sequencer::new(db.clone(), messenger.clone(), None, None);
        (
            Dialogue::new(db.clone(), messenger.clone(), store, sequencer),
            messenger,
            db,
        )
    }

    fn text(user_id: i64, text: &str) -> Inbound {
        Inbound {
            user_id,
            chat_id: 1000 + user_id,
            username: Some(format!("user{user_id}")),
            kind: InboundKind::Text(text.into()),
        }
    }

    fn cursor() -> ConversationCursor {
        ConversationCursor::questions(
            TouchType::Morning,
            4,
            1001,
            NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            vec!["First?".into(), "Second?".into()],
        )
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_command("/start"), Some(Command::Start));
        assert_eq!(parse_command("/start@CadenceBot promo"), Some(Command::Start));
        assert_eq!(
            parse_command("/time evening 22:15"),
            Some(Command::SetTime(
                TouchType::Evening,
                NaiveTime::from_hms_opt(22, 15, 0)
            ))
        );
        assert_eq!(
            parse_command("/time Morning default"),
            Some(Command::SetTime(TouchType::Morning, None))
        );
        assert_eq!(parse_command("/time noon 12:00"), Some(Command::Usage));
        assert_eq!(parse_command("/time day 25:00"), Some(Command::Usage));
        assert_eq!(parse_command("/time day"), Some(Command::Usage));
        assert_eq!(parse_command("hello"), None);
        assert_eq!(parse_command("/unknown"), None);
    }

    #[tokio::test]
    async fn first_contact_registers_the_user() {
        let (dialogue, messenger, db) = dialogue().await;
        dialogue.handle(text(9, "/start"), at("2025-03-03T08:00:00Z")).await.unwrap();

        let user = db::user::get(9, &db).await.unwrap().unwrap();
        assert_eq!(user.chat_id, 1009);
        assert_eq!(user.subscription, SubscriptionType::Unsubscribed);
        assert_eq!(messenger.texts_to(1009), vec![texts::WELCOME]);
    }

    #[tokio::test]
    async fn picks_up_a_cursor_seeded_elsewhere() {
        let (dialogue, messenger, db) = dialogue().await;
        seed_user(1, SubscriptionType::Trial, &db).await;
        let now = at("2025-03-03T09:10:00Z");

        // a one-off process seeded the cursor through its own store
        let other = ConversationStore::new(db.clone(), "bot", Duration::hours(1));
        other.seed(&other.owner(1), &cursor(), now).await.unwrap();

        dialogue.handle(text(1, "my answer"), now).await.unwrap();

        let stored = other.load(&other.owner(1), now).await.unwrap().unwrap();
        assert_eq!(stored.index, 1);
        assert_eq!(dialogue.sessions().get(1), Some(stored));
        assert_eq!(messenger.texts_to(1001), vec!["Question 2 of 2:\nSecond?"]);

        dialogue.handle(text(1, "second answer"), now).await.unwrap();
        assert!(other.load(&other.owner(1), now).await.unwrap().is_none());
        assert_eq!(dialogue.sessions().get(1), None);
        let answers = db::answer::list_by_user(1, NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(), &db)
            .await
            .unwrap();
        assert_eq!(answers.len(), 2);
    }

    #[tokio::test]
    async fn stale_local_session_yields_to_the_store() {
        let (dialogue, messenger, db) = dialogue().await;
        seed_user(1, SubscriptionType::Trial, &db).await;
        let now = at("2025-03-03T09:10:00Z");
        let mut local = cursor();
        local.index = 1;
        dialogue.sessions().put(1, local);

        dialogue.handle(text(1, "hello"), now).await.unwrap();
        assert_eq!(dialogue.sessions().get(1), None);
        assert_eq!(messenger.texts_to(1001), vec![texts::NOTHING_PENDING]);
    }

    #[tokio::test]
    async fn corrupted_cursor_is_reset() {
        let (dialogue, messenger, db) = dialogue().await;
        seed_user(1, SubscriptionType::Trial, &db).await;
        let now = at("2025-03-03T09:10:00Z");
        let owner = dialogue.store.owner(1);
        db::state::set(&owner, "not json", now + Duration::hours(1), now, &db)
            .await
            .unwrap();

        dialogue.handle(text(1, "answer"), now).await.unwrap();
        assert_eq!(messenger.texts_to(1001), vec![texts::SESSION_RESET]);
        assert!(db::state::get(&owner, now, &db).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rating_callbacks_drive_the_evening() {
        let (dialogue, messenger, db) = dialogue().await;
        seed_user(1, SubscriptionType::Trial, &db).await;
        let now = at("2025-03-03T21:01:00Z");
        let date = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let cursor = ConversationCursor::ratings(4, 1001, date, vec![]);
        dialogue.store.seed(&dialogue.store.owner(1), &cursor, now).await.unwrap();

        let press = |n| Inbound {
            user_id: 1,
            chat_id: 1001,
            username: None,
            kind: InboundKind::Callback(CallbackToken::Rate(n)),
        };
        dialogue.handle(press(7), now).await.unwrap();
        let stored = dialogue.store.load(&dialogue.store.owner(1), now).await.unwrap().unwrap();
        assert_eq!(stored.state, DialogueState::Rating { step: 1 });
        assert_eq!(
            messenger.sent_to(1001)[0].keyboard(),
            Some(&cadence_common::channel::Keyboard::rating_scale())
        );

        let rating = db::rating::get(1, date, &db).await.unwrap().unwrap();
        assert_eq!(rating.energy, Some(7));
    }

    #[tokio::test]
    async fn time_command_sets_and_resets() {
        let (dialogue, messenger, db) = dialogue().await;
        seed_user(1, SubscriptionType::Trial, &db).await;
        let now = at("2025-03-03T10:00:00Z");

        dialogue.handle(text(1, "/time day 13:30"), now).await.unwrap();
        let user = db::user::get(1, &db).await.unwrap().unwrap();
        assert_eq!(user.day_time, NaiveTime::from_hms_opt(13, 30, 0));

        dialogue.handle(text(1, "/time day default"), now).await.unwrap();
        let user = db::user::get(1, &db).await.unwrap().unwrap();
        assert_eq!(user.day_time, None);

        dialogue.handle(text(1, "/time day"), now).await.unwrap();
        assert_eq!(messenger.texts_to(1001).last().map(String::as_str), Some(texts::TIME_USAGE));
    }

    #[tokio::test]
    async fn acknowledging_the_day_touch() {
        let (dialogue, messenger, _) = dialogue().await;
        let ack = Inbound {
            user_id: 1,
            chat_id: 1001,
            username: None,
            kind: InboundKind::Callback(CallbackToken::Ack {
                touch: TouchType::Day,
                content_id: 3,
            }),
        };
        dialogue.handle(ack, at("2025-03-03T12:05:00Z")).await.unwrap();
        assert_eq!(messenger.texts_to(1001), vec![texts::DAY_ACKNOWLEDGED]);
    }
}
