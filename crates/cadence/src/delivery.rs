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

//! Turns a resolved content item into messages, sends them, and moves the
//! per-touch watermark so a touch reaches a user at most once a day.

use cadence_common::{
    api::{DeliveryOutcome, DeliveryReport},
    channel::{CallbackToken, Keyboard, SendError, VideoSource},
    course_day::course_day,
    cursor::{ConversationCursor, RatingField},
    error::Result,
    touch::TouchType,
};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use futures::{StreamExt, stream};
use sea_orm::DatabaseConnection;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::channels::Messenger;
use crate::content;
use crate::conversation::store::ConversationStore;
use crate::db::{self, entities::touch_content};
use crate::eligibility::{self, DueUser};
use crate::texts;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text {
        text: String,
        keyboard: Option<Keyboard>,
    },
    Video {
        source: VideoSource,
        caption: Option<String>,
        keyboard: Option<Keyboard>,
    },
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Part::Text {
            text: text.into(),
            keyboard: None,
        }
    }
}

/// Everything one touch sends to one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub parts: Vec<Part>,
    /// Index of the part that opens the dialogue, if there is one.
    pub prompt: Option<usize>,
    /// Cursor to store once the prompt part is delivered.
    pub seed: Option<ConversationCursor>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// A local file that exists wins over a URL.
fn video_source(content: &touch_content::Model) -> Option<VideoSource> {
    non_empty(&content.video_file)
        .filter(|path| Path::new(path).is_file())
        .map(|path| VideoSource::File(path.into()))
        .or_else(|| non_empty(&content.video_url).map(|url| VideoSource::Url(url.to_owned())))
}

/// The video with the summary as its caption, or the summary alone.
fn lesson(content: &touch_content::Model) -> Part {
    let caption = non_empty(&content.summary).map(str::to_owned);
    match video_source(content) {
        Some(source) => Part::Video {
            source,
            caption,
            keyboard: None,
        },
        None => Part::text(caption.unwrap_or_else(|| content.title.clone())),
    }
}

pub fn compose(
    touch: TouchType,
    content: &touch_content::Model,
    chat_id: i64,
    date: NaiveDate,
) -> Payload {
    let questions =
        ConversationCursor::parse_questions(content.questions.as_deref().unwrap_or_default());
    match touch {
        TouchType::Morning => {
            let mut parts = vec![lesson(content)];
            if let Some(transcript) = non_empty(&content.transcript) {
                parts.push(Part::text(transcript));
            }
            if questions.is_empty() {
                return Payload {
                    parts,
                    prompt: None,
                    seed: None,
                };
            }
            parts.push(Part::text(texts::question_list(&questions)));
            parts.push(Part::text(texts::question_prompt(
                0,
                questions.len(),
                &questions[0],
            )));
            Payload {
                prompt: Some(parts.len() - 1),
                parts,
                seed: Some(ConversationCursor::questions(
                    touch, content.id, chat_id, date, questions,
                )),
            }
        }
        // The day touch opens no dialogue, so content questions go unused.
        TouchType::Day => {
            let ack = Keyboard::choices(
                [(
                    texts::DAY_ACTION,
                    CallbackToken::Ack {
                        touch,
                        content_id: content.id,
                    },
                )],
                1,
            );
            let mut parts = vec![];
            if let Some(summary) = non_empty(&content.summary) {
                parts.push(Part::text(summary));
            }
            let action = match (non_empty(&content.video_url), video_source(content)) {
                (Some(url), _) => Part::Text {
                    text: url.to_owned(),
                    keyboard: Some(ack),
                },
                (None, Some(source)) => Part::Video {
                    source,
                    caption: None,
                    keyboard: Some(ack),
                },
                (None, None) => Part::Text {
                    text: content.title.clone(),
                    keyboard: Some(ack),
                },
            };
            parts.push(action);
            Payload {
                parts,
                prompt: None,
                seed: None,
            }
        }
        TouchType::Evening => {
            let parts = vec![
                lesson(content),
                Part::Text {
                    text: texts::rating_prompt(RatingField::Energy).to_owned(),
                    keyboard: Some(Keyboard::rating_scale()),
                },
            ];
            Payload {
                parts,
                prompt: Some(1),
                seed: Some(ConversationCursor::ratings(
                    content.id, chat_id, date, questions,
                )),
            }
        }
    }
}

#[derive(Clone)]
pub struct DeliveryExecutor {
    db: DatabaseConnection,
    messenger: Arc<dyn Messenger>,
    store: ConversationStore,
    offset: FixedOffset,
    concurrency: usize,
}

impl DeliveryExecutor {
    pub fn new(
        db: DatabaseConnection,
        messenger: Arc<dyn Messenger>,
        store: ConversationStore,
        offset: FixedOffset,
        concurrency: usize,
    ) -> Self {
        DeliveryExecutor {
            db,
            messenger,
            store,
            offset,
            concurrency: concurrency.max(1),
        }
    }

    /// Delivers `touch` to every user due at `now`. One user's failure never
    /// stops the others.
    #[instrument(skip(self))]
    pub async fn deliver_due(
        &self,
        touch: TouchType,
        now: DateTime<Utc>,
    ) -> Result<Vec<DeliveryReport>> {
        let due = eligibility::due_users(touch, now, self.offset, &self.db).await?;
        if due.is_empty() {
            return Ok(vec![]);
        }
        info!(users = due.len(), "Delivering touch");

        let reports: Vec<DeliveryReport> = stream::iter(due)
            .map(|user| self.deliver(touch, user, now, false))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        Ok(reports)
    }

    /// Admin-triggered delivery to explicit users, ignoring the time of day.
    /// Only active trial and paid users are served. With `force` a touch
    /// already sent today goes out again.
    #[instrument(skip(self))]
    pub async fn deliver_manual(
        &self,
        touch: TouchType,
        user_ids: &[i64],
        force: bool,
        now: DateTime<Utc>,
    ) -> Vec<DeliveryReport> {
        let mut reports = Vec::with_capacity(user_ids.len());
        for &user_id in user_ids {
            let report = match db::user::get(user_id, &self.db).await {
                Ok(Some(user)) if !user.is_active => {
                    warn!(user_id, "Manual send to inactive user");
                    let reason = "user is inactive".to_owned();
                    report(user_id, touch, DeliveryOutcome::Ineligible { reason })
                }
                Ok(Some(user)) if !user.subscription.is_deliverable() => {
                    warn!(
                        user_id,
                        subscription = ?user.subscription,
                        "Manual send to unsubscribed user"
                    );
                    let reason = "no trial or paid subscription".to_owned();
                    report(user_id, touch, DeliveryOutcome::Ineligible { reason })
                }
                Ok(Some(user)) => {
                    let due = DueUser::new(&user, touch, self.offset);
                    self.deliver(touch, due, now, force).await
                }
                Ok(None) => {
                    warn!(user_id, "Manual send to unknown user");
                    report(user_id, touch, DeliveryOutcome::UnknownUser)
                }
                Err(err) => {
                    error!(user_id, "Failed to load user: {err}");
                    report(
                        user_id,
                        touch,
                        DeliveryOutcome::Transient {
                            reason: err.to_string(),
                        },
                    )
                }
            };
            reports.push(report);
        }
        reports
    }

    async fn deliver(
        &self,
        touch: TouchType,
        user: DueUser,
        now: DateTime<Utc>,
        force: bool,
    ) -> DeliveryReport {
        let user_id = user.user_id;
        let outcome = match self.try_deliver(touch, &user, now, force).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(user_id, %touch, "Delivery failed: {err}");
                DeliveryOutcome::Transient {
                    reason: err.to_string(),
                }
            }
        };
        report(user_id, touch, outcome)
    }

    async fn try_deliver(
        &self,
        touch: TouchType,
        user: &DueUser,
        now: DateTime<Utc>,
        force: bool,
    ) -> Result<DeliveryOutcome> {
        let (date, day_start) = eligibility::local_day(now, self.offset);
        let ordinal = course_day(user.anchor, date);

        let Some(content) = content::resolve(touch, ordinal, &self.db).await? else {
            info!(user_id = user.user_id, %touch, ?ordinal, "No content, skipping");
            return Ok(DeliveryOutcome::NoContent);
        };

        if !db::user::claim(user.user_id, touch, now, day_start, force, &self.db).await? {
            debug!(user_id = user.user_id, %touch, "Already delivered today");
            return Ok(DeliveryOutcome::AlreadySent);
        }

        let payload = compose(touch, &content, user.chat_id, date);
        for (i, part) in payload.parts.iter().enumerate() {
            let Err(err) = self.send(user.chat_id, part).await else {
                continue;
            };

            if i > 0 {
                warn!(user_id = user.user_id, %touch, part = i, "Partial delivery: {err}");
                return Ok(DeliveryOutcome::Partial {
                    reason: err.to_string(),
                });
            }

            return match err {
                SendError::Transient(reason) => {
                    warn!(user_id = user.user_id, %touch, "Transient delivery failure: {reason}");
                    db::user::release(user.user_id, touch, now, user.sent_at, &self.db).await?;
                    Ok(DeliveryOutcome::Transient { reason })
                }
                SendError::Permanent(reason) => {
                    warn!(user_id = user.user_id, %touch, "Permanent delivery failure: {reason}");
                    db::user::deactivate(user.user_id, &self.db).await?;
                    Ok(DeliveryOutcome::Permanent { reason })
                }
            };
        }

        if let (Some(_), Some(cursor)) = (payload.prompt, payload.seed) {
            let owner = self.store.owner(user.user_id);
            if let Err(err) = self.store.seed(&owner, &cursor, now).await {
                error!(user_id = user.user_id, %touch, "Failed to seed cursor: {err}");
                return Ok(DeliveryOutcome::Partial {
                    reason: err.to_string(),
                });
            }
        }

        info!(user_id = user.user_id, %touch, content_id = content.id, ?ordinal, "Touch delivered");
        Ok(DeliveryOutcome::Delivered)
    }

    async fn send(&self, chat_id: i64, part: &Part) -> std::result::Result<(), SendError> {
        match part {
            Part::Text { text, keyboard } => {
                self.messenger
                    .send_text(chat_id, text, keyboard.as_ref())
                    .await
            }
            Part::Video {
                source,
                caption,
                keyboard,
            } => {
                self.messenger
                    .send_video(chat_id, source, caption.as_deref(), keyboard.as_ref())
                    .await
            }
        }
    }
}

fn report(user_id: i64, touch: TouchType, outcome: DeliveryOutcome) -> DeliveryReport {
    DeliveryReport {
        user_id,
        touch,
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::content::NewContent;
    use crate::utils::{RecordingMessenger, Sent, at, seed_user, test_db};
    use cadence_common::cursor::DialogueState;
    use cadence_common::touch::SubscriptionType;
    use chrono::Duration;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn content(touch: TouchType, questions: Option<&str>) -> touch_content::Model {
        touch_content::Model {
            id: 11,
            touch_type: touch,
            course_day: None,
            title: "Lesson".into(),
            video_file: None,
            video_url: Some("https://videos.example/1".into()),
            transcript: Some("Transcript".into()),
            summary: Some("Summary".into()),
            questions: questions.map(str::to_owned),
            is_active: true,
            position: 0,
            updated_at: at("2025-03-01T00:00:00Z"),
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
    }

    async fn executor(
        messenger: Arc<RecordingMessenger>,
    ) -> (DeliveryExecutor, DatabaseConnection) {
        let db = test_db().await;
        let store = ConversationStore::new(db.clone(), "bot", Duration::hours(1));
        (
            DeliveryExecutor::new(db.clone(), messenger, store, utc(), 4),
            db,
        )
    }

    async fn add_content(touch: TouchType, questions: Option<&str>, db: &DatabaseConnection) {
        db::content::create(
            touch,
            NewContent {
                title: "Lesson".into(),
                video_url: Some("https://videos.example/1".into()),
                summary: Some("Summary".into()),
                questions: questions.map(str::to_owned),
                is_active: true,
                ..Default::default()
            },
            at("2025-03-01T00:00:00Z"),
            db,
        )
        .await
        .unwrap();
    }

    #[test]
    fn morning_sends_video_transcript_questions_then_prompt() {
        let lesson = content(TouchType::Morning, Some("A?\n\nB?"));
        let payload = compose(TouchType::Morning, &lesson, 5, date());
        assert_eq!(payload.parts.len(), 4);
        assert!(matches!(
            &payload.parts[0],
            Part::Video { source: VideoSource::Url(_), caption: Some(c), .. } if c == "Summary"
        ));
        assert_eq!(payload.parts[1], Part::text("Transcript"));
        assert_eq!(payload.parts[2], Part::text("Questions for today:\n1. A?\n2. B?"));
        assert_eq!(payload.prompt, Some(3));

        let seed = payload.seed.unwrap();
        assert_eq!(seed.state, DialogueState::AwaitingAnswer);
        assert_eq!(seed.index, 0);
        assert_eq!(seed.questions, vec!["A?", "B?"]);
        assert_eq!(seed.chat_id, 5);
    }

    #[test]
    fn morning_without_questions_seeds_nothing() {
        let mut lesson = content(TouchType::Morning, Some("  \n"));
        lesson.video_url = None;
        lesson.transcript = None;
        let payload = compose(TouchType::Morning, &lesson, 5, date());
        assert_eq!(payload.parts, vec![Part::text("Summary")]);
        assert!(payload.seed.is_none());
    }

    #[test]
    fn day_sends_summary_then_link_with_action() {
        let payload = compose(TouchType::Day, &content(TouchType::Day, None), 5, date());
        assert_eq!(payload.parts.len(), 2);
        assert_eq!(payload.parts[0], Part::text("Summary"));
        let Part::Text { text, keyboard: Some(keyboard) } = &payload.parts[1] else {
            panic!("expected a link with a keyboard");
        };
        assert_eq!(text, "https://videos.example/1");
        assert_eq!(
            keyboard.tokens().collect::<Vec<_>>(),
            vec![&CallbackToken::Ack { touch: TouchType::Day, content_id: 11 }]
        );
        assert!(payload.seed.is_none());
    }

    #[test]
    fn day_ignores_content_questions() {
        let lesson = content(TouchType::Day, Some("First?\nSecond?"));
        let payload = compose(TouchType::Day, &lesson, 5, date());
        assert_eq!(payload.parts.len(), 2);
        assert!(payload.prompt.is_none());
        assert!(payload.seed.is_none());
        assert!(payload.parts.iter().all(|part| match part {
            Part::Text { text, .. } => !text.contains("First?"),
            _ => true,
        }));
    }

    #[test]
    fn day_link_does_not_depend_on_summary() {
        let mut lesson = content(TouchType::Day, None);
        lesson.summary = None;
        let payload = compose(TouchType::Day, &lesson, 5, date());
        assert_eq!(payload.parts.len(), 1);
        assert!(matches!(&payload.parts[0], Part::Text { keyboard: Some(_), .. }));
    }

    #[test]
    fn evening_always_opens_ratings() {
        let mut lesson = content(TouchType::Evening, Some("Reflect?"));
        lesson.video_url = None;
        let payload = compose(TouchType::Evening, &lesson, 5, date());
        assert_eq!(payload.parts[0], Part::text("Summary"));
        assert!(matches!(
            &payload.parts[1],
            Part::Text { keyboard: Some(k), .. } if *k == Keyboard::rating_scale()
        ));
        assert_eq!(payload.prompt, Some(1));
        let seed = payload.seed.unwrap();
        assert_eq!(seed.state, DialogueState::Rating { step: 0 });
        assert_eq!(seed.questions, vec!["Reflect?"]);
    }

    #[tokio::test]
    async fn evening_goes_out_once_per_day() {
        let messenger = Arc::new(RecordingMessenger::default());
        let (executor, db) = executor(messenger.clone()).await;
        seed_user(1, SubscriptionType::Trial, &db).await;
        add_content(TouchType::Evening, None, &db).await;

        let first = executor
            .deliver_due(TouchType::Evening, at("2025-03-03T21:00:05Z"))
            .await
            .unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].outcome, DeliveryOutcome::Delivered);
        assert_eq!(messenger.sent_to(1001).len(), 2);

        let second = executor
            .deliver_due(TouchType::Evening, at("2025-03-03T21:00:40Z"))
            .await
            .unwrap();
        assert!(second.is_empty());
        assert_eq!(messenger.sent_to(1001).len(), 2);

        let owner = executor.store.owner(1);
        let cursor = executor
            .store
            .load(&owner, at("2025-03-03T21:01:00Z"))
            .await
            .unwrap();
        assert_eq!(cursor.unwrap().state, DialogueState::Rating { step: 0 });
    }

    #[tokio::test]
    async fn transient_failure_leaves_the_touch_due() {
        let messenger = Arc::new(RecordingMessenger::default());
        messenger.fail_next(SendError::Transient("flood wait".into()));
        let (executor, db) = executor(messenger.clone()).await;
        seed_user(1, SubscriptionType::Paid, &db).await;
        add_content(TouchType::Morning, Some("Why?"), &db).await;

        let reports = executor
            .deliver_manual(TouchType::Morning, &[1], false, at("2025-03-03T09:00:00Z"))
            .await;
        assert!(matches!(reports[0].outcome, DeliveryOutcome::Transient { .. }));
        let user = db::user::get(1, &db).await.unwrap().unwrap();
        assert_eq!(user.morning_sent_at, None);
        let owner = executor.store.owner(1);
        let cursor = executor.store.load(&owner, at("2025-03-03T09:00:00Z")).await;
        assert!(cursor.unwrap().is_none());

        let reports = executor
            .deliver_manual(TouchType::Morning, &[1], false, at("2025-03-03T09:05:00Z"))
            .await;
        assert_eq!(reports[0].outcome, DeliveryOutcome::Delivered);
    }

    #[tokio::test]
    async fn permanent_failure_commits_and_deactivates() {
        let messenger = Arc::new(RecordingMessenger::default());
        messenger.fail_next(SendError::Permanent("bot was blocked".into()));
        let (executor, db) = executor(messenger.clone()).await;
        seed_user(1, SubscriptionType::Trial, &db).await;
        add_content(TouchType::Day, None, &db).await;

        let reports = executor
            .deliver_due(TouchType::Day, at("2025-03-03T12:00:00Z"))
            .await
            .unwrap();
        assert!(matches!(reports[0].outcome, DeliveryOutcome::Permanent { .. }));
        let user = db::user::get(1, &db).await.unwrap().unwrap();
        assert_eq!(user.day_sent_at, Some(at("2025-03-03T12:00:00Z")));
        assert!(!user.is_active);
    }

    #[tokio::test]
    async fn failed_prompt_is_partial_and_seeds_nothing() {
        let messenger = Arc::new(RecordingMessenger::default());
        let (executor, db) = executor(messenger.clone()).await;
        seed_user(1, SubscriptionType::Trial, &db).await;
        add_content(TouchType::Evening, None, &db).await;
        messenger.fail_at(1, SendError::Transient("timeout".into()));

        let reports = executor
            .deliver_due(TouchType::Evening, at("2025-03-03T21:00:00Z"))
            .await
            .unwrap();
        assert!(matches!(reports[0].outcome, DeliveryOutcome::Partial { .. }));
        let user = db::user::get(1, &db).await.unwrap().unwrap();
        assert!(user.evening_sent_at.is_some());
        let owner = executor.store.owner(1);
        let cursor = executor.store.load(&owner, at("2025-03-03T21:00:00Z")).await;
        assert!(cursor.unwrap().is_none());
    }

    #[tokio::test]
    async fn manual_send_respects_today_unless_forced() {
        let messenger = Arc::new(RecordingMessenger::default());
        let (executor, db) = executor(messenger.clone()).await;
        seed_user(1, SubscriptionType::Trial, &db).await;
        add_content(TouchType::Day, None, &db).await;
        let now = at("2025-03-03T15:30:00Z");

        let reports = executor.deliver_manual(TouchType::Day, &[1, 2], false, now).await;
        assert_eq!(reports[0].outcome, DeliveryOutcome::Delivered);
        assert_eq!(reports[1].outcome, DeliveryOutcome::UnknownUser);

        let again = executor.deliver_manual(TouchType::Day, &[1], false, now).await;
        assert_eq!(again[0].outcome, DeliveryOutcome::AlreadySent);

        let forced = executor.deliver_manual(TouchType::Day, &[1], true, now).await;
        assert_eq!(forced[0].outcome, DeliveryOutcome::Delivered);
        assert_eq!(messenger.sent_to(1001).len(), 4);
        assert!(matches!(messenger.sent_to(1001)[0], Sent::Text { .. }));
    }

    #[tokio::test]
    async fn manual_send_skips_inactive_and_unsubscribed_users() {
        let messenger = Arc::new(RecordingMessenger::default());
        let (executor, db) = executor(messenger.clone()).await;
        seed_user(1, SubscriptionType::Unsubscribed, &db).await;
        seed_user(2, SubscriptionType::Trial, &db).await;
        seed_user(3, SubscriptionType::FreeWeek, &db).await;
        db::user::deactivate(2, &db).await.unwrap();
        add_content(TouchType::Day, None, &db).await;
        let now = at("2025-03-03T15:30:00Z");

        let reports = executor
            .deliver_manual(TouchType::Day, &[1, 2, 3], true, now)
            .await;
        assert!(
            reports
                .iter()
                .all(|r| matches!(r.outcome, DeliveryOutcome::Ineligible { .. }))
        );
        for chat_id in [1001, 1002, 1003] {
            assert!(messenger.sent_to(chat_id).is_empty());
        }
        let user = db::user::get(2, &db).await.unwrap().unwrap();
        assert_eq!(user.day_sent_at, None);
    }

    #[tokio::test]
    async fn missing_content_is_skipped_without_claiming() {
        let messenger = Arc::new(RecordingMessenger::default());
        let (executor, db) = executor(messenger.clone()).await;
        seed_user(1, SubscriptionType::Trial, &db).await;

        let reports = executor
            .deliver_due(TouchType::Morning, at("2025-03-03T09:00:00Z"))
            .await
            .unwrap();
        assert_eq!(reports[0].outcome, DeliveryOutcome::NoContent);
        let user = db::user::get(1, &db).await.unwrap().unwrap();
        assert_eq!(user.morning_sent_at, None);
        assert!(messenger.sent_to(1001).is_empty());
    }
}
