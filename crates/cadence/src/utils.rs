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

//! Shared test fixtures.

use async_trait::async_trait;
use cadence_common::{
    channel::{Keyboard, SendError, VideoSource},
    error::{CadenceErrorKind, Result},
    touch::{SubscriptionType, TouchType},
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::channels::Messenger;
use crate::db::{self, content::NewContent, entities::users, entities::touch_content};

pub fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .unwrap()
        .with_timezone(&Utc)
}

pub async fn test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    db::migration::Migrator::refresh(&db).await.unwrap();
    db
}

/// Inserts an active user whose chat id is `1000 + id` and whose
/// subscription started on Monday 2025-03-03.
pub async fn seed_user(
    id: i64,
    subscription: SubscriptionType,
    db: &DatabaseConnection,
) -> users::Model {
    users::ActiveModel {
        id: ActiveValue::Set(id),
        chat_id: ActiveValue::Set(1000 + id),
        username: ActiveValue::Set(Some(format!("user{id}"))),
        subscription: ActiveValue::Set(subscription),
        started_at: ActiveValue::Set(Some(at("2025-03-03T06:00:00Z"))),
        is_active: ActiveValue::Set(true),
        created_at: ActiveValue::Set(at("2025-03-01T00:00:00Z")),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn seed_content(
    touch: TouchType,
    course_day: Option<i32>,
    position: i32,
    db: &DatabaseConnection,
) -> touch_content::Model {
    db::content::create(
        touch,
        NewContent {
            title: format!("{touch} {course_day:?}"),
            course_day,
            summary: Some(format!("Summary for {touch}")),
            is_active: true,
            position,
            ..Default::default()
        },
        at("2025-03-01T00:00:00Z"),
        db,
    )
    .await
    .unwrap()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
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

impl Sent {
    pub fn text(&self) -> Option<&str> {
        match self {
            Sent::Text { text, .. } => Some(text),
            Sent::Video { caption, .. } => caption.as_deref(),
        }
    }

    pub fn keyboard(&self) -> Option<&Keyboard> {
        match self {
            Sent::Text { keyboard, .. } | Sent::Video { keyboard, .. } => keyboard.as_ref(),
        }
    }
}

/// Records every send. Failures can be scripted by call number, and voice
/// downloads are served from a fixed table.
#[derive(Debug, Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<(i64, Sent)>>,
    calls: Mutex<usize>,
    failures: Mutex<HashMap<usize, SendError>>,
    voices: Mutex<HashMap<String, Vec<u8>>>,
}

impl RecordingMessenger {
    pub fn fail_next(&self, err: SendError) {
        let next = *self.calls.lock().unwrap();
        self.fail_at(next, err);
    }

    /// Fails the send with the given zero-based call number.
    pub fn fail_at(&self, call: usize, err: SendError) {
        self.failures.lock().unwrap().insert(call, err);
    }

    pub fn add_voice(&self, file_id: &str, audio: &[u8]) {
        self.voices
            .lock()
            .unwrap()
            .insert(file_id.to_owned(), audio.to_vec());
    }

    pub fn sent_to(&self, chat_id: i64) -> Vec<Sent> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(chat, _)| *chat == chat_id)
            .map(|(_, sent)| sent.clone())
            .collect()
    }

    pub fn texts_to(&self, chat_id: i64) -> Vec<String> {
        self.sent_to(chat_id)
            .iter()
            .filter_map(|sent| sent.text().map(str::to_owned))
            .collect()
    }

    fn record(&self, chat_id: i64, sent: Sent) -> std::result::Result<(), SendError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls - 1
        };
        if let Some(err) = self.failures.lock().unwrap().remove(&call) {
            return Err(err);
        }
        self.sent.lock().unwrap().push((chat_id, sent));
        Ok(())
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> std::result::Result<(), SendError> {
        self.record(
            chat_id,
            Sent::Text {
                text: text.to_owned(),
                keyboard: keyboard.cloned(),
            },
        )
    }

    async fn send_video(
        &self,
        chat_id: i64,
        source: &VideoSource,
        caption: Option<&str>,
        keyboard: Option<&Keyboard>,
    ) -> std::result::Result<(), SendError> {
        self.record(
            chat_id,
            Sent::Video {
                source: source.clone(),
                caption: caption.map(str::to_owned),
                keyboard: keyboard.cloned(),
            },
        )
    }

    async fn fetch_voice(&self, file_id: &str) -> Result<Vec<u8>> {
        self.voices
            .lock()
            .unwrap()
            .get(file_id)
            .cloned()
            .ok_or_else(|| CadenceErrorKind::Channel(format!("no voice {file_id}")).into())
    }
}
