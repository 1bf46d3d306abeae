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

//! Walks a user through the questions a touch asked, one answer at a time.

use cadence_common::{
    channel::Keyboard,
    cursor::{ConversationCursor, DialogueState},
    error::{CadenceErrorKind, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::rating;
use crate::channels::Messenger;
use crate::db::{self, answer::NewAnswer};
use crate::services::{FeedbackService, Transcriber};
use crate::texts;

/// What the user just did, stripped of channel details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Text(String),
    Voice { file_id: String },
    ConfirmVoice,
    Rerecord,
    Rate(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Reply {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Store the cursor and wait for the next message.
    Continue(ConversationCursor),
    /// The dialogue is over; drop the cursor.
    Finished,
    /// The cursor cannot be resumed; drop it.
    Corrupted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub outcome: Outcome,
    pub replies: Vec<Reply>,
}

impl Transition {
    fn stay(cursor: ConversationCursor, replies: Vec<Reply>) -> Self {
        Transition {
            outcome: Outcome::Continue(cursor),
            replies,
        }
    }
}

pub(crate) fn prompt(cursor: &ConversationCursor) -> Option<Reply> {
    let question = cursor.current_question()?;
    let index = usize::try_from(cursor.index).ok()?;
    Some(Reply::text(texts::question_prompt(
        index,
        cursor.questions.len(),
        question,
    )))
}

#[derive(Clone)]
pub struct Sequencer {
    db: DatabaseConnection,
    messenger: Arc<dyn Messenger>,
    feedback: Option<Arc<dyn FeedbackService>>,
    transcriber: Option<Arc<dyn Transcriber>>,
}

impl Sequencer {
    pub fn new(
        db: DatabaseConnection,
        messenger: Arc<dyn Messenger>,
        feedback: Option<Arc<dyn FeedbackService>>,
        transcriber: Option<Arc<dyn Transcriber>>,
    ) -> Self {
        Sequencer {
            db,
            messenger,
            feedback,
            transcriber,
        }
    }

    pub async fn step(
        &self,
        user_id: i64,
        cursor: ConversationCursor,
        input: Input,
        now: DateTime<Utc>,
    ) -> Result<Transition> {
        let state = cursor.state;
        match state {
            DialogueState::Rating { step } => {
                rating::step(user_id, cursor, step, input, now, &self.db).await
            }
            DialogueState::Completed => Ok(Transition {
                outcome: Outcome::Finished,
                replies: vec![],
            }),
            DialogueState::AwaitingAnswer | DialogueState::AwaitingVoiceConfirmation
                if cursor.current_question().is_none() =>
            {
                warn!(user_id, index = cursor.index, "Cursor index out of bounds");
                Ok(Transition {
                    outcome: Outcome::Corrupted,
                    replies: vec![Reply::text(texts::SESSION_RESET)],
                })
            }
            DialogueState::AwaitingAnswer => match input {
                Input::Text(text) => self.answer(user_id, cursor, text, now).await,
                Input::Voice { file_id } => Ok(Self::hold_voice(cursor, file_id)),
                // stale buttons from an earlier message
                Input::ConfirmVoice | Input::Rerecord | Input::Rate(_) => {
                    Ok(Transition::stay(cursor, vec![]))
                }
            },
            DialogueState::AwaitingVoiceConfirmation => match input {
                Input::Rerecord => {
                    let mut cursor = cursor;
                    cursor.pending_voice = None;
                    cursor.state = DialogueState::AwaitingAnswer;
                    Ok(Transition::stay(cursor, vec![Reply::text(texts::VOICE_RERECORD)]))
                }
                Input::ConfirmVoice => self.confirm_voice(user_id, cursor, now).await,
                Input::Voice { file_id } => Ok(Self::hold_voice(cursor, file_id)),
                Input::Text(text) => {
                    let mut cursor = cursor;
                    cursor.pending_voice = None;
                    cursor.state = DialogueState::AwaitingAnswer;
                    self.answer(user_id, cursor, text, now).await
                }
                Input::Rate(_) => Ok(Transition::stay(
                    cursor,
                    vec![Reply::with_keyboard(
                        texts::VOICE_PENDING,
                        Keyboard::voice_confirmation(),
                    )],
                )),
            },
        }
    }

    fn hold_voice(mut cursor: ConversationCursor, file_id: String) -> Transition {
        cursor.pending_voice = Some(file_id);
        cursor.state = DialogueState::AwaitingVoiceConfirmation;
        Transition::stay(
            cursor,
            vec![Reply::with_keyboard(
                texts::VOICE_RECEIVED,
                Keyboard::voice_confirmation(),
            )],
        )
    }

    async fn confirm_voice(
        &self,
        user_id: i64,
        mut cursor: ConversationCursor,
        now: DateTime<Utc>,
    ) -> Result<Transition> {
        let file_id = cursor.pending_voice.take();
        cursor.state = DialogueState::AwaitingAnswer;

        match self.transcribe(file_id.as_deref()).await {
            Ok(text) => {
                debug!(user_id, chars = text.len(), "Voice answer transcribed");
                self.answer(user_id, cursor, text, now).await
            }
            Err(err) => {
                warn!(user_id, "Transcription failed: {err}");
                let mut replies = vec![Reply::text(texts::TRANSCRIPTION_FAILED)];
                replies.extend(prompt(&cursor));
                Ok(Transition::stay(cursor, replies))
            }
        }
    }

    async fn transcribe(&self, file_id: Option<&str>) -> Result<String> {
        let file_id = file_id.ok_or_else(|| {
            CadenceErrorKind::Channel("no voice message pending".into())
        })?;
        let transcriber = self.transcriber.as_ref().ok_or_else(|| {
            CadenceErrorKind::Service("transcription disabled".into())
        })?;
        let audio = self.messenger.fetch_voice(file_id).await?;
        transcriber.transcribe(audio).await
    }

    /// Records `text` as the answer to the current question and moves on.
    async fn answer(
        &self,
        user_id: i64,
        mut cursor: ConversationCursor,
        text: String,
        now: DateTime<Utc>,
    ) -> Result<Transition> {
        let Some(question) = cursor.current_question().map(str::to_owned) else {
            return Ok(Transition {
                outcome: Outcome::Corrupted,
                replies: vec![Reply::text(texts::SESSION_RESET)],
            });
        };

        let feedback = match &self.feedback {
            Some(service) => match service.validate(&question, &text).await {
                Ok(feedback) => Some(feedback),
                Err(err) => {
                    warn!(user_id, "Answer feedback unavailable: {err}");
                    None
                }
            },
            None => None,
        };

        db::answer::create(
            NewAnswer {
                user_id,
                content_id: cursor.content_id,
                date: cursor.date,
                question_index: cursor.index,
                question,
                text: text.clone(),
                feedback: feedback.clone(),
            },
            now,
            &self.db,
        )
        .await?;

        let mut replies: Vec<Reply> = feedback.into_iter().map(Reply::text).collect();
        cursor.answers.push(text);
        cursor.pending_voice = None;
        cursor.index += 1;

        match prompt(&cursor) {
            Some(next) => {
                replies.push(next);
                Ok(Transition::stay(cursor, replies))
            }
            None => {
                info!(
                    user_id,
                    content_id = cursor.content_id,
                    answers = cursor.answers.len(),
                    "Questions completed"
                );
                cursor.state = DialogueState::Completed;
                replies.push(Reply::text(texts::COMPLETED));
                Ok(Transition {
                    outcome: Outcome::Finished,
                    replies,
                })
            }
        }
    }
}
