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

//! The resumable position of a user inside a question dialogue. A cursor is
//! the only conversational state that crosses process boundaries, so it is
//! plain serde data.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::touch::TouchType;

/// Who a cursor belongs to: one bot instance talking to one user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Owner {
    pub bot_id: String,
    pub user_id: i64,
}

impl Owner {
    pub fn new(bot_id: impl Into<String>, user_id: i64) -> Self {
        Owner {
            bot_id: bot_id.into(),
            user_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum DialogueState {
    /// Collecting the evening ratings, `step` indexes [`RatingField::ORDER`].
    Rating { step: u8 },
    AwaitingAnswer,
    AwaitingVoiceConfirmation,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingField {
    Energy,
    Happiness,
    Progress,
    Focus,
    Calm,
}

impl RatingField {
    pub const ORDER: [RatingField; 5] = [
        RatingField::Energy,
        RatingField::Happiness,
        RatingField::Progress,
        RatingField::Focus,
        RatingField::Calm,
    ];

    pub fn at(step: u8) -> Option<RatingField> {
        Self::ORDER.get(usize::from(step)).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationCursor {
    pub state: DialogueState,
    pub touch: TouchType,
    pub content_id: i32,
    pub chat_id: i64,
    /// Local calendar date of the touch that opened the dialogue.
    pub date: NaiveDate,
    /// Snapshot taken at seed time; later content edits do not reach it.
    pub questions: Vec<String>,
    pub index: i32,
    pub answers: Vec<String>,
    #[serde(default)]
    pub pending_voice: Option<String>,
}

impl ConversationCursor {
    /// Splits a newline-delimited question list, dropping blank lines.
    pub fn parse_questions(raw: &str) -> Vec<String> {
        raw.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect()
    }

    pub fn questions(
        touch: TouchType,
        content_id: i32,
        chat_id: i64,
        date: NaiveDate,
        questions: Vec<String>,
    ) -> Self {
        ConversationCursor {
            state: DialogueState::AwaitingAnswer,
            touch,
            content_id,
            chat_id,
            date,
            questions,
            index: 0,
            answers: vec![],
            pending_voice: None,
        }
    }

    pub fn ratings(
        content_id: i32,
        chat_id: i64,
        date: NaiveDate,
        deferred_questions: Vec<String>,
    ) -> Self {
        ConversationCursor {
            state: DialogueState::Rating { step: 0 },
            ..Self::questions(
                TouchType::Evening,
                content_id,
                chat_id,
                date,
                deferred_questions,
            )
        }
    }

    /// The question the cursor points at, or `None` when the index is out
    /// of bounds.
    pub fn current_question(&self) -> Option<&str> {
        usize::try_from(self.index)
            .ok()
            .and_then(|i| self.questions.get(i))
            .map(String::as_str)
    }
}
