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

//! The evening check-in: five ratings from 1 to 10, then the day's
//! reflection questions.

use cadence_common::{
    channel::Keyboard,
    cursor::{ConversationCursor, DialogueState, RatingField},
    error::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use tracing::debug;

use super::sequencer::{Input, Outcome, Reply, Transition, prompt};
use crate::db;
use crate::texts;

/// Accepts a keyboard press or a typed whole number from 1 to 10.
pub fn parse_rating(input: &Input) -> Option<u8> {
    let value = match input {
        Input::Rate(n) => Some(*n),
        Input::Text(text) => text.trim().parse::<u8>().ok(),
        _ => None,
    };
    value.filter(|n| (1..=10).contains(n))
}

pub fn question(field: RatingField) -> Reply {
    Reply::with_keyboard(texts::rating_prompt(field), Keyboard::rating_scale())
}

pub async fn step(
    user_id: i64,
    mut cursor: ConversationCursor,
    step: u8,
    input: Input,
    now: DateTime<Utc>,
    db: &DatabaseConnection,
) -> Result<Transition> {
    let Some(field) = RatingField::at(step) else {
        return Ok(Transition {
            outcome: Outcome::Corrupted,
            replies: vec![Reply::text(texts::SESSION_RESET)],
        });
    };

    let Some(value) = parse_rating(&input) else {
        return Ok(Transition {
            outcome: Outcome::Continue(cursor),
            replies: vec![Reply::text(texts::RATING_INVALID), question(field)],
        });
    };

    db::rating::record(user_id, cursor.date, field, value, now, db).await?;
    debug!(user_id, ?field, value, "Rating recorded");

    if let Some(next) = RatingField::at(step + 1) {
        cursor.state = DialogueState::Rating { step: step + 1 };
        return Ok(Transition {
            outcome: Outcome::Continue(cursor),
            replies: vec![question(next)],
        });
    }

    // hand over to the free-text questions
    if cursor.questions.is_empty() {
        cursor.questions = vec![texts::REFLECTION_QUESTION.to_owned()];
    }
    cursor.state = DialogueState::AwaitingAnswer;
    cursor.index = 0;

    let mut replies = vec![Reply::text(texts::RATINGS_DONE)];
    replies.extend(prompt(&cursor));
    Ok(Transition {
        outcome: Outcome::Continue(cursor),
        replies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{at, test_db};
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
    }

    #[test]
    fn parses_typed_and_pressed_ratings() {
        assert_eq!(parse_rating(&Input::Rate(4)), Some(4));
        assert_eq!(parse_rating(&Input::Text(" 10 ".into())), Some(10));
        assert_eq!(parse_rating(&Input::Text("0".into())), None);
        assert_eq!(parse_rating(&Input::Text("11".into())), None);
        assert_eq!(parse_rating(&Input::Text("seven".into())), None);
        assert_eq!(parse_rating(&Input::ConfirmVoice), None);
    }

    #[tokio::test]
    async fn five_ratings_then_content_questions() {
        let db = test_db().await;
        let now = at("2025-03-03T21:02:00Z");
        let mut cursor = ConversationCursor::ratings(3, 1001, date(), vec!["Best moment?".into()]);

        for (i, value) in [6u8, 7, 8, 9].into_iter().enumerate() {
            let transition = step(1, cursor, i as u8, Input::Rate(value), now, &db).await.unwrap();
            let Outcome::Continue(next) = transition.outcome else {
                panic!("ratings should continue");
            };
            assert_eq!(next.state, DialogueState::Rating { step: i as u8 + 1 });
            cursor = next;
        }

        let transition = step(1, cursor, 4, Input::Text("5".into()), now, &db).await.unwrap();
        let Outcome::Continue(next) = transition.outcome else {
            panic!("questions should follow ratings");
        };
        assert_eq!(next.state, DialogueState::AwaitingAnswer);
        assert_eq!(next.index, 0);
        assert_eq!(transition.replies.last(), Some(&Reply::text("Best moment?")));

        let rating = db::rating::get(1, date(), &db).await.unwrap().unwrap();
        assert_eq!(
            [rating.energy, rating.happiness, rating.progress, rating.focus, rating.calm],
            [Some(6), Some(7), Some(8), Some(9), Some(5)]
        );
    }

    #[tokio::test]
    async fn reflection_question_when_content_has_none() {
        let db = test_db().await;
        let cursor = ConversationCursor::ratings(3, 1001, date(), vec![]);
        let transition = step(1, cursor, 4, Input::Rate(8), at("2025-03-03T21:02:00Z"), &db)
            .await
            .unwrap();
        let Outcome::Continue(next) = transition.outcome else {
            panic!("reflection should follow ratings");
        };
        assert_eq!(next.questions, vec![texts::REFLECTION_QUESTION]);
    }

    #[tokio::test]
    async fn invalid_rating_repeats_the_question() {
        let db = test_db().await;
        let cursor = ConversationCursor::ratings(3, 1001, date(), vec![]);
        let now = at("2025-03-03T21:02:00Z");
        let transition = step(1, cursor.clone(), 0, Input::Text("lots".into()), now, &db)
            .await
            .unwrap();
        assert_eq!(transition.outcome, Outcome::Continue(cursor));
        assert_eq!(transition.replies[0], Reply::text(texts::RATING_INVALID));
        assert!(db::rating::get(1, date(), &db).await.unwrap().is_none());
    }
}
