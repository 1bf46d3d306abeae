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

//! User-facing copy.

use cadence_common::{cursor::RatingField, touch::TouchType};
use chrono::NaiveTime;

pub const WELCOME: &str = "Welcome to the course! Every weekday you will get a morning \
lesson, a midday practice and an evening check-in. Use /time to change when they arrive.";

pub const TIME_USAGE: &str = "Usage: /time <morning|day|evening> <HH:MM|default>";

pub const NOTHING_PENDING: &str =
    "There is nothing waiting for an answer right now. Your next touch will arrive on schedule.";

pub const SESSION_RESET: &str =
    "Something went wrong with this conversation. Send /start to begin again.";

pub const QUESTIONS_HEADER: &str = "Questions for today:";

pub const DAY_ACTION: &str = "Done";

pub const DAY_ACKNOWLEDGED: &str = "Great work, see you this evening!";

pub const RATING_INVALID: &str = "Please answer with a number from 1 to 10.";

pub const RATINGS_DONE: &str = "Thank you for rating your day.";

pub const REFLECTION_QUESTION: &str =
    "What is one thing from today you want to carry into tomorrow?";

pub const VOICE_RECEIVED: &str = "Got your voice message. Send it as your answer?";

pub const VOICE_RERECORD: &str = "Okay, record your answer again.";

pub const VOICE_PENDING: &str = "Please confirm your voice message or record it again.";

pub const TRANSCRIPTION_FAILED: &str =
    "Sorry, I could not make out that voice message. Please answer again by voice or text.";

pub const COMPLETED: &str = "Thank you! That was the last question for today.";

pub fn time_set(touch: TouchType, time: NaiveTime) -> String {
    format!("Your {touch} touch will now arrive at {}.", time.format("%H:%M"))
}

pub fn time_reset(touch: TouchType) -> String {
    format!(
        "Your {touch} touch is back to the default time, {}.",
        touch.default_time().format("%H:%M")
    )
}

pub fn question_list(questions: &[String]) -> String {
    let mut text = QUESTIONS_HEADER.to_owned();
    for (i, question) in questions.iter().enumerate() {
        text.push_str(&format!("\n{}. {question}", i + 1));
    }
    text
}

pub fn question_prompt(index: usize, total: usize, question: &str) -> String {
    if total > 1 {
        format!("Question {} of {total}:\n{question}", index + 1)
    } else {
        question.to_owned()
    }
}

pub fn rating_prompt(field: RatingField) -> &'static str {
    match field {
        RatingField::Energy => "How would you rate your energy today, from 1 to 10?",
        RatingField::Happiness => "How happy did you feel today, from 1 to 10?",
        RatingField::Progress => "How much progress did you make today, from 1 to 10?",
        RatingField::Focus => "How focused were you today, from 1 to 10?",
        RatingField::Calm => "How calm did you feel today, from 1 to 10?",
    }
}
