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

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::touch::TouchType;

/// Outcome of a failed send as classified by the messaging channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    /// Rate limits, network trouble: worth trying again another day.
    #[error("transient: {0}")]
    Transient(String),
    /// Blocked bot, deleted account, unknown chat: trying again is futile.
    #[error("permanent: {0}")]
    Permanent(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoSource {
    File(PathBuf),
    Url(String),
}

/// A single button on a choice keyboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub label: String,
    pub token: CallbackToken,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Keyboard {
    pub rows: Vec<Vec<Choice>>,
}

impl Keyboard {
    pub fn choices<I, L>(choices: I, per_row: usize) -> Self
    where
        I: IntoIterator<Item = (L, CallbackToken)>,
        L: Into<String>,
    {
        let mut rows: Vec<Vec<Choice>> = vec![];
        for (label, token) in choices {
            match rows.last_mut() {
                Some(row) if row.len() < per_row.max(1) => row.push(Choice {
                    label: label.into(),
                    token,
                }),
                _ => rows.push(vec![Choice {
                    label: label.into(),
                    token,
                }]),
            }
        }
        Keyboard { rows }
    }

    /// The 1 to 10 keyboard used by the evening ratings.
    pub fn rating_scale() -> Self {
        Self::choices((1..=10).map(|n| (n.to_string(), CallbackToken::Rate(n))), 5)
    }

    pub fn voice_confirmation() -> Self {
        Self::choices(
            [
                ("Send it", CallbackToken::VoiceConfirm),
                ("Record again", CallbackToken::VoiceRerecord),
            ],
            2,
        )
    }

    pub fn tokens(&self) -> impl Iterator<Item = &CallbackToken> {
        self.rows.iter().flatten().map(|choice| &choice.token)
    }
}

/// Callback data attached to keyboard buttons. Telegram limits callback data
/// to 64 bytes, so the wire form is a short colon-separated string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum CallbackToken {
    Rate(u8),
    VoiceConfirm,
    VoiceRerecord,
    Ack { touch: TouchType, content_id: i32 },
}

impl fmt::Display for CallbackToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackToken::Rate(n) => write!(f, "rate:{n}"),
            CallbackToken::VoiceConfirm => f.write_str("voice:confirm"),
            CallbackToken::VoiceRerecord => f.write_str("voice:rerecord"),
            CallbackToken::Ack { touch, content_id } => write!(f, "ack:{touch}:{content_id}"),
        }
    }
}

impl FromStr for CallbackToken {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            ["rate", n] => match n.parse::<u8>() {
                Ok(n) if (1..=10).contains(&n) => Ok(CallbackToken::Rate(n)),
                _ => Err(format!("rating out of range in `{s}`")),
            },
            ["voice", "confirm"] => Ok(CallbackToken::VoiceConfirm),
            ["voice", "rerecord"] => Ok(CallbackToken::VoiceRerecord),
            ["ack", touch, id] => Ok(CallbackToken::Ack {
                touch: touch.parse()?,
                content_id: id.parse().map_err(|_| format!("bad content id in `{s}`"))?,
            }),
            _ => Err(format!("unknown callback `{s}`")),
        }
    }
}

impl From<CallbackToken> for String {
    fn from(token: CallbackToken) -> Self {
        token.to_string()
    }
}

impl TryFrom<String> for CallbackToken {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A message received from a user, already stripped of channel specifics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub user_id: i64,
    pub chat_id: i64,
    pub username: Option<String>,
    pub kind: InboundKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundKind {
    Text(String),
    Voice { file_id: String },
    Callback(CallbackToken),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_survive_the_wire() {
        for token in [
            CallbackToken::Rate(7),
            CallbackToken::VoiceConfirm,
            CallbackToken::VoiceRerecord,
            CallbackToken::Ack {
                touch: TouchType::Day,
                content_id: 42,
            },
        ] {
            assert_eq!(token.to_string().parse::<CallbackToken>(), Ok(token));
        }
    }

    #[test]
    fn rejects_out_of_range_ratings() {
        assert!("rate:0".parse::<CallbackToken>().is_err());
        assert!("rate:11".parse::<CallbackToken>().is_err());
        assert!("rate:x".parse::<CallbackToken>().is_err());
    }

    #[test]
    fn rating_scale_has_two_rows_of_five() {
        let keyboard = Keyboard::rating_scale();
        assert_eq!(keyboard.rows.len(), 2);
        assert!(keyboard.rows.iter().all(|row| row.len() == 5));
        assert_eq!(keyboard.rows[1][4].token, CallbackToken::Rate(10));
        assert_eq!(keyboard.rows[0][0].label, "1");
    }
}
