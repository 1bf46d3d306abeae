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

pub mod telegram;

use async_trait::async_trait;
use cadence_common::{
    channel::{Keyboard, SendError, VideoSource},
    error::Result,
};

/// Outbound side of a messaging channel. Failures are classified so the
/// delivery executor can decide whether a touch may be retried.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> std::result::Result<(), SendError>;

    async fn send_video(
        &self,
        chat_id: i64,
        source: &VideoSource,
        caption: Option<&str>,
        keyboard: Option<&Keyboard>,
    ) -> std::result::Result<(), SendError>;

    /// Downloads a voice note the user sent.
    async fn fetch_voice(&self, file_id: &str) -> Result<Vec<u8>>;
}
