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

//! Outside collaborators the question flow leans on. Both are optional and
//! both are allowed to fail: a missing answer review costs nothing, and a
//! failed transcription sends the user back to answer again.

pub mod http;

use async_trait::async_trait;
use cadence_common::error::Result;

#[async_trait]
pub trait FeedbackService: Send + Sync {
    /// Reviews a user's answer to a question and returns a short reply.
    async fn validate(&self, question: &str, answer: &str) -> Result<String>;
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: Vec<u8>) -> Result<String>;
}
