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

//! Telegram transport: long polling for inbound updates and the Bot API for
//! outbound sends.

use async_trait::async_trait;
use cadence_common::{
    channel::{CallbackToken, Inbound, InboundKind, Keyboard, SendError, VideoSource},
    error::{CadenceErrorKind, Result},
};
use chrono::Utc;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQuery, ChatId, FileId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile,
};
use teloxide::{ApiError, RequestError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::Messenger;
use crate::conversation::Dialogue;

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        TelegramMessenger { bot }
    }
}

fn markup(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(keyboard.rows.iter().map(|row| {
        row.iter()
            .map(|choice| {
                InlineKeyboardButton::callback(choice.label.clone(), choice.token.to_string())
            })
            .collect::<Vec<_>>()
    }))
}

/// Errors that will recur on every attempt for this chat are permanent.
fn classify(err: RequestError) -> SendError {
    match &err {
        RequestError::Api(
            ApiError::BotBlocked
            | ApiError::BotKicked
            | ApiError::ChatNotFound
            | ApiError::UserDeactivated
            | ApiError::CantInitiateConversation,
        )
        | RequestError::MigrateToChatId(_) => SendError::Permanent(err.to_string()),
        _ => SendError::Transient(err.to_string()),
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> std::result::Result<(), SendError> {
        let request = self.bot.send_message(ChatId(chat_id), text);
        let sent = match keyboard {
            Some(keyboard) => request.reply_markup(markup(keyboard)).await,
            None => request.await,
        };
        sent.map(|_| ()).map_err(classify)
    }

    async fn send_video(
        &self,
        chat_id: i64,
        source: &VideoSource,
        caption: Option<&str>,
        keyboard: Option<&Keyboard>,
    ) -> std::result::Result<(), SendError> {
        let file = match source {
            VideoSource::File(path) => InputFile::file(path.clone()),
            VideoSource::Url(url) => match url::Url::parse(url) {
                Ok(url) => InputFile::url(url),
                Err(err) => {
                    return Err(SendError::Transient(format!("bad video url `{url}`: {err}")));
                }
            },
        };
        let mut request = self.bot.send_video(ChatId(chat_id), file);
        if let Some(caption) = caption {
            request = request.caption(caption);
        }
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(markup(keyboard));
        }
        request.await.map(|_| ()).map_err(classify)
    }

    async fn fetch_voice(&self, file_id: &str) -> Result<Vec<u8>> {
        let file = self
            .bot
            .get_file(FileId(file_id.to_owned()))
            .await
            .map_err(|err| CadenceErrorKind::Channel(format!("failed to get file info: {err}")))?;

        let mut buf = Vec::new();
        self.bot
            .download_file(&file.path, &mut buf)
            .await
            .map_err(|err| CadenceErrorKind::Channel(format!("failed to download file: {err}")))?;
        debug!(file_id, size = buf.len(), "Downloaded voice note");
        Ok(buf)
    }
}

/// Converts a private text or voice message. Anything else is ignored.
pub fn inbound_from_message(msg: &Message) -> Option<Inbound> {
    if !msg.chat.is_private() {
        return None;
    }
    let user = msg.from.as_ref()?;
    let kind = if let Some(text) = msg.text() {
        InboundKind::Text(text.to_owned())
    } else if let Some(voice) = msg.voice() {
        InboundKind::Voice {
            file_id: voice.file.id.to_string(),
        }
    } else {
        return None;
    };
    Some(Inbound {
        user_id: i64::try_from(user.id.0).ok()?,
        chat_id: msg.chat.id.0,
        username: user.username.clone(),
        kind,
    })
}

/// Button presses arrive from private chats only, so the chat id is the
/// user id.
pub fn inbound_from_callback(query: &CallbackQuery) -> Option<Inbound> {
    let token = query.data.as_deref()?.parse::<CallbackToken>().ok()?;
    let user_id = i64::try_from(query.from.id.0).ok()?;
    Some(Inbound {
        user_id,
        chat_id: user_id,
        username: query.from.username.clone(),
        kind: InboundKind::Callback(token),
    })
}

async fn dispatch(dialogue: &Dialogue, inbound: Inbound) {
    let user_id = inbound.user_id;
    if let Err(err) = dialogue.handle(inbound, Utc::now()).await {
        error!(user_id, "Failed to handle inbound message: {err}");
    }
}

/// Long-polls Telegram until `cancel` fires.
pub async fn run_polling(bot: Bot, dialogue: Dialogue, cancel: CancellationToken) {
    let on_message = dialogue.clone();
    let on_callback = dialogue;
    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(move |msg: Message| {
            let dialogue = on_message.clone();
            async move {
                match inbound_from_message(&msg) {
                    Some(inbound) => dispatch(&dialogue, inbound).await,
                    None => debug!(chat_id = msg.chat.id.0, "Ignoring unsupported message"),
                }
                respond(())
            }
        }))
        .branch(Update::filter_callback_query().endpoint(
            move |bot: Bot, query: CallbackQuery| {
                let dialogue = on_callback.clone();
                async move {
                    if let Err(err) = bot.answer_callback_query(query.id.clone()).await {
                        warn!("Failed to answer callback query: {err}");
                    }
                    match inbound_from_callback(&query) {
                        Some(inbound) => dispatch(&dialogue, inbound).await,
                        None => debug!(data = ?query.data, "Ignoring unknown callback"),
                    }
                    respond(())
                }
            },
        ));

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .default_handler(|_| async {})
        .build();
    let shutdown = dispatcher.shutdown_token();
    tokio::spawn(async move {
        cancel.cancelled().await;
        if let Ok(stopped) = shutdown.shutdown() {
            stopped.await;
        }
    });

    info!("Starting Telegram long polling");
    dispatcher.dispatch().await;
    info!("Telegram long polling stopped");
}
