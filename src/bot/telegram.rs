//! Telegram Bot API transport: long polling, file download, replies.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{ChatTransport, Incoming, TextFormat, ToneBot, UserRef, VoiceMessage};

const API_BASE: &str = "https://api.telegram.org";
const POLL_TIMEOUT_SECS: u64 = 30;
const RETRY_DELAY: Duration = Duration::from_secs(5);

pub struct TelegramTransport {
    http_client: reqwest::Client,
    api_url: String,
    file_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
    pub voice: Option<Attachment>,
    pub audio: Option<Attachment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Attachment {
    pub file_id: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RemoteFile {
    file_path: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
}

impl TelegramTransport {
    pub fn new(token: &str) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS + 10))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http_client,
            api_url: format!("{API_BASE}/bot{token}"),
            file_url: format!("{API_BASE}/file/bot{token}"),
        })
    }

    async fn call<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = request.send().await.context("Telegram request failed")?;
        let status = response.status();
        let body: ApiResponse<T> = response
            .json()
            .await
            .with_context(|| format!("failed to parse Telegram response (HTTP {status})"))?;
        if !body.ok {
            bail!(
                "Telegram API error: {}",
                body.description.unwrap_or_else(|| status.to_string())
            );
        }
        body.result
            .ok_or_else(|| anyhow!("Telegram response missing result"))
    }

    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let request = self.http_client.get(format!("{}/getUpdates", self.api_url)).query(&[
            ("offset", offset.to_string()),
            ("timeout", POLL_TIMEOUT_SECS.to_string()),
            ("allowed_updates", "[\"message\"]".to_string()),
        ]);
        self.call(request).await
    }
}

impl ChatTransport for TelegramTransport {
    async fn send_text(&self, chat_id: i64, text: &str, format: TextFormat) -> Result<()> {
        let payload = SendMessage {
            chat_id,
            text,
            parse_mode: match format {
                TextFormat::Plain => None,
                TextFormat::Html => Some("HTML"),
            },
        };
        let request = self
            .http_client
            .post(format!("{}/sendMessage", self.api_url))
            .json(&payload);
        let _: serde_json::Value = self.call(request).await?;
        Ok(())
    }

    async fn download_file(&self, file_id: &str, destination: &Path) -> Result<()> {
        let request = self
            .http_client
            .get(format!("{}/getFile", self.api_url))
            .query(&[("file_id", file_id)]);
        let remote: RemoteFile = self.call(request).await?;
        let file_path = remote
            .file_path
            .ok_or_else(|| anyhow!("Telegram did not return a download path"))?;

        let response = self
            .http_client
            .get(format!("{}/{}", self.file_url, file_path))
            .send()
            .await
            .context("file download failed")?;
        let status = response.status();
        if !status.is_success() {
            bail!("file download returned HTTP {status}");
        }
        let bytes = response.bytes().await.context("failed to read file body")?;
        tokio::fs::write(destination, &bytes)
            .await
            .with_context(|| format!("failed to write {}", destination.display()))?;
        debug!(bytes = bytes.len(), path = %destination.display(), "downloaded attachment");
        Ok(())
    }
}

/// Map a Telegram update onto the events the bot handles.
pub fn incoming_from_update(update: &Update) -> Option<Incoming> {
    let message = update.message.as_ref()?;
    let chat_id = message.chat.id;
    if let Some(voice) = &message.voice {
        return Some(Incoming::Voice(VoiceMessage {
            chat_id,
            file_id: voice.file_id.clone(),
            extension: "ogg".to_string(),
        }));
    }
    if let Some(audio) = &message.audio {
        return Some(Incoming::Voice(VoiceMessage {
            chat_id,
            file_id: audio.file_id.clone(),
            extension: attachment_extension(audio),
        }));
    }
    let text = message.text.as_deref()?.trim();
    let command = text.split_whitespace().next()?;
    if command == "/start" || command.starts_with("/start@") {
        return Some(Incoming::Start {
            chat_id,
            user: message.from.as_ref().map(|user| UserRef {
                id: user.id,
                first_name: user.first_name.clone(),
            }),
        });
    }
    None
}

fn attachment_extension(attachment: &Attachment) -> String {
    let from_name = attachment
        .file_name
        .as_deref()
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    if let Some(ext) = from_name {
        return ext;
    }
    match attachment.mime_type.as_deref() {
        Some("audio/mpeg") | Some("audio/mp3") => "mp3",
        Some("audio/wav") | Some("audio/x-wav") | Some("audio/wave") => "wav",
        Some("audio/flac") | Some("audio/x-flac") => "flac",
        Some("audio/mp4") | Some("audio/x-m4a") | Some("audio/aac") => "m4a",
        _ => "ogg",
    }
    .to_string()
}

/// Long-poll Telegram until ctrl-c, handling each update on its own task.
pub async fn run_polling(bot: Arc<ToneBot>, transport: Arc<TelegramTransport>) -> Result<()> {
    let mut offset = 0i64;
    info!("bot started; press Ctrl+C to stop");
    loop {
        let updates = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                return Ok(());
            }
            result = transport.get_updates(offset) => result,
        };
        let updates = match updates {
            Ok(updates) => updates,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "polling failed; retrying");
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            let Some(incoming) = incoming_from_update(&update) else {
                debug!(update_id = update.update_id, "ignoring update");
                continue;
            };
            let bot = Arc::clone(&bot);
            let transport = Arc::clone(&transport);
            tokio::spawn(async move {
                bot.dispatch(transport.as_ref(), incoming).await;
            });
        }
    }
}
