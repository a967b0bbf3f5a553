//! Chat bot that classifies the tone of inbound voice messages
//!
//! Each message is handled on its own task: authorisation check, download into
//! a uniquely named temp file, pitch extraction and inference on the blocking
//! pool, then a reply. The classifier is loaded once and shared; the temp file
//! is removed on every exit path.

pub mod telegram;
mod temp;
mod transport;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::features::FeatureExtractor;
use crate::model::{predict, Prediction, ToneClassifier};

pub use temp::TempAudioFile;
pub use transport::{ChatTransport, Incoming, TextFormat, UserRef, VoiceMessage};

pub const DENIED_TEXT: &str = "Sorry, you do not have permission to use this bot.";
pub const MODEL_UNAVAILABLE_TEXT: &str =
    "Sorry, the tone model is not loaded. Please contact the administrator.";
pub const ANALYZING_TEXT: &str = "Analyzing your audio... 🧠";
pub const FAILURE_TEXT: &str =
    "Something went wrong while analyzing your audio. Please try again.";

/// What happened to one voice message.
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceOutcome {
    Denied,
    ModelUnavailable,
    Classified(Prediction),
    Failed,
}

pub struct ToneBot {
    classifier: Option<Arc<dyn ToneClassifier>>,
    extractor: FeatureExtractor,
    class_names: Vec<String>,
    allowed_chats: HashSet<i64>,
    temp_dir: PathBuf,
}

impl ToneBot {
    /// `classifier` is `None` when the model failed to load; the bot still
    /// answers `start` and explains the outage on voice messages.
    pub fn new(
        classifier: Option<Arc<dyn ToneClassifier>>,
        extractor: FeatureExtractor,
        class_names: Vec<String>,
        allowed_chats: HashSet<i64>,
        temp_dir: PathBuf,
    ) -> Self {
        Self {
            classifier,
            extractor,
            class_names,
            allowed_chats,
            temp_dir,
        }
    }

    pub fn is_open(&self) -> bool {
        self.allowed_chats.is_empty()
    }

    pub fn is_authorized(&self, chat_id: i64) -> bool {
        self.is_open() || self.allowed_chats.contains(&chat_id)
    }

    pub fn model_loaded(&self) -> bool {
        self.classifier.is_some()
    }

    pub async fn dispatch<T: ChatTransport>(&self, transport: &T, incoming: Incoming) {
        match incoming {
            Incoming::Start { chat_id, user } => {
                if let Err(err) = self.handle_start(transport, chat_id, user.as_ref()).await {
                    error!(chat_id, error = %err, "failed to send welcome message");
                }
            }
            Incoming::Voice(message) => {
                self.handle_voice(transport, &message).await;
            }
        }
    }

    pub async fn handle_start<T: ChatTransport>(
        &self,
        transport: &T,
        chat_id: i64,
        user: Option<&UserRef>,
    ) -> Result<()> {
        transport
            .send_text(chat_id, &welcome_text(user), TextFormat::Html)
            .await
    }

    pub async fn handle_voice<T: ChatTransport>(
        &self,
        transport: &T,
        message: &VoiceMessage,
    ) -> VoiceOutcome {
        let chat_id = message.chat_id;
        if !self.is_authorized(chat_id) {
            warn!(chat_id, "access denied");
            self.reply(transport, chat_id, DENIED_TEXT).await;
            return VoiceOutcome::Denied;
        }
        let Some(classifier) = self.classifier.as_ref() else {
            self.reply(transport, chat_id, MODEL_UNAVAILABLE_TEXT).await;
            return VoiceOutcome::ModelUnavailable;
        };

        match self.classify_message(transport, message, classifier).await {
            Ok(prediction) => VoiceOutcome::Classified(prediction),
            Err(err) => {
                error!(chat_id, error = %format!("{err:#}"), "failed to analyze audio");
                self.reply(transport, chat_id, FAILURE_TEXT).await;
                VoiceOutcome::Failed
            }
        }
    }

    async fn classify_message<T: ChatTransport>(
        &self,
        transport: &T,
        message: &VoiceMessage,
        classifier: &Arc<dyn ToneClassifier>,
    ) -> Result<Prediction> {
        let chat_id = message.chat_id;
        let temp = TempAudioFile::new(&self.temp_dir, &message.extension);

        transport
            .send_text(chat_id, ANALYZING_TEXT, TextFormat::Plain)
            .await
            .context("failed to acknowledge message")?;
        transport
            .download_file(&message.file_id, temp.path())
            .await
            .context("failed to download audio")?;
        info!(chat_id, path = %temp.path().display(), "saved inbound audio");

        let extractor = self.extractor.clone();
        let classifier = Arc::clone(classifier);
        let class_names = self.class_names.clone();
        let path = temp.path().to_path_buf();
        let prediction = tokio::task::spawn_blocking(move || -> Result<Prediction> {
            let features = extractor.extract_file(&path)?;
            let features = features.to_vec();
            Ok(predict(classifier.as_ref(), &features, &class_names)?)
        })
        .await
        .context("inference task panicked")??;

        info!(
            chat_id,
            label = %prediction.label,
            confidence = prediction.confidence,
            "classified audio"
        );
        transport
            .send_text(chat_id, &prediction_text(&prediction), TextFormat::Html)
            .await
            .context("failed to send prediction")?;
        Ok(prediction)
    }

    async fn reply<T: ChatTransport>(&self, transport: &T, chat_id: i64, text: &str) {
        if let Err(err) = transport.send_text(chat_id, text, TextFormat::Plain).await {
            error!(chat_id, error = %err, "failed to send reply");
        }
    }
}

pub fn welcome_text(user: Option<&UserRef>) -> String {
    let greeting = match user {
        Some(user) => format!(
            "Hello, <a href=\"tg://user?id={}\">{}</a>! 👋",
            user.id,
            escape_html(&user.first_name)
        ),
        None => "Hello! 👋".to_string(),
    };
    format!(
        "{greeting}\n\nI classify the tone of spoken syllables. \
         Send me a voice message or an audio file to analyze."
    )
}

pub fn prediction_text(prediction: &Prediction) -> String {
    format!(
        "Analysis complete! 🎼\n\nI believe this audio is: <b>{}</b>\n<i>(Confidence: {:.2}%)</i>",
        escape_html(&prediction.label),
        prediction.confidence
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
