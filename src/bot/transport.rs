use std::future::Future;
use std::path::Path;

use anyhow::Result;

/// How the messaging service should render a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    Plain,
    Html,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub id: i64,
    pub first_name: String,
}

/// Voice note or audio file attached to an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceMessage {
    pub chat_id: i64,
    pub file_id: String,
    /// Extension used for the temporary download, without the dot.
    pub extension: String,
}

/// Inbound events the bot reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    Start { chat_id: i64, user: Option<UserRef> },
    Voice(VoiceMessage),
}

/// Outbound side of a chat service.
pub trait ChatTransport: Send + Sync {
    fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        format: TextFormat,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Fetch the attachment `file_id` and store it at `destination`.
    fn download_file(
        &self,
        file_id: &str,
        destination: &Path,
    ) -> impl Future<Output = Result<()>> + Send;
}
