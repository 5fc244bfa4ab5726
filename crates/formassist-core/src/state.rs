//! UI-agnostic conversation state
//!
//! `Session` holds everything the chat view shows. Each user operation is
//! split into a transition that runs before its request is issued and an
//! `apply_*` transition that folds the response back in, so the whole flow
//! can be exercised without a network or a terminal.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::api::{ChatReply, RephraseReply, UploadFile, UploadReply};
use crate::error::{ApiError, Rejected};
use crate::language::DEFAULT_LANGUAGE;

pub const REPHRASE_PENDING_TEXT: &str = "Rephrasing your question, please wait...";
pub const NO_FILE_SELECTED: &str = "No file selected.";
pub const UPLOADING: &str = "Uploading...";
pub const UPLOAD_ERROR: &str = "❌ Error uploading file.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageKind {
    User,
    Assistant,
    /// Placeholder for a rephrase that has not come back yet.
    AssistantPending,
}

/// One transcript entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub kind: MessageKind,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: MessageKind::User,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: MessageKind::Assistant,
        }
    }

    fn pending(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: MessageKind::AssistantPending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.kind == MessageKind::AssistantPending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    Chat,
    Rephrase,
    Upload,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Chat => "chat",
            RequestKind::Rephrase => "rephrase",
            RequestKind::Upload => "upload",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which kinds of request are currently outstanding. Kinds are independent
/// of each other; a kind is never outstanding twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InFlight {
    pub chat: bool,
    pub rephrase: bool,
    pub upload: bool,
}

impl InFlight {
    pub fn get(&self, kind: RequestKind) -> bool {
        match kind {
            RequestKind::Chat => self.chat,
            RequestKind::Rephrase => self.rephrase,
            RequestKind::Upload => self.upload,
        }
    }

    pub fn any(&self) -> bool {
        self.chat || self.rephrase || self.upload
    }
}

/// Chat request produced by [`Session::submit_message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
    pub language: String,
}

/// Upload request produced by [`Session::begin_upload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file: UploadFile,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    transcript: Vec<Message>,
    /// Text typed but not yet sent.
    pub draft: String,
    language: String,
    upload_status: String,
    download_link: Option<String>,
    in_flight: InFlight,
    notice: Option<String>,
    revision: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGE)
    }
}

impl Session {
    pub fn new(language: &str) -> Self {
        Self {
            transcript: Vec::new(),
            draft: String::new(),
            language: language.to_string(),
            upload_status: String::new(),
            download_link: None,
            in_flight: InFlight::default(),
            notice: None,
            revision: 0,
        }
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn upload_status(&self) -> &str {
        &self.upload_status
    }

    pub fn download_link(&self) -> Option<&str> {
        self.download_link.as_deref()
    }

    pub fn in_flight(&self) -> InFlight {
        self.in_flight
    }

    /// Last chat or rephrase failure. These never reach the transcript.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    /// Bumped on every transcript change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn set_language(&mut self, value: impl Into<String>) {
        self.language = value.into();
    }

    /// Commit the draft: append it as a user entry, clear the draft and hand
    /// back the request to send.
    pub fn submit_message(&mut self) -> Result<ChatRequest, Rejected> {
        if self.draft.trim().is_empty() {
            return Err(Rejected::EmptyMessage);
        }
        if self.in_flight.chat {
            return Err(Rejected::Busy(RequestKind::Chat));
        }

        let message = std::mem::take(&mut self.draft);
        self.push(Message::user(message.clone()));
        self.in_flight.chat = true;

        Ok(ChatRequest {
            message,
            language: self.language.clone(),
        })
    }

    pub fn apply_chat_reply(&mut self, outcome: Result<ChatReply, ApiError>) {
        self.in_flight.chat = false;

        match outcome {
            Ok(reply) => {
                self.notice = None;
                self.push(Message::assistant(reply.reply));
                if let Some(link) = reply.download_link.filter(|l| !l.is_empty()) {
                    tracing::info!(%link, "download available");
                    self.download_link = Some(link);
                }
            }
            Err(err) => self.record_failure(RequestKind::Chat, &err),
        }
    }

    pub fn begin_rephrase(&mut self) -> Result<(), Rejected> {
        if self.in_flight.rephrase {
            return Err(Rejected::Busy(RequestKind::Rephrase));
        }

        self.in_flight.rephrase = true;
        self.push(Message::pending(REPHRASE_PENDING_TEXT));
        Ok(())
    }

    /// Settle a rephrase. Clears the in-flight flag and the placeholder
    /// whatever the outcome; a failed rephrase leaves no placeholder behind,
    /// only the notice.
    pub fn apply_rephrase_reply(&mut self, outcome: Result<RephraseReply, ApiError>) {
        self.in_flight.rephrase = false;
        self.remove_pending();

        match outcome {
            Ok(reply) => {
                self.notice = None;
                self.push(Message::assistant(reply.reply));
            }
            Err(err) => self.record_failure(RequestKind::Rephrase, &err),
        }
    }

    pub fn begin_upload(&mut self, file: Option<UploadFile>) -> Result<UploadRequest, Rejected> {
        let Some(file) = file else {
            self.upload_status = NO_FILE_SELECTED.to_string();
            return Err(Rejected::NoFile);
        };
        if self.in_flight.upload {
            return Err(Rejected::Busy(RequestKind::Upload));
        }

        self.upload_status = UPLOADING.to_string();
        self.in_flight.upload = true;

        Ok(UploadRequest {
            file,
            language: self.language.clone(),
        })
    }

    /// The picked file could not be read, so nothing is sent.
    pub fn note_unreadable_file(&mut self, path: &str, err: &std::io::Error) {
        tracing::warn!(path, error = %err, "could not read file for upload");
        self.upload_status = format!("❌ Could not read {}: {}", path, err);
    }

    pub fn apply_upload_outcome(&mut self, file_name: &str, outcome: Result<UploadReply, ApiError>) {
        self.in_flight.upload = false;

        match outcome {
            Ok(reply) => {
                self.upload_status = format!("✅ File uploaded: {}", file_name);
                self.push(Message::user(format!("📂 Uploaded: {}", file_name)));
                self.push(Message::assistant(reply.reply));
            }
            Err(ApiError::Status {
                status,
                error: Some(error),
            }) => {
                tracing::warn!(file = file_name, status, %error, "upload rejected by server");
                self.upload_status = format!("❌ Upload failed: {}", error);
            }
            Err(err) => {
                tracing::error!(file = file_name, error = %err, "upload failed");
                self.upload_status = UPLOAD_ERROR.to_string();
            }
        }
    }

    fn push(&mut self, message: Message) {
        self.transcript.push(message);
        self.revision += 1;
    }

    fn remove_pending(&mut self) {
        let before = self.transcript.len();
        self.transcript.retain(|m| !m.is_pending());
        if self.transcript.len() != before {
            self.revision += 1;
        }
    }

    fn record_failure(&mut self, kind: RequestKind, err: &ApiError) {
        tracing::error!(request = %kind, error = %err, "request failed");
        self.notice = Some(format!("{} request failed: {}", kind, err));
    }
}
