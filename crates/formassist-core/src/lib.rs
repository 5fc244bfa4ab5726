pub mod api;
pub mod config;
pub mod conversation;
pub mod error;
pub mod language;
pub mod state;

// Re-export main types for convenience
pub use api::{AssistantClient, ChatReply, RephraseReply, UploadFile, UploadReply, DEFAULT_SERVER_URL};
pub use config::Config;
pub use conversation::Conversation;
pub use error::{ApiError, Rejected};
pub use state::{InFlight, Message, MessageKind, RequestKind, Session};
