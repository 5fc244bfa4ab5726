use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::api::{AssistantClient, UploadFile};
use crate::error::Rejected;
use crate::state::Session;

/// Runs session operations end to end, one at a time.
///
/// Interactive front ends drive [`Session`] and [`AssistantClient`]
/// separately so requests can overlap; this is for callers that simply
/// await each step.
pub struct Conversation {
    session: Session,
    client: AssistantClient,
}

impl Conversation {
    pub fn new(client: AssistantClient, language: &str) -> Self {
        Self {
            session: Session::new(language),
            client,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn client(&self) -> &AssistantClient {
        &self.client
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    pub fn set_language(&mut self, value: &str) {
        self.session.set_language(value);
    }

    /// Network failures do not come back as errors; they end up in the
    /// session's notice.
    pub async fn submit_message(&mut self, text: &str) -> Result<(), Rejected> {
        self.session.draft = text.to_string();
        let request = self.session.submit_message()?;

        let outcome = self.client.chat(&request.message, &request.language).await;
        self.session.apply_chat_reply(outcome);
        Ok(())
    }

    pub async fn request_rephrase(&mut self) -> Result<(), Rejected> {
        self.session.begin_rephrase()?;

        let outcome = self.client.rephrase().await;
        self.session.apply_rephrase_reply(outcome);
        Ok(())
    }

    pub async fn upload_document(&mut self, file: Option<UploadFile>) -> Result<(), Rejected> {
        let request = self.session.begin_upload(file)?;

        let outcome = self.client.upload(&request.file, &request.language).await;
        self.session.apply_upload_outcome(&request.file.name, outcome);
        Ok(())
    }

    /// Save the artifact offered by the last chat reply into `dir`.
    pub async fn download_artifact(&self, dir: &Path) -> Result<PathBuf> {
        let link = self.session.download_link().ok_or(Rejected::NoDownload)?;
        let path = self.client.save_download(link, dir).await?;
        Ok(path)
    }
}
