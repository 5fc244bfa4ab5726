use std::path::PathBuf;

use formassist_core::{
    language, ApiError, AssistantClient, ChatReply, Rejected, RephraseReply, Session, UploadFile,
    UploadReply,
};
use ratatui::widgets::Paragraph;
use tokio::task::JoinHandle;

use crate::ui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
    /// Prompt for the path of a document to upload
    FilePath,
    /// Prompt for a free-text language
    Language,
}

type Task<T> = JoinHandle<Result<T, ApiError>>;

/// Lines the view moves per tick while catching up with the newest entry.
const SCROLL_STEP: u16 = 3;

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub session: Session,
    pub client: AssistantClient,
    pub download_dir: PathBuf,

    // Message input (edits session.draft)
    pub input_cursor: usize,

    // Popup prompt input (file path / language)
    pub prompt_input: String,
    pub prompt_cursor: usize,

    // Transcript view
    pub scroll: u16,
    pub scroll_target: u16,
    pub follow_latest: bool,
    pub view_height: u16, // Inner height of the transcript pane
    pub view_width: u16,  // Inner width of the transcript pane
    seen_revision: u64,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    pub download_status: Option<String>,

    // Outstanding requests
    chat_task: Option<Task<ChatReply>>,
    rephrase_task: Option<Task<RephraseReply>>,
    upload_task: Option<(String, Task<UploadReply>)>,
    download_task: Option<Task<PathBuf>>,
}

impl App {
    pub fn new(client: AssistantClient, language: &str, download_dir: PathBuf) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            session: Session::new(language),
            client,
            download_dir,

            input_cursor: 0,

            prompt_input: String::new(),
            prompt_cursor: 0,

            scroll: 0,
            scroll_target: 0,
            follow_latest: true,
            view_height: 0,
            view_width: 0,
            seen_revision: 0,

            animation_frame: 0,

            download_status: None,

            chat_task: None,
            rephrase_task: None,
            upload_task: None,
            download_task: None,
        }
    }

    pub fn send_message(&mut self) {
        match self.session.submit_message() {
            Ok(request) => {
                self.input_cursor = 0;
                self.follow_latest = true;

                let client = self.client.clone();
                self.chat_task = Some(tokio::spawn(async move {
                    client.chat(&request.message, &request.language).await
                }));
            }
            Err(Rejected::EmptyMessage) => {}
            Err(rejected) => tracing::debug!(%rejected, "send ignored"),
        }
    }

    /// No-op while a rephrase is already running.
    pub fn request_rephrase(&mut self) {
        if self.session.begin_rephrase().is_err() {
            return;
        }

        let client = self.client.clone();
        self.rephrase_task = Some(tokio::spawn(async move { client.rephrase().await }));
    }

    /// Upload the document at `path`. An empty path counts as no file
    /// selected.
    pub fn start_upload(&mut self, path: &str) {
        let path = path.trim();
        let file = if path.is_empty() {
            None
        } else {
            match UploadFile::read(path) {
                Ok(file) => Some(file),
                Err(err) => {
                    self.session.note_unreadable_file(path, &err);
                    return;
                }
            }
        };

        match self.session.begin_upload(file) {
            Ok(request) => {
                let client = self.client.clone();
                let name = request.file.name.clone();
                let task = tokio::spawn(async move {
                    client.upload(&request.file, &request.language).await
                });
                self.upload_task = Some((name, task));
            }
            Err(rejected) => tracing::debug!(%rejected, "upload not started"),
        }
    }

    pub fn start_download(&mut self) {
        if self.download_task.is_some() {
            return;
        }
        let Some(link) = self.session.download_link().map(str::to_string) else {
            self.download_status = Some("No download available yet".to_string());
            return;
        };

        self.download_status = Some("Downloading...".to_string());
        let client = self.client.clone();
        let dir = self.download_dir.clone();
        self.download_task = Some(tokio::spawn(async move {
            client.save_download(&link, &dir).await
        }));
    }

    pub fn set_language(&mut self, value: &str) {
        let value = value.trim();
        if !value.is_empty() {
            self.session.set_language(value);
        }
    }

    pub fn cycle_language(&mut self) {
        let next = language::next_preset(self.session.language());
        self.session.set_language(next);
    }

    pub fn is_waiting_for_reply(&self) -> bool {
        self.session.in_flight().chat
    }

    /// Apply the outcome of every request that has finished since the last
    /// call.
    pub async fn poll_tasks(&mut self) {
        if self.chat_task.as_ref().is_some_and(JoinHandle::is_finished) {
            if let Some(task) = self.chat_task.take() {
                let outcome = settle(task).await;
                self.session.apply_chat_reply(outcome);
            }
        }

        if self.rephrase_task.as_ref().is_some_and(JoinHandle::is_finished) {
            if let Some(task) = self.rephrase_task.take() {
                let outcome = settle(task).await;
                self.session.apply_rephrase_reply(outcome);
            }
        }

        if self.upload_task.as_ref().is_some_and(|(_, task)| task.is_finished()) {
            if let Some((name, task)) = self.upload_task.take() {
                let outcome = settle(task).await;
                self.session.apply_upload_outcome(&name, outcome);
            }
        }

        if self.download_task.as_ref().is_some_and(JoinHandle::is_finished) {
            if let Some(task) = self.download_task.take() {
                self.download_status = Some(match settle(task).await {
                    Ok(path) => format!("Saved to {}", path.display()),
                    Err(err) => {
                        tracing::error!(error = %err, "download failed");
                        format!("Download failed: {}", err)
                    }
                });
            }
        }

        self.sync_scroll();
    }

    /// Abort everything still outstanding. Used on quit.
    pub fn abort_tasks(&mut self) {
        if let Some(task) = self.chat_task.take() {
            task.abort();
        }
        if let Some(task) = self.rephrase_task.take() {
            task.abort();
        }
        if let Some((_, task)) = self.upload_task.take() {
            task.abort();
        }
        if let Some(task) = self.download_task.take() {
            task.abort();
        }
    }

    /// Tick animation frame and ease the view toward its scroll target.
    pub fn tick(&mut self) {
        if self.session.in_flight().any() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }

        self.sync_scroll();
        if self.scroll < self.scroll_target {
            self.scroll = self.scroll.saturating_add(SCROLL_STEP).min(self.scroll_target);
        } else if self.scroll > self.scroll_target {
            self.scroll = self.scroll.saturating_sub(SCROLL_STEP).max(self.scroll_target);
        }
    }

    // Manual scrolling stops following new entries until `scroll_to_latest`
    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_latest = false;
        self.scroll = self.scroll.saturating_sub(lines);
        self.scroll_target = self.scroll;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.follow_latest = false;
        self.scroll = self.scroll.saturating_add(lines).min(self.max_scroll());
        self.scroll_target = self.scroll;
    }

    pub fn scroll_to_top(&mut self) {
        self.follow_latest = false;
        self.scroll = 0;
        self.scroll_target = 0;
    }

    pub fn scroll_to_latest(&mut self) {
        self.follow_latest = true;
        self.scroll_target = self.max_scroll();
    }

    fn sync_scroll(&mut self) {
        if self.session.revision() != self.seen_revision {
            self.seen_revision = self.session.revision();
            self.follow_latest = true;
        }
        if self.follow_latest {
            self.scroll_target = self.max_scroll();
        }
    }

    fn max_scroll(&self) -> u16 {
        let visible = if self.view_height > 0 { self.view_height } else { 20 };
        self.transcript_lines().saturating_sub(visible)
    }

    /// Rendered height of the transcript: the view's own paragraph, wrapped
    /// at the pane's inner width.
    pub fn transcript_lines(&self) -> u16 {
        let wrap_width = if self.view_width > 0 { self.view_width } else { 50 };

        let lines = Paragraph::new(ui::transcript_text(self))
            .wrap(ui::TRANSCRIPT_WRAP)
            .line_count(wrap_width);

        u16::try_from(lines).unwrap_or(u16::MAX)
    }
}

async fn settle<T>(task: Task<T>) -> Result<T, ApiError> {
    task.await
        .unwrap_or_else(|err| Err(ApiError::Task(err.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use formassist_core::Message;

    fn app() -> App {
        // Nothing listens on the discard port; requests fail fast.
        App::new(
            AssistantClient::new("http://127.0.0.1:9"),
            "english",
            PathBuf::from("."),
        )
    }

    #[tokio::test]
    async fn send_appends_user_entry_immediately() {
        let mut app = app();
        app.session.draft = "hello".to_string();
        app.input_cursor = 5;

        app.send_message();

        assert_eq!(app.session.transcript(), &[Message::user("hello")]);
        assert!(app.session.draft.is_empty());
        assert_eq!(app.input_cursor, 0);
        assert!(app.is_waiting_for_reply());
        app.abort_tasks();
    }

    async fn settle_all(app: &mut App) {
        for _ in 0..500 {
            app.poll_tasks().await;
            if !app.session.in_flight().any() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("requests did not settle");
    }

    #[tokio::test]
    async fn failed_chat_settles_without_transcript_entry() {
        let mut app = app();
        app.session.draft = "hello".to_string();
        app.send_message();

        settle_all(&mut app).await;

        assert_eq!(app.session.transcript().len(), 1);
        assert!(app.session.notice().is_some());
    }

    #[tokio::test]
    async fn rephrase_is_inert_while_running() {
        let mut app = app();
        app.request_rephrase();
        app.request_rephrase();

        let pending = app
            .session
            .transcript()
            .iter()
            .filter(|m| m.is_pending())
            .count();
        assert_eq!(pending, 1);
        app.abort_tasks();
    }

    #[tokio::test]
    async fn cancelled_rephrase_still_clears_flag() {
        let mut app = app();
        app.session.begin_rephrase().unwrap();
        let task: Task<RephraseReply> = tokio::spawn(std::future::pending());
        task.abort();
        app.rephrase_task = Some(task);

        settle_all(&mut app).await;

        assert!(app.session.transcript().is_empty());
        assert!(app
            .session
            .notice()
            .unwrap()
            .contains("request task ended unexpectedly"));
    }

    #[tokio::test]
    async fn empty_upload_path_means_no_file() {
        let mut app = app();
        app.start_upload("  ");
        assert_eq!(
            app.session.upload_status(),
            formassist_core::state::NO_FILE_SELECTED
        );
        assert!(!app.session.in_flight().upload);
    }

    #[tokio::test]
    async fn unreadable_upload_path_is_reported() {
        let mut app = app();
        app.start_upload("/definitely/not/here.pdf");
        assert!(app.session.upload_status().contains("/definitely/not/here.pdf"));
        assert!(!app.session.in_flight().upload);
    }

    #[test]
    fn download_without_link_explains_why() {
        let mut app = app();
        app.start_download();
        assert_eq!(
            app.download_status.as_deref(),
            Some("No download available yet")
        );
    }

    #[test]
    fn language_cycles_through_presets() {
        let mut app = app();
        app.cycle_language();
        assert_eq!(app.session.language(), "french");
        app.cycle_language();
        assert_eq!(app.session.language(), "english");

        app.set_language("  ");
        assert_eq!(app.session.language(), "english");
        app.set_language(" german ");
        assert_eq!(app.session.language(), "german");
    }

    #[tokio::test]
    async fn view_eases_toward_newest_entry() {
        let mut app = app();
        app.view_height = 4;
        app.view_width = 40;
        for i in 0..6 {
            app.session.draft = format!("message {i}");
            app.send_message();
            app.abort_tasks();
            app.session.apply_chat_reply(Ok(ChatReply {
                reply: format!("reply {i}"),
                download_link: None,
            }));
        }

        app.tick();
        let first_step = app.scroll;
        assert!(first_step > 0);
        assert!(first_step < app.scroll_target);

        for _ in 0..20 {
            app.tick();
        }
        assert_eq!(app.scroll, app.scroll_target);
        assert_eq!(app.scroll, app.transcript_lines() - 4);

        app.scroll_up(2);
        assert!(!app.follow_latest);
        app.tick();
        assert_eq!(app.scroll, app.scroll_target);
    }

    #[test]
    fn scrolling_saturates_at_the_limit() {
        let mut app = app();
        app.follow_latest = false;
        app.scroll = u16::MAX - 1;
        app.scroll_target = u16::MAX;

        app.tick();
        assert_eq!(app.scroll, u16::MAX);

        app.scroll_down(u16::MAX);
        assert_eq!(app.scroll, 0);
    }
}
