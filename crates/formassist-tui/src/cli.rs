use std::path::Path;
use anyhow::{Context, Result, anyhow};
use colored::*;
use formassist_core::{AssistantClient, Config, Conversation, MessageKind, Session, UploadFile};

/// Print every assistant entry added after `from`, then the download
/// reference if the session has one.
fn print_replies(session: &Session, client: &AssistantClient, from: usize) {
    for msg in session.transcript().iter().skip(from) {
        if msg.kind == MessageKind::Assistant {
            println!("{}", "Assistant:".bold().yellow());
            println!("{}", msg.text);
        }
    }

    if let Some(link) = session.download_link() {
        println!(
            "\n{} {}",
            "📥 Download Questions and Answers:".bold(),
            client.download_url(link).blue().underline()
        );
    }
}

fn failure(session: &Session, client: &AssistantClient) -> Result<()> {
    match session.notice() {
        Some(notice) => {
            println!("{}", notice.red());
            println!("Make sure the assistant server is running at {}", client.base_url().bold());
            Err(anyhow!("request failed"))
        }
        None => Ok(()),
    }
}

pub async fn ask(client: AssistantClient, language: &str, message: &str) -> Result<()> {
    let mut conversation = Conversation::new(client, language);
    conversation.submit_message(message).await?;

    print_replies(conversation.session(), conversation.client(), 1);
    failure(conversation.session(), conversation.client())
}

pub async fn rephrase(client: AssistantClient, language: &str) -> Result<()> {
    let mut conversation = Conversation::new(client, language);
    conversation.request_rephrase().await?;

    print_replies(conversation.session(), conversation.client(), 0);
    failure(conversation.session(), conversation.client())
}

pub async fn upload(client: AssistantClient, language: &str, path: &Path) -> Result<()> {
    let file = UploadFile::read(path)
        .with_context(|| format!("Could not read {}", path.display()))?;

    println!("📤 Uploading {} ({})...", file.name.cyan(), language.magenta());

    let mut conversation = Conversation::new(client, language);
    conversation.upload_document(Some(file)).await?;

    let session = conversation.session();
    println!("{}", session.upload_status());
    if session.transcript().is_empty() {
        return Err(anyhow!("upload failed"));
    }

    print_replies(session, conversation.client(), 1);
    Ok(())
}

pub async fn download(client: AssistantClient, link: &str, dir: &Path) -> Result<()> {
    println!("📥 Fetching {}", client.download_url(link).blue());

    let path = client.save_download(link, dir).await?;
    println!("{} {}", "Saved to".green(), path.display().to_string().bold());
    Ok(())
}

pub fn show_config(config: &Config, server: &str, language: &str) -> Result<()> {
    let path = Config::get_config_path()?;

    println!("\n{}", "⚙️  Form Assistant Configuration".bold().blue());
    println!("{}", "=".repeat(40).dimmed());
    println!("  Config file:  {}", path.display().to_string().dimmed());
    println!("  Server:       {}", server.green());
    println!("  Language:     {}", language.green());
    match config.request_timeout() {
        Some(timeout) => println!("  Timeout:      {}s", timeout.as_secs()),
        None => println!("  Timeout:      {}", "none".yellow()),
    }
    println!("  Downloads:    {}", config.download_dir().display());

    Ok(())
}
