use anyhow::Result;
use async_trait::async_trait;
use colored::Colorize;
use horizon_ai::{
    AiError, CancellationToken, OpenAIClient, Segmentation, TurnEmitter, TurnOutcome, TurnRunner,
    TurnStatus,
};
use horizon_models::{Message, Project};
use horizon_storage::{Storage, paths};
use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::{ChatArgs, Cli};
use crate::commands::project::new_project;
use crate::commands::utils::resolve_project;
use crate::config::CliConfig;
use crate::output::{OutputFormat, json::print_json};

pub async fn run(storage: &Storage, config: &CliConfig, cli: &Cli, args: &ChatArgs) -> Result<()> {
    let provider = config.provider_config(cli)?;
    let mut project = select_project(storage, args.project.as_deref())?;

    let client = Arc::new(OpenAIClient::new(provider)?);
    let runner = TurnRunner::new(client);
    let preview = paths::preview_path(&project.id)?;
    write_preview(&preview, &project.html_code).await;

    match &args.prompt {
        Some(prompt) => {
            let outcome = run_turn(storage, &runner, &mut project, prompt, cli.format, &preview).await?;
            if cli.format.is_json() {
                print_json(&outcome_json(&project, &outcome))?;
            }
            match outcome.status {
                TurnStatus::Failed(failure) => Err(AiError::Stream(failure).into()),
                TurnStatus::Completed(_) => Ok(()),
            }
        }
        None => repl(storage, &runner, &mut project, cli.format, &preview).await,
    }
}

/// Explicit id, else the most recently updated project, else a fresh one.
fn select_project(storage: &Storage, id: Option<&str>) -> Result<Project> {
    if let Some(id) = id {
        return resolve_project(storage, id);
    }
    match storage.projects.list()?.into_iter().next() {
        Some(project) => Ok(project),
        None => new_project(storage, None),
    }
}

async fn repl(
    storage: &Storage,
    runner: &TurnRunner,
    project: &mut Project,
    format: OutputFormat,
    preview: &Path,
) -> Result<()> {
    println!(
        "{} {} ({})",
        "Event Horizon".bold(),
        project.name,
        crate::commands::utils::short_id(&project.id)
    );
    println!("Preview: {}", preview.display());
    println!("{}", "Describe the page you want. Type /quit to exit.".dimmed());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", ">".cyan().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }
        if matches!(prompt, "/quit" | "/exit") {
            break;
        }

        // Each turn runs to completion before the next line is read, so the
        // runner never sees a concurrent submission from here.
        let outcome = run_turn(storage, runner, project, prompt, format, preview).await?;
        if format.is_json() {
            print_json(&outcome_json(project, &outcome))?;
        }
    }

    Ok(())
}

/// Stream one turn, then persist the user message, the assistant message and
/// the last code payload into the project.
async fn run_turn(
    storage: &Storage,
    runner: &TurnRunner,
    project: &mut Project,
    prompt: &str,
    format: OutputFormat,
    preview: &Path,
) -> Result<TurnOutcome> {
    let user_message = Message::user(prompt);
    let mut history = project.messages.clone();
    history.push(user_message.clone());
    tracing::info!(project_id = %project.id, chars = prompt.len(), "Submitting prompt");

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let mut emitter = TerminalEmitter::new(preview.to_path_buf(), format.is_json());
    let result = runner.run(&history, &mut emitter, cancel).await;
    watcher.abort();
    // A rejected turn leaves the project untouched.
    let outcome = result?;

    project.push_message(user_message);
    project.push_message(outcome.message.clone());
    if let Some(code) = &outcome.code_payload {
        project.set_html_code(code.clone());
    }
    storage.projects.save(project)?;

    Ok(outcome)
}

fn outcome_json(project: &Project, outcome: &TurnOutcome) -> serde_json::Value {
    let (status, finish_reason, error) = match &outcome.status {
        TurnStatus::Completed(reason) => ("completed", reason.as_ref().map(ToString::to_string), None),
        TurnStatus::Failed(failure) => ("failed", None, Some(failure.to_string())),
    };
    json!({
        "projectId": project.id,
        "status": status,
        "finishReason": finish_reason,
        "error": error,
        "text": outcome.text,
        "reasoning": outcome.reasoning_segments,
        "code": outcome.code_payload,
    })
}

/// Prints a turn as it streams and keeps the preview file current.
struct TerminalEmitter {
    preview: PathBuf,
    quiet: bool,
    shown_visible: String,
    shown_reasoning: String,
}

impl TerminalEmitter {
    fn new(preview: PathBuf, quiet: bool) -> Self {
        Self {
            preview,
            quiet,
            shown_visible: String::new(),
            shown_reasoning: String::new(),
        }
    }
}

#[async_trait]
impl TurnEmitter for TerminalEmitter {
    async fn on_fragment(&mut self, _fragment: &str, segmentation: &Segmentation) {
        if self.quiet {
            return;
        }

        let reasoning = reasoning_text(segmentation);
        let new_reasoning = unseen_suffix(&self.shown_reasoning, &reasoning);
        if !new_reasoning.is_empty() {
            print!("{}", new_reasoning.dimmed());
        }
        self.shown_reasoning = reasoning;

        let new_visible = unseen_suffix(&self.shown_visible, &segmentation.visible_text);
        if !new_visible.is_empty() {
            if self.shown_visible.is_empty() && !self.shown_reasoning.is_empty() {
                println!();
            }
            print!("{new_visible}");
        }
        self.shown_visible = segmentation.visible_text.clone();

        let _ = std::io::stdout().flush();
    }

    async fn on_code_payload(&mut self, code: &str) {
        write_preview(&self.preview, code).await;
    }

    async fn on_complete(&mut self, _message: &Message) {
        if !self.quiet {
            println!();
        }
    }

    async fn on_error(&mut self, reason: &str) {
        if !self.quiet {
            println!();
        }
        eprintln!("{} {}", "Turn failed:".red().bold(), reason);
    }
}

async fn write_preview(path: &Path, code: &str) {
    if let Some(parent) = path.parent()
        && let Err(err) = tokio::fs::create_dir_all(parent).await
    {
        tracing::warn!(path = %parent.display(), error = %err, "Failed to create preview directory");
        return;
    }
    if let Err(err) = tokio::fs::write(path, code).await {
        tracing::warn!(path = %path.display(), error = %err, "Failed to write preview");
    }
}

/// Closed reasoning segments followed by the still-open one, if any.
fn reasoning_text(segmentation: &Segmentation) -> String {
    segmentation
        .reasoning_segments
        .iter()
        .map(String::as_str)
        .chain(segmentation.pending_reasoning.as_deref())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Part of `current` not yet on screen. Output cannot be taken back, so when
/// `current` diverges from what was shown only the text past the shared
/// prefix is returned.
fn unseen_suffix<'a>(shown: &str, current: &'a str) -> &'a str {
    let common = shown
        .char_indices()
        .zip(current.chars())
        .take_while(|((_, a), b)| a == b)
        .last()
        .map(|((idx, ch), _)| idx + ch.len_utf8())
        .unwrap_or(0);
    &current[common..]
}
