//! Dubflow - Subtitle Synthesis and Dubbing Pipeline
//!
//! CLI entry point: loads configuration, builds the pipeline with the
//! configured providers, submits a task and follows its progress.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use dubflow::cli::{Args, Commands};
use dubflow::config::Config;
use dubflow::error::DubflowError;
use dubflow::pipeline::{EmbedType, Pipeline, TaskRequest};
use dubflow::task::{TaskRegistry, TaskStatus};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let _ = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .try_init();

    let config = load_config(&args)?;

    match args.command {
        Commands::InitConfig { path } => {
            Config::default().save_to_file(&path)?;
            println!("Wrote default configuration to {}", path.display());
            Ok(())
        }
        Commands::Process {
            source,
            origin_lang,
            target_lang,
            ui_lang,
            bilingual,
            translation_top,
            modal_filter,
            tts,
            voice,
            voice_clone_file,
            replace,
            embed,
            vertical_major_title,
            vertical_minor_title,
            max_words,
        } => {
            let registry = Arc::new(TaskRegistry::new());
            let pipeline = Arc::new(Pipeline::new(config, registry.clone()));

            let request = TaskRequest {
                source,
                origin_language: origin_lang,
                target_language: target_lang,
                ui_language: ui_lang,
                bilingual,
                translation_on_top: translation_top,
                modal_filter,
                tts,
                voice,
                voice_clone_file,
                replace,
                embed: parse_embed_type(&embed)?,
                vertical_major_title,
                vertical_minor_title,
                max_word_one_line: max_words,
            };

            let task_id = pipeline.start_task(request)?;
            info!(task_id = %task_id, "task submitted");
            follow_task(&registry, &task_id).await
        }
    }
}

fn load_config(args: &Args) -> Result<Config> {
    match &args.config {
        Some(path) => Ok(Config::from_file(path)?),
        None => {
            if std::path::Path::new("config.toml").exists() {
                info!("loading config.toml from the current directory");
                Ok(Config::from_file("config.toml")?)
            } else {
                Ok(Config::default())
            }
        }
    }
}

fn parse_embed_type(value: &str) -> Result<EmbedType> {
    match value.to_lowercase().as_str() {
        "none" => Ok(EmbedType::None),
        "horizontal" => Ok(EmbedType::Horizontal),
        "vertical" => Ok(EmbedType::Vertical),
        "all" => Ok(EmbedType::All),
        other => Err(DubflowError::InvalidInput(format!(
            "invalid embed type '{}', expected none, horizontal, vertical or all",
            other
        ))
        .into()),
    }
}

/// Poll the registry until the task reaches a terminal state, echoing
/// progress along the way.
async fn follow_task(registry: &TaskRegistry, task_id: &str) -> Result<()> {
    let mut last_progress = 0u8;
    loop {
        let Some(task) = registry.get(task_id) else {
            anyhow::bail!("task {} disappeared from the registry", task_id);
        };

        if task.progress > last_progress {
            info!(progress = task.progress, "processing");
            last_progress = task.progress;
        }

        match task.status {
            TaskStatus::Processing => tokio::time::sleep(Duration::from_millis(500)).await,
            TaskStatus::Success => {
                println!("Task {} finished.", task_id);
                for subtitle in &task.subtitles {
                    println!("  {} -> {}", subtitle.name, subtitle.path.display());
                }
                if let Some(speech) = &task.speech_path {
                    println!("  Dubbed audio -> {}", speech.display());
                }
                return Ok(());
            }
            TaskStatus::Failed => {
                let reason = task.fail_reason.unwrap_or_else(|| "unknown".to_string());
                anyhow::bail!("task {} failed: {}", task_id, reason);
            }
        }
    }
}
