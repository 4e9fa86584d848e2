use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Context};
use colored::Colorize;
use pq_store::{open_storage, Query, QueryDocument, QuerySourceText, StorageConfig};
use pq_types::encode_query_id;
use serde_json::json;
use tokio::io::AsyncReadExt;

use crate::cli::*;

/// How a command finished. A lookup miss is not a failure, but scripts
/// need to tell it apart from a hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Missing,
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Done => ExitCode::SUCCESS,
            Outcome::Missing => ExitCode::from(2),
        }
    }
}

pub async fn run_command(cli: Cli) -> anyhow::Result<Outcome> {
    let Cli { command, format, config, bucket, .. } = cli;
    match command {
        Command::Key(args) => cmd_key(args, &format),
        Command::Get(args) => {
            let config = resolve_config(config.as_deref(), bucket)?;
            cmd_get(args, &config, &format).await
        }
        Command::Put(args) => {
            let config = resolve_config(config.as_deref(), bucket)?;
            cmd_put(args, &config, &format).await
        }
        Command::Check(_) => {
            let config = resolve_config(config.as_deref(), bucket)?;
            cmd_check(&config, &format).await
        }
    }
}

/// Load the config file (or defaults) and apply command-line overrides.
pub fn resolve_config(path: Option<&Path>, bucket: Option<String>) -> anyhow::Result<StorageConfig> {
    let mut config = match path {
        Some(path) => StorageConfig::load(path)?,
        None => StorageConfig::default(),
    };
    if let Some(bucket) = bucket {
        config.bucket = bucket;
    }
    config.validate()?;
    tracing::debug!(bucket = %config.bucket, backend = config.backend.name(), "resolved storage config");
    Ok(config)
}

fn cmd_key(args: KeyArgs, format: &OutputFormat) -> anyhow::Result<Outcome> {
    match format {
        OutputFormat::Text => {
            for id in &args.ids {
                println!("{} {} {}", id, "→".dimmed(), encode_query_id(id).as_str().cyan());
            }
        }
        OutputFormat::Json => {
            let keys: Vec<_> = args
                .ids
                .iter()
                .map(|id| json!({ "id": id, "key": encode_query_id(id) }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&keys)?);
        }
    }
    Ok(Outcome::Done)
}

async fn cmd_get(args: GetArgs, config: &StorageConfig, format: &OutputFormat) -> anyhow::Result<Outcome> {
    let storage = open_storage(config).await?;
    let reader = storage.read_only();
    let key = encode_query_id(&args.id);

    let Some(document) = reader.read_query(&args.id).await? else {
        match format {
            OutputFormat::Text => println!("{} {} ({})", "not found:".yellow(), args.id, key.as_str().dimmed()),
            OutputFormat::Json => println!("{}", json!({ "id": args.id, "key": key, "found": false })),
        }
        return Ok(Outcome::Missing);
    };

    match format {
        OutputFormat::Text => println!("{document}"),
        OutputFormat::Json => {
            let value = json!({
                "id": args.id,
                "key": key,
                "found": true,
                "operations": document.operation_names(),
                "fragments": document.fragment_count(),
                "source": document.source(),
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(Outcome::Done)
}

async fn cmd_put(args: PutArgs, config: &StorageConfig, format: &OutputFormat) -> anyhow::Result<Outcome> {
    if !config.mode.allows_writes() {
        bail!("storage is configured read-only; set mode = \"read-write\" to register queries");
    }
    let text = read_input(&args.file).await?;

    let query: Box<dyn Query> = if args.no_validate {
        Box::new(QuerySourceText(text))
    } else {
        let document = QueryDocument::parse_str(&text)
            .with_context(|| format!("{} is not a valid GraphQL query", args.file.display()))?;
        Box::new(document)
    };

    let storage = open_storage(config).await?;
    let Some(writer) = storage.writer_for(config.mode) else {
        bail!("storage does not permit writes");
    };
    writer.write_query(&args.id, &*query).await?;

    let key = encode_query_id(&args.id);
    match format {
        OutputFormat::Text => println!(
            "{} Registered {} {} {}",
            "✓".green().bold(),
            args.id.bold(),
            "→".dimmed(),
            key.as_str().cyan()
        ),
        OutputFormat::Json => println!("{}", json!({ "id": args.id, "key": key, "stored": true })),
    }
    Ok(Outcome::Done)
}

async fn cmd_check(config: &StorageConfig, format: &OutputFormat) -> anyhow::Result<Outcome> {
    open_storage(config).await?;
    match format {
        OutputFormat::Text => println!(
            "{} Bucket {} reachable ({} backend, {:?})",
            "✓".green().bold(),
            config.bucket.bold(),
            config.backend.name(),
            config.mode
        ),
        OutputFormat::Json => println!(
            "{}",
            json!({ "bucket": config.bucket, "backend": config.backend.name(), "ok": true })
        ),
    }
    Ok(Outcome::Done)
}

async fn read_input(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("cannot read query from stdin")?;
        return Ok(text);
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))
}
