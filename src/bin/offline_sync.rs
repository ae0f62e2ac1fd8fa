use anyhow::{Context, Result, bail};
use offline_sync::{ActionId, AppConfig, AppState, MutationQueue, init_logging};
use serde::Serialize;
use std::env;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Stats,
    List,
    Failed,
    Sync,
    Requeue,
    Discard(i64),
}

#[derive(Debug, Clone)]
struct CliOptions {
    database_url: Option<String>,
    pretty: bool,
    command: Command,
}

fn usage() -> &'static str {
    "Usage: offline_sync [--database-url <url>] [--pretty] <stats|list|failed|sync|requeue|discard <id>>"
}

fn main() -> Result<()> {
    let options = parse_args(env::args().skip(1))?;
    init_logging();

    let mut config = AppConfig::from_env();
    if let Some(url) = &options.database_url {
        config.database.url = url.clone();
    }

    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    runtime.block_on(run(config, options))
}

async fn run(config: AppConfig, options: CliOptions) -> Result<()> {
    let database_url = config.database.url.clone();
    let state = AppState::new(config)
        .await
        .with_context(|| format!("Failed to open offline store at {database_url}"))?;

    let outcome = execute(&state, &options).await;
    state.shutdown().await;
    outcome
}

async fn execute(state: &AppState, options: &CliOptions) -> Result<()> {
    match &options.command {
        Command::Stats => emit(&state.queue.stats().await?, options.pretty),
        Command::List => emit(&state.queue.list_all().await?, options.pretty),
        Command::Failed => emit(&state.queue.list_failed().await?, options.pretty),
        Command::Sync => {
            let result = state.sync_coordinator.run_sync().await?;
            emit(&result, options.pretty)
        }
        Command::Requeue => {
            let requeued = state.queue.requeue_failed().await?;
            emit(&serde_json::json!({ "requeued": requeued }), options.pretty)
        }
        Command::Discard(id) => {
            let id = ActionId::new(*id).map_err(anyhow::Error::msg)?;
            let action = state
                .queue
                .discard(id)
                .await
                .with_context(|| format!("Failed to discard action {id}"))?;
            emit(&action, options.pretty)
        }
    }
}

fn emit<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let payload = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{payload}");
    Ok(())
}

fn parse_args<I>(args: I) -> Result<CliOptions>
where
    I: IntoIterator<Item = String>,
{
    let mut database_url: Option<String> = None;
    let mut pretty = false;
    let mut command: Option<Command> = None;

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--database-url" => {
                let value = iter.next().ok_or_else(|| {
                    anyhow::anyhow!("--database-url requires a value\n{}", usage())
                })?;
                database_url = Some(value);
            }
            "--pretty" => {
                pretty = true;
            }
            "-h" | "--help" => {
                println!("{}", usage());
                std::process::exit(0);
            }
            other if command.is_none() => {
                command = Some(parse_command(other, &mut iter)?);
            }
            other => {
                bail!("Unexpected argument: {other}\n{}", usage());
            }
        }
    }

    let Some(command) = command else {
        bail!("Missing command\n{}", usage());
    };
    Ok(CliOptions {
        database_url,
        pretty,
        command,
    })
}

fn parse_command<I>(name: &str, rest: &mut I) -> Result<Command>
where
    I: Iterator<Item = String>,
{
    match name {
        "stats" => Ok(Command::Stats),
        "list" => Ok(Command::List),
        "failed" => Ok(Command::Failed),
        "sync" => Ok(Command::Sync),
        "requeue" => Ok(Command::Requeue),
        "discard" => {
            let value = rest
                .next()
                .ok_or_else(|| anyhow::anyhow!("discard requires an action id\n{}", usage()))?;
            let id: i64 = value
                .parse()
                .with_context(|| format!("Invalid action id '{value}'"))?;
            Ok(Command::Discard(id))
        }
        other => bail!("Unknown command: {other}\n{}", usage()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn parses_options_around_command() {
        let options =
            parse_args(args(&["--pretty", "discard", "12", "--database-url", "sqlite::memory:"]))
                .unwrap();
        assert_eq!(options.command, Command::Discard(12));
        assert!(options.pretty);
        assert_eq!(options.database_url.as_deref(), Some("sqlite::memory:"));
    }

    #[test]
    fn rejects_missing_or_unknown_commands() {
        assert!(parse_args(args(&[])).is_err());
        assert!(parse_args(args(&["purge"])).is_err());
        assert!(parse_args(args(&["discard", "abc"])).is_err());
        assert!(parse_args(args(&["stats", "list"])).is_err());
    }
}
