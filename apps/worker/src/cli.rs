use std::time::Duration;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use cmetrack_core::goals::GoalServiceTrait;

use crate::config::Config;
use crate::main_lib::build_state;
use crate::scheduler;

#[derive(Parser, Debug)]
#[command(
    name = "cmetrack-worker",
    about = "Assign continuing-education goals and recompute compliance",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile goal instances with the current profiles
    Rematch(UserArgs),
    /// Recompute goal instances and the aggregate compliance
    Recompute(UserArgs),
    /// Rematch and recompute every user on a fixed interval (default command)
    Run(RunArgs),
}

#[derive(Args, Debug, Default)]
struct UserArgs {
    /// Process a single user instead of the whole population
    #[arg(long)]
    user: Option<String>,
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Override CMETRACK_INTERVAL_SECS
    #[arg(long)]
    interval_secs: Option<u64>,
    /// Run a single pass and exit
    #[arg(long)]
    once: bool,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Run(RunArgs::default()));
    let state = build_state(&config).await?;

    match command {
        Command::Rematch(UserArgs { user: Some(user) }) => {
            let outcome = state.goal_service.rematch_goals(&user, Utc::now()).await?;
            print_json(&outcome)
        }
        Command::Rematch(UserArgs { user: None }) => {
            let summary = state.batch_runner.rematch_all(Utc::now()).await?;
            print_json(&summary)
        }
        Command::Recompute(UserArgs { user: Some(user) }) => {
            let summary = state
                .goal_service
                .recompute_user_goals(&user, Utc::now())
                .await?;
            print_json(&summary)
        }
        Command::Recompute(UserArgs { user: None }) => {
            let summary = state.batch_runner.recompute_all(Utc::now()).await?;
            print_json(&summary)
        }
        Command::Run(args) => {
            if args.once {
                scheduler::run_pass(&state).await;
                return Ok(());
            }
            let interval = args
                .interval_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(config.interval);
            scheduler::run_scheduler(state, interval).await;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["cmetrack-worker", "recompute", "--user", "u1"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Recompute(UserArgs { user: Some(ref u) })) if u == "u1"
        ));

        let cli = Cli::try_parse_from(["cmetrack-worker", "run", "--interval-secs", "30", "--once"])
            .unwrap();
        match cli.command {
            Some(Command::Run(args)) => {
                assert_eq!(args.interval_secs, Some(30));
                assert!(args.once);
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = Cli::try_parse_from(["cmetrack-worker"]).unwrap();
        assert!(cli.command.is_none());
    }
}
