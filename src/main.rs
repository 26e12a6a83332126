use pokemon_battle_rl::{run, CliOptions, Command};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn usage() -> ! {
    eprintln!(
        "Usage: cargo run --release -- <train|eval|simulate|play> [--rosters rosters.json] [--config run.json] \
[--algorithm q|sarsa] [--episodes N] [--eval-episodes N] [--eval-every N] [--train-log log.jsonl] [--seed SEED] [--opponent first|random|greedy] \
[--agent TRAINER] [--foe TRAINER] [--checkpoint q.json] [--policy-a first|random|greedy] [--battles N] \
[--snapshot state.json]"
    );
    std::process::exit(1);
}

fn next_value(args: &mut impl Iterator<Item = String>, flag: &str, what: &str) -> anyhow::Result<String> {
    args.next()
        .ok_or_else(|| anyhow::anyhow!("{flag} requires {what}"))
}

fn parse_args() -> anyhow::Result<CliOptions> {
    let mut opts = CliOptions::default();
    let mut args = env::args().skip(1);

    opts.command = match args.next().as_deref() {
        Some("train") => Command::Train,
        Some("eval") => Command::Eval,
        Some("simulate") => Command::Simulate,
        Some("play") => Command::Play,
        Some("--help" | "-h") | None => usage(),
        Some(other) => anyhow::bail!("Unknown command {other} (use train, eval, simulate or play)"),
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--rosters" => {
                opts.rosters_path = PathBuf::from(next_value(&mut args, "--rosters", "a path")?);
            }
            "--config" => {
                opts.config_path = Some(PathBuf::from(next_value(&mut args, "--config", "a path")?));
            }
            "--algorithm" => {
                let val = next_value(&mut args, "--algorithm", "q or sarsa")?;
                opts.algorithm = val.parse().map_err(anyhow::Error::msg)?;
            }
            "--episodes" => {
                opts.episodes = Some(next_value(&mut args, "--episodes", "a number")?.parse()?);
            }
            "--eval-episodes" => {
                opts.eval_episodes =
                    Some(next_value(&mut args, "--eval-episodes", "a number")?.parse()?);
            }
            "--eval-every" => {
                opts.eval_every = Some(next_value(&mut args, "--eval-every", "a number")?.parse()?);
            }
            "--train-log" => {
                opts.train_log = Some(PathBuf::from(next_value(&mut args, "--train-log", "a path")?));
            }
            "--seed" => {
                opts.seed = Some(next_value(&mut args, "--seed", "a number")?.parse()?);
            }
            "--opponent" => {
                let val = next_value(&mut args, "--opponent", "first, random or greedy")?;
                opts.opponent = Some(val.parse().map_err(anyhow::Error::msg)?);
            }
            "--agent" => {
                opts.agent_trainer = Some(next_value(&mut args, "--agent", "a trainer name")?);
            }
            "--foe" => {
                opts.opponent_trainer = Some(next_value(&mut args, "--foe", "a trainer name")?);
            }
            "--checkpoint" => {
                opts.checkpoint_path =
                    Some(PathBuf::from(next_value(&mut args, "--checkpoint", "a path")?));
            }
            "--policy-a" => {
                let val = next_value(&mut args, "--policy-a", "first, random or greedy")?;
                opts.policy_a = val.parse().map_err(anyhow::Error::msg)?;
            }
            "--battles" => {
                opts.battles = next_value(&mut args, "--battles", "a number")?.parse()?;
            }
            "--snapshot" => {
                opts.snapshot_path =
                    Some(PathBuf::from(next_value(&mut args, "--snapshot", "a path")?));
            }
            "--help" | "-h" => usage(),
            other => return Err(anyhow::anyhow!("Unknown argument {other}")),
        }
    }

    Ok(opts)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let opts = parse_args()?;
    run(opts)
}
