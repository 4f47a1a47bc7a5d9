use std::process::ExitCode;

use macro_var::cli::Command;
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> ExitCode {
    let cli = macro_var::app::parse_cli();

    // The TUI owns the terminal; log lines would tear the screen.
    let level = match (&cli.command, cli.verbose) {
        (Command::Tui(_), _) => "off",
        (_, 0) => "warn",
        (_, 1) => "info",
        _ => "debug",
    };
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match macro_var::app::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
