use bommel::args::{Args, Command};
use bommel::{api, commands, Config, Mode, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().bommel_home().path();

    // This allows for running the program without touching the ledger file. When
    // BOMMEL_IN_TEST_MODE is set and non-zero in length, then the mode will be Mode::Test,
    // otherwise it will be Mode::Local.
    let mode = Mode::from_env();

    // Route to appropriate command handler
    let _: () = match args.command() {
        Command::Init(init_args) => commands::init(home, init_args.clone()).await?.print(),

        Command::Pull => {
            let config = Config::load(home).await?;
            let mut backend = api::backend(&config, mode).await?;
            commands::pull(config, backend.as_mut()).await?.print()
        }

        Command::Show(show_args) => {
            let config = Config::load(home).await?;
            let mut backend = api::backend(&config, mode).await?;
            commands::show(config, backend.as_mut(), show_args.clone())
                .await?
                .print()
        }

        Command::Add(add_args) => {
            let config = Config::load(home).await?;
            commands::add(config, add_args.clone()).await?.print()
        }

        Command::Rename(rename_args) => {
            let config = Config::load(home).await?;
            commands::rename(config, rename_args.clone()).await?.print()
        }

        Command::Delete(delete_args) => {
            let config = Config::load(home).await?;
            commands::delete(config, delete_args.clone()).await?.print()
        }

        Command::Move(move_args) => {
            let config = Config::load(home).await?;
            commands::move_node(config, move_args.clone()).await?.print()
        }

        Command::Status => commands::status(Config::load(home).await?).await?.print(),

        Command::Push => {
            let config = Config::load(home).await?;
            let mut backend = api::backend(&config, mode).await?;
            commands::push(config, backend.as_mut()).await?.print()
        }

        Command::Stats(stats_args) => {
            let config = Config::load(home).await?;
            let mut backend = api::backend(&config, mode).await?;
            commands::stats(config, backend.as_mut(), stats_args.clone())
                .await?
                .print()
        }

        Command::Book(book_args) => {
            let config = Config::load(home).await?;
            let mut backend = api::backend(&config, mode).await?;
            commands::book(config, backend.as_mut(), book_args.clone())
                .await?
                .print()
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
