use clap::Parser;
use imagestudio::cli::{self, CliArgs};
use imagestudio::config::Config;
use imagestudio::logger::{self, LogLevel, LoggerConfig};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env before anything reads the environment
    let dotenv_loaded = dotenv::dotenv().is_ok();

    let args = CliArgs::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let logger_config = if args.verbose {
        LoggerConfig::development()
    } else {
        LoggerConfig::default().with_level(LogLevel::Warn)
    }
    .with_json_output(config.log_json);
    if let Err(e) = logger::init_with_config(logger_config) {
        eprintln!("{}", e);
    }

    logger::log_startup_info("imagestudio", env!("CARGO_PKG_VERSION"));
    if dotenv_loaded {
        log::info!("✅ .env file loaded");
    } else {
        log::debug!("No .env file found, using system environment variables");
    }

    cli::run(args, config).await
}
