use clap::Parser;
use colored::Colorize;
use log::LevelFilter;

use kontist::{run, ApiError, Cli};

// ============================================================================
// Main
// ============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // a missing .env is fine, the environment may already be set
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let level = if cli.global.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("\n{} {:#}\n", "Error:".red().bold(), e);

        let error_msg = format!("{:#}", e);

        if let Some(ApiError::Authentication { .. }) = e.downcast_ref::<ApiError>() {
            eprintln!("{}", "💡 Check your credentials:".yellow());
            eprintln!("   - KONTIST_USER and KONTIST_PASSWORD (or --user / --password)");
            eprintln!("   - A .env file in the current directory is read too");
        } else if error_msg.contains("dns error") || error_msg.contains("failed to lookup") {
            eprintln!("{}", "💡 Possible causes:".yellow());
            eprintln!("   - Check --base-url / KONTIST_BASE_URL");
            eprintln!("   - Check your network connection");
        } else if error_msg.contains("timed out") {
            eprintln!("{}", "💡 Suggestion:".yellow());
            eprintln!("   - Increase timeout with --timeout <seconds>");
        }
        std::process::exit(1);
    }
}
