use anyhow::Context;
use birthday_mailer::utils::{logger, validation::Validate};
use birthday_mailer::{run_birthdays, AppConfig, CliArgs};
use clap::Parser;
use std::time::Instant;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    dotenvy::dotenv().ok();

    // Logger before config so load errors are traced too
    if args.log_json {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    let start = Instant::now();
    tracing::info!("🎂 Birthday mailer started");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    let config = match AppConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // A dry run does not need the [smtp] section
    let validation = if args.dry_run {
        config.validate_for_dry_run()
    } else {
        config.validate()
    };
    if let Err(e) = validation {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    let today = config.run_date(args.date);
    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - no emails will be sent");
    }

    let result = run_birthdays(&config, today, args.dry_run).await;
    tracing::info!(
        "Birthday mailer finished. Duration: {:.2} seconds",
        start.elapsed().as_secs_f64()
    );

    match result {
        Ok(summary) => {
            if args.json {
                let json = serde_json::to_string_pretty(&summary).context("serializing run summary")?;
                println!("{}", json);
            } else {
                println!(
                    "✅ Matched {}, sent {}, failed {}, skipped {}",
                    summary.matched, summary.sent, summary.failed_send, summary.skipped_invalid
                );
                for diagnostic in &summary.diagnostics {
                    println!("   {}", diagnostic);
                }
            }
            Ok(())
        }
        Err(e) => {
            // Category and severity decide the exit code
            tracing::error!(
                "❌ Birthday run failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    }
}
