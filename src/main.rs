use clap::Parser;
use privacy_link_finder::domain::ports::ConfigProvider;
use privacy_link_finder::utils::error::{AuditError, ErrorSeverity};
use privacy_link_finder::utils::progress::{ProgressBarObserver, TracingObserver};
use privacy_link_finder::utils::{
    logger,
    validation::{self, Validate},
};
use privacy_link_finder::{
    AuditEngine, BatchOptions, BatchRunner, BatchSummary, CliConfig, CsvTable, HttpFetcher,
    LinkResolver, MatchMode, PrivacyTerms, TomlConfig,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const EXIT_NEEDS_RERUN: i32 = 4;
const EXIT_CANCELLED: i32 = 130;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let outcome = match cli.config.as_deref() {
        Some(path) => {
            // 載入 TOML 配置，命令列參數優先
            let mut config = match TomlConfig::from_file(path) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("❌ Failed to load config file '{}': {}", path, e);
                    eprintln!("💡 Make sure the file exists and is valid TOML format");
                    std::process::exit(1);
                }
            };
            config.apply_overrides(&cli);

            init_logger(config.json_logs(), config.verbose());
            tracing::info!("📁 Loaded configuration from {}", path);
            let progress = config.progress();
            run_audit(config, progress, &cli).await
        }
        None => {
            init_logger(cli.json_logs, cli.verbose);
            run_audit(cli.clone(), cli.progress, &cli).await
        }
    };

    let exit_code = match outcome {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(
                "❌ Audit failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            }
        }
    };

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

fn init_logger(json: bool, verbose: bool) {
    if json {
        logger::init_json_logger(verbose);
    } else {
        logger::init_cli_logger(verbose);
    }
}

async fn run_audit<C>(config: C, progress: bool, cli: &CliConfig) -> Result<i32, AuditError>
where
    C: ConfigProvider + Validate + std::fmt::Debug,
{
    tracing::info!("🚀 Starting privacy-link-finder");
    tracing::debug!("Config: {:?}", config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        return Ok(1);
    }

    let table = CsvTable::open(config.source_path())?;
    let terms = PrivacyTerms::new(config.privacy_terms());
    let mode = if config.collect_all() {
        MatchMode::CollectAll
    } else {
        MatchMode::FirstMatch
    };
    tracing::info!(
        "🔎 Looking for {:?} in {} ({:?})",
        terms.as_slice(),
        config.source_path(),
        mode
    );

    let options = BatchOptions::from_config(&config);
    let engine = AuditEngine::new(table, config);

    if cli.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No requests will be sent");
        perform_dry_run(&engine, options.skip_resolved).await?;
        return Ok(0);
    }

    let fetcher = HttpFetcher::new(engine.config().timeout_secs(), engine.config().user_agent())?;
    let resolver = LinkResolver::new(fetcher, terms).with_mode(mode);

    let prepared = engine.prepare().await?;
    let bar = progress.then(|| ProgressBarObserver::new(prepared.rows.len()));

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("🛑 Interrupt received, stopping after the rows in flight");
            flag.store(true, Ordering::SeqCst);
        }
    });

    let runner = BatchRunner::new(options, (TracingObserver, bar)).with_cancel_flag(cancel);
    let summary = engine.execute(&prepared, &resolver, &runner).await;
    if let Some(bar) = &runner.observer().1 {
        bar.finish();
    }

    if let Some(path) = &cli.summary_json {
        write_summary(path, &summary)?;
        tracing::info!("📁 Summary saved to: {}", path);
    }

    println!(
        "✅ {} rows processed: {} found, {} not found, {} failed, {} skipped",
        summary.processed, summary.found, summary.not_found, summary.failed, summary.skipped
    );

    if summary.cancelled {
        eprintln!("🛑 Cancelled; rows after the last processed one were left untouched");
        Ok(EXIT_CANCELLED)
    } else if summary.needs_rerun() {
        eprintln!(
            "⚠️ Results for rows {:?} were not saved; re-run with --skip-resolved",
            summary.rerun_rows
        );
        Ok(EXIT_NEEDS_RERUN)
    } else {
        Ok(0)
    }
}

async fn perform_dry_run<C: ConfigProvider>(
    engine: &AuditEngine<CsvTable, C>,
    skip_resolved: bool,
) -> Result<(), AuditError> {
    let plan = engine.plan(skip_resolved).await?;

    if let Some(column) = &plan.missing_result_column {
        println!("➕ Result column '{}' would be added to the header", column);
    }
    println!("📋 {} rows would be checked:", plan.rows.len());
    for row in &plan.rows {
        let url = row.normalized_url();
        match validation::validate_url("url", url.as_str()) {
            Ok(()) => println!("  row {}: {}", row.index, url),
            Err(e) => {
                println!("  row {}: {} (⚠️ {})", row.index, url, e);
                tracing::warn!(row = row.index, "URL looks malformed: {}", e);
            }
        }
    }

    Ok(())
}

fn write_summary(path: &str, summary: &BatchSummary) -> Result<(), AuditError> {
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json)?;
    Ok(())
}
