use std::io::IsTerminal;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use unit_converter::app::render::{format_result, spawn_renderer};
use unit_converter::app::{convert_once, repl::Session};
use unit_converter::config::theme::{
    detect_system_theme, FileThemeStore, MemoryThemeStore, ThemeController,
};
use unit_converter::utils::error::{ConverterError, ErrorSeverity};
use unit_converter::utils::{logger, validation::Validate};
use unit_converter::{CliConfig, ConversionEngine, ConverterConfig};

fn exit_code(severity: ErrorSeverity) -> i32 {
    match severity {
        ErrorSeverity::Low => 1,      // 輸入錯誤
        ErrorSeverity::Medium => 2,   // 計算錯誤
        ErrorSeverity::High => 3,     // 設定錯誤
        ErrorSeverity::Critical => 4, // 系統錯誤
    }
}

fn fail(e: &ConverterError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(exit_code(e.severity()));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::info!("Starting unit-converter");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 驗證配置
    if let Err(e) = cli.validate() {
        fail(&e);
    }
    let config = cli.resolve().unwrap_or_else(|e| fail(&e));

    let engine = ConversionEngine::new(config.engine_options());

    if let Some(value) = cli.value.as_deref() {
        run_one_shot(&engine, &cli, value).await?;
        return Ok(());
    }

    run_interactive(engine, &cli, &config).await
}

async fn run_one_shot(
    engine: &ConversionEngine,
    cli: &CliConfig,
    value: &str,
) -> anyhow::Result<()> {
    match convert_once(engine, value, cli.from.as_deref(), cli.to.as_deref()).await {
        Ok(result) => {
            let state = engine.snapshot().await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                let line = format_result(&state).unwrap_or_else(|| result.to_string());
                println!("{}", line);
            }
            Ok(())
        }
        Err(e) => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&engine.snapshot().await)?);
            }
            fail(&e)
        }
    }
}

async fn run_interactive(
    engine: ConversionEngine,
    cli: &CliConfig,
    config: &ConverterConfig,
) -> anyhow::Result<()> {
    let system = config.theme.system.unwrap_or_else(detect_system_theme);
    let theme = match ThemeController::load(
        Box::new(FileThemeStore::new(&config.theme.path)),
        system,
    )
    .await
    {
        Ok(theme) => theme,
        Err(e) => {
            tracing::warn!("Ignoring theme preference at {}: {}", config.theme.path, e);
            ThemeController::load(Box::new(MemoryThemeStore::default()), system).await?
        }
    };

    let color = !cli.json
        && std::io::stdout().is_terminal()
        && std::env::var_os("NO_COLOR").is_none();
    let theme_flag = Arc::new(AtomicBool::new(theme.is_dark()));
    let renderer = spawn_renderer(
        engine.subscribe(),
        engine.snapshot().await,
        Arc::clone(&theme_flag),
        color,
        std::io::stdout(),
    );

    if std::io::stdin().is_terminal() {
        println!(
            "Unit converter ({}). Type `help` for commands.",
            engine.category().await.display_name()
        );
    }

    let mut session = Session::new(
        engine,
        theme,
        theme_flag,
        system,
        cli.json,
        std::io::stdout(),
    );
    let input = tokio::io::BufReader::new(tokio::io::stdin());
    let outcome = session.run(input).await;
    drop(session);

    // 引擎釋放後 renderer 會自行結束
    if tokio::time::timeout(Duration::from_secs(1), renderer).await.is_err() {
        tracing::debug!("Renderer did not stop in time");
    }

    if let Err(e) = outcome {
        fail(&e);
    }
    tracing::info!("✅ Session finished");
    Ok(())
}
