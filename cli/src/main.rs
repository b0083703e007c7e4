use clap::Parser;
use fabflow_cli::commands::{cli, list, report, run};
use fabflow_core::error::{self, CliError};
use fabflow_core::executor::FlowController;
use fabflow_core::graph::TaskManager;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static LOG_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            match &e {
                CliError::Flow(fe) => eprintln!("{}", run::explain(fe)),
                other => eprintln!("{other}"),
            }
            exit_code_for_error(&e)
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, CliError> {
    let args = cli::Args::parse();
    let cfg = fabflow_core::config::load(args.config.as_deref())
        .map_err(|e| CliError::Config(format!("{e:#}")))?;
    init_tracing(&cfg.logging).map_err(CliError::Command)?;

    match args.command {
        cli::Commands::Run => run::run_flow(&cfg, run::RunTarget::All, !args.no_progress).await,
        cli::Commands::Task(t) => {
            run::run_flow(&cfg, run::RunTarget::Task(t.name), !args.no_progress).await
        }
        cli::Commands::List => {
            let handle = tokio::runtime::Handle::current();
            let controller = fabflow_plugins::factory::build_controller(&cfg, handle)
                .map_err(|e| CliError::Config(format!("{e:#}")))?;
            let text = controller.inspect(list::render_task_list);
            print!("{text}");
            Ok(0)
        }
        cli::Commands::Report(r) => {
            let controller = report_controller(&cfg)?;
            let text = report::render_report(&controller, &r.stage, r.report_id.as_deref())?;
            print!("{text}");
            Ok(0)
        }
    }
}

/// Reports only read logs; no stage is bound.
fn report_controller(cfg: &fabflow_core::config::FlowConfig) -> Result<FlowController, CliError> {
    let manager = TaskManager::fpga_pipeline();
    let work_dir = std::path::Path::new(&cfg.project.directory).join(&cfg.project.name);
    let reports = fabflow_plugins::reports::build_report_registry(&manager, &work_dir);
    Ok(FlowController::new(manager).with_reports(reports))
}

fn exit_code_for_error(e: &error::CliError) -> i32 {
    // 0: success
    // 11: config error
    // 20: tool / IO error
    // 30: run failed
    // 50: internal/uncategorized
    match e {
        CliError::Config(_) => 11,
        CliError::Flow(_) => 11,
        CliError::Tool(_) => 20,
        CliError::Io(_) => 20,
        CliError::Command(_) => 20,
        CliError::RunFailed(_) => 30,
        CliError::Anyhow(_) => 50,
    }
}

fn init_tracing(logging: &fabflow_core::config::LoggingConfig) -> Result<(), String> {
    if !logging.enabled {
        return Ok(());
    }

    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(logging.level.clone()).map_err(|e| e.to_string())?,
    };

    let mut maybe_writer = None;

    if logging.file {
        let dir = match logging
            .directory
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(d) => std::path::PathBuf::from(d),
            None => std::env::temp_dir().join("fabflow"),
        };

        std::fs::create_dir_all(&dir).map_err(|e| format!("create log dir failed: {e}"))?;
        let file_name = format!("fabflow.{}.log", std::process::id());
        let appender = tracing_appender::rolling::never(dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        maybe_writer = Some(non_blocking);
    }

    if !logging.console && maybe_writer.is_none() {
        return Err("logging disabled for both console and file".to_string());
    }

    let console_layer = logging.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
    });

    let file_layer = maybe_writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}
