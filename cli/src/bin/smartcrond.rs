use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use cli::DaemonArgs;
use common::logger::init_logger;
use executor::runner::JobExecutor;
use executor::types::ExecutorConfig;
use jobs::config::JobLoader;
use predictor::Predictor;
use predictor::heuristic::HeuristicPredictor;
use scheduler::decision::DecisionEngine;
use scheduler::engine::Scheduler;
use scheduler::types::SchedulerConfig;
use sink::sqlite::SqliteSink;
use telemetry::probe::SystemProbe;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = DaemonArgs::parse();
    args.relocate_for_unprivileged();

    init_logger("smartcrond");
    info!("initializing smartcron scheduler");

    let loader = JobLoader::new(&args.config_dir);
    loader.ensure_dir()?;

    let sink = Arc::new(SqliteSink::new(&args.db, Some(args.log_dir.clone())).await?);

    // Trained-model inference plugs in at the Predictor seam; the daemon
    // ships with the heuristic scorer.
    info!(model = %args.model.display(), "using heuristic success predictor");
    let predictor: Arc<dyn Predictor> = Arc::new(HeuristicPredictor::new());

    let cfg = SchedulerConfig {
        check_interval: Duration::from_secs(args.interval),
        ..Default::default()
    };

    let mut scheduler = Scheduler::new(
        cfg,
        loader,
        Box::new(SystemProbe::new()),
        DecisionEngine::new(Some(predictor)),
        JobExecutor::new(ExecutorConfig::default()),
        sink,
    );

    scheduler.run().await
}
