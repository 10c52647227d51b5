use isp_probe::agent::AgentLoop;
use isp_probe::config::load_config;
use isp_probe::cycle::CycleScheduler;
use isp_probe::ingest::Reporter;
use isp_probe::report;

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("Cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                log::warn!("Cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    log::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() {
    // A missing .env file is fine, real environment variables always win.
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", report(&e));
            std::process::exit(1);
        }
    };

    log::info!("ISP probe agent starting");
    log::info!("Cloud: {}", config.cloud_base_url);
    log::info!("Site: {}  Probe: {}", config.site_slug, config.probe_name);
    log::info!("Interval: {}s", config.interval.as_secs());
    log::info!(
        "Targets: ping {:?}, dns {} @ {:?}, http {:?}",
        config.targets.ping,
        config.targets.dns_hostname,
        config.targets.dns_servers,
        config.targets.http
    );
    if config.targets.is_empty() {
        log::warn!("No targets configured, every cycle will ship an empty payload.");
    } else {
        log::info!("{} measurement(s) per cycle", config.targets.len());
    }
    if config.ingest_api_key.is_empty() {
        log::warn!("INGEST_API_KEY is empty. Set it in .env and match the server.");
    }

    let scheduler = match CycleScheduler::from_config(&config) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            log::error!("Failed to create HTTP probe client: {}", report(&e));
            std::process::exit(1);
        }
    };
    let reporter = match Reporter::new(&config) {
        Ok(reporter) => reporter,
        Err(e) => {
            log::error!("Failed to create ingest client: {}", report(&e));
            std::process::exit(1);
        }
    };

    AgentLoop::new(scheduler, reporter, config.interval)
        .run_until(shutdown_signal())
        .await;
}
