//! Standalone runner for the plugin suite.
//!
//! Demonstrates wiring the plugins without a host: configuration comes from
//! environment variables, notifications go to the log, and the bundled
//! cron runner drives the schedules.
//!
//! ```bash
//! DC_HOST=http://nas:12712 DC_SECRET_KEY=... \
//! cargo run -p mp-plugins --example standalone
//! ```

use std::env;
use std::sync::Arc;

use anyhow::Result;
use mp_plugins::{
    DockerCopilotConfig, DockerCopilotPlugin, LogNotifier, PluginRunner, SysMsgConfig,
    SysMsgPlugin,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let notifier = Arc::new(LogNotifier);
    let runner = PluginRunner::new().await?;

    if let (Ok(host), Ok(secret_key)) = (env::var("DC_HOST"), env::var("DC_SECRET_KEY")) {
        let config = DockerCopilotConfig {
            enabled: true,
            host,
            secret_key,
            update_cron: Some("0 0 8 * * *".into()),
            watched: split_env("DC_WATCHED"),
            auto_update_cron: None,
            auto_update: vec![],
            report_progress: true,
            prune_images: false,
            backup_cron: None,
            notify_backup: false,
            poll_interval_secs: 10,
            poll_max_attempts: 6,
            run_once: true,
        };
        let plugin = Arc::new(DockerCopilotPlugin::new(config, notifier.clone())?);
        runner.register_docker_copilot(plugin).await?;
    }

    if let (Ok(host), Ok(cookie)) = (env::var("ZSP_HOST"), env::var("ZSP_COOKIE")) {
        let config = SysMsgConfig {
            enabled: true,
            host,
            cookie,
            cron: Some("0 */30 * * * *".into()),
            fetch_count: 20,
            run_once: true,
        };
        let plugin = Arc::new(SysMsgPlugin::new(config, notifier.clone())?);
        runner.register_sys_msg(plugin).await?;
    }

    runner.start().await?;
    tracing::info!("running, press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;

    let mut runner = runner;
    runner.shutdown().await?;
    Ok(())
}

fn split_env(name: &str) -> Vec<String> {
    env::var(name)
        .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
        .unwrap_or_default()
}
