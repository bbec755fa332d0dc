//! Terminal viewer for one session clock.
//!
//! With `BLIND_CLOCK_OPERATOR_TOKEN` set the viewer acts as an operator: it
//! advances the server when a level runs out and accepts a level index on
//! stdin to jump there.

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use blind_clock::{
    state::schedule::Level,
    viewer::{ClockView, ClockViewer, HttpClockApi, ViewerConfig},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let base_url =
        env::var("BLIND_CLOCK_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
    let session_id: Uuid = env::var("BLIND_CLOCK_SESSION")
        .context("BLIND_CLOCK_SESSION must name the session to follow")?
        .parse()
        .context("BLIND_CLOCK_SESSION is not a UUID")?;
    let operator_token = env::var("BLIND_CLOCK_OPERATOR_TOKEN")
        .ok()
        .filter(|token| !token.trim().is_empty());
    let privileged = operator_token.is_some();

    let api = HttpClockApi::new(&base_url, operator_token).context("building HTTP client")?;
    let viewer = ClockViewer::spawn(Arc::new(api), session_id, privileged, ViewerConfig::default())
        .await
        .with_context(|| format!("following session {session_id} at {base_url}"))?;
    info!(%session_id, %base_url, privileged, "following clock");

    let mut render = tokio::time::interval(Duration::from_secs(1));
    let mut commands = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = privileged;

    loop {
        tokio::select! {
            _ = render.tick() => println!("{}", render_line(&viewer.current())),
            line = commands.next_line(), if stdin_open => match line {
                Ok(Some(line)) => jump(&viewer, line.trim()).await,
                Ok(None) => stdin_open = false,
                Err(err) => {
                    warn!(error = %err, "reading stdin failed");
                    stdin_open = false;
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    viewer.shutdown().await;
    Ok(())
}

async fn jump(viewer: &ClockViewer, input: &str) {
    if input.is_empty() {
        return;
    }
    let Ok(target) = input.parse::<usize>() else {
        warn!(%input, "expected a level index");
        return;
    };
    match viewer.request_level(target).await {
        Ok(response) => info!(level_index = response.current_level_index, "level changed"),
        Err(err) => warn!(error = %err, target, "level change failed"),
    }
}

fn render_line(view: &ClockView) -> String {
    let level = view
        .displayed_level
        .as_ref()
        .map(describe_level)
        .unwrap_or_else(|| "no level".to_string());
    let sync = if view.synced { "" } else { " (unconfirmed)" };
    let payouts = if view.show_payouts { " | payouts" } else { "" };
    format!(
        "[{:?}] #{} {} {}{}{}",
        view.status,
        view.displayed_level_index,
        level,
        view.remaining_display(),
        sync,
        payouts
    )
}

fn describe_level(level: &Level) -> String {
    match (level.blinds(), level.break_label()) {
        (Some(blinds), _) if blinds.ante > 0 => format!(
            "{}/{} ante {}",
            blinds.small_blind, blinds.big_blind, blinds.ante
        ),
        (Some(blinds), _) => format!("{}/{}", blinds.small_blind, blinds.big_blind),
        (None, Some(label)) => format!("break {label}"),
        (None, None) => "break".to_string(),
    }
}

fn init_tracing() {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
