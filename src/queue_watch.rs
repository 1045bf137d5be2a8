//! Renders one instructor's queue live in the terminal.
//!
//! Usage: `queue-watch [INSTRUCTOR_ID]`. Without an argument the configured
//! user is watched, which suits instructors watching their own queue.

use color_eyre::eyre::{Result, WrapErr};
use dotenv::dotenv;
use officehours_client::{
    api::HttpQueueApi,
    channel::RealtimeChannel,
    config::ClientConfig,
    notify::TracingNotifier,
    transport::WsConnectionProvider,
    view::{QueueView, ViewStatus},
};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

fn render(view: &QueueView) {
    let stats = view.stats();
    println!();
    match view.status() {
        ViewStatus::Idle | ViewStatus::Loading => println!("Loading queue for {}...", view.instructor_id()),
        ViewStatus::Error(message) => println!("Could not load queue: {}", message),
        ViewStatus::Ready => {}
    }
    println!(
        "Queue {}: {} waiting, {} admitted, average wait {}",
        view.instructor_id(),
        stats.waiting,
        stats.admitted,
        stats
            .average_wait_time
            .map(|m| format!("{:.1} min", m))
            .unwrap_or_else(|| "n/a".to_string())
    );

    for row in view.rows() {
        let position = row
            .position
            .map(|p| format!("#{}", p))
            .unwrap_or_else(|| "--".to_string());
        let controls: Vec<&str> = row
            .controls
            .iter()
            .filter(|c| c.enabled)
            .map(|c| c.action.as_str())
            .collect();
        println!(
            "{:>4}  {:<9} {:<8} {}  joined {}  {}{}",
            position,
            row.status.as_str(),
            row.presence.as_str(),
            row.student_id,
            row.joined_at.format("%H:%M"),
            row.question.as_deref().unwrap_or(""),
            if controls.is_empty() {
                String::new()
            } else {
                format!("  [{}]", controls.join("/"))
            }
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::WARN)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = ClientConfig::from_env()?;
    let instructor_id = match std::env::args().nth(1) {
        Some(id) => Uuid::parse_str(&id).wrap_err("INSTRUCTOR_ID must be a UUID")?,
        None => config.user_id,
    };

    let channel = RealtimeChannel::new(
        Arc::new(WsConnectionProvider::new(&config.ws_url, config.actor())),
        config.reconnect_delay,
    );
    let connection = channel.start();

    let view = QueueView::new(
        Arc::new(HttpQueueApi::new(config.api_url.clone(), config.actor())),
        instructor_id,
        config.actor(),
        Arc::new(TracingNotifier),
        config.debounce,
    );
    let listener = view.attach(&channel);
    let mut changes = view.changes();
    view.load().await;
    render(&view);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                if view.status() != ViewStatus::Loading {
                    render(&view);
                }
            }
        }
    }

    info!("Leaving queue {}", instructor_id);
    listener.abort();
    channel.shutdown();
    connection.await?;

    Ok(())
}
