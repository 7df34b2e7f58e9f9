//! `watch`: run the sync loop and print notifications until Ctrl-C.

use std::time::Duration;

use chrono::Local;
use owo_colors::OwoColorize;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use verasync_core::{Controller, SyncEvent, UpdatedEntity};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

// ── Rendering ───────────────────────────────────────────────────────

fn describe(event: &SyncEvent) -> (&'static str, String) {
    match event {
        SyncEvent::DataSent { path, length } => ("sent", format!("{path} ({length} bytes)")),
        SyncEvent::DataReceived { length, cursor, .. } => {
            ("received", format!("{length} bytes, cursor {cursor}"))
        }
        SyncEvent::Error(e) => ("error", e.to_string()),
        SyncEvent::EntityUpdated(UpdatedEntity::Device(d)) => {
            let summary = d.kind.summary();
            let state = if summary.is_empty() {
                String::new()
            } else {
                format!(": {summary}")
            };
            ("device", format!("#{} {}{state}", d.id, d.name))
        }
        SyncEvent::EntityUpdated(UpdatedEntity::Scene(s)) => (
            "scene",
            format!(
                "#{} {}{}",
                s.id,
                s.name,
                if s.active { " (active)" } else { "" }
            ),
        ),
        SyncEvent::HouseModeChanged { old, new } => ("mode", format!("{old} -> {new}")),
    }
}

fn to_json(event: &SyncEvent) -> serde_json::Value {
    match event {
        SyncEvent::DataSent { path, length } => {
            json!({ "event": "data_sent", "path": path, "length": length })
        }
        SyncEvent::DataReceived { length, cursor, .. } => json!({
            "event": "data_received",
            "length": length,
            "loadtime": cursor.loadtime,
            "dataversion": cursor.dataversion,
        }),
        SyncEvent::Error(e) => json!({ "event": "error", "message": e.to_string() }),
        SyncEvent::EntityUpdated(UpdatedEntity::Device(d)) => {
            json!({ "event": "device_updated", "device": d })
        }
        SyncEvent::EntityUpdated(UpdatedEntity::Scene(s)) => {
            json!({ "event": "scene_updated", "scene": s })
        }
        SyncEvent::HouseModeChanged { old, new } => {
            json!({ "event": "house_mode_changed", "old": old, "new": new })
        }
    }
}

fn render(event: &SyncEvent, global: &GlobalOpts, color: bool) -> String {
    match global.output {
        OutputFormat::Json | OutputFormat::JsonCompact | OutputFormat::Yaml => {
            output::render_json(&to_json(event), true)
        }
        OutputFormat::Table | OutputFormat::Plain => {
            let (label, text) = describe(event);
            let stamp = Local::now().format("%H:%M:%S");
            if !color {
                return format!("{stamp} {label:<8} {text}");
            }
            let label = format!("{label:<8}");
            let label = match event {
                SyncEvent::Error(_) => label.red().to_string(),
                SyncEvent::HouseModeChanged { .. } => label.magenta().to_string(),
                SyncEvent::EntityUpdated(_) => label.green().to_string(),
                _ => label.dimmed().to_string(),
            };
            format!("{} {label} {text}", stamp.dimmed())
        }
    }
}

fn is_traffic(event: &SyncEvent) -> bool {
    matches!(
        event,
        SyncEvent::DataSent { .. } | SyncEvent::DataReceived { .. }
    )
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let mut events = controller.subscribe();

    controller.start_listening().await?;
    if !global.quiet {
        eprintln!(
            "Watching {} ({} devices, {} scenes). Ctrl-C to stop.",
            controller.connection().kind(),
            controller.store().device_count(),
            controller.store().scene_count()
        );
    }

    let mut mode_tick = (args.mode_interval > 0)
        .then(|| tokio::time::interval(Duration::from_secs(args.mode_interval)));

    loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => break,
            () = async {
                match mode_tick.as_mut() {
                    Some(tick) => { tick.tick().await; }
                    None => std::future::pending::<()>().await,
                }
            } => {
                // Changes arrive through the event channel
                if let Err(e) = controller.request_house_mode().await {
                    tracing::warn!(error = %e, "house mode query failed");
                }
            }
            received = events.recv() => match received {
                Ok(event) => {
                    if is_traffic(&event) && !args.traffic {
                        continue;
                    }
                    output::print_output(&render(&event, global, color), global.quiet);
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "watch output fell behind; notifications dropped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    controller.stop_listening().await;
    Ok(())
}
