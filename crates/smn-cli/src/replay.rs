//! Replay a recorded event trace through the engine.
//!
//! The trace is JSON lines, one event per line, e.g.
//!
//! ```text
//! {"event": "navigate", "tab": 1, "url": "https://example.com/"}
//! {"event": "request", "tab": 1, "url": "https://static.facebook.com/plugins/like.php"}
//! {"event": "popup", "tab": 1}
//! ```
//!
//! Each event produces one JSON line on stdout.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use log::{debug, info};
use serde::Deserialize;
use serde_json::{json, Value};

use smn_core::{Engine, ObservedRequest, TabId};

use crate::catalog;

pub struct ReplayOptions {
    pub catalog: PathBuf,
    pub preferences: Option<PathBuf>,
    pub trace: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
enum TraceEvent {
    Navigate {
        tab: TabId,
        url: String,
    },
    Request {
        #[serde(default)]
        tab: Option<TabId>,
        url: String,
        #[serde(default, rename = "tabUrl")]
        tab_url: Option<String>,
    },
    Close {
        tab: TabId,
    },
    Block {
        tab: TabId,
        tracker: String,
    },
    Unblock {
        tab: TabId,
        tracker: String,
    },
    UnblockAll {
        tab: TabId,
    },
    ButtonClick {
        tab: TabId,
        tracker: String,
    },
    Popup {
        tab: TabId,
    },
    Buttons {
        tab: TabId,
    },
}

pub fn run_replay(opts: ReplayOptions) -> Result<(), String> {
    let engine = catalog::load_engine(&opts.catalog, opts.preferences.as_deref())?;

    let file = File::open(&opts.trace)
        .map_err(|e| format!("Failed to read '{}': {}", opts.trace.display(), e))?;

    info!("Replaying '{}'", opts.trace.display());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut replayed = 0usize;

    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| format!("Failed to read line {}: {}", line_no, e))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let event: TraceEvent = serde_json::from_str(trimmed)
            .map_err(|e| format!("Invalid event on line {}: {}", line_no, e))?;

        debug!("line {line_no}: {event:?}");
        let mut response = apply_event(&engine, event);
        replayed += 1;
        response["line"] = json!(line_no);

        writeln!(out, "{}", response)
            .map_err(|e| format!("Failed to write output: {}", e))?;
    }

    info!("Replayed {replayed} events");
    Ok(())
}

fn apply_event(engine: &Engine, event: TraceEvent) -> Value {
    match event {
        TraceEvent::Navigate { tab, url } => {
            engine.on_top_level_navigation(tab, &url);
            json!({ "event": "navigate", "tab": tab })
        }
        TraceEvent::Request { tab, url, tab_url } => {
            let verdict = engine.on_request_observed(&ObservedRequest {
                url: &url,
                tab_id: tab,
                tab_url: tab_url.as_deref(),
            });
            let tracker = engine.resolve(&url).map(|t| t.name.clone());
            json!({ "event": "request", "tab": tab, "url": url, "tracker": tracker, "verdict": verdict })
        }
        TraceEvent::Close { tab } => {
            engine.on_tab_closed(tab);
            json!({ "event": "close", "tab": tab })
        }
        TraceEvent::Block { tab, tracker } => {
            engine.set_tracker_blocked(tab, &tracker, true);
            json!({ "event": "block", "tab": tab, "tracker": tracker })
        }
        TraceEvent::Unblock { tab, tracker } => {
            engine.set_tracker_blocked(tab, &tracker, false);
            json!({ "event": "unblock", "tab": tab, "tracker": tracker })
        }
        TraceEvent::UnblockAll { tab } => {
            engine.unblock_all(tab);
            json!({ "event": "unblock-all", "tab": tab })
        }
        TraceEvent::ButtonClick { tab, tracker } => {
            engine.on_button_clicked(tab, &tracker);
            json!({ "event": "button-click", "tab": tab, "tracker": tracker })
        }
        TraceEvent::Popup { tab } => {
            json!({ "event": "popup", "tab": tab, "data": engine.popup_data(tab) })
        }
        TraceEvent::Buttons { tab } => {
            let replace = engine.button_replacement_plan(tab).map(|plan| plan.replace);
            json!({ "event": "buttons", "tab": tab, "replace": replace })
        }
    }
}
