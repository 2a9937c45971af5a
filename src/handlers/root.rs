//! Root endpoint handler for the landing page.
//!
//! This module provides the `/` endpoint handler that displays
//! a landing page with the available endpoints and the scrape targets.

use axum::{
    extract::State,
    response::{Html, IntoResponse},
};
use std::fmt::Write as FmtWrite;
use tracing::{debug, instrument};

use crate::handlers::health::FOOTER_TEXT;
use crate::state::SharedState;

/// Handler for the root `/` endpoint.
#[instrument(skip(state))]
pub async fn root_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing / request");

    let version = env!("CARGO_PKG_VERSION");

    let uptime_secs = state.start_time.elapsed().as_secs();
    let hours = uptime_secs / 3600;
    let minutes = (uptime_secs % 3600) / 60;
    let seconds = uptime_secs % 60;
    let uptime_str = format!("{}h {}m {}s", hours, minutes, seconds);

    let mut rows = String::new();
    for (category, counts) in state.scrape_stats.categories() {
        writeln!(
            rows,
            "        <tr><td>{}</td><td>{}</td><td>{}</td><td>{:.1}</td></tr>",
            category,
            counts.success,
            counts.failure,
            counts.success_rate()
        )
        .ok();
    }
    let health_item = if state.config.enable_health.unwrap_or(true) {
        "<li><a href=\"/health\">/health</a> Scrape statistics per daemon category (text)</li>"
    } else {
        ""
    };

    if rows.is_empty() {
        rows.push_str("        <tr><td colspan=\"4\">No scrape has completed yet</td></tr>\n");
    }

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Hadoop JMX Exporter</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            margin: 0;
            padding: 20px;
            background: #f5f5f5;
            line-height: 1.6;
        }}
        .container {{
            max-width: 900px;
            margin: 0 auto;
            background: white;
            padding: 40px;
            border-radius: 8px;
            box-shadow: 0 2px 8px rgba(0,0,0,0.1);
        }}
        h1 {{
            color: #333;
            border-bottom: 3px solid #007bff;
            padding-bottom: 15px;
        }}
        .info {{
            background: #e9ecef;
            padding: 15px;
            border-radius: 4px;
            display: flex;
            justify-content: space-around;
            flex-wrap: wrap;
        }}
        .info-label {{ font-weight: 600; color: #555; display: block; font-size: 0.9em; }}
        .info-value {{ font-size: 1.2em; color: #007bff; }}
        .endpoint-list {{ list-style: none; padding: 0; }}
        .endpoint-list li {{
            margin: 15px 0;
            padding: 15px;
            background: #f8f9fa;
            border-left: 4px solid #007bff;
            border-radius: 4px;
        }}
        table {{ border-collapse: collapse; width: 100%; }}
        th, td {{ text-align: left; padding: 6px 10px; border-bottom: 1px solid #ddd; }}
        .footer {{ margin-top: 40px; color: #666; font-size: 0.9em; text-align: center; }}
    </style>
</head>
<body>
<div class="container">
    <h1>Hadoop JMX Exporter</h1>

    <div class="info">
        <div><span class="info-label">Cluster</span><span class="info-value">{cluster}</span></div>
        <div><span class="info-label">Version</span><span class="info-value">{version}</span></div>
        <div><span class="info-label">Uptime</span><span class="info-value">{uptime}</span></div>
    </div>

    <h2>Available Endpoints</h2>
    <ul class="endpoint-list">
        <li><a href="/metrics">/metrics</a> Prometheus-compatible metrics endpoint</li>
        {health_item}
    </ul>

    <h2>Scrape Targets</h2>
    <table>
        <tr><th>Category</th><th>Success</th><th>Failure</th><th>Rate (%)</th></tr>
{rows}    </table>

    <div class="footer"><p>{footer}</p></div>
</div>
</body>
</html>"#,
        cluster = state.config.cluster(),
        version = version,
        uptime = uptime_str,
        health_item = health_item,
        rows = rows,
        footer = FOOTER_TEXT
    );

    Html(html)
}
