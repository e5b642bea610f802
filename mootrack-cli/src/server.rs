// MooTrack CLI - Map server
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! HTTP map server.
//!
//! Every map or summary request runs one blocking dashboard pass on the
//! tokio blocking pool; the page polls `/map` to refresh.

use crate::metrics::{self, encode_metrics};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use mootrack::{Dashboard, MapView, TimeOfDay};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Application state shared across handlers.
pub struct AppState {
    dashboard: Arc<Dashboard>,
    start_time: Instant,
}

impl AppState {
    pub fn new(dashboard: Dashboard) -> Self {
        Self {
            dashboard: Arc::new(dashboard),
            start_time: Instant::now(),
        }
    }
}

type HandlerError = (StatusCode, String);

/// Build the router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/map", get(map_handler))
        .route("/summary", get(summary_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    info!("Starting server on http://{}", addr);
    info!("Map: http://{}/  Metrics: http://{}/metrics", addr, addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Run one dashboard pass off the async executor.
async fn render(state: &AppState) -> Result<MapView, HandlerError> {
    let dashboard = Arc::clone(&state.dashboard);
    match tokio::task::spawn_blocking(move || dashboard.render()).await {
        Ok(Ok(view)) => {
            metrics::record_view(&view);
            Ok(view)
        }
        Ok(Err(e)) => {
            metrics::record_failure();
            warn!("Dashboard pass failed: {}", e);
            Err((StatusCode::SERVICE_UNAVAILABLE, format!("store unavailable: {}", e)))
        }
        Err(e) => {
            metrics::record_failure();
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// Root handler - Leaflet map polling `/map`.
async fn root_handler() -> Html<&'static str> {
    Html(MAP_PAGE)
}

/// GeoJSON for the current pass.
async fn map_handler(State(state): State<Arc<AppState>>) -> Result<Json<Value>, HandlerError> {
    let view = render(&state).await?;
    Ok(Json(view.to_geojson()))
}

/// Risk summary response.
#[derive(Debug, Serialize, PartialEq)]
pub struct SummaryResponse {
    pub generated_at: DateTime<Utc>,
    pub time_of_day: TimeOfDay,
    pub policy: &'static str,
    pub tracked: usize,
    pub in_forest: usize,
    pub sightings: usize,
    pub risk: BTreeMap<String, usize>,
}

impl SummaryResponse {
    pub fn from_view(view: &MapView, policy: &'static str) -> Self {
        Self {
            generated_at: view.generated_at,
            time_of_day: view.time_of_day,
            policy,
            tracked: view.markers.len(),
            in_forest: view.markers.iter().filter(|m| m.in_forest).count(),
            sightings: view.sightings.len(),
            risk: view.summary.clone(),
        }
    }
}

/// Counts for the current pass.
async fn summary_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SummaryResponse>, HandlerError> {
    let view = render(&state).await?;
    Ok(Json(SummaryResponse::from_view(&view, state.dashboard.policy_name())))
}

/// Metrics handler - returns Prometheus text format.
async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("Content-Type", "text/plain; charset=utf-8")],
        encode_metrics(),
    )
}

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Status information response.
#[derive(Serialize)]
struct StatusResponse {
    version: String,
    core_version: &'static str,
    uptime_secs: u64,
    policy: &'static str,
}

async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        core_version: mootrack::VERSION,
        uptime_secs: state.start_time.elapsed().as_secs(),
        policy: state.dashboard.policy_name(),
    })
}

const MAP_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>MooTrack</title>
    <meta charset="utf-8">
    <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
    <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 0; display: flex; height: 100vh; }
        #map { flex: 1; }
        #side { width: 260px; padding: 16px; background: #f8f9fa; overflow-y: auto; }
        h1 { color: #2c3e50; font-size: 1.4em; }
        .row { display: flex; justify-content: space-between; margin: 4px 0; }
        a { color: #3498db; text-decoration: none; }
    </style>
</head>
<body>
    <div id="map"></div>
    <div id="side">
        <h1>MooTrack</h1>
        <p id="meta">Loading...</p>
        <h2>Risk</h2>
        <div id="summary"></div>
        <p><button onclick="refresh()">Refresh</button></p>
        <p><a href="/map">/map</a> GeoJSON<br><a href="/summary">/summary</a> counts<br><a href="/metrics">/metrics</a> Prometheus</p>
    </div>
    <script>
        const map = L.map('map').setView([13.635, 74.846], 15);
        L.tileLayer('https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png', { attribution: '&copy; OpenStreetMap' }).addTo(map);
        const layer = L.layerGroup().addTo(map);
        let centered = false;

        function fmt(d) { return d === null ? 'n/a' : Math.round(d) + ' m'; }

        async function refresh() {
            const res = await fetch('/map');
            if (!res.ok) { document.getElementById('meta').textContent = await res.text(); return; }
            const data = await res.json();
            layer.clearLayers();
            for (const f of data.features) {
                const p = f.properties;
                const c = f.geometry.coordinates;
                if (p.kind === 'forest_zone') {
                    L.polygon(c[0].map(v => [v[1], v[0]]), { color: 'green', fillOpacity: 0.3 }).bindPopup(p.name).addTo(layer);
                } else if (p.kind === 'sighting') {
                    L.circle([c[1], c[0]], { radius: p.danger_radius_m, color: 'red', fillOpacity: 0.1 }).addTo(layer);
                    L.marker([c[1], c[0]]).bindPopup('Leopard ' + p.predator_id + '<br>' + p.timestamp).addTo(layer);
                } else {
                    L.circleMarker([c[1], c[0]], { radius: 8, color: p.color, fillOpacity: 0.8 })
                        .bindPopup('<b>' + p.entity_id + '</b><br>Risk: ' + p.risk + '<br>Forest: ' + fmt(p.distance_to_forest_m) + '<br>Leopard: ' + fmt(p.distance_to_predator_m) + '<br>' + p.timestamp)
                        .addTo(layer);
                }
            }
            if (data.center && !centered) { map.setView([data.center[1], data.center[0]], 15); centered = true; }
            document.getElementById('meta').textContent = data.time_of_day + ' - ' + data.generated_at;
            document.getElementById('summary').innerHTML = ['low', 'medium', 'high', 'very high', 'N/A']
                .map(k => '<div class="row"><span>' + k + '</span><span>' + (data.summary[k] || 0) + '</span></div>').join('');
        }

        refresh();
        setInterval(refresh, 10000);
    </script>
</body>
</html>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use mootrack::{Coordinate, EntityMarker, MarkerColor, RiskLabel, RiskOutcome};

    #[test]
    fn test_summary_from_view() {
        let risk = RiskOutcome::Label(RiskLabel::Medium);
        let mut summary = BTreeMap::new();
        summary.insert("medium".to_string(), 1);
        let view = MapView {
            center: None,
            zone: None,
            sightings: Vec::new(),
            markers: vec![EntityMarker {
                entity_id: "COW001".to_string(),
                coordinate: Coordinate::new(74.846, 13.635).unwrap(),
                timestamp: Utc::now(),
                color: MarkerColor::for_outcome(&risk),
                risk,
                in_forest: true,
                distance_to_forest_m: 50.0,
                distance_to_predator_m: f64::INFINITY,
            }],
            summary,
            time_of_day: TimeOfDay::Evening,
            generated_at: Utc::now(),
        };

        let response = SummaryResponse::from_view(&view, "proximity-rule");
        assert_eq!(response.tracked, 1);
        assert_eq!(response.in_forest, 1);
        assert_eq!(response.risk.get("medium"), Some(&1));

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["time_of_day"], "evening");
    }

    #[test]
    fn test_map_page_uses_endpoints() {
        assert!(MAP_PAGE.contains("fetch('/map')"));
        assert!(MAP_PAGE.contains("danger_radius_m"));
    }
}
