//! Embedded dashboard server: page, layout, and callback dispatch over HTTP.

use std::fmt::Write as _;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use launch_dash::layout::Layout;
use launch_dash::{
    build_layout, pie_chart, scatter_chart, write_records, CallbackOutput, CallbackRegistry,
    Dataset, Figure, LaunchDashError, PayloadRange, SiteSelection, WidgetId, WidgetState,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

#[derive(Clone)]
pub struct AppState {
    dataset: Arc<Dataset>,
    layout: Arc<Layout>,
    registry: Arc<CallbackRegistry>,
}

impl AppState {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        let layout = build_layout(&dataset);
        Self {
            dataset,
            layout: Arc::new(layout),
            registry: Arc::new(CallbackRegistry::dashboard()),
        }
    }
}

/// Build the dashboard router. When `web_dist` is set, the built wasm front
/// end is served under `/app`.
pub fn router(state: AppState, web_dist: Option<&Path>) -> Router {
    let mut router = Router::new()
        .route("/", get(index))
        .route("/api/layout", get(layout))
        .route("/api/update", post(update))
        .route("/api/pie", get(pie))
        .route("/api/scatter", get(scatter))
        .route("/api/summary", get(summary))
        .route("/data.csv", get(data_csv));
    if let Some(dir) = web_dist {
        router = router.nest_service("/app", ServeDir::new(dir));
    }
    router.layer(TraceLayer::new_for_http()).with_state(state)
}

pub async fn serve(dataset: Arc<Dataset>, addr: SocketAddr, web_dist: Option<PathBuf>) -> Result<()> {
    if let Some(dir) = web_dist.as_deref() {
        info!("Serving web front end from {} at /app", dir.display());
    }
    let app = router(AppState::new(dataset), web_dist.as_deref());
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Dashboard listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    info!("Dashboard stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

/// Library errors surface as `400 {"error": "..."}`.
struct ApiError(LaunchDashError);

impl From<LaunchDashError> for ApiError {
    fn from(err: LaunchDashError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
struct UpdateRequest {
    /// Widget whose value changed; absent on first render.
    #[serde(default)]
    changed: Option<String>,
    state: WidgetState,
}

#[derive(Debug, Serialize)]
struct UpdateResponse {
    outputs: Vec<CallbackOutput>,
}

#[derive(Debug, Deserialize)]
struct SiteQuery {
    site: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScatterQuery {
    site: Option<String>,
    low: Option<f64>,
    high: Option<f64>,
}

fn site_from_query(site: Option<&str>) -> SiteSelection {
    site.map(SiteSelection::from).unwrap_or_default()
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_page(&state.layout))
}

async fn layout(State(state): State<AppState>) -> Json<Layout> {
    Json(state.layout.as_ref().clone())
}

async fn update(
    State(state): State<AppState>,
    Json(req): Json<UpdateRequest>,
) -> Result<Json<UpdateResponse>, ApiError> {
    let outputs = match req.changed.as_deref() {
        Some(id) => {
            let changed: WidgetId = id.parse()?;
            state.registry.dispatch(changed, &req.state, &state.dataset)
        }
        None => state.registry.dispatch_all(&req.state, &state.dataset),
    };
    debug!(
        "update changed={:?} site={} payload=[{}, {}] -> {} outputs",
        req.changed,
        req.state.site,
        req.state.payload.low,
        req.state.payload.high,
        outputs.len()
    );
    Ok(Json(UpdateResponse { outputs }))
}

async fn pie(State(state): State<AppState>, Query(q): Query<SiteQuery>) -> Json<Figure> {
    let site = site_from_query(q.site.as_deref());
    Json(Figure::Pie(pie_chart(&state.dataset, &site)))
}

async fn scatter(State(state): State<AppState>, Query(q): Query<ScatterQuery>) -> Json<Figure> {
    let site = site_from_query(q.site.as_deref());
    let bounds = state.dataset.payload_bounds();
    let range = PayloadRange::new(q.low.unwrap_or(bounds.low), q.high.unwrap_or(bounds.high));
    Json(Figure::Scatter(scatter_chart(&state.dataset, &site, range)))
}

async fn summary(State(state): State<AppState>) -> impl IntoResponse {
    let ds = &state.dataset;
    Json(json!({
        "launches": ds.len(),
        "payload_bounds": ds.payload_bounds(),
        "sites": ds.site_summaries(),
    }))
}

async fn data_csv(State(state): State<AppState>) -> Result<Response, ApiError> {
    let mut buf = Vec::new();
    write_records(state.dataset.records(), &mut buf)?;
    Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], buf).into_response())
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Render the page markup for `layout`. The slider is two range inputs kept
/// ordered by the page script.
fn render_page(layout: &Layout) -> String {
    let dropdown = &layout.dropdown;
    let slider = &layout.slider;

    let mut options = String::new();
    for opt in &dropdown.options {
        let selected = if opt.value == dropdown.value.as_str() { " selected" } else { "" };
        let _ = write!(
            options,
            r#"<option value="{}"{}>{}</option>"#,
            escape_html(&opt.value),
            selected,
            escape_html(&opt.label)
        );
    }

    let mut marks = String::new();
    for mark in &slider.marks {
        let _ = write!(
            marks,
            r#"<option value="{}" label="{}"></option>"#,
            mark.value,
            escape_html(&mark.label)
        );
    }
    let mut mark_labels = String::new();
    for mark in &slider.marks {
        let _ = write!(mark_labels, "<span>{}</span>", escape_html(&mark.label));
    }

    let config = json!({
        "dropdown": dropdown.id,
        "slider": slider.id,
        "pie": layout.pie_graph,
        "scatter": layout.scatter_graph,
    });

    PAGE_TEMPLATE
        .replace("{{title}}", &escape_html(&layout.title))
        .replace("{{dropdown_id}}", dropdown.id.as_str())
        .replace("{{placeholder}}", &escape_html(&dropdown.placeholder))
        .replace("{{options}}", &options)
        .replace("{{pie_id}}", layout.pie_graph.as_str())
        .replace("{{slider_label}}", &escape_html(&layout.slider_label))
        .replace("{{slider_id}}", slider.id.as_str())
        .replace("{{min}}", &slider.min.to_string())
        .replace("{{max}}", &slider.max.to_string())
        .replace("{{step}}", &slider.step.to_string())
        .replace("{{low}}", &slider.value.low.to_string())
        .replace("{{high}}", &slider.value.high.to_string())
        .replace("{{marks}}", &marks)
        .replace("{{mark_labels}}", &mark_labels)
        .replace("{{scatter_id}}", layout.scatter_graph.as_str())
        .replace("{{config}}", &config.to_string())
}

const PAGE_TEMPLATE: &str = r##"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>{{title}}</title>
    <script src="https://cdn.plot.ly/plotly-2.35.2.min.js" charset="utf-8"></script>
    <style>
      body { font-family: "Open Sans", "Segoe UI", sans-serif; margin: 0 auto; max-width: 1100px; padding: 12px; }
      h1 { text-align: center; color: #503D36; font-size: 40px; }
      select { width: 100%; padding: 6px; font-size: 15px; }
      .slider { position: relative; height: 36px; }
      .slider input[type=range] { position: absolute; left: 0; width: 100%; pointer-events: none; background: none; }
      .slider input[type=range]::-webkit-slider-thumb { pointer-events: all; }
      .slider input[type=range]::-moz-range-thumb { pointer-events: all; }
      .marks { display: flex; justify-content: space-between; font-size: 12px; color: #666; }
      .readout { font-size: 13px; color: #333; }
    </style>
  </head>
  <body>
    <h1>{{title}}</h1>
    <select id="{{dropdown_id}}" title="{{placeholder}}">{{options}}</select>
    <br />
    <div><div id="{{pie_id}}"></div></div>
    <br />
    <p>{{slider_label}} <span class="readout" id="payload-readout"></span></p>
    <div class="slider" id="{{slider_id}}">
      <input type="range" id="payload-low" min="{{min}}" max="{{max}}" step="{{step}}" value="{{low}}" list="payload-marks" />
      <input type="range" id="payload-high" min="{{min}}" max="{{max}}" step="{{step}}" value="{{high}}" list="payload-marks" />
      <datalist id="payload-marks">{{marks}}</datalist>
    </div>
    <div class="marks">{{mark_labels}}</div>
    <div><div id="{{scatter_id}}"></div></div>
    <script>
      const ids = {{config}};
      const dropdown = document.getElementById(ids.dropdown);
      const low = document.getElementById("payload-low");
      const high = document.getElementById("payload-high");
      const readout = document.getElementById("payload-readout");
      // Initial value is the observed range, which need not sit on a step.
      let range = [parseFloat(low.getAttribute("value")), parseFloat(high.getAttribute("value"))];

      function currentState() {
        return { site: dropdown.value, payload: range };
      }

      function showRange() {
        readout.textContent = range[0] + " – " + range[1] + " kg";
      }

      async function update(changed) {
        const resp = await fetch("/api/update", {
          method: "POST",
          headers: { "Content-Type": "application/json" },
          body: JSON.stringify({ changed: changed, state: currentState() }),
        });
        if (!resp.ok) {
          console.error("update failed", resp.status, await resp.text());
          return;
        }
        const body = await resp.json();
        for (const out of body.outputs) {
          Plotly.react(out.id, out.figure.data, out.figure.layout);
        }
      }

      function onSlide(ev) {
        let a = parseFloat(low.value);
        let b = parseFloat(high.value);
        if (a > b) {
          if (ev.target === low) { a = b; low.value = a; } else { b = a; high.value = b; }
        }
        range = [a, b];
        showRange();
      }

      dropdown.addEventListener("change", () => update(ids.dropdown));
      for (const input of [low, high]) {
        input.addEventListener("input", onSlide);
        input.addEventListener("change", () => update(ids.slider));
      }
      showRange();
      update(null);
    </script>
  </body>
</html>
"##;
