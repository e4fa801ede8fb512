//! Support console — REST API and single-page dashboard
//!
//! Serves the dashboard page plus the JSON endpoints it calls: RPC status,
//! credential status, issue analysis and fix-script download.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use nodeguard_core::analysis::SCRIPT_FILENAME;
use nodeguard_core::{AnalysisView, AnalyzeError, EndpointProbe, IssueAnalyzer, OpenAiClient, ProbeResult};

/// Read-only state shared by all handlers
pub struct AppState {
    pub client: OpenAiClient,
    pub probe: EndpointProbe,
    pub rpc_url: String,
    pub max_log_chars: usize,
}

type SharedState = Arc<AppState>;

/// Upload ceiling for `/api/analyze`. Logs are cut by the analyzer, not rejected here.
pub const ANALYZE_BODY_LIMIT: usize = 32 * 1024 * 1024;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/api/status", get(get_status))
        .route("/api/health", get(health_check))
        .route(
            "/api/analyze",
            post(analyze_handler).layer(DefaultBodyLimit::max(ANALYZE_BODY_LIMIT)),
        )
        .route("/api/script", post(download_script))
        .with_state(state)
}

/// Start the dashboard HTTP server on `bind`
pub async fn start_console_server(state: SharedState, bind: &str) -> anyhow::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Support console listening on http://{bind}");

    axum::serve(listener, app).await?;
    Ok(())
}

// --- API Types ---

#[derive(Serialize)]
struct StatusResponse {
    version: String,
    model: String,
    api_key_loaded: bool,
    rpc_configured: bool,
    max_log_chars: usize,
}

#[derive(Deserialize)]
struct AnalyzeRequest {
    #[serde(default)]
    description: String,
    #[serde(default)]
    logs: String,
    /// Interactive key, used only when none is configured
    #[serde(default)]
    api_key: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    kind: &'static str,
}

#[derive(Deserialize)]
struct ScriptRequest {
    content: String,
}

// --- Handlers ---

async fn get_status(State(state): State<SharedState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").into(),
        model: state.client.model_name().into(),
        api_key_loaded: state.client.is_available(),
        rpc_configured: !state.rpc_url.trim().is_empty(),
        max_log_chars: state.max_log_chars,
    })
}

/// Probe the configured RPC endpoint. Runs only when the page asks.
async fn health_check(State(state): State<SharedState>) -> Json<ProbeResult> {
    let result = state.probe.check(Some(&state.rpc_url)).await;
    if result.reachable {
        info!("RPC endpoint online ({})", result.detail);
    } else {
        warn!("RPC endpoint offline: {}", result.detail);
    }
    Json(result)
}

fn error_status(err: &AnalyzeError) -> StatusCode {
    match err {
        AnalyzeError::MissingApiKey => StatusCode::BAD_REQUEST,
        AnalyzeError::EmptyInput => StatusCode::UNPROCESSABLE_ENTITY,
        AnalyzeError::Parse(_) | AnalyzeError::Upstream(_) => StatusCode::BAD_GATEWAY,
    }
}

async fn analyze_handler(
    State(state): State<SharedState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisView>, (StatusCode, Json<ErrorResponse>)> {
    let client = match req.api_key.filter(|k| !k.trim().is_empty()) {
        Some(key) if !state.client.is_available() => state.client.with_api_key(key),
        _ => state.client.clone(),
    };

    let analyzer = IssueAnalyzer::new(client).with_max_log_chars(state.max_log_chars);
    match analyzer.analyze(&req.description, &req.logs).await {
        Ok(analysis) => Ok(Json(AnalysisView::from(&analysis))),
        Err(e) => {
            warn!("Analysis failed ({}): {e}", e.kind());
            Err((
                error_status(&e),
                Json(ErrorResponse {
                    error: e.to_string(),
                    kind: e.kind(),
                }),
            ))
        }
    }
}

async fn download_script(Json(req): Json<ScriptRequest>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/x-python; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{SCRIPT_FILENAME}\""),
            ),
        ],
        req.content,
    )
}

async fn dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

const DASHBOARD_HTML: &str = r##"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>NodeGuard | Support Dashboard</title>
    <style>
        * { box-sizing: border-box; }
        body { margin: 0; font-family: -apple-system, "Segoe UI", sans-serif; color: #222; display: flex; min-height: 100vh; }
        aside { width: 280px; background: #f0f2f6; padding: 20px; }
        main { flex: 1; padding: 24px 40px; max-width: 1000px; }
        h1 { margin-top: 0; }
        textarea { width: 100%; height: 200px; font-family: inherit; padding: 8px; }
        button { padding: 8px 14px; border-radius: 6px; border: 1px solid #ccc; background: #fff; cursor: pointer; }
        button.primary { width: 100%; background: #ff4b4b; color: #fff; border: none; font-size: 1em; padding: 12px; }
        button:disabled { opacity: 0.6; cursor: wait; }
        hr { border: none; border-top: 1px solid #ddd; margin: 16px 0; }
        .status-indicator { padding: 10px; border-radius: 5px; background-color: #fff; margin-bottom: 10px; font-weight: 500; }
        .caption { color: #6b7280; font-size: 0.85em; }
        .info { background: #e8f1fb; padding: 14px; border-radius: 6px; }
        .error { background: #fdecea; color: #8a1c1c; padding: 14px; border-radius: 6px; white-space: pre-wrap; }
        .warning { background: #fff8e1; padding: 14px; border-radius: 6px; }
        .bug-card { background-color: #f9f9f9; border-left: 5px solid #673ab7; padding: 20px; border-radius: 8px; margin-top: 20px; color: #333; }
        .bug-card h3 { margin-top: 0; color: #673ab7; }
        pre { background: #0e1117; color: #e6e6e6; padding: 12px; border-radius: 6px; overflow-x: auto; }
        .hidden { display: none; }
    </style>
</head>
<body>
<aside>
    <h2>🛡️ NodeGuard</h2>
    <div id="key-status" class="status-indicator">Checking API key...</div>
    <div id="key-input" class="hidden">
        <input id="api-key" type="password" placeholder="Enter Key" style="width:100%;padding:6px">
    </div>
    <hr>
    <h3>Infrastructure Status</h3>
    <div id="rpc-status" class="status-indicator">Checking RPC...</div>
    <div id="rpc-caption" class="caption"></div>
    <hr>
    <button id="refresh" onclick="refreshStatus()">Refresh Status</button>
</aside>
<main>
    <h1>⚡ Blockchain Support Agent</h1>
    <p>Provide the issue details below.</p>

    <h3>1. Issue Description</h3>
    <textarea id="description" placeholder="e.g. Getting -32000 execution reverted on estimateGas..."></textarea>

    <h3>2. Upload Artifacts</h3>
    <input id="log-file" type="file" accept=".txt,.log,.json">

    <p><button id="analyze" class="primary" onclick="analyze()">🚀 Analyse Support Request</button></p>

    <div id="progress" class="hidden info">🤖 Analysing...</div>
    <div id="message"></div>
    <div id="results" class="hidden">
        <hr>
        <h3>🔍 Root Cause Analysis</h3>
        <div id="summary" class="info"></div>
        <div id="steps-section" class="hidden">
            <h3>✅ Remediation Steps</h3>
            <ul id="steps"></ul>
        </div>
        <div id="bug-card"></div>
        <div id="script-section" class="hidden">
            <h3>🐍 Fix Script</h3>
            <pre id="script"></pre>
            <button onclick="downloadScript()">Download Script</button>
        </div>
    </div>
</main>
<script>
    const SEVERITY_ICONS = {1: '🔴', 2: '🟠', 3: '🟡', 4: '🔵', 5: '⚪'};
    let apiKeyLoaded = false;
    let maxLogChars = 5000;
    let lastScript = null;

    function escapeHtml(text) {
        const div = document.createElement('div');
        div.textContent = text == null ? '' : String(text);
        return div.innerHTML;
    }

    async function refreshStatus() {
        const btn = document.getElementById('refresh');
        btn.disabled = true;
        try {
            const status = await (await fetch('/api/status')).json();
            apiKeyLoaded = status.api_key_loaded;
            maxLogChars = status.max_log_chars;
            document.getElementById('key-status').textContent =
                apiKeyLoaded ? '🔑 OpenAI API Key: Loaded' : '⚠️ OpenAI API Key: Missing';
            document.getElementById('key-input').classList.toggle('hidden', apiKeyLoaded);

            const rpc = document.getElementById('rpc-status');
            const caption = document.getElementById('rpc-caption');
            if (!status.rpc_configured) {
                rpc.textContent = '⚪ RPC URL Not Configured';
                caption.textContent = '';
                return;
            }
            rpc.textContent = 'Checking RPC...';
            const health = await (await fetch('/api/health')).json();
            const checkedAt = new Date(health.checked_at * 1000).toLocaleTimeString();
            if (health.reachable) {
                rpc.innerHTML = '🟢 <strong>RPC Endpoint Online</strong>';
                caption.textContent = 'Latency: ' + health.detail;
            } else {
                rpc.innerHTML = '🔴 <strong>RPC Endpoint Offline</strong>';
                caption.textContent = 'Error: ' + health.detail;
            }
            caption.textContent += ' · Checked at ' + checkedAt;
        } finally {
            btn.disabled = false;
        }
    }

    // First n code points; only the head of a large file is ever sent
    function truncateChars(text, n) {
        if (text.length <= n) return text;
        return Array.from(text.slice(0, 2 * n)).slice(0, n).join('');
    }

    function readLogFile() {
        const file = document.getElementById('log-file').files[0];
        if (!file) return Promise.resolve('');
        return new Promise((resolve, reject) => {
            const reader = new FileReader();
            reader.onload = () => resolve(truncateChars(reader.result, maxLogChars));
            reader.onerror = () => reject(reader.error);
            reader.readAsText(file);
        });
    }

    async function analyze() {
        const message = document.getElementById('message');
        const results = document.getElementById('results');
        const progress = document.getElementById('progress');
        const btn = document.getElementById('analyze');
        message.innerHTML = '';
        results.classList.add('hidden');

        const description = document.getElementById('description').value;
        const logs = await readLogFile();
        const apiKey = document.getElementById('api-key').value;

        btn.disabled = true;
        progress.classList.remove('hidden');
        try {
            const res = await fetch('/api/analyze', {
                method: 'POST',
                headers: {'Content-Type': 'application/json'},
                body: JSON.stringify({description, logs, api_key: apiKeyLoaded ? null : apiKey}),
            });
            const text = await res.text();
            let data = null;
            try {
                data = JSON.parse(text);
            } catch (_) {}
            if (!res.ok || data === null) {
                const err = data || {kind: 'http', error: `HTTP ${res.status}: ${text}`};
                const cls = err.kind === 'empty_input' ? 'warning' : 'error';
                const title = err.kind === 'upstream' ? 'AI Error Occurred:\n' : '';
                message.innerHTML = `<div class="${cls}">${escapeHtml(title + err.error)}</div>`;
                return;
            }
            render(data);
        } catch (e) {
            message.innerHTML = `<div class="error">${escapeHtml(e)}</div>`;
        } finally {
            btn.disabled = false;
            progress.classList.add('hidden');
        }
    }

    function render(view) {
        document.getElementById('summary').textContent = view.summary;

        const steps = document.getElementById('steps');
        steps.innerHTML = view.steps.map(s => `<li>${escapeHtml(s)}</li>`).join('');
        document.getElementById('steps-section').classList.toggle('hidden', view.steps.length === 0);

        const card = document.getElementById('bug-card');
        const r = view.bug_report;
        card.innerHTML = r ? `<div class="bug-card">
            <h3>🐛 ${escapeHtml(r.title)}</h3>
            <p><strong>Category:</strong> ${escapeHtml(r.category)} |
               <strong>Severity:</strong> ${SEVERITY_ICONS[r.severity_level]} ${escapeHtml(r.severity_label)}</p>
            <hr>
            <p>${escapeHtml(r.description)}</p>
        </div>` : '';

        lastScript = view.script;
        document.getElementById('script').textContent = lastScript ? lastScript.content : '';
        document.getElementById('script-section').classList.toggle('hidden', !lastScript);

        document.getElementById('results').classList.remove('hidden');
    }

    async function downloadScript() {
        if (!lastScript) return;
        const res = await fetch('/api/script', {
            method: 'POST',
            headers: {'Content-Type': 'application/json'},
            body: JSON.stringify({content: lastScript.content}),
        });
        const url = URL.createObjectURL(await res.blob());
        const a = document.createElement('a');
        a.href = url;
        a.download = lastScript.filename;
        a.click();
        URL.revokeObjectURL(url);
    }

    refreshStatus();
</script>
</body>
</html>"##;
