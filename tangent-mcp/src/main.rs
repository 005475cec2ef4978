//! Tangent MCP Server
//!
//! Line-delimited JSON-RPC 2.0 over stdio. stdout carries only protocol
//! messages; logs go to stderr.
//!
//! Tools:
//! - limit: Limit of an expression at a point, from the left, right or both
//! - derivative: Derivative at a point
//! - integral: Definite integral over an interval
//! - antiderivative: Symbolic antiderivative (needs a symbolic engine)
//! - sample: Plot geometry for a viewport

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeMap;
use std::sync::Arc;
use tangent::{
    parse_point, plot, Explorer, FunctionRegistry, Outcome, PlotRequest, Side, Tangent, TangentConfig, Viewport,
};
use tangent_core::Kind;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const PROTOCOL_VERSION: &str = "2025-11-25";
const SERVER_NAME: &str = "tangent";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_PX_WIDTH: u32 = 800;

// MCP Protocol types
#[derive(Debug, Deserialize)]
struct McpRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    id: Option<JsonValue>,
    method: String,
    #[serde(default)]
    params: Option<JsonValue>,
}

#[derive(Debug, Serialize)]
struct McpResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<McpError>,
}

#[derive(Debug, Serialize)]
struct McpError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<JsonValue>,
}

impl McpError {
    fn invalid_params(message: impl Into<String>) -> Self {
        Self { code: -32602, message: message.into(), data: None }
    }
}

impl McpResponse {
    fn parse_error(message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: None,
            result: None,
            error: Some(McpError { code: -32700, message, data: None }),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = TangentConfig::load()?;
    tracing::info!(
        version = SERVER_VERSION,
        protocol = PROTOCOL_VERSION,
        solver = config.solver.command.as_deref().unwrap_or("none"),
        "Tangent MCP server started"
    );

    let explorer = Explorer::new(Arc::new(Tangent::new(config)));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::info!("client disconnected (EOF)");
                break;
            }
            Err(e) => {
                tracing::error!(error = %e, "error reading input");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<McpRequest>(line) {
            Ok(request) => {
                tracing::debug!(method = %request.method, "processing");
                let response = handle_request(&explorer, &request).await;
                // Notifications (no id) get no response
                if request.id.is_none() {
                    tracing::debug!(method = %request.method, "notification processed");
                    continue;
                }
                response
            }
            Err(e) => {
                tracing::warn!(error = %e, "unparseable request");
                McpResponse::parse_error(format!("Parse error: {}", e))
            }
        };

        let mut out = serde_json::to_string(&response)?;
        out.push('\n');
        if let Err(e) = async {
            stdout.write_all(out.as_bytes()).await?;
            stdout.flush().await
        }
        .await
        {
            tracing::error!(error = %e, "error writing response");
            break;
        }
    }

    explorer.engine().shutdown().await;
    tracing::info!("server shutting down");
    Ok(())
}

async fn handle_request(explorer: &Explorer, request: &McpRequest) -> McpResponse {
    let result = match request.method.as_str() {
        // Lifecycle
        "initialize" => handle_initialize(&request.params),
        "initialized" | "notifications/initialized" => Ok(json!({})),
        "ping" => Ok(json!({})),

        // Tools
        "tools/list" => handle_tools_list(),
        "tools/call" => handle_tool_call(explorer, &request.params).await,

        _ => Err(McpError {
            code: -32601,
            message: format!("Method not found: {}", request.method),
            data: None,
        }),
    };

    match result {
        Ok(r) => McpResponse { jsonrpc: "2.0".to_string(), id: request.id.clone(), result: Some(r), error: None },
        Err(e) => McpResponse { jsonrpc: "2.0".to_string(), id: request.id.clone(), result: None, error: Some(e) },
    }
}

fn handle_initialize(params: &Option<JsonValue>) -> Result<JsonValue, McpError> {
    let client_info = params
        .as_ref()
        .and_then(|p| p.get("clientInfo"))
        .and_then(|c| c.get("name"))
        .and_then(|n| n.as_str())
        .unwrap_or("unknown");

    // Use client's protocol version for compatibility
    let client_protocol = params
        .as_ref()
        .and_then(|p| p.get("protocolVersion"))
        .and_then(|v| v.as_str())
        .unwrap_or(PROTOCOL_VERSION);

    tracing::info!(client = client_info, protocol = client_protocol, "client connected");

    Ok(json!({
        "protocolVersion": client_protocol,
        "serverInfo": {
            "name": SERVER_NAME,
            "version": SERVER_VERSION,
            "description": "Limits, derivatives, integrals and plots of a function of one variable"
        },
        "capabilities": {
            "tools": { "listChanged": false }
        },
        "instructions": format!(
            "Tangent explores a single-variable real function. Expressions use + - * / ^ and implicit multiplication (2x). {} Points may be numbers or strings like \"1/2\" or \"0,5\". Results carry a kind (value, infinity, neg_infinity, undefined, error) and a note saying which method produced them.",
            vocabulary(FunctionRegistry::standard())
        )
    }))
}

/// Functions by category, then constants
fn vocabulary(registry: &FunctionRegistry) -> String {
    let mut by_category: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for meta in registry.list_functions(None) {
        by_category.entry(meta.category).or_default().push(meta.usage);
    }
    let functions: Vec<String> = by_category
        .iter()
        .map(|(category, usages)| format!("{}: {}", category, usages.join(", ")))
        .collect();
    let constants: Vec<&str> = registry.list_constants().iter().map(|c| c.name).collect();
    format!("Functions ({}). Constants: {}.", functions.join("; "), constants.join(", "))
}

fn point_schema(description: &str) -> JsonValue {
    json!({ "type": ["number", "string"], "description": description })
}

fn handle_tools_list() -> Result<JsonValue, McpError> {
    let variable = json!({ "type": "string", "description": "Free variable (default: x)", "default": "x" });
    Ok(json!({
        "tools": [
            {
                "name": "limit",
                "description": "Limit of an expression as the variable approaches a point. Needs a symbolic engine.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "expression": { "type": "string", "description": "Expression in x, e.g. sin(x)/x" },
                        "point": point_schema("Point approached"),
                        "side": {
                            "type": "string",
                            "description": "Direction of approach (default: both)",
                            "enum": ["left", "right", "both"]
                        }
                    },
                    "required": ["expression", "point"]
                }
            },
            {
                "name": "derivative",
                "description": "Derivative at a point, with the derivative expression when one is known.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "expression": { "type": "string", "description": "Expression to differentiate" },
                        "point": point_schema("Point of evaluation"),
                        "variable": variable
                    },
                    "required": ["expression", "point"]
                }
            },
            {
                "name": "integral",
                "description": "Definite integral over [lower, upper], with the antiderivative when the symbolic engine finds one.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "expression": { "type": "string", "description": "Integrand" },
                        "lower": point_schema("Lower bound"),
                        "upper": point_schema("Upper bound"),
                        "variable": variable
                    },
                    "required": ["expression", "lower", "upper"]
                }
            },
            {
                "name": "antiderivative",
                "description": "Symbolic antiderivative. Needs a symbolic engine.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "expression": { "type": "string", "description": "Integrand" },
                        "variable": variable
                    },
                    "required": ["expression"]
                }
            },
            {
                "name": "sample",
                "description": "Plot segments and vertical asymptote estimates for a viewport.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "expression": { "type": "string", "description": "Expression to plot" },
                        "min": point_schema("Left edge of the viewport"),
                        "max": point_schema("Right edge of the viewport"),
                        "center": point_schema("Centre of a default viewport, used when min/max are absent (default: 0)"),
                        "zoom": { "type": "integer", "description": "Zoom steps, positive zooms in (default: 0)" },
                        "px_width": { "type": "integer", "description": "Plot width in pixels (default: 800)" },
                        "variable": variable
                    },
                    "required": ["expression"]
                }
            }
        ]
    }))
}

async fn handle_tool_call(explorer: &Explorer, params: &Option<JsonValue>) -> Result<JsonValue, McpError> {
    let params = params.as_ref().ok_or_else(|| McpError::invalid_params("Missing params"))?;

    let name = params
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| McpError::invalid_params("Missing tool name"))?;

    let args = params.get("arguments").cloned().unwrap_or(json!({}));

    match name {
        "limit" => tool_limit(explorer, &args).await,
        "derivative" => tool_derivative(explorer, &args).await,
        "integral" => tool_integral(explorer, &args).await,
        "antiderivative" => tool_antiderivative(explorer, &args).await,
        "sample" => tool_sample(&args),
        _ => Err(McpError::invalid_params(format!("Unknown tool: {}", name))),
    }
}

fn string_arg<'a>(args: &'a JsonValue, key: &str) -> Result<&'a str, McpError> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| McpError::invalid_params(format!("Missing {} argument", key)))
}

fn variable_arg(args: &JsonValue) -> &str {
    args.get("variable").and_then(|v| v.as_str()).unwrap_or("x")
}

/// A number, or text such as "1/2" or "0,5"
fn point_value(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        JsonValue::String(s) => parse_point(s),
        _ => None,
    }
}

fn point_arg(args: &JsonValue, key: &str) -> Result<f64, McpError> {
    let value = args.get(key).ok_or_else(|| McpError::invalid_params(format!("Missing {} argument", key)))?;
    point_value(value).ok_or_else(|| McpError::invalid_params(format!("Invalid {}: {}", key, value)))
}

fn optional_point_arg(args: &JsonValue, key: &str) -> Result<Option<f64>, McpError> {
    match args.get(key) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(_) => point_arg(args, key).map(Some),
    }
}

fn outcome_result<K: Kind>(outcome: Option<Outcome<K>>) -> Result<JsonValue, McpError> {
    let outcome = outcome.ok_or_else(|| McpError {
        code: -32603,
        message: "Superseded by a newer request".to_string(),
        data: None,
    })?;

    let mut text = format!("{}: {}", K::NAME, outcome);
    if let Some(note) = outcome.note() {
        text.push_str(&format!(" ({})", note));
    }
    if let Some(expression) = outcome.expression() {
        text.push_str(&format!("\nexpression: {}", expression));
    }

    let structured = serde_json::to_value(&outcome).map_err(|e| McpError {
        code: -32603,
        message: format!("Cannot serialize result: {}", e),
        data: None,
    })?;

    Ok(json!({
        "content": [{ "type": "text", "text": text }],
        "structuredContent": structured,
        "isError": outcome.is_error()
    }))
}

async fn tool_limit(explorer: &Explorer, args: &JsonValue) -> Result<JsonValue, McpError> {
    let expression = string_arg(args, "expression")?;
    let point = point_arg(args, "point")?;
    let side: Side = match args.get("side").and_then(|v| v.as_str()) {
        Some(s) => s.parse().map_err(McpError::invalid_params)?,
        None => Side::Both,
    };
    outcome_result(explorer.limit(expression, point, side).await)
}

async fn tool_derivative(explorer: &Explorer, args: &JsonValue) -> Result<JsonValue, McpError> {
    let expression = string_arg(args, "expression")?;
    let point = point_arg(args, "point")?;
    outcome_result(explorer.derivative(expression, point, variable_arg(args)).await)
}

async fn tool_integral(explorer: &Explorer, args: &JsonValue) -> Result<JsonValue, McpError> {
    let expression = string_arg(args, "expression")?;
    let lower = point_arg(args, "lower")?;
    let upper = point_arg(args, "upper")?;
    outcome_result(explorer.integral(expression, lower, upper, variable_arg(args)).await)
}

async fn tool_antiderivative(explorer: &Explorer, args: &JsonValue) -> Result<JsonValue, McpError> {
    let expression = string_arg(args, "expression")?;
    match explorer.engine().antiderivative(expression, variable_arg(args)).await {
        Ok(found) => Ok(json!({
            "content": [{ "type": "text", "text": format!("∫ {} d{} = {} + C", expression, variable_arg(args), found.expression) }],
            "structuredContent": found,
            "isError": false
        })),
        Err(e) => Ok(json!({
            "content": [{ "type": "text", "text": format!("Error: {}", e.message) }],
            "structuredContent": { "kind": "error", "cause": e },
            "isError": true
        })),
    }
}

fn sample_viewport(args: &JsonValue) -> Result<Viewport, McpError> {
    let base = match (optional_point_arg(args, "min")?, optional_point_arg(args, "max")?) {
        (Some(min), Some(max)) => Viewport::new(min, max),
        (None, None) => Viewport::around(optional_point_arg(args, "center")?.unwrap_or(0.0)),
        _ => return Err(McpError::invalid_params("Give both min and max, or neither")),
    };
    let steps = args.get("zoom").and_then(|v| v.as_i64()).unwrap_or(0).clamp(-50, 50);
    let viewport = (0..steps.unsigned_abs()).fold(base, |v, _| if steps > 0 { v.zoom_in() } else { v.zoom_out() });
    Ok(viewport)
}

fn tool_sample(args: &JsonValue) -> Result<JsonValue, McpError> {
    let expression = string_arg(args, "expression")?;
    let px_width = args
        .get("px_width")
        .and_then(|v| v.as_u64())
        .map(|w| w.min(u32::MAX as u64) as u32)
        .unwrap_or(DEFAULT_PX_WIDTH);
    let request = PlotRequest::new(expression, sample_viewport(args)?, px_width).with_variable(variable_arg(args));

    match plot(&request) {
        Ok(frame) => {
            let text = format!(
                "{} on [{}, {}]: {} segment(s), asymptotes near {:?}",
                expression,
                frame.viewport.min,
                frame.viewport.max,
                frame.sampling.segments.len(),
                frame.merged_asymptotes
            );
            let structured = serde_json::to_value(&frame).map_err(|e| McpError {
                code: -32603,
                message: format!("Cannot serialize plot: {}", e),
                data: None,
            })?;
            Ok(json!({
                "content": [{ "type": "text", "text": text }],
                "structuredContent": structured,
                "isError": false
            }))
        }
        Err(e) => Ok(json!({
            "content": [{ "type": "text", "text": format!("Error: {}", e.message) }],
            "structuredContent": { "kind": "error", "cause": e },
            "isError": true
        })),
    }
}
