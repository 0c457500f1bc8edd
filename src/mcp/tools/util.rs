//! Shared utilities for MCP tool handlers.

use rmcp::model::{CallToolResult, Content, JsonObject};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::AppError;

/// Deserialize tool arguments into `T`; absent arguments count as `{}`.
///
/// # Errors
///
/// Returns `invalid_params` naming the tool when the arguments do not fit.
pub fn parse_args<T: DeserializeOwned>(
    tool: &str,
    args: Option<JsonObject>,
) -> Result<T, rmcp::ErrorData> {
    let args = args.unwrap_or_default();
    serde_json::from_value(serde_json::Value::Object(args)).map_err(|err| {
        rmcp::ErrorData::invalid_params(format!("invalid {tool} parameters: {err}"), None)
    })
}

/// Map a domain error onto the MCP error space.
///
/// Caller mistakes (unknown ids, malformed values) become `invalid_params`;
/// everything else is an `internal_error`.
#[must_use]
pub fn tool_error(err: &AppError) -> rmcp::ErrorData {
    match err {
        AppError::NotFound(_) | AppError::Validation(_) => {
            rmcp::ErrorData::invalid_params(err.to_string(), None)
        }
        _ => rmcp::ErrorData::internal_error(err.to_string(), None),
    }
}

/// Wrap a serializable value as a successful JSON tool result.
///
/// # Errors
///
/// Returns `internal_error` if serialization fails.
pub fn json_result<T: Serialize>(tool: &str, value: &T) -> Result<CallToolResult, rmcp::ErrorData> {
    let content = Content::json(value).map_err(|err| {
        rmcp::ErrorData::internal_error(
            format!("failed to serialize {tool} response: {err}"),
            None,
        )
    })?;
    Ok(CallToolResult::success(vec![content]))
}
