//! Error types for the visualization engine.
//!
//! Errors never abort the page: the caller logs them and shows the message
//! inline in the affected mount point.

use thiserror::Error;

use crate::graph::NodeId;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, VizError>;

#[derive(Debug, Error)]
pub enum VizError {
    /// The packing input contained no nodes.
    #[error("graph is empty")]
    EmptyGraph,

    /// An operation referenced a node that is not part of the current layout.
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    /// The operation requires a different visualization mode.
    #[error("operation requires {expected} mode")]
    WrongMode { expected: &'static str },

    /// The DOM element used as mount point could not be found.
    #[error("mount point not found: #{0}")]
    MountNotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JS value conversion failed: {0}")]
    Serde(#[from] serde_wasm_bindgen::Error),

    /// A call into the browser failed.
    #[error("browser call failed: {0}")]
    Js(String),

    /// The action does not return a graph.
    #[error("action {0} does not return a graph")]
    NotAGraph(&'static str),

    /// The graph endpoint answered with a non-success status.
    #[error("request for {action} failed with status {status}: {message}")]
    Fetch {
        action: &'static str,
        status: u16,
        message: String,
    },
}

impl From<wasm_bindgen::JsValue> for VizError {
    fn from(value: wasm_bindgen::JsValue) -> Self {
        Self::Js(value.as_string().unwrap_or_else(|| format!("{value:?}")))
    }
}

impl From<VizError> for wasm_bindgen::JsValue {
    fn from(err: VizError) -> Self {
        wasm_bindgen::JsValue::from_str(&err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(VizError::EmptyGraph.to_string(), "graph is empty");
        assert_eq!(
            VizError::UnknownNode(NodeId(7)).to_string(),
            "unknown node: Node(7)"
        );
        let err = VizError::Fetch {
            action: "pageGraph",
            status: 500,
            message: "Internal Server Error".into(),
        };
        assert_eq!(
            err.to_string(),
            "request for pageGraph failed with status 500: Internal Server Error"
        );
    }

    #[test]
    fn test_json_error_converts() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: VizError = parse.unwrap_err().into();
        assert!(matches!(err, VizError::Json(_)));
    }
}
