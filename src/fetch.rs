//! Graph requests against the quiz endpoint.
//!
//! The server multiplexes every request through one URL with an `action`
//! query parameter. Only the two graph actions matter here; the others are
//! listed so the discriminator round-trips. Requests are plain GETs with a
//! completion callback and no retry.

use std::fmt;
use std::str::FromStr;

use log::{debug, error};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;
use web_sys::XmlHttpRequest;

use crate::error::{Result, VizError};
use crate::graph::{FlatGraph, GraphNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    UserList,
    UserSelect,
    Ask,
    Answer,
    /// Flat page graph for the force view.
    PageGraph,
    /// Category tree for the packing view.
    CategoryGraph,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Self::UserList,
        Self::UserSelect,
        Self::Ask,
        Self::Answer,
        Self::PageGraph,
        Self::CategoryGraph,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserList => "userList",
            Self::UserSelect => "userSelect",
            Self::Ask => "ask",
            Self::Answer => "answer",
            Self::PageGraph => "pageGraph",
            Self::CategoryGraph => "categoryGraph",
        }
    }

    pub fn is_graph(self) -> bool {
        matches!(self, Self::PageGraph | Self::CategoryGraph)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("unknown action: {s}"))
    }
}

/// `endpoint?action=...`, appending to an existing query string if any.
pub fn request_url(endpoint: &str, action: Action) -> String {
    let sep = if endpoint.contains('?') { '&' } else { '?' };
    format!("{endpoint}{sep}action={action}")
}

/// A decoded graph response.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphPayload {
    Page(FlatGraph),
    Category(GraphNode),
}

/// Decode the body of a graph action.
pub fn parse_graph_payload(action: Action, text: &str) -> Result<GraphPayload> {
    match action {
        Action::PageGraph => Ok(GraphPayload::Page(serde_json::from_str(text)?)),
        Action::CategoryGraph => Ok(GraphPayload::Category(serde_json::from_str(text)?)),
        other => Err(VizError::NotAGraph(other.as_str())),
    }
}

/// Fetch a graph and hand the outcome to `on_done` once the request
/// settles. Errors raised before the request is sent are returned directly.
pub fn fetch_graph(
    endpoint: &str,
    action: Action,
    on_done: impl FnOnce(Result<GraphPayload>) + 'static,
) -> Result<()> {
    if !action.is_graph() {
        return Err(VizError::NotAGraph(action.as_str()));
    }

    // Responses must never come from the browser cache.
    let url = format!("{}&_={}", request_url(endpoint, action), js_sys::Date::now() as u64);
    let xhr = XmlHttpRequest::new()?;
    xhr.open_with_async("GET", &url, true)?;
    xhr.set_request_header("Accept", "application/json; charset=UTF-8")?;

    let request = xhr.clone();
    let on_loadend = Closure::once_into_js(move || {
        let outcome = settle(&request, action);
        if let Err(err) = &outcome {
            error!("{action} request failed: {err}");
        }
        on_done(outcome);
    });
    xhr.set_onloadend(Some(on_loadend.unchecked_ref()));
    xhr.send()?;
    debug!("GET {url}");
    Ok(())
}

fn settle(xhr: &XmlHttpRequest, action: Action) -> Result<GraphPayload> {
    let status = xhr.status()?;
    if !(200..300).contains(&status) {
        let message = xhr.status_text().unwrap_or_default();
        return Err(VizError::Fetch {
            action: action.as_str(),
            status,
            message: if message.is_empty() {
                "network error".to_string()
            } else {
                message
            },
        });
    }
    let text = xhr.response_text()?.unwrap_or_default();
    parse_graph_payload(action, &text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names_round_trip() {
        for action in Action::ALL {
            assert_eq!(action.as_str().parse::<Action>(), Ok(action));
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{action}\""));
        }
        assert!("graph".parse::<Action>().is_err());
    }

    #[test]
    fn test_request_url() {
        assert_eq!(
            request_url("http://localhost:8080/do", Action::PageGraph),
            "http://localhost:8080/do?action=pageGraph"
        );
        assert_eq!(
            request_url("/do?lang=en", Action::CategoryGraph),
            "/do?lang=en&action=categoryGraph"
        );
    }

    #[test]
    fn test_parse_page_graph() {
        let text = r#"{
            "nodes": [
                {"id": 12454, "name": "Living people", "weight": -2, "rank": 26153},
                {"id": 1877, "name": "Mathematics", "weight": 1, "rank": 1171}
            ],
            "edges": [{"source": 0, "target": 1}]
        }"#;
        let GraphPayload::Page(graph) = parse_graph_payload(Action::PageGraph, text).unwrap() else {
            panic!("expected page graph");
        };
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.nodes[1].name, "Mathematics");
        assert_eq!(graph.edges.len(), 1);
    }

    #[test]
    fn test_parse_category_graph() {
        let text = r#"{"id": 58229, "name": "Articles", "weight": -2, "rank": 49,
            "children": [{"id": 2255, "name": "People", "weight": -2, "rank": 142, "children": []}]}"#;
        let GraphPayload::Category(root) = parse_graph_payload(Action::CategoryGraph, text).unwrap()
        else {
            panic!("expected category tree");
        };
        assert_eq!(root.name, "Articles");
        assert_eq!(root.count(), 2);
    }

    #[test]
    fn test_parse_rejects_other_actions_and_bad_json() {
        assert!(matches!(
            parse_graph_payload(Action::Ask, "{}"),
            Err(VizError::NotAGraph("ask"))
        ));
        assert!(matches!(
            parse_graph_payload(Action::PageGraph, "Loading..."),
            Err(VizError::Json(_))
        ));
    }
}
