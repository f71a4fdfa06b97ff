//! Visualization configuration.
//!
//! Everything is optional on the JS side: missing keys fall back to the
//! defaults of the quiz client (600px packing view, 600x400 force canvas).

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::graph::LinkKey;
use crate::layout::{ForceConfig, PackConfig, PackValue};
use crate::scale::Color;
use crate::zoom::ZoomConfig;

/// Server endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080/do";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VizConfig {
    /// Quiz server endpoint for graph fetches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub packing: PackingConfig,
    pub force: ForceModeConfig,
}

impl VizConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }
}

/// Zoomable circle packing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PackingConfig {
    /// Side of the square SVG in pixels.
    pub diameter: f64,
    pub margin: f64,
    pub padding: f64,
    pub value: PackValue,
    pub duration_ms: f64,
    pub slow_factor: f64,
    /// Colors at `[min weight, 0, max weight]`.
    pub colors: [Color; 3],
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            diameter: 600.0,
            margin: 20.0,
            padding: 2.0,
            value: PackValue::AbsWeight,
            duration_ms: 750.0,
            slow_factor: 10.0,
            colors: [Color::BLACK, Color::GRAY, Color::WHITE],
        }
    }
}

impl PackingConfig {
    /// The root circle fills the view minus the margin.
    pub fn pack_config(&self) -> PackConfig {
        let side = (self.diameter - self.margin).max(0.0);
        PackConfig {
            size: [side, side],
            padding: self.padding,
            value: self.value,
        }
    }

    pub fn zoom_config(&self) -> ZoomConfig {
        ZoomConfig {
            diameter: self.diameter,
            margin: self.margin,
            duration_ms: self.duration_ms,
            slow_factor: self.slow_factor,
        }
    }
}

/// Force-directed node-link view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ForceModeConfig {
    #[serde(flatten)]
    pub simulation: ForceConfig,
    /// Radius range `[min, max]` mapped from the rank extent.
    pub node_size: [f64; 2],
    /// Colors at `[min weight, 0, max weight]`.
    pub colors: [Color; 3],
    pub link_key: LinkKey,
    /// Horizontal label offset from the node center.
    pub label_offset: f64,
}

impl Default for ForceModeConfig {
    fn default() -> Self {
        Self {
            simulation: ForceConfig::default(),
            node_size: [5.0, 30.0],
            colors: [Color::RED, Color::YELLOW, Color::GREEN],
            link_key: LinkKey::Auto,
            label_offset: 8.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_client() {
        let config = VizConfig::default();
        assert_eq!(config.endpoint(), DEFAULT_ENDPOINT);

        let pack = config.packing.pack_config();
        assert_eq!(pack.size, [580.0, 580.0]);
        assert_eq!(pack.padding, 2.0);

        let zoom = config.packing.zoom_config();
        assert_eq!(zoom.diameter, 600.0);
        assert_eq!(zoom.duration_ms, 750.0);

        assert_eq!(config.force.simulation.size, [600.0, 400.0]);
        assert_eq!(config.force.simulation.charge, -30.0);
        assert_eq!(config.force.node_size, [5.0, 30.0]);
    }

    #[test]
    fn test_partial_json() {
        let config = VizConfig::from_json(
            r##"{
                "endpoint": "/api",
                "packing": { "durationMs": 300, "colors": ["red", "#eee", "blue"] },
                "force": { "charge": -120, "linkKey": "id", "nodeSize": [2, 8] }
            }"##,
        )
        .unwrap();

        assert_eq!(config.endpoint(), "/api");
        assert_eq!(config.packing.duration_ms, 300.0);
        assert_eq!(config.packing.diameter, 600.0);
        assert_eq!(config.packing.colors[1], Color::rgb(0xee, 0xee, 0xee));
        assert_eq!(config.force.simulation.charge, -120.0);
        assert_eq!(config.force.simulation.link_distance, 5.0);
        assert_eq!(config.force.link_key, LinkKey::Id);
        assert_eq!(config.force.node_size, [2.0, 8.0]);
        assert_eq!(config.force.label_offset, 8.0);
    }

    #[test]
    fn test_invalid_color_rejected() {
        assert!(VizConfig::from_json(r#"{"packing": {"colors": ["nope", "gray", "white"]}}"#).is_err());
    }
}
