use serde::{Deserialize, Serialize};

/// Parameters for one keychain generation.
///
/// Field names are camelCase on the wire to match the browser client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Bar heights in placement order. Position `i` determines where bar `i`
    /// is cut into the base model.
    pub bar_heights: Vec<f64>,
    /// Base model filename or path. Resolved against the uploads directory
    /// first, then used as a path, then against the base-models directory.
    pub base_model: String,
    /// Extrusion depth applied to every bar feature.
    pub extrusion_height: f64,
}
