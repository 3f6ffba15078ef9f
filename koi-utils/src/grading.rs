//! Result shape for the AI grading feature.

use serde::{Deserialize, Serialize};

/// Scores a show judge would assign, out of 100, plus a short free-text
/// verdict. Field names stay camelCase on the wire because the response
/// schema sent to the AI service requires them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct GradingResult {
    pub body_shape: f64,
    pub pattern: f64,
    pub quality: f64,
    pub summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grading_result_uses_camel_case_on_the_wire() {
        let parsed: GradingResult = serde_json::from_str(
            r#"{"bodyShape": 82, "pattern": 74, "quality": 88, "summary": "骨架紮實"}"#,
        )
        .unwrap();
        assert_eq!(parsed.body_shape, 82.0);
        assert_eq!(parsed.summary, "骨架紮實");
    }
}
