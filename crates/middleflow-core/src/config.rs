//! Flow configuration.

use serde::{Deserialize, Serialize};

/// Per-flow settings.
///
/// Attached to a flow with `with_config`. The name is carried on every log
/// event the flow emits so several flows can be told apart in one trace.
///
/// # 使用例
/// ```ignore
/// let config: FlowConfig = serde_json::from_str(r#"{ "name": "faults" }"#)?;
/// let chain = ResponsibilityChain::<Fault, bool>::default().with_config(config);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    pub name: String,
}

impl FlowConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            name: "flow".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: FlowConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, FlowConfig::default());
    }

    #[test]
    fn name_is_read_from_json() {
        let config: FlowConfig = serde_json::from_str(r#"{ "name": "faults" }"#).unwrap();
        assert_eq!(config.name, "faults");
    }
}
