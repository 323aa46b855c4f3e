use serde::{Deserialize, Serialize};

/// A named operating point (e.g. take-off, cruise) that files can be tagged with.
///
/// Condition ids are scoped to the instance that defines them. Two instances
/// may both define `cond-1` with unrelated parameter sets, so callers must not
/// treat an id as globally meaningful.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ConditionParameter>,
}

/// One `(name, value, unit?)` entry of a condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionParameter {
    pub name: String,
    pub value: ParameterValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Parameter values are either numeric (`1.2`) or free text (`"SLS"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Number(f64),
    Text(String),
}
