use serde::{Deserialize, Deserializer, Serialize};

/// Pre-computed preview data attached to a file.
///
/// Curves and metrics come straight from the input data set; nothing in the
/// crate derives them from physics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preview {
    #[serde(default)]
    pub curves: Vec<CurveSeries>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<PreviewMetric>,
}

impl Preview {
    /// The series used for aggregation and alignment. Only the first one counts.
    pub fn first_curve(&self) -> Option<&CurveSeries> {
        self.curves.first()
    }
}

/// A named, ordered `(x, y)` series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurveSeries {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default)]
    pub points: Vec<CurvePoint>,
}

impl CurveSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Y values that can take part in aggregation, in series order.
    pub fn valid_ys(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().filter_map(|p| p.y)
    }

    /// The y of the last point that carries a usable value.
    pub fn last_valid_y(&self) -> Option<f64> {
        self.points.iter().rev().find_map(|p| p.y)
    }

    pub fn y_at(&self, index: usize) -> Option<f64> {
        self.points.get(index).and_then(|p| p.y)
    }

    pub fn x_at(&self, index: usize) -> Option<f64> {
        self.points.get(index).and_then(|p| p.x)
    }
}

/// One curve sample.
///
/// Coordinates that are missing, non-numeric or non-finite deserialize to
/// `None` and are skipped by aggregation instead of failing the load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub x: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub y: Option<f64>,
}

impl CurvePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
        }
    }
}

/// A scalar headline value shown next to a preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewMetric {
    pub label: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(parsed.filter(|v| v.is_finite()))
}
