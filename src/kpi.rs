//! Per-condition KPI aggregation over curve data.
//!
//! For every condition, the first curve series of each file that references it
//! contributes:
//!
//! - `peak`: the maximum y over all points of all curves.
//! - `avg`: the mean of all points pooled together. A condition backed by more
//!   samples weighs proportionally more; this is not a mean of per-curve means.
//! - `end`: the mean, over contributing curves, of each curve's last y.
//!
//! Conditions without any curve data report [`Metric::Unavailable`] for all
//! three, never zero.

use serde::Serialize;

use crate::models::File;
use crate::store::ActiveSnapshot;

/// Intensity reported when every selected value for a metric is the same.
pub const NEUTRAL_INTENSITY: f64 = 0.5;

/// A numeric metric or the explicit "no data" sentinel. Serializes as a number
/// or `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Metric {
    Value(f64),
    Unavailable,
}

impl Metric {
    pub fn from_option(value: Option<f64>) -> Self {
        value.map_or(Self::Unavailable, Self::Value)
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            Self::Unavailable => None,
        }
    }

    /// `self - baseline`, keeping the sign. Unavailable if either side is.
    pub fn delta(&self, baseline: Metric) -> Metric {
        match (self, baseline) {
            (Self::Value(v), Self::Value(b)) => Self::Value(v - b),
            _ => Self::Unavailable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKey {
    Peak,
    Avg,
    End,
}

/// One value per metric key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSet<T> {
    pub peak: T,
    pub avg: T,
    pub end: T,
}

impl<T> MetricSet<T> {
    pub fn from_fn(mut f: impl FnMut(MetricKey) -> T) -> Self {
        Self {
            peak: f(MetricKey::Peak),
            avg: f(MetricKey::Avg),
            end: f(MetricKey::End),
        }
    }
}

impl<T: Copy> MetricSet<T> {
    pub fn get(&self, key: MetricKey) -> T {
        match key {
            MetricKey::Peak => self.peak,
            MetricKey::Avg => self.avg,
            MetricKey::End => self.end,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(MetricKey, T) -> U) -> MetricSet<U> {
        MetricSet {
            peak: f(MetricKey::Peak, self.peak),
            avg: f(MetricKey::Avg, self.avg),
            end: f(MetricKey::End, self.end),
        }
    }
}

/// Aggregated statistics for one condition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionStats {
    #[serde(flatten)]
    pub metrics: MetricSet<Metric>,
    /// Curves that contributed at least one valid point.
    pub curves: usize,
    /// Valid points pooled into `avg`.
    pub points: usize,
}

/// Aggregate the curves of every file in `files` that references `condition_id`.
///
/// Each file contributes its preview variant for the condition when it has
/// one, else its base preview. Points without a usable y are skipped.
pub fn aggregate<'a>(condition_id: &str, files: impl IntoIterator<Item = &'a File>) -> ConditionStats {
    let mut peak: Option<f64> = None;
    let mut sum = 0.0;
    let mut points = 0usize;
    let mut end_sum = 0.0;
    let mut curves = 0usize;

    let referencing = files
        .into_iter()
        .filter(|f| f.references_condition(condition_id));
    for curve in referencing.filter_map(|f| f.curve_for(Some(condition_id))) {
        let Some(last) = curve.last_valid_y() else {
            continue;
        };

        for y in curve.valid_ys() {
            peak = Some(peak.map_or(y, |p| p.max(y)));
            sum += y;
            points += 1;
        }
        end_sum += last;
        curves += 1;
    }

    let metrics = if curves == 0 {
        MetricSet::from_fn(|_| Metric::Unavailable)
    } else {
        MetricSet {
            peak: Metric::from_option(peak),
            avg: Metric::Value(sum / points as f64),
            end: Metric::Value(end_sum / curves as f64),
        }
    };

    ConditionStats {
        metrics,
        curves,
        points,
    }
}

/// Min/max of the available values of one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricRange {
    pub min: f64,
    pub max: f64,
}

impl MetricRange {
    pub fn of(values: impl IntoIterator<Item = Metric>) -> Option<Self> {
        values
            .into_iter()
            .filter_map(|m| m.value())
            .fold(None, |range: Option<Self>, v| {
                Some(match range {
                    None => Self { min: v, max: v },
                    Some(r) => Self {
                        min: r.min.min(v),
                        max: r.max.max(v),
                    },
                })
            })
    }

    /// Linear 0–1 position of `value` in the range. A degenerate range
    /// (min == max) yields [`NEUTRAL_INTENSITY`].
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span == 0.0 {
            NEUTRAL_INTENSITY
        } else {
            (value - self.min) / span
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiRow {
    pub condition_id: String,
    pub condition_name: String,
    #[serde(flatten)]
    pub stats: ConditionStats,
    /// `value - baseline` per metric, present when a baseline is designated.
    pub delta: Option<MetricSet<Metric>>,
    /// 0–1 position within the selected conditions' range, per metric.
    pub intensity: MetricSet<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiTable {
    pub instance_id: String,
    pub version: String,
    pub baseline_id: Option<String>,
    pub baseline: Option<ConditionStats>,
    pub rows: Vec<KpiRow>,
    pub ranges: MetricSet<Option<MetricRange>>,
}

impl KpiTable {
    pub fn row(&self, condition_id: &str) -> Option<&KpiRow> {
        self.rows.iter().find(|r| r.condition_id == condition_id)
    }
}

/// Build the KPI table for `condition_ids` over the files of `active`.
///
/// Ranges (and therefore intensities) only consider the requested
/// conditions. The baseline is aggregated even when it is not one of them.
pub fn build_table(active: &ActiveSnapshot<'_>, condition_ids: &[&str], baseline_id: Option<&str>) -> KpiTable {
    let mut seen = Vec::with_capacity(condition_ids.len());
    for id in condition_ids {
        if !seen.contains(id) {
            seen.push(*id);
        }
    }

    let stats: Vec<(&str, ConditionStats)> = seen
        .iter()
        .map(|id| (*id, aggregate(id, active.files())))
        .collect();
    let baseline = baseline_id.map(|id| {
        stats
            .iter()
            .find(|(cid, _)| *cid == id)
            .map(|(_, s)| *s)
            .unwrap_or_else(|| aggregate(id, active.files()))
    });

    let ranges = MetricSet::from_fn(|key| {
        MetricRange::of(stats.iter().map(|(_, s)| s.metrics.get(key)))
    });

    let rows = stats
        .into_iter()
        .map(|(id, s)| KpiRow {
            condition_id: id.to_string(),
            condition_name: active
                .condition(id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| id.to_string()),
            stats: s,
            delta: baseline.map(|b| s.metrics.map(|key, m| m.delta(b.metrics.get(key)))),
            intensity: s.metrics.map(|key, m| {
                ranges
                    .get(key)
                    .and_then(|range| m.value().map(|v| range.normalize(v)))
            }),
        })
        .collect();

    KpiTable {
        instance_id: active.instance.id.clone(),
        version: active.version().to_string(),
        baseline_id: baseline_id.map(str::to_string),
        baseline,
        rows,
        ranges,
    }
}
