//! Reshape per-condition curves into one aligned series for overlay charts.

use serde::{Deserialize, Serialize};

use crate::models::{CurveSeries, File};
use crate::store::ActiveSnapshot;

/// How the X value of each row is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlignMode {
    /// The x of the representative curve at the row index.
    #[default]
    #[serde(rename = "original")]
    Original,
    /// `i / (longest - 1)`, so every overlay spans `[0, 1]`.
    #[serde(rename = "normalizedX")]
    NormalizedX,
}

impl AlignMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::NormalizedX => "normalizedX",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "original" => Some(Self::Original),
            "normalizedX" | "normalized-x" => Some(Self::NormalizedX),
            _ => None,
        }
    }
}

/// How Y values are expressed relative to the baseline column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YNormMode {
    #[default]
    None,
    Delta,
    Percent,
}

impl YNormMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Delta => "delta",
            Self::Percent => "percent",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "none" => Some(Self::None),
            "delta" => Some(Self::Delta),
            "percent" => Some(Self::Percent),
            _ => None,
        }
    }
}

/// One column of the aligned series and the file backing it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignedColumn {
    pub condition_id: String,
    pub file_id: Option<String>,
    pub file_name: Option<String>,
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedRow {
    pub index: usize,
    pub x: Option<f64>,
    /// One value per column; `None` means the curve has no data at this row.
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignedSeries {
    pub baseline_id: Option<String>,
    pub align_mode: AlignMode,
    pub y_mode: YNormMode,
    pub columns: Vec<AlignedColumn>,
    pub rows: Vec<AlignedRow>,
}

impl AlignedSeries {
    /// Value of `condition_id`'s column at `row`.
    pub fn value(&self, row: usize, condition_id: &str) -> Option<f64> {
        let column = self
            .columns
            .iter()
            .position(|c| c.condition_id == condition_id)?;
        self.rows.get(row)?.values.get(column).copied().flatten()
    }
}

/// The first file (in folder order) with a non-empty curve for `condition_id`.
pub fn representative<'a>(
    files: impl IntoIterator<Item = &'a File>,
    condition_id: &str,
) -> Option<(&'a File, &'a CurveSeries)> {
    files
        .into_iter()
        .filter(|f| f.references_condition(condition_id))
        .find_map(|f| {
            f.curve_for(Some(condition_id))
                .filter(|c| !c.is_empty())
                .map(|c| (f, c))
        })
}

/// Align `curves` row by row.
///
/// `baseline` is only consulted by the `Delta` and `Percent` modes; without
/// one those modes fall back to raw values. Rows past a curve's end are
/// `None`, as are normalized values whose baseline point is missing.
pub fn align(
    curves: &[Option<&CurveSeries>],
    baseline: Option<Option<&CurveSeries>>,
    align_mode: AlignMode,
    y_mode: YNormMode,
) -> Vec<AlignedRow> {
    let longest = curves.iter().flatten().map(|c| c.len()).max().unwrap_or(0);
    let y_mode = if baseline.is_none() { YNormMode::None } else { y_mode };

    (0..longest)
        .map(|index| {
            let x = match align_mode {
                AlignMode::Original => curves.iter().flatten().find_map(|c| c.x_at(index)),
                AlignMode::NormalizedX if longest <= 1 => Some(0.0),
                AlignMode::NormalizedX => Some(index as f64 / (longest - 1) as f64),
            };

            let baseline_y = baseline.flatten().and_then(|b| {
                let clamped = index.min(b.len().checked_sub(1)?);
                b.y_at(clamped)
            });

            let values = curves
                .iter()
                .map(|curve| {
                    let y = curve.and_then(|c| c.y_at(index))?;
                    normalize_y(y, baseline_y, y_mode)
                })
                .collect();

            AlignedRow { index, x, values }
        })
        .collect()
}

/// Express `y` relative to `baseline_y` under `mode`.
///
/// Percent mode defines a zero baseline as 0% so the result is always finite.
pub fn normalize_y(y: f64, baseline_y: Option<f64>, mode: YNormMode) -> Option<f64> {
    match mode {
        YNormMode::None => Some(y),
        YNormMode::Delta => baseline_y.map(|b| y - b),
        YNormMode::Percent => baseline_y.map(|b| if b == 0.0 { 0.0 } else { (y / b - 1.0) * 100.0 }),
    }
}

/// Build the aligned series for `condition_ids` over the files of `active`.
pub fn build_series(
    active: &ActiveSnapshot<'_>,
    condition_ids: &[&str],
    baseline_id: Option<&str>,
    align_mode: AlignMode,
    y_mode: YNormMode,
) -> AlignedSeries {
    let representatives: Vec<Option<(&File, &CurveSeries)>> = condition_ids
        .iter()
        .map(|id| representative(active.files(), id))
        .collect();
    let baseline =
        baseline_id.map(|id| representative(active.files(), id).map(|(_, curve)| curve));

    let curves: Vec<Option<&CurveSeries>> = representatives
        .iter()
        .map(|r| r.map(|(_, curve)| curve))
        .collect();
    let rows = align(&curves, baseline, align_mode, y_mode);

    let columns = condition_ids
        .iter()
        .zip(&representatives)
        .map(|(id, rep)| AlignedColumn {
            condition_id: id.to_string(),
            file_id: rep.map(|(f, _)| f.id.clone()),
            file_name: rep.map(|(f, _)| f.name.clone()),
            length: rep.map_or(0, |(_, c)| c.len()),
        })
        .collect();

    AlignedSeries {
        baseline_id: baseline_id.map(str::to_string),
        align_mode,
        y_mode,
        columns,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CurvePoint;

    fn curve(points: &[(f64, f64)]) -> CurveSeries {
        CurveSeries {
            name: "thrust".to_string(),
            unit: None,
            points: points.iter().map(|&(x, y)| CurvePoint::new(x, y)).collect(),
        }
    }

    #[test]
    fn test_percent_with_zero_baseline_is_zero() {
        for y in [-3.0, 0.0, 1.0, 1e9] {
            assert_eq!(normalize_y(y, Some(0.0), YNormMode::Percent), Some(0.0));
        }
    }

    #[test]
    fn test_percent_relative_to_baseline() {
        assert_eq!(normalize_y(1.1, Some(1.0), YNormMode::Percent).map(|v| (v * 1e9).round() / 1e9), Some(10.0));
        assert_eq!(normalize_y(0.5, Some(1.0), YNormMode::Delta), Some(-0.5));
    }

    #[test]
    fn test_missing_points_are_none() {
        let short = curve(&[(0.0, 1.0)]);
        let long = curve(&[(0.0, 2.0), (1.0, 3.0), (2.0, 4.0)]);
        let rows = align(&[Some(&short), Some(&long)], None, AlignMode::Original, YNormMode::None);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].values, vec![None, Some(4.0)]);
        assert_eq!(rows[2].x, Some(2.0));
    }

    #[test]
    fn test_normalized_x_spans_unit_interval() {
        let long = curve(&[(10.0, 1.0), (20.0, 1.0), (30.0, 1.0), (40.0, 1.0), (50.0, 1.0)]);
        let rows = align(&[Some(&long)], None, AlignMode::NormalizedX, YNormMode::None);
        let xs: Vec<_> = rows.iter().map(|r| r.x).collect();
        assert_eq!(xs, vec![Some(0.0), Some(0.25), Some(0.5), Some(0.75), Some(1.0)]);

        let single = curve(&[(7.0, 1.0)]);
        let rows = align(&[Some(&single)], None, AlignMode::NormalizedX, YNormMode::None);
        assert_eq!(rows[0].x, Some(0.0));
    }

    #[test]
    fn test_delta_clamps_to_last_baseline_point() {
        let baseline = curve(&[(0.0, 1.0), (1.0, 2.0)]);
        let candidate = curve(&[(0.0, 1.5), (1.0, 2.5), (2.0, 3.5), (3.0, 4.5)]);
        let rows = align(
            &[Some(&candidate)],
            Some(Some(&baseline)),
            AlignMode::Original,
            YNormMode::Delta,
        );
        let ys: Vec<_> = rows.iter().map(|r| r.values[0]).collect();
        assert_eq!(ys, vec![Some(0.5), Some(0.5), Some(1.5), Some(2.5)]);
    }

    #[test]
    fn test_baseline_without_curve_yields_none() {
        let candidate = curve(&[(0.0, 1.5)]);
        let rows = align(&[Some(&candidate)], Some(None), AlignMode::Original, YNormMode::Percent);
        assert_eq!(rows[0].values, vec![None]);
    }
}
