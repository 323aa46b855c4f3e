use chrono::{TimeZone, Utc};
use simscope::clock::FixedClock;
use simscope::kpi::*;
use simscope::models::*;
use simscope::{Explorer, Store};
use speculate2::speculate;

const SAMPLE: &str = include_str!("fixtures/sample_tree.json");

fn sample_explorer() -> Explorer {
    let store = Store::from_json_str(SAMPLE).expect("Failed to load sample tree");
    Explorer::with_clock(store, FixedClock(Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap()))
}

fn value(metric: Metric) -> f64 {
    metric.value().expect("Metric unavailable")
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}

fn curve_file(id: &str, ys: &[Option<f64>]) -> File {
    let points = ys
        .iter()
        .enumerate()
        .map(|(i, y)| CurvePoint { x: Some(i as f64), y: *y })
        .collect();
    File {
        id: id.to_string(),
        name: format!("{}.csv", id),
        file_type: "csv".to_string(),
        version: "v1".to_string(),
        size: String::new(),
        status: FileStatus::Completed,
        created_by: "lin".to_string(),
        created_at: "2024-06-01".to_string(),
        updated_at: None,
        last_run_at: None,
        description: None,
        tags: Vec::new(),
        conditions: vec!["cond-1".to_string()],
        condition_variants: Default::default(),
        preview: Some(Preview {
            curves: vec![CurveSeries {
                name: "thrust".to_string(),
                unit: None,
                points,
            }],
            metrics: Vec::new(),
        }),
    }
}

speculate! {
    before {
        let mut explorer = sample_explorer();
        explorer.select_instance("inst-1");
    }

    describe "aggregate" {
        it "pools every point into the average" {
            let files = vec![
                curve_file("x", &[Some(1.0), Some(2.0), Some(3.0)]),
                curve_file("y", &[Some(4.0), Some(5.0)]),
            ];
            let stats = aggregate("cond-1", &files);
            assert_eq!(value(stats.metrics.avg), 3.0);
            assert_eq!(value(stats.metrics.peak), 5.0);
            assert_eq!(value(stats.metrics.end), 4.0);
            assert_eq!(stats.curves, 2);
            assert_eq!(stats.points, 5);
        }

        it "skips missing points and empty curves" {
            let files = vec![
                curve_file("x", &[Some(2.0), None]),
                curve_file("y", &[None]),
            ];
            let stats = aggregate("cond-1", &files);
            assert_eq!(value(stats.metrics.end), 2.0);
            assert_eq!(stats.curves, 1);
        }

        it "reports unavailable without curve data" {
            let stats = aggregate("cond-1", &[curve_file("x", &[])]);
            assert_eq!(stats.metrics.peak, Metric::Unavailable);
            assert_eq!(stats.metrics.avg, Metric::Unavailable);
            assert_eq!(stats.metrics.end, Metric::Unavailable);
        }

        it "ignores files that do not reference the condition" {
            let stats = aggregate("cond-2", &[curve_file("x", &[Some(1.0)])]);
            assert_eq!(stats.curves, 0);
        }
    }

    describe "get_kpi_table" {
        it "aggregates base previews for cond-1" {
            let table = explorer.get_kpi_table(&["cond-1"], None).unwrap();
            let row = table.row("cond-1").unwrap();
            assert_eq!(row.condition_name, "Take-off");
            assert_eq!(value(row.stats.metrics.avg), 3.0);
            assert_eq!(value(row.stats.metrics.peak), 5.0);
            assert_eq!(value(row.stats.metrics.end), 4.0);
        }

        it "uses condition variants and averages curve ends" {
            let table = explorer.get_kpi_table(&["cond-2"], None).unwrap();
            let row = table.row("cond-2").unwrap();
            assert_close(value(row.stats.metrics.end), 1.475);
            assert_close(value(row.stats.metrics.peak), 1.5);
            assert_eq!(row.stats.points, 4);
        }

        it "reports unavailable metrics as null" {
            let table = explorer.get_kpi_table(&["cond-3"], None).unwrap();
            let row = table.row("cond-3").unwrap();
            assert_eq!(row.stats.metrics.avg, Metric::Unavailable);
            assert_eq!(row.intensity.avg, None);

            let json = serde_json::to_value(row).unwrap();
            assert!(json["avg"].is_null());
        }

        it "computes signed deltas against the baseline" {
            let table = explorer.get_kpi_table(&["cond-1", "cond-2"], Some("cond-1")).unwrap();
            let delta = table.row("cond-2").unwrap().delta.unwrap();
            assert_close(value(delta.end), 1.475 - 4.0);
            assert_eq!(value(table.row("cond-1").unwrap().delta.unwrap().end), 0.0);
        }

        it "aggregates a baseline outside the requested conditions" {
            let table = explorer.get_kpi_table(&["cond-2"], Some("cond-1")).unwrap();
            assert_eq!(table.rows.len(), 1);
            assert_eq!(value(table.baseline.unwrap().metrics.avg), 3.0);
        }

        it "reports unavailable deltas against an empty baseline" {
            let table = explorer.get_kpi_table(&["cond-1"], Some("cond-3")).unwrap();
            assert_eq!(table.row("cond-1").unwrap().delta.unwrap().avg, Metric::Unavailable);
        }

        it "normalizes intensities over the selected conditions" {
            let table = explorer.get_kpi_table(&["cond-1", "cond-2", "cond-3"], None).unwrap();
            assert_eq!(table.row("cond-1").unwrap().intensity.peak, Some(1.0));
            assert_eq!(table.row("cond-2").unwrap().intensity.peak, Some(0.0));
            assert_eq!(table.row("cond-3").unwrap().intensity.peak, None);
            assert_eq!(table.ranges.peak, Some(MetricRange { min: 1.5, max: 5.0 }));
        }

        it "returns the neutral intensity for a single condition" {
            let table = explorer.get_kpi_table(&["cond-1"], None).unwrap();
            assert_eq!(table.row("cond-1").unwrap().intensity.end, Some(NEUTRAL_INTENSITY));
        }

        it "ignores repeated condition ids" {
            let table = explorer.get_kpi_table(&["cond-1", "cond-1"], None).unwrap();
            assert_eq!(table.rows.len(), 1);
        }

        it "follows the active version" {
            let current = explorer.get_kpi_table(&["cond-1"], None).unwrap();
            explorer.change_version("inst-1", "v1");
            let historical = explorer.get_kpi_table(&["cond-1"], None).unwrap();

            assert_eq!(historical.version, "v1");
            assert_close(value(historical.row("cond-1").unwrap().stats.metrics.avg), 1.45);
            assert_ne!(current, historical);
        }

        it "returns the same table from the cache" {
            let first = explorer.get_kpi_table(&["cond-1", "cond-2"], Some("cond-1")).unwrap();
            let second = explorer.get_kpi_table(&["cond-1", "cond-2"], Some("cond-1")).unwrap();
            assert_eq!(first, second);
        }

        it "returns None without a selected instance" {
            let explorer = sample_explorer();
            assert!(explorer.get_kpi_table(&["cond-1"], None).is_none());
        }
    }
}
