use chrono::{TimeZone, Utc};
use simscope::align::*;
use simscope::clock::FixedClock;
use simscope::{Explorer, Store};
use speculate2::speculate;

const SAMPLE: &str = include_str!("fixtures/sample_tree.json");

fn sample_explorer() -> Explorer {
    let store = Store::from_json_str(SAMPLE).expect("Failed to load sample tree");
    Explorer::with_clock(store, FixedClock(Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap()))
}

fn column(series: &AlignedSeries, condition_id: &str) -> Vec<Option<f64>> {
    (0..series.rows.len())
        .map(|i| series.value(i, condition_id))
        .collect()
}

speculate! {
    before {
        let mut explorer = sample_explorer();
        explorer.select_instance("inst-1");
    }

    describe "modes" {
        it "parses wire names" {
            assert_eq!(AlignMode::from_str("normalizedX"), Some(AlignMode::NormalizedX));
            assert_eq!(AlignMode::from_str("original"), Some(AlignMode::Original));
            assert_eq!(YNormMode::from_str("percent"), Some(YNormMode::Percent));
            assert_eq!(YNormMode::from_str("ratio"), None);
        }
    }

    describe "get_aligned_series" {
        it "picks the first file with a curve as the representative" {
            let series = explorer
                .get_aligned_series(&["cond-1", "cond-2"], None, AlignMode::Original, YNormMode::None)
                .unwrap();
            assert_eq!(series.columns[0].file_id.as_deref(), Some("file-a"));
            assert_eq!(series.columns[1].file_id.as_deref(), Some("file-a"));
            assert_eq!(series.columns[1].length, 2);
        }

        it "pads shorter curves with nulls" {
            let series = explorer
                .get_aligned_series(&["cond-1", "cond-2"], None, AlignMode::Original, YNormMode::None)
                .unwrap();
            assert_eq!(series.rows.len(), 3);
            assert_eq!(column(&series, "cond-1"), vec![Some(1.0), Some(2.0), Some(3.0)]);
            assert_eq!(column(&series, "cond-2"), vec![Some(1.0), Some(1.5), None]);

            let xs: Vec<_> = series.rows.iter().map(|r| r.x).collect();
            assert_eq!(xs, vec![Some(0.0), Some(1.0), Some(2.0)]);
        }

        it "normalizes x over the longest curve" {
            let series = explorer
                .get_aligned_series(&["cond-1", "cond-2"], None, AlignMode::NormalizedX, YNormMode::None)
                .unwrap();
            let xs: Vec<_> = series.rows.iter().map(|r| r.x).collect();
            assert_eq!(xs, vec![Some(0.0), Some(0.5), Some(1.0)]);
        }

        it "subtracts the baseline, clamping to its last point" {
            let series = explorer
                .get_aligned_series(&["cond-1"], Some("cond-2"), AlignMode::Original, YNormMode::Delta)
                .unwrap();
            assert_eq!(column(&series, "cond-1"), vec![Some(0.0), Some(0.5), Some(1.5)]);
        }

        it "expresses values as a percentage of the baseline" {
            let series = explorer
                .get_aligned_series(&["cond-2"], Some("cond-1"), AlignMode::Original, YNormMode::Percent)
                .unwrap();
            assert_eq!(column(&series, "cond-2"), vec![Some(0.0), Some(-25.0)]);
        }

        it "keeps raw values without a baseline" {
            let series = explorer
                .get_aligned_series(&["cond-2"], None, AlignMode::Original, YNormMode::Percent)
                .unwrap();
            assert_eq!(column(&series, "cond-2"), vec![Some(1.0), Some(1.5)]);
        }

        it "yields nulls against a baseline without a curve" {
            let series = explorer
                .get_aligned_series(&["cond-1"], Some("cond-3"), AlignMode::Original, YNormMode::Delta)
                .unwrap();
            assert_eq!(column(&series, "cond-1"), vec![None, None, None]);
        }

        it "keeps a column for a condition without curve data" {
            let series = explorer
                .get_aligned_series(&["cond-1", "cond-3"], None, AlignMode::Original, YNormMode::None)
                .unwrap();
            assert_eq!(series.columns[1].file_id, None);
            assert_eq!(series.columns[1].length, 0);
            assert_eq!(column(&series, "cond-3"), vec![None, None, None]);
        }

        it "serializes missing points as null" {
            let series = explorer
                .get_aligned_series(&["cond-1", "cond-2"], None, AlignMode::Original, YNormMode::None)
                .unwrap();
            let json = serde_json::to_value(&series).unwrap();
            assert!(json["rows"][2]["values"][1].is_null());
            assert_eq!(json["alignMode"], "original");
        }

        it "returns the same series from the cache and recomputes on mode change" {
            let first = explorer
                .get_aligned_series(&["cond-1"], None, AlignMode::Original, YNormMode::None)
                .unwrap();
            let again = explorer
                .get_aligned_series(&["cond-1"], None, AlignMode::Original, YNormMode::None)
                .unwrap();
            let normalized = explorer
                .get_aligned_series(&["cond-1"], None, AlignMode::NormalizedX, YNormMode::None)
                .unwrap();

            assert_eq!(first, again);
            assert_ne!(first, normalized);
        }

        it "returns an empty series when no condition has data" {
            let series = explorer
                .get_aligned_series(&["cond-3"], None, AlignMode::Original, YNormMode::None)
                .unwrap();
            assert!(series.rows.is_empty());
        }
    }
}
