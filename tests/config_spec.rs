use std::path::PathBuf;

use simscope::config::{ConfigError, ExplorerConfig};
use simscope::filter::{TimeRange, DEFAULT_PAGE_SIZE};
use simscope::prefs::*;
use speculate2::speculate;

speculate! {
    before {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
    }

    describe "explorer config" {
        it "uses defaults when the file does not exist" {
            let config = ExplorerConfig::try_load(&dir.path().join("config.json")).expect("Failed to load");
            assert_eq!(config, ExplorerConfig::default());
            assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        }

        it "round-trips through save and load" {
            let path = dir.path().join("nested").join("config.json");
            let config = ExplorerConfig {
                dataset_path: Some(PathBuf::from("/data/tree.json")),
                page_size: 50,
                time_range: TimeRange::Last90Days,
                preferences_path: None,
            };
            config.save(&path).expect("Failed to save");

            let loaded = ExplorerConfig::try_load(&path).expect("Failed to load");
            assert_eq!(loaded, config);
        }

        it "reports a malformed file" {
            let path = dir.path().join("config.json");
            std::fs::write(&path, "{ not json").unwrap();

            let result = ExplorerConfig::try_load(&path);
            assert!(matches!(result, Err(ConfigError::Parse { .. })));
        }

        it "seeds the session with the configured page size and time range" {
            let config = ExplorerConfig {
                page_size: 5,
                time_range: TimeRange::Last7Days,
                ..Default::default()
            };
            let state = config.initial_state();
            assert_eq!(state.page_size, 5);
            assert_eq!(state.filter.time_range, TimeRange::Last7Days);
            assert_eq!(state.page, 1);
        }
    }

    describe "preferences" {
        it "keeps values in memory" {
            let mut prefs = MemoryPreferences::new();
            assert_eq!(prefs.get("align.inst-1.x"), None);

            prefs.set("align.inst-1.x", "normalizedX");
            assert_eq!(prefs.get("align.inst-1.x").as_deref(), Some("normalizedX"));
            prefs.save().expect("Failed to save");
        }

        it "persists values to a json file" {
            let path = dir.path().join("prefs.json");
            let mut prefs = JsonFilePreferences::open(&path).expect("Failed to open");
            prefs.set(&align_key("inst-1", "y"), "percent");
            prefs.save().expect("Failed to save");

            let reopened = JsonFilePreferences::open(&path).expect("Failed to reopen");
            assert_eq!(reopened.get("align.inst-1.y").as_deref(), Some("percent"));
        }

        it "rejects a preferences file that is not a flat map" {
            let path = dir.path().join("prefs.json");
            std::fs::write(&path, "[1, 2]").unwrap();
            assert!(JsonFilePreferences::open(&path).is_err());
        }
    }
}
