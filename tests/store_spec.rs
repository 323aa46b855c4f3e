use std::io::Write;

use simscope::models::*;
use simscope::store::{Store, StoreError, TreeInput};
use speculate2::speculate;

const SAMPLE: &str = include_str!("fixtures/sample_tree.json");

fn sample_store() -> Store {
    Store::from_json_str(SAMPLE).expect("Failed to load sample tree")
}

fn sample_input() -> TreeInput {
    serde_json::from_str(SAMPLE).expect("Failed to parse sample tree")
}

speculate! {
    before {
        let store = sample_store();
    }

    describe "loading" {
        it "loads every category and instance" {
            let stats = store.stats();
            assert_eq!(stats.categories, 2);
            assert_eq!(stats.instances, 3);
            assert_eq!(stats.snapshots, 4);
        }

        it "loads from a file on disk" {
            let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
            file.write_all(SAMPLE.as_bytes()).expect("Failed to write temp file");

            let loaded = Store::load(file.path()).expect("Failed to load store");
            assert_eq!(loaded.categories(), store.categories());
        }

        it "reports a missing file as an io error" {
            let dir = tempfile::tempdir().expect("Failed to create temp dir");
            let result = Store::load(dir.path().join("missing.json"));
            assert!(matches!(result, Err(StoreError::Io(_))));
        }

        it "reports malformed json as a parse error" {
            let result = Store::from_json_str("{ \"categories\": [");
            assert!(matches!(result, Err(StoreError::Parse(_))));
        }
    }

    describe "normalization" {
        it "always holds a snapshot for the current version" {
            for instance in store.categories().iter().flat_map(|c| &c.instances) {
                let snapshot = instance
                    .versions
                    .get(&instance.version)
                    .expect("Missing current snapshot");
                assert_eq!(snapshot.folders, instance.folders);
                assert_eq!(snapshot.conditions, instance.conditions);
            }
        }

        it "tags folders with the version that owns them" {
            let instance = store.instance("inst-1").unwrap();
            assert!(instance.folders.iter().all(|f| f.belongs_to_version.as_deref() == Some("v2")));

            let v1 = instance.snapshot("v1").unwrap();
            assert_eq!(v1.folders[0].belongs_to_version.as_deref(), Some("v1"));
        }

        it "merges historical versions and history" {
            let instance = store.instance("inst-1").unwrap();
            assert_eq!(instance.versions.len(), 2);
            assert_eq!(instance.version_history.len(), 2);
            assert_eq!(instance.snapshot("v1").unwrap().summary.as_deref(), Some("First injector pass"));
        }

        it "is idempotent" {
            let again = Store::from_categories(store.categories().to_vec()).expect("Failed to renormalize");
            assert_eq!(again.categories(), store.categories());
        }

        it "ignores a historical snapshot that shadows the current version" {
            let mut input = sample_input();
            let mut shadow = input.historical_versions["inst-1"][0].clone();
            shadow.version = "v2".to_string();
            shadow.folders.clear();
            input.historical_versions.get_mut("inst-1").unwrap().push(shadow);

            let store = Store::from_input(input).unwrap();
            let instance = store.instance("inst-1").unwrap();
            assert_eq!(instance.snapshot("v2").unwrap().folders, instance.folders);
        }

        it "deduplicates history entries by label" {
            let mut input = sample_input();
            let duplicate = input.version_history["inst-1"][0].clone();
            input.version_history.get_mut("inst-1").unwrap().push(duplicate);

            let store = Store::from_input(input).unwrap();
            assert_eq!(store.instance("inst-1").unwrap().version_history.len(), 2);
        }
    }

    describe "validation" {
        it "rejects a preview variant for an unreferenced condition" {
            let mut input = sample_input();
            let file = &mut input.categories[0].instances[0].folders[1].files[0];
            file.condition_variants.insert("cond-9".to_string(), Preview::default());

            match Store::from_input(input) {
                Err(StoreError::UnknownVariantCondition { file_id, condition_id, .. }) => {
                    assert_eq!(file_id, "file-a");
                    assert_eq!(condition_id, "cond-9");
                }
                other => panic!("Expected UnknownVariantCondition, got {:?}", other.map(|_| ())),
            }
        }

        it "rejects duplicate instance ids across categories" {
            let mut input = sample_input();
            let clone = input.categories[0].instances[0].clone();
            input.categories[1].instances.push(clone);

            let result = Store::from_input(input);
            assert!(matches!(result, Err(StoreError::DuplicateId { kind: "instance", .. })));
        }

        it "rejects duplicate category ids" {
            let mut input = sample_input();
            input.categories[1].id = "cat-propulsion".to_string();

            let result = Store::from_input(input);
            assert!(matches!(result, Err(StoreError::DuplicateId { kind: "category", .. })));
        }

        it "rejects duplicate folder ids inside one snapshot" {
            let mut input = sample_input();
            let folders = &mut input.categories[0].instances[0].folders;
            let copy = folders[0].clone();
            folders.push(copy);

            let result = Store::from_input(input);
            assert!(matches!(result, Err(StoreError::DuplicateId { kind: "folder", .. })));
        }

        it "rejects an empty version label" {
            let mut input = sample_input();
            input.categories[1].instances[0].version = "  ".to_string();

            let result = Store::from_input(input);
            assert!(matches!(result, Err(StoreError::EmptyVersion { .. })));
        }

        it "rejects version data for an unknown instance" {
            let mut input = sample_input();
            input.version_history.insert("inst-404".to_string(), vec![]);

            let result = Store::from_input(input);
            assert!(matches!(result, Err(StoreError::UnknownInstance(id)) if id == "inst-404"));
        }
    }

    describe "lookups" {
        it "finds an instance with its category" {
            assert_eq!(store.instance("inst-2").unwrap().name, "Swirl study");
            assert_eq!(store.category_of("inst-3").unwrap().id, "cat-structures");
            assert!(store.instance("inst-404").is_none());
        }

        it "resolves a known version" {
            let active = store.resolve("inst-1", Some("v1")).unwrap();
            assert_eq!(active.version(), "v1");
            assert!(!active.fell_back);
            assert_eq!(active.folders()[0].id, "fold-res-v1");
        }

        it "falls back to the current version for an unknown label" {
            let active = store.resolve("inst-1", Some("v9")).unwrap();
            assert_eq!(active.version(), "v2");
            assert!(active.fell_back);
            assert_eq!(active.folders(), store.instance("inst-1").unwrap().folders.as_slice());
        }

        it "does not flag the default resolution as a fallback" {
            let active = store.resolve("inst-1", None).unwrap();
            assert_eq!(active.version(), "v2");
            assert!(!active.fell_back);
        }

        it "orders version labels by history date" {
            let instance = store.instance("inst-1").unwrap();
            assert_eq!(instance.ordered_version_labels(), vec!["v1", "v2"]);
            assert_eq!(instance.baseline_version(), Some("v1"));
        }

        it "resolves conditions from the snapshot first" {
            let active = store.resolve("inst-1", Some("v1")).unwrap();
            assert_eq!(active.condition("cond-1").unwrap().name, "Take-off");
            assert_eq!(active.condition("cond-2").unwrap().name, "Cruise");
        }

        it "parses non-numeric curve coordinates as missing" {
            let file = store.instance("inst-1").unwrap().folders[1].file("file-b").unwrap();
            let curve = file.curve_for(Some("cond-2")).unwrap();
            assert_eq!(curve.len(), 3);
            assert_eq!(curve.y_at(1), None);
            assert_eq!(curve.last_valid_y(), Some(1.45));
        }
    }
}
