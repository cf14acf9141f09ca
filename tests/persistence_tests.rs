mod common;

use common::{TestFixture, names};
use envledger::{
    Environment, EnvLedger, ImportFormat, MemoryStorage, SortOrder, StorageBackend,
    VariableUpdate,
};
use std::fs;
use std::sync::Arc;

#[test]
fn test_state_survives_reopen() {
    let fixture = TestFixture::new();
    let (created_id, draft_id) = {
        let mut ledger = fixture.seeded_ledger();
        let id = ledger.variables()[1].id.clone();
        ledger
            .update_variable(&id, &VariableUpdate::new().description(Some("Rotated".into())))
            .unwrap();
        let draft = ledger.change_sets().current_change_set().unwrap().id.clone();
        (id, draft)
    };

    let ledger = fixture.ledger();
    assert_eq!(ledger.variables().len(), 4);
    assert_eq!(
        ledger.variable(&created_id).unwrap().description.as_deref(),
        Some("Rotated")
    );
    let draft = ledger.change_sets().current_change_set().unwrap();
    assert_eq!(draft.id, draft_id);
    assert_eq!(draft.changes.len(), 5);
    assert_eq!(ledger.history().entries().len(), 5);
    assert!(
        fixture.base_path.join("env-variables.json").is_file(),
        "variables are stored one key per file"
    );
}

#[test]
fn test_selection_persists_but_reveal_does_not() {
    let fixture = TestFixture::new();
    let secret = {
        let mut ledger = fixture.seeded_ledger();
        let id = ledger.variables()[0].id.clone();
        ledger.selection_mut().select(&id, false);
        ledger.selection_mut().reveal(&id);
        assert!(ledger.selection().is_revealed(&id));
        id
    };

    let ledger = fixture.ledger();
    assert_eq!(ledger.selection().selected_ids(), [secret.clone()].as_slice());
    assert!(ledger.selection().bulk_mode());
    assert!(!ledger.selection().is_revealed(&secret));
}

#[test]
fn test_filters_and_flags_persist() {
    let fixture = TestFixture::new();
    {
        let mut ledger = fixture.seeded_ledger();
        ledger.search_mut().set_search_query("api");
        ledger.search_mut().set_sort_order(SortOrder::Desc);
        ledger.environments_mut().toggle(Environment::Development);
        ledger.walkthrough_mut().mark_complete();
    }

    let mut ledger = fixture.ledger();
    assert_eq!(ledger.search().filters().search_query, "api");
    assert_eq!(ledger.search().filters().sort_order, SortOrder::Desc);
    assert_eq!(names(&ledger.filtered_variables()), vec!["API_KEY"]);
    assert_eq!(
        ledger.environments().selected(),
        [Environment::Preview, Environment::Production].as_slice()
    );
    assert!(ledger.walkthrough().has_completed());

    ledger.walkthrough_mut().reset();
    assert!(!fixture.ledger().walkthrough().has_completed());
}

#[test]
fn test_malformed_state_falls_back_to_defaults() {
    let fixture = TestFixture::new();
    fs::write(fixture.base_path.join("env-variables.json"), "{not json").unwrap();
    fs::write(fixture.base_path.join("env-history.json"), "[1, 2, 3]").unwrap();

    let mut ledger = fixture.ledger();
    assert!(ledger.variables().is_empty());
    assert!(ledger.history().entries().is_empty());

    ledger
        .import(
            "HOST=localhost\nPORT=8080",
            ImportFormat::KeyValue,
            &[Environment::Development],
            false,
        )
        .unwrap();
    assert_eq!(names(fixture.ledger().variables()), vec!["HOST", "PORT"]);
}

#[test]
fn test_write_failures_keep_in_memory_state() {
    let storage = Arc::new(MemoryStorage::with_quota(64));
    let backend: Arc<dyn StorageBackend> = storage.clone();
    let mut ledger = EnvLedger::open(backend.clone());

    let var = ledger
        .create_variable(
            envledger::NewVariable::new("LONG_VALUE")
                .value(Environment::Production, "x".repeat(200)),
        )
        .unwrap();
    assert_eq!(ledger.variable(&var.id).unwrap().name, "LONG_VALUE");
    assert!(!storage.contains("env-variables"));

    let reopened = EnvLedger::open(backend);
    assert!(reopened.variables().is_empty());
}
