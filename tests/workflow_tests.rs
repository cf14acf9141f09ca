mod common;

use common::{TestFixture, names};
use envledger::{
    ChangeAction, ChangeDraft, ChangeSetStatus, ConflictKind, Environment, HISTORY_LIMIT,
    HistoryAction, NewVariable, REVEAL_DURATION, SortBy, SortOrder, TransferKind,
    TransferOperation, VariableUpdate,
};

#[test]
fn test_mutations_share_one_draft() {
    let fixture = TestFixture::new();
    let mut ledger = fixture.seeded_ledger();

    let sets = ledger.change_sets().change_sets();
    assert_eq!(sets.len(), 1);
    assert!(sets[0].is_draft());
    assert_eq!(
        sets[0].changes.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
        vec!["DATABASE_URL", "API_KEY", "NODE_ENV", "DEBUG_MODE"]
    );

    let first = ledger.change_sets_mut().get_or_create_current_change_set();
    let second = ledger.change_sets_mut().get_or_create_current_change_set();
    assert_eq!(first.id, second.id);
    assert_eq!(ledger.change_sets().change_sets().len(), 1);
}

#[test]
fn test_add_change_to_set_keeps_order() {
    let fixture = TestFixture::new();
    let mut ledger = fixture.ledger();
    let set = ledger
        .change_sets_mut()
        .create_change_set("Release", Some("Quarterly rotation".into()));
    for name in ["CHANGE_1", "CHANGE_2", "CHANGE_3"] {
        ledger
            .change_sets_mut()
            .add_change_to_set(&set.id, ChangeDraft::new(name, ChangeAction::Update))
            .unwrap();
    }
    let stored = ledger.change_sets().get(&set.id).unwrap();
    assert_eq!(
        stored.changes.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
        vec!["CHANGE_1", "CHANGE_2", "CHANGE_3"]
    );
    assert!(
        ledger
            .change_sets_mut()
            .add_change_to_set("missing", ChangeDraft::new("X", ChangeAction::Create))
            .is_none()
    );
}

#[test]
fn test_newest_draft_is_current() {
    let fixture = TestFixture::new();
    let mut ledger = fixture.seeded_ledger();
    let original = ledger.change_sets().current_change_set().unwrap().id.clone();

    let hotfix = ledger.change_sets_mut().create_change_set("Hotfix", None);
    assert_eq!(ledger.change_sets().current_change_set().unwrap().id, hotfix.id);

    let id = ledger.variables()[2].id.clone();
    ledger
        .update_variable(&id, &VariableUpdate::new().value(Environment::Preview, "preview"))
        .unwrap();
    assert_eq!(ledger.change_sets().get(&hotfix.id).unwrap().changes.len(), 1);
    assert_eq!(ledger.change_sets().get(&original).unwrap().changes.len(), 4);
}

#[test]
fn test_apply_detects_edits_staged_elsewhere() {
    let fixture = TestFixture::new();
    let mut ledger = fixture.seeded_ledger();
    let original = ledger.change_sets().current_change_set().unwrap().id.clone();

    ledger.change_sets_mut().create_change_set("Hotfix", None);
    let node_env = ledger.variables()[2].id.clone();
    ledger
        .update_variable(
            &node_env,
            &VariableUpdate::new().value(Environment::Production, "staging"),
        )
        .unwrap();

    let report = ledger.apply_change_set(&original).unwrap();
    assert_eq!(report.change_set.status, ChangeSetStatus::Applied);
    assert_eq!(report.conflicts.len(), 1);
    let conflict = &report.conflicts[0];
    assert_eq!(conflict.var_name, "NODE_ENV");
    assert_eq!(conflict.kind, ConflictKind::ConcurrentEdit);
    assert_eq!(conflict.environment, Some(Environment::Production));

    // The hotfix is still the current draft and has nothing to complain about.
    let report = ledger.apply_current_change_set().unwrap();
    assert_eq!(report.change_set.name, "Hotfix");
    assert!(report.conflicts.is_empty());
    assert!(ledger.change_sets().current_change_set().is_none());
}

#[test]
fn test_change_set_environments_and_delete() {
    let fixture = TestFixture::new();
    let mut ledger = fixture.seeded_ledger();
    let id = ledger.change_sets().current_change_set().unwrap().id.clone();
    assert!(ledger.change_sets_mut().update_change_set_environments(
        &id,
        vec![Environment::Preview, Environment::Production]
    ));
    assert_eq!(
        ledger.change_sets().get(&id).unwrap().environments,
        vec![Environment::Preview, Environment::Production]
    );
    assert!(
        !ledger
            .change_sets_mut()
            .update_change_set_environments("missing", vec![])
    );

    assert!(ledger.delete_change_set(&id).is_some());
    assert!(ledger.delete_change_set(&id).is_none());
    assert!(ledger.change_sets().current_change_set().is_none());
    // Deleting staged changes leaves the live variables alone.
    assert_eq!(ledger.variables().len(), 4);
}

#[test]
fn test_history_is_capped_and_snapshots_travel() {
    let fixture = TestFixture::new();
    let mut ledger = fixture.ledger();
    for i in 1..=52 {
        ledger
            .create_variable(
                NewVariable::new(format!("VAR_{}", i)).value(Environment::Development, "x"),
            )
            .unwrap();
    }

    let entries = ledger.history().entries();
    assert_eq!(entries.len(), HISTORY_LIMIT);
    assert_eq!(entries[0].description, "Created variable VAR_52");
    assert_eq!(entries[49].description, "Created variable VAR_3");

    let oldest = entries[49].id.clone();
    let snapshot = ledger.time_travel(&oldest).unwrap();
    assert_eq!(snapshot.len(), 3);
    assert!(!ledger.history().can_time_travel("made-up"));

    let commits = ledger.history().commit_history();
    assert_eq!(commits[0].action, HistoryAction::VariableCreated);
    assert_eq!(commits[0].changes_count, 1);

    ledger.history_mut().clear_history();
    assert!(ledger.history().entries().is_empty());
    assert_eq!(ledger.variables().len(), 52);
}

#[test]
fn test_reveal_expires_on_virtual_time() {
    let fixture = TestFixture::new();
    let mut ledger = fixture.seeded_ledger();
    let secret = ledger.variables()[0].id.clone();

    ledger.selection_mut().reveal(&secret);
    fixture.clock.advance_ms(29_000);
    ledger.selection_mut().reveal(&secret);
    fixture.clock.advance_ms(29_000);
    ledger.selection_mut().reveal_state_mut().tick();
    assert!(ledger.selection().is_revealed(&secret));

    fixture.clock.advance_ms(1_000);
    assert_eq!(
        ledger.selection_mut().reveal_state_mut().tick(),
        vec![secret.clone()]
    );
    assert!(!ledger.selection().is_revealed(&secret));
}

#[test]
fn test_hide_all_cancels_timers() {
    let fixture = TestFixture::new();
    let mut ledger = fixture.seeded_ledger();
    let a = ledger.variables()[0].id.clone();
    let b = ledger.variables()[1].id.clone();

    let timer_a = ledger.selection_mut().reveal(&a);
    ledger.selection_mut().reveal(&b);
    assert_eq!(ledger.selection_mut().hide_all(), 2);

    fixture.clock.advance(REVEAL_DURATION);
    assert!(ledger.selection_mut().reveal_state_mut().tick().is_empty());
    assert!(!ledger.selection_mut().reveal_state_mut().fire(&timer_a));
    assert!(ledger.selection().revealed().is_empty());
}

#[test]
fn test_search_over_fixture() {
    let fixture = TestFixture::new();
    let mut ledger = fixture.seeded_ledger();

    ledger.search_mut().set_search_query("postgresql");
    assert_eq!(names(&ledger.filtered_variables()), vec!["DATABASE_URL"]);

    ledger.search_mut().set_search_query("database");
    assert_eq!(names(&ledger.filtered_variables()), vec!["DATABASE_URL"]);

    ledger.search_mut().set_search_query("");
    ledger
        .search_mut()
        .set_selected_environments(&[Environment::Preview]);
    assert_eq!(names(&ledger.filtered_variables()), vec!["API_KEY"]);

    ledger.search_mut().clear_filters();
    assert!(!ledger.search().has_active_filters());
    ledger.search_mut().set_sort_order(SortOrder::Desc);
    // Sorting reorders but never hides anything.
    assert!(!ledger.search().has_active_filters());
    assert_eq!(
        names(&ledger.filtered_variables()),
        vec!["NODE_ENV", "DEBUG_MODE", "DATABASE_URL", "API_KEY"]
    );

    ledger.search_mut().clear_filters();
    ledger.search_mut().set_show_secrets_only(true);
    ledger.search_mut().set_sort_by(SortBy::Name);
    assert_eq!(
        names(&ledger.filtered_variables()),
        vec!["API_KEY", "DATABASE_URL"]
    );
}

#[test]
fn test_transfer_copy_skips_missing_source() {
    let fixture = TestFixture::new();
    let mut ledger = fixture.seeded_ledger();
    let ids: Vec<String> = ledger.variables().iter().map(|v| v.id.clone()).collect();

    let updated = ledger
        .transfer(&TransferOperation {
            kind: TransferKind::Copy,
            source_env: Environment::Preview,
            target_env: Environment::Development,
            var_ids: ids,
        })
        .unwrap();
    assert_eq!(names(&updated), vec!["API_KEY"]);
    let api_key = &updated[0];
    assert_eq!(api_key.value(Environment::Development), Some("preview-api-key"));
    assert_eq!(api_key.value(Environment::Preview), Some("preview-api-key"));

    let entry = &ledger.history().entries()[0];
    assert_eq!(entry.action, HistoryAction::BulkOperation);
    assert_eq!(entry.changes.len(), 1);
    assert_eq!(
        fixture.notifications.titles().last().map(String::as_str),
        Some("Bulk Update Complete")
    );
}

#[test]
fn test_bulk_update_validates_everything_first() {
    let fixture = TestFixture::new();
    let mut ledger = fixture.seeded_ledger();
    let debug_mode = ledger.variables()[3].id.clone();
    let node_env = ledger.variables()[2].id.clone();
    let before = ledger.variables().to_vec();

    let err = ledger
        .bulk_update(&[
            (
                node_env.clone(),
                VariableUpdate::new().value(Environment::Preview, "preview"),
            ),
            (
                debug_mode.clone(),
                VariableUpdate::new().unset(Environment::Development),
            ),
        ])
        .unwrap_err();
    assert_eq!(
        err.messages(),
        vec!["DEBUG_MODE: At least one environment must have a value"]
    );
    assert_eq!(ledger.variables(), before.as_slice());

    let updated = ledger
        .bulk_update(&[
            (node_env, VariableUpdate::new().value(Environment::Preview, "preview")),
            (debug_mode, VariableUpdate::new().secret(true)),
        ])
        .unwrap();
    assert_eq!(names(&updated), vec!["NODE_ENV", "DEBUG_MODE"]);
}
