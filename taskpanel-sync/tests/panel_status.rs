use std::fs;

use tempfile::TempDir;

use taskpanel_core::{RecordId, TaskRecord};
use taskpanel_sync::{
    diff::diff_panel,
    status::{check, PanelSignal},
    EngineConfig, FileStore, JsonlAuditLog, RecordStore, SyncEngine,
};

async fn rendered(home: &TempDir) -> (SyncEngine<FileStore, JsonlAuditLog>, RecordId) {
    let store = FileStore::new(home.path());
    let mut record = TaskRecord::new(RecordId::from("status"), "Status");
    record.add_plan("only plan");
    store.save_record(&record).expect("save");

    let engine = SyncEngine::new(store, JsonlAuditLog::new(home.path()), EngineConfig::default())
        .expect("engine");
    let path = engine.store().panel_path(&record.id);
    let mut ctx = engine.context(record.id.clone(), path).expect("ctx");
    engine.render_panel(&mut ctx).await.expect("render");
    (engine, record.id)
}

#[test]
fn never_rendered_record() {
    let home = TempDir::new().expect("home");
    let store = FileStore::new(home.path());
    let record = TaskRecord::new(RecordId::from("fresh"), "Fresh");
    let signal = check(&store, &record, &store.panel_path(&record.id)).expect("check");
    assert_eq!(signal, PanelSignal::NeverRendered);
}

#[tokio::test]
async fn current_after_render() {
    let home = TempDir::new().expect("home");
    let (engine, id) = rendered(&home).await;
    let store = engine.store();
    let record = store.load_record(&id).expect("load");
    let path = store.panel_path(&id);
    assert_eq!(check(store, &record, &path).expect("check"), PanelSignal::Current);
    assert!(diff_panel(store, &record, &path).expect("diff").is_none());
}

#[tokio::test]
async fn edited_when_document_changes() {
    let home = TempDir::new().expect("home");
    let (engine, id) = rendered(&home).await;
    let store = engine.store();
    let path = store.panel_path(&id);
    let text = fs::read_to_string(&path).expect("read");
    fs::write(&path, text.replace("# Status", "# Status, edited")).expect("write");

    let record = store.load_record(&id).expect("load");
    assert_eq!(check(store, &record, &path).expect("check"), PanelSignal::Edited);
    let diff = diff_panel(store, &record, &path).expect("diff").expect("some diff");
    assert!(diff.unified_diff.contains("-# Status, edited"));
    assert!(diff.unified_diff.contains("+# Status"));
}

#[tokio::test]
async fn behind_when_record_moves_without_render() {
    let home = TempDir::new().expect("home");
    let (engine, id) = rendered(&home).await;
    let store = engine.store();
    let mut record = store.load_record(&id).expect("load");
    record.set_goal("new goal");
    store.save_record(&record).expect("save");

    match check(store, &record, &store.panel_path(&id)).expect("check") {
        PanelSignal::Behind { reason } => assert!(reason.contains("record changed")),
        other => panic!("expected behind, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_when_document_deleted() {
    let home = TempDir::new().expect("home");
    let (engine, id) = rendered(&home).await;
    let store = engine.store();
    let path = store.panel_path(&id);
    fs::remove_file(&path).expect("remove");
    let record = store.load_record(&id).expect("load");
    assert_eq!(check(store, &record, &path).expect("check"), PanelSignal::Missing);
}

#[tokio::test]
async fn applied_reconciliation_is_audited_to_jsonl() {
    let home = TempDir::new().expect("home");
    let (engine, id) = rendered(&home).await;
    let path = engine.store().panel_path(&id);
    let text = fs::read_to_string(&path).expect("read");
    fs::write(&path, text.replace("only plan", "the only plan")).expect("write");

    let mut ctx = engine.context(id.clone(), &path).expect("ctx");
    engine.render_panel(&mut ctx).await.expect("apply");

    let lines = JsonlAuditLog::new(home.path()).read(&id).expect("audit");
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1]["applied"], true);
    assert_eq!(lines[1]["changes"][0]["kind"], "content");
    assert_eq!(lines[1]["changes"][0]["section"], "plan:P1");
    assert_eq!(lines[1]["changes"][0]["new_value"], "the only plan");
}
