use mnemo::apply::{apply_operations, summary};
use mnemo::db::{MemoryStore, ENTITY, LONG_TERM};
use mnemo::extract::MemoryOp;
use serde_json::json;

fn test_store() -> MemoryStore {
    MemoryStore::open(":memory:").expect("in-memory store")
}

fn update(key: &str, value: &str) -> MemoryOp {
    MemoryOp::Update { key: key.into(), value: json!(value) }
}

fn delete(key: &str) -> MemoryOp {
    MemoryOp::Delete { key: key.into() }
}

#[test]
fn replace_disliked_food() {
    // "我不喜歡披薩了，我喜歡牛排" → the extractor proposes variant deletes
    // plus the replacement update
    let store = test_store();
    let old = store.upsert("u1", "favorite_food", LONG_TERM, &json!("pizza")).unwrap();

    let ops = [delete("披薩"), delete("pizza"), update("favorite_food", "牛排")];
    let outcome = apply_operations(&store, "u1", &ops).unwrap();

    assert_eq!(outcome.deleted, vec!["pizza"]);
    assert_eq!(outcome.applied, vec!["favorite_food"]);

    let rec = store.find("u1", "favorite_food", LONG_TERM).unwrap().unwrap();
    assert_eq!(rec.value, json!("牛排"));
    // the old record was removed before the update, so this is a fresh insert
    assert_ne!(rec.id, old.id);
}

#[test]
fn lexical_variants_clear_both_renderings() {
    let store = test_store();
    store.upsert("u1", "favorite_food", LONG_TERM, &json!("草莓蛋糕")).unwrap();
    store.upsert("u1", "favorite_food", ENTITY, &json!("strawberry cake")).unwrap();

    let outcome =
        apply_operations(&store, "u1", &[delete("草莓蛋糕"), delete("strawberry cake")]).unwrap();
    assert_eq!(outcome.deleted.len(), 2);
    assert!(store.list("u1", None).unwrap().is_empty());

    // nothing remains, so the follow-up update inserts a fresh record
    let outcome = apply_operations(&store, "u1", &[update("favorite_food", "千層蛋糕")]).unwrap();
    assert_eq!(outcome.applied, vec!["favorite_food"]);
    let rec = store.find("u1", "favorite_food", LONG_TERM).unwrap().unwrap();
    assert_eq!(rec.value, json!("千層蛋糕"));
    assert_eq!(rec.created_at, rec.updated_at);
}

#[test]
fn repeated_delete_is_noop() {
    let store = test_store();
    store.upsert("u1", "favorite_food", LONG_TERM, &json!("pizza")).unwrap();

    let first = apply_operations(&store, "u1", &[delete("pizza")]).unwrap();
    assert_eq!(first.deleted.len(), 1);

    // same operation again: deletes nothing, errors nothing
    let second = apply_operations(&store, "u1", &[delete("pizza")]).unwrap();
    assert!(second.deleted.is_empty());
}

#[test]
fn variant_deletes_are_applied_independently() {
    // the extractor emits one delete per rendering; only one may match
    let store = test_store();
    store.upsert("u1", "user_interests", LONG_TERM, &json!("skiing")).unwrap();

    let outcome =
        apply_operations(&store, "u1", &[delete("滑雪"), delete("skiing"), delete("ski")]).unwrap();
    // "skiing" matched; "ski" found nothing left to delete
    assert_eq!(outcome.deleted, vec!["skiing"]);
}

#[test]
fn delete_by_field_label_reports_key() {
    let store = test_store();
    store.upsert("u1", "user_name", LONG_TERM, &json!("秋天")).unwrap();

    let outcome = apply_operations(&store, "u1", &[delete("user_name")]).unwrap();
    assert_eq!(outcome.deleted, vec!["user_name"]);
}

#[test]
fn delete_by_value_reports_value() {
    let store = test_store();
    store.upsert("u1", "favorite_drink", LONG_TERM, &json!("bubble tea")).unwrap();

    let outcome = apply_operations(&store, "u1", &[delete("bubble")]).unwrap();
    assert_eq!(outcome.deleted, vec!["bubble tea"]);
}

#[test]
fn repeated_updates_keep_one_record() {
    let store = test_store();
    let ops = [update("user_name", "夏天"), update("user_name", "秋天")];
    let outcome = apply_operations(&store, "u1", &ops).unwrap();

    assert_eq!(outcome.applied, vec!["user_name", "user_name"]);
    let all = store.list("u1", None).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].value, json!("秋天"));
}

#[test]
fn updates_write_long_term_only() {
    let store = test_store();
    apply_operations(&store, "u1", &[update("favorite_food", "牛排")]).unwrap();
    let rec = store.find_by_key("u1", "favorite_food").unwrap().unwrap();
    assert_eq!(rec.memory_type, LONG_TERM);
}

#[test]
fn empty_ops_touch_nothing() {
    let store = test_store();
    store.upsert("u1", "user_name", LONG_TERM, &json!("夏天")).unwrap();

    let outcome = apply_operations(&store, "u1", &[]).unwrap();
    assert!(outcome.applied.is_empty());
    assert!(outcome.deleted.is_empty());
    assert_eq!(store.list("u1", None).unwrap().len(), 1);
}

#[test]
fn summary_wording() {
    let store = test_store();
    store.upsert("u1", "favorite_food", LONG_TERM, &json!("pizza")).unwrap();

    let outcome = apply_operations(
        &store,
        "u1",
        &[delete("pizza"), update("favorite_food", "牛排"), update("location", "Taipei")],
    )
    .unwrap();
    assert_eq!(summary(&outcome), "updated 2 memories; deleted 1 memory");

    let nothing = apply_operations(&store, "u1", &[delete("no such thing")]).unwrap();
    assert_eq!(summary(&nothing), "no operations applied");
}
