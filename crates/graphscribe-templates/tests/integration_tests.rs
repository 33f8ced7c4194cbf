//! Integration tests for graphscribe-templates
//!
//! These tests run the manager against the JSON file store and check that
//! every mutation is durable across a restart.

use graphscribe_domain::{ErrorKind, SchemaSpec};
use graphscribe_store::JsonFileStore;
use graphscribe_templates::{NewTemplate, TemplateManager, TemplateQuery, TemplateUpdate};
use tempfile::tempdir;

fn open(path: &std::path::Path) -> TemplateManager<JsonFileStore> {
    TemplateManager::open(JsonFileStore::new(path)).unwrap()
}

#[test]
fn test_seeded_defaults_survive_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("prompt_templates.json");

    let manager = open(&path);
    assert_eq!(manager.seed_defaults().unwrap(), 2);
    let zh_id = manager.active_for("zh").unwrap().id;
    drop(manager);

    let reopened = open(&path);
    assert_eq!(reopened.seed_defaults().unwrap(), 0);
    assert_eq!(reopened.active_for("zh").unwrap().id, zh_id);
    assert_eq!(reopened.len().unwrap(), 2);
}

#[test]
fn test_full_lifecycle_is_durable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("prompt_templates.json");

    let manager = open(&path);
    let medical = manager
        .create(NewTemplate {
            name: "医疗模板".to_string(),
            description: "疾病与药物".to_string(),
            language: "zh".to_string(),
            content: "{% for t in allowed_triplets %}{{ t }}\n{% endfor %}{{ text }}".to_string(),
            tags: vec!["medical".to_string()],
            ..NewTemplate::default()
        })
        .unwrap();
    manager.activate(&medical.id).unwrap();
    manager
        .update(
            &medical.id,
            TemplateUpdate {
                tags: Some(vec!["medical".to_string(), "v2".to_string()]),
                ..TemplateUpdate::default()
            },
        )
        .unwrap();
    let copy = manager.duplicate(&medical.id, "医疗模板-副本").unwrap();
    drop(manager);

    let reopened = open(&path);
    let stored = reopened.get(&medical.id).unwrap();
    assert_eq!(stored.version, 2);
    assert!(stored.active);
    assert_eq!(stored.tags, vec!["medical", "v2"]);

    let page = reopened
        .list(&TemplateQuery {
            keyword: Some("医疗".to_string()),
            ..TemplateQuery::default()
        })
        .unwrap();
    assert_eq!(page.total, 2);

    reopened.activate(&copy.id).unwrap();
    reopened.delete(&medical.id).unwrap();
    drop(reopened);

    let last = open(&path);
    assert_eq!(last.len().unwrap(), 1);
    assert_eq!(last.active_for("zh").unwrap().id, copy.id);
    assert_eq!(
        last.get(&medical.id).unwrap_err().kind(),
        ErrorKind::NotFound
    );

    let schema = SchemaSpec::new("medical", vec!["疾病-治疗->药物".to_string()]);
    let copy = last.get(&copy.id).unwrap();
    let prompt = last.render(&copy, "阿司匹林可治疗头痛。", &schema).unwrap();
    assert_eq!(prompt, "疾病-治疗->药物\n阿司匹林可治疗头痛。");
}

#[test]
fn test_corrupt_file_fails_to_open() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("prompt_templates.json");
    std::fs::write(&path, "[[[").unwrap();

    let result = TemplateManager::open(JsonFileStore::new(&path));
    assert!(matches!(result, Err(ref e) if e.kind() == ErrorKind::Internal));
}
