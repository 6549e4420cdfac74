use tablefill_core::task_json_schema;

#[test]
fn task_json_schema_lists_source_kinds() {
    let schema = task_json_schema();
    let json = serde_json::to_value(&schema).expect("serialize json schema");
    let text = json.to_string();

    assert!(text.contains("\"projectId\""));
    assert!(text.contains("\"recordCnt\""));
    for kind in ["faker", "ai", "file", "fixed", "manual"] {
        assert!(text.contains(&format!("\"{kind}\"")), "missing kind {kind}");
    }
}
