use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde_json::json;

use tablefill_core::{ColumnSpec, ConfigError, SourceKind};
use tablefill_generate::{
    AiBackend, AiError, AiRequest, ColumnStream, GenerationError, StreamContext,
};

fn column(name: &str, source: SourceKind, metadata: serde_json::Value) -> ColumnSpec {
    ColumnSpec {
        name: name.to_string(),
        source,
        metadata,
    }
}

fn drain(stream: &mut ColumnStream, count: usize) -> Vec<Option<String>> {
    (0..count)
        .map(|_| stream.next_value().expect("draw value"))
        .collect()
}

/// Records every request and answers with numbered values.
#[derive(Default)]
struct RecordingBackend {
    requests: Mutex<Vec<usize>>,
}

impl AiBackend for RecordingBackend {
    fn generate(&self, request: &AiRequest<'_>) -> Result<Vec<String>, AiError> {
        let mut requests = self.requests.lock().expect("lock requests");
        requests.push(request.count);
        let offset = requests.len() * 100;
        Ok((0..request.count)
            .map(|idx| format!("{}-{}", request.rule, offset + idx))
            .collect())
    }
}

struct EmptyBackend;

impl AiBackend for EmptyBackend {
    fn generate(&self, _request: &AiRequest<'_>) -> Result<Vec<String>, AiError> {
        Ok(Vec::new())
    }
}

struct FailingBackend;

impl AiBackend for FailingBackend {
    fn generate(&self, _request: &AiRequest<'_>) -> Result<Vec<String>, AiError> {
        Err(AiError::Backend("quota exceeded".to_string()))
    }
}

#[test]
fn fixed_stream_repeats_value_record_count_times() {
    let ctx = StreamContext::new("orders", 0);
    let spec = column("status", SourceKind::Fixed, json!({"value": "x"}));
    let mut stream = ColumnStream::open(&spec, 5, &ctx).expect("open fixed");

    let values = drain(&mut stream, 5);
    assert_eq!(values, vec![Some("x".to_string()); 5]);
    assert_eq!(stream.remaining(), 0);
    assert_eq!(stream.next_value().expect("past the end"), None);
}

#[test]
fn manual_stream_fails_with_configuration_error() {
    let ctx = StreamContext::new("orders", 0);
    for metadata in [serde_json::Value::Null, json!({"value": "x"})] {
        let spec = column("notes", SourceKind::Manual, metadata);
        let err = ColumnStream::open(&spec, 3, &ctx).err().expect("manual rejected");
        assert!(err.is_configuration());
        assert!(matches!(
            err,
            GenerationError::Config(ConfigError::Unimplemented { .. })
        ));
    }
}

#[test]
fn faker_stream_is_deterministic_per_seed() {
    let spec = column("email", SourceKind::Faker, json!({"rule": "internet.free_email"}));
    let draw = |seed| {
        let ctx = StreamContext::new("users", seed);
        let mut stream = ColumnStream::open(&spec, 10, &ctx).expect("open faker");
        drain(&mut stream, 10)
    };

    let first = draw(42);
    assert_eq!(first, draw(42));
    assert_ne!(first, draw(43));
    assert!(first.iter().flatten().all(|value| value.contains('@')));
}

#[test]
fn unknown_faker_rule_fails_on_first_draw() {
    let ctx = StreamContext::new("users", 0);
    let spec = column("nick", SourceKind::Faker, json!({"rule": "person.nickname"}));
    let mut stream = ColumnStream::open(&spec, 2, &ctx).expect("construction succeeds");

    let err = stream.next_value().expect_err("unknown rule");
    assert_eq!(err.column(), Some("nick"));
    assert!(err.to_string().contains("person.nickname"));
}

#[test]
fn ai_stream_requires_backend() {
    let ctx = StreamContext::new("users", 0);
    let spec = column("bio", SourceKind::Ai, json!({"rule": "short bio"}));
    let err = ColumnStream::open(&spec, 2, &ctx).err().expect("missing backend");
    assert!(matches!(
        err,
        GenerationError::Config(ConfigError::MissingBackend { .. })
    ));
}

#[test]
fn ai_stream_fetches_in_chunks_capped_by_remaining() {
    let backend = Arc::new(RecordingBackend::default());
    let ctx = StreamContext::new("users", 0).with_ai_backend(backend.clone());
    let spec = column("bio", SourceKind::Ai, json!({"rule": "bio", "chunkSize": 4}));
    let mut stream = ColumnStream::open(&spec, 10, &ctx).expect("open ai");

    let values = drain(&mut stream, 10);
    assert!(values.iter().all(Option::is_some));
    assert_eq!(values[0].as_deref(), Some("bio-100"));
    assert_eq!(values[4].as_deref(), Some("bio-200"));
    let requests = backend.requests.lock().expect("lock requests").clone();
    assert_eq!(requests, vec![4, 4, 2]);
}

#[test]
fn ai_stream_errors_are_tagged_with_column() {
    let ctx = StreamContext::new("users", 0).with_ai_backend(Arc::new(FailingBackend));
    let spec = column("bio", SourceKind::Ai, json!({"rule": "bio"}));
    let mut stream = ColumnStream::open(&spec, 3, &ctx).expect("open ai");
    let err = stream.next_value().expect_err("backend failure");
    assert_eq!(err.column(), Some("bio"));
    assert!(err.to_string().contains("quota exceeded"));

    let ctx = StreamContext::new("users", 0).with_ai_backend(Arc::new(EmptyBackend));
    let mut stream = ColumnStream::open(&spec, 3, &ctx).expect("open ai");
    let err = stream.next_value().expect_err("empty chunk");
    assert!(err.to_string().contains("no values"));
}

#[test]
fn file_stream_cycles_by_default() {
    let path = write_temp_csv("cycle", "email,name\na@x.io,A\nb@x.io,B\n");
    let ctx = StreamContext::new("users", 0);
    let spec = column(
        "email",
        SourceKind::File,
        json!({"path": path.to_string_lossy(), "column": "email"}),
    );
    let mut stream = ColumnStream::open(&spec, 5, &ctx).expect("open file");

    let values: Vec<String> = drain(&mut stream, 5).into_iter().flatten().collect();
    assert_eq!(values, vec!["a@x.io", "b@x.io", "a@x.io", "b@x.io", "a@x.io"]);
}

#[test]
fn file_stream_stop_policy_yields_nothing_after_exhaustion() {
    let path = write_temp_csv("stop", "A;1\nB;2\n");
    let ctx = StreamContext::new("users", 0);
    let spec = column(
        "code",
        SourceKind::File,
        json!({
            "path": path.to_string_lossy(),
            "columnIndex": 1,
            "hasHeaders": false,
            "delimiter": ";",
            "onExhausted": "stop"
        }),
    );
    let mut stream = ColumnStream::open(&spec, 4, &ctx).expect("open file");

    assert_eq!(
        drain(&mut stream, 4),
        vec![Some("1".to_string()), Some("2".to_string()), None, None]
    );
}

#[test]
fn file_stream_rejects_unknown_header_and_empty_cycle() {
    let path = write_temp_csv("headers", "email\n");
    let ctx = StreamContext::new("users", 0);
    let spec = column(
        "email",
        SourceKind::File,
        json!({"path": path.to_string_lossy(), "column": "mail"}),
    );
    assert!(ColumnStream::open(&spec, 1, &ctx).is_err());

    let spec = column("email", SourceKind::File, json!({"path": path.to_string_lossy()}));
    let mut stream = ColumnStream::open(&spec, 1, &ctx).expect("open file");
    let err = stream.next_value().expect_err("no records");
    assert!(err.to_string().contains("has no records"));
}

fn write_temp_csv(label: &str, contents: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!("tablefill_generate_{label}_{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join("source.csv");
    fs::write(&path, contents).expect("write csv");
    path
}
