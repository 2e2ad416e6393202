//! # In-Memory Trace Server Tests

use super::*;
use chrono::Utc;
use serde_json::{json, Value};

const PROJECT: &str = "p-1";

fn started(id: &str, parent: Option<&str>, thread: Option<&str>) -> CallStartReq {
    CallStartReq {
        start: StartedCall {
            project_id: PROJECT.to_string(),
            id: Some(id.to_string()),
            trace_id: None,
            parent_id: parent.map(str::to_string),
            thread_id: thread.map(str::to_string),
            op_name: "predict".to_string(),
            display_name: None,
            started_at: Utc::now(),
            attributes: Value::Null,
            inputs: json!({"x": 1}),
            user_id: Some("alice".to_string()),
        },
    }
}

fn create_obj(server: &InMemoryTraceServer, name: &str, val: Value) -> String {
    server
        .obj_create(ObjCreateReq {
            obj: ObjSchemaForInsert {
                project_id: PROJECT.to_string(),
                object_id: name.to_string(),
                val,
                user_id: None,
            },
        })
        .unwrap()
        .digest
}

#[test]
fn test_call_start_end_read() {
    let server = InMemoryTraceServer::new();
    let res = server.call_start(started("c1", None, None)).unwrap();
    assert_eq!(res.id, "c1");

    server
        .call_end(CallEndReq {
            end: EndedCall {
                project_id: PROJECT.to_string(),
                id: "c1".to_string(),
                ended_at: Utc::now(),
                output: Some(json!("done")),
                exception: None,
                summary: Value::Null,
            },
        })
        .unwrap();

    let call = server
        .call_read(CallReadReq {
            project_id: PROJECT.to_string(),
            id: "c1".to_string(),
        })
        .unwrap()
        .call
        .unwrap();
    assert_eq!(call.output, Some(json!("done")));
    assert!(call.ended_at.is_some());
}

#[test]
fn test_duplicate_call_start_rejected() {
    let server = InMemoryTraceServer::new();
    server.call_start(started("c1", None, None)).unwrap();
    assert!(matches!(
        server.call_start(started("c1", None, None)),
        Err(TraceServerError::InvalidRequest(_))
    ));
}

#[test]
fn test_call_end_unknown_call() {
    let server = InMemoryTraceServer::new();
    let result = server.call_end(CallEndReq {
        end: EndedCall {
            project_id: PROJECT.to_string(),
            id: "missing".to_string(),
            ended_at: Utc::now(),
            output: None,
            exception: None,
            summary: Value::Null,
        },
    });
    assert!(matches!(result, Err(TraceServerError::NotFound(_))));
}

#[test]
fn test_calls_delete_removes_descendants() {
    let server = InMemoryTraceServer::new();
    server.call_start(started("root", None, None)).unwrap();
    server.call_start(started("child", Some("root"), None)).unwrap();
    server.call_start(started("grandchild", Some("child"), None)).unwrap();
    server.call_start(started("other", None, None)).unwrap();

    let res = server
        .calls_delete(CallsDeleteReq {
            project_id: PROJECT.to_string(),
            call_ids: vec!["root".to_string()],
            user_id: None,
        })
        .unwrap();
    assert_eq!(res.num_deleted, 3);

    let stats = server
        .calls_query_stats(CallsQueryStatsReq {
            project_id: PROJECT.to_string(),
            filter: CallsFilter::default(),
        })
        .unwrap();
    assert_eq!(stats.count, 1);
}

#[test]
fn test_calls_query_stream_pages() {
    let server = InMemoryTraceServer::new();
    for i in 0..5 {
        server.call_start(started(&format!("c{}", i), None, None)).unwrap();
    }
    let ids: Vec<String> = server
        .calls_query_stream(CallsQueryReq {
            project_id: PROJECT.to_string(),
            filter: CallsFilter::default(),
            limit: Some(2),
            offset: Some(1),
        })
        .unwrap()
        .map(|c| c.unwrap().id)
        .collect();
    assert_eq!(ids, vec!["c1", "c2"]);
}

#[test]
fn test_object_versions_and_latest() {
    let server = InMemoryTraceServer::new();
    let d1 = create_obj(&server, "Model", json!({"v": 1}));
    let d2 = create_obj(&server, "Model", json!({"v": 2}));
    assert_ne!(d1, d2);
    assert_eq!(create_obj(&server, "Model", json!({"v": 2})), d2);

    let latest = server
        .obj_read(ObjReadReq {
            project_id: PROJECT.to_string(),
            object_id: "Model".to_string(),
            digest: LATEST_DIGEST.to_string(),
        })
        .unwrap()
        .obj;
    assert_eq!(latest.digest, d2);
    assert_eq!(latest.version_index, 1);
    assert!(latest.is_latest);

    let res = server
        .obj_delete(ObjDeleteReq {
            project_id: PROJECT.to_string(),
            object_id: "Model".to_string(),
            digests: Some(vec![d2]),
        })
        .unwrap();
    assert_eq!(res.num_deleted, 1);

    let objs = server
        .objs_query(ObjsQueryReq {
            project_id: PROJECT.to_string(),
            filter: ObjectVersionFilter {
                latest_only: Some(true),
                ..Default::default()
            },
            limit: None,
            offset: None,
        })
        .unwrap()
        .objs;
    assert_eq!(objs.len(), 1);
    assert_eq!(objs[0].digest, d1);
}

#[test]
fn test_base_object_class_from_value() {
    let server = InMemoryTraceServer::new();
    create_obj(&server, "M", json!({"_class_name": "EchoModel"}));
    let obj = server
        .obj_read(ObjReadReq {
            project_id: PROJECT.to_string(),
            object_id: "M".to_string(),
            digest: LATEST_DIGEST.to_string(),
        })
        .unwrap()
        .obj;
    assert_eq!(obj.base_object_class.as_deref(), Some("EchoModel"));
}

#[test]
fn test_table_rows_and_refs_batch() {
    let server = InMemoryTraceServer::new();
    let table = server
        .table_create(TableCreateReq {
            table: TableSchemaForInsert {
                project_id: PROJECT.to_string(),
                rows: vec![json!({"q": "a"}), json!({"q": "b"})],
            },
        })
        .unwrap();
    assert_eq!(table.row_digests.len(), 2);

    let digest = create_obj(&server, "Model", json!({"w": 3}));
    let refs = vec![
        TraceRef::object(PROJECT, "Model", &digest).to_internal_uri(),
        TraceRef::table(PROJECT, &table.digest).to_internal_uri(),
    ];
    let vals = server.refs_read_batch(RefsReadBatchReq { refs }).unwrap().vals;
    assert_eq!(vals[0], json!({"w": 3}));
    assert_eq!(vals[1], json!([{"q": "a"}, {"q": "b"}]));
}

#[test]
fn test_refs_batch_missing_ref_fails() {
    let server = InMemoryTraceServer::new();
    let refs = vec![TraceRef::call(PROJECT, "nope").to_internal_uri()];
    assert!(matches!(
        server.refs_read_batch(RefsReadBatchReq { refs }),
        Err(TraceServerError::NotFound(_))
    ));
}

#[test]
fn test_feedback_requires_user() {
    let server = InMemoryTraceServer::new();
    server.call_start(started("c1", None, None)).unwrap();
    let mut req = FeedbackCreateReq {
        project_id: PROJECT.to_string(),
        object_ref: TraceRef::call(PROJECT, "c1").to_internal_uri(),
        feedback_type: "reaction".to_string(),
        payload: json!({"emoji": "+1"}),
        user_id: None,
    };
    assert!(server.feedback_create(req.clone()).is_err());

    req.user_id = Some("alice".to_string());
    let created = server.feedback_create(req).unwrap();
    let found = server
        .feedback_query(FeedbackQueryReq {
            project_id: PROJECT.to_string(),
            feedback_type: Some("reaction".to_string()),
            object_refs: None,
            limit: None,
        })
        .unwrap()
        .result;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, created.id);

    let purged = server
        .feedback_purge(FeedbackPurgeReq {
            project_id: PROJECT.to_string(),
            ids: vec![created.id],
        })
        .unwrap();
    assert_eq!(purged.num_deleted, 1);
}

#[test]
fn test_completion_records_call() {
    let server = InMemoryTraceServer::new();
    let res = server
        .completions_create(CompletionsCreateReq {
            project_id: PROJECT.to_string(),
            inputs: CompletionsInputs {
                model: "echo-1".to_string(),
                messages: vec![CompletionMessage {
                    role: "user".to_string(),
                    content: "hello there".to_string(),
                }],
                temperature: None,
                max_tokens: None,
            },
            user_id: Some("alice".to_string()),
            track_llm_call: None,
        })
        .unwrap();
    assert_eq!(
        res.response["choices"][0]["message"]["content"],
        json!("echo: hello there")
    );
    let call_id = res.call_id.unwrap();
    let call = server
        .call_read(CallReadReq {
            project_id: PROJECT.to_string(),
            id: call_id,
        })
        .unwrap()
        .call
        .unwrap();
    assert_eq!(call.op_name, "completions_create");
}

#[test]
fn test_completion_stream_chunks() {
    let server = InMemoryTraceServer::new();
    let chunks: Vec<CompletionChunk> = server
        .completions_create_stream(CompletionsCreateReq {
            project_id: PROJECT.to_string(),
            inputs: CompletionsInputs {
                model: "echo-1".to_string(),
                messages: vec![CompletionMessage {
                    role: "user".to_string(),
                    content: "a b".to_string(),
                }],
                temperature: None,
                max_tokens: None,
            },
            user_id: None,
            track_llm_call: Some(false),
        })
        .unwrap()
        .collect::<TraceResult<_>>()
        .unwrap();
    let text: String = chunks.iter().map(|c| c.delta.as_str()).collect();
    assert_eq!(text, "echo: a b");
    assert_eq!(chunks.last().unwrap().finish_reason.as_deref(), Some("stop"));
}

#[test]
fn test_threads_from_root_calls() {
    let server = InMemoryTraceServer::new();
    server.call_start(started("t1-a", None, Some("t1"))).unwrap();
    server.call_start(started("t1-b", None, Some("t1"))).unwrap();
    server.call_start(started("t1-child", Some("t1-a"), Some("t1"))).unwrap();
    server.call_start(started("t2-a", None, Some("t2"))).unwrap();

    let threads: Vec<ThreadSchema> = server
        .threads_query_stream(ThreadsQueryReq {
            project_id: PROJECT.to_string(),
            limit: None,
        })
        .unwrap()
        .collect::<TraceResult<_>>()
        .unwrap();
    let t1 = threads.iter().find(|t| t.thread_id == "t1").unwrap();
    assert_eq!(t1.turn_count, 2);
    assert_eq!(threads.len(), 2);
}

#[test]
fn test_injected_stream_fault() {
    let server = InMemoryTraceServer::new();
    for i in 0..4 {
        server.call_start(started(&format!("c{}", i), None, None)).unwrap();
    }
    server.inject_stream_fault(2);
    let items: Vec<TraceResult<CallSchema>> = server
        .calls_query_stream(CallsQueryReq {
            project_id: PROJECT.to_string(),
            filter: CallsFilter::default(),
            limit: None,
            offset: None,
        })
        .unwrap()
        .collect();
    assert_eq!(items.len(), 3);
    assert!(items[2].is_err());

    // The fault is one-shot.
    let again = server
        .calls_query_stream(CallsQueryReq {
            project_id: PROJECT.to_string(),
            filter: CallsFilter::default(),
            limit: None,
            offset: None,
        })
        .unwrap()
        .count();
    assert_eq!(again, 4);
}

#[test]
fn test_invocation_count() {
    let server = InMemoryTraceServer::new();
    assert_eq!(server.invocation_count(), 0);
    server.call_start(started("c1", None, None)).unwrap();
    let _ = server.file_content_read(FileContentReadReq {
        project_id: PROJECT.to_string(),
        digest: "missing".to_string(),
    });
    assert_eq!(server.invocation_count(), 2);
}
