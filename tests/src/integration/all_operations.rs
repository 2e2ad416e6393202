//! # Every Operation Across the Channel
//!
//! Drives each of the 28 `TraceServer` operations through a Sender, the
//! Receiver worker and the identity adapter into the store, checking that
//! project ids go in external and come back external.

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use chrono::Utc;
    use serde_json::{json, Value};
    use trace_store::InMemoryTraceServer;
    use trace_types::*;

    use crate::fixtures::*;

    fn completion_req() -> CompletionsCreateReq {
        CompletionsCreateReq {
            project_id: PROJECT.to_string(),
            inputs: CompletionsInputs {
                model: "echo-1".to_string(),
                messages: vec![CompletionMessage {
                    role: "user".to_string(),
                    content: "hello over ipc".to_string(),
                }],
                temperature: None,
                max_tokens: None,
            },
            user_id: None,
            track_llm_call: Some(false),
        }
    }

    // =========================================================================
    // CALLS
    // =========================================================================

    #[test]
    fn test_call_operations() {
        let store = Arc::new(InMemoryTraceServer::new());
        let receiver = guarded_receiver(store.clone());
        let sender = receiver.get_sender();

        let started = sender.call_start(start_req(PROJECT, "c1", Some("th-1"))).unwrap();
        assert_eq!(started.id, "c1");
        sender.call_start(start_req(PROJECT, "c2", None)).unwrap();

        sender
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

        let read = sender
            .call_read(CallReadReq {
                project_id: PROJECT.to_string(),
                id: "c1".to_string(),
            })
            .unwrap()
            .call
            .unwrap();
        assert_eq!(read.project_id, PROJECT);
        assert_eq!(read.user_id.as_deref(), Some(USER));
        assert_eq!(read.output, Some(json!("done")));

        let query = CallsQueryReq {
            project_id: PROJECT.to_string(),
            filter: CallsFilter::default(),
            limit: None,
            offset: None,
        };
        let listed = sender.calls_query(query.clone()).unwrap().calls;
        let streamed: Vec<CallSchema> = sender
            .calls_query_stream(query)
            .unwrap()
            .collect::<TraceResult<_>>()
            .unwrap();
        assert_eq!(listed, streamed);
        assert!(streamed.iter().all(|c| c.project_id == PROJECT));

        let stats = sender
            .calls_query_stats(CallsQueryStatsReq {
                project_id: PROJECT.to_string(),
                filter: CallsFilter::default(),
            })
            .unwrap();
        assert_eq!(stats.count, 2);

        sender
            .call_update(CallUpdateReq {
                project_id: PROJECT.to_string(),
                call_id: "c2".to_string(),
                display_name: Some("renamed".to_string()),
                user_id: None,
            })
            .unwrap();

        let threads: Vec<ThreadSchema> = sender
            .threads_query_stream(ThreadsQueryReq {
                project_id: PROJECT.to_string(),
                limit: None,
            })
            .unwrap()
            .collect::<TraceResult<_>>()
            .unwrap();
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].thread_id, "th-1");

        let deleted = sender
            .calls_delete(CallsDeleteReq {
                project_id: PROJECT.to_string(),
                call_ids: vec!["c1".to_string(), "c2".to_string()],
                user_id: Some(USER.to_string()),
            })
            .unwrap();
        assert_eq!(deleted.num_deleted, 2);
    }

    // =========================================================================
    // OBJECTS, TABLES, REFS, FILES
    // =========================================================================

    #[test]
    fn test_object_table_and_file_operations() {
        let store = Arc::new(InMemoryTraceServer::new());
        let receiver = guarded_receiver(store.clone());
        let sender = receiver.get_sender();

        let created = sender
            .obj_create(ObjCreateReq {
                obj: ObjSchemaForInsert {
                    project_id: PROJECT.to_string(),
                    object_id: "Model".to_string(),
                    val: json!({"_class_name": "LinearModel", "weight": 2}),
                    user_id: None,
                },
            })
            .unwrap();

        let latest = sender
            .obj_read(ObjReadReq {
                project_id: PROJECT.to_string(),
                object_id: "Model".to_string(),
                digest: LATEST_DIGEST.to_string(),
            })
            .unwrap()
            .obj;
        assert_eq!(latest.digest, created.digest);
        assert_eq!(latest.project_id, PROJECT);
        assert_eq!(latest.base_object_class.as_deref(), Some("LinearModel"));

        let objs = sender
            .objs_query(ObjsQueryReq {
                project_id: PROJECT.to_string(),
                filter: ObjectVersionFilter::default(),
                limit: None,
                offset: None,
            })
            .unwrap()
            .objs;
        assert_eq!(objs.len(), 1);

        let table = sender
            .table_create(TableCreateReq {
                table: TableSchemaForInsert {
                    project_id: PROJECT.to_string(),
                    rows: vec![json!({"x": 1}), json!({"x": 2}), json!({"x": 3})],
                },
            })
            .unwrap();
        assert_eq!(table.row_digests.len(), 3);

        let table_query = TableQueryReq {
            project_id: PROJECT.to_string(),
            digest: table.digest.clone(),
            limit: None,
            offset: None,
        };
        let rows = sender.table_query(table_query.clone()).unwrap().rows;
        let streamed: Vec<TableRowSchema> = sender
            .table_query_stream(table_query)
            .unwrap()
            .collect::<TraceResult<_>>()
            .unwrap();
        assert_eq!(rows, streamed);
        assert_eq!(
            sender
                .table_query_stats(TableQueryStatsReq {
                    project_id: PROJECT.to_string(),
                    digest: table.digest.clone(),
                })
                .unwrap()
                .count,
            3
        );

        let vals = sender
            .refs_read_batch(RefsReadBatchReq {
                refs: vec![
                    TraceRef::object(PROJECT, "Model", &created.digest).to_external_uri(),
                    TraceRef::table(PROJECT, &table.digest).to_external_uri(),
                ],
            })
            .unwrap()
            .vals;
        assert_eq!(vals[0]["weight"], json!(2));
        assert_eq!(vals[1], json!([{"x": 1}, {"x": 2}, {"x": 3}]));

        let file = sender
            .file_create(FileCreateReq {
                project_id: PROJECT.to_string(),
                name: "weights.bin".to_string(),
                content: vec![0, 1, 2, 255],
            })
            .unwrap();
        let content = sender
            .file_content_read(FileContentReadReq {
                project_id: PROJECT.to_string(),
                digest: file.digest,
            })
            .unwrap()
            .content;
        assert_eq!(content, vec![0, 1, 2, 255]);

        let removed = sender
            .obj_delete(ObjDeleteReq {
                project_id: PROJECT.to_string(),
                object_id: "Model".to_string(),
                digests: None,
            })
            .unwrap();
        assert_eq!(removed.num_deleted, 1);
    }

    // =========================================================================
    // FEEDBACK, COST, COMPLETIONS
    // =========================================================================

    #[test]
    fn test_feedback_cost_and_completion_operations() {
        let store = Arc::new(InMemoryTraceServer::new());
        let receiver = guarded_receiver(store.clone());
        let sender = receiver.get_sender();

        sender.call_start(start_req(PROJECT, "c1", None)).unwrap();
        let call_ref = TraceRef::call(PROJECT, "c1").to_external_uri();

        let feedback = sender
            .feedback_create(FeedbackCreateReq {
                project_id: PROJECT.to_string(),
                object_ref: call_ref.clone(),
                feedback_type: "thumbs".to_string(),
                payload: json!({"up": true}),
                user_id: None,
            })
            .unwrap();
        assert_eq!(feedback.user_id, USER);

        let found = sender
            .feedback_query(FeedbackQueryReq {
                project_id: PROJECT.to_string(),
                feedback_type: Some("thumbs".to_string()),
                object_refs: Some(vec![call_ref.clone()]),
                limit: None,
            })
            .unwrap()
            .result;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].object_ref, call_ref);
        assert_eq!(found[0].project_id, PROJECT);

        let purged = sender
            .feedback_purge(FeedbackPurgeReq {
                project_id: PROJECT.to_string(),
                ids: vec![feedback.id],
            })
            .unwrap();
        assert_eq!(purged.num_deleted, 1);

        let mut costs = BTreeMap::new();
        costs.insert(
            "echo-1".to_string(),
            CostCreateInput {
                prompt_token_cost: 0.5,
                completion_token_cost: 1.5,
                provider_id: None,
            },
        );
        let created = sender
            .cost_create(CostCreateReq {
                project_id: PROJECT.to_string(),
                costs,
                user_id: None,
            })
            .unwrap();
        let listed = sender
            .cost_query(CostQueryReq {
                project_id: PROJECT.to_string(),
                llm_ids: None,
                limit: None,
            })
            .unwrap()
            .results;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].created_by, USER);
        sender
            .cost_purge(CostPurgeReq {
                project_id: PROJECT.to_string(),
                ids: created.ids.into_iter().map(|c| c.id).collect(),
            })
            .unwrap();

        let completion = sender.completions_create(completion_req()).unwrap();
        assert_eq!(
            completion.response["choices"][0]["message"]["content"],
            json!("echo: hello over ipc")
        );
        assert!(completion.call_id.is_none());

        let text: String = sender
            .completions_create_stream(completion_req())
            .unwrap()
            .map(|chunk| chunk.unwrap().delta)
            .collect();
        assert_eq!(text, "echo: hello over ipc");
    }

    #[test]
    fn test_each_request_reaches_backend_once() {
        let store = Arc::new(InMemoryTraceServer::new());
        let receiver = guarded_receiver(store.clone());
        let sender = receiver.get_sender();

        sender.call_start(start_req(PROJECT, "c1", None)).unwrap();
        let _: Vec<_> = sender
            .completions_create_stream(completion_req())
            .unwrap()
            .collect();
        sender
            .calls_query_stats(CallsQueryStatsReq {
                project_id: PROJECT.to_string(),
                filter: CallsFilter::default(),
            })
            .unwrap();
        assert_eq!(store.invocation_count(), 3);
    }
}
