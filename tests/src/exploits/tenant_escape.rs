//! # Tenant Escape Attempts
//!
//! Code running in the child only holds channel endpoints, so every escape
//! has to go through the parent's identity adapter. Each attempt below must
//! be refused there, before the store sees it.
//!
//! | Attempt | Expected refusal |
//! |---------|------------------|
//! | Foreign project in a request | project mismatch |
//! | Foreign user in a request | user mismatch |
//! | Ref into a foreign project | project mismatch |
//! | Internal ref smuggled from the child | not an external ref |
//! | Ref with an unknown entity | untranslatable id |
//! | Bare internal project id | untranslatable id |
//!
//! A child also must not reach the channels of other invocations running in
//! the same parent: it inherits no descriptor beyond its own.

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::fs::File;
    use std::io::Write;
    use std::mem::ManuallyDrop;
    use std::os::fd::FromRawFd;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use serde_json::json;
    use trace_ipc::{
        IdentityContext, IdentityEnforcingServer, PlaceholderEntityIdConverter, Receiver,
        RpcMethod, RpcRequest,
    };
    use trace_store::InMemoryTraceServer;
    use trace_types::*;

    use crate::fixtures::*;

    /// Run `attempt` in a child and return the refusal it observed.
    fn refusal<F>(store: Arc<InMemoryTraceServer>, attempt: F) -> String
    where
        F: FnOnce(&dyn TraceServer) -> TraceResult<()>,
    {
        runtime(store)
            .run(
                |_req: TaskReq, client| match attempt(client.server().as_ref()) {
                    Ok(()) => anyhow::bail!("attempt was not refused"),
                    Err(e) => Ok(e.to_string()),
                },
                TaskReq::new("escape"),
                PROJECT,
                USER,
                Some(Duration::from_secs(20)),
            )
            .unwrap()
    }

    #[test]
    fn test_foreign_project_refused() {
        let store = Arc::new(InMemoryTraceServer::new());
        let msg = refusal(store.clone(), |server| {
            server.call_start(start_req(FOREIGN_PROJECT, "c1", None))?;
            Ok(())
        });
        assert!(msg.contains("does not match"), "{msg}");
        assert_eq!(store.invocation_count(), 0);
    }

    #[test]
    fn test_foreign_user_refused() {
        let store = Arc::new(InMemoryTraceServer::new());
        let msg = refusal(store.clone(), |server| {
            let mut costs = BTreeMap::new();
            costs.insert(
                "gpt".to_string(),
                CostCreateInput {
                    prompt_token_cost: 0.0,
                    completion_token_cost: 0.0,
                    provider_id: None,
                },
            );
            server.cost_create(CostCreateReq {
                project_id: PROJECT.to_string(),
                costs,
                user_id: Some(FOREIGN_USER.to_string()),
            })?;
            Ok(())
        });
        assert!(msg.contains("does not match"), "{msg}");
        assert_eq!(store.invocation_count(), 0);
    }

    #[test]
    fn test_foreign_ref_refused() {
        let store = Arc::new(InMemoryTraceServer::new());
        let msg = refusal(store.clone(), |server| {
            server.refs_read_batch(RefsReadBatchReq {
                refs: vec![
                    TraceRef::object(PROJECT, "Mine", "d1").to_external_uri(),
                    TraceRef::object(FOREIGN_PROJECT, "Theirs", "d2").to_external_uri(),
                ],
            })?;
            Ok(())
        });
        assert!(msg.contains("does not match"), "{msg}");
        assert_eq!(store.invocation_count(), 0);
    }

    #[test]
    fn test_smuggled_internal_ref_refused() {
        let store = Arc::new(InMemoryTraceServer::new());
        let msg = refusal(store.clone(), |server| {
            server.feedback_create(FeedbackCreateReq {
                project_id: PROJECT.to_string(),
                object_ref: "trace-internal:///p-2/call/c1".to_string(),
                feedback_type: "note".to_string(),
                payload: json!({}),
                user_id: None,
            })?;
            Ok(())
        });
        assert!(msg.contains("not an external ref"), "{msg}");
        assert_eq!(store.invocation_count(), 0);
    }

    #[test]
    fn test_unknown_entity_refused() {
        let store = Arc::new(InMemoryTraceServer::new());
        let msg = refusal(store.clone(), |server| {
            server.refs_read_batch(RefsReadBatchReq {
                refs: vec!["trace:///evil-corp/p-1/object/Model:d1".to_string()],
            })?;
            Ok(())
        });
        assert!(msg.contains("invalid identifier"), "{msg}");
        assert_eq!(store.invocation_count(), 0);
    }

    #[test]
    fn test_bare_internal_project_refused() {
        let store = Arc::new(InMemoryTraceServer::new());
        let msg = refusal(store.clone(), |server| {
            server.calls_query_stats(CallsQueryStatsReq {
                project_id: INTERNAL_PROJECT.to_string(),
                filter: CallsFilter::default(),
            })?;
            Ok(())
        });
        assert!(msg.contains("invalid identifier"), "{msg}");
        assert_eq!(store.invocation_count(), 0);
    }

    #[test]
    fn test_refusal_does_not_poison_session() {
        let store = Arc::new(InMemoryTraceServer::new());
        let count: usize = runtime(store.clone())
            .run(
                |_req: TaskReq, client| {
                    let server = client.server();
                    assert!(server
                        .call_start(start_req(FOREIGN_PROJECT, "bad", None))
                        .is_err());
                    server.call_start(start_req(PROJECT, "good", None))?;
                    Ok(client.query_calls(CallsFilter::default())?.len())
                },
                TaskReq::new("mixed"),
                PROJECT,
                USER,
                Some(Duration::from_secs(20)),
            )
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(store.invocation_count(), 2);
    }

    /// A length-prefixed `obj_create` for the other tenant's project.
    fn planted_object_frame() -> Vec<u8> {
        let call = RpcMethod::ObjCreate(ObjCreateReq {
            obj: ObjSchemaForInsert {
                project_id: FOREIGN_PROJECT.to_string(),
                object_id: "Planted".to_string(),
                val: json!({"by": USER}),
                user_id: None,
            },
        });
        let body = serde_json::to_vec(&RpcRequest::new("planted".to_string(), &call).unwrap())
            .unwrap();
        let mut frame = (body.len() as u32).to_be_bytes().to_vec();
        frame.extend(body);
        frame
    }

    #[test]
    #[allow(unsafe_code)]
    fn test_child_cannot_reach_other_invocations_channels() {
        // Another tenant's session, live in the same parent.
        let victim_store = Arc::new(InMemoryTraceServer::new());
        let victim = Receiver::with_config(
            Arc::new(
                IdentityEnforcingServer::new(
                    victim_store.clone(),
                    IdentityContext::new(FOREIGN_PROJECT, "bob").unwrap(),
                    Arc::new(PlaceholderEntityIdConverter::new(ENTITY)),
                )
                .unwrap(),
            ),
            fast_ipc_config(),
            || {},
        )
        .unwrap();

        let frame = planted_object_frame();
        let _ = runtime(Arc::new(InMemoryTraceServer::new())).run(
            move |_req: TaskReq, _client| {
                for fd in 3..1024 {
                    // SAFETY: the descriptor is borrowed for one write and
                    // never closed here.
                    let mut file = ManuallyDrop::new(unsafe { File::from_raw_fd(fd) });
                    let _ = file.write_all(&frame);
                }
                Ok(())
            },
            TaskReq::new("fd-walk"),
            PROJECT,
            USER,
            Some(Duration::from_secs(20)),
        );

        // Give the victim's worker time to serve anything that got through.
        thread::sleep(Duration::from_millis(300));
        victim.stop();
        assert_eq!(victim_store.invocation_count(), 0);
    }
}
