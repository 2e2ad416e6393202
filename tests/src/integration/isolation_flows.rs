//! # Isolation Flows
//!
//! RunAsUser end to end: a forked child talking back to the parent's store
//! through the channel pair.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use isolation_runtime::{run_model, ModelInputs, ModelRunner, RunAsUserError, RunModelReq};
    use serde_json::json;
    use trace_store::InMemoryTraceServer;
    use trace_telemetry::{init_telemetry, TelemetryConfig};
    use trace_types::*;

    use crate::fixtures::*;

    #[test]
    fn test_child_streams_from_parent_store() {
        let store = Arc::new(InMemoryTraceServer::new());
        for i in 0..25 {
            store
                .call_start(start_req(INTERNAL_PROJECT, &format!("c{i:02}"), None))
                .unwrap();
        }

        let ids: Vec<String> = runtime(store)
            .run(
                |_req: TaskReq, client| {
                    let stream = client.server().calls_query_stream(CallsQueryReq {
                        project_id: client.project_id().to_string(),
                        filter: CallsFilter::default(),
                        limit: None,
                        offset: None,
                    })?;
                    Ok(stream.map(|c| c.map(|c| c.id)).collect::<TraceResult<_>>()?)
                },
                TaskReq::new("stream"),
                PROJECT,
                USER,
                Some(Duration::from_secs(20)),
            )
            .unwrap();
        let expected: Vec<String> = (0..25).map(|i| format!("c{i:02}")).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_child_threads_share_one_sender() {
        let store = Arc::new(InMemoryTraceServer::new());
        let started: usize = runtime(store.clone())
            .run(
                |_req: TaskReq, client| {
                    let workers: Vec<_> = (0..4)
                        .map(|t| {
                            let client = client.clone();
                            thread::spawn(move || -> anyhow::Result<()> {
                                for i in 0..10 {
                                    let id = client.start_call("step", json!({"t": t, "i": i}))?;
                                    client.finish_call(&id, Some(json!(i)), None)?;
                                }
                                Ok(())
                            })
                        })
                        .collect();
                    for worker in workers {
                        worker
                            .join()
                            .map_err(|_| anyhow::anyhow!("worker panicked"))??;
                    }
                    Ok(client.query_calls(CallsFilter::default())?.len())
                },
                TaskReq::new("threads"),
                PROJECT,
                USER,
                Some(Duration::from_secs(30)),
            )
            .unwrap();
        assert_eq!(started, 40);
        assert_eq!(
            store
                .calls_query_stats(CallsQueryStatsReq {
                    project_id: INTERNAL_PROJECT.to_string(),
                    filter: CallsFilter::default(),
                })
                .unwrap()
                .count,
            40
        );
    }

    #[test]
    fn test_concurrent_invocations_stay_separate() {
        let store = Arc::new(InMemoryTraceServer::new());
        let handles: Vec<_> = (0..4)
            .map(|n| {
                let store = store.clone();
                thread::spawn(move || {
                    runtime(store)
                        .run(
                            |req: TaskReq, client| {
                                let uri = client.save(&req.value, json!({"n": req.value}))?;
                                Ok(client.get(&uri)?)
                            },
                            TaskReq::new(&format!("obj-{n}")),
                            PROJECT,
                            USER,
                            Some(Duration::from_secs(20)),
                        )
                        .unwrap()
                })
            })
            .collect();

        let mut seen: Vec<serde_json::Value> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        seen.sort_by_key(|v| v["n"].as_str().unwrap_or_default().to_string());
        assert_eq!(
            seen,
            vec![
                json!({"n": "obj-0"}),
                json!({"n": "obj-1"}),
                json!({"n": "obj-2"}),
                json!({"n": "obj-3"}),
            ]
        );
    }

    #[test]
    fn test_run_model_with_logging_installed() {
        init_telemetry(&TelemetryConfig {
            log_level: "warn".to_string(),
            ..TelemetryConfig::default()
        })
        .unwrap();

        let store = Arc::new(InMemoryTraceServer::new());
        let model_ref = isolation_runtime::ScopedClient::new(
            Arc::new(guarded(store.clone())),
            PROJECT,
            USER,
        )
        .save("Doubler", json!({"_class_name": "Doubler"}))
        .unwrap();

        let runner = ModelRunner::new().register("Doubler", |_, inputs| {
            Ok(json!(inputs.as_i64().unwrap_or_default() * 2))
        });
        let res = run_model(
            &runtime(store),
            &runner,
            RunModelReq {
                project_id: PROJECT.to_string(),
                user_id: Some(USER.to_string()),
                model_ref,
                inputs: ModelInputs::Inline(json!(21)),
            },
            PROJECT,
            USER,
            Some(Duration::from_secs(20)),
        )
        .unwrap();
        assert_eq!(res.output, json!(42));
        assert!(!res.call_id.is_empty());
    }

    #[test]
    fn test_unknown_model_class_fails_in_child() {
        let store = Arc::new(InMemoryTraceServer::new());
        let model_ref = isolation_runtime::ScopedClient::new(
            Arc::new(guarded(store.clone())),
            PROJECT,
            USER,
        )
        .save("Mystery", json!({"_class_name": "Unregistered"}))
        .unwrap();

        let err = run_model(
            &runtime(store),
            &ModelRunner::new(),
            RunModelReq {
                project_id: PROJECT.to_string(),
                user_id: Some(USER.to_string()),
                model_ref,
                inputs: ModelInputs::Inline(json!(null)),
            },
            PROJECT,
            USER,
            Some(Duration::from_secs(20)),
        )
        .unwrap_err();
        assert!(matches!(err, RunAsUserError::Exit { code: 1, .. }));
    }
}
