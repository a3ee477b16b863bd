#[cfg(test)]
mod tests {
    use crate::{
        Harness, TABLE, partitioned_csv, settings,
        utils::{CountingStateStore, FlakyTableStore},
    };
    use connectors::table::TableStore;
    use engine_config::settings::IngestSettings;
    use engine_core::state::{StateStore, blob_store::BlobStateStore};
    use engine_processing::error::ConsumerError;
    use engine_runtime::error::IngestError;
    use std::{fmt::Write, sync::Arc};
    use tokio_util::sync::CancellationToken;
    use tracing_test::traced_test;

    #[tokio::test]
    #[traced_test]
    async fn failed_run_resumes_without_recommitting() {
        let h = Harness::new();
        let path = h.write_input("orders.csv", &partitioned_csv(1000, 10));
        let job = h.job(&path);

        // 10 partitions x 100 rows with a cap of 10: exactly 100 full batches.
        let flaky = Arc::new(FlakyTableStore::new(h.tables.clone()).fail_after(30));
        let err = h
            .engine(flaky.clone(), settings(10))
            .upload(&job, CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            IngestError::RunFailed { rows_committed, .. } => assert_eq!(rows_committed, 300),
            other => panic!("expected a failed run, got {other:?}"),
        }
        assert_eq!(h.stored_rows().await, 300);

        let saved = h.plain_engine(settings(10)).status(&job).await.unwrap().unwrap();
        assert!(!saved.completed);
        assert_eq!(saved.total_committed, 300);
        assert!(saved.total_committed <= saved.total_read);

        let healthy = Arc::new(FlakyTableStore::new(h.tables.clone()));
        let status = h
            .engine(healthy.clone(), settings(10))
            .upload(&job, CancellationToken::new())
            .await
            .unwrap();

        assert!(status.completed);
        assert_eq!(status.session_counter, 2);
        assert_eq!(status.start_row, 300);
        assert_eq!(status.total_read, 1000);
        assert_eq!(status.total_committed, 1000);
        assert_eq!(status.committed_this_session, 700);
        assert_eq!(healthy.commits(), 70);
        assert_eq!(h.stored_rows().await, 1000);
        assert!(logs_contain("Resuming interrupted upload"));
    }

    #[tokio::test]
    async fn cancelled_run_saves_progress_and_resumes() {
        let h = Harness::new();
        let path = h.write_input("orders.csv", &partitioned_csv(400, 4));
        let job = h.job(&path);

        let token = CancellationToken::new();
        let flaky =
            Arc::new(FlakyTableStore::new(h.tables.clone()).cancel_after(5, token.clone()));
        let err = h
            .engine(flaky.clone(), settings(10))
            .upload(&job, token)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(flaky.commits(), 5);

        let saved = h.plain_engine(settings(10)).status(&job).await.unwrap().unwrap();
        assert!(!saved.completed);
        assert_eq!(saved.total_committed, 50);

        let status = h
            .plain_engine(settings(10))
            .upload(&job, CancellationToken::new())
            .await
            .unwrap();
        assert!(status.completed);
        assert_eq!(status.total_committed, 400);
        assert_eq!(status.committed_this_session, 350);
        assert_eq!(h.stored_rows().await, 400);
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let h = Harness::new();
        let path = h.write_input("orders.csv", &partitioned_csv(30, 3));
        let job = h.job(&path);

        let flaky = Arc::new(FlakyTableStore::new(h.tables.clone()).transient_failures(2));
        let status = h
            .engine(flaky.clone(), settings(10))
            .upload(&job, CancellationToken::new())
            .await
            .unwrap();

        assert!(status.completed);
        assert_eq!(status.total_committed, 30);
        assert_eq!(flaky.commits(), 3);
        assert_eq!(flaky.attempts(), 5);
    }

    #[tokio::test]
    async fn exhausted_retries_fail_the_run() {
        let h = Harness::new();
        let path = h.write_input("orders.csv", &partitioned_csv(30, 3));
        let job = h.job(&path);

        // settings() allows 3 attempts per batch.
        let flaky = Arc::new(FlakyTableStore::new(h.tables.clone()).transient_failures(3));
        let err = h
            .engine(flaky.clone(), settings(10))
            .upload(&job, CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            IngestError::RunFailed {
                rows_committed,
                source,
                ..
            } => {
                assert_eq!(rows_committed, 0);
                assert!(matches!(
                    *source,
                    IngestError::Consumer(ConsumerError::RetriesExhausted { attempts: 3, .. })
                ));
            }
            other => panic!("expected a failed run, got {other:?}"),
        }
        assert_eq!(flaky.commits(), 0);
    }

    #[tokio::test]
    async fn completed_upload_is_not_repeated() {
        let h = Harness::new();
        let path = h.write_input("orders.csv", &partitioned_csv(120, 4));
        let job = h.job(&path);

        let mut first = h
            .plain_engine(settings(50))
            .upload(&job, CancellationToken::new())
            .await
            .unwrap();

        let flaky = Arc::new(FlakyTableStore::new(h.tables.clone()));
        let counting = Arc::new(CountingStateStore::new(Arc::new(BlobStateStore::new(
            h.blobs.clone(),
        ))));
        let mut second = h
            .engine(flaky.clone(), settings(50))
            .with_state(counting.clone())
            .upload(&job, CancellationToken::new())
            .await
            .unwrap();

        assert!(second.last_modified.is_some());
        first.last_modified = None;
        second.last_modified = None;
        assert_eq!(first, second);
        assert_eq!(flaky.attempts(), 0);
        assert_eq!(flaky.ensure_calls(), 0);
        assert_eq!(counting.saves(), 0);
    }

    #[tokio::test]
    async fn changed_input_restarts_from_zero() {
        let h = Harness::new();
        let path = h.write_input("orders.csv", &partitioned_csv(40, 2));
        let job = h.job(&path);
        let engine = h.plain_engine(settings(10));

        let first = engine.upload(&job, CancellationToken::new()).await.unwrap();
        assert!(first.completed);

        h.write_input("orders.csv", &partitioned_csv(60, 2));
        let flaky = Arc::new(FlakyTableStore::new(h.tables.clone()));
        let second = h
            .engine(flaky.clone(), settings(10))
            .upload(&job, CancellationToken::new())
            .await
            .unwrap();

        assert!(second.completed);
        assert_eq!(second.session_counter, 1);
        assert_eq!(second.start_row, 0);
        assert_eq!(second.total_read, 60);
        assert_eq!(second.total_committed, 60);
        assert_eq!(flaky.commits(), 6);
        assert_ne!(first.input_fingerprint, second.input_fingerprint);
    }

    #[tokio::test]
    async fn reset_forgets_progress() {
        let h = Harness::new();
        let path = h.write_input("orders.csv", &partitioned_csv(20, 2));
        let job = h.job(&path);
        let engine = h.plain_engine(settings(10));

        engine.upload(&job, CancellationToken::new()).await.unwrap();
        assert!(engine.reset(&job).await.unwrap());
        assert!(engine.status(&job).await.unwrap().is_none());
        assert!(!engine.reset(&job).await.unwrap());

        let state = BlobStateStore::new(h.blobs.clone());
        assert!(state.load_progress(&job).await.unwrap().is_none());

        let again = engine.upload(&job, CancellationToken::new()).await.unwrap();
        assert_eq!(again.session_counter, 1);
        assert_eq!(again.total_committed, 20);
    }

    #[tokio::test]
    #[traced_test]
    async fn changed_batch_size_restarts_from_zero() {
        let h = Harness::new();
        let path = h.write_input("orders.csv", &partitioned_csv(1000, 10));
        let job = h.job(&path);

        let flaky = Arc::new(FlakyTableStore::new(h.tables.clone()).fail_after(5));
        h.engine(flaky, settings(50))
            .upload(&job, CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(h.stored_rows().await, 250);

        // Batch positions recorded under a cap of 50 do not line up with a cap of 10.
        let healthy = Arc::new(FlakyTableStore::new(h.tables.clone()));
        let status = h
            .engine(healthy.clone(), settings(10))
            .upload(&job, CancellationToken::new())
            .await
            .unwrap();

        assert!(status.completed);
        assert_eq!(status.session_counter, 1);
        assert_eq!(status.start_row, 0);
        assert_eq!(status.max_batch_size, 10);
        assert_eq!(status.total_committed, 1000);
        assert_eq!(healthy.commits(), 100);
        assert_eq!(h.stored_rows().await, 1000);
        assert!(logs_contain("Batch size changed"));
    }

    fn checkpoint_every(rows: u64) -> IngestSettings {
        IngestSettings {
            checkpoint_interval: rows,
            ..settings(50)
        }
    }

    #[tokio::test]
    async fn long_scan_is_checkpointed_without_commits() {
        let h = Harness::new();
        // One row per partition: nothing fills up before the drain.
        let path = h.write_input("orders.csv", &partitioned_csv(100, 100));
        let job = h.job(&path);

        let counting = Arc::new(CountingStateStore::new(Arc::new(BlobStateStore::new(
            h.blobs.clone(),
        ))));
        let status = h
            .plain_engine(checkpoint_every(10))
            .with_state(counting.clone())
            .upload(&job, CancellationToken::new())
            .await
            .unwrap();
        assert!(status.completed);

        let scan: Vec<_> = counting
            .snapshots()
            .into_iter()
            .filter(|s| s.total_committed == 0 && s.total_read > 0)
            .collect();
        let reads: Vec<u64> = scan.iter().map(|s| s.total_read).collect();
        assert_eq!(reads, (1..=10).map(|i| i * 10).collect::<Vec<u64>>());
        assert!(scan.windows(2).all(|w| w[0].progress_bytes < w[1].progress_bytes));
        assert!(scan.iter().all(|s| !s.completed));

        // Initial save, ten scan checkpoints, one per drained batch, final save.
        assert_eq!(counting.saves(), 1 + 10 + 100 + 1);
    }

    #[tokio::test]
    async fn cancellation_mid_scan_keeps_read_progress() {
        let h = Harness::new();
        let content = partitioned_csv(100, 100);
        let path = h.write_input("orders.csv", &content);
        let job = h.job(&path);

        // Saves: initial, row 10, row 20. Shutdown is seen before row 21.
        let token = CancellationToken::new();
        let counting = Arc::new(
            CountingStateStore::new(Arc::new(BlobStateStore::new(h.blobs.clone())))
                .cancel_after(3, token.clone()),
        );
        let flaky = Arc::new(FlakyTableStore::new(h.tables.clone()));
        let err = h
            .engine(flaky.clone(), checkpoint_every(10))
            .with_state(counting.clone())
            .upload(&job, token)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(flaky.commits(), 0);

        let consumed: usize = content.lines().take(21).map(|l| l.len() + 1).sum();
        let saved = h
            .plain_engine(checkpoint_every(10))
            .status(&job)
            .await
            .unwrap()
            .unwrap();
        assert!(!saved.completed);
        assert_eq!(saved.total_read, 20);
        assert_eq!(saved.total_committed, 0);
        assert_eq!(saved.progress_bytes, consumed as u64);
        assert_eq!(h.stored_rows().await, 0);

        let status = h
            .plain_engine(checkpoint_every(10))
            .upload(&job, CancellationToken::new())
            .await
            .unwrap();
        assert!(status.completed);
        assert_eq!(status.session_counter, 2);
        assert_eq!(status.total_committed, 100);
        assert_eq!(h.stored_rows().await, 100);
    }

    /// 25 rows in `a`, 7 in `b`, 3 in `c` and 4 rows with illegal keys, interleaved.
    fn uneven_csv() -> String {
        let mut out = String::from("region,id,amount\n");
        let (mut a, mut b, mut c, mut bad) = (0, 0, 0, 0);
        for i in 0..39 {
            let region = match i % 5 {
                0 if bad < 4 => {
                    bad += 1;
                    "x/y"
                }
                1 | 3 if b < 7 => {
                    b += 1;
                    "b"
                }
                4 if c < 3 => {
                    c += 1;
                    "c"
                }
                _ => {
                    a += 1;
                    "a"
                }
            };
            let _ = writeln!(out, "{region},{i},{}", i * 10);
        }
        assert_eq!((a, b, c, bad), (25, 7, 3, 4));
        out
    }

    #[tokio::test]
    async fn resume_failing_in_drain_matches_an_uninterrupted_run() {
        let content = uneven_csv();

        let reference = Harness::new();
        let path = reference.write_input("orders.csv", &content);
        let expected = reference
            .plain_engine(settings(10))
            .upload(&reference.job(&path), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(expected.total_skipped, 4);
        let mut expected_rows = reference.tables.scan(TABLE).await.unwrap();

        let h = Harness::new();
        let path = h.write_input("orders.csv", &content);
        let job = h.job(&path);

        // Scan emits a[0,10) and a[10,20); the drain emits a[20,25), b[25,32), c[32,35).
        // The fourth commit, b, fails.
        let flaky = Arc::new(FlakyTableStore::new(h.tables.clone()).fail_after(3));
        h.engine(flaky, settings(10))
            .upload(&job, CancellationToken::new())
            .await
            .unwrap_err();
        let saved = h.plain_engine(settings(10)).status(&job).await.unwrap().unwrap();
        assert_eq!(saved.total_committed, 25);
        assert_eq!(saved.total_read, 39);
        assert_eq!(saved.total_skipped, 4);

        let healthy = Arc::new(FlakyTableStore::new(h.tables.clone()));
        let status = h
            .engine(healthy.clone(), settings(10))
            .upload(&job, CancellationToken::new())
            .await
            .unwrap();

        assert!(status.completed);
        assert_eq!(status.start_row, 25);
        assert_eq!(status.total_read, 39);
        assert_eq!(status.total_skipped, 4);
        assert_eq!(status.total_committed, 35);
        assert_eq!(status.committed_this_session, 10);
        assert_eq!(healthy.commits(), 2);

        let mut rows = h.tables.scan(TABLE).await.unwrap();
        // Row keys are unique across partitions.
        expected_rows.sort_by(|l, r| l.row_key.cmp(&r.row_key));
        rows.sort_by(|l, r| l.row_key.cmp(&r.row_key));
        assert_eq!(rows.len(), 35);
        assert_eq!(rows, expected_rows);
    }

    #[tokio::test]
    async fn default_settings_commit_batches_of_at_most_fifty() {
        let h = Harness::new();
        let path = h.write_input("orders.csv", &partitioned_csv(630, 3));
        let job = h.job(&path);

        let flaky = Arc::new(FlakyTableStore::new(h.tables.clone()));
        let status = h
            .engine(flaky.clone(), IngestSettings::default())
            .upload(&job, CancellationToken::new())
            .await
            .unwrap();

        assert!(status.completed);
        assert_eq!(status.total_committed, 630);
        // 210 rows per partition: four full batches and a drained batch of 10 each.
        assert_eq!(flaky.commits(), 15);
        assert_eq!(flaky.largest_batch(), 50);
        assert!(!flaky.mixed_partitions());
    }
}
