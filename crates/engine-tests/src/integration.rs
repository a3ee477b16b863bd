#[cfg(test)]
mod tests {
    use crate::{CONTAINER, Harness, TABLE, partitioned_csv, settings, utils::FlakyTableStore};
    use connectors::{
        blob::BlobStore, queue::fs::FsJobQueue, table::TableStore,
    };
    use engine_config::settings::IngestSettings;
    use engine_processing::error::ConsumerError;
    use engine_runtime::error::IngestError;
    use model::{
        core::{
            identifiers::BlobRef,
            value::{Value, ValueMode},
        },
        execution::job::{InputLocation, JobSpec},
    };
    use std::{fmt::Write, sync::Arc};
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn validation_reports_spread_and_duplicates_without_writing() {
        let h = Harness::new();
        let mut csv = String::from("region,id,amount\n");
        for i in 0..997 {
            let _ = writeln!(csv, "r{},{},1", i % 10, i);
        }
        for i in 0..3 {
            let _ = writeln!(csv, "r{},{},2", i % 10, i);
        }
        let path = h.write_input("orders.csv", &csv);
        let job = h.job(&path);

        let flaky = Arc::new(FlakyTableStore::new(h.tables.clone()));
        let engine = h.engine(flaky.clone(), settings(50));
        let report = engine.validate(&job).await.unwrap();

        assert_eq!(report.total_rows, 1000);
        assert_eq!(report.distinct_partitions, 10);
        assert_eq!(report.avg_rows_per_partition, 100.0);
        assert_eq!(report.duplicates, 3);
        assert_eq!(report.illegal_keys, 0);

        assert_eq!(flaky.attempts(), 0);
        assert_eq!(flaky.ensure_calls(), 0);
        assert!(engine.status(&job).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn illegal_keys_are_counted_not_written() {
        let h = Harness::new();
        let path = h.write_input("orders.csv", "region,id,name\na/b,r1,x\na,r1,y\n");
        let job = h.job(&path);

        let status = h
            .plain_engine(settings(50))
            .upload(&job, CancellationToken::new())
            .await
            .unwrap();

        assert!(status.completed);
        assert_eq!(status.total_read, 2);
        assert_eq!(status.total_skipped, 1);
        assert_eq!(status.total_committed, 1);

        let entities = h.tables.scan(TABLE).await.unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].partition_key, "a");
        assert_eq!(entities[0].properties["name"], Value::from("y"));
    }

    #[tokio::test]
    async fn empty_inputs_complete_cleanly() {
        let h = Harness::new();
        let engine = h.plain_engine(settings(50));

        let path = h.write_input("empty.csv", "");
        let status = engine
            .upload(&h.job(&path), CancellationToken::new())
            .await
            .unwrap();
        assert!(status.completed);
        assert_eq!(status.total_read, 0);
        assert_eq!(status.total_committed, 0);

        let path = h.write_input("header.csv", "region,id\n");
        let status = engine
            .upload(&h.job(&path), CancellationToken::new())
            .await
            .unwrap();
        assert!(status.completed);
        assert_eq!(status.total_read, 0);
        assert_eq!(status.percent_complete(), 100);

        let report = engine.validate(&h.job(&path)).await.unwrap();
        assert_eq!(report.total_rows, 0);
        assert_eq!(report.avg_rows_per_partition, 0.0);
    }

    #[tokio::test]
    async fn missing_key_column_fails_before_any_write() {
        let h = Harness::new();
        let path = h.write_input("orders.csv", "region,name\neu,x\n");
        let job = h.job(&path);
        let flaky = Arc::new(FlakyTableStore::new(h.tables.clone()));
        let engine = h.engine(flaky.clone(), settings(50));

        let err = engine
            .upload(&job, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IngestError::Consumer(ConsumerError::ColumnNotFound(ref c)) if c == "id"
        ));
        assert_eq!(flaky.ensure_calls(), 0);
        assert!(engine.status(&job).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_row_fails_the_run_after_committed_batches() {
        let h = Harness::new();
        let mut csv = partitioned_csv(20, 1);
        csv.push_str("r0,broken\n");
        let path = h.write_input("orders.csv", &csv);
        let job = h.job(&path);

        let err = h
            .plain_engine(settings(10))
            .upload(&job, CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            IngestError::RunFailed {
                rows_read,
                rows_committed,
                ..
            } => {
                assert_eq!(rows_read, 20);
                assert_eq!(rows_committed, 20);
            }
            other => panic!("expected a failed run, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn queued_job_uploads_from_the_blob_store() {
        let h = Harness::new();
        let path = h.write_input("orders.csv", &partitioned_csv(75, 3));
        let job = h.job(&path);
        let queue = FsJobQueue::new(h.dir.path().join("jobs"));
        let engine = h.plain_engine(settings(25));

        let queued = engine.queue_job(&job, &queue).await.unwrap();
        let blob = BlobRef::new(CONTAINER, "orders.csv");
        assert!(h.blobs.exists(&blob).await.unwrap());
        assert_eq!(queued.job.input, InputLocation::Blob(blob));

        // A worker picks the message up and runs it.
        let pending = queue.pending().await.unwrap();
        let remote: JobSpec = serde_json::from_str(&pending[0]).unwrap();
        let status = engine
            .upload(&remote, CancellationToken::new())
            .await
            .unwrap();
        assert!(status.completed);
        assert_eq!(status.total_committed, 75);

        // The local job shares the checkpoint and the content fingerprint.
        let local = engine.upload(&job, CancellationToken::new()).await.unwrap();
        assert!(local.last_modified.is_some());
        assert_eq!(local.total_committed, 75);
    }

    #[tokio::test]
    async fn inferred_values_keep_keys_as_text() {
        let h = Harness::new();
        let path = h.write_input(
            "typed.csv",
            "region\tid\tqty\tactive\tnote\n01\t7\t42\ttrue\t\n",
        );
        let job = h.job(&path);
        let settings = IngestSettings {
            value_mode: ValueMode::Infer,
            delimiter: '\t',
            ..settings(50)
        };

        h.plain_engine(settings)
            .upload(&job, CancellationToken::new())
            .await
            .unwrap();

        let entity = h.tables.get(TABLE, "01", "7").await.unwrap().unwrap();
        assert_eq!(entity.properties["region"], Value::String("01".into()));
        assert_eq!(entity.properties["id"], Value::String("7".into()));
        assert_eq!(entity.properties["qty"], Value::Int(42));
        assert_eq!(entity.properties["active"], Value::Boolean(true));
        assert_eq!(entity.properties["note"], Value::Null);
    }
}
