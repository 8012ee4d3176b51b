//! Object-store reader: lists Parquet objects under a partition
//! prefix and yields either a fully-materialised table or a lazy, bounded
//! sequence of row-batches.
//!
//! Partition-column predicates (`source`, `year`, `month`) are satisfied by
//! path selection alone; row-value predicates are applied as Arrow compute
//! post-filters so per-object statistics that are wider than the actual
//! values (a timestamp predicate crossing the month boundary, say) never
//! silently drop or keep rows incorrectly.

use std::sync::Arc;

use arrow::array::RecordBatch;
use arrow::compute::filter_record_batch;
use futures::{StreamExt, TryStreamExt};
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use parquet::arrow::async_reader::ParquetObjectReader;
use parquet::arrow::ParquetRecordBatchStreamBuilder;
use parquet::arrow::ProjectionMask;

use crate::error::{PipelineError, Stage};
use crate::model::ProviderKind;

/// How the reader hands batches back to the caller.
#[derive(Clone, Copy, Debug)]
pub enum ReadMode {
    /// Materialise the whole partition as one set of batches.
    Full,
    /// Yield batches of at most `chunk_size` rows, suspending the producer
    /// when the caller's channel is full.
    Streaming { chunk_size: usize },
}

/// A row-value predicate, applied as an Arrow compute post-filter after
/// partition-path pruning. `object_count` statistics may be wider than the
/// actual row values, so predicates over row values are always re-checked
/// here rather than trusted from file footers.
pub trait RowPredicate: Send + Sync {
    fn evaluate(&self, batch: &RecordBatch) -> arrow::error::Result<arrow::array::BooleanArray>;
}

/// A predicate that always passes every row; the default when the caller has
/// no row-value filter.
pub struct NoPredicate;

impl RowPredicate for NoPredicate {
    fn evaluate(&self, batch: &RecordBatch) -> arrow::error::Result<arrow::array::BooleanArray> {
        Ok(arrow::array::BooleanArray::from(vec![true; batch.num_rows()]))
    }
}

/// Reads Parquet partitions from an S3-compatible object store.
pub struct ObjectStoreReader {
    store: Arc<dyn ObjectStore>,
    parallel_readers: usize,
}

impl ObjectStoreReader {
    pub fn new(store: Arc<dyn ObjectStore>, parallel_readers: usize) -> Self {
        Self {
            store,
            parallel_readers: parallel_readers.max(1),
        }
    }

    /// Lists every object under `prefix` in lexicographic key order. Ordering
    /// matters only for the aggregator's best-effort usage_start locality;
    /// correctness never depends on it.
    pub async fn list_partition(
        &self,
        prefix: &str,
        provider: &str,
    ) -> Result<Vec<ObjectPath>, PipelineError> {
        let path = ObjectPath::from(prefix);
        let mut entries: Vec<ObjectPath> = self
            .store
            .list(Some(&path))
            .map(|res| res.map(|meta| meta.location))
            .try_collect()
            .await
            .map_err(|e| PipelineError::InputUnavailable {
                provider: provider.to_string(),
                stage: Stage::Reading,
                message: format!("listing prefix {prefix}"),
                cause: Some(Box::new(e)),
            })?;

        if entries.is_empty() {
            return Err(PipelineError::InputMissing {
                provider: provider.to_string(),
                stage: Stage::Reading,
                message: format!("no objects under prefix {prefix}"),
            });
        }

        entries.sort_by(|a, b| a.as_ref().cmp(b.as_ref()));
        Ok(entries)
    }

    /// Reads every object in `paths`, column-projected by `columns` (pass an
    /// empty slice for "all columns") and row-filtered by `predicate`, up to
    /// `self.parallel_readers` objects read concurrently. Returns the full
    /// set of batches in memory — `ReadMode::Full`.
    pub async fn read_full(
        &self,
        paths: &[ObjectPath],
        columns: &[&str],
        predicate: &dyn RowPredicate,
        provider: &str,
    ) -> Result<Vec<RecordBatch>, PipelineError> {
        let mut batches = Vec::new();
        for chunk in paths.chunks(self.parallel_readers) {
            let reads = chunk
                .iter()
                .map(|path| self.read_object(path, columns, usize::MAX, provider));
            let results = futures::future::join_all(reads).await;
            for result in results {
                batches.extend(result?);
            }
        }

        let mut filtered = Vec::with_capacity(batches.len());
        for batch in batches {
            let mask = predicate.evaluate(&batch).map_err(|e| PipelineError::InputSchema {
                provider: provider.to_string(),
                stage: Stage::Reading,
                message: format!("evaluating row predicate: {e}"),
            })?;
            let kept = filter_record_batch(&batch, &mask).map_err(|e| PipelineError::InputSchema {
                provider: provider.to_string(),
                stage: Stage::Reading,
                message: format!("applying row predicate: {e}"),
            })?;
            if kept.num_rows() > 0 {
                filtered.push(kept);
            }
        }
        Ok(filtered)
    }

    /// Reads a single Parquet object into row-group batches already sized by
    /// the underlying writer; `chunk_size = usize::MAX` keeps the writer's
    /// native batch size for full-mode reads.
    async fn read_object(
        &self,
        path: &ObjectPath,
        columns: &[&str],
        chunk_size: usize,
        provider: &str,
    ) -> Result<Vec<RecordBatch>, PipelineError> {
        let object_reader = ParquetObjectReader::new(self.store.clone(), path.clone());
        let mut builder = ParquetRecordBatchStreamBuilder::new(object_reader)
            .await
            .map_err(|e| PipelineError::InputCorrupt {
                provider: provider.to_string(),
                stage: Stage::Reading,
                message: format!("reading footer of {path}"),
                cause: Some(Box::new(e)),
            })?;

        if !columns.is_empty() {
            let schema_descr = builder.parquet_schema();
            let projected: Vec<usize> = schema_descr
                .columns()
                .iter()
                .enumerate()
                .filter(|(_, col)| columns.contains(&col.name()))
                .map(|(i, _)| i)
                .collect();
            if projected.len() != columns.len() {
                return Err(PipelineError::InputSchema {
                    provider: provider.to_string(),
                    stage: Stage::Reading,
                    message: format!("projection references a column absent from {path}"),
                });
            }
            let mask = ProjectionMask::leaves(schema_descr, projected);
            builder = builder.with_projection(mask);
        }

        if chunk_size != usize::MAX {
            builder = builder.with_batch_size(chunk_size);
        }

        let stream = builder.build().map_err(|e| PipelineError::InputCorrupt {
            provider: provider.to_string(),
            stage: Stage::Reading,
            message: format!("building batch stream for {path}"),
            cause: Some(Box::new(e)),
        })?;

        let batches: Vec<RecordBatch> = stream.try_collect().await.map_err(|e| PipelineError::InputCorrupt {
            provider: provider.to_string(),
            stage: Stage::Reading,
            message: format!("decoding {path}"),
            cause: Some(Box::new(e)),
        })?;
        Ok(batches)
    }

    /// Streaming mode: returns a bounded `tokio_stream` of row-batches for
    /// one partition, each at most `chunk_size` rows. The caller is expected
    /// to drive this with backpressure;
    /// nothing here buffers the whole partition in memory.
    pub fn read_streaming<'a>(
        &'a self,
        paths: &'a [ObjectPath],
        columns: &'a [&'a str],
        chunk_size: usize,
        provider: &'a str,
    ) -> impl futures::Stream<Item = Result<RecordBatch, PipelineError>> + 'a {
        async_stream::try_stream! {
            for path in paths {
                let object_reader = ParquetObjectReader::new(self.store.clone(), path.clone());
                let mut builder = ParquetRecordBatchStreamBuilder::new(object_reader)
                    .await
                    .map_err(|e| PipelineError::InputCorrupt {
                        provider: provider.to_string(),
                        stage: Stage::Reading,
                        message: format!("reading footer of {path}"),
                        cause: Some(Box::new(e)),
                    })?;

                if !columns.is_empty() {
                    let schema_descr = builder.parquet_schema();
                    let projected: Vec<usize> = schema_descr
                        .columns()
                        .iter()
                        .enumerate()
                        .filter(|(_, col)| columns.contains(&col.name()))
                        .map(|(i, _)| i)
                        .collect();
                    if projected.len() != columns.len() {
                        Err(PipelineError::InputSchema {
                            provider: provider.to_string(),
                            stage: Stage::Reading,
                            message: format!("projection references a column absent from {path}"),
                        })?;
                    }
                    let mask = ProjectionMask::leaves(schema_descr, projected);
                    builder = builder.with_projection(mask);
                }
                builder = builder.with_batch_size(chunk_size);

                let mut stream = builder.build().map_err(|e| PipelineError::InputCorrupt {
                    provider: provider.to_string(),
                    stage: Stage::Reading,
                    message: format!("building batch stream for {path}"),
                    cause: Some(Box::new(e)),
                })?;

                while let Some(batch) = stream.next().await {
                    let batch = batch.map_err(|e| PipelineError::InputCorrupt {
                        provider: provider.to_string(),
                        stage: Stage::Reading,
                        message: format!("decoding {path}"),
                        cause: Some(Box::new(e)),
                    })?;
                    yield batch;
                }
            }
        }
    }
}

/// Builds the object-store partition prefix:
/// `data/<org_id>/OCP|AWS/source=<uuid>/year=YYYY/month=MM/<subtype>/`.
pub fn partition_prefix(
    org_id: &str,
    provider_kind: ProviderKind,
    source_uuid: &uuid::Uuid,
    year: i32,
    month: u32,
    subtype: &str,
) -> String {
    let kind = match provider_kind {
        ProviderKind::Ocp => "OCP",
        ProviderKind::Aws => "AWS",
    };
    format!("data/{org_id}/{kind}/source={source_uuid}/year={year:04}/month={month:02}/{subtype}/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_prefix_matches_layout() {
        let uuid = uuid::Uuid::nil();
        let prefix = partition_prefix(
            "org1",
            ProviderKind::Ocp,
            &uuid,
            2026,
            7,
            "openshift_pod_usage_line_items_daily",
        );
        assert_eq!(
            prefix,
            format!("data/org1/OCP/source={uuid}/year=2026/month=07/openshift_pod_usage_line_items_daily/")
        );
    }
}
