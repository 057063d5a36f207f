//! Batch enrichment: one search per input row against a fixed target.
//!
//! Rows run concurrently under a semaphore cap, each inside its own
//! [`SearchWorker`] with a child cancellation token. A task that overruns
//! its budget is cancelled, not merely abandoned. Outcomes are recorded per
//! row; one failing row never affects another.

use std::{
    io::{Read, Write},
    sync::Arc,
    time::Duration,
};

use tokio::{sync::Semaphore, task::JoinSet, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    config::SearchConfig,
    errors::FollowPathError,
    store::StoreConnector,
    types::Username,
    worker::{SearchWorker, WorkerOutcome},
};

pub const DEFAULT_USERNAME_COLUMN: &str = "username";
pub const PATHS_COLUMN: &str = "paths";
pub const ERROR_COLUMN: &str = "error";

/// One input record, fields kept in their original column order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchRow {
    pub fields: Vec<(String, String)>,
}

impl BatchRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field<K: Into<String>, V: Into<String>>(mut self, column: K, value: V) -> Self {
        self.fields.push((column.into(), value.into()));
        self
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchOutcomeRow {
    pub row: BatchRow,
    pub paths: Vec<Vec<Username>>,
    pub error: Option<FollowPathError>,
}

impl BatchOutcomeRow {
    fn from_worker(row: BatchRow, outcome: WorkerOutcome) -> Self {
        Self {
            row,
            paths: outcome.paths.unwrap_or_default(),
            error: outcome.error,
        }
    }

    pub fn paths_column(&self) -> String {
        format_paths(&self.paths)
    }

    pub fn error_column(&self) -> String {
        self.error
            .as_ref()
            .map(FollowPathError::diagnostic)
            .unwrap_or_default()
    }

    pub fn timed_out(&self) -> bool {
        matches!(self.error, Some(FollowPathError::Timeout(_)))
    }
}

/// `a→b→c` per path, paths separated by `;`.
pub fn format_paths(paths: &[Vec<Username>]) -> String {
    paths
        .iter()
        .map(|path| {
            path.iter()
                .map(Username::as_str)
                .collect::<Vec<_>>()
                .join("→")
        })
        .collect::<Vec<_>>()
        .join(";")
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub with_paths: usize,
    /// Searched successfully, nothing within the depth bound.
    pub empty: usize,
    /// Errors other than timeouts.
    pub failed: usize,
    pub timed_out: usize,
    pub elapsed: Duration,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[BatchOutcomeRow], elapsed: Duration) -> Self {
        let mut summary = Self {
            total: outcomes.len(),
            elapsed,
            ..Self::default()
        };
        for outcome in outcomes {
            match &outcome.error {
                Some(FollowPathError::Timeout(_)) => summary.timed_out += 1,
                Some(_) => summary.failed += 1,
                None if outcome.paths.is_empty() => summary.empty += 1,
                None => summary.with_paths += 1,
            }
        }
        summary
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchReport {
    /// One entry per input row, in input order.
    pub outcomes: Vec<BatchOutcomeRow>,
    pub summary: BatchSummary,
}

pub struct BatchOrchestrator<C> {
    connector: C,
    config: SearchConfig,
    username_column: String,
    cancel: CancellationToken,
}

impl<C> BatchOrchestrator<C>
where
    C: StoreConnector + Clone + 'static,
{
    pub fn new(connector: C, config: SearchConfig) -> Self {
        Self {
            connector,
            config,
            username_column: DEFAULT_USERNAME_COLUMN.to_string(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_username_column<T: Into<String>>(mut self, column: T) -> Self {
        self.username_column = column.into();
        self
    }

    /// Cancelling this token stops every task of the batch.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn username_column(&self) -> &str {
        &self.username_column
    }

    pub async fn run(&self, rows: Vec<BatchRow>, target: &str) -> BatchReport {
        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.config.batch_concurrency.max(1)));
        let budget = self.config.task_timeout();
        let max_depth = self.config.batch_max_depth;
        let options = self.config.search_options();
        let mut slots: Vec<Option<WorkerOutcome>> = (0..rows.len()).map(|_| None).collect();
        let mut tasks = JoinSet::new();

        for (index, row) in rows.iter().enumerate() {
            let source = match row.get(&self.username_column).map(str::trim) {
                Some(value) if !value.is_empty() => value.to_string(),
                _ => {
                    slots[index] = Some(WorkerOutcome::failed(
                        "",
                        FollowPathError::invalid_input(format!(
                            "row has no {} value",
                            self.username_column
                        )),
                    ));
                    continue;
                }
            };
            let worker = SearchWorker::new(self.connector.clone(), self.config.retry.clone(), options)
                .with_cancel(self.cancel.child_token());
            let semaphore = Arc::clone(&semaphore);
            let target = target.to_string();
            tasks.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => run_with_budget(&worker, &source, &target, max_depth, budget).await,
                    Err(_) => WorkerOutcome::failed(
                        &source,
                        FollowPathError::internal("batch scheduler closed"),
                    ),
                };
                (index, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    debug!(
                        row = index,
                        source = %outcome.source,
                        paths = outcome.path_count(),
                        "batch row finished"
                    );
                    slots[index] = Some(outcome);
                }
                Err(err) => error!(error = %err, "batch task aborted"),
            }
        }

        let outcomes: Vec<BatchOutcomeRow> = rows
            .into_iter()
            .zip(slots)
            .map(|(row, slot)| {
                let outcome = slot.unwrap_or_else(|| {
                    WorkerOutcome::failed("", FollowPathError::internal("search task aborted"))
                });
                BatchOutcomeRow::from_worker(row, outcome)
            })
            .collect();
        let summary = BatchSummary::from_outcomes(&outcomes, started.elapsed());
        info!(
            total = summary.total,
            with_paths = summary.with_paths,
            empty = summary.empty,
            failed = summary.failed,
            timed_out = summary.timed_out,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "batch finished"
        );
        BatchReport { outcomes, summary }
    }
}

async fn run_with_budget<C: StoreConnector>(
    worker: &SearchWorker<C>,
    source: &str,
    target: &str,
    max_depth: usize,
    budget: Duration,
) -> WorkerOutcome {
    match tokio::time::timeout(budget, worker.run(source, target, max_depth)).await {
        Ok(outcome) => outcome,
        Err(_) => {
            worker.cancel_token().cancel();
            WorkerOutcome::failed(
                source,
                FollowPathError::timeout(format!("search exceeded {budget:?}")),
            )
        }
    }
}

/// Header plus rows of a batch input file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchInput {
    pub headers: Vec<String>,
    pub rows: Vec<BatchRow>,
}

/// Parses a headed CSV. Every record must have exactly as many fields as the
/// header; a ragged record is rejected rather than truncated.
pub fn read_rows<R: Read>(reader: R) -> Result<BatchInput, FollowPathError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| FollowPathError::invalid_input(format!("csv header: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| FollowPathError::invalid_input(format!("csv row: {e}")))?;
        let fields = headers
            .iter()
            .zip(record.iter())
            .map(|(column, value)| (column.clone(), value.to_string()))
            .collect();
        rows.push(BatchRow { fields });
    }
    Ok(BatchInput { headers, rows })
}

/// Writes `headers` (minus any existing result columns) followed by the
/// `paths` and `error` columns, one record per outcome. Row fields are
/// written by position, so repeated column names keep their own values.
pub fn write_outcomes<W: Write>(
    writer: W,
    headers: &[String],
    outcomes: &[BatchOutcomeRow],
) -> Result<(), FollowPathError> {
    let columns: Vec<&str> = headers
        .iter()
        .map(String::as_str)
        .filter(|column| !is_result_column(column))
        .collect();
    let mut writer = csv::Writer::from_writer(writer);
    let csv_err = |e: csv::Error| FollowPathError::internal(format!("csv write: {e}"));

    let mut header = columns.clone();
    header.extend([PATHS_COLUMN, ERROR_COLUMN]);
    writer.write_record(&header).map_err(csv_err)?;
    for outcome in outcomes {
        let mut record: Vec<String> = outcome
            .row
            .fields
            .iter()
            .filter(|(column, _)| !is_result_column(column))
            .map(|(_, value)| value.clone())
            .collect();
        if record.len() != columns.len() {
            return Err(FollowPathError::invalid_input(format!(
                "row has {} fields, header has {}",
                record.len(),
                columns.len()
            )));
        }
        record.push(outcome.paths_column());
        record.push(outcome.error_column());
        writer.write_record(&record).map_err(csv_err)?;
    }
    writer
        .flush()
        .map_err(|e| FollowPathError::internal(format!("csv flush: {e}")))
}

fn is_result_column(column: &str) -> bool {
    column == PATHS_COLUMN || column == ERROR_COLUMN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_arrow_joined() {
        let paths = vec![
            vec![Username::from("ana"), Username::from("bia"), Username::from("caio")],
            vec![Username::from("ana"), Username::from("duda"), Username::from("caio")],
        ];
        assert_eq!(format_paths(&paths), "ana→bia→caio;ana→duda→caio");
        assert_eq!(format_paths(&[]), "");
    }

    #[test]
    fn csv_rows_keep_column_order() {
        let input = "id,username,city\n7, ana ,Recife\n8,bia,Natal\n";
        let parsed = read_rows(input.as_bytes()).unwrap();
        assert_eq!(parsed.headers, vec!["id", "username", "city"]);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].get("username"), Some("ana"));
        assert_eq!(parsed.rows[0].fields[2], ("city".to_string(), "Recife".to_string()));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let input = "id,username\n1,ana,extra\n";
        assert!(matches!(
            read_rows(input.as_bytes()),
            Err(FollowPathError::InvalidInput(msg)) if msg.starts_with("csv row")
        ));
        let short = "id,username,city\n1,ana\n";
        assert!(read_rows(short.as_bytes()).is_err());
    }

    #[test]
    fn repeated_columns_keep_their_own_values() {
        let parsed = read_rows("tag,username,tag\nfirst,ana,second\n".as_bytes()).unwrap();
        assert_eq!(parsed.rows[0].get("username"), Some("ana"));
        let outcomes = vec![BatchOutcomeRow {
            row: parsed.rows[0].clone(),
            paths: vec![vec![Username::from("ana"), Username::from("caio")]],
            error: None,
        }];
        let mut out = Vec::new();
        write_outcomes(&mut out, &parsed.headers, &outcomes).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "tag,username,tag,paths,error");
        assert_eq!(lines[1], "first,ana,second,ana→caio,");
    }

    #[test]
    fn existing_result_columns_are_replaced() {
        let parsed = read_rows("username,error,city\nana,stale,Recife\n".as_bytes()).unwrap();
        let outcomes = vec![BatchOutcomeRow {
            row: parsed.rows[0].clone(),
            paths: Vec::new(),
            error: None,
        }];
        let mut out = Vec::new();
        write_outcomes(&mut out, &parsed.headers, &outcomes).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().nth(1), Some("ana,Recife,,"));
    }

    #[test]
    fn output_appends_result_columns() {
        let row = BatchRow::new().with_field("id", "7").with_field("username", "ana");
        let outcomes = vec![
            BatchOutcomeRow {
                row: row.clone(),
                paths: vec![vec![Username::from("ana"), Username::from("zeca")]],
                error: None,
            },
            BatchOutcomeRow {
                row,
                paths: Vec::new(),
                error: Some(FollowPathError::not_found("user(s) not found")),
            },
        ];
        let headers = vec!["id".to_string(), "username".to_string(), "paths".to_string()];
        let mut out = Vec::new();
        write_outcomes(&mut out, &headers, &outcomes).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "id,username,paths,error");
        assert_eq!(lines[1], "7,ana,ana→zeca,");
        assert_eq!(lines[2], "7,ana,,user(s) not found");
    }

    #[test]
    fn summary_buckets() {
        let row = BatchRow::new();
        let outcomes = vec![
            BatchOutcomeRow {
                row: row.clone(),
                paths: vec![vec![Username::from("a")]],
                error: None,
            },
            BatchOutcomeRow {
                row: row.clone(),
                paths: Vec::new(),
                error: None,
            },
            BatchOutcomeRow {
                row: row.clone(),
                paths: Vec::new(),
                error: Some(FollowPathError::timeout("slow")),
            },
            BatchOutcomeRow {
                row,
                paths: Vec::new(),
                error: Some(FollowPathError::store_unavailable("down")),
            },
        ];
        let summary = BatchSummary::from_outcomes(&outcomes, Duration::ZERO);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.with_paths, 1);
        assert_eq!(summary.empty, 1);
        assert_eq!(summary.timed_out, 1);
        assert_eq!(summary.failed, 1);
    }
}
