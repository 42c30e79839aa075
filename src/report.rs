//! Report writers
//!
//! Completed runs are written as they finish, either as CSV (one header, one
//! row per run) or as JSON lines (one [`RunRecord`] per run). Transient
//! samples, when requested, go to a separate CSV time series.

use crate::simulation::{Metric, ScenarioRun, SimulationError, SimulationResult};
use crate::types::{EstimationMode, OutputFormat, RunId, ScenarioKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Sink for completed runs
pub trait ReportWriter {
    /// Append one run
    fn write_run(&mut self, run: &ScenarioRun) -> SimulationResult<()>;

    /// Flush buffered output
    fn finish(&mut self) -> SimulationResult<()>;
}

/// Open the writer for `format`, on `path` or stdout when `None`
pub fn open_report(path: Option<&str>, format: OutputFormat) -> SimulationResult<Box<dyn ReportWriter>> {
    let sink = open_sink(path)?;
    Ok(match format {
        OutputFormat::Csv => Box::new(CsvReportWriter::new(sink)),
        OutputFormat::Json => Box::new(JsonLinesWriter::new(sink)),
    })
}

fn open_sink(path: Option<&str>) -> SimulationResult<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(File::create(Path::new(path))?)),
        None => Box::new(io::stdout()),
    })
}

/// CSV report: `seed, arrival_rate, replication` then one column per metric
///
/// In batch-means mode every metric column is followed by its `_ci`
/// half-width column.
#[derive(Debug)]
pub struct CsvReportWriter<W: Write> {
    writer: W,
    header: Option<Vec<String>>,
}

impl<W: Write> CsvReportWriter<W> {
    /// Writer emitting the header before the first row
    pub fn new(writer: W) -> Self {
        Self { writer, header: None }
    }

    /// Underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn columns(metrics: &[Metric]) -> Vec<String> {
        let mut columns = vec!["seed".to_string(), "arrival_rate".to_string(), "replication".to_string()];
        for metric in metrics {
            columns.push(metric.name.clone());
            if metric.half_width.is_some() {
                columns.push(format!("{}_ci", metric.name));
            }
        }
        columns
    }
}

impl<W: Write> ReportWriter for CsvReportWriter<W> {
    fn write_run(&mut self, run: &ScenarioRun) -> SimulationResult<()> {
        let metrics = run.result.outcome.metrics();
        let columns = Self::columns(&metrics);
        match &self.header {
            None => {
                writeln!(self.writer, "{}", columns.join(","))?;
                self.header = Some(columns);
            }
            Some(header) if *header != columns => {
                return Err(SimulationError::configuration_error(
                    "report columns changed between runs",
                ));
            }
            Some(_) => {}
        }

        let mut row = vec![
            run.seed.to_string(),
            run.arrival_rate.to_string(),
            run.replication.map(|r| r.to_string()).unwrap_or_default(),
        ];
        for metric in &metrics {
            row.push(metric.value.to_string());
            if let Some(half_width) = metric.half_width {
                row.push(half_width.to_string());
            }
        }
        writeln!(self.writer, "{}", row.join(","))?;
        Ok(())
    }

    fn finish(&mut self) -> SimulationResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// One JSON-lines report record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Correlation id of the run
    pub run_id: RunId,
    /// When the record was written
    pub generated_at: DateTime<Utc>,
    /// Network shape
    pub scenario: ScenarioKind,
    /// Output-analysis method
    pub mode: EstimationMode,
    /// Super-run index, finite-horizon only
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub replication: Option<usize>,
    /// Seed planted before the run
    pub seed: u64,
    /// External arrival rate
    pub arrival_rate: f64,
    /// Events dispatched
    pub events: u64,
    /// Named metrics in record order
    pub metrics: Vec<Metric>,
}

impl RunRecord {
    /// Record of `run`, stamped now
    pub fn from_run(run: &ScenarioRun) -> Self {
        Self {
            run_id: run.run_id,
            generated_at: Utc::now(),
            scenario: run.scenario,
            mode: run.mode,
            replication: run.replication,
            seed: run.seed,
            arrival_rate: run.arrival_rate,
            events: run.result.events,
            metrics: run.result.outcome.metrics(),
        }
    }
}

/// JSON-lines report, one [`RunRecord`] per line
#[derive(Debug)]
pub struct JsonLinesWriter<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesWriter<W> {
    /// Wrap `writer`
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ReportWriter for JsonLinesWriter<W> {
    fn write_run(&mut self, run: &ScenarioRun) -> SimulationResult<()> {
        let line = serde_json::to_string(&RunRecord::from_run(run))?;
        writeln!(self.writer, "{}", line)?;
        Ok(())
    }

    fn finish(&mut self) -> SimulationResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// CSV time series of transient samples
///
/// Columns: `seed, arrival_rate, replication, time`, the running mean sojourn
/// of every center, then the network response time.
#[derive(Debug)]
pub struct SampleSeriesWriter<W: Write> {
    writer: W,
    header_written: bool,
}

impl<W: Write> SampleSeriesWriter<W> {
    /// Writer emitting the header before the first sample
    pub fn new(writer: W) -> Self {
        Self { writer, header_written: false }
    }

    /// Underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Append every sample of `run`
    pub fn write_samples(&mut self, run: &ScenarioRun) -> SimulationResult<()> {
        if run.result.samples.is_empty() {
            return Ok(());
        }
        if !self.header_written {
            let mut columns = vec![
                "seed".to_string(),
                "arrival_rate".to_string(),
                "replication".to_string(),
                "time".to_string(),
            ];
            columns.extend(run.result.centers.iter().map(|c| format!("{}_sojourn", c.name)));
            columns.push("network_response_time".to_string());
            writeln!(self.writer, "{}", columns.join(","))?;
            self.header_written = true;
        }

        let replication = run.replication.map(|r| r.to_string()).unwrap_or_default();
        for sample in &run.result.samples {
            let mut row = vec![
                run.seed.to_string(),
                run.arrival_rate.to_string(),
                replication.clone(),
                sample.time.to_string(),
            ];
            row.extend(sample.mean_sojourn.iter().map(|w| w.to_string()));
            row.push(sample.response_time.to_string());
            writeln!(self.writer, "{}", row.join(","))?;
        }
        Ok(())
    }

    /// Flush buffered output
    pub fn finish(&mut self) -> SimulationResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Sample series writer on the file at `path`
pub fn open_samples(path: &str) -> SimulationResult<SampleSeriesWriter<BufWriter<File>>> {
    Ok(SampleSeriesWriter::new(BufWriter::new(File::create(path)?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{BatchMeansSummary, Estimate, NetworkCounters, RunOutcome, RunResult, TransientSample};

    fn batch_run() -> ScenarioRun {
        ScenarioRun {
            run_id: RunId::new(),
            scenario: ScenarioKind::SingleServer,
            mode: EstimationMode::BatchMeans,
            replication: None,
            seed: 7,
            arrival_rate: 0.5,
            result: RunResult {
                outcome: RunOutcome::BatchMeans(BatchMeansSummary {
                    field_names: vec!["A_utilization".to_string(), "network_population".to_string()],
                    estimates: vec![
                        Estimate { mean: 0.35, half_width: 0.01 },
                        Estimate { mean: 0.54, half_width: 0.02 },
                    ],
                    batch_count: 64,
                    batch_length: 8192,
                    alpha: 0.05,
                }),
                samples: vec![TransientSample { time: 300.0, mean_sojourn: vec![1.1], response_time: 1.1 }],
                counters: NetworkCounters::default(),
                centers: vec![crate::simulation::CenterTotals {
                    name: "A".to_string(),
                    arrivals: 10,
                    departures: 9,
                    resident: 1,
                }],
                events: 19,
            },
        }
    }

    #[test]
    fn test_csv_header_and_row() {
        let mut writer = CsvReportWriter::new(Vec::new());
        writer.write_run(&batch_run()).unwrap();
        writer.write_run(&batch_run()).unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "seed,arrival_rate,replication,A_utilization,A_utilization_ci,network_population,network_population_ci"
        );
        assert_eq!(lines[1], "7,0.5,,0.35,0.01,0.54,0.02");
    }

    #[test]
    fn test_json_lines_record() {
        let mut writer = JsonLinesWriter::new(Vec::new());
        writer.write_run(&batch_run()).unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();
        let record: RunRecord = serde_json::from_str(text.trim()).unwrap();

        assert_eq!(record.seed, 7);
        assert_eq!(record.scenario, ScenarioKind::SingleServer);
        assert_eq!(record.metrics.len(), 2);
        assert_eq!(record.metrics[0].half_width, Some(0.01));
        assert!(record.replication.is_none());
    }

    #[test]
    fn test_sample_series() {
        let mut writer = SampleSeriesWriter::new(Vec::new());
        writer.write_samples(&batch_run()).unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "seed,arrival_rate,replication,time,A_sojourn,network_response_time");
        assert_eq!(lines[1], "7,0.5,,300,1.1,1.1");
    }

    #[test]
    fn test_open_report_on_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.jsonl");
        let path = path.to_str().unwrap();
        {
            let mut writer = open_report(Some(path), OutputFormat::Json).unwrap();
            writer.write_run(&batch_run()).unwrap();
            writer.finish().unwrap();
        }
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains("\"arrival_rate\":0.5"));
    }

    #[test]
    fn test_open_report_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("report.csv");
        assert!(matches!(
            open_report(path.to_str(), OutputFormat::Csv),
            Err(SimulationError::IoError(_))
        ));
    }
}
