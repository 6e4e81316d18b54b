//! Metrics records and the sinks they are appended to.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

/// Aggregate emitted by the designated worker at the logging cadence.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsRecord {
    /// Global frame count when the record was produced.
    pub frame: u64,
    /// Mean raw reward of the evaluation episodes.
    pub avg_reward: f64,
    /// Mean of the per-step max-Q values seen while evaluating.
    pub avg_max_q: f64,
    /// Mean current epsilon over all workers.
    pub avg_epsilon: f64,
}

impl MetricsRecord {
    /// Line logged for every record.
    pub fn summary_line(&self) -> String {
        format!(
            "Avg.Ep.R: {:.4}. Avg.Ep.Q: {:.4}. Avg.Eps: {:.4}. T: {}",
            self.avg_reward, self.avg_max_q, self.avg_epsilon, self.frame
        )
    }
}

/// Append-only destination for metrics records.
pub trait MetricsSink: Send {
    fn append(&mut self, record: &MetricsRecord);

    /// Flush any buffered output.
    fn flush(&mut self) {}
}

/// Writes the summary line through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl MetricsSink for ConsoleSink {
    fn append(&mut self, record: &MetricsRecord) {
        log::info!("{}", record.summary_line());
    }
}

/// CSV file sink for analysis.
///
/// Opens in append mode so a resumed run extends the same file; the header
/// is only written when the file is empty.
pub struct CsvSink {
    writer: BufWriter<File>,
}

impl CsvSink {
    pub const HEADER: &'static str = "frame,avg_reward,avg_max_q,avg_epsilon";

    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let empty = file.metadata()?.len() == 0;
        let mut writer = BufWriter::new(file);
        if empty {
            writeln!(writer, "{}", Self::HEADER)?;
        }
        Ok(Self { writer })
    }
}

impl MetricsSink for CsvSink {
    fn append(&mut self, record: &MetricsRecord) {
        let written = writeln!(
            self.writer,
            "{},{:.6},{:.6},{:.6}",
            record.frame, record.avg_reward, record.avg_max_q, record.avg_epsilon
        );
        if let Err(e) = written {
            log::warn!("Failed to write metrics record at frame {}: {}", record.frame, e);
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.writer.flush() {
            log::warn!("Failed to flush metrics file: {}", e);
        }
    }
}

impl Drop for CsvSink {
    fn drop(&mut self) {
        self.flush();
    }
}

/// In-memory sink; clones share the same record list.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<MetricsRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<MetricsRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl MetricsSink for MemorySink {
    fn append(&mut self, record: &MetricsRecord) {
        self.records.lock().push(record.clone());
    }
}

/// Fans every record out to several sinks.
#[derive(Default)]
pub struct MultiSink {
    sinks: Vec<Box<dyn MetricsSink>>,
}

impl MultiSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<S: MetricsSink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl MetricsSink for MultiSink {
    fn append(&mut self, record: &MetricsRecord) {
        for sink in &mut self.sinks {
            sink.append(record);
        }
    }

    fn flush(&mut self) {
        for sink in &mut self.sinks {
            sink.flush();
        }
    }
}

impl MetricsSink for Box<dyn MetricsSink> {
    fn append(&mut self, record: &MetricsRecord) {
        (**self).append(record);
    }

    fn flush(&mut self) {
        (**self).flush();
    }
}
