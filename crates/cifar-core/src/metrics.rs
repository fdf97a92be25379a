//! Evaluation metrics, the per-epoch console table, and metric logs.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::BestPolicy;
use crate::{Error, Result};

/// Confusion matrix over a fixed set of classes (actual x predicted).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfusionMatrix {
    counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    /// Creates an empty `num_classes` x `num_classes` matrix.
    pub fn new(num_classes: usize) -> Self {
        Self {
            counts: vec![vec![0; num_classes]; num_classes],
        }
    }

    /// Number of classes.
    pub fn num_classes(&self) -> usize {
        self.counts.len()
    }

    /// Records one prediction. Out-of-range indices are ignored.
    pub fn record(&mut self, actual: usize, predicted: usize) {
        if actual < self.counts.len() && predicted < self.counts.len() {
            self.counts[actual][predicted] += 1;
        }
    }

    /// Raw count for (actual, predicted).
    pub fn count(&self, actual: usize, predicted: usize) -> usize {
        self.counts[actual][predicted]
    }

    /// Total number of recorded samples.
    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// Fraction of samples on the diagonal.
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let correct: usize = (0..self.counts.len()).map(|i| self.counts[i][i]).sum();
        correct as f64 / total as f64
    }
}

impl std::fmt::Display for ConfusionMatrix {
    /// Renders rows of right-aligned counts, one line per actual class.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = self
            .counts
            .iter()
            .flatten()
            .map(|c| c.to_string().len())
            .max()
            .unwrap_or(1);

        for (i, row) in self.counts.iter().enumerate() {
            let cells: Vec<String> = row.iter().map(|c| format!("{c:>width$}")).collect();
            write!(f, "[{}]", cells.join(" "))?;
            if i + 1 < self.counts.len() {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// Aggregate result of one full pass over a dataset split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassMetrics {
    /// Mean loss over all batches
    pub loss: f64,
    /// Fraction of correctly classified samples
    pub accuracy: f64,
}

/// Metrics produced by one epoch, consumed by the logger and the
/// checkpoint decision. Not retained across epochs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochReport {
    /// Epoch index (0-based)
    pub epoch: usize,
    /// Effective learning rate during this epoch
    pub lr: f64,
    /// Training pass result
    pub train: PassMetrics,
    /// Evaluation pass result
    pub test: PassMetrics,
    /// Wall-clock minutes the epoch took
    pub minutes: f64,
}

/// Tracks the best test accuracy observed so far and decides whether
/// the current epoch qualifies for a checkpoint save.
#[derive(Debug, Clone)]
pub struct BestTracker {
    policy: BestPolicy,
    threshold: f64,
}

impl BestTracker {
    pub fn new(policy: BestPolicy) -> Self {
        Self {
            policy,
            threshold: 0.0,
        }
    }

    /// Current threshold an accuracy must meet to qualify.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Observes one epoch's test accuracy and returns whether it meets
    /// the save criterion. Under [`BestPolicy::TrackBest`] a qualifying
    /// accuracy becomes the new threshold; under
    /// [`BestPolicy::FrozenThreshold`] the threshold never moves.
    pub fn observe(&mut self, accuracy: f64) -> bool {
        let qualifies = accuracy >= self.threshold;
        if qualifies && self.policy == BestPolicy::TrackBest {
            self.threshold = accuracy;
        }
        qualifies
    }
}

/// Console metrics table with a periodically repeated header.
///
/// Column layout mirrors the historical script output:
/// `ep lr tr_loss tr_acc te_loss te_acc time`.
#[derive(Debug, Clone)]
pub struct MetricsTable {
    header_period: usize,
}

impl MetricsTable {
    pub fn new(header_period: usize) -> Self {
        assert!(header_period > 0, "header period must be positive");
        Self { header_period }
    }

    /// The column header line.
    pub fn header() -> String {
        format!(
            "{:>4}  {:>10}  {:>10}  {:>10}  {:>10}  {:>10}  {:>10}",
            "ep", "lr", "tr_loss", "tr_acc", "te_loss", "te_acc", "time"
        )
    }

    fn rule() -> String {
        Self::header()
            .chars()
            .map(|c| if c == ' ' { ' ' } else { '-' })
            .collect()
    }

    /// One data row for an epoch report.
    pub fn row(report: &EpochReport) -> String {
        format!(
            "{:>4}  {:>10.6}  {:>10.6}  {:>10.6}  {:>10.6}  {:>10.6}  {:>10.6}",
            report.epoch,
            report.lr,
            report.train.loss,
            report.train.accuracy,
            report.test.loss,
            report.test.accuracy,
            report.minutes
        )
    }

    /// Lines to print for this epoch: the header and a dashed rule are
    /// re-emitted whenever `epoch % header_period == 0`, otherwise a
    /// single data row.
    pub fn render(&self, report: &EpochReport) -> Vec<String> {
        let mut lines = Vec::with_capacity(3);
        if report.epoch % self.header_period == 0 {
            lines.push(Self::header());
            lines.push(Self::rule());
        }
        lines.push(Self::row(report));
        lines
    }
}

/// Append-only per-epoch confusion-matrix log (`conf_matrix.txt`).
///
/// Each epoch appends a block:
/// an `epoch<k>` line, a dashed separator, a loss/accuracy summary
/// line, the matrix rendering, and a blank line.
#[derive(Debug, Clone)]
pub struct MatrixLog {
    path: PathBuf,
}

impl MatrixLog {
    /// Log file name inside the run directory.
    pub const FILE_NAME: &'static str = "conf_matrix.txt";

    pub fn new(run_dir: &Path) -> Self {
        Self {
            path: run_dir.join(Self::FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one epoch block. Partial writes from an aborted epoch
    /// are left as-is; there is no rollback.
    pub fn append(&self, epoch: usize, test: &PassMetrics, matrix: &ConfusionMatrix) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(Error::Io)?;

        writeln!(file, "epoch{epoch}")?;
        writeln!(file, "{}", "-".repeat(20))?;
        writeln!(file, "va_loss:{:.6}, va_acc:{:.6}", test.loss, test.accuracy)?;
        writeln!(file, "{matrix}")?;
        writeln!(file)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(epoch: usize) -> EpochReport {
        EpochReport {
            epoch,
            lr: 0.01,
            train: PassMetrics {
                loss: 1.0,
                accuracy: 0.5,
            },
            test: PassMetrics {
                loss: 0.9,
                accuracy: 0.55,
            },
            minutes: 0.1,
        }
    }

    #[test]
    fn test_confusion_matrix_record_and_accuracy() {
        let mut matrix = ConfusionMatrix::new(3);
        matrix.record(0, 0);
        matrix.record(0, 1);
        matrix.record(1, 1);
        matrix.record(2, 2);

        assert_eq!(matrix.count(0, 0), 1);
        assert_eq!(matrix.count(0, 1), 1);
        assert_eq!(matrix.total(), 4);
        assert!((matrix.accuracy() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_confusion_matrix_ignores_out_of_range() {
        let mut matrix = ConfusionMatrix::new(2);
        matrix.record(5, 0);
        matrix.record(0, 5);
        assert_eq!(matrix.total(), 0);
    }

    #[test]
    fn test_confusion_matrix_rendering() {
        let mut matrix = ConfusionMatrix::new(2);
        matrix.record(0, 0);
        matrix.record(1, 0);
        matrix.record(1, 1);

        let text = matrix.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[1].ends_with(']'));
    }

    #[test]
    fn test_frozen_threshold_saves_every_epoch() {
        let mut tracker = BestTracker::new(BestPolicy::FrozenThreshold);
        // Accuracy goes up and back down; every epoch still qualifies.
        for accuracy in [0.1, 0.5, 0.3, 0.0, 0.8] {
            assert!(tracker.observe(accuracy));
        }
        assert_eq!(tracker.threshold(), 0.0);
    }

    #[test]
    fn test_track_best_saves_iff_running_max() {
        let mut tracker = BestTracker::new(BestPolicy::TrackBest);
        let accuracies = [0.1, 0.5, 0.3, 0.5, 0.8];
        let mut running_max = f64::MIN;
        for accuracy in accuracies {
            let expected = accuracy >= running_max.max(0.0);
            assert_eq!(tracker.observe(accuracy), expected);
            running_max = running_max.max(accuracy);
        }
        assert!((tracker.threshold() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_header_repeats_on_period_multiples() {
        let table = MetricsTable::new(10);
        for epoch in 0..25 {
            let lines = table.render(&report(epoch));
            if epoch % 10 == 0 {
                assert_eq!(lines.len(), 3, "epoch {epoch} should re-print the header");
                assert!(lines[0].contains("tr_loss"));
            } else {
                assert_eq!(lines.len(), 1, "epoch {epoch} should print one data row");
            }
        }
    }

    #[test]
    fn test_header_period_twenty() {
        let table = MetricsTable::new(20);
        assert_eq!(table.render(&report(0)).len(), 3);
        assert_eq!(table.render(&report(10)).len(), 1);
        assert_eq!(table.render(&report(20)).len(), 3);
    }

    #[test]
    fn test_matrix_log_blocks_in_order() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let log = MatrixLog::new(temp_dir.path());

        let test = PassMetrics {
            loss: 0.5,
            accuracy: 0.9,
        };
        let matrix = ConfusionMatrix::new(2);
        for epoch in 0..4 {
            log.append(epoch, &test, &matrix).unwrap();
        }

        let content = std::fs::read_to_string(log.path()).unwrap();
        let headers: Vec<&str> = content
            .lines()
            .filter(|l| l.starts_with("epoch"))
            .collect();
        assert_eq!(headers, vec!["epoch0", "epoch1", "epoch2", "epoch3"]);
        assert!(content.contains("va_loss:0.500000, va_acc:0.900000"));
    }
}
