//! Per-iteration statistics and checkpoints.
use crate::errors::{ExperimentError, Result};
use crate::generation::IterationRecord;
use crate::session::Trainer;
use crate::store;

use morphevo_nn::networks::Encoding;

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// File name of the statistics table in a run directory.
pub const STATS_FILE: &str = "stats.csv";
/// File name of the resumable population checkpoint.
pub const POPULATION_FILE: &str = "population.ron";
/// File name of the champion snapshot.
pub const CHAMPION_FILE: &str = "champion.ron";

const HEADER: [&str; 7] = [
    "iteration",
    "best",
    "mean",
    "median",
    "minimum",
    "species",
    "elapsed_seconds",
];

/// Receives a record after every iteration of the generation loop.
pub trait StatsSink {
    /// # Errors
    /// Returns an error if the record cannot be stored,
    /// which ends the run.
    fn record(&mut self, record: &IterationRecord, trainer: &dyn Trainer) -> Result<()>;
}

/// Writes a run directory: one CSV row per iteration, plus the
/// latest population checkpoint and champion.
pub struct StatsRecorder {
    run_dir: PathBuf,
    writer: csv::Writer<File>,
}

impl StatsRecorder {
    /// Creates a fresh run directory under `results_dir`.
    ///
    /// # Errors
    /// Returns [`ExperimentError::Io`] if the directory or
    /// the statistics file cannot be created.
    pub fn create(results_dir: &Path, encoding: Encoding) -> Result<StatsRecorder> {
        let started = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        fs::create_dir_all(results_dir).map_err(|e| ExperimentError::io(results_dir, e))?;

        let base = format!("{}-{}", encoding, started);
        let mut run_dir = results_dir.join(&base);
        let mut suffix = 1;
        while run_dir.exists() {
            run_dir = results_dir.join(format!("{}-{}", base, suffix));
            suffix += 1;
        }
        fs::create_dir(&run_dir).map_err(|e| ExperimentError::io(&run_dir, e))?;

        let stats_path = run_dir.join(STATS_FILE);
        let mut writer = csv::Writer::from_path(&stats_path)
            .map_err(|e| ExperimentError::io(&stats_path, e.into()))?;
        writer
            .write_record(HEADER)
            .and_then(|_| writer.flush().map_err(csv::Error::from))
            .map_err(|e| ExperimentError::io(&stats_path, e.into()))?;

        log::info!("Writing results to {}", run_dir.display());
        Ok(StatsRecorder { run_dir, writer })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    fn write_row(&mut self, record: &IterationRecord) -> csv::Result<()> {
        let (mean, median, minimum) = record
            .stats
            .map_or((String::new(), String::new(), String::new()), |s| {
                (s.mean.to_string(), s.median.to_string(), s.minimum.to_string())
            });
        self.writer.write_record([
            record.iteration.to_string(),
            record.best_score.to_string(),
            mean,
            median,
            minimum,
            record.species_count.to_string(),
            format!("{:.3}", record.elapsed.as_secs_f64()),
        ])?;
        self.writer.flush()?;
        Ok(())
    }
}

impl StatsSink for StatsRecorder {
    fn record(&mut self, record: &IterationRecord, trainer: &dyn Trainer) -> Result<()> {
        let stats_path = self.run_dir.join(STATS_FILE);
        self.write_row(record)
            .map_err(|e| ExperimentError::io(&stats_path, e.into()))?;
        if let Some(population) = trainer.population() {
            store::save(&self.run_dir.join(POPULATION_FILE), population)?;
        }
        if let Some(champion) = trainer.champion() {
            store::save(&self.run_dir.join(CHAMPION_FILE), champion)?;
        }
        Ok(())
    }
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<IterationRecord>,
}

impl StatsSink for MemorySink {
    fn record(&mut self, record: &IterationRecord, _trainer: &dyn Trainer) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}
