use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::build_info;

/// Outcome of a single case in a check run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaseOutcome {
    pub name: String,
    /// Seed the case's inputs were drawn with
    pub seed: u64,
    pub passed: bool,
    pub max_abs_diff: Option<f64>,
    pub error: Option<String>,
}

impl CaseOutcome {
    pub fn passed(name: &str, seed: u64, max_abs_diff: f64) -> Self {
        Self {
            name: name.to_string(),
            seed,
            passed: true,
            max_abs_diff: Some(max_abs_diff),
            error: None,
        }
    }

    pub fn failed<E: std::fmt::Display>(name: &str, seed: u64, error: &E) -> Self {
        Self {
            name: name.to_string(),
            seed,
            passed: false,
            max_abs_diff: None,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckRunReport {
    pub timestamp: String,
    pub crate_version: String,
    /// Seed forced on every case from the command line, if any
    pub seed_override: Option<u64>,
    pub cases: Vec<CaseOutcome>,
    pub notes: String,
}

impl CheckRunReport {
    pub fn new(seed_override: Option<u64>) -> Self {
        Self {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            crate_version: build_info::PKG_VERSION.to_string(),
            seed_override,
            cases: Vec::new(),
            notes: "".to_string(),
        }
    }

    pub fn record(&mut self, outcome: CaseOutcome) {
        self.cases.push(outcome);
    }

    pub fn add_note(&mut self, note: &str) {
        if !self.notes.is_empty() {
            self.notes.push('\n');
        }
        self.notes.push_str(note);
    }

    pub fn all_passed(&self) -> bool {
        self.cases.iter().all(|case| case.passed)
    }

    pub fn failed_count(&self) -> usize {
        self.cases.iter().filter(|case| !case.passed).count()
    }

    pub fn save(&self, report_dir: &Path) -> Result<PathBuf> {
        // Create directory if it doesn't exist
        fs::create_dir_all(report_dir)
            .with_context(|| format!("Failed to create {}", report_dir.display()))?;

        let filename = format!(
            "fusion_gru_check_{}.json",
            Local::now().format("%Y%m%d_%H%M%S%3f")
        );
        let file_path = report_dir.join(filename);

        // Serialize to JSON and save
        let json = serde_json::to_string_pretty(&self)?;
        let mut file = fs::File::create(&file_path)
            .with_context(|| format!("Failed to create {}", file_path.display()))?;
        file.write_all(json.as_bytes())?;

        Ok(file_path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&json).context("Failed to parse check run report")
    }
}
