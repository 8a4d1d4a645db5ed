use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::CheckError;
use crate::pipeline::{CheckOutcome, GradeChecker};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchRow {
    pub file: String,
    pub status: String,
    pub subjects_found: usize,
    pub average_score: Option<u32>,
    pub overall_performance: String,
    pub recommended_pathways: String,
    pub grades: String,
}

impl BatchRow {
    pub fn from_result(file: &str, result: &Result<CheckOutcome, CheckError>) -> Self {
        match result {
            Ok(CheckOutcome::Graded { subjects, analysis }) => Self {
                file: file.to_string(),
                status: "graded".to_string(),
                subjects_found: analysis.total_subjects,
                average_score: Some(analysis.average_score),
                overall_performance: analysis.overall_performance.label().to_string(),
                recommended_pathways: analysis
                    .recommended_pathways
                    .iter()
                    .map(|pathway| pathway.label())
                    .collect::<Vec<_>>()
                    .join("; "),
                grades: subjects
                    .iter()
                    .map(|(subject, grade)| format!("{}={}", subject, grade.letter()))
                    .collect::<Vec<_>>()
                    .join("; "),
            },
            Ok(CheckOutcome::NoGrades) => Self::empty(file, "no grades detected".to_string()),
            Err(err) => Self::empty(file, format!("error: {err}")),
        }
    }

    fn empty(file: &str, status: String) -> Self {
        Self {
            file: file.to_string(),
            status,
            subjects_found: 0,
            average_score: None,
            overall_performance: String::new(),
            recommended_pathways: String::new(),
            grades: String::new(),
        }
    }
}

pub fn collect_pdfs(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory {}", dir.display()))?
    {
        let path = entry?.path();
        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if path.is_file() && is_pdf {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Checks every PDF in `dir`. A failing file becomes an error row.
pub async fn run(checker: &GradeChecker, dir: &Path) -> anyhow::Result<Vec<BatchRow>> {
    let files = collect_pdfs(dir)?;
    let mut rows = Vec::with_capacity(files.len());

    for path in files {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let result = match std::fs::read(&path) {
            Ok(bytes) => checker.check(bytes).await,
            Err(err) => Err(CheckError::internal(format!("failed to read file: {err}"))),
        };

        if let Err(err) = &result {
            warn!(file = %name, error = %err, "report could not be checked");
        }
        rows.push(BatchRow::from_result(&name, &result));
    }

    info!(files = rows.len(), dir = %dir.display(), "batch complete");
    Ok(rows)
}

pub fn write_csv<W: std::io::Write>(writer: W, rows: &[BatchRow]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
