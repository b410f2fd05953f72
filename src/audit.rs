//! Header-only consistency check over every pair in a corpus.

use crate::corpus::{Corpus, PairEntry};
use nifti::NiftiHeader;
use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum PairStatus {
    Ok,
    ShapeMismatch,
    Unreadable(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct PairReport {
    pub subject: String,
    pub source_shape: Option<Vec<usize>>,
    pub target_shape: Option<Vec<usize>>,
    pub status: PairStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AuditSummary {
    pub total: usize,
    pub ok: usize,
    pub mismatched: usize,
    pub unreadable: usize,
}

impl AuditSummary {
    pub fn from_reports(reports: &[PairReport]) -> Self {
        reports.iter().fold(Self { total: reports.len(), ..Self::default() }, |mut s, r| {
            match r.status {
                PairStatus::Ok => s.ok += 1,
                PairStatus::ShapeMismatch => s.mismatched += 1,
                PairStatus::Unreadable(_) => s.unreadable += 1,
            }
            s
        })
    }

    pub fn is_healthy(&self) -> bool {
        self.ok == self.total
    }
}

/// reads only the header of a volume and returns its shape with trailing singleton dims removed
pub fn header_shape(path: impl AsRef<Path>) -> Result<Vec<usize>, nifti::NiftiError> {
    let header = NiftiHeader::from_file(path)?;
    let ndim = (header.dim[0] as usize).min(7);
    let mut shape = header.dim[1..=ndim].iter().map(|&d| d as usize).collect::<Vec<_>>();
    while shape.len() > 3 && shape.last() == Some(&1) {
        shape.pop();
    }
    Ok(shape)
}

fn audit_pair(entry: &PairEntry) -> PairReport {
    let source = header_shape(&entry.source);
    let target = header_shape(&entry.target);

    let status = match (&source, &target) {
        (Ok(s), Ok(t)) if s == t => PairStatus::Ok,
        (Ok(_), Ok(_)) => PairStatus::ShapeMismatch,
        (Err(e), _) => PairStatus::Unreadable(format!("{}: {}", entry.source.display(), e)),
        (_, Err(e)) => PairStatus::Unreadable(format!("{}: {}", entry.target.display(), e)),
    };

    match &status {
        PairStatus::Ok => debug!("{}: ok", entry.subject),
        PairStatus::ShapeMismatch => warn!(
            "{}: shape mismatch {:?} vs {:?}",
            entry.subject,
            source.as_ref().ok(),
            target.as_ref().ok()
        ),
        PairStatus::Unreadable(msg) => warn!("{}: {}", entry.subject, msg),
    }

    PairReport {
        subject: entry.subject.clone(),
        source_shape: source.ok(),
        target_shape: target.ok(),
        status,
    }
}

/// checks every pair in parallel. Reports come back in corpus order.
pub fn audit(corpus: &Corpus) -> Vec<PairReport> {
    corpus.entries().par_iter().map(audit_pair).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Pairing;
    use ndarray::{Array3, Array4, ShapeBuilder};
    use nifti::writer::WriterOptions;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn audit_reports_each_pair() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("t1")).unwrap();
        fs::create_dir(root.join("t2")).unwrap();

        let a = Array3::<f32>::zeros((4, 5, 6).f());
        let b = Array3::<f32>::zeros((4, 5, 7).f());
        let a4 = Array4::<f32>::zeros((4, 5, 6, 1).f());

        WriterOptions::new(root.join("t1/a.nii")).write_nifti(&a).unwrap();
        WriterOptions::new(root.join("t2/a.nii")).write_nifti(&a4).unwrap();
        WriterOptions::new(root.join("t1/b.nii")).write_nifti(&a).unwrap();
        WriterOptions::new(root.join("t2/b.nii")).write_nifti(&b).unwrap();
        WriterOptions::new(root.join("t1/c.nii")).write_nifti(&a).unwrap();
        fs::write(root.join("t2/c.nii"), b"garbage").unwrap();

        let corpus = Corpus::discover(root, "t1", "t2", "*.nii*", Pairing::Subject).unwrap();
        let reports = audit(&corpus);

        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].status, PairStatus::Ok);
        assert_eq!(reports[0].source_shape, Some(vec![4, 5, 6]));
        assert_eq!(reports[1].status, PairStatus::ShapeMismatch);
        assert!(matches!(reports[2].status, PairStatus::Unreadable(ref m) if m.contains("c.nii")));

        let summary = AuditSummary::from_reports(&reports);
        assert_eq!(summary, AuditSummary { total: 3, ok: 1, mismatched: 1, unreadable: 1 });
        assert!(!summary.is_healthy());
    }
}
