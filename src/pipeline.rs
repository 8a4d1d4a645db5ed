use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::analysis;
use crate::error::{CheckError, ExtractError};
use crate::extract::GradeExtractor;
use crate::models::{PerformanceAnalysis, SubjectGrades};

pub const NO_GRADES_MESSAGE: &str =
    "No grades detected. Please ensure the PDF contains CBC results with grades (E, M, A, B).";

/// Converts raw document bytes into plain text.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError>;
}

/// Text extraction backed by `pdf-extract`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        if !is_pdf(None, bytes) {
            return Err(ExtractError::NotPdf);
        }
        Ok(pdf_extract::extract_text_from_mem(bytes)?)
    }
}

/// Checks the content type, then the `%PDF-` magic bytes.
pub fn is_pdf(content_type: Option<&str>, head: &[u8]) -> bool {
    let ct = content_type.unwrap_or("").to_ascii_lowercase();
    ct.contains("application/pdf") || head.starts_with(b"%PDF-")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Graded {
        subjects: SubjectGrades,
        analysis: PerformanceAnalysis,
    },
    NoGrades,
}

/// JSON body for a completed check.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResponse {
    pub subjects: SubjectGrades,
    pub analysis: Option<PerformanceAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<CheckOutcome> for CheckResponse {
    fn from(outcome: CheckOutcome) -> Self {
        match outcome {
            CheckOutcome::Graded { subjects, analysis } => Self {
                subjects,
                analysis: Some(analysis),
                message: None,
            },
            CheckOutcome::NoGrades => Self {
                subjects: SubjectGrades::new(),
                analysis: None,
                message: Some(NO_GRADES_MESSAGE.to_string()),
            },
        }
    }
}

pub struct GradeChecker {
    text: Arc<dyn TextExtractor>,
    grades: GradeExtractor,
}

impl GradeChecker {
    pub fn new(text: Arc<dyn TextExtractor>, grades: GradeExtractor) -> Self {
        Self { text, grades }
    }

    pub async fn check(&self, document: Vec<u8>) -> Result<CheckOutcome, CheckError> {
        if document.is_empty() {
            return Err(CheckError::MissingInput);
        }

        let extractor = Arc::clone(&self.text);
        let text = tokio::task::spawn_blocking(move || extractor.extract_text(&document))
            .await
            .map_err(|err| CheckError::internal(format!("text extraction task failed: {err}")))??;

        Ok(self.check_text(&text))
    }

    pub fn check_text(&self, text: &str) -> CheckOutcome {
        let subjects = self.grades.extract(text);

        match analysis::analyze(&subjects) {
            Some(analysis) => {
                info!(
                    subjects = analysis.total_subjects,
                    average = analysis.average_score,
                    tier = analysis.overall_performance.label(),
                    "report analyzed"
                );
                CheckOutcome::Graded { subjects, analysis }
            }
            None => {
                info!(chars = text.len(), "no grades detected in report");
                CheckOutcome::NoGrades
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::GradeCode;
    use crate::subjects::{Subject, SubjectCatalog};

    /// Treats the payload itself as the extracted text.
    pub(crate) struct PlainTextExtractor;

    impl TextExtractor for PlainTextExtractor {
        fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError> {
            String::from_utf8(bytes.to_vec()).map_err(|_| ExtractError::NotPdf)
        }
    }

    struct PanickingExtractor;

    impl TextExtractor for PanickingExtractor {
        fn extract_text(&self, _bytes: &[u8]) -> Result<String, ExtractError> {
            panic!("font table corrupted")
        }
    }

    pub(crate) fn plain_checker() -> GradeChecker {
        GradeChecker::new(
            Arc::new(PlainTextExtractor),
            GradeExtractor::new(&SubjectCatalog::cbc()).unwrap(),
        )
    }

    #[tokio::test]
    async fn graded_report_produces_analysis() {
        let outcome = plain_checker()
            .check(b"Mathematics E\nIntegrated Science M\n".to_vec())
            .await
            .unwrap();

        match outcome {
            CheckOutcome::Graded { subjects, analysis } => {
                assert_eq!(subjects[&Subject::Mathematics], GradeCode::E);
                assert_eq!(analysis.total_subjects, 2);
                assert_eq!(analysis.average_score, 80);
            }
            CheckOutcome::NoGrades => panic!("expected grades"),
        }
    }

    #[tokio::test]
    async fn report_without_grades_is_soft_result() {
        let outcome = plain_checker()
            .check(b"School fees balance: 4,500".to_vec())
            .await
            .unwrap();
        assert_eq!(outcome, CheckOutcome::NoGrades);
    }

    #[tokio::test]
    async fn empty_document_is_missing_input() {
        let err = plain_checker().check(Vec::new()).await.unwrap_err();
        assert!(matches!(err, CheckError::MissingInput));
    }

    #[tokio::test]
    async fn unreadable_document_is_decode_error() {
        let err = plain_checker().check(vec![0xff, 0xfe, 0x00]).await.unwrap_err();
        assert!(matches!(err, CheckError::Decode(ExtractError::NotPdf)));
    }

    #[tokio::test]
    async fn extractor_panic_becomes_internal_error() {
        let checker = GradeChecker::new(
            Arc::new(PanickingExtractor),
            GradeExtractor::new(&SubjectCatalog::cbc()).unwrap(),
        );
        let err = checker.check(b"%PDF-1.7".to_vec()).await.unwrap_err();
        assert!(matches!(err, CheckError::Internal(_)));
        assert!(!err.is_client_error());
    }

    #[test]
    fn pdf_extractor_rejects_non_pdf_bytes() {
        let err = PdfTextExtractor.extract_text(b"hello").unwrap_err();
        assert!(matches!(err, ExtractError::NotPdf));
        assert!(is_pdf(Some("Application/PDF"), b""));
        assert!(is_pdf(None, b"%PDF-1.4\n"));
    }

    #[test]
    fn no_grades_response_matches_wire_shape() {
        let json = serde_json::to_value(CheckResponse::from(CheckOutcome::NoGrades)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "subjects": {},
                "analysis": null,
                "message": NO_GRADES_MESSAGE,
            })
        );
    }

    #[test]
    fn graded_response_uses_subject_names_and_camel_case() {
        let outcome = plain_checker().check_text("Maths M\nCreative Arts E\n");
        let json = serde_json::to_value(CheckResponse::from(outcome)).unwrap();

        assert_eq!(json["subjects"]["Mathematics"], "M");
        assert_eq!(json["subjects"]["Creative Arts"], "E");
        assert_eq!(json["analysis"]["totalSubjects"], 2);
        assert_eq!(json["analysis"]["overallPerformance"], "Excellent");
        assert_eq!(
            json["analysis"]["recommendedPathways"][0],
            "Arts, Sports & Creative Industries"
        );
        assert!(json.get("message").is_none());
    }
}
