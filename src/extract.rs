//! Grade extraction from report card text.
//!
//! Each catalog spelling gets three case-insensitive patterns, tried in
//! order; the first one that matches decides the grade for that subject.

use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::models::{GradeCode, SubjectGrades};
use crate::subjects::{Subject, SubjectCatalog};

/// Any character except a line terminator (\n, \r, U+2028, U+2029).
const LINE_CHARS: &str = r"[^\n\r\x{2028}\x{2029}]";

struct SubjectPatterns {
    spelling: String,
    subject: Subject,
    patterns: [Regex; 3],
}

pub struct GradeExtractor {
    subjects: Vec<SubjectPatterns>,
}

impl GradeExtractor {
    pub fn new(catalog: &SubjectCatalog) -> Result<Self, regex::Error> {
        let mut subjects = Vec::with_capacity(catalog.len());

        for entry in catalog.entries() {
            let name = regex::escape(&entry.spelling);
            let patterns = [
                // grade in the next column
                compile(&format!(r"{name}\s+(E|M|A|B)"))?,
                // grade after other cells on the same line; stops at any
                // line terminator, including a bare \r
                compile(&format!(r"{name}{LINE_CHARS}*?\s+(E|M|A|B)"))?,
                // "Subject: E" or "Subject - E"
                compile(&format!(r"{name}\s*[:\-]?\s*(E|M|A|B)"))?,
            ];
            subjects.push(SubjectPatterns {
                spelling: entry.spelling.clone(),
                subject: entry.subject,
                patterns,
            });
        }

        Ok(Self { subjects })
    }

    pub fn extract(&self, text: &str) -> SubjectGrades {
        let mut grades = SubjectGrades::new();

        for entry in &self.subjects {
            if grades.contains_key(&entry.subject) {
                continue;
            }

            let found = entry.patterns.iter().enumerate().find_map(|(idx, pattern)| {
                pattern
                    .captures(text)
                    .and_then(|caps| caps.get(1))
                    .and_then(|m| GradeCode::from_letter(m.as_str()))
                    .map(|grade| (idx, grade))
            });

            if let Some((idx, grade)) = found {
                debug!(
                    spelling = %entry.spelling,
                    subject = %entry.subject,
                    grade = %grade.letter(),
                    strategy = idx + 1,
                    "matched subject grade"
                );
                grades.insert(entry.subject, grade);
            }
        }

        grades
    }
}

fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> GradeExtractor {
        GradeExtractor::new(&SubjectCatalog::cbc()).unwrap()
    }

    #[test]
    fn reads_grade_from_adjacent_column() {
        let text = "English E\nKiswahili M\nMathematics A\nAgriculture B\n";
        let grades = extractor().extract(text);

        assert_eq!(grades.len(), 4);
        assert_eq!(grades[&Subject::English], GradeCode::E);
        assert_eq!(grades[&Subject::Kiswahili], GradeCode::M);
        assert_eq!(grades[&Subject::Mathematics], GradeCode::A);
        assert_eq!(grades[&Subject::Agriculture], GradeCode::B);
    }

    #[test]
    fn skips_intervening_table_cells() {
        let text = "Social Studies 78% 3 M\n";
        let grades = extractor().extract(text);
        assert_eq!(grades[&Subject::SocialStudies], GradeCode::M);
    }

    #[test]
    fn first_strategy_wins_over_later_ones() {
        // the skip-cells strategy alone would read "B" from the first line
        let text = "Mathematics score x B\nMathematics E\n";
        let grades = extractor().extract(text);
        assert_eq!(grades[&Subject::Mathematics], GradeCode::E);
        assert_eq!(grades.len(), 1);
    }

    #[test]
    fn skipped_cells_stop_at_carriage_return() {
        let grades = extractor().extract("English 88\rX\nB");
        assert!(grades.is_empty());

        let grades = extractor().extract("English 88\r\nKiswahili M");
        assert!(!grades.contains_key(&Subject::English));
        assert_eq!(grades[&Subject::Kiswahili], GradeCode::M);
    }

    #[test]
    fn accepts_colon_and_dash_separators() {
        let text = "Creative Arts:E\nHealth Education-B\n";
        let grades = extractor().extract(text);
        assert_eq!(grades[&Subject::CreativeArts], GradeCode::E);
        assert_eq!(grades[&Subject::HealthEducation], GradeCode::B);
    }

    #[test]
    fn lowercase_grades_are_normalized() {
        let grades = extractor().extract("religious education   a");
        assert_eq!(grades[&Subject::ReligiousEducation], GradeCode::A);
    }

    #[test]
    fn aliases_fill_canonical_subject() {
        let text = "Maths M\nScience E\n";
        let grades = extractor().extract(text);
        assert_eq!(grades[&Subject::Mathematics], GradeCode::M);
        assert_eq!(grades[&Subject::IntegratedScience], GradeCode::E);
        assert_eq!(grades.len(), 2);
    }

    #[test]
    fn first_spelling_in_catalog_wins() {
        let text = "Integrated Science B\n";
        let grades = extractor().extract(text);
        assert_eq!(grades.len(), 1);
        assert_eq!(grades[&Subject::IntegratedScience], GradeCode::B);
    }

    #[test]
    fn subjects_without_grades_are_absent() {
        let text = "English 88\nPre-Technical Studies M\n";
        let grades = extractor().extract(text);
        assert!(!grades.contains_key(&Subject::English));
        assert_eq!(grades[&Subject::PreTechnicalStudies], GradeCode::M);
    }

    #[test]
    fn unrelated_text_yields_empty_mapping() {
        let grades = extractor().extract("Term 2 fee statement\nBalance 1200\n");
        assert!(grades.is_empty());
    }

    #[test]
    fn custom_catalog_limits_search() {
        let catalog = SubjectCatalog::from_names(["English"]).unwrap();
        let grades = GradeExtractor::new(&catalog)
            .unwrap()
            .extract("English M\nKiswahili E\n");
        assert_eq!(grades.len(), 1);
        assert_eq!(grades[&Subject::English], GradeCode::M);
    }
}
