use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{GradeCode, SubjectEntry};
use crate::pipeline::{CheckOutcome, NO_GRADES_MESSAGE};

pub fn build_report(source: &str, generated_on: NaiveDate, outcome: &CheckOutcome) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# CBC Performance Report");
    let _ = writeln!(output, "Generated for {} on {}", source, generated_on);
    let _ = writeln!(output);

    let (subjects, analysis) = match outcome {
        CheckOutcome::Graded { subjects, analysis } => (subjects, analysis),
        CheckOutcome::NoGrades => {
            let _ = writeln!(output, "{}", NO_GRADES_MESSAGE);
            return output;
        }
    };

    let _ = writeln!(output, "## Overview");
    let _ = writeln!(output, "- Subjects graded: {}", analysis.total_subjects);
    let _ = writeln!(output, "- Average score: {}%", analysis.average_score);
    let _ = writeln!(
        output,
        "- Overall performance: {}",
        analysis.overall_performance.label()
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Grade Breakdown");
    for grade in GradeCode::ALL {
        let _ = writeln!(
            output,
            "- {} ({}): {}",
            grade.letter(),
            grade.label(),
            analysis.grade_breakdown.count(grade)
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Subject Results");
    for (subject, grade) in subjects.iter() {
        let _ = writeln!(
            output,
            "- {}: {} ({}) {}",
            subject,
            grade.letter(),
            grade.label(),
            grade.guidance()
        );
    }

    write_entries(&mut output, "Strengths", &analysis.strengths);
    write_entries(&mut output, "Needs Improvement", &analysis.needs_improvement);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recommended Pathways");
    if analysis.recommended_pathways.is_empty() {
        let _ = writeln!(
            output,
            "No pathway stands out yet. Build strengths in core subjects first."
        );
    } else {
        for pathway in analysis.recommended_pathways.iter() {
            let _ = writeln!(output, "- {}", pathway.label());
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recommendations");
    if analysis.recommendations.is_empty() {
        let _ = writeln!(output, "Keep up the steady work.");
    } else {
        for recommendation in analysis.recommendations.iter() {
            let _ = writeln!(
                output,
                "- [{}] {}",
                recommendation.kind.as_str(),
                recommendation.message
            );
        }
    }

    output
}

fn write_entries(output: &mut String, heading: &str, entries: &[SubjectEntry]) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## {}", heading);

    if entries.is_empty() {
        let _ = writeln!(output, "None.");
        return;
    }

    for entry in entries {
        let _ = writeln!(output, "- {} ({})", entry.subject, entry.grade.letter());
    }
}
