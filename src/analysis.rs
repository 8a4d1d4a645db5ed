use crate::models::{
    GradeBreakdown, GradeCode, Pathway, PerformanceAnalysis, PerformanceTier, Recommendation,
    RecommendationKind, SubjectEntry, SubjectGrades,
};
use crate::subjects::Subject;

/// A pathway is recommended when every listed subject is a strength.
const PATHWAY_RULES: [(Pathway, &[Subject]); 5] = [
    (Pathway::Stem, &[Subject::Mathematics, Subject::IntegratedScience]),
    (Pathway::SocialSciences, &[Subject::English, Subject::SocialStudies]),
    (Pathway::TechnicalApplied, &[Subject::PreTechnicalStudies]),
    (Pathway::ArtsSportsCreative, &[Subject::CreativeArts]),
    (Pathway::Business, &[Subject::Mathematics, Subject::English]),
];

const POSITIVE_STRENGTH_THRESHOLD: usize = 3;

/// Returns `None` when no subject was graded.
pub fn analyze(subjects: &SubjectGrades) -> Option<PerformanceAnalysis> {
    if subjects.is_empty() {
        return None;
    }

    let mut grade_breakdown = GradeBreakdown::default();
    let mut strengths = Vec::new();
    let mut needs_improvement = Vec::new();
    let mut total_score = 0u32;

    for (&subject, &grade) in subjects.iter() {
        grade_breakdown.record(grade);
        total_score += grade.weight();

        let entry = SubjectEntry { subject, grade };
        if grade.is_strength() {
            strengths.push(entry);
        } else {
            needs_improvement.push(entry);
        }
    }

    let total_subjects = subjects.len();
    debug_assert_eq!(grade_breakdown.total(), total_subjects);
    let average_score = rounded_mean(total_score, total_subjects as u32);
    let recommendations = recommend(&strengths, &needs_improvement, &grade_breakdown);

    Some(PerformanceAnalysis {
        total_subjects,
        grade_breakdown,
        average_score,
        strengths,
        needs_improvement,
        recommended_pathways: recommend_pathways(subjects),
        overall_performance: performance_tier(average_score),
        recommendations,
    })
}

/// Integer mean rounded half-up.
pub fn rounded_mean(total: u32, count: u32) -> u32 {
    if count == 0 {
        return 0;
    }
    (2 * total + count) / (2 * count)
}

pub fn performance_tier(average_score: u32) -> PerformanceTier {
    if average_score >= 80 {
        PerformanceTier::Excellent
    } else if average_score >= 65 {
        PerformanceTier::Good
    } else if average_score >= 50 {
        PerformanceTier::Fair
    } else {
        PerformanceTier::NeedsSupport
    }
}

pub fn recommend_pathways(subjects: &SubjectGrades) -> Vec<Pathway> {
    PATHWAY_RULES
        .iter()
        .filter(|(_, required)| {
            required.iter().all(|subject| {
                subjects
                    .get(subject)
                    .is_some_and(|grade| grade.is_strength())
            })
        })
        .map(|(pathway, _)| *pathway)
        .collect()
}

fn recommend(
    strengths: &[SubjectEntry],
    needs_improvement: &[SubjectEntry],
    breakdown: &GradeBreakdown,
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    if !needs_improvement.is_empty() {
        recommendations.push(Recommendation {
            kind: RecommendationKind::Immediate,
            message: format!(
                "Focus on improving {} subject(s) that need attention",
                needs_improvement.len()
            ),
        });
    }

    if strengths.len() >= POSITIVE_STRENGTH_THRESHOLD {
        recommendations.push(Recommendation {
            kind: RecommendationKind::Positive,
            message: "Strong performance in multiple subjects! Consider enrichment activities"
                .to_string(),
        });
    }

    if breakdown.count(GradeCode::B) > 0 {
        recommendations.push(Recommendation {
            kind: RecommendationKind::Urgent,
            message: "Schedule a parent-teacher meeting to discuss support strategies"
                .to_string(),
        });
    }

    recommendations
}
