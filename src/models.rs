use std::collections::BTreeMap;

use serde::Serialize;

use crate::subjects::Subject;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum GradeCode {
    E,
    M,
    A,
    B,
}

impl GradeCode {
    pub const ALL: [GradeCode; 4] = [GradeCode::E, GradeCode::M, GradeCode::A, GradeCode::B];

    /// Parses a single grade letter, ignoring case. Anything else is dropped.
    pub fn from_letter(letter: &str) -> Option<Self> {
        match letter.trim() {
            "E" | "e" => Some(GradeCode::E),
            "M" | "m" => Some(GradeCode::M),
            "A" | "a" => Some(GradeCode::A),
            "B" | "b" => Some(GradeCode::B),
            _ => None,
        }
    }

    pub fn weight(self) -> u32 {
        match self {
            GradeCode::E => 90,
            GradeCode::M => 70,
            GradeCode::A => 50,
            GradeCode::B => 25,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GradeCode::E => "Exceeding Expectations",
            GradeCode::M => "Meeting Expectations",
            GradeCode::A => "Approaching Expectations",
            GradeCode::B => "Below Expectations",
        }
    }

    pub fn guidance(self) -> &'static str {
        match self {
            GradeCode::E => "Strong mastery of concepts.",
            GradeCode::M => "Good understanding of grade-level work.",
            GradeCode::A => "Needs some reinforcement.",
            GradeCode::B => "Requires additional support.",
        }
    }

    /// E and M count as strengths; A and B need improvement.
    pub fn is_strength(self) -> bool {
        matches!(self, GradeCode::E | GradeCode::M)
    }

    pub fn letter(self) -> char {
        match self {
            GradeCode::E => 'E',
            GradeCode::M => 'M',
            GradeCode::A => 'A',
            GradeCode::B => 'B',
        }
    }
}

/// Grades recovered from one report, iterated in catalog order.
pub type SubjectGrades = BTreeMap<Subject, GradeCode>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GradeBreakdown {
    #[serde(rename = "E")]
    pub e: usize,
    #[serde(rename = "M")]
    pub m: usize,
    #[serde(rename = "A")]
    pub a: usize,
    #[serde(rename = "B")]
    pub b: usize,
}

impl GradeBreakdown {
    pub fn record(&mut self, grade: GradeCode) {
        *self.bucket_mut(grade) += 1;
    }

    pub fn count(&self, grade: GradeCode) -> usize {
        match grade {
            GradeCode::E => self.e,
            GradeCode::M => self.m,
            GradeCode::A => self.a,
            GradeCode::B => self.b,
        }
    }

    pub fn total(&self) -> usize {
        self.e + self.m + self.a + self.b
    }

    fn bucket_mut(&mut self, grade: GradeCode) -> &mut usize {
        match grade {
            GradeCode::E => &mut self.e,
            GradeCode::M => &mut self.m,
            GradeCode::A => &mut self.a,
            GradeCode::B => &mut self.b,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PerformanceTier {
    Excellent,
    Good,
    Fair,
    #[serde(rename = "Needs Support")]
    NeedsSupport,
}

impl PerformanceTier {
    pub fn label(self) -> &'static str {
        match self {
            PerformanceTier::Excellent => "Excellent",
            PerformanceTier::Good => "Good",
            PerformanceTier::Fair => "Fair",
            PerformanceTier::NeedsSupport => "Needs Support",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Pathway {
    #[serde(rename = "STEM (Science, Technology, Engineering, Mathematics)")]
    Stem,
    #[serde(rename = "Social Sciences & Humanities")]
    SocialSciences,
    #[serde(rename = "Technical & Applied Sciences")]
    TechnicalApplied,
    #[serde(rename = "Arts, Sports & Creative Industries")]
    ArtsSportsCreative,
    #[serde(rename = "Business & Entrepreneurship")]
    Business,
}

impl Pathway {
    pub fn label(self) -> &'static str {
        match self {
            Pathway::Stem => "STEM (Science, Technology, Engineering, Mathematics)",
            Pathway::SocialSciences => "Social Sciences & Humanities",
            Pathway::TechnicalApplied => "Technical & Applied Sciences",
            Pathway::ArtsSportsCreative => "Arts, Sports & Creative Industries",
            Pathway::Business => "Business & Entrepreneurship",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationKind {
    Immediate,
    Positive,
    Urgent,
}

impl RecommendationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RecommendationKind::Immediate => "immediate",
            RecommendationKind::Positive => "positive",
            RecommendationKind::Urgent => "urgent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubjectEntry {
    pub subject: Subject,
    pub grade: GradeCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceAnalysis {
    pub total_subjects: usize,
    pub grade_breakdown: GradeBreakdown,
    pub average_score: u32,
    pub strengths: Vec<SubjectEntry>,
    pub needs_improvement: Vec<SubjectEntry>,
    pub recommended_pathways: Vec<Pathway>,
    pub overall_performance: PerformanceTier,
    pub recommendations: Vec<Recommendation>,
}
