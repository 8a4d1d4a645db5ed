use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Canonical CBC subjects, declared in catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Subject {
    English,
    Kiswahili,
    Mathematics,
    #[serde(rename = "Integrated Science")]
    IntegratedScience,
    #[serde(rename = "Health Education")]
    HealthEducation,
    #[serde(rename = "Pre-Technical Studies")]
    PreTechnicalStudies,
    #[serde(rename = "Social Studies")]
    SocialStudies,
    #[serde(rename = "Religious Education")]
    ReligiousEducation,
    #[serde(rename = "Creative Arts")]
    CreativeArts,
    Agriculture,
}

impl Subject {
    pub const ALL: [Subject; 10] = [
        Subject::English,
        Subject::Kiswahili,
        Subject::Mathematics,
        Subject::IntegratedScience,
        Subject::HealthEducation,
        Subject::PreTechnicalStudies,
        Subject::SocialStudies,
        Subject::ReligiousEducation,
        Subject::CreativeArts,
        Subject::Agriculture,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Subject::English => "English",
            Subject::Kiswahili => "Kiswahili",
            Subject::Mathematics => "Mathematics",
            Subject::IntegratedScience => "Integrated Science",
            Subject::HealthEducation => "Health Education",
            Subject::PreTechnicalStudies => "Pre-Technical Studies",
            Subject::SocialStudies => "Social Studies",
            Subject::ReligiousEducation => "Religious Education",
            Subject::CreativeArts => "Creative Arts",
            Subject::Agriculture => "Agriculture",
        }
    }

    /// Resolves a report spelling to its canonical subject.
    ///
    /// Report cards write "Maths" for Mathematics and "Science" for
    /// Integrated Science; both resolve here so no downstream rule has to
    /// know about the alternate spellings.
    pub fn canonicalize(name: &str) -> Option<Subject> {
        let name = name.trim();
        if name.eq_ignore_ascii_case("Maths") {
            return Some(Subject::Mathematics);
        }
        if name.eq_ignore_ascii_case("Science") {
            return Some(Subject::IntegratedScience);
        }

        Subject::ALL
            .into_iter()
            .find(|subject| subject.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("unknown subject `{0}`")]
    UnknownSubject(String),
    #[error("subject catalog is empty")]
    Empty,
}

/// One spelling searched for in report text, and the subject it stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub spelling: String,
    pub subject: Subject,
}

/// Ordered spellings the grade extractor scans for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectCatalog {
    entries: Vec<CatalogEntry>,
}

const CBC_SPELLINGS: [&str; 12] = [
    "English",
    "Kiswahili",
    "Mathematics",
    "Maths",
    "Integrated Science",
    "Science",
    "Health Education",
    "Pre-Technical Studies",
    "Social Studies",
    "Religious Education",
    "Creative Arts",
    "Agriculture",
];

impl SubjectCatalog {
    /// Junior school catalog used when no subjects are configured.
    pub fn cbc() -> Self {
        let entries = CBC_SPELLINGS
            .iter()
            .filter_map(|spelling| {
                Subject::canonicalize(spelling).map(|subject| CatalogEntry {
                    spelling: (*spelling).to_string(),
                    subject,
                })
            })
            .collect();
        Self { entries }
    }

    pub fn from_names<I, S>(names: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entries = Vec::new();
        for name in names {
            let spelling = name.as_ref().trim();
            let subject = Subject::canonicalize(spelling)
                .ok_or_else(|| CatalogError::UnknownSubject(spelling.to_string()))?;
            entries.push(CatalogEntry {
                spelling: spelling.to_string(),
                subject,
            });
        }

        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Default for SubjectCatalog {
    fn default() -> Self {
        Self::cbc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_to_canonical_subjects() {
        assert_eq!(Subject::canonicalize("Maths"), Some(Subject::Mathematics));
        assert_eq!(
            Subject::canonicalize("science"),
            Some(Subject::IntegratedScience)
        );
        assert_eq!(
            Subject::canonicalize("  Pre-Technical Studies "),
            Some(Subject::PreTechnicalStudies)
        );
        assert_eq!(Subject::canonicalize("Chemistry"), None);
    }

    #[test]
    fn cbc_catalog_keeps_every_spelling_in_order() {
        let catalog = SubjectCatalog::cbc();
        assert_eq!(catalog.len(), CBC_SPELLINGS.len());

        let spellings: Vec<&str> = catalog
            .entries()
            .iter()
            .map(|entry| entry.spelling.as_str())
            .collect();
        assert_eq!(spellings, CBC_SPELLINGS.to_vec());
        assert_eq!(catalog.entries()[3].subject, Subject::Mathematics);
        assert_eq!(catalog.entries()[5].subject, Subject::IntegratedScience);
    }

    #[test]
    fn custom_catalog_rejects_unknown_names() {
        let err = SubjectCatalog::from_names(["English", "Latin"]).unwrap_err();
        assert_eq!(err, CatalogError::UnknownSubject("Latin".to_string()));

        let empty: [&str; 0] = [];
        assert_eq!(
            SubjectCatalog::from_names(empty).unwrap_err(),
            CatalogError::Empty
        );
    }

    #[test]
    fn subjects_serialize_by_display_name() {
        let json = serde_json::to_string(&Subject::CreativeArts).unwrap();
        assert_eq!(json, "\"Creative Arts\"");
        assert_eq!(Subject::SocialStudies.to_string(), "Social Studies");
    }
}
