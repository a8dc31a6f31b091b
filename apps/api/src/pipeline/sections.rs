//! Section Extractor — scans the structurer's markdown headers and turns them
//! into a set of detected CV topic flags. Only `#`-prefixed lines are
//! considered; each header maps to at most one flag via substring containment
//! against a fixed keyword table.

/// A CV topic detected from the structured markdown headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionFlag {
    Experience,
    Skills,
    Education,
    Certifications,
    Projects,
    Achievements,
    Languages,
}

/// Set of detected topics. Duplicate headers collapse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionFlags {
    pub experience: bool,
    pub skills: bool,
    pub education: bool,
    pub certifications: bool,
    pub projects: bool,
    pub achievements: bool,
    pub languages: bool,
}

impl SectionFlags {
    pub fn contains(&self, flag: SectionFlag) -> bool {
        match flag {
            SectionFlag::Experience => self.experience,
            SectionFlag::Skills => self.skills,
            SectionFlag::Education => self.education,
            SectionFlag::Certifications => self.certifications,
            SectionFlag::Projects => self.projects,
            SectionFlag::Achievements => self.achievements,
            SectionFlag::Languages => self.languages,
        }
    }

    fn set(&mut self, flag: SectionFlag) {
        match flag {
            SectionFlag::Experience => self.experience = true,
            SectionFlag::Skills => self.skills = true,
            SectionFlag::Education => self.education = true,
            SectionFlag::Certifications => self.certifications = true,
            SectionFlag::Projects => self.projects = true,
            SectionFlag::Achievements => self.achievements = true,
            SectionFlag::Languages => self.languages = true,
        }
    }
}

/// Keyword table: the first entry whose stem appears in the lowercased header
/// wins; a header matching nothing contributes no flag.
const FLAG_KEYWORDS: &[(SectionFlag, &[&str])] = &[
    (SectionFlag::Experience, &["experience", "employment", "work history", "career"]),
    (SectionFlag::Skills, &["skill", "competenc", "technolog", "expertise"]),
    (SectionFlag::Education, &["education", "academic", "qualification", "degree"]),
    (SectionFlag::Certifications, &["certificat", "license", "accreditation"]),
    (SectionFlag::Projects, &["project", "portfolio"]),
    (SectionFlag::Achievements, &["achievement", "award", "honor", "accomplishment"]),
    (SectionFlag::Languages, &["language"]),
];

/// Extracts topic flags from structured markdown headers.
pub fn extract_sections(markdown: &str) -> SectionFlags {
    let mut flags = SectionFlags::default();

    for line in markdown.lines() {
        let trimmed = line.trim_start();
        if !trimmed.starts_with('#') {
            continue;
        }
        let header = trimmed.trim_start_matches('#').trim().to_lowercase();
        if let Some(flag) = flag_for_header(&header) {
            flags.set(flag);
        }
    }

    flags
}

fn flag_for_header(header: &str) -> Option<SectionFlag> {
    FLAG_KEYWORDS
        .iter()
        .find(|(_, stems)| stems.iter().any(|s| header.contains(s)))
        .map(|(flag, _)| *flag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_headers_to_flags() {
        let md = "## EXPERIENCE\ntext\n## Technical Skills\n## EDUCATION";
        let flags = extract_sections(md);
        assert!(flags.experience);
        assert!(flags.skills);
        assert!(flags.education);
        assert!(!flags.projects);
        assert!(!flags.languages);
    }

    #[test]
    fn test_synonyms_map_to_education() {
        assert!(extract_sections("## Academic Background").education);
        assert!(extract_sections("# Qualifications").education);
    }

    #[test]
    fn test_non_header_lines_ignored() {
        let md = "My experience with projects and languages is broad.";
        assert_eq!(extract_sections(md), SectionFlags::default());
    }

    #[test]
    fn test_duplicate_headers_collapse() {
        let md = "## EXPERIENCE\n## Work History\n## Employment";
        let flags = extract_sections(md);
        assert!(flags.experience);
        assert_eq!(
            flags,
            SectionFlags {
                experience: true,
                ..SectionFlags::default()
            }
        );
    }

    #[test]
    fn test_unknown_header_contributes_nothing() {
        assert_eq!(extract_sections("## HOBBIES"), SectionFlags::default());
    }
}
