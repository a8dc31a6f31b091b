//! Markdown Structurer — classifies each line of repaired CV text into a role
//! and emits normalized markdown. Classification is first-match in a fixed
//! priority order (header, job title, company, bullet, plain) because the
//! earlier categories are stricter and would otherwise be swallowed by the
//! looser bullet/plain rules.
//!
//! The keyword lexicons live in `StructureLexicon` so the heuristics can be
//! tuned without touching the classifiers or the pipeline state machine.

use regex::Regex;

/// Role assigned to a single line of repaired text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    SectionHeader,
    JobTitle,
    CompanyName,
    Bullet,
    Plain,
}

/// Compiled date/contact patterns shared by the classifiers.
#[derive(Debug)]
pub struct TextPatterns {
    year_range: Regex,
    year_to_present: Regex,
    month_year: Regex,
    slash_range: Regex,
    email: Regex,
    phone: Regex,
}

impl Default for TextPatterns {
    fn default() -> Self {
        Self {
            year_range: Regex::new(r"\b(19|20)\d{2}\s*[-–—]\s*(19|20)\d{2}\b")
                .expect("valid year range pattern"),
            year_to_present: Regex::new(r"(?i)\b(19|20)\d{2}\s*(?:[-–—]|to)\s*(present|current)\b")
                .expect("valid year-to-present pattern"),
            month_year: Regex::new(
                r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(19|20)\d{2}\b",
            )
            .expect("valid month-year pattern"),
            slash_range: Regex::new(r"\b\d{1,2}/\d{4}\s*[-–—]\s*\d{1,2}/\d{4}\b")
                .expect("valid slash range pattern"),
            email: Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")
                .expect("valid email pattern"),
            phone: Regex::new(r"\+\d[\d\s().-]{7,}\d|\(\d{3}\)\s?\d{3}[-.]\d{4}|\b\d{3}[-.]\d{3}[-.]\d{4}\b")
                .expect("valid phone pattern"),
        }
    }
}

impl TextPatterns {
    /// True when the text contains any of the recognized date shapes:
    /// `YYYY-YYYY`, `YYYY to present/current`, month-name + year, or
    /// `MM/YYYY-MM/YYYY`.
    pub fn is_date(&self, text: &str) -> bool {
        self.year_range.is_match(text)
            || self.year_to_present.is_match(text)
            || self.month_year.is_match(text)
            || self.slash_range.is_match(text)
    }
}

/// Swappable keyword configuration for line classification.
#[derive(Debug)]
pub struct StructureLexicon {
    /// Stems matched (lowercased, substring) against candidate section headers.
    pub section_keywords: Vec<&'static str>,
    /// Stems that mark a line as a job title when a date co-occurs.
    pub role_keywords: Vec<&'static str>,
    /// Organization suffixes matched as whole tokens.
    pub org_keywords: Vec<&'static str>,
    /// Leading glyphs that mark a bullet line.
    pub bullet_glyphs: Vec<char>,
    pub patterns: TextPatterns,
}

impl Default for StructureLexicon {
    fn default() -> Self {
        Self {
            section_keywords: vec![
                "objective",
                "summary",
                "experience",
                "employment",
                "work history",
                "education",
                "academic",
                "qualification",
                "skill",
                "project",
                "certificat",
                "achievement",
                "award",
                "language",
                "contact",
                "reference",
                "interest",
                "publication",
                "volunteer",
            ],
            role_keywords: vec![
                "manager",
                "engineer",
                "developer",
                "director",
                "analyst",
                "consultant",
                "designer",
                "architect",
                "lead",
                "coordinator",
                "specialist",
                "administrator",
                "intern",
                "officer",
                "scientist",
            ],
            org_keywords: vec![
                "inc",
                "llc",
                "ltd",
                "corp",
                "corporation",
                "company",
                "university",
                "college",
                "institute",
                "technologies",
                "solutions",
                "group",
                "gmbh",
            ],
            bullet_glyphs: vec!['•', '-', '*', '▪', '●', '◦', '‣', '·'],
            patterns: TextPatterns::default(),
        }
    }
}

const MAX_HEADER_LEN: usize = 50;
const JOB_TITLE_LEN_BAND: std::ops::RangeInclusive<usize> = 4..=60;
const MAX_BULLET_LABEL_LEN: usize = 30;

/// Classifies one trimmed, non-empty line. `next` is the following non-empty
/// line (job titles may carry their date there); `prev` is the previous
/// line's classification (company names often follow a job title).
pub fn classify_line(
    line: &str,
    next: Option<&str>,
    prev: Option<LineKind>,
    lex: &StructureLexicon,
) -> LineKind {
    if is_section_header(line, lex) {
        LineKind::SectionHeader
    } else if is_job_title(line, next, lex) {
        LineKind::JobTitle
    } else if is_company_name(line, prev, lex) {
        LineKind::CompanyName
    } else if is_bullet(line, lex) {
        LineKind::Bullet
    } else {
        LineKind::Plain
    }
}

fn is_section_header(line: &str, lex: &StructureLexicon) -> bool {
    if line.chars().count() >= MAX_HEADER_LEN || line.contains('@') {
        return false;
    }
    if lex.patterns.is_date(line) {
        return false;
    }
    let lower = line.to_lowercase();
    if lex.section_keywords.iter().any(|k| lower.contains(k)) {
        return true;
    }
    is_all_caps(line)
}

/// All alphabetic characters uppercase, at least one of them, no digits.
fn is_all_caps(line: &str) -> bool {
    let mut saw_letter = false;
    for c in line.chars() {
        if c.is_ascii_digit() {
            return false;
        }
        if c.is_alphabetic() {
            saw_letter = true;
            if !c.is_uppercase() {
                return false;
            }
        }
    }
    saw_letter
}

fn is_job_title(line: &str, next: Option<&str>, lex: &StructureLexicon) -> bool {
    let lower = line.to_lowercase();
    let has_role = lex.role_keywords.iter().any(|k| lower.contains(k));
    let dated_here = lex.patterns.is_date(line);

    if has_role && (dated_here || next.is_some_and(|n| lex.patterns.is_date(n))) {
        return true;
    }
    // A bare date-range line within the length band reads as a title row.
    dated_here && JOB_TITLE_LEN_BAND.contains(&line.chars().count())
}

fn is_company_name(line: &str, prev: Option<LineKind>, lex: &StructureLexicon) -> bool {
    if lex.patterns.is_date(line) {
        return false;
    }
    let has_org_suffix = line
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .any(|token| {
            let token = token.to_lowercase();
            lex.org_keywords.iter().any(|k| *k == token)
        });
    has_org_suffix || prev == Some(LineKind::JobTitle)
}

fn is_bullet(line: &str, lex: &StructureLexicon) -> bool {
    if line
        .chars()
        .next()
        .is_some_and(|c| lex.bullet_glyphs.contains(&c))
    {
        return true;
    }
    // "Label: value" lines read as bullets when the label is short.
    if let Some((label, rest)) = line.split_once(':') {
        let label = label.trim();
        return rest.starts_with(' ')
            && !rest.trim().is_empty()
            && !label.is_empty()
            && label.chars().count() <= MAX_BULLET_LABEL_LEN
            && label
                .chars()
                .all(|c| c.is_alphanumeric() || c == ' ' || c == '/' || c == '&');
    }
    false
}

/// Re-structures repaired text into markdown, line by line over the trimmed,
/// blank-line-filtered input. Never fails; unrecognized lines pass through as
/// plain text.
pub fn structure(repaired: &str, lex: &StructureLexicon) -> String {
    let lines: Vec<&str> = repaired
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let mut out = String::new();
    let mut prev: Option<LineKind> = None;

    for (i, line) in lines.iter().enumerate() {
        let next = lines.get(i + 1).copied();
        let kind = classify_line(line, next, prev, lex);
        match kind {
            LineKind::SectionHeader => {
                out.push_str("\n## ");
                out.push_str(&collapse_whitespace(line));
                out.push_str("\n\n");
            }
            LineKind::JobTitle => {
                out.push_str("\n### ");
                out.push_str(&collapse_whitespace(line));
                out.push('\n');
            }
            LineKind::CompanyName => {
                out.push_str("**");
                out.push_str(&collapse_whitespace(line));
                out.push_str("**\n");
            }
            LineKind::Bullet => {
                out.push_str("- ");
                out.push_str(&bullet_text(line, lex));
                out.push('\n');
            }
            LineKind::Plain => {
                out.push_str(&decorate_plain(&collapse_whitespace(line), &lex.patterns));
                out.push('\n');
            }
        }
        prev = Some(kind);
    }

    collapse_blank_runs(&out).trim().to_string()
}

fn collapse_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn bullet_text(line: &str, lex: &StructureLexicon) -> String {
    let stripped = line.trim_start_matches(|c: char| lex.bullet_glyphs.contains(&c) || c == ' ');
    collapse_whitespace(stripped)
}

/// Wraps dates in light emphasis and emails/phones in bold so plain text
/// stays readable downstream.
fn decorate_plain(line: &str, patterns: &TextPatterns) -> String {
    let mut text = line.to_string();
    for date_re in [
        &patterns.year_range,
        &patterns.year_to_present,
        &patterns.month_year,
        &patterns.slash_range,
    ] {
        text = date_re.replace_all(&text, "*${0}*").into_owned();
    }
    text = patterns.email.replace_all(&text, "**${0}**").into_owned();
    text = patterns.phone.replace_all(&text, "**${0}**").into_owned();
    text
}

fn collapse_blank_runs(text: &str) -> String {
    let mut out = text.to_string();
    while out.contains("\n\n\n") {
        out = out.replace("\n\n\n", "\n\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex() -> StructureLexicon {
        StructureLexicon::default()
    }

    #[test]
    fn test_all_caps_section_header() {
        assert_eq!(
            classify_line("EXPERIENCE", None, None, &lex()),
            LineKind::SectionHeader
        );
        assert_eq!(
            classify_line("PROFESSIONAL BACKGROUND", None, None, &lex()),
            LineKind::SectionHeader
        );
    }

    #[test]
    fn test_keyword_section_header_any_case() {
        assert_eq!(
            classify_line("Education", None, None, &lex()),
            LineKind::SectionHeader
        );
        assert_eq!(
            classify_line("Technical Skills", None, None, &lex()),
            LineKind::SectionHeader
        );
    }

    #[test]
    fn test_header_rejected_on_email_or_length() {
        assert_ne!(
            classify_line("contact me at jane@example.com", None, None, &lex()),
            LineKind::SectionHeader
        );
        let long = "experience ".repeat(6);
        assert_ne!(
            classify_line(long.trim(), None, None, &lex()),
            LineKind::SectionHeader
        );
    }

    #[test]
    fn test_job_title_with_inline_date() {
        assert_eq!(
            classify_line("Software Engineer, 2020 - Present", None, None, &lex()),
            LineKind::JobTitle
        );
        assert_eq!(
            classify_line("Senior Engineer  2019 - 2023", None, None, &lex()),
            LineKind::JobTitle
        );
    }

    #[test]
    fn test_job_title_with_date_on_next_line() {
        assert_eq!(
            classify_line("Engineering Manager", Some("March 2018 - June 2021"), None, &lex()),
            LineKind::JobTitle
        );
        // Without a date nearby the same line is not a title.
        assert_ne!(
            classify_line("Engineering Manager", Some("Acme Inc"), None, &lex()),
            LineKind::JobTitle
        );
    }

    #[test]
    fn test_bare_date_line_is_title_row() {
        assert_eq!(
            classify_line("01/2019 - 06/2022", None, None, &lex()),
            LineKind::JobTitle
        );
        // The band reaches 60 characters, so a longer dated row still counts.
        assert_eq!(
            classify_line("January 2018 - December 2023, on sabbatical", None, None, &lex()),
            LineKind::JobTitle
        );
    }

    #[test]
    fn test_company_by_org_suffix() {
        assert_eq!(
            classify_line("Acme Inc", None, None, &lex()),
            LineKind::CompanyName
        );
        assert_eq!(
            classify_line("Stanford University", None, None, &lex()),
            LineKind::CompanyName
        );
    }

    #[test]
    fn test_company_follows_job_title() {
        assert_eq!(
            classify_line("Globex", None, Some(LineKind::JobTitle), &lex()),
            LineKind::CompanyName
        );
        // A dated line after a title is a title row, not a company.
        assert_ne!(
            classify_line("2019 - 2023", None, Some(LineKind::JobTitle), &lex()),
            LineKind::CompanyName
        );
    }

    #[test]
    fn test_bullet_glyphs_and_labels() {
        assert_eq!(classify_line("• Shipped the thing", None, None, &lex()), LineKind::Bullet);
        assert_eq!(classify_line("- Built things", None, None, &lex()), LineKind::Bullet);
        assert_eq!(
            classify_line("Email: jane@example.com", None, None, &lex()),
            LineKind::Bullet
        );
        assert_ne!(
            classify_line("https://example.com", None, None, &lex()),
            LineKind::Bullet
        );
    }

    #[test]
    fn test_plain_fallback() {
        assert_eq!(
            classify_line("BS Computer Science", None, None, &lex()),
            LineKind::Plain
        );
    }

    #[test]
    fn test_structure_emits_markdown_roles() {
        let input = "JohnDoe\nEXPERIENCE\nSenior Engineer  2019 - 2023\nAcme Inc\n- Built things\nEDUCATION\nBS Computer Science";
        let md = structure(input, &lex());

        assert!(md.contains("## EXPERIENCE"), "missing experience header in:\n{md}");
        assert!(md.contains("## EDUCATION"), "missing education header in:\n{md}");
        assert!(md.contains("### Senior Engineer 2019 - 2023"), "missing title in:\n{md}");
        assert!(md.contains("**Acme Inc**"), "missing company in:\n{md}");
        assert!(md.contains("- Built things"), "missing bullet in:\n{md}");
        assert!(md.starts_with("JohnDoe"), "plain passthrough lost in:\n{md}");
        assert!(!md.contains("\n\n\n"), "blank runs not collapsed in:\n{md}");
    }

    #[test]
    fn test_plain_text_decoration() {
        let md = structure(
            "Shipped the platform migration from 2019 - 2021 successfully without downtime",
            &lex(),
        );
        // A dated sentence this long falls outside the title band.
        assert!(md.contains("*2019 - 2021*"), "date not emphasized in:\n{md}");

        let md = structure("Reach me at jane.doe@example.com or (555) 123-4567", &lex());
        assert!(md.contains("**jane.doe@example.com**"), "email not bolded in:\n{md}");
        assert!(md.contains("**(555) 123-4567**"), "phone not bolded in:\n{md}");
    }

    #[test]
    fn test_structure_never_fails_on_noise() {
        let md = structure("\n\n   \n@@@###!!!\n\n", &lex());
        assert_eq!(md, "@@@###!!!");
    }

    #[test]
    fn test_date_pattern_shapes() {
        let p = TextPatterns::default();
        assert!(p.is_date("2019-2023"));
        assert!(p.is_date("2019 - 2023"));
        assert!(p.is_date("2020 to Present"));
        assert!(p.is_date("2020 - CURRENT"));
        assert!(p.is_date("March 2018"));
        assert!(p.is_date("Sep. 2021"));
        assert!(p.is_date("01/2019 - 06/2022"));
        assert!(!p.is_date("graduated in 2019"));
        assert!(!p.is_date("version 2.0"));
    }
}
