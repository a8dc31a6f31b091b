//! Prompt Generator — derives an ordered, deduplicated, length-capped list of
//! suggested chat questions from the detected section flags plus keyword
//! searches over the structured markdown.
//!
//! The rule table is configuration data, not control flow: swap
//! `PromptRules` to tune the lexicon without touching the pipeline. The
//! contract is determinism for identical input, stable rule order, a hard
//! cap, and no duplicate prompt strings.

use super::sections::{SectionFlag, SectionFlags};

/// Condition under which a rule fires.
#[derive(Debug, Clone)]
pub enum Trigger {
    /// Always fires.
    Always,
    /// Fires when the section flag was detected.
    Flag(SectionFlag),
    /// Fires when any keyword occurs in the lowercased markdown.
    AnyKeyword(&'static [&'static str]),
}

#[derive(Debug, Clone)]
pub struct PromptRule {
    pub trigger: Trigger,
    pub prompt: &'static str,
}

/// Ordered rule table with a hard cap on the emitted list.
#[derive(Debug, Clone)]
pub struct PromptRules {
    pub rules: Vec<PromptRule>,
    pub cap: usize,
}

impl Default for PromptRules {
    fn default() -> Self {
        use SectionFlag::*;
        use Trigger::*;

        let rules = vec![
            PromptRule { trigger: Always, prompt: "Summarize my CV in 3-4 sentences" },
            PromptRule { trigger: Always, prompt: "What are my contact details?" },
            PromptRule { trigger: Flag(Experience), prompt: "What is my work experience?" },
            PromptRule { trigger: Flag(Skills), prompt: "What are my strongest technical skills?" },
            PromptRule { trigger: Flag(Education), prompt: "What is my educational background?" },
            PromptRule { trigger: Flag(Certifications), prompt: "What certifications do I hold?" },
            PromptRule { trigger: Flag(Projects), prompt: "What projects have I worked on?" },
            PromptRule { trigger: Flag(Achievements), prompt: "What are my key achievements?" },
            PromptRule { trigger: Flag(Languages), prompt: "What languages do I speak?" },
            PromptRule {
                trigger: AnyKeyword(&["senior", "principal", "head of", "chief", "director", "vp of"]),
                prompt: "Tell me about my leadership experience",
            },
            PromptRule {
                trigger: AnyKeyword(&["remote", "freelance", "contractor", "self-employed"]),
                prompt: "Have I worked remotely or as a freelancer?",
            },
            PromptRule {
                trigger: AnyKeyword(&["react", "angular", "vue", "javascript", "typescript"]),
                prompt: "What experience do I have with frontend technologies?",
            },
            PromptRule {
                trigger: AnyKeyword(&["aws", "azure", "gcp", "kubernetes", "docker", "terraform"]),
                prompt: "Which cloud platforms and tools have I used?",
            },
            PromptRule {
                trigger: AnyKeyword(&["python", "machine learning", "data science", "tensorflow", "pytorch"]),
                prompt: "What is my experience with data and machine learning?",
            },
            PromptRule {
                trigger: AnyKeyword(&["team", "collaborat", "cross-functional", "agile", "scrum"]),
                prompt: "How do I work within a team?",
            },
            PromptRule {
                trigger: AnyKeyword(&["based in", "located in", "relocat", "willing to travel"]),
                prompt: "Where am I based and am I open to relocation?",
            },
        ];

        Self { rules, cap: 15 }
    }
}

/// Runs the rule table over the markdown and flags. Rules fire independently
/// in table order; duplicates collapse; the list is truncated at the cap.
pub fn generate_prompts(markdown: &str, flags: &SectionFlags, rules: &PromptRules) -> Vec<String> {
    let lower = markdown.to_lowercase();
    let mut prompts: Vec<String> = Vec::new();

    for rule in &rules.rules {
        let fires = match &rule.trigger {
            Trigger::Always => true,
            Trigger::Flag(flag) => flags.contains(*flag),
            Trigger::AnyKeyword(keywords) => keywords.iter().any(|k| lower.contains(k)),
        };
        if fires && !prompts.iter().any(|p| p == rule.prompt) {
            prompts.push(rule.prompt.to_string());
        }
    }

    prompts.truncate(rules.cap);
    prompts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::sections::extract_sections;

    #[test]
    fn test_base_prompts_always_present() {
        let prompts = generate_prompts("", &SectionFlags::default(), &PromptRules::default());
        assert_eq!(
            prompts,
            vec![
                "Summarize my CV in 3-4 sentences".to_string(),
                "What are my contact details?".to_string(),
            ]
        );
    }

    #[test]
    fn test_skills_flag_drives_skills_prompt_only() {
        let md = "## SKILLS\nwoodworking, joinery";
        let flags = extract_sections(md);
        let prompts = generate_prompts(md, &flags, &PromptRules::default());

        assert!(prompts.contains(&"What are my strongest technical skills?".to_string()));
        assert!(prompts.contains(&"Summarize my CV in 3-4 sentences".to_string()));
        assert!(prompts.contains(&"What are my contact details?".to_string()));
        assert!(!prompts.contains(&"What is my educational background?".to_string()));
        assert!(!prompts.contains(&"What projects have I worked on?".to_string()));
    }

    #[test]
    fn test_keyword_rules_fire_on_lowercased_text() {
        let md = "Worked REMOTE with React and AWS in agile teams, based in Berlin";
        let prompts = generate_prompts(md, &SectionFlags::default(), &PromptRules::default());

        assert!(prompts.contains(&"Have I worked remotely or as a freelancer?".to_string()));
        assert!(prompts.contains(&"What experience do I have with frontend technologies?".to_string()));
        assert!(prompts.contains(&"Which cloud platforms and tools have I used?".to_string()));
        assert!(prompts.contains(&"How do I work within a team?".to_string()));
        assert!(prompts.contains(&"Where am I based and am I open to relocation?".to_string()));
    }

    #[test]
    fn test_cap_and_dedup() {
        // Every rule in the default table fires: all seven section headers
        // plus every keyword cluster.
        let md = "## EXPERIENCE\n## SKILLS\n## EDUCATION\n## CERTIFICATIONS\n## PROJECTS\n## ACHIEVEMENTS\n## LANGUAGES\n\
                  senior remote react aws python team based in Berlin";
        let flags = extract_sections(md);
        let prompts = generate_prompts(md, &flags, &PromptRules::default());

        assert_eq!(prompts.len(), 15, "cap not applied: {prompts:?}");
        let mut deduped = prompts.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), prompts.len(), "duplicates present: {prompts:?}");
    }

    #[test]
    fn test_duplicate_rule_prompts_collapse() {
        let rules = PromptRules {
            rules: vec![
                PromptRule { trigger: Trigger::Always, prompt: "Twice" },
                PromptRule { trigger: Trigger::AnyKeyword(&["rust"]), prompt: "Twice" },
            ],
            cap: 15,
        };
        let prompts = generate_prompts("rust everywhere", &SectionFlags::default(), &rules);
        assert_eq!(prompts, vec!["Twice".to_string()]);
    }

    #[test]
    fn test_rule_order_is_stable() {
        let md = "## EDUCATION\n## EXPERIENCE";
        let flags = extract_sections(md);
        let prompts = generate_prompts(md, &flags, &PromptRules::default());
        let experience = prompts.iter().position(|p| p == "What is my work experience?");
        let education = prompts.iter().position(|p| p == "What is my educational background?");
        // Table order, not document order.
        assert!(experience.unwrap() < education.unwrap());
    }
}
