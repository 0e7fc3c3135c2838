//! Keyword-based detection of optional evaluation dimensions.
//!
//! Some proposals deserve scoring on dimensions beyond the four base ones
//! (budget, compliance, ...). A dimension becomes relevant when any of its
//! keywords appears in the combined input text.

use serde::Serialize;

/// A keyword-triggered optional evaluation dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryRule {
    pub name: &'static str,
    /// Lower-case keywords; matched as substrings.
    pub keywords: &'static [&'static str],
    pub description: &'static str,
}

/// A rule that matched the input text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedCategory {
    pub name: &'static str,
    pub description: &'static str,
}

/// Fixed rule table, in declaration order.
pub const CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule {
        name: "Sustainability",
        keywords: &[
            "sustainable",
            "long-term",
            "environmental",
            "post-funding",
            "maintenance",
        ],
        description: "Long-term viability and environmental impact",
    },
    CategoryRule {
        name: "Budget Appropriateness",
        keywords: &["budget", "cost", "funding", "financial", "expense"],
        description: "Financial planning and value for money",
    },
    CategoryRule {
        name: "Scalability/Replicability",
        keywords: &["scale", "growth", "expand", "replicate", "adapt"],
        description: "Potential for growth and adaptation",
    },
    CategoryRule {
        name: "Ethical/Legal Compliance",
        keywords: &[
            "ethics",
            "legal",
            "compliance",
            "regulation",
            "privacy",
            "gdpr",
            "sensitive data",
        ],
        description: "Regulatory and ethical considerations",
    },
    CategoryRule {
        name: "Technology Readiness Level",
        keywords: &[
            "trl",
            "technology readiness",
            "prototype",
            "proof of concept",
            "mvp",
        ],
        description: "Stage of technological development",
    },
];

impl CategoryRule {
    /// Whether any keyword occurs in already lower-cased text.
    fn matches(&self, lowercase_text: &str) -> bool {
        self.keywords
            .iter()
            .any(|keyword| lowercase_text.contains(&keyword.to_lowercase()))
    }
}

/// Detect relevant categories using the built-in rule table.
pub fn detect_relevant_categories(text: &str) -> Vec<DetectedCategory> {
    detect_with_rules(CATEGORY_RULES, text)
}

/// Detect matching rules in declaration order.
pub fn detect_with_rules(rules: &[CategoryRule], text: &str) -> Vec<DetectedCategory> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let lowercase_text = text.to_lowercase();

    rules
        .iter()
        .filter(|rule| rule.matches(&lowercase_text))
        .map(|rule| DetectedCategory {
            name: rule.name,
            description: rule.description,
        })
        .collect()
}
