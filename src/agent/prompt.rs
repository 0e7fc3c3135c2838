//! Prompt assembly for the external evaluator.

use crate::analysis::DetectedCategory;
use crate::models::DetailLevel;

/// System prompt sent with every evaluation request.
pub const EVALUATOR_SYSTEM_PROMPT: &str =
    "You are an expert grant evaluator. Your responses must be in valid JSON format.";

/// One scoring dimension requested from the evaluator.
struct Dimension<'a> {
    name: &'a str,
    questions: Vec<&'a str>,
}

fn base_dimensions() -> Vec<Dimension<'static>> {
    vec![
        Dimension {
            name: "Strategic Alignment",
            questions: vec![
                "How well does the project align with the grant's objectives?",
                "What specific aspects demonstrate strong or weak alignment?",
                "Are there gaps between the project goals and grant requirements?",
            ],
        },
        Dimension {
            name: "Innovation & Impact",
            questions: vec![
                "Evaluate the uniqueness and novelty of the proposed approach",
                "Assess the potential for breakthrough outcomes",
                "Consider both short-term and long-term impact potential",
            ],
        },
        Dimension {
            name: "Methodology & Implementation",
            questions: vec![
                "Evaluate the technical feasibility and approach",
                "Assess resource allocation and timeline realism",
                "Consider risk management and the team's capability",
            ],
        },
        Dimension {
            name: "Sustainability & Scalability",
            questions: vec![
                "Assess long-term viability and growth potential",
                "Consider financial sustainability beyond the grant period",
                "Analyze potential partnerships and ecosystem engagement",
            ],
        },
    ]
}

/// Paragraph and item counts requested for each detail level.
struct Depth {
    summary: &'static str,
    comments: &'static str,
    narrative: &'static str,
    conclusion: &'static str,
    recommendations: &'static str,
}

fn depth(detail: DetailLevel) -> Depth {
    match detail {
        DetailLevel::Concise => Depth {
            summary: "one paragraph",
            comments: "two or three sentences",
            narrative: "one paragraph",
            conclusion: "one paragraph",
            recommendations: "3-4",
        },
        DetailLevel::Standard => Depth {
            summary: "2-3 paragraphs",
            comments: "one paragraph",
            narrative: "2-3 paragraphs",
            conclusion: "1-2 paragraphs",
            recommendations: "5-6",
        },
        DetailLevel::Detailed => Depth {
            summary: "3-4 paragraphs",
            comments: "2-3 paragraphs",
            narrative: "3-4 paragraphs",
            conclusion: "2-3 paragraphs",
            recommendations: "6-8",
        },
    }
}

/// Build the evaluation prompt for one grant call / project pair.
///
/// Detected categories are appended after the four base dimensions and
/// numbered consecutively.
pub fn build_prompt(
    grant_call: &str,
    project_desc: &str,
    categories: &[DetectedCategory],
    detail: DetailLevel,
) -> String {
    let depth = depth(detail);
    let mut prompt = String::new();

    prompt.push_str("You are an expert grant evaluator with extensive experience in research, innovation, and funding assessment. ");
    prompt.push_str("Evaluate the following grant proposal and offer specific insights and actionable recommendations.\n\n");

    prompt.push_str("GRANT CALL:\n");
    prompt.push_str(grant_call);
    prompt.push_str("\n\nPROJECT DESCRIPTION:\n");
    prompt.push_str(project_desc);
    prompt.push_str("\n\nScore the proposal on these dimensions:\n\n");

    let mut number = 0;
    for dimension in base_dimensions() {
        number += 1;
        prompt.push_str(&format!("{}. {} (0-10):\n", number, dimension.name));
        for question in dimension.questions {
            prompt.push_str(&format!("- {}\n", question));
        }
        prompt.push('\n');
    }

    for category in categories {
        number += 1;
        prompt.push_str(&format!("{}. {} (0-10):\n", number, category.name));
        prompt.push_str(&format!("- {}\n", category.description));
        prompt.push_str("- Evaluate specific strengths and weaknesses\n");
        prompt.push_str("- Provide recommendations for improvement\n\n");
    }

    prompt.push_str("Respond with a single JSON object with exactly these fields:\n\n");
    prompt.push_str("{\n");
    prompt.push_str("  \"projectName\": \"extract or synthesize an appropriate project name\",\n");
    prompt.push_str("  \"grantName\": \"extract or synthesize the grant program name\",\n");
    prompt.push_str(&format!(
        "  \"summary\": \"{} capturing key strengths, weaknesses and the overall assessment\",\n",
        depth.summary
    ));
    prompt.push_str(&format!(
        "  \"scores\": [{{\"criteria\": \"string\", \"score\": number (0-10), \"comments\": \"{} of analysis\"}}],\n",
        depth.comments
    ));
    prompt.push_str(&format!(
        "  \"innovationAnalysis\": \"{} on novelty, comparison with existing approaches and competitive advantage\",\n",
        depth.narrative
    ));
    prompt.push_str(&format!(
        "  \"reviewerFeedback\": \"{} covering strengths, areas to clarify, risks and mitigation\",\n",
        depth.narrative
    ));
    prompt.push_str(&format!(
        "  \"recommendations\": [\"{} specific, prioritized, actionable recommendations\"],\n",
        depth.recommendations
    ));
    prompt.push_str(&format!(
        "  \"finalAssessment\": \"{} with a clear funding recommendation\",\n",
        depth.conclusion
    ));
    prompt.push_str(&format!(
        "  \"totalScore\": number (0-100), a weighted average across all {} dimensions\n",
        number
    ));
    prompt.push_str("}\n\n");
    prompt.push_str("Keep a professional, constructive tone. Output only the JSON object.");

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::detect_relevant_categories;

    #[test]
    fn test_prompt_contains_inputs_and_base_dimensions() {
        let prompt = build_prompt("Call text", "Project text", &[], DetailLevel::Standard);

        assert!(prompt.contains("GRANT CALL:\nCall text"));
        assert!(prompt.contains("PROJECT DESCRIPTION:\nProject text"));
        assert!(prompt.contains("1. Strategic Alignment (0-10)"));
        assert!(prompt.contains("4. Sustainability & Scalability (0-10)"));
        assert!(!prompt.contains("5. "));
        assert!(prompt.contains("all 4 dimensions"));
    }

    #[test]
    fn test_detected_categories_are_numbered_consecutively() {
        let categories = detect_relevant_categories("a budget under GDPR");
        let prompt = build_prompt("call", "project", &categories, DetailLevel::Standard);

        assert!(prompt.contains("5. Budget Appropriateness (0-10)"));
        assert!(prompt.contains("6. Ethical/Legal Compliance (0-10)"));
        assert!(prompt.contains("all 6 dimensions"));
    }

    #[test]
    fn test_detail_level_changes_requested_depth() {
        let concise = build_prompt("c", "p", &[], DetailLevel::Concise);
        let detailed = build_prompt("c", "p", &[], DetailLevel::Detailed);

        assert!(concise.contains("3-4 specific"));
        assert!(detailed.contains("6-8 specific"));
        assert_ne!(concise, detailed);
    }
}
