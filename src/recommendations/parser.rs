// ABOUTME: Tolerant parsing of LLM responses into typed recommendation and autopsy structures
// ABOUTME: Accepts bold-label and ATX-heading variants, with safe defaults on partial parses

//! # LLM Response Parsing
//!
//! Splits recommendation responses into their three labelled sections and
//! extracts the alignment score from autopsy responses. The parser is
//! deliberately tolerant: both `**LABEL:**` and `## LABEL` heading forms
//! are accepted, partial parses synthesize safe placeholders, and a
//! response with no recognizable labels at all becomes the daily section
//! with default companions. A malformed response is never fatal.

use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;
use tracing::{info, warn};

/// Default weekly text when only the daily section is recoverable
const DEFAULT_WEEKLY: &str = "Continue current training approach with focus on ACWR management.";

/// Default insights text when only the daily section is recoverable
const DEFAULT_INSIGHTS: &str = "Monitor recovery indicators and training load progression.";

/// Weekly text when no labels are recognized at all
const CONSOLIDATED_WEEKLY: &str =
    "Continue monitoring current training approach based on daily guidance.";

/// Insights text when no labels are recognized at all
const CONSOLIDATED_INSIGHTS: &str = "Analysis integrated into daily recommendation above.";

#[allow(clippy::expect_used)] // Safe: compile-time constant patterns
fn section_pattern(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .dot_matches_new_line(true)
        .case_insensitive(true)
        .build()
        .expect("valid regex literal")
}

// The next section's label is consumed by a non-capturing group rather
// than asserted: each pattern runs independently over the full response,
// so only the captured section body matters.
static DAILY_BOLD: LazyLock<Regex> = LazyLock::new(|| {
    section_pattern(r"\*\*DAILY\s+RECOMMENDATION:\*\*\s*(.*?)(?:\*\*WEEKLY|\*\*PATTERN|\z)")
});
static WEEKLY_BOLD: LazyLock<Regex> = LazyLock::new(|| {
    section_pattern(r"\*\*WEEKLY\s+(?:PLANNING|RECOMMENDATION):\*\*\s*(.*?)(?:\*\*PATTERN|\z)")
});
static INSIGHTS_BOLD: LazyLock<Regex> =
    LazyLock::new(|| section_pattern(r"\*\*PATTERN\s+INSIGHTS:\*\*\s*(.*?)\z"));

static DAILY_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    section_pattern(r"##\s*DAILY\s+RECOMMENDATION:?\s*(.*?)(?:##\s*WEEKLY|##\s*PATTERN|\z)")
});
static WEEKLY_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    section_pattern(r"##\s*WEEKLY\s+(?:PLANNING|RECOMMENDATION):?\s*(.*?)(?:##\s*PATTERN|\z)")
});
static INSIGHTS_HEADING: LazyLock<Regex> =
    LazyLock::new(|| section_pattern(r"##\s*PATTERN\s+INSIGHTS:?\s*(.*?)\z"));

static SCORE: LazyLock<Regex> =
    LazyLock::new(|| section_pattern(r"ALIGNMENT_SCORE:\s*\[?(\d+)\s*/\s*10\]?"));

#[allow(clippy::expect_used)] // Safe: compile-time constant patterns
static MD_BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("valid regex literal"));
#[allow(clippy::expect_used)] // Safe: compile-time constant patterns
static MD_ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*]+)\*").expect("valid regex literal"));
#[allow(clippy::expect_used)] // Safe: compile-time constant patterns
static MD_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#+\s*").expect("valid regex literal"));
#[allow(clippy::expect_used)] // Safe: compile-time constant patterns
static MD_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").expect("valid regex literal"));

/// The three labelled sections of a recommendation response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSections {
    /// Daily guidance
    pub daily_recommendation: String,
    /// Weekly planning
    pub weekly_recommendation: String,
    /// Pattern insights
    pub pattern_insights: String,
}

/// Parsed autopsy response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAutopsy {
    /// Analysis text with the score line removed
    pub analysis: String,
    /// Alignment score clamped to [1, 10]
    pub alignment_score: i64,
}

fn capture(regex: &Regex, text: &str) -> Option<String> {
    regex
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_owned())
        .filter(|s| !s.is_empty())
}

/// Parse a recommendation response into its three sections
#[must_use]
pub fn parse_recommendation(response: &str) -> ParsedSections {
    let cleaned = response.trim();

    if cleaned.is_empty() {
        warn!("Empty LLM response; storing defaults");
        return ParsedSections {
            daily_recommendation: String::new(),
            weekly_recommendation: CONSOLIDATED_WEEKLY.to_owned(),
            pattern_insights: CONSOLIDATED_INSIGHTS.to_owned(),
        };
    }

    // Bold labels are the common form; ATX headings are the fallback
    let daily = capture(&DAILY_BOLD, cleaned).or_else(|| capture(&DAILY_HEADING, cleaned));
    let weekly = capture(&WEEKLY_BOLD, cleaned).or_else(|| capture(&WEEKLY_HEADING, cleaned));
    let insights =
        capture(&INSIGHTS_BOLD, cleaned).or_else(|| capture(&INSIGHTS_HEADING, cleaned));

    if daily.is_none() && weekly.is_none() && insights.is_none() {
        info!("No labelled sections found; using entire response as daily recommendation");
        return ParsedSections {
            daily_recommendation: flatten_markdown(cleaned),
            weekly_recommendation: CONSOLIDATED_WEEKLY.to_owned(),
            pattern_insights: CONSOLIDATED_INSIGHTS.to_owned(),
        };
    }

    ParsedSections {
        daily_recommendation: daily.map(|s| flatten_markdown(&s)).unwrap_or_default(),
        weekly_recommendation: weekly
            .map_or_else(|| DEFAULT_WEEKLY.to_owned(), |s| flatten_markdown(&s)),
        pattern_insights: insights
            .map_or_else(|| DEFAULT_INSIGHTS.to_owned(), |s| flatten_markdown(&s)),
    }
}

/// Parse an autopsy response, clamping the score to [1, 10] and defaulting
/// to 5 when no score line is present
#[must_use]
pub fn parse_autopsy(response: &str) -> ParsedAutopsy {
    let alignment_score = SCORE
        .captures(response)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .unwrap_or(5)
        .clamp(1, 10);

    let analysis = flatten_markdown(SCORE.replace(response, "").trim());

    ParsedAutopsy {
        analysis,
        alignment_score,
    }
}

/// Convert markdown formatting to clean plain text for storage
#[must_use]
pub fn flatten_markdown(text: &str) -> String {
    let text = MD_BOLD.replace_all(text, "$1");
    let text = MD_ITALIC.replace_all(&text, "$1");
    let text = MD_HEADER.replace_all(&text, "");
    let text = MD_LINK.replace_all(&text, "$1");

    text.trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_RESPONSE: &str = "\
**DAILY RECOMMENDATION:**
Easy 5 mile recovery run, keep HR in zone 2.

**WEEKLY PLANNING:**
Step-back week: reduce volume 20%.

**PATTERN INSIGHTS:**
ACWR trending up for 4 days.";

    #[test]
    fn full_bold_response_parses_into_three_sections() {
        let sections = parse_recommendation(FULL_RESPONSE);
        assert!(sections.daily_recommendation.starts_with("Easy 5 mile"));
        assert!(sections.weekly_recommendation.starts_with("Step-back week"));
        assert!(sections.pattern_insights.starts_with("ACWR trending"));
    }

    #[test]
    fn atx_heading_form_is_accepted() {
        let response = "\
## DAILY RECOMMENDATION
Run easy today.

## WEEKLY PLANNING
Hold volume steady.

## PATTERN INSIGHTS
Divergence is balanced.";

        let sections = parse_recommendation(response);
        assert_eq!(sections.daily_recommendation, "Run easy today.");
        assert_eq!(sections.weekly_recommendation, "Hold volume steady.");
        assert_eq!(sections.pattern_insights, "Divergence is balanced.");
    }

    #[test]
    fn daily_only_response_gets_safe_placeholders() {
        let response = "**DAILY RECOMMENDATION:**\nTake a full rest day.";
        let sections = parse_recommendation(response);

        assert_eq!(sections.daily_recommendation, "Take a full rest day.");
        assert_eq!(sections.weekly_recommendation, DEFAULT_WEEKLY);
        assert_eq!(sections.pattern_insights, DEFAULT_INSIGHTS);
    }

    #[test]
    fn unlabelled_response_becomes_daily_section() {
        let response = "Just run easy for 40 minutes and see how you feel.";
        let sections = parse_recommendation(response);

        assert_eq!(
            sections.daily_recommendation,
            "Just run easy for 40 minutes and see how you feel."
        );
        assert_eq!(sections.weekly_recommendation, CONSOLIDATED_WEEKLY);
        assert_eq!(sections.pattern_insights, CONSOLIDATED_INSIGHTS);
    }

    #[test]
    fn weekly_recommendation_label_variant_is_accepted() {
        let response = "\
**DAILY RECOMMENDATION:**
Easy day.

**WEEKLY RECOMMENDATION:**
Build gradually.";

        let sections = parse_recommendation(response);
        assert_eq!(sections.weekly_recommendation, "Build gradually.");
    }

    #[test]
    fn autopsy_score_is_extracted_and_clamped() {
        let parsed = parse_autopsy("ALIGNMENT_SCORE: 8/10\n\nALIGNMENT ASSESSMENT:\nGood.");
        assert_eq!(parsed.alignment_score, 8);
        assert!(parsed.analysis.contains("Good."));
        assert!(!parsed.analysis.contains("ALIGNMENT_SCORE"));

        let clamped = parse_autopsy("ALIGNMENT_SCORE: 14/10\nWay over.");
        assert_eq!(clamped.alignment_score, 10);

        let zero = parse_autopsy("ALIGNMENT_SCORE: 0/10\nUnder.");
        assert_eq!(zero.alignment_score, 1);
    }

    #[test]
    fn bracketed_score_form_is_accepted() {
        let parsed = parse_autopsy("ALIGNMENT_SCORE: [7/10]\nSolid session.");
        assert_eq!(parsed.alignment_score, 7);
    }

    #[test]
    fn missing_score_defaults_to_five() {
        let parsed = parse_autopsy("No score line at all, just prose.");
        assert_eq!(parsed.alignment_score, 5);
    }

    #[test]
    fn markdown_is_flattened_for_storage() {
        let flattened =
            flatten_markdown("**Bold** and *italic* and [link](https://x.test)\n## Header text");
        assert_eq!(flattened, "Bold and italic and link\nHeader text");
    }
}
