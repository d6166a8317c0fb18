//! Topic-based follow-up question suggestions.

use regex::Regex;
use tracing::debug;

/// Maximum number of suggestions returned.
pub const MAX_SUGGESTIONS: usize = 3;

/// Returned when no topic matches.
pub const GENERAL_FALLBACK: [&str; 3] = [
    "Could you tell me more about recent community discussions?",
    "Is there any way I can get more involved with the community?",
    "What other topics are trending in community discussions?",
];

/// Returned instead of topic suggestions when no answer could be generated.
pub const CLARIFICATION_FALLBACK: &str = "Could you try rephrasing your question?";

struct TopicDefinition {
    name: &'static str,
    /// Searched in the query.
    query_keywords: &'static [&'static str],
    /// Searched in the answer.
    response_keywords: &'static [&'static str],
    suggestions: [&'static str; 2],
}

/// Declaration order is output order.
const TOPICS: &[TopicDefinition] = &[
    TopicDefinition {
        name: "safety/security",
        query_keywords: &["safety", "crime", "security", "protect", "theft"],
        response_keywords: &["suspicious", "concerns", "danger", "unsafe", "police"],
        suggestions: [
            "What safety measures has the community implemented recently?",
            "Are there any neighborhood watch programs available?",
        ],
    },
    TopicDefinition {
        name: "events/activities",
        query_keywords: &["event", "activity", "program", "meetup", "gathering"],
        response_keywords: &["festival", "meeting", "workshop", "class", "session"],
        suggestions: [
            "When is the next community event scheduled?",
            "How can I volunteer for community activities?",
        ],
    },
    TopicDefinition {
        name: "governance/policy",
        query_keywords: &["policy", "rule", "governance", "law", "regulation"],
        response_keywords: &["committee", "board", "council", "decision", "vote"],
        suggestions: [
            "Who are the current community representatives?",
            "How can I participate in the decision-making process?",
        ],
    },
    TopicDefinition {
        name: "infrastructure/development",
        query_keywords: &["development", "construction", "building", "infrastructure", "renovation"],
        response_keywords: &["project", "plan", "proposal", "improvement", "facility"],
        suggestions: [
            "What are the timeline expectations for these developments?",
            "How will these changes affect the local environment?",
        ],
    },
];

struct CompiledTopic {
    name: &'static str,
    query_pattern: Regex,
    response_pattern: Regex,
    suggestions: [&'static str; 2],
}

/// Maps a query and its answer to up to three follow-up questions.
///
/// Pure and deterministic: a topic matches when one of its query keywords
/// occurs in the query or one of its response keywords occurs in the
/// answer, case-insensitively.
pub struct FollowUpSuggester {
    topics: Vec<CompiledTopic>,
}

impl FollowUpSuggester {
    pub fn new() -> Self {
        let topics = TOPICS
            .iter()
            .map(|topic| CompiledTopic {
                name: topic.name,
                query_pattern: keyword_pattern(topic.query_keywords),
                response_pattern: keyword_pattern(topic.response_keywords),
                suggestions: topic.suggestions,
            })
            .collect();

        Self { topics }
    }

    /// Suggest follow-up questions. Always returns between 1 and 3 items.
    pub fn suggest(&self, query: &str, response: &str) -> Vec<String> {
        let mut suggestions: Vec<String> = Vec::new();

        for topic in &self.topics {
            if topic.query_pattern.is_match(query) || topic.response_pattern.is_match(response) {
                debug!("Detected {} topic", topic.name);
                suggestions.extend(topic.suggestions.iter().map(|s| s.to_string()));
            }
        }

        if suggestions.is_empty() {
            debug!("No specific topic detected, providing general follow-ups");
            suggestions = GENERAL_FALLBACK.iter().map(|s| s.to_string()).collect();
        }

        suggestions.truncate(MAX_SUGGESTIONS);
        suggestions
    }
}

fn keyword_pattern(keywords: &[&str]) -> Regex {
    let alternation = keywords
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("(?i)(?:{})", alternation)).expect("Invalid topic regex")
}

impl Default for FollowUpSuggester {
    fn default() -> Self {
        Self::new()
    }
}
