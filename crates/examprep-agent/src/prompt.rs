//! Prompt composition for the research-then-tutor turn.
//!
//! All template wording lives in this module. [`compose`] covers the pre-fetch
//! and no-search paths, [`compose_without_results`] a search that came back
//! empty or failed, and [`compose_for_tool`] the path where the model runs the
//! search itself. All of them render through the same template.

const ROLE_LINE: &str = "You are an advanced AI Study Assistant.";

const TUTOR_STEPS: &str = "\
1. Explain the concept briefly (2-3 sentences).
2. Ask the user ONE conceptual multiple-choice question to test their understanding.
3. Reveal the correct answer with a one-sentence justification.";

/// Shown to the model when no search context exists
pub const NO_LIVE_DATA_NOTICE: &str = "No live data is available for this topic; rely on well-established academic definitions.";

const GROUNDED_ON_RESULTS: &str = "Based *only* on the search results above:";
const GROUNDED_ON_KNOWLEDGE: &str = "Based on well-established academic knowledge:";
const GROUNDED_ON_TOOL: &str = "Based *only* on the search results:";

/// Compose the tutoring prompt for `topic` with optional pre-fetched context.
///
/// Absent or blank context produces the explicit no-live-data notice.
pub fn compose(topic: &str, context: Option<&str>) -> String {
    match context.map(str::trim).filter(|c| !c.is_empty()) {
        Some(context) => render(
            topic,
            &format!("Live search results:\n{}", context),
            GROUNDED_ON_RESULTS,
        ),
        None => render(topic, NO_LIVE_DATA_NOTICE, GROUNDED_ON_KNOWLEDGE),
    }
}

/// Compose the tutoring prompt after a search that produced nothing usable.
///
/// `note` (the search error or no-results text) is kept ahead of the
/// no-live-data notice, and the tutor is pointed at established knowledge.
pub fn compose_without_results(topic: &str, note: &str) -> String {
    let research = match note.trim() {
        "" => NO_LIVE_DATA_NOTICE.to_string(),
        note => format!("{}\n{}", note, NO_LIVE_DATA_NOTICE),
    };
    render(topic, &research, GROUNDED_ON_KNOWLEDGE)
}

/// Compose the tutoring prompt asking the model to run `tool_name` itself.
pub fn compose_for_tool(topic: &str, tool_name: &str) -> String {
    render(
        topic,
        &format!(
            "Use the '{}' tool to find the absolute latest academic definitions and examples for this.",
            tool_name
        ),
        GROUNDED_ON_TOOL,
    )
}

fn render(topic: &str, research: &str, grounding: &str) -> String {
    format!(
        "{ROLE_LINE}\n\n\
         STEP 1 (RESEARCHER):\n\
         The user is asking about: \"{topic}\".\n\
         {research}\n\n\
         STEP 2 (TUTOR):\n\
         {grounding}\n\
         {TUTOR_STEPS}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_contains_topic_and_snippet() {
        let context = "Title: Deadlock\nSnippet: A set of processes each waiting for a resource held by another.";
        let prompt = compose("Operating Systems Deadlocks", Some(context));
        assert!(prompt.contains("Operating Systems Deadlocks"));
        assert!(prompt.contains(
            "A set of processes each waiting for a resource held by another."
        ));
        assert!(!prompt.contains(NO_LIVE_DATA_NOTICE));
    }

    #[test]
    fn test_compose_absent_or_blank_context() {
        for context in [None, Some(""), Some("  \n ")] {
            let prompt = compose("Virtual Memory", context);
            assert!(prompt.contains("Virtual Memory"));
            assert!(prompt.contains(NO_LIVE_DATA_NOTICE));
        }
    }

    #[test]
    fn test_without_results_falls_back_to_knowledge() {
        let prompt = compose_without_results("Paging", "Search error: request failed");
        assert!(prompt.contains("\"Paging\""));
        assert!(prompt.contains("Search error: request failed\n"));
        assert!(prompt.contains(NO_LIVE_DATA_NOTICE));
        assert!(prompt.contains(GROUNDED_ON_KNOWLEDGE));
        assert!(!prompt.contains(GROUNDED_ON_RESULTS));
        assert!(!prompt.contains("Live search results:"));

        assert_eq!(
            compose_without_results("Paging", " "),
            compose("Paging", None)
        );
    }

    #[test]
    fn test_tutor_steps_always_present() {
        for prompt in [
            compose("Mutex", Some("ctx")),
            compose("Mutex", None),
            compose_without_results("Mutex", "Search error: timeout"),
            compose_for_tool("Mutex", "search_web"),
        ] {
            assert!(prompt.starts_with(ROLE_LINE));
            assert!(prompt.contains("STEP 2 (TUTOR):"));
            assert!(prompt.contains("ONE conceptual multiple-choice question"));
            assert!(prompt.contains("Reveal the correct answer"));
        }
    }

    #[test]
    fn test_compose_for_tool_names_tool() {
        let prompt = compose_for_tool("Scheduling", "search_web");
        assert!(prompt.contains("'search_web' tool"));
        assert!(prompt.contains("\"Scheduling\""));
    }

    #[test]
    fn test_compose_is_pure() {
        assert_eq!(compose("TLB", Some("x")), compose("TLB", Some("x")));
    }
}
