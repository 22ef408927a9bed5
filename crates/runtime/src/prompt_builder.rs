//! Prompt assembly for the answering call.
//!
//! Everything here is synchronous and pure: [`crate::ResearchRuntime`] gathers
//! recalled insights and search hits first, then hands them over to be laid
//! out as the system prompt.

use researcher_llm::ChatMessage;
use researcher_memory::InsightRecord;
use researcher_search::SearchHit;

/// Prefix (case-insensitive) marking a message as a correction for the
/// previous question rather than a new question.
pub const MANUAL_TEACHING_PREFIX: &str = "the answer is:";

pub const NO_MEMORY_CONTEXT: &str = "No relevant past insights found.";

pub struct PromptInputs<'a> {
    pub agent_name: &'a str,
    pub user_message: &'a str,
    pub insights: &'a [InsightRecord],
    pub hits: &'a [SearchHit],
}

/// System + user messages for the main completion call.
pub fn build_chat_messages(inputs: &PromptInputs<'_>) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(build_system_prompt(inputs)),
        ChatMessage::user(inputs.user_message),
    ]
}

pub fn build_system_prompt(inputs: &PromptInputs<'_>) -> String {
    format!(
        "You are a \"{name}\", an intelligent agent that learns from every interaction.\n\n\
         Your Goal: Answer the user's question comprehensively using the provided \
         \"Search Context\" and \"Memory Context\".\n\n\
         Memory Context (What you've learned before):\n{memory}\n\n\
         Search Context (Real-time data):\n{search}\n\n\
         Instructions:\n\
         - Prioritize using the \"Memory Context\" to show you remember past lessons.\n\
         - Use \"Search Context\" for up-to-date facts.\n\
         - If the \"Memory Context\" contradicts the \"Search Context\", trust the fresher \
         \"Search Context\" but acknowledge the change.\n\
         - Be helpful, technical, and concise.",
        name = inputs.agent_name,
        memory = memory_context(inputs.insights),
        search = search_context(inputs.hits),
    )
}

pub fn memory_context(insights: &[InsightRecord]) -> String {
    if insights.is_empty() {
        return NO_MEMORY_CONTEXT.to_string();
    }

    let lines = insights
        .iter()
        .map(|record| format!("- {}", record.insight))
        .collect::<Vec<_>>()
        .join("\n");
    format!("I found these relevant past insights from our memory:\n{lines}\n")
}

pub fn search_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| format!("[{}]({}): {}", hit.title, hit.url, hit.snippet))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn is_manual_teaching(message: &str) -> bool {
    let trimmed = message.trim_start();
    trimmed
        .get(..MANUAL_TEACHING_PREFIX.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(MANUAL_TEACHING_PREFIX))
}

#[cfg(test)]
mod tests {
    use researcher_llm::Role;

    use super::*;

    fn hit(title: &str) -> SearchHit {
        SearchHit {
            title: title.to_string(),
            url: format!("https://{}.test", title.to_lowercase()),
            snippet: format!("About {title}."),
        }
    }

    #[test]
    fn empty_memory_uses_fallback_line() {
        assert_eq!(memory_context(&[]), NO_MEMORY_CONTEXT);
    }

    #[test]
    fn memory_context_lists_insights() {
        let records = vec![
            InsightRecord::new("capital of Mars", "The capital of Mars is Elonville."),
            InsightRecord::new("mars weather", "Dust storms can cover the whole planet."),
        ];
        let ctx = memory_context(&records);
        assert!(ctx.starts_with("I found these relevant past insights from our memory:\n"));
        assert!(ctx.contains("- The capital of Mars is Elonville.\n- Dust storms"));
    }

    #[test]
    fn search_context_formats_markdown_links() {
        let ctx = search_context(&[hit("Mars"), hit("Phobos")]);
        assert_eq!(
            ctx,
            "[Mars](https://mars.test): About Mars.\n\n[Phobos](https://phobos.test): About Phobos."
        );
        assert_eq!(search_context(&[]), "");
    }

    #[test]
    fn chat_messages_carry_both_contexts() {
        let records = vec![InsightRecord::new("capital of Mars", "Elonville is the capital.")];
        let hits = vec![hit("Mars")];
        let messages = build_chat_messages(&PromptInputs {
            agent_name: "Persistent Researcher",
            user_message: "What is the capital of Mars?",
            insights: &records,
            hits: &hits,
        });

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("\"Persistent Researcher\""));
        assert!(messages[0].content.contains("- Elonville is the capital."));
        assert!(messages[0].content.contains("[Mars](https://mars.test)"));
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "What is the capital of Mars?");
    }

    #[test]
    fn manual_teaching_prefix_is_case_insensitive() {
        assert!(is_manual_teaching("The answer is: Elonville"));
        assert!(is_manual_teaching("  THE ANSWER IS:Elonville"));
        assert!(!is_manual_teaching("What is the answer?"));
        assert!(!is_manual_teaching("the answer"));
        assert!(!is_manual_teaching("ünïcode the answer is: x"));
    }
}
