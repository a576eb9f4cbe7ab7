use crate::database::RetrievalHit;
use crate::llm::ChatMessage;

/// Separator between source blocks in the context
pub const BLOCK_SEPARATOR: &str = "\n---\n";

/// Join retrieved chunks into one grounding block, keeping retrieval order
pub fn assemble_context(hits: &[RetrievalHit]) -> String {
    hits.iter()
        .map(|hit| format!("Source: {}\n{}", hit.source, hit.chunk))
        .collect::<Vec<String>>()
        .join(BLOCK_SEPARATOR)
}

/// System instruction for the portfolio assistant
pub fn system_prompt(owner: &str) -> String {
    format!(
        "You are {owner}'s portfolio assistant.\n\
         Prefer the provided context when answering questions about {owner}, \
         and cite facts from it rather than guessing.\n\
         If the context is missing or does not cover the question, you may answer \
         from general knowledge, but say explicitly that the answer is not based \
         on {owner}'s documents and suggest what to ask {owner} instead.\n\
         Be concise and specific."
    )
}

/// Messages sent to the chat model: instruction, optional context, question
pub fn build_messages(owner: &str, context: &str, question: &str) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(system_prompt(owner))];
    if !context.trim().is_empty() {
        messages.push(ChatMessage::system(format!("Context:\n{}", context)));
    }
    messages.push(ChatMessage::user(question));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    fn hit(source: &str, chunk: &str, distance: f32) -> RetrievalHit {
        RetrievalHit {
            source: source.to_string(),
            chunk: chunk.to_string(),
            distance,
        }
    }

    #[test]
    fn test_assemble_context_keeps_order() {
        let hits = vec![
            hit("resume", "React, Node", 0.1),
            hit("project:chatbot", "RAG chat widget", 0.3),
        ];
        assert_eq!(
            assemble_context(&hits),
            "Source: resume\nReact, Node\n---\nSource: project:chatbot\nRAG chat widget"
        );
    }

    #[test]
    fn test_assemble_context_empty() {
        assert_eq!(assemble_context(&[]), "");
    }

    #[test]
    fn test_messages_with_context() {
        let messages = build_messages("Alp", "Source: resume\nReact", "What stack?");
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("Alp's portfolio assistant"));
        assert_eq!(messages[1].content, "Context:\nSource: resume\nReact");
        assert_eq!(messages[2], ChatMessage::user("What stack?"));
    }

    #[test]
    fn test_messages_without_context() {
        let messages = build_messages("Alp", "  ", "Hi");
        assert_eq!(messages.len(), 2);
        assert!(messages[0].content.contains("general knowledge"));
        assert_eq!(messages[1].role, Role::User);
    }
}
