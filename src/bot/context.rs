//! Prompt assembly: reply context, recent history, current question.

use crate::bot::database::LogLine;

/// Max chars quoted from the replied-to message.
const MAX_QUOTE_LENGTH: usize = 200;

/// Shown as the question when a mention arrives with no text of its own.
const EMPTY_QUERY_PLACEHOLDER: &str = "Bu mesaja kendi tarzında kısa bir yorum yap.";

/// The message being replied to, as seen by the prompt.
pub struct ReplyContext<'a> {
    pub author: &'a str,
    pub text: &'a str,
    /// True when the quoted message was the bot's own.
    pub from_bot: bool,
}

pub struct PromptInput<'a> {
    pub reply: Option<ReplyContext<'a>>,
    /// Chronological slice of the log.
    pub history: &'a [LogLine],
    /// Per-line character budget for history rendering.
    pub line_budget: usize,
    pub asker: &'a str,
    /// Mention-stripped, trimmed query text.
    pub query: &'a str,
    /// Optional web-search result text folded in as grounding.
    pub grounding: Option<&'a str>,
}

/// Truncate on a char boundary, appending an ellipsis when shortened.
fn clip(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(max_chars).collect();
    clipped.push('…');
    clipped
}

/// Render one history line as `author: text`, clipped to the budget.
fn render_line(line: &LogLine, budget: usize) -> String {
    format!("{}: {}", line.author, clip(&line.text, budget))
}

/// Compose the user-side prompt. Never fails; empty inputs yield empty
/// sections rather than errors.
pub fn build_prompt(input: &PromptInput) -> String {
    let mut prompt = String::new();

    if let Some(ref reply) = input.reply {
        let quoted = clip(reply.text, MAX_QUOTE_LENGTH);
        if reply.from_bot {
            prompt.push_str(&format!(
                "Bağlam: Senin önceki mesajın: \"{quoted}\". Buna cevap yazılmış.\n"
            ));
        } else {
            prompt.push_str(&format!(
                "Bağlam: {} yazmış: \"{quoted}\". Şimdi buna cevap verilecek.\n",
                reply.author
            ));
        }
    } else {
        prompt.push_str("Bağlam: yok.\n");
    }

    prompt.push_str("Son mesajlar (hafıza):\n");
    for line in input.history {
        prompt.push_str(&render_line(line, input.line_budget));
        prompt.push('\n');
    }

    if let Some(grounding) = input.grounding {
        prompt.push_str("\nWebden bulunanlar:\n");
        prompt.push_str(grounding);
        prompt.push('\n');
    }

    let query = if input.query.is_empty() {
        EMPTY_QUERY_PLACEHOLDER
    } else {
        input.query
    };

    prompt.push_str(&format!("\nSoran: {}\nSoru: {}\n", input.asker, query));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: i64, author: &str, text: &str) -> LogLine {
        LogLine {
            id,
            message_id: id,
            author: author.to_string(),
            text: text.to_string(),
            reply_to_id: None,
            timestamp_millis: 1000 + id,
        }
    }

    fn base_input<'a>(history: &'a [LogLine]) -> PromptInput<'a> {
        PromptInput {
            reply: None,
            history,
            line_budget: 120,
            asker: "Ali",
            query: "naber",
            grounding: None,
        }
    }

    #[test]
    fn test_empty_history_renders_empty_section() {
        let prompt = build_prompt(&base_input(&[]));
        assert!(prompt.contains("Son mesajlar (hafıza):\n\n"));
        assert!(prompt.contains("Soran: Ali"));
        assert!(prompt.contains("Soru: naber"));
    }

    #[test]
    fn test_history_is_chronological() {
        let history = vec![line(1, "alice", "önce"), line(2, "bob", "sonra")];
        let prompt = build_prompt(&base_input(&history));
        let first = prompt.find("alice: önce").unwrap();
        let second = prompt.find("bob: sonra").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_history_lines_clipped_to_budget() {
        let long = "ç".repeat(300);
        let history = vec![line(1, "alice", &long)];
        let mut input = base_input(&history);
        input.line_budget = 50;
        let prompt = build_prompt(&input);
        // 50 chars plus ellipsis, never the full 300
        assert!(prompt.contains(&format!("alice: {}…", "ç".repeat(50))));
        assert!(!prompt.contains(&long));
    }

    #[test]
    fn test_reply_from_user() {
        let mut input = base_input(&[]);
        input.reply = Some(ReplyContext { author: "Veli", text: "rust mu go mu?", from_bot: false });
        let prompt = build_prompt(&input);
        assert!(prompt.contains("Veli yazmış: \"rust mu go mu?\""));
    }

    #[test]
    fn test_reply_from_bot_is_marked_as_own() {
        let mut input = base_input(&[]);
        input.reply = Some(ReplyContext { author: "geveze", text: "bence rust", from_bot: true });
        let prompt = build_prompt(&input);
        assert!(prompt.contains("Senin önceki mesajın: \"bence rust\""));
        assert!(!prompt.contains("geveze yazmış"));
    }

    #[test]
    fn test_reply_quote_truncated() {
        let long = "x".repeat(400);
        let mut input = base_input(&[]);
        input.reply = Some(ReplyContext { author: "Veli", text: &long, from_bot: false });
        let prompt = build_prompt(&input);
        assert!(prompt.contains(&format!("{}…", "x".repeat(200))));
        assert!(!prompt.contains(&long));
    }

    #[test]
    fn test_empty_query_gets_placeholder() {
        let mut input = base_input(&[]);
        input.query = "";
        let prompt = build_prompt(&input);
        assert!(prompt.contains(EMPTY_QUERY_PLACEHOLDER));
    }

    #[test]
    fn test_grounding_folded_in() {
        let mut input = base_input(&[]);
        input.grounding = Some("Dolar bugün 41 lira.");
        let prompt = build_prompt(&input);
        assert!(prompt.contains("Webden bulunanlar:\nDolar bugün 41 lira."));
    }
}
