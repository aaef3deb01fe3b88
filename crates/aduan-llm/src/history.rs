use aduan_core::turns::{ChatTurn, Role};

/// Trims a transcript for prompting. User turns all stay because they carry
/// the disclosure; assistant turns beyond the most recent `assistant_window`
/// are dropped oldest-first.
pub fn compress(history: &[ChatTurn], assistant_window: usize) -> Vec<ChatTurn> {
    let assistant_total = history.iter().filter(|t| t.role == Role::Assistant).count();
    if assistant_total <= assistant_window {
        return history.to_vec();
    }

    let mut drop_remaining = assistant_total - assistant_window;
    history
        .iter()
        .filter(|t| {
            if t.role == Role::Assistant && drop_remaining > 0 {
                drop_remaining -= 1;
                false
            } else {
                true
            }
        })
        .cloned()
        .collect()
}

/// Flattens a transcript into labeled lines for the extraction prompt.
pub fn transcript(history: &[ChatTurn]) -> String {
    history
        .iter()
        .map(|t| match t.role {
            Role::User => format!("Pengguna: {}", t.content),
            Role::Assistant => format!("Pendamping: {}", t.content),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation(pairs: usize) -> Vec<ChatTurn> {
        let mut history = Vec::new();
        for i in 0..pairs {
            history.push(ChatTurn::user(format!("cerita {i}")));
            history.push(ChatTurn::assistant(format!("balasan {i}")));
        }
        history
    }

    #[test]
    fn short_history_unchanged() {
        let history = conversation(3);
        assert_eq!(compress(&history, 6), history);
    }

    #[test]
    fn drops_oldest_assistant_turns_only() {
        let history = conversation(10);
        let compressed = compress(&history, 6);

        let users: Vec<_> = compressed.iter().filter(|t| t.is_user()).collect();
        assert_eq!(users.len(), 10);

        let assistants: Vec<_> = compressed
            .iter()
            .filter(|t| t.role == Role::Assistant)
            .map(|t| t.content.as_str())
            .collect();
        assert_eq!(assistants.len(), 6);
        assert_eq!(assistants[0], "balasan 4");
        assert_eq!(assistants[5], "balasan 9");
    }

    #[test]
    fn order_is_preserved() {
        let history = conversation(8);
        let compressed = compress(&history, 2);
        let contents: Vec<_> = compressed.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(
            contents,
            vec![
                "cerita 0", "cerita 1", "cerita 2", "cerita 3", "cerita 4", "cerita 5",
                "cerita 6", "balasan 6", "cerita 7", "balasan 7",
            ]
        );
    }

    #[test]
    fn empty_history() {
        assert!(compress(&[], 6).is_empty());
    }

    #[test]
    fn transcript_labels_roles() {
        let history = vec![ChatTurn::user("halo"), ChatTurn::assistant("hai, ada apa?")];
        assert_eq!(transcript(&history), "Pengguna: halo\nPendamping: hai, ada apa?");
    }
}
