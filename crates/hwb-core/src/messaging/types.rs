/// Capabilities / limits of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub max_message_len: usize,
}

/// Trim `text` to at most `max_chars` characters, marking the cut with `...`.
pub fn truncate_for(caps: MessagingCapabilities, text: &str) -> String {
    let max_chars = caps.max_message_len;
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    format!("{}...", text.chars().take(keep).collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_untouched() {
        let caps = MessagingCapabilities { max_message_len: 10 };
        assert_eq!(truncate_for(caps, "привет"), "привет");
    }

    #[test]
    fn long_text_is_cut_on_char_boundary() {
        let caps = MessagingCapabilities { max_message_len: 5 };
        assert_eq!(truncate_for(caps, "работа"), "ра...");
    }
}
