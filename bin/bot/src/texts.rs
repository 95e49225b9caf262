//! User-facing texts.

/// Sent while the model works on an answer; edited into the reply.
pub const THINKING: &str = "💄 Думаю над вашим вопросом...";

/// Confirms that the conversation was cleared.
pub const RESET_DONE: &str =
    "✅ История нашего диалога очищена. Можем начать всё с чистого листа!";

/// Sent when the history could not be cleared.
pub const RESET_FAILED: &str =
    "⚠️ Не удалось очистить историю диалога. Пожалуйста, попробуйте ещё раз чуть позже.";

/// Reply to unrecognized slash commands.
pub const UNKNOWN_COMMAND: &str =
    "Пожалуйста, используйте команды без дополнительного текста или просто задайте вопрос.";

/// Name used when the sender is unknown.
const FALLBACK_NAME: &str = "друг";

/// Greeting for `/start` and `/help`, in legacy Markdown.
#[must_use]
pub fn greeting(first_name: Option<&str>) -> String {
    let name = first_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(FALLBACK_NAME);

    format!(
        "Привет, {}! 🖖🏻\n\
         Я ваш личный виртуальный визажист на базе AI.\n\n\
         Задайте мне любой вопрос о макияже, и я постараюсь помочь.\n\
         Например: `Посоветуй, как скрыть темные круги под глазами.`\n\n\
         Чтобы начать диалог заново, используйте команду /reset или нажмите кнопку RESET.",
        escape_markdown(name)
    )
}

/// Escapes the characters legacy Markdown treats as markup.
fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_addresses_user() {
        let text = greeting(Some("Anna"));
        assert!(text.starts_with("Привет, Anna!"));
        assert!(text.contains("/reset"));
        assert!(text.contains("RESET"));
    }

    #[test]
    fn greeting_without_name() {
        assert!(greeting(None).starts_with("Привет, друг!"));
        assert!(greeting(Some("  ")).starts_with("Привет, друг!"));
    }

    #[test]
    fn greeting_escapes_markup_in_names() {
        assert!(greeting(Some("a_b*c")).starts_with("Привет, a\\_b\\*c!"));
    }
}
