//! Prefix commands (`!prompt <text>`).

/// A recognised prefix command and its argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub prefix: String,
    pub prompt_text: String,
}

/// Returns an invocation iff `text` starts with `prefix`; the remainder is trimmed.
///
/// Matching is on the raw string prefix, so `!promptfoo` yields the prompt `foo`.
pub fn parse_command(text: &str, prefix: &str) -> Option<CommandInvocation> {
    let rest = text.strip_prefix(prefix)?;
    Some(CommandInvocation {
        prefix: prefix.to_string(),
        prompt_text: rest.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_prefix_and_trims() {
        let inv = parse_command("!prompt   hello world \n", "!prompt").unwrap();
        assert_eq!(inv.prefix, "!prompt");
        assert_eq!(inv.prompt_text, "hello world");
    }

    #[test]
    fn bare_prefix_gives_empty_prompt() {
        assert_eq!(parse_command("!prompt", "!prompt").unwrap().prompt_text, "");
    }

    #[test]
    fn no_word_boundary_required() {
        assert_eq!(parse_command("!promptfoo", "!prompt").unwrap().prompt_text, "foo");
    }

    #[test]
    fn prefix_must_lead() {
        assert_eq!(parse_command("hello", "!prompt"), None);
        assert_eq!(parse_command(" !prompt hi", "!prompt"), None);
        assert_eq!(parse_command("!PROMPT hi", "!prompt"), None);
        assert_eq!(parse_command("", "!prompt"), None);
    }

    #[test]
    fn multibyte_remainder() {
        let inv = parse_command("!prompt ¿qué tal? 🙂", "!prompt").unwrap();
        assert_eq!(inv.prompt_text, "¿qué tal? 🙂");
    }
}
