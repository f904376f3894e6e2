/// A command parsed out of an update's text. Derived on demand, never stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    /// Includes the prefix, e.g. `/start`.
    pub token: String,
    pub args: String,
}

/// Split `text` into a command token and its arguments.
///
/// Returns `None` when `text` does not begin with `prefix`. The token runs up to
/// the first whitespace; everything after it (trimmed) is the argument string.
/// A `/cmd@name` suffix is dropped only when `name` is `bot_username`.
pub fn parse_command(text: &str, prefix: char, bot_username: Option<&str>) -> Option<Command> {
    if !text.starts_with(prefix) {
        return None;
    }

    let (first, rest) = match text.find(char::is_whitespace) {
        Some(idx) => (&text[..idx], text[idx..].trim()),
        None => (text, ""),
    };

    let token = match (first.split_once('@'), bot_username) {
        (Some((cmd, target)), Some(me)) if target.eq_ignore_ascii_case(me) => cmd,
        _ => first,
    };

    Some(Command {
        token: token.to_string(),
        args: rest.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_token_and_args() {
        let cmd = parse_command("/start   ref 42 ", '/', None).unwrap();
        assert_eq!(cmd.token, "/start");
        assert_eq!(cmd.args, "ref 42");

        let bare = parse_command("/help", '/', None).unwrap();
        assert_eq!(bare.token, "/help");
        assert_eq!(bare.args, "");
    }

    #[test]
    fn plain_text_is_not_a_command() {
        assert!(parse_command("hello /start", '/', None).is_none());
        assert!(parse_command("", '/', None).is_none());
    }

    #[test]
    fn token_keeps_case() {
        assert_eq!(parse_command("/Start", '/', None).unwrap().token, "/Start");
    }

    #[test]
    fn strips_own_bot_mention_only() {
        let own = parse_command("/start@WishBot x", '/', Some("wishbot")).unwrap();
        assert_eq!(own.token, "/start");
        assert_eq!(own.args, "x");

        let other = parse_command("/start@OtherBot", '/', Some("wishbot")).unwrap();
        assert_eq!(other.token, "/start@OtherBot");

        let unknown_self = parse_command("/start@WishBot", '/', None).unwrap();
        assert_eq!(unknown_self.token, "/start@WishBot");
    }
}
