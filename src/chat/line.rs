//! Chat line codec
//!
//! Parses `[@tags] [:prefix] COMMAND [params] [:trailing]` and formats the few
//! outbound commands the session needs. Tags are skipped.

/// One parsed chat line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

impl ChatLine {
    /// Parse a single line, without its trailing CRLF
    ///
    /// Returns `None` for blank lines or lines without a command.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut rest = raw.trim_end_matches(['\r', '\n']);

        if rest.starts_with('@') {
            rest = rest.split_once(' ').map(|(_, r)| r)?;
        }
        rest = rest.trim_start();

        let prefix = match rest.strip_prefix(':') {
            Some(p) => {
                let (prefix, r) = p.split_once(' ').unwrap_or((p, ""));
                rest = r;
                Some(prefix.to_string())
            }
            None => None,
        };

        let (middle, trailing) = match rest.split_once(" :") {
            Some((m, t)) => (m, Some(t)),
            None => match rest.strip_prefix(':') {
                Some(t) => ("", Some(t)),
                None => (rest, None),
            },
        };

        let mut words = middle.split(' ').filter(|w| !w.is_empty());
        let command = words.next()?.to_ascii_uppercase();
        let mut params: Vec<String> = words.map(str::to_string).collect();
        if let Some(trailing) = trailing {
            params.push(trailing.to_string());
        }

        Some(Self {
            prefix,
            command,
            params,
        })
    }

    /// Last parameter, usually the human-readable text
    pub fn trailing(&self) -> Option<&str> {
        self.params.last().map(String::as_str)
    }

    /// Whether the server is reporting a failed login
    ///
    /// Login failures arrive as a `NOTICE` addressed to `*` before the welcome.
    pub fn is_login_failure(&self) -> bool {
        self.command == "NOTICE" && self.params.first().map(String::as_str) == Some("*")
    }
}

pub fn pass(token: &str) -> String {
    let token = token.strip_prefix("oauth:").unwrap_or(token);
    format!("PASS oauth:{}", token)
}

pub fn nick(login: &str) -> String {
    format!("NICK {}", login.to_lowercase())
}

pub fn privmsg(channel: &str, text: &str) -> String {
    format!("PRIVMSG #{} :{}", channel.trim_start_matches('#'), text)
}

pub fn ping(token: &str) -> String {
    format!("PING :{}", token)
}

pub fn pong(token: &str) -> String {
    format!("PONG :{}", token)
}

/// Lines are never logged if they carry credentials
pub fn is_sensitive(line: &str) -> bool {
    line.starts_with("PASS ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_welcome() {
        let line = ChatLine::parse(":tmi.twitch.tv 001 somebot :Welcome, GLHF!\r\n").unwrap();
        assert_eq!(line.prefix.as_deref(), Some("tmi.twitch.tv"));
        assert_eq!(line.command, "001");
        assert_eq!(line.params, vec!["somebot", "Welcome, GLHF!"]);
    }

    #[test]
    fn test_parse_ping_without_prefix() {
        let line = ChatLine::parse("PING :tmi.twitch.tv").unwrap();
        assert_eq!(line.prefix, None);
        assert_eq!(line.command, "PING");
        assert_eq!(line.trailing(), Some("tmi.twitch.tv"));
    }

    #[test]
    fn test_parse_skips_tags() {
        let raw = "@badge-info=;color=#FF0000 :nick!nick@nick.tmi.twitch.tv PRIVMSG #chan :hi there";
        let line = ChatLine::parse(raw).unwrap();
        assert_eq!(line.command, "PRIVMSG");
        assert_eq!(line.params, vec!["#chan", "hi there"]);
    }

    #[test]
    fn test_login_failure_notice() {
        let line = ChatLine::parse(":tmi.twitch.tv NOTICE * :Login authentication failed").unwrap();
        assert!(line.is_login_failure());

        let line = ChatLine::parse(":tmi.twitch.tv NOTICE #chan :You are permitted to do that.")
            .unwrap();
        assert!(!line.is_login_failure());
    }

    #[test]
    fn test_parse_blank() {
        assert_eq!(ChatLine::parse(""), None);
        assert_eq!(ChatLine::parse("\r\n"), None);
        assert_eq!(ChatLine::parse(":prefix.only"), None);
    }

    #[test]
    fn test_format_outbound() {
        assert_eq!(pass("oauth:abc"), "PASS oauth:abc");
        assert_eq!(pass("abc"), "PASS oauth:abc");
        assert_eq!(nick("SomeBot"), "NICK somebot");
        assert_eq!(privmsg("#chan", "/ban x"), "PRIVMSG #chan :/ban x");
        assert_eq!(privmsg("chan", "/ban x"), "PRIVMSG #chan :/ban x");
        assert_eq!(pong("tmi.twitch.tv"), "PONG :tmi.twitch.tv");
        assert!(is_sensitive(&pass("abc")));
        assert!(!is_sensitive(&nick("abc")));
    }
}
