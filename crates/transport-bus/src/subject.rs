/// Match a subject against a subscription pattern.
///
/// Tokens are separated by `.`. A `*` token matches exactly one token and a
/// trailing `>` matches one or more remaining tokens.
pub fn subject_matches(pattern: &str, subject: &str) -> bool {
    let mut pattern_tokens = pattern.split('.');
    let mut subject_tokens = subject.split('.');

    loop {
        match (pattern_tokens.next(), subject_tokens.next()) {
            (Some(">"), Some(token)) => {
                return pattern_tokens.next().is_none() && !token.is_empty();
            }
            (Some("*"), Some(token)) if !token.is_empty() => continue,
            (Some(expected), Some(token)) if expected == token && !token.is_empty() => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::subject_matches;

    #[test]
    fn literal_subjects() {
        assert!(subject_matches("events.data", "events.data"));
        assert!(!subject_matches("events.data", "events.data.extra"));
        assert!(!subject_matches("events.data.extra", "events.data"));
        assert!(!subject_matches("events.data", "events.info"));
    }

    #[test]
    fn single_token_wildcard() {
        assert!(subject_matches("heartbeat.*.service", "heartbeat.diag.service"));
        assert!(!subject_matches("heartbeat.*.service", "heartbeat.a.b.service"));
        assert!(!subject_matches("heartbeat.*", "heartbeat"));
    }

    #[test]
    fn tail_wildcard() {
        assert!(subject_matches("commands.svc.>", "commands.svc.reboot"));
        assert!(subject_matches("commands.svc.>", "commands.svc.config.set"));
        assert!(!subject_matches("commands.svc.>", "commands.svc"));
        assert!(!subject_matches("commands.svc.>.x", "commands.svc.a.x"));
    }

    #[test]
    fn empty_tokens_never_match() {
        assert!(!subject_matches("events.*", "events."));
        assert!(!subject_matches("events..data", "events..data"));
    }
}
