//! Relay line formatting: nick colors, CTCP ACTION framing, network tags

/// mIRC color control character
pub const COLOR: char = '\x03';

/// CTCP delimiter
pub const CTCP_DELIM: char = '\x01';

/// Color codes a nick may be painted with; white (00) and black (01) excluded
pub const NICK_PALETTE: [&str; 14] = [
    "02", "03", "04", "05", "06", "07", "08", "09", "10", "11", "12", "13", "14", "15",
];

const ACTION_MARKER: &str = "\x01ACTION";

/// Pick the palette entry for a name from the sum of its code points
pub fn nick_color(name: &str) -> &'static str {
    let sum: u64 = name.chars().map(|c| c as u64).sum();
    NICK_PALETTE[(sum % NICK_PALETTE.len() as u64) as usize]
}

/// Wrap a name in color markers using its palette entry
pub fn colorize(name: &str) -> String {
    format!("{COLOR}{}{name}{COLOR}", nick_color(name))
}

/// Body of a CTCP ACTION (`/me`), or `None` if `text` is a plain message
pub fn ctcp_action(text: &str) -> Option<&str> {
    let body = text.strip_prefix(ACTION_MARKER)?;
    let body = body.strip_prefix(' ').unwrap_or(body);
    Some(body.strip_suffix(CTCP_DELIM).unwrap_or(body))
}

/// Build the line forwarded to the relay target for a channel message
pub fn relay_line(network: &str, nick: &str, text: &str) -> String {
    let colored = colorize(nick);
    match ctcp_action(text) {
        Some(action) => format!("[{network}] * {colored} {action}"),
        None => format!("[{network}] <{colored}> {text}"),
    }
}

/// Prefix locally originated text with the network tag
pub fn tag(network: &str, text: &str) -> String {
    format!("[{network}] {text}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colorize_is_deterministic() {
        assert_eq!(colorize("alice"), colorize("alice"));
    }

    #[test]
    fn test_colorize_embeds_one_palette_code() {
        let out = colorize("alice");
        // "alice" sums to 510, 510 % 14 == 6 -> "08"
        assert_eq!(out, "\x0308alice\x03");

        let code = &out[1..3];
        assert!(NICK_PALETTE.contains(&code));
        assert_eq!(out.matches(COLOR).count(), 2);
    }

    #[test]
    fn test_palette_bounds() {
        assert_eq!(nick_color(""), "02");
        for name in ["a", "bob", "Zed_", "ünï", "[bracket]"] {
            assert!(NICK_PALETTE.contains(&nick_color(name)));
        }
    }

    #[test]
    fn test_ctcp_action() {
        assert_eq!(ctcp_action("\x01ACTION waves\x01"), Some("waves"));
        assert_eq!(ctcp_action("\x01ACTION waves"), Some("waves"));
        assert_eq!(ctcp_action("\x01ACTION\x01"), Some(""));
        assert_eq!(ctcp_action("waves"), None);
        assert_eq!(ctcp_action("\x01VERSION\x01"), None);
    }

    #[test]
    fn test_relay_line_shapes() {
        let nick = colorize("bob");
        assert_eq!(relay_line("R", "bob", "hi there"), format!("[R] <{nick}> hi there"));
        assert_eq!(relay_line("R", "bob", "\x01ACTION waves\x01"), format!("[R] * {nick} waves"));
    }
}
