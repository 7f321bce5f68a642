//! Utility functions for the relay

/// String utilities
pub mod string {
    /// Check if a string is a valid IRC channel name
    pub fn is_valid_channel_name(name: &str) -> bool {
        let Some(first_char) = name.chars().next() else {
            return false;
        };
        if !"#&+!".contains(first_char) {
            return false;
        }
        
        // Channel name should not contain spaces or control characters
        name.chars().all(|c| !c.is_control() && c != ' ' && c != ',' && c != ':')
    }
    
    /// Check if a string is a valid IRC nickname
    pub fn is_valid_nickname(nick: &str, max_length: usize) -> bool {
        if nick.is_empty() || nick.len() > max_length {
            return false;
        }
        
        let mut chars = nick.chars();
        
        // First character must be letter or special character
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || "[]\\`_^{|}~".contains(c) => {}
            _ => return false,
        }
        
        // Remaining characters must be letter, digit, or special character
        chars.all(|c| c.is_ascii_alphanumeric() || "-[]\\`_^{|}~".contains(c))
    }
    
    /// Check if a string is a valid hostname
    pub fn is_valid_hostname(hostname: &str) -> bool {
        if hostname.is_empty() {
            return false;
        }
        
        hostname.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    }

    /// Strip characters that would end or truncate a wire line
    pub fn escape_message(content: &str) -> String {
        content.replace(&['\r', '\n', '\0'][..], "")
    }
}
