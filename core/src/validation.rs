//! Configuration validation report
//!
//! Unlike [`Config::validate`], which stops at the first hard error, the
//! validator collects every error and warning so `--test-config` can show
//! them all at once.

use crate::{config::MIN_LINE_LENGTH, topology, utils::string, Config};
use std::collections::HashSet;
use std::io::{self, Write};

/// Longest nickname accepted without a warning
const MAX_NICKNAME_LENGTH: usize = 30;

/// Validation result with detailed information
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether validation passed
    pub is_valid: bool,
    /// List of errors found
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues)
    pub warnings: Vec<ValidationWarning>,
    /// List of informational messages
    pub info: Vec<String>,
    /// Resolved relay routes as (source, target) identifiers
    pub routes: Vec<(String, Option<String>)>,
}

/// Validation error with context
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Error category
    pub category: ErrorCategory,
    /// Error message
    pub message: String,
    /// Suggested fix
    pub suggestion: Option<String>,
    /// Configuration section where error occurred
    pub section: String,
}

/// Validation warning (non-fatal)
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// Warning message
    pub message: String,
    /// Configuration section
    pub section: String,
    /// Optional suggestion for improvement
    pub suggestion: Option<String>,
}

/// Error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Missing required field
    MissingRequired,
    /// Invalid value
    InvalidValue,
    /// Invalid cross-reference
    InvalidReference,
    /// Duplicate value
    Duplicate,
}

impl ValidationResult {
    /// Create a new successful validation result
    pub fn success() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            info: Vec::new(),
            routes: Vec::new(),
        }
    }

    /// Add an error
    pub fn add_error(&mut self, error: ValidationError) {
        self.is_valid = false;
        self.errors.push(error);
    }

    /// Add a warning
    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Add an info message
    pub fn add_info(&mut self, info: String) {
        self.info.push(info);
    }

    /// Merge another validation result
    pub fn merge(&mut self, other: ValidationResult) {
        if !other.is_valid {
            self.is_valid = false;
        }
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.info.extend(other.info);
        self.routes.extend(other.routes);
    }
}

/// Relay configuration validator
pub struct ConfigValidator {
    config: Config,
}

impl ConfigValidator {
    /// Create a new validator
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run all validation checks
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::success();

        result.merge(self.validate_networks());
        result.merge(self.validate_relay_targets());

        result
    }

    fn validate_networks(&self) -> ValidationResult {
        let mut result = ValidationResult::success();

        if self.config.networks.is_empty() {
            result.add_error(ValidationError {
                category: ErrorCategory::MissingRequired,
                message: "No networks configured".to_string(),
                suggestion: Some("Add a [[networks]] section per chat network".to_string()),
                section: "networks".to_string(),
            });
            return result;
        }

        if self.config.networks.len() == 1 {
            result.add_warning(ValidationWarning {
                message: "Only one network configured; nothing will be relayed".to_string(),
                section: "networks".to_string(),
                suggestion: Some("Add at least a second [[networks]] entry".to_string()),
            });
        }

        let mut seen_ids = HashSet::new();
        for (idx, network) in self.config.networks.iter().enumerate() {
            let section = format!("networks[{}]", idx);
            let id = &network.network_identifier;

            if id.is_empty() {
                result.add_error(ValidationError {
                    category: ErrorCategory::MissingRequired,
                    message: "network_identifier cannot be empty".to_string(),
                    suggestion: Some("Use a short tag such as \"R\"".to_string()),
                    section: section.clone(),
                });
            } else if !seen_ids.insert(id.as_str()) {
                result.add_error(ValidationError {
                    category: ErrorCategory::Duplicate,
                    message: format!("Duplicate network identifier: {}", id),
                    suggestion: Some("Each network needs a unique identifier".to_string()),
                    section: section.clone(),
                });
            } else if id.contains(['[', ']']) {
                result.add_warning(ValidationWarning {
                    message: format!("Identifier '{}' contains brackets and will render oddly in relay tags", id),
                    section: section.clone(),
                    suggestion: None,
                });
            }

            if !string::is_valid_hostname(&network.server) {
                result.add_error(ValidationError {
                    category: ErrorCategory::InvalidValue,
                    message: format!("Invalid server hostname: '{}'", network.server),
                    suggestion: Some("Use a hostname like 'irc.example.net'".to_string()),
                    section: section.clone(),
                });
            }

            if network.port == 0 {
                result.add_error(ValidationError {
                    category: ErrorCategory::InvalidValue,
                    message: "Port cannot be 0".to_string(),
                    suggestion: Some("Use 6697 for TLS or 6667 for plaintext".to_string()),
                    section: section.clone(),
                });
            }

            if !string::is_valid_nickname(&network.nickname, MAX_NICKNAME_LENGTH) {
                result.add_error(ValidationError {
                    category: ErrorCategory::InvalidValue,
                    message: format!("Invalid nickname: '{}'", network.nickname),
                    suggestion: Some("Nicknames start with a letter and contain no spaces".to_string()),
                    section: section.clone(),
                });
            }

            if !string::is_valid_channel_name(&network.channel) {
                result.add_error(ValidationError {
                    category: ErrorCategory::InvalidValue,
                    message: format!("Invalid channel name: '{}'", network.channel),
                    suggestion: Some("Channel names start with '#' or '&'".to_string()),
                    section: section.clone(),
                });
            }

            if network.tls && network.port == 6667 {
                result.add_warning(ValidationWarning {
                    message: "TLS enabled on port 6667, which is usually plaintext".to_string(),
                    section: section.clone(),
                    suggestion: Some("Set port = 6697 or tls = false".to_string()),
                });
            } else if !network.tls && network.port == 6697 {
                result.add_warning(ValidationWarning {
                    message: "TLS disabled on port 6697, which is usually TLS".to_string(),
                    section: section.clone(),
                    suggestion: Some("Set tls = true".to_string()),
                });
            }

            if network.idle_timeout_secs == Some(0) {
                result.add_error(ValidationError {
                    category: ErrorCategory::InvalidValue,
                    message: "idle_timeout_secs cannot be 0".to_string(),
                    suggestion: Some("Remove the option or use a value above the server's ping interval".to_string()),
                    section: section.clone(),
                });
            }

            if network.max_line_length < MIN_LINE_LENGTH {
                result.add_error(ValidationError {
                    category: ErrorCategory::InvalidValue,
                    message: format!("max_line_length {} is too small", network.max_line_length),
                    suggestion: Some(format!("Use at least {}; servers send up to 512", MIN_LINE_LENGTH)),
                    section: section.clone(),
                });
            }

            if network.ignored_users.iter().any(|u| u.eq_ignore_ascii_case(&network.nickname)) {
                result.add_warning(ValidationWarning {
                    message: "The relay's own nickname is on its ignore list".to_string(),
                    section: section.clone(),
                    suggestion: None,
                });
            }

            result.add_info(format!(
                "[{}] {} as {} in {}{}",
                id,
                network.address(),
                network.nickname,
                network.channel,
                if network.tls { " (TLS)" } else { "" }
            ));
        }

        result
    }

    fn validate_relay_targets(&self) -> ValidationResult {
        let mut result = ValidationResult::success();

        match topology::resolve_targets(&self.config.networks) {
            Ok(targets) => {
                for (network, target) in self.config.networks.iter().zip(targets) {
                    let to = target.map(|index| self.config.networks[index].network_identifier.clone());
                    result.routes.push((network.network_identifier.clone(), to));
                }
            }
            Err(e) => result.add_error(ValidationError {
                category: ErrorCategory::InvalidReference,
                message: e.to_string(),
                suggestion: Some("relay_to must name another network's identifier".to_string()),
                section: "networks.relay_to".to_string(),
            }),
        }

        result
    }
}

/// Write the `--test-config` report to `out`
///
/// One line per finding, grouped errors first, followed by the networks and
/// the relay routes they resolve to.
pub fn write_report<W: Write>(result: &ValidationResult, out: &mut W) -> io::Result<()> {
    let verdict = if result.is_valid { "ok" } else { "FAILED" };
    writeln!(
        out,
        "config check: {} ({} errors, {} warnings)",
        verdict,
        result.errors.len(),
        result.warnings.len()
    )?;

    for error in &result.errors {
        write!(out, "  error   {:<18} {}", error.section, error.message)?;
        match &error.suggestion {
            Some(hint) => writeln!(out, " (hint: {})", hint)?,
            None => writeln!(out)?,
        }
    }
    for warning in &result.warnings {
        write!(out, "  warning {:<18} {}", warning.section, warning.message)?;
        match &warning.suggestion {
            Some(hint) => writeln!(out, " (hint: {})", hint)?,
            None => writeln!(out)?,
        }
    }

    if !result.info.is_empty() {
        writeln!(out, "networks:")?;
        for info in &result.info {
            writeln!(out, "  {}", info)?;
        }
    }

    if !result.routes.is_empty() {
        writeln!(out, "routes:")?;
        for (from, to) in &result.routes {
            match to {
                Some(to) => writeln!(out, "  {} -> {}", from, to)?,
                None => writeln!(out, "  {} -> (none)", from)?,
            }
        }
    }
    Ok(())
}

/// Print the `--test-config` report to stdout
pub fn print_validation_result(result: &ValidationResult) {
    let stdout = io::stdout();
    if let Err(e) = write_report(result, &mut stdout.lock()) {
        tracing::error!("Failed to write validation report: {}", e);
    }
}
