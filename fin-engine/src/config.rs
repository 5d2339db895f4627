//! Configuration for the FIN engine

use serde::{Deserialize, Serialize};

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Sending institution defaults
    pub originator: OriginatorConfig,

    /// Session / sequence numbering
    pub sequencing: SequencingConfig,

    /// Validation switches
    pub validation: ValidationConfig,

    /// Inbound parsing limits
    pub inbound: InboundConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "fin-engine".to_string(),
            originator: OriginatorConfig::default(),
            sequencing: SequencingConfig::default(),
            validation: ValidationConfig::default(),
            inbound: InboundConfig::default(),
        }
    }
}

/// Sending institution defaults, used where the header leaves a value out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginatorConfig {
    /// Sender BIC used when the header carries none
    pub sender_bic: String,

    /// Logical terminal code (9th character of the LT address)
    pub logical_terminal: char,

    /// Block 1 application identifier (`F` = FIN)
    pub application_id: char,

    /// Block 1 service identifier (`01` = FIN/GPA)
    pub service_id: String,

    /// Mark released messages as test-and-training (`{TNG:}` in block 5)
    pub test_mode: bool,
}

impl Default for OriginatorConfig {
    fn default() -> Self {
        Self {
            sender_bic: "SIMUGB2LXXX".to_string(),
            logical_terminal: 'A',
            application_id: crate::APPLICATION_FIN,
            service_id: crate::SERVICE_FIN.to_string(),
            test_mode: false,
        }
    }
}

/// Session / sequence numbering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencingConfig {
    /// First session number handed out per logical terminal (1-9999)
    pub initial_session: u32,

    /// First input sequence number (1-999999)
    pub initial_sequence: u32,
}

impl Default for SequencingConfig {
    fn default() -> Self {
        Self {
            initial_session: 1,
            initial_sequence: 1,
        }
    }
}

/// Validation switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Run the ISO 7064 mod-97 check on IBANs
    pub verify_iban_checksum: bool,

    /// Report line layout findings as warnings
    pub layout_warnings: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            verify_iban_checksum: false,
            layout_warnings: true,
        }
    }
}

/// Inbound parsing limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InboundConfig {
    /// Payloads above this size are stored but not scanned for tags
    pub max_parse_bytes: usize,
}

impl Default for InboundConfig {
    fn default() -> Self {
        Self {
            max_parse_bytes: 1024 * 1024, // 1 MiB
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(bic) = std::env::var("FIN_SENDER_BIC") {
            config.originator.sender_bic = bic;
        }

        if let Ok(lt) = std::env::var("FIN_LOGICAL_TERMINAL") {
            let mut chars = lt.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphanumeric() => {
                    config.originator.logical_terminal = c.to_ascii_uppercase()
                }
                _ => {
                    return Err(crate::Error::Config(format!(
                        "FIN_LOGICAL_TERMINAL must be one character, got '{}'",
                        lt
                    )))
                }
            }
        }

        if let Ok(service) = std::env::var("FIN_SERVICE_ID") {
            config.originator.service_id = service;
        }

        if let Ok(flag) = std::env::var("FIN_TEST_MODE") {
            config.originator.test_mode = parse_flag("FIN_TEST_MODE", &flag)?;
        }

        if let Ok(session) = std::env::var("FIN_INITIAL_SESSION") {
            config.sequencing.initial_session = session.parse().map_err(|e| {
                crate::Error::Config(format!("FIN_INITIAL_SESSION: {}", e))
            })?;
        }

        if let Ok(flag) = std::env::var("FIN_VERIFY_IBAN_CHECKSUM") {
            config.validation.verify_iban_checksum = parse_flag("FIN_VERIFY_IBAN_CHECKSUM", &flag)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the values that end up verbatim in block 1
    pub fn validate(&self) -> crate::Result<()> {
        let originator = &self.originator;
        if !originator.application_id.is_ascii_uppercase() {
            return Err(crate::Error::Config(format!(
                "application_id must be an uppercase letter, got '{}'",
                originator.application_id
            )));
        }

        if originator.service_id.len() != 2 || !originator.service_id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(crate::Error::Config(format!(
                "service_id must be two digits, got '{}'",
                originator.service_id
            )));
        }

        if !originator.logical_terminal.is_ascii_alphanumeric() {
            return Err(crate::Error::Config(format!(
                "logical_terminal must be alphanumeric, got '{}'",
                originator.logical_terminal
            )));
        }

        if !(1..=9999).contains(&self.sequencing.initial_session) {
            return Err(crate::Error::Config(format!(
                "initial_session must be within 1-9999, got {}",
                self.sequencing.initial_session
            )));
        }

        if !(1..=999_999).contains(&self.sequencing.initial_sequence) {
            return Err(crate::Error::Config(format!(
                "initial_sequence must be within 1-999999, got {}",
                self.sequencing.initial_sequence
            )));
        }

        Ok(())
    }
}

fn parse_flag(name: &str, value: &str) -> crate::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(crate::Error::Config(format!("{} must be a boolean, got '{}'", name, other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_name, "fin-engine");
        assert_eq!(config.originator.logical_terminal, 'A');
        assert_eq!(config.sequencing.initial_sequence, 1);
        assert!(!config.originator.test_mode);
    }

    #[test]
    fn test_partial_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[originator]\nsender_bic = \"BANKDEFFXXX\"\ntest_mode = true\n\n[sequencing]\ninitial_session = 42"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.originator.sender_bic, "BANKDEFFXXX");
        assert!(config.originator.test_mode);
        assert_eq!(config.originator.application_id, 'F');
        assert_eq!(config.sequencing.initial_session, 42);
        assert_eq!(config.sequencing.initial_sequence, 1);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[originator\nsender_bic = ").unwrap();
        assert!(matches!(Config::from_file(file.path()), Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_service_id_must_be_two_digits() {
        for service in ["1", "001", "0A", ""] {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "[originator]\nservice_id = \"{}\"", service).unwrap();
            let err = Config::from_file(file.path()).unwrap_err();
            assert!(matches!(err, crate::Error::Config(ref msg) if msg.contains("service_id")), "{:?}", err);
        }

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[originator]\nservice_id = \"21\"").unwrap();
        assert_eq!(Config::from_file(file.path()).unwrap().originator.service_id, "21");
    }

    #[test]
    fn test_validate_block1_values() {
        assert!(Config::default().validate().is_ok());

        let mut config = Config::default();
        config.originator.application_id = 'f';
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sequencing.initial_session = 10_000;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sequencing.initial_sequence = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("X", "TRUE").unwrap());
        assert!(!parse_flag("X", "off").unwrap());
        assert!(parse_flag("X", "maybe").is_err());
    }
}
