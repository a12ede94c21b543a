//! Fully Qualified Board Names
//!
//! An FQBN identifies a board and its menu selections:
//! `package:architecture:board[:option=value,...]`.

use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::core::properties::Properties;
use crate::error::FqbnError;

fn valid_field() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_.-]*$").expect("valid FQBN field pattern"))
}

fn valid_value() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9=_.-]*$").expect("valid FQBN value pattern"))
}

/// Parsed board identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fqbn {
    pub package: String,
    pub architecture: String,
    pub board_id: String,
    /// Menu selections, in the order they were written
    pub configs: Properties,
}

impl Fqbn {
    /// Parse an FQBN string
    pub fn parse(input: &str) -> Result<Self, FqbnError> {
        let err_format = || FqbnError::InvalidFormat {
            fqbn: input.to_string(),
        };

        let fields: Vec<&str> = input.split(':').collect();
        if fields.len() < 3 || fields.len() > 4 {
            return Err(err_format());
        }

        for (name, value) in [
            ("package", fields[0]),
            ("architecture", fields[1]),
            ("board", fields[2]),
        ] {
            if !valid_field().is_match(value) {
                return Err(FqbnError::InvalidField {
                    fqbn: input.to_string(),
                    field: name.to_string(),
                });
            }
        }

        if fields[2].is_empty() {
            return Err(FqbnError::EmptyBoardId {
                fqbn: input.to_string(),
            });
        }

        let mut configs = Properties::new();
        if let Some(options) = fields.get(3) {
            for pair in options.split(',') {
                let invalid = || FqbnError::InvalidConfig {
                    fqbn: input.to_string(),
                    option: pair.to_string(),
                };
                let (key, value) = pair.split_once('=').ok_or_else(invalid)?;
                let (key, value) = (key.trim(), value.trim());
                if key.is_empty() || !valid_field().is_match(key) || !valid_value().is_match(value) {
                    return Err(invalid());
                }
                configs.set(key, value);
            }
        }

        Ok(Self {
            package: fields[0].to_string(),
            architecture: fields[1].to_string(),
            board_id: fields[2].to_string(),
            configs,
        })
    }

    /// `package:architecture:board` without menu selections
    pub fn without_config(&self) -> String {
        format!("{}:{}:{}", self.package, self.architecture, self.board_id)
    }

    /// `true` when the board matches and every selection here is also in `other`
    pub fn matches(&self, other: &Fqbn) -> bool {
        self.without_config() == other.without_config() && other.configs.contains_all(&self.configs)
    }

    /// Copy with the menu selections replaced
    pub fn with_configs(&self, configs: Properties) -> Self {
        Self {
            configs,
            ..self.clone()
        }
    }
}

impl FromStr for Fqbn {
    type Err = FqbnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Fqbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.without_config())?;
        if !self.configs.is_empty() {
            let options: Vec<String> = self.configs.iter().map(|(k, v)| format!("{k}={v}")).collect();
            write!(f, ":{}", options.join(","))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_minimal() {
        let fqbn = Fqbn::parse("arduino:avr:uno").unwrap();
        assert_eq!(fqbn.package, "arduino");
        assert_eq!(fqbn.architecture, "avr");
        assert_eq!(fqbn.board_id, "uno");
        assert!(fqbn.configs.is_empty());
    }

    #[test]
    fn test_parse_with_configs_keeps_order() {
        let fqbn = Fqbn::parse("arduino:avr:nano:cpu=atmega168,speed=57600").unwrap();
        assert_eq!(fqbn.configs.keys().collect::<Vec<_>>(), vec!["cpu", "speed"]);
        assert_eq!(fqbn.configs.get("cpu"), Some("atmega168"));
        assert_eq!(fqbn.to_string(), "arduino:avr:nano:cpu=atmega168,speed=57600");
    }

    #[test]
    fn test_config_value_may_contain_equals() {
        let fqbn = Fqbn::parse("esp:esp32:dev:flags=a=b").unwrap();
        assert_eq!(fqbn.configs.get("flags"), Some("a=b"));
    }

    #[test]
    fn test_wrong_field_count() {
        for input in ["arduino:avr", "arduino", "a:b:c:d=1:e"] {
            match Fqbn::parse(input).unwrap_err() {
                FqbnError::InvalidFormat { .. } => {}
                e => panic!("Expected InvalidFormat error for {input}, got: {e:?}"),
            }
        }
    }

    #[test]
    fn test_empty_board_id() {
        assert!(matches!(
            Fqbn::parse("arduino:avr:").unwrap_err(),
            FqbnError::EmptyBoardId { .. }
        ));
    }

    #[test]
    fn test_invalid_characters() {
        assert!(matches!(
            Fqbn::parse("ard uino:avr:uno").unwrap_err(),
            FqbnError::InvalidField { .. }
        ));
    }

    #[test]
    fn test_invalid_config_entries() {
        for input in ["a:b:c:", "a:b:c:cpu", "a:b:c:=x", "a:b:c:cpu=x y"] {
            assert!(
                matches!(Fqbn::parse(input).unwrap_err(), FqbnError::InvalidConfig { .. }),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn test_matches_subset_of_options() {
        let wanted = Fqbn::parse("arduino:avr:nano:cpu=atmega168").unwrap();
        let actual = Fqbn::parse("arduino:avr:nano:cpu=atmega168,speed=1").unwrap();
        assert!(wanted.matches(&actual));
        assert!(!actual.matches(&wanted));
    }

    // ============================================
    // Property-Based Tests
    // ============================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Any well-formed FQBN renders back to the same string
        #[test]
        fn prop_parse_display_stable(
            package in "[a-z][a-z0-9_-]{0,8}",
            arch in "[a-z][a-z0-9_]{0,8}",
            board in "[a-z][a-z0-9_.]{0,8}",
            options in prop::collection::vec(("[a-z]{1,6}", "[a-z0-9_]{1,6}"), 0..4),
        ) {
            let mut input = format!("{package}:{arch}:{board}");
            let mut seen = std::collections::HashSet::new();
            let options: Vec<_> = options.into_iter().filter(|(k, _)| seen.insert(k.clone())).collect();
            if !options.is_empty() {
                let rendered: Vec<String> = options.iter().map(|(k, v)| format!("{k}={v}")).collect();
                input.push(':');
                input.push_str(&rendered.join(","));
            }
            let fqbn = Fqbn::parse(&input).unwrap();
            prop_assert_eq!(fqbn.to_string(), input);
        }

        /// Strings with too few separators never parse
        #[test]
        fn prop_two_fields_rejected(a in "[a-z]{1,8}", b in "[a-z]{1,8}") {
            let input = format!("{a}:{b}");
            prop_assert!(Fqbn::parse(&input).is_err());
        }
    }
}
