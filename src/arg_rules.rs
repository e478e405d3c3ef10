//! Argument rules and validation.
//!
//! `ArgRules` is the compiled whitelist for one policy variant. Patterns are
//! compiled once when the variant is loaded; validation never touches the
//! raw pattern strings.

use crate::arg_parser::{parse_argv, ArgType};
use crate::error::{ConfigError, Violation};
use crate::policy::VariantSpec;
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// An ordered set of compiled patterns.
///
/// An empty set accepts only the empty string.
#[derive(Debug, Clone, Default)]
pub struct PatternSet(Vec<Regex>);

impl PatternSet {
    fn compile(
        command: &str,
        location: impl Fn() -> String,
        patterns: &[String],
    ) -> Result<Self, ConfigError> {
        patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                    command: command.to_string(),
                    location: location(),
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(PatternSet)
    }

    /// Whether `value` is accepted.
    pub fn matches(&self, value: &str) -> bool {
        if self.0.is_empty() {
            return value.is_empty();
        }
        self.0.iter().any(|re| re.is_match(value))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Compiled argument whitelist for one variant.
///
/// There is no "allow any args" mode: everything not listed is rejected.
#[derive(Debug, Clone, Default)]
pub struct ArgRules {
    /// Flags that must appear at least once (short letter or long name).
    pub(crate) required_flags: Vec<String>,

    /// Value-less single-character flags.
    pub(crate) short_flags: HashSet<char>,

    /// Long flag name -> accepted values.
    pub(crate) long_flags: HashMap<String, PatternSet>,

    /// Accepted positional nouns.
    pub(crate) nouns: PatternSet,
}

impl ArgRules {
    /// Compile the argument section of a variant record.
    ///
    /// # Errors
    ///
    /// - `InvalidShortFlag` if a short flag is not exactly one character
    /// - `InvalidPattern` if any long-flag or noun pattern fails to compile
    pub fn from_spec(spec: &VariantSpec) -> Result<Self, ConfigError> {
        let command = spec.cmd_name.as_str();

        let mut short_flags = HashSet::new();
        for flag in &spec.permitted_short_flags {
            let mut chars = flag.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => {
                    short_flags.insert(c);
                }
                _ => {
                    return Err(ConfigError::InvalidShortFlag {
                        command: command.to_string(),
                        flag: flag.clone(),
                    })
                }
            }
        }

        let mut long_flags = HashMap::new();
        for (name, patterns) in &spec.permitted_long_flags {
            let set = PatternSet::compile(command, || format!("--{name}"), patterns)?;
            long_flags.insert(name.clone(), set);
        }

        let nouns = PatternSet::compile(command, || "nouns".to_string(), &spec.permitted_nouns)?;

        Ok(Self {
            required_flags: spec.required_flags.clone(),
            short_flags,
            long_flags,
            nouns,
        })
    }

    /// Validate an argument list against these rules.
    ///
    /// Tokens are checked strictly left to right and the first rejection is
    /// returned. Required flags are checked once every token has passed.
    pub fn validate(&self, args: &[String]) -> Result<(), Violation> {
        let mut seen: Vec<&str> = Vec::new();

        for token in parse_argv(args) {
            match token? {
                ArgType::Noun(noun) => self.check_noun(noun)?,
                ArgType::Long { name, value } => {
                    seen.push(name);
                    self.check_long(name, value)?;
                }
                ArgType::Short(cluster) => {
                    for (i, flag) in cluster.char_indices() {
                        seen.push(&cluster[i..i + flag.len_utf8()]);
                        self.check_short(flag)?;
                    }
                }
            }
        }

        self.check_required(&seen)
    }

    fn check_short(&self, flag: char) -> Result<(), Violation> {
        if self.short_flags.contains(&flag) {
            Ok(())
        } else {
            Err(Violation::ShortFlagNotPermitted { flag })
        }
    }

    fn check_long(&self, flag: &str, value: &str) -> Result<(), Violation> {
        let patterns = self
            .long_flags
            .get(flag)
            .ok_or_else(|| Violation::LongFlagNotPermitted {
                flag: flag.to_string(),
            })?;

        if patterns.matches(value) {
            Ok(())
        } else {
            Err(Violation::FlagValueNotPermitted {
                flag: flag.to_string(),
                value: value.to_string(),
            })
        }
    }

    fn check_noun(&self, noun: &str) -> Result<(), Violation> {
        if self.nouns.matches(noun) {
            Ok(())
        } else {
            Err(Violation::NounNotPermitted {
                noun: noun.to_string(),
            })
        }
    }

    fn check_required(&self, seen: &[&str]) -> Result<(), Violation> {
        match self
            .required_flags
            .iter()
            .find(|required| !seen.contains(&required.as_str()))
        {
            Some(missing) => Err(Violation::RequiredFlagMissing {
                flag: missing.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn rules(spec: VariantSpec) -> ArgRules {
        ArgRules::from_spec(&spec).unwrap()
    }

    #[test]
    fn test_empty_rules_rejects_everything() {
        let rules = rules(VariantSpec::new("true"));

        assert!(matches!(
            rules.validate(&s(&["-n"])),
            Err(Violation::ShortFlagNotPermitted { flag: 'n' })
        ));
        assert!(matches!(
            rules.validate(&s(&["--all"])),
            Err(Violation::LongFlagNotPermitted { .. })
        ));
        assert!(matches!(
            rules.validate(&s(&["file.txt"])),
            Err(Violation::NounNotPermitted { .. })
        ));

        // Empty argv and the empty noun are fine
        assert!(rules.validate(&[]).is_ok());
        assert!(rules.validate(&s(&[""])).is_ok());
    }

    #[test]
    fn test_nouns() {
        let rules = rules(VariantSpec::new("ip").nouns(&["^addr$", "^neigh$"]));

        assert!(rules.validate(&s(&["addr"])).is_ok());
        assert!(rules.validate(&s(&["neigh"])).is_ok());

        let err = rules.validate(&s(&["route"])).unwrap_err();
        assert_eq!(err.to_string(), "positional not permitted: route");
    }

    #[test]
    fn test_patterns_are_unanchored_unless_written_so() {
        let rules = rules(VariantSpec::new("cat").nouns(&["log"]));

        assert!(rules.validate(&s(&["/var/log/messages"])).is_ok());
        assert!(rules.validate(&s(&["/etc/passwd"])).is_err());
    }

    #[test]
    fn test_long_flag_values() {
        let rules = rules(
            VariantSpec::new("journalctl")
                .long_flag("since", &["^[0-9]{4}-[0-9]{2}-[0-9]{2}$", "^yesterday$"])
                .long_flag("no-pager", &[]),
        );

        assert!(rules.validate(&s(&["--since=2024-01-31"])).is_ok());
        assert!(rules.validate(&s(&["--since=yesterday"])).is_ok());
        assert!(rules.validate(&s(&["--no-pager"])).is_ok());
        assert!(rules.validate(&s(&["--no-pager="])).is_ok());

        assert!(matches!(
            rules.validate(&s(&["--since=tomorrow"])),
            Err(Violation::FlagValueNotPermitted { flag, value })
                if flag == "since" && value == "tomorrow"
        ));
        // Registered with patterns: a missing value must still match one
        assert!(matches!(
            rules.validate(&s(&["--since"])),
            Err(Violation::FlagValueNotPermitted { .. })
        ));
        // Registered without patterns: no value allowed
        assert!(matches!(
            rules.validate(&s(&["--no-pager=yes"])),
            Err(Violation::FlagValueNotPermitted { .. })
        ));
        assert!(matches!(
            rules.validate(&s(&["--until=today"])),
            Err(Violation::LongFlagNotPermitted { flag }) if flag == "until"
        ));
    }

    #[test]
    fn test_short_clusters_expand() {
        let rules = rules(VariantSpec::new("ls").short_flags(&["l", "a"]));

        assert!(rules.validate(&s(&["-l"])).is_ok());
        assert!(rules.validate(&s(&["-la", "-al", "-lll"])).is_ok());
        assert!(matches!(
            rules.validate(&s(&["-lR"])),
            Err(Violation::ShortFlagNotPermitted { flag: 'R' })
        ));
    }

    #[test]
    fn test_short_flag_value_rejected_even_when_permitted() {
        let rules = rules(VariantSpec::new("ls").short_flags(&["f"]).nouns(&[".*"]));

        assert!(matches!(
            rules.validate(&s(&["-f=x"])),
            Err(Violation::ShortFlagValue { .. })
        ));
        // -fFILE is a cluster of flags, not a value
        assert!(matches!(
            rules.validate(&s(&["-fx"])),
            Err(Violation::ShortFlagNotPermitted { flag: 'x' })
        ));
        // -f FILE is a flag and a noun
        assert!(rules.validate(&s(&["-f", "x"])).is_ok());
    }

    #[test]
    fn test_required_flags() {
        let rules = rules(
            VariantSpec::new("journalctl")
                .required(&["u", "since"])
                .short_flags(&["u"])
                .long_flag("since", &[".*"])
                .nouns(&[".*"]),
        );

        assert!(rules.validate(&s(&["-u", "--since=today"])).is_ok());
        assert!(matches!(
            rules.validate(&s(&["--since=today"])),
            Err(Violation::RequiredFlagMissing { flag }) if flag == "u"
        ));
        assert!(matches!(
            rules.validate(&s(&["-u"])),
            Err(Violation::RequiredFlagMissing { flag }) if flag == "since"
        ));
        // A noun spelled like the flag does not count
        assert!(rules.validate(&s(&["u", "since"])).is_err());
    }

    #[test]
    fn test_required_flag_long_form_of_single_letter() {
        let rules = rules(
            VariantSpec::new("tool")
                .required(&["x"])
                .short_flags(&["x"])
                .long_flag("x", &[]),
        );

        assert!(rules.validate(&s(&["-x"])).is_ok());
        assert!(rules.validate(&s(&["--x"])).is_ok());
        assert!(rules.validate(&[]).is_err());
    }

    #[test]
    fn test_first_rejection_wins() {
        let rules = rules(VariantSpec::new("ip").nouns(&["^addr$"]));

        assert!(matches!(
            rules.validate(&s(&["route", "--"])),
            Err(Violation::NounNotPermitted { .. })
        ));
        assert!(matches!(
            rules.validate(&s(&["--", "route"])),
            Err(Violation::BareDoubleDash)
        ));
    }

    #[test]
    fn test_stdin_dash_is_noun() {
        let rules = rules(VariantSpec::new("cat").nouns(&["^-$"]));

        assert!(rules.validate(&s(&["-"])).is_ok());
    }

    #[test]
    fn test_invalid_short_flag_config() {
        let result = ArgRules::from_spec(&VariantSpec::new("ls").short_flags(&["la"]));
        assert!(matches!(result, Err(ConfigError::InvalidShortFlag { .. })));

        let result = ArgRules::from_spec(&VariantSpec::new("ls").short_flags(&[""]));
        assert!(matches!(result, Err(ConfigError::InvalidShortFlag { .. })));
    }

    #[test]
    fn test_invalid_pattern_config() {
        let result = ArgRules::from_spec(&VariantSpec::new("ls").long_flag("color", &["(never"]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidPattern { location, .. }) if location == "--color"
        ));
    }
}
