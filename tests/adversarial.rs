//! Adversarial tests for remote_exec.
//!
//! These tests attempt to slip arguments past the policy grammar or to probe
//! the authorization provider. All tests should demonstrate that the attempt
//! is properly blocked.

use async_trait::async_trait;
use remote_exec::{
    AuthorizationRequest, Authorizer, AuthzError, Decision, Identity, Matcher, PolicyVariant,
    Registry, ResolveError, VariantSpec, Violation,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// =============================================================================
// Test Helpers
// =============================================================================

fn s(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

fn journalctl() -> PolicyVariant {
    VariantSpec::new("journalctl")
        .required(&["unit"])
        .short_flags(&["f", "q"])
        .long_flag("unit", &[r"^[a-z0-9@._-]+\.service$"])
        .long_flag("no-pager", &[])
        .compile()
        .expect("valid policy")
}

fn ip() -> PolicyVariant {
    VariantSpec::new("ip")
        .nouns(&["^addr$", "^neigh$"])
        .compile()
        .expect("valid policy")
}

/// Approves everything and counts how often it was asked.
#[derive(Default)]
struct Counting(AtomicUsize);

#[async_trait]
impl Authorizer for Counting {
    async fn authorize(
        &self,
        _identity: &Identity,
        _request: &AuthorizationRequest,
    ) -> Result<Decision, AuthzError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(Decision::Allowed)
    }
}

// =============================================================================
// DOUBLE DASH AND MALFORMED FLAGS
// =============================================================================

#[test]
fn test_bare_double_dash_rejected() {
    // Attack: end option parsing so a later "-rf" becomes a positional
    let result = ip().validate(&s(&["addr", "--", "neigh"]));
    assert_eq!(result, Err(Violation::BareDoubleDash));
}

#[test]
fn test_triple_dash_rejected() {
    let result = journalctl().validate(&s(&["---unit=x.service"]));
    assert!(matches!(result, Err(Violation::MalformedFlag { .. })));
}

#[test]
fn test_empty_long_flag_name_rejected() {
    let result = journalctl().validate(&s(&["--=ssh.service", "--unit=ssh.service"]));
    assert!(matches!(result, Err(Violation::MalformedFlag { arg }) if arg == "--=ssh.service"));
}

#[test]
fn test_short_flag_with_value_rejected() {
    // Attack: sneak a value through a value-less short flag
    let result = journalctl().validate(&s(&["--unit=ssh.service", "-f=/etc/shadow"]));
    assert!(matches!(result, Err(Violation::ShortFlagValue { .. })));

    // '=' anywhere in the cluster counts
    let result = journalctl().validate(&s(&["--unit=ssh.service", "-fq=1"]));
    assert!(matches!(result, Err(Violation::ShortFlagValue { .. })));
}

#[test]
fn test_unlisted_char_in_short_cluster_rejected() {
    // Attack: hide a forbidden flag inside a cluster of permitted ones
    let result = journalctl().validate(&s(&["--unit=ssh.service", "-fqD"]));
    assert_eq!(result, Err(Violation::ShortFlagNotPermitted { flag: 'D' }));
}

#[test]
fn test_unicode_short_flag_rejected() {
    // A multibyte char must be one flag, never split into bytes
    let result = journalctl().validate(&s(&["--unit=ssh.service", "-fé"]));
    assert_eq!(result, Err(Violation::ShortFlagNotPermitted { flag: 'é' }));
}

// =============================================================================
// FLAG VALUE ATTACKS
// =============================================================================

#[test]
fn test_value_on_value_less_long_flag_rejected() {
    // Empty pattern list: only the bare flag is allowed
    let result = journalctl().validate(&s(&["--unit=ssh.service", "--no-pager=cat"]));
    assert!(matches!(
        result,
        Err(Violation::FlagValueNotPermitted { flag, value }) if flag == "no-pager" && value == "cat"
    ));
}

#[test]
fn test_value_with_embedded_equals_kept_whole() {
    // Only the first '=' splits; the rest belongs to the value
    let result = journalctl().validate(&s(&["--unit=ssh.service=x"]));
    assert!(matches!(
        result,
        Err(Violation::FlagValueNotPermitted { value, .. }) if value == "ssh.service=x"
    ));
}

#[test]
fn test_path_traversal_in_flag_value() {
    let result = journalctl().validate(&s(&["--unit=../../etc/passwd"]));
    assert!(matches!(result, Err(Violation::FlagValueNotPermitted { .. })));
}

#[test]
fn test_newline_in_flag_value() {
    // '$' in the default regex syntax only matches at the very end
    let result = journalctl().validate(&s(&["--unit=ssh.service\n--since=1970"]));
    assert!(matches!(result, Err(Violation::FlagValueNotPermitted { .. })));
}

#[test]
fn test_unknown_long_flag_rejected() {
    let result = journalctl().validate(&s(&["--unit=ssh.service", "--output-fields=MESSAGE"]));
    assert!(matches!(
        result,
        Err(Violation::LongFlagNotPermitted { flag }) if flag == "output-fields"
    ));
}

// =============================================================================
// POSITIONAL ATTACKS
// =============================================================================

#[test]
fn test_shell_metacharacters_in_noun() {
    let variant = ip();
    for noun in ["addr; rm -rf /", "addr && id", "$(id)", "`id`", "addr|sh", "addr\n"] {
        let result = variant.validate(&s(&[noun]));
        assert!(
            matches!(result, Err(Violation::NounNotPermitted { .. })),
            "{noun:?} should be rejected"
        );
    }
}

#[test]
fn test_null_byte_in_noun() {
    let result = ip().validate(&s(&["addr\0route"]));
    assert!(matches!(result, Err(Violation::NounNotPermitted { .. })));
}

#[test]
fn test_single_dash_is_a_noun() {
    // "-" (stdin) is a positional, not an empty short cluster
    let result = ip().validate(&s(&["-"]));
    assert!(matches!(result, Err(Violation::NounNotPermitted { noun }) if noun == "-"));
}

#[test]
fn test_no_positionals_when_none_listed() {
    let result = journalctl().validate(&s(&["--unit=ssh.service", "/var/log"]));
    assert!(matches!(result, Err(Violation::NounNotPermitted { .. })));
}

#[test]
fn test_unanchored_pattern_is_substring_match() {
    // Patterns are used as written; operators must anchor them
    let loose = VariantSpec::new("ip").nouns(&["addr"]).compile().unwrap();
    assert!(loose.validate(&s(&["addr; reboot"])).is_ok());
    assert!(ip().validate(&s(&["addr; reboot"])).is_err());
}

// =============================================================================
// REQUIRED FLAG BYPASS
// =============================================================================

#[test]
fn test_required_flag_missing() {
    let result = journalctl().validate(&s(&["-f"]));
    assert!(matches!(
        result,
        Err(Violation::RequiredFlagMissing { flag }) if flag == "unit"
    ));
}

#[test]
fn test_required_flag_not_satisfied_by_noun() {
    let variant = VariantSpec::new("journalctl")
        .required(&["unit"])
        .long_flag("unit", &["^.*$"])
        .nouns(&["^.*$"])
        .compile()
        .unwrap();

    // The word "unit" or "--unit" smuggled as a value doesn't count
    assert!(variant.validate(&s(&["unit"])).is_err());
    assert!(variant.validate(&s(&["--unit"])).is_ok());
}

#[test]
fn test_required_short_flag_satisfied_in_cluster() {
    let variant = VariantSpec::new("tail")
        .required(&["n"])
        .short_flags(&["f", "n"])
        .compile()
        .unwrap();
    assert!(variant.validate(&s(&["-fn"])).is_ok());
    assert!(variant.validate(&s(&["-f"])).is_err());
}

#[test]
fn test_earliest_violation_wins() {
    // The bad token comes first, so its violation is reported rather than
    // the missing required flag.
    let result = journalctl().validate(&s(&["-x", "--", "--unit=ssh.service"]));
    assert_eq!(result, Err(Violation::ShortFlagNotPermitted { flag: 'x' }));
}

// =============================================================================
// AUTHORIZATION PROBING
// =============================================================================

fn probing_matcher(authz: Arc<Counting>) -> Matcher {
    let registry = Registry::from_variants(vec![journalctl(), ip()]).unwrap();
    Matcher::new(Arc::new(registry), authz)
}

#[tokio::test]
async fn test_malformed_args_never_reach_authorizer() {
    let authz = Arc::new(Counting::default());
    let matcher = probing_matcher(authz.clone());
    let identity = Identity::new("mallory");

    for args in [
        s(&["--"]),
        s(&["---x"]),
        s(&["-f=1"]),
        s(&["route"]),
        s(&["--unit=ssh.service", "--output=json"]),
    ] {
        let result = matcher.resolve("journalctl", &args, &identity).await;
        assert!(matches!(result, Err(ResolveError::NoMatchingVariant { .. })));
        let result = matcher.resolve("ip", &args, &identity).await;
        assert!(matches!(result, Err(ResolveError::NoMatchingVariant { .. })));
    }

    assert_eq!(authz.0.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_refusal_message_does_not_leak_rules() {
    let matcher = probing_matcher(Arc::new(Counting::default()));

    let err = matcher
        .resolve("ip", &s(&["route"]), &Identity::new("mallory"))
        .await
        .unwrap_err();

    let message = err.to_string();
    assert_eq!(message, "didn't find a command the user could execute");
    assert!(!message.contains("addr"));
}

#[tokio::test]
async fn test_command_names_are_exact() {
    let matcher = probing_matcher(Arc::new(Counting::default()));
    let identity = Identity::new("mallory");

    for command in ["/sbin/ip", "IP", "ip ", "ip\0", "../ip"] {
        let result = matcher.resolve(command, &s(&["addr"]), &identity).await;
        assert!(
            matches!(result, Err(ResolveError::CommandNotFound { .. })),
            "{command:?} should not resolve"
        );
    }
}
