//! Alert rules and rule-matching strategies.
//!
//! Rules are configuration: loaded at startup into a [`RuleSet`] and
//! immutable at runtime. A [`RuleMatcher`] strategy decides which rules
//! apply to an incoming event; the default [`SubstringMatcher`]
//! reproduces a deliberately loose heuristic (rule name as substring of
//! the event title or category), while [`TagMatcher`] offers a stricter
//! drop-in replacement.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::channels::ChannelKind;
use crate::error::{AlertError, Result};
use crate::types::{AlertEvent, AlertSeverity};

/// Default cooldown between repeated alerts, in minutes.
pub const DEFAULT_COOLDOWN_MINUTES: u64 = 5;

/// Default delay before an unacknowledged alert escalates, in minutes.
pub const DEFAULT_ESCALATION_MINUTES: u64 = 30;

/// A rule that maps matching events to notification channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRule {
    /// Rule name; also the substring used by [`SubstringMatcher`].
    pub name: String,
    /// Events must carry exactly this severity to match.
    pub severity: AlertSeverity,
    /// If non-empty, at least one tag must appear on the event.
    pub tags: BTreeSet<String>,
    /// Channels to notify, in configured order.
    pub channels: Vec<ChannelKind>,
    /// Minimum minutes between repeated alerts for the same key.
    pub cooldown_minutes: u64,
    /// Minutes before an unacknowledged alert is escalated.
    pub escalation_minutes: u64,
    /// Whether this rule participates in matching.
    pub enabled: bool,
}

impl AlertRule {
    /// Creates a new rule builder.
    pub fn builder(name: impl Into<String>, severity: AlertSeverity) -> AlertRuleBuilder {
        AlertRuleBuilder::new(name, severity)
    }
}

/// Builder for [`AlertRule`] instances.
#[derive(Debug)]
pub struct AlertRuleBuilder {
    name: String,
    severity: AlertSeverity,
    tags: BTreeSet<String>,
    channels: Vec<ChannelKind>,
    cooldown_minutes: u64,
    escalation_minutes: u64,
    enabled: bool,
}

impl AlertRuleBuilder {
    fn new(name: impl Into<String>, severity: AlertSeverity) -> Self {
        Self {
            name: name.into(),
            severity,
            tags: BTreeSet::new(),
            channels: Vec::new(),
            cooldown_minutes: DEFAULT_COOLDOWN_MINUTES,
            escalation_minutes: DEFAULT_ESCALATION_MINUTES,
            enabled: true,
        }
    }

    /// Adds a tag requirement.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Adds a notification channel.
    #[must_use]
    pub fn channel(mut self, kind: ChannelKind) -> Self {
        self.channels.push(kind);
        self
    }

    /// Sets the cooldown in minutes.
    #[must_use]
    pub const fn cooldown_minutes(mut self, minutes: u64) -> Self {
        self.cooldown_minutes = minutes;
        self
    }

    /// Sets the escalation delay in minutes.
    #[must_use]
    pub const fn escalation_minutes(mut self, minutes: u64) -> Self {
        self.escalation_minutes = minutes;
        self
    }

    /// Sets whether the rule is enabled.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Builds the [`AlertRule`].
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidRule` if the name is empty or no
    /// channel is configured.
    pub fn build(self) -> Result<AlertRule> {
        if self.name.is_empty() {
            return Err(AlertError::InvalidRule {
                reason: "rule name cannot be empty".to_string(),
            });
        }
        if self.channels.is_empty() {
            return Err(AlertError::InvalidRule {
                reason: format!("rule '{}' has no channels", self.name),
            });
        }

        Ok(AlertRule {
            name: self.name,
            severity: self.severity,
            tags: self.tags,
            channels: self.channels,
            cooldown_minutes: self.cooldown_minutes,
            escalation_minutes: self.escalation_minutes,
            enabled: self.enabled,
        })
    }
}

/// Strategy deciding whether a rule applies to an event.
///
/// Swapping the strategy changes matching semantics without touching
/// the dispatcher.
pub trait RuleMatcher: Send + Sync + std::fmt::Debug {
    /// Returns true if `rule` applies to `event`.
    fn matches(&self, rule: &AlertRule, event: &AlertEvent) -> bool;
}

/// The default, intentionally loose matcher.
///
/// A rule matches when it is enabled, its severity equals the event's,
/// its tags (if any) intersect the event's tags, and its name is a
/// case-insensitive substring of the event category or title.
///
/// Known limitation: substring matching on the title means long titles
/// can produce false positives (a rule named "api" matches any title
/// containing "api"). This is preserved deliberately for compatibility;
/// use [`TagMatcher`] where precision matters.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatcher;

impl RuleMatcher for SubstringMatcher {
    fn matches(&self, rule: &AlertRule, event: &AlertEvent) -> bool {
        if !rule.enabled || rule.severity != event.severity {
            return false;
        }

        if !rule.tags.is_empty() && rule.tags.is_disjoint(&event.tags) {
            return false;
        }

        let name = rule.name.to_lowercase();
        event.category.to_lowercase().contains(&name)
            || event.title.to_lowercase().contains(&name)
    }
}

/// A strict matcher: requires a tag intersection and an exact
/// (case-insensitive) category match.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagMatcher;

impl RuleMatcher for TagMatcher {
    fn matches(&self, rule: &AlertRule, event: &AlertEvent) -> bool {
        if !rule.enabled || rule.severity != event.severity {
            return false;
        }

        if rule.tags.is_empty() || rule.tags.is_disjoint(&event.tags) {
            return false;
        }

        rule.name.eq_ignore_ascii_case(&event.category)
    }
}

/// An ordered, immutable collection of rules loaded at startup.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<AlertRule>,
}

impl RuleSet {
    /// Creates a rule set from a list of rules.
    #[must_use]
    pub fn new(rules: Vec<AlertRule>) -> Self {
        Self { rules }
    }

    /// Returns all rules.
    #[must_use]
    pub fn rules(&self) -> &[AlertRule] {
        &self.rules
    }

    /// Returns the number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if the set holds no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns the rules matching `event` under `matcher`, in order.
    #[must_use]
    pub fn matching<'a>(
        &'a self,
        matcher: &dyn RuleMatcher,
        event: &AlertEvent,
    ) -> Vec<&'a AlertRule> {
        self.rules
            .iter()
            .filter(|rule| matcher.matches(rule, event))
            .collect()
    }

    /// Minimum cooldown among `matched`, or the default when empty.
    #[must_use]
    pub fn min_cooldown_minutes(matched: &[&AlertRule]) -> u64 {
        matched
            .iter()
            .map(|r| r.cooldown_minutes)
            .min()
            .unwrap_or(DEFAULT_COOLDOWN_MINUTES)
    }

    /// Minimum escalation delay among `matched`, or the default when empty.
    #[must_use]
    pub fn min_escalation_minutes(matched: &[&AlertRule]) -> u64 {
        matched
            .iter()
            .map(|r| r.escalation_minutes)
            .min()
            .unwrap_or(DEFAULT_ESCALATION_MINUTES)
    }

    /// The ordered union of channels across `matched` (first
    /// occurrence wins, duplicates removed).
    #[must_use]
    pub fn channel_union(matched: &[&AlertRule]) -> Vec<ChannelKind> {
        let mut seen = BTreeSet::new();
        let mut union = Vec::new();
        for rule in matched {
            for kind in &rule.channels {
                if seen.insert(*kind) {
                    union.push(*kind);
                }
            }
        }
        union
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str, severity: AlertSeverity) -> AlertRule {
        AlertRule::builder(name, severity)
            .channel(ChannelKind::Email)
            .build()
            .unwrap()
    }

    fn event(title: &str, severity: AlertSeverity, category: &str) -> AlertEvent {
        AlertEvent::new(title, severity, "test", category)
    }

    mod builder_tests {
        use super::*;

        #[test]
        fn builds_with_defaults() {
            let rule = AlertRule::builder("api", AlertSeverity::Critical)
                .channel(ChannelKind::Pager)
                .build()
                .unwrap();

            assert_eq!(rule.cooldown_minutes, DEFAULT_COOLDOWN_MINUTES);
            assert_eq!(rule.escalation_minutes, DEFAULT_ESCALATION_MINUTES);
            assert!(rule.enabled);
        }

        #[test]
        fn empty_name_fails() {
            let result = AlertRule::builder("", AlertSeverity::Warning)
                .channel(ChannelKind::Email)
                .build();
            assert!(matches!(result, Err(AlertError::InvalidRule { .. })));
        }

        #[test]
        fn no_channels_fails() {
            let result = AlertRule::builder("api", AlertSeverity::Warning).build();
            assert!(matches!(result, Err(AlertError::InvalidRule { .. })));
        }

        #[test]
        fn builder_sets_all_fields() {
            let rule = AlertRule::builder("db", AlertSeverity::Critical)
                .tag("database")
                .channel(ChannelKind::Pager)
                .channel(ChannelKind::Sms)
                .cooldown_minutes(10)
                .escalation_minutes(15)
                .enabled(false)
                .build()
                .unwrap();

            assert!(rule.tags.contains("database"));
            assert_eq!(rule.channels, vec![ChannelKind::Pager, ChannelKind::Sms]);
            assert_eq!(rule.cooldown_minutes, 10);
            assert_eq!(rule.escalation_minutes, 15);
            assert!(!rule.enabled);
        }
    }

    mod substring_matcher_tests {
        use super::*;
        use test_case::test_case;

        #[test_case("api", "api", true; "exact category")]
        #[test_case("api", "api-gateway", true; "category substring")]
        #[test_case("API", "api-gateway", true; "case insensitive")]
        #[test_case("db", "api", false; "no overlap")]
        fn category_matching(rule_name: &str, category: &str, expected: bool) {
            let matcher = SubstringMatcher;
            let r = rule(rule_name, AlertSeverity::Warning);
            let e = event("unrelated title", AlertSeverity::Warning, category);
            assert_eq!(matcher.matches(&r, &e), expected);
        }

        #[test]
        fn matches_against_title_too() {
            let matcher = SubstringMatcher;
            let r = rule("latency", AlertSeverity::Warning);
            let e = event("High latency detected", AlertSeverity::Warning, "perf");
            assert!(matcher.matches(&r, &e));
        }

        #[test]
        fn severity_must_be_equal() {
            let matcher = SubstringMatcher;
            let r = rule("api", AlertSeverity::Critical);
            let e = event("api down", AlertSeverity::Warning, "api");
            assert!(!matcher.matches(&r, &e));
        }

        #[test]
        fn disabled_rule_never_matches() {
            let matcher = SubstringMatcher;
            let r = AlertRule::builder("api", AlertSeverity::Warning)
                .channel(ChannelKind::Email)
                .enabled(false)
                .build()
                .unwrap();
            let e = event("api down", AlertSeverity::Warning, "api");
            assert!(!matcher.matches(&r, &e));
        }

        #[test]
        fn rule_tags_gate_when_present() {
            let matcher = SubstringMatcher;
            let r = AlertRule::builder("api", AlertSeverity::Warning)
                .tag("uptime")
                .channel(ChannelKind::Email)
                .build()
                .unwrap();

            let untagged = event("api down", AlertSeverity::Warning, "api");
            assert!(!matcher.matches(&r, &untagged));

            let tagged = event("api down", AlertSeverity::Warning, "api").with_tag("uptime");
            assert!(matcher.matches(&r, &tagged));
        }

        #[test]
        fn empty_rule_tags_match_any_event() {
            let matcher = SubstringMatcher;
            let r = rule("api", AlertSeverity::Warning);
            let e = event("x", AlertSeverity::Warning, "api").with_tag("whatever");
            assert!(matcher.matches(&r, &e));
        }

        #[test]
        fn loose_matching_false_positive_is_documented_behavior() {
            // a rule named "up" matches any title containing "up"
            let matcher = SubstringMatcher;
            let r = rule("up", AlertSeverity::Warning);
            let e = event("Backup completed with warnings", AlertSeverity::Warning, "jobs");
            assert!(matcher.matches(&r, &e));
        }
    }

    mod tag_matcher_tests {
        use super::*;

        #[test]
        fn requires_tags_and_exact_category() {
            let matcher = TagMatcher;
            let r = AlertRule::builder("api", AlertSeverity::Warning)
                .tag("uptime")
                .channel(ChannelKind::Email)
                .build()
                .unwrap();

            let exact = event("anything", AlertSeverity::Warning, "API").with_tag("uptime");
            assert!(matcher.matches(&r, &exact));

            let substring_only =
                event("anything", AlertSeverity::Warning, "api-gateway").with_tag("uptime");
            assert!(!matcher.matches(&r, &substring_only));
        }

        #[test]
        fn untagged_rule_never_matches() {
            let matcher = TagMatcher;
            let r = rule("api", AlertSeverity::Warning);
            let e = event("anything", AlertSeverity::Warning, "api").with_tag("uptime");
            assert!(!matcher.matches(&r, &e));
        }
    }

    mod ruleset_tests {
        use super::*;

        fn three_rules() -> RuleSet {
            RuleSet::new(vec![
                AlertRule::builder("api", AlertSeverity::Critical)
                    .channel(ChannelKind::Pager)
                    .channel(ChannelKind::Email)
                    .cooldown_minutes(10)
                    .escalation_minutes(20)
                    .build()
                    .unwrap(),
                AlertRule::builder("api-gateway", AlertSeverity::Critical)
                    .channel(ChannelKind::Email)
                    .channel(ChannelKind::Chat)
                    .cooldown_minutes(5)
                    .escalation_minutes(45)
                    .build()
                    .unwrap(),
                AlertRule::builder("db", AlertSeverity::Warning)
                    .channel(ChannelKind::Chat)
                    .build()
                    .unwrap(),
            ])
        }

        #[test]
        fn matching_respects_order() {
            let set = three_rules();
            let e = event("down", AlertSeverity::Critical, "api-gateway");
            let matched = set.matching(&SubstringMatcher, &e);

            // "api" is a substring of "api-gateway" so both critical rules match
            assert_eq!(matched.len(), 2);
            assert_eq!(matched[0].name, "api");
            assert_eq!(matched[1].name, "api-gateway");
        }

        #[test]
        fn min_cooldown_and_escalation() {
            let set = three_rules();
            let e = event("down", AlertSeverity::Critical, "api-gateway");
            let matched = set.matching(&SubstringMatcher, &e);

            assert_eq!(RuleSet::min_cooldown_minutes(&matched), 5);
            assert_eq!(RuleSet::min_escalation_minutes(&matched), 20);
        }

        #[test]
        fn defaults_when_nothing_matched() {
            assert_eq!(
                RuleSet::min_cooldown_minutes(&[]),
                DEFAULT_COOLDOWN_MINUTES
            );
            assert_eq!(
                RuleSet::min_escalation_minutes(&[]),
                DEFAULT_ESCALATION_MINUTES
            );
        }

        #[test]
        fn channel_union_dedupes_preserving_order() {
            let set = three_rules();
            let e = event("down", AlertSeverity::Critical, "api-gateway");
            let matched = set.matching(&SubstringMatcher, &e);

            let union = RuleSet::channel_union(&matched);
            assert_eq!(
                union,
                vec![ChannelKind::Pager, ChannelKind::Email, ChannelKind::Chat]
            );
        }

        #[test]
        fn no_match_returns_empty() {
            let set = three_rules();
            let e = event("nothing relevant", AlertSeverity::Info, "misc");
            assert!(set.matching(&SubstringMatcher, &e).is_empty());
        }
    }
}
