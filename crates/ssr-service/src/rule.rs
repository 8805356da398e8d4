//! Rule gate (`SPEC_FULL.md` §4.10): the rule-matching policy engine is an
//! external collaborator per `spec.md` §1, but its decision *interface*
//! and the compiled-rule matcher itself are in scope.
//!
//! Grounded on `examples/original_source/service/rule.go`
//! (`RuleService.judge`, modes `all`/`allow`/`reject`, rule types
//! `reg`/`domain`/`ip`, and the per-lookup LRU cache). The network fetch
//! (`client.GetNodeRule`) and trigger-report POST are left to a
//! `RuleSource` trait with no HTTP backend — out of scope.

use std::sync::Mutex;
use std::time::Duration;

use lru_time_cache::LruCache;
use regex::Regex;

pub trait RuleGate: Send + Sync {
    fn allow(&self, host: &str, port: u16) -> bool;
}

/// Default gate: every destination is allowed. Used when no rule set has
/// been loaded yet, matching the Go original's `RuleModeAll` default.
pub struct AllowAllGate;

impl RuleGate for AllowAllGate {
    fn allow(&self, _host: &str, _port: u16) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleMode {
    Allow,
    Reject,
    All,
}

enum CompiledRule {
    Regex(Regex),
    Exact(String),
}

pub struct RuleItem {
    pub pattern: String,
    pub is_regex: bool,
}

struct CompiledRuleEntry {
    rule: CompiledRule,
}

/// A compiled rule set plus a short-lived decision cache, mirroring the
/// Go original's 5-second LRU (`cache.NewLruCache(5 * time.Second)`).
pub struct StaticRuleGate {
    mode: RuleMode,
    rules: Vec<CompiledRuleEntry>,
    cache: Mutex<LruCache<String, bool>>,
}

impl StaticRuleGate {
    pub fn new(mode: RuleMode, items: Vec<RuleItem>) -> StaticRuleGate {
        let rules = items
            .into_iter()
            .filter_map(|item| {
                if item.is_regex {
                    Regex::new(&item.pattern).ok().map(|re| CompiledRuleEntry { rule: CompiledRule::Regex(re) })
                } else {
                    Some(CompiledRuleEntry { rule: CompiledRule::Exact(item.pattern) })
                }
            })
            .collect();

        StaticRuleGate {
            mode,
            rules,
            cache: Mutex::new(LruCache::with_expiry_duration(Duration::from_secs(5))),
        }
    }

    fn judge(&self, host: &str) -> bool {
        if self.mode == RuleMode::All {
            return true;
        }

        for entry in &self.rules {
            let matched = match &entry.rule {
                CompiledRule::Regex(re) => re.is_match(host),
                CompiledRule::Exact(pattern) => pattern == host,
            };
            if !matched {
                continue;
            }
            match self.mode {
                RuleMode::Allow => return true,
                RuleMode::Reject => return false,
                RuleMode::All => unreachable!(),
            }
        }

        self.mode == RuleMode::Reject
    }
}

impl RuleGate for StaticRuleGate {
    fn allow(&self, host: &str, port: u16) -> bool {
        let cache_key = format!("{host}:{port}");
        {
            let mut cache = self.cache.lock().unwrap();
            if let Some(decision) = cache.get(&cache_key) {
                return *decision;
            }
        }

        let decision = self.judge(host);
        self.cache.lock().unwrap().insert(cache_key, decision);
        decision
    }
}
