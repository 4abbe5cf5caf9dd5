//! Routes: the recursive rule tree
//!
//! A route vetoes events through its drop rules, dispatches them through
//! its receiver-bound match rules, and gates its child routes on every
//! match rule succeeding. Evaluation is a pure function of the route and
//! the event, so one tree can be shared by any number of concurrent
//! callers without locking.

use crate::registry::ReceiverRegistry;
use crate::rule::Rule;
use crate::types::EnhancedEvent;
use serde::{Deserialize, Serialize};

/// A node of the routing tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Rules that veto the event (and the whole subtree) when any matches
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drop: Vec<Rule>,

    /// Rules that must all match for the children to be visited
    #[serde(default, rename = "match", skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<Rule>,

    /// Child routes, visited in declared order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<Route>,
}

/// Outcome of evaluating one route (not its children) against an event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchResult<'a> {
    /// Whether every match rule succeeded and no drop rule vetoed
    pub matches_all: bool,

    /// Successful match rules that carry a receiver, in declared order
    pub matched: Vec<&'a Rule>,
}

impl MatchResult<'_> {
    /// Whether the route lets the event through to its children
    pub fn passes(&self) -> bool {
        self.matches_all
    }

    /// Whether at least one receiver should get the event
    pub fn has_receivers(&self) -> bool {
        !self.matched.is_empty()
    }
}

impl Route {
    /// Evaluate this route's own drop and match rules
    pub fn find_matched_rules(&self, ev: &EnhancedEvent) -> MatchResult<'_> {
        if self.drop.iter().any(|rule| rule.matches_event(ev)) {
            return MatchResult::default();
        }

        // A failing rule does not stop the scan: receiver-bound successes
        // are still collected.
        let mut result = MatchResult {
            matches_all: true,
            matched: Vec::new(),
        };
        for rule in &self.matches {
            if rule.matches_event(ev) {
                if rule.receiver().is_some() {
                    result.matched.push(rule);
                }
            } else {
                result.matches_all = false;
            }
        }
        result
    }

    /// Dispatch an event through this route and, if it passes, its children
    pub fn process_event(&self, ev: &EnhancedEvent, registry: &dyn ReceiverRegistry) {
        let result = self.find_matched_rules(ev);

        for name in result.matched.iter().filter_map(|rule| rule.receiver()) {
            registry.send_event(name, ev);
        }

        if result.passes() {
            for route in &self.routes {
                route.process_event(ev, registry);
            }
        }
    }

    /// Every receiver name referenced anywhere in this subtree
    pub fn receiver_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.matches.iter().filter_map(Rule::receiver).collect();
        for route in &self.routes {
            names.extend(route.receiver_names());
        }
        names
    }
}
