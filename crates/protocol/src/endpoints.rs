//! Static eligibility rules for local hub routing.
//!
//! A request may only be attempted against the local hub when its path
//! and method match one of the rules below. The rule set is closed:
//! anything unmatched is remote-only.

use crate::types::Method;

/// One path segment of an endpoint pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    /// Must equal this literal.
    Literal(&'static str),
    /// Matches any single non-empty segment.
    Any,
}

use Segment::{Any, Literal};

/// An endpoint family served by the hub, with its allowed methods.
#[derive(Debug)]
struct EndpointRule {
    pattern: &'static [Segment],
    methods: &'static [Method],
}

impl EndpointRule {
    fn matches(&self, path: &str, method: Method) -> bool {
        if !self.methods.contains(&method) {
            return false;
        }
        let mut segments = path.strip_prefix('/').unwrap_or(path).split('/');
        for expected in self.pattern {
            let Some(actual) = segments.next() else {
                return false;
            };
            match expected {
                Literal(lit) => {
                    if actual != *lit {
                        return false;
                    }
                }
                Any => {
                    if actual.is_empty() {
                        return false;
                    }
                }
            }
        }
        segments.next().is_none()
    }
}

/// Endpoint families the hub can serve without reaching the cloud.
static LOCAL_ENDPOINTS: &[EndpointRule] = &[
    // Thng listing and single reads.
    EndpointRule {
        pattern: &[Literal("thngs")],
        methods: &[Method::Get],
    },
    EndpointRule {
        pattern: &[Literal("thngs"), Any],
        methods: &[Method::Get],
    },
    // Thng properties.
    EndpointRule {
        pattern: &[Literal("thngs"), Any, Literal("properties")],
        methods: &[Method::Post, Method::Get, Method::Put],
    },
    EndpointRule {
        pattern: &[Literal("thngs"), Any, Literal("properties"), Any],
        methods: &[Method::Get, Method::Put],
    },
    // Thng actions.
    EndpointRule {
        pattern: &[Literal("thngs"), Any, Literal("actions"), Any],
        methods: &[Method::Post, Method::Get],
    },
    EndpointRule {
        pattern: &[Literal("thngs"), Any, Literal("actions"), Any, Any],
        methods: &[Method::Get],
    },
    // Collections.
    EndpointRule {
        pattern: &[Literal("collections")],
        methods: &[Method::Get],
    },
    EndpointRule {
        pattern: &[Literal("collections"), Any],
        methods: &[Method::Get],
    },
    EndpointRule {
        pattern: &[Literal("collections"), Any, Literal("thngs")],
        methods: &[Method::Get],
    },
    // Collection actions.
    EndpointRule {
        pattern: &[Literal("collections"), Any, Literal("actions"), Any],
        methods: &[Method::Post, Method::Get],
    },
    EndpointRule {
        pattern: &[Literal("collections"), Any, Literal("actions"), Any, Any],
        methods: &[Method::Get],
    },
    // Action type catalogue.
    EndpointRule {
        pattern: &[Literal("actions")],
        methods: &[Method::Get],
    },
];

/// Returns true if `path` + `method` can be served by the local hub.
///
/// Any query string on `path` is stripped before matching. Pure and
/// deterministic; unmatched input returns false.
pub fn is_local_eligible(path: &str, method: Method) -> bool {
    let path = match path.find('?') {
        Some(idx) => &path[..idx],
        None => path,
    };
    LOCAL_ENDPOINTS
        .iter()
        .any(|rule| rule.matches(path, method))
}
