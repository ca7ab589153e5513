//! REST route table: pattern matching with captured path variables.

use crate::registry::Procedure;
use hyper::Method;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(String),
}

/// A registered REST procedure. Identical patterns may coexist when
/// their method sets differ; matching walks routes in registration
/// order and takes the first hit.
pub struct RestRoute {
    pub pattern: String,
    pub methods: Vec<Method>,
    segments: Vec<Segment>,
    pub(crate) procedure: Procedure,
}

impl RestRoute {
    /// Parses a pattern of `/`-separated literal and `{var}` segments.
    /// An empty variable name is a programmer error and aborts the
    /// process.
    pub(crate) fn parse(pattern: &str, methods: Vec<Method>, procedure: Procedure) -> RestRoute {
        let segments = pattern
            .trim_matches('/')
            .split('/')
            .map(|part| {
                if let Some(name) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                    if name.is_empty() {
                        panic!("rest pattern {pattern:?} has a variable with no name");
                    }
                    Segment::Variable(name.to_string())
                } else {
                    Segment::Literal(part.to_string())
                }
            })
            .collect();
        RestRoute {
            pattern: pattern.to_string(),
            methods,
            segments,
            procedure,
        }
    }

    /// Matches a path already stripped of its `/rest/` prefix, yielding
    /// the captured variables on success.
    pub(crate) fn matches(&self, path: &str, method: &Method) -> Option<BTreeMap<String, String>> {
        if !self.methods.is_empty() && !self.methods.contains(method) {
            return None;
        }
        let parts: Vec<&str> = path.trim_matches('/').split('/').collect();
        if parts.len() != self.segments.len() {
            return None;
        }
        let mut vars = BTreeMap::new();
        for (segment, part) in self.segments.iter().zip(&parts) {
            match segment {
                Segment::Literal(literal) => {
                    if literal != part {
                        return None;
                    }
                }
                Segment::Variable(name) => {
                    vars.insert(name.clone(), (*part).to_string());
                }
            }
        }
        Some(vars)
    }
}
