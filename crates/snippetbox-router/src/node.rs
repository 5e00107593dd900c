//! Radix tree node implementation.
//!
//! Each node owns one path segment. Children are split by kind so the
//! matcher can apply literal > parameter > wildcard precedence without
//! scanning.

use http::Method;

use crate::error::RouteError;
use crate::method_router::MethodRouter;
use crate::params::Params;

/// Type of path segment in the radix tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    /// Literal path segment (e.g. `snippet`, `create`)
    Static,
    /// Named parameter (`:id` or `{id}`)
    Param(String),
    /// Catch-all wildcard (`*filepath`)
    Wildcard(String),
}

/// A node in the radix tree.
#[derive(Debug, Clone)]
pub struct Node<T> {
    /// The path segment this node represents
    pub segment: String,

    /// The kind of segment (static, param, or wildcard)
    pub kind: SegmentKind,

    /// Values for this node, keyed by method (if it's a route endpoint)
    pub methods: Option<MethodRouter<T>>,

    /// Static children, sorted by segment for binary search
    pub static_children: Vec<Node<T>>,

    /// Parameter child (at most one per node)
    pub param_child: Option<Box<Node<T>>>,

    /// Wildcard child (at most one per node, always a leaf)
    pub wildcard_child: Option<Box<Node<T>>>,
}

impl<T> Node<T> {
    fn with_kind(segment: String, kind: SegmentKind) -> Self {
        Self {
            segment,
            kind,
            methods: None,
            static_children: Vec::new(),
            param_child: None,
            wildcard_child: None,
        }
    }

    /// Creates a new static node.
    #[must_use]
    pub fn new_static(segment: impl Into<String>) -> Self {
        Self::with_kind(segment.into(), SegmentKind::Static)
    }

    /// Creates a new parameter node.
    #[must_use]
    pub fn new_param(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::with_kind(format!(":{name}"), SegmentKind::Param(name))
    }

    /// Creates a new wildcard node.
    #[must_use]
    pub fn new_wildcard(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::with_kind(format!("*{name}"), SegmentKind::Wildcard(name))
    }

    /// Creates a root node for the tree.
    #[must_use]
    pub fn root() -> Self {
        Self::new_static("")
    }

    /// Inserts a value for `method` at `pattern`.
    pub fn insert(&mut self, pattern: &str, method: Method, value: T) -> Result<(), RouteError> {
        let segments = parse_pattern(pattern)?;
        let target = self.descend_or_create(pattern, &segments)?;
        let methods = target.methods.get_or_insert_with(MethodRouter::new);
        methods
            .try_insert(method.clone(), value)
            .map_err(|_| RouteError::Duplicate {
                method: method.to_string(),
                pattern: pattern.to_string(),
            })
    }

    /// Walks to the node for `segments`, creating missing children.
    fn descend_or_create(
        &mut self,
        pattern: &str,
        segments: &[(String, SegmentKind)],
    ) -> Result<&mut Node<T>, RouteError> {
        let Some(((segment, kind), remaining)) = segments.split_first() else {
            return Ok(self);
        };

        match kind {
            SegmentKind::Static => {
                let index = match self
                    .static_children
                    .binary_search_by(|c| c.segment.as_str().cmp(segment))
                {
                    Ok(i) => i,
                    Err(i) => {
                        // Keep sorted for binary search
                        self.static_children.insert(i, Node::new_static(segment.clone()));
                        i
                    }
                };
                self.static_children[index].descend_or_create(pattern, remaining)
            }
            SegmentKind::Param(name) => {
                let child = self
                    .param_child
                    .get_or_insert_with(|| Box::new(Node::new_param(name.clone())));
                if let SegmentKind::Param(existing) = &child.kind {
                    if existing != name {
                        return Err(RouteError::ConflictingParam {
                            pattern: pattern.to_string(),
                            existing: existing.clone(),
                            new: name.clone(),
                        });
                    }
                }
                child.descend_or_create(pattern, remaining)
            }
            SegmentKind::Wildcard(name) => {
                if !remaining.is_empty() {
                    return Err(RouteError::WildcardNotLast(pattern.to_string()));
                }
                let child = self
                    .wildcard_child
                    .get_or_insert_with(|| Box::new(Node::new_wildcard(name.clone())));
                if let SegmentKind::Wildcard(existing) = &child.kind {
                    if existing != name {
                        return Err(RouteError::ConflictingParam {
                            pattern: pattern.to_string(),
                            existing: existing.clone(),
                            new: name.clone(),
                        });
                    }
                }
                Ok(child.as_mut())
            }
        }
    }

    /// Matches a path against the tree.
    ///
    /// `accept` decides whether an endpoint node satisfies the caller; the
    /// matcher keeps backtracking until it finds one that does.
    pub fn match_path<F>(&self, path: &str, accept: F) -> Option<(&MethodRouter<T>, Params)>
    where
        F: Fn(&MethodRouter<T>) -> bool,
    {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut params = Params::new();
        let methods = self.match_segments(&segments, &mut params, &accept)?;
        Some((methods, params))
    }

    fn match_segments<'a, F>(
        &'a self,
        segments: &[&str],
        params: &mut Params,
        accept: &F,
    ) -> Option<&'a MethodRouter<T>>
    where
        F: Fn(&MethodRouter<T>) -> bool,
    {
        let Some((&segment, remaining)) = segments.split_first() else {
            return self.methods.as_ref().filter(|m| accept(m));
        };

        let mark = params.len();

        if let Some(child) = self.find_static_child(segment) {
            if let Some(found) = child.match_segments(remaining, params, accept) {
                return Some(found);
            }
            params.truncate(mark);
        }

        if let Some(child) = &self.param_child {
            if let SegmentKind::Param(name) = &child.kind {
                params.push(name.clone(), segment);
                if let Some(found) = child.match_segments(remaining, params, accept) {
                    return Some(found);
                }
                params.truncate(mark);
            }
        }

        if let Some(child) = &self.wildcard_child {
            if let SegmentKind::Wildcard(name) = &child.kind {
                if let Some(methods) = child.methods.as_ref().filter(|m| accept(m)) {
                    params.push(name.clone(), segments.join("/"));
                    return Some(methods);
                }
            }
        }

        None
    }

    /// Finds a static child by segment using binary search.
    fn find_static_child(&self, segment: &str) -> Option<&Node<T>> {
        self.static_children
            .binary_search_by(|c| c.segment.as_str().cmp(segment))
            .ok()
            .map(|i| &self.static_children[i])
    }
}

/// Splits a pattern into typed segments.
fn parse_pattern(pattern: &str) -> Result<Vec<(String, SegmentKind)>, RouteError> {
    pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            let param = s
                .strip_prefix(':')
                .or_else(|| s.strip_prefix('{').and_then(|s| s.strip_suffix('}')));
            let kind = if let Some(name) = param {
                if name.is_empty() {
                    return Err(RouteError::EmptyParamName(pattern.to_string()));
                }
                SegmentKind::Param(name.to_string())
            } else if let Some(name) = s.strip_prefix('*') {
                if name.is_empty() {
                    return Err(RouteError::EmptyParamName(pattern.to_string()));
                }
                SegmentKind::Wildcard(name.to_string())
            } else {
                SegmentKind::Static
            };
            Ok((s.to_string(), kind))
        })
        .collect()
}
