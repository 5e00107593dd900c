//! Parsed template tree.

use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Text(String),
    /// HTML-escaped output of a pipeline.
    Output(Pipeline),
    If {
        cond: Pipeline,
        then_nodes: Vec<Node>,
        else_nodes: Vec<Node>,
    },
    Range {
        source: Pipeline,
        body: Vec<Node>,
        else_nodes: Vec<Node>,
    },
    With {
        value: Pipeline,
        body: Vec<Node>,
        else_nodes: Vec<Node>,
    },
    /// `{{template "name" arg}}`
    Include {
        name: String,
        arg: Option<Pipeline>,
    },
}

/// Commands separated by `|`. Each command after the first is a function
/// call that receives the previous result as its last argument.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Pipeline {
    pub(crate) commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    Operand(Operand),
    Call { func: &'static str, args: Vec<Operand> },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Operand {
    /// `.`
    Dot,
    /// `.a.b`, relative to dot.
    Field(Vec<String>),
    /// `$` or `$.a.b`, relative to the data passed to the page.
    Root(Vec<String>),
    Str(String),
    Int(i64),
    Bool(bool),
}

/// A named template body, shared between every page set that includes it.
pub(crate) type Body = Arc<[Node]>;

/// Calls `visit` with the name of every `{{template}}` reference in `nodes`.
pub(crate) fn walk_includes<'a>(nodes: &'a [Node], visit: &mut impl FnMut(&'a str)) {
    for node in nodes {
        match node {
            Node::Include { name, .. } => visit(name),
            Node::If {
                then_nodes: body,
                else_nodes,
                ..
            }
            | Node::Range {
                body, else_nodes, ..
            }
            | Node::With {
                body, else_nodes, ..
            } => {
                walk_includes(body, visit);
                walk_includes(else_nodes, visit);
            }
            Node::Text(_) | Node::Output(_) => {}
        }
    }
}
