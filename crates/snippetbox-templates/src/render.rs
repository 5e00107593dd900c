//! Template execution.

use std::borrow::Cow;
use std::collections::HashMap;

use serde_json::Value;

use crate::ast::{Body, Command, Node, Operand, Pipeline};
use crate::error::RenderError;
use crate::helpers::{call, escape_html_into, is_truthy, kind, stringify};

/// Limit on nested `{{template}}` calls.
pub const MAX_DEPTH: usize = 100;

pub(crate) struct Exec<'r> {
    pub(crate) templates: &'r HashMap<String, Body>,
    pub(crate) root: &'r Value,
}

impl Exec<'_> {
    pub(crate) fn run_template(
        &self,
        name: &str,
        dot: &Value,
        depth: usize,
        out: &mut String,
    ) -> Result<(), RenderError> {
        if depth >= MAX_DEPTH {
            return Err(RenderError::DepthExceeded(MAX_DEPTH));
        }
        let body = self
            .templates
            .get(name)
            .ok_or_else(|| RenderError::UndefinedTemplate(name.to_string()))?;
        self.exec(body, dot, depth, out)
    }

    fn exec(
        &self,
        nodes: &[Node],
        dot: &Value,
        depth: usize,
        out: &mut String,
    ) -> Result<(), RenderError> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Output(pipeline) => {
                    let value = self.eval(pipeline, dot)?;
                    escape_html_into(out, &stringify(&value));
                }
                Node::If {
                    cond,
                    then_nodes,
                    else_nodes,
                } => {
                    let cond = self.eval(cond, dot)?;
                    let branch = if is_truthy(&cond) {
                        then_nodes
                    } else {
                        else_nodes
                    };
                    self.exec(branch, dot, depth, out)?;
                }
                Node::Range {
                    source,
                    body,
                    else_nodes,
                } => {
                    let value = self.eval(source, dot)?;
                    let mut ran = false;
                    match value.as_ref() {
                        Value::Array(items) => {
                            for item in items {
                                ran = true;
                                self.exec(body, item, depth, out)?;
                            }
                        }
                        Value::Object(map) => {
                            for item in map.values() {
                                ran = true;
                                self.exec(body, item, depth, out)?;
                            }
                        }
                        Value::Null => {}
                        other => return Err(RenderError::NotIterable(kind(other))),
                    }
                    if !ran {
                        self.exec(else_nodes, dot, depth, out)?;
                    }
                }
                Node::With {
                    value,
                    body,
                    else_nodes,
                } => {
                    let value = self.eval(value, dot)?;
                    if is_truthy(&value) {
                        self.exec(body, &value, depth, out)?;
                    } else {
                        self.exec(else_nodes, dot, depth, out)?;
                    }
                }
                Node::Include { name, arg } => {
                    let arg = match arg {
                        Some(pipeline) => self.eval(pipeline, dot)?,
                        None => Cow::Owned(Value::Null),
                    };
                    self.run_template(name, &arg, depth + 1, out)?;
                }
            }
        }
        Ok(())
    }

    fn eval<'a>(&'a self, pipeline: &Pipeline, dot: &'a Value) -> Result<Cow<'a, Value>, RenderError> {
        let mut result: Option<Cow<'a, Value>> = None;
        for command in &pipeline.commands {
            let value = match command {
                Command::Operand(operand) => self.operand(operand, dot)?,
                Command::Call { func, args } => {
                    let mut values = args
                        .iter()
                        .map(|arg| self.operand(arg, dot).map(Cow::into_owned))
                        .collect::<Result<Vec<_>, _>>()?;
                    if let Some(previous) = result.take() {
                        values.push(previous.into_owned());
                    }
                    Cow::Owned(call(func, &values)?)
                }
            };
            result = Some(value);
        }
        Ok(result.unwrap_or(Cow::Owned(Value::Null)))
    }

    fn operand<'a>(&'a self, operand: &Operand, dot: &'a Value) -> Result<Cow<'a, Value>, RenderError> {
        match operand {
            Operand::Dot => Ok(Cow::Borrowed(dot)),
            Operand::Field(path) => lookup(dot, path),
            Operand::Root(path) => lookup(self.root, path),
            Operand::Str(s) => Ok(Cow::Owned(Value::String(s.clone()))),
            Operand::Int(n) => Ok(Cow::Owned(Value::from(*n))),
            Operand::Bool(b) => Ok(Cow::Owned(Value::Bool(*b))),
        }
    }
}

/// Follows `path` from `value`. Missing fields and fields of null are null;
/// fields of any other non-object are an error.
fn lookup<'a>(value: &'a Value, path: &[String]) -> Result<Cow<'a, Value>, RenderError> {
    let mut current = value;
    for field in path {
        match current {
            Value::Object(map) => match map.get(field) {
                Some(next) => current = next,
                None => return Ok(Cow::Owned(Value::Null)),
            },
            Value::Null => return Ok(Cow::Owned(Value::Null)),
            other => {
                return Err(RenderError::Field {
                    field: field.clone(),
                    kind: kind(other),
                })
            }
        }
    }
    Ok(Cow::Borrowed(current))
}
