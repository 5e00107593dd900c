//! Builds the node tree for one template file.

use std::vec::IntoIter;

use crate::ast::{Body, Command, Node, Operand, Pipeline};
use crate::error::TemplateError;
use crate::helpers::function;
use crate::token::{tokenize, Token};

/// One named template: a file's top-level content or a `{{define}}` block.
#[derive(Debug)]
pub(crate) struct Definition {
    pub(crate) name: String,
    pub(crate) body: Body,
}

/// Every template found in one file, the file's own body first.
#[derive(Debug)]
pub(crate) struct ParsedFile {
    pub(crate) name: String,
    pub(crate) definitions: Vec<Definition>,
}

pub(crate) fn parse_file(name: &str, source: &str) -> Result<ParsedFile, TemplateError> {
    let tokens = tokenize(name, source)?;
    let mut parser = Parser {
        file: name,
        tokens: tokens.into_iter(),
        defines: Vec::new(),
        depth: 0,
    };

    let (nodes, stop) = parser.parse_list()?;
    match stop {
        Stop::Eof => {}
        Stop::End { line } => return Err(parser.unexpected(line, "end")),
        Stop::Else { line } | Stop::ElseIf { line, .. } => {
            return Err(parser.unexpected(line, "else"))
        }
    }

    let mut definitions = Vec::with_capacity(parser.defines.len() + 1);
    definitions.push(Definition {
        name: name.to_string(),
        body: nodes.into(),
    });
    definitions.append(&mut parser.defines);
    Ok(ParsedFile {
        name: name.to_string(),
        definitions,
    })
}

/// Why a node list ended.
enum Stop {
    Eof,
    End { line: usize },
    Else { line: usize },
    ElseIf { cond: Pipeline, line: usize },
}

enum Action {
    Output(Pipeline),
    Include { name: String, arg: Option<Pipeline> },
    If(Pipeline),
    Range(Pipeline),
    With(Pipeline),
    Define(String),
    Else,
    ElseIf(Pipeline),
    End,
}

struct Parser<'f> {
    file: &'f str,
    tokens: IntoIter<Token>,
    defines: Vec<Definition>,
    depth: usize,
}

impl Parser<'_> {
    fn parse_list(&mut self) -> Result<(Vec<Node>, Stop), TemplateError> {
        let mut nodes = Vec::new();
        while let Some(token) = self.tokens.next() {
            let (body, line) = match token {
                Token::Text(text) => {
                    nodes.push(Node::Text(text));
                    continue;
                }
                Token::Action { body, line } => (body, line),
            };
            match parse_action(self.file, line, &body)? {
                Action::Output(pipeline) => nodes.push(Node::Output(pipeline)),
                Action::Include { name, arg } => nodes.push(Node::Include { name, arg }),
                Action::If(cond) => nodes.push(self.parse_if(cond, line)?),
                Action::Range(source) => {
                    let (body, else_nodes) = self.parse_block("range", line)?;
                    nodes.push(Node::Range {
                        source,
                        body,
                        else_nodes,
                    });
                }
                Action::With(value) => {
                    let (body, else_nodes) = self.parse_block("with", line)?;
                    nodes.push(Node::With {
                        value,
                        body,
                        else_nodes,
                    });
                }
                Action::Define(name) => {
                    if self.depth > 0 {
                        return Err(TemplateError::syntax(
                            self.file,
                            line,
                            "{{define}} is only allowed at the top level",
                        ));
                    }
                    self.parse_define(name, line)?;
                }
                Action::Else => return Ok((nodes, Stop::Else { line })),
                Action::ElseIf(cond) => return Ok((nodes, Stop::ElseIf { cond, line })),
                Action::End => return Ok((nodes, Stop::End { line })),
            }
        }
        Ok((nodes, Stop::Eof))
    }

    fn parse_if(&mut self, cond: Pipeline, line: usize) -> Result<Node, TemplateError> {
        self.depth += 1;
        let (then_nodes, stop) = self.parse_list()?;
        let else_nodes = match stop {
            Stop::End { .. } => Vec::new(),
            Stop::Else { .. } => {
                let (nodes, stop) = self.parse_list()?;
                self.expect_end(stop, "if", line)?;
                nodes
            }
            // `{{else if}}` shares the outer `{{end}}`
            Stop::ElseIf { cond, line } => vec![self.parse_if(cond, line)?],
            Stop::Eof => return Err(self.unclosed(line, "if")),
        };
        self.depth -= 1;
        Ok(Node::If {
            cond,
            then_nodes,
            else_nodes,
        })
    }

    fn parse_block(
        &mut self,
        keyword: &'static str,
        line: usize,
    ) -> Result<(Vec<Node>, Vec<Node>), TemplateError> {
        self.depth += 1;
        let (body, stop) = self.parse_list()?;
        let else_nodes = match stop {
            Stop::End { .. } => Vec::new(),
            Stop::Else { .. } => {
                let (nodes, stop) = self.parse_list()?;
                self.expect_end(stop, keyword, line)?;
                nodes
            }
            Stop::ElseIf { line, .. } => return Err(self.unexpected(line, "else")),
            Stop::Eof => return Err(self.unclosed(line, keyword)),
        };
        self.depth -= 1;
        Ok((body, else_nodes))
    }

    fn parse_define(&mut self, name: String, line: usize) -> Result<(), TemplateError> {
        self.depth += 1;
        let (body, stop) = self.parse_list()?;
        self.expect_end(stop, "define", line)?;
        self.depth -= 1;
        self.defines.push(Definition {
            name,
            body: body.into(),
        });
        Ok(())
    }

    fn expect_end(&self, stop: Stop, keyword: &'static str, line: usize) -> Result<(), TemplateError> {
        match stop {
            Stop::End { .. } => Ok(()),
            Stop::Eof => Err(self.unclosed(line, keyword)),
            Stop::Else { line } | Stop::ElseIf { line, .. } => Err(self.unexpected(line, "else")),
        }
    }

    fn unclosed(&self, line: usize, keyword: &'static str) -> TemplateError {
        TemplateError::UnclosedBlock {
            file: self.file.to_string(),
            line,
            keyword,
        }
    }

    fn unexpected(&self, line: usize, keyword: &'static str) -> TemplateError {
        TemplateError::UnexpectedAction {
            file: self.file.to_string(),
            line,
            keyword,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Word {
    Bare(String),
    Str(String),
    Pipe,
}

fn lex(file: &str, line: usize, body: &str) -> Result<Vec<Word>, TemplateError> {
    let mut words = Vec::new();
    let mut chars = body.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '|' => {
                chars.next();
                words.push(Word::Pipe);
            }
            '"' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some('n') => value.push('\n'),
                            Some('t') => value.push('\t'),
                            Some(other @ ('"' | '\\')) => value.push(other),
                            _ => return Err(TemplateError::syntax(file, line, "bad escape in string")),
                        },
                        Some(other) => value.push(other),
                        None => return Err(TemplateError::syntax(file, line, "unterminated string")),
                    }
                }
                words.push(Word::Str(value));
            }
            '`' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some('`') => break,
                        Some(other) => value.push(other),
                        None => {
                            return Err(TemplateError::syntax(file, line, "unterminated raw string"))
                        }
                    }
                }
                words.push(Word::Str(value));
            }
            _ => {
                let mut value = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || c == '|' {
                        break;
                    }
                    value.push(c);
                    chars.next();
                }
                words.push(Word::Bare(value));
            }
        }
    }

    Ok(words)
}

fn parse_action(file: &str, line: usize, body: &str) -> Result<Action, TemplateError> {
    let words = lex(file, line, body)?;
    let (first, rest) = match words.split_first() {
        Some((Word::Bare(first), rest)) => (first.as_str(), rest),
        _ => return Ok(Action::Output(parse_pipeline(file, line, &words)?)),
    };

    let action = match first {
        "if" => Action::If(parse_pipeline(file, line, rest)?),
        "range" => Action::Range(parse_pipeline(file, line, rest)?),
        "with" => Action::With(parse_pipeline(file, line, rest)?),
        "else" => match rest.split_first() {
            None => Action::Else,
            Some((Word::Bare(kw), cond)) if kw == "if" => {
                Action::ElseIf(parse_pipeline(file, line, cond)?)
            }
            Some(_) => return Err(TemplateError::syntax(file, line, "unexpected words after else")),
        },
        "end" => {
            if !rest.is_empty() {
                return Err(TemplateError::syntax(file, line, "unexpected words after end"));
            }
            Action::End
        }
        "define" => match rest {
            [Word::Str(name)] => Action::Define(name.clone()),
            _ => return Err(TemplateError::syntax(file, line, "define requires a quoted name")),
        },
        "template" => match rest.split_first() {
            Some((Word::Str(name), arg)) => Action::Include {
                name: name.clone(),
                arg: if arg.is_empty() {
                    None
                } else {
                    Some(parse_pipeline(file, line, arg)?)
                },
            },
            _ => return Err(TemplateError::syntax(file, line, "template requires a quoted name")),
        },
        _ => Action::Output(parse_pipeline(file, line, &words)?),
    };
    Ok(action)
}

fn parse_pipeline(file: &str, line: usize, words: &[Word]) -> Result<Pipeline, TemplateError> {
    if words.is_empty() {
        return Err(TemplateError::syntax(file, line, "missing value"));
    }

    let mut commands = Vec::new();
    for (index, segment) in words.split(|w| *w == Word::Pipe).enumerate() {
        if segment.is_empty() {
            return Err(TemplateError::syntax(file, line, "missing command in pipeline"));
        }
        let command = parse_command(file, line, segment)?;
        if index > 0 && matches!(command, Command::Operand(_)) {
            return Err(TemplateError::syntax(file, line, "non-function in pipeline stage"));
        }
        commands.push(command);
    }
    Ok(Pipeline { commands })
}

fn parse_command(file: &str, line: usize, words: &[Word]) -> Result<Command, TemplateError> {
    if let [Word::Bare(name), args @ ..] = words {
        if let Some(func) = function(name) {
            let args = args
                .iter()
                .map(|w| parse_operand(file, line, w))
                .collect::<Result<_, _>>()?;
            return Ok(Command::Call { func, args });
        }
    }
    match words {
        [word] => Ok(Command::Operand(parse_operand(file, line, word)?)),
        [first, ..] => {
            // An unknown bare name in call position is reported as such.
            parse_operand(file, line, first)?;
            Err(TemplateError::syntax(file, line, "too many operands"))
        }
        [] => Err(TemplateError::syntax(file, line, "missing value")),
    }
}

fn parse_operand(file: &str, line: usize, word: &Word) -> Result<Operand, TemplateError> {
    let bare = match word {
        Word::Str(s) => return Ok(Operand::Str(s.clone())),
        Word::Pipe => return Err(TemplateError::syntax(file, line, "unexpected |")),
        Word::Bare(bare) => bare.as_str(),
    };

    if bare == "." {
        return Ok(Operand::Dot);
    }
    if bare == "$" {
        return Ok(Operand::Root(Vec::new()));
    }
    if let Some(path) = bare.strip_prefix("$.") {
        return Ok(Operand::Root(field_path(file, line, path)?));
    }
    if let Some(path) = bare.strip_prefix('.') {
        return Ok(Operand::Field(field_path(file, line, path)?));
    }
    match bare {
        "true" => return Ok(Operand::Bool(true)),
        "false" => return Ok(Operand::Bool(false)),
        _ => {}
    }
    if let Ok(n) = bare.parse::<i64>() {
        return Ok(Operand::Int(n));
    }
    Err(TemplateError::syntax(
        file,
        line,
        format!("function {bare:?} not defined"),
    ))
}

fn field_path(file: &str, line: usize, path: &str) -> Result<Vec<String>, TemplateError> {
    path.split('.')
        .map(|field| {
            let valid = !field.is_empty()
                && field.chars().all(|c| c.is_alphanumeric() || c == '_');
            if valid {
                Ok(field.to_string())
            } else {
                Err(TemplateError::syntax(file, line, format!("bad field name in {path:?}")))
            }
        })
        .collect()
}
