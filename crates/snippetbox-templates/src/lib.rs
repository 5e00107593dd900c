//! # Snippetbox Templates
//!
//! HTML templates for Snippetbox, parsed and composed once at startup.
//!
//! Every `*.page.tmpl` file in the template directory becomes one
//! [`TemplateSet`] containing that page plus every `*.layout.tmpl` and
//! `*.partial.tmpl` file. Syntax errors, unbalanced blocks, duplicate
//! definitions and references to undefined templates all fail
//! [`TemplateCache::build`], so a server never starts with a broken page.
//!
//! ## Language
//!
//! | Action | Meaning |
//! |--------|---------|
//! | `{{.a.b}}` | Field of the current value, HTML-escaped |
//! | `{{.}}` / `{{$.a}}` | Current value / field of the page data |
//! | `{{.created \| humanDate}}` | Pipe into a function |
//! | `{{if eq .x "7"}}` | Equality test, true if the first argument equals any other |
//! | `{{if p}} … {{else if q}} … {{else}} … {{end}}` | Conditional |
//! | `{{range p}} … {{else}} … {{end}}` | Loop, `.` is each element |
//! | `{{with p}} … {{else}} … {{end}}` | Rebind `.` when truthy |
//! | `{{define "name"}} … {{end}}` | Named template |
//! | `{{template "name" p}}` | Include a named template |
//! | `{{/* … */}}` | Comment |
//!
//! `{{-` and `-}}` trim surrounding whitespace.
//!
//! ## Example
//!
//! ```
//! use serde_json::json;
//! use snippetbox_templates::TemplateCache;
//!
//! let cache = TemplateCache::from_sources([
//!     ("base.layout.tmpl", r#"{{define "base"}}<h1>{{template "title" .}}</h1>{{end}}"#),
//!     ("home.page.tmpl", r#"{{template "base" .}}{{define "title"}}{{.name}}{{end}}"#),
//! ])
//! .unwrap();
//!
//! let html = cache.render("home.page.tmpl", &json!({"name": "<Home>"})).unwrap();
//! assert_eq!(html, "<h1>&lt;Home&gt;</h1>");
//! ```

#![doc(html_root_url = "https://docs.rs/snippetbox-templates/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod ast;
mod cache;
mod error;
mod helpers;
mod parser;
mod render;
mod token;

pub use cache::{TemplateCache, TemplateSet, LAYOUT_SUFFIX, PAGE_SUFFIX, PARTIAL_SUFFIX};
pub use error::{RenderError, TemplateError};
pub use render::MAX_DEPTH;
