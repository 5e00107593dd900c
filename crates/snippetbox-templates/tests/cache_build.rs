//! Building the cache from a template directory.

use std::fs;
use std::path::Path;

use serde_json::json;
use snippetbox_templates::{TemplateCache, TemplateError};
use tempfile::TempDir;

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

fn template_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "base.layout.tmpl",
        r#"{{define "base"}}<!doctype html>
<html>
<head><title>{{template "title" .}} - Snippetbox</title></head>
<body>
{{with .flash}}<div class="flash">{{.}}</div>{{end}}
{{template "main" .}}
{{template "footer" .}}
</body>
</html>
{{end}}"#,
    );
    write(
        dir.path(),
        "footer.partial.tmpl",
        r#"{{define "footer"}}<footer>Powered by Rust in {{.current_year}}</footer>{{end}}"#,
    );
    write(
        dir.path(),
        "home.page.tmpl",
        r#"{{template "base" .}}
{{define "title"}}Home{{end}}
{{define "main"}}
    {{- range .snippets}}
    <a href="/snippet/{{.id}}">{{.title}}</a> {{.created | humanDate}}
    {{- else}}
    <p>There's nothing to see here yet!</p>
    {{- end}}
{{end}}"#,
    );
    dir
}

#[test]
fn test_build_and_render_from_disk() {
    let dir = template_dir();
    let cache = TemplateCache::build(dir.path()).unwrap();
    assert_eq!(cache.pages(), vec!["home.page.tmpl"]);

    let html = cache
        .render(
            "home.page.tmpl",
            &json!({
                "current_year": 2024,
                "flash": "Snippet successfully created!",
                "snippets": [
                    {"id": 2, "title": "O <snail>", "created": "2024-03-17T10:15:00Z"}
                ]
            }),
        )
        .unwrap();

    assert!(html.starts_with("<!doctype html>"));
    assert!(html.contains("<title>Home - Snippetbox</title>"));
    assert!(html.contains(r#"<div class="flash">Snippet successfully created!</div>"#));
    assert!(html.contains(r#"<a href="/snippet/2">O &lt;snail&gt;</a> 17 Mar 2024 at 10:15"#));
    assert!(html.contains("Powered by Rust in 2024"));
    assert!(!html.contains("nothing to see"));
}

#[test]
fn test_empty_list_renders_else_branch() {
    let dir = template_dir();
    let cache = TemplateCache::build(dir.path()).unwrap();
    let html = cache
        .render("home.page.tmpl", &json!({"current_year": 2024, "snippets": []}))
        .unwrap();
    assert!(html.contains("There's nothing to see here yet!"));
    assert!(!html.contains("class=\"flash\""));
}

#[test]
fn test_malformed_page_fails_build() {
    let dir = template_dir();
    write(dir.path(), "broken.page.tmpl", "{{template \"base\" .}}\n{{define \"main\"}}{{if .x}}{{end}}");
    let err = TemplateCache::build(dir.path()).unwrap_err();
    assert!(matches!(err, TemplateError::UnclosedBlock { keyword: "define", .. }));
}

#[test]
fn test_missing_directory_fails_build() {
    let dir = TempDir::new().unwrap();
    let err = TemplateCache::build(dir.path().join("missing")).unwrap_err();
    assert!(matches!(err, TemplateError::Io { .. }));
}

#[test]
fn test_subdirectories_are_skipped() {
    let dir = template_dir();
    fs::create_dir(dir.path().join("nested.page.tmpl")).unwrap();
    let cache = TemplateCache::build(dir.path()).unwrap();
    assert_eq!(cache.len(), 1);
}
