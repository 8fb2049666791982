//! The compiled template set.
//!
//! Every `*.html.jinja` file under the templates directory is compiled once at
//! startup and registered under its path relative to that directory, so
//! `{% extends "base.html.jinja" %}` and `{% include "components/tag.html.jinja" %}`
//! resolve against the same set. The set is never modified afterwards.

use std::path::Path;
use std::sync::Arc;

use minijinja::Environment;
use serde::Serialize;

use crate::errors::TemplateError;

pub const HOME: &str = "home.html.jinja";
pub const RECIPE: &str = "recipe.html.jinja";
pub const RECIPE_EDITOR: &str = "recipe_editor.html.jinja";
pub const PRODUCT: &str = "product.html.jinja";
pub const PRODUCTS: &str = "products.html.jinja";
pub const NOT_FOUND: &str = "not_found.html.jinja";
pub const ERROR: &str = "error.html.jinja";

/// Pages the router renders directly. Loading fails if any is absent.
const REQUIRED: [&str; 7] = [HOME, RECIPE, RECIPE_EDITOR, PRODUCT, PRODUCTS, NOT_FOUND, ERROR];

/// Join a quantity and unit for display, leaving out whichever is blank.
pub fn format_qty(qty: &str, unit: &str) -> String {
    match (qty.is_empty(), unit.is_empty()) {
        (true, true) => String::new(),
        (false, true) => qty.to_string(),
        (true, false) => unit.to_string(),
        (false, false) => format!("{qty} {unit}"),
    }
}

/// Render a float with at most one decimal and no trailing zeros.
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        // `+ 0.0` turns -0.0 into 0.0
        return format!("{:.0}", value + 0.0);
    }
    let formatted = format!("{value:.1}");
    match formatted.strip_suffix(".0") {
        Some(whole) if whole == "-0" => "0".to_string(),
        Some(whole) => whole.to_string(),
        None => formatted,
    }
}

/// 1-based numbering from a 0-based index.
pub fn inc(index: i64) -> i64 {
    index + 1
}

/// Escape a value for use as one URL path segment.
pub fn urlencode(value: &str) -> String {
    url_escape::encode_component(value).into_owned()
}

/// Stand-in for a link target that is not http(s) or relative.
pub const UNSAFE_URL: &str = "#";

/// Pass `http`, `https` and scheme-less (relative) URLs through unchanged.
///
/// Browsers ignore whitespace and control characters inside a scheme, so
/// those are dropped before the scheme is read.
pub fn safe_url(url: &str) -> String {
    let compact: String = url
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control())
        .collect();
    match compact.find(|c: char| matches!(c, ':' | '/' | '?' | '#')) {
        Some(end) if compact[end..].starts_with(':') => {
            let scheme = compact[..end].to_ascii_lowercase();
            if scheme == "http" || scheme == "https" {
                url.to_string()
            } else {
                UNSAFE_URL.to_string()
            }
        }
        _ => url.to_string(),
    }
}

/// Replacement for a color that is not a plain CSS color value.
pub const FALLBACK_COLOR: &str = "inherit";

/// Accept `#hex`, `rgb()`/`rgba()`/`hsl()`/`hsla()` with numeric arguments, or
/// a named color. Anything else could break out of a `style` declaration.
pub fn css_color(value: &str) -> String {
    let value = value.trim();
    if is_css_color(value) {
        value.to_string()
    } else {
        FALLBACK_COLOR.to_string()
    }
}

fn is_css_color(value: &str) -> bool {
    if let Some(hex) = value.strip_prefix('#') {
        return matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    if let Some((func, rest)) = value.split_once('(') {
        let Some(args) = rest.strip_suffix(')') else {
            return false;
        };
        return matches!(
            func.to_ascii_lowercase().as_str(),
            "rgb" | "rgba" | "hsl" | "hsla"
        ) && args
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '%' | ' ' | '/' | '-'));
    }
    (1..=32).contains(&value.len()) && value.chars().all(|c| c.is_ascii_alphabetic())
}

/// Read-only handle to the template set, cheap to clone.
#[derive(Clone)]
pub struct Templates {
    env: Arc<Environment<'static>>,
}

impl Templates {
    /// Compile every template under `dir`.
    pub fn load(dir: &Path) -> Result<Self, TemplateError> {
        let mut env = Environment::new();
        register_helpers(&mut env);

        let pattern = format!(
            "{}/**/*.html.jinja",
            glob::Pattern::escape(&dir.to_string_lossy())
        );
        for entry in glob::glob(&pattern)? {
            let path = entry.map_err(|err| TemplateError::Read {
                path: err.path().display().to_string(),
                source: err.into(),
            })?;
            let source = std::fs::read_to_string(&path).map_err(|source| TemplateError::Read {
                path: path.display().to_string(),
                source,
            })?;
            let name = template_name(dir, &path);
            tracing::debug!(name = %name, "compiling template");
            env.add_template_owned(name.clone(), source)
                .map_err(|source| TemplateError::Parse { name, source })?;
        }

        for name in REQUIRED {
            if env.get_template(name).is_err() {
                return Err(TemplateError::Missing(name));
            }
        }
        tracing::info!(dir = %dir.display(), "templates loaded");
        Ok(Self { env: Arc::new(env) })
    }

    /// Render a whole page to a string. Nothing is sent until this returns.
    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<String, minijinja::Error> {
        self.env.get_template(name)?.render(ctx)
    }
}

fn register_helpers(env: &mut Environment<'static>) {
    env.add_function("format_qty", |qty: String, unit: String| format_qty(&qty, &unit));
    env.add_function("format_float", format_float);
    env.add_function("inc", inc);
    env.add_filter("format_qty", |qty: String, unit: String| format_qty(&qty, &unit));
    env.add_filter("format_float", format_float);
    env.add_filter("inc", inc);
    env.add_filter("urlencode", |value: String| urlencode(&value));
    env.add_filter("safe_url", |url: String| safe_url(&url));
    env.add_filter("css_color", |value: String| css_color(&value));
}

/// `dir/components/tag.html.jinja` -> `components/tag.html.jinja`, on any platform.
fn template_name(dir: &Path, path: &Path) -> String {
    path.strip_prefix(dir)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, source: &str) {
        let path = dir.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, source).unwrap();
    }

    /// A directory holding every required page, each a one-liner.
    fn minimal_set() -> TempDir {
        let dir = TempDir::new().unwrap();
        for name in REQUIRED {
            write(dir.path(), name, "{{ title }}");
        }
        dir
    }

    #[test]
    fn format_qty_omits_blank_parts() {
        assert_eq!(format_qty("", ""), "");
        assert_eq!(format_qty("2", ""), "2");
        assert_eq!(format_qty("", "cups"), "cups");
        assert_eq!(format_qty("2", "cups"), "2 cups");
        assert_eq!(format_qty("1/2", "tsp"), "1/2 tsp");
    }

    #[test]
    fn format_float_drops_trailing_zeros() {
        assert_eq!(format_float(3.0), "3");
        assert_eq!(format_float(3.5), "3.5");
        assert_eq!(format_float(0.0), "0");
        assert_eq!(format_float(-0.0), "0");
        assert_eq!(format_float(12.26), "12.3");
        assert_eq!(format_float(3.04), "3");
        assert_eq!(format_float(-0.04), "0");
        assert_eq!(format_float(-1.5), "-1.5");
        assert_eq!(format_float(1e20), "100000000000000000000");
    }

    #[test]
    fn inc_is_one_based() {
        assert_eq!(inc(0), 1);
        assert_eq!(inc(9), 10);
    }

    #[test]
    fn loads_nested_templates_by_relative_name() {
        let dir = minimal_set();
        write(dir.path(), "components/tag.html.jinja", "<b>{{ name }}</b>");
        write(
            dir.path(),
            HOME,
            r#"{% include "components/tag.html.jinja" %}|{{ format_qty("2", "cups") }}|{{ "3"|format_qty("tsp") }}|{{ 2.50|format_float }}|{{ inc(0) }}|{{ 4|inc }}"#,
        );
        let templates = Templates::load(dir.path()).unwrap();
        let html = templates.render(HOME, context! { name => "<Salt>" }).unwrap();
        assert_eq!(html, "<b>&lt;Salt&gt;</b>|2 cups|3 tsp|2.5|1|5");
    }

    #[test]
    fn urlencode_escapes_one_segment() {
        assert_eq!(urlencode("p 2"), "p%202");
        assert_eq!(urlencode("a/b?c"), "a%2Fb%3Fc");
        assert_eq!(urlencode("plain-id_1"), "plain-id_1");
    }

    #[test]
    fn safe_url_keeps_web_and_relative_links() {
        for url in [
            "https://www.youtube.com/watch?v=abc",
            "HTTP://example.com",
            "/static/uploads/1_deadbeef.png",
            "img/oats.jpg",
            "//cdn.example.com/x.png",
            "?page=2",
            "",
        ] {
            assert_eq!(safe_url(url), url, "{url}");
        }
    }

    #[test]
    fn safe_url_blocks_other_schemes() {
        for url in [
            "javascript:alert(1)",
            "JavaScript:alert(1)",
            " java\tscript:alert(1)",
            "data:text/html;base64,PHNjcmlwdD4=",
            "vbscript:msgbox",
        ] {
            assert_eq!(safe_url(url), UNSAFE_URL, "{url}");
        }
    }

    #[test]
    fn css_color_accepts_plain_colors() {
        for color in ["#fff", "#DFF5E1", "#1f5a2a80", "rgb(12, 34, 56)", "hsla(120 50% 40% / 0.5)", "teal"] {
            assert_eq!(css_color(color), color, "{color}");
        }
        assert_eq!(css_color("  red "), "red");
    }

    #[test]
    fn css_color_rejects_declarations() {
        for color in [
            "red; background:url(//evil.test/x)",
            "url(//evil.test/x)",
            "expression(alert(1))",
            "rgb(1,2,3); color: red",
            "#12345",
            "#ggg",
            "",
        ] {
            assert_eq!(css_color(color), FALLBACK_COLOR, "{color}");
        }
    }

    #[test]
    fn unsafe_values_are_neutralized_when_rendered() {
        let dir = minimal_set();
        write(
            dir.path(),
            HOME,
            r#"<a href="{{ link|safe_url }}" style="--c: {{ color|css_color }}">x</a>"#,
        );
        let templates = Templates::load(dir.path()).unwrap();
        let html = templates
            .render(HOME, context! { link => "javascript:alert(1)", color => "red;x:y" })
            .unwrap();
        assert_eq!(html, r##"<a href="#" style="--c: inherit">x</a>"##);
    }

    #[test]
    fn parse_errors_fail_the_load() {
        let dir = minimal_set();
        write(dir.path(), "broken.html.jinja", "{% if %}");
        match Templates::load(dir.path()) {
            Err(TemplateError::Parse { name, .. }) => assert_eq!(name, "broken.html.jinja"),
            Err(other) => panic!("expected parse error, got {other}"),
            Ok(_) => panic!("expected parse error"),
        }
    }

    #[test]
    fn missing_pages_fail_the_load() {
        let dir = minimal_set();
        std::fs::remove_file(dir.path().join(ERROR)).unwrap();
        assert!(matches!(
            Templates::load(dir.path()),
            Err(TemplateError::Missing(ERROR))
        ));
    }

    #[test]
    fn other_files_are_ignored() {
        let dir = minimal_set();
        write(dir.path(), "notes.txt", "{% if %}");
        assert!(Templates::load(dir.path()).is_ok());
    }
}
