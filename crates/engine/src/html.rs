//! Markup scanner for the two element kinds the engine can fill.
//!
//! This is not an HTML parser. It finds `<input>` tags and
//! `<textarea>...</textarea>` pairs in document order, decodes their
//! attributes, and remembers where each one sits in the source so the
//! document can be rendered back with new values spliced in. Comments and
//! `<script>`/`<style>` bodies are stepped over whole.

use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

use crate::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tag {
    Input,
    Textarea,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Attribute {
    pub name: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct ScannedControl {
    pub tag: Tag,
    /// Byte range of the whole element in the source
    pub span: Range<usize>,
    /// Raw opening tag, reused verbatim when a textarea is rewritten
    pub open_tag: String,
    pub attributes: Vec<Attribute>,
    pub self_closing: bool,
    /// Decoded textarea content
    pub text: Option<String>,
}

impl ScannedControl {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_deref().unwrap_or(""))
    }
}

type Pattern = OnceLock<std::result::Result<Regex, regex::Error>>;

fn compiled(cell: &'static Pattern, pattern: &str) -> Result<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern))
        .as_ref()
        .map_err(|e| EngineError::Html(format!("scanner pattern is invalid: {e}")))
}

fn control_re() -> Result<&'static Regex> {
    static RE: Pattern = OnceLock::new();
    compiled(
        &RE,
        r#"(?is)(?P<skip><!--.*?-->|<script\b.*?</script\s*>|<style\b.*?</style\s*>)|(?P<input><input\b(?P<iattrs>(?:[^>"']|"[^"]*"|'[^']*')*)>)|(?P<topen><textarea\b(?P<tattrs>(?:[^>"']|"[^"]*"|'[^']*')*)>)(?P<text>.*?)</textarea\s*>"#,
    )
}

fn attr_re() -> Result<&'static Regex> {
    static RE: Pattern = OnceLock::new();
    compiled(
        &RE,
        r#"(?s)(?P<name>[^\s"'<>/=]+)(?:\s*=\s*(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)'|(?P<uq>[^\s"'=<>`]+)))?"#,
    )
}

/// Find every fillable control in `html`, in document order
pub(crate) fn scan_controls(html: &str) -> Result<Vec<ScannedControl>> {
    let attr_re = attr_re()?;
    let controls = control_re()?
        .captures_iter(html)
        .filter_map(|caps| {
            if caps.name("skip").is_some() {
                return None;
            }
            let whole = caps.get(0)?;
            if let Some(input) = caps.name("input") {
                let raw_attrs = caps.name("iattrs").map_or("", |m| m.as_str());
                Some(ScannedControl {
                    tag: Tag::Input,
                    span: whole.range(),
                    open_tag: input.as_str().to_string(),
                    attributes: parse_attributes(attr_re, raw_attrs),
                    self_closing: raw_attrs.trim_end().ends_with('/'),
                    text: None,
                })
            } else {
                let open = caps.name("topen")?;
                let raw_attrs = caps.name("tattrs").map_or("", |m| m.as_str());
                Some(ScannedControl {
                    tag: Tag::Textarea,
                    span: whole.range(),
                    open_tag: open.as_str().to_string(),
                    attributes: parse_attributes(attr_re, raw_attrs),
                    self_closing: false,
                    text: caps.name("text").map(|m| decode_entities(m.as_str())),
                })
            }
        })
        .collect();
    Ok(controls)
}

fn parse_attributes(attr_re: &Regex, raw: &str) -> Vec<Attribute> {
    attr_re
        .captures_iter(raw)
/// Render an `<input>` tag with its `value` attribute replaced (or added)
pub(crate) fn render_input(control: &ScannedControl, value: &str) -> String {
    let mut out = String::from("<input");
    let mut wrote_value = false;

    for attr in &control.attributes {
        out.push(' ');
        if attr.name.eq_ignore_ascii_case("value") {
            if wrote_value {
                continue;
            }
            wrote_value = true;
            push_attr(&mut out, &attr.name, Some(value));
        } else {
            push_attr(&mut out, &attr.name, attr.value.as_deref());
        }
    }

    if !wrote_value {
        out.push(' ');
        push_attr(&mut out, "value", Some(value));
    }

    out.push_str(if control.self_closing { " />" } else { ">" });
    out
}

/// Render a `<textarea>` element with new content
pub(crate) fn render_textarea(control: &ScannedControl, value: &str) -> String {
    format!("{}{}</textarea>", control.open_tag, escape(value))
}

fn push_attr(out: &mut String, name: &str, value: Option<&str>) {
    out.push_str(name);
    if let Some(value) = value {
        out.push_str("=\"");
        out.push_str(&escape(value));
        out.push('"');
    }
}

pub(crate) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub(crate) fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scans_controls_in_document_order() {
        let html = r#"
            <form>
              <INPUT type="text" name="full-name">
              <textarea name='cover'>Hello &amp; welcome</textarea>
              <input name=email-field required />
            </form>"#;

        let controls = scan_controls(html).unwrap();
        assert_eq!(controls.len(), 3);

        assert_eq!(controls[0].tag, Tag::Input);
        assert_eq!(controls[0].attr("name"), Some("full-name"));
        assert_eq!(controls[0].attr("TYPE"), Some("text"));

        assert_eq!(controls[1].tag, Tag::Textarea);
        assert_eq!(controls[1].attr("name"), Some("cover"));
        assert_eq!(controls[1].text.as_deref(), Some("Hello & welcome"));

        assert_eq!(controls[2].attr("name"), Some("email-field"));
        assert_eq!(controls[2].attr("required"), Some(""));
        assert!(controls[2].self_closing);
    }

    #[test]
    fn test_quoted_angle_bracket_does_not_end_tag() {
        let controls = scan_controls(r#"<input placeholder="a > b" name="city">"#).unwrap();
        assert_eq!(controls.len(), 1);
        assert_eq!(controls[0].attr("name"), Some("city"));
        assert_eq!(controls[0].attr("placeholder"), Some("a > b"));
    }

    #[test]
    fn test_render_input_replaces_value() {
        let controls = scan_controls(r#"<input name="zip" value="old">"#).unwrap();
        assert_eq!(
            render_input(&controls[0], "94110"),
            r#"<input name="zip" value="94110">"#
        );
    }

    #[test]
    fn test_render_input_adds_escaped_value() {
        let controls = scan_controls(r#"<input name="q"/>"#).unwrap();
        assert_eq!(
            render_input(&controls[0], r#"Tom "TJ" <Jones>"#),
            r#"<input name="q" value="Tom &quot;TJ&quot; &lt;Jones&gt;" />"#
        );
    }

    #[test]
    fn test_render_textarea_keeps_open_tag() {
        let controls = scan_controls(r#"<textarea name="skills" rows=4>x</textarea>"#).unwrap();
        assert_eq!(
            render_textarea(&controls[0], "Rust & SQL"),
            r#"<textarea name="skills" rows=4>Rust &amp; SQL</textarea>"#
        );
    }

    #[test]
    fn test_comments_and_raw_text_are_skipped() {
        let html = r#"<form>
  <!-- old field: <input name="email"> -->
  <script>document.write('<input name="email-js">')</script>
  <style>input[name="x"] { color: red }</style>
  <textarea name="cover"><!-- keep --></textarea>
  <input name="email-field">
</form>"#;

        let controls = scan_controls(html).unwrap();
        let names: Vec<_> = controls.iter().map(|c| c.attr("name")).collect();
        assert_eq!(names, vec![Some("cover"), Some("email-field")]);
        assert_eq!(controls[0].text.as_deref(), Some("<!-- keep -->"));
        assert_eq!(&html[controls[1].span.clone()], r#"<input name="email-field">"#);
    }

    #[test]
    fn test_invalid_pattern_is_an_html_error() {
        static BAD: Pattern = OnceLock::new();
        assert!(matches!(compiled(&BAD, "(unclosed"), Err(EngineError::Html(_))));
    }
}
