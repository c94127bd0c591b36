//! Message template rendering
//!
//! Templates use `{0}` for positional arguments and `{name}` for named ones.
//! A named placeholder first looks for an argument carrying the same key; if
//! there is none, the n-th distinct named placeholder binds to the n-th
//! argument, provided that argument has no key of its own. `{{` and `}}`
//! produce literal braces, `{name,10}` right-aligns to ten columns and
//! `{name,-10}` left-aligns, with widths capped at [`MAX_ALIGN`]. Anything
//! after `:` is a format hint and is ignored.
//!
//! Rendering is total: placeholders that match nothing are kept verbatim,
//! an unterminated `{` is copied as text, and a missing template renders as
//! the empty string.

use serde_json::Value;

use crate::log_record::LogArg;

/// Text used for null arguments.
pub const NULL_TEXT: &str = "(null)";

/// Widest alignment a placeholder can request.
pub const MAX_ALIGN: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Hole(Hole),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Hole {
    raw: String,
    name: String,
    align: Option<i32>,
}

impl Hole {
    fn parse(raw: &str, inner: &str) -> Hole {
        let (head, _format) = match inner.find(':') {
            Some(pos) => (&inner[..pos], Some(&inner[pos + 1..])),
            None => (inner, None),
        };
        let (name, align) = match head.find(',') {
            Some(pos) => (&head[..pos], head[pos + 1..].trim().parse::<i32>().ok()),
            None => (head, None),
        };
        Hole {
            raw: raw.to_string(),
            name: name.trim().to_string(),
            align,
        }
    }

    fn position(&self) -> Option<usize> {
        if !self.name.is_empty() && self.name.bytes().all(|b| b.is_ascii_digit()) {
            self.name.parse().ok()
        } else {
            None
        }
    }
}

/// A parsed message template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    segments: Vec<Segment>,
    named: Vec<String>,
}

impl MessageTemplate {
    pub fn parse(template: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = template;

        loop {
            let Some(pos) = rest.find(['{', '}']) else {
                literal.push_str(rest);
                break;
            };
            literal.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if tail.starts_with("{{") {
                literal.push('{');
                rest = &tail[2..];
            } else if tail.starts_with("}}") {
                literal.push('}');
                rest = &tail[2..];
            } else if tail.starts_with('}') {
                literal.push('}');
                rest = &tail[1..];
            } else {
                match tail[1..].find(['{', '}']) {
                    Some(end) if tail.as_bytes()[end + 1] == b'}' => {
                        if !literal.is_empty() {
                            segments.push(Segment::Literal(std::mem::take(&mut literal)));
                        }
                        let raw = &tail[..end + 2];
                        segments.push(Segment::Hole(Hole::parse(raw, &tail[1..end + 1])));
                        rest = &tail[end + 2..];
                    }
                    _ => {
                        literal.push('{');
                        rest = &tail[1..];
                    }
                }
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        let mut named: Vec<String> = Vec::new();
        for segment in &segments {
            if let Segment::Hole(hole) = segment {
                if !hole.name.is_empty()
                    && hole.position().is_none()
                    && !named.contains(&hole.name)
                {
                    named.push(hole.name.clone());
                }
            }
        }

        MessageTemplate { segments, named }
    }

    /// Distinct named placeholders in order of first appearance.
    pub fn placeholder_names(&self) -> &[String] {
        &self.named
    }

    fn resolve<'a>(&self, hole: &Hole, args: &'a [LogArg]) -> Option<&'a LogArg> {
        if hole.name.is_empty() {
            return None;
        }
        if let Some(index) = hole.position() {
            return args.get(index);
        }
        if let Some(arg) = args.iter().find(|a| a.key.as_deref() == Some(hole.name.as_str())) {
            return Some(arg);
        }
        let ordinal = self.named.iter().position(|n| *n == hole.name)?;
        args.get(ordinal).filter(|arg| arg.key.is_none())
    }

    pub fn render(&self, args: &[LogArg]) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Hole(hole) => match self.resolve(hole, args) {
                    Some(arg) => push_aligned(&mut out, &render_value(&arg.value), hole.align),
                    None => out.push_str(&hole.raw),
                },
            }
        }
        out
    }

    /// Returns the arguments with missing keys filled in from the named
    /// placeholders they bind to.
    pub fn bind(&self, args: &[LogArg]) -> Vec<LogArg> {
        args.iter()
            .enumerate()
            .map(|(index, arg)| {
                let mut bound = arg.clone();
                if bound.key.is_none() {
                    bound.key = self.named.get(index).cloned();
                }
                bound
            })
            .collect()
    }
}

fn push_aligned(out: &mut String, text: &str, align: Option<i32>) {
    let Some(align) = align else {
        out.push_str(text);
        return;
    };
    let width = (align.unsigned_abs() as usize).min(MAX_ALIGN);
    let pad = width.saturating_sub(text.chars().count());
    if align < 0 {
        out.push_str(text);
        out.extend(std::iter::repeat(' ').take(pad));
    } else {
        out.extend(std::iter::repeat(' ').take(pad));
        out.push_str(text);
    }
}

/// Text form of a single argument value.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => NULL_TEXT.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Renders `template` with `args`. A missing template renders as "".
pub fn render(template: Option<&str>, args: &[LogArg]) -> String {
    match template {
        Some(template) => MessageTemplate::parse(template).render(args),
        None => String::new(),
    }
}

/// Renders and binds in one parse.
pub fn render_and_bind(template: Option<&str>, args: &[LogArg]) -> (String, Vec<LogArg>) {
    match template {
        Some(template) => {
            let parsed = MessageTemplate::parse(template);
            (parsed.render(args), parsed.bind(args))
        }
        None => (String::new(), args.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[i64]) -> Vec<LogArg> {
        values.iter().map(|v| LogArg::new(*v)).collect()
    }

    #[test]
    fn positional_placeholders() {
        assert_eq!(render(Some("{0}-{1}"), &args(&[10, 20])), "10-20");
        assert_eq!(render(Some("{1}{0}{1}"), &args(&[1, 2])), "212");
    }

    #[test]
    fn missing_placeholder_is_preserved() {
        assert_eq!(render(Some("{missing}"), &[]), "{missing}");
        assert_eq!(render(Some("{0} {1}"), &args(&[5])), "5 {1}");
    }

    #[test]
    fn named_placeholders_bind_in_order_of_appearance() {
        let text = render(Some("Does this line get hit? {h} {b}"), &args(&[100, 200]));
        assert_eq!(text, "Does this line get hit? 100 200");

        // repeated names reuse the same argument
        assert_eq!(render(Some("{a} {b} {a}"), &args(&[1, 2])), "1 2 1");
    }

    #[test]
    fn keyed_arguments_win_over_order() {
        let supplied = vec![LogArg::named("b", 2), LogArg::named("a", 1)];
        assert_eq!(render(Some("{a}/{b}"), &supplied), "1/2");

        // a keyed argument in a slot does not bind by position to another name
        let supplied = vec![LogArg::named("other", 9)];
        assert_eq!(render(Some("{a}"), &supplied), "{a}");
    }

    #[test]
    fn escapes_and_unterminated_braces() {
        assert_eq!(render(Some("{{literal}} {0}"), &args(&[1])), "{literal} 1");
        assert_eq!(render(Some("open { brace"), &[]), "open { brace");
        assert_eq!(render(Some("dangling {0"), &args(&[1])), "dangling {0");
        assert_eq!(render(Some("stray } here"), &[]), "stray } here");
        assert_eq!(render(Some("{a{0}"), &args(&[7])), "{a7");
        assert_eq!(render(Some("{}"), &args(&[7])), "{}");
    }

    #[test]
    fn null_and_non_string_values() {
        let supplied = vec![
            LogArg::null(),
            LogArg::new("text"),
            LogArg::new(true),
            LogArg::new(serde_json::json!({"k": 1})),
        ];
        assert_eq!(
            render(Some("{0}|{1}|{2}|{3}"), &supplied),
            "(null)|text|true|{\"k\":1}"
        );
    }

    #[test]
    fn missing_template_renders_empty() {
        assert_eq!(render(None, &args(&[1, 2])), "");
    }

    #[test]
    fn alignment_and_format_hint() {
        assert_eq!(render(Some("[{0,5}]"), &args(&[42])), "[   42]");
        assert_eq!(render(Some("[{0,-5}]"), &args(&[42])), "[42   ]");
        assert_eq!(render(Some("[{count:D3}]"), &args(&[42])), "[42]");
    }

    #[test]
    fn oversized_alignment_is_capped() {
        let text = render(Some("{0,1000000000}"), &args(&[1]));
        assert_eq!(text.len(), MAX_ALIGN);
        assert!(text.ends_with(" 1"));

        let text = render(Some("{0,-2147483648}|"), &args(&[1]));
        assert_eq!(text.len(), MAX_ALIGN + 1);
        assert!(text.starts_with("1 "));
    }

    #[test]
    fn multibyte_text_survives() {
        assert_eq!(render(Some("héllo {0} wörld"), &args(&[1])), "héllo 1 wörld");
    }

    #[test]
    fn bind_fills_keys_from_template() {
        let (text, bound) = render_and_bind(Some("hit? {c} {d}"), &args(&[100, 200]));
        assert_eq!(text, "hit? 100 200");
        assert_eq!(bound[0].key.as_deref(), Some("c"));
        assert_eq!(bound[1].key.as_deref(), Some("d"));

        let parsed = MessageTemplate::parse("{x} {0} {y} {x}");
        assert_eq!(parsed.placeholder_names(), ["x".to_string(), "y".to_string()]);
    }
}
