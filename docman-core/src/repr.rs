//! Size-limited rendering of document data for logs and debug output.
//!
//! Values are rendered as Python-style literals (`{'name': 'value'}`, `True`, `None`)
//! with each piece capped: long strings and scalars keep a head and a tail around a
//! `...`, mappings show their first few keys in sorted order, sequences their first
//! few items, and deep nesting collapses to `{...}` / `[...]`.

use bson::{Bson, Document};
use chrono::{Datelike, Timelike};

const FILL: &str = "...";

/// Limits applied while rendering.
#[derive(Debug, Clone, Copy)]
pub struct ReprLimits {
    pub max_level: usize,
    pub max_dict: usize,
    pub max_list: usize,
    pub max_string: usize,
    pub max_long: usize,
    pub max_other: usize,
}

impl Default for ReprLimits {
    fn default() -> Self {
        Self {
            max_level: 6,
            max_dict: 4,
            max_list: 6,
            max_string: 30,
            max_long: 40,
            max_other: 30,
        }
    }
}

impl ReprLimits {
    pub fn repr_document(&self, document: &Document) -> String {
        self.repr_dict(document, self.max_level)
    }

    pub fn repr_value(&self, value: &Bson) -> String {
        self.repr1(value, self.max_level)
    }

    fn repr1(&self, value: &Bson, level: usize) -> String {
        match value {
            Bson::String(s) => self.repr_str(s),
            Bson::Document(doc) => self.repr_dict(doc, level),
            Bson::Array(items) => self.repr_list(items, level),
            Bson::Int32(i) => elide(&i.to_string(), self.max_long),
            Bson::Int64(i) => elide(&i.to_string(), self.max_long),
            other => elide(&scalar_literal(other), self.max_other),
        }
    }

    fn repr_str(&self, s: &str) -> String {
        let chars: Vec<char> = s.chars().collect();
        let head_only: String = chars.iter().take(self.max_string).collect();
        let literal = string_literal(&head_only);

        if literal.chars().count() <= self.max_string {
            return literal;
        }

        let (i, j) = split(self.max_string);
        let kept: String = chars[..i.min(chars.len())]
            .iter()
            .chain(chars[chars.len().saturating_sub(j)..].iter())
            .collect();

        join_ends(&string_literal(&kept), i, j)
    }

    fn repr_dict(&self, document: &Document, level: usize) -> String {
        if document.is_empty() {
            return "{}".to_string();
        }
        if level == 0 {
            return "{...}".to_string();
        }

        let mut entries: Vec<(&String, &Bson)> = document.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let mut pieces = entries
            .into_iter()
            .take(self.max_dict)
            .map(|(key, value)| format!("{}: {}", self.repr_str(key), self.repr1(value, level - 1)))
            .collect::<Vec<_>>();

        if document.len() > self.max_dict {
            pieces.push(FILL.to_string());
        }

        format!("{{{}}}", pieces.join(", "))
    }

    fn repr_list(&self, items: &[Bson], level: usize) -> String {
        if items.is_empty() {
            return "[]".to_string();
        }
        if level == 0 {
            return "[...]".to_string();
        }

        let mut pieces = items
            .iter()
            .take(self.max_list)
            .map(|item| self.repr1(item, level - 1))
            .collect::<Vec<_>>();

        if items.len() > self.max_list {
            pieces.push(FILL.to_string());
        }

        format!("[{}]", pieces.join(", "))
    }
}

/// Head and tail lengths kept when eliding to `limit` characters.
fn split(limit: usize) -> (usize, usize) {
    let i = limit.saturating_sub(FILL.len()) / 2;
    let j = limit.saturating_sub(FILL.len()).saturating_sub(i);
    (i, j)
}

fn join_ends(s: &str, i: usize, j: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    let head: String = chars[..i.min(chars.len())].iter().collect();
    let tail: String = chars[chars.len().saturating_sub(j)..].iter().collect();
    format!("{}{}{}", head, FILL, tail)
}

fn elide(s: &str, limit: usize) -> String {
    if s.chars().count() <= limit {
        return s.to_string();
    }
    let (i, j) = split(limit);
    join_ends(s, i, j)
}

/// Controls, separators other than the plain space and invisible format characters.
fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    !(c.is_control()
        || c.is_whitespace()
        || matches!(
            c,
            '\u{ad}'
                | '\u{61c}'
                | '\u{180e}'
                | '\u{200b}'..='\u{200f}'
                | '\u{202a}'..='\u{202e}'
                | '\u{2060}'..='\u{2064}'
                | '\u{2066}'..='\u{206f}'
                | '\u{feff}'
        ))
}

fn escape_char(c: char) -> String {
    match c as u32 {
        code @ 0..=0xff => format!("\\x{:02x}", code),
        code @ 0x100..=0xffff => format!("\\u{:04x}", code),
        code => format!("\\U{:08x}", code),
    }
}

/// Quotes `s` the way Python's `repr` does for `str`.
fn string_literal(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);

    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if !is_printable(c) => out.push_str(&escape_char(c)),
            c => out.push(c),
        }
    }
    out.push(quote);

    out
}

fn float_literal(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let abs = f.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        // Python switches to exponent notation with a signed, two-digit exponent
        let formatted = format!("{:e}", f);
        return match formatted.split_once('e') {
            Some((mantissa, exp)) => {
                let (sign, digits) = match exp.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exp),
                };
                format!("{}e{}{:0>2}", mantissa, sign, digits)
            }
            None => formatted,
        };
    }

    if f.fract() == 0.0 {
        format!("{:.1}", f)
    } else {
        f.to_string()
    }
}

fn scalar_literal(value: &Bson) -> String {
    match value {
        Bson::Null | Bson::Undefined => "None".to_string(),
        Bson::Boolean(true) => "True".to_string(),
        Bson::Boolean(false) => "False".to_string(),
        Bson::Double(f) => float_literal(*f),
        Bson::ObjectId(oid) => format!("ObjectId('{}')", oid.to_hex()),
        Bson::DateTime(dt) => {
            let dt = dt.to_chrono();
            let mut parts = vec![
                dt.year().to_string(),
                dt.month().to_string(),
                dt.day().to_string(),
                dt.hour().to_string(),
                dt.minute().to_string(),
            ];
            let micros = dt.nanosecond() / 1_000;
            if dt.second() != 0 || micros != 0 {
                parts.push(dt.second().to_string());
            }
            if micros != 0 {
                parts.push(micros.to_string());
            }

            format!("datetime.datetime({})", parts.join(", "))
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn repr(document: &Document) -> String {
        ReprLimits::default().repr_document(document)
    }

    #[test]
    fn test_short_mapping_is_verbatim() {
        assert_eq!(repr(&doc! { "test": "test" }), "{'test': 'test'}");
        assert_eq!(repr(&doc! {}), "{}");
    }

    #[test]
    fn test_long_string_keeps_head_and_tail() {
        let document = doc! { "test": "test-test-test-test-test-test-test-test-test-test-test-test" };

        assert_eq!(repr(&document), "{'test': 'test-test-te...est-test-test'}");
    }

    #[test]
    fn test_scalars_render_as_python_literals() {
        let document = doc! { "a": true, "b": Bson::Null, "c": 1.0, "d": 42_i64, "e": 0.5 };

        assert_eq!(repr(&document), "{'a': True, 'b': None, 'c': 1.0, 'd': 42, ...}");
    }

    #[test]
    fn test_keys_are_sorted_and_capped() {
        let document = doc! { "e": 5, "d": 4, "c": 3, "b": 2, "a": 1 };

        assert_eq!(repr(&document), "{'a': 1, 'b': 2, 'c': 3, 'd': 4, ...}");
    }

    #[test]
    fn test_lists_are_capped() {
        let document = doc! { "l": [1, 2, 3, 4, 5, 6, 7] };

        assert_eq!(repr(&document), "{'l': [1, 2, 3, 4, 5, 6, ...]}");
    }

    #[test]
    fn test_deep_nesting_collapses() {
        let document = doc! { "a": { "b": { "c": { "d": { "e": { "f": { "g": 1 } } } } } } };

        assert_eq!(
            repr(&document),
            "{'a': {'b': {'c': {'d': {'e': {'f': {...}}}}}}}"
        );
    }

    #[test]
    fn test_string_quoting() {
        assert_eq!(string_literal("it's"), "\"it's\"");
        assert_eq!(string_literal("say \"hi\" it's"), "'say \"hi\" it\\'s'");
        assert_eq!(string_literal("a\nb"), "'a\\nb'");
    }

    #[test]
    fn test_non_printable_characters_are_escaped() {
        assert_eq!(string_literal("a\u{1}b\u{7f}"), "'a\\x01b\\x7f'");
        assert_eq!(string_literal("\u{85}\u{a0}"), "'\\x85\\xa0'");
        assert_eq!(string_literal("zero\u{200b}width"), "'zero\\u200bwidth'");
        assert_eq!(string_literal("\u{2028}\u{feff}"), "'\\u2028\\ufeff'");
        assert_eq!(string_literal("caf\u{e9} \u{1f600}"), "'caf\u{e9} \u{1f600}'");
    }

    #[test]
    fn test_float_literals() {
        assert_eq!(float_literal(2.0), "2.0");
        assert_eq!(float_literal(0.25), "0.25");
        assert_eq!(float_literal(1e16), "1e+16");
        assert_eq!(float_literal(1.5e-7), "1.5e-07");
        assert_eq!(float_literal(f64::NAN), "nan");
    }
}
