//! The indented text dump format.
//!
//! ```text
//! 0 MonoBehaviour Base
//!  1 string m_Name = "Hud"
//!  0 vector m_Values
//!   0 Array Array (2 items)
//!    0 int size = 2
//!    [0]
//!     0 float data = 1.5
//!    [1]
//!     0 float data = -0.25
//! ```
//!
//! Each line is `<depth spaces><align flag> <type> <name>`, followed by
//! ` = <value>` for leaves or ` (<n> items)` for arrays.

use std::fmt::Write as _;

use super::field::{Field, FieldValue, Primitive};
use crate::{Error, Result};

/// Type names containing a space; any other type name is one word.
const MULTI_WORD_TYPES: &[&str] = &[
    "unsigned long long",
    "unsigned short",
    "unsigned int",
    "long long",
    "Generic Mono",
];

/// Deepest field nesting accepted when parsing, matching `serde_json`.
const MAX_DEPTH: usize = 128;

/// Renders a field tree as text.
pub(crate) fn to_text(field: &Field) -> String {
    let mut out = String::new();
    write_field(field, 0, &mut out);
    out
}

fn line_head(field: &Field, depth: usize, out: &mut String) {
    let _ = write!(
        out,
        "{:depth$}{} {} {}",
        "",
        u8::from(field.aligned),
        field.type_name,
        field.name,
        depth = depth
    );
}

fn write_field(field: &Field, depth: usize, out: &mut String) {
    line_head(field, depth, out);
    match &field.value {
        FieldValue::Struct(children) => {
            out.push('\n');
            for child in children {
                write_field(child, depth + 1, out);
            }
        }
        FieldValue::Array(items) => {
            let _ = writeln!(out, " ({} items)", items.len());
            write_size(items.len(), depth + 1, out);
            for (i, item) in items.iter().enumerate() {
                let _ = writeln!(out, "{:depth$}[{}]", "", i, depth = depth + 1);
                write_field(item, depth + 2, out);
            }
        }
        FieldValue::Bytes(bytes) => {
            let _ = writeln!(out, " ({} items)", bytes.len());
            write_size(bytes.len(), depth + 1, out);
            for (i, byte) in bytes.iter().enumerate() {
                let _ = writeln!(out, "{:depth$}[{}]", "", i, depth = depth + 1);
                let _ = writeln!(out, "{:depth$}0 UInt8 data = {}", "", byte, depth = depth + 2);
            }
        }
        value => {
            out.push_str(" = ");
            write_scalar(value, out);
            out.push('\n');
        }
    }
}

fn write_size(len: usize, depth: usize, out: &mut String) {
    let _ = writeln!(out, "{:depth$}0 int size = {}", "", len, depth = depth);
}

fn write_scalar(value: &FieldValue, out: &mut String) {
    let _ = match value {
        FieldValue::Bool(v) => write!(out, "{}", v),
        FieldValue::SInt8(v) => write!(out, "{}", v),
        FieldValue::UInt8(v) => write!(out, "{}", v),
        FieldValue::SInt16(v) => write!(out, "{}", v),
        FieldValue::UInt16(v) => write!(out, "{}", v),
        FieldValue::SInt32(v) => write!(out, "{}", v),
        FieldValue::UInt32(v) => write!(out, "{}", v),
        FieldValue::SInt64(v) => write!(out, "{}", v),
        FieldValue::UInt64(v) => write!(out, "{}", v),
        FieldValue::Float(v) => write!(out, "{}", v),
        FieldValue::Double(v) => write!(out, "{}", v),
        FieldValue::String(s) => {
            out.push('"');
            for c in s.chars() {
                match c {
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\t' => out.push_str("\\t"),
                    '"' => out.push_str("\\\""),
                    c => out.push(c),
                }
            }
            out.push('"');
            Ok(())
        }
        FieldValue::Bytes(_) | FieldValue::Array(_) | FieldValue::Struct(_) => Ok(()),
    };
}

struct Line<'a> {
    number: usize,
    depth: usize,
    text: &'a str,
}

/// Parses a text dump back into a field tree.
pub(crate) fn from_text(text: &str) -> Result<Field> {
    let lines: Vec<Line<'_>> = text
        .lines()
        .enumerate()
        .map(|(i, raw)| {
            let raw = raw.trim_end_matches('\r');
            let body = raw.trim_start_matches(' ');
            Line {
                number: i + 1,
                depth: raw.len() - body.len(),
                text: body,
            }
        })
        .filter(|l| !l.text.is_empty())
        .collect();

    let mut parser = Parser { lines, pos: 0 };
    let root = parser
        .lines
        .first()
        .map(|l| l.depth)
        .ok_or_else(|| Error::Deserialize("empty dump".into()))?;
    let field = parser.field(root, 0)?;
    if let Some(extra) = parser.lines.get(parser.pos) {
        return Err(parse_error(extra.number, "unexpected line after root field"));
    }
    Ok(field)
}

struct Parser<'a> {
    lines: Vec<Line<'a>>,
    pos: usize,
}

impl Parser<'_> {
    fn peek_depth(&self) -> Option<usize> {
        self.lines.get(self.pos).map(|l| l.depth)
    }

    fn field(&mut self, depth: usize, level: usize) -> Result<Field> {
        let line = self
            .lines
            .get(self.pos)
            .ok_or_else(|| parse_error(0, "unexpected end of dump"))?;
        let number = line.number;
        if level > MAX_DEPTH {
            return Err(parse_error(
                number,
                format!("fields nested deeper than {}", MAX_DEPTH),
            ));
        }
        if line.depth != depth {
            return Err(parse_error(
                number,
                format!("expected indentation {}, found {}", depth, line.depth),
            ));
        }
        let head = parse_head(line.text).map_err(|reason| parse_error(number, reason))?;
        self.pos += 1;

        let value = match head.rest {
            Rest::Value(raw) => parse_scalar(&head.type_name, raw)
                .map_err(|reason| parse_error(number, reason))?,
            Rest::Items(count) => self.array(&head.type_name, count, depth, level, number)?,
            Rest::None => {
                let mut children = Vec::new();
                while self.peek_depth().is_some_and(|d| d > depth) {
                    children.push(self.field(depth + 1, level + 1)?);
                }
                FieldValue::Struct(children)
            }
        };
        Ok(Field {
            name: head.name,
            type_name: head.type_name,
            aligned: head.aligned,
            value,
        })
    }

    fn array(
        &mut self,
        type_name: &str,
        count: usize,
        depth: usize,
        level: usize,
        number: usize,
    ) -> Result<FieldValue> {
        let size = self.field(depth + 1, level + 1)?;
        if size.as_i64() != Some(count as i64) {
            return Err(parse_error(
                number,
                format!("array size does not match its {} items", count),
            ));
        }

        // Each element takes at least a marker line and a field line.
        let remaining = self.lines.len() - self.pos;
        if count > remaining / 2 {
            return Err(parse_error(
                number,
                format!("array of {} items but only {} lines remain", count, remaining),
            ));
        }
        let mut items = Vec::with_capacity(count);
        for i in 0..count {
            let marker = self
                .lines
                .get(self.pos)
                .ok_or_else(|| parse_error(number, format!("missing element [{}]", i)))?;
            let expected = format!("[{}]", i);
            if marker.depth != depth + 1 || marker.text != expected {
                return Err(parse_error(
                    marker.number,
                    format!("expected element marker {}", expected),
                ));
            }
            self.pos += 1;
            items.push(self.field(depth + 2, level + 1)?);
        }

        let all_bytes = items.iter().all(|f| matches!(f.value, FieldValue::UInt8(_)));
        if type_name == "TypelessData" || (!items.is_empty() && all_bytes) {
            let bytes = items
                .iter()
                .map(|f| match f.value {
                    FieldValue::UInt8(b) => Ok(b),
                    _ => Err(parse_error(number, "TypelessData holds non-byte elements")),
                })
                .collect::<Result<Vec<u8>>>()?;
            return Ok(FieldValue::Bytes(bytes));
        }
        Ok(FieldValue::Array(items))
    }
}

enum Rest<'a> {
    None,
    Value(&'a str),
    Items(usize),
}

struct Head<'a> {
    aligned: bool,
    type_name: String,
    name: String,
    rest: Rest<'a>,
}

fn parse_head(text: &str) -> std::result::Result<Head<'_>, String> {
    let (flag, rest) = text
        .split_once(' ')
        .ok_or_else(|| format!("malformed field line '{}'", text))?;
    let aligned = match flag {
        "0" => false,
        "1" => true,
        other => return Err(format!("alignment flag must be 0 or 1, found '{}'", other)),
    };

    let (decl, tail) = match rest.split_once(" = ") {
        Some((decl, value)) => (decl, Rest::Value(value)),
        None => match items_suffix(rest) {
            Some((decl, count)) => (decl, Rest::Items(count)),
            None => (rest, Rest::None),
        },
    };

    let type_len = MULTI_WORD_TYPES
        .iter()
        .find(|t| decl.starts_with(*t) && decl[t.len()..].starts_with(' '))
        .map(|t| t.len())
        .or_else(|| decl.find(' '))
        .ok_or_else(|| format!("missing field name in '{}'", text))?;
    Ok(Head {
        aligned,
        type_name: decl[..type_len].to_string(),
        name: decl[type_len + 1..].to_string(),
        rest: tail,
    })
}

fn items_suffix(rest: &str) -> Option<(&str, usize)> {
    let body = rest.strip_suffix(" items)")?;
    let open = body.rfind(" (")?;
    let count = body[open + 2..].parse().ok()?;
    Some((&body[..open], count))
}

fn parse_scalar(type_name: &str, raw: &str) -> std::result::Result<FieldValue, String> {
    if type_name == "string" {
        return unquote(raw).map(FieldValue::String);
    }
    let kind = Primitive::from_type_name(type_name)
        .ok_or_else(|| format!("type '{}' cannot hold a value", type_name))?;
    let bad = |e: &dyn std::fmt::Display| format!("invalid {} value '{}': {}", type_name, raw, e);
    Ok(match kind {
        Primitive::Bool => FieldValue::Bool(match raw {
            "true" | "1" => true,
            "false" | "0" => false,
            _ => return Err(format!("invalid bool value '{}'", raw)),
        }),
        Primitive::SInt8 => FieldValue::SInt8(raw.parse().map_err(|e| bad(&e))?),
        Primitive::UInt8 => FieldValue::UInt8(raw.parse().map_err(|e| bad(&e))?),
        Primitive::SInt16 => FieldValue::SInt16(raw.parse().map_err(|e| bad(&e))?),
        Primitive::UInt16 => FieldValue::UInt16(raw.parse().map_err(|e| bad(&e))?),
        Primitive::SInt32 => FieldValue::SInt32(raw.parse().map_err(|e| bad(&e))?),
        Primitive::UInt32 => FieldValue::UInt32(raw.parse().map_err(|e| bad(&e))?),
        Primitive::SInt64 => FieldValue::SInt64(raw.parse().map_err(|e| bad(&e))?),
        Primitive::UInt64 => FieldValue::UInt64(raw.parse().map_err(|e| bad(&e))?),
        Primitive::Float => FieldValue::Float(raw.parse().map_err(|e| bad(&e))?),
        Primitive::Double => FieldValue::Double(raw.parse().map_err(|e| bad(&e))?),
    })
}

fn unquote(raw: &str) -> std::result::Result<String, String> {
    let inner = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| format!("string value must be quoted: {}", raw))?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some(other) => return Err(format!("unknown escape '\\{}'", other)),
            None => return Err("dangling escape at end of string".into()),
        }
    }
    Ok(out)
}

fn parse_error(line: usize, reason: impl std::fmt::Display) -> Error {
    Error::Deserialize(format!("line {}: {}", line, reason))
}

#[cfg(test)]
mod tests {
    use std::fmt::Write as _;

    use super::*;

    fn field(name: &str, type_name: &str, aligned: bool, value: FieldValue) -> Field {
        Field {
            name: name.into(),
            type_name: type_name.into(),
            aligned,
            value,
        }
    }

    fn sample() -> Field {
        field(
            "Base",
            "MonoBehaviour",
            false,
            FieldValue::Struct(vec![
                field(
                    "m_Name",
                    "string",
                    true,
                    FieldValue::String("say \"hi\"\n\tC:\\path = x".into()),
                ),
                field("m_Count", "unsigned int", false, FieldValue::UInt32(7)),
                field(
                    "m_Values",
                    "vector",
                    false,
                    FieldValue::Struct(vec![field(
                        "Array",
                        "Array",
                        false,
                        FieldValue::Array(vec![
                            field("data", "float", false, FieldValue::Float(1.5)),
                            field("data", "float", false, FieldValue::Float(-0.1)),
                        ]),
                    )]),
                ),
                field(
                    "image data",
                    "TypelessData",
                    true,
                    FieldValue::Bytes(vec![0, 255]),
                ),
                field("m_Empty", "Vector3f", false, FieldValue::Struct(Vec::new())),
                field("m_Flag", "bool", true, FieldValue::Bool(false)),
            ]),
        )
    }

    #[test]
    fn test_render_shape() {
        let text = to_text(&sample());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "0 MonoBehaviour Base");
        assert_eq!(lines[1], r#" 1 string m_Name = "say \"hi\"\n\tC:\\path = x""#);
        assert_eq!(lines[2], " 0 unsigned int m_Count = 7");
        assert_eq!(lines[4], "  0 Array Array (2 items)");
        assert_eq!(lines[5], "   0 int size = 2");
        assert_eq!(lines[6], "   [0]");
        assert_eq!(lines[7], "    0 float data = 1.5");
    }

    #[test]
    fn test_parse_rendered() {
        let original = sample();
        let parsed = from_text(&to_text(&original)).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_crlf_accepted() {
        let text = to_text(&sample()).replace('\n', "\r\n");
        assert_eq!(from_text(&text).unwrap(), sample());
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        let text = "0 MonoBehaviour Base\n 0 int m_Count = twelve\n";
        let err = from_text(text).unwrap_err();
        assert!(err.to_string().contains("line 2"), "{}", err);

        assert!(from_text("2 int x = 1").is_err());
        assert!(from_text("0 MonoBehaviour Base\n   0 int deep = 1\n").is_err());
        assert!(from_text("").is_err());
    }

    #[test]
    fn test_oversized_item_count_rejected() {
        let text = "0 Array Array (100000000000000000 items)\n 0 SInt64 size = 100000000000000000\n";
        let err = from_text(text).unwrap_err();
        assert!(err.to_string().contains("line 1"), "{}", err);
    }

    #[test]
    fn test_deep_nesting_rejected() {
        let mut text = String::new();
        for depth in 0..20_000 {
            let _ = writeln!(text, "{:depth$}0 Node Base", "", depth = depth);
        }
        let err = from_text(&text).unwrap_err();
        assert!(err.to_string().contains("nested deeper"), "{}", err);

        let mut shallow = String::new();
        for depth in 0..=MAX_DEPTH {
            let _ = writeln!(shallow, "{:depth$}0 Node Base", "", depth = depth);
        }
        assert!(from_text(&shallow).is_ok());
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let text = "0 Array Array (2 items)\n 0 int size = 1\n [0]\n  0 int data = 1\n";
        assert!(from_text(text).is_err());
    }
}
