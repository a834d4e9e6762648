//! The `#Want;...;end` string form.
//!
//! Each property is `name=value;`. Parameters are `<sig>.<key>=<value>;` where
//! `sig` is a one-letter type signature, or `A` followed by an element
//! signature for arrays. `\`, `=` and `;` inside names and values are escaped.

use super::ParamValue;
use super::Want;
use super::WantParams;

const WANT_HEADER: &str = "#Want;";
const WANT_END: &str = "end";

const SIG_STRING: char = 'S';
const SIG_BOOLEAN: char = 'Z';
const SIG_BYTE: char = 'b';
const SIG_CHAR: char = 'C';
const SIG_SHORT: char = 's';
const SIG_INT: char = 'I';
const SIG_LONG: char = 'L';
const SIG_FLOAT: char = 'F';
const SIG_DOUBLE: char = 'D';
const SIG_ARRAY: char = 'A';

impl Want {
    /// Renders this want as a string. String arrays and nested bags have no
    /// string form and are left out.
    pub fn to_uri(&self) -> String {
        let mut out = String::from(WANT_HEADER);
        let mut prop = |name: &str, value: &str| {
            if !value.is_empty() {
                out.push_str(name);
                out.push('=');
                out.push_str(&encode(value));
                out.push(';');
            }
        };

        prop("action", &self.action);
        prop("uri", &self.uri);
        for entity in &self.entities {
            prop("entity", entity);
        }
        if self.flags != 0 {
            prop("flag", &format!("{:#010x}", self.flags));
        }
        prop("device", &self.element.device_id);
        prop("bundle", &self.element.bundle_name);
        prop("ability", &self.element.ability_name);

        for (key, value) in self.params.iter() {
            if let Some((sig, text)) = param_to_string(value) {
                out.push_str(&sig);
                out.push('.');
                out.push_str(&encode(key));
                out.push('=');
                out.push_str(&encode(&text));
                out.push(';');
            }
        }

        out.push_str(WANT_END);
        out
    }

    /// Parses the string form produced by [`to_uri`](Self::to_uri).
    ///
    /// Returns `None` for a missing header or tail, a property without `=`, a
    /// malformed flag, or a parameter value that does not parse as its signature.
    /// Unknown properties are ignored.
    pub fn parse_uri(s: &str) -> Option<Want> {
        let body = s.strip_prefix(WANT_HEADER)?;
        let body = if body == WANT_END { "" } else { body.strip_suffix(";end")? };

        let mut want = Want::new();
        for content in body.split(';') {
            if content.is_empty() || content.starts_with('=') {
                continue;
            }
            let (prop, value) = content.split_once('=')?;
            let (prop, value) = (decode(prop), decode(value));
            if value.is_empty() {
                continue;
            }
            match prop.as_str() {
                "action" => {
                    want.set_action(value);
                }
                "uri" => {
                    want.set_uri(value);
                }
                "entity" => {
                    want.add_entity(value);
                }
                "flag" => {
                    want.set_flags(parse_flag(&value)?);
                }
                "device" => want.element.device_id = value,
                "bundle" => want.element.bundle_name = value,
                "ability" => want.element.ability_name = value,
                _ => parse_param(&mut want.params, &prop, &value)?,
            }
        }
        Some(want)
    }
}

fn encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '=' => out.push_str("\\075"),
            ';' => out.push_str("\\073"),
            c => out.push(c),
        }
    }
    out
}

fn decode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];
        if tail.is_empty() {
            out.push('\\');
            rest = tail;
        } else if let Some(after) = tail.strip_prefix('\\') {
            out.push('\\');
            rest = after;
        } else if let Some(after) = tail.strip_prefix("075") {
            out.push('=');
            rest = after;
        } else if let Some(after) = tail.strip_prefix("073") {
            out.push(';');
            rest = after;
        } else {
            // Not an escape: keep the backslash, the next char is copied as-is.
            out.push('\\');
            rest = tail;
        }
    }
    out.push_str(rest);
    out
}

fn parse_flag(s: &str) -> Option<u32> {
    let lower = s.to_ascii_lowercase();
    let digits = lower.strip_prefix("0x")?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}

/// Signature and text for a parameter, or `None` if it has no string form.
fn param_to_string(value: &ParamValue) -> Option<(String, String)> {
    fn join<T: ToString>(items: &[T]) -> String {
        let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
        format!("{{{}}}", parts.join(","))
    }
    fn array(sig: char, body: String) -> Option<(String, String)> {
        Some((format!("{}{}", SIG_ARRAY, sig), body))
    }

    match value {
        ParamValue::String(v) => Some((SIG_STRING.to_string(), v.clone())),
        ParamValue::Bool(v) => Some((SIG_BOOLEAN.to_string(), v.to_string())),
        ParamValue::Byte(v) => Some((SIG_BYTE.to_string(), v.to_string())),
        ParamValue::Char(v) => Some((SIG_CHAR.to_string(), v.to_string())),
        ParamValue::Short(v) => Some((SIG_SHORT.to_string(), v.to_string())),
        ParamValue::Int(v) => Some((SIG_INT.to_string(), v.to_string())),
        ParamValue::Long(v) => Some((SIG_LONG.to_string(), v.to_string())),
        ParamValue::Float(v) => Some((SIG_FLOAT.to_string(), v.to_string())),
        ParamValue::Double(v) => Some((SIG_DOUBLE.to_string(), v.to_string())),
        ParamValue::BoolArray(v) => array(SIG_BOOLEAN, join(v)),
        ParamValue::ByteArray(v) => array(SIG_BYTE, join(v)),
        // Chars go out as code points so `,` and `}` need no escaping.
        ParamValue::CharArray(v) => {
            let codes: Vec<u32> = v.iter().map(|c| *c as u32).collect();
            array(SIG_CHAR, join(&codes))
        }
        ParamValue::ShortArray(v) => array(SIG_SHORT, join(v)),
        ParamValue::IntArray(v) => array(SIG_INT, join(v)),
        ParamValue::LongArray(v) => array(SIG_LONG, join(v)),
        ParamValue::FloatArray(v) => array(SIG_FLOAT, join(v)),
        ParamValue::DoubleArray(v) => array(SIG_DOUBLE, join(v)),
        ParamValue::StringArray(_) | ParamValue::Params(_) => None,
    }
}

/// Parses `<sig>.<key>` / `value` into `params`. Props without a signature
/// prefix are skipped.
fn parse_param(params: &mut WantParams, prop: &str, value: &str) -> Option<()> {
    let Some((sig, key)) = prop.split_once('.') else {
        return Some(());
    };
    if key.is_empty() {
        return Some(());
    }
    let mut sig = sig.chars();
    let parsed = match (sig.next(), sig.next(), sig.next()) {
        (Some(SIG_ARRAY), Some(elem), None) => parse_array(elem, value)?,
        (Some(s), None, None) => match parse_scalar(s, value) {
            Some(v) => v,
            None if is_known(s) => return None,
            None => return Some(()),
        },
        _ => return Some(()),
    };
    params.set(key, parsed);
    Some(())
}

fn is_known(sig: char) -> bool {
    matches!(
        sig,
        SIG_STRING | SIG_BOOLEAN | SIG_BYTE | SIG_CHAR | SIG_SHORT | SIG_INT | SIG_LONG | SIG_FLOAT
            | SIG_DOUBLE
    )
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn parse_scalar(sig: char, value: &str) -> Option<ParamValue> {
    Some(match sig {
        SIG_STRING => ParamValue::String(value.to_string()),
        SIG_BOOLEAN => ParamValue::Bool(parse_bool(value)?),
        SIG_BYTE => ParamValue::Byte(value.parse().ok()?),
        SIG_CHAR => {
            let mut chars = value.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => ParamValue::Char(c),
                _ => return None,
            }
        }
        SIG_SHORT => ParamValue::Short(value.parse().ok()?),
        SIG_INT => ParamValue::Int(value.parse().ok()?),
        SIG_LONG => ParamValue::Long(value.parse().ok()?),
        SIG_FLOAT => ParamValue::Float(value.parse().ok()?),
        SIG_DOUBLE => ParamValue::Double(value.parse().ok()?),
        _ => return None,
    })
}

fn parse_array(elem: char, value: &str) -> Option<ParamValue> {
    let inner = value.strip_prefix('{')?.strip_suffix('}')?;
    let items: Vec<&str> = if inner.is_empty() { Vec::new() } else { inner.split(',').collect() };

    fn all<T: std::str::FromStr>(items: &[&str]) -> Option<Vec<T>> {
        items.iter().map(|s| s.parse().ok()).collect()
    }

    Some(match elem {
        SIG_BOOLEAN => {
            ParamValue::BoolArray(items.iter().map(|s| parse_bool(s)).collect::<Option<_>>()?)
        }
        SIG_BYTE => ParamValue::ByteArray(all(&items)?),
        SIG_CHAR => ParamValue::CharArray(
            all::<u32>(&items)?.into_iter().map(char::from_u32).collect::<Option<_>>()?,
        ),
        SIG_SHORT => ParamValue::ShortArray(all(&items)?),
        SIG_INT => ParamValue::IntArray(all(&items)?),
        SIG_LONG => ParamValue::LongArray(all(&items)?),
        SIG_FLOAT => ParamValue::FloatArray(all(&items)?),
        SIG_DOUBLE => ParamValue::DoubleArray(all(&items)?),
        _ => return None,
    })
}
