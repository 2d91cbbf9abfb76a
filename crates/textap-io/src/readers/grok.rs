//! Grok expressions over the `regex` crate.
//!
//! `%{NAME}` splices in a pattern from the built-in table, `%{NAME:field}`
//! also captures it as `field`, and `%{NAME:field:int}` / `:float` converts the
//! captured text to a number. Anything outside `%{...}` is plain regex.
//! The table is a subset of the stock grok patterns, rewritten without
//! look-around so it compiles under `regex`.

use std::collections::HashMap;

use serde_json::{Number, Value};

use crate::error::{Error, Result};

/// Prefix of the capture groups generated for `%{NAME:field}` references.
pub(crate) const GROUP_PREFIX: &str = "__grok_";

const MAX_DEPTH: usize = 16;

const PATTERNS: &[(&str, &str)] = &[
    ("USERNAME", r"[a-zA-Z0-9._-]+"),
    ("USER", r"%{USERNAME}"),
    ("EMAILLOCALPART", r"[a-zA-Z][a-zA-Z0-9_.+=:-]+"),
    ("EMAILADDRESS", r"%{EMAILLOCALPART}@%{HOSTNAME}"),
    ("INT", r"[+-]?[0-9]+"),
    ("BASE10NUM", r"[+-]?(?:[0-9]+(?:\.[0-9]+)?|\.[0-9]+)"),
    ("NUMBER", r"%{BASE10NUM}"),
    ("BASE16NUM", r"[+-]?(?:0[xX])?[0-9a-fA-F]+"),
    ("POSINT", r"\b[1-9][0-9]*\b"),
    ("NONNEGINT", r"\b[0-9]+\b"),
    ("WORD", r"\b\w+\b"),
    ("NOTSPACE", r"\S+"),
    ("SPACE", r"\s*"),
    ("DATA", r".*?"),
    ("GREEDYDATA", r".*"),
    ("QUOTEDSTRING", r#""(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'"#),
    ("UUID", r"[A-Fa-f0-9]{8}-(?:[A-Fa-f0-9]{4}-){3}[A-Fa-f0-9]{12}"),
    (
        "IPV4",
        r"(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)",
    ),
    ("IPV6", r"(?:[0-9A-Fa-f]{0,4}:){2,7}[0-9A-Fa-f]{0,4}"),
    ("IP", r"%{IPV6}|%{IPV4}"),
    (
        "HOSTNAME",
        r"\b[0-9A-Za-z][0-9A-Za-z-]{0,62}(?:\.[0-9A-Za-z][0-9A-Za-z-]{0,62})*\.?",
    ),
    ("IPORHOST", r"%{IP}|%{HOSTNAME}"),
    ("HOSTPORT", r"%{IPORHOST}:%{POSINT}"),
    ("UNIXPATH", r"(?:/[\w%!$@:.,+~-]*)+"),
    ("PATH", r"%{UNIXPATH}"),
    ("URIPATH", r"(?:/[A-Za-z0-9$.+!*'(){},~:;=@#%&_-]*)+"),
    ("URIPARAM", r"\?[A-Za-z0-9$.+!*'|(){},~@#%&/=:;_?\[\]<>-]*"),
    ("URIPATHPARAM", r"%{URIPATH}(?:%{URIPARAM})?"),
    (
        "MONTH",
        r"\b(?:[Jj]an(?:uary)?|[Ff]eb(?:ruary)?|[Mm]ar(?:ch)?|[Aa]pr(?:il)?|[Mm]ay|[Jj]un(?:e)?|[Jj]ul(?:y)?|[Aa]ug(?:ust)?|[Ss]ep(?:tember)?|[Oo]ct(?:ober)?|[Nn]ov(?:ember)?|[Dd]ec(?:ember)?)\b",
    ),
    ("MONTHNUM", r"0?[1-9]|1[0-2]"),
    ("MONTHDAY", r"0[1-9]|[12][0-9]|3[01]|[1-9]"),
    (
        "DAY",
        r"Mon(?:day)?|Tue(?:sday)?|Wed(?:nesday)?|Thu(?:rsday)?|Fri(?:day)?|Sat(?:urday)?|Sun(?:day)?",
    ),
    ("YEAR", r"(?:\d\d){1,2}"),
    ("HOUR", r"2[0123]|[01]?[0-9]"),
    ("MINUTE", r"[0-5][0-9]"),
    ("SECOND", r"(?:[0-5]?[0-9]|60)(?:[:.,][0-9]+)?"),
    ("TIME", r"%{HOUR}:%{MINUTE}(?::%{SECOND})?"),
    ("DATE_US", r"%{MONTHNUM}[/-]%{MONTHDAY}[/-]%{YEAR}"),
    ("DATE_EU", r"%{MONTHDAY}[./-]%{MONTHNUM}[./-]%{YEAR}"),
    ("ISO8601_TIMEZONE", r"Z|[+-]%{HOUR}(?::?%{MINUTE})"),
    (
        "TIMESTAMP_ISO8601",
        r"%{YEAR}-%{MONTHNUM}-%{MONTHDAY}[T ]%{HOUR}:?%{MINUTE}(?::?%{SECOND})?(?:%{ISO8601_TIMEZONE})?",
    ),
    ("HTTPDATE", r"%{MONTHDAY}/%{MONTH}/%{YEAR}:%{TIME} %{INT}"),
    ("SYSLOGTIMESTAMP", r"%{MONTH} +%{MONTHDAY} %{TIME}"),
    (
        "LOGLEVEL",
        r"[Aa]lert|ALERT|[Tt]race|TRACE|[Dd]ebug|DEBUG|[Nn]otice|NOTICE|[Ii]nfo(?:rmation)?|INFO(?:RMATION)?|[Ww]arn(?:ing)?|WARN(?:ING)?|[Ee]rr(?:or)?|ERR(?:OR)?|[Cc]rit(?:ical)?|CRIT(?:ICAL)?|[Ff]atal|FATAL|[Ss]evere|SEVERE|EMERG(?:ENCY)?|[Ee]merg(?:ency)?",
    ),
];

/// Type conversion requested by a `%{NAME:field:type}` reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    Int,
    Float,
}

impl Conversion {
    fn parse(s: &str) -> Result<Self> {
        match s {
            "int" => Ok(Conversion::Int),
            "float" => Ok(Conversion::Float),
            other => Err(config_error(format!(
                "unsupported grok conversion '{other}'; use int or float"
            ))),
        }
    }
}

/// A regex capture group that becomes a record field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    pub group: String,
    pub field: String,
    pub conversion: Option<Conversion>,
}

impl Capture {
    pub fn plain(name: &str) -> Self {
        Self {
            group: name.to_string(),
            field: name.to_string(),
            conversion: None,
        }
    }

    /// Captured text as a field value. Text that does not convert stays a string.
    pub fn value(&self, text: &str) -> Value {
        let number = match self.conversion {
            None => None,
            Some(Conversion::Int) => text.parse::<i64>().ok().map(Number::from),
            Some(Conversion::Float) => text.parse::<f64>().ok().and_then(Number::from_f64),
        };
        number.map_or_else(|| Value::String(text.to_string()), Value::Number)
    }
}

/// A grok expression rewritten as plain regex.
#[derive(Debug, Clone)]
pub struct Expansion {
    pub regex: String,
    /// Keyed by generated group name.
    pub captures: HashMap<String, Capture>,
}

pub fn expand(expr: &str) -> Result<Expansion> {
    let mut out = Expansion {
        regex: String::with_capacity(expr.len() * 4),
        captures: HashMap::new(),
    };
    expand_into(expr, 0, &mut out)?;
    Ok(out)
}

fn expand_into(expr: &str, depth: usize, out: &mut Expansion) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(config_error(format!(
            "grok pattern references nest deeper than {MAX_DEPTH} levels"
        )));
    }
    let mut rest = expr;
    while let Some(start) = rest.find("%{") {
        out.regex.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or_else(|| {
            config_error(format!("unclosed grok reference in {:?}", &rest[start..]))
        })?;

        let mut parts = after[..end].splitn(3, ':');
        let name = parts.next().unwrap_or_default();
        let field = parts.next().filter(|f| !f.is_empty());
        let conversion = parts.next().map(Conversion::parse).transpose()?;
        let body = lookup(name)
            .ok_or_else(|| config_error(format!("unknown grok pattern '{name}'")))?;

        match field {
            Some(field) => {
                let group = format!("{GROUP_PREFIX}{}", out.captures.len());
                out.regex.push_str(&format!("(?P<{group}>"));
                out.captures.insert(
                    group.clone(),
                    Capture {
                        group,
                        field: field.to_string(),
                        conversion,
                    },
                );
            }
            None => out.regex.push_str("(?:"),
        }
        expand_into(body, depth + 1, out)?;
        out.regex.push(')');

        rest = &after[end + 1..];
    }
    out.regex.push_str(rest);
    Ok(())
}

fn lookup(name: &str) -> Option<&'static str> {
    PATTERNS
        .iter()
        .find_map(|(n, body)| (*n == name).then_some(*body))
}

fn config_error(msg: String) -> Error {
    textap_core::Error::Config(msg).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;
    use serde_json::json;

    #[test]
    fn every_table_entry_compiles() {
        for (name, _) in PATTERNS {
            let exp = expand(&format!("%{{{name}}}")).unwrap();
            assert!(Regex::new(&exp.regex).is_ok(), "{name}: {}", exp.regex);
        }
    }

    #[test]
    fn named_references_become_captures() {
        let exp = expand("%{IP:client} %{WORD:method} %{NUMBER:bytes:int}").unwrap();
        assert_eq!(exp.captures.len(), 3);
        let fields: Vec<&str> = {
            let mut f: Vec<&str> = exp.captures.values().map(|c| c.field.as_str()).collect();
            f.sort();
            f
        };
        assert_eq!(fields, ["bytes", "client", "method"]);
        let bytes = exp.captures.values().find(|c| c.field == "bytes").unwrap();
        assert_eq!(bytes.conversion, Some(Conversion::Int));
        assert_eq!(bytes.value("512"), json!(512));
        assert_eq!(bytes.value("n/a"), json!("n/a"));
    }

    #[test]
    fn bad_references_are_config_errors() {
        for expr in ["%{NOPE:x}", "%{WORD:x", "%{WORD:x:bool}"] {
            let err = expand(expr).unwrap_err();
            assert!(matches!(err, Error::Core(textap_core::Error::Config(_))), "{expr}");
        }
    }
}
