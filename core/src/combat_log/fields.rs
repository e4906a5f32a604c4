//! Typed conversion of raw record fields.
//!
//! Events read their fields front to back through a [`FieldCursor`]. Every
//! conversion names the field it is reading so a failure can be reported as
//! `TAG: field 'name': ...` on the resulting error stub.

use chrono::{DateTime, NaiveDateTime, TimeDelta};
use memchr::memchr;

use super::enums::LogEnum;
use super::error::FieldError;

/// Current and maximum value of a unit resource, written as `current/max`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Resource {
    pub current: i64,
    pub max: i64,
}

impl Resource {
    pub fn is_empty(&self) -> bool {
        self.current <= 0
    }

    pub fn fraction(&self) -> f64 {
        if self.max <= 0 {
            0.0
        } else {
            self.current as f64 / self.max as f64
        }
    }
}

pub struct FieldCursor<'a> {
    fields: &'a [Option<String>],
    pos: usize,
}

impl<'a> FieldCursor<'a> {
    pub fn new(fields: &'a [Option<String>]) -> Self {
        Self { fields, pos: 0 }
    }

    /// Fields not consumed yet.
    pub fn remaining(&self) -> &'a [Option<String>] {
        self.fields.get(self.pos..).unwrap_or(&[])
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.fields.len()
    }

    /// The next field without consuming it. Null fields read as `None`.
    pub fn peek(&self) -> Option<&'a str> {
        self.fields.get(self.pos).and_then(|f| f.as_deref())
    }

    fn advance(&mut self) -> Option<&'a str> {
        let field = self.fields.get(self.pos).and_then(|f| f.as_deref());
        self.pos += 1;
        field
    }

    fn required(&mut self, name: &'static str) -> Result<&'a str, FieldError> {
        self.advance().ok_or(FieldError::Missing(name))
    }

    /// Text field. Null reads as the empty string.
    pub fn text(&mut self, name: &'static str) -> Result<String, FieldError> {
        if self.pos >= self.fields.len() {
            return Err(FieldError::Missing(name));
        }
        Ok(self.advance().unwrap_or_default().to_string())
    }

    /// Optional text field. Null or absent reads as `None`.
    pub fn opt_text(&mut self) -> Option<String> {
        self.advance().map(str::to_string)
    }

    pub fn int(&mut self, name: &'static str) -> Result<i64, FieldError> {
        parse_int(name, self.required(name)?)
    }

    /// Optional integer. Null or absent reads as `None`.
    pub fn opt_int(&mut self, name: &'static str) -> Result<Option<i64>, FieldError> {
        self.advance().map(|v| parse_int(name, v)).transpose()
    }

    /// `T` or `F`.
    pub fn flag(&mut self, name: &'static str) -> Result<bool, FieldError> {
        parse_flag(name, self.required(name)?)
    }

    pub fn resource(&mut self, name: &'static str) -> Result<Resource, FieldError> {
        let raw = self.required(name)?;
        let invalid = || FieldError::InvalidResource {
            field: name,
            value: raw.to_string(),
        };
        let (current, max) = raw.split_once('/').ok_or_else(invalid)?;
        Ok(Resource {
            current: current.trim().parse().map_err(|_| invalid())?,
            max: max.trim().parse().map_err(|_| invalid())?,
        })
    }

    pub fn enumeration<E: LogEnum>(&mut self, name: &'static str) -> Result<E, FieldError> {
        let raw = self.required(name)?;
        E::from_code(raw).ok_or_else(|| FieldError::UnknownVariant {
            field: name,
            kind: E::KIND,
            value: raw.to_string(),
        })
    }

    /// Millisecond duration.
    pub fn millis(&mut self, name: &'static str) -> Result<TimeDelta, FieldError> {
        let ms = self.int(name)?;
        TimeDelta::try_milliseconds(ms).ok_or_else(|| FieldError::InvalidInteger {
            field: name,
            value: ms.to_string(),
        })
    }

    /// Milliseconds since the Unix epoch.
    pub fn epoch_millis(&mut self, name: &'static str) -> Result<NaiveDateTime, FieldError> {
        let raw = self.required(name)?;
        let ms = parse_int(name, raw)?;
        DateTime::from_timestamp_millis(ms)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| FieldError::InvalidTimestamp {
                field: name,
                value: raw.to_string(),
            })
    }

    /// Re-join every remaining field with commas.
    ///
    /// Bracketed lists are written unquoted, so the tokenizer splits them at
    /// every comma. Joining restores the original text for bracket parsing.
    pub fn join_rest(&mut self) -> String {
        let joined = self
            .remaining()
            .iter()
            .map(|f| f.as_deref().unwrap_or_default())
            .collect::<Vec<_>>()
            .join(",");
        self.pos = self.fields.len();
        joined
    }

    /// Consume everything left as opaque trailing data.
    pub fn into_rest(self) -> Vec<String> {
        self.remaining()
            .iter()
            .map(|f| f.clone().unwrap_or_default())
            .collect()
    }
}

fn parse_int(name: &'static str, raw: &str) -> Result<i64, FieldError> {
    raw.trim().parse().map_err(|_| FieldError::InvalidInteger {
        field: name,
        value: raw.to_string(),
    })
}

fn parse_flag(name: &'static str, raw: &str) -> Result<bool, FieldError> {
    match raw.trim() {
        "T" => Ok(true),
        "F" => Ok(false),
        other => Err(FieldError::InvalidBoolean {
            field: name,
            value: other.to_string(),
        }),
    }
}

/// Integers of a bracketed list. Empty items are skipped.
pub fn int_items(group: &str, name: &'static str) -> Result<Vec<i64>, FieldError> {
    bracket_items(group, name)?
        .into_iter()
        .map(|item| parse_int(name, item))
        .collect()
}

/// Bracketed list of bracketed lists, e.g. `[[a,b],[c,d]]`.
pub fn nested_items(group: &str, name: &'static str) -> Result<Vec<Vec<String>>, FieldError> {
    bracket_items(group, name)?
        .into_iter()
        .map(|inner| {
            bracket_items(inner, name).map(|items| items.into_iter().map(str::to_string).collect())
        })
        .collect()
}

/// Split a single bracketed list into its top-level items.
///
/// Commas inside nested brackets do not split. Empty items are skipped, so
/// `[]` yields nothing.
pub fn bracket_items<'s>(raw: &'s str, name: &'static str) -> Result<Vec<&'s str>, FieldError> {
    let unbalanced = FieldError::UnbalancedBrackets { field: name };
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| unbalanced.clone())?;

    let bytes = inner.as_bytes();
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'[' => depth += 1,
            b']' => depth = depth.checked_sub(1).ok_or_else(|| unbalanced.clone())?,
            b',' if depth == 0 => {
                push_item(&mut items, &inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(unbalanced);
    }
    push_item(&mut items, &inner[start..]);
    Ok(items)
}

fn push_item<'s>(items: &mut Vec<&'s str>, item: &'s str) {
    let item = item.trim();
    if !item.is_empty() {
        items.push(item);
    }
}

/// Split a field holding several adjacent top-level groups, e.g. `[1,2][3]`.
pub fn bracket_groups<'s>(raw: &'s str, name: &'static str) -> Result<Vec<&'s str>, FieldError> {
    let unbalanced = FieldError::UnbalancedBrackets { field: name };
    let bytes = raw.as_bytes();
    let mut groups = Vec::new();
    let mut pos = 0;
    while let Some(open) = memchr(b'[', &bytes[pos..]) {
        let start = pos + open;
        let mut depth = 0usize;
        let mut end = None;
        for (i, &b) in bytes[start..].iter().enumerate() {
            match b {
                b'[' => depth += 1,
                b']' => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(start + i);
                        break;
                    }
                }
                _ => {}
            }
        }
        let end = end.ok_or_else(|| unbalanced.clone())?;
        groups.push(&raw[start..=end]);
        pos = end + 1;
    }
    Ok(groups)
}
