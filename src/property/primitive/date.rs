//! Date keys.
//!
//! `DateProperty` stores epoch milliseconds and hands out `Value::Date`;
//! requests carry formatted strings in the key's pattern, or the global
//! default pattern when the key has none. `ZonedDateTimeProperty` keeps the
//! offset and stores RFC 3339 text.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::context::SecurityContext;
use crate::model::{Value, ValueType};
use crate::object::GraphObject;
use crate::property::base;
use crate::property::config::{impl_builder, PropertyConfig};
use crate::property::converter::PropertyConverter;
use crate::property::date_format;
use crate::property::key::PropertyKey;
use crate::property::sort::SortType;
use crate::Result;

/// Pattern of a key: its own format, else the configured default.
fn pattern<'a>(config: &'a PropertyConfig, ctx: &'a SecurityContext) -> &'a str {
    config.format.as_deref().unwrap_or(&ctx.settings().default_date_format)
}

fn millis_to_date(millis: i64) -> Option<Value> {
    DateTime::from_timestamp_millis(millis).map(Value::Date)
}

/// Any accepted date-like value to a UTC instant.
fn to_instant(config: &PropertyConfig, pattern: &str, value: &Value) -> Result<Option<DateTime<Utc>>> {
    match value {
        Value::Null => Ok(None),
        Value::Date(d) => Ok(Some(*d)),
        Value::ZonedDateTime(d) => Ok(Some(d.with_timezone(&Utc))),
        Value::Int(_) | Value::Long(_) => value
            .as_long()
            .and_then(DateTime::from_timestamp_millis)
            .map(Some)
            .ok_or_else(|| config.date_error(value, pattern)),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => date_format::parse_date_lenient(s, pattern)
            .map(Some)
            .ok_or_else(|| config.date_error(value, pattern)),
        other => Err(config.date_error(other, pattern)),
    }
}

struct DateDatabaseConverter<'a> {
    config: &'a PropertyConfig,
    pattern: &'a str,
}

impl PropertyConverter for DateDatabaseConverter<'_> {
    fn convert(&self, source: Value) -> Result<Value> {
        Ok(to_instant(self.config, self.pattern, &source)?
            .map_or(Value::Null, |d| Value::Long(d.timestamp_millis())))
    }

    fn revert(&self, source: Value) -> Result<Value> {
        match &source {
            Value::Long(_) | Value::Int(_) => source
                .as_long()
                .and_then(millis_to_date)
                .ok_or_else(|| self.config.date_error(&source, self.pattern)),
            _ => Ok(to_instant(self.config, self.pattern, &source)?.map_or(Value::Null, Value::Date)),
        }
    }
}

struct DateInputConverter<'a> {
    config: &'a PropertyConfig,
    pattern: &'a str,
}

impl PropertyConverter for DateInputConverter<'_> {
    fn convert(&self, source: Value) -> Result<Value> {
        Ok(to_instant(self.config, self.pattern, &source)?.map_or(Value::Null, Value::Date))
    }

    fn revert(&self, source: Value) -> Result<Value> {
        Ok(match source {
            Value::Date(d) => Value::String(date_format::format_date(&d, self.pattern)),
            other => other,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DateProperty {
    config: PropertyConfig,
}

impl DateProperty {
    pub fn new(name: impl Into<String>) -> Self {
        Self { config: PropertyConfig::new(name) }
    }
}

impl PropertyKey for DateProperty {
    fn config(&self) -> &PropertyConfig { &self.config }
    fn value_type(&self) -> ValueType { ValueType::Date }
    fn sort_type(&self) -> SortType { SortType::Long }

    fn database_converter<'a>(
        &'a self,
        ctx: &'a SecurityContext,
        _entity: Option<&'a GraphObject>,
    ) -> Option<Box<dyn PropertyConverter + 'a>> {
        Some(Box::new(DateDatabaseConverter { config: &self.config, pattern: pattern(&self.config, ctx) }))
    }

    fn input_converter<'a>(&'a self, ctx: &'a SecurityContext) -> Option<Box<dyn PropertyConverter + 'a>> {
        Some(Box::new(DateInputConverter { config: &self.config, pattern: pattern(&self.config, ctx) }))
    }

    fn accepts_stored(&self, value: &Value) -> bool {
        matches!(value, Value::Long(_))
    }

    fn fix_database_property(&self, ctx: &SecurityContext, entity: Option<&GraphObject>, value: Value) -> Value {
        match to_instant(&self.config, pattern(&self.config, ctx), &value) {
            Ok(instant) => {
                let fixed = instant.map_or(Value::Null, |d| Value::Long(d.timestamp_millis()));
                base::persist_fix(self, ctx, entity, &fixed);
                fixed
            }
            Err(e) => {
                warn!(property = self.json_name(), error = %e, "unable to repair stored date");
                value
            }
        }
    }
}

// ============================================================================
// ZonedDateTime
// ============================================================================

#[derive(Debug, Clone)]
pub struct ZonedDateTimeProperty {
    config: PropertyConfig,
}

impl ZonedDateTimeProperty {
    pub fn new(name: impl Into<String>) -> Self {
        Self { config: PropertyConfig::new(name) }
    }

    fn to_zoned(&self, value: Value) -> Result<Value> {
        match &value {
            Value::Null => Ok(Value::Null),
            Value::ZonedDateTime(_) => Ok(value),
            Value::Date(d) => Ok(Value::ZonedDateTime(d.fixed_offset())),
            Value::Int(_) | Value::Long(_) => value
                .as_long()
                .and_then(DateTime::from_timestamp_millis)
                .map(|d| Value::ZonedDateTime(d.fixed_offset()))
                .ok_or_else(|| self.config.date_error(&value, self.pattern_label())),
            Value::String(s) if s.trim().is_empty() => Ok(Value::Null),
            Value::String(s) => date_format::parse_zoned(s, self.config.format.as_deref())
                .map(Value::ZonedDateTime)
                .ok_or_else(|| self.config.date_error(&value, self.pattern_label())),
            other => Err(self.config.date_error(other, self.pattern_label())),
        }
    }

    fn pattern_label(&self) -> &str {
        self.config.format.as_deref().unwrap_or("RFC 3339")
    }
}

impl PropertyKey for ZonedDateTimeProperty {
    fn config(&self) -> &PropertyConfig { &self.config }
    fn value_type(&self) -> ValueType { ValueType::ZonedDateTime }

    fn database_converter<'a>(
        &'a self,
        _ctx: &'a SecurityContext,
        _entity: Option<&'a GraphObject>,
    ) -> Option<Box<dyn PropertyConverter + 'a>> {
        Some(Box::new(ZonedConverter { key: self, input: false }))
    }

    fn input_converter<'a>(&'a self, _ctx: &'a SecurityContext) -> Option<Box<dyn PropertyConverter + 'a>> {
        Some(Box::new(ZonedConverter { key: self, input: true }))
    }

    fn accepts_stored(&self, value: &Value) -> bool {
        value.is_string()
    }
}

/// Database side stores RFC 3339 text; input side renders the key's format.
struct ZonedConverter<'a> {
    key: &'a ZonedDateTimeProperty,
    input: bool,
}

impl PropertyConverter for ZonedConverter<'_> {
    fn convert(&self, source: Value) -> Result<Value> {
        let zoned = self.key.to_zoned(source)?;
        if self.input {
            return Ok(zoned);
        }
        Ok(match zoned {
            Value::ZonedDateTime(d) => Value::String(date_format::format_zoned(&d, None)),
            other => other,
        })
    }

    fn revert(&self, source: Value) -> Result<Value> {
        if !self.input {
            return self.key.to_zoned(source);
        }
        Ok(match source {
            Value::ZonedDateTime(d) => Value::String(date_format::format_zoned(&d, self.key.config.format.as_deref())),
            other => other,
        })
    }
}

// ============================================================================
// Date[]
// ============================================================================

/// List of dates, stored as a list of epoch milliseconds. Input accepts a
/// list of date strings or one comma-separated string.
#[derive(Debug, Clone)]
pub struct DateArrayProperty {
    config: PropertyConfig,
}

impl DateArrayProperty {
    pub fn new(name: impl Into<String>) -> Self {
        Self { config: PropertyConfig::new(name) }
    }

    fn elements(value: Value) -> Vec<Value> {
        match value {
            Value::String(s) => s
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(Value::from)
                .collect(),
            other => other.into_list(),
        }
    }
}

struct DateListConverter<'a> {
    config: &'a PropertyConfig,
    pattern: &'a str,
    input: bool,
}

impl DateListConverter<'_> {
    fn map(&self, value: Value, f: impl Fn(DateTime<Utc>) -> Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let mut out = Vec::new();
        for element in DateArrayProperty::elements(value) {
            if let Some(instant) = to_instant(self.config, self.pattern, &element)? {
                out.push(f(instant));
            }
        }
        Ok(Value::List(out))
    }
}

impl PropertyConverter for DateListConverter<'_> {
    fn convert(&self, source: Value) -> Result<Value> {
        if self.input {
            self.map(source, Value::Date)
        } else {
            self.map(source, |d| Value::Long(d.timestamp_millis()))
        }
    }

    fn revert(&self, source: Value) -> Result<Value> {
        if self.input {
            let pattern = self.pattern;
            self.map(source, |d| Value::String(date_format::format_date(&d, pattern)))
        } else {
            self.map(source, Value::Date)
        }
    }
}

impl PropertyKey for DateArrayProperty {
    fn config(&self) -> &PropertyConfig { &self.config }
    fn value_type(&self) -> ValueType { ValueType::Array(Box::new(ValueType::Date)) }

    fn database_converter<'a>(
        &'a self,
        ctx: &'a SecurityContext,
        _entity: Option<&'a GraphObject>,
    ) -> Option<Box<dyn PropertyConverter + 'a>> {
        Some(Box::new(DateListConverter { config: &self.config, pattern: pattern(&self.config, ctx), input: false }))
    }

    fn input_converter<'a>(&'a self, ctx: &'a SecurityContext) -> Option<Box<dyn PropertyConverter + 'a>> {
        Some(Box::new(DateListConverter { config: &self.config, pattern: pattern(&self.config, ctx), input: true }))
    }

    fn convert_search_value(&self, ctx: &SecurityContext, raw: &str) -> Result<Value> {
        Ok(to_instant(&self.config, pattern(&self.config, ctx), &Value::from(raw))?.map_or(Value::Null, Value::Date))
    }

    fn accepts_stored(&self, value: &Value) -> bool {
        matches!(value, Value::List(items) if items.iter().all(|v| matches!(v, Value::Long(_))))
    }
}

impl_builder!(DateProperty, ZonedDateTimeProperty, DateArrayProperty);

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::context::Services;
    use crate::property::PropertyBuilder;
    use crate::Error;

    fn ctx() -> SecurityContext {
        SecurityContext::super_user(Services::builder().build())
    }

    #[test]
    fn test_formatted_string_to_millis() {
        let ctx = ctx();
        let key = DateProperty::new("due").with_format("yyyy-MM-dd");
        let logical = key.input_converter(&ctx).unwrap().convert(Value::from("2024-01-15")).unwrap();
        let stored = key.database_converter(&ctx, None).unwrap().convert(logical.clone()).unwrap();
        assert_eq!(stored, Value::Long(1_705_276_800_000));

        let back = key.database_converter(&ctx, None).unwrap().revert(stored).unwrap();
        assert_eq!(back, logical);
        let output = key.input_converter(&ctx).unwrap().revert(back).unwrap();
        assert_eq!(output, Value::from("2024-01-15"));
    }

    #[test]
    fn test_millis_and_temporal_inputs() {
        let ctx = ctx();
        let key = DateProperty::new("at");
        let conv = key.input_converter(&ctx).unwrap();
        let expected = Value::Date(Utc.timestamp_millis_opt(1000).unwrap());
        assert_eq!(conv.convert(Value::Long(1000)).unwrap(), expected);
        assert_eq!(conv.convert(expected.clone()).unwrap(), expected);
        assert_eq!(conv.convert(Value::from("")).unwrap(), Value::Null);
    }

    #[test]
    fn test_unparseable_date_names_property() {
        let ctx = ctx();
        let key = DateProperty::new("due").declared_by("Task").with_format("yyyy-MM-dd");
        let err = key.input_converter(&ctx).unwrap().convert(Value::from("yesterday")).unwrap_err();
        match err {
            Error::DateFormat { declaring_type, property, format, .. } => {
                assert_eq!(declaring_type, "Task");
                assert_eq!(property, "due");
                assert_eq!(format, "yyyy-MM-dd");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_zoned_keeps_offset() {
        let ctx = ctx();
        let key = ZonedDateTimeProperty::new("meeting");
        let logical = key.input_converter(&ctx).unwrap().convert(Value::from("2024-05-01T09:30:00+02:00")).unwrap();
        let stored = key.database_converter(&ctx, None).unwrap().convert(logical.clone()).unwrap();
        assert_eq!(stored, Value::from("2024-05-01T09:30:00+02:00"));
        assert_eq!(key.database_converter(&ctx, None).unwrap().revert(stored).unwrap(), logical);
    }

    #[test]
    fn test_date_array_from_comma_string() {
        let ctx = ctx();
        let key = DateArrayProperty::new("holidays").with_format("yyyy-MM-dd");
        let logical = key.input_converter(&ctx).unwrap().convert(Value::from("2024-01-01, 2024-12-25")).unwrap();
        let stored = key.database_converter(&ctx, None).unwrap().convert(logical).unwrap();
        assert_eq!(stored, Value::List(vec![Value::Long(1_704_067_200_000), Value::Long(1_735_084_800_000)]));
    }
}
