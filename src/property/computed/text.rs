//! String composition over sibling keys.

use regex::Regex;

use crate::context::SecurityContext;
use crate::model::{Value, ValueType};
use crate::object::GraphObject;
use crate::property::config::{impl_builder, PropertyConfig};
use crate::property::converter::convert_with;
use crate::property::key::{KeyRef, Predicate, PropertyKey};
use crate::{Error, Result};

use super::{read_only_config, reject_write};

/// Non-null source values joined with a separator.
#[derive(Debug, Clone)]
pub struct ConcatProperty {
    config: PropertyConfig,
    sources: Vec<KeyRef>,
    separator: String,
}

impl ConcatProperty {
    pub fn new(name: impl Into<String>, sources: Vec<KeyRef>, separator: impl Into<String>) -> Self {
        Self { config: read_only_config(name), sources, separator: separator.into() }
    }
}

impl PropertyKey for ConcatProperty {
    fn config(&self) -> &PropertyConfig { &self.config }
    fn value_type(&self) -> ValueType { ValueType::String }

    fn get_property(&self, ctx: &SecurityContext, obj: &GraphObject, _apply: bool, _p: Option<Predicate<'_>>) -> Value {
        let parts: Vec<String> = self
            .sources
            .iter()
            .map(|k| k.get_property(ctx, obj, true, None))
            .filter(|v| !v.is_null())
            .map(|v| v.to_text())
            .collect();
        if parts.is_empty() { Value::Null } else { Value::String(parts.join(&self.separator)) }
    }

    fn set_property(&self, _ctx: &SecurityContext, obj: &GraphObject, _value: Value) -> Result<Option<Value>> {
        reject_write(self, obj)
    }
}

/// Sources rendered through a template such as `{0}-{1}`. Writes parse a
/// combined string with the same template and store each fragment on its
/// source key.
#[derive(Debug, Clone)]
pub struct JoinProperty {
    config: PropertyConfig,
    sources: Vec<KeyRef>,
    template: String,
    tokens: Vec<(String, Option<usize>)>,
    pattern: Regex,
}

/// `(literal, placeholder index)` pairs; the last literal has no index.
fn tokenize(template: &str) -> Result<Vec<(String, Option<usize>)>> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        literal.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| Error::Configuration(format!("unclosed placeholder in template {template:?}")))?;
        let index = after[..close]
            .trim()
            .parse::<usize>()
            .map_err(|_| Error::Configuration(format!("bad placeholder {:?} in template {template:?}", &after[..close])))?;
        tokens.push((std::mem::take(&mut literal), Some(index)));
        rest = &after[close + 1..];
    }
    literal.push_str(rest);
    tokens.push((literal, None));
    Ok(tokens)
}

impl JoinProperty {
    pub fn new(name: impl Into<String>, sources: Vec<KeyRef>, template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        let tokens = tokenize(&template)?;
        let mut regex = String::from("^");
        for (literal, index) in &tokens {
            regex.push_str(&regex::escape(literal));
            if let Some(i) = *index {
                if i >= sources.len() {
                    return Err(Error::Configuration(format!("placeholder {{{i}}} has no source key")));
                }
                regex.push_str(&format!("(?P<p{i}>.*?)"));
            }
        }
        regex.push('$');
        let pattern = Regex::new(&regex).map_err(|e| Error::Configuration(e.to_string()))?;
        Ok(Self { config: PropertyConfig::new(name), sources, template, tokens, pattern })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Single pass over the template so braces inside a value stay literal.
    fn render(&self, values: &[Value]) -> String {
        let mut out = String::with_capacity(self.template.len());
        for (literal, index) in &self.tokens {
            out.push_str(literal);
            if let Some(v) = index.and_then(|i| values.get(i)) {
                out.push_str(&v.to_text());
            }
        }
        out
    }
}

impl PropertyKey for JoinProperty {
    fn config(&self) -> &PropertyConfig { &self.config }
    fn value_type(&self) -> ValueType { ValueType::String }

    fn get_property(&self, ctx: &SecurityContext, obj: &GraphObject, _apply: bool, _p: Option<Predicate<'_>>) -> Value {
        let values: Vec<Value> = self.sources.iter().map(|k| k.get_property(ctx, obj, true, None)).collect();
        if values.iter().all(Value::is_null) {
            return Value::Null;
        }
        Value::String(self.render(&values))
    }

    fn set_property(&self, ctx: &SecurityContext, obj: &GraphObject, value: Value) -> Result<Option<Value>> {
        if self.is_read_only() {
            return reject_write(self, obj);
        }
        let previous = self.get_property(ctx, obj, true, None);

        if value.is_null() {
            for key in &self.sources {
                key.set_property(ctx, obj, Value::Null)?;
            }
            return Ok((!previous.is_null()).then_some(previous));
        }

        let text = value.to_text();
        let caps = self.pattern.captures(&text).ok_or_else(|| {
            Error::BadRequest(format!("{text:?} does not match {} of property {}", self.template, self.json_name()))
        })?;
        // Every fragment converts before the first source is touched.
        let mut converted = Vec::with_capacity(self.sources.len());
        for (i, key) in self.sources.iter().enumerate() {
            let Some(fragment) = caps.name(&format!("p{i}")) else { continue };
            let logical = convert_with(key.input_converter(ctx).as_deref(), Value::from(fragment.as_str()))?;
            converted.push((key, logical));
        }
        for (key, logical) in converted {
            key.set_property(ctx, obj, logical)?;
        }
        Ok((!previous.is_null()).then_some(previous))
    }
}

impl_builder!(ConcatProperty, JoinProperty);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{IntegerProperty, PropertyBuilder, StringProperty};

    #[test]
    fn test_tokenize() {
        let tokens = tokenize("{0}-{1}!").unwrap();
        assert_eq!(
            tokens,
            vec![(String::new(), Some(0)), ("-".to_owned(), Some(1)), ("!".to_owned(), None)]
        );
        assert!(tokenize("{0").is_err());
        assert!(tokenize("{x}").is_err());
    }

    #[test]
    fn test_join_pattern_parses_back() {
        let key = JoinProperty::new(
            "code",
            vec![StringProperty::new("prefix").build(), IntegerProperty::new("number").build()],
            "{0}-{1}",
        )
        .unwrap();
        let caps = key.pattern.captures("TASK-42").unwrap();
        assert_eq!(&caps["p0"], "TASK");
        assert_eq!(&caps["p1"], "42");
        assert_eq!(key.render(&[Value::from("TASK"), Value::Int(42)]), "TASK-42");
    }

    #[test]
    fn test_render_keeps_braces_inside_values() {
        let key = JoinProperty::new(
            "label",
            vec![StringProperty::new("a").build(), StringProperty::new("b").build()],
            "{0}/{1}",
        )
        .unwrap();
        assert_eq!(key.render(&[Value::from("{1}"), Value::from("x")]), "{1}/x");
        assert_eq!(key.render(&[Value::from("x"), Value::from("{0}")]), "x/{0}");
    }

    #[test]
    fn test_placeholder_without_source_is_rejected() {
        let result = JoinProperty::new("x", vec![StringProperty::new("a").build()], "{0}{1}");
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
