//! Method parameter shapes and argument binding.

use serde::{Deserialize, Serialize};

use super::value::Value;

/// Kind of a declared method parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Required,
    Optional,
    Rest,
    KeyRequired,
    Key,
    KeyRest,
    /// Explicitly refuses named arguments
    NoKey,
    Block,
}

impl ParamKind {
    pub fn is_keyword(self) -> bool {
        matches!(self, Self::KeyRequired | Self::Key | Self::KeyRest)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub kind: ParamKind,
    pub name: String,
}

/// The declared parameter list of a method
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodShape {
    pub params: Vec<Param>,
}

/// One parameter bound to the value it received for a specific invocation
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParam {
    pub kind: ParamKind,
    pub name: String,
    pub value: Value,
}

impl MethodShape {
    pub fn new() -> Self {
        Self::default()
    }

    fn with(mut self, kind: ParamKind, name: &str) -> Self {
        self.params.push(Param {
            kind,
            name: name.to_string(),
        });
        self
    }

    pub fn req(self, name: &str) -> Self {
        self.with(ParamKind::Required, name)
    }

    pub fn opt(self, name: &str) -> Self {
        self.with(ParamKind::Optional, name)
    }

    pub fn rest(self, name: &str) -> Self {
        self.with(ParamKind::Rest, name)
    }

    pub fn key_req(self, name: &str) -> Self {
        self.with(ParamKind::KeyRequired, name)
    }

    pub fn key(self, name: &str) -> Self {
        self.with(ParamKind::Key, name)
    }

    pub fn key_rest(self, name: &str) -> Self {
        self.with(ParamKind::KeyRest, name)
    }

    pub fn no_key(self) -> Self {
        self.with(ParamKind::NoKey, "**nil")
    }

    /// Keyword parameters, or none at all when the method refuses keywords
    pub fn keyword_params(&self) -> Vec<&Param> {
        if self.params.iter().any(|p| p.kind == ParamKind::NoKey) {
            return Vec::new();
        }
        self.params.iter().filter(|p| p.kind.is_keyword()).collect()
    }

    pub fn accepts_named_args(&self) -> bool {
        !self.keyword_params().is_empty()
    }

    pub fn required_positional(&self) -> usize {
        self.params
            .iter()
            .filter(|p| p.kind == ParamKind::Required)
            .count()
    }

    /// Bind invocation arguments to parameters, the way a method frame sees them.
    ///
    /// A trailing symbol-keyed map is treated as named arguments when the shape
    /// accepts keywords. Optional parameters that received nothing and keyword
    /// parameters that were not supplied are left unbound.
    pub fn bind(&self, arguments: &[Value]) -> Vec<BoundParam> {
        let (positional, named) = match arguments.split_last() {
            Some((last, init)) if self.accepts_named_args() && last.is_symbol_keyed_map() => {
                (init, last.as_map().unwrap_or_default().to_vec())
            }
            _ => (arguments, Vec::new()),
        };

        let mut remaining_pos = positional.iter();
        let mut remaining_named = named;
        let mut bound = Vec::with_capacity(self.params.len());

        for param in &self.params {
            let value = match param.kind {
                ParamKind::Required | ParamKind::Optional => remaining_pos.next().cloned(),
                ParamKind::Rest => Some(Value::Array(remaining_pos.by_ref().cloned().collect())),
                ParamKind::KeyRequired | ParamKind::Key => {
                    let key = Value::Symbol(param.name.clone());
                    remaining_named
                        .iter()
                        .position(|(k, _)| *k == key)
                        .map(|idx| remaining_named.remove(idx).1)
                }
                ParamKind::KeyRest => Some(Value::Map(std::mem::take(&mut remaining_named))),
                ParamKind::NoKey | ParamKind::Block => None,
            };

            if let Some(value) = value {
                bound.push(BoundParam {
                    kind: param.kind,
                    name: param.name.clone(),
                    value,
                });
            }
        }

        bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_keyword_params_respect_no_key() {
        let shape = MethodShape::new().req("val").key("value");
        assert_eq!(shape.keyword_params().len(), 1);

        let refusing = MethodShape::new().req("val").key_rest("opts").no_key();
        assert!(refusing.keyword_params().is_empty());
        assert!(!refusing.accepts_named_args());
    }

    #[test]
    fn test_bind_splits_rest_and_keywords() {
        let shape = MethodShape::new()
            .req("a")
            .rest("others")
            .key("value")
            .key_rest("opts");
        let args = vec![
            Value::Int(1),
            Value::Int(2),
            Value::Int(3),
            Value::named([("value", Value::Int(10)), ("extra", Value::Bool(true))]),
        ];

        let bound = shape.bind(&args);
        let summary: Vec<(ParamKind, String)> = bound
            .iter()
            .map(|b| (b.kind, b.value.to_string()))
            .collect();

        assert_eq!(
            summary,
            vec![
                (ParamKind::Required, "1".to_string()),
                (ParamKind::Rest, "[2, 3]".to_string()),
                (ParamKind::Key, "10".to_string()),
                (ParamKind::KeyRest, "{extra: true}".to_string()),
            ]
        );
    }

    #[test]
    fn test_bind_keeps_trailing_map_positional_without_keywords() {
        let shape = MethodShape::new().req("options");
        let args = vec![Value::named([("value", Value::Int(1))])];

        let bound = shape.bind(&args);
        assert_eq!(bound.len(), 1);
        assert_eq!(bound[0].value, args[0]);
    }
}
