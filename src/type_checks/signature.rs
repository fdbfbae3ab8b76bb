//! Signature language shared by all type-check backends.
//!
//! Type expressions:
//!
//! ```text
//! Integer                 named type (matches subtypes too)
//! Integer | Nil           union
//! ?Integer                optional, i.e. Integer | Nil
//! self                    the receiver's own type
//! untyped                 anything
//! ```
//!
//! Method signatures: `(Integer, ?String, *Integer, value: Numeric, ?flag: Bool, **untyped) -> Integer | Nil`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;

use crate::core::{builtin, DoubleKind, Error, Result, Subtyping, TypeName, Value};

static NAMED_PARAM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\?)?([a-z_][A-Za-z0-9_]*)\s*:\s*(.+)$").expect("valid named-param pattern")
});

static TYPE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(::[A-Za-z_][A-Za-z0-9_]*)*$").expect("valid type-name pattern")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigType {
    Untyped,
    SelfType,
    Named(TypeName),
    Optional(Box<SigType>),
    Union(Vec<SigType>),
}

impl SigType {
    pub fn named(name: impl Into<TypeName>) -> Self {
        SigType::Named(name.into())
    }

    /// Union of the given types; a single type stays bare, none is `untyped`
    pub fn union_of(types: impl IntoIterator<Item = TypeName>) -> Self {
        let mut members: Vec<SigType> = types.into_iter().map(SigType::Named).collect();
        match members.len() {
            0 => SigType::Untyped,
            1 => members.remove(0),
            _ => SigType::Union(members),
        }
    }

    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::signature("empty type expression", None));
        }

        let parts = split_top_level(input, '|');
        if parts.len() > 1 {
            let members = parts
                .iter()
                .map(|part| SigType::parse(part))
                .collect::<Result<Vec<_>>>()?;
            return Ok(SigType::Union(members));
        }

        if let Some(inner) = input.strip_prefix('?') {
            return Ok(SigType::Optional(Box::new(SigType::parse(inner)?)));
        }
        if let Some(inner) = input.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
            return SigType::parse(inner);
        }

        match input {
            "self" => Ok(SigType::SelfType),
            "untyped" => Ok(SigType::Untyped),
            "nil" => Ok(SigType::named(builtin::NIL)),
            name if TYPE_NAME.is_match(name) => Ok(SigType::named(name)),
            other => Err(Error::signature(
                format!("invalid type expression `{}`", other),
                None,
            )),
        }
    }

    /// Whether `value` inhabits this type
    pub fn accepts(&self, value: &Value, self_type: &TypeName, hierarchy: &dyn Subtyping) -> bool {
        match self {
            SigType::Untyped => true,
            SigType::SelfType => value_matches(value, self_type, hierarchy),
            SigType::Named(expected) => value_matches(value, expected, hierarchy),
            SigType::Optional(inner) => {
                value.is_nil() || inner.accepts(value, self_type, hierarchy)
            }
            SigType::Union(members) => members
                .iter()
                .any(|member| member.accepts(value, self_type, hierarchy)),
        }
    }

    /// Named types referenced anywhere in this expression
    pub fn referenced_types(&self, out: &mut BTreeSet<TypeName>) {
        match self {
            SigType::Named(name) => {
                out.insert(name.clone());
            }
            SigType::Optional(inner) => inner.referenced_types(out),
            SigType::Union(members) => members.iter().for_each(|m| m.referenced_types(out)),
            SigType::Untyped | SigType::SelfType => {}
        }
    }
}

/// Doubles inhabit the type they stand in for; everything else goes by its
/// runtime type.
fn value_matches(value: &Value, expected: &TypeName, hierarchy: &dyn Subtyping) -> bool {
    match value {
        Value::Double(double) => {
            if expected.as_str() == builtin::DOUBLE || expected.as_str() == builtin::OBJECT {
                return true;
            }
            let double = double.double();
            let stands_for = match (&double.kind, &double.name) {
                (DoubleKind::Instance(t), _) => Some(t.clone()),
                (DoubleKind::Plain, Some(label)) => Some(TypeName::new(label.as_str())),
                (DoubleKind::Static(_), _) | (DoubleKind::Plain, None) => None,
            };
            stands_for.is_some_and(|t| hierarchy.is_subtype(&t, expected))
        }
        other => hierarchy.is_subtype(&other.type_name(), expected),
    }
}

impl fmt::Display for SigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigType::Untyped => f.write_str("untyped"),
            SigType::SelfType => f.write_str("self"),
            SigType::Named(name) => write!(f, "{}", name),
            SigType::Optional(inner) => match inner.as_ref() {
                SigType::Union(_) => write!(f, "?({})", inner),
                other => write!(f, "?{}", other),
            },
            SigType::Union(members) => {
                let rendered: Vec<String> = members.iter().map(ToString::to_string).collect();
                f.write_str(&rendered.join(" | "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionalParam {
    pub ty: SigType,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedParam {
    pub name: String,
    pub ty: SigType,
    pub required: bool,
}

/// Expected argument and return types of one method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub positional: Vec<PositionalParam>,
    pub rest: Option<SigType>,
    pub named: Vec<NamedParam>,
    pub named_rest: Option<SigType>,
    pub returns: SigType,
}

impl MethodSignature {
    pub fn returning(returns: SigType) -> Self {
        Self {
            positional: Vec::new(),
            rest: None,
            named: Vec::new(),
            named_rest: None,
            returns,
        }
    }

    pub fn arg(mut self, ty: SigType) -> Self {
        self.positional.push(PositionalParam { ty, optional: false });
        self
    }

    pub fn opt_arg(mut self, ty: SigType) -> Self {
        self.positional.push(PositionalParam { ty, optional: true });
        self
    }

    pub fn named_arg(mut self, name: &str, ty: SigType, required: bool) -> Self {
        self.named.push(NamedParam {
            name: name.to_string(),
            ty,
            required,
        });
        self
    }

    pub fn accepts_named_args(&self) -> bool {
        !self.named.is_empty() || self.named_rest.is_some()
    }

    pub fn required_positional(&self) -> usize {
        self.positional.iter().filter(|p| !p.optional).count()
    }

    /// Parse `(params) -> return`
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let Some(after_open) = input.strip_prefix('(') else {
            return Err(Error::signature(
                format!("signature must start with `(`: `{}`", input),
                None,
            ));
        };
        let close = matching_paren(after_open).ok_or_else(|| {
            Error::signature(format!("unbalanced parentheses in `{}`", input), None)
        })?;
        let params = &after_open[..close];
        let Some(returns) = after_open[close + 1..].trim().strip_prefix("->") else {
            return Err(Error::signature(
                format!("missing `->` return type in `{}`", input),
                None,
            ));
        };

        let mut signature = MethodSignature::returning(SigType::parse(returns)?);
        if params.trim().is_empty() {
            return Ok(signature);
        }

        for param in split_top_level(params, ',') {
            let param = param.trim();
            if let Some(ty) = param.strip_prefix("**") {
                signature.named_rest = Some(SigType::parse(ty)?);
            } else if let Some(ty) = param.strip_prefix('*') {
                signature.rest = Some(SigType::parse(ty)?);
            } else if let Some(caps) = NAMED_PARAM.captures(param) {
                signature.named.push(NamedParam {
                    name: caps[2].to_string(),
                    ty: SigType::parse(&caps[3])?,
                    required: caps.get(1).is_none(),
                });
            } else if let Some(ty) = param.strip_prefix('?') {
                signature.positional.push(PositionalParam {
                    ty: SigType::parse(ty)?,
                    optional: true,
                });
            } else {
                signature.positional.push(PositionalParam {
                    ty: SigType::parse(param)?,
                    optional: false,
                });
            }
        }

        Ok(signature)
    }

    /// Named types referenced by any parameter or the return type
    pub fn referenced_types(&self) -> BTreeSet<TypeName> {
        let mut out = BTreeSet::new();
        self.positional
            .iter()
            .for_each(|p| p.ty.referenced_types(&mut out));
        self.named.iter().for_each(|p| p.ty.referenced_types(&mut out));
        self.rest.iter().for_each(|t| t.referenced_types(&mut out));
        self.named_rest
            .iter()
            .for_each(|t| t.referenced_types(&mut out));
        self.returns.referenced_types(&mut out);
        out
    }

    /// Parameter list without the return type, e.g. `(Integer, ?value: Numeric)`
    pub fn params_desc(&self) -> String {
        let mut parts: Vec<String> = self
            .positional
            .iter()
            .map(|p| {
                if p.optional {
                    format!("?{}", p.ty)
                } else {
                    p.ty.to_string()
                }
            })
            .collect();
        if let Some(rest) = &self.rest {
            parts.push(format!("*{}", rest));
        }
        parts.extend(self.named.iter().map(|p| {
            let marker = if p.required { "" } else { "?" };
            format!("{}{}: {}", marker, p.name, p.ty)
        }));
        if let Some(rest) = &self.named_rest {
            parts.push(format!("**{}", rest));
        }
        format!("({})", parts.join(", "))
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.params_desc(), self.returns)
    }
}

/// Split on `sep` outside of parentheses
fn split_top_level(input: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;

    for (idx, ch) in input.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth -= 1,
            c if c == sep && depth == 0 => {
                parts.push(&input[start..idx]);
                start = idx + ch.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

/// Byte offset of the `)` closing an already-consumed `(`
fn matching_paren(input: &str) -> Option<usize> {
    let mut depth = 1i32;
    for (idx, ch) in input.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}
