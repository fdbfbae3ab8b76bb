//! Checking a single call record against a method signature.

use super::errors::{ArgPosition, MismatchDetail, TypeMismatch};
use super::signature::MethodSignature;
use crate::core::{Subtyping, Value};
use crate::method_call::MethodCall;

/// Split a call's arguments into positional and named parts for `signature`.
///
/// Records that carry no parameter shape (mocked calls) fall back to the
/// signature: a trailing symbol-keyed map is taken as named arguments when
/// the signature accepts keywords and the map would overflow its positional
/// slots.
fn split_arguments<'c>(
    signature: &MethodSignature,
    call: &'c MethodCall,
) -> (&'c [Value], &'c [(Value, Value)]) {
    if call.has_named_args() {
        return (call.positional_args(), call.named_args());
    }

    let args = call.arguments();
    let overflows = signature.rest.is_none() && args.len() > signature.positional.len();
    if signature.accepts_named_args() && overflows {
        if let Some((last, positional)) = args.split_last() {
            if last.is_symbol_keyed_map() {
                return (positional, last.as_map().unwrap_or_default());
            }
        }
    }
    (args, &[])
}

fn keyword_name(key: &Value) -> String {
    match key {
        Value::Symbol(name) | Value::Str(name) => name.clone(),
        other => other.to_string(),
    }
}

/// Collect every violation of `signature` by `call`
pub fn check_call(
    signature: &MethodSignature,
    call: &MethodCall,
    hierarchy: &dyn Subtyping,
) -> Result<(), TypeMismatch> {
    let self_type = call.target().underlying_type();
    let (positional, named) = split_arguments(signature, call);
    let mut details = Vec::new();

    let required = signature.required_positional();
    let max = signature.positional.len();
    if positional.len() < required || (signature.rest.is_none() && positional.len() > max) {
        details.push(MismatchDetail::Arity {
            expected: signature.params_desc(),
            given: positional.len(),
        });
    } else {
        for (index, value) in positional.iter().enumerate() {
            let expected = match signature.positional.get(index) {
                Some(param) => &param.ty,
                None => match &signature.rest {
                    Some(rest) => rest,
                    None => continue,
                },
            };
            if !expected.accepts(value, self_type, hierarchy) {
                details.push(MismatchDetail::ArgumentType {
                    position: ArgPosition::Positional(index),
                    expected: expected.clone(),
                    actual: value.clone(),
                });
            }
        }
    }

    let mut supplied = Vec::with_capacity(named.len());
    for (key, value) in named {
        let name = keyword_name(key);
        let expected = match signature.named.iter().find(|p| p.name == name) {
            Some(param) => &param.ty,
            None => match &signature.named_rest {
                Some(rest) => rest,
                None => {
                    details.push(MismatchDetail::UnknownKeyword(name));
                    continue;
                }
            },
        };
        if !expected.accepts(value, self_type, hierarchy) {
            details.push(MismatchDetail::ArgumentType {
                position: ArgPosition::Named(name.clone()),
                expected: expected.clone(),
                actual: value.clone(),
            });
        }
        supplied.push(name);
    }
    for param in signature.named.iter().filter(|p| p.required) {
        if !supplied.contains(&param.name) {
            details.push(MismatchDetail::MissingKeyword(param.name.clone()));
        }
    }

    // Constructors return the new object, never a value worth checking
    if !call.is_constructor() && call.metadata.raised.is_none() {
        let actual = call.return_value();
        if !signature.returns.accepts(actual, self_type, hierarchy) {
            details.push(MismatchDetail::ReturnType {
                expected: signature.returns.clone(),
                actual: actual.clone(),
            });
        }
    }

    if details.is_empty() {
        Ok(())
    } else {
        Err(TypeMismatch {
            method: call.describe(),
            details,
        })
    }
}
