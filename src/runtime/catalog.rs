//! Declared types and method definitions known to the host.
//!
//! The catalog answers the reflective questions the engine needs: which type
//! a type inherits from, which parameters a method declares, where it is
//! defined, and which signature (if any) is annotated on it.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::core::{BuiltinHierarchy, CallTarget, MethodShape, Subtyping, TypeName};
use crate::type_checks::{MethodSignature, TypeEnvironment};

/// A method as declared on a type
#[derive(Debug, Clone)]
pub struct MethodDef {
    pub shape: Arc<MethodShape>,
    pub location: String,
    pub signature: Option<MethodSignature>,
}

/// Type information including hierarchy and members
#[derive(Debug, Clone)]
pub struct TypeDef {
    pub name: TypeName,
    pub superclass: Option<TypeName>,
    pub instance_methods: BTreeMap<String, MethodDef>,
    pub static_methods: BTreeMap<String, MethodDef>,
}

impl TypeDef {
    pub fn new(name: impl Into<TypeName>) -> Self {
        Self {
            name: name.into(),
            superclass: None,
            instance_methods: BTreeMap::new(),
            static_methods: BTreeMap::new(),
        }
    }

    pub fn inherits(mut self, superclass: impl Into<TypeName>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    fn methods(&self, is_static: bool) -> &BTreeMap<String, MethodDef> {
        if is_static {
            &self.static_methods
        } else {
            &self.instance_methods
        }
    }

    fn methods_mut(&mut self, is_static: bool) -> &mut BTreeMap<String, MethodDef> {
        if is_static {
            &mut self.static_methods
        } else {
            &mut self.instance_methods
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    types: HashMap<TypeName, TypeDef>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type; redefining keeps existing methods and updates the superclass
    pub fn define_type(&mut self, def: TypeDef) {
        match self.types.get_mut(&def.name) {
            Some(existing) => {
                if def.superclass.is_some() {
                    existing.superclass = def.superclass;
                }
                existing.instance_methods.extend(def.instance_methods);
                existing.static_methods.extend(def.static_methods);
            }
            None => {
                self.types.insert(def.name.clone(), def);
            }
        }
    }

    pub fn contains(&self, name: &TypeName) -> bool {
        self.types.contains_key(name)
    }

    pub fn type_def(&self, name: &TypeName) -> Option<&TypeDef> {
        self.types.get(name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &TypeName> {
        self.types.keys()
    }

    /// Declare a method, creating its owning type on demand
    pub fn define_method(&mut self, target: &CallTarget, name: &str, def: MethodDef) {
        let owner = target.underlying_type().clone();
        self.types
            .entry(owner.clone())
            .or_insert_with(|| TypeDef::new(owner))
            .methods_mut(target.is_static())
            .insert(name.to_string(), def);
    }

    pub fn annotate(&mut self, target: &CallTarget, name: &str, signature: MethodSignature) -> bool {
        let Some(def) = self
            .types
            .get_mut(target.underlying_type())
            .and_then(|t| t.methods_mut(target.is_static()).get_mut(name))
        else {
            return false;
        };
        def.signature = Some(signature);
        true
    }

    /// Find a method definition, walking up the superclass chain.
    ///
    /// Returns the target that actually defines the method along with its
    /// definition.
    pub fn lookup(&self, target: &CallTarget, name: &str) -> Option<(CallTarget, &MethodDef)> {
        let is_static = target.is_static();
        let mut current = Some(target.underlying_type().clone());
        let mut depth = 0;

        while let Some(type_name) = current {
            if depth > 64 {
                break;
            }
            depth += 1;

            let def = self.types.get(&type_name)?;
            if let Some(method) = def.methods(is_static).get(name) {
                let owner = if is_static {
                    CallTarget::Static(type_name)
                } else {
                    CallTarget::Instance(type_name)
                };
                return Some((owner, method));
            }
            current = def.superclass.clone();
        }

        None
    }
}

impl Subtyping for TypeCatalog {
    fn superclass_of(&self, ty: &TypeName) -> Option<TypeName> {
        match self.types.get(ty) {
            Some(def) => def
                .superclass
                .clone()
                .or_else(|| BuiltinHierarchy::builtin_superclass(ty)),
            None => BuiltinHierarchy::builtin_superclass(ty),
        }
    }
}

impl TypeEnvironment for TypeCatalog {
    fn annotated_signature(&self, target: &CallTarget, method: &str) -> Option<MethodSignature> {
        self.lookup(target, method)
            .and_then(|(_, def)| def.signature.clone())
    }

    fn knows_type(&self, name: &TypeName) -> bool {
        name.is_builtin() || self.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(location: &str) -> MethodDef {
        MethodDef {
            shape: Arc::new(MethodShape::new().req("val")),
            location: location.to_string(),
            signature: None,
        }
    }

    #[test]
    fn test_lookup_walks_superclass_chain() {
        let mut catalog = TypeCatalog::new();
        catalog.define_type(TypeDef::new("Calculator"));
        catalog.define_type(TypeDef::new("TaxCalculator").inherits("Calculator"));
        catalog.define_method(&CallTarget::instance("Calculator"), "round", method("calc.rs:1"));

        let (owner, def) = catalog
            .lookup(&CallTarget::instance("TaxCalculator"), "round")
            .expect("inherited method");
        assert_eq!(owner, CallTarget::instance("Calculator"));
        assert_eq!(def.location, "calc.rs:1");

        assert!(catalog
            .lookup(&CallTarget::static_of("TaxCalculator"), "round")
            .is_none());
    }

    #[test]
    fn test_subtyping_uses_declared_superclass() {
        let mut catalog = TypeCatalog::new();
        catalog.define_type(TypeDef::new("Calculator"));
        catalog.define_type(TypeDef::new("TaxCalculator").inherits("Calculator"));

        assert!(catalog.is_subtype(&"TaxCalculator".into(), &"Calculator".into()));
        assert!(catalog.is_subtype(&"TaxCalculator".into(), &"Object".into()));
        assert!(!catalog.is_subtype(&"Calculator".into(), &"TaxCalculator".into()));
        assert!(catalog.is_subtype(&"Integer".into(), &"Numeric".into()));
    }

    #[test]
    fn test_redefining_type_keeps_methods() {
        let mut catalog = TypeCatalog::new();
        catalog.define_method(&CallTarget::instance("Accountant"), "net_pay", method("a.rs:3"));
        catalog.define_type(TypeDef::new("Accountant").inherits("Employee"));

        let def = catalog.type_def(&"Accountant".into()).unwrap();
        assert_eq!(def.superclass, Some("Employee".into()));
        assert!(def.instance_methods.contains_key("net_pay"));
    }
}
