//! Handles for the elements a compiler engine declares.

use std::fmt;

use smol_str::SmolStr;

use crate::base::UnitId;

/// A fully-qualified type name, e.g. `java.util.Map$Entry`.
///
/// Handles are what the index stores; they stay valid after the engine
/// that produced them is disposed.
#[derive(Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "persist", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeHandle(SmolStr);

impl TypeHandle {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(SmolStr::new(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Simple name after the last package separator.
    pub fn simple_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(self.0.as_str())
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHandle({})", self.0)
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeHandle {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A named module declared by a module descriptor unit.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "persist", derive(serde::Serialize, serde::Deserialize))]
pub struct ModuleHandle(pub SmolStr);

/// The module a batch's units belong to.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "persist", derive(serde::Serialize, serde::Deserialize))]
pub enum ModuleName {
    Named(SmolStr),
    Unnamed,
}

impl ModuleName {
    pub fn as_str(&self) -> &str {
        match self {
            ModuleName::Named(name) => name.as_str(),
            ModuleName::Unnamed => "",
        }
    }
}

/// What kind of top-level element a unit declares.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ElementKind {
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
    Module,
    /// The package element of a package descriptor unit.
    Package,
}

impl ElementKind {
    /// Classes and interfaces in the wide sense.
    pub fn is_type(self) -> bool {
        matches!(
            self,
            ElementKind::Class
                | ElementKind::Interface
                | ElementKind::Enum
                | ElementKind::Record
                | ElementKind::Annotation
        )
    }
}

/// One top-level element produced by entering a unit.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct DeclaredElement {
    /// The unit whose tree declares this element.
    pub unit: UnitId,
    pub kind: ElementKind,
    pub name: SmolStr,
}

impl DeclaredElement {
    pub fn new(unit: UnitId, kind: ElementKind, name: impl AsRef<str>) -> Self {
        Self {
            unit,
            kind,
            name: SmolStr::new(name),
        }
    }

    pub fn type_handle(&self) -> Option<TypeHandle> {
        self.kind.is_type().then(|| TypeHandle(self.name.clone()))
    }

    pub fn module_handle(&self) -> Option<ModuleHandle> {
        (self.kind == ElementKind::Module).then(|| ModuleHandle(self.name.clone()))
    }
}

/// A semantic fingerprint of a unit's externally visible API.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "persist", derive(serde::Serialize, serde::Deserialize))]
pub struct Checksum(pub u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_handle_names() {
        let handle = TypeHandle::new("java.util.ArrayList");
        assert_eq!(handle.simple_name(), "ArrayList");
        assert_eq!(handle.to_string(), "java.util.ArrayList");
        assert_eq!(TypeHandle::from("Top").simple_name(), "Top");
    }

    #[test]
    fn test_element_handles() {
        let unit = UnitId::new(0);
        let class = DeclaredElement::new(unit, ElementKind::Class, "p.A");
        let module = DeclaredElement::new(unit, ElementKind::Module, "m.core");
        let package = DeclaredElement::new(unit, ElementKind::Package, "p");

        assert_eq!(class.type_handle(), Some(TypeHandle::new("p.A")));
        assert!(class.module_handle().is_none());
        assert_eq!(module.module_handle(), Some(ModuleHandle("m.core".into())));
        assert!(module.type_handle().is_none());
        assert!(package.type_handle().is_none());
    }

    #[test]
    fn test_module_name() {
        assert_eq!(ModuleName::Named("m".into()).as_str(), "m");
        assert_eq!(ModuleName::Unnamed.as_str(), "");
    }
}
