//! Declarations: types, methods, variables and the references between them.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use super::{ExprId, MethodId, TypeId, VariableId};
use crate::common::Visibility;

/// Reference to a (possibly unresolved) type by qualified name.
///
/// Nested types use `Outer$Inner`. When resolution failed the name is
/// whatever was written in source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TypeRef {
    qualified_name: String,
}

impl TypeRef {
    pub fn new(qualified_name: impl Into<String>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
        }
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// Name after the last `.` or `$`.
    pub fn simple_name(&self) -> &str {
        self.qualified_name
            .rsplit(['.', '$'])
            .next()
            .unwrap_or(&self.qualified_name)
    }

    /// Package part, if the name is qualified.
    pub fn package(&self) -> Option<&str> {
        let top_level = self
            .qualified_name
            .split('$')
            .next()
            .unwrap_or(&self.qualified_name);
        top_level.rsplit_once('.').map(|(pkg, _)| pkg)
    }

    /// True if the qualified name lives under `prefix` (plain string prefix).
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.qualified_name.starts_with(prefix)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_name)
    }
}

/// File (relative to the project root) and 1-indexed line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SourcePosition {
    pub file: PathBuf,
    pub line: usize,
}

impl SourcePosition {
    pub fn new(file: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

/// Value of one annotation element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationValue {
    /// A string literal, unquoted.
    Str(String),
    /// Anything else, as rendered source text.
    Other(String),
}

impl AnnotationValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            Self::Other(_) => None,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Str(s) | Self::Other(s) => s,
        }
    }
}

/// An annotation usage with its element values (`value` for the single-element form).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub type_ref: TypeRef,
    pub values: BTreeMap<String, AnnotationValue>,
}

impl Annotation {
    pub fn marker(type_ref: TypeRef) -> Self {
        Self {
            type_ref,
            values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, key: impl Into<String>, value: AnnotationValue) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn value(&self, key: &str) -> Option<&AnnotationValue> {
        self.values.get(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
}

/// A declared type.
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub qualified_name: String,
    pub kind: TypeKind,
    pub superclass: Option<TypeRef>,
    pub super_interfaces: Vec<TypeRef>,
    pub annotations: Vec<Annotation>,
    pub methods: Vec<MethodId>,
    pub fields: Vec<VariableId>,
    pub position: Option<SourcePosition>,
}

impl TypeDecl {
    pub fn new(qualified_name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            kind,
            superclass: None,
            super_interfaces: Vec::new(),
            annotations: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            position: None,
        }
    }

    pub fn class(qualified_name: impl Into<String>) -> Self {
        Self::new(qualified_name, TypeKind::Class)
    }

    pub fn interface(qualified_name: impl Into<String>) -> Self {
        Self::new(qualified_name, TypeKind::Interface)
    }

    pub fn implementing(mut self, interface: impl Into<String>) -> Self {
        self.super_interfaces.push(TypeRef::new(interface));
        self
    }

    pub fn extending(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(TypeRef::new(superclass));
        self
    }

    pub fn annotated(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn type_ref(&self) -> TypeRef {
        TypeRef::new(self.qualified_name.clone())
    }

    pub fn simple_name(&self) -> &str {
        self.qualified_name
            .rsplit(['.', '$'])
            .next()
            .unwrap_or(&self.qualified_name)
    }

    pub fn annotation(&self, qualified_name: &str) -> Option<&Annotation> {
        self.annotations
            .iter()
            .find(|a| a.type_ref.qualified_name() == qualified_name)
    }

    pub fn has_annotation(&self, qualified_name: &str) -> bool {
        self.annotation(qualified_name).is_some()
    }
}

/// A formal parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub type_ref: Option<TypeRef>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, type_ref: Option<TypeRef>) -> Self {
        Self {
            name: name.into(),
            type_ref,
        }
    }

    pub fn typed(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(name, Some(TypeRef::new(type_name)))
    }
}

/// A declared method. Constructors are not represented as methods.
#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub owner: TypeId,
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<TypeRef>,
    pub visibility: Visibility,
    pub is_static: bool,
    pub annotations: Vec<Annotation>,
    pub position: Option<SourcePosition>,
}

impl MethodDecl {
    pub fn new(owner: TypeId, name: impl Into<String>) -> Self {
        Self {
            owner,
            name: name.into(),
            parameters: Vec::new(),
            return_type: None,
            visibility: Visibility::Package,
            is_static: false,
            annotations: Vec::new(),
            position: None,
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_parameters(mut self, parameters: Vec<Parameter>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn returning(mut self, type_name: impl Into<String>) -> Self {
        self.return_type = Some(TypeRef::new(type_name));
        self
    }

    pub fn at(mut self, position: SourcePosition) -> Self {
        self.position = Some(position);
        self
    }

    pub fn annotation(&self, qualified_name: &str) -> Option<&Annotation> {
        self.annotations
            .iter()
            .find(|a| a.type_ref.qualified_name() == qualified_name)
    }

    pub fn line(&self) -> Option<usize> {
        self.position.as_ref().map(|p| p.line)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKind {
    Field,
    Local,
    Parameter,
}

/// A field, local variable or parameter declaration.
#[derive(Debug, Clone)]
pub struct VariableDecl {
    pub name: String,
    pub kind: VariableKind,
    pub declared_type: Option<TypeRef>,
    pub initializer: Option<ExprId>,
    /// Declaring type for fields.
    pub owner: Option<TypeId>,
}

impl VariableDecl {
    pub fn new(name: impl Into<String>, kind: VariableKind, declared_type: Option<TypeRef>) -> Self {
        Self {
            name: name.into(),
            kind,
            declared_type,
            initializer: None,
            owner: None,
        }
    }

    pub fn field(owner: TypeId, name: impl Into<String>, declared_type: Option<TypeRef>) -> Self {
        Self {
            owner: Some(owner),
            ..Self::new(name, VariableKind::Field, declared_type)
        }
    }

    pub fn local(name: impl Into<String>, declared_type: Option<TypeRef>) -> Self {
        Self::new(name, VariableKind::Local, declared_type)
    }
}
