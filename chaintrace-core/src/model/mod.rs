//! In-memory program model of the scanned source tree.
//!
//! The model is an arena: types, methods, variables and expressions live in
//! flat vectors and refer to each other through typed ids. It is built once
//! per run (by the Java frontend, or by hand through [`ProgramModelBuilder`])
//! and is read-only afterwards, so it can be shared freely across the rayon
//! workers that run detection.
//!
//! ```text
//! ┌────────────┐   methods/fields   ┌─────────────┐
//! │  TypeDecl  │ ─────────────────► │ MethodDecl  │
//! └────────────┘                    └─────────────┘
//!        ▲ enclosing_type                 ▲ enclosing_method
//!        │                                │
//! ┌──────┴────────────────────────────────┴──────┐
//! │ Expr (Invocation / Construction / Read / ..) │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Ids stored inside expressions are not validated on insertion. A dangling
//! id only shows up when something dereferences it, through the `require_*`
//! accessors, as [`ChainTraceError::MalformedModel`].

mod decl;
mod expr;

pub use decl::{
    Annotation, AnnotationValue, MethodDecl, Parameter, SourcePosition, TypeDecl, TypeKind,
    TypeRef, VariableDecl, VariableKind,
};
pub use expr::{Construction, ExecutableRef, Expr, ExprKind, Invocation, Literal};

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;

use crate::error::{ChainTraceError, ChainTraceResult};

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }

            fn from_index(index: usize) -> Self {
                Self(index as u32)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "#{}", self.0)
            }
        }
    };
}

arena_id!(
    /// Id of a [`TypeDecl`].
    TypeId
);
arena_id!(
    /// Id of a [`MethodDecl`].
    MethodId
);
arena_id!(
    /// Id of a [`VariableDecl`].
    VariableId
);
arena_id!(
    /// Id of an [`Expr`].
    ExprId
);

/// Read-only semantic model of one source tree.
#[derive(Debug, Default)]
pub struct ProgramModel {
    types: Vec<TypeDecl>,
    methods: Vec<MethodDecl>,
    variables: Vec<VariableDecl>,
    exprs: Vec<Expr>,
    invocations: Vec<ExprId>,
    constructions: Vec<ExprId>,
    type_index: HashMap<String, TypeId>,
    source_files: Vec<PathBuf>,
}

impl ProgramModel {
    pub fn builder() -> ProgramModelBuilder {
        ProgramModelBuilder::new()
    }

    // ========================================================================
    // Enumeration
    // ========================================================================

    pub fn types(&self) -> impl Iterator<Item = (TypeId, &TypeDecl)> {
        self.types
            .iter()
            .enumerate()
            .map(|(i, t)| (TypeId::from_index(i), t))
    }

    pub fn methods(&self) -> impl Iterator<Item = (MethodId, &MethodDecl)> {
        self.methods
            .iter()
            .enumerate()
            .map(|(i, m)| (MethodId::from_index(i), m))
    }

    /// Every call expression, in insertion (source) order.
    pub fn invocations(&self) -> &[ExprId] {
        &self.invocations
    }

    /// Every construction expression, in insertion (source) order.
    pub fn constructions(&self) -> &[ExprId] {
        &self.constructions
    }

    pub fn source_files(&self) -> &[PathBuf] {
        &self.source_files
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn type_decl(&self, id: TypeId) -> Option<&TypeDecl> {
        self.types.get(id.index())
    }

    pub fn type_by_name(&self, qualified_name: &str) -> Option<(TypeId, &TypeDecl)> {
        let id = *self.type_index.get(qualified_name)?;
        self.type_decl(id).map(|t| (id, t))
    }

    pub fn method(&self, id: MethodId) -> Option<&MethodDecl> {
        self.methods.get(id.index())
    }

    pub fn variable(&self, id: VariableId) -> Option<&VariableDecl> {
        self.variables.get(id.index())
    }

    pub fn expr(&self, id: ExprId) -> Option<&Expr> {
        self.exprs.get(id.index())
    }

    pub fn require_method(&self, id: MethodId) -> ChainTraceResult<&MethodDecl> {
        self.method(id)
            .ok_or_else(|| ChainTraceError::malformed_model(format!("unknown method {}", id)))
    }

    pub fn require_variable(&self, id: VariableId) -> ChainTraceResult<&VariableDecl> {
        self.variable(id)
            .ok_or_else(|| ChainTraceError::malformed_model(format!("unknown variable {}", id)))
    }

    pub fn require_expr(&self, id: ExprId) -> ChainTraceResult<&Expr> {
        self.expr(id)
            .ok_or_else(|| ChainTraceError::malformed_model(format!("unknown expression {}", id)))
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Number of methods on `owner` named `name` taking `arity` parameters.
    pub fn declared_overloads(&self, owner: TypeId, name: &str, arity: usize) -> usize {
        self.type_decl(owner)
            .map(|t| {
                t.methods
                    .iter()
                    .filter_map(|&m| self.method(m))
                    .filter(|m| m.name == name && m.parameters.len() == arity)
                    .count()
            })
            .unwrap_or(0)
    }

    /// True if `type_name` is `capability` or reaches it through declared
    /// superclasses and super-interfaces. Types absent from the model end
    /// the walk on that path.
    pub fn implements(&self, type_name: &str, capability: &str) -> bool {
        let mut queue = VecDeque::from([type_name.to_string()]);
        let mut seen = HashSet::new();

        while let Some(current) = queue.pop_front() {
            if current == capability {
                return true;
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some((_, decl)) = self.type_by_name(&current) {
                queue.extend(
                    decl.super_interfaces
                        .iter()
                        .chain(decl.superclass.iter())
                        .map(|t| t.qualified_name().to_string()),
                );
            }
        }
        false
    }
}

/// Incremental constructor for a [`ProgramModel`].
#[derive(Debug, Default)]
pub struct ProgramModelBuilder {
    model: ProgramModel,
}

impl ProgramModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a type. The first declaration of a qualified name wins the name index.
    pub fn add_type(&mut self, decl: TypeDecl) -> TypeId {
        let id = TypeId::from_index(self.model.types.len());
        self.model
            .type_index
            .entry(decl.qualified_name.clone())
            .or_insert(id);
        self.model.types.push(decl);
        id
    }

    /// Adds a method and registers it on its owner.
    pub fn add_method(&mut self, decl: MethodDecl) -> MethodId {
        let id = MethodId::from_index(self.model.methods.len());
        if let Some(owner) = self.model.types.get_mut(decl.owner.index()) {
            owner.methods.push(id);
        }
        self.model.methods.push(decl);
        id
    }

    /// Adds a variable; fields are registered on their owner.
    pub fn add_variable(&mut self, decl: VariableDecl) -> VariableId {
        let id = VariableId::from_index(self.model.variables.len());
        if decl.kind == VariableKind::Field {
            if let Some(owner) = decl.owner.and_then(|o| self.model.types.get_mut(o.index())) {
                owner.fields.push(id);
            }
        }
        self.model.variables.push(decl);
        id
    }

    /// Adds an expression, indexing calls and constructions.
    pub fn add_expr(&mut self, expr: Expr) -> ExprId {
        let id = ExprId::from_index(self.model.exprs.len());
        match expr.kind {
            ExprKind::Invocation(_) => self.model.invocations.push(id),
            ExprKind::Construction(_) => self.model.constructions.push(id),
            _ => {}
        }
        self.model.exprs.push(expr);
        id
    }

    /// Attaches an initializer expression to a previously added variable.
    pub fn set_initializer(&mut self, variable: VariableId, initializer: ExprId) {
        if let Some(var) = self.model.variables.get_mut(variable.index()) {
            var.initializer = Some(initializer);
        }
    }

    pub fn add_source_file(&mut self, path: impl Into<PathBuf>) {
        self.model.source_files.push(path.into());
    }

    pub fn type_decl(&self, id: TypeId) -> Option<&TypeDecl> {
        self.model.type_decl(id)
    }

    pub fn expr(&self, id: ExprId) -> Option<&Expr> {
        self.model.expr(id)
    }

    pub fn variable(&self, id: VariableId) -> Option<&VariableDecl> {
        self.model.variable(id)
    }

    pub fn method(&self, id: MethodId) -> Option<&MethodDecl> {
        self.model.method(id)
    }

    pub fn type_by_name(&self, qualified_name: &str) -> Option<(TypeId, &TypeDecl)> {
        self.model.type_by_name(qualified_name)
    }

    pub fn build(self) -> ProgramModel {
        self.model
    }
}
