//! Expressions, including call and construction expressions.

use super::{ExprId, MethodId, SourcePosition, TypeId, TypeRef, VariableId};

/// A literal value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// String literal, unquoted and unescaped.
    String(String),
    Number(String),
    Boolean(bool),
    Char(String),
    Null,
}

/// The method an invocation refers to, as far as it could be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableRef {
    pub name: String,
    pub declaring_type: Option<TypeRef>,
    pub parameter_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub executable: ExecutableRef,
    /// Receiver expression; `None` for unqualified calls.
    pub target: Option<ExprId>,
    pub arguments: Vec<ExprId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Construction {
    pub type_ref: Option<TypeRef>,
    pub arguments: Vec<ExprId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    Literal(Literal),
    /// Read of a field, local or parameter.
    VariableRead {
        name: String,
        declaration: Option<VariableId>,
    },
    /// A type used as an expression, e.g. the receiver of a static call.
    TypeAccess(TypeRef),
    Invocation(Invocation),
    Construction(Construction),
    Other,
}

/// An expression node with its context in the program.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    /// Source text with whitespace collapsed.
    pub text: String,
    pub static_type: Option<TypeRef>,
    pub position: Option<SourcePosition>,
    pub enclosing_type: Option<TypeId>,
    pub enclosing_method: Option<MethodId>,
}

impl Expr {
    pub fn new(kind: ExprKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            static_type: None,
            position: None,
            enclosing_type: None,
            enclosing_method: None,
        }
    }

    pub fn string_literal(value: impl Into<String>) -> Self {
        let value = value.into();
        let text = format!("\"{}\"", value);
        Self::new(ExprKind::Literal(Literal::String(value)), text)
            .typed(TypeRef::new("java.lang.String"))
    }

    pub fn variable_read(name: impl Into<String>, declaration: Option<VariableId>) -> Self {
        let name = name.into();
        Self::new(
            ExprKind::VariableRead {
                name: name.clone(),
                declaration,
            },
            name,
        )
    }

    pub fn type_access(type_ref: TypeRef) -> Self {
        let text = type_ref.simple_name().to_string();
        Self::new(ExprKind::TypeAccess(type_ref.clone()), text).typed(type_ref)
    }

    pub fn invocation(
        name: impl Into<String>,
        declaring_type: Option<TypeRef>,
        target: Option<ExprId>,
        arguments: Vec<ExprId>,
    ) -> Self {
        let name = name.into();
        let text = format!("{}(..)", name);
        Self::new(
            ExprKind::Invocation(Invocation {
                executable: ExecutableRef {
                    name,
                    declaring_type,
                    parameter_count: arguments.len(),
                },
                target,
                arguments,
            }),
            text,
        )
    }

    pub fn construction(type_ref: TypeRef, arguments: Vec<ExprId>) -> Self {
        let text = format!("new {}(..)", type_ref.simple_name());
        Self::new(
            ExprKind::Construction(Construction {
                type_ref: Some(type_ref.clone()),
                arguments,
            }),
            text,
        )
        .typed(type_ref)
    }

    pub fn typed(mut self, type_ref: TypeRef) -> Self {
        self.static_type = Some(type_ref);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn at(mut self, position: SourcePosition) -> Self {
        self.position = Some(position);
        self
    }

    /// Places the expression inside `method` of `owner`.
    pub fn within(mut self, owner: TypeId, method: Option<MethodId>) -> Self {
        self.enclosing_type = Some(owner);
        self.enclosing_method = method;
        self
    }

    pub fn as_invocation(&self) -> Option<&Invocation> {
        match &self.kind {
            ExprKind::Invocation(inv) => Some(inv),
            _ => None,
        }
    }

    pub fn as_construction(&self) -> Option<&Construction> {
        match &self.kind {
            ExprKind::Construction(c) => Some(c),
            _ => None,
        }
    }

    pub fn static_type_name(&self) -> Option<&str> {
        self.static_type.as_ref().map(TypeRef::qualified_name)
    }
}
