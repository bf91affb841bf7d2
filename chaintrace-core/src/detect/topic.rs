//! Best-effort resolution of the topic argument of a publish call.

use crate::error::ChainTraceResult;
use crate::model::{Expr, ExprKind, Literal, ProgramModel};
use crate::usage::TopicResolutionStatus;

/// Outcome of [`resolve_topic`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTopic {
    /// The literal value, the variable name, or the expression text.
    pub name: String,
    pub status: TopicResolutionStatus,
    /// Type of the unresolved expression; `None` when resolved.
    pub variable_type: Option<String>,
}

impl ResolvedTopic {
    fn resolved(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: TopicResolutionStatus::Resolved,
            variable_type: None,
        }
    }
}

/// Reduces a topic expression to a string where the source makes that possible.
///
/// A string literal resolves directly. A variable read resolves when its
/// declaration has a string literal initializer; otherwise it is reported by
/// name. Anything else is reported by its source text.
pub fn resolve_topic(model: &ProgramModel, topic: &Expr) -> ChainTraceResult<ResolvedTopic> {
    match &topic.kind {
        ExprKind::Literal(Literal::String(value)) => Ok(ResolvedTopic::resolved(value.as_str())),
        ExprKind::VariableRead { name, declaration } => {
            let declared = declaration
                .map(|id| model.require_variable(id))
                .transpose()?;

            if let Some(init) = declared.and_then(|v| v.initializer) {
                if let Some(value) = string_literal(model.require_expr(init)?) {
                    return Ok(ResolvedTopic::resolved(value));
                }
            }

            let variable_type = topic
                .static_type_name()
                .or_else(|| {
                    declared
                        .and_then(|v| v.declared_type.as_ref())
                        .map(|t| t.qualified_name())
                })
                .unwrap_or("Unknown");

            Ok(ResolvedTopic {
                name: name.clone(),
                status: TopicResolutionStatus::UnknownVariable,
                variable_type: Some(variable_type.to_string()),
            })
        }
        _ => Ok(ResolvedTopic {
            name: topic.text.clone(),
            status: TopicResolutionStatus::UnknownComplex,
            variable_type: Some(topic.static_type_name().unwrap_or("Unknown").to_string()),
        }),
    }
}

fn string_literal(expr: &Expr) -> Option<&str> {
    match &expr.kind {
        ExprKind::Literal(Literal::String(value)) => Some(value.as_str()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExprKind, ProgramModelBuilder, TypeDecl, TypeRef, VariableDecl};

    #[test]
    fn test_literal_topic() {
        let mut b = ProgramModelBuilder::new();
        let lit = b.add_expr(Expr::string_literal("orders.created"));
        let model = b.build();

        let topic = resolve_topic(&model, model.expr(lit).unwrap()).unwrap();
        assert_eq!(topic, ResolvedTopic::resolved("orders.created"));
    }

    #[test]
    fn test_local_with_literal_initializer() {
        let mut b = ProgramModelBuilder::new();
        let var = b.add_variable(VariableDecl::local("topic", Some(TypeRef::new("java.lang.String"))));
        let init = b.add_expr(Expr::string_literal("orders.updated"));
        b.set_initializer(var, init);
        let read = b.add_expr(Expr::variable_read("topic", Some(var)));
        let model = b.build();

        let topic = resolve_topic(&model, model.expr(read).unwrap()).unwrap();
        assert_eq!(topic.status, TopicResolutionStatus::Resolved);
        assert_eq!(topic.name, "orders.updated");
    }

    #[test]
    fn test_constant_field_resolves() {
        let mut b = ProgramModelBuilder::new();
        let owner = b.add_type(TypeDecl::class("com.acme.Topics"));
        let field = b.add_variable(VariableDecl::field(owner, "SHIPPED", None));
        let init = b.add_expr(Expr::string_literal("orders.shipped"));
        b.set_initializer(field, init);
        let read = b.add_expr(Expr::variable_read("SHIPPED", Some(field)));
        let model = b.build();

        let topic = resolve_topic(&model, model.expr(read).unwrap()).unwrap();
        assert_eq!(topic.name, "orders.shipped");
    }

    #[test]
    fn test_parameter_without_initializer() {
        let mut b = ProgramModelBuilder::new();
        let param = b.add_variable(VariableDecl::new(
            "topicName",
            crate::model::VariableKind::Parameter,
            Some(TypeRef::new("java.lang.String")),
        ));
        let read = b.add_expr(Expr::variable_read("topicName", Some(param)));
        let model = b.build();

        let topic = resolve_topic(&model, model.expr(read).unwrap()).unwrap();
        assert_eq!(topic.status, TopicResolutionStatus::UnknownVariable);
        assert_eq!(topic.name, "topicName");
        assert_eq!(topic.variable_type.as_deref(), Some("java.lang.String"));
    }

    #[test]
    fn test_non_literal_initializer_stays_unknown() {
        let mut b = ProgramModelBuilder::new();
        let var = b.add_variable(VariableDecl::local("t", None));
        let init = b.add_expr(Expr::invocation("lookupTopic", None, None, vec![]));
        b.set_initializer(var, init);
        let read = b.add_expr(Expr::variable_read("t", Some(var)));
        let model = b.build();

        let topic = resolve_topic(&model, model.expr(read).unwrap()).unwrap();
        assert_eq!(topic.status, TopicResolutionStatus::UnknownVariable);
        assert_eq!(topic.variable_type.as_deref(), Some("Unknown"));
    }

    #[test]
    fn test_concatenation_is_complex() {
        let mut b = ProgramModelBuilder::new();
        let concat = b.add_expr(
            Expr::new(ExprKind::Other, "\"orders.\" + region")
                .typed(TypeRef::new("java.lang.String")),
        );
        let model = b.build();

        let topic = resolve_topic(&model, model.expr(concat).unwrap()).unwrap();
        assert_eq!(topic.status, TopicResolutionStatus::UnknownComplex);
        assert_eq!(topic.name, "\"orders.\" + region");
        assert_eq!(topic.variable_type.as_deref(), Some("java.lang.String"));
    }
}
