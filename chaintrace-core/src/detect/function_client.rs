//! Function client invocations: `<Id>Function.instance().<verb>(input, ..)`.

use std::collections::BTreeSet;

use tracing::{debug, info};

use super::UsageDetector;
use crate::error::ChainTraceResult;
use crate::model::{Expr, ExprId, ExprKind};
use crate::usage::FunctionClientUsage;

const MAX_SCHEDULE_LEN: usize = 100;

impl UsageDetector<'_> {
    /// Finds calls into the generated clients of `function_ids`.
    pub fn detect_function_clients(
        &self,
        function_ids: &BTreeSet<String>,
    ) -> ChainTraceResult<Vec<FunctionClientUsage>> {
        self.conventions.validate()?;
        info!(functions = function_ids.len(), "Detecting function client usages");

        if function_ids.is_empty() {
            debug!("No function IDs to detect");
            return Ok(Vec::new());
        }

        let usages = self.scan(self.model.invocations(), "call expression", |id, expr| {
            self.inspect_function_call(id, expr, function_ids)
        });

        info!("Found {} function client usages", usages.len());
        Ok(usages)
    }

    fn inspect_function_call(
        &self,
        id: ExprId,
        expr: &Expr,
        function_ids: &BTreeSet<String>,
    ) -> ChainTraceResult<Option<FunctionClientUsage>> {
        let Some(call) = expr.as_invocation() else {
            return Ok(None);
        };
        let verb = &call.executable.name;
        if !self.conventions.is_function_verb(verb) {
            return Ok(None);
        }
        let Some(target) = call.target else {
            return Ok(None);
        };

        let target = self.model.require_expr(target)?;
        let Some(function_id) = self.client_function_id(target, function_ids)? else {
            return Ok(None);
        };

        if let Some(declaring) = &call.executable.declaring_type {
            if !declaring.starts_with(&self.conventions.function_package) {
                debug!(
                    declaring_type = %declaring,
                    "Function client name matched outside the client package"
                );
                return Ok(None);
            }
        }

        let input_type = match self.argument(&call.arguments, 0)? {
            None => "void".to_string(),
            Some(arg) => match arg.static_type_name() {
                None => "Unknown".to_string(),
                Some("java.lang.String") => "String".to_string(),
                Some(name) => name.to_string(),
            },
        };

        let has_scheduling = *verb == self.conventions.scheduled_verb;
        let scheduling_expression = if has_scheduling {
            self.argument(&call.arguments, 1)?
                .map(|when| truncate_expression(&when.text))
        } else {
            None
        };

        debug!(function_id, method = %verb, "Found function client usage");

        Ok(Some(FunctionClientUsage {
            function_id: function_id.to_string(),
            method_name: verb.clone(),
            usage_location: self.source_location(expr),
            call_chains: self.call_chains(id),
            input_type,
            has_scheduling,
            scheduling_expression,
        }))
    }

    /// Recovers the function id from the receiver of a verb call.
    ///
    /// `Id<suffix>.instance()` is matched on the accessor's receiver type; any
    /// other non-call receiver on its own static type.
    fn client_function_id<'f>(
        &self,
        target: &Expr,
        function_ids: &'f BTreeSet<String>,
    ) -> ChainTraceResult<Option<&'f str>> {
        let class_name = match &target.kind {
            ExprKind::Invocation(accessor) => {
                if accessor.executable.name != self.conventions.singleton_accessor {
                    return Ok(None);
                }
                let Some(receiver) = accessor.target else {
                    return Ok(None);
                };
                let receiver = self.model.require_expr(receiver)?;
                match &receiver.kind {
                    ExprKind::TypeAccess(accessed) => Some(accessed.simple_name().to_string()),
                    _ => receiver.static_type.as_ref().map(|t| t.simple_name().to_string()),
                }
            }
            _ => target.static_type.as_ref().map(|t| t.simple_name().to_string()),
        };

        let Some(class_name) = class_name else {
            return Ok(None);
        };
        Ok(function_ids
            .iter()
            .find(|id| self.conventions.function_class_name(id) == class_name)
            .map(String::as_str))
    }
}

/// Caps a diagnostic expression at 100 characters, ellipsis included.
fn truncate_expression(text: &str) -> String {
    if text.chars().count() > MAX_SCHEDULE_LEN {
        let head: String = text.chars().take(MAX_SCHEDULE_LEN - 3).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
