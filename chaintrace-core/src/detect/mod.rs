//! Usage detection over the program model.
//!
//! Three independent scanners share one [`UsageDetector`]:
//!
//! - [`UsageDetector::detect_function_clients`]: `<Id>Function.instance().execute(..)`
//! - [`UsageDetector::detect_services`]: instantiations and calls into service packages
//! - [`UsageDetector::detect_event_publishes`]: `publisher.publishEvent(topic, payload)`
//!
//! Each scanner inspects candidate expressions in parallel and keeps the
//! model's source order in its output. An expression that fails inspection
//! is skipped with a warning; the call-chain walker runs only for confirmed
//! matches.

mod event_publish;
mod function_client;
mod service;
mod topic;

pub use service::ServicePackage;
pub use topic::{resolve_topic, ResolvedTopic};

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::callchain::CallChainWalker;
use crate::common::Warnings;
use crate::config::DetectionConventions;
use crate::error::ChainTraceResult;
use crate::model::{Expr, ExprId, ProgramModel};
use crate::usage::{CallChain, SourceLocation};

/// Detects function client, service and event publish usages.
pub struct UsageDetector<'a> {
    model: &'a ProgramModel,
    conventions: &'a DetectionConventions,
    walker: &'a CallChainWalker<'a>,
    warnings: &'a Warnings,
}

impl<'a> UsageDetector<'a> {
    pub fn new(
        model: &'a ProgramModel,
        conventions: &'a DetectionConventions,
        walker: &'a CallChainWalker<'a>,
        warnings: &'a Warnings,
    ) -> Self {
        Self {
            model,
            conventions,
            walker,
            warnings,
        }
    }

    /// Runs `inspect` over `candidates` in parallel, keeping candidate order.
    ///
    /// A failed inspection drops that candidate and records
    /// `Skipped <kind> at <location>: <error>`.
    fn scan<T, F>(&self, candidates: &[ExprId], kind: &str, inspect: F) -> Vec<T>
    where
        T: Send,
        F: Fn(ExprId, &Expr) -> ChainTraceResult<Option<T>> + Sync + Send,
    {
        debug!(candidates = candidates.len(), kind, "Scanning expressions");

        candidates
            .par_iter()
            .filter_map(|&id| {
                let expr = match self.model.require_expr(id) {
                    Ok(expr) => expr,
                    Err(e) => {
                        self.skip(kind, "unknown location".to_string(), &e.to_string());
                        return None;
                    }
                };
                match inspect(id, expr) {
                    Ok(found) => found,
                    Err(e) => {
                        self.skip(kind, self.location_string(expr), &e.to_string());
                        None
                    }
                }
            })
            .collect()
    }

    fn skip(&self, kind: &str, location: String, error: &str) {
        warn!(kind, location = %location, error = %error, "Skipping expression");
        self.warnings
            .push(format!("Skipped {} at {}: {}", kind, location, error));
    }

    /// Every chain for a confirmed site, primary first.
    fn call_chains(&self, site: ExprId) -> Vec<CallChain> {
        let chains = self.walker.build_call_chains(site);
        if chains.len() > 1 {
            debug!(total = chains.len(), "Multiple call chains found");
        }
        chains
    }

    /// Location of `expr`, with `unknown` for anything unavailable.
    fn source_location(&self, expr: &Expr) -> SourceLocation {
        let mut location = SourceLocation::default();
        if let Some(position) = &expr.position {
            location.file_path = position.file.display().to_string();
            location.line_number = Some(position.line);
        }
        if let Some(owner) = expr.enclosing_type.and_then(|t| self.model.type_decl(t)) {
            location.class_name = owner.qualified_name.clone();
        }
        if let Some(method) = expr.enclosing_method.and_then(|m| self.model.method(m)) {
            location.method_name = method.name.clone();
        }
        location
    }

    fn location_string(&self, expr: &Expr) -> String {
        expr.position
            .as_ref()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "unknown location".to_string())
    }

    /// Fetches the argument at `index`, failing on a dangling id.
    fn argument(&self, arguments: &[ExprId], index: usize) -> ChainTraceResult<Option<&'a Expr>> {
        arguments
            .get(index)
            .map(|&id| self.model.require_expr(id))
            .transpose()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Hand-built models shared by the detector tests.

    use crate::common::Visibility;
    use crate::model::{
        Expr, ExprId, MethodDecl, MethodId, ProgramModelBuilder, SourcePosition, TypeDecl, TypeId,
        TypeRef,
    };

    pub const FILE: &str = "src/main/java/com/acme/billing/Billing.java";

    /// A class `com.acme.billing.Billing` with one public method `charge`.
    pub struct Fixture {
        pub b: ProgramModelBuilder,
        pub owner: TypeId,
        pub method: MethodId,
        next_line: usize,
    }

    impl Fixture {
        pub fn new() -> Self {
            let mut b = ProgramModelBuilder::new();
            let owner = b.add_type(TypeDecl::class("com.acme.billing.Billing"));
            let method = b.add_method(
                MethodDecl::new(owner, "charge")
                    .with_visibility(Visibility::Public)
                    .at(SourcePosition::new(FILE, 10)),
            );
            Self {
                b,
                owner,
                method,
                next_line: 11,
            }
        }

        /// Adds `expr` inside `charge`, on the next source line.
        pub fn add(&mut self, expr: Expr) -> ExprId {
            let line = self.next_line;
            self.next_line += 1;
            self.b.add_expr(
                expr.within(self.owner, Some(self.method))
                    .at(SourcePosition::new(FILE, line)),
            )
        }

        pub fn typed_read(&mut self, name: &str, type_name: &str) -> ExprId {
            self.add(Expr::variable_read(name, None).typed(TypeRef::new(type_name)))
        }

        pub fn type_access(&mut self, type_name: &str) -> ExprId {
            self.add(Expr::type_access(TypeRef::new(type_name)))
        }

        /// An id that is valid in some model but not in this one.
        pub fn dangling(&self) -> ExprId {
            let mut other = ProgramModelBuilder::new();
            let mut last = other.add_expr(Expr::string_literal("x"));
            for _ in 0..1000 {
                last = other.add_expr(Expr::string_literal("x"));
            }
            last
        }
    }
}
