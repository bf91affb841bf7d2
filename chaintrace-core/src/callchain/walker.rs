//! The call-chain walker.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use super::cache::{CacheStats, CallerCache, CallerSet};
use super::{short_signature, MethodSignature};
use crate::common::Warnings;
use crate::config::AnalysisConfig;
use crate::error::ChainTraceResult;
use crate::model::{ExprId, MethodId, ProgramModel};
use crate::usage::{CallChain, CallChainEntry};

/// One pending branch of the upward trace.
///
/// `visited` and `chain` are owned by the frame: fanning out clones them,
/// so a branch never observes its siblings.
struct Frame {
    method: MethodId,
    depth: usize,
    visited: HashSet<MethodSignature>,
    chain: CallChain,
}

/// Why a branch was cut short before reaching a natural entry point.
enum Truncation {
    Depth,
    TimeBudget,
}

/// Builds call chains from usage sites up to entry points.
///
/// One walker lives for one analysis run. It is `Sync`: detection may call
/// [`CallChainWalker::build_call_chains`] from many rayon workers at once.
pub struct CallChainWalker<'m> {
    model: &'m ProgramModel,
    config: AnalysisConfig,
    warnings: &'m Warnings,
    cache: CallerCache,
    cycles: AtomicUsize,
}

impl<'m> CallChainWalker<'m> {
    pub fn new(model: &'m ProgramModel, config: AnalysisConfig, warnings: &'m Warnings) -> Self {
        Self {
            model,
            config,
            warnings,
            cache: CallerCache::new(),
            cycles: AtomicUsize::new(0),
        }
    }

    /// Returns one chain per entry point reachable from the method enclosing `site`.
    ///
    /// A site outside any method yields a single empty chain. Internal failures
    /// also yield a single empty chain and record a warning.
    pub fn build_call_chains(&self, site: ExprId) -> Vec<CallChain> {
        let expr = match self.model.require_expr(site) {
            Ok(expr) => expr,
            Err(e) => return self.failed(e.to_string()),
        };

        match expr.enclosing_method {
            Some(method) => {
                debug!(
                    site = %site,
                    position = ?expr.position,
                    "Building call chain from usage"
                );
                self.build_call_chains_for_method(method)
            }
            None => {
                debug!(site = %site, "Usage not within a method");
                vec![Vec::new()]
            }
        }
    }

    /// Same as [`build_call_chains`](Self::build_call_chains), starting from a method.
    pub fn build_call_chains_for_method(&self, method: MethodId) -> Vec<CallChain> {
        let traced = self.trace_upward(method).and_then(|chains| {
            if chains.is_empty() {
                debug!("No entry point found, using containing method as single entry");
                Ok(vec![vec![self.entry(method, true)?]])
            } else {
                Ok(chains)
            }
        });

        match traced {
            Ok(chains) => chains,
            Err(e) => self.failed(e.to_string()),
        }
    }

    fn failed(&self, message: String) -> Vec<CallChain> {
        warn!(error = %message, "Error building call chain");
        self.warnings
            .push(format!("Call chain construction failed: {}", message));
        vec![Vec::new()]
    }

    /// Depth-first upward trace over an explicit work stack.
    ///
    /// Callers are pushed in reverse so they are explored in call-expression
    /// order, which keeps the chain order identical to a recursive walk.
    fn trace_upward(&self, start: MethodId) -> ChainTraceResult<Vec<CallChain>> {
        let deadline = self.config.time_budget().map(|b| Instant::now() + b);
        let mut chains = Vec::new();
        let mut stack = vec![Frame {
            method: start,
            depth: 0,
            visited: HashSet::new(),
            chain: Vec::new(),
        }];

        while let Some(frame) = stack.pop() {
            let decl = self.model.require_method(frame.method)?;
            let signature = MethodSignature::of(self.model, decl);

            if frame.visited.contains(&signature) {
                warn!(method = %signature, "Circular reference detected");
                self.cycles.fetch_add(1, Ordering::Relaxed);
                self.warnings
                    .push(format!("Circular reference detected in {}", signature));
                continue;
            }

            if let Some(reason) = self.truncation(frame.depth, deadline) {
                let message = match reason {
                    Truncation::Depth => {
                        debug!(
                            max_depth = self.config.max_depth().as_raw(),
                            method = %signature,
                            "Max depth reached"
                        );
                        format!("Max depth reached at {}", signature)
                    }
                    Truncation::TimeBudget => {
                        debug!(method = %signature, "Time budget exhausted");
                        format!("Time budget exhausted at {}", signature)
                    }
                };
                self.warnings.push(message);
                let mut chain = frame.chain;
                chain.push(self.entry(frame.method, true)?);
                chains.push(chain);
                continue;
            }

            let mut visited = frame.visited;
            visited.insert(signature.clone());
            let mut chain = frame.chain;
            chain.push(self.entry(frame.method, false)?);

            let callers = self.find_callers(frame.method)?;
            if callers.is_empty() {
                debug!(method = %signature, "Found entry point");
                if let Some(last) = chain.last_mut() {
                    last.is_entry_point = true;
                }
                chains.push(chain);
                continue;
            }

            for &caller in callers.callers.iter().rev() {
                stack.push(Frame {
                    method: caller,
                    depth: frame.depth + 1,
                    visited: visited.clone(),
                    chain: chain.clone(),
                });
            }
        }

        Ok(chains)
    }

    fn truncation(&self, depth: usize, deadline: Option<Instant>) -> Option<Truncation> {
        if self.config.max_depth().is_reached(depth) {
            Some(Truncation::Depth)
        } else if deadline.is_some_and(|d| Instant::now() >= d) {
            Some(Truncation::TimeBudget)
        } else {
            None
        }
    }

    /// Methods containing a call that matches `method` by simple name,
    /// declaring type and argument count. Self-calls are excluded.
    ///
    /// Results are cached by signature for the lifetime of the walker.
    pub fn find_callers(&self, method: MethodId) -> ChainTraceResult<Arc<CallerSet>> {
        let target = self.model.require_method(method)?;
        let signature = MethodSignature::of(self.model, target);

        if let Some(hit) = self.cache.get(&signature) {
            return Ok(hit);
        }

        debug!(method = %signature, "Finding callers");

        let Some(owner) = self.model.type_decl(target.owner) else {
            return Ok(self.cache.insert(signature, CallerSet::default()));
        };
        let arity = target.parameters.len();

        let mut seen = HashSet::new();
        let mut callers = Vec::new();
        for &call_id in self.model.invocations() {
            let Some(call) = self.model.expr(call_id) else {
                continue;
            };
            let Some(invocation) = call.as_invocation() else {
                continue;
            };
            let executable = &invocation.executable;
            let same_type = executable
                .declaring_type
                .as_ref()
                .is_some_and(|t| t.qualified_name() == owner.qualified_name);

            if executable.name != target.name || !same_type || executable.parameter_count != arity {
                continue;
            }
            if let Some(caller) = call.enclosing_method {
                if caller != method && seen.insert(caller) {
                    callers.push(caller);
                }
            }
        }

        let ambiguous_overload = self.model.declared_overloads(target.owner, &target.name, arity) > 1;
        if ambiguous_overload {
            self.warnings.push(format!(
                "Ambiguous overload: callers of {} matched by name and arity only",
                signature
            ));
        }

        debug!(method = %signature, callers = callers.len(), "Found callers");

        Ok(self.cache.insert(
            signature,
            CallerSet {
                callers,
                ambiguous_overload,
            },
        ))
    }

    fn entry(&self, method: MethodId, is_entry_point: bool) -> ChainTraceResult<CallChainEntry> {
        let decl = self.model.require_method(method)?;
        let class_name = self
            .model
            .type_decl(decl.owner)
            .map(|t| t.qualified_name.clone())
            .unwrap_or_else(|| "unknown".to_string());

        Ok(CallChainEntry {
            class_name,
            method_signature: short_signature(decl),
            visibility: decl.visibility,
            line_number: decl.line(),
            is_entry_point,
            ambiguous_overload: self
                .model
                .declared_overloads(decl.owner, &decl.name, decl.parameters.len())
                > 1,
        })
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drops every cached caller set.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Number of cyclic branches dropped so far.
    pub fn cycle_count(&self) -> usize {
        self.cycles.load(Ordering::Relaxed)
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }
}
