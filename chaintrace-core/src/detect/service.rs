//! Service usages: instantiations, instance calls and static calls into a
//! service's base package.

use std::collections::BTreeSet;

use tracing::{debug, info};

use super::UsageDetector;
use crate::config::DetectionConventions;
use crate::error::ChainTraceResult;
use crate::model::{Expr, ExprId, TypeRef};
use crate::usage::{ServiceUsage, ServiceUsageKind};

/// A service id and the package its classes live under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePackage {
    pub service_id: String,
    pub package: String,
    prefix: String,
}

impl ServicePackage {
    pub fn new(service_id: &str, conventions: &DetectionConventions) -> Self {
        let package = conventions.service_package(service_id);
        Self {
            service_id: service_id.to_string(),
            prefix: format!("{}.", package),
            package,
        }
    }

    /// True for types declared inside the package or one of its sub-packages.
    pub fn contains(&self, type_ref: &TypeRef) -> bool {
        type_ref.starts_with(&self.prefix)
    }
}

impl UsageDetector<'_> {
    /// Finds every touch point on the packages of `service_ids`.
    ///
    /// Output order: all instantiations, then instance calls, then static calls.
    pub fn detect_services(
        &self,
        service_ids: &BTreeSet<String>,
    ) -> ChainTraceResult<Vec<ServiceUsage>> {
        self.conventions.validate()?;
        info!(services = service_ids.len(), "Detecting service usages");

        if service_ids.is_empty() {
            debug!("No service IDs to detect");
            return Ok(Vec::new());
        }

        let packages: Vec<ServicePackage> = service_ids
            .iter()
            .map(|id| ServicePackage::new(id, self.conventions))
            .collect();

        let mut usages = self.scan(
            self.model.constructions(),
            "construction expression",
            |id, expr| self.inspect_instantiation(id, expr, &packages),
        );
        usages.extend(self.scan(
            self.model.invocations(),
            "call expression",
            |id, expr| self.inspect_method_call(id, expr, &packages),
        ));
        usages.extend(self.scan(
            self.model.invocations(),
            "static call expression",
            |id, expr| self.inspect_static_call(id, expr, &packages),
        ));

        info!("Found {} service usages", usages.len());
        Ok(usages)
    }

    fn inspect_instantiation(
        &self,
        id: ExprId,
        expr: &Expr,
        packages: &[ServicePackage],
    ) -> ChainTraceResult<Option<ServiceUsage>> {
        let Some(constructed) = expr.as_construction().and_then(|c| c.type_ref.as_ref()) else {
            return Ok(None);
        };
        Ok(self.service_usage(id, expr, packages, ServiceUsageKind::Instantiation, constructed, None))
    }

    fn inspect_method_call(
        &self,
        id: ExprId,
        expr: &Expr,
        packages: &[ServicePackage],
    ) -> ChainTraceResult<Option<ServiceUsage>> {
        let Some(call) = expr.as_invocation() else {
            return Ok(None);
        };
        let Some(target) = call.target else {
            return Ok(None);
        };
        let Some(target_type) = &self.model.require_expr(target)?.static_type else {
            return Ok(None);
        };
        Ok(self.service_usage(
            id,
            expr,
            packages,
            ServiceUsageKind::MethodCall,
            target_type,
            Some(call.executable.name.as_str()),
        ))
    }

    fn inspect_static_call(
        &self,
        id: ExprId,
        expr: &Expr,
        packages: &[ServicePackage],
    ) -> ChainTraceResult<Option<ServiceUsage>> {
        let Some(call) = expr.as_invocation() else {
            return Ok(None);
        };
        if call.target.is_some() {
            return Ok(None);
        }
        let Some(declaring) = &call.executable.declaring_type else {
            return Ok(None);
        };
        Ok(self.service_usage(
            id,
            expr,
            packages,
            ServiceUsageKind::StaticMethod,
            declaring,
            Some(call.executable.name.as_str()),
        ))
    }

    fn service_usage(
        &self,
        id: ExprId,
        expr: &Expr,
        packages: &[ServicePackage],
        usage_type: ServiceUsageKind,
        touched: &TypeRef,
        method: Option<&str>,
    ) -> Option<ServiceUsage> {
        let service = packages.iter().find(|p| p.contains(touched))?;

        debug!(
            service_id = %service.service_id,
            kind = %usage_type,
            class = touched.simple_name(),
            "Found service usage"
        );

        Some(ServiceUsage {
            service_id: service.service_id.clone(),
            service_package: service.package.clone(),
            usage_type,
            usage_location: self.source_location(expr),
            call_chains: self.call_chains(id),
            target_class: touched.simple_name().to_string(),
            target_method: method.map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use crate::callchain::CallChainWalker;
    use crate::common::Warnings;
    use crate::config::AnalysisConfig;

    const ACCOUNTS: &str = "dev.myorg.services.mdz017j.client.AccountClient";

    fn detect(f: Fixture, service_ids: &[&str]) -> Vec<ServiceUsage> {
        let model = f.b.build();
        let warnings = Warnings::new();
        let conventions = DetectionConventions::default();
        let walker = CallChainWalker::new(&model, AnalysisConfig::DEFAULT, &warnings);
        let detector = UsageDetector::new(&model, &conventions, &walker, &warnings);
        let ids: BTreeSet<String> = service_ids.iter().map(|s| s.to_string()).collect();
        let usages = detector.detect_services(&ids).unwrap();
        usages
    }

    #[test]
    fn test_package_prefix_needs_separator() {
        let pkg = ServicePackage::new("MDZ017J", &DetectionConventions::default());
        assert_eq!(pkg.package, "dev.myorg.services.mdz017j");
        assert!(pkg.contains(&TypeRef::new(ACCOUNTS)));
        assert!(!pkg.contains(&TypeRef::new("dev.myorg.services.mdz017jx.Other")));
    }

    #[test]
    fn test_instantiation() {
        let mut f = Fixture::new();
        f.add(Expr::construction(TypeRef::new(ACCOUNTS), vec![]));

        let usages = detect(f, &["MDZ017J"]);
        assert_eq!(usages.len(), 1);
        assert_eq!(usages[0].usage_type, ServiceUsageKind::Instantiation);
        assert_eq!(usages[0].target_class, "AccountClient");
        assert_eq!(usages[0].target_method, None);
        assert_eq!(usages[0].service_package, "dev.myorg.services.mdz017j");
    }

    #[test]
    fn test_instance_call() {
        let mut f = Fixture::new();
        let client = f.typed_read("accounts", ACCOUNTS);
        f.add(Expr::invocation("lookup", Some(TypeRef::new(ACCOUNTS)), Some(client), vec![]));

        let usages = detect(f, &["MDZ017J"]);
        assert_eq!(usages.len(), 1);
        assert_eq!(usages[0].usage_type, ServiceUsageKind::MethodCall);
        assert_eq!(usages[0].target_method.as_deref(), Some("lookup"));
    }

    #[test]
    fn test_targetless_static_call() {
        let mut f = Fixture::new();
        f.add(Expr::invocation("defaults", Some(TypeRef::new(ACCOUNTS)), None, vec![]));

        let usages = detect(f, &["MDZ017J"]);
        assert_eq!(usages.len(), 1);
        assert_eq!(usages[0].usage_type, ServiceUsageKind::StaticMethod);
        assert_eq!(usages[0].target_class, "AccountClient");
        assert_eq!(usages[0].target_method.as_deref(), Some("defaults"));
    }

    #[test]
    fn test_type_qualified_static_call_counts_as_method_call() {
        let mut f = Fixture::new();
        let class = f.type_access(ACCOUNTS);
        f.add(Expr::invocation("defaults", Some(TypeRef::new(ACCOUNTS)), Some(class), vec![]));

        let usages = detect(f, &["MDZ017J"]);
        assert_eq!(usages.len(), 1);
        assert_eq!(usages[0].usage_type, ServiceUsageKind::MethodCall);
    }

    #[test]
    fn test_kinds_grouped_in_scan_order() {
        let mut f = Fixture::new();
        let client = f.typed_read("accounts", ACCOUNTS);
        f.add(Expr::invocation("lookup", Some(TypeRef::new(ACCOUNTS)), Some(client), vec![]));
        f.add(Expr::construction(TypeRef::new(ACCOUNTS), vec![]));
        f.add(Expr::invocation("defaults", Some(TypeRef::new(ACCOUNTS)), None, vec![]));
        f.add(Expr::construction(
            TypeRef::new("dev.myorg.services.abc001.Ledger"),
            vec![],
        ));
        // unrelated service and plain JDK types
        f.add(Expr::construction(TypeRef::new("java.util.ArrayList"), vec![]));

        let usages = detect(f, &["MDZ017J", "ABC001"]);
        let kinds: Vec<(ServiceUsageKind, &str)> = usages
            .iter()
            .map(|u| (u.usage_type, u.service_id.as_str()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (ServiceUsageKind::Instantiation, "MDZ017J"),
                (ServiceUsageKind::Instantiation, "ABC001"),
                (ServiceUsageKind::MethodCall, "MDZ017J"),
                (ServiceUsageKind::StaticMethod, "MDZ017J"),
            ]
        );
    }

    #[test]
    fn test_unknown_ids_find_nothing() {
        let mut f = Fixture::new();
        f.add(Expr::construction(TypeRef::new(ACCOUNTS), vec![]));
        assert!(detect(f, &["ZZZ999"]).is_empty());
    }
}
