//! Smart service discovery.
//!
//! A project that *is* a service declares an interface annotated
//! `@SmartService("<artifactId>")`. Its `@Function` methods describe the
//! functions the service exposes, unless the service is a UI service.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{info, warn};

use crate::callchain::short_signature;
use crate::model::{MethodDecl, ProgramModel, TypeDecl, TypeKind};

pub const SMART_SERVICE_ANNOTATION: &str = "dev.myorg.mysection.smart.SmartService";
pub const UI_SERVICE_ANNOTATION: &str = "dev.myorg.mysection.smart.UIService";
pub const FUNCTION_ANNOTATION: &str = "dev.myorg.mysection.smart.Function";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionMetadata {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartServiceInfo {
    pub service_id: String,
    pub is_ui_service: bool,
    /// Qualified name of the annotated interface.
    pub interface_name: String,
    /// `Type.method(T1, T2)` to function metadata, in declaration order.
    pub function_methods: IndexMap<String, FunctionMetadata>,
}

/// Finds the smart service interface for an artifact.
#[derive(Debug, Default)]
pub struct SmartServiceDetector;

impl SmartServiceDetector {
    pub fn new() -> Self {
        Self
    }

    /// Returns `None` when no interface carries `@SmartService(artifact_id)`.
    pub fn analyze(&self, model: &ProgramModel, artifact_id: &str) -> Option<SmartServiceInfo> {
        info!(artifact_id, "Looking for smart service interface");

        let Some(interface) = find_service_interface(model, artifact_id) else {
            warn!(artifact_id, "No @SmartService interface found");
            return None;
        };
        info!(interface = %interface.qualified_name, "Found smart service interface");

        let is_ui_service = is_ui_service(model, interface);
        let function_methods = if is_ui_service {
            IndexMap::new()
        } else {
            function_metadata(model, interface)
        };

        Some(SmartServiceInfo {
            service_id: artifact_id.to_string(),
            is_ui_service,
            interface_name: interface.qualified_name.clone(),
            function_methods,
        })
    }
}

fn find_service_interface<'m>(model: &'m ProgramModel, artifact_id: &str) -> Option<&'m TypeDecl> {
    model.types().map(|(_, t)| t).find(|t| {
        t.kind == TypeKind::Interface
            && t.annotation(SMART_SERVICE_ANNOTATION)
                .and_then(|a| a.value("value"))
                .and_then(|v| v.as_str())
                .is_some_and(|v| v.eq_ignore_ascii_case(artifact_id))
    })
}

/// `@UIService` on the interface, or on a class directly implementing it.
fn is_ui_service(model: &ProgramModel, interface: &TypeDecl) -> bool {
    if interface.has_annotation(UI_SERVICE_ANNOTATION) {
        info!("@UIService detected directly on interface");
        return true;
    }

    model
        .types()
        .map(|(_, t)| t)
        .filter(|t| t.kind == TypeKind::Class)
        .filter(|t| {
            t.super_interfaces
                .iter()
                .any(|i| i.qualified_name() == interface.qualified_name)
        })
        .any(|t| {
            let ui = t.has_annotation(UI_SERVICE_ANNOTATION);
            if ui {
                info!(class = %t.qualified_name, "@UIService detected on implementing class");
            }
            ui
        })
}

fn function_metadata(model: &ProgramModel, interface: &TypeDecl) -> IndexMap<String, FunctionMetadata> {
    interface
        .methods
        .iter()
        .filter_map(|&m| model.method(m))
        .filter_map(|method| {
            let annotation = method.annotation(FUNCTION_ANNOTATION)?;
            let value_or_name = |key: &str| {
                annotation
                    .value(key)
                    .map(|v| v.text().to_string())
                    .unwrap_or_else(|| method.name.clone())
            };
            Some((
                qualified_signature(interface, method),
                FunctionMetadata {
                    id: value_or_name("id"),
                    name: value_or_name("name"),
                },
            ))
        })
        .collect()
}

fn qualified_signature(owner: &TypeDecl, method: &MethodDecl) -> String {
    format!("{}.{}", owner.qualified_name, short_signature(method))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Annotation, AnnotationValue, Parameter, ProgramModelBuilder, TypeRef};

    fn smart(value: &str) -> Annotation {
        Annotation::marker(TypeRef::new(SMART_SERVICE_ANNOTATION))
            .with_value("value", AnnotationValue::Str(value.to_string()))
    }

    fn service_model(ui_on_impl: bool) -> ProgramModel {
        let mut b = ProgramModelBuilder::new();
        let iface = b.add_type(TypeDecl::interface("com.acme.svc.IBilling").annotated(smart("xtstclfnj")));
        let mut function = MethodDecl::new(iface, "charge")
            .with_parameters(vec![Parameter::typed("req", "com.acme.svc.ChargeRequest")]);
        function.annotations.push(
            Annotation::marker(TypeRef::new(FUNCTION_ANNOTATION))
                .with_value("id", AnnotationValue::Str("BILL-01".to_string())),
        );
        b.add_method(function);
        b.add_method(MethodDecl::new(iface, "helper"));

        let mut class = TypeDecl::class("com.acme.svc.Billing").implementing("com.acme.svc.IBilling");
        if ui_on_impl {
            class = class.annotated(Annotation::marker(TypeRef::new(UI_SERVICE_ANNOTATION)));
        }
        b.add_type(class);
        b.add_type(TypeDecl::interface("com.acme.svc.IOther").annotated(smart("OTHER")));
        b.build()
    }

    #[test]
    fn test_regular_service_functions() {
        let model = service_model(false);
        let info = SmartServiceDetector::new().analyze(&model, "XTSTCLFNJ").unwrap();

        assert_eq!(info.interface_name, "com.acme.svc.IBilling");
        assert!(!info.is_ui_service);
        assert_eq!(info.function_methods.len(), 1);
        let meta = &info.function_methods["com.acme.svc.IBilling.charge(com.acme.svc.ChargeRequest)"];
        assert_eq!(meta.id, "BILL-01");
        assert_eq!(meta.name, "charge");
    }

    #[test]
    fn test_ui_service_on_implementation() {
        let model = service_model(true);
        let info = SmartServiceDetector::new().analyze(&model, "xtstclfnj").unwrap();
        assert!(info.is_ui_service);
        assert!(info.function_methods.is_empty());
    }

    #[test]
    fn test_no_matching_interface() {
        let model = service_model(false);
        assert!(SmartServiceDetector::new().analyze(&model, "MISSING").is_none());
    }

    #[test]
    fn test_functions_keep_declaration_order() {
        let function = |id: &str| {
            Annotation::marker(TypeRef::new(FUNCTION_ANNOTATION))
                .with_value("id", AnnotationValue::Str(id.to_string()))
        };
        let mut b = ProgramModelBuilder::new();
        let iface = b.add_type(TypeDecl::interface("com.acme.svc.IBilling").annotated(smart("XTSTCLFNJ")));
        for name in ["zeta", "alpha", "mid"] {
            let mut method = MethodDecl::new(iface, name);
            method.annotations.push(function(&name.to_uppercase()));
            b.add_method(method);
        }
        let model = b.build();

        let info = SmartServiceDetector::new().analyze(&model, "XTSTCLFNJ").unwrap();
        let ids: Vec<&str> = info.function_methods.values().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["ZETA", "ALPHA", "MID"]);
    }
}
