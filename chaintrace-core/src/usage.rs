//! Usage records and call-chain entries produced by detection.
//!
//! Records are plain values: created once per detected site and never
//! mutated. Every record keeps all call chains computed for its site, primary
//! chain first; [`UsageRecord::call_chain`] returns the primary one.

use serde::Serialize;
use std::fmt;

use crate::common::Visibility;

/// One frame of a reconstructed call path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallChainEntry {
    pub class_name: String,
    /// `name(T1, T2)` with qualified parameter types, `?` where unknown.
    pub method_signature: String,
    pub visibility: Visibility,
    pub line_number: Option<usize>,
    pub is_entry_point: bool,
    /// Callers of this method were matched by name and arity while the
    /// declaring type has several overloads of that arity.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub ambiguous_overload: bool,
}

impl fmt::Display for CallChainEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} [{}, line {}]",
            self.class_name,
            self.method_signature,
            self.visibility,
            line_or_unknown(self.line_number)
        )?;
        if self.is_entry_point {
            f.write_str(" [ENTRY POINT]")?;
        }
        if self.ambiguous_overload {
            f.write_str(" [AMBIGUOUS OVERLOAD]")?;
        }
        Ok(())
    }
}

/// Ordered path from the method containing a usage up to an entry point.
pub type CallChain = Vec<CallChainEntry>;

/// Where a usage was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub file_path: String,
    pub class_name: String,
    pub method_name: String,
    pub line_number: Option<usize>,
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self {
            file_path: "unknown".to_string(),
            class_name: "unknown".to_string(),
            method_name: "unknown".to_string(),
            line_number: None,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}() [{}:{}]",
            self.class_name,
            self.method_name,
            self.file_path,
            line_or_unknown(self.line_number)
        )
    }
}

fn line_or_unknown(line: Option<usize>) -> i64 {
    line.map(|l| l as i64).unwrap_or(-1)
}

/// Behavior shared by the three usage record kinds.
pub trait UsageRecord {
    fn usage_location(&self) -> &SourceLocation;

    /// All chains computed for the site, primary first.
    fn call_chains(&self) -> &[CallChain];

    /// Drops every chain but the primary one.
    fn with_primary_chain_only(self) -> Self
    where
        Self: Sized;

    /// The primary chain, or an empty slice when none was computed.
    fn call_chain(&self) -> &[CallChainEntry] {
        self.call_chains().first().map(Vec::as_slice).unwrap_or(&[])
    }
}

macro_rules! impl_usage_record {
    ($ty:ty) => {
        impl UsageRecord for $ty {
            fn usage_location(&self) -> &SourceLocation {
                &self.usage_location
            }

            fn call_chains(&self) -> &[CallChain] {
                &self.call_chains
            }

            fn with_primary_chain_only(mut self) -> Self {
                self.call_chains.truncate(1);
                self
            }
        }
    };
}

// ============================================================================
// Function client usages
// ============================================================================

/// Outbound call to a remote function through its generated client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionClientUsage {
    pub function_id: String,
    pub method_name: String,
    pub usage_location: SourceLocation,
    pub call_chains: Vec<CallChain>,
    /// `void`, `String`, `Unknown` or a fully qualified type name.
    pub input_type: String,
    pub has_scheduling: bool,
    pub scheduling_expression: Option<String>,
}

impl fmt::Display for FunctionClientUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FunctionClient[{}.{}({})] at {}",
            self.function_id, self.method_name, self.input_type, self.usage_location
        )
    }
}

impl_usage_record!(FunctionClientUsage);

// ============================================================================
// Service usages
// ============================================================================

/// How a service dependency is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceUsageKind {
    Instantiation,
    MethodCall,
    StaticMethod,
}

impl fmt::Display for ServiceUsageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Instantiation => "INSTANTIATION",
            Self::MethodCall => "METHOD_CALL",
            Self::StaticMethod => "STATIC_METHOD",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceUsage {
    pub service_id: String,
    pub service_package: String,
    pub usage_type: ServiceUsageKind,
    pub usage_location: SourceLocation,
    pub call_chains: Vec<CallChain>,
    pub target_class: String,
    /// Absent for instantiations.
    pub target_method: Option<String>,
}

impl fmt::Display for ServiceUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Service[{}] {}: {}",
            self.service_id, self.usage_type, self.target_class
        )?;
        if let Some(method) = &self.target_method {
            write!(f, ".{}()", method)?;
        }
        write!(f, " at {}", self.usage_location)
    }
}

impl_usage_record!(ServiceUsage);

// ============================================================================
// Event publish usages
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TopicResolutionStatus {
    /// The topic reduced to a string literal.
    Resolved,
    /// A variable without a visible literal initializer.
    UnknownVariable,
    /// Any other expression shape.
    UnknownComplex,
}

impl fmt::Display for TopicResolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Resolved => "RESOLVED",
            Self::UnknownVariable => "UNKNOWN_VARIABLE",
            Self::UnknownComplex => "UNKNOWN_COMPLEX",
        })
    }
}

/// Call publishing an event through the publisher capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPublishUsage {
    pub topic_name: String,
    pub topic_status: TopicResolutionStatus,
    /// Type of the unresolved topic expression, kept for diagnostics.
    pub topic_variable_type: Option<String>,
    pub usage_location: SourceLocation,
    pub call_chains: Vec<CallChain>,
    pub message_data_type: Option<String>,
}

impl fmt::Display for EventPublishUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EDA[topic={}, status={}] at {}",
            self.topic_name, self.topic_status, self.usage_location
        )
    }
}

impl_usage_record!(EventPublishUsage);

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(class: &str, sig: &str, entry_point: bool) -> CallChainEntry {
        CallChainEntry {
            class_name: class.to_string(),
            method_signature: sig.to_string(),
            visibility: Visibility::Public,
            line_number: Some(12),
            is_entry_point: entry_point,
            ambiguous_overload: false,
        }
    }

    fn location() -> SourceLocation {
        SourceLocation {
            file_path: "src/main/java/com/acme/Billing.java".to_string(),
            class_name: "com.acme.Billing".to_string(),
            method_name: "charge".to_string(),
            line_number: Some(40),
        }
    }

    #[test]
    fn test_entry_display() {
        assert_eq!(
            entry("com.acme.Api", "handle(java.lang.String)", true).to_string(),
            "com.acme.Api.handle(java.lang.String) [PUBLIC, line 12] [ENTRY POINT]"
        );
        let mut unknown_line = entry("com.acme.Api", "run()", false);
        unknown_line.line_number = None;
        unknown_line.visibility = Visibility::Package;
        assert_eq!(unknown_line.to_string(), "com.acme.Api.run() [PACKAGE, line -1]");
    }

    #[test]
    fn test_location_display_and_default() {
        assert_eq!(
            location().to_string(),
            "com.acme.Billing.charge() [src/main/java/com/acme/Billing.java:40]"
        );
        assert_eq!(
            SourceLocation::default().to_string(),
            "unknown.unknown() [unknown:-1]"
        );
    }

    #[test]
    fn test_service_display_with_and_without_method() {
        let mut usage = ServiceUsage {
            service_id: "MDZ017J".to_string(),
            service_package: "dev.myorg.services.mdz017j".to_string(),
            usage_type: ServiceUsageKind::Instantiation,
            usage_location: location(),
            call_chains: vec![],
            target_class: "AccountClient".to_string(),
            target_method: None,
        };
        assert!(usage.to_string().starts_with("Service[MDZ017J] INSTANTIATION: AccountClient at "));

        usage.usage_type = ServiceUsageKind::MethodCall;
        usage.target_method = Some("lookup".to_string());
        assert!(usage.to_string().contains("METHOD_CALL: AccountClient.lookup() at "));
    }

    #[test]
    fn test_primary_chain_selection() {
        let usage = EventPublishUsage {
            topic_name: "orders.created".to_string(),
            topic_status: TopicResolutionStatus::Resolved,
            topic_variable_type: None,
            usage_location: location(),
            call_chains: vec![
                vec![entry("a.A", "x()", true)],
                vec![entry("a.B", "y()", true)],
            ],
            message_data_type: None,
        };
        assert_eq!(usage.call_chain()[0].class_name, "a.A");
        assert_eq!(usage.to_string(), format!("EDA[topic=orders.created, status=RESOLVED] at {}", location()));

        let trimmed = usage.with_primary_chain_only();
        assert_eq!(trimmed.call_chains().len(), 1);
    }

    #[test]
    fn test_serialized_field_names() {
        let json = serde_json::to_value(entry("a.A", "x()", true)).unwrap();
        assert_eq!(json["className"], "a.A");
        assert_eq!(json["isEntryPoint"], true);
        assert_eq!(json["visibility"], "PUBLIC");
        assert!(json.get("ambiguousOverload").is_none());
    }
}
