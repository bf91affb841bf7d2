//! Upward call-chain reconstruction.
//!
//! Given a usage site, the walker climbs from the method containing it to
//! every method that (transitively) calls it, producing one chain per
//! reachable entry point:
//!
//! ```text
//!   usage site ──► containing method m0
//!                      │ find_callers (cached by signature)
//!            ┌─────────┴─────────┐
//!            ▼                   ▼
//!           m1                  m2 ──► (no callers) = entry point
//!            │
//!           m3 (depth limit) = artificial entry point
//! ```
//!
//! Each branch carries its own visited set and chain prefix, so sibling
//! branches never see each other's state. A branch that revisits a method is
//! dropped with a warning; a branch that hits the depth limit or the time
//! budget is truncated to an artificial entry point.

mod cache;
mod walker;

pub use cache::{CacheStats, CallerCache, CallerSet};
pub use walker::CallChainWalker;

use std::fmt;

use crate::model::{MethodDecl, ProgramModel};

/// Unique method identity: `owner.qualified.Name.method(T1, T2)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodSignature(String);

impl MethodSignature {
    /// Builds the signature of `method`, using `unknown` for a missing owner.
    pub fn of(model: &ProgramModel, method: &MethodDecl) -> Self {
        let owner = model
            .type_decl(method.owner)
            .map(|t| t.qualified_name.as_str())
            .unwrap_or("unknown");
        Self(format!("{}.{}", owner, short_signature(method)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MethodSignature {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `name(T1, T2)` with qualified parameter types, `?` where a type is unknown.
pub fn short_signature(method: &MethodDecl) -> String {
    let params: Vec<&str> = method
        .parameters
        .iter()
        .map(|p| p.type_ref.as_ref().map(|t| t.qualified_name()).unwrap_or("?"))
        .collect();
    format!("{}({})", method.name, params.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MethodDecl, Parameter, TypeDecl, TypeRef};

    #[test]
    fn test_signatures() {
        let mut b = ProgramModel::builder();
        let t = b.add_type(TypeDecl::class("com.acme.Orders"));
        let m = b.add_method(MethodDecl::new(t, "place").with_parameters(vec![
            Parameter::typed("id", "java.lang.String"),
            Parameter::new("qty", None),
        ]));
        let model = b.build();
        let decl = model.method(m).unwrap();

        assert_eq!(short_signature(decl), "place(java.lang.String, ?)");
        assert_eq!(
            MethodSignature::of(&model, decl).as_str(),
            "com.acme.Orders.place(java.lang.String, ?)"
        );
    }

    #[test]
    fn test_signature_unknown_owner() {
        let mut elsewhere = ProgramModel::builder();
        let foreign_owner = elsewhere.add_type(TypeDecl::class("x.Y"));
        let orphan = MethodDecl::new(foreign_owner, "run")
            .with_parameters(vec![Parameter::new("x", Some(TypeRef::new("int")))]);

        let empty = ProgramModel::default();
        assert_eq!(MethodSignature::of(&empty, &orphan).as_str(), "unknown.run(int)");
    }
}
