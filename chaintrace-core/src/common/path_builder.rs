//! Qualified type name building for source lowering.

/// Trait for building Java qualified names from the current declaration scope.
///
/// Implement this on lowering structs that track the package and the stack of
/// enclosing type declarations during traversal.
pub trait QualifiedNameBuilder {
    /// Package of the compilation unit being lowered (empty for the default package).
    fn package(&self) -> &str;

    /// Simple names of the enclosing type declarations, outermost first.
    fn enclosing_types(&self) -> &[String];

    /// Builds the qualified name of the innermost enclosing type.
    ///
    /// # Example
    /// Package `com.acme` with enclosing types `["Outer", "Inner"]`
    /// yields `"com.acme.Outer$Inner"`.
    fn build_current_type_name(&self) -> String {
        let nested = self.enclosing_types().join("$");
        join_package(self.package(), &nested)
    }

    /// Builds the qualified name of a type declared in the current scope.
    ///
    /// # Example
    /// Package `com.acme` with enclosing types `["Outer"]` and `name = "Inner"`
    /// yields `"com.acme.Outer$Inner"`.
    fn build_type_name(&self, name: &str) -> String {
        let mut parts = self.enclosing_types().to_vec();
        parts.push(name.to_string());
        join_package(self.package(), &parts.join("$"))
    }
}

fn join_package(package: &str, name: &str) -> String {
    if package.is_empty() {
        name.to_string()
    } else if name.is_empty() {
        package.to_string()
    } else {
        format!("{}.{}", package, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestScope {
        package: String,
        types: Vec<String>,
    }

    impl QualifiedNameBuilder for TestScope {
        fn package(&self) -> &str {
            &self.package
        }

        fn enclosing_types(&self) -> &[String] {
            &self.types
        }
    }

    #[test]
    fn test_top_level_type() {
        let scope = TestScope {
            package: "com.acme".to_string(),
            types: vec![],
        };
        assert_eq!(scope.build_type_name("Orders"), "com.acme.Orders");
    }

    #[test]
    fn test_nested_type_uses_dollar() {
        let scope = TestScope {
            package: "com.acme".to_string(),
            types: vec!["Outer".to_string(), "Inner".to_string()],
        };
        assert_eq!(scope.build_current_type_name(), "com.acme.Outer$Inner");
        assert_eq!(scope.build_type_name("Deep"), "com.acme.Outer$Inner$Deep");
    }

    #[test]
    fn test_default_package() {
        let scope = TestScope {
            package: String::new(),
            types: vec!["Main".to_string()],
        };
        assert_eq!(scope.build_current_type_name(), "Main");
    }
}
