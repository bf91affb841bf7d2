//! Best-effort type name resolution without a classpath.
//!
//! Names are resolved against, in order: nested types of the enclosing
//! declarations, single-type imports, the unit's own package, wildcard
//! imports and the well-known `java.lang` types. Anything else keeps the
//! name as written.

use std::collections::{HashMap, HashSet};

use crate::model::TypeRef;

const PRIMITIVES: &[&str] = &[
    "boolean", "byte", "char", "short", "int", "long", "float", "double", "void",
];

const JAVA_LANG: &[&str] = &[
    "Boolean",
    "Byte",
    "CharSequence",
    "Character",
    "Class",
    "Comparable",
    "Deprecated",
    "Double",
    "Enum",
    "Error",
    "Exception",
    "Float",
    "FunctionalInterface",
    "IllegalArgumentException",
    "IllegalStateException",
    "Integer",
    "Iterable",
    "Long",
    "Math",
    "NullPointerException",
    "Number",
    "Object",
    "Override",
    "Record",
    "Runnable",
    "RuntimeException",
    "Short",
    "String",
    "StringBuilder",
    "SuppressWarnings",
    "System",
    "Thread",
    "Throwable",
    "UnsupportedOperationException",
    "Void",
];

/// Qualified names of every type declared in the scanned sources.
#[derive(Debug, Default)]
pub struct TypeIndex {
    known: HashSet<String>,
}

impl TypeIndex {
    pub fn new(names: impl IntoIterator<Item = String>) -> Self {
        Self {
            known: names.into_iter().collect(),
        }
    }

    pub fn contains(&self, qualified_name: &str) -> bool {
        self.known.contains(qualified_name)
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Maps a dotted name onto the `Outer$Inner` form when the index knows it.
    pub fn normalize(&self, dotted: &str) -> String {
        if self.contains(dotted) {
            return dotted.to_string();
        }
        let segments: Vec<&str> = dotted.split('.').collect();
        for split in (1..segments.len()).rev() {
            let candidate = format!(
                "{}${}",
                segments[..split].join("."),
                segments[split..].join("$")
            );
            if self.contains(&candidate) {
                return candidate;
            }
        }
        dotted.to_string()
    }
}

/// Import-aware resolver for one compilation unit.
#[derive(Debug)]
pub struct TypeResolver<'i> {
    index: &'i TypeIndex,
    package: String,
    single: HashMap<String, String>,
    wildcards: Vec<String>,
    static_members: HashMap<String, String>,
    static_wildcards: Vec<String>,
}

impl<'i> TypeResolver<'i> {
    pub fn new(index: &'i TypeIndex, package: impl Into<String>) -> Self {
        Self {
            index,
            package: package.into(),
            single: HashMap::new(),
            wildcards: Vec::new(),
            static_members: HashMap::new(),
            static_wildcards: Vec::new(),
        }
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// Registers an import declaration given its source text,
    /// e.g. `import static a.b.Topics.ORDER_CREATED;`.
    pub fn add_import(&mut self, declaration: &str) {
        let body = declaration
            .trim()
            .trim_start_matches("import")
            .trim_end_matches(';')
            .trim();
        let (is_static, body) = match body.strip_prefix("static") {
            Some(rest) if rest.starts_with(char::is_whitespace) => (true, rest),
            _ => (false, body),
        };
        let path: String = body.chars().filter(|c| !c.is_whitespace()).collect();

        match (is_static, path.strip_suffix(".*")) {
            (false, Some(package)) => self.wildcards.push(package.to_string()),
            (true, Some(owner)) => self.static_wildcards.push(self.index.normalize(owner)),
            (false, None) => {
                if let Some((_, simple)) = path.rsplit_once('.') {
                    self.single.insert(simple.to_string(), self.index.normalize(&path));
                }
            }
            (true, None) => {
                if let Some((owner, member)) = path.rsplit_once('.') {
                    self.static_members
                        .insert(member.to_string(), self.index.normalize(owner));
                }
            }
        }
    }

    /// Type that a single `import static` brings `member` in from.
    pub fn static_member_owner(&self, member: &str) -> Option<&str> {
        self.static_members.get(member).map(String::as_str)
    }

    /// Types whose static members are all imported.
    pub fn static_wildcards(&self) -> &[String] {
        &self.static_wildcards
    }

    /// Resolves a type as written in source. `enclosing` lists the qualified
    /// names of the enclosing type declarations, outermost first.
    pub fn resolve(&self, written: &str, enclosing: &[String]) -> TypeRef {
        let (base, dims) = strip_decorations(written);
        let mut resolved = self.resolve_base(&base, enclosing);
        for _ in 0..dims {
            resolved.push_str("[]");
        }
        TypeRef::new(resolved)
    }

    /// Like [`resolve`](Self::resolve), but `None` unless the name maps to a
    /// scanned, imported or `java.lang` type.
    pub fn resolve_known(&self, written: &str, enclosing: &[String]) -> Option<TypeRef> {
        let (base, _) = strip_decorations(written);
        let resolved = self.resolve_base(&base, enclosing);
        let known = self.index.contains(&resolved)
            || self.single.values().any(|q| *q == resolved)
            || resolved.strip_prefix("java.lang.").is_some_and(|s| JAVA_LANG.contains(&s));
        known.then(|| TypeRef::new(resolved))
    }

    fn resolve_base(&self, base: &str, enclosing: &[String]) -> String {
        if base.is_empty() || PRIMITIVES.contains(&base) {
            return base.to_string();
        }
        if let Some((first, rest)) = base.split_once('.') {
            let head = self.resolve_simple(first, enclosing);
            if head != first {
                let nested = format!("{}${}", head, rest.replace('.', "$"));
                if self.index.contains(&nested) {
                    return nested;
                }
            }
            return self.index.normalize(base);
        }
        self.resolve_simple(base, enclosing)
    }

    fn resolve_simple(&self, name: &str, enclosing: &[String]) -> String {
        for outer in enclosing.iter().rev() {
            if outer.rsplit(['.', '$']).next() == Some(name) {
                return outer.clone();
            }
            let nested = format!("{}${}", outer, name);
            if self.index.contains(&nested) {
                return nested;
            }
        }
        if let Some(imported) = self.single.get(name) {
            return imported.clone();
        }
        let same_package = qualify(&self.package, name);
        if self.index.contains(&same_package) {
            return same_package;
        }
        for package in &self.wildcards {
            let candidate = self.index.normalize(&qualify(package, name));
            if self.index.contains(&candidate) {
                return candidate;
            }
        }
        if JAVA_LANG.contains(&name) {
            return format!("java.lang.{}", name);
        }
        name.to_string()
    }
}

fn qualify(package: &str, name: &str) -> String {
    if package.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", package, name)
    }
}

/// Drops type arguments, annotations and whitespace; returns the bare name and
/// the number of array dimensions.
fn strip_decorations(written: &str) -> (String, usize) {
    let mut base = String::new();
    let mut depth = 0usize;
    let mut dims = 0usize;
    let mut skipping_annotation = false;

    for c in written.chars() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            _ if depth > 0 => {}
            '@' => skipping_annotation = true,
            c if c.is_whitespace() => skipping_annotation = false,
            _ if skipping_annotation => {}
            '[' => dims += 1,
            ']' => {}
            c => base.push(c),
        }
    }
    if let Some(stripped) = base.strip_suffix("...") {
        base = stripped.to_string();
        dims += 1;
    }
    (base, dims)
}
