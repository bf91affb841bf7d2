//! Lowering of tree-sitter-java syntax trees into the program model.
//!
//! Each compilation unit is visited twice. The declaration pass registers
//! types, method signatures and fields so that every unit can see every
//! other unit's members. The body pass then lowers field initializers,
//! method and constructor bodies into expressions. Anonymous and local
//! classes are only reachable from code, so they are declared as the body
//! pass meets them.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;

use tree_sitter::{Node, Tree};

use super::resolve::{TypeIndex, TypeResolver};
use crate::common::{QualifiedNameBuilder, Visibility};
use crate::model::{
    Annotation, AnnotationValue, Construction, Expr, ExprId, ExprKind, Literal, MethodDecl, MethodId,
    Parameter, ProgramModelBuilder, SourcePosition, TypeDecl, TypeId, TypeKind, TypeRef,
    VariableDecl, VariableId, VariableKind,
};

const TYPE_DECLARATIONS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "annotation_type_declaration",
];

const EXPRESSIONS: &[&str] = &[
    "array_access",
    "array_creation_expression",
    "array_initializer",
    "assignment_expression",
    "binary_expression",
    "binary_integer_literal",
    "cast_expression",
    "character_literal",
    "class_literal",
    "decimal_floating_point_literal",
    "decimal_integer_literal",
    "false",
    "field_access",
    "hex_floating_point_literal",
    "hex_integer_literal",
    "identifier",
    "instanceof_expression",
    "lambda_expression",
    "method_invocation",
    "method_reference",
    "null_literal",
    "object_creation_expression",
    "octal_integer_literal",
    "parenthesized_expression",
    "string_literal",
    "switch_expression",
    "ternary_expression",
    "this",
    "true",
    "unary_expression",
    "update_expression",
];

const STRING: &str = "java.lang.String";

/// One parsed source file. `path` is relative to the project root.
pub struct ParsedUnit {
    pub path: PathBuf,
    pub source: String,
    pub tree: Tree,
}

type NodeKey = (usize, usize);

/// Declarations created by the first pass, keyed by unit and syntax node.
#[derive(Debug, Default)]
pub struct DeclRegistry {
    types: HashMap<NodeKey, TypeId>,
    methods: HashMap<NodeKey, MethodId>,
    fields: HashMap<NodeKey, VariableId>,
}

// ============================================================================
// Syntax helpers
// ============================================================================

fn is_comment(kind: &str) -> bool {
    kind == "line_comment" || kind == "block_comment"
}

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| !is_comment(c.kind()))
        .collect()
}

fn child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    named_children(node).into_iter().find(|c| c.kind() == kind)
}

fn field_children<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

fn node_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_type_declaration(kind: &str) -> bool {
    TYPE_DECLARATIONS.contains(&kind)
}

fn is_expression(kind: &str) -> bool {
    EXPRESSIONS.contains(&kind)
}

/// Members of a type body, with enum body declarations flattened in.
fn body_members(node: Node<'_>) -> Vec<Node<'_>> {
    let Some(body) = node.child_by_field_name("body") else {
        return Vec::new();
    };
    let mut members = Vec::new();
    for child in named_children(body) {
        if child.kind() == "enum_body_declarations" {
            members.extend(named_children(child));
        } else {
            members.push(child);
        }
    }
    members
}

/// Keyword modifiers (`public`, `static`, ...) of a declaration.
fn modifier_keywords(node: Node<'_>) -> Vec<&'static str> {
    let Some(modifiers) = child_of_kind(node, "modifiers") else {
        return Vec::new();
    };
    let mut cursor = modifiers.walk();
    modifiers
        .children(&mut cursor)
        .filter(|c| !c.is_named())
        .map(|c| c.kind())
        .collect()
}

/// Value of a string literal (plain or text block) with common escapes applied.
fn unquote(literal: &str) -> String {
    let inner = literal
        .strip_prefix("\"\"\"")
        .and_then(|s| s.strip_suffix("\"\"\""))
        .map(|s| s.trim_start_matches(['\r', '\n']))
        .or_else(|| literal.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
        .unwrap_or(literal);

    let mut value = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            value.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => value.push('\n'),
            Some('t') => value.push('\t'),
            Some('r') => value.push('\r'),
            Some(other @ ('"' | '\'' | '\\')) => value.push(other),
            Some(other) => {
                value.push('\\');
                value.push(other);
            }
            None => value.push('\\'),
        }
    }
    value
}

fn package_name(root: Node<'_>, source: &str) -> String {
    child_of_kind(root, "package_declaration")
        .and_then(|pkg| {
            named_children(pkg)
                .into_iter()
                .find(|c| matches!(c.kind(), "identifier" | "scoped_identifier"))
        })
        .map(|name| collapse_whitespace(node_text(name, source)).replace(' ', ""))
        .unwrap_or_default()
}

// ============================================================================
// Index pass
// ============================================================================

struct TypeNameCollector<'s> {
    source: &'s str,
    package: String,
    enclosing: Vec<String>,
    names: Vec<String>,
}

impl QualifiedNameBuilder for TypeNameCollector<'_> {
    fn package(&self) -> &str {
        &self.package
    }

    fn enclosing_types(&self) -> &[String] {
        &self.enclosing
    }
}

impl TypeNameCollector<'_> {
    fn collect(&mut self, node: Node<'_>) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name, self.source).to_string();
        self.names.push(self.build_type_name(&name));
        self.enclosing.push(name);
        for member in body_members(node) {
            if is_type_declaration(member.kind()) {
                self.collect(member);
            }
        }
        self.enclosing.pop();
    }
}

/// Qualified names of every type declared in `unit`, nested ones included.
pub fn declared_type_names(unit: &ParsedUnit) -> Vec<String> {
    let root = unit.tree.root_node();
    let mut collector = TypeNameCollector {
        source: &unit.source,
        package: package_name(root, &unit.source),
        enclosing: Vec::new(),
        names: Vec::new(),
    };
    for child in named_children(root) {
        if is_type_declaration(child.kind()) {
            collector.collect(child);
        }
    }
    collector.names
}

/// Resolver seeded with the unit's package and imports.
pub fn unit_resolver<'i>(unit: &ParsedUnit, index: &'i TypeIndex) -> TypeResolver<'i> {
    let root = unit.tree.root_node();
    let mut resolver = TypeResolver::new(index, package_name(root, &unit.source));
    for child in named_children(root) {
        if child.kind() == "import_declaration" {
            resolver.add_import(node_text(child, &unit.source));
        }
    }
    resolver
}

// ============================================================================
// Member lookup over the partially built model
// ============================================================================

/// Supertype walk from `type_name`, yielding each reachable declared type once.
fn hierarchy<'b>(builder: &'b ProgramModelBuilder, type_name: &str) -> Vec<(String, &'b TypeDecl)> {
    let mut queue = VecDeque::from([type_name.to_string()]);
    let mut seen = HashSet::new();
    let mut found = Vec::new();

    while let Some(current) = queue.pop_front() {
        if !seen.insert(current.clone()) {
            continue;
        }
        let Some((_, decl)) = builder.type_by_name(&current) else {
            continue;
        };
        queue.extend(
            decl.superclass
                .iter()
                .chain(decl.super_interfaces.iter())
                .map(|t| t.qualified_name().to_string()),
        );
        found.push((current, decl));
    }
    found
}

/// Nearest declaration of `name/arity` on `type_name` or its supertypes.
fn find_method(
    builder: &ProgramModelBuilder,
    type_name: &str,
    name: &str,
    arity: usize,
) -> Option<(String, MethodId)> {
    hierarchy(builder, type_name).into_iter().find_map(|(owner, decl)| {
        decl.methods
            .iter()
            .copied()
            .find(|&m| {
                builder
                    .method(m)
                    .is_some_and(|d| d.name == name && d.parameters.len() == arity)
            })
            .map(|m| (owner, m))
    })
}

fn find_field(builder: &ProgramModelBuilder, type_name: &str, name: &str) -> Option<VariableId> {
    hierarchy(builder, type_name).into_iter().find_map(|(_, decl)| {
        decl.fields
            .iter()
            .copied()
            .find(|&f| builder.variable(f).is_some_and(|v| v.name == name))
    })
}

// ============================================================================
// Lowering
// ============================================================================

/// Lowers one compilation unit into the shared builder.
pub struct UnitLowering<'a, 'b> {
    unit_index: usize,
    unit: &'a ParsedUnit,
    resolver: &'a TypeResolver<'a>,
    builder: &'b mut ProgramModelBuilder,
    registry: &'b mut DeclRegistry,
    singleton_accessor: &'a str,
    enclosing: Vec<String>,
    enclosing_qualified: Vec<String>,
    type_stack: Vec<TypeId>,
    method: Option<MethodId>,
    scopes: Vec<HashMap<String, VariableId>>,
    local_counts: HashMap<(String, String), usize>,
}

impl QualifiedNameBuilder for UnitLowering<'_, '_> {
    fn package(&self) -> &str {
        self.resolver.package()
    }

    fn enclosing_types(&self) -> &[String] {
        &self.enclosing
    }
}

impl<'a, 'b> UnitLowering<'a, 'b> {
    pub fn new(
        unit_index: usize,
        unit: &'a ParsedUnit,
        resolver: &'a TypeResolver<'a>,
        builder: &'b mut ProgramModelBuilder,
        registry: &'b mut DeclRegistry,
        singleton_accessor: &'a str,
    ) -> Self {
        Self {
            unit_index,
            unit,
            resolver,
            builder,
            registry,
            singleton_accessor,
            enclosing: Vec::new(),
            enclosing_qualified: Vec::new(),
            type_stack: Vec::new(),
            method: None,
            scopes: Vec::new(),
            local_counts: HashMap::new(),
        }
    }

    fn top_level_types(&self) -> Vec<Node<'a>> {
        let unit: &'a ParsedUnit = self.unit;
        named_children(unit.tree.root_node())
            .into_iter()
            .filter(|c| is_type_declaration(c.kind()))
            .collect()
    }

    fn key(&self, node: Node<'_>) -> NodeKey {
        (self.unit_index, node.id())
    }

    fn text(&self, node: Node<'_>) -> &'a str {
        let unit: &'a ParsedUnit = self.unit;
        node_text(node, &unit.source)
    }

    fn collapsed(&self, node: Node<'_>) -> String {
        collapse_whitespace(self.text(node))
    }

    fn position(&self, node: Node<'_>) -> SourcePosition {
        SourcePosition::new(self.unit.path.clone(), node.start_position().row + 1)
    }

    fn resolve_type(&self, written: &str) -> TypeRef {
        self.resolver.resolve(written, &self.enclosing_qualified)
    }

    fn enter_type(&mut self, name: String, qualified: String) {
        self.enclosing.push(name);
        self.enclosing_qualified.push(qualified);
    }

    fn leave_type(&mut self) {
        self.enclosing.pop();
        self.enclosing_qualified.pop();
    }

    // ------------------------------------------------------------------------
    // Declaration pass
    // ------------------------------------------------------------------------

    /// Registers the unit's types, method signatures and fields.
    pub fn declare(&mut self) {
        self.builder.add_source_file(self.unit.path.clone());
        for node in self.top_level_types() {
            self.declare_type(node);
        }
    }

    fn declare_type(&mut self, node: Node<'a>) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name).to_string();
        let qualified = self.build_type_name(&name);
        self.declare_type_as(node, name, qualified);
    }

    /// Registers a type declaration under `qualified`; `segment` is the last
    /// `$`-separated part of that name.
    fn declare_type_as(&mut self, node: Node<'a>, segment: String, qualified: String) {
        let kind = match node.kind() {
            "interface_declaration" => TypeKind::Interface,
            "enum_declaration" => TypeKind::Enum,
            "record_declaration" => TypeKind::Record,
            "annotation_type_declaration" => TypeKind::Annotation,
            _ => TypeKind::Class,
        };

        let mut decl = TypeDecl::new(qualified.clone(), kind);
        decl.position = Some(self.position(node));
        decl.annotations = self.annotations(node);
        for child in named_children(node) {
            match child.kind() {
                "superclass" => {
                    decl.superclass = named_children(child)
                        .first()
                        .map(|t| self.resolve_type(self.text(*t)));
                }
                "super_interfaces" | "extends_interfaces" => {
                    decl.super_interfaces.extend(self.type_list(child));
                }
                _ => {}
            }
        }

        let id = self.builder.add_type(decl);
        self.registry.types.insert(self.key(node), id);

        self.enter_type(segment, qualified.clone());
        if kind == TypeKind::Record {
            self.declare_record_components(id, node);
        }
        self.declare_members(id, kind, &qualified, body_members(node));
        self.leave_type();
    }

    fn declare_members(&mut self, owner: TypeId, kind: TypeKind, qualified: &str, members: Vec<Node<'a>>) {
        for member in members {
            match member.kind() {
                "method_declaration" => self.declare_method(owner, kind, member),
                "field_declaration" | "constant_declaration" => self.declare_fields(owner, member),
                "enum_constant" => {
                    if let Some(constant) = member.child_by_field_name("name") {
                        let field = VariableDecl::field(
                            owner,
                            self.text(constant),
                            Some(TypeRef::new(qualified)),
                        );
                        self.builder.add_variable(field);
                    }
                }
                k if is_type_declaration(k) => self.declare_type(member),
                _ => {}
            }
        }
    }

    fn type_list(&self, node: Node<'_>) -> Vec<TypeRef> {
        let list = child_of_kind(node, "type_list").unwrap_or(node);
        named_children(list)
            .into_iter()
            .map(|t| self.resolve_type(self.text(t)))
            .collect()
    }

    fn declare_method(&mut self, owner: TypeId, owner_kind: TypeKind, node: Node<'a>) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let modifiers = modifier_keywords(node);
        let implicit_public = matches!(owner_kind, TypeKind::Interface | TypeKind::Annotation);

        let mut decl = MethodDecl::new(owner, self.text(name))
            .with_visibility(Visibility::from_modifiers(modifiers.iter().copied(), implicit_public))
            .with_parameters(self.parameters(node))
            .at(self.position(node));
        decl.return_type = node
            .child_by_field_name("type")
            .map(|t| self.resolve_type(self.text(t)));
        decl.is_static = modifiers.contains(&"static");
        decl.annotations = self.annotations(node);

        let id = self.builder.add_method(decl);
        self.registry.methods.insert(self.key(node), id);
    }

    fn parameters(&self, node: Node<'_>) -> Vec<Parameter> {
        let Some(params) = node.child_by_field_name("parameters") else {
            return Vec::new();
        };
        named_children(params)
            .into_iter()
            .filter_map(|p| self.parameter(p))
            .collect()
    }

    fn parameter(&self, node: Node<'_>) -> Option<Parameter> {
        match node.kind() {
            "formal_parameter" => {
                let name = node.child_by_field_name("name")?;
                let type_ref = node
                    .child_by_field_name("type")
                    .map(|t| self.resolve_type(self.text(t)));
                Some(Parameter::new(self.text(name), type_ref))
            }
            "spread_parameter" => {
                let declarator = child_of_kind(node, "variable_declarator")?;
                let name = declarator.child_by_field_name("name")?;
                let element = named_children(node)
                    .into_iter()
                    .find(|c| !matches!(c.kind(), "modifiers" | "variable_declarator"))?;
                let type_ref = self.resolve_type(&format!("{}[]", self.text(element)));
                Some(Parameter::new(self.text(name), Some(type_ref)))
            }
            _ => None,
        }
    }

    fn declare_fields(&mut self, owner: TypeId, node: Node<'a>) {
        let declared_type = node
            .child_by_field_name("type")
            .map(|t| self.resolve_type(self.text(t)));
        for declarator in field_children(node, "declarator") {
            let Some(name) = declarator.child_by_field_name("name") else {
                continue;
            };
            let field = VariableDecl::field(owner, self.text(name), declared_type.clone());
            let id = self.builder.add_variable(field);
            self.registry.fields.insert(self.key(declarator), id);
        }
    }

    fn declare_record_components(&mut self, owner: TypeId, node: Node<'a>) {
        for component in self.parameters(node) {
            self.builder
                .add_variable(VariableDecl::field(owner, component.name, component.type_ref));
        }
    }

    fn annotations(&self, node: Node<'_>) -> Vec<Annotation> {
        let Some(modifiers) = child_of_kind(node, "modifiers") else {
            return Vec::new();
        };
        named_children(modifiers)
            .into_iter()
            .filter(|c| matches!(c.kind(), "marker_annotation" | "annotation"))
            .map(|a| self.annotation(a))
            .collect()
    }

    fn annotation(&self, node: Node<'_>) -> Annotation {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n))
            .unwrap_or_default();
        let mut annotation = Annotation::marker(self.resolve_type(name));

        let Some(arguments) = node.child_by_field_name("arguments") else {
            return annotation;
        };
        for argument in named_children(arguments) {
            if argument.kind() == "element_value_pair" {
                let (Some(key), Some(value)) = (
                    argument.child_by_field_name("key"),
                    argument.child_by_field_name("value"),
                ) else {
                    continue;
                };
                annotation = annotation.with_value(self.text(key), self.annotation_value(value));
            } else {
                annotation = annotation.with_value("value", self.annotation_value(argument));
            }
        }
        annotation
    }

    fn annotation_value(&self, node: Node<'_>) -> AnnotationValue {
        if node.kind() == "string_literal" {
            AnnotationValue::Str(unquote(self.text(node)))
        } else {
            AnnotationValue::Other(self.collapsed(node))
        }
    }

    // ------------------------------------------------------------------------
    // Body pass
    // ------------------------------------------------------------------------

    /// Lowers initializers and bodies of the types registered by [`declare`](Self::declare).
    pub fn lower_bodies(&mut self) {
        for node in self.top_level_types() {
            self.lower_type(node);
        }
    }

    fn lower_type(&mut self, node: Node<'a>) {
        let Some(&id) = self.registry.types.get(&self.key(node)) else {
            return;
        };
        let Some(decl) = self.builder.type_decl(id) else {
            return;
        };
        let qualified = decl.qualified_name.clone();
        let segment = qualified.rsplit(['.', '$']).next().unwrap_or_default().to_string();

        self.enter_type(segment, qualified);
        self.type_stack.push(id);
        for member in body_members(node) {
            self.lower_member(member);
        }
        self.type_stack.pop();
        self.leave_type();
    }

    fn lower_member(&mut self, member: Node<'a>) {
        match member.kind() {
            "field_declaration" | "constant_declaration" => {
                for declarator in field_children(member, "declarator") {
                    let Some(value) = declarator.child_by_field_name("value") else {
                        continue;
                    };
                    let init = self.expr(value);
                    if let Some(&field) = self.registry.fields.get(&self.key(declarator)) {
                        self.builder.set_initializer(field, init);
                    }
                }
            }
            "method_declaration" => {
                let method = self.registry.methods.get(&self.key(member)).copied();
                let previous = std::mem::replace(&mut self.method, method);
                self.lower_callable(member);
                self.method = previous;
            }
            // Constructors and initializers are not methods: their code belongs
            // to the lexically enclosing method, if any.
            "constructor_declaration" | "compact_constructor_declaration" => self.lower_callable(member),
            "static_initializer" | "block" => self.statement(member),
            "enum_constant" => {
                if let Some(arguments) = member.child_by_field_name("arguments") {
                    self.arguments(arguments);
                }
                if let Some(body) = member.child_by_field_name("body") {
                    let constant_type = self.current_type();
                    self.anonymous_class(body, constant_type);
                }
            }
            k if is_type_declaration(k) => self.lower_type(member),
            _ => {}
        }
    }

    /// Parameters in a fresh scope, then the body.
    fn lower_callable(&mut self, node: Node<'a>) {
        self.scopes.push(HashMap::new());
        for parameter in self.parameters(node) {
            let name = parameter.name.clone();
            let var = self
                .builder
                .add_variable(VariableDecl::new(parameter.name, VariableKind::Parameter, parameter.type_ref));
            self.bind(name, var);
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.statement(body);
        }
        self.scopes.pop();
    }

    /// Next javac-style segment for a class declared inside code of the
    /// innermost enclosing type: `1`, `2`, ... for anonymous classes and
    /// `1Local`, `2Local`, ... for local classes named `Local`.
    fn next_local_segment(&mut self, name: &str) -> String {
        let outer = self.enclosing_qualified.last().cloned().unwrap_or_default();
        let count = self.local_counts.entry((outer, name.to_string())).or_insert(0);
        *count += 1;
        format!("{}{}", count, name)
    }

    /// Anonymous class bodies, enum constant bodies included, become types of
    /// their own (`Outer$1`) so their methods enclose the code they contain.
    fn anonymous_class(&mut self, body: Node<'a>, supertype: Option<TypeRef>) {
        let segment = self.next_local_segment("");
        let qualified = self.build_type_name(&segment);

        let mut decl = TypeDecl::new(qualified.clone(), TypeKind::Class);
        decl.position = Some(self.position(body));
        let extends_interface = supertype.as_ref().is_some_and(|t| {
            self.builder
                .type_by_name(t.qualified_name())
                .is_some_and(|(_, d)| d.kind == TypeKind::Interface)
        });
        if extends_interface {
            decl.super_interfaces.extend(supertype);
        } else {
            decl.superclass = supertype;
        }
        let id = self.builder.add_type(decl);

        self.enter_type(segment, qualified.clone());
        self.declare_members(id, TypeKind::Class, &qualified, named_children(body));
        self.type_stack.push(id);
        for member in named_children(body) {
            self.lower_member(member);
        }
        self.type_stack.pop();
        self.leave_type();
    }

    /// A class, interface, enum or record declared inside a method body.
    fn local_type(&mut self, node: Node<'a>) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let segment = self.next_local_segment(self.text(name));
        let qualified = self.build_type_name(&segment);
        self.declare_type_as(node, segment, qualified);
        self.lower_type(node);
    }

    fn bind(&mut self, name: String, var: VariableId) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, var);
        }
    }

    fn scoped<F: FnOnce(&mut Self)>(&mut self, f: F) {
        self.scopes.push(HashMap::new());
        f(self);
        self.scopes.pop();
    }

    fn statement(&mut self, node: Node<'a>) {
        match node.kind() {
            "block" | "constructor_body" | "switch_block_statement_group" | "switch_rule" => {
                self.scoped(|this| {
                    for child in named_children(node) {
                        this.statement(child);
                    }
                });
            }
            "local_variable_declaration" => self.local_declaration(node),
            "enhanced_for_statement" => self.scoped(|this| {
                let element = node.child_by_field_name("value").map(|v| this.expr(v));
                if let Some(name) = node.child_by_field_name("name") {
                    let declared = match node.child_by_field_name("type").map(|t| this.text(t)) {
                        Some("var") | None => element
                            .and_then(|e| this.builder.expr(e))
                            .and_then(|e| e.static_type_name())
                            .and_then(|t| t.strip_suffix("[]"))
                            .map(TypeRef::new),
                        Some(written) => Some(this.resolve_type(written)),
                    };
                    let var = this
                        .builder
                        .add_variable(VariableDecl::local(this.text(name), declared));
                    this.bind(this.text(name).to_string(), var);
                }
                if let Some(body) = node.child_by_field_name("body") {
                    this.statement(body);
                }
            }),
            "for_statement" | "try_with_resources_statement" => self.scoped(|this| {
                for child in named_children(node) {
                    this.statement(child);
                }
            }),
            "resource" => self.resource(node),
            "catch_clause" => self.scoped(|this| {
                for child in named_children(node) {
                    if child.kind() == "catch_formal_parameter" {
                        this.catch_parameter(child);
                    } else {
                        this.statement(child);
                    }
                }
            }),
            "break_statement" | "continue_statement" => {}
            "labeled_statement" => {
                for child in named_children(node) {
                    if child.kind() != "identifier" {
                        self.statement(child);
                    }
                }
            }
            k if is_type_declaration(k) => self.local_type(node),
            k if is_expression(k) => {
                self.expr(node);
            }
            _ => {
                for child in named_children(node) {
                    self.statement(child);
                }
            }
        }
    }

    fn local_declaration(&mut self, node: Node<'a>) {
        let written = node.child_by_field_name("type").map(|t| self.text(t));
        for declarator in field_children(node, "declarator") {
            let Some(name) = declarator.child_by_field_name("name") else {
                continue;
            };
            let init = declarator.child_by_field_name("value").map(|v| self.expr(v));
            let declared = match written {
                Some("var") | None => init
                    .and_then(|e| self.builder.expr(e))
                    .and_then(|e| e.static_type.clone()),
                Some(written) => Some(self.resolve_type(written)),
            };
            let var = self
                .builder
                .add_variable(VariableDecl::local(self.text(name), declared));
            if let Some(init) = init {
                self.builder.set_initializer(var, init);
            }
            self.bind(self.text(name).to_string(), var);
        }
    }

    fn resource(&mut self, node: Node<'a>) {
        match (node.child_by_field_name("name"), node.child_by_field_name("value")) {
            (Some(name), Some(value)) => {
                let init = self.expr(value);
                let declared = match node.child_by_field_name("type").map(|t| self.text(t)) {
                    Some("var") | None => self.builder.expr(init).and_then(|e| e.static_type.clone()),
                    Some(written) => Some(self.resolve_type(written)),
                };
                let var = self
                    .builder
                    .add_variable(VariableDecl::local(self.text(name), declared));
                self.builder.set_initializer(var, init);
                self.bind(self.text(name).to_string(), var);
            }
            _ => {
                for child in named_children(node) {
                    self.statement(child);
                }
            }
        }
    }

    fn catch_parameter(&mut self, node: Node<'a>) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let declared = child_of_kind(node, "catch_type")
            .and_then(|t| named_children(t).into_iter().next())
            .map(|t| self.resolve_type(self.text(t)));
        let var = self
            .builder
            .add_variable(VariableDecl::local(self.text(name), declared));
        self.bind(self.text(name).to_string(), var);
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    fn add(&mut self, mut expr: Expr, node: Node<'_>) -> ExprId {
        expr = expr.at(self.position(node));
        if let Some(&owner) = self.type_stack.last() {
            expr = expr.within(owner, self.method);
        }
        self.builder.add_expr(expr)
    }

    fn other(&mut self, node: Node<'_>, static_type: Option<TypeRef>) -> ExprId {
        let mut expr = Expr::new(ExprKind::Other, self.collapsed(node));
        expr.static_type = static_type;
        self.add(expr, node)
    }

    fn static_type(&self, expr: ExprId) -> Option<TypeRef> {
        self.builder.expr(expr).and_then(|e| e.static_type.clone())
    }

    fn current_type(&self) -> Option<TypeRef> {
        self.enclosing_qualified.last().map(TypeRef::new)
    }

    fn current_superclass(&self) -> Option<TypeRef> {
        let &id = self.type_stack.last()?;
        self.builder.type_decl(id)?.superclass.clone()
    }

    fn expr(&mut self, node: Node<'a>) -> ExprId {
        let text = self.text(node);
        match node.kind() {
            "parenthesized_expression" => match named_children(node).first() {
                Some(&inner) => self.expr(inner),
                None => self.other(node, None),
            },
            "string_literal" => {
                let expr = Expr::string_literal(unquote(text)).with_text(collapse_whitespace(text));
                self.add(expr, node)
            }
            "decimal_integer_literal" | "hex_integer_literal" | "octal_integer_literal"
            | "binary_integer_literal" => {
                let ty = if text.ends_with(['l', 'L']) { "long" } else { "int" };
                self.literal(node, Literal::Number(text.to_string()), ty)
            }
            "decimal_floating_point_literal" | "hex_floating_point_literal" => {
                let ty = if text.ends_with(['f', 'F']) { "float" } else { "double" };
                self.literal(node, Literal::Number(text.to_string()), ty)
            }
            "true" | "false" => self.literal(node, Literal::Boolean(text == "true"), "boolean"),
            "character_literal" => self.literal(node, Literal::Char(unquote_char(text)), "char"),
            "null_literal" => {
                let expr = Expr::new(ExprKind::Literal(Literal::Null), "null");
                self.add(expr, node)
            }
            "this" => {
                let current = self.current_type();
                self.other(node, current)
            }
            "identifier" => self.identifier(node),
            "field_access" => self.field_access(node),
            "method_invocation" => self.invocation(node),
            "object_creation_expression" => self.construction(node),
            "lambda_expression" => self.lambda(node),
            _ => self.compound(node),
        }
    }

    fn literal(&mut self, node: Node<'_>, literal: Literal, type_name: &str) -> ExprId {
        let expr = Expr::new(ExprKind::Literal(literal), self.collapsed(node)).typed(TypeRef::new(type_name));
        self.add(expr, node)
    }

    /// Lowers every nested expression and returns their ids in source order.
    fn operands(&mut self, node: Node<'a>) -> Vec<ExprId> {
        let mut ids = Vec::new();
        for child in named_children(node) {
            if is_expression(child.kind()) {
                ids.push(self.expr(child));
            } else {
                self.statement(child);
            }
        }
        ids
    }

    /// Expressions with no model counterpart: operands are lowered, the node
    /// itself becomes `Other` with a best-effort static type.
    fn compound(&mut self, node: Node<'a>) -> ExprId {
        let operands = self.operands(node);
        let operand_type = |i: usize| operands.get(i).and_then(|&e| self.static_type(e));

        let static_type = match node.kind() {
            "cast_expression" => node
                .child_by_field_name("type")
                .map(|t| self.resolve_type(self.text(t))),
            "binary_expression" => {
                let operator = node.child_by_field_name("operator").map(|o| o.kind());
                let any_string = (0..operands.len())
                    .any(|i| operand_type(i).is_some_and(|t| t.qualified_name() == STRING));
                match operator {
                    Some("+") if any_string => Some(TypeRef::new(STRING)),
                    Some("==" | "!=" | "<" | ">" | "<=" | ">=" | "&&" | "||") => {
                        Some(TypeRef::new("boolean"))
                    }
                    _ => operand_type(0),
                }
            }
            "instanceof_expression" => Some(TypeRef::new("boolean")),
            "ternary_expression" => operand_type(1),
            "assignment_expression" => operand_type(0),
            "array_access" => operand_type(0)
                .and_then(|t| t.qualified_name().strip_suffix("[]").map(TypeRef::new)),
            "class_literal" => Some(TypeRef::new("java.lang.Class")),
            "array_creation_expression" => node.child_by_field_name("type").map(|t| {
                let dims: usize = named_children(node)
                    .into_iter()
                    .map(|c| match c.kind() {
                        "dimensions_expr" => 1,
                        "dimensions" => self.text(c).matches('[').count(),
                        _ => 0,
                    })
                    .sum();
                TypeRef::new(format!(
                    "{}{}",
                    self.resolve_type(self.text(t)).qualified_name(),
                    "[]".repeat(dims.max(1))
                ))
            }),
            _ => None,
        };
        self.other(node, static_type)
    }

    fn lookup_variable(&self, name: &str) -> Option<VariableId> {
        if let Some(var) = self.scopes.iter().rev().find_map(|s| s.get(name).copied()) {
            return Some(var);
        }
        if let Some(field) = self
            .enclosing_qualified
            .iter()
            .rev()
            .find_map(|t| find_field(self.builder, t, name))
        {
            return Some(field);
        }
        if let Some(owner) = self.resolver.static_member_owner(name) {
            return find_field(self.builder, owner, name);
        }
        self.resolver
            .static_wildcards()
            .iter()
            .find_map(|owner| find_field(self.builder, owner, name))
    }

    fn variable_type(&self, var: VariableId) -> Option<TypeRef> {
        self.builder.variable(var).and_then(|v| v.declared_type.clone())
    }

    /// A type named by an identifier or dotted name, when the node denotes one.
    fn type_reference(&self, node: Node<'_>) -> Option<TypeRef> {
        if !matches!(node.kind(), "identifier" | "field_access" | "scoped_identifier") {
            return None;
        }
        let dotted: String = self.text(node).chars().filter(|c| !c.is_whitespace()).collect();
        let segments: Vec<&str> = dotted.split('.').collect();
        let is_plain = segments
            .iter()
            .all(|s| !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$'));
        if !is_plain || self.lookup_variable(segments[0]).is_some() {
            return None;
        }

        if let Some(known) = self.resolver.resolve_known(&dotted, &self.enclosing_qualified) {
            return Some(known);
        }
        let last = segments.last()?;
        let looks_like_type = last.starts_with(|c: char| c.is_uppercase())
            && last.chars().any(|c| c.is_lowercase());
        looks_like_type.then(|| self.resolve_type(&dotted))
    }

    fn identifier(&mut self, node: Node<'a>) -> ExprId {
        let name = self.text(node);
        if let Some(var) = self.lookup_variable(name) {
            let mut expr = Expr::variable_read(name, Some(var));
            expr.static_type = self.variable_type(var);
            return self.add(expr, node);
        }
        if let Some(type_ref) = self.type_reference(node) {
            return self.add(Expr::type_access(type_ref).with_text(name), node);
        }
        self.add(Expr::variable_read(name, None), node)
    }

    fn field_access(&mut self, node: Node<'a>) -> ExprId {
        if let Some(type_ref) = self.type_reference(node) {
            let expr = Expr::type_access(type_ref).with_text(self.collapsed(node));
            return self.add(expr, node);
        }
        let (Some(object), Some(field)) = (
            node.child_by_field_name("object"),
            node.child_by_field_name("field"),
        ) else {
            return self.compound(node);
        };

        let owner = match object.kind() {
            "this" => self.current_type(),
            "super" => self.current_superclass(),
            _ => match self.type_reference(object) {
                Some(type_ref) => Some(type_ref),
                None => {
                    let target = self.expr(object);
                    self.static_type(target)
                }
            },
        };

        let name = self.text(field);
        let declaration = owner.and_then(|t| find_field(self.builder, t.qualified_name(), name));
        let mut expr = Expr::variable_read(name, declaration).with_text(self.collapsed(node));
        expr.static_type = declaration.and_then(|v| self.variable_type(v));
        self.add(expr, node)
    }

    /// Type that declares an unqualified call: a member of an enclosing type,
    /// else a static import, else the innermost enclosing type.
    fn unqualified_owner(&self, name: &str, arity: usize) -> Option<String> {
        if let Some(owner) = self
            .enclosing_qualified
            .iter()
            .rev()
            .find(|t| find_method(self.builder, t, name, arity).is_some())
        {
            return Some(owner.clone());
        }
        if let Some(owner) = self.resolver.static_member_owner(name) {
            return Some(owner.to_string());
        }
        if let Some(owner) = self
            .resolver
            .static_wildcards()
            .iter()
            .find(|t| find_method(self.builder, t, name, arity).is_some())
        {
            return Some(owner.clone());
        }
        self.enclosing_qualified.last().cloned()
    }

    fn arguments(&mut self, node: Node<'a>) -> Vec<ExprId> {
        named_children(node)
            .into_iter()
            .map(|argument| self.expr(argument))
            .collect()
    }

    fn invocation(&mut self, node: Node<'a>) -> ExprId {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();

        let mut is_type_target = false;
        let (target, lookup_type) = match node.child_by_field_name("object") {
            None => (None, None),
            Some(object) if object.kind() == "super" => {
                let superclass = self.current_superclass();
                let id = self.other(object, superclass.clone());
                (Some(id), superclass)
            }
            Some(object) => match self.type_reference(object) {
                Some(type_ref) => {
                    is_type_target = true;
                    let access = Expr::type_access(type_ref.clone()).with_text(self.collapsed(object));
                    (Some(self.add(access, object)), Some(type_ref))
                }
                None => {
                    let id = self.expr(object);
                    (Some(id), self.static_type(id))
                }
            },
        };

        let arguments = node
            .child_by_field_name("arguments")
            .map(|a| self.arguments(a))
            .unwrap_or_default();
        let arity = arguments.len();

        let lookup_type = match (target, lookup_type) {
            (None, _) => self.unqualified_owner(&name, arity).map(TypeRef::new),
            (Some(_), lookup) => lookup,
        };
        let found = lookup_type
            .as_ref()
            .and_then(|t| find_method(self.builder, t.qualified_name(), &name, arity));

        let declaring_type = match &found {
            Some((owner, _)) => Some(TypeRef::new(owner.clone())),
            None => lookup_type.clone(),
        };
        let mut static_type = found
            .and_then(|(_, m)| self.builder.method(m))
            .and_then(|m| m.return_type.clone());
        if static_type.is_none() && is_type_target && arity == 0 && name == self.singleton_accessor {
            static_type = lookup_type;
        }

        let mut expr = Expr::invocation(name, declaring_type, target, arguments)
            .with_text(self.collapsed(node));
        expr.static_type = static_type;
        self.add(expr, node)
    }

    fn construction(&mut self, node: Node<'a>) -> ExprId {
        let type_ref = node
            .child_by_field_name("type")
            .map(|t| self.resolve_type(self.text(t)));
        let arguments = node
            .child_by_field_name("arguments")
            .map(|a| self.arguments(a))
            .unwrap_or_default();
        if let Some(body) = child_of_kind(node, "class_body") {
            self.anonymous_class(body, type_ref.clone());
        }

        let mut expr = Expr::new(
            ExprKind::Construction(Construction {
                type_ref: type_ref.clone(),
                arguments,
            }),
            self.collapsed(node),
        );
        expr.static_type = type_ref;
        self.add(expr, node)
    }

    fn lambda(&mut self, node: Node<'a>) -> ExprId {
        self.scopes.push(HashMap::new());
        if let Some(params) = node.child_by_field_name("parameters") {
            let declared: Vec<Parameter> = match params.kind() {
                "identifier" => vec![Parameter::new(self.text(params), None)],
                "inferred_parameters" => named_children(params)
                    .into_iter()
                    .map(|p| Parameter::new(self.text(p), None))
                    .collect(),
                _ => named_children(params)
                    .into_iter()
                    .filter_map(|p| self.parameter(p))
                    .collect(),
            };
            for parameter in declared {
                let name = parameter.name.clone();
                let var = self.builder.add_variable(VariableDecl::new(
                    parameter.name,
                    VariableKind::Parameter,
                    parameter.type_ref,
                ));
                self.bind(name, var);
            }
        }
        if let Some(body) = node.child_by_field_name("body") {
            if body.kind() == "block" {
                self.statement(body);
            } else {
                self.expr(body);
            }
        }
        self.scopes.pop();
        self.other(node, None)
    }
}

fn unquote_char(literal: &str) -> String {
    literal
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(literal)
        .to_string()
}
