//! tree-sitter based Java frontend.
//!
//! Builds a [`ProgramModel`] from the project's main source set:
//!
//! 1. every file is parsed in parallel (one `tree_sitter::Parser` per rayon worker)
//! 2. declared type names from all units form a global [`TypeIndex`]
//! 3. units are lowered sequentially, declarations first, bodies second
//!
//! Files with syntax errors are still lowered best-effort. Files that cannot
//! be read or parsed at all are reported in [`ModelBuild::skipped_files`].

mod java;
mod resolve;

pub use resolve::{TypeIndex, TypeResolver};

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, warn};
use tree_sitter::{Node, Parser, Tree};

use crate::config::DetectionConventions;
use crate::error::{ChainTraceError, ChainTraceResult, IoResultExt};
use crate::model::{ProgramModel, ProgramModelBuilder};
use java::{declared_type_names, unit_resolver, DeclRegistry, ParsedUnit, UnitLowering};

/// Outcome of lowering a source tree.
#[derive(Debug)]
pub struct ModelBuild {
    pub model: ProgramModel,
    /// Files left out of the model, relative to the project root.
    pub skipped_files: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

fn new_parser() -> ChainTraceResult<Parser> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_java::LANGUAGE.into())
        .map_err(|e| ChainTraceError::internal(format!("Failed to load Java grammar: {}", e)))?;
    Ok(parser)
}

/// First syntax error in the tree, if any.
fn first_syntax_error(tree: &Tree) -> Option<Node<'_>> {
    let mut node = tree.root_node();
    if !node.has_error() {
        return None;
    }
    loop {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        let mut cursor = node.walk();
        let next = node
            .children(&mut cursor)
            .find(|c| c.has_error() || c.is_missing());
        match next {
            Some(child) => node = child,
            None => return Some(node),
        }
    }
}

/// Reads and parses one file. A tree with syntax errors is still returned,
/// together with a recoverable parse error describing the first one.
fn parse_file(
    parser: &mut Parser,
    project_root: &Path,
    path: &Path,
) -> ChainTraceResult<(ParsedUnit, Option<ChainTraceError>)> {
    let relative = path.strip_prefix(project_root).unwrap_or(path).to_path_buf();
    let source = fs::read_to_string(path).with_path(&relative)?;
    let tree = parser
        .parse(&source, None)
        .ok_or_else(|| ChainTraceError::parse(&relative, "parser produced no syntax tree"))?;

    let syntax_error = first_syntax_error(&tree).map(|node| {
        let line = node.start_position().row + 1;
        debug!(file = %relative.display(), line, "Syntax errors found, lowering best-effort");
        ChainTraceError::parse_at(&relative, format!("syntax error at line {}", line), line)
    });
    Ok((
        ParsedUnit {
            path: relative,
            source,
            tree,
        },
        syntax_error,
    ))
}

/// Parses and lowers `files` into a program model.
///
/// Positions in the model are relative to `project_root`. Fails only when
/// the Java grammar cannot be loaded.
pub fn build_model(
    project_root: &Path,
    files: &[PathBuf],
    conventions: &DetectionConventions,
) -> ChainTraceResult<ModelBuild> {
    new_parser()?;
    info!(files = files.len(), "Building program model");

    let parsed: Vec<(PathBuf, ChainTraceResult<(ParsedUnit, Option<ChainTraceError>)>)> = files
        .par_iter()
        .map_init(new_parser, |parser, path| {
            let unit = match parser {
                Ok(parser) => parse_file(parser, project_root, path),
                Err(e) => Err(ChainTraceError::internal(e.to_string())),
            };
            (path.clone(), unit)
        })
        .collect();

    let mut units = Vec::with_capacity(parsed.len());
    let mut skipped_files = Vec::new();
    let mut warnings = Vec::new();
    for (path, result) in parsed {
        match result {
            Ok((unit, syntax_error)) => {
                if let Some(e) = syntax_error {
                    warnings.push(format!("{}; lowered best-effort", e));
                }
                units.push(unit);
            }
            Err(e) => {
                let relative = path.strip_prefix(project_root).unwrap_or(&path).to_path_buf();
                warn!(file = %relative.display(), error = %e, "Skipping source file");
                warnings.push(format!("Skipped {}: {}", relative.display(), e));
                skipped_files.push(relative);
            }
        }
    }

    let index = TypeIndex::new(units.par_iter().flat_map_iter(declared_type_names).collect::<Vec<_>>());
    debug!(types = index.len(), "Indexed declared types");

    let resolvers: Vec<TypeResolver<'_>> = units.iter().map(|u| unit_resolver(u, &index)).collect();
    let mut builder = ProgramModelBuilder::new();
    let mut registry = DeclRegistry::default();
    let accessor = conventions.singleton_accessor.as_str();

    for (i, (unit, resolver)) in units.iter().zip(&resolvers).enumerate() {
        UnitLowering::new(i, unit, resolver, &mut builder, &mut registry, accessor).declare();
    }
    for (i, (unit, resolver)) in units.iter().zip(&resolvers).enumerate() {
        UnitLowering::new(i, unit, resolver, &mut builder, &mut registry, accessor).lower_bodies();
    }

    let model = builder.build();
    info!(
        files = units.len(),
        skipped = skipped_files.len(),
        types = model.type_count(),
        methods = model.method_count(),
        "Program model built"
    );

    Ok(ModelBuild {
        model,
        skipped_files,
        warnings,
    })
}
