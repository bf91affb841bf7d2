//! Dependency ids from the project's `pom.xml`.
//!
//! Only direct `<project><dependencies><dependency>` entries count. Managed
//! dependencies and plugin dependencies are ignored.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde::Serialize;
use tracing::{debug, error};

use crate::common::Warnings;
use crate::config::BuildConventions;
use crate::error::{ChainTraceError, ChainTraceResult};

pub const POM_FILE: &str = "pom.xml";

const DEPENDENCY_PATH: [&str; 3] = ["project", "dependencies", "dependency"];

/// One recognized dependency. `name_of_note` is the service or function id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependantEntry {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub name_of_note: String,
}

/// Service and function dependencies declared by the project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyAnalysis {
    /// The project's own `artifactId`.
    pub artifact_id: Option<String>,
    pub services: BTreeSet<DependantEntry>,
    pub functions: BTreeSet<DependantEntry>,
}

impl DependencyAnalysis {
    pub fn service_ids(&self) -> BTreeSet<String> {
        self.services.iter().map(|d| d.name_of_note.clone()).collect()
    }

    pub fn function_ids(&self) -> BTreeSet<String> {
        self.functions.iter().map(|d| d.name_of_note.clone()).collect()
    }
}

#[derive(Default)]
struct RawDependency {
    group_id: Option<String>,
    artifact_id: Option<String>,
    version: Option<String>,
}

/// Reads `<root>/pom.xml`.
///
/// Never fails: a missing or unreadable descriptor yields an empty analysis,
/// logged as an error. A malformed one is also recorded in `warnings`.
pub fn scan_pom(root: &Path, build: &BuildConventions, warnings: &Warnings) -> DependencyAnalysis {
    let path = root.join(POM_FILE);
    if !path.exists() {
        error!(path = %root.display(), "No pom.xml found at path");
        return DependencyAnalysis::default();
    }

    let parsed = fs::read_to_string(&path)
        .map_err(|e| ChainTraceError::io(&path, e))
        .and_then(|xml| parse_pom(&path, &xml, build));

    match parsed {
        Ok(analysis) => analysis,
        Err(e) => {
            error!(error = %e, "Failed to parse pom.xml");
            warnings.push(format!("Failed to parse pom.xml: {}", e));
            DependencyAnalysis::default()
        }
    }
}

/// Parses pom.xml content. `path` is only used for error reporting.
pub fn parse_pom(path: &Path, xml: &str, build: &BuildConventions) -> ChainTraceResult<DependencyAnalysis> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut analysis = DependencyAnalysis::default();
    let mut stack: Vec<String> = Vec::new();
    let mut current: Option<RawDependency> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            ChainTraceError::build_descriptor(
                path,
                format!("{} (at byte {})", e, reader.buffer_position()),
            )
        })?;

        match event {
            Event::Start(start) => {
                stack.push(String::from_utf8_lossy(start.local_name().as_ref()).into_owned());
                if stack == DEPENDENCY_PATH {
                    current = Some(RawDependency::default());
                }
            }
            Event::End(_) => {
                if stack == DEPENDENCY_PATH {
                    if let Some(raw) = current.take() {
                        classify(raw, build, &mut analysis);
                    }
                }
                stack.pop();
            }
            Event::Text(text) => {
                let value = text
                    .unescape()
                    .map_err(|e| ChainTraceError::build_descriptor(path, e.to_string()))?
                    .into_owned();
                record_text(&stack, value, &mut current, &mut analysis);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    debug!(
        services = analysis.services.len(),
        functions = analysis.functions.len(),
        "Scanned pom.xml"
    );
    Ok(analysis)
}

fn record_text(
    stack: &[String],
    value: String,
    current: &mut Option<RawDependency>,
    analysis: &mut DependencyAnalysis,
) {
    match stack {
        [project, field] if project == "project" && field == "artifactId" => {
            analysis.artifact_id = Some(value);
        }
        [parent @ .., field] if parent == DEPENDENCY_PATH => {
            if let Some(raw) = current.as_mut() {
                match field.as_str() {
                    "groupId" => raw.group_id = Some(value),
                    "artifactId" => raw.artifact_id = Some(value),
                    "version" => raw.version = Some(value),
                    _ => {}
                }
            }
        }
        _ => {}
    }
}

fn classify(raw: RawDependency, build: &BuildConventions, analysis: &mut DependencyAnalysis) {
    let (Some(group_id), Some(artifact_id)) = (raw.group_id, raw.artifact_id) else {
        return;
    };

    if group_id == build.services_group {
        debug!(service_id = %artifact_id, "Found service dependency");
        analysis.services.insert(DependantEntry {
            name_of_note: artifact_id.clone(),
            group_id,
            artifact_id,
            version: raw.version,
        });
    } else if group_id == build.functions_group {
        if let Some(function_id) = artifact_id.strip_suffix(build.function_client_suffix.as_str()) {
            debug!(function_id, "Found function dependency");
            analysis.functions.insert(DependantEntry {
                name_of_note: function_id.to_string(),
                group_id,
                artifact_id,
                version: raw.version,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <groupId>dev.myorg.apps</groupId>
  <artifactId>XTSTCLFNJ</artifactId>
  <version>1.0.0</version>
  <parent>
    <artifactId>parent-pom</artifactId>
  </parent>
  <dependencyManagement>
    <dependencies>
      <dependency>
        <groupId>dev.myorg.services</groupId>
        <artifactId>MANAGED01</artifactId>
      </dependency>
    </dependencies>
  </dependencyManagement>
  <dependencies>
    <dependency>
      <groupId>dev.myorg.services</groupId>
      <artifactId>MDZ017J</artifactId>
      <version>2.1.0</version>
    </dependency>
    <dependency>
      <groupId>dev.myorg.functions</groupId>
      <artifactId>ProcessPayments-func-client</artifactId>
      <version>${functions.version}</version>
    </dependency>
    <dependency>
      <groupId>dev.myorg.functions</groupId>
      <artifactId>shared-model</artifactId>
    </dependency>
    <dependency>
      <groupId>org.slf4j</groupId>
      <artifactId>slf4j-api</artifactId>
    </dependency>
  </dependencies>
  <build>
    <plugins>
      <plugin>
        <dependencies>
          <dependency>
            <groupId>dev.myorg.services</groupId>
            <artifactId>PLUGIN01</artifactId>
          </dependency>
        </dependencies>
      </plugin>
    </plugins>
  </build>
</project>
"#;

    fn parse(xml: &str) -> ChainTraceResult<DependencyAnalysis> {
        parse_pom(Path::new("pom.xml"), xml, &BuildConventions::default())
    }

    #[test]
    fn test_direct_dependencies_only() {
        let analysis = parse(POM).unwrap();

        assert_eq!(analysis.artifact_id.as_deref(), Some("XTSTCLFNJ"));
        assert_eq!(analysis.service_ids(), BTreeSet::from(["MDZ017J".to_string()]));
        assert_eq!(analysis.function_ids(), BTreeSet::from(["ProcessPayments".to_string()]));

        let function = analysis.functions.iter().next().unwrap();
        assert_eq!(function.artifact_id, "ProcessPayments-func-client");
        assert_eq!(function.version.as_deref(), Some("${functions.version}"));
    }

    #[test]
    fn test_custom_groups() {
        let build = BuildConventions {
            services_group: "org.slf4j".to_string(),
            ..BuildConventions::default()
        };
        let analysis = parse_pom(Path::new("pom.xml"), POM, &build).unwrap();
        assert_eq!(analysis.service_ids(), BTreeSet::from(["slf4j-api".to_string()]));
    }

    #[test]
    fn test_malformed_pom_is_build_descriptor_error() {
        let err = parse("<project><dependencies></project>").unwrap_err();
        assert!(matches!(err, ChainTraceError::BuildDescriptor { .. }));
    }

    #[test]
    fn test_scan_missing_and_malformed() {
        let dir = std::env::temp_dir().join(format!("chaintrace_pom_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let warnings = Warnings::new();

        let missing = scan_pom(&dir, &BuildConventions::default(), &warnings);
        assert_eq!(missing, DependencyAnalysis::default());
        assert!(warnings.is_empty());

        fs::write(dir.join(POM_FILE), "<project><artifactId>x</project>").unwrap();
        let broken = scan_pom(&dir, &BuildConventions::default(), &warnings);
        assert_eq!(broken, DependencyAnalysis::default());
        assert!(warnings.any_starts_with("Failed to parse pom.xml"));

        fs::remove_dir_all(&dir).ok();
    }
}
