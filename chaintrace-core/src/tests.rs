//! End-to-end test suite for chaintrace-core: throwaway Maven projects run
//! through the full pipeline.

use crate::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

fn write_file(file: &Path, content: &str) {
    fs::create_dir_all(file.parent().unwrap()).unwrap();
    fs::write(file, content).unwrap();
}

fn setup_temp_project() -> PathBuf {
    let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir()
        .join("chaintrace_tests")
        .join(format!("{}_{}", timestamp, id));

    if dir.exists() {
        fs::remove_dir_all(&dir).ok();
    }
    fs::create_dir_all(dir.join("src/main/java")).unwrap();
    dir
}

fn write_java(root: &Path, rel: &str, source: &str) {
    write_file(&root.join("src/main/java").join(rel), source);
}

const POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <groupId>dev.myorg.apps</groupId>
  <artifactId>XTSTCLFNJ</artifactId>
  <version>1.0.0</version>
  <dependencies>
    <dependency>
      <groupId>dev.myorg.services</groupId>
      <artifactId>MDZ017J</artifactId>
      <version>2.1.0</version>
    </dependency>
    <dependency>
      <groupId>dev.myorg.functions</groupId>
      <artifactId>ProcessPayments-func-client</artifactId>
      <version>1.4.2</version>
    </dependency>
    <dependency>
      <groupId>org.slf4j</groupId>
      <artifactId>slf4j-api</artifactId>
    </dependency>
  </dependencies>
</project>
"#;

const CONTROLLER: &str = r#"
package com.acme.orders;

public class OrderController {
    private final OrderService service = new OrderService();

    public void create(String id) {
        service.place(id);
    }
}
"#;

const SERVICE: &str = r#"
package com.acme.orders;

import com.acme.events.Topics;
import dev.myorg.mysection.eda.publisher.service.IEventPublisher;
import dev.myorg.mysection.function.client.ProcessPaymentsFunction;
import dev.myorg.services.mdz017j.client.CustomerClient;

public class OrderService {
    private IEventPublisher publisher;

    public void place(String id) {
        ProcessPaymentsFunction.instance().execute(id);
        ProcessPaymentsFunction.instance().executeAsyncOnOrAfter(id, LocalDateTime.now().plusDays(1));

        CustomerClient client = new CustomerClient();
        client.lookup(id);
        CustomerClient.ping();

        publisher.publishEvent(Topics.ORDER_CREATED, new OrderMessage(id));
    }
}
"#;

const MESSAGE: &str = r#"
package com.acme.orders;

public class OrderMessage {
    private final String id;

    public OrderMessage(String id) {
        this.id = id;
    }
}
"#;

const TOPICS: &str = r#"
package com.acme.events;

public final class Topics {
    public static final String ORDER_CREATED = "orders.created";
}
"#;

const SMART_INTERFACE: &str = r#"
package com.acme.svc;

import dev.myorg.mysection.smart.Function;
import dev.myorg.mysection.smart.SmartService;

@SmartService("XTSTCLFNJ")
public interface IBilling {
    @Function(id = "BILL-01", name = "Charge")
    void charge(String request);

    void audit();
}
"#;

fn setup_order_project() -> PathBuf {
    let root = setup_temp_project();
    write_file(&root.join("pom.xml"), POM);
    write_java(&root, "com/acme/orders/OrderController.java", CONTROLLER);
    write_java(&root, "com/acme/orders/OrderService.java", SERVICE);
    write_java(&root, "com/acme/orders/OrderMessage.java", MESSAGE);
    write_java(&root, "com/acme/events/Topics.java", TOPICS);
    write_java(&root, "com/acme/svc/IBilling.java", SMART_INTERFACE);
    root
}

fn signatures(chain: &[CallChainEntry]) -> Vec<String> {
    chain
        .iter()
        .map(|e| format!("{}.{}", e.class_name, e.method_signature))
        .collect()
}

const PLACE_CHAIN: [&str; 2] = [
    "com.acme.orders.OrderService.place(java.lang.String)",
    "com.acme.orders.OrderController.create(java.lang.String)",
];

// Core Test 1: Function client usages end to end
#[test]
fn test_function_client_usages() {
    let root = setup_order_project();
    let report = ChainTrace::new(&root).analyze().unwrap();

    assert_eq!(report.function_client_usages.len(), 2);
    let execute = &report.function_client_usages[0];
    assert_eq!(execute.function_id, "ProcessPayments");
    assert_eq!(execute.method_name, "execute");
    assert_eq!(execute.input_type, "String");
    assert!(!execute.has_scheduling);
    assert_eq!(execute.scheduling_expression, None);
    assert_eq!(signatures(execute.call_chain()), PLACE_CHAIN);
    assert!(execute.call_chain()[1].is_entry_point);

    let scheduled = &report.function_client_usages[1];
    assert_eq!(scheduled.method_name, "executeAsyncOnOrAfter");
    assert!(scheduled.has_scheduling);
    assert_eq!(
        scheduled.scheduling_expression.as_deref(),
        Some("LocalDateTime.now().plusDays(1)")
    );
}

// Core Test 2: Service usages in kind order
#[test]
fn test_service_usages() {
    let root = setup_order_project();
    let report = ChainTrace::new(&root).analyze().unwrap();

    let kinds: Vec<_> = report
        .service_usages
        .iter()
        .map(|u| (u.usage_type, u.target_class.as_str(), u.target_method.as_deref()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (ServiceUsageKind::Instantiation, "CustomerClient", None),
            (ServiceUsageKind::MethodCall, "CustomerClient", Some("lookup")),
            (ServiceUsageKind::MethodCall, "CustomerClient", Some("ping")),
        ]
    );
    for usage in &report.service_usages {
        assert_eq!(usage.service_id, "MDZ017J");
        assert_eq!(usage.service_package, "dev.myorg.services.mdz017j");
        assert_eq!(usage.usage_location.class_name, "com.acme.orders.OrderService");
        assert_eq!(usage.usage_location.method_name, "place");
        assert_eq!(signatures(usage.call_chain()), PLACE_CHAIN);
    }
}

// Core Test 3: Event publish with a constant topic
#[test]
fn test_event_publish_usages() {
    let root = setup_order_project();
    let report = ChainTrace::new(&root).analyze().unwrap();

    assert_eq!(report.event_publish_usages.len(), 1);
    let publish = &report.event_publish_usages[0];
    assert_eq!(publish.topic_name, "orders.created");
    assert_eq!(publish.topic_status, TopicResolutionStatus::Resolved);
    assert_eq!(publish.message_data_type.as_deref(), Some("com.acme.orders.OrderMessage"));
    assert_eq!(
        publish.usage_location.file_path,
        "src/main/java/com/acme/orders/OrderService.java"
    );
    assert_eq!(publish.usage_location.line_number, Some(20));
}

// Core Test 4: Smart service and metadata
#[test]
fn test_smart_service_and_metadata() {
    let root = setup_order_project();
    let report = ChainTrace::new(&root).analyze().unwrap();

    let smart = report.smart_service.as_ref().unwrap();
    assert_eq!(smart.service_id, "XTSTCLFNJ");
    assert_eq!(smart.interface_name, "com.acme.svc.IBilling");
    assert!(!smart.is_ui_service);
    assert_eq!(smart.function_methods.len(), 1);
    let charge = &smart.function_methods["com.acme.svc.IBilling.charge(java.lang.String)"];
    assert_eq!(charge.id, "BILL-01");
    assert_eq!(charge.name, "Charge");

    let meta = &report.metadata;
    assert_eq!(meta.total_files_scanned, 5);
    assert_eq!(meta.total_classes_analyzed, 5);
    assert_eq!(
        meta.usage_counts,
        UsageCounts {
            function_clients: 2,
            services: 3,
            eda_publish: 1,
        }
    );
    assert!(!meta.had_errors);
    assert!(!meta.has_circular_references);
    assert!(meta.skipped_files.is_empty());
    assert!(meta.cache_stats.cached_methods >= 2);
    assert_eq!(report.total_usages(), 6);
}

// Core Test 5: JSON output shape
#[test]
fn test_report_json() {
    let root = setup_order_project();
    let report = ChainTrace::new(&root).analyze().unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["functionClientUsages"][0]["functionId"], "ProcessPayments");
    assert_eq!(json["serviceUsages"][0]["usageType"], "INSTANTIATION");
    assert_eq!(json["eventPublishUsages"][0]["topicStatus"], "RESOLVED");
    assert_eq!(json["smartService"]["serviceId"], "XTSTCLFNJ");
    assert_eq!(json["metadata"]["usageCounts"]["services"], 3);
    assert_eq!(
        json["serviceUsages"][1]["callChains"][0][1]["isEntryPoint"],
        serde_json::Value::Bool(true)
    );
}

const LOOP: &str = r#"
package com.acme.jobs;

import dev.myorg.mysection.eda.publisher.service.IEventPublisher;

public class Loop {
    private IEventPublisher publisher;

    public void start() {
        a();
    }

    public void resume() {
        a();
    }

    void a() {
        b();
        publisher.publishEvent("jobs.tick", "payload");
    }

    void b() {
        a();
    }
}
"#;

fn setup_loop_project() -> PathBuf {
    let root = setup_temp_project();
    write_file(&root.join("pom.xml"), POM);
    write_java(&root, "com/acme/jobs/Loop.java", LOOP);
    root
}

// Extended Test 1: Cycles are dropped and flagged
#[test]
fn test_cycle_is_flagged() {
    let root = setup_loop_project();
    let report = ChainTrace::new(&root).keep_all_chains(true).analyze().unwrap();

    let publish = &report.event_publish_usages[0];
    assert_eq!(publish.topic_name, "jobs.tick");
    assert_eq!(publish.message_data_type.as_deref(), Some("java.lang.String"));

    let chains: Vec<_> = publish.call_chains.iter().map(|c| signatures(c)).collect();
    assert_eq!(
        chains,
        vec![
            vec!["com.acme.jobs.Loop.a()", "com.acme.jobs.Loop.start()"],
            vec!["com.acme.jobs.Loop.a()", "com.acme.jobs.Loop.resume()"],
        ]
    );
    assert!(report.metadata.has_circular_references);
    assert!(report
        .metadata
        .warnings
        .iter()
        .any(|w| w == "Circular reference detected in com.acme.jobs.Loop.a()"));
}

// Extended Test 2: Only the primary chain survives by default
#[test]
fn test_primary_chain_by_default() {
    let root = setup_loop_project();
    let report = ChainTrace::new(&root).analyze().unwrap();

    let publish = &report.event_publish_usages[0];
    assert_eq!(publish.call_chains.len(), 1);
    assert_eq!(signatures(publish.call_chain())[1], "com.acme.jobs.Loop.start()");
}

// Extended Test 3: Depth limit through the builder
#[test]
fn test_depth_limit_through_builder() {
    let root = setup_order_project();
    let report = ChainTrace::new(&root)
        .with_config(AnalysisConfig::with_max_depth(1).unwrap())
        .analyze()
        .unwrap();

    let chain = report.service_usages[0].call_chain();
    assert_eq!(signatures(chain), PLACE_CHAIN);
    assert!(report
        .metadata
        .warnings
        .iter()
        .any(|w| w.starts_with("Max depth reached at com.acme.orders.OrderController.create")));
}

// Extended Test 4: Custom conventions from chaintrace.toml
#[test]
fn test_custom_conventions_from_config() {
    let root = setup_order_project();
    write_file(
        &root.join("chaintrace.toml"),
        "max_depth = 10\n\n[conventions]\npublish_method = \"emit\"\n",
    );

    let cfg = load_config(&root).unwrap().unwrap();
    let report = ChainTrace::new(&root)
        .with_config(cfg.analysis_config().unwrap())
        .with_conventions(cfg.conventions.unwrap())
        .analyze()
        .unwrap();

    assert!(report.event_publish_usages.is_empty());
    assert_eq!(report.service_usages.len(), 3);
}

// Extended Test 5: Unconfigured dependencies find nothing
#[test]
fn test_pom_without_dependencies() {
    let root = setup_order_project();
    write_file(
        &root.join("pom.xml"),
        "<project><artifactId>other</artifactId></project>",
    );
    let report = ChainTrace::new(&root).analyze().unwrap();

    assert!(report.function_client_usages.is_empty());
    assert!(report.service_usages.is_empty());
    assert_eq!(report.event_publish_usages.len(), 1);
    assert!(report.smart_service.is_none());
}

// Extended Test 6: Malformed pom.xml degrades to a warning
#[test]
fn test_malformed_pom_is_a_warning() {
    let root = setup_order_project();
    write_file(&root.join("pom.xml"), "<project><dependencies></project>");
    let report = ChainTrace::new(&root).analyze().unwrap();

    assert!(report.service_usages.is_empty());
    assert!(report
        .metadata
        .warnings
        .iter()
        .any(|w| w.starts_with("Failed to parse pom.xml")));
    assert!(!report.metadata.had_errors);
}

// ============================================================================
// PROJECT VALIDATION
// ============================================================================

#[test]
fn test_missing_project_is_error() {
    let root = std::env::temp_dir().join("chaintrace_tests").join("does_not_exist_anywhere");
    let err = ChainTrace::new(&root).analyze().unwrap_err();
    assert!(matches!(err, ChainTraceError::Project { .. }));
    assert!(err.to_string().contains("Project path does not exist"));
}

#[test]
fn test_missing_pom_is_error() {
    let root = setup_temp_project();
    let err = ChainTrace::new(&root).analyze().unwrap_err();
    assert!(err.to_string().contains("No pom.xml found in project root"));
}

#[test]
fn test_missing_sources_is_error() {
    let root = setup_temp_project();
    write_file(&root.join("pom.xml"), POM);
    fs::remove_dir_all(root.join("src")).unwrap();
    let err = ChainTrace::new(&root).analyze().unwrap_err();
    assert!(err.to_string().contains("No src/main/java directory found"));
}

#[test]
fn test_multi_module_is_rejected() {
    let root = setup_order_project();
    write_file(&root.join("billing-api/pom.xml"), POM);
    let err = ChainTrace::new(&root).analyze().unwrap_err();
    assert!(matches!(err, ChainTraceError::UnsupportedProject { .. }));
    assert!(!err.is_recoverable());
}

#[test]
fn test_target_pom_is_not_a_module() {
    let root = setup_order_project();
    write_file(&root.join("target/pom.xml"), POM);
    write_file(&root.join(".idea/pom.xml"), POM);
    assert!(ChainTrace::new(&root).analyze().is_ok());
}

#[test]
fn test_empty_source_tree() {
    let root = setup_temp_project();
    write_file(&root.join("pom.xml"), POM);
    let report = ChainTrace::new(&root).analyze().unwrap();
    assert_eq!(report.total_usages(), 0);
    assert_eq!(report.metadata.total_files_scanned, 0);
    assert!(!report.metadata.had_errors);
}

#[test]
fn test_excluded_directories_are_not_scanned() {
    let root = setup_order_project();
    write_java(&root, "build/generated/Generated.java", "package g; public class Generated {}");
    let files = gather_java_files(&root.join("src/main/java")).unwrap();
    assert_eq!(files.len(), 5);
    assert_eq!(count_java_files(&root.join("src/main/java")), 5);
}

// ============================================================================
// CONFIG & LOGGING
// ============================================================================

#[test]
fn test_config_not_found() {
    let root = setup_temp_project();
    assert!(load_config(&root).unwrap().is_none());
}

#[test]
fn test_logging_helpers() {
    log_warn("test warn");
    log_event("CUSTOM", "custom detail");

    let root = setup_temp_project();
    let failed = AnalysisReport::failed(root.clone(), chrono::Local::now(), 3, "Failed to parse project: boom");
    assert!(failed.metadata.had_errors);
    log_analysis_summary(&failed);
}

#[test]
fn test_plain_report_mentions_every_section() {
    let root = setup_order_project();
    let report = ChainTrace::new(&root).analyze().unwrap();
    let text = render_plain(&report);

    assert!(text.contains("FUNCTION CLIENT USAGES (2):"));
    assert!(text.contains("SERVICE USAGES (3):"));
    assert!(text.contains("EVENT PUBLISH USAGES (1):"));
    assert!(text.contains("SMART SERVICE: XTSTCLFNJ (com.acme.svc.IBilling)"));
    assert!(text.contains("FunctionClient[ProcessPayments.execute(String)]"));
}
