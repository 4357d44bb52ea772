//! Unit tests for log.rs
//!
//! Tests LogSeverity, LogEntry formatting and DefaultLogger filtering.

use crate::log::{format_entry, DefaultLogger, LogEntry, LogSeverity, Logger};
use std::time::SystemTime;

fn entry(severity: LogSeverity, file: Option<&'static str>, line: Option<u32>) -> LogEntry {
    LogEntry {
        severity,
        timestamp: SystemTime::now(),
        source: "galaxy3d::Octree".to_string(),
        message: "reinserted 3 drawables".to_string(),
        file,
        line,
    }
}

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_labels_are_fixed_width() {
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        assert_eq!(severity.label().len(), 5);
    }
    assert_eq!(LogSeverity::Info.label(), "INFO ");
}

// ============================================================================
// FORMAT TESTS
// ============================================================================

#[test]
fn test_format_entry_without_location() {
    let text = format_entry(&entry(LogSeverity::Info, None, None));
    assert!(text.contains("[INFO ]"));
    assert!(text.contains("[galaxy3d::Octree]"));
    assert!(text.ends_with("reinserted 3 drawables"));
}

#[test]
fn test_format_entry_with_location() {
    let text = format_entry(&entry(LogSeverity::Error, Some("octree.rs"), Some(42)));
    assert!(text.contains("[ERROR]"));
    assert!(text.ends_with("(octree.rs:42)"));
}

#[test]
fn test_format_entry_requires_file_and_line() {
    let text = format_entry(&entry(LogSeverity::Error, Some("octree.rs"), None));
    assert!(!text.contains("octree.rs"));
}

// ============================================================================
// DEFAULT LOGGER TESTS
// ============================================================================

#[test]
fn test_default_logger_filters_below_info() {
    let logger = DefaultLogger::new();
    assert_eq!(logger.min_severity(), LogSeverity::Info);
    assert!(!logger.accepts(LogSeverity::Trace));
    assert!(!logger.accepts(LogSeverity::Debug));
    assert!(logger.accepts(LogSeverity::Info));
    assert!(logger.accepts(LogSeverity::Error));
}

#[test]
fn test_default_logger_custom_threshold() {
    let logger = DefaultLogger::with_min_severity(LogSeverity::Trace);
    assert!(logger.accepts(LogSeverity::Trace));

    let quiet = DefaultLogger::with_min_severity(LogSeverity::Error);
    assert!(!quiet.accepts(LogSeverity::Warn));
}

#[test]
fn test_default_logger_prints_all_severities() {
    let logger = DefaultLogger::with_min_severity(LogSeverity::Trace);
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        logger.log(&entry(severity, None, None));
        logger.log(&entry(severity, Some("renderer.rs"), Some(7)));
    }
}

// ============================================================================
// LOGGER TRAIT TESTS
// ============================================================================

struct CountingLogger {
    count: std::sync::Mutex<usize>,
}

impl Logger for CountingLogger {
    fn log(&self, _entry: &LogEntry) {
        *self.count.lock().unwrap() += 1;
    }
}

#[test]
fn test_custom_logger_receives_entries() {
    let logger = CountingLogger { count: std::sync::Mutex::new(0) };
    logger.log(&entry(LogSeverity::Trace, None, None));
    logger.log(&entry(LogSeverity::Error, None, None));
    assert_eq!(*logger.count.lock().unwrap(), 2);
}

#[test]
fn test_logger_trait_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<DefaultLogger>();
    assert_send_sync::<CountingLogger>();
}
