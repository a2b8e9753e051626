// C ABI tests. They share the process-wide producer, so every test is serial
// and starts from a fresh producer rooted in its own temporary directory.
use handoff_bridge::ffi::*;
use handoff_bridge::Bridge::{MAX_IDENTIFIER_LEN_ENV, ROOT_DIR_ENV};
use handoff_bridge::{BufferHandle, Consumer, ProducerBuilder};
use serial_test::serial;
use std::ffi::CString;
use std::fs;
use tempfile::TempDir;

fn start() -> TempDir {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(dir.path().join("config.dat"), br#"{"x": 1}"#).unwrap();

    handoff_shutdown();
    let root = CString::new(dir.path().to_str().unwrap()).unwrap();
    assert_eq!(unsafe { handoff_startup(root.as_ptr()) }, HANDOFF_SUCCESS);
    dir
}

fn load(identifier: &str) -> *const BufferHandle {
    let identifier = CString::new(identifier).unwrap();
    unsafe { handoff_load_resource(identifier.as_ptr()) }
}

#[test]
#[serial]
fn test_config_scenario() {
    let _dir = start();

    let handle = load("config.dat");
    assert!(!handle.is_null());
    let record = unsafe { &*handle };
    assert_eq!(record.length, 7);

    let copied = unsafe { std::slice::from_raw_parts(record.data, record.length) }.to_vec();
    assert_eq!(handoff_release(handle), HANDOFF_SUCCESS);
    assert_eq!(handoff_release(handle), HANDOFF_ERROR_DOUBLE_RELEASE);

    let decoded: serde_json::Value = serde_json::from_slice(&copied).unwrap();
    assert_eq!(decoded, serde_json::json!({ "x": 1 }));
    assert_eq!(handoff_shutdown(), 0);
}

#[test]
#[serial]
fn test_missing_scenario() {
    let _dir = start();

    let handle = load("missing.dat");
    assert!(!handle.is_null());
    assert_eq!(unsafe { (*handle).length }, 0);
    assert!(unsafe { (*handle).data.is_null() });
    assert_eq!(handoff_live_handles(), 1);

    assert_eq!(handoff_release(handle), HANDOFF_SUCCESS);
    assert_eq!(handoff_live_handles(), 0);
    handoff_shutdown();
}

#[test]
#[serial]
fn test_legacy_names() {
    let _dir = start();

    let identifier = CString::new("config.dat").unwrap();
    let handle = unsafe { LoadFile(identifier.as_ptr()) };
    assert_eq!(unsafe { (*handle).length }, 7);
    assert_eq!(Release(handle), HANDOFF_SUCCESS);
    assert_eq!(Release(handle), HANDOFF_ERROR_DOUBLE_RELEASE);
    handoff_shutdown();
}

#[test]
#[serial]
fn test_null_arguments() {
    let _dir = start();

    assert_eq!(handoff_release(std::ptr::null()), HANDOFF_ERROR_NULL_POINTER);

    let handle = unsafe { handoff_load_resource(std::ptr::null()) };
    assert!(!handle.is_null());
    assert_eq!(unsafe { (*handle).length }, 0);
    assert_eq!(handoff_release(handle), HANDOFF_SUCCESS);

    let handle = unsafe { handoff_load_resource_bytes(std::ptr::null(), 0) };
    assert_eq!(unsafe { (*handle).length }, 0);
    assert_eq!(handoff_release(handle), HANDOFF_SUCCESS);

    assert_eq!(handoff_live_handles(), 0);
    handoff_shutdown();
}

#[test]
#[serial]
fn test_embedded_nul_is_unreadable() {
    let _dir = start();

    let identifier = b"config.dat\0trailing";
    let handle = unsafe { handoff_load_resource_bytes(identifier.as_ptr(), identifier.len()) };
    assert_eq!(unsafe { (*handle).length }, 0);
    assert_eq!(handoff_release(handle), HANDOFF_SUCCESS);

    let identifier = b"config.dat";
    let handle = unsafe { handoff_load_resource_bytes(identifier.as_ptr(), identifier.len()) };
    assert_eq!(unsafe { (*handle).length }, 7);
    assert_eq!(handoff_release(handle), HANDOFF_SUCCESS);
    handoff_shutdown();
}

#[test]
#[serial]
fn test_restart_refused_while_handles_live() {
    let dir = start();
    let root = CString::new(dir.path().to_str().unwrap()).unwrap();

    let handle = load("config.dat");
    assert_eq!(unsafe { handoff_startup(root.as_ptr()) }, HANDOFF_ERROR_BUSY);
    assert_eq!(unsafe { (*handle).length }, 7, "the live handle survives");

    assert_eq!(handoff_release(handle), HANDOFF_SUCCESS);
    assert_eq!(unsafe { handoff_startup(root.as_ptr()) }, HANDOFF_SUCCESS);
    handoff_shutdown();
}

#[test]
#[serial]
fn test_startup_rejects_missing_root() {
    handoff_shutdown();
    let dir = tempfile::tempdir().unwrap();
    let root = CString::new(dir.path().join("absent").to_str().unwrap()).unwrap();
    assert_eq!(unsafe { handoff_startup(root.as_ptr()) }, HANDOFF_ERROR_INVALID_ARG);
}

#[test]
#[serial]
fn test_shutdown_reports_leaks() {
    let _dir = start();

    let leaked = load("config.dat");
    load("missing.dat");
    assert_eq!(handoff_live_handles(), 2);
    assert_eq!(handoff_shutdown(), 2);
    assert_eq!(handoff_live_handles(), 0);

    // Nothing is running now, so the stale handle is refused, not freed.
    assert_eq!(handoff_release(leaked), HANDOFF_ERROR_DOUBLE_RELEASE);
}

#[test]
#[serial]
fn test_native_consumer() {
    let _dir = start();
    let consumer: Consumer = Consumer::default();

    let document: Option<serde_json::Value> = consumer.fetch_json("config.dat").unwrap();
    assert_eq!(document, Some(serde_json::json!({ "x": 1 })));
    assert_eq!(consumer.fetch("missing.dat").unwrap(), None);
    assert_eq!(handoff_live_handles(), 0);
    handoff_shutdown();
}

#[test]
#[serial]
fn test_lazy_start_from_environment() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.dat"), br#"{"x": 1}"#).unwrap();

    handoff_shutdown();
    std::env::set_var(ROOT_DIR_ENV, dir.path());
    let handle = load("config.dat");
    std::env::remove_var(ROOT_DIR_ENV);

    assert!(!handle.is_null());
    assert_eq!(unsafe { (*handle).length }, 7);
    assert_eq!(handoff_release(handle), HANDOFF_SUCCESS);
    handoff_shutdown();
}

#[test]
#[serial]
fn test_builder_from_environment() {
    let dir = tempfile::tempdir().unwrap();

    std::env::set_var(ROOT_DIR_ENV, dir.path());
    std::env::set_var(MAX_IDENTIFIER_LEN_ENV, "32");
    let producer = ProducerBuilder::from_env().build().unwrap();
    assert_eq!(producer.max_identifier_len(), 32);

    // Unparseable values fall back to the default bound.
    std::env::set_var(MAX_IDENTIFIER_LEN_ENV, "lots");
    let producer = ProducerBuilder::from_env().build().unwrap();
    assert_eq!(producer.max_identifier_len(), ProducerBuilder::new().build().unwrap().max_identifier_len());

    std::env::remove_var(MAX_IDENTIFIER_LEN_ENV);
    std::env::set_var(ROOT_DIR_ENV, dir.path().join("absent"));
    assert!(ProducerBuilder::from_env().build().is_err());
    std::env::remove_var(ROOT_DIR_ENV);
}
