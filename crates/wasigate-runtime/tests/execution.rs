//! End-to-end executor tests against small WASI command modules.

use std::time::Duration;
use wasigate_core::ModuleId;
use wasigate_core::invocation::InvocationEnv;
use wasigate_runtime::{Executor, RuntimeLimits};

/// A WASI command writing a fixed line to stdout.
const HELLO_WAT: &str = r#"
    (module
        (import "wasi_snapshot_preview1" "fd_write"
            (func $fd_write (param i32 i32 i32 i32) (result i32)))
        (memory (export "memory") 1)
        (data (i32.const 16) "hello from wasi\n")
        (func (export "_start")
            (i32.store (i32.const 0) (i32.const 16))
            (i32.store (i32.const 4) (i32.const 16))
            (call $fd_write
                (i32.const 1)
                (i32.const 0)
                (i32.const 1)
                (i32.const 8))
            drop))
"#;

/// A WASI command that returns without writing anything.
const SILENT_WAT: &str = r#"
    (module
        (func (export "_start")))
"#;

/// A WASI command exiting through proc_exit with a non-zero status.
const EXIT_7_WAT: &str = r#"
    (module
        (import "wasi_snapshot_preview1" "proc_exit"
            (func $proc_exit (param i32)))
        (func (export "_start")
            (call $proc_exit (i32.const 7))))
"#;

/// A module trapping immediately.
const TRAP_WAT: &str = r#"
    (module
        (func (export "_start")
            unreachable))
"#;

/// A module spinning forever.
const SPIN_WAT: &str = r#"
    (module
        (func (export "_start")
            (loop $l (br $l))))
"#;

/// A module whose core start section spins forever, before `_start` is
/// ever reached.
const SPIN_START_SECTION_WAT: &str = r#"
    (module
        (func $spin (loop $l (br $l)))
        (start $spin)
        (func (export "_start")))
"#;

fn invocation() -> InvocationEnv {
    InvocationEnv::builder(ModuleId::new("test.wasm"))
        .arg("index.php")
        .env("REQUEST_METHOD", "GET")
        .build()
}

fn executor() -> Executor {
    Executor::new(RuntimeLimits::default(), 4).unwrap()
}

#[tokio::test]
async fn captures_stdout() {
    let image = wat::parse_str(HELLO_WAT).unwrap();
    let output = executor().run(&image, &invocation()).await.unwrap();

    assert_eq!(output.stdout_lossy(), "hello from wasi\n");
    assert!(output.is_success());
    assert!(output.stderr().is_empty());
}

#[tokio::test]
async fn silent_run_yields_empty_stdout() {
    let image = wat::parse_str(SILENT_WAT).unwrap();
    let output = executor().run(&image, &invocation()).await.unwrap();

    assert!(output.stdout().is_empty());
    assert_eq!(output.into_body(), b"No output");
}

#[tokio::test]
async fn nonzero_exit_is_execution_error() {
    let image = wat::parse_str(EXIT_7_WAT).unwrap();
    let err = executor().run(&image, &invocation()).await.unwrap_err();

    assert!(err.is_execution());
    assert!(format!("{err}").contains('7'));
}

#[tokio::test]
async fn trap_is_execution_error() {
    let image = wat::parse_str(TRAP_WAT).unwrap();
    let err = executor().run(&image, &invocation()).await.unwrap_err();
    assert!(err.is_execution());
}

#[tokio::test]
async fn spinning_guest_hits_timeout() {
    let limits = RuntimeLimits::builder()
        .execution_timeout(Duration::from_millis(300))
        .build();
    let executor = Executor::new(limits, 4).unwrap();

    let image = wat::parse_str(SPIN_WAT).unwrap();
    let err = executor.run(&image, &invocation()).await.unwrap_err();
    assert!(err.is_timeout());
}

#[tokio::test]
async fn spinning_start_section_hits_timeout() {
    let limits = RuntimeLimits::builder()
        .execution_timeout(Duration::from_millis(300))
        .build();
    let executor = Executor::new(limits, 4).unwrap();

    // Instantiation runs the start section, so the wall-clock limit has
    // to cover it as well as the entry call.
    let image = wat::parse_str(SPIN_START_SECTION_WAT).unwrap();
    let err = executor.run(&image, &invocation()).await.unwrap_err();
    assert!(err.is_timeout());
}

#[tokio::test]
async fn failed_runs_count_toward_timing() {
    let executor = executor();
    let image = wat::parse_str(TRAP_WAT).unwrap();
    executor.run(&image, &invocation()).await.unwrap_err();

    let stats = executor.collect_stats();
    assert_eq!(stats.total_executions, 1);
    assert_eq!(stats.execution_failures, 1);
    assert!(stats.avg_execution_time_us > 0);
}

#[tokio::test]
async fn repeated_runs_hit_module_cache() {
    let executor = executor();
    let image = wat::parse_str(HELLO_WAT).unwrap();

    executor.run(&image, &invocation()).await.unwrap();
    executor.run(&image, &invocation()).await.unwrap();
    executor.run(&image, &invocation()).await.unwrap();

    let stats = executor.collect_stats();
    assert_eq!(stats.total_executions, 3);
    assert_eq!(stats.cache_hits, 2);
    assert_eq!(stats.execution_failures, 0);
    assert!(stats.avg_execution_time_us > 0);
}

#[tokio::test]
async fn sequential_runs_are_isolated() {
    let executor = executor();
    let image = wat::parse_str(HELLO_WAT).unwrap();

    let first = InvocationEnv::builder(ModuleId::new("test.wasm"))
        .env("QUERY_STRING", "a=1")
        .build();
    let second = InvocationEnv::builder(ModuleId::new("test.wasm"))
        .env("QUERY_STRING", "b=2")
        .build();

    let out1 = executor.run(&image, &first).await.unwrap();
    let out2 = executor.run(&image, &second).await.unwrap();

    // Each run gets its own pipes; output is identical and unpolluted.
    assert_eq!(out1.stdout(), out2.stdout());
}
