//! Integration tests for loading and invoking WASM modules.
//!
//! Modules are written as WAT text and compiled with the `wat` crate.

use std::sync::Arc;
use std::thread;
use wasmhost_core::{Emission, HarnessError, RecordingSink, TrapKind, Value};
use wasmhost_executor::wasm::{ImportTable, WasmRuntime, WasmRuntimeConfig, load};

fn wat(text: &str) -> Vec<u8> {
    wat::parse_str(text).expect("Failed to parse WAT")
}

const HELLO_WORLD: &str = r#"
(module
  (func (export "helloWorld") (result i32)
    i32.const 42))
"#;

const LOG_INTEGER: &str = r#"
(module
  (import "console" "log" (func $log (param i32)))
  (func (export "main")
    i32.const 7
    call $log))
"#;

const LOG_STRING: &str = r#"
(module
  (import "js" "mem" (memory 1))
  (import "console" "log" (func $log (param i32 i32)))
  (func (export "main")
    ;; "hi" at offset 0
    i32.const 0
    i32.const 104
    i32.store8
    i32.const 1
    i32.const 105
    i32.store8
    i32.const 0
    i32.const 2
    call $log))
"#;

const ARITHMETIC: &str = r#"
(module
  (func (export "add") (param i32 i32) (result i32)
    local.get 0
    local.get 1
    i32.add)
  (func (export "div") (param i32 i32) (result i32)
    local.get 0
    local.get 1
    i32.div_s)
  (func (export "half") (param f64) (result f64)
    local.get 0
    f64.const 0.5
    f64.mul)
  (func (export "wide") (param i64) (result i64)
    local.get 0
    i64.const 1
    i64.shl)
  (func (export "pair") (result i32 i32)
    i32.const 1
    i32.const 2)
  (func (export "boom")
    unreachable)
  (memory (export "memory") 1))
"#;

// ---------------------------------------------------------------------------
// End-to-end scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_hello_world_returns_42() {
    let mut instance =
        load(&wat(HELLO_WORLD), &ImportTable::empty()).expect("Failed to load module");

    let result = instance
        .invoke("helloWorld", &[])
        .expect("Failed to invoke helloWorld");
    assert_eq!(result, Some(Value::I32(42)));
}

#[test]
fn test_integer_logger_emits_once() {
    let sink = RecordingSink::new();
    let mut instance = load(&wat(LOG_INTEGER), &ImportTable::integer_logger(sink.clone()))
        .expect("Failed to load module");

    let result = instance.invoke("main", &[]).expect("Failed to invoke main");
    assert_eq!(result, None);
    assert_eq!(sink.emissions(), vec![Emission::Integer(7)]);
}

#[test]
fn test_string_logger_reads_shared_memory() {
    let sink = RecordingSink::new();
    let mut instance = load(&wat(LOG_STRING), &ImportTable::string_logger(sink.clone()))
        .expect("Failed to load module");

    instance.invoke("main", &[]).expect("Failed to invoke main");
    assert_eq!(sink.emissions(), vec![Emission::Text("hi".to_string())]);

    // The host memory is visible to the embedder too.
    let bytes = instance
        .read_memory("js.mem", 0, 2)
        .expect("Failed to read js.mem");
    assert_eq!(bytes, b"hi");
}

#[test]
fn test_emissions_are_synchronous_and_ordered() {
    let sink = RecordingSink::new();
    let bytes = wat(r#"
        (module
          (import "console" "log" (func $log (param i32)))
          (func (export "main")
            i32.const 1
            call $log
            i32.const 2
            call $log
            i32.const 3
            call $log))
    "#);
    let mut instance =
        load(&bytes, &ImportTable::integer_logger(sink.clone())).expect("Failed to load module");

    instance.invoke("main", &[]).expect("Failed to invoke main");
    instance.invoke("main", &[]).expect("Failed to invoke main");
    assert_eq!(sink.integers(), vec![1, 2, 3, 1, 2, 3]);
}

// ---------------------------------------------------------------------------
// Load failures
// ---------------------------------------------------------------------------

#[test]
fn test_malformed_bytes_fail_validation() {
    let err = load(b"\0asm\x01\0\0\0\xff", &ImportTable::empty()).unwrap_err();
    assert!(matches!(err, HarnessError::Validation { .. }), "{err}");
}

#[test]
fn test_missing_import_fails_link() {
    let err = load(&wat(LOG_INTEGER), &ImportTable::empty()).unwrap_err();
    assert!(matches!(err, HarnessError::Link { .. }), "{err}");
    assert!(err.to_string().contains("console.log"));
}

#[test]
fn test_unknown_namespace_fails_link() {
    let bytes = wat(r#"(module (import "env" "abort" (func)))"#);
    let err = load(&bytes, &ImportTable::integer_logger(RecordingSink::new())).unwrap_err();
    assert!(matches!(err, HarnessError::Link { .. }), "{err}");
    assert!(err.to_string().contains("env.abort"));
}

#[test]
fn test_signature_mismatch_fails_link() {
    // The integer logger offered where the string logger is expected.
    let err = load(
        &wat(LOG_STRING),
        &ImportTable::integer_logger(RecordingSink::new()),
    )
    .unwrap_err();
    assert!(matches!(err, HarnessError::Link { .. }), "{err}");
}

#[test]
fn test_trapping_start_fails_instantiation() {
    let bytes = wat(r#"
        (module
          (func $start unreachable)
          (start $start))
    "#);
    let err = load(&bytes, &ImportTable::empty()).unwrap_err();
    assert!(matches!(err, HarnessError::Instantiation { .. }), "{err}");
}

#[test]
fn test_start_function_can_log() {
    let sink = RecordingSink::new();
    let bytes = wat(r#"
        (module
          (import "console" "log" (func $log (param i32)))
          (func $start
            i32.const 99
            call $log)
          (start $start))
    "#);
    load(&bytes, &ImportTable::integer_logger(sink.clone())).expect("Failed to load module");
    assert_eq!(sink.integers(), vec![99]);
}

// ---------------------------------------------------------------------------
// Invocation failures
// ---------------------------------------------------------------------------

#[test]
fn test_unknown_export_not_found() {
    let mut instance = load(&wat(ARITHMETIC), &ImportTable::empty()).expect("Failed to load");

    let err = instance.invoke("missing", &[]).unwrap_err();
    assert!(matches!(err, HarnessError::NotFound { .. }), "{err}");

    // A memory export is not callable.
    let err = instance.invoke("memory", &[]).unwrap_err();
    assert!(matches!(err, HarnessError::NotFound { .. }), "{err}");
}

#[test]
fn test_arity_and_type_mismatch() {
    let mut instance = load(&wat(ARITHMETIC), &ImportTable::empty()).expect("Failed to load");

    let err = instance.invoke("add", &[Value::I32(1)]).unwrap_err();
    assert!(matches!(err, HarnessError::ArityOrType { .. }), "{err}");

    let err = instance
        .invoke("add", &[Value::I32(1), Value::I64(2)])
        .unwrap_err();
    assert!(matches!(err, HarnessError::ArityOrType { .. }), "{err}");
}

#[test]
fn test_arity_mismatch_does_not_run_guest() {
    let sink = RecordingSink::new();
    let mut instance = load(&wat(LOG_INTEGER), &ImportTable::integer_logger(sink.clone()))
        .expect("Failed to load module");

    let err = instance.invoke("main", &[Value::I32(1)]).unwrap_err();
    assert_eq!(err.code(), "E202");
    assert!(sink.is_empty());
}

#[test]
fn test_division_by_zero_traps_and_instance_survives() {
    let mut instance = load(&wat(ARITHMETIC), &ImportTable::empty()).expect("Failed to load");

    let err = instance
        .invoke("div", &[Value::I32(1), Value::I32(0)])
        .unwrap_err();
    assert_eq!(err.trap_kind(), Some(TrapKind::IntegerDivisionByZero));
    assert!(err.is_guest_fault());

    let result = instance
        .invoke("div", &[Value::I32(9), Value::I32(3)])
        .expect("Instance should remain usable after a trap");
    assert_eq!(result, Some(Value::I32(3)));
}

#[test]
fn test_unreachable_traps() {
    let mut instance = load(&wat(ARITHMETIC), &ImportTable::empty()).expect("Failed to load");
    let err = instance.invoke("boom", &[]).unwrap_err();
    assert!(
        matches!(
            err,
            HarnessError::Trap {
                kind: TrapKind::Unreachable,
                ..
            }
        ),
        "{err}"
    );
}

#[test]
fn test_multi_value_results() {
    let mut instance = load(&wat(ARITHMETIC), &ImportTable::empty()).expect("Failed to load");

    let err = instance.invoke("pair", &[]).unwrap_err();
    assert_eq!(err.code(), "E202");

    let results = instance
        .invoke_multi("pair", &[])
        .expect("Failed to invoke pair");
    assert_eq!(results, vec![Value::I32(1), Value::I32(2)]);
}

#[test]
fn test_float_and_i64_values() {
    let mut instance = load(&wat(ARITHMETIC), &ImportTable::empty()).expect("Failed to load");

    let result = instance
        .invoke("half", &[Value::F64(5.0)])
        .expect("Failed to invoke half");
    assert_eq!(result, Some(Value::F64(2.5)));

    let result = instance
        .invoke("wide", &[Value::I64(1 << 40)])
        .expect("Failed to invoke wide");
    assert_eq!(result, Some(Value::I64(1 << 41)));
}

#[test]
fn test_signature_lookup() {
    let mut instance = load(&wat(ARITHMETIC), &ImportTable::empty()).expect("Failed to load");
    let sig = instance.signature("add").expect("Failed to get signature");
    assert_eq!(sig.to_string(), "(i32, i32) -> (i32)");
    assert!(instance.has_function("add"));
    assert!(!instance.has_function("memory"));
    assert_eq!(instance.exports().len(), 7);
}

// ---------------------------------------------------------------------------
// String logger memory handling
// ---------------------------------------------------------------------------

#[test]
fn test_out_of_bounds_descriptor_emits_nothing() {
    let sink = RecordingSink::new();
    let bytes = wat(r#"
        (module
          (import "js" "mem" (memory 1))
          (import "console" "log" (func $log (param i32 i32)))
          (func (export "main")
            i32.const 65535
            i32.const 2
            call $log))
    "#);
    let mut instance =
        load(&bytes, &ImportTable::string_logger(sink.clone())).expect("Failed to load module");

    let err = instance.invoke("main", &[]).unwrap_err();
    match err {
        HarnessError::MemoryBounds {
            offset,
            length,
            memory_size,
        } => {
            assert_eq!(offset, 65535);
            assert_eq!(length, 2);
            assert_eq!(memory_size, 65536);
        }
        other => panic!("expected MemoryBounds, got {other}"),
    }
    assert!(sink.is_empty());
}

#[test]
fn test_invalid_utf8_is_decode_error() {
    let sink = RecordingSink::new();
    let bytes = wat(r#"
        (module
          (import "js" "mem" (memory 1))
          (import "console" "log" (func $log (param i32 i32)))
          (data (i32.const 0) "\ff\fe")
          (func (export "main")
            i32.const 0
            i32.const 2
            call $log))
    "#);
    let mut instance =
        load(&bytes, &ImportTable::string_logger(sink.clone())).expect("Failed to load module");

    let err = instance.invoke("main", &[]).unwrap_err();
    assert!(matches!(err, HarnessError::Decode { .. }), "{err}");
    assert!(sink.is_empty());
}

#[test]
fn test_empty_string_is_emitted() {
    let sink = RecordingSink::new();
    let bytes = wat(r#"
        (module
          (import "js" "mem" (memory 1))
          (import "console" "log" (func $log (param i32 i32)))
          (func (export "main")
            i32.const 10
            i32.const 0
            call $log))
    "#);
    let mut instance =
        load(&bytes, &ImportTable::string_logger(sink.clone())).expect("Failed to load module");

    instance.invoke("main", &[]).expect("Failed to invoke main");
    assert_eq!(sink.texts(), vec![String::new()]);
}

#[test]
fn test_log_after_memory_growth() {
    let sink = RecordingSink::new();
    let bytes = wat(r#"
        (module
          (import "js" "mem" (memory 1))
          (import "console" "log" (func $log (param i32 i32)))
          (func (export "main")
            i32.const 1
            memory.grow
            drop
            ;; "ok" just past the first page
            i32.const 65536
            i32.const 111
            i32.store8
            i32.const 65537
            i32.const 107
            i32.store8
            i32.const 65536
            i32.const 2
            call $log))
    "#);
    let mut instance =
        load(&bytes, &ImportTable::string_logger(sink.clone())).expect("Failed to load module");

    instance.invoke("main", &[]).expect("Failed to invoke main");
    assert_eq!(sink.texts(), vec!["ok".to_string()]);
}

#[test]
fn test_exported_memory_logger() {
    let sink = RecordingSink::new();
    let bytes = wat(r#"
        (module
          (import "console" "log" (func $log (param i32 i32)))
          (memory (export "memory") 1)
          (data (i32.const 16) "hello")
          (func (export "main")
            i32.const 16
            i32.const 5
            call $log))
    "#);
    let imports = ImportTable::string_logger_exported(sink.clone(), "memory");
    let mut instance = load(&bytes, &imports).expect("Failed to load module");

    instance.invoke("main", &[]).expect("Failed to invoke main");
    assert_eq!(sink.texts(), vec!["hello".to_string()]);
}

#[test]
fn test_exported_memory_logger_without_export() {
    let bytes = wat(r#"
        (module
          (import "console" "log" (func $log (param i32 i32)))
          (func (export "main")
            i32.const 0
            i32.const 1
            call $log))
    "#);
    let imports = ImportTable::string_logger_exported(RecordingSink::new(), "memory");
    let mut instance = load(&bytes, &imports).expect("Failed to load module");

    let err = instance.invoke("main", &[]).unwrap_err();
    assert!(matches!(err, HarnessError::MemoryUnavailable { .. }), "{err}");
}

#[test]
fn test_host_memory_logger_requires_memory_import() {
    // Writes into its own memory, which the host logger would never see.
    let bytes = wat(r#"
        (module
          (import "console" "log" (func $log (param i32 i32)))
          (memory (export "memory") 1)
          (data (i32.const 0) "hi")
          (func (export "main")
            i32.const 0
            i32.const 2
            call $log))
    "#);
    let sink = RecordingSink::new();

    let err = load(&bytes, &ImportTable::string_logger(sink.clone())).unwrap_err();
    assert!(matches!(err, HarnessError::Link { .. }), "{err}");
    assert!(err.to_string().contains("js.mem"), "{err}");
    assert!(sink.texts().is_empty());

    let imports = ImportTable::string_logger_exported(sink.clone(), "memory");
    let mut instance = load(&bytes, &imports).expect("Failed to load module");
    instance.invoke("main", &[]).expect("Failed to invoke main");
    assert_eq!(sink.texts(), vec!["hi".to_string()]);
}

#[test]
fn test_i64_integer_logger() {
    let sink = RecordingSink::new();
    let bytes = wat(r#"
        (module
          (import "console" "log" (func $log (param i64)))
          (func (export "main")
            i64.const 1099511627776
            call $log))
    "#);
    let mut instance = load(&bytes, &ImportTable::integer_logger_i64(sink.clone()))
        .expect("Failed to load module");

    instance.invoke("main", &[]).expect("Failed to invoke main");
    assert_eq!(sink.integers(), vec![1 << 40]);
}

#[test]
fn test_instances_do_not_share_host_memory() {
    let runtime = WasmRuntime::with_defaults().expect("Failed to create runtime");
    let bytes = wat(LOG_STRING);

    let mut first = runtime
        .load(&bytes, &ImportTable::string_logger(RecordingSink::new()))
        .expect("Failed to load first");
    let mut second = runtime
        .load(&bytes, &ImportTable::string_logger(RecordingSink::new()))
        .expect("Failed to load second");

    first.invoke("main", &[]).expect("Failed to invoke main");
    assert_eq!(first.read_memory("js.mem", 0, 2).unwrap(), b"hi");
    assert_eq!(second.read_memory("js.mem", 0, 2).unwrap(), vec![0, 0]);
}

// ---------------------------------------------------------------------------
// Runtime features
// ---------------------------------------------------------------------------

#[test]
fn test_fuel_exhaustion_traps() {
    let runtime = WasmRuntime::new(WasmRuntimeConfig::testing()).expect("Failed to create runtime");
    let bytes = wat(r#"
        (module
          (func (export "spin")
            (loop $l
              br $l)))
    "#);
    let mut instance = runtime
        .load(&bytes, &ImportTable::empty())
        .expect("Failed to load module");

    let err = instance.invoke("spin", &[]).unwrap_err();
    assert_eq!(err.trap_kind(), Some(TrapKind::OutOfFuel));
    assert_eq!(instance.remaining_fuel(), Some(0));
}

#[test]
fn test_fuel_is_consumed() {
    let runtime = WasmRuntime::new(WasmRuntimeConfig::default().with_fuel(true, 10_000))
        .expect("Failed to create runtime");
    let mut instance = runtime
        .load(&wat(ARITHMETIC), &ImportTable::empty())
        .expect("Failed to load module");

    instance
        .invoke("add", &[Value::I32(1), Value::I32(2)])
        .expect("Failed to invoke add");
    let remaining = instance.remaining_fuel().expect("Fuel should be enabled");
    assert!(remaining < 10_000);
}

#[test]
fn test_memory_limit_caps_growth() {
    let runtime = WasmRuntime::new(WasmRuntimeConfig::default().with_max_memory_pages(2))
        .expect("Failed to create runtime");
    let bytes = wat(r#"
        (module
          (memory 1)
          (func (export "grow") (param i32) (result i32)
            local.get 0
            memory.grow))
    "#);
    let mut instance = runtime
        .load(&bytes, &ImportTable::empty())
        .expect("Failed to load module");

    let result = instance.invoke("grow", &[Value::I32(1)]).unwrap();
    assert_eq!(result, Some(Value::I32(1)));
    let result = instance.invoke("grow", &[Value::I32(1)]).unwrap();
    assert_eq!(result, Some(Value::I32(-1)));
}

#[test]
fn test_typed_invocation() {
    let mut instance = load(&wat(ARITHMETIC), &ImportTable::empty()).expect("Failed to load");

    let sum: i32 = instance
        .invoke_typed::<(i32, i32), i32>("add", (2, 3))
        .expect("Failed to invoke add");
    assert_eq!(sum, 5);

    // TypedFunc is not Debug, so match the error out instead of unwrap_err.
    let Err(err) = instance.typed_func::<i64, ()>("add") else {
        panic!("typed_func should reject a mismatched signature");
    };
    assert_eq!(err.code(), "E202");

    let Err(err) = instance.typed_func::<(), ()>("missing") else {
        panic!("typed_func should reject an unknown export");
    };
    assert_eq!(err.code(), "E201");
}

#[test]
fn test_module_cache_shared_across_loads() {
    let runtime = WasmRuntime::with_defaults().expect("Failed to create runtime");
    let bytes = wat(HELLO_WORLD);

    let compiled = runtime.compile("hello", &bytes).expect("Failed to compile");
    let mut a = runtime
        .instantiate(&compiled, &ImportTable::empty())
        .expect("Failed to instantiate");
    let mut b = runtime
        .load_named("hello", &bytes, &ImportTable::empty())
        .expect("Failed to load");

    assert_eq!(runtime.cache_size(), 1);
    assert_eq!(a.name(), "hello");
    assert_eq!(a.invoke("helloWorld", &[]).unwrap(), Some(Value::I32(42)));
    assert_eq!(b.invoke("helloWorld", &[]).unwrap(), Some(Value::I32(42)));
}

#[test]
fn test_compile_file() {
    let runtime = WasmRuntime::with_defaults().expect("Failed to create runtime");
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("helloWorld.wasm");
    std::fs::write(&path, wat(HELLO_WORLD)).expect("Failed to write module");

    let compiled = runtime.compile_file(&path).expect("Failed to compile file");
    assert_eq!(compiled.name(), "helloWorld.wasm");

    let mut instance = runtime
        .instantiate(&compiled, &ImportTable::empty())
        .expect("Failed to instantiate");
    assert_eq!(
        instance.invoke("helloWorld", &[]).unwrap(),
        Some(Value::I32(42))
    );

    let err = runtime
        .compile_file(&dir.path().join("missing.wasm"))
        .unwrap_err();
    assert!(matches!(err, HarnessError::Io { .. }), "{err}");
}

// ---------------------------------------------------------------------------
// Threads
// ---------------------------------------------------------------------------

#[test]
fn test_independent_instances_on_threads() {
    let runtime = Arc::new(WasmRuntime::with_defaults().expect("Failed to create runtime"));
    let bytes = Arc::new(wat(ARITHMETIC));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let runtime = Arc::clone(&runtime);
            let bytes = Arc::clone(&bytes);
            thread::spawn(move || {
                let mut instance = runtime
                    .load(&bytes, &ImportTable::empty())
                    .expect("Failed to load module");
                instance
                    .invoke("add", &[Value::I32(i), Value::I32(i)])
                    .expect("Failed to invoke add")
            })
        })
        .collect();

    let mut results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("Thread panicked"))
        .collect();
    results.sort_by_key(|v| v.and_then(|v| v.as_i32()));
    assert_eq!(
        results,
        vec![
            Some(Value::I32(0)),
            Some(Value::I32(2)),
            Some(Value::I32(4)),
            Some(Value::I32(6)),
        ]
    );
}

#[test]
fn test_shared_instance_serializes_calls() {
    let sink = RecordingSink::new();
    let bytes = wat(r#"
        (module
          (import "console" "log" (func $log (param i32)))
          (global $count (mut i32) (i32.const 0))
          (func (export "bump") (result i32)
            global.get $count
            i32.const 1
            i32.add
            global.set $count
            global.get $count
            call $log
            global.get $count))
    "#);
    let shared = load(&bytes, &ImportTable::integer_logger(sink.clone()))
        .expect("Failed to load module")
        .into_shared();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let shared = shared.clone();
            thread::spawn(move || {
                for _ in 0..10 {
                    shared.invoke("bump", &[]).expect("Failed to invoke bump");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let last = shared.invoke("bump", &[]).unwrap();
    assert_eq!(last, Some(Value::I32(41)));

    let mut logged = sink.integers();
    logged.sort_unstable();
    assert_eq!(logged, (1..=41).collect::<Vec<i64>>());
    assert_eq!(shared.with(|i| i.name().to_string()), "module");
}
