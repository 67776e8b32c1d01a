mod common;

use std::fs;

use lowerforge::core::engine::UnitConfig;
use lowerforge::core::emit::Primitive;
use lowerforge::registry_defaults::build_default_registry;
use lowerforge::translator::translate_source;

use common::cli_runner::{run, stderr_text, stdout_text, unique_temp_dir, write_source};

const FACTORIAL: &str = "\
; int fact(int n), local 1 holds the product
BLOCK
  LOOP
    LOCAL_GET I32 0
    I32_EQZ
    BR_IF 1
    LOCAL_GET I32 1
    LOCAL_GET I32 0
    I32_MUL
    LOCAL_SET I32 1
    LOCAL_GET I32 0
    I32_CONST 1
    I32_SUB
    LOCAL_SET I32 0
    BR 0
  END
END
LOCAL_GET I32 1
RETURN I32
";

#[test]
fn factorial_loop_lowers_through_default_registry() {
    let registry = build_default_registry();
    let library = registry.get("wasm").expect("wasm library");
    let report = translate_source(&library, UnitConfig::default(), FACTORIAL).expect("translate");
    assert!(!report.has_errors(), "{:?}", report.diagnostics());
    let rendered: Vec<String> = report.primitives().iter().map(ToString::to_string).collect();
    assert_eq!(rendered.first().map(String::as_str), Some("@L2:"));
    assert!(rendered.contains(&"ifne @L0".to_string()));
    assert!(rendered.contains(&"goto @L2".to_string()));
    assert_eq!(rendered.last().map(String::as_str), Some("ireturn"));
    let labels = report
        .primitives()
        .iter()
        .filter(|primitive| matches!(primitive, Primitive::Label(_)))
        .count();
    assert_eq!(labels, 3);
}

#[test]
fn libraries_are_built_once_and_shared() {
    let registry = build_default_registry();
    let first = registry.get("wasm32MVP").expect("wasm");
    let second = registry.get("WASM32").expect("alias");
    assert!(std::sync::Arc::ptr_eq(&first, &second));
}

#[test]
fn cli_text_listing_uses_file_stem_as_class() {
    let dir = unique_temp_dir("text");
    let path = write_source(&dir, "fact.wat", FACTORIAL);
    let output = run(&[path.to_str().expect("utf8 path")]);
    assert!(output.status.success(), "{}", stderr_text(&output));
    let stdout = stdout_text(&output);
    assert!(stdout.starts_with("; wasm32MVP -> fact\n"));
    assert!(stdout.contains("ireturn"));
}

#[test]
fn cli_json_listing_reports_call_sites() {
    let dir = unique_temp_dir("json");
    let path = write_source(&dir, "calls.wat", "I32_CONST 3\nCALL_INDIRECT 0 (I32)->I32\n");
    let output = run(&["--format", "json", path.to_str().expect("utf8 path")]);
    assert!(output.status.success(), "{}", stderr_text(&output));
    let value: serde_json::Value =
        serde_json::from_str(stdout_text(&output).trim()).expect("valid json");
    assert_eq!(value["schema"], "lowerforge-listing-v1");
    assert_eq!(value["class"], "calls");
    assert_eq!(value["call_sites"][0]["descriptor"], "(Ljava/lang/invoke/MethodHandle;)I");
}

#[test]
fn cli_unsupported_op_warns_and_werror_fails() {
    let dir = unique_temp_dir("warn");
    let path = write_source(&dir, "ops.asm", "LDC \"text\"\nICONST_1\n");
    let path = path.to_str().expect("utf8 path");

    let output = run(&["-L", "asm", path]);
    assert!(output.status.success());
    assert!(stderr_text(&output).contains("[lfe003]"));

    let output = run(&["-L", "asm", "-w", path]);
    assert!(output.status.success());
    assert!(!stderr_text(&output).contains("lfe003"));

    let output = run(&["-L", "asm", "--Werror", path]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn cli_stops_at_first_error_unless_keep_going() {
    let dir = unique_temp_dir("abort");
    let path = write_source(&dir, "bad.wat", "I32_FROB\nI32_ADD\nI32_BLAH\n");
    let path = path.to_str().expect("utf8 path");

    let output = run(&[path]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = stderr_text(&output);
    assert!(stderr.contains("I32_FROB"));
    assert!(stderr.contains("stopped"));
    assert!(!stderr.contains("I32_BLAH"));

    let output = run(&["--keep-going", path]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = stderr_text(&output);
    assert!(stderr.contains("I32_BLAH"));
    assert!(stdout_text(&output).contains("iadd"));
}

#[test]
fn cli_routes_diagnostics_to_file() {
    let dir = unique_temp_dir("errfile");
    let source = write_source(&dir, "open.wat", "BLOCK\n");
    let log = dir.join("diag.log");
    let output = run(&[
        "-E",
        log.to_str().expect("utf8 path"),
        source.to_str().expect("utf8 path"),
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_text(&output).is_empty());
    let logged = fs::read_to_string(&log).expect("diagnostics file");
    assert!(logged.contains("[lfe007]"));
}

#[test]
fn cli_lists_libraries_and_mnemonics() {
    let output = run(&["--list-libraries"]);
    assert!(output.status.success());
    let stdout = stdout_text(&output);
    for name in ["wasm32MVP", "wasi", "ASMTextOps", "extension"] {
        assert!(stdout.contains(name), "{name}");
    }

    let output = run(&["--list-mnemonics", "-L", "wasi"]);
    assert!(output.status.success());
    let stdout = stdout_text(&output);
    assert!(stdout.lines().any(|line| line == "STRING_STORE_C"));
    assert!(!stdout.lines().any(|line| line.starts_with("AUX_")));
}
