//! End-to-end tests driving `Instance` the way a host embedding the
//! language would: run source, read back printed output and emitted
//! geometry.

use std::cell::RefCell;
use std::rc::Rc;

use modelgen::{Instance, PrintSink, Value};
use pretty_assertions::assert_eq;

/// A print sink that can be read back after the instance has taken
/// ownership of it, via a shared handle.
#[derive(Clone, Default)]
struct SharedCollector(Rc<RefCell<String>>);

impl PrintSink for SharedCollector {
    fn write_line(&mut self, line: &str) {
        self.0.borrow_mut().push_str(line);
        self.0.borrow_mut().push('\n');
    }
}

fn run_and_capture(source: &str) -> String {
    let mut instance = Instance::new();
    let sink = SharedCollector::default();
    instance.set_print_sink(sink.clone());
    instance.run_string(source, "main").unwrap();
    let out = sink.0.borrow().clone();
    out
}

// =============================================================================
// 1. §8 worked examples
// =============================================================================

#[test]
fn prints_arithmetic_with_correct_precedence() {
    assert_eq!(run_and_capture("print(1 + 2 * 3)"), "7\n");
}

#[test]
fn for_loop_over_range_prints_each_value() {
    assert_eq!(run_and_capture("for i in range(3): print(i)"), "0\n1\n2\n");
}

#[test]
fn proc_with_default_parameter_is_called_without_it() {
    let source = "proc add(a, b = 1): a + b\nprint(add(10))";
    assert_eq!(run_and_capture(source), "11\n");
}

#[test]
fn list_len_and_negative_index_together() {
    let source = "xs = [1, 2, 3]\nprint(len(xs), xs[-2])";
    assert_eq!(run_and_capture(source), "3 2\n");
}

#[test]
fn missing_map_key_reads_as_null_not_an_error() {
    let source = "m = {\"a\": 1}\nprint(m[\"a\"], m[\"missing\"])";
    assert_eq!(run_and_capture(source), "1 null\n");
}

#[test]
fn bodyless_proc_call_returns_null() {
    let source = "proc noop(x)\nprint(noop(5))";
    assert_eq!(run_and_capture(source), "null\n");
}

// =============================================================================
// 2. module caching
// =============================================================================

#[test]
fn importing_the_same_module_twice_returns_the_same_instance() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("shared.mg"), "value = 42").unwrap();

    let mut instance = Instance::new();
    instance.add_search_path(dir.path());

    let first = instance.import_module("shared").unwrap();
    let second = instance.import_module("shared").unwrap();

    match (first, second) {
        (Value::Module(a), Value::Module(b)) => assert!(Rc::ptr_eq(&a, &b)),
        other => panic!("expected two Module values, got {other:?}"),
    }
}

#[test]
fn importing_a_module_runs_its_top_level_only_once() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("counted.mg"), "count = 1").unwrap();

    let mut instance = Instance::new();
    instance.add_search_path(dir.path());
    instance.import_module("counted").unwrap();
    let second = instance.import_module("counted").unwrap();

    let Value::Module(m) = second else {
        panic!("expected a module");
    };
    assert_eq!(m.borrow().globals.get("count"), Some(&Value::Int(1)));
}

// =============================================================================
// 3. geometry emission
// =============================================================================

#[test]
fn emit_appends_coordinates_to_the_vertex_buffer() {
    let mut instance = Instance::new();
    instance.run_string("emit (1, 2, 3)\nemit (4, 5, 6)", "main").unwrap();
    assert_eq!(instance.vertex_buffer().data(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    assert_eq!(instance.vertex_buffer().vertex_count(), 2);
}

#[test]
fn emit_rejects_a_vertex_of_the_wrong_arity() {
    let mut instance = Instance::new();
    let result = instance.run_string("emit (1, 2)", "main");
    assert!(result.is_err());
}

// =============================================================================
// 4. diagnostic format (§6)
// =============================================================================

#[test]
fn parse_error_reports_module_filename_and_position() {
    let mut instance = Instance::new();
    let err = instance.run_string("x = (1 +", "broken").unwrap_err();
    assert_eq!(err.to_string(), "broken.mg:1:9: Error: expected an expression, found Eof");
}

#[test]
fn runtime_error_reports_module_filename_and_position() {
    let mut instance = Instance::new();
    let err = instance.run_string("x = 1\nprint(missing_name)", "broken").unwrap_err();
    assert_eq!(err.to_string(), "broken.mg:2:7: Error: name 'missing_name' is not defined");
}

#[test]
fn run_file_reports_the_actual_path_not_a_synthesized_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scene.mg");
    std::fs::write(&path, "print(missing_name)").unwrap();

    let mut instance = Instance::new();
    let err = instance.run_file(&path).unwrap_err();
    assert!(err.to_string().starts_with(&format!("{}:1:7: Error:", path.display())));
}

// =============================================================================
// 5. property-style checks (§8)
// =============================================================================

#[test]
fn truth_value_is_consistent_with_double_negation() {
    for (source, truthy) in [("0", false), ("1", true), ("\"\"", false), ("\"x\"", true), ("[]", false)] {
        let script = format!("print(bool({source}))");
        let expected = if truthy { "1\n" } else { "0\n" };
        assert_eq!(run_and_capture(&script), expected);
    }
}

#[test]
fn deep_copy_of_a_list_is_independent_of_the_original() {
    let source = "xs = [[1, 2]]\nys = deep_copy(xs)\nys[0][0] = 9\nprint(xs[0][0], ys[0][0])";
    assert_eq!(run_and_capture(source), "1 9\n");
}

#[test]
fn shallow_copy_shares_nested_containers() {
    let source = "xs = [[1, 2]]\nys = copy(xs)\nys[0][0] = 9\nprint(xs[0][0], ys[0][0])";
    assert_eq!(run_and_capture(source), "9 9\n");
}

#[test]
fn running_the_same_source_twice_yields_the_same_output() {
    let source = "for i in range(5): print(i * i)";
    assert_eq!(run_and_capture(source), run_and_capture(source));
}
