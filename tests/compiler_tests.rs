//! Compiled `matchCode` output, run through the host evaluator.

mod common;

use common::{init_logging, node};
use nodematch::eval::{HostEvaluator, HostValue};
use nodematch::macros::MacroProcessor;
use nodematch::Node;

/// Expands one `matchCode` call and returns the generated block.
fn compile(src: &str) -> Node {
    init_logging();
    let mut mp = MacroProcessor::default();
    let out = mp.process(&[node(src)]);
    assert!(!mp.diagnostics().has_errors(), "{:?}", mp.diagnostics().records());
    assert_eq!(out.len(), 1);
    out[0].clone()
}

fn run(code: &Node, subject: &str) -> HostValue {
    let mut ev = HostEvaluator::new();
    ev.set("s", node(subject));
    ev.eval(code).unwrap_or_else(|e| panic!("`{}` failed: {}", code, e))
}

fn tuple(items: &[&str]) -> HostValue {
    HostValue::Tuple(items.iter().map(|s| HostValue::Node(node(s))).collect())
}

#[test]
fn cases_are_tried_in_order_with_a_default() {
    let code = compile(
        "(matchCode s
           (case (+ $a $b)) (quote add)
           (case (- $a $b)) (quote sub)
           (default) (quote other))",
    );
    assert_eq!(run(&code, "(+ 1 2)"), HostValue::Node(node("add")));
    assert_eq!(run(&code, "(- 1 2)"), HostValue::Node(node("sub")));
    assert_eq!(run(&code, "(* 1 2)"), HostValue::Node(node("other")));
}

#[test]
fn arrow_cases_bind_leading_variadic_and_trailing_arguments() {
    let code = compile("(matchCode s (=> (f $first $(... rest) $last) (tuple first last)) (=> (f) (quote empty)))");
    assert_eq!(run(&code, "(f 1 2 3 4)"), tuple(&["1", "4"]));
    assert_eq!(run(&code, "(f)"), HostValue::Node(node("empty")));
    assert_eq!(run(&code, "(f 1)"), HostValue::Unit);

    let code = compile("(matchCode s (=> (f $first $(... rest) $last) rest))");
    assert_eq!(
        run(&code, "(f 1 2 3 4)"),
        HostValue::List([node("2"), node("3")].into_iter().collect())
    );
}

#[test]
fn guards_see_the_capture_and_fall_through_when_false() {
    let code = compile(
        "(matchCode s
           (case (f $(&& x (. # IsId)))) (quote id)
           (case (f $x)) (quote other))",
    );
    assert_eq!(run(&code, "(f a)"), HostValue::Node(node("id")));
    assert_eq!(run(&code, "(f 1)"), HostValue::Node(node("other")));
}

#[test]
fn names_bound_by_some_alternatives_start_out_null() {
    let code = compile("(matchCode s (case (f $x $y) (g $x)) (tuple x y))");
    assert_eq!(run(&code, "(f 1 2)"), tuple(&["1", "2"]));
    assert_eq!(
        run(&code, "(g 1)"),
        HostValue::Tuple(vec![HostValue::Node(node("1")), HostValue::Null])
    );
}

#[test]
fn a_failed_alternative_leaves_no_value_behind() {
    let code = compile("(matchCode s (case (f $x 1) (f $y 2)) (tuple x y))");
    assert_eq!(
        run(&code, "(f 5 2)"),
        HostValue::Tuple(vec![HostValue::Null, HostValue::Node(node("5"))])
    );
    assert_eq!(
        run(&code, "(f 5 1)"),
        HostValue::Tuple(vec![HostValue::Node(node("5")), HostValue::Null])
    );
}

#[test]
fn a_subject_sharing_a_capture_name_is_not_clobbered() {
    let code = compile("(matchCode s (case (f $s)) (tuple s) (case (g $t)) (tuple t))");
    assert_eq!(run(&code, "(f 1)"), tuple(&["1"]));
    let code = compile("(matchCode s (case (f $s 9)) (quote nine) (case (f $t 1)) (tuple t))");
    assert_eq!(run(&code, "(f (g 2) 1)"), tuple(&["(g 2)"]));
}

#[test]
fn ref_captures_assign_an_existing_variable() {
    let code = compile("(matchCode s (case (f $[ref] out)) (quote done))");
    let mut ev = HostEvaluator::new();
    ev.set("s", node("(f 42)"));
    ev.set("out", HostValue::Null);
    assert_eq!(ev.eval(&code).unwrap(), HostValue::Node(node("done")));
    assert_eq!(ev.get("out"), Some(&HostValue::Node(node("42"))));
}

#[test]
fn expression_subjects_are_evaluated_once_into_a_temporary() {
    let code = compile("(matchCode (quote (f 1 2)) (case (f $a $b)) (tuple a b))");
    let text = code.to_string();
    assert!(text.starts_with("({} (#var LNode (= tmp_"), "{}", text);
    assert_eq!(HostEvaluator::new().eval(&code).unwrap(), tuple(&["1", "2"]));
}

#[test]
fn a_block_of_cases_is_accepted_as_one_argument() {
    let code = compile("(matchCode s ({} (case foo FOO) (quote hit)))");
    assert_eq!(run(&code, "foo"), HostValue::Node(node("hit")));
    assert_eq!(run(&code, "FOO"), HostValue::Node(node("hit")));
    assert_eq!(run(&code, "bar"), HostValue::Unit);
}
