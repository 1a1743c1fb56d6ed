//! Macro processor contract: dispatch, splicing, tracing, hygiene and
//! error containment, driven through the s-expression surface.

mod common;

use common::{init_logging, node};
use nodematch::config::EngineConfig;
use nodematch::diagnostics::{ErrorKind, Severity};
use nodematch::macros::{MacroFn, MacroProcessor, MacroProvenance, MacroRegistry};
use nodematch::namer::Namer;
use nodematch::syntax::parse;

fn expand_with(mp: &mut MacroProcessor, src: &str) -> Vec<String> {
    init_logging();
    mp.process(&parse(src).unwrap()).iter().map(|n| n.to_string()).collect()
}

fn expand(src: &str) -> (Vec<String>, MacroProcessor) {
    let mut mp = MacroProcessor::default();
    let out = expand_with(&mut mp, src);
    (out, mp)
}

#[test]
fn defined_macros_expand_at_every_depth() {
    let (out, mp) = expand("(define (double $x) (+ $x $x)) (f (g (double 2)) (double (double 1)))");
    assert_eq!(out, ["(f (g (+ 2 2)) (+ (+ 1 1) (+ 1 1)))"]);
    assert!(mp.diagnostics().is_empty());
}

#[test]
fn later_rules_for_the_same_call_shape_are_fallbacks() {
    let (out, _) = expand("(define (kind 0) zero) (define (kind $n) nonzero) (kind 0) (kind 5)");
    assert_eq!(out, ["zero", "nonzero"]);
}

#[test]
fn define_guards_select_rules() {
    let (out, _) = expand(
        "(define (describe $(&& x (. # IsId))) ident)
         (define (describe $x) other)
         (describe a) (describe (a))",
    );
    assert_eq!(out, ["ident", "other"]);
}

#[test]
fn unique_names_differ_between_expansions_but_agree_within_one() {
    let (out, _) = expand("(define (swap $a $b) ({} (= t_unique# $a) (= $a $b) (= $b t_unique#))) (swap x y) (swap p q)");
    assert_eq!(out.len(), 6);
    assert_eq!(node(&out[0]).arg(0), node(&out[2]).arg(1));
    assert_ne!(node(&out[0]).arg(0), node(&out[3]).arg(0));
}

#[test]
fn trace_records_every_step_with_provenance() {
    let (_, mp) = expand("(define (one) 1) (replace (=> (two) (+ (one) (one))) (two))");
    let steps: Vec<(&str, MacroProvenance)> = mp
        .trace()
        .iter()
        .map(|s| (&*s.macro_name, s.provenance))
        .collect();
    assert_eq!(
        steps,
        [
            ("define", MacroProvenance::Core),
            ("replace", MacroProvenance::Core),
            ("one", MacroProvenance::User),
            ("one", MacroProvenance::User),
        ]
    );
}

#[test]
fn errors_are_contained_to_one_call() {
    let (out, mp) = expand("(define (ok $x) $x) (ok 1) (replace (=> [public] (f) g) (f)) (ok 2)");
    assert_eq!(out[0], "1");
    assert!(out[1].starts_with("(replace"));
    assert_eq!(out[2], "2");
    let records = mp.diagnostics().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].severity, Severity::Error);
    assert_eq!(records[0].kind, Some(ErrorKind::MalformedPattern));
    assert!(records[0].span.is_some());
}

#[test]
fn scalar_splice_is_reported() {
    let (_, mp) = expand("(define (first $(... xs)) $xs) (first 1 2)");
    let errors: Vec<_> = mp.diagnostics().errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, Some(ErrorKind::ScalarSplice));
}

#[test]
fn macro_depth_budget_comes_from_the_config() {
    let config = EngineConfig {
        max_macro_depth: 3,
        ..EngineConfig::default()
    };
    let mut mp = MacroProcessor::new(config);
    expand_with(&mut mp, "(define (grow $x) (grow (s $x))) (grow 0)");
    let errors: Vec<_> = mp.diagnostics().errors().collect();
    assert_eq!(errors[0].kind, Some(ErrorKind::RecursionLimit));
    assert_eq!(mp.trace().len(), 4);
}

#[test]
fn native_macros_can_be_registered() {
    let upper: MacroFn = |node, _ctx| {
        Ok(node
            .arg(0)
            .and_then(|a| a.name())
            .map(|name| nodematch::Node::id(name.to_uppercase())))
    };
    let mut registry = MacroRegistry::with_builtins();
    registry.register("upper", Some(1), upper);
    let mut mp = MacroProcessor::with_parts(registry, Namer::new(), EngineConfig::default());
    let out = expand_with(&mut mp, "(upper abc) (upper 1) (upper a b)");
    assert_eq!(out, ["ABC", "(upper 1)", "(upper a b)"]);
}

#[test]
fn static_match_code_and_unroll_compose() {
    let (out, _) = expand(
        "(unroll (in OP (tuple + -))
           [static] (matchCode (OP 1 2)
             (case (+ $a $b)) (plus $a $b)
             (case (- $a $b)) (minus $a $b)))",
    );
    assert_eq!(out, ["(plus 1 2)", "(minus 1 2)"]);
}
