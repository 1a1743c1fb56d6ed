//! Seeded property tests: compiled code agrees with the runtime matcher,
//! captures describe the candidate, slicing is unique, expansion without
//! captures is the identity, and the first matching pattern wins.

mod common;

use common::{
    capture_value, case_names, init_logging, node, pattern, run_compiled, run_compiled_cases, Names, TreeGen,
};
use nodematch::config::EngineConfig;
use nodematch::eval::{HostEvaluator, HostValue};
use nodematch::expand::expand;
use nodematch::matcher::Matcher;
use nodematch::pattern::{CaptureKind, Captures, Layout, Pattern};
use nodematch::syntax::parse_one;
use nodematch::Node;

const SEEDS: u64 = 200;
const CANDIDATES_PER_SEED: usize = 24;

fn runtime_verdict(patterns: &[Pattern], candidate: &Node) -> HostValue {
    let cases: Vec<Vec<Pattern>> = patterns.iter().map(|p| vec![p.clone()]).collect();
    runtime_case_verdict(&cases, candidate)
}

/// What the compiled code must return: the first case with a matching
/// alternative, its captures, and `null` or an empty list for names only a
/// sibling alternative binds.
fn runtime_case_verdict(cases: &[Vec<Pattern>], candidate: &Node) -> HostValue {
    let mut guards = HostEvaluator::new();
    let mut matcher = Matcher::new(&mut guards);
    let mut captures = Captures::new();
    for (i, alternatives) in cases.iter().enumerate() {
        if matcher.match_any(candidate, alternatives, &mut captures).unwrap().is_none() {
            continue;
        }
        let mut items = vec![HostValue::Int(i as i64)];
        for name in case_names(alternatives) {
            let value = match captures.get(&name) {
                Some(capture) => capture_value(capture),
                None => match alternatives.iter().find_map(|p| p.usage(&name)).map(|u| u.kind) {
                    Some(CaptureKind::Many) => HostValue::List(Default::default()),
                    _ => HostValue::Null,
                },
            };
            items.push(value);
        }
        return HostValue::Tuple(items);
    }
    HostValue::Unit
}

/// Groups `patterns` into cases of one or two alternatives.
fn group_cases(gen: &mut TreeGen, patterns: &[Pattern]) -> Vec<Vec<Pattern>> {
    let mut cases = Vec::new();
    let mut rest = patterns;
    while !rest.is_empty() {
        let take = if rest.len() >= 2 && gen.chance(0.5) { 2 } else { 1 };
        cases.push(rest[..take].to_vec());
        rest = &rest[take..];
    }
    cases
}

/// Patterns abstracted from random trees, plus the candidates to try them on.
fn corpus(gen: &mut TreeGen) -> (Vec<Pattern>, Vec<Node>) {
    let bases: Vec<Node> = (0..1 + gen.below(3)).map(|_| gen.tree(3)).collect();
    let patterns: Vec<Pattern> = bases
        .iter()
        .enumerate()
        .map(|(i, base)| {
            let mut names = Names::new(&format!("p{}", i));
            let pat = gen.abstract_pattern(base, &mut names, 0);
            Pattern::new(pat.clone()).unwrap_or_else(|e| panic!("generated `{}` is invalid: {}", pat, e))
        })
        .collect();

    let mut candidates = bases.clone();
    while candidates.len() < CANDIDATES_PER_SEED {
        let base = &bases[gen.below(bases.len())];
        let candidate = if gen.chance(0.6) {
            gen.mutate(base)
        } else {
            gen.tree(3)
        };
        candidates.push(candidate);
    }
    (patterns, candidates)
}

#[test]
fn compiled_code_agrees_with_the_runtime_matcher() {
    init_logging();
    let configs = [
        EngineConfig::default(),
        EngineConfig {
            always_cache: true,
            ..EngineConfig::default()
        },
    ];
    let mut matched = 0;
    let mut merged = 0;
    for seed in 0..SEEDS {
        let mut gen = TreeGen::new(seed);
        let (patterns, candidates) = corpus(&mut gen);
        let cases = if seed % 2 == 0 {
            patterns.iter().map(|p| vec![p.clone()]).collect()
        } else {
            group_cases(&mut gen, &patterns)
        };
        merged += cases.iter().filter(|c| c.len() > 1).count();
        for candidate in &candidates {
            let expected = runtime_case_verdict(&cases, candidate);
            if expected != HostValue::Unit {
                matched += 1;
            }
            for config in &configs {
                let actual = run_compiled_cases(&cases, candidate, config);
                assert_eq!(
                    actual,
                    expected,
                    "seed {}: cases {:?} on `{}` (always_cache = {})",
                    seed,
                    cases
                        .iter()
                        .map(|c| c.iter().map(|p| p.to_string()).collect::<Vec<_>>())
                        .collect::<Vec<_>>(),
                    candidate,
                    config.always_cache
                );
            }
        }
    }
    // the corpus always contains the trees the patterns came from
    assert!(matched as u64 >= SEEDS);
    assert!(merged > 0);
}

#[test]
fn captures_rebuild_the_candidate() {
    init_logging();
    for seed in 0..SEEDS {
        let mut gen = TreeGen::new(seed ^ 0x5eed);
        let (patterns, candidates) = corpus(&mut gen);
        let mut guards = HostEvaluator::new();
        let mut matcher = Matcher::new(&mut guards);
        for candidate in &candidates {
            let mut captures = Captures::new();
            let Some((i, _)) = matcher.match_any(candidate, &patterns, &mut captures).unwrap() else {
                continue;
            };
            let rebuilt = expand(patterns[i].node(), &captures).unwrap();
            assert_eq!(rebuilt, *candidate, "seed {}: `{}` via `{}`", seed, candidate, patterns[i]);
        }
    }
}

#[test]
fn variadic_slicing_is_unique_and_exact() {
    for leading in 0..4 {
        for trailing in 0..4 {
            let mut items: Vec<String> = (0..leading).map(|i| format!("l{}", i)).collect();
            items.push("$(... mid)".to_string());
            items.extend((0..trailing).map(|i| format!("t{}", i)));
            let pat = parse_one(&format!("(f {})", items.join(" "))).unwrap();
            let layout = Layout::of(pat.args().unwrap()).unwrap();

            for n in 0..leading + trailing {
                assert_eq!(layout.slice(n), None);
            }
            for n in leading + trailing..leading + trailing + 6 {
                let range = layout.slice(n).unwrap();
                assert_eq!(range.start, leading);
                assert_eq!(leading + range.len() + trailing, n);
            }
        }
    }
}

#[test]
fn expansion_without_captures_is_the_identity() {
    let empty = Captures::new();
    for seed in 0..SEEDS {
        let mut gen = TreeGen::new(seed.wrapping_mul(31));
        let template = gen.tree(4);
        let out = expand(&template, &empty).unwrap();
        assert!(out.eq_with_attrs(&template), "seed {}: `{}` became `{}`", seed, template, out);
    }
}

#[test]
fn first_matching_pattern_wins_on_both_paths() {
    let patterns = [pattern("(f $x $y)"), pattern("(f 1 $y)")];
    let candidate = node("(f 1 2)");
    let runtime = runtime_verdict(&patterns, &candidate);
    assert_eq!(
        runtime,
        HostValue::Tuple(vec![HostValue::Int(0), node("1").into(), node("2").into()])
    );
    assert_eq!(run_compiled(&patterns, &candidate, &EngineConfig::default()), runtime);

    let reversed = [pattern("(f 1 $y)"), pattern("(f $x $y)")];
    assert_eq!(
        run_compiled(&reversed, &candidate, &EngineConfig::default()),
        HostValue::Tuple(vec![HostValue::Int(0), node("2").into()])
    );
}
