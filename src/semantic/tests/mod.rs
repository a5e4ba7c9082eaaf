//! Semantic-pass unit tests: evaluation fixpoint and branching

use crate::frontend::{Analyzer, DEFAULT_OPERATORS};
use crate::graph::{Graph, NodeId, NodeKind, Tag, TagSet};
use crate::semantic::{
    branch_compositions, branch_equalities, evaluate, evaluate_seeded, BranchError, EvalError,
    EvalLayer, EvalOutcome,
};
use crate::util::span::SourcePos;

fn analyze(source: &str) -> crate::frontend::Analysis {
    Analyzer::new().analyze("test.rcl", source).unwrap()
}

fn run(source: &str) -> (crate::frontend::Analysis, EvalOutcome) {
    let analysis = analyze(source);
    let outcome = evaluate(&analysis.graph, &DEFAULT_OPERATORS).unwrap();
    (analysis, outcome)
}

fn term_named(graph: &Graph, content: &str) -> NodeId {
    graph
        .ids()
        .find(|&id| graph.node(id).kind == NodeKind::Term && graph.node(id).content == content)
        .unwrap_or_else(|| panic!("no term '{}'", content))
}

mod evaluation {
    use super::*;

    #[test]
    fn independent_assignments_all_resolve_in_one_pass() {
        let (analysis, outcome) = run("k = 100\nx = 2\ny = 3\nb = 4\n");
        let graph = &analysis.graph;
        assert_eq!(graph.count(Tag::Line), 4);
        assert_eq!(graph.count(Tag::Equality), 4);
        assert!(outcome.stuck.is_empty());
        assert_eq!(outcome.passes, 2);
        for (name, expected) in [("k", 100), ("x", 2), ("y", 3), ("b", 4)] {
            let id = term_named(graph, name);
            assert_eq!(outcome.layer.value(id), Some(expected), "{}", name);
        }
    }

    #[test]
    fn chained_constraint_needs_an_extra_pass() {
        let (analysis, outcome) = run("x = 2\ny = x + 3\n");
        let graph = &analysis.graph;
        assert_eq!(outcome.layer.value(term_named(graph, "y")), Some(5));
        assert!(outcome.stuck.is_empty());
        // x resolves in pass one, the sum and y in pass two, pass three
        // derives nothing.
        assert_eq!(outcome.passes, 3);
    }

    #[test]
    fn unseeded_transfer_is_stuck_not_an_error() {
        let (analysis, outcome) = run("a -> b\n");
        // The two terms plus the transfer expression itself.
        assert_eq!(outcome.stuck.len(), 3);
        assert_eq!(outcome.passes, 1);
        assert!(outcome.layer.is_empty());
        let a = term_named(&analysis.graph, "a");
        assert!(outcome.stuck.contains(&a));
    }

    #[test]
    fn seeding_unblocks_a_forward_transfer() {
        let analysis = analyze("a -> b\n");
        let graph = &analysis.graph;
        let mut layer = EvalLayer::new();
        layer.seed(term_named(graph, "a"), 7);
        let outcome = evaluate_seeded(graph, &DEFAULT_OPERATORS, layer).unwrap();
        assert_eq!(outcome.layer.value(term_named(graph, "b")), Some(7));
        assert!(outcome.stuck.is_empty());
        assert_eq!(outcome.passes, 2);
    }

    #[test]
    fn backward_transfer_fires_right_to_left() {
        let (analysis, outcome) = run("a <- 9\n");
        let graph = &analysis.graph;
        assert_eq!(outcome.layer.value(term_named(graph, "a")), Some(9));
        assert!(outcome.stuck.is_empty());
    }

    #[test]
    fn unequal_known_sides_conflict() {
        let analysis = analyze("2 = 3\n");
        let err = evaluate(&analysis.graph, &DEFAULT_OPERATORS).unwrap_err();
        match err {
            EvalError::ConflictingEquality { left, right, .. } => {
                assert_eq!((left, right), (2, 3));
            }
            other => panic!("expected ConflictingEquality, got {:?}", other),
        }
    }

    #[test]
    fn repeated_identical_assignment_is_harmless() {
        let (analysis, outcome) = run("x = 2\nx = 2\n");
        let graph = &analysis.graph;
        assert_eq!(outcome.layer.value(term_named(graph, "x")), Some(2));
        assert!(outcome.stuck.is_empty());
    }

    #[test]
    fn valued_comparison_without_a_rule_is_fatal() {
        let analysis = analyze("x = 1\ny = 2\nx < y\n");
        let err = evaluate(&analysis.graph, &DEFAULT_OPERATORS).unwrap_err();
        match err {
            EvalError::UnsupportedOperator { content, .. } => assert_eq!(content, "<"),
            other => panic!("expected UnsupportedOperator, got {:?}", other),
        }
    }

    #[test]
    fn comparison_with_an_unknown_side_stays_stuck() {
        let (analysis, outcome) = run("x = 1\nx < y\n");
        let graph = &analysis.graph;
        assert_eq!(outcome.layer.value(term_named(graph, "x")), Some(1));
        let comparison = graph
            .ids()
            .find(|&id| graph.node(id).has(Tag::Expression) && graph.node(id).content.contains('<'))
            .unwrap();
        assert!(outcome.stuck.contains(&comparison));
        assert!(outcome.stuck.contains(&term_named(graph, "y")));
    }

    #[test]
    fn addition_overflow_is_fatal() {
        let analysis = analyze("k = 9223372036854775807 + 1\n");
        let err = evaluate(&analysis.graph, &DEFAULT_OPERATORS).unwrap_err();
        assert!(matches!(err, EvalError::ArithmeticOverflow { .. }));
    }

    #[test]
    fn multiplication_overflow_is_fatal() {
        let analysis = analyze("k = 4611686018427387904 * 4\n");
        let err = evaluate(&analysis.graph, &DEFAULT_OPERATORS).unwrap_err();
        assert!(matches!(err, EvalError::ArithmeticOverflow { .. }));
    }

    #[test]
    fn division_by_zero_is_fatal() {
        let analysis = analyze("k = 8 / 0\n");
        let err = evaluate(&analysis.graph, &DEFAULT_OPERATORS).unwrap_err();
        assert!(matches!(err, EvalError::DivisionByZero { .. }));
    }

    #[test]
    fn oversized_literal_is_fatal() {
        let analysis = analyze("k = 99999999999999999999\n");
        let err = evaluate(&analysis.graph, &DEFAULT_OPERATORS).unwrap_err();
        assert!(matches!(err, EvalError::BadNumericLiteral { .. }));
    }

    #[test]
    fn operator_outside_the_table_is_fatal() {
        let mut graph = Graph::new();
        let file = graph.intern_file("hand-built");
        let pos = |start| SourcePos::new(file, 1, start, start + 1);
        let a = graph.add("a", NodeKind::Term, TagSet::EMPTY, pos(1));
        let op = graph.add("?", NodeKind::Operator, TagSet::EMPTY, pos(3));
        let b = graph.add("b", NodeKind::Term, TagSet::EMPTY, pos(5));
        let expr = graph.add("a ? b", NodeKind::Composite, Tag::Expression.into(), pos(1));
        graph.link(expr, op);
        graph.link(expr, a);
        graph.link(expr, b);

        let err = evaluate(&graph, &DEFAULT_OPERATORS).unwrap_err();
        match err {
            EvalError::UnknownOperator { content, .. } => assert_eq!(content, "?"),
            other => panic!("expected UnknownOperator, got {:?}", other),
        }
    }

    #[test]
    fn conditionals_are_stuck_not_errors() {
        let (analysis, outcome) = run("r = if a < b then 1 else 2\n");
        let graph = &analysis.graph;
        // The literals resolve; everything hanging off the comparison does
        // not, since comparisons carry no evaluation rule.
        assert_eq!(outcome.layer.value(term_named(graph, "1")), Some(1));
        let r = term_named(graph, "r");
        assert!(outcome.stuck.contains(&r));
        assert!(evaluate(graph, &DEFAULT_OPERATORS).is_ok());
    }

    #[test]
    fn first_recorded_value_wins() {
        let mut layer = EvalLayer::new();
        layer.seed(NodeId(0), 1);
        layer.seed(NodeId(0), 2);
        assert_eq!(layer.value(NodeId(0)), Some(1));
        assert_eq!(layer.len(), 1);
    }
}

mod branching {
    use super::*;

    #[test]
    fn aggregation_spawns_a_producer_consumer_pair() {
        let (analysis, outcome) = run("s ∘+ t\n");
        let graph = &analysis.graph;
        let set = branch_compositions(graph, &outcome.layer).unwrap();
        assert_eq!(set.len(), 2);

        let producer = set.iter().next().unwrap();
        assert!(producer.label.contains("absorbs"));
        assert_eq!(producer.node, term_named(graph, "s"));
        assert_eq!(producer.forward.len(), 1);
        assert!(producer.backward.is_empty());

        let consumer = set.get(producer.forward[0]).unwrap();
        assert_eq!(consumer.node, term_named(graph, "t"));
        assert_eq!(consumer.backward.len(), 1);
    }

    #[test]
    fn graph_without_aggregations_spawns_nothing() {
        let (analysis, outcome) = run("x = 2\n");
        let set = branch_compositions(&analysis.graph, &outcome.layer).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn equality_enumeration_is_an_explicit_gap() {
        let (analysis, outcome) = run("x = 2\n");
        let err = branch_equalities(&analysis.graph, &outcome.layer).unwrap_err();
        assert!(matches!(
            err,
            BranchError::EqualityEnumerationUnimplemented { .. }
        ));
    }

    #[test]
    fn no_equalities_means_an_empty_set() {
        let (analysis, outcome) = run("s ∘+ t\n");
        let set = branch_equalities(&analysis.graph, &outcome.layer).unwrap();
        assert!(set.is_empty());
    }
}
