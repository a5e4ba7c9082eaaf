//! Graph substrate unit tests

use crate::graph::{closest, Direction, Graph, NodeId, NodeKind, Pulse, Tag, TagSet, Walk};
use crate::util::span::{FileId, SourcePos};

fn pos(line: u32, start: u32) -> SourcePos {
    SourcePos::new(FileId(0), line, start, start + 1)
}

fn term(graph: &mut Graph, content: &str, line: u32, start: u32) -> NodeId {
    graph.add(content, NodeKind::Term, TagSet::EMPTY, pos(line, start))
}

mod edges {
    use super::*;

    #[test]
    fn link_records_both_directions() {
        let mut g = Graph::new();
        let a = term(&mut g, "a", 1, 1);
        let b = term(&mut g, "b", 1, 3);
        g.link(a, b);
        assert_eq!(g.node(a).out().collect::<Vec<_>>(), vec![b]);
        assert_eq!(g.node(b).inc().collect::<Vec<_>>(), vec![a]);
        assert!(g.node(a).inc().next().is_none());
    }

    #[test]
    fn unlink_is_exact_inverse() {
        let mut g = Graph::new();
        let a = term(&mut g, "a", 1, 1);
        let b = term(&mut g, "b", 1, 3);
        g.link(a, b);
        g.unlink(a, b);
        assert!(g.node(a).out().next().is_none());
        assert!(g.node(b).inc().next().is_none());
    }

    #[test]
    fn self_link_is_ignored() {
        let mut g = Graph::new();
        let a = term(&mut g, "a", 1, 1);
        g.link(a, a);
        assert!(g.node(a).out().next().is_none());
    }

    #[test]
    fn remove_detaches_every_neighbor() {
        let mut g = Graph::new();
        let a = term(&mut g, "a", 1, 1);
        let b = term(&mut g, "b", 1, 3);
        let c = term(&mut g, "c", 1, 5);
        g.link(a, b);
        g.link(b, c);
        g.remove(b);
        assert!(!g.contains(b));
        assert!(g.node(a).out().next().is_none());
        assert!(g.node(c).inc().next().is_none());
        assert_eq!(g.len(), 2);
    }

    #[test]
    fn removed_slot_is_not_reused() {
        let mut g = Graph::new();
        let a = term(&mut g, "a", 1, 1);
        g.remove(a);
        let b = term(&mut g, "b", 1, 3);
        assert_ne!(a, b);
        assert!(g.get(a).is_none());
    }
}

mod traversal {
    use super::*;

    /// a → b → c → a plus a → d; a cycle must not loop the pulse.
    fn diamond() -> (Graph, NodeId, NodeId, NodeId, NodeId) {
        let mut g = Graph::new();
        let a = term(&mut g, "a", 1, 1);
        let b = term(&mut g, "b", 1, 3);
        let c = term(&mut g, "c", 2, 1);
        let d = term(&mut g, "d", 2, 3);
        g.link(a, b);
        g.link(b, c);
        g.link(c, a);
        g.link(a, d);
        (g, a, b, c, d)
    }

    #[test]
    fn pulse_visits_each_node_once_despite_cycle() {
        let (g, a, ..) = diamond();
        let mut seen = Vec::new();
        Pulse::default().run(&g, a, |n| {
            seen.push(n.id);
            Walk::Continue
        });
        assert_eq!(seen.len(), 4);
        let mut dedup = seen.clone();
        dedup.dedup();
        assert_eq!(seen, dedup);
    }

    #[test]
    fn pulse_order_is_source_position() {
        let (g, a, b, c, d) = diamond();
        let mut seen = Vec::new();
        Pulse::default().run(&g, a, |n| {
            seen.push(n.id);
            Walk::Continue
        });
        // Layer 1 is {b, c, d}; b at 1:3 precedes c at 2:1 precedes d at 2:3.
        assert_eq!(seen, vec![a, b, c, d]);
    }

    #[test]
    fn forward_pulse_ignores_back_edges() {
        let mut g = Graph::new();
        let a = term(&mut g, "a", 1, 1);
        let b = term(&mut g, "b", 1, 3);
        g.link(b, a);
        let mut seen = Vec::new();
        Pulse::forward().run(&g, a, |n| {
            seen.push(n.id);
            Walk::Continue
        });
        assert_eq!(seen, vec![a]);

        seen.clear();
        Pulse::backward().run(&g, a, |n| {
            seen.push(n.id);
            Walk::Continue
        });
        assert_eq!(seen, vec![a, b]);
    }

    #[test]
    fn filter_restricts_expansion() {
        let mut g = Graph::new();
        let a = term(&mut g, "a", 1, 1);
        let op = g.add("=", NodeKind::Operator, TagSet::EMPTY, pos(1, 3));
        let b = term(&mut g, "b", 1, 5);
        g.link(a, op);
        g.link(a, b);
        let mut seen = Vec::new();
        Pulse::default().filter(Tag::Term).run(&g, a, |n| {
            seen.push(n.id);
            Walk::Continue
        });
        assert_eq!(seen, vec![a, b]);
    }

    #[test]
    fn wall_blocks_crossing() {
        // a — line — b : a wall on Line must keep the pulse on a's side.
        let mut g = Graph::new();
        let line = g.add("a b", NodeKind::Line, TagSet::EMPTY, SourcePos::new(FileId(0), 1, 1, 4));
        let a = term(&mut g, "a", 1, 1);
        let b = term(&mut g, "b", 1, 3);
        g.link(line, a);
        g.link(line, b);
        let mut seen = Vec::new();
        Pulse::default().wall(Tag::Line).run(&g, a, |n| {
            seen.push(n.id);
            Walk::Continue
        });
        assert_eq!(seen, vec![a]);
    }

    #[test]
    fn visitor_can_stop_early() {
        let (g, a, b, ..) = diamond();
        let mut seen = Vec::new();
        Pulse::default().run(&g, a, |n| {
            seen.push(n.id);
            if n.id == b {
                Walk::Stop
            } else {
                Walk::Continue
            }
        });
        assert_eq!(seen, vec![a, b]);
    }

    #[test]
    fn closest_finds_first_tagged_node() {
        let mut g = Graph::new();
        let line = g.add("x = 2", NodeKind::Line, TagSet::EMPTY, SourcePos::new(FileId(0), 1, 1, 6));
        let x = term(&mut g, "x", 1, 1);
        let op = g.add("=", NodeKind::Operator, TagSet::EMPTY, pos(1, 3));
        g.link(line, x);
        g.link(line, op);
        assert_eq!(closest(&g, op, Tag::Line), Some(line));
        assert_eq!(closest(&g, op, Tag::Term), Some(x));
        assert_eq!(closest(&g, op, Tag::Operator), Some(op));
        assert_eq!(closest(&g, op, Tag::Entity), None);
    }

    #[test]
    fn direction_default_is_both() {
        assert_eq!(Direction::default(), Direction::Both);
    }
}
