//! Cycle detection over need edges.

use std::collections::HashMap;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Finds every cycle reachable in the graph.
///
/// Nodes are visited depth-first in the given order so results are
/// deterministic. Each back edge yields one cycle path, starting and ending
/// at the same node. Edges to nodes missing from `order` are ignored.
pub fn find_cycles<'a>(order: &[&'a str], edges: &HashMap<&'a str, Vec<&'a str>>) -> Vec<Vec<String>> {
    let mut marks: HashMap<&str, Mark> = order.iter().map(|node| (*node, Mark::Unvisited)).collect();
    let mut path = Vec::new();
    let mut cycles = Vec::new();

    for node in order {
        if marks.get(node) == Some(&Mark::Unvisited) {
            visit(*node, edges, &mut marks, &mut path, &mut cycles);
        }
    }

    cycles
}

fn visit<'a>(
    node: &'a str,
    edges: &HashMap<&'a str, Vec<&'a str>>,
    marks: &mut HashMap<&'a str, Mark>,
    path: &mut Vec<&'a str>,
    cycles: &mut Vec<Vec<String>>,
) {
    marks.insert(node, Mark::InProgress);
    path.push(node);

    for &dep in edges.get(node).into_iter().flatten() {
        let mark = marks.get(dep).copied();
        match mark {
            Some(Mark::Unvisited) => visit(dep, edges, marks, path, cycles),
            Some(Mark::InProgress) => {
                let start = path.iter().position(|n| *n == dep).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|n| (*n).to_string()).collect();
                cycle.push(dep.to_string());
                cycles.push(cycle);
            }
            Some(Mark::Done) | None => {}
        }
    }

    path.pop();
    marks.insert(node, Mark::Done);
}
