#![cfg(test)]

use crate::plugin_system::dependency::{parse_dependency_list, DependencyError, DependencyGraph};

fn deps(list: &str) -> Vec<String> {
    parse_dependency_list(list)
}

#[test]
fn test_parse_dependency_list() {
    assert_eq!(deps("settings, window"), vec!["settings", "window"]);
    assert_eq!(deps(" a ,, b ,"), vec!["a", "b"]);
    assert!(deps("").is_empty());
    assert!(deps(" , ").is_empty());
}

#[test]
fn test_graph_orders() {
    let mut graph = DependencyGraph::new();
    graph.add_node("a", &[]).unwrap();
    graph.add_node("b", &deps("a")).unwrap();
    graph.add_node("c", &deps("a,b")).unwrap();

    assert_eq!(graph.teardown_order().unwrap(), vec!["c", "b", "a"]);
    assert_eq!(graph.load_order().unwrap(), vec!["a", "b", "c"]);
    assert_eq!(graph.len(), 3);
}

#[test]
fn test_dependents_are_sorted_and_tracked() {
    let mut graph = DependencyGraph::new();
    graph.add_node("core", &[]).unwrap();
    graph.add_node("zeta", &deps("core")).unwrap();
    graph.add_node("alpha", &deps("core")).unwrap();

    assert_eq!(graph.dependents_of("core"), vec!["alpha", "zeta"]);
    assert!(graph.has_dependents("core"));
    assert_eq!(graph.dependencies_of("zeta"), &["core".to_string()]);

    graph.remove_node("alpha");
    graph.remove_node("zeta");
    assert!(!graph.has_dependents("core"));
    assert!(graph.dependents_of("core").is_empty());
    assert!(graph.contains("core"));
    assert!(!graph.contains("alpha"));
}

#[test]
fn test_self_dependency_is_rejected() {
    let mut graph = DependencyGraph::new();
    let err = graph.add_node("a", &deps("a")).unwrap_err();
    assert_eq!(err, DependencyError::SelfDependency("a".to_string()));
    assert!(graph.is_empty());
}

#[test]
fn test_cycle_is_reported() {
    let mut graph = DependencyGraph::new();
    graph.add_node("a", &deps("b")).unwrap();
    graph.add_node("b", &deps("a")).unwrap();
    graph.add_node("c", &[]).unwrap();

    match graph.teardown_order() {
        Err(DependencyError::CyclicDependency(nodes)) => assert_eq!(nodes, vec!["a", "b"]),
        other => panic!("Expected a cycle, got {:?}", other),
    }
}

#[test]
fn test_readding_node_replaces_edges() {
    let mut graph = DependencyGraph::new();
    graph.add_node("a", &[]).unwrap();
    graph.add_node("x", &[]).unwrap();
    graph.add_node("b", &deps("a")).unwrap();
    graph.add_node("b", &deps("x")).unwrap();

    assert!(graph.dependents_of("a").is_empty());
    assert_eq!(graph.dependents_of("x"), vec!["b"]);
}
