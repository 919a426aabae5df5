//! Execution-DAG planning: reachability from the root, pruned at any edge
//! whose required evidence ports are not supplied (spec §4.3).

use std::collections::{HashSet, VecDeque};

use gov_core::{LinkId, NodeId};
use serde::{Deserialize, Serialize};

use crate::manifest::{Manifest, NodeKind};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub included_nodes: Vec<NodeId>,
    pub pruned_nodes: Vec<NodeId>,
    pub pruned_edges: Vec<String>,
}

/// `evidence_ports` is the set of evidence port keys the caller has
/// actually supplied (verified bundles present on disk); any link whose
/// `required_evidence_ports` names a port not in this set blocks
/// reachability through that edge, pruning everything only reachable that
/// way.
pub fn plan_execution_dag(manifest: &Manifest, evidence_ports: &HashSet<LinkId>) -> ExecutionPlan {
    let roots: Vec<&NodeId> = manifest
        .nodes
        .iter()
        .filter(|n| n.kind == NodeKind::RootPolicy || n.parent.is_none())
        .map(|n| &n.id)
        .collect();

    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut pruned_edges = Vec::new();
    let mut queue: VecDeque<NodeId> = roots.into_iter().cloned().collect();

    while let Some(current) = queue.pop_front() {
        if !visited.insert(current.clone()) {
            continue;
        }
        let Some(node) = manifest.node(&current) else { continue };
        for dep in &node.depends_on {
            let blocking_link = manifest
                .links
                .iter()
                .find(|l| l.from == current && &l.to == dep && !l.required_evidence_ports.is_empty());

            if let Some(link) = blocking_link {
                let missing: Vec<&LinkId> = link
                    .required_evidence_ports
                    .keys()
                    .filter(|port| !evidence_ports.contains(*port))
                    .collect();
                if !missing.is_empty() {
                    pruned_edges.push(format!(
                        "{}->{} missing evidence ports: {:?}",
                        current,
                        dep,
                        missing.iter().map(|p| p.to_string()).collect::<Vec<_>>()
                    ));
                    continue;
                }
            }
            if !visited.contains(dep) {
                queue.push_back(dep.clone());
            }
        }
    }

    let all_ids: HashSet<NodeId> = manifest.nodes.iter().map(|n| n.id.clone()).collect();
    let mut included: Vec<NodeId> = visited.into_iter().collect();
    included.sort();
    let mut pruned_nodes: Vec<NodeId> = all_ids.difference(&included.iter().cloned().collect()).cloned().collect();
    pruned_nodes.sort();

    ExecutionPlan { included_nodes: included, pruned_nodes, pruned_edges }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{Lint, Node, Provenance, RuneLink};
    use gov_core::{Hash32, Lane, Realm};
    use std::collections::BTreeMap;
    use std::collections::BTreeSet;

    fn node(id: &str, kind: NodeKind, deps: &[&str]) -> Node {
        Node {
            id: id.parse().unwrap(),
            kind,
            realm: Realm::Asgard,
            lane: Lane::Neutral,
            authority_level: 5,
            parent: None,
            depends_on: deps.iter().map(|d| d.parse().unwrap()).collect(),
            promotion_state: crate::manifest::PromotionState::Shadow,
        }
    }

    #[test]
    fn missing_evidence_port_prunes_downstream() {
        let root = node("root", NodeKind::RootPolicy, &["leaf"]);
        let leaf = node("leaf", NodeKind::Module, &[]);
        let link = RuneLink {
            id: "l1".parse().unwrap(),
            from: "root".parse().unwrap(),
            to: "leaf".parse().unwrap(),
            allowed_lanes: BTreeSet::new(),
            evidence_required: BTreeSet::new(),
            required_evidence_ports: BTreeMap::from([(
                "port1".parse().unwrap(),
                crate::manifest::EvidencePortSpec { port_name: "p".into(), expected_bundle_hash: None },
            )]),
        };
        let manifest = Manifest {
            schema_version: "1".into(),
            provenance: Provenance {
                manifest_hash: Hash32::from_trusted_hex("0".repeat(64)),
                source_commit: "c".into(),
                lint: Lint::default(),
            },
            nodes: vec![root, leaf],
            links: vec![link],
        };
        let plan = plan_execution_dag(&manifest, &HashSet::new());
        assert!(plan.included_nodes.contains(&"root".parse().unwrap()));
        assert!(!plan.included_nodes.contains(&"leaf".parse().unwrap()));
        assert_eq!(plan.pruned_edges.len(), 1);
    }
}
