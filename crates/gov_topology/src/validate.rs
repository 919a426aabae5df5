//! The membrane validator: enforces the five manifest invariants of §3.

use std::collections::{HashMap, HashSet};

use gov_core::{EvidenceTag, GovResult, LanePair, NodeId};
use serde::{Deserialize, Serialize};

use crate::manifest::Manifest;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LintIssue {
    pub severity: Severity,
    pub code: String,
    pub detail: String,
    pub node: Option<NodeId>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LintReport {
    pub issues: Vec<LintIssue>,
    /// Edges pruned by the bridge-promotion mechanical enforcement
    /// (spec §4.3: "an enabled bridge ... is pruned and reported in
    /// `lint.forbidden_crossings`").
    pub forbidden_crossings: Vec<String>,
}

impl LintReport {
    pub fn is_ok(&self) -> bool {
        self.issues.iter().all(|i| i.severity != Severity::Error)
    }

    fn error(&mut self, code: &str, detail: String, node: Option<NodeId>) {
        self.issues.push(LintIssue { severity: Severity::Error, code: code.into(), detail, node });
    }
}

/// Validate `manifest` against the five invariants of §3. Does not consult
/// the filesystem — evidence bundle *existence* is checked at
/// `plan_execution_dag` time (§4.3), not here; this only checks the
/// manifest's own declared shape.
pub fn validate(manifest: &Manifest) -> GovResult<LintReport> {
    let mut report = LintReport::default();

    let recomputed = manifest.recompute_hash()?;
    if recomputed.as_hex() != manifest.provenance.manifest_hash.as_hex() {
        report.error(
            "manifest_hash_mismatch",
            format!(
                "expected {} got {}",
                manifest.provenance.manifest_hash.as_hex(),
                recomputed.as_hex()
            ),
            None,
        );
    }

    check_cross_realm_links(manifest, &mut report);
    check_shadow_forecast_bridges(manifest, &mut report);
    check_no_cycles(manifest, &mut report);
    check_authority_monotonic(manifest, &mut report);

    Ok(report)
}

fn check_cross_realm_links(manifest: &Manifest, report: &mut LintReport) {
    for node in &manifest.nodes {
        for dep in &node.depends_on {
            let Some(dep_node) = manifest.node(dep) else {
                report.error(
                    "dangling_dependency",
                    format!("{} depends_on unknown node {}", node.id, dep),
                    Some(node.id.clone()),
                );
                continue;
            };
            if node.realm == dep_node.realm {
                continue;
            }
            let pair = LanePair::new(node.lane, dep_node.lane);
            let has_link = manifest
                .links
                .iter()
                .any(|l| l.from == node.id && &l.to == dep && l.allowed_lanes.contains(&pair));
            if !has_link {
                let crossing = format!("{}->{} ({})", node.id, dep, pair);
                report.forbidden_crossings.push(crossing.clone());
                report.error(
                    "unauthorized_realm_crossing",
                    format!("cross-realm edge {crossing} has no matching RuneLink"),
                    Some(node.id.clone()),
                );
            }
        }
    }
}

fn check_shadow_forecast_bridges(manifest: &Manifest, report: &mut LintReport) {
    let bridge_tag: EvidenceTag = "EXPLICIT_SHADOW_FORECAST_BRIDGE".parse().expect("valid token");
    for link in &manifest.links {
        let Some(from_node) = manifest.node(&link.from) else { continue };
        let Some(to_node) = manifest.node(&link.to) else { continue };
        let pair = LanePair::new(from_node.lane, to_node.lane);
        if !pair.is_shadow_to_forecast() {
            continue;
        }
        let has_tag = link.evidence_required.contains(&bridge_tag);
        let has_ports = !link.required_evidence_ports.is_empty();
        if !has_tag || !has_ports {
            let crossing = format!("{}->{} (shadow->forecast)", link.from, link.to);
            report.forbidden_crossings.push(crossing.clone());
            report.error(
                "missing_shadow_forecast_bridge_evidence",
                format!(
                    "{crossing}: requires EXPLICIT_SHADOW_FORECAST_BRIDGE and non-empty required_evidence_ports"
                ),
                Some(link.from.clone()),
            );
        }
    }
}

fn check_no_cycles(manifest: &Manifest, report: &mut LintReport) {
    #[derive(PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }
    let by_id: HashMap<&NodeId, &crate::manifest::Node> =
        manifest.nodes.iter().map(|n| (&n.id, n)).collect();
    let mut marks: HashMap<&NodeId, Mark> = HashMap::new();

    fn visit<'a>(
        node: &'a NodeId,
        by_id: &HashMap<&'a NodeId, &'a crate::manifest::Node>,
        marks: &mut HashMap<&'a NodeId, Mark>,
        stack: &mut Vec<NodeId>,
        report: &mut LintReport,
    ) {
        if let Some(Mark::Done) = marks.get(node) {
            return;
        }
        if let Some(Mark::Visiting) = marks.get(node) {
            report.error(
                "dependency_cycle",
                format!("cycle detected involving {node}"),
                Some(node.clone()),
            );
            return;
        }
        marks.insert(node, Mark::Visiting);
        stack.push(node.clone());
        if let Some(n) = by_id.get(node) {
            for dep in &n.depends_on {
                visit(dep, by_id, marks, stack, report);
            }
        }
        stack.pop();
        marks.insert(node, Mark::Done);
    }

    let mut stack = Vec::new();
    let mut seen_cycle_roots: HashSet<&NodeId> = HashSet::new();
    for node in &manifest.nodes {
        if seen_cycle_roots.contains(&node.id) {
            continue;
        }
        visit(&node.id, &by_id, &mut marks, &mut stack, report);
        seen_cycle_roots.insert(&node.id);
    }
}

fn check_authority_monotonic(manifest: &Manifest, report: &mut LintReport) {
    for node in &manifest.nodes {
        let Some(parent_id) = &node.parent else { continue };
        let Some(parent) = manifest.node(parent_id) else {
            report.error(
                "dangling_parent",
                format!("{} has unknown parent {}", node.id, parent_id),
                Some(node.id.clone()),
            );
            continue;
        };
        if node.authority_level > parent.authority_level {
            report.error(
                "authority_not_monotonic",
                format!(
                    "{} (authority {}) exceeds parent {} (authority {})",
                    node.id, node.authority_level, parent_id, parent.authority_level
                ),
                Some(node.id.clone()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{Lint, Node, NodeKind, PromotionState, Provenance, RuneLink};
    use gov_core::{Hash32, Lane, Realm};
    use std::collections::{BTreeMap, BTreeSet};

    fn node(id: &str, realm: Realm, lane: Lane, parent: Option<&str>, authority: u8) -> Node {
        Node {
            id: id.parse().unwrap(),
            kind: NodeKind::Module,
            realm,
            lane,
            authority_level: authority,
            parent: parent.map(|p| p.parse().unwrap()),
            depends_on: vec![],
            promotion_state: PromotionState::Shadow,
        }
    }

    fn hashed(nodes: Vec<Node>, links: Vec<RuneLink>) -> Manifest {
        let mut m = Manifest {
            schema_version: "1".into(),
            provenance: Provenance {
                manifest_hash: Hash32::from_trusted_hex("0".repeat(64)),
                source_commit: "c".into(),
                lint: Lint::default(),
            },
            nodes,
            links,
        };
        m.provenance.manifest_hash = m.recompute_hash().unwrap();
        m
    }

    #[test]
    fn cross_realm_edge_without_link_is_flagged() {
        let mut a = node("a", Realm::Asgard, Lane::Forecast, None, 5);
        a.depends_on = vec!["b".parse().unwrap()];
        let b = node("b", Realm::Hel, Lane::Forecast, None, 5);
        let m = hashed(vec![a, b], vec![]);
        let report = validate(&m).unwrap();
        assert!(!report.is_ok());
        assert!(report.issues.iter().any(|i| i.code == "unauthorized_realm_crossing"));
    }

    #[test]
    fn shadow_to_forecast_without_bridge_tag_is_flagged() {
        let a = node("a", Realm::Asgard, Lane::Shadow, None, 5);
        let b = node("b", Realm::Asgard, Lane::Forecast, None, 5);
        let link = RuneLink {
            id: "lnk1".parse().unwrap(),
            from: "a".parse().unwrap(),
            to: "b".parse().unwrap(),
            allowed_lanes: BTreeSet::from([LanePair::new(Lane::Shadow, Lane::Forecast)]),
            evidence_required: BTreeSet::new(),
            required_evidence_ports: BTreeMap::new(),
        };
        let m = hashed(vec![a, b], vec![link]);
        let report = validate(&m).unwrap();
        assert!(report
            .issues
            .iter()
            .any(|i| i.code == "missing_shadow_forecast_bridge_evidence"));
    }

    #[test]
    fn authority_must_not_increase_toward_child() {
        let parent = node("root", Realm::Asgard, Lane::Neutral, None, 3);
        let child = node("child", Realm::Asgard, Lane::Neutral, Some("root"), 9);
        let m = hashed(vec![parent, child], vec![]);
        let report = validate(&m).unwrap();
        assert!(report.issues.iter().any(|i| i.code == "authority_not_monotonic"));
    }

    #[test]
    fn clean_manifest_has_no_errors() {
        let m = hashed(
            vec![node("a", Realm::Asgard, Lane::Neutral, None, 5)],
            vec![],
        );
        let report = validate(&m).unwrap();
        assert!(report.is_ok());
    }
}
