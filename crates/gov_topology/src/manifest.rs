//! The YGGDRASIL manifest data model and its hash-lock lifecycle.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use gov_core::{EvidenceTag, GovError, GovResult, Hash32, Lane, LanePair, LinkId, NodeId, Realm};
use gov_io::atomic::write_canonical_file;
use gov_io::canon::hash_canonical;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    RootPolicy,
    Module,
    Rune,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionState {
    Shadow,
    Candidate,
    Promoted,
    Deprecated,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub realm: Realm,
    pub lane: Lane,
    pub authority_level: u8,
    pub parent: Option<NodeId>,
    #[serde(default)]
    pub depends_on: Vec<NodeId>,
    pub promotion_state: PromotionState,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvidencePortSpec {
    pub port_name: String,
    pub expected_bundle_hash: Option<Hash32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RuneLink {
    pub id: LinkId,
    pub from: NodeId,
    pub to: NodeId,
    pub allowed_lanes: BTreeSet<LanePair>,
    #[serde(default)]
    pub evidence_required: BTreeSet<EvidenceTag>,
    #[serde(default)]
    pub required_evidence_ports: BTreeMap<LinkId, EvidencePortSpec>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Lint {
    #[serde(default)]
    pub forbidden_crossings: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Provenance {
    pub manifest_hash: Hash32,
    pub source_commit: String,
    #[serde(default)]
    pub lint: Lint,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Manifest {
    pub schema_version: String,
    pub provenance: Provenance,
    pub nodes: Vec<Node>,
    pub links: Vec<RuneLink>,
}

/// Every field except `provenance.manifest_hash` participates in the hash
/// (the lint field is part of authored content, not the hash itself — only
/// `manifest_hash` is blanked, mirroring the `FileArtifact` rule in §3:
/// "a designated provenance subfield blanked").
#[derive(Serialize)]
struct ManifestForHash<'a> {
    schema_version: &'a str,
    source_commit: &'a str,
    lint: &'a Lint,
    nodes: &'a [Node],
    links: &'a [RuneLink],
}

impl Manifest {
    pub fn recompute_hash(&self) -> GovResult<Hash32> {
        let for_hash = ManifestForHash {
            schema_version: &self.schema_version,
            source_commit: &self.provenance.source_commit,
            lint: &self.provenance.lint,
            nodes: &self.nodes,
            links: &self.links,
        };
        hash_canonical(&for_hash).map_err(Into::into)
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }
}

/// Load and verify a manifest's hash lock (spec §4.3 `load`).
pub fn load(path: &Path) -> GovResult<Manifest> {
    let bytes = std::fs::read(path)
        .map_err(|e| GovError::ValidationError { subkind: "manifest_io".into(), detail: e.to_string() })?;
    let manifest: Manifest = serde_json::from_slice(&bytes)
        .map_err(|e| GovError::ValidationError { subkind: "manifest_parse".into(), detail: e.to_string() })?;

    let recomputed = manifest.recompute_hash()?;
    if recomputed.as_hex() != manifest.provenance.manifest_hash.as_hex() {
        return Err(GovError::ManifestHashMismatch {
            expected: manifest.provenance.manifest_hash.as_hex().to_string(),
            actual: recomputed.as_hex().to_string(),
        });
    }
    Ok(manifest)
}

/// Recompute `provenance.manifest_hash` after an authoring change and write
/// the manifest back atomically (CLI `evidence relock`, spec SPEC_FULL C3).
pub fn relock(path: &Path, mut manifest: Manifest) -> GovResult<Manifest> {
    let new_hash = manifest.recompute_hash()?;
    manifest.provenance.manifest_hash = new_hash;
    write_canonical_file(path, &manifest).map_err(GovError::from)?;
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_manifest() -> Manifest {
        Manifest {
            schema_version: "1".into(),
            provenance: Provenance {
                manifest_hash: Hash32::from_trusted_hex(
                    "0".repeat(64),
                ),
                source_commit: "deadbeef".into(),
                lint: Lint::default(),
            },
            nodes: vec![],
            links: vec![],
        }
    }

    #[test]
    fn relock_then_load_roundtrips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        let manifest = relock(&path, sample_manifest()).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(
            loaded.provenance.manifest_hash.as_hex(),
            manifest.provenance.manifest_hash.as_hex()
        );
    }

    #[test]
    fn tampered_hash_is_rejected_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        let manifest = relock(&path, sample_manifest()).unwrap();
        let mut bad = manifest.clone();
        bad.provenance.manifest_hash = Hash32::from_trusted_hex("1".repeat(64));
        let bytes = serde_json::to_vec(&bad).unwrap();
        std::fs::write(&path, bytes).unwrap();
        assert!(matches!(load(&path), Err(GovError::ManifestHashMismatch { .. })));
    }
}
