//! Logic chain construction: oracle chains when available, connected
//! components of the relation graph otherwise.

use crate::model::{LogicChain, ParagraphRelation, RelationType, Segment};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Sanitizes oracle-reported chains: unknown segment ids are dropped with a
/// warning, chains left empty disappear, and blank chain ids get sequential
/// ones so every surviving chain is addressable.
pub fn from_oracle(chains: Vec<LogicChain>, known_ids: &HashSet<String>) -> Vec<LogicChain> {
    let mut sanitized = Vec::with_capacity(chains.len());
    for mut chain in chains {
        let before = chain.segment_ids.len();
        chain.segment_ids.retain(|id| known_ids.contains(id));
        if chain.segment_ids.len() < before {
            warn!(
                chain = %chain.chain_id,
                dropped = before - chain.segment_ids.len(),
                "oracle chain referenced unknown segments"
            );
        }
        if chain.segment_ids.is_empty() {
            continue;
        }
        sanitized.push(chain);
    }
    for (index, chain) in sanitized.iter_mut().enumerate() {
        if chain.chain_id.is_empty() {
            chain.chain_id = format!("chain_{}", index + 1);
        }
    }
    sanitized
}

/// Rebuilds chains from the relation graph when the oracle is unavailable.
///
/// Chains are the weakly connected components of the graph, ignoring edge
/// direction and excluding `EXAMPLE` and `REFERENCE_BACK` edges, which
/// decorate an argument rather than carry it. Single-segment components are
/// not chains. Members are listed in segment order; the chain type is the
/// most frequent relation type among the component's edges.
pub fn fallback(segments: &[Segment], relations: &[ParagraphRelation]) -> Vec<LogicChain> {
    let index_of: HashMap<&str, usize> = segments
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.as_str(), i))
        .collect();

    let mut components = UnionFind::new(segments.len());
    for relation in relations {
        if !carries_argument(relation.relation_type) {
            continue;
        }
        if let (Some(&a), Some(&b)) = (
            index_of.get(relation.source_id.as_str()),
            index_of.get(relation.target_id.as_str()),
        ) {
            components.union(a, b);
        }
    }

    // Group members by root, keeping segment order within each component
    let mut members: HashMap<usize, Vec<usize>> = HashMap::new();
    for index in 0..segments.len() {
        members.entry(components.find(index)).or_default().push(index);
    }
    let mut component_list: Vec<Vec<usize>> = members
        .into_values()
        .filter(|m| m.len() >= 2)
        .collect();
    component_list.sort_by_key(|m| m[0]);

    component_list
        .into_iter()
        .enumerate()
        .map(|(n, indices)| {
            let in_component: HashSet<&str> =
                indices.iter().map(|&i| segments[i].id.as_str()).collect();
            let chain_type = dominant_type(relations, &in_component);
            let segment_ids: Vec<String> =
                indices.iter().map(|&i| segments[i].id.clone()).collect();
            LogicChain {
                chain_id: format!("chain_{}", n + 1),
                chain_type: chain_type.as_str().to_string(),
                segment_ids,
                description: format!("由段落关系推断的论证线索（{}个段落）", indices.len()),
            }
        })
        .collect()
}

fn carries_argument(relation_type: RelationType) -> bool {
    !matches!(
        relation_type,
        RelationType::Example | RelationType::ReferenceBack
    )
}

/// Most frequent relation type among edges internal to the component, ties
/// broken by first appearance in the relation list.
fn dominant_type(relations: &[ParagraphRelation], component: &HashSet<&str>) -> RelationType {
    let mut counts: Vec<(RelationType, usize)> = Vec::new();
    for relation in relations {
        if !carries_argument(relation.relation_type) {
            continue;
        }
        if !component.contains(relation.source_id.as_str())
            || !component.contains(relation.target_id.as_str())
        {
            continue;
        }
        match counts.iter_mut().find(|(t, _)| *t == relation.relation_type) {
            Some((_, count)) => *count += 1,
            None => counts.push((relation.relation_type, 1)),
        }
    }
    counts
        .into_iter()
        .max_by_key(|&(_, count)| count)
        .map(|(t, _)| t)
        .unwrap_or(RelationType::Unknown)
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Smaller root wins so components stay anchored to the earliest segment
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }
}
