//! Reachability pruning of the model registry.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use super::api::Ir;
use super::types::IrModelDef;

/// Result of a reachability walk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reachability {
    /// Names reached from the operations that exist in the registry.
    pub reachable: HashSet<String>,
    /// Names referenced somewhere along the walk but not registered.
    pub unresolved: BTreeSet<String>,
}

/// Walk `Ref` edges from every operation schema through `models`.
pub fn reachable_models(ir: &Ir, models: &[IrModelDef]) -> Reachability {
    // First registration wins the lookup; duplicates share a name anyway.
    let mut by_name: HashMap<&str, Vec<&IrModelDef>> = HashMap::new();
    for model in models {
        by_name.entry(model.name.as_str()).or_default().push(model);
    }

    let mut pending: Vec<&str> = Vec::new();
    for op in ir.operations() {
        for schema in op.schemas() {
            schema.collect_refs(&mut pending);
        }
    }

    let mut result = Reachability::default();
    while let Some(name) = pending.pop() {
        if result.reachable.contains(name) || result.unresolved.contains(name) {
            continue;
        }
        let Some(defs) = by_name.get(name) else {
            result.unresolved.insert(name.to_string());
            continue;
        };
        result.reachable.insert(name.to_string());
        for def in defs {
            def.schema.collect_refs(&mut pending);
        }
    }

    result
}

/// Derive an IR whose models are exactly those reachable from its operations.
/// Model order is preserved.
pub fn prune(ir: &Ir) -> (Ir, Reachability) {
    let reach = reachable_models(ir, &ir.model_defs);
    let model_defs: Vec<IrModelDef> = ir
        .model_defs
        .iter()
        .filter(|m| reach.reachable.contains(&m.name))
        .cloned()
        .collect();

    debug!(
        before = ir.model_defs.len(),
        after = model_defs.len(),
        unresolved = reach.unresolved.len(),
        "Pruned unreachable models"
    );

    let pruned = Ir {
        services: ir.services.clone(),
        model_defs,
        security_schemes: ir.security_schemes.clone(),
    };
    (pruned, reach)
}
