//! Model deduplication with enum precedence.

use std::collections::HashMap;

use tracing::debug;

use super::types::IrModelDef;

/// One model per name, in first-appearance order. When a name has several
/// entries the first enum among them wins, otherwise the first entry.
pub fn dedup_models(models: &[IrModelDef]) -> Vec<IrModelDef> {
    let mut order: Vec<&str> = Vec::new();
    let mut winners: HashMap<&str, &IrModelDef> = HashMap::new();

    for model in models {
        match winners.get(model.name.as_str()) {
            None => {
                order.push(&model.name);
                winners.insert(&model.name, model);
            }
            Some(current) if !current.schema.is_enum() && model.schema.is_enum() => {
                debug!(name = %model.name, "Enum definition replaces duplicate model");
                winners.insert(&model.name, model);
            }
            Some(_) => {}
        }
    }

    order
        .into_iter()
        .filter_map(|name| winners.get(name).map(|m| (*m).clone()))
        .collect()
}
