use std::collections::BTreeMap;

use crate::ast::ExprId;

/// Hop distance for every resolved variable occurrence.
///
/// Keyed by the node that reads or writes the variable (`Variable`,
/// `Assign`, `This`, `Super`). The evaluator walks exactly that many
/// environments outward instead of searching by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingTable {
    distances: BTreeMap<ExprId, usize>,
}

impl BindingTable {
    pub(crate) fn record(&mut self, expr: ExprId, distance: usize) {
        self.distances.insert(expr, distance);
    }

    pub fn get(&self, expr: ExprId) -> Option<usize> {
        self.distances.get(&expr).copied()
    }

    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    /// Entries in node allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (ExprId, usize)> + '_ {
        self.distances.iter().map(|(id, distance)| (*id, *distance))
    }
}
