//! Weighted routing table for one topology variant.
//!
//! A model maps each outgoing port to a default weight plus a sparse
//! conditional table keyed by the incoming port. Lookup precedence:
//! U-turn (outgoing == incoming) is always 0, then the conditional
//! override, then the port default, then the model default.

use heapless::FnvIndexMap;
use log::warn;

use crate::graph::PortId;

/// Capacity of the per-model outgoing-port table. Power of two, sized
/// above the densest shape wiring (heptagon star: 56 entries).
const MAX_WEIGHTS: usize = 64;
/// Capacity of the per-port conditional table (power of two above
/// [`MAX_CONDITIONAL_WEIGHTS`](crate::config::MAX_CONDITIONAL_WEIGHTS)).
const CONDITIONAL_CAP: usize = 16;

/// Default weight plus sparse per-incoming-port overrides.
#[derive(Debug, Clone)]
pub struct Weight {
    w: u8,
    conditional: FnvIndexMap<PortId, u8, CONDITIONAL_CAP>,
}

impl Weight {
    pub fn new(w: u8) -> Self {
        Self {
            w,
            conditional: FnvIndexMap::new(),
        }
    }

    pub fn add(&mut self, incoming: PortId, w: u8) {
        if self.conditional.insert(incoming, w).is_err() {
            warn!("conditional weight table overflow");
        }
    }

    pub fn get(&self, incoming: Option<PortId>) -> u8 {
        incoming
            .and_then(|port| self.conditional.get(&port))
            .copied()
            .unwrap_or(self.w)
    }

    pub fn remove(&mut self, incoming: PortId) {
        let _ = self.conditional.remove(&incoming);
    }
}

/// A named routing variant over one topology graph.
#[derive(Debug, Clone)]
pub struct Model {
    pub id: u8,
    pub default_w: u8,
    /// Group mask intersections must match to serve as emit roots.
    pub emit_groups: u8,
    /// Maximum travel length; 0 falls back to the topology pixel count.
    max_length: u16,
    weights: FnvIndexMap<PortId, Weight, MAX_WEIGHTS>,
}

impl Model {
    pub fn new(id: u8, default_w: u8, emit_groups: u8) -> Self {
        Self::with_max_length(id, default_w, emit_groups, 0)
    }

    pub fn with_max_length(id: u8, default_w: u8, emit_groups: u8, max_length: u16) -> Self {
        Self {
            id,
            default_w,
            emit_groups,
            max_length,
            weights: FnvIndexMap::new(),
        }
    }

    /// Conditional weight for the (outgoing, incoming) pair, symmetric:
    /// the pair is registered in both directions.
    pub fn put_pair(&mut self, outgoing: PortId, incoming: PortId, weight: u8) {
        let default_w = self.default_w;
        self.entry(outgoing, default_w).add(incoming, weight);
        self.entry(incoming, default_w).add(outgoing, weight);
    }

    /// Default weight for one outgoing port.
    pub fn put_port(&mut self, outgoing: PortId, w: u8) {
        let _ = self.entry(outgoing, w);
    }

    /// Default weights for both of a connection's ports.
    pub fn put_ports(&mut self, from_port: PortId, to_port: PortId, w_from: u8, w_to: u8) {
        self.put_port(from_port, w_from);
        self.put_port(to_port, w_to);
    }

    /// Traversal weight for leaving through `outgoing` having entered
    /// through `incoming`.
    pub fn get(&self, outgoing: PortId, incoming: Option<PortId>) -> u8 {
        if incoming == Some(outgoing) {
            return 0;
        }
        match self.weights.get(&outgoing) {
            Some(weight) => weight.get(incoming),
            None => self.default_w,
        }
    }

    /// Maximum travel length, falling back to the installation size.
    pub fn max_length(&self, pixel_count: u16) -> u16 {
        if self.max_length > 0 {
            self.max_length
        } else {
            pixel_count
        }
    }

    /// Outgoing ports with explicit weight entries.
    pub fn weighted_ports(&self) -> impl Iterator<Item = PortId> + '_ {
        self.weights.keys().copied()
    }

    fn entry(&mut self, outgoing: PortId, default_w: u8) -> &mut Weight {
        if !self.weights.contains_key(&outgoing)
            && self.weights.insert(outgoing, Weight::new(default_w)).is_err()
        {
            warn!("model {} weight table overflow", self.id);
        }
        if self.weights.contains_key(&outgoing) {
            return self.weights.get_mut(&outgoing).expect("key was just checked");
        }
        // Table full: fall back to the first entry so callers still get
        // a stable reference.
        self.weights
            .values_mut()
            .next()
            .expect("weight table cannot be both full and empty")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uturn_is_always_zero() {
        let mut model = Model::new(0, 10, 1);
        model.put_port(3, 200);
        assert_eq!(model.get(3, Some(3)), 0);
    }

    #[test]
    fn missing_port_uses_model_default() {
        let model = Model::new(0, 10, 1);
        assert_eq!(model.get(7, None), 10);
        assert_eq!(model.get(7, Some(2)), 10);
    }

    #[test]
    fn port_default_overrides_model_default() {
        let mut model = Model::new(0, 10, 1);
        model.put_port(4, 30);
        assert_eq!(model.get(4, Some(1)), 30);
    }

    #[test]
    fn conditional_overrides_port_default() {
        let mut model = Model::new(0, 10, 1);
        model.put_pair(4, 9, 77);
        assert_eq!(model.get(4, Some(9)), 77);
        // Symmetric registration.
        assert_eq!(model.get(9, Some(4)), 77);
        // Other incoming ports see the default created by put_pair.
        assert_eq!(model.get(4, Some(1)), 10);
        assert_eq!(model.get(4, None), 10);
    }

    #[test]
    fn max_length_falls_back_to_pixel_count() {
        let model = Model::new(0, 10, 1);
        assert_eq!(model.max_length(919), 919);
        let fixed = Model::with_max_length(1, 10, 1, 602);
        assert_eq!(fixed.max_length(919), 602);
    }
}
