//! Instrument Mapping
//!
//! Lookup from market id (and symbol) to the latest `InstrumentDefinition`
//! observed on any connection. Written by the dispatcher, read by anything
//! that needs symbol resolution. The last definition received for a market id
//! wins.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::domain::envelope::InstrumentDefinition;

#[derive(Debug, Default)]
struct Maps {
    by_market_id: HashMap<i64, Arc<InstrumentDefinition>>,
    by_symbol: HashMap<String, i64>,
}

/// Concurrent instrument lookup shared across connections.
#[derive(Debug, Default)]
pub struct InstrumentMapping {
    maps: RwLock<Maps>,
}

impl InstrumentMapping {
    /// Create an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the definition for its market id.
    pub fn upsert(&self, definition: InstrumentDefinition) {
        let mut maps = self.maps.write();
        let market_id = definition.market_id;

        let stale = maps
            .by_market_id
            .get(&market_id)
            .filter(|previous| previous.symbol != definition.symbol)
            .map(|previous| previous.symbol.clone());
        if let Some(stale) = stale {
            maps.by_symbol.remove(&stale);
        }

        if !definition.symbol.is_empty() {
            maps.by_symbol.insert(definition.symbol.clone(), market_id);
        }
        maps.by_market_id.insert(market_id, Arc::new(definition));
    }

    /// Definition for a market id.
    #[must_use]
    pub fn get(&self, market_id: i64) -> Option<Arc<InstrumentDefinition>> {
        self.maps.read().by_market_id.get(&market_id).cloned()
    }

    /// Definition for a symbol.
    #[must_use]
    pub fn by_symbol(&self, symbol: &str) -> Option<Arc<InstrumentDefinition>> {
        let maps = self.maps.read();
        let market_id = maps.by_symbol.get(symbol)?;
        maps.by_market_id.get(market_id).cloned()
    }

    /// Symbol for a market id.
    #[must_use]
    pub fn symbol_for(&self, market_id: i64) -> Option<String> {
        self.maps
            .read()
            .by_market_id
            .get(&market_id)
            .map(|definition| definition.symbol.clone())
    }

    /// Market id for a symbol.
    #[must_use]
    pub fn market_id_for(&self, symbol: &str) -> Option<i64> {
        self.maps.read().by_symbol.get(symbol).copied()
    }

    /// Number of known instruments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.maps.read().by_market_id.len()
    }

    /// Whether no instruments are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.maps.read().by_market_id.is_empty()
    }
}
