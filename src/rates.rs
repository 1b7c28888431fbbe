//! Base production rates behind an explicit cache. The cache has a TTL and a
//! last-known fallback so a failing configuration fetch degrades instead of
//! stopping production ticks.

use std::collections::BTreeMap;

use anyhow::Result;

use crate::catalog::{Catalog, StructureKind};
use crate::resources::ResourceSet;

pub type BaseRates = BTreeMap<StructureKind, ResourceSet>;

pub fn rates_from_catalog(catalog: &Catalog) -> BaseRates {
    catalog
        .structures
        .iter()
        .filter(|(_, def)| def.is_extractor())
        .map(|(kind, def)| (*kind, def.production))
        .collect()
}

/// Where base rates come from. The engine's default source is the catalog
/// itself; tests and remote-config deployments substitute their own.
pub trait RateSource: Send + Sync {
    fn fetch(&self) -> Result<BaseRates>;
}

pub struct CatalogSource {
    catalog: Catalog,
}

impl CatalogSource {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

impl RateSource for CatalogSource {
    fn fetch(&self) -> Result<BaseRates> {
        Ok(rates_from_catalog(&self.catalog))
    }
}

/// Explicitly constructed cache passed into the calculators; no hidden
/// module-level state.
pub struct RateCache {
    source: Box<dyn RateSource>,
    ttl_secs: i64,
    fetched_at: Option<i64>,
    cached: BaseRates,
    degraded: bool,
}

impl RateCache {
    pub fn new(source: Box<dyn RateSource>, ttl_secs: i64, fallback: BaseRates) -> Self {
        Self {
            source,
            ttl_secs,
            fetched_at: None,
            cached: fallback,
            degraded: false,
        }
    }

    pub fn from_catalog(catalog: &Catalog) -> Self {
        let fallback = rates_from_catalog(catalog);
        Self::new(
            Box::new(CatalogSource::new(catalog.clone())),
            catalog.rates_ttl_secs,
            fallback,
        )
    }

    /// Current rates, refetching when the TTL has lapsed. A failed fetch
    /// keeps the last-known rates, marks the cache degraded, and retries
    /// after the next TTL window rather than hammering the source.
    pub fn rates(&mut self, now_epoch: i64) -> &BaseRates {
        let stale = self
            .fetched_at
            .is_none_or(|at| now_epoch - at >= self.ttl_secs);
        if stale {
            match self.source.fetch() {
                Ok(rates) => {
                    self.cached = rates;
                    self.degraded = false;
                }
                Err(err) => {
                    tracing::warn!(%err, "rate fetch failed, serving last-known rates");
                    self.degraded = true;
                }
            }
            self.fetched_at = Some(now_epoch);
        }
        &self.cached
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct FailingSource;

    impl RateSource for FailingSource {
        fn fetch(&self) -> Result<BaseRates> {
            Err(anyhow!("config endpoint unavailable"))
        }
    }

    struct CountingSource {
        calls: Arc<AtomicU32>,
    }

    impl RateSource for CountingSource {
        fn fetch(&self) -> Result<BaseRates> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(BaseRates::new())
        }
    }

    #[test]
    fn catalog_source_exposes_extractor_rates_only() {
        let catalog = Catalog::builtin();
        let rates = rates_from_catalog(&catalog);
        assert_eq!(rates.get(&StructureKind::Farm).map(|r| r.food), Some(10.0));
        assert!(!rates.contains_key(&StructureKind::TownHall));
    }

    #[test]
    fn failed_fetch_degrades_but_keeps_fallback() {
        let fallback = rates_from_catalog(&Catalog::builtin());
        let mut cache = RateCache::new(Box::new(FailingSource), 60, fallback.clone());
        let rates = cache.rates(1000).clone();
        assert_eq!(rates, fallback);
        assert!(cache.is_degraded());
    }

    #[test]
    fn ttl_limits_fetch_frequency() {
        let calls = Arc::new(AtomicU32::new(0));
        let source = CountingSource {
            calls: calls.clone(),
        };
        let mut cache = RateCache::new(Box::new(source), 60, BaseRates::new());
        cache.rates(0);
        cache.rates(30);
        cache.rates(59);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        cache.rates(60);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn successful_fetch_clears_degraded_flag() {
        let fallback = BaseRates::new();
        let mut cache = RateCache::new(Box::new(FailingSource), 60, fallback);
        cache.rates(0);
        assert!(cache.is_degraded());
        cache.source = Box::new(CountingSource {
            calls: Arc::new(AtomicU32::new(0)),
        });
        cache.rates(60);
        assert!(!cache.is_degraded());
    }
}
