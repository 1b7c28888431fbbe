//! The engine wires the staggered scheduler to the calculators, the store,
//! and the event channel. Calculations are pure per settlement; only the
//! persistence step can fail, and one settlement's failure never blocks its
//! siblings in the same batch.

use anyhow::{anyhow, Result};
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::broadcast;

use crate::calc::{population, production};
use crate::catalog::{Catalog, ModifierKind};
use crate::disaster;
use crate::events::{EngineEvent, PopulationUpdate, ProductionUpdate, RepairReport};
use crate::modifiers;
use crate::rates::{BaseRates, RateCache};
use crate::scheduler::{TickScheduler, Trigger};
use crate::store::SettlementStore;
use crate::world::{SettlementId, WorldState};

pub struct EngineSettings {
    pub scenario_name: String,
    pub seed: u64,
}

pub struct Engine {
    catalog: Catalog,
    settings: EngineSettings,
    scheduler: TickScheduler,
    rates: RateCache,
    store: Box<dyn SettlementStore>,
    events: broadcast::Sender<EngineEvent>,
}

impl Engine {
    pub fn new(catalog: Catalog, settings: EngineSettings, store: Box<dyn SettlementStore>) -> Self {
        let rates = RateCache::from_catalog(&catalog);
        let (events, _) = broadcast::channel(512);
        Self {
            catalog,
            settings,
            scheduler: TickScheduler::new(),
            rates,
            store,
            events,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn scenario_name(&self) -> &str {
        &self.settings.scenario_name
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub fn event_sender(&self) -> broadcast::Sender<EngineEvent> {
        self.events.clone()
    }

    /// Evaluates the scheduler for one absolute second and runs whatever is
    /// due. Safe to call many times per second; refiring is guarded.
    pub fn step(&mut self, world: &mut WorldState, epoch_seconds: i64) -> Vec<Trigger> {
        let due = self.scheduler.due(epoch_seconds);
        for trigger in &due {
            match trigger {
                Trigger::Resource => self.run_resources(world, epoch_seconds),
                Trigger::Population => self.run_population(world, epoch_seconds),
                Trigger::Repair => self.run_repair(world, epoch_seconds),
                Trigger::Disaster => self.run_disasters(world, epoch_seconds),
            }
        }
        due
    }

    /// Steps through every second of a window. Used by tests and the
    /// offline runner; the realtime loop calls `step` from a timer instead.
    pub fn run_window(
        &mut self,
        world: &mut WorldState,
        start_second: i64,
        seconds: i64,
    ) -> Vec<(i64, Trigger)> {
        let mut fired = Vec::new();
        for second in start_second..start_second + seconds {
            for trigger in self.step(world, second) {
                fired.push((second, trigger));
            }
        }
        fired
    }

    fn timestamp(epoch_seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(epoch_seconds, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    fn run_resources(&mut self, world: &mut WorldState, second: i64) {
        let rates = self.rates.rates(second).clone();
        let degraded = self.rates.is_degraded();
        for id in world.settlement_ids() {
            if let Err(err) = self.produce_settlement(world, id, &rates, degraded) {
                tracing::warn!(
                    settlement = id.raw(),
                    %err,
                    "resource tick skipped settlement"
                );
            }
        }
    }

    fn produce_settlement(
        &mut self,
        world: &mut WorldState,
        id: SettlementId,
        rates: &BaseRates,
        degraded: bool,
    ) -> Result<()> {
        let settlement = world
            .settlement(id)
            .ok_or_else(|| anyhow!("settlement {} vanished mid-batch", id.raw()))?;
        let produced =
            production::settlement_production(settlement, &self.catalog, rates, world.tiles())?;
        let consumed = production::settlement_consumption(
            settlement.population.current,
            settlement.standing_count(),
            &self.catalog.consumption,
        );
        let net = produced.minus(&consumed);

        let mut updated = settlement.clone();
        let storage_bonus =
            modifiers::total(&updated.modifier_totals, ModifierKind::StorageCapacity);
        let waste = updated.storage.apply_net(&net, storage_bonus);

        // Persist before committing so a failed write leaves memory intact.
        self.store.save(&updated)?;
        if let Some(slot) = world.settlement_mut(id) {
            *slot = updated;
        }

        let _ = self.events.send(EngineEvent::Production(ProductionUpdate {
            settlement_id: id.raw(),
            production: produced,
            consumption: consumed,
            net,
            waste,
            degraded_rates: degraded,
        }));
        Ok(())
    }

    fn run_population(&mut self, world: &mut WorldState, second: i64) {
        let rates = self.rates.rates(second).clone();
        let now = Self::timestamp(second);
        for id in world.settlement_ids() {
            if let Err(err) = self.grow_settlement(world, id, &rates, now) {
                tracing::warn!(
                    settlement = id.raw(),
                    %err,
                    "population tick skipped settlement"
                );
            }
        }
    }

    fn grow_settlement(
        &mut self,
        world: &mut WorldState,
        id: SettlementId,
        rates: &BaseRates,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let settlement = world
            .settlement(id)
            .ok_or_else(|| anyhow!("settlement {} vanished mid-batch", id.raw()))?;
        let produced =
            production::settlement_production(settlement, &self.catalog, rates, world.tiles())?;
        let need = production::settlement_consumption(
            settlement.population.current,
            settlement.standing_count(),
            &self.catalog.consumption,
        );

        let happiness =
            population::happiness(&produced, &need, &settlement.modifier_totals);
        let capacity =
            population::capacity(&self.catalog.population, &settlement.modifier_totals);
        let growth = population::growth_rate(
            happiness,
            settlement.population.current,
            capacity,
            &self.catalog.population,
        );

        let mut updated = settlement.clone();
        updated.population.happiness = happiness;
        updated.population.current = population::apply_growth(updated.population.current, growth);
        updated.population.last_growth_at = Some(now);

        self.store.save(&updated)?;
        let current = updated.population.current;
        if let Some(slot) = world.settlement_mut(id) {
            *slot = updated;
        }

        let _ = self.events.send(EngineEvent::Population(PopulationUpdate {
            settlement_id: id.raw(),
            current,
            capacity,
            happiness,
            band: population::band(happiness),
            tier: population::tier(current),
            growth_rate: growth,
        }));
        Ok(())
    }

    fn run_repair(&mut self, world: &mut WorldState, second: i64) {
        let now = Self::timestamp(second);
        let amount = self.catalog.repair.passive_amount;
        for id in world.settlement_ids() {
            if let Err(err) = self.repair_settlement(world, id, amount, now) {
                tracing::warn!(
                    settlement = id.raw(),
                    %err,
                    "repair tick skipped settlement"
                );
            }
        }
    }

    fn repair_settlement(
        &mut self,
        world: &mut WorldState,
        id: SettlementId,
        amount: u8,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let settlement = world
            .settlement(id)
            .ok_or_else(|| anyhow!("settlement {} vanished mid-batch", id.raw()))?;
        let mut updated = settlement.clone();
        let mut repaired = 0u32;
        for structure in &mut updated.structures {
            // Passive repair tends damaged structures; destroyed ones need
            // an explicit repair action.
            if structure.is_damaged() && !structure.is_destroyed() {
                structure.apply_repair(amount, now);
                repaired += 1;
            }
        }
        if repaired == 0 {
            return Ok(());
        }

        updated.modifier_totals = modifiers::recompute(&updated, &self.catalog)?;
        self.store.save(&updated)?;
        if let Some(slot) = world.settlement_mut(id) {
            *slot = updated;
        }

        let _ = self.events.send(EngineEvent::Repair(RepairReport {
            settlement_id: id.raw(),
            structures_repaired: repaired,
        }));
        Ok(())
    }

    fn run_disasters(&mut self, world: &mut WorldState, second: i64) {
        let now = Self::timestamp(second);
        let seed = self.settings.seed;
        for id in world.settlement_ids() {
            if let Err(err) = self.strike_settlement(world, id, seed, second, now) {
                tracing::warn!(
                    settlement = id.raw(),
                    %err,
                    "disaster check skipped settlement"
                );
            }
        }
    }

    fn strike_settlement(
        &mut self,
        world: &mut WorldState,
        id: SettlementId,
        seed: u64,
        second: i64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let settlement = world
            .settlement(id)
            .ok_or_else(|| anyhow!("settlement {} vanished mid-batch", id.raw()))?;
        let mut updated = settlement.clone();
        let Some(report) = disaster::check(&mut updated, &self.catalog.disaster, seed, second, now)
        else {
            return Ok(());
        };

        updated.modifier_totals = modifiers::recompute(&updated, &self.catalog)?;
        self.store.save(&updated)?;
        if let Some(slot) = world.settlement_mut(id) {
            *slot = updated;
        }

        tracing::info!(
            settlement = report.settlement_id,
            structure = report.structure_id,
            damage = report.damage,
            "disaster struck"
        );
        let _ = self.events.send(EngineEvent::Disaster(report));
        Ok(())
    }
}
