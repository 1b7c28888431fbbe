use serde::{Deserialize, Serialize};

/// The five tracked resource types.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Food,
    Water,
    Wood,
    Stone,
    Ore,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Food,
        ResourceKind::Water,
        ResourceKind::Wood,
        ResourceKind::Stone,
        ResourceKind::Ore,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ResourceKind::Food => "food",
            ResourceKind::Water => "water",
            ResourceKind::Wood => "wood",
            ResourceKind::Stone => "stone",
            ResourceKind::Ore => "ore",
        }
    }
}

/// One amount per resource type. Used for storage levels, capacities,
/// production rates, costs, and tile qualities alike.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceSet {
    pub food: f64,
    pub water: f64,
    pub wood: f64,
    pub stone: f64,
    pub ore: f64,
}

impl ResourceSet {
    pub fn uniform(value: f64) -> Self {
        Self {
            food: value,
            water: value,
            wood: value,
            stone: value,
            ore: value,
        }
    }

    pub fn get(&self, kind: ResourceKind) -> f64 {
        match kind {
            ResourceKind::Food => self.food,
            ResourceKind::Water => self.water,
            ResourceKind::Wood => self.wood,
            ResourceKind::Stone => self.stone,
            ResourceKind::Ore => self.ore,
        }
    }

    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut f64 {
        match kind {
            ResourceKind::Food => &mut self.food,
            ResourceKind::Water => &mut self.water,
            ResourceKind::Wood => &mut self.wood,
            ResourceKind::Stone => &mut self.stone,
            ResourceKind::Ore => &mut self.ore,
        }
    }

    pub fn set(&mut self, kind: ResourceKind, value: f64) {
        *self.get_mut(kind) = value;
    }

    pub fn add(&mut self, other: &ResourceSet) {
        for kind in ResourceKind::ALL {
            *self.get_mut(kind) += other.get(kind);
        }
    }

    pub fn sub(&mut self, other: &ResourceSet) {
        for kind in ResourceKind::ALL {
            *self.get_mut(kind) -= other.get(kind);
        }
    }

    pub fn minus(&self, other: &ResourceSet) -> ResourceSet {
        let mut out = *self;
        out.sub(other);
        out
    }

    pub fn is_zero(&self) -> bool {
        ResourceKind::ALL.iter().all(|&kind| self.get(kind) == 0.0)
    }

    pub fn clamp_non_negative(&mut self) {
        for kind in ResourceKind::ALL {
            let slot = self.get_mut(kind);
            *slot = slot.max(0.0);
        }
    }
}
