//! Van equipment index: technician -> equipment carried on their van.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::models::{EquipmentType, Technician, TechnicianId, Van};

/// Equipment types available on one van.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EquipmentSet {
    types: FxHashSet<EquipmentType>,
}

impl EquipmentSet {
    pub fn from_van(van: &Van) -> Self {
        Self {
            types: van
                .equipment
                .iter()
                .map(|e| e.equipment_type.clone())
                .collect(),
        }
    }

    /// Whether this set provides one required equipment type.
    ///
    /// The model is only matched for categories that require it, and only
    /// when the requirement names one.
    pub fn satisfies(&self, required: &EquipmentType) -> bool {
        match &required.model {
            Some(_) if required.category.requires_model_match() => self.types.contains(required),
            _ => self.types.iter().any(|t| t.category == required.category),
        }
    }

    /// Superset check against a full requirement list.
    pub fn covers(&self, required: &[EquipmentType]) -> bool {
        required.iter().all(|r| self.satisfies(r))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Per-technician view of van equipment for one pass.
#[derive(Clone, Debug, Default)]
pub struct VanEquipmentIndex {
    by_technician: FxHashMap<TechnicianId, EquipmentSet>,
    empty: EquipmentSet,
}

impl VanEquipmentIndex {
    /// Build the index. Technicians without a van (or whose van is unknown)
    /// get an empty set.
    pub fn new(technicians: &[Technician], vans: &[Van]) -> Self {
        let vans_by_id: FxHashMap<&str, &Van> = vans.iter().map(|v| (v.id.as_str(), v)).collect();

        let by_technician = technicians
            .iter()
            .filter_map(|tech| {
                let van = vans_by_id.get(tech.van_id.as_deref()?)?;
                Some((tech.id.clone(), EquipmentSet::from_van(van)))
            })
            .collect();

        Self {
            by_technician,
            empty: EquipmentSet::default(),
        }
    }

    pub fn equipment_of(&self, technician_id: &str) -> &EquipmentSet {
        self.by_technician.get(technician_id).unwrap_or(&self.empty)
    }

    /// Technicians without a van are never candidates, even for jobs that
    /// need no equipment.
    pub fn has_van(&self, technician_id: &str) -> bool {
        self.by_technician.contains_key(technician_id)
    }
}
