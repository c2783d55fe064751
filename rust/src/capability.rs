//! Capability resolver: (service, vehicle) -> required equipment.
//!
//! A pure lookup over the requirement table. A miss is an explicit
//! [`UnknownRequirement`], never "no equipment needed".

use rustc_hash::FxHashMap;

use crate::error::UnknownRequirement;
use crate::models::{EquipmentRequirement, EquipmentType, ServiceCategory, VehicleKey};

/// Indexed equipment-requirement table.
#[derive(Clone, Debug, Default)]
pub struct CapabilityResolver {
    table: FxHashMap<(ServiceCategory, VehicleKey), Vec<EquipmentType>>,
}

impl CapabilityResolver {
    /// Build the index. Duplicate rows for one key are unioned.
    pub fn new(requirements: &[EquipmentRequirement]) -> Self {
        let mut table: FxHashMap<(ServiceCategory, VehicleKey), Vec<EquipmentType>> =
            FxHashMap::with_capacity_and_hasher(requirements.len(), Default::default());

        for req in requirements {
            let entry = table
                .entry((req.service, req.vehicle.clone()))
                .or_default();
            for equipment in &req.required {
                if !entry.contains(equipment) {
                    entry.push(equipment.clone());
                }
            }
        }

        for required in table.values_mut() {
            required.sort();
        }

        Self { table }
    }

    /// Equipment types required to perform `service` on `vehicle`.
    pub fn required_equipment(
        &self,
        service: ServiceCategory,
        vehicle: &VehicleKey,
    ) -> Result<&[EquipmentType], UnknownRequirement> {
        self.table
            .get(&(service, vehicle.clone()))
            .map(|v| v.as_slice())
            .ok_or_else(|| UnknownRequirement {
                service,
                vehicle: vehicle.clone(),
            })
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
