//! Record store: the `pharmacies` and `medicines` collections plus the
//! session flag, held in memory and saved as one JSON file.
//!
//! Every collection is read in full at open and written in full on
//! save; there are no partial updates and no indexes. The store is the
//! only holder of durable state, so callers follow a read-modify-write
//! discipline: look a record up, change it, upsert it back, save.

use std::{
    fs::File,
    io::{self, ErrorKind::NotFound},
    path::PathBuf,
};

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Medicine, MedicineId, Pharmacy, PharmacyId, Session};

#[derive(Serialize, Deserialize, Default)]
pub struct Store {
    #[serde(skip)]
    path: Option<PathBuf>,
    #[serde(default)]
    pharmacies: Vec<Pharmacy>,
    #[serde(default)]
    medicines: Vec<Medicine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session: Option<Session>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No pharmacy with id {0}")]
    PharmacyNotFound(PharmacyId),
    #[error("No medicine with id {0}")]
    MedicineNotFound(MedicineId),
}

impl Store {
    /// Opens the store file, creating an empty store if it does not
    /// exist yet. A present but malformed file is an error rather than
    /// silently becoming an empty store.
    pub fn open(path: PathBuf) -> Result<Self, io::Error> {
        match File::open(&path) {
            Ok(f) => {
                let mut store: Self = serde_json::from_reader(f)?;
                store.path = Some(path);
                Ok(store)
            }

            Err(not_found) if not_found.kind() == NotFound => {
                info!("Store file not found, creating new empty store");
                let mut new_store = Store::default();
                new_store.path = Some(path);

                // Save right away so write problems surface at startup
                // rather than on the first mutation.
                new_store.save()?;
                Ok(new_store)
            }

            Err(other) => Err(other),
        }
    }

    pub fn save(&self) -> Result<(), io::Error> {
        if let Some(path) = &self.path {
            let file = File::create(path)?;
            serde_json::to_writer_pretty(file, self)?;
        }
        Ok(())
    }

    // ---- pharmacies -------------------------------------------------

    pub fn list_pharmacies(&self) -> impl Iterator<Item = &Pharmacy> + '_ {
        self.pharmacies.iter()
    }

    pub fn get_pharmacy(&self, id: &PharmacyId) -> Result<&Pharmacy, StoreError> {
        self.pharmacies
            .iter()
            .find(|p| &p.id == id)
            .ok_or_else(|| StoreError::PharmacyNotFound(id.clone()))
    }

    /// Inserts the pharmacy, or replaces the stored record with the
    /// same id.
    pub fn upsert_pharmacy(&mut self, pharmacy: Pharmacy) {
        match self.pharmacies.iter_mut().find(|p| p.id == pharmacy.id) {
            Some(existing) => *existing = pharmacy,
            None => self.pharmacies.push(pharmacy),
        }
    }

    // ---- medicines --------------------------------------------------

    pub fn list_medicines(&self) -> impl Iterator<Item = &Medicine> + '_ {
        self.medicines.iter()
    }

    pub fn get_medicine(&self, id: &MedicineId) -> Result<&Medicine, StoreError> {
        self.medicines
            .iter()
            .find(|m| &m.id == id)
            .ok_or_else(|| StoreError::MedicineNotFound(id.clone()))
    }

    /// Inserts the medicine, or replaces the stored record with the
    /// same id.
    pub fn upsert_medicine(&mut self, medicine: Medicine) {
        match self.medicines.iter_mut().find(|m| m.id == medicine.id) {
            Some(existing) => *existing = medicine,
            None => self.medicines.push(medicine),
        }
    }

    /// Removes one medicine by id. Other records, including other
    /// medicines of the same pharmacy, are untouched.
    pub fn delete_medicine(&mut self, id: &MedicineId) -> Result<(), StoreError> {
        let before = self.medicines.len();
        self.medicines.retain(|m| &m.id != id);
        if self.medicines.len() == before {
            return Err(StoreError::MedicineNotFound(id.clone()));
        }
        Ok(())
    }

    // ---- session ----------------------------------------------------

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn set_session(&mut self, session: Option<Session>) {
        self.session = session;
    }
}
