//! Application service: the single entry point the screens call.
//!
//! Owns the record store and the session flag, and persists after every
//! mutation so the UI can always re-read fresh records instead of
//! keeping copies of its own.

use log::info;
use thiserror::Error;

use crate::approval::{self, ApprovalError};
use crate::models::{
    ApprovalStatus, FileMeta, Medicine, MedicineId, Pharmacy, PharmacyId, Session,
};
use crate::store::{Store, StoreError};
use crate::utils::input_validation::EmailAddress;

pub struct Service {
    store: Store,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Not logged in")]
    NotLoggedIn,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Approval(#[from] ApprovalError),

    #[error("Could not save the store: {0}")]
    Save(#[from] std::io::Error),

    #[error("No attachment at index {0}")]
    NoSuchAttachment(usize),
}

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("Email and password must not be empty")]
    EmptyCredentials,

    #[error("Could not save the session: {0}")]
    Save(#[from] std::io::Error),
}

/// Counts shown on the dashboard
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub total_medicines: usize,
    pub total_pharmacies: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl Service {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn save(&self) -> Result<(), std::io::Error> {
        self.store.save()
    }

    // ---- session ----------------------------------------------------

    /// Records an admin session and persists it right away. There is
    /// no credential verification: any non-empty email/password pair
    /// is accepted.
    pub fn login(&mut self, email: &EmailAddress, password: &str) -> Result<(), LoginError> {
        if password.is_empty() {
            return Err(LoginError::EmptyCredentials);
        }
        self.store.set_session(Some(Session::admin(email.clone())));
        self.store.save()?;
        info!("Admin session opened for {email}");
        Ok(())
    }

    pub fn logout(&mut self) -> Result<(), std::io::Error> {
        self.store.set_session(None);
        self.store.save()
    }

    pub fn session(&self) -> Option<&Session> {
        self.store.session()
    }

    /// Every administrative operation starts here: access is granted by
    /// the mere presence of a session.
    fn require_session(&self) -> Result<(), ServiceError> {
        if self.store.session().is_none() {
            return Err(ServiceError::NotLoggedIn);
        }
        Ok(())
    }

    // ---- pharmacies -------------------------------------------------

    pub fn register_pharmacy(
        &mut self,
        name: String,
        owner_name: String,
        license_number: String,
        address: String,
        phone: String,
        email: EmailAddress,
    ) -> Result<PharmacyId, ServiceError> {
        self.require_session()?;

        let pharmacy = Pharmacy {
            id: PharmacyId::new(),
            name,
            owner_name,
            license_number,
            address,
            phone,
            email,
            registration_date: chrono::Utc::now(),
        };
        let id = pharmacy.id.clone();

        info!("Registered pharmacy {} ({})", pharmacy.name, id);
        self.store.upsert_pharmacy(pharmacy);
        self.store.save()?;
        Ok(id)
    }

    pub fn list_pharmacies(&self) -> Result<Vec<&Pharmacy>, ServiceError> {
        self.require_session()?;
        Ok(self.store.list_pharmacies().collect())
    }

    pub fn get_pharmacy(&self, id: &PharmacyId) -> Result<&Pharmacy, ServiceError> {
        self.require_session()?;
        Ok(self.store.get_pharmacy(id)?)
    }

    // ---- medicines --------------------------------------------------

    pub fn register_medicine(
        &mut self,
        pharmacy_id: Option<PharmacyId>,
        name: String,
        company: String,
        description: String,
        files: Vec<FileMeta>,
    ) -> Result<MedicineId, ServiceError> {
        self.require_session()?;

        if let Some(pharmacy_id) = &pharmacy_id {
            // The foreign key is optional but must point somewhere real
            // when present.
            self.store.get_pharmacy(pharmacy_id)?;
        }

        let medicine = Medicine::new(pharmacy_id, name, company, description, files);
        let id = medicine.id.clone();

        info!("Registered medicine {} ({})", medicine.name, id);
        self.store.upsert_medicine(medicine);
        self.store.save()?;
        Ok(id)
    }

    pub fn list_medicines(&self) -> Result<Vec<&Medicine>, ServiceError> {
        self.require_session()?;
        Ok(self.store.list_medicines().collect())
    }

    pub fn list_medicines_by_status(
        &self,
        status: ApprovalStatus,
    ) -> Result<Vec<&Medicine>, ServiceError> {
        self.require_session()?;
        Ok(self
            .store
            .list_medicines()
            .filter(|m| m.status == status)
            .collect())
    }

    pub fn medicines_of_pharmacy(
        &self,
        pharmacy_id: &PharmacyId,
    ) -> Result<Vec<&Medicine>, ServiceError> {
        self.require_session()?;
        Ok(self
            .store
            .list_medicines()
            .filter(|m| m.pharmacy_id.as_ref() == Some(pharmacy_id))
            .collect())
    }

    pub fn get_medicine(&self, id: &MedicineId) -> Result<&Medicine, ServiceError> {
        self.require_session()?;
        Ok(self.store.get_medicine(id)?)
    }

    /// Replaces the mutable fields of a medicine. Its id, registration
    /// date, approval checklist and derived fields are untouched.
    pub fn update_medicine(
        &mut self,
        id: &MedicineId,
        name: String,
        company: String,
        description: String,
    ) -> Result<(), ServiceError> {
        self.require_session()?;

        let mut medicine = self.store.get_medicine(id)?.clone();
        medicine.name = name;
        medicine.company = company;
        medicine.description = description;

        self.store.upsert_medicine(medicine);
        self.store.save()?;
        Ok(())
    }

    pub fn delete_medicine(&mut self, id: &MedicineId) -> Result<(), ServiceError> {
        self.require_session()?;

        self.store.delete_medicine(id)?;
        info!("Deleted medicine {id}");
        self.store.save()?;
        Ok(())
    }

    /// The one mutation of the approval checklist: sets a stage status,
    /// rederives the overall status and progress, and persists the
    /// updated record (replace-by-id).
    pub fn set_stage_status(
        &mut self,
        id: &MedicineId,
        stage_index: usize,
        new_status: ApprovalStatus,
    ) -> Result<(), ServiceError> {
        self.require_session()?;

        let mut medicine = self.store.get_medicine(id)?.clone();
        approval::set_stage_status(&mut medicine, stage_index, new_status)?;

        self.store.upsert_medicine(medicine);
        self.store.save()?;
        Ok(())
    }

    // ---- attachments ------------------------------------------------

    pub fn attach_file(&mut self, id: &MedicineId, file: FileMeta) -> Result<(), ServiceError> {
        self.require_session()?;

        let mut medicine = self.store.get_medicine(id)?.clone();
        info!("Attached {} to medicine {id}", file.name);
        medicine.files.push(file);

        self.store.upsert_medicine(medicine);
        self.store.save()?;
        Ok(())
    }

    pub fn remove_file(&mut self, id: &MedicineId, index: usize) -> Result<(), ServiceError> {
        self.require_session()?;

        let mut medicine = self.store.get_medicine(id)?.clone();
        if index >= medicine.files.len() {
            return Err(ServiceError::NoSuchAttachment(index));
        }
        medicine.files.remove(index);

        self.store.upsert_medicine(medicine);
        self.store.save()?;
        Ok(())
    }

    // ---- dashboard --------------------------------------------------

    pub fn stats(&self) -> Result<Stats, ServiceError> {
        self.require_session()?;

        let mut stats = Stats {
            total_pharmacies: self.store.list_pharmacies().count(),
            ..Stats::default()
        };
        for medicine in self.store.list_medicines() {
            stats.total_medicines += 1;
            match medicine.status {
                ApprovalStatus::Pending => stats.pending += 1,
                ApprovalStatus::Approved => stats.approved += 1,
                ApprovalStatus::Rejected => stats.rejected += 1,
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn logged_in_service() -> Service {
        let mut service = Service::new(Store::default());
        let email = EmailAddress::try_from("admin@moh.gov.iq").unwrap();
        service.login(&email, "hunter2").unwrap();
        service
    }

    fn register_medicine(service: &mut Service, name: &str) -> MedicineId {
        service
            .register_medicine(None, name.into(), "Acme".into(), "".into(), vec![])
            .unwrap()
    }

    #[test]
    fn test_operations_require_session() {
        let service = Service::new(Store::default());
        assert!(matches!(
            service.list_medicines(),
            Err(ServiceError::NotLoggedIn)
        ));
        assert!(matches!(service.stats(), Err(ServiceError::NotLoggedIn)));
    }

    #[test]
    fn test_login_rejects_empty_password() {
        let mut service = Service::new(Store::default());
        let email = EmailAddress::try_from("admin@moh.gov.iq").unwrap();
        assert!(service.login(&email, "").is_err());
        assert!(service.session().is_none());
    }

    #[test]
    fn test_logout_clears_session() {
        let mut service = logged_in_service();
        assert_eq!(service.session().unwrap().role, "admin");
        service.logout().unwrap();
        assert!(service.session().is_none());
    }

    #[test]
    fn test_login_and_logout_write_the_store_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        // The service is dropped without an explicit save; the session
        // must have been written by login itself.
        {
            let mut service = Service::new(Store::open(path.clone()).unwrap());
            let email = EmailAddress::try_from("admin@moh.gov.iq").unwrap();
            service.login(&email, "hunter2").unwrap();
        }
        let reopened = Store::open(path.clone()).unwrap();
        assert_eq!(reopened.session().unwrap().email.as_ref(), "admin@moh.gov.iq");

        {
            let mut service = Service::new(reopened);
            service.logout().unwrap();
        }
        let reopened = Store::open(path).unwrap();
        assert!(reopened.session().is_none());
    }

    #[test]
    fn test_registered_medicine_starts_pending() {
        let mut service = logged_in_service();
        let id = register_medicine(&mut service, "Metformin");

        let medicine = service.get_medicine(&id).unwrap();
        assert_eq!(medicine.status, ApprovalStatus::Pending);
        assert_eq!(medicine.progress, 0);
        assert_eq!(medicine.approvals.len(), 3);
    }

    #[test]
    fn test_register_medicine_checks_pharmacy_fk() {
        let mut service = logged_in_service();
        let missing = PharmacyId::new();
        let result = service.register_medicine(
            Some(missing),
            "Insulin".into(),
            "Acme".into(),
            "".into(),
            vec![],
        );
        assert!(matches!(
            result,
            Err(ServiceError::Store(StoreError::PharmacyNotFound(_)))
        ));
    }

    #[test]
    fn test_stage_transition_persists_derived_fields() {
        let mut service = logged_in_service();
        let id = register_medicine(&mut service, "Salbutamol");

        service
            .set_stage_status(&id, 0, ApprovalStatus::Approved)
            .unwrap();
        service
            .set_stage_status(&id, 1, ApprovalStatus::Approved)
            .unwrap();

        // Re-reading by id sees the recomputed fields; no stale copy.
        let medicine = service.get_medicine(&id).unwrap();
        assert_eq!(medicine.progress, 67);
        assert_eq!(medicine.status, ApprovalStatus::Pending);
    }

    #[test]
    fn test_update_medicine_keeps_checklist() {
        let mut service = logged_in_service();
        let id = register_medicine(&mut service, "Losartan");
        service
            .set_stage_status(&id, 2, ApprovalStatus::Rejected)
            .unwrap();

        service
            .update_medicine(&id, "Losartan 50mg".into(), "Acme Ltd".into(), "tabs".into())
            .unwrap();

        let medicine = service.get_medicine(&id).unwrap();
        assert_eq!(medicine.name, "Losartan 50mg");
        assert_eq!(medicine.status, ApprovalStatus::Rejected);
        assert_eq!(medicine.approvals[2].status, ApprovalStatus::Rejected);
    }

    #[test]
    fn test_delete_leaves_other_records() {
        let mut service = logged_in_service();
        let keep = register_medicine(&mut service, "Atenolol");
        let drop = register_medicine(&mut service, "Amlodipine");

        service.delete_medicine(&drop).unwrap();

        assert!(service.get_medicine(&keep).is_ok());
        assert!(service.get_medicine(&drop).is_err());
    }

    #[test]
    fn test_attach_and_remove_file() {
        let mut service = logged_in_service();
        let id = register_medicine(&mut service, "Vitamin D");

        service
            .attach_file(
                &id,
                FileMeta {
                    name: "label.pdf".into(),
                    size: 1024,
                    mime_type: "application/pdf".into(),
                    last_modified: Utc::now(),
                },
            )
            .unwrap();
        assert_eq!(service.get_medicine(&id).unwrap().files.len(), 1);

        assert!(matches!(
            service.remove_file(&id, 5),
            Err(ServiceError::NoSuchAttachment(5))
        ));
        service.remove_file(&id, 0).unwrap();
        assert!(service.get_medicine(&id).unwrap().files.is_empty());
    }

    #[test]
    fn test_stats_count_per_status() {
        let mut service = logged_in_service();
        let a = register_medicine(&mut service, "A");
        let b = register_medicine(&mut service, "B");
        let _c = register_medicine(&mut service, "C");

        for i in 0..3 {
            service.set_stage_status(&a, i, ApprovalStatus::Approved).unwrap();
        }
        service.set_stage_status(&b, 1, ApprovalStatus::Rejected).unwrap();

        let stats = service.stats().unwrap();
        assert_eq!(stats.total_medicines, 3);
        assert_eq!(stats.approved, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.pending, 1);
    }
}
