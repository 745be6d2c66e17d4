//! Data model for pharmacies and medicine registrations

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;

use crate::utils::input_validation::EmailAddress;

/// Status of a single approval stage, and of a medicine overall.
/// Serialized with the lowercase names the stored collections use.
#[derive(
    Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    #[default]
    #[display("pending")]
    Pending,
    #[display("approved")]
    Approved,
    #[display("rejected")]
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }
}

/// Display labels of the three fixed approval stages, in checklist order.
pub const STAGE_NAMES: [&str; 3] = ["Ministry Approval", "Quality Control", "Documentation Review"];

// Last issued id, so two records created within the same millisecond
// still get distinct, strictly increasing ids.
static LAST_ID: AtomicI64 = AtomicI64::new(0);

fn next_record_id() -> String {
    let now = Utc::now().timestamp_millis();
    // fetch_update reports the previous value; the issued id is the
    // value the closure stored.
    let prev = LAST_ID
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last + 1))
        })
        .unwrap_or_default();
    now.max(prev + 1).to_string()
}

/// Unique identifier of a pharmacy, an opaque string issued from a
/// monotonic millisecond clock at registration time.
#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Display)]
pub struct PharmacyId(String);

impl PharmacyId {
    pub fn new() -> Self {
        Self(next_record_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PharmacyId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier of a medicine registration
#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Display)]
pub struct MedicineId(String);

impl MedicineId {
    pub fn new() -> Self {
        Self(next_record_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MedicineId {
    fn default() -> Self {
        Self::new()
    }
}

/// A registered scientific office / pharmaceutical company.
///
/// `id` and `registration_date` are fixed at registration;
/// the record has no delete operation.
#[derive(Debug, Serialize, Deserialize, Clone, Display)]
#[serde(rename_all = "camelCase")]
#[display("{name}")]
pub struct Pharmacy {
    pub id: PharmacyId,
    pub name: String,
    pub owner_name: String,
    pub license_number: String,
    pub address: String,
    pub phone: String,
    pub email: EmailAddress,
    pub registration_date: DateTime<Utc>,
}

/// Metadata of a file attached to a medicine registration.
///
/// Only the metadata is captured at the attachment boundary; the byte
/// content is never read or stored, so attachments are not retrievable.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Display)]
#[display("{name} ({size} bytes, {mime_type})")]
pub struct FileMeta {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
    #[serde(rename = "lastModified", with = "chrono::serde::ts_milliseconds")]
    pub last_modified: DateTime<Utc>,
}

/// One item of the approval checklist attached to every medicine
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Display)]
#[display("{name}: {status}")]
pub struct ApprovalStage {
    pub name: String,
    pub status: ApprovalStatus,
}

/// A drug registration record undergoing the fixed 3-stage approval
/// workflow.
///
/// `status` and `progress` are derived from `approvals` and must only be
/// recomputed through [`crate::approval::set_stage_status`].
#[derive(Debug, Serialize, Deserialize, Clone, Display)]
#[serde(rename_all = "camelCase")]
#[display("{name}")]
pub struct Medicine {
    pub id: MedicineId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pharmacy_id: Option<PharmacyId>,
    pub name: String,
    pub company: String,
    pub description: String,
    pub files: Vec<FileMeta>,
    pub approvals: Vec<ApprovalStage>,
    pub status: ApprovalStatus,
    pub progress: u8,
    pub registration_date: DateTime<Utc>,
}

impl Medicine {
    /// Creates a registration with the three fixed stages, all pending.
    pub fn new(
        pharmacy_id: Option<PharmacyId>,
        name: String,
        company: String,
        description: String,
        files: Vec<FileMeta>,
    ) -> Self {
        Self {
            id: MedicineId::new(),
            pharmacy_id,
            name,
            company,
            description,
            files,
            approvals: STAGE_NAMES
                .iter()
                .map(|&name| ApprovalStage {
                    name: name.to_owned(),
                    status: ApprovalStatus::Pending,
                })
                .collect(),
            status: ApprovalStatus::Pending,
            progress: 0,
            registration_date: Utc::now(),
        }
    }
}

/// The administrative session recorded after a successful login.
/// Its mere presence in the store grants access to every screen.
#[derive(Debug, Serialize, Deserialize, Clone, Display)]
#[display("{email} ({role})")]
pub struct Session {
    pub email: EmailAddress,
    pub role: String,
}

impl Session {
    pub fn admin(email: EmailAddress) -> Self {
        Self {
            email,
            role: "admin".to_owned(),
        }
    }
}
