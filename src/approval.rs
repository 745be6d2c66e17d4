//! The approval tracker: derives a medicine's overall status and
//! progress percentage from its per-stage approval checklist.
//!
//! Recomputation is a pure function of the `approvals` sequence. No
//! history is kept, any stage may move to any status, and the aggregate
//! is fully re-derived on every change rather than tracked
//! incrementally.

use log::info;
use thiserror::Error;

use crate::models::{ApprovalStage, ApprovalStatus, Medicine};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApprovalError {
    #[error("Stage index {index} out of range (medicine has {len} stages)")]
    StageOutOfRange { index: usize, len: usize },
}

/// Derives `(overall status, progress percentage)` from a stage list.
///
/// The "all approved" check takes precedence over "any rejected": a
/// medicine whose every stage is approved is approved even if a stage
/// was rejected at some earlier point and later flipped back.
pub fn derive_status(approvals: &[ApprovalStage]) -> (ApprovalStatus, u8) {
    let total = approvals.len();
    let approved = approvals
        .iter()
        .filter(|stage| stage.status == ApprovalStatus::Approved)
        .count();

    // Rounds half away from zero; with 3 stages only 1/3 and 2/3 are
    // non-exact (33 and 67).
    let progress = if total == 0 {
        0
    } else {
        ((approved * 100) as f64 / total as f64).round() as u8
    };

    let status = if total > 0 && approved == total {
        ApprovalStatus::Approved
    } else if approvals
        .iter()
        .any(|stage| stage.status == ApprovalStatus::Rejected)
    {
        ApprovalStatus::Rejected
    } else {
        ApprovalStatus::Pending
    };

    (status, progress)
}

/// Sets one stage's status and recomputes the derived fields.
///
/// This is the single mutation point for the approval checklist; the
/// caller is responsible for persisting the updated medicine and for
/// refreshing any copy of the same record it still holds.
pub fn set_stage_status(
    medicine: &mut Medicine,
    stage_index: usize,
    new_status: ApprovalStatus,
) -> Result<(), ApprovalError> {
    let len = medicine.approvals.len();
    let stage = medicine
        .approvals
        .get_mut(stage_index)
        .ok_or(ApprovalError::StageOutOfRange {
            index: stage_index,
            len,
        })?;

    stage.status = new_status;
    let (status, progress) = derive_status(&medicine.approvals);
    medicine.status = status;
    medicine.progress = progress;

    info!(
        "Medicine {}: stage '{}' set to {}, overall {} ({}%)",
        medicine.id, medicine.approvals[stage_index].name, new_status, medicine.status, progress
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Medicine;
    use strum::IntoEnumIterator;

    fn stages(statuses: &[ApprovalStatus]) -> Vec<ApprovalStage> {
        statuses
            .iter()
            .enumerate()
            .map(|(i, &status)| ApprovalStage {
                name: format!("Stage {i}"),
                status,
            })
            .collect()
    }

    fn medicine() -> Medicine {
        Medicine::new(None, "Amoxicillin".into(), "Acme".into(), "caps".into(), vec![])
    }

    #[test]
    fn test_all_assignments_follow_precedence_rule() {
        use ApprovalStatus::*;

        for a in ApprovalStatus::iter() {
            for b in ApprovalStatus::iter() {
                for c in ApprovalStatus::iter() {
                    let approvals = stages(&[a, b, c]);
                    let (status, progress) = derive_status(&approvals);

                    let approved =
                        [a, b, c].iter().filter(|&&s| s == Approved).count();
                    let expected_status = if approved == 3 {
                        Approved
                    } else if [a, b, c].contains(&Rejected) {
                        Rejected
                    } else {
                        Pending
                    };
                    let expected_progress = [0, 33, 67, 100][approved];

                    assert_eq!(status, expected_status, "statuses {a} {b} {c}");
                    assert_eq!(progress, expected_progress, "statuses {a} {b} {c}");
                }
            }
        }
    }

    #[test]
    fn test_set_stage_is_idempotent() {
        let mut once = medicine();
        set_stage_status(&mut once, 1, ApprovalStatus::Approved).unwrap();

        let mut twice = once.clone();
        set_stage_status(&mut twice, 1, ApprovalStatus::Approved).unwrap();

        assert_eq!(once.approvals, twice.approvals);
        assert_eq!(once.status, twice.status);
        assert_eq!(once.progress, twice.progress);
    }

    #[test]
    fn test_all_approved_wins_over_prior_rejection() {
        let mut m = medicine();
        set_stage_status(&mut m, 0, ApprovalStatus::Approved).unwrap();
        set_stage_status(&mut m, 1, ApprovalStatus::Rejected).unwrap();
        set_stage_status(&mut m, 2, ApprovalStatus::Approved).unwrap();
        assert_eq!(m.status, ApprovalStatus::Rejected);

        // Flipping the rejected stage makes every stage approved.
        set_stage_status(&mut m, 1, ApprovalStatus::Approved).unwrap();
        assert_eq!(m.status, ApprovalStatus::Approved);
        assert_eq!(m.progress, 100);
    }

    #[test]
    fn test_single_rejection_rejects_overall() {
        let mut m = medicine();
        set_stage_status(&mut m, 2, ApprovalStatus::Rejected).unwrap();
        assert_eq!(m.status, ApprovalStatus::Rejected);
        assert_eq!(m.progress, 0);
    }

    #[test]
    fn test_progress_rounding_at_thirds() {
        let mut m = medicine();
        set_stage_status(&mut m, 0, ApprovalStatus::Approved).unwrap();
        assert_eq!(m.status, ApprovalStatus::Pending);
        assert_eq!(m.progress, 33);

        set_stage_status(&mut m, 1, ApprovalStatus::Approved).unwrap();
        assert_eq!(m.status, ApprovalStatus::Pending);
        assert_eq!(m.progress, 67);
    }

    #[test]
    fn test_stage_index_out_of_range() {
        let mut m = medicine();
        let err = set_stage_status(&mut m, 3, ApprovalStatus::Approved).unwrap_err();
        assert_eq!(err, ApprovalError::StageOutOfRange { index: 3, len: 3 });
        // The medicine is untouched on error.
        assert_eq!(m.status, ApprovalStatus::Pending);
        assert_eq!(m.progress, 0);
    }

    #[test]
    fn test_stage_may_return_to_pending() {
        let mut m = medicine();
        set_stage_status(&mut m, 0, ApprovalStatus::Approved).unwrap();
        set_stage_status(&mut m, 0, ApprovalStatus::Pending).unwrap();
        assert_eq!(m.status, ApprovalStatus::Pending);
        assert_eq!(m.progress, 0);
    }
}
