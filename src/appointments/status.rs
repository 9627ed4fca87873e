//! Appointment status lifecycle.
//!
//! `SCHEDULED` is initial, `REJECTED` and `COMPLETED` are terminal for the patient and
//! examination paths. Doctor review and admin override are unrestricted.

use super::repo_types::AppointmentStatus;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Patient edits date or doctor.
    Reschedule,
    /// Patient or admin removes the appointment.
    Cancel,
    /// Doctor sets any status.
    Review(AppointmentStatus),
    RecordExamination,
    /// Admin edit; `None` keeps the current status.
    Override(Option<AppointmentStatus>),
}

impl AppointmentStatus {
    /// Status after `transition`, or the rule it breaks.
    pub fn apply(self, transition: Transition) -> Result<AppointmentStatus, AppError> {
        use AppointmentStatus::*;
        match (self, transition) {
            (Scheduled, Transition::Reschedule) => Ok(Scheduled),
            (_, Transition::Reschedule) => Err(AppError::client(
                "Only SCHEDULED appointments can be updated",
            )),
            (Scheduled, Transition::Cancel) => Ok(Scheduled),
            (_, Transition::Cancel) => Err(AppError::client(
                "Only SCHEDULED appointments can be cancelled",
            )),
            (_, Transition::Review(next)) => Ok(next),
            (Approved, Transition::RecordExamination) => Ok(Completed),
            (_, Transition::RecordExamination) => Err(AppError::client(
                "Examination can only be added to APPROVED appointments",
            )),
            (current, Transition::Override(next)) => Ok(next.unwrap_or(current)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AppointmentStatus::*;

    const ALL: [AppointmentStatus; 4] = [Scheduled, Approved, Rejected, Completed];

    #[test]
    fn reschedule_and_cancel_need_scheduled() {
        assert_eq!(Scheduled.apply(Transition::Reschedule).unwrap(), Scheduled);
        assert_eq!(Scheduled.apply(Transition::Cancel).unwrap(), Scheduled);
        for s in [Approved, Rejected, Completed] {
            assert!(matches!(s.apply(Transition::Reschedule), Err(AppError::Client(_))));
            assert!(matches!(s.apply(Transition::Cancel), Err(AppError::Client(_))));
        }
    }

    #[test]
    fn review_goes_anywhere() {
        for from in ALL {
            for to in ALL {
                assert_eq!(from.apply(Transition::Review(to)).unwrap(), to);
            }
        }
    }

    #[test]
    fn examination_completes_approved_only() {
        assert_eq!(Approved.apply(Transition::RecordExamination).unwrap(), Completed);
        let err = Scheduled.apply(Transition::RecordExamination).unwrap_err();
        assert_eq!(err.to_string(), "Examination can only be added to APPROVED appointments");
        assert!(Completed.apply(Transition::RecordExamination).is_err());
    }

    #[test]
    fn override_keeps_status_when_absent() {
        assert_eq!(Completed.apply(Transition::Override(None)).unwrap(), Completed);
        assert_eq!(Completed.apply(Transition::Override(Some(Scheduled))).unwrap(), Scheduled);
    }
}
