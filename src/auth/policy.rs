//! Capability table: every authorization decision in the service.
//!
//! Handlers call [`authorize`] with [`Subject::Unscoped`] as a role gate; services
//! call it again once the resource is loaded so ownership can be checked.

use super::extractors::AuthUser;
use crate::{error::AppError, users::repo_types::Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateAppointment,
    RescheduleAppointment,
    OverrideAppointment,
    ReviewAppointment,
    CancelAppointment,
    ListAppointments,
    RecordExamination,
    CreateDoctor,
    UpdateDoctor,
    DeleteDoctor,
    UpdatePatient,
    DeletePatient,
    ListUsers,
    ListDoctors,
    ViewUser,
}

/// The thing being acted on, reduced to who owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    Unscoped,
    Appointment {
        patient_user_id: i64,
        doctor_user_id: i64,
    },
    User(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Owner {
    Anyone,
    AppointmentPatient,
    AppointmentDoctor,
    SameUser,
}

struct Rule {
    roles: &'static [Role],
    owner: Owner,
    admin_exempt: bool,
}

const ALL: &[Role] = &[Role::Admin, Role::Doctor, Role::Patient];

impl Action {
    fn rule(self) -> Rule {
        use Role::*;
        let (roles, owner, admin_exempt): (&'static [Role], Owner, bool) = match self {
            Action::CreateAppointment => (&[Patient, Admin], Owner::AppointmentPatient, true),
            Action::RescheduleAppointment => (&[Patient], Owner::AppointmentPatient, false),
            Action::OverrideAppointment => (&[Admin], Owner::Anyone, true),
            Action::ReviewAppointment => (&[Doctor], Owner::Anyone, false),
            Action::CancelAppointment => (&[Admin, Patient], Owner::AppointmentPatient, true),
            Action::ListAppointments => (ALL, Owner::Anyone, true),
            // an admin is not the assigned doctor and gets no bypass here
            Action::RecordExamination => (&[Doctor, Admin], Owner::AppointmentDoctor, false),
            Action::CreateDoctor => (&[Admin], Owner::Anyone, true),
            Action::UpdateDoctor => (&[Admin, Doctor], Owner::SameUser, true),
            Action::DeleteDoctor => (&[Admin], Owner::Anyone, true),
            Action::UpdatePatient => (&[Admin, Patient], Owner::SameUser, true),
            Action::DeletePatient => (&[Admin, Patient], Owner::SameUser, true),
            Action::ListUsers => (&[Admin], Owner::Anyone, true),
            Action::ListDoctors => (ALL, Owner::Anyone, true),
            Action::ViewUser => (ALL, Owner::SameUser, true),
        };
        Rule {
            roles,
            owner,
            admin_exempt,
        }
    }

    fn denial(self) -> &'static str {
        match self {
            Action::CreateAppointment => "You can only book appointments for yourself",
            Action::RescheduleAppointment => "You are not authorized to update this appointment",
            Action::CancelAppointment => "You are not authorized to delete this appointment",
            Action::RecordExamination => {
                "You are not authorized to add examination result to this appointment"
            }
            Action::UpdateDoctor => "You are not authorized to update this doctor",
            Action::UpdatePatient => "You are not authorized to update this patient",
            Action::DeletePatient => "You are not authorized to delete this patient",
            Action::ViewUser => "You are not authorized to view this user",
            _ => "Insufficient permissions",
        }
    }
}

pub fn authorize(actor: &AuthUser, action: Action, subject: Subject) -> Result<(), AppError> {
    let rule = action.rule();

    if !rule.roles.contains(&actor.role) {
        return Err(AppError::forbidden("Insufficient permissions"));
    }
    if rule.admin_exempt && actor.role == Role::Admin {
        return Ok(());
    }

    let owns = match (rule.owner, subject) {
        (Owner::Anyone, _) | (_, Subject::Unscoped) => true,
        (Owner::AppointmentPatient, Subject::Appointment { patient_user_id, .. }) => {
            patient_user_id == actor.user_id
        }
        (Owner::AppointmentDoctor, Subject::Appointment { doctor_user_id, .. }) => {
            doctor_user_id == actor.user_id
        }
        (Owner::SameUser, Subject::User(id)) => id == actor.user_id,
        _ => false,
    };

    if owns {
        Ok(())
    } else {
        Err(AppError::forbidden(action.denial()))
    }
}
