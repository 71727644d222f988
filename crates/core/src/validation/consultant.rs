//! Resolution of the pathway consultant against the doctors registry.
//!
//! - ID and name: an ID known to the registry must carry that name, and a name known to the
//!   registry must carry that ID. Unknown pairs are accepted as they are.
//! - ID only: the ID must be known; the name is copied from the registry.
//! - Name only: the registry entry's ID is reused, or a fresh unused one is minted.
//!
//! A missing prefix is copied from the matching registry entry.

use crate::constants::{CONSULTANT_ID_DIGITS, CONSULTANT_ID_PREFIX};
use crate::doctors::{Doctor, DoctorRegistry};
use crate::pathway::Consultant;
use rand::{Rng, RngCore};

fn is_set(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.is_empty())
}

fn fill_prefix(consultant: &mut Consultant, doctor: Option<&Doctor>) {
    if let Some(doctor) = doctor {
        if consultant.prefix.is_none() {
            consultant.prefix = Some(doctor.prefix.clone());
        }
    }
}

pub(super) fn resolve(
    consultant: &mut Consultant,
    doctors: &dyn DoctorRegistry,
    rng: &mut dyn RngCore,
) -> Result<(), String> {
    let has_id = is_set(&consultant.id);
    let has_name = is_set(&consultant.first_name) && is_set(&consultant.surname);
    let id = consultant.id.clone().unwrap_or_default();
    let first_name = consultant.first_name.clone().unwrap_or_default();
    let surname = consultant.surname.clone().unwrap_or_default();

    match (has_id, has_name) {
        (true, true) => {
            if let Some(doctor) = doctors.get_by_id(&id) {
                if doctor.first_name != first_name || doctor.surname != surname {
                    return Err(format!(
                        "consultant ID matched but name did not. Expected: {} {} Actual: {first_name} {surname}",
                        doctor.first_name, doctor.surname
                    ));
                }
                fill_prefix(consultant, Some(doctor));
                return Ok(());
            }
            let doctor = doctors.get_by_name(&first_name, &surname);
            if let Some(doctor) = doctor {
                if doctor.id != id {
                    return Err(format!(
                        "consultant name matched but ID did not. Expected: {} Actual: {id}",
                        doctor.id
                    ));
                }
            }
            fill_prefix(consultant, doctor);
            Ok(())
        }
        (true, false) if !is_set(&consultant.first_name) && !is_set(&consultant.surname) => {
            let doctor = doctors.get_by_id(&id).ok_or_else(|| {
                format!(
                    "consultant ID {id} not found. If the consultant name is not specified, the ID must be an existing ID"
                )
            })?;
            consultant.first_name = Some(doctor.first_name.clone());
            consultant.surname = Some(doctor.surname.clone());
            fill_prefix(consultant, Some(doctor));
            Ok(())
        }
        (false, true) => {
            if let Some(doctor) = doctors.get_by_name(&first_name, &surname) {
                consultant.id = Some(doctor.id.clone());
                fill_prefix(consultant, Some(doctor));
            } else {
                consultant.id = Some(new_consultant_id(doctors, rng));
            }
            Ok(())
        }
        _ => Err(
            "either ID or first name and surname must be provided for a consultant to be valid"
                .into(),
        ),
    }
}

/// An ID of the form `C1234567` not used by any registered doctor.
fn new_consultant_id(doctors: &dyn DoctorRegistry, rng: &mut dyn RngCore) -> String {
    loop {
        let digits: String = (0..CONSULTANT_ID_DIGITS)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect();
        let id = format!("{CONSULTANT_ID_PREFIX}{digits}");
        if doctors.get_by_id(&id).is_none() {
            return id;
        }
    }
}
