use super::time::DateTimeSpec;
use crate::clock::Clock;
use crate::constants::DEFAULT_PATIENT_ID;
use crate::{PathwayError, PathwayResult};
use chrono::{Datelike, Days, NaiveDate};
use pathsim_types::PatientId;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Persons
// ============================================================================

/// The people a pathway refers to, keyed by the ID steps use to address them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Persons(BTreeMap<PatientId, Person>);

impl Persons {
    pub fn new(persons: BTreeMap<PatientId, Person>) -> Self {
        Self(persons)
    }

    /// The section given to pathways that don't declare persons: one empty person.
    pub fn default_single() -> Self {
        let mut persons = BTreeMap::new();
        persons.insert(PatientId::from(DEFAULT_PATIENT_ID), Person::default());
        Self(persons)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has_one_person(&self) -> bool {
        self.0.len() == 1
    }

    /// Whether this is exactly the section added by [`Persons::default_single`].
    pub fn is_default(&self) -> bool {
        self.has_one_person()
            && self
                .0
                .get(&PatientId::from(DEFAULT_PATIENT_ID))
                .is_some_and(|p| *p == Person::default())
    }

    /// Returns the only person of the section.
    ///
    /// # Errors
    ///
    /// Returns [`PathwayError::InvalidInput`] if the section doesn't hold exactly one person.
    pub fn only_person(&self) -> PathwayResult<(&PatientId, &Person)> {
        if !self.has_one_person() {
            return Err(PathwayError::InvalidInput(
                "section persons does not have one person only".into(),
            ));
        }
        self.0
            .iter()
            .next()
            .ok_or_else(|| PathwayError::InvalidInput("no person found in section persons".into()))
    }

    pub fn get(&self, id: &PatientId) -> Option<&Person> {
        self.0.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &PatientId> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PatientId, &Person)> {
        self.0.iter()
    }
}

// ============================================================================
// Person and its parts
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Person {
    /// Only one of `age` and `date_of_birth` may be set.
    pub age: Option<Age>,
    pub date_of_birth: Option<NaiveDate>,
    /// `M`, `F`, `RANDOM` or empty.
    pub gender: String,
    pub first_name: String,
    pub surname: String,
    pub address: Option<Address>,
    pub nhs: String,
    pub mrn: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Address {
    /// Generate every field at random; no other field may be set.
    pub all_random: bool,
    pub first_line: String,
    pub second_line: String,
    pub city: String,
    pub postcode: String,
    pub country: String,
    #[serde(rename = "type")]
    pub address_type: String,
}

impl Address {
    /// Names of the fields set alongside `all_random`.
    pub(crate) fn fields_set(&self) -> Vec<&'static str> {
        [
            ("first_line", &self.first_line),
            ("second_line", &self.second_line),
            ("city", &self.city),
            ("postcode", &self.postcode),
            ("country", &self.country),
            ("type", &self.address_type),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// An age in years drawn from `[from, to)`.
///
/// A non-zero `day_of_year` is the 1-indexed day of the year the person was born; zero picks
/// one at random.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Age {
    pub from: i32,
    pub to: i32,
    pub day_of_year: i32,
}

impl Age {
    fn random_years<R: Rng + ?Sized>(&self, rng: &mut R) -> i32 {
        if self.to <= self.from {
            return self.from;
        }
        rng.gen_range(self.from..self.to)
    }

    fn zero_based_day<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        if self.day_of_year > 0 {
            return (self.day_of_year - 1) as u64;
        }
        rng.gen_range(0..365)
    }

    /// Picks a date of birth matching this age at the clock's current date.
    pub fn birthdate<R: Rng + ?Sized>(&self, clock: &dyn Clock, rng: &mut R) -> NaiveDate {
        let year = clock.now().year() - self.random_years(rng);
        let day = self.zero_based_day(rng);
        NaiveDate::from_ymd_opt(year, 1, 1)
            .and_then(|start| start.checked_add_days(Days::new(day)))
            .unwrap_or(NaiveDate::MIN)
    }
}

/// A date of birth for someone aged between 1 and 100.
pub fn random_birthdate<R: Rng + ?Sized>(clock: &dyn Clock, rng: &mut R) -> NaiveDate {
    Age {
        from: 1,
        to: 100,
        day_of_year: 0,
    }
    .birthdate(clock, rng)
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Allergy {
    #[serde(rename = "type")]
    pub allergy_type: String,
    /// At least one of `code` and `description` is required.
    pub code: String,
    pub description: String,
    pub severity: String,
    pub reaction: String,
    pub coding_system: String,
    pub identification_datetime: Option<DateTimeSpec>,
}

/// A diagnosis or procedure recorded on a person.
///
/// Setting `code` or `description` to `RANDOM` picks a random entry; the other one must then be
/// `RANDOM` or empty and `type` must be empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiagnosisOrProcedure {
    #[serde(rename = "type")]
    pub item_type: String,
    pub code: String,
    pub description: String,
    pub datetime: Option<DateTimeSpec>,
}

/// Updates an existing person's demographics and clinical history.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpdatePerson {
    pub person: Option<Person>,
    pub diagnoses: Vec<DiagnosisOrProcedure>,
    pub procedures: Vec<DiagnosisOrProcedure>,
    pub allergies: Vec<Allergy>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn default_section_is_detected() {
        let persons = Persons::default_single();
        assert!(persons.is_default());
        let (id, person) = persons.only_person().expect("one person");
        assert_eq!(id.as_str(), DEFAULT_PATIENT_ID);
        assert_eq!(*person, Person::default());
    }

    #[test]
    fn named_person_is_not_default() {
        let mut map = BTreeMap::new();
        map.insert(
            PatientId::from(DEFAULT_PATIENT_ID),
            Person {
                first_name: "Ada".into(),
                ..Default::default()
            },
        );
        assert!(!Persons::new(map).is_default());
    }

    #[test]
    fn only_person_rejects_several() {
        let mut map = BTreeMap::new();
        map.insert(PatientId::from("a"), Person::default());
        map.insert(PatientId::from("b"), Person::default());
        let err = Persons::new(map).only_person().expect_err("two persons");
        assert!(matches!(err, PathwayError::InvalidInput(msg) if msg.contains("one person only")));
    }

    #[test]
    fn birthdate_uses_day_of_year() {
        let mut rng = StdRng::seed_from_u64(1);
        let age = Age {
            from: 30,
            to: 30,
            day_of_year: 32,
        };
        let dob = age.birthdate(&clock(), &mut rng);
        assert_eq!(dob, NaiveDate::from_ymd_opt(1994, 2, 1).unwrap());
    }

    #[test]
    fn random_birthdate_is_within_a_century() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..100 {
            let dob = random_birthdate(&clock(), &mut rng);
            assert!((1924..=2023).contains(&dob.year()), "unexpected year {}", dob.year());
        }
    }
}
