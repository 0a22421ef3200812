use std::io::Read;

use serde::Deserialize;

use crate::core::{Gender, LifestyleError, PersonRecord, Result};

const EMBEDDED_PEOPLE_CSV: &str = include_str!("../../data/people.csv");

#[derive(Debug, Deserialize)]
struct DirectoryRow {
    full_name: String,
    birth_year: i32,
    gender: String,
}

/// Known people, looked up by full name.
#[derive(Debug, Clone)]
pub struct PersonDirectory {
    people: Vec<PersonRecord>,
}

impl PersonDirectory {
    pub fn embedded() -> Result<Self> {
        Self::from_csv(EMBEDDED_PEOPLE_CSV.as_bytes())
    }

    pub fn from_csv<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut people = Vec::new();
        for row in csv_reader.deserialize::<DirectoryRow>() {
            let row = row.map_err(|e| {
                LifestyleError::SourceUnavailable(format!("invalid person directory: {e}"))
            })?;
            people.push(PersonRecord {
                full_name: row.full_name,
                birth_year: row.birth_year,
                gender: Gender::from_label(&row.gender),
            });
        }
        Ok(Self { people })
    }

    pub fn lookup(&self, full_name: &str) -> Result<PersonRecord> {
        let wanted = full_name.trim();
        self.people
            .iter()
            .find(|p| p.full_name.eq_ignore_ascii_case(wanted))
            .cloned()
            .ok_or_else(|| LifestyleError::SourceUnavailable(format!("no person named {wanted:?}")))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.people.iter().map(|p| p.full_name.as_str())
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }
}
