//! The person directory served by the showcase.

use batchfetch_api::{BfError, BfResult, Entity, Key};
use serde::{Deserialize, Serialize};

/// One directory record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: i64,
    pub given_name: String,
    pub family_name: String,
    /// ISO 8601 calendar date.
    pub start_date: String,
    /// 1 to 10.
    pub rating: u8,
}

impl Person {
    fn new(
        id: i64,
        given_name: &str,
        family_name: &str,
        start_date: &str,
        rating: u8,
    ) -> Self {
        Self {
            id,
            given_name: given_name.into(),
            family_name: family_name.into(),
            start_date: start_date.into(),
            rating,
        }
    }

    pub fn key(&self) -> Key {
        Key(self.id)
    }

    pub fn encode(&self) -> BfResult<bytes::Bytes> {
        serde_json::to_vec(self)
            .map(bytes::Bytes::from)
            .map_err(|err| BfError::other_src("encode person", err))
    }

    pub fn decode(entity: &Entity) -> BfResult<Self> {
        serde_json::from_slice(&entity.data).map_err(|err| {
            BfError::deserialization_src(
                format!("person record for key {}", entity.key),
                err,
            )
        })
    }
}

impl std::fmt::Display for Person {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.given_name, self.family_name)
    }
}

/// The seed directory.
pub fn directory() -> Vec<Person> {
    vec![
        Person::new(1, "John", "Koenig", "1975-10-17", 6),
        Person::new(2, "Dylan", "Hunt", "2000-10-02", 8),
        Person::new(3, "Leela", "Turanga", "1999-03-28", 8),
        Person::new(4, "John", "Crichton", "1999-03-19", 7),
        Person::new(5, "Dave", "Lister", "1988-02-15", 9),
        Person::new(6, "Laura", "Roslin", "2003-12-08", 6),
        Person::new(7, "John", "Sheridan", "1994-01-26", 6),
        Person::new(8, "Dante", "Montana", "2000-11-01", 5),
        Person::new(9, "Isaac", "Gampu", "1977-09-10", 4),
    ]
}
