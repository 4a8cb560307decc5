//! Classified record kinds and the visibility filter
//!
//! Every record carries a `clearance_level`. A caller sees a record iff its
//! own level is at least the record's; only ALPHA may mutate.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::clearance::ClearanceLevel;
use crate::error::{ConsoleError, Result};

/// Anything tagged with a clearance level
pub trait Classified {
    fn clearance_level(&self) -> ClearanceLevel;
}

impl<T: Classified + ?Sized> Classified for &T {
    fn clearance_level(&self) -> ClearanceLevel {
        (**self).clearance_level()
    }
}

impl Classified for ClearanceLevel {
    fn clearance_level(&self) -> ClearanceLevel {
        *self
    }
}

/// Keep the records `level` is cleared to see, preserving order
pub fn visible<T, I>(records: I, level: ClearanceLevel) -> Vec<T>
where
    T: Classified,
    I: IntoIterator<Item = T>,
{
    records
        .into_iter()
        .filter(|record| level.can_view(record.clearance_level()))
        .collect()
}

/// Fail with FORBIDDEN unless `level` may mutate records
pub fn ensure_can_modify(level: ClearanceLevel, action: &'static str) -> Result<()> {
    if level.can_modify() {
        Ok(())
    } else {
        Err(ConsoleError::Forbidden { action, level })
    }
}

/// Table a record kind lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Module,
    Movie,
    Character,
    Location,
    Technology,
}

impl RecordKind {
    pub const ALL: [RecordKind; 5] = [
        RecordKind::Module,
        RecordKind::Movie,
        RecordKind::Character,
        RecordKind::Location,
        RecordKind::Technology,
    ];

    /// Remote table name
    pub fn table(self) -> &'static str {
        match self {
            RecordKind::Module => "modules",
            RecordKind::Movie => "movies",
            RecordKind::Character => "characters",
            RecordKind::Location => "locations",
            RecordKind::Technology => "technologies",
        }
    }

    fn singular(self) -> &'static str {
        match self {
            RecordKind::Module => "module",
            RecordKind::Movie => "movie",
            RecordKind::Character => "character",
            RecordKind::Location => "location",
            RecordKind::Technology => "technology",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

impl FromStr for RecordKind {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        RecordKind::ALL
            .into_iter()
            .find(|kind| kind.table() == s || kind.singular() == s)
            .ok_or_else(|| ConsoleError::Config(format!("Unknown record kind: {}", s)))
    }
}

/// A row of one of the record tables
pub trait Record: Classified + Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: RecordKind;

    /// Insert payload; the store assigns id and timestamps
    type Draft: Classified + Serialize + DeserializeOwned + Send + Sync;

    fn id(&self) -> &str;

    /// Title or name, for logs and listings
    fn label(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: String,
    pub name: String,
    pub description: String,
    pub clearance_level: ClearanceLevel,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewModule {
    pub name: String,
    pub description: String,
    pub clearance_level: ClearanceLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: String,
    pub title: String,
    pub year: i32,
    pub director: String,
    pub rating: f64,
    pub synopsis: String,
    pub clearance_level: ClearanceLevel,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMovie {
    pub title: String,
    pub year: i32,
    pub director: String,
    pub rating: f64,
    pub synopsis: String,
    pub clearance_level: ClearanceLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub name: String,
    pub alias: String,
    pub description: String,
    pub clearance_level: ClearanceLevel,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCharacter {
    pub name: String,
    pub alias: String,
    pub description: String,
    pub clearance_level: ClearanceLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub description: String,
    pub coordinates: String,
    pub clearance_level: ClearanceLevel,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLocation {
    pub name: String,
    pub description: String,
    pub coordinates: String,
    pub clearance_level: ClearanceLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technology {
    pub id: String,
    pub name: String,
    pub description: String,
    pub specifications: String,
    pub clearance_level: ClearanceLevel,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTechnology {
    pub name: String,
    pub description: String,
    pub specifications: String,
    pub clearance_level: ClearanceLevel,
}

// Each (record, draft) pair shares the same clearance accessor
macro_rules! classified {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Classified for $ty {
                fn clearance_level(&self) -> ClearanceLevel {
                    self.clearance_level
                }
            }
        )+
    };
}

classified!(
    Module,
    NewModule,
    Movie,
    NewMovie,
    Character,
    NewCharacter,
    Location,
    NewLocation,
    Technology,
    NewTechnology,
);

impl Record for Module {
    const KIND: RecordKind = RecordKind::Module;
    type Draft = NewModule;

    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> &str {
        &self.name
    }
}

impl Record for Movie {
    const KIND: RecordKind = RecordKind::Movie;
    type Draft = NewMovie;

    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> &str {
        &self.title
    }
}

impl Record for Character {
    const KIND: RecordKind = RecordKind::Character;
    type Draft = NewCharacter;

    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> &str {
        &self.name
    }
}

impl Record for Location {
    const KIND: RecordKind = RecordKind::Location;
    type Draft = NewLocation;

    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> &str {
        &self.name
    }
}

impl Record for Technology {
    const KIND: RecordKind = RecordKind::Technology;
    type Draft = NewTechnology;

    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use rstest::rstest;

    fn module(name: &str, level: ClearanceLevel) -> Module {
        Module {
            id: name.to_string(),
            name: name.to_string(),
            description: String::new(),
            clearance_level: level,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_gamma_sees_only_delta_of_delta_beta_alpha() {
        let records = vec![
            module("a", ClearanceLevel::Delta),
            module("b", ClearanceLevel::Beta),
            module("c", ClearanceLevel::Alpha),
        ];
        let shown = visible(records, ClearanceLevel::Gamma);
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].name, "a");
    }

    #[test]
    fn test_visible_preserves_order_and_borrows() {
        let records = vec![
            module("x", ClearanceLevel::Beta),
            module("y", ClearanceLevel::Delta),
            module("z", ClearanceLevel::Gamma),
        ];
        let shown: Vec<&Module> = visible(&records, ClearanceLevel::Beta);
        let names: Vec<&str> = shown.iter().map(|m| m.label()).collect();
        assert_eq!(names, vec!["x", "y", "z"]);
    }

    #[rstest]
    #[case(ClearanceLevel::Delta)]
    #[case(ClearanceLevel::Gamma)]
    #[case(ClearanceLevel::Beta)]
    fn test_mutation_forbidden_below_alpha(#[case] level: ClearanceLevel) {
        for action in ["insert", "update", "delete"] {
            let err = ensure_can_modify(level, action).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Forbidden);
        }
    }

    #[test]
    fn test_alpha_may_modify() {
        assert!(ensure_can_modify(ClearanceLevel::Alpha, "insert").is_ok());
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("movies".parse::<RecordKind>().unwrap(), RecordKind::Movie);
        assert_eq!("Movie".parse::<RecordKind>().unwrap(), RecordKind::Movie);
        assert_eq!("technology".parse::<RecordKind>().unwrap(), RecordKind::Technology);
        assert_eq!("technologies".parse::<RecordKind>().unwrap(), RecordKind::Technology);
        assert!("vehicles".parse::<RecordKind>().is_err());
    }

    #[test]
    fn test_movie_row_shape() {
        let row = serde_json::json!({
            "id": "m1",
            "title": "The Dark Knight",
            "year": 2008,
            "director": "Christopher Nolan",
            "rating": 9.0,
            "synopsis": "",
            "clearance_level": "BETA",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        });
        let movie: Movie = serde_json::from_value(row).unwrap();
        assert_eq!(movie.clearance_level(), ClearanceLevel::Beta);
        assert_eq!(movie.label(), "The Dark Knight");
        assert_eq!(Movie::KIND.table(), "movies");
    }
}
