//! Local archives kept beside the gate state
//!
//! Two archives live in the key-value store:
//!
//! - the DCCU vault under [`DCCU_KEY`]: movies, suits, characters,
//!   artifacts, futures, a timeline and ALPHA notes
//! - the creator's documents under [`CREATOR_DOCS_KEY`]
//!
//! Each archive is read whole when opened and rewritten whole after every
//! change. Any session may read; only ALPHA may change an archive.
//! Stored data that fails to parse or validate is dropped with a warning
//! and the archive starts empty.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::Clock;
use crate::clearance::ClearanceLevel;
use crate::error::{ConsoleError, Result};
use crate::records::ensure_can_modify;
use crate::storage::KeyValueStore;

/// Key of the DCCU vault
pub const DCCU_KEY: &str = "dccu_store_v1";
/// Key of the creator's documents
pub const CREATOR_DOCS_KEY: &str = "bat_creator_docs_v1";
/// File name used for archives inside a data directory
pub const ARCHIVE_FILE_NAME: &str = "archive.json";

/// Title given to documents created without one
pub const UNTITLED: &str = "Untitled";

/// Root document of an archive
pub trait Archive: Clone + Default + Serialize + DeserializeOwned + Send + Sync {
    /// Storage key holding the JSON document
    const KEY: &'static str;

    /// Whether a freshly parsed document may be used
    fn is_valid(&self) -> bool {
        true
    }
}

/// Entry stored in one section of archive `A`
pub trait ArchiveItem<A: Archive>: Clone + Serialize + DeserializeOwned {
    /// Fields supplied by the caller on insert
    type Draft: DeserializeOwned;

    /// Section name, as used in messages and on the command line
    const SECTION: &'static str;

    fn id(&self) -> &str;

    /// Title or name shown in listings
    fn label(&self) -> &str;

    /// Complete a draft with an id and the current time
    fn build(id: String, now_ms: i64, draft: Self::Draft) -> Self;

    /// Stamp an entry that is being replaced
    fn touch(&mut self, _now_ms: i64) {}

    fn is_valid(&self) -> bool {
        !self.label().is_empty()
    }

    fn section(archive: &A) -> &[Self];

    fn section_mut(archive: &mut A) -> &mut Vec<Self>;

    /// Place a new entry in its section
    fn insert(section: &mut Vec<Self>, item: Self) {
        section.push(item);
    }
}

/// An archive bound to its backing store
pub struct LocalArchive<A: Archive> {
    store: Box<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    data: A,
}

impl<A: Archive> LocalArchive<A> {
    /// Load the archive from `store`, starting empty if nothing usable is stored
    pub fn open<S: KeyValueStore + 'static>(store: S, clock: Arc<dyn Clock>) -> Result<Self> {
        let data = match store.get(A::KEY)? {
            Some(raw) => match serde_json::from_str::<A>(&raw) {
                Ok(data) if data.is_valid() => data,
                Ok(_) => {
                    warn!("Ignoring {}: stored entries failed validation", A::KEY);
                    A::default()
                }
                Err(e) => {
                    warn!("Ignoring unreadable {}: {}", A::KEY, e);
                    A::default()
                }
            },
            None => A::default(),
        };

        Ok(Self {
            store: Box::new(store),
            clock,
            data,
        })
    }

    pub fn data(&self) -> &A {
        &self.data
    }

    /// Entries of one section, in stored order
    pub fn items<T: ArchiveItem<A>>(&self) -> &[T] {
        T::section(&self.data)
    }

    pub fn get<T: ArchiveItem<A>>(&self, id: &str) -> Option<&T> {
        self.items::<T>().iter().find(|item| item.id() == id)
    }

    /// Add an entry with a fresh id and timestamp (ALPHA only)
    pub fn add<T: ArchiveItem<A>>(&mut self, level: ClearanceLevel, draft: T::Draft) -> Result<T> {
        ensure_can_modify(level, "add archive entries")?;

        let item = T::build(Uuid::new_v4().to_string(), self.clock.now_millis(), draft);
        check::<A, T>(&item)?;

        let mut next = self.data.clone();
        T::insert(T::section_mut(&mut next), item.clone());
        self.commit(next)?;

        debug!("Added {} entry {}", T::SECTION, item.id());
        Ok(item)
    }

    /// Replace the entry with the same id (ALPHA only)
    pub fn update<T: ArchiveItem<A>>(&mut self, level: ClearanceLevel, mut item: T) -> Result<T> {
        ensure_can_modify(level, "update archive entries")?;

        item.touch(self.clock.now_millis());
        check::<A, T>(&item)?;

        let mut next = self.data.clone();
        let slot = T::section_mut(&mut next)
            .iter_mut()
            .find(|existing| existing.id() == item.id())
            .ok_or_else(|| not_found::<A, T>(item.id()))?;
        *slot = item.clone();
        self.commit(next)?;

        debug!("Updated {} entry {}", T::SECTION, item.id());
        Ok(item)
    }

    /// Merge a JSON object into an existing entry (ALPHA only)
    ///
    /// The entry keeps its id whatever the patch says.
    pub fn patch<T: ArchiveItem<A>>(&mut self, level: ClearanceLevel, id: &str, patch: Value) -> Result<T> {
        ensure_can_modify(level, "update archive entries")?;

        let current = self.get::<T>(id).ok_or_else(|| not_found::<A, T>(id))?;
        let Value::Object(fields) = patch else {
            return Err(ConsoleError::Validation("Patch must be a JSON object".to_string()));
        };

        let mut merged = serde_json::to_value(current)?;
        if let Value::Object(target) = &mut merged {
            target.extend(fields);
            target.insert("id".to_string(), Value::String(id.to_string()));
        }
        let item: T = serde_json::from_value(merged)?;
        self.update(level, item)
    }

    /// Remove an entry by id (ALPHA only)
    pub fn remove<T: ArchiveItem<A>>(&mut self, level: ClearanceLevel, id: &str) -> Result<()> {
        ensure_can_modify(level, "remove archive entries")?;

        let mut next = self.data.clone();
        let section = T::section_mut(&mut next);
        let before = section.len();
        section.retain(|item| item.id() != id);
        if section.len() == before {
            return Err(not_found::<A, T>(id));
        }
        self.commit(next)?;

        debug!("Removed {} entry {}", T::SECTION, id);
        Ok(())
    }

    fn commit(&mut self, next: A) -> Result<()> {
        let json = serde_json::to_string(&next)?;
        self.store.set(A::KEY, &json)?;
        self.data = next;
        Ok(())
    }
}

fn check<A: Archive, T: ArchiveItem<A>>(item: &T) -> Result<()> {
    if item.is_valid() {
        Ok(())
    } else {
        Err(ConsoleError::Validation(format!(
            "{} entry needs a title or name",
            T::SECTION
        )))
    }
}

fn not_found<A: Archive, T: ArchiveItem<A>>(id: &str) -> ConsoleError {
    ConsoleError::NotFound {
        table: T::SECTION.to_string(),
        id: id.to_string(),
    }
}

// ==========================================
// DCCU vault
// ==========================================

/// Entry of the DCCU vault: an id and creation time around a section body
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry<B> {
    pub id: String,
    #[serde(flatten)]
    pub body: B,
    /// Unix milliseconds
    pub created_at: i64,
}

/// Body of one DCCU section
pub trait Section: Clone + Serialize + DeserializeOwned {
    const NAME: &'static str;

    fn label(&self) -> &str;

    fn entries(archive: &DccuArchive) -> &[Entry<Self>];

    fn entries_mut(archive: &mut DccuArchive) -> &mut Vec<Entry<Self>>;
}

impl<B: Section> ArchiveItem<DccuArchive> for Entry<B> {
    type Draft = B;
    const SECTION: &'static str = B::NAME;

    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> &str {
        self.body.label()
    }

    fn build(id: String, now_ms: i64, draft: B) -> Self {
        Entry {
            id,
            body: draft,
            created_at: now_ms,
        }
    }

    fn section(archive: &DccuArchive) -> &[Self] {
        B::entries(archive)
    }

    fn section_mut(archive: &mut DccuArchive) -> &mut Vec<Self> {
        B::entries_mut(archive)
    }
}

/// The DCCU vault
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DccuArchive {
    pub movies: Vec<Entry<FilmNotes>>,
    pub suits: Vec<Entry<Suit>>,
    pub characters: Vec<Entry<Profile>>,
    pub artifacts: Vec<Entry<Artifact>>,
    pub futures: Vec<Entry<Future>>,
    pub timeline: Vec<Entry<TimelineEvent>>,
    pub alpha_notes: Vec<Entry<AlphaNote>>,
}

fn labelled<B: Section>(entries: &[Entry<B>]) -> bool {
    entries.iter().all(|entry| !entry.body.label().is_empty())
}

impl Archive for DccuArchive {
    const KEY: &'static str = DCCU_KEY;

    fn is_valid(&self) -> bool {
        labelled(&self.movies)
            && labelled(&self.suits)
            && labelled(&self.characters)
            && labelled(&self.artifacts)
            && labelled(&self.futures)
            && labelled(&self.timeline)
            && labelled(&self.alpha_notes)
    }
}

macro_rules! section {
    ($body:ty, $name:literal, $field:ident, $label:ident) => {
        impl Section for $body {
            const NAME: &'static str = $name;

            fn label(&self) -> &str {
                &self.$label
            }

            fn entries(archive: &DccuArchive) -> &[Entry<Self>] {
                &archive.$field
            }

            fn entries_mut(archive: &mut DccuArchive) -> &mut Vec<Entry<Self>> {
                &mut archive.$field
            }
        }
    };
}

/// How a film is written up
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilmFormat {
    #[default]
    Summary,
    Screenplay,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilmNotes {
    pub title: String,
    #[serde(default)]
    pub kind: FilmFormat,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub screenplay: String,
}

fn first_version() -> String {
    "v1".to_string()
}

fn unit_scale() -> f64 {
    1.0
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suit {
    pub name: String,
    #[serde(default = "first_version")]
    pub version: String,
    #[serde(default)]
    pub notes: String,
    /// Data URL of the suit render
    #[serde(default)]
    pub image_data: String,
    #[serde(default = "unit_scale")]
    pub image_scale: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub bio: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Future {
    pub title: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// Free-form in-universe date
    #[serde(default)]
    pub date: String,
    pub title: String,
    #[serde(default)]
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlphaNote {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

section!(FilmNotes, "movies", movies, title);
section!(Suit, "suits", suits, name);
section!(Profile, "characters", characters, name);
section!(Artifact, "artifacts", artifacts, name);
section!(Future, "futures", futures, title);
section!(TimelineEvent, "timeline", timeline, title);
section!(AlphaNote, "alpha-notes", alpha_notes, title);

// ==========================================
// Creator documents
// ==========================================

/// Creator document; newest first
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doc {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// Unix milliseconds of the last save
    pub updated_at: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewDoc {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// Every creator document
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CreatorDocs(pub Vec<Doc>);

impl Archive for CreatorDocs {
    const KEY: &'static str = CREATOR_DOCS_KEY;
}

impl ArchiveItem<CreatorDocs> for Doc {
    type Draft = NewDoc;
    const SECTION: &'static str = "docs";

    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> &str {
        &self.title
    }

    fn build(id: String, now_ms: i64, draft: NewDoc) -> Self {
        let title = if draft.title.trim().is_empty() {
            UNTITLED.to_string()
        } else {
            draft.title
        };
        Doc {
            id,
            title,
            content: draft.content,
            updated_at: now_ms,
        }
    }

    fn touch(&mut self, now_ms: i64) {
        self.updated_at = now_ms;
    }

    // Documents may be saved with a blank title
    fn is_valid(&self) -> bool {
        true
    }

    fn section(archive: &CreatorDocs) -> &[Self] {
        &archive.0
    }

    fn section_mut(archive: &mut CreatorDocs) -> &mut Vec<Self> {
        &mut archive.0
    }

    fn insert(section: &mut Vec<Self>, item: Self) {
        section.insert(0, item);
    }
}
