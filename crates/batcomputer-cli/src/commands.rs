//! Command handlers

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use batcomputer_core::archive::{
    AlphaNote, Archive, ArchiveItem, Artifact, Doc, Entry, FilmNotes, Future, Profile, Suit,
    TimelineEvent, ARCHIVE_FILE_NAME,
};
use batcomputer_core::auth::{LockState, SystemClock};
use batcomputer_core::credentials::hash_secret as argon2_hash;
use batcomputer_core::records::{Character, Location, Module, Movie, Technology};
use batcomputer_core::{
    guard, AuthService, Classified, ClearanceLevel, ConsoleConfig, ConsoleError, CreatorDocs,
    DccuArchive, FileStore, LocalArchive, Record, RecordKind, RouteDecision, Session,
};
use batcomputer_data::{Dataset, RecordStore, RestRecordStore};
use batcomputer_relay::{serve, ChatMessage, Relay};
use tracing::debug;

use crate::{ArchiveSection, RecordAction};

/// Open the gate persisted under `data_dir`
pub(crate) fn open_gate(data_dir: &Path) -> Result<AuthService> {
    let config = ConsoleConfig::load(data_dir)
        .with_context(|| format!("Failed to load config from {}", data_dir.display()))?;
    let store = FileStore::in_dir(data_dir).map_err(ConsoleError::from)?;
    let credentials = config.credential_table().map_err(ConsoleError::from)?;

    let gate = AuthService::with_options(
        store,
        Arc::new(SystemClock),
        credentials,
        config.lockout.clone(),
    )
    .map_err(ConsoleError::from)?;
    Ok(gate)
}

pub(crate) fn login(data_dir: &Path, username: &str, secret: &str) -> Result<()> {
    let mut gate = open_gate(data_dir)?;
    let mut events = gate.subscribe();

    let result = gate.login(username, secret);
    while let Ok(event) = events.try_recv() {
        println!("{}", event.announcement);
    }
    let session = result.map_err(ConsoleError::from)?;

    if gate.consume_just_authenticated() {
        println!("Codename: {}", session.codename);
        println!("Clearance: {}", session.level);
    }
    Ok(())
}

pub(crate) fn logout(data_dir: &Path) -> Result<()> {
    let mut gate = open_gate(data_dir)?;
    let mut events = gate.subscribe();
    gate.logout().map_err(ConsoleError::from)?;

    while let Ok(event) = events.try_recv() {
        println!("{}", event.announcement);
    }
    Ok(())
}

pub(crate) fn status(data_dir: &Path) -> Result<()> {
    let gate = open_gate(data_dir)?;
    print!("{}", render_status(&gate));
    Ok(())
}

fn render_status(gate: &AuthService) -> String {
    let mut out = String::new();
    match gate.session() {
        Some(session) => {
            out.push_str("Session:\n");
            out.push_str(&format!("  Operator: {}\n", session.username));
            out.push_str(&format!("  Codename: {}\n", session.codename));
            out.push_str(&format!("  Clearance: {}\n", session.level));
            if let Some(issued) = session.issued_at_utc() {
                out.push_str(&format!("  Since: {}\n", issued.format("%Y-%m-%d %H:%M:%S UTC")));
            }
            out.push_str(&format!(
                "  Can modify records: {}\n",
                if session.can_modify() { "yes" } else { "no" }
            ));
        }
        None => out.push_str("Session: none\n"),
    }

    out.push_str("\nLockout:\n");
    out.push_str(&format!("  Consecutive failures: {}\n", gate.failure_count()));
    match gate.lock_state() {
        LockState::Locked { .. } => {
            let remaining = gate.lockout_remaining().unwrap_or_default();
            out.push_str(&format!(
                "  Locked: {}s remaining\n",
                remaining.as_millis().div_ceil(1000)
            ));
        }
        LockState::Unlocked => {
            out.push_str("  Locked: no\n");
            out.push_str(&format!(
                "  Policy: {}\n",
                gate.policy().describe_lockout(gate.failure_count())
            ));
        }
    }
    out
}

pub(crate) fn route(data_dir: &Path, path: &str) -> Result<()> {
    let gate = open_gate(data_dir)?;
    match guard(path, gate.session()) {
        RouteDecision::Render(route) => println!("render {}", route),
        RouteDecision::RedirectToLogin => println!("redirect /login"),
        RouteDecision::NotFound => println!("not found"),
    }
    Ok(())
}

pub(crate) async fn records(data_dir: &Path, kind: RecordKind, action: RecordAction) -> Result<()> {
    let config = ConsoleConfig::load(data_dir)?;
    let store = remote_store(&config)?;

    let gate = open_gate(data_dir)?;
    let session = gate.session();
    debug!("Opening {} at {:?}", kind, session.map(|s| s.level));

    match kind {
        RecordKind::Module => run_records::<Module>(store, session, action).await,
        RecordKind::Movie => run_records::<Movie>(store, session, action).await,
        RecordKind::Character => run_records::<Character>(store, session, action).await,
        RecordKind::Location => run_records::<Location>(store, session, action).await,
        RecordKind::Technology => run_records::<Technology>(store, session, action).await,
    }
}

/// REST store named by the config
fn remote_store(config: &ConsoleConfig) -> Result<Arc<dyn RecordStore>, ConsoleError> {
    let (url, key) = config.store.endpoint().ok_or_else(|| {
        ConsoleError::Config(
            "Remote store not configured. Set SUPABASE_URL and SUPABASE_ANON_KEY.".to_string(),
        )
    })?;
    Ok(Arc::new(RestRecordStore::new(url, key)))
}

async fn run_records<T: Record>(
    store: Arc<dyn RecordStore>,
    session: Option<&Session>,
    action: RecordAction,
) -> Result<()> {
    let mut dataset: Dataset<T> = Dataset::for_session(store, session);

    match action {
        RecordAction::List => {
            let rows = dataset.refetch().await?;
            if rows.is_empty() {
                println!("No {} visible at {} clearance", T::KIND, dataset.level());
            }
            for row in dataset.data() {
                println!("{:<36}  {:<5}  {}", row.id(), row.clearance_level(), row.label());
            }
        }
        RecordAction::Add { json } => {
            let draft: T::Draft = serde_json::from_str(&json).map_err(ConsoleError::from)?;
            let record = dataset.insert(&draft).await?;
            println!("Inserted {} ({})", record.id(), record.label());
        }
        RecordAction::Update { id, json } => {
            let patch: serde_json::Value =
                serde_json::from_str(&json).map_err(ConsoleError::from)?;
            let record = dataset.update(&id, patch).await?;
            println!("Updated {} ({})", record.id(), record.label());
        }
        RecordAction::Delete { id } => {
            dataset.delete(&id).await?;
            println!("Deleted {}", id);
        }
    }
    Ok(())
}

pub(crate) fn archive(data_dir: &Path, section: ArchiveSection, action: RecordAction) -> Result<()> {
    let gate = open_gate(data_dir)?;
    let level = gate.level().unwrap_or(ClearanceLevel::Delta);

    match section {
        ArchiveSection::Movies => {
            run_archive::<DccuArchive, Entry<FilmNotes>>(open_archive(data_dir)?, level, action)
        }
        ArchiveSection::Suits => {
            run_archive::<DccuArchive, Entry<Suit>>(open_archive(data_dir)?, level, action)
        }
        ArchiveSection::Characters => {
            run_archive::<DccuArchive, Entry<Profile>>(open_archive(data_dir)?, level, action)
        }
        ArchiveSection::Artifacts => {
            run_archive::<DccuArchive, Entry<Artifact>>(open_archive(data_dir)?, level, action)
        }
        ArchiveSection::Futures => {
            run_archive::<DccuArchive, Entry<Future>>(open_archive(data_dir)?, level, action)
        }
        ArchiveSection::Timeline => {
            run_archive::<DccuArchive, Entry<TimelineEvent>>(open_archive(data_dir)?, level, action)
        }
        ArchiveSection::AlphaNotes => {
            run_archive::<DccuArchive, Entry<AlphaNote>>(open_archive(data_dir)?, level, action)
        }
        ArchiveSection::Docs => {
            run_archive::<CreatorDocs, Doc>(open_archive(data_dir)?, level, action)
        }
    }
}

fn open_archive<A: Archive>(data_dir: &Path) -> Result<LocalArchive<A>> {
    let store = FileStore::open(data_dir.join(ARCHIVE_FILE_NAME)).map_err(ConsoleError::from)?;
    Ok(LocalArchive::open(store, Arc::new(SystemClock))?)
}

fn run_archive<A: Archive, T: ArchiveItem<A>>(
    mut archive: LocalArchive<A>,
    level: ClearanceLevel,
    action: RecordAction,
) -> Result<()> {
    match action {
        RecordAction::List => {
            if archive.items::<T>().is_empty() {
                println!("No {} archived", T::SECTION);
            }
            for item in archive.items::<T>() {
                println!("{:<36}  {}", item.id(), item.label());
            }
        }
        RecordAction::Add { json } => {
            let draft: T::Draft = serde_json::from_str(&json).map_err(ConsoleError::from)?;
            let item: T = archive.add(level, draft)?;
            println!("Archived {} ({})", item.id(), item.label());
        }
        RecordAction::Update { id, json } => {
            let patch: serde_json::Value =
                serde_json::from_str(&json).map_err(ConsoleError::from)?;
            let item: T = archive.patch(level, &id, patch)?;
            println!("Updated {} ({})", item.id(), item.label());
        }
        RecordAction::Delete { id } => {
            archive.remove::<T>(level, &id)?;
            println!("Removed {}", id);
        }
    }
    Ok(())
}

pub(crate) async fn chat(message: &str) -> Result<()> {
    let relay = Relay::from_env();
    let reply = relay.complete(&[ChatMessage::user(message)]).await?;
    println!("{}", reply);
    Ok(())
}

pub(crate) async fn serve_relay(bind: SocketAddr) -> Result<()> {
    let relay = Arc::new(Relay::from_env());
    serve(relay, bind)
        .await
        .with_context(|| format!("Relay server on {} stopped", bind))
}

pub(crate) fn hash_secret(secret: &str) -> Result<()> {
    let hash = argon2_hash(secret).map_err(ConsoleError::from)?;
    println!("{}", hash);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_persists_across_invocations() {
        let dir = tempfile::tempdir().unwrap();

        login(dir.path(), "oracle", "ShadowLock").unwrap();
        let gate = open_gate(dir.path()).unwrap();
        assert_eq!(gate.level(), Some(ClearanceLevel::Beta));

        logout(dir.path()).unwrap();
        assert!(open_gate(dir.path()).unwrap().session().is_none());
    }

    #[test]
    fn test_failed_login_is_typed() {
        let dir = tempfile::tempdir().unwrap();
        let err = login(dir.path(), "oracle", "Penguin").unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConsoleError>().map(ConsoleError::kind),
            Some(batcomputer_core::ErrorKind::Invalid)
        );
        assert_eq!(open_gate(dir.path()).unwrap().failure_count(), 1);
    }

    #[test]
    fn test_hashed_credentials_file() {
        let dir = tempfile::tempdir().unwrap();
        let table = dir.path().join("credentials.toml");
        let mut contents = String::new();
        for (level, secret) in [("DELTA", "a1"), ("GAMMA", "b2"), ("BETA", "c3"), ("ALPHA", "d4")] {
            contents.push_str(&format!(
                "[[credential]]\nlevel = \"{}\"\nhash = \"{}\"\n\n",
                level,
                argon2_hash(secret).unwrap()
            ));
        }
        std::fs::write(&table, contents).unwrap();

        let config = ConsoleConfig {
            credentials_file: Some(table),
            ..ConsoleConfig::default()
        };
        config.save(dir.path()).unwrap();

        login(dir.path(), "op", "d4").unwrap();
        assert_eq!(open_gate(dir.path()).unwrap().level(), Some(ClearanceLevel::Alpha));
        assert!(login(dir.path(), "op", "Brother_Eye").is_err());
    }

    #[test]
    fn test_records_require_store_config() {
        let err = remote_store(&ConsoleConfig::default()).err();
        assert_eq!(
            err.as_ref().map(ConsoleError::kind),
            Some(batcomputer_core::ErrorKind::Config)
        );

        let mut config = ConsoleConfig::default();
        config.store.url = Some("https://cave.example.co".to_string());
        config.store.anon_key = Some("anon".to_string());
        assert!(remote_store(&config).is_ok());
    }

    #[test]
    fn test_status_describes_lockout_policy() {
        let dir = tempfile::tempdir().unwrap();
        let _ = login(dir.path(), "op", "Scarecrow");

        let rendered = render_status(&open_gate(dir.path()).unwrap());
        assert!(rendered.contains("Session: none"));
        assert!(rendered.contains("Consecutive failures: 1"));
        assert!(rendered.contains("Policy: lockout after 2 more failures"));

        let _ = login(dir.path(), "op", "Scarecrow");
        let _ = login(dir.path(), "op", "Scarecrow");
        let rendered = render_status(&open_gate(dir.path()).unwrap());
        assert!(rendered.contains("Locked: 30s remaining"));
        assert!(!rendered.contains("Policy:"));
    }

    #[test]
    fn test_status_shows_session() {
        let dir = tempfile::tempdir().unwrap();
        login(dir.path(), "bruce", "Brother_Eye").unwrap();

        let rendered = render_status(&open_gate(dir.path()).unwrap());
        assert!(rendered.contains("  Codename: Batman\n"));
        assert!(rendered.contains("  Clearance: ALPHA\n"));
        assert!(rendered.contains("  Since: "));
        assert!(rendered.contains(" UTC\n"));
        assert!(rendered.contains("Can modify records: yes"));
    }

    #[test]
    fn test_archive_edits_need_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let add = |json: &str| RecordAction::Add {
            json: json.to_string(),
        };

        login(dir.path(), "oracle", "ShadowLock").unwrap();
        let err = archive(dir.path(), ArchiveSection::AlphaNotes, add(r#"{"title":"Contingency"}"#))
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConsoleError>().map(ConsoleError::kind),
            Some(batcomputer_core::ErrorKind::Forbidden)
        );

        login(dir.path(), "bruce", "Brother_Eye").unwrap();
        archive(dir.path(), ArchiveSection::AlphaNotes, add(r#"{"title":"Contingency"}"#)).unwrap();
        archive(dir.path(), ArchiveSection::Docs, add("{}")).unwrap();

        let vault: LocalArchive<DccuArchive> = open_archive(dir.path()).unwrap();
        assert_eq!(vault.data().alpha_notes.len(), 1);
        assert_eq!(vault.data().alpha_notes[0].body.title, "Contingency");
        let docs: LocalArchive<CreatorDocs> = open_archive(dir.path()).unwrap();
        assert_eq!(docs.items::<Doc>()[0].title, "Untitled");
    }
}
