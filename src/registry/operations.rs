use std::time::SystemTime;

use anyhow::anyhow;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};

use crate::{
    config::{self, Limits},
    domain::{
        ValidationError,
        id::TrackId,
        principal::Principal,
        text::validate_ascii,
        track::{EventKind, LicenseTerms, Track, TrackEvent, price_to_sql},
    },
    registry::{
        db::{self, system_time_to_i64},
        error::RegistryError,
        schema::{columns, counters::LAST_TRACK_ID, tables},
    },
};

use columns::*;
use tables::*;

/// Owns all track records and applies registry operations.
///
/// Every operation runs in its own transaction, so a failed call leaves no trace.
pub struct Registry {
    pub(crate) db: rusqlite::Connection,
    limits: Limits,
}

impl Registry {
    /// when called, opens a data base connection
    pub fn new(db_config: &config::Database, limits: Limits) -> Result<Self, RegistryError> {
        let db = db::open(db_config)?;
        Ok(Self::from_existing_conn(db, limits))
    }

    pub fn from_existing_conn(db: rusqlite::Connection, limits: Limits) -> Self {
        Self { db, limits }
    }

    /// Stores a new track owned by `sender` under the next sequential id
    pub fn register(
        &mut self,
        sender: &Principal,
        title: &str,
        artist: &str,
        license_type: &str,
        price: u64,
    ) -> Result<TrackId, RegistryError> {
        validate_ascii("title", title, self.limits.max_title_len)?;
        validate_ascii("artist", artist, self.limits.max_artist_len)?;
        self.validate_license(license_type, price)?;

        let tx = self.db.transaction()?;

        let id = last_track_id(&tx)?.next();
        tx.execute(
            &format!(
                "INSERT INTO {TRACKS} ({TRACK_ID}, {TITLE}, {ARTIST}, {OWNER}, {LICENSE_TYPE}, {PRICE})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
            ),
            params![
                id.to_sql()?,
                title,
                artist,
                sender.as_str(),
                license_type,
                price_to_sql(price)?
            ],
        )?;
        tx.execute(
            &format!("UPDATE {COUNTERS} SET {VALUE} = ?1 WHERE {NAME} = ?2"),
            params![id.to_sql()?, LAST_TRACK_ID],
        )?;
        record_event(
            &tx,
            id,
            EventKind::Register,
            sender,
            &format!("\"{title}\" by {artist}, {license_type} @ {price}"),
        )?;

        tx.commit()?;
        log::info!("track {id} registered by {sender}");
        Ok(id)
    }

    /// Hands the track over to `new_owner`. Only the current owner may do this.
    pub fn transfer(
        &mut self,
        sender: &Principal,
        id: TrackId,
        new_owner: &Principal,
    ) -> Result<(), RegistryError> {
        let tx = self.db.transaction()?;

        let track = require_owner(&tx, id, sender).inspect_err(|e| warn_rejected("transfer", e))?;
        tx.execute(
            &format!("UPDATE {TRACKS} SET {OWNER} = ?1 WHERE {TRACK_ID} = ?2"),
            params![new_owner.as_str(), id.to_sql()?],
        )?;
        record_event(
            &tx,
            id,
            EventKind::Transfer,
            sender,
            &format!("{} -> {new_owner}", track.owner),
        )?;

        tx.commit()?;
        log::info!("track {id} transferred from {sender} to {new_owner}");
        Ok(())
    }

    /// Overwrites license type and price. Only the current owner may do this.
    pub fn update_license(
        &mut self,
        sender: &Principal,
        id: TrackId,
        license_type: &str,
        price: u64,
    ) -> Result<(), RegistryError> {
        self.validate_license(license_type, price)?;

        let tx = self.db.transaction()?;

        require_owner(&tx, id, sender).inspect_err(|e| warn_rejected("update-license", e))?;
        tx.execute(
            &format!("UPDATE {TRACKS} SET {LICENSE_TYPE} = ?1, {PRICE} = ?2 WHERE {TRACK_ID} = ?3"),
            params![license_type, price_to_sql(price)?, id.to_sql()?],
        )?;
        record_event(
            &tx,
            id,
            EventKind::UpdateLicense,
            sender,
            &format!("{license_type} @ {price}"),
        )?;

        tx.commit()?;
        log::info!("track {id} relicensed by {sender}: {license_type} @ {price}");
        Ok(())
    }

    /// Full record of the track, `None` when no track has this id
    pub fn get_track_info(&self, id: TrackId) -> Result<Option<Track>, RegistryError> {
        log::debug!("get-track-info {id}");
        if id.is_reserved() {
            return Ok(None);
        }
        let Ok(id_sql) = id.to_sql() else {
            return Ok(None);
        };

        self.db
            .query_row(
                &format!(
                    "SELECT {TRACK_ID}, {TITLE}, {ARTIST}, {OWNER}, {LICENSE_TYPE}, {PRICE}
                     FROM {TRACKS} WHERE {TRACK_ID} = ?1"
                ),
                params![id_sql],
                track_row,
            )
            .optional()?
            .transpose()
    }

    /// number of tracks ever registered, which is also the last assigned id
    pub fn track_count(&self) -> Result<u64, RegistryError> {
        let TrackId(count) = last_track_id(&self.db)?;
        Ok(count)
    }

    /// All tracks in id order, optionally only those owned by `owner`
    pub fn list_tracks(&self, owner: Option<&Principal>) -> Result<Vec<Track>, RegistryError> {
        let mut stmt = self.db.prepare(&format!(
            "SELECT {TRACK_ID}, {TITLE}, {ARTIST}, {OWNER}, {LICENSE_TYPE}, {PRICE}
             FROM {TRACKS}
             WHERE ?1 IS NULL OR {OWNER} = ?1
             ORDER BY {TRACK_ID}"
        ))?;

        let tracks = stmt
            .query_map(params![owner.map(Principal::as_str)], track_row)?
            .collect::<Result<Vec<_>, _>>()?;

        tracks.into_iter().collect()
    }

    /// Applied mutations of a track, oldest first
    pub fn history(&self, id: TrackId) -> Result<Vec<TrackEvent>, RegistryError> {
        if self.get_track_info(id)?.is_none() {
            return Err(RegistryError::NotFound(id));
        }

        let mut stmt = self.db.prepare(&format!(
            "SELECT {SEQ}, {TRACK_ID}, {KIND}, {SENDER}, {DETAIL}, {RECORDED_AT}
             FROM {EVENTS} WHERE {TRACK_ID} = ?1 ORDER BY {SEQ}"
        ))?;

        let events = stmt
            .query_map(params![id.to_sql()?], event_row)?
            .collect::<Result<Vec<_>, _>>()?;

        events.into_iter().collect()
    }

    fn validate_license(&self, license_type: &str, price: u64) -> Result<(), ValidationError> {
        validate_ascii(
            "license type",
            license_type,
            self.limits.max_license_type_len,
        )?;
        price_to_sql(price)?;
        Ok(())
    }
}

/// Loads the track and checks that `sender` currently owns it.
///
/// A missing track is reported before ownership.
fn require_owner(
    tx: &Transaction,
    id: TrackId,
    sender: &Principal,
) -> Result<Track, RegistryError> {
    let Ok(id_sql) = id.to_sql() else {
        return Err(RegistryError::NotFound(id));
    };

    let track = tx
        .query_row(
            &format!(
                "SELECT {TRACK_ID}, {TITLE}, {ARTIST}, {OWNER}, {LICENSE_TYPE}, {PRICE}
                 FROM {TRACKS} WHERE {TRACK_ID} = ?1"
            ),
            params![id_sql],
            track_row,
        )
        .optional()?
        .transpose()?
        .ok_or(RegistryError::NotFound(id))?;

    if &track.owner != sender {
        return Err(RegistryError::NotAuthorized {
            track: id,
            sender: sender.clone(),
        });
    }
    Ok(track)
}

fn last_track_id(conn: &Connection) -> Result<TrackId, RegistryError> {
    let value: i64 = conn.query_row(
        &format!("SELECT {VALUE} FROM {COUNTERS} WHERE {NAME} = ?1"),
        params![LAST_TRACK_ID],
        |row| row.get(0),
    )?;
    u64::try_from(value)
        .map(TrackId)
        .map_err(|_| RegistryError::Internal(anyhow!("counter {LAST_TRACK_ID} is negative: {value}")))
}

fn record_event(
    tx: &Transaction,
    id: TrackId,
    kind: EventKind,
    sender: &Principal,
    detail: &str,
) -> Result<(), RegistryError> {
    let now = system_time_to_i64(SystemTime::now())?;
    tx.execute(
        &format!(
            "INSERT INTO {EVENTS} ({TRACK_ID}, {KIND}, {SENDER}, {DETAIL}, {RECORDED_AT})
             VALUES (?1, ?2, ?3, ?4, ?5)"
        ),
        params![id.to_sql()?, kind.as_str(), sender.as_str(), detail, now],
    )?;
    Ok(())
}

fn warn_rejected(operation: &str, err: &RegistryError) {
    log::warn!("{operation} rejected: {err}");
}

/// Maps a row of the tracks table.
///
/// The outer result carries sqlite errors, the inner one malformed stored values.
fn track_row(row: &Row) -> rusqlite::Result<Result<Track, RegistryError>> {
    let id: i64 = row.get(0)?;
    let title: String = row.get(1)?;
    let artist: String = row.get(2)?;
    let owner: String = row.get(3)?;
    let license_type: String = row.get(4)?;
    let price: i64 = row.get(5)?;

    Ok((|| -> Result<Track, RegistryError> {
        Ok(Track {
            id: TrackId(u64::try_from(id).map_err(|_| anyhow!("stored track id {id} is negative"))?),
            title,
            artist,
            owner: Principal::new(owner)
                .map_err(|e| anyhow!("track {id} has a malformed owner: {e}"))?,
            license: LicenseTerms::new(
                license_type,
                u64::try_from(price).map_err(|_| anyhow!("track {id} has negative price"))?,
            ),
        })
    })())
}

fn event_row(row: &Row) -> rusqlite::Result<Result<TrackEvent, RegistryError>> {
    let seq: i64 = row.get(0)?;
    let track_id: i64 = row.get(1)?;
    let kind: String = row.get(2)?;
    let sender: String = row.get(3)?;
    let detail: String = row.get(4)?;
    let recorded_at: i64 = row.get(5)?;

    Ok((|| -> Result<TrackEvent, RegistryError> {
        Ok(TrackEvent {
            seq: u64::try_from(seq).map_err(|_| anyhow!("negative event seq {seq}"))?,
            track_id: TrackId(
                u64::try_from(track_id).map_err(|_| anyhow!("negative track id {track_id}"))?,
            ),
            kind: kind.parse()?,
            sender: Principal::new(sender)
                .map_err(|e| anyhow!("event {seq} has a malformed sender: {e}"))?,
            detail,
            recorded_at,
        })
    })())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::schema;

    fn deployer() -> Principal {
        Principal::new("ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM").unwrap()
    }

    fn wallet1() -> Principal {
        Principal::new("ST1SJ3DTE5DN7X54YDH5D64R3BCB6A2AG2ZQ8YPD5").unwrap()
    }

    fn wallet2() -> Principal {
        Principal::new("ST2CY5V39NHDPWSXMW9QDT3HC3GD6Q6XX4CFRK9AG").unwrap()
    }

    fn setup_registry() -> anyhow::Result<Registry> {
        let conn = Connection::open_in_memory()?;
        schema::init(&conn)?;
        Ok(Registry::from_existing_conn(conn, Limits::default()))
    }

    fn register_test_song(registry: &mut Registry) -> Result<TrackId, RegistryError> {
        registry.register(
            &deployer(),
            "Test Song",
            "Test Artist",
            "Standard License",
            1000,
        )
    }

    fn event_count(registry: &Registry) -> anyhow::Result<i64> {
        Ok(registry
            .db
            .query_row(&format!("SELECT COUNT(*) FROM {EVENTS}"), [], |row| {
                row.get(0)
            })?)
    }

    #[test]
    fn test_register_returns_first_id_and_stores_fields() -> anyhow::Result<()> {
        let mut registry = setup_registry()?;

        let id = register_test_song(&mut registry)?;
        assert_eq!(id, TrackId(1));

        let track = registry.get_track_info(id)?.unwrap();
        assert_eq!(track.id, id);
        assert_eq!(track.title, "Test Song");
        assert_eq!(track.artist, "Test Artist");
        assert_eq!(track.owner, deployer());
        assert_eq!(track.license, LicenseTerms::new("Standard License", 1000));

        Ok(())
    }

    #[test]
    fn test_register_ids_strictly_increase() -> anyhow::Result<()> {
        let mut registry = setup_registry()?;

        let ids = (0..5)
            .map(|i| {
                registry.register(&wallet1(), &format!("Song {i}"), "Artist", "Standard", i)
            })
            .collect::<Result<Vec<_>, _>>()?;

        assert_eq!(ids, (1..=5).map(TrackId).collect::<Vec<_>>());
        assert_eq!(registry.track_count()?, 5);

        for (i, id) in ids.iter().enumerate() {
            let track = registry.get_track_info(*id)?.unwrap();
            assert_eq!(track.title, format!("Song {i}"));
            assert_eq!(track.owner, wallet1());
        }

        Ok(())
    }

    #[test]
    fn test_register_rejects_invalid_input_without_consuming_id() -> anyhow::Result<()> {
        let mut registry = setup_registry()?;

        let too_long = "x".repeat(Limits::default().max_title_len + 1);
        let rejected = [
            registry.register(&deployer(), "", "Artist", "Standard", 1),
            registry.register(&deployer(), &too_long, "Artist", "Standard", 1),
            registry.register(&deployer(), "Song", "Sigur Rós", "Standard", 1),
            registry.register(&deployer(), "Song", "Artist", "", 1),
            registry.register(&deployer(), "Song", "Artist", "Standard", u64::MAX),
        ];
        for result in rejected {
            assert!(matches!(result, Err(RegistryError::InvalidInput(_))));
        }

        assert_eq!(registry.track_count()?, 0);
        assert_eq!(event_count(&registry)?, 0);
        assert_eq!(register_test_song(&mut registry)?, TrackId(1));

        Ok(())
    }

    #[test]
    fn test_ids_are_not_reused_after_reopen() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config = config::Database::on_disk(dir.path().join("sonic_chain.db"));

        {
            let mut registry = Registry::new(&config, Limits::default())?;
            register_test_song(&mut registry)?;
            register_test_song(&mut registry)?;
        }

        let mut registry = Registry::new(&config, Limits::default())?;
        assert_eq!(registry.track_count()?, 2);
        assert_eq!(register_test_song(&mut registry)?, TrackId(3));

        Ok(())
    }

    #[test]
    fn test_id_follows_counter_not_row_count() -> anyhow::Result<()> {
        let mut registry = setup_registry()?;
        registry.db.execute(
            &format!("UPDATE {COUNTERS} SET {VALUE} = 41 WHERE {NAME} = ?1"),
            params![LAST_TRACK_ID],
        )?;

        assert_eq!(register_test_song(&mut registry)?, TrackId(42));
        assert!(registry.get_track_info(TrackId(1))?.is_none());

        Ok(())
    }

    #[test]
    fn test_transfer_changes_owner() -> anyhow::Result<()> {
        let mut registry = setup_registry()?;
        let id = register_test_song(&mut registry)?;

        registry.transfer(&deployer(), id, &wallet1())?;

        let track = registry.get_track_info(id)?.unwrap();
        assert_eq!(track.owner, wallet1());
        assert_eq!(track.title, "Test Song");
        assert_eq!(track.license, LicenseTerms::new("Standard License", 1000));

        // the new owner can pass it on, the old one no longer can
        assert!(matches!(
            registry.transfer(&deployer(), id, &wallet2()),
            Err(RegistryError::NotAuthorized { .. })
        ));
        registry.transfer(&wallet1(), id, &wallet2())?;
        assert_eq!(registry.get_track_info(id)?.unwrap().owner, wallet2());

        Ok(())
    }

    #[test]
    fn test_transfer_by_non_owner_fails_and_changes_nothing() -> anyhow::Result<()> {
        let mut registry = setup_registry()?;
        let id = register_test_song(&mut registry)?;
        let before = registry.get_track_info(id)?;
        let events_before = event_count(&registry)?;

        let err = registry.transfer(&wallet1(), id, &wallet1()).unwrap_err();
        match err {
            RegistryError::NotAuthorized { track, sender } => {
                assert_eq!(track, id);
                assert_eq!(sender, wallet1());
            }
            other => panic!("expected NotAuthorized, got {other:?}"),
        }

        assert_eq!(registry.get_track_info(id)?, before);
        assert_eq!(event_count(&registry)?, events_before);

        Ok(())
    }

    #[test]
    fn test_transfer_unknown_track_is_not_found() -> anyhow::Result<()> {
        let mut registry = setup_registry()?;

        assert!(matches!(
            registry.transfer(&deployer(), TrackId(1), &wallet1()),
            Err(RegistryError::NotFound(TrackId(1)))
        ));
        assert!(matches!(
            registry.transfer(&deployer(), TrackId(u64::MAX), &wallet1()),
            Err(RegistryError::NotFound(_))
        ));

        Ok(())
    }

    #[test]
    fn test_transfer_to_self_succeeds() -> anyhow::Result<()> {
        let mut registry = setup_registry()?;
        let id = register_test_song(&mut registry)?;

        registry.transfer(&deployer(), id, &deployer())?;
        assert_eq!(registry.get_track_info(id)?.unwrap().owner, deployer());
        assert_eq!(registry.history(id)?.len(), 2);

        Ok(())
    }

    #[test]
    fn test_update_license() -> anyhow::Result<()> {
        let mut registry = setup_registry()?;
        let id = register_test_song(&mut registry)?;

        registry.update_license(&deployer(), id, "Premium License", 2000)?;

        let track = registry.get_track_info(id)?.unwrap();
        assert_eq!(track.license.license_type, "Premium License");
        assert_eq!(track.license.price, 2000);
        assert_eq!(track.title, "Test Song");
        assert_eq!(track.artist, "Test Artist");
        assert_eq!(track.owner, deployer());

        // a free license is allowed
        registry.update_license(&deployer(), id, "Creative Commons", 0)?;
        assert_eq!(registry.get_track_info(id)?.unwrap().license.price, 0);

        Ok(())
    }

    #[test]
    fn test_update_license_failures() -> anyhow::Result<()> {
        let mut registry = setup_registry()?;
        let id = register_test_song(&mut registry)?;

        assert!(matches!(
            registry.update_license(&wallet1(), id, "Premium License", 2000),
            Err(RegistryError::NotAuthorized { .. })
        ));
        assert!(matches!(
            registry.update_license(&deployer(), TrackId(2), "Premium License", 2000),
            Err(RegistryError::NotFound(TrackId(2)))
        ));
        assert!(matches!(
            registry.update_license(&deployer(), id, &"L".repeat(33), 2000),
            Err(RegistryError::InvalidInput(ValidationError::TooLong { .. }))
        ));

        let track = registry.get_track_info(id)?.unwrap();
        assert_eq!(track.license, LicenseTerms::new("Standard License", 1000));

        Ok(())
    }

    #[test]
    fn test_not_found_is_reported_before_authorization() -> anyhow::Result<()> {
        let mut registry = setup_registry()?;
        register_test_song(&mut registry)?;

        assert!(matches!(
            registry.update_license(&wallet1(), TrackId(9), "Premium", 1),
            Err(RegistryError::NotFound(TrackId(9)))
        ));

        Ok(())
    }

    #[test]
    fn test_get_track_info_absent() -> anyhow::Result<()> {
        let mut registry = setup_registry()?;
        register_test_song(&mut registry)?;

        assert!(registry.get_track_info(TrackId::RESERVED)?.is_none());
        assert!(registry.get_track_info(TrackId(2))?.is_none());
        assert!(registry.get_track_info(TrackId(u64::MAX))?.is_none());

        Ok(())
    }

    #[test]
    fn test_list_tracks_filters_by_owner() -> anyhow::Result<()> {
        let mut registry = setup_registry()?;
        let first = register_test_song(&mut registry)?;
        let second = register_test_song(&mut registry)?;
        let third = register_test_song(&mut registry)?;
        registry.transfer(&deployer(), second, &wallet1())?;

        let all = registry.list_tracks(None)?;
        assert_eq!(
            all.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![first, second, third]
        );

        let mine = registry.list_tracks(Some(&deployer()))?;
        assert_eq!(
            mine.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![first, third]
        );

        let theirs = registry.list_tracks(Some(&wallet1()))?;
        assert_eq!(theirs.len(), 1);
        assert_eq!(theirs[0].owner, wallet1());

        assert!(registry.list_tracks(Some(&wallet2()))?.is_empty());

        Ok(())
    }

    #[test]
    fn test_history_records_operations_in_order() -> anyhow::Result<()> {
        let mut registry = setup_registry()?;
        let id = register_test_song(&mut registry)?;
        let other = register_test_song(&mut registry)?;
        registry.transfer(&deployer(), id, &wallet1())?;
        registry.update_license(&wallet1(), id, "Premium License", 2000)?;
        let _ = registry.update_license(&deployer(), id, "Stolen", 1);

        let history = registry.history(id)?;
        let kinds = history.iter().map(|e| e.kind).collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![
                EventKind::Register,
                EventKind::Transfer,
                EventKind::UpdateLicense
            ]
        );
        assert!(history.windows(2).all(|w| w[0].seq < w[1].seq));
        assert!(history.iter().all(|e| e.track_id == id));

        assert_eq!(history[0].sender, deployer());
        assert_eq!(history[1].sender, deployer());
        assert!(history[1].detail.contains(wallet1().as_str()));
        assert_eq!(history[2].sender, wallet1());
        assert_eq!(history[2].detail, "Premium License @ 2000");

        assert_eq!(registry.history(other)?.len(), 1);

        Ok(())
    }

    #[test]
    fn test_history_unknown_track() -> anyhow::Result<()> {
        let registry = setup_registry()?;

        assert!(matches!(
            registry.history(TrackId(3)),
            Err(RegistryError::NotFound(TrackId(3)))
        ));

        Ok(())
    }
}
