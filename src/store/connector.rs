//! Fingerprint store operations (component C4): song/fingerprint CRUD over
//! the bounded connection pool. Each operation is one statement (or, for
//! batched operations, one statement per batch) under MySQL's per-statement
//! autocommit — there is no explicit transaction wrapper here. The borrowed
//! connection is always returned to `store::pool::Pool` on scope exit.

use chrono::Utc;
use diesel::dsl::insert_into;
use diesel::prelude::*;
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::store::models::{FingerprintRow, NewSongRow, Song, SongRow};
use crate::store::pool::Pool;
use crate::store::schema::{fingerprints, songs};

pub struct Store {
    pool: Pool,
    batch_size: usize,
}

impl Store {
    pub fn connect(cfg: &StoreConfig) -> Result<Self> {
        Ok(Store {
            pool: Pool::new(cfg)?,
            batch_size: cfg.batch_size,
        })
    }

    pub fn after_fork(&self) {
        self.pool.after_fork();
    }

    /// Creates an unfingerprinted row for `name`/`sha1`, or returns the id of
    /// an existing row with the same `sha1` (idempotent re-ingest).
    pub fn insert_song(&self, name: &str, sha1: [u8; 20], total_hashes: u32) -> Result<Uuid> {
        let mut conn = self.pool.get()?;

        if let Some(existing) = songs::table
            .filter(songs::file_sha1.eq(sha1.to_vec()))
            .select(SongRow::as_select())
            .first(&mut *conn)
            .optional()?
        {
            return Uuid::parse_str(&existing.song_id)
                .map_err(|e| Error::Config(format!("malformed stored song_id: {e}")));
        }

        let song_id = Uuid::new_v4();
        let now = Utc::now().naive_utc();
        let new_row = NewSongRow {
            song_id: song_id.to_string(),
            name: name.to_string(),
            fingerprinted: false,
            file_sha1: sha1.to_vec(),
            total_hashes,
            date_created: Some(now),
            date_modified: Some(now),
        };

        insert_into(songs::table)
            .values(&new_row)
            .execute(&mut *conn)?;

        Ok(song_id)
    }

    /// Bulk-inserts `(hash, offset)` pairs for `song_id` in batches,
    /// suppressing duplicates on the `(song_id, hash, offset)` key. Each
    /// batch commits independently; a crash mid-ingest leaves partial rows,
    /// reconcilable because `fingerprinted` is still false.
    pub fn insert_hashes(&self, song_id: Uuid, pairs: &[(u64, u32)]) -> Result<usize> {
        let mut conn = self.pool.get()?;
        let song_id_str = song_id.to_string();
        let now = Utc::now().naive_utc();

        let mut inserted = 0usize;
        for batch in pairs.chunks(self.batch_size.max(1)) {
            let rows: Vec<FingerprintRow> = batch
                .iter()
                .map(|&(hash, offset)| FingerprintRow {
                    hash,
                    song_id: song_id_str.clone(),
                    offset,
                    date_created: Some(now),
                })
                .collect();

            // MySQL's `ON DUPLICATE KEY UPDATE` has no "do nothing" clause —
            // Diesel's `on_conflict().do_nothing()` is Postgres/SQLite only.
            // `insert_or_ignore_into` emits `INSERT IGNORE`, the MySQL
            // duplicate-suppression semantics spec.md §4.4 asks for.
            let count = diesel::insert_or_ignore_into(fingerprints::table)
                .values(&rows)
                .execute(&mut *conn)?;
            inserted += count;
        }

        Ok(inserted)
    }

    /// Flips `fingerprinted` to true. Must be the last step of ingest.
    pub fn set_song_fingerprinted(&self, song_id: Uuid) -> Result<()> {
        let mut conn = self.pool.get()?;
        diesel::update(songs::table.filter(songs::song_id.eq(song_id.to_string())))
            .set((
                songs::fingerprinted.eq(true),
                songs::date_modified.eq(Some(Utc::now().naive_utc())),
            ))
            .execute(&mut *conn)?;
        Ok(())
    }

    /// Removes every unfingerprinted song, cascading to its fingerprints.
    pub fn delete_unfingerprinted(&self) -> Result<usize> {
        let mut conn = self.pool.get()?;
        let count =
            diesel::delete(songs::table.filter(songs::fingerprinted.eq(false))).execute(&mut *conn)?;
        Ok(count)
    }

    /// Batched delete by id list; cascades to fingerprints via the FK.
    pub fn delete_songs(&self, ids: &[Uuid]) -> Result<usize> {
        let mut conn = self.pool.get()?;
        let mut deleted = 0usize;
        for batch in ids.chunks(self.batch_size.max(1)) {
            let id_strings: Vec<String> = batch.iter().map(Uuid::to_string).collect();
            deleted +=
                diesel::delete(songs::table.filter(songs::song_id.eq_any(id_strings)))
                    .execute(&mut *conn)?;
        }
        Ok(deleted)
    }

    /// Returns every `(hash, song_id, offset)` row for the given hash set,
    /// unordered.
    pub fn select_matches(&self, hashes: &[u64]) -> Result<Vec<(u64, Uuid, u32)>> {
        if hashes.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get()?;

        let mut out = Vec::new();
        for batch in hashes.chunks(self.batch_size.max(1)) {
            let rows: Vec<FingerprintRow> = fingerprints::table
                .filter(fingerprints::hash.eq_any(batch.iter().copied()))
                .select(FingerprintRow::as_select())
                .load(&mut *conn)?;
            for row in rows {
                let song_id = Uuid::parse_str(&row.song_id)
                    .map_err(|e| Error::Config(format!("malformed stored song_id: {e}")))?;
                out.push((row.hash, song_id, row.offset));
            }
        }
        Ok(out)
    }

    pub fn count_fingerprinted_songs(&self) -> Result<i64> {
        let mut conn = self.pool.get()?;
        let count = songs::table
            .filter(songs::fingerprinted.eq(true))
            .count()
            .get_result(&mut *conn)?;
        Ok(count)
    }

    pub fn count_fingerprints(&self) -> Result<i64> {
        let mut conn = self.pool.get()?;
        let count = fingerprints::table.count().get_result(&mut *conn)?;
        Ok(count)
    }

    pub fn fetch_song(&self, song_id: Uuid) -> Result<Song> {
        let mut conn = self.pool.get()?;
        let row = songs::table
            .filter(songs::song_id.eq(song_id.to_string()))
            .select(SongRow::as_select())
            .first(&mut *conn)?;
        row.try_into()
    }

    pub fn list_fingerprinted_songs(&self) -> Result<Vec<Song>> {
        let mut conn = self.pool.get()?;
        let rows: Vec<SongRow> = songs::table
            .filter(songs::fingerprinted.eq(true))
            .select(SongRow::as_select())
            .load(&mut *conn)?;
        rows.into_iter().map(Song::try_from).collect()
    }
}
