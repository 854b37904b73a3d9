use chrono::NaiveDateTime;
use diesel::prelude::*;
use uuid::Uuid;

use crate::store::schema::{fingerprints, songs};

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = songs)]
#[diesel(check_for_backend(diesel::mysql::Mysql))]
pub struct SongRow {
    pub song_id: String,
    pub name: String,
    pub fingerprinted: bool,
    pub file_sha1: Vec<u8>,
    pub total_hashes: u32,
    pub date_created: Option<NaiveDateTime>,
    pub date_modified: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = songs)]
pub struct NewSongRow {
    pub song_id: String,
    pub name: String,
    pub fingerprinted: bool,
    pub file_sha1: Vec<u8>,
    pub total_hashes: u32,
    pub date_created: Option<NaiveDateTime>,
    pub date_modified: Option<NaiveDateTime>,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = fingerprints)]
#[diesel(check_for_backend(diesel::mysql::Mysql))]
pub struct FingerprintRow {
    pub hash: u64,
    pub song_id: String,
    pub offset: u32,
    pub date_created: Option<NaiveDateTime>,
}

/// A fully fingerprinted song, as returned by metadata queries. This is the
/// typed, `Uuid`-bearing counterpart to [`SongRow`] used outside the store.
#[derive(Debug, Clone)]
pub struct Song {
    pub song_id: Uuid,
    pub name: String,
    pub file_sha1: [u8; 20],
    pub total_hashes: u32,
    pub fingerprinted: bool,
    pub created_at: Option<NaiveDateTime>,
    pub modified_at: Option<NaiveDateTime>,
}

impl TryFrom<SongRow> for Song {
    type Error = crate::error::Error;

    fn try_from(row: SongRow) -> Result<Self, Self::Error> {
        let song_id = Uuid::parse_str(&row.song_id)
            .map_err(|e| crate::error::Error::Config(format!("malformed song_id: {e}")))?;
        let file_sha1: [u8; 20] = row.file_sha1.try_into().map_err(|v: Vec<u8>| {
            crate::error::Error::Config(format!("file_sha1 must be 20 bytes, got {}", v.len()))
        })?;
        Ok(Song {
            song_id,
            name: row.name,
            file_sha1,
            total_hashes: row.total_hashes,
            fingerprinted: row.fingerprinted,
            created_at: row.date_created,
            modified_at: row.date_modified,
        })
    }
}
