// @generated — hand-maintained to match spec.md §6's column contract
// (song_id CHAR(36), fingerprinted TINYINT, file_sha1 BINARY(20),
// total_hashes INT UNSIGNED, hash BIGINT UNSIGNED, offset INT UNSIGNED).

diesel::table! {
    songs (song_id) {
        #[max_length = 36]
        song_id -> Char,
        #[max_length = 250]
        name -> Varchar,
        fingerprinted -> Bool,
        #[max_length = 20]
        file_sha1 -> Binary,
        total_hashes -> Unsigned<Integer>,
        date_created -> Nullable<Timestamp>,
        date_modified -> Nullable<Timestamp>,
    }
}

diesel::table! {
    fingerprints (song_id, hash, offset) {
        hash -> Unsigned<BigInt>,
        #[max_length = 36]
        song_id -> Char,
        offset -> Unsigned<Integer>,
        date_created -> Nullable<Timestamp>,
    }
}

diesel::joinable!(fingerprints -> songs (song_id));
diesel::allow_tables_to_appear_in_same_query!(fingerprints, songs);

/// DDL matching the schema above (spec.md §4.4's index/FK requirements).
/// Running it is the caller's job — table bootstrap is out of scope here —
/// but the text lives with the schema it documents. `fingerprints`' composite
/// primary key is load-bearing: `insert_or_ignore_into` only suppresses a row
/// when it collides with an existing key, so without this constraint
/// `INSERT IGNORE` would silently duplicate every row instead of deduping.
pub const CREATE_SONGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS songs (
    song_id CHAR(36) NOT NULL,
    name VARCHAR(250) NOT NULL,
    fingerprinted TINYINT NOT NULL DEFAULT 0,
    file_sha1 BINARY(20) NOT NULL,
    total_hashes INT UNSIGNED NOT NULL DEFAULT 0,
    date_created DATETIME(3) NULL DEFAULT CURRENT_TIMESTAMP(3),
    date_modified DATETIME(3) NULL DEFAULT CURRENT_TIMESTAMP(3) ON UPDATE CURRENT_TIMESTAMP(3),
    PRIMARY KEY (song_id),
    INDEX idx_sha1 (file_sha1)
) ENGINE=InnoDB;
"#;

pub const CREATE_FINGERPRINTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS fingerprints (
    hash BIGINT UNSIGNED NOT NULL,
    song_id CHAR(36) NOT NULL,
    offset INT UNSIGNED NOT NULL,
    date_created DATETIME(3) NULL DEFAULT CURRENT_TIMESTAMP(3),
    PRIMARY KEY (song_id, hash, offset),
    INDEX idx_hash (hash),
    INDEX idx_song_hash (song_id, hash),
    CONSTRAINT fk_fingerprints_song FOREIGN KEY (song_id)
        REFERENCES songs (song_id) ON DELETE CASCADE
) ENGINE=InnoDB;
"#;
