//! Explicit wire format for cached hash rows, replacing the reference
//! implementation's opaque `pickle` blobs with a tagged, length-prefixed
//! encoding per spec.md §9's design note: `u32 count` followed by `count`
//! records of `u8 sid_len, sid_len bytes (UTF-8 song_id), u32 offset (BE)`.

use crate::error::{Error, Result};

pub fn encode(rows: &[(String, u32)]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + rows.len() * 8);
    buf.extend_from_slice(&(rows.len() as u32).to_be_bytes());
    for (song_id, offset) in rows {
        let bytes = song_id.as_bytes();
        buf.push(bytes.len() as u8);
        buf.extend_from_slice(bytes);
        buf.extend_from_slice(&offset.to_be_bytes());
    }
    buf
}

pub fn decode(bytes: &[u8]) -> Result<Vec<(String, u32)>> {
    if bytes.len() < 4 {
        return Err(Error::Config("cache record truncated before count".into()));
    }
    let count = u32::from_be_bytes(bytes[0..4].try_into().unwrap()) as usize;
    let mut pos = 4usize;
    let mut out = Vec::with_capacity(count);

    for _ in 0..count {
        let sid_len = *bytes
            .get(pos)
            .ok_or_else(|| Error::Config("cache record truncated before sid_len".into()))?
            as usize;
        pos += 1;

        let sid_bytes = bytes
            .get(pos..pos + sid_len)
            .ok_or_else(|| Error::Config("cache record truncated inside song_id".into()))?;
        let song_id = std::str::from_utf8(sid_bytes)
            .map_err(|e| Error::Config(format!("cache song_id is not valid UTF-8: {e}")))?
            .to_string();
        pos += sid_len;

        let offset_bytes = bytes
            .get(pos..pos + 4)
            .ok_or_else(|| Error::Config("cache record truncated before offset".into()))?;
        let offset = u32::from_be_bytes(offset_bytes.try_into().unwrap());
        pos += 4;

        out.push((song_id, offset));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_an_empty_record() {
        let encoded = encode(&[]);
        assert_eq!(decode(&encoded).unwrap(), Vec::new());
    }

    #[test]
    fn round_trips_several_rows() {
        let rows = vec![
            ("11111111-1111-1111-1111-111111111111".to_string(), 0u32),
            ("22222222-2222-2222-2222-222222222222".to_string(), 4096),
        ];
        let encoded = encode(&rows);
        assert_eq!(decode(&encoded).unwrap(), rows);
    }

    #[test]
    fn rejects_a_truncated_record() {
        let rows = vec![("abc".to_string(), 1)];
        let mut encoded = encode(&rows);
        encoded.truncate(encoded.len() - 2);
        assert!(decode(&encoded).is_err());
    }
}
