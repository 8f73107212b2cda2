//! Little-endian metadata field primitives.
//!
//! Strings are a `u32` byte length followed by UTF-8. Optional strings carry
//! a one-byte presence flag. Header maps flatten to an alternating key/value
//! string sequence — an absent map encodes as an empty sequence, never as a
//! null marker.

use std::collections::HashMap;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::DecodeError;

pub(crate) fn ensure(src: &Bytes, needed: usize) -> Result<(), DecodeError> {
    if src.remaining() < needed {
        return Err(DecodeError::Malformed(format!(
            "truncated metadata: need {needed} more bytes, have {}",
            src.remaining()
        )));
    }
    Ok(())
}

pub(crate) fn put_str(dst: &mut BytesMut, value: &str) {
    dst.put_u32_le(value.len() as u32);
    dst.put_slice(value.as_bytes());
}

pub(crate) fn get_str(src: &mut Bytes) -> Result<String, DecodeError> {
    ensure(src, 4)?;
    let len = src.get_u32_le() as usize;
    ensure(src, len)?;
    let raw = src.split_to(len);
    String::from_utf8(raw.to_vec())
        .map_err(|_| DecodeError::Malformed("invalid UTF-8 in string field".to_string()))
}

pub(crate) fn put_opt_str(dst: &mut BytesMut, value: Option<&str>) {
    match value {
        Some(value) => {
            dst.put_u8(1);
            put_str(dst, value);
        }
        None => dst.put_u8(0),
    }
}

pub(crate) fn get_opt_str(src: &mut Bytes) -> Result<Option<String>, DecodeError> {
    ensure(src, 1)?;
    match src.get_u8() {
        0 => Ok(None),
        1 => get_str(src).map(Some),
        flag => Err(DecodeError::Malformed(format!(
            "invalid presence flag 0x{flag:02x}"
        ))),
    }
}

pub(crate) fn put_str_seq(dst: &mut BytesMut, values: &[String]) {
    dst.put_u32_le(values.len() as u32);
    for value in values {
        put_str(dst, value);
    }
}

pub(crate) fn get_str_seq(src: &mut Bytes) -> Result<Vec<String>, DecodeError> {
    ensure(src, 4)?;
    let count = src.get_u32_le() as usize;
    // Each entry needs at least its 4-byte length field.
    if count > src.remaining() / 4 {
        return Err(DecodeError::Malformed(format!(
            "string count {count} exceeds remaining metadata"
        )));
    }
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(get_str(src)?);
    }
    Ok(values)
}

pub(crate) fn put_headers(dst: &mut BytesMut, headers: &HashMap<String, String>) {
    dst.put_u32_le((headers.len() * 2) as u32);
    for (key, value) in headers {
        put_str(dst, key);
        put_str(dst, value);
    }
}

pub(crate) fn get_headers(src: &mut Bytes) -> Result<HashMap<String, String>, DecodeError> {
    let flat = get_str_seq(src)?;
    if flat.len() % 2 != 0 {
        return Err(DecodeError::Malformed(format!(
            "header sequence has odd length {}",
            flat.len()
        )));
    }
    let mut headers = HashMap::with_capacity(flat.len() / 2);
    let mut iter = flat.into_iter();
    while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
        headers.insert(key, value);
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn freeze(dst: BytesMut) -> Bytes {
        dst.freeze()
    }

    #[test]
    fn str_roundtrip() {
        let mut dst = BytesMut::new();
        put_str(&mut dst, "target/Method");
        let mut src = freeze(dst);
        assert_eq!(get_str(&mut src).unwrap(), "target/Method");
        assert!(src.is_empty());
    }

    #[test]
    fn empty_str_roundtrip() {
        let mut dst = BytesMut::new();
        put_str(&mut dst, "");
        let mut src = freeze(dst);
        assert_eq!(get_str(&mut src).unwrap(), "");
    }

    #[test]
    fn truncated_str_is_malformed() {
        let mut dst = BytesMut::new();
        dst.put_u32_le(10);
        dst.put_slice(b"short");
        let mut src = freeze(dst);
        assert!(matches!(get_str(&mut src), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        let mut dst = BytesMut::new();
        dst.put_u32_le(2);
        dst.put_slice(&[0xC0, 0x80]);
        let mut src = freeze(dst);
        assert!(matches!(get_str(&mut src), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn opt_str_roundtrip() {
        let mut dst = BytesMut::new();
        put_opt_str(&mut dst, Some("id-7"));
        put_opt_str(&mut dst, None);
        let mut src = freeze(dst);
        assert_eq!(get_opt_str(&mut src).unwrap().as_deref(), Some("id-7"));
        assert_eq!(get_opt_str(&mut src).unwrap(), None);
    }

    #[test]
    fn bad_presence_flag_is_malformed() {
        let mut src = Bytes::from_static(&[7]);
        assert!(matches!(
            get_opt_str(&mut src),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn str_seq_roundtrip() {
        let values = vec!["s1".to_string(), "s2".to_string()];
        let mut dst = BytesMut::new();
        put_str_seq(&mut dst, &values);
        let mut src = freeze(dst);
        assert_eq!(get_str_seq(&mut src).unwrap(), values);
    }

    #[test]
    fn absurd_seq_count_rejected_before_allocation() {
        let mut dst = BytesMut::new();
        dst.put_u32_le(u32::MAX);
        let mut src = freeze(dst);
        assert!(matches!(
            get_str_seq(&mut src),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn headers_roundtrip_regardless_of_order() {
        let mut a = HashMap::new();
        a.insert("trace".to_string(), "1".to_string());
        a.insert("tenant".to_string(), "blue".to_string());

        let mut dst = BytesMut::new();
        put_headers(&mut dst, &a);
        let mut src = freeze(dst);
        let decoded = get_headers(&mut src).unwrap();
        assert_eq!(decoded, a);
    }

    #[test]
    fn empty_headers_are_an_empty_sequence() {
        let mut dst = BytesMut::new();
        put_headers(&mut dst, &HashMap::new());
        assert_eq!(dst.len(), 4);
        let mut src = freeze(dst);
        assert!(get_headers(&mut src).unwrap().is_empty());
    }

    #[test]
    fn odd_header_sequence_is_malformed() {
        let mut dst = BytesMut::new();
        put_str_seq(&mut dst, &["lonely-key".to_string()]);
        let mut src = freeze(dst);
        assert!(matches!(
            get_headers(&mut src),
            Err(DecodeError::Malformed(_))
        ));
    }
}
