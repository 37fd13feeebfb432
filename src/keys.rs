//! Canonical key builders and the insertion-order ordinal-prefix scheme.
//!
//! `dg_key`/`sn_key` mirror `dbing.py`'s `Databaser.dgKey`/`Databaser.snKey`.
//! `prefix_ord`/`strip_ord` mirror the ordinal prefix `putIoVals` stamps on
//! each value (`b'%06x.' % cnt`) — distinct from the teacher's 32-hex-digit
//! `suffix`/`unsuffix`, which appends rather than prepends and is sized for
//! a different scheme.

use crate::errors::{Result, StoreError};

/// Separator between a `pre` token and the digest/sequence-number suffix.
pub const SEP: u8 = b'.';

/// Width, in hex digits, of the zero-padded sequence number in `sn_key`.
pub const SN_HEX_WIDTH: usize = 32;

/// Width, in bytes, of the insertion-order ordinal prefix (6 hex digits + `.`).
pub const ORD_PREFIX_LEN: usize = 7;

/// Maximum ordinal an insertion-ordered duplicate set can hold: `2^24 - 1`.
pub const MAX_ORD: u32 = 0xFF_FFFF;

/// `dgKey = pre '.' dig`
pub fn dg_key(pre: &[u8], dig: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(pre.len() + 1 + dig.len());
    key.extend_from_slice(pre);
    key.push(SEP);
    key.extend_from_slice(dig);
    key
}

/// `snKey = pre '.' hex32(sn)`, `sn` zero-padded to 32 lowercase hex digits.
pub fn sn_key(pre: &[u8], sn: u128) -> Vec<u8> {
    let mut key = Vec::with_capacity(pre.len() + 1 + SN_HEX_WIDTH);
    key.extend_from_slice(pre);
    key.push(SEP);
    key.extend_from_slice(format!("{:0width$x}", sn, width = SN_HEX_WIDTH).as_bytes());
    key
}

/// Splits a `dgKey`/`snKey` at the last `.` separator, returning `(pre, suffix)`.
pub fn split_key(key: &[u8]) -> Result<(&[u8], &[u8])> {
    let idx = key
        .iter()
        .rposition(|&b| b == SEP)
        .ok_or_else(|| StoreError::InvalidKey("missing '.' separator".into()))?;
    Ok((&key[..idx], &key[idx + 1..]))
}

/// Parses the zero-padded hex sequence number produced by `sn_key`.
pub fn split_key_sn(key: &[u8]) -> Result<(&[u8], u128)> {
    let (pre, hex) = split_key(key)?;
    let hex = std::str::from_utf8(hex)
        .map_err(|_| StoreError::InvalidKey("sn is not valid utf8".into()))?;
    let sn = u128::from_str_radix(hex, 16)
        .map_err(|_| StoreError::InvalidKey(format!("sn {hex:?} is not hex")))?;
    Ok((pre, sn))
}

/// Stamps `val` with its insertion ordinal: `{ord:06x}.{val}`.
///
/// Capacity is `2^24 - 1` — the prefix is fixed at 6 hex digits, matching
/// `dbing.py`'s literal `b'%06x.' % cnt`.
pub fn prefix_ord(ord: u32, val: &[u8]) -> Result<Vec<u8>> {
    if ord > MAX_ORD {
        return Err(StoreError::CapacityExceeded { max: MAX_ORD });
    }
    let mut out = Vec::with_capacity(ORD_PREFIX_LEN + val.len());
    out.extend_from_slice(format!("{:06x}.", ord).as_bytes());
    out.extend_from_slice(val);
    Ok(out)
}

/// Strips the 7-byte ordinal prefix a value was stamped with by `prefix_ord`.
pub fn strip_ord(stored: &[u8]) -> &[u8] {
    if stored.len() >= ORD_PREFIX_LEN {
        &stored[ORD_PREFIX_LEN..]
    } else {
        stored
    }
}

/// Reads back the ordinal a value was stamped with; used to find the next
/// free ordinal when appending to an existing insertion-ordered set.
pub fn read_ord(stored: &[u8]) -> Result<u32> {
    if stored.len() < ORD_PREFIX_LEN || stored[6] != SEP {
        return Err(StoreError::InvalidKey(
            "value missing insertion-order prefix".into(),
        ));
    }
    let hex = std::str::from_utf8(&stored[..6])
        .map_err(|_| StoreError::InvalidKey("ordinal prefix is not valid utf8".into()))?;
    u32::from_str_radix(hex, 16)
        .map_err(|_| StoreError::InvalidKey(format!("ordinal prefix {hex:?} is not hex")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dg_key_joins_pre_and_dig_with_dot() {
        let pre = b"BGKVzj4ve0VSd8z_AmvhLg4lqcC_9WYX90k03q-R_Ydo";
        let dig = b"EABSVrs3DJzrXYbtNmAmTXQYsOUsZ1wb1egJUoy5AuXQ";
        let key = dg_key(pre, dig);
        assert_eq!(key, [pre.as_slice(), b".", dig.as_slice()].concat());
    }

    // Spec §8.1 item 3 / scenario S4: without the fixed 32-hex-digit width,
    // sn=16 (hex "10") would sort lexicographically before sn=2 (hex "2") —
    // the entire reason snKey pads. Prove I5 directly on the key bytes.
    #[test]
    fn sn_key_lexicographic_order_matches_numeric_order_across_digit_widths() {
        let pre = b"BWzwEHHzq7K0gzQPYGGwTmuupUhPx5_yZ-Wk1x4ejhcc";
        let key1 = sn_key(pre, 1);
        let key2 = sn_key(pre, 2);
        let key16 = sn_key(pre, 16);

        // Written out of numeric order, as S4 does.
        let mut keys = vec![key16.clone(), key1.clone(), key2.clone()];
        keys.sort();
        assert_eq!(keys, vec![key1, key2, key16]);
    }

    #[test]
    fn sn_key_zero_pads_to_32_hex_digits() {
        let pre = b"BGKVzj4ve0VSd8z_AmvhLg4lqcC_9WYX90k03q-R_Ydo";
        let key = sn_key(pre, 1);
        let (p, sn_hex) = split_key(&key).unwrap();
        assert_eq!(p, pre.as_slice());
        assert_eq!(sn_hex, b"00000000000000000000000000000001");
    }

    #[test]
    fn split_key_round_trips_dg_key() {
        let pre = b"BGKVzj4ve0VSd8z_AmvhLg4lqcC_9WYX90k03q-R_Ydo";
        let dig = b"EABSVrs3DJzrXYbtNmAmTXQYsOUsZ1wb1egJUoy5AuXQ";
        let key = dg_key(pre, dig);
        let (p, d) = split_key(&key).unwrap();
        assert_eq!(p, pre.as_slice());
        assert_eq!(d, dig.as_slice());
    }

    #[test]
    fn split_key_sn_parses_hex_sequence_number() {
        let pre = b"BGKVzj4ve0VSd8z_AmvhLg4lqcC_9WYX90k03q-R_Ydo";
        let key = sn_key(pre, 255);
        let (p, sn) = split_key_sn(&key).unwrap();
        assert_eq!(p, pre.as_slice());
        assert_eq!(sn, 255);
    }

    #[test]
    fn split_key_rejects_missing_separator() {
        assert!(split_key(b"noseparatorhere").is_err());
    }

    #[test]
    fn prefix_ord_stamps_six_digit_lowercase_hex_ordinal() {
        let val = b"hello";
        let stamped = prefix_ord(0, val).unwrap();
        assert_eq!(stamped, b"000000.hello");
        let stamped = prefix_ord(255, val).unwrap();
        assert_eq!(stamped, b"0000ff.hello");
    }

    #[test]
    fn prefix_ord_rejects_ordinals_past_capacity() {
        assert!(prefix_ord(MAX_ORD, b"x").is_ok());
        assert!(matches!(
            prefix_ord(MAX_ORD + 1, b"x"),
            Err(StoreError::CapacityExceeded { max }) if max == MAX_ORD
        ));
    }

    #[test]
    fn strip_ord_removes_exactly_the_seven_byte_prefix() {
        let val = b"some value bytes";
        let stamped = prefix_ord(42, val).unwrap();
        assert_eq!(strip_ord(&stamped), val.as_slice());
    }

    #[test]
    fn read_ord_recovers_the_stamped_ordinal() {
        let stamped = prefix_ord(17, b"v").unwrap();
        assert_eq!(read_ord(&stamped).unwrap(), 17);
    }

    #[test]
    fn read_ord_rejects_unstamped_values() {
        assert!(read_ord(b"short").is_err());
        assert!(read_ord(b"noseparatorxyz").is_err());
    }
}
