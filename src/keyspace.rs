//! Generic keyspace layer: single-value, lexicographically-ordered
//! multi-value, and insertion-ordered multi-value operations over a raw
//! `heed` database. Each call opens and commits its own transaction,
//! matching the one-txn-per-call discipline of `dbing.py`'s `Databaser`.

use std::collections::HashSet;

use crate::env::{check_key_len, KelDatabase, KelEnv};
use crate::errors::{Result, StoreError};
use crate::keys::{prefix_ord, strip_ord, MAX_ORD};

impl KelEnv {
    // ---- single-value family (no DUP_SORT) -------------------------------

    /// Inserts `val` at `key` only if `key` is absent. Returns `false`
    /// (soft "already present") without writing if it already holds a value.
    pub fn put_val(&self, db: &KelDatabase, key: &[u8], val: &[u8]) -> Result<bool> {
        check_key_len(key)?;
        let env = self.env()?;
        let mut wtxn = env.write_txn().map_err(StoreError::Env)?;
        if db.get(&wtxn, key).map_err(StoreError::Env)?.is_some() {
            return Ok(false);
        }
        db.put(&mut wtxn, key, val).map_err(StoreError::Env)?;
        wtxn.commit().map_err(StoreError::Env)?;
        Ok(true)
    }

    /// Inserts or overwrites `val` at `key` unconditionally.
    pub fn set_val(&self, db: &KelDatabase, key: &[u8], val: &[u8]) -> Result<bool> {
        check_key_len(key)?;
        let env = self.env()?;
        let mut wtxn = env.write_txn().map_err(StoreError::Env)?;
        db.put(&mut wtxn, key, val).map_err(StoreError::Env)?;
        wtxn.commit().map_err(StoreError::Env)?;
        Ok(true)
    }

    /// Returns the value at `key`, or `None` if absent (soft condition).
    pub fn get_val(&self, db: &KelDatabase, key: &[u8]) -> Result<Option<Vec<u8>>> {
        check_key_len(key)?;
        let env = self.env()?;
        let rtxn = env.read_txn().map_err(StoreError::Env)?;
        Ok(db
            .get(&rtxn, key)
            .map_err(StoreError::Env)?
            .map(|v| v.to_vec()))
    }

    /// Deletes `key`. Returns `false` (soft "absent") if it did not exist.
    pub fn del_val(&self, db: &KelDatabase, key: &[u8]) -> Result<bool> {
        check_key_len(key)?;
        let env = self.env()?;
        let mut wtxn = env.write_txn().map_err(StoreError::Env)?;
        let existed = db.get(&wtxn, key).map_err(StoreError::Env)?.is_some();
        if existed {
            db.delete(&mut wtxn, key).map_err(StoreError::Env)?;
            wtxn.commit().map_err(StoreError::Env)?;
        }
        Ok(existed)
    }

    // ---- lexicographic multi-value family (DUP_SORT) ----------------------

    /// Inserts each of `vals` as a duplicate at `key`; values already
    /// present are silently ignored (LMDB dup-sort `put` is idempotent).
    pub fn put_vals(&self, db: &KelDatabase, key: &[u8], vals: &[&[u8]]) -> Result<bool> {
        check_key_len(key)?;
        let env = self.env()?;
        let mut wtxn = env.write_txn().map_err(StoreError::Env)?;
        for val in vals {
            db.put(&mut wtxn, key, val).map_err(StoreError::Env)?;
        }
        wtxn.commit().map_err(StoreError::Env)?;
        Ok(true)
    }

    /// Adds a single `val` as a duplicate at `key`. Returns `false` if it
    /// was already present among `key`'s duplicates (soft "already present").
    pub fn add_val(&self, db: &KelDatabase, key: &[u8], val: &[u8]) -> Result<bool> {
        check_key_len(key)?;
        let env = self.env()?;
        let mut wtxn = env.write_txn().map_err(StoreError::Env)?;
        let present = match db.get_duplicates(&wtxn, key).map_err(StoreError::Env)? {
            Some(iter) => {
                let mut found = false;
                for entry in iter {
                    let (_, v) = entry.map_err(StoreError::Env)?;
                    if v == val {
                        found = true;
                        break;
                    }
                }
                found
            }
            None => false,
        };
        if present {
            return Ok(false);
        }
        db.put(&mut wtxn, key, val).map_err(StoreError::Env)?;
        wtxn.commit().map_err(StoreError::Env)?;
        Ok(true)
    }

    /// Returns every duplicate value at `key`, in lexicographic order.
    pub fn get_vals(&self, db: &KelDatabase, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        check_key_len(key)?;
        let env = self.env()?;
        let rtxn = env.read_txn().map_err(StoreError::Env)?;
        let mut out = Vec::new();
        if let Some(iter) = db.get_duplicates(&rtxn, key).map_err(StoreError::Env)? {
            for entry in iter {
                let (_, v) = entry.map_err(StoreError::Env)?;
                out.push(v.to_vec());
            }
        }
        Ok(out)
    }

    /// Counts the duplicate values at `key`.
    pub fn cnt_vals(&self, db: &KelDatabase, key: &[u8]) -> Result<usize> {
        check_key_len(key)?;
        let env = self.env()?;
        let rtxn = env.read_txn().map_err(StoreError::Env)?;
        count_duplicates(db, &rtxn, key)
    }

    /// Deletes `key` and all of its duplicate values. Returns `false`
    /// (soft "absent") if it did not exist.
    pub fn del_vals(&self, db: &KelDatabase, key: &[u8]) -> Result<bool> {
        self.del_val(db, key)
    }

    // ---- insertion-ordered multi-value family (DUP_SORT + ordinal prefix) -

    /// Inserts each of `vals`, in order, as a freshly-ordinalled duplicate
    /// at `key`. A value already present (stripped of its ordinal prefix,
    /// including one added earlier in this same call) is skipped — mandatory
    /// to preserve no-duplicate-payloads even across a single call with
    /// repeated values.
    pub fn put_io_vals(&self, db: &KelDatabase, key: &[u8], vals: &[&[u8]]) -> Result<bool> {
        check_key_len(key)?;
        let env = self.env()?;
        let mut wtxn = env.write_txn().map_err(StoreError::Env)?;
        let mut seen: HashSet<Vec<u8>> = HashSet::new();
        let mut next_ord: u32 = 0;
        if let Some(iter) = db.get_duplicates(&wtxn, key).map_err(StoreError::Env)? {
            for entry in iter {
                let (_, v) = entry.map_err(StoreError::Env)?;
                seen.insert(strip_ord(v).to_vec());
                next_ord += 1;
            }
        }
        let mut wrote = false;
        for val in vals {
            if seen.contains(*val) {
                continue;
            }
            let stamped = prefix_ord(next_ord, val)?;
            db.put(&mut wtxn, key, &stamped).map_err(StoreError::Env)?;
            seen.insert(val.to_vec());
            next_ord += 1;
            wrote = true;
        }
        if wrote {
            wtxn.commit().map_err(StoreError::Env)?;
        }
        Ok(wrote)
    }

    /// Appends a single `val` to the insertion-ordered set at `key`. Returns
    /// `false` if it is already present (soft "already present").
    pub fn add_io_val(&self, db: &KelDatabase, key: &[u8], val: &[u8]) -> Result<bool> {
        check_key_len(key)?;
        let env = self.env()?;
        let mut wtxn = env.write_txn().map_err(StoreError::Env)?;
        let mut next_ord: u32 = 0;
        let mut present = false;
        if let Some(iter) = db.get_duplicates(&wtxn, key).map_err(StoreError::Env)? {
            for entry in iter {
                let (_, v) = entry.map_err(StoreError::Env)?;
                if strip_ord(v) == val {
                    present = true;
                }
                next_ord += 1;
            }
        }
        if present {
            return Ok(false);
        }
        if next_ord > MAX_ORD {
            return Err(StoreError::CapacityExceeded { max: MAX_ORD });
        }
        let stamped = prefix_ord(next_ord, val)?;
        db.put(&mut wtxn, key, &stamped).map_err(StoreError::Env)?;
        wtxn.commit().map_err(StoreError::Env)?;
        Ok(true)
    }

    /// Returns every value at `key` in insertion order (prefix stripped).
    pub fn get_io_vals(&self, db: &KelDatabase, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        check_key_len(key)?;
        let env = self.env()?;
        let rtxn = env.read_txn().map_err(StoreError::Env)?;
        let mut out = Vec::new();
        if let Some(iter) = db.get_duplicates(&rtxn, key).map_err(StoreError::Env)? {
            for entry in iter {
                let (_, v) = entry.map_err(StoreError::Env)?;
                out.push(strip_ord(v).to_vec());
            }
        }
        Ok(out)
    }

    /// Returns the most recently inserted value at `key`, or `None` if the
    /// set is empty (soft "absent").
    pub fn get_io_vals_last(&self, db: &KelDatabase, key: &[u8]) -> Result<Option<Vec<u8>>> {
        check_key_len(key)?;
        let env = self.env()?;
        let rtxn = env.read_txn().map_err(StoreError::Env)?;
        let mut last = None;
        if let Some(iter) = db.get_duplicates(&rtxn, key).map_err(StoreError::Env)? {
            for entry in iter {
                let (_, v) = entry.map_err(StoreError::Env)?;
                last = Some(strip_ord(v).to_vec());
            }
        }
        Ok(last)
    }

    /// Counts the insertion-ordered values at `key`.
    pub fn cnt_io_vals(&self, db: &KelDatabase, key: &[u8]) -> Result<usize> {
        check_key_len(key)?;
        let env = self.env()?;
        let rtxn = env.read_txn().map_err(StoreError::Env)?;
        count_duplicates(db, &rtxn, key)
    }

    /// Deletes `key` and all of its insertion-ordered values. Returns
    /// `false` (soft "absent") if it did not exist.
    pub fn del_io_vals(&self, db: &KelDatabase, key: &[u8]) -> Result<bool> {
        self.del_val(db, key)
    }

    // ---- cross-key iteration ----------------------------------------------

    /// Returns every `(key, value)` pair whose key starts with `prefix`, in
    /// the backing store's native key order (and, within a duplicate-sort
    /// key, its duplicate order). This is the primitive that lets a caller
    /// walk a `snKey`-addressed sub-store across sequence numbers under one
    /// `pre` and observe I3/I5's lexicographic-equals-numeric ordering.
    pub fn iter_prefix(&self, db: &KelDatabase, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        check_key_len(prefix)?;
        let env = self.env()?;
        let rtxn = env.read_txn().map_err(StoreError::Env)?;
        let mut out = Vec::new();
        for entry in db.prefix_iter(&rtxn, prefix).map_err(StoreError::Env)? {
            let (k, v) = entry.map_err(StoreError::Env)?;
            out.push((k.to_vec(), v.to_vec()));
        }
        Ok(out)
    }
}

fn count_duplicates(db: &KelDatabase, rtxn: &heed::RoTxn<'_>, key: &[u8]) -> Result<usize> {
    match db.get_duplicates(rtxn, key).map_err(StoreError::Env)? {
        Some(iter) => {
            let mut n = 0;
            for entry in iter {
                entry.map_err(StoreError::Env)?;
                n += 1;
            }
            Ok(n)
        }
        None => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::KelEnv;

    fn open_db(dup_sort: bool) -> (KelEnv, KelDatabase) {
        crate::test_support::init_tracing();
        let env = KelEnv::open("test", true, None).unwrap();
        let db = env.create_database("t.", dup_sort).unwrap();
        (env, db)
    }

    #[test]
    fn put_val_then_get_val_round_trips() {
        let (env, db) = open_db(false);
        assert!(env.put_val(&db, b"k", b"v1").unwrap());
        assert_eq!(env.get_val(&db, b"k").unwrap(), Some(b"v1".to_vec()));
        env.close().unwrap();
    }

    #[test]
    fn put_val_refuses_to_overwrite() {
        let (env, db) = open_db(false);
        assert!(env.put_val(&db, b"k", b"v1").unwrap());
        assert!(!env.put_val(&db, b"k", b"v2").unwrap());
        assert_eq!(env.get_val(&db, b"k").unwrap(), Some(b"v1".to_vec()));
        env.close().unwrap();
    }

    #[test]
    fn set_val_overwrites_unconditionally() {
        let (env, db) = open_db(false);
        assert!(env.set_val(&db, b"k", b"v1").unwrap());
        assert!(env.set_val(&db, b"k", b"v2").unwrap());
        assert_eq!(env.get_val(&db, b"k").unwrap(), Some(b"v2".to_vec()));
        env.close().unwrap();
    }

    #[test]
    fn del_val_reports_whether_key_existed() {
        let (env, db) = open_db(false);
        assert!(!env.del_val(&db, b"k").unwrap());
        env.set_val(&db, b"k", b"v").unwrap();
        assert!(env.del_val(&db, b"k").unwrap());
        assert_eq!(env.get_val(&db, b"k").unwrap(), None);
        env.close().unwrap();
    }

    #[test]
    fn get_vals_returns_duplicates_in_lexicographic_order() {
        let (env, db) = open_db(true);
        env.put_vals(&db, b"k", &[b"zebra", b"apple", b"mango"])
            .unwrap();
        let vals = env.get_vals(&db, b"k").unwrap();
        assert_eq!(
            vals,
            vec![b"apple".to_vec(), b"mango".to_vec(), b"zebra".to_vec()]
        );
        env.close().unwrap();
    }

    #[test]
    fn add_val_reports_already_present() {
        let (env, db) = open_db(true);
        assert!(env.add_val(&db, b"k", b"v").unwrap());
        assert!(!env.add_val(&db, b"k", b"v").unwrap());
        assert_eq!(env.cnt_vals(&db, b"k").unwrap(), 1);
        env.close().unwrap();
    }

    #[test]
    fn io_vals_preserve_insertion_order_not_lexicographic() {
        let (env, db) = open_db(true);
        env.put_io_vals(&db, b"k", &[b"zebra", b"apple", b"mango"])
            .unwrap();
        let vals = env.get_io_vals(&db, b"k").unwrap();
        assert_eq!(
            vals,
            vec![b"zebra".to_vec(), b"apple".to_vec(), b"mango".to_vec()]
        );
        env.close().unwrap();
    }

    #[test]
    fn put_io_vals_dedupes_repeated_values_within_one_call() {
        let (env, db) = open_db(true);
        env.put_io_vals(&db, b"k", &[b"x", b"x", b"y"]).unwrap();
        assert_eq!(env.cnt_io_vals(&db, b"k").unwrap(), 2);
        assert_eq!(
            env.get_io_vals(&db, b"k").unwrap(),
            vec![b"x".to_vec(), b"y".to_vec()]
        );
        env.close().unwrap();
    }

    #[test]
    fn add_io_val_appends_and_rejects_duplicate_payload() {
        let (env, db) = open_db(true);
        assert!(env.add_io_val(&db, b"k", b"a").unwrap());
        assert!(env.add_io_val(&db, b"k", b"b").unwrap());
        assert!(!env.add_io_val(&db, b"k", b"a").unwrap());
        assert_eq!(
            env.get_io_vals(&db, b"k").unwrap(),
            vec![b"a".to_vec(), b"b".to_vec()]
        );
        env.close().unwrap();
    }

    #[test]
    fn get_io_vals_last_returns_the_most_recent_insert() {
        let (env, db) = open_db(true);
        env.add_io_val(&db, b"k", b"a").unwrap();
        env.add_io_val(&db, b"k", b"b").unwrap();
        assert_eq!(
            env.get_io_vals_last(&db, b"k").unwrap(),
            Some(b"b".to_vec())
        );
        env.close().unwrap();
    }

    #[test]
    fn get_io_vals_last_is_none_for_absent_key() {
        let (env, db) = open_db(true);
        assert_eq!(env.get_io_vals_last(&db, b"missing").unwrap(), None);
        env.close().unwrap();
    }

    #[test]
    fn del_io_vals_removes_the_whole_set() {
        let (env, db) = open_db(true);
        env.put_io_vals(&db, b"k", &[b"a", b"b"]).unwrap();
        assert!(env.del_io_vals(&db, b"k").unwrap());
        assert_eq!(env.get_io_vals(&db, b"k").unwrap(), Vec::<Vec<u8>>::new());
        env.close().unwrap();
    }

    #[test]
    fn iter_prefix_walks_keys_in_ascending_order_across_digit_widths() {
        let (env, db) = open_db(true);
        // Keys under the same prefix, fixed-width so sn=16 sorts after sn=2.
        env.add_io_val(&db, b"p.000000000000000000000000000001", b"d1")
            .unwrap();
        env.add_io_val(&db, b"p.000000000000000000000000000016", b"d16")
            .unwrap();
        env.add_io_val(&db, b"p.000000000000000000000000000002", b"d2")
            .unwrap();

        let entries = env.iter_prefix(&db, b"p.").unwrap();
        let keys: Vec<Vec<u8>> = entries.into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![
                b"p.000000000000000000000000000001".to_vec(),
                b"p.000000000000000000000000000002".to_vec(),
                b"p.000000000000000000000000000016".to_vec(),
            ]
        );
        env.close().unwrap();
    }

    #[test]
    fn key_too_long_is_rejected_before_touching_lmdb() {
        let (env, db) = open_db(false);
        let huge_key = vec![b'k'; crate::env::MAX_KEY_SIZE + 1];
        assert!(matches!(
            env.get_val(&db, &huge_key),
            Err(StoreError::KeyTooLong { .. })
        ));
        env.close().unwrap();
    }
}
