//! Schema layer: `KelStore` binds the ten named sub-stores from the
//! generic keyspace layer to the key event log's actual record types,
//! mirroring `dbing.py`'s `Logger(Databaser)`.

use std::path::Path;
use std::sync::Arc;

use crate::env::{KelDatabase, KelEnv};
use crate::errors::Result;
use crate::keys::{dg_key, sn_key};

/// The ten sub-stores that make up a key event log, opened together by
/// [`KelStore::open`] exactly as `Logger.__init__` opens its ten `open_db`
/// handles.
#[derive(Clone)]
pub struct KelStore {
    env: Arc<KelEnv>,
    evts: KelDatabase,
    dtss: KelDatabase,
    sigs: KelDatabase,
    rcts: KelDatabase,
    ures: KelDatabase,
    kels: KelDatabase,
    pses: KelDatabase,
    ooes: KelDatabase,
    dels: KelDatabase,
    ldes: KelDatabase,
}

impl KelStore {
    /// Opens (creating if necessary) an environment named `name` and all
    /// ten of its sub-stores.
    pub fn open(name: &str, temp: bool, head_dir_path: Option<&Path>) -> Result<Self> {
        let env = KelEnv::open(name, temp, head_dir_path)?;
        Self::from_env(env)
    }

    /// Binds a `KelStore`'s ten sub-stores onto an already-open environment.
    pub fn from_env(env: KelEnv) -> Result<Self> {
        let evts = env.create_database("evts.", false)?;
        let dtss = env.create_database("dtss.", false)?;
        let sigs = env.create_database("sigs.", true)?;
        let rcts = env.create_database("rcts.", true)?;
        let ures = env.create_database("ures.", false)?;
        let kels = env.create_database("kels.", true)?;
        let pses = env.create_database("pses.", true)?;
        let ooes = env.create_database("ooes.", true)?;
        let dels = env.create_database("dels.", true)?;
        let ldes = env.create_database("ldes.", true)?;
        Ok(Self {
            env: Arc::new(env),
            evts,
            dtss,
            sigs,
            rcts,
            ures,
            kels,
            pses,
            ooes,
            dels,
            ldes,
        })
    }

    /// Closes the underlying environment. See [`KelEnv::close`].
    pub fn close(&self) -> Result<()> {
        self.env.close()
    }

    pub fn path(&self) -> &Path {
        self.env.path()
    }

    // ---- evts.: serialized key events, keyed by digest --------------------

    pub fn put_evt(&self, pre: &[u8], dig: &[u8], raw: &[u8]) -> Result<bool> {
        self.env.put_val(&self.evts, &dg_key(pre, dig), raw)
    }

    pub fn set_evt(&self, pre: &[u8], dig: &[u8], raw: &[u8]) -> Result<bool> {
        self.env.set_val(&self.evts, &dg_key(pre, dig), raw)
    }

    pub fn get_evt(&self, pre: &[u8], dig: &[u8]) -> Result<Option<Vec<u8>>> {
        self.env.get_val(&self.evts, &dg_key(pre, dig))
    }

    pub fn del_evt(&self, pre: &[u8], dig: &[u8]) -> Result<bool> {
        self.env.del_val(&self.evts, &dg_key(pre, dig))
    }

    // ---- dtss.: first-seen wall-clock datetime, keyed by digest ------------

    pub fn put_dts(&self, pre: &[u8], dig: &[u8], dts: &[u8]) -> Result<bool> {
        self.env.put_val(&self.dtss, &dg_key(pre, dig), dts)
    }

    pub fn set_dts(&self, pre: &[u8], dig: &[u8], dts: &[u8]) -> Result<bool> {
        self.env.set_val(&self.dtss, &dg_key(pre, dig), dts)
    }

    pub fn get_dts(&self, pre: &[u8], dig: &[u8]) -> Result<Option<Vec<u8>>> {
        self.env.get_val(&self.dtss, &dg_key(pre, dig))
    }

    pub fn del_dts(&self, pre: &[u8], dig: &[u8]) -> Result<bool> {
        self.env.del_val(&self.dtss, &dg_key(pre, dig))
    }

    // ---- sigs.: controller signatures, keyed by digest, lexicographic -----

    pub fn put_sigs(&self, pre: &[u8], dig: &[u8], sigs: &[&[u8]]) -> Result<bool> {
        self.env.put_vals(&self.sigs, &dg_key(pre, dig), sigs)
    }

    pub fn add_sig(&self, pre: &[u8], dig: &[u8], sig: &[u8]) -> Result<bool> {
        self.env.add_val(&self.sigs, &dg_key(pre, dig), sig)
    }

    pub fn get_sigs(&self, pre: &[u8], dig: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.env.get_vals(&self.sigs, &dg_key(pre, dig))
    }

    pub fn cnt_sigs(&self, pre: &[u8], dig: &[u8]) -> Result<usize> {
        self.env.cnt_vals(&self.sigs, &dg_key(pre, dig))
    }

    pub fn del_sigs(&self, pre: &[u8], dig: &[u8]) -> Result<bool> {
        self.env.del_vals(&self.sigs, &dg_key(pre, dig))
    }

    // ---- rcts.: witness/validator receipt couplets, keyed by digest -------

    pub fn put_rcts(&self, pre: &[u8], dig: &[u8], rcts: &[&[u8]]) -> Result<bool> {
        self.env.put_vals(&self.rcts, &dg_key(pre, dig), rcts)
    }

    pub fn add_rct(&self, pre: &[u8], dig: &[u8], rct: &[u8]) -> Result<bool> {
        self.env.add_val(&self.rcts, &dg_key(pre, dig), rct)
    }

    pub fn get_rcts(&self, pre: &[u8], dig: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.env.get_vals(&self.rcts, &dg_key(pre, dig))
    }

    pub fn cnt_rcts(&self, pre: &[u8], dig: &[u8]) -> Result<usize> {
        self.env.cnt_vals(&self.rcts, &dg_key(pre, dig))
    }

    pub fn del_rcts(&self, pre: &[u8], dig: &[u8]) -> Result<bool> {
        self.env.del_vals(&self.rcts, &dg_key(pre, dig))
    }

    // ---- ures.: unverified receipt couplets pending a KEL, keyed by digest

    pub fn put_ure(&self, pre: &[u8], dig: &[u8], raw: &[u8]) -> Result<bool> {
        self.env.put_val(&self.ures, &dg_key(pre, dig), raw)
    }

    pub fn set_ure(&self, pre: &[u8], dig: &[u8], raw: &[u8]) -> Result<bool> {
        self.env.set_val(&self.ures, &dg_key(pre, dig), raw)
    }

    pub fn get_ure(&self, pre: &[u8], dig: &[u8]) -> Result<Option<Vec<u8>>> {
        self.env.get_val(&self.ures, &dg_key(pre, dig))
    }

    pub fn del_ure(&self, pre: &[u8], dig: &[u8]) -> Result<bool> {
        self.env.del_val(&self.ures, &dg_key(pre, dig))
    }

    // ---- kels.: verified event digests, keyed by sn, insertion order ------

    pub fn put_kes(&self, pre: &[u8], sn: u128, digs: &[&[u8]]) -> Result<bool> {
        self.env.put_io_vals(&self.kels, &sn_key(pre, sn), digs)
    }

    pub fn add_ke(&self, pre: &[u8], sn: u128, dig: &[u8]) -> Result<bool> {
        self.env.add_io_val(&self.kels, &sn_key(pre, sn), dig)
    }

    pub fn get_kes(&self, pre: &[u8], sn: u128) -> Result<Vec<Vec<u8>>> {
        self.env.get_io_vals(&self.kels, &sn_key(pre, sn))
    }

    pub fn get_ke_last(&self, pre: &[u8], sn: u128) -> Result<Option<Vec<u8>>> {
        self.env.get_io_vals_last(&self.kels, &sn_key(pre, sn))
    }

    pub fn cnt_kes(&self, pre: &[u8], sn: u128) -> Result<usize> {
        self.env.cnt_io_vals(&self.kels, &sn_key(pre, sn))
    }

    pub fn del_kes(&self, pre: &[u8], sn: u128) -> Result<bool> {
        self.env.del_io_vals(&self.kels, &sn_key(pre, sn))
    }

    /// Iterates every `(sn, digest)` entry under `pre` in `kels.`, in
    /// ascending key order — within each `sn`, in insertion order. Exposes
    /// I3/I5 to callers replaying a KEL from the lowest sequence number up.
    pub fn iter_kels(&self, pre: &[u8]) -> Result<Vec<(u128, Vec<u8>)>> {
        let mut prefix = pre.to_vec();
        prefix.push(crate::keys::SEP);
        self.env
            .iter_prefix(&self.kels, &prefix)?
            .into_iter()
            .map(|(k, v)| {
                let (_, sn) = crate::keys::split_key_sn(&k)?;
                Ok((sn, crate::keys::strip_ord(&v).to_vec()))
            })
            .collect()
    }

    // ---- pses.: partially-signed escrow digests, keyed by sn --------------

    pub fn put_pses(&self, pre: &[u8], sn: u128, digs: &[&[u8]]) -> Result<bool> {
        self.env.put_io_vals(&self.pses, &sn_key(pre, sn), digs)
    }

    pub fn add_pse(&self, pre: &[u8], sn: u128, dig: &[u8]) -> Result<bool> {
        self.env.add_io_val(&self.pses, &sn_key(pre, sn), dig)
    }

    pub fn get_pses(&self, pre: &[u8], sn: u128) -> Result<Vec<Vec<u8>>> {
        self.env.get_io_vals(&self.pses, &sn_key(pre, sn))
    }

    pub fn get_pse_last(&self, pre: &[u8], sn: u128) -> Result<Option<Vec<u8>>> {
        self.env.get_io_vals_last(&self.pses, &sn_key(pre, sn))
    }

    pub fn cnt_pses(&self, pre: &[u8], sn: u128) -> Result<usize> {
        self.env.cnt_io_vals(&self.pses, &sn_key(pre, sn))
    }

    pub fn del_pses(&self, pre: &[u8], sn: u128) -> Result<bool> {
        self.env.del_io_vals(&self.pses, &sn_key(pre, sn))
    }

    // ---- ooes.: out-of-order escrow digests, keyed by sn ------------------

    pub fn put_ooes(&self, pre: &[u8], sn: u128, digs: &[&[u8]]) -> Result<bool> {
        self.env.put_io_vals(&self.ooes, &sn_key(pre, sn), digs)
    }

    pub fn add_ooe(&self, pre: &[u8], sn: u128, dig: &[u8]) -> Result<bool> {
        self.env.add_io_val(&self.ooes, &sn_key(pre, sn), dig)
    }

    pub fn get_ooes(&self, pre: &[u8], sn: u128) -> Result<Vec<Vec<u8>>> {
        self.env.get_io_vals(&self.ooes, &sn_key(pre, sn))
    }

    pub fn get_ooe_last(&self, pre: &[u8], sn: u128) -> Result<Option<Vec<u8>>> {
        self.env.get_io_vals_last(&self.ooes, &sn_key(pre, sn))
    }

    pub fn cnt_ooes(&self, pre: &[u8], sn: u128) -> Result<usize> {
        self.env.cnt_io_vals(&self.ooes, &sn_key(pre, sn))
    }

    pub fn del_ooes(&self, pre: &[u8], sn: u128) -> Result<bool> {
        self.env.del_io_vals(&self.ooes, &sn_key(pre, sn))
    }

    // ---- dels.: duplicitous-event escrow digests, keyed by sn -------------

    pub fn put_des(&self, pre: &[u8], sn: u128, digs: &[&[u8]]) -> Result<bool> {
        self.env.put_io_vals(&self.dels, &sn_key(pre, sn), digs)
    }

    pub fn add_de(&self, pre: &[u8], sn: u128, dig: &[u8]) -> Result<bool> {
        self.env.add_io_val(&self.dels, &sn_key(pre, sn), dig)
    }

    pub fn get_des(&self, pre: &[u8], sn: u128) -> Result<Vec<Vec<u8>>> {
        self.env.get_io_vals(&self.dels, &sn_key(pre, sn))
    }

    pub fn get_de_last(&self, pre: &[u8], sn: u128) -> Result<Option<Vec<u8>>> {
        self.env.get_io_vals_last(&self.dels, &sn_key(pre, sn))
    }

    pub fn cnt_des(&self, pre: &[u8], sn: u128) -> Result<usize> {
        self.env.cnt_io_vals(&self.dels, &sn_key(pre, sn))
    }

    pub fn del_des(&self, pre: &[u8], sn: u128) -> Result<bool> {
        self.env.del_io_vals(&self.dels, &sn_key(pre, sn))
    }

    // ---- ldes.: likely-duplicitous escrow digests, keyed by sn ------------

    pub fn put_ldes(&self, pre: &[u8], sn: u128, digs: &[&[u8]]) -> Result<bool> {
        self.env.put_io_vals(&self.ldes, &sn_key(pre, sn), digs)
    }

    pub fn add_lde(&self, pre: &[u8], sn: u128, dig: &[u8]) -> Result<bool> {
        self.env.add_io_val(&self.ldes, &sn_key(pre, sn), dig)
    }

    pub fn get_ldes(&self, pre: &[u8], sn: u128) -> Result<Vec<Vec<u8>>> {
        self.env.get_io_vals(&self.ldes, &sn_key(pre, sn))
    }

    pub fn get_lde_last(&self, pre: &[u8], sn: u128) -> Result<Option<Vec<u8>>> {
        self.env.get_io_vals_last(&self.ldes, &sn_key(pre, sn))
    }

    pub fn cnt_ldes(&self, pre: &[u8], sn: u128) -> Result<usize> {
        self.env.cnt_io_vals(&self.ldes, &sn_key(pre, sn))
    }

    pub fn del_ldes(&self, pre: &[u8], sn: u128) -> Result<bool> {
        self.env.del_io_vals(&self.ldes, &sn_key(pre, sn))
    }
}
