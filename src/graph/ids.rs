//! Identity registry.
//!
//! Hands out small sequential ids for DNSKEYs, DS records and NSEC proof
//! sets so that repeated references to the same data collapse onto one
//! graph node. Keys are value types with structural equality; ids are
//! allocated in first-seen order and never reused within one registry.

use std::collections::BTreeMap;

use crate::analysis::{DnsKeyRecord, DsStatus, NsecProof, NsecVariant};
use crate::dns::{RecordType, normalize_name};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct DnsKeyIdentity {
    name: String,
    algorithm: u8,
    key_tag: u16,
    public_key: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct DsIdentity {
    name: String,
    algorithm: u8,
    key_tag: u16,
    digest_type: u8,
    digest: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct NsecIdentity {
    qname: String,
    qtype: RecordType,
    variant: NsecVariant,
    opt_out: bool,
    /// (owner, rdata) of every contributing record, sorted
    records: Vec<(String, String)>,
}

#[derive(Debug)]
struct Registry<K: Ord> {
    ids: BTreeMap<K, u32>,
}

impl<K: Ord> Default for Registry<K> {
    fn default() -> Self {
        Self {
            ids: BTreeMap::new(),
        }
    }
}

impl<K: Ord> Registry<K> {
    fn id_for(&mut self, key: K) -> u32 {
        let next = self.ids.len() as u32 + 1;
        *self.ids.entry(key).or_insert(next)
    }
}

/// Per-analysis id allocator
#[derive(Debug, Default)]
pub struct IdRegistry {
    dnskeys: Registry<DnsKeyIdentity>,
    ds: Registry<DsIdentity>,
    nsec: Registry<NsecIdentity>,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id_for_dnskey(&mut self, name: &str, key: &DnsKeyRecord) -> u32 {
        self.dnskeys.id_for(DnsKeyIdentity {
            name: normalize_name(name),
            algorithm: key.algorithm,
            key_tag: key.key_tag(),
            public_key: key.public_key.clone(),
        })
    }

    pub fn id_for_ds(&mut self, name: &str, ds: &DsStatus) -> u32 {
        self.ds.id_for(DsIdentity {
            name: normalize_name(name),
            algorithm: ds.algorithm,
            key_tag: ds.key_tag,
            digest_type: ds.digest_type,
            digest: ds.digest.to_ascii_lowercase(),
        })
    }

    /// Composite id for a group of DS records: the individual ids, sorted
    /// and joined with `_`, so the result does not depend on input order.
    pub fn id_for_multiple_ds<'a>(
        &mut self,
        name: &str,
        records: impl IntoIterator<Item = &'a DsStatus>,
    ) -> String {
        let mut ids: Vec<u32> = records
            .into_iter()
            .map(|ds| self.id_for_ds(name, ds))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids.iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join("_")
    }

    pub fn id_for_nsec(&mut self, qname: &str, qtype: RecordType, proof: &NsecProof) -> u32 {
        let mut records: Vec<(String, String)> = proof
            .records
            .iter()
            .map(|record| (normalize_name(&record.name), record.rdata.clone()))
            .collect();
        records.sort();
        records.dedup();
        self.nsec.id_for(NsecIdentity {
            qname: normalize_name(qname),
            qtype,
            variant: proof.variant,
            opt_out: proof.opt_out,
            records,
        })
    }
}
