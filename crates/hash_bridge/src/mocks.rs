//! In-process upstream and store doubles for unit tests.
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use alloy_eips::BlockNumberOrTag;
use alloy_primitives::B256;

use crate::net::ChainSource;
use crate::net::rpc::RpcError;
use crate::store::{DiskStore, StoreError, TranslationStore};
use crate::types::{BlockHashPair, RpcHeader};

pub(crate) fn native_hash(n: u64) -> B256 {
    tagged_hash(0x0a, n)
}

pub(crate) fn canonical_hash(n: u64) -> B256 {
    tagged_hash(0x0c, n)
}

fn tagged_hash(tag: u8, n: u64) -> B256 {
    let mut bytes = [0u8; 32];
    bytes[0] = tag;
    bytes[24..].copy_from_slice(&n.to_be_bytes());
    B256::from(bytes)
}

/// Header as the upstream serves it: linked to its parent by native hash.
pub(crate) fn raw_header(n: u64) -> RpcHeader {
    RpcHeader {
        parent_hash: if n == 0 { B256::ZERO } else { native_hash(n - 1) },
        number: n,
        gas_limit: 30_000_000,
        timestamp: 1_700_000_000 + n,
        hash: canonical_hash(n),
        ..Default::default()
    }
}

#[derive(Default)]
struct Inner {
    produced: u64,
    reported_head: Option<u64>,
    failing: HashSet<u64>,
    headers_down: bool,
    requested: Vec<u64>,
}

/// A chain of `produced` blocks numbered from zero.
#[derive(Default)]
pub(crate) struct MockChain {
    inner: Mutex<Inner>,
}

impl MockChain {
    pub(crate) fn with_blocks(produced: u64) -> Self {
        let chain = Self::default();
        chain.inner.lock().unwrap().produced = produced;
        chain
    }

    pub(crate) fn produce(&self) {
        self.inner.lock().unwrap().produced += 1;
    }

    /// Makes `current_height` report `head` regardless of what exists.
    pub(crate) fn report_head(&self, head: u64) {
        self.inner.lock().unwrap().reported_head = Some(head);
    }

    /// Hash-pair requests for `n` fail with a transport error until healed.
    pub(crate) fn fail_at(&self, n: u64) {
        self.inner.lock().unwrap().failing.insert(n);
    }

    pub(crate) fn heal(&self, n: u64) {
        self.inner.lock().unwrap().failing.remove(&n);
    }

    /// Header requests fail with a transport error from now on.
    pub(crate) fn fail_headers(&self) {
        self.inner.lock().unwrap().headers_down = true;
    }

    /// Block numbers passed to `block_hash_pair`, in call order.
    pub(crate) fn requested(&self) -> Vec<u64> {
        self.inner.lock().unwrap().requested.clone()
    }

    fn headers_reachable(&self) -> Result<(), RpcError> {
        if self.inner.lock().unwrap().headers_down {
            return Err(RpcError::Client("connection reset by peer".to_string()));
        }
        Ok(())
    }

    fn resolve(&self, block: BlockNumberOrTag) -> Result<u64, RpcError> {
        let produced = self.inner.lock().unwrap().produced;
        let n = match block {
            BlockNumberOrTag::Number(n) => n,
            BlockNumberOrTag::Earliest => 0,
            _ => produced.checked_sub(1).ok_or(RpcError::NotFound)?,
        };
        if n < produced {
            Ok(n)
        } else {
            Err(RpcError::NotFound)
        }
    }
}

impl ChainSource for MockChain {
    async fn current_height(&self) -> Result<u64, RpcError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.reported_head.unwrap_or(inner.produced))
    }

    async fn block_hash_pair(&self, block: BlockNumberOrTag) -> Result<BlockHashPair, RpcError> {
        if let BlockNumberOrTag::Number(n) = block {
            let mut inner = self.inner.lock().unwrap();
            inner.requested.push(n);
            if inner.failing.contains(&n) {
                return Err(RpcError::Client("connection refused".to_string()));
            }
        }
        let n = self.resolve(block)?;
        Ok(BlockHashPair {
            canonical_hash: canonical_hash(n),
            native_hash: native_hash(n),
        })
    }

    async fn header_by_number(&self, block: BlockNumberOrTag) -> Result<RpcHeader, RpcError> {
        self.headers_reachable()?;
        self.resolve(block).map(raw_header)
    }

    async fn header_by_hash(&self, hash: B256) -> Result<RpcHeader, RpcError> {
        self.headers_reachable()?;
        let produced = self.inner.lock().unwrap().produced;
        (0..produced)
            .find(|n| native_hash(*n) == hash)
            .map(raw_header)
            .ok_or(RpcError::NotFound)
    }
}

/// A temporary `DiskStore` whose writes or reads can be switched to fail.
pub(crate) struct FlakyStore {
    _dir: tempfile::TempDir,
    inner: DiskStore,
    writes_down: AtomicBool,
    reads_down: AtomicBool,
}

impl FlakyStore {
    pub(crate) fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let inner = DiskStore::open(dir.path().join("bridge.redb")).unwrap();
        Self {
            _dir: dir,
            inner,
            writes_down: AtomicBool::new(false),
            reads_down: AtomicBool::new(false),
        }
    }

    pub(crate) fn fail_writes(&self) {
        self.writes_down.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_reads(&self) {
        self.reads_down.store(true, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Database("disk full".to_string()));
        }
        Ok(())
    }
}

impl TranslationStore for FlakyStore {
    fn put(&self, number: u64, native: B256, canonical: B256) -> Result<(), StoreError> {
        Self::check(&self.writes_down)?;
        self.inner.put(number, native, canonical)
    }

    fn lookup_canonical(&self, native: &B256) -> Result<Option<B256>, StoreError> {
        Self::check(&self.reads_down)?;
        self.inner.lookup_canonical(native)
    }

    fn lookup_native(&self, canonical: &B256) -> Result<Option<B256>, StoreError> {
        Self::check(&self.reads_down)?;
        self.inner.lookup_native(canonical)
    }

    fn checkpoint(&self) -> Result<Option<u64>, StoreError> {
        Self::check(&self.reads_down)?;
        self.inner.checkpoint()
    }
}
