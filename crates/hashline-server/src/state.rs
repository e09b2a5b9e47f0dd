use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use hashline_ledger::{LedgerError, LedgerResult, StoredLedger};
use hashline_protocol::LedgerCodec;
use hashline_types::{LedgerHeader, Record, RecordNum};
use tracing::{debug, info};

use crate::config::TrustedPeers;
use crate::propagator::Propagate;

/// What happened to a spread record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpreadOutcome {
    Appended,
    /// The ledger already holds a record with this number.
    Duplicate,
}

/// Everything connection handlers share.
///
/// The ledger sits behind one `RwLock`. Mutations hold the write lock across
/// validation, recompute and persistence; reads copy out what they need.
pub struct NodeState {
    ledger: RwLock<StoredLedger>,
    codec: LedgerCodec,
    peers: TrustedPeers,
    watchdog: Duration,
    propagator: Arc<dyn Propagate>,
}

impl NodeState {
    pub fn new(
        ledger: StoredLedger,
        peers: TrustedPeers,
        watchdog: Duration,
        propagator: Arc<dyn Propagate>,
    ) -> Self {
        let codec = LedgerCodec::for_digest(ledger.chain().validator().digest().as_ref());
        Self {
            ledger: RwLock::new(ledger),
            codec,
            peers,
            watchdog,
            propagator,
        }
    }

    pub fn codec(&self) -> &LedgerCodec {
        &self.codec
    }

    pub fn peers(&self) -> &TrustedPeers {
        &self.peers
    }

    pub fn watchdog(&self) -> Duration {
        self.watchdog
    }

    pub fn header(&self) -> LedgerResult<LedgerHeader> {
        Ok(self.read()?.header())
    }

    pub fn record(&self, num: RecordNum) -> LedgerResult<Record> {
        self.read()?.get(num).cloned()
    }

    /// Copy of every record, newest first.
    pub fn snapshot_desc(&self) -> LedgerResult<Vec<Record>> {
        Ok(self.read()?.ledger().records.iter().rev().cloned().collect())
    }

    /// Append a record submitted by a client.
    pub fn accept(&self, record: Record) -> LedgerResult<()> {
        let mut ledger = self.write()?;
        let num = record.num;
        ledger.accept(record)?;
        info!(num, "record accepted");
        Ok(())
    }

    /// Append a record spread by a trusted peer, unless one with the same
    /// number is already the last record.
    pub fn accept_spread(&self, record: Record) -> LedgerResult<SpreadOutcome> {
        let mut ledger = self.write()?;
        if record.num == ledger.num() {
            debug!(num = record.num, "spread record already held");
            return Ok(SpreadOutcome::Duplicate);
        }
        let num = record.num;
        ledger.accept(record)?;
        info!(num, "spread record appended");
        Ok(SpreadOutcome::Appended)
    }

    /// Run the propagator for `record` on a detached task.
    pub fn spawn_spread(&self, record: Record) {
        let propagator = self.propagator.clone();
        tokio::spawn(async move {
            let report = propagator.spread(&record).await;
            debug!(
                num = record.num,
                delivered = report.delivered.len(),
                failed = report.failed.len(),
                "propagation finished"
            );
        });
    }

    fn read(&self) -> LedgerResult<RwLockReadGuard<'_, StoredLedger>> {
        self.ledger.read().map_err(|_| LedgerError::LockPoisoned)
    }

    fn write(&self) -> LedgerResult<RwLockWriteGuard<'_, StoredLedger>> {
        self.ledger.write().map_err(|_| LedgerError::LockPoisoned)
    }
}

impl std::fmt::Debug for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeState")
            .field("peers", &self.peers)
            .field("watchdog", &self.watchdog)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use async_trait::async_trait;
    use hashline_crypto::{Blake3Digest, DigestAlgorithm, SharedDigest};
    use hashline_store::InMemoryLedgerStore;
    use tokio::sync::mpsc;

    use super::*;
    use crate::propagator::SpreadReport;

    /// Propagator that hands every record to a channel instead of the network.
    pub(crate) struct RecordingPropagator(pub mpsc::UnboundedSender<Record>);

    #[async_trait]
    impl Propagate for RecordingPropagator {
        async fn spread(&self, record: &Record) -> SpreadReport {
            let _ = self.0.send(record.clone());
            SpreadReport::default()
        }
    }

    pub(crate) fn digest() -> SharedDigest {
        Arc::new(Blake3Digest)
    }

    /// A node holding `count` records, trusting only 10.0.0.1 and 10.0.0.2.
    pub(crate) fn node(count: usize) -> (Arc<NodeState>, mpsc::UnboundedReceiver<Record>) {
        let store = Arc::new(InMemoryLedgerStore::new(Blake3Digest.reserved()));
        let mut ledger = StoredLedger::open(digest(), store).unwrap();
        for i in 0..count {
            let record = ledger.next_record(format!("r{i}").into_bytes()).unwrap();
            ledger.append(record).unwrap();
        }
        let peers = TrustedPeers::new(
            vec!["10.0.0.1:7000".parse().unwrap(), "10.0.0.2:7000".parse().unwrap()],
            0,
        )
        .unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        let state = NodeState::new(
            ledger,
            peers,
            Duration::from_millis(200),
            Arc::new(RecordingPropagator(tx)),
        );
        (Arc::new(state), rx)
    }

    pub(crate) fn next_record(state: &NodeState, data: &[u8]) -> Record {
        state.read().unwrap().next_record(data.to_vec()).unwrap()
    }

    #[test]
    fn reads_copy_out() {
        let (state, _rx) = node(3);
        assert_eq!(state.header().unwrap().num, 3);
        assert_eq!(state.record(2).unwrap().num, 2);
        let nums: Vec<_> = state.snapshot_desc().unwrap().iter().map(|r| r.num).collect();
        assert_eq!(nums, vec![3, 2, 1]);
        assert!(matches!(state.record(4), Err(LedgerError::InvalidNumber(_))));
    }

    #[test]
    fn spread_with_known_number_is_noop() {
        let (state, _rx) = node(2);
        let mut record = next_record(&state, b"x");
        record.num = 2;
        assert_eq!(state.accept_spread(record).unwrap(), SpreadOutcome::Duplicate);
        assert_eq!(state.header().unwrap().num, 2);
    }

    #[test]
    fn spread_appends_continuation() {
        let (state, _rx) = node(2);
        let record = next_record(&state, b"x");
        assert_eq!(state.accept_spread(record).unwrap(), SpreadOutcome::Appended);
        assert_eq!(state.header().unwrap().num, 3);
    }

    #[test]
    fn empty_node_requires_first_record() {
        let (state, _rx) = node(0);
        let mut record = next_record(&state, b"x");
        record.num = 2;
        record.hash = Blake3Digest.hash_record(&record.prev_hash, 2, &record.data);
        assert!(state.accept(record).is_err());
        state.accept(next_record(&state, b"x")).unwrap();
        assert_eq!(state.header().unwrap().num, 1);
    }

    #[tokio::test]
    async fn concurrent_submissions_extend_tail_once() {
        let (state, _rx) = node(1);
        let a = next_record(&state, b"a");
        let b = next_record(&state, b"b");

        let s1 = state.clone();
        let s2 = state.clone();
        let t1 = tokio::task::spawn_blocking(move || s1.accept(a));
        let t2 = tokio::task::spawn_blocking(move || s2.accept(b));
        let results = [t1.await.unwrap(), t2.await.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(state.header().unwrap().num, 2);
    }
}
