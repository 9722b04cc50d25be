//! Typed, context-scoped message links between node pairs.

use crate::{Report, Request};
use entail_core::{NodeId, Substitution};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// The kind of a channel.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum ChannelKind {
    /// Reports flow antecedent -> rule; requests flow rule -> antecedent.
    AntecedentToRule,
    /// Reports flow rule -> consequent; requests flow consequent -> rule.
    RuleToConsequent,
}

/// A directed, context-scoped message link between two nodes.
///
/// Reports travel from `reporter` to `listener`; requests travel the other
/// way on the same link. Buffers are appended by the sending side and drained
/// by the processing side with a peek/process/acknowledge cycle: the batch is
/// cleared only after it has been processed, so a failure mid-batch loses
/// nothing, and appends that race the drain are preserved for the next turn.
#[derive(Debug)]
pub struct Channel {
    /// Channel kind.
    pub kind: ChannelKind,
    /// The node reports originate from.
    pub reporter: NodeId,
    /// The node that drains reports (and originates requests).
    pub listener: NodeId,
    /// The context this channel is scoped to.
    pub context: String,
    /// The bindings the listener is interested in. Reports whose
    /// substitution is incompatible with the filter are not admitted.
    pub filter: Substitution,
    reports: Mutex<VecDeque<Report>>,
    requests: Mutex<VecDeque<Request>>,
    seen_requests: Mutex<HashSet<Request>>,
}

impl Channel {
    fn new(
        kind: ChannelKind,
        reporter: NodeId,
        listener: NodeId,
        context: String,
        filter: Substitution,
    ) -> Self {
        Self {
            kind,
            reporter,
            listener,
            context,
            filter,
            reports: Mutex::new(VecDeque::new()),
            requests: Mutex::new(VecDeque::new()),
            seen_requests: Mutex::new(HashSet::new()),
        }
    }

    /// Whether the channel admits this report.
    pub fn accepts(&self, report: &Report) -> bool {
        report.context == self.context && report.substitution.compatible(&self.filter)
    }

    /// Append a report; returns false if the filter rejected it.
    pub fn send_report(&self, report: Report) -> bool {
        if !self.accepts(&report) {
            return false;
        }
        self.reports.lock().push_back(report);
        true
    }

    /// Append a request; returns false if an identical request has already
    /// traveled this channel (cycle guard).
    pub fn send_request(&self, request: Request) -> bool {
        if !self.seen_requests.lock().insert(request.clone()) {
            return false;
        }
        self.requests.lock().push_back(request);
        true
    }

    /// Snapshot the pending reports without consuming them.
    pub fn peek_reports(&self) -> Vec<Report> {
        self.reports.lock().iter().cloned().collect()
    }

    /// Acknowledge the first `n` reports after successful processing.
    pub fn ack_reports(&self, n: usize) {
        let mut buf = self.reports.lock();
        for _ in 0..n.min(buf.len()) {
            buf.pop_front();
        }
    }

    /// Snapshot the pending requests without consuming them.
    pub fn peek_requests(&self) -> Vec<Request> {
        self.requests.lock().iter().cloned().collect()
    }

    /// Acknowledge the first `n` requests after successful processing.
    pub fn ack_requests(&self, n: usize) {
        let mut buf = self.requests.lock();
        for _ in 0..n.min(buf.len()) {
            buf.pop_front();
        }
    }

    /// Whether anything is waiting in either buffer.
    pub fn has_pending(&self) -> bool {
        !self.reports.lock().is_empty() || !self.requests.lock().is_empty()
    }
}

type ChannelKey = (ChannelKind, NodeId, NodeId, String, Substitution);

/// Engine-owned store of channels, keyed by
/// (kind, reporter, listener, context, filter) and created lazily when
/// propagation first needs them.
#[derive(Debug, Default)]
pub struct ChannelTable {
    channels: Vec<Arc<Channel>>,
    by_key: HashMap<ChannelKey, usize>,
    by_listener: HashMap<NodeId, SmallVec<[usize; 8]>>,
    by_reporter: HashMap<NodeId, SmallVec<[usize; 8]>>,
}

impl ChannelTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Find or create the channel for the given key.
    pub fn ensure(
        &mut self,
        kind: ChannelKind,
        reporter: NodeId,
        listener: NodeId,
        context: &str,
        filter: Substitution,
    ) -> Arc<Channel> {
        let key = (kind, reporter, listener, context.to_string(), filter.clone());
        if let Some(&i) = self.by_key.get(&key) {
            return Arc::clone(&self.channels[i]);
        }
        let channel = Arc::new(Channel::new(
            kind,
            reporter,
            listener,
            context.to_string(),
            filter,
        ));
        let i = self.channels.len();
        self.channels.push(Arc::clone(&channel));
        self.by_key.insert(key, i);
        self.by_listener.entry(listener).or_default().push(i);
        self.by_reporter.entry(reporter).or_default().push(i);
        channel
    }

    /// The channels whose reports `node` drains.
    pub fn incoming(&self, node: NodeId) -> Vec<Arc<Channel>> {
        match self.by_listener.get(&node) {
            Some(indices) => indices
                .iter()
                .map(|&i| Arc::clone(&self.channels[i]))
                .collect(),
            None => vec![],
        }
    }

    /// The channels whose requests `node` drains.
    pub fn outgoing(&self, node: NodeId) -> Vec<Arc<Channel>> {
        match self.by_reporter.get(&node) {
            Some(indices) => indices
                .iter()
                .map(|&i| Arc::clone(&self.channels[i]))
                .collect(),
            None => vec![],
        }
    }

    /// Number of channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Drop every channel.
    pub fn clear(&mut self) {
        self.channels.clear();
        self.by_key.clear();
        self.by_listener.clear();
        self.by_reporter.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Polarity;
    use std::collections::BTreeSet;

    fn n(i: u32) -> NodeId {
        NodeId(i)
    }

    fn report(subst: Substitution) -> Report {
        Report::new("ctx", Polarity::Positive, subst, BTreeSet::new(), n(1))
    }

    #[test]
    fn test_filter_rejects_incompatible_reports() {
        let filter = Substitution::new().bind(n(10), n(20));
        let ch = Channel::new(
            ChannelKind::AntecedentToRule,
            n(1),
            n(2),
            "ctx".into(),
            filter,
        );

        assert!(ch.send_report(report(Substitution::new().bind(n(10), n(20)))));
        assert!(!ch.send_report(report(Substitution::new().bind(n(10), n(99)))));
        // An unbound variable is a wildcard.
        assert!(ch.send_report(report(Substitution::new())));
        assert_eq!(ch.peek_reports().len(), 2);
    }

    #[test]
    fn test_ack_only_clears_processed_prefix() {
        let ch = Channel::new(
            ChannelKind::AntecedentToRule,
            n(1),
            n(2),
            "ctx".into(),
            Substitution::new(),
        );
        ch.send_report(report(Substitution::new()));
        ch.send_report(report(Substitution::new().bind(n(3), n(4))));

        let batch = ch.peek_reports();
        assert_eq!(batch.len(), 2);

        // A concurrent append lands after the snapshot.
        ch.send_report(report(Substitution::new().bind(n(5), n(6))));
        ch.ack_reports(batch.len());

        let rest = ch.peek_reports();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].substitution, Substitution::new().bind(n(5), n(6)));
    }

    #[test]
    fn test_duplicate_requests_are_suppressed() {
        let ch = Channel::new(
            ChannelKind::RuleToConsequent,
            n(1),
            n(2),
            "ctx".into(),
            Substitution::new(),
        );
        let req = Request::new("ctx", Substitution::new(), n(2));
        assert!(ch.send_request(req.clone()));
        assert!(!ch.send_request(req));
        assert_eq!(ch.peek_requests().len(), 1);
    }

    #[test]
    fn test_table_lazily_creates_and_indexes() {
        let mut table = ChannelTable::new();
        let a = table.ensure(
            ChannelKind::AntecedentToRule,
            n(1),
            n(2),
            "ctx",
            Substitution::new(),
        );
        let b = table.ensure(
            ChannelKind::AntecedentToRule,
            n(1),
            n(2),
            "ctx",
            Substitution::new(),
        );
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(table.len(), 1);
        assert_eq!(table.incoming(n(2)).len(), 1);
        assert_eq!(table.outgoing(n(1)).len(), 1);
        assert!(table.incoming(n(1)).is_empty());
    }
}
