//! Channel and glob-pattern publish/subscribe routing (§3.5, §4.11).
//!
//! `PubSub` only tracks *who* should receive a message; writing the actual
//! frame to a client's socket is the embedding dispatcher's job, which is
//! why `publish` returns recipient ids rather than doing any I/O.

use corekv_core::glob_match;
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

/// Opaque client identifier, scoped by the embedding engine.
pub type ClientId = u64;

/// Recipients of a `PUBLISH`, split by how they matched.
#[derive(Debug, Default, Clone)]
pub struct PublishResult {
    /// Clients subscribed directly to the channel.
    pub channel_subscribers: Vec<ClientId>,
    /// Clients whose pattern matched, paired with the matching pattern —
    /// a client delivers `(pattern, channel, message)`, so the pattern is
    /// needed at the delivery site.
    pub pattern_subscribers: Vec<(ClientId, Vec<u8>)>,
}

impl PublishResult {
    /// Total recipient count — `PUBLISH`'s integer reply.
    pub fn count(&self) -> usize {
        self.channel_subscribers.len() + self.pattern_subscribers.len()
    }
}

/// Global channel and pattern subscription tables.
#[derive(Default)]
pub struct PubSub {
    channels: HashMap<Vec<u8>, HashSet<ClientId>>,
    patterns: Vec<(ClientId, Vec<u8>)>,
}

impl PubSub {
    /// An empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// `SUBSCRIBE channel`. Returns `true` if this client wasn't already
    /// subscribed to it.
    pub fn subscribe(&mut self, client: ClientId, channel: &[u8]) -> bool {
        self.channels.entry(channel.to_vec()).or_default().insert(client)
    }

    /// `UNSUBSCRIBE channel`. Returns `true` if the client had been
    /// subscribed; removes the channel entry entirely once its last
    /// subscriber leaves.
    pub fn unsubscribe(&mut self, client: ClientId, channel: &[u8]) -> bool {
        let Some(subs) = self.channels.get_mut(channel) else {
            return false;
        };
        let removed = subs.remove(&client);
        if subs.is_empty() {
            self.channels.remove(channel);
        }
        removed
    }

    /// `UNSUBSCRIBE` with no arguments: removes `client` from every channel
    /// it's subscribed to. Returns the channels it was removed from, which
    /// the caller echoes back as per-channel unsubscribe acknowledgements.
    pub fn unsubscribe_all(&mut self, client: ClientId) -> Vec<Vec<u8>> {
        let mut left = Vec::new();
        self.channels.retain(|channel, subs| {
            if subs.remove(&client) {
                left.push(channel.clone());
            }
            !subs.is_empty()
        });
        left
    }

    /// `PSUBSCRIBE pattern`. Patterns are not deduplicated per client —
    /// subscribing to the same pattern twice yields two entries, matching
    /// the reference implementation (each carries its own ack).
    pub fn psubscribe(&mut self, client: ClientId, pattern: &[u8]) {
        self.patterns.push((client, pattern.to_vec()));
    }

    /// `PUNSUBSCRIBE pattern`. Removes at most one matching `(client,
    /// pattern)` entry. Returns `true` if one was found.
    pub fn punsubscribe(&mut self, client: ClientId, pattern: &[u8]) -> bool {
        if let Some(pos) = self
            .patterns
            .iter()
            .position(|(c, p)| *c == client && p.as_slice() == pattern)
        {
            self.patterns.remove(pos);
            true
        } else {
            false
        }
    }

    /// `PUNSUBSCRIBE` with no arguments: removes every pattern registered
    /// by `client`. Returns the patterns removed.
    pub fn punsubscribe_all(&mut self, client: ClientId) -> Vec<Vec<u8>> {
        let mut left = Vec::new();
        self.patterns.retain(|(c, p)| {
            if *c == client {
                left.push(p.clone());
                false
            } else {
                true
            }
        });
        left
    }

    /// `PUBLISH channel message`: every direct subscriber, then every
    /// pattern whose glob matches `channel`. The integer reply is
    /// `result.count()`.
    pub fn publish(&self, channel: &[u8]) -> PublishResult {
        let channel_subscribers = self
            .channels
            .get(channel)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        let pattern_subscribers = self
            .patterns
            .iter()
            .filter(|(_, pattern)| glob_match(pattern, channel))
            .map(|(c, p)| (*c, p.clone()))
            .collect();
        PublishResult {
            channel_subscribers,
            pattern_subscribers,
        }
    }

    /// `PUBSUB CHANNELS [pattern]`: active channels (those with at least
    /// one direct subscriber), optionally filtered by a glob pattern.
    pub fn channels(&self, pattern: Option<&[u8]>) -> Vec<Vec<u8>> {
        self.channels
            .keys()
            .filter(|c| pattern.map_or(true, |p| glob_match(p, c)))
            .cloned()
            .collect()
    }

    /// `PUBSUB NUMSUB channel`: direct subscriber count for one channel.
    pub fn numsub(&self, channel: &[u8]) -> usize {
        self.channels.get(channel).map_or(0, |s| s.len())
    }

    /// `PUBSUB NUMPAT`: total number of pattern subscriptions across all
    /// clients.
    pub fn numpat(&self) -> usize {
        self.patterns.len()
    }
}

/// Per-client pub/sub state (§3.5): which channels and patterns this
/// client has subscribed to. Kept here as a convenience for embedding
/// engines that want it; `PubSub` itself doesn't require callers to use it.
#[derive(Default)]
pub struct ClientPubSubState {
    /// Channels this client is directly subscribed to.
    pub channels_subscribed: HashSet<Vec<u8>>,
    /// Patterns this client has `PSUBSCRIBE`d to.
    pub patterns_subscribed: Vec<Vec<u8>>,
}

impl ClientPubSubState {
    /// Total subscription count (channels + patterns), used to decide
    /// whether a client has left "subscribe mode".
    pub fn subscription_count(&self) -> usize {
        self.channels_subscribed.len() + self.patterns_subscribed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_reaches_direct_subscriber() {
        let mut ps = PubSub::new();
        ps.subscribe(1, b"news");
        let result = ps.publish(b"news");
        assert_eq!(result.channel_subscribers, vec![1]);
        assert_eq!(result.count(), 1);
    }

    #[test]
    fn publish_reaches_pattern_subscriber_with_pattern_echoed() {
        let mut ps = PubSub::new();
        ps.subscribe(1, b"news");
        ps.psubscribe(2, b"n*");
        let result = ps.publish(b"news");
        assert_eq!(result.channel_subscribers, vec![1]);
        assert_eq!(result.pattern_subscribers, vec![(2, b"n*".to_vec())]);
        assert_eq!(result.count(), 2);
    }

    #[test]
    fn unsubscribe_removes_empty_channel_entry() {
        let mut ps = PubSub::new();
        ps.subscribe(1, b"news");
        assert!(ps.unsubscribe(1, b"news"));
        assert_eq!(ps.channels(None), Vec::<Vec<u8>>::new());
    }

    #[test]
    fn unsubscribe_all_with_no_args_clears_every_channel() {
        let mut ps = PubSub::new();
        ps.subscribe(1, b"a");
        ps.subscribe(1, b"b");
        ps.subscribe(2, b"a");
        let mut left = ps.unsubscribe_all(1);
        left.sort();
        assert_eq!(left, vec![b"a".to_vec(), b"b".to_vec()]);
        assert_eq!(ps.numsub(b"a"), 1);
        assert_eq!(ps.numsub(b"b"), 0);
    }

    #[test]
    fn pubsub_introspection() {
        let mut ps = PubSub::new();
        ps.subscribe(1, b"news");
        ps.subscribe(2, b"news");
        ps.psubscribe(1, b"n*");
        ps.psubscribe(2, b"x*");
        assert_eq!(ps.numsub(b"news"), 2);
        assert_eq!(ps.numpat(), 2);
        assert_eq!(ps.channels(Some(b"n*")), vec![b"news".to_vec()]);
    }
}
