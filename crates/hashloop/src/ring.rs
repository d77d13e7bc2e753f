//! Consistent hashing ring implementation.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, trace};

use crate::config::{MIN_REPLICAS, RingConfig, TOP_WEIGHT};
use crate::error::RingError;
use crate::hash::RingHasher;
use crate::node::NodeKey;

/// Salt mixed into the key when several nodes share one ring position.
const COLLISION_SALT: u64 = 167_777_619;

/// A key whose primary node differs between two rings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration<N> {
    /// The key that moves.
    pub key: Vec<u8>,
    /// The node that owns it in the old ring.
    pub from: N,
    /// The node that owns it in the new ring.
    pub to: N,
}

/// A registered node and the replica count it was placed with.
#[derive(Debug, Clone)]
struct Member<N> {
    node: N,
    replicas: usize,
}

/// Everything guarded by the ring's lock.
#[derive(Debug, Clone)]
struct RingState<N> {
    /// Ring position -> node keys placed there, sorted by node key.
    positions: BTreeMap<u64, Vec<Arc<str>>>,
    /// Node key -> node value and replica count.
    members: HashMap<Arc<str>, Member<N>>,
}

impl<N> RingState<N> {
    fn new() -> Self {
        Self {
            positions: BTreeMap::new(),
            members: HashMap::new(),
        }
    }

    /// Place `replicas` virtual nodes for `key`. The caller has already
    /// removed any previous registration.
    fn insert(&mut self, hasher: &dyn RingHasher, key: Arc<str>, node: N, replicas: usize) {
        for i in 0..replicas {
            let pos = replica_position(hasher, &key, i);
            let occupants = self.positions.entry(pos).or_default();
            // Occupants stay sorted by node key.
            let at = occupants.partition_point(|k| **k <= *key);
            occupants.insert(at, Arc::clone(&key));
        }
        self.members.insert(key, Member { node, replicas });
    }

    /// Remove every virtual node of `key`. Returns `false` if it was not
    /// registered.
    fn remove(&mut self, hasher: &dyn RingHasher, key: &str) -> bool {
        let Some(member) = self.members.remove(key) else {
            return false;
        };

        for i in 0..member.replicas {
            let pos = replica_position(hasher, key, i);
            if let Entry::Occupied(mut occupants) = self.positions.entry(pos) {
                occupants.get_mut().retain(|k| &**k != key);
                if occupants.get().is_empty() {
                    occupants.remove();
                }
            }
        }
        true
    }

    /// Positions in clockwise order starting at the first position `>= hash`.
    fn walk(&self, hash: u64) -> impl Iterator<Item = &Vec<Arc<str>>> {
        self.positions
            .range(hash..)
            .chain(self.positions.range(..hash))
            .map(|(_, occupants)| occupants)
    }

    fn node(&self, key: &str) -> &N {
        &self.members[key].node
    }
}

/// Consistent hashing ring mapping keys to nodes.
///
/// Each node is mapped to multiple virtual nodes (replicas) on a `u64`
/// circle. A key belongs to the first replica at or after the key's hash,
/// wrapping around at the top. Multi-node lookups keep walking clockwise
/// until enough distinct nodes are found.
///
/// The ring is internally synchronized: mutations take an exclusive lock,
/// lookups a shared one, so a `Ring` can be shared behind an `Arc` without
/// extra locking.
pub struct Ring<N> {
    state: RwLock<RingState<N>>,
    hasher: Arc<dyn RingHasher>,
    /// Default replicas per node, and the per-node upper bound.
    replicas: usize,
}

impl<N: NodeKey + Clone> Ring<N> {
    /// Create an empty ring.
    ///
    /// `replicas` is raised to [`MIN_REPLICAS`] if smaller. Without a
    /// `hasher` the ring uses CRC-32.
    pub fn new(replicas: usize, hasher: Option<Arc<dyn RingHasher>>) -> Self {
        let config = RingConfig {
            replicas: replicas.max(MIN_REPLICAS),
            ..RingConfig::default()
        };
        match hasher {
            Some(hasher) => Self::with_hasher(&config, hasher),
            None => Self::with_config(&config),
        }
    }

    /// Create an empty ring from configuration, using its built-in hasher.
    pub fn with_config(config: &RingConfig) -> Self {
        Self::with_hasher(config, config.hasher.hasher())
    }

    /// Create an empty ring from configuration with a custom hasher.
    ///
    /// `config.hasher` is ignored.
    pub fn with_hasher(config: &RingConfig, hasher: Arc<dyn RingHasher>) -> Self {
        Self {
            state: RwLock::new(RingState::new()),
            hasher,
            replicas: config.effective_replicas(),
        }
    }

    /// Add a node with the default replica count.
    pub fn add(&self, node: N) {
        self.add_with_replicas(node, self.replicas);
    }

    /// Add a node with an explicit replica count.
    ///
    /// Re-adding a registered node replaces its replicas, so this also
    /// changes the replica count of an existing node. `replicas` is capped
    /// at the ring's default replica count.
    pub fn add_with_replicas(&self, node: N, replicas: usize) {
        let replicas = replicas.min(self.replicas);
        let key: Arc<str> = Arc::from(node.node_key());

        let mut state = self.write();
        state.remove(self.hasher.as_ref(), &key);
        state.insert(self.hasher.as_ref(), Arc::clone(&key), node, replicas);

        debug!(
            node = %key,
            replicas,
            positions = state.positions.len(),
            "added node to ring"
        );
    }

    /// Add a node with a weight relative to [`TOP_WEIGHT`].
    ///
    /// A weight of 100 gets the full default replica count, 50 gets half.
    /// A weight of 0 registers the node without placing any replica, so it
    /// is never selected.
    pub fn add_with_weight(&self, node: N, weight: usize) {
        let replicas = self.replicas.saturating_mul(weight) / TOP_WEIGHT;
        self.add_with_replicas(node, replicas);
    }

    /// Remove a node. Removing an unknown node is a no-op.
    pub fn remove<Q: NodeKey + ?Sized>(&self, node: &Q) {
        let key = node.node_key();
        let mut state = self.write();
        if state.remove(self.hasher.as_ref(), &key) {
            debug!(
                node = %key,
                positions = state.positions.len(),
                "removed node from ring"
            );
        }
    }

    /// Reconcile the ring to exactly `nodes`.
    ///
    /// Registered nodes missing from `nodes` are removed, new ones are added
    /// with the default replica count, and nodes present in both are left
    /// untouched.
    pub fn set<I>(&self, nodes: I)
    where
        I: IntoIterator<Item = N>,
    {
        let wanted: Vec<(String, N)> = nodes
            .into_iter()
            .map(|node| (node.node_key(), node))
            .collect();
        let wanted_keys: HashSet<&str> = wanted.iter().map(|(k, _)| k.as_str()).collect();

        let mut state = self.write();

        let stale: Vec<Arc<str>> = state
            .members
            .keys()
            .filter(|k| !wanted_keys.contains(&***k))
            .cloned()
            .collect();
        for key in &stale {
            state.remove(self.hasher.as_ref(), key);
        }

        let mut added = 0usize;
        for (key, node) in wanted {
            if state.members.contains_key(key.as_str()) {
                continue;
            }
            state.insert(self.hasher.as_ref(), Arc::from(key), node, self.replicas);
            added += 1;
        }

        debug!(
            removed = stale.len(),
            added,
            nodes = state.members.len(),
            "reconciled ring membership"
        );
    }

    /// Return the node owning `key`.
    pub fn get<K: AsRef<[u8]> + ?Sized>(&self, key: &K) -> Result<N, RingError> {
        let key = key.as_ref();
        let state = self.read();
        let (_, primary) = self.primary(&state, key)?;
        Ok(state.node(primary).clone())
    }

    /// Return the node owning `key` and the next distinct node clockwise.
    ///
    /// The second node is `None` only when no other node has a replica on
    /// the ring, typically because the ring holds a single node.
    pub fn get_two<K: AsRef<[u8]> + ?Sized>(&self, key: &K) -> Result<(N, Option<N>), RingError> {
        let key = key.as_ref();
        let state = self.read();
        let (hash, primary) = self.primary(&state, key)?;
        let first = state.node(primary).clone();

        if state.members.len() == 1 {
            return Ok((first, None));
        }

        let second = successors(&state, hash)
            .find(|k| **k != *primary)
            .map(|k| state.node(k).clone());
        Ok((first, second))
    }

    /// Return up to `n` distinct nodes for `key`, in clockwise order.
    ///
    /// The first node is the one [`get`](Self::get) returns. Fewer than `n`
    /// nodes come back when the ring holds fewer distinct nodes.
    pub fn get_n<K: AsRef<[u8]> + ?Sized>(&self, key: &K, n: usize) -> Result<Vec<N>, RingError> {
        let key = key.as_ref();
        let state = self.read();
        let (hash, primary) = self.primary(&state, key)?;

        let n = n.min(state.members.len());
        if n == 0 {
            return Ok(Vec::new());
        }

        let mut found: Vec<&Arc<str>> = Vec::with_capacity(n);
        found.push(primary);

        for k in successors(&state, hash) {
            if found.len() == n {
                break;
            }
            if !found.contains(&k) {
                found.push(k);
            }
        }

        Ok(found.into_iter().map(|k| state.node(k).clone()).collect())
    }

    /// Return the keys of all registered nodes, sorted.
    pub fn members(&self) -> Vec<String> {
        let state = self.read();
        let mut keys: Vec<String> = state.members.keys().map(|k| k.to_string()).collect();
        keys.sort_unstable();
        keys
    }

    /// Return all registered node values, sorted by node key.
    pub fn nodes(&self) -> Vec<N> {
        let state = self.read();
        let mut members: Vec<(&Arc<str>, &Member<N>)> = state.members.iter().collect();
        members.sort_unstable_by(|a, b| a.0.cmp(b.0));
        members.into_iter().map(|(_, m)| m.node.clone()).collect()
    }

    /// Return whether `node` is registered.
    pub fn contains<Q: NodeKey + ?Sized>(&self, node: &Q) -> bool {
        self.read().members.contains_key(node.node_key().as_str())
    }

    /// Return the replica count `node` was added with, if registered.
    pub fn replicas_of<Q: NodeKey + ?Sized>(&self, node: &Q) -> Option<usize> {
        self.read()
            .members
            .get(node.node_key().as_str())
            .map(|m| m.replicas)
    }

    /// Return the default replica count.
    pub fn replicas(&self) -> usize {
        self.replicas
    }

    /// Return the number of registered nodes.
    pub fn node_count(&self) -> usize {
        self.read().members.len()
    }

    /// Return the number of distinct positions on the ring.
    pub fn position_count(&self) -> usize {
        self.read().positions.len()
    }

    /// Return whether no node is registered.
    pub fn is_empty(&self) -> bool {
        self.read().members.is_empty()
    }

    /// Count how many of `keys` each node owns as primary.
    ///
    /// Every registered node appears in the result, possibly with zero.
    pub fn distribution<K: AsRef<[u8]>>(&self, keys: &[K]) -> BTreeMap<String, usize> {
        let state = self.read();
        let mut counts: BTreeMap<String, usize> = state
            .members
            .keys()
            .map(|k| (k.to_string(), 0))
            .collect();

        for key in keys {
            if let Ok((_, primary)) = self.primary(&state, key.as_ref()) {
                *counts.entry(primary.to_string()).or_default() += 1;
            }
        }
        counts
    }

    /// Copy the ring's current state into an independent ring.
    ///
    /// The copy shares the hasher, so it can be mutated and compared with
    /// [`diff`](Self::diff) to preview a membership change.
    pub fn snapshot(&self) -> Self {
        Self {
            state: RwLock::new(self.read().clone()),
            hasher: Arc::clone(&self.hasher),
            replicas: self.replicas,
        }
    }

    /// Compute which keys change primary owner between two rings.
    ///
    /// Keys that cannot be placed on either ring (empty ring) are skipped.
    pub fn diff<K: AsRef<[u8]>>(old: &Ring<N>, new: &Ring<N>, keys: &[K]) -> Vec<Migration<N>> {
        if std::ptr::eq(old, new) {
            return Vec::new();
        }

        // Copy one side first so two rings are never locked at once.
        let new_state = new.read().clone();
        let old_state = old.read();
        let mut migrations = Vec::new();

        for key in keys {
            let key = key.as_ref();
            let (Ok((_, from)), Ok((_, to))) =
                (old.primary(&old_state, key), new.primary(&new_state, key))
            else {
                continue;
            };
            if from != to {
                migrations.push(Migration {
                    key: key.to_vec(),
                    from: old_state.node(from).clone(),
                    to: new_state.node(to).clone(),
                });
            }
        }

        migrations
    }

    /// Resolve the key's hash and the node key of its primary owner.
    fn primary<'s>(
        &self,
        state: &'s RingState<N>,
        key: &[u8],
    ) -> Result<(u64, &'s Arc<str>), RingError> {
        let hash = self.hasher.hash(key);
        let occupants = state.walk(hash).next().ok_or(RingError::EmptyRing)?;

        let primary = match occupants.as_slice() {
            [only] => only,
            _ => {
                let pick = self.collision_index(key, occupants.len());
                trace!(
                    occupants = occupants.len(),
                    pick, "resolving collision on ring position"
                );
                &occupants[pick]
            }
        };
        Ok((hash, primary))
    }

    /// Pick among `len` nodes sharing a position with a salted rehash of
    /// the key, so shared positions split their traffic.
    fn collision_index(&self, key: &[u8], len: usize) -> usize {
        let mut salted = format!("{COLLISION_SALT}:").into_bytes();
        salted.extend_from_slice(key);
        (self.hasher.hash(&salted) % len as u64) as usize
    }

    fn read(&self) -> RwLockReadGuard<'_, RingState<N>> {
        self.state.read().expect("lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, RingState<N>> {
        self.state.write().expect("lock poisoned")
    }
}

impl<N: NodeKey + Clone> Default for Ring<N> {
    fn default() -> Self {
        Self::with_config(&RingConfig::default())
    }
}

impl<N> fmt::Debug for Ring<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Ring");
        s.field("replicas", &self.replicas);
        match self.state.read() {
            Ok(state) => s
                .field("nodes", &state.members.len())
                .field("positions", &state.positions.len()),
            Err(_) => s.field("state", &"<poisoned>"),
        };
        s.finish()
    }
}

/// Node keys met walking clockwise from the position after the key's
/// primary position, finishing with the primary position's own occupants.
fn successors<N>(state: &RingState<N>, hash: u64) -> impl Iterator<Item = &Arc<str>> {
    let mut positions = state.walk(hash);
    let start = positions.next();
    positions
        .chain(start)
        .flat_map(|occupants| occupants.iter())
}

/// Position of replica `index` of `key`: `hash(index ++ key)`.
fn replica_position(hasher: &dyn RingHasher, key: &str, index: usize) -> u64 {
    let input = format!("{index}{key}");
    hasher.hash(input.as_bytes())
}

// Compile-time check that the ring can be shared across threads.
const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Ring<String>>();
};
