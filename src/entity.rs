use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

/// Unique token for an entity within one session instance
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub(crate) u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where an entity sits on the play surface
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Position {
    /// Percentage coordinates on the arena, 0..100 on each axis
    Point { x: f64, y: f64 },
    /// 1-based source line
    Line(u32),
    /// Grid slot index
    Slot(usize),
}

/// Something the player can act on
#[derive(Clone, Debug, PartialEq)]
pub struct Entity<K> {
    pub id: EntityId,
    pub kind: K,
    pub position: Position,
    pub spawned_at: Duration,
    pub expires_at: Option<Duration>,
}

impl<K> Entity<K> {
    pub fn is_expired(&self, now: Duration) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Live entities of a session plus the ids already resolved
#[derive(Clone, Debug)]
pub struct EntitySet<K> {
    live: Vec<Entity<K>>,
    resolved: HashSet<EntityId>,
}

impl<K> Default for EntitySet<K> {
    fn default() -> Self {
        Self {
            live: Vec::new(),
            resolved: HashSet::new(),
        }
    }
}

impl<K> EntitySet<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: Entity<K>) {
        self.live.push(entity);
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity<K>> {
        self.live.iter().find(|e| e.id == id)
    }

    /// Entity that is present, unexpired and not yet resolved
    pub fn active(&self, id: EntityId, now: Duration) -> Option<&Entity<K>> {
        self.get(id)
            .filter(|e| !e.is_expired(now) && !self.resolved.contains(&e.id))
    }

    pub fn find_at(&self, position: Position) -> Option<&Entity<K>> {
        self.live.iter().find(|e| e.position == position)
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Entity<K>> {
        let idx = self.live.iter().position(|e| e.id == id)?;
        Some(self.live.remove(idx))
    }

    /// Flag an entity as resolved. Returns false if it was already resolved
    /// or is not in the set.
    pub fn resolve(&mut self, id: EntityId) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.resolved.insert(id)
    }

    pub fn is_resolved(&self, id: EntityId) -> bool {
        self.resolved.contains(&id)
    }

    /// Drop every entity whose expiry has passed; returns how many went
    pub fn sweep_expired(&mut self, now: Duration) -> usize {
        let before = self.live.len();
        self.live.retain(|e| !e.is_expired(now));
        before - self.live.len()
    }

    /// True when the set is non-empty and every entity has been resolved
    pub fn all_resolved(&self) -> bool {
        !self.live.is_empty() && self.live.iter().all(|e| self.resolved.contains(&e.id))
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &Entity<K>> {
        self.live.iter().filter(|e| !self.resolved.contains(&e.id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity<K>> {
        self.live.iter()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn resolved_count(&self) -> usize {
        self.resolved.len()
    }

    pub fn clear(&mut self) {
        self.live.clear();
        self.resolved.clear();
    }
}
