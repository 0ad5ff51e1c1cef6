use std::time::Duration;

/// What a timer drives when it fires
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// One-second countdown tick
    Clock,
    /// Entity spawn interval
    Spawn,
    /// Stale-entity cleanup sweep
    Sweep,
    /// Game-defined timer, identified by a tag the game chooses
    Game(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

#[derive(Clone, Debug)]
struct Timer {
    id: TimerId,
    kind: TimerKind,
    due: Duration,
    every: Option<Duration>,
}

/// A timer that came due during an advance
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fired {
    pub id: TimerId,
    pub kind: TimerKind,
    pub at: Duration,
}

/// Cooperative timer set keyed on logical session time.
///
/// Nothing here sleeps: the owner advances time and pulls due timers one at a
/// time with [`TimerSet::pop_due`]. Timers due at the same instant fire in
/// registration order.
#[derive(Clone, Debug, Default)]
pub struct TimerSet {
    timers: Vec<Timer>,
    next_id: u64,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a repeating timer whose first firing is `every` after `now`
    pub fn repeat(&mut self, kind: TimerKind, every: Duration, now: Duration) -> TimerId {
        // a zero interval would fire forever within one advance
        let every = every.max(Duration::from_millis(1));
        self.push(kind, now + every, Some(every))
    }

    /// Register a timer that fires once, `after` from `now`
    pub fn once(&mut self, kind: TimerKind, after: Duration, now: Duration) -> TimerId {
        self.push(kind, now + after, None)
    }

    fn push(&mut self, kind: TimerKind, due: Duration, every: Option<Duration>) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer {
            id,
            kind,
            due,
            every,
        });
        id
    }

    /// Remove the earliest timer due at or before `until` and return it.
    /// Repeating timers are rescheduled before being returned.
    pub fn pop_due(&mut self, until: Duration) -> Option<Fired> {
        let idx = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= until)
            .min_by_key(|(_, t)| (t.due, t.id))
            .map(|(i, _)| i)?;

        let timer = &mut self.timers[idx];
        let fired = Fired {
            id: timer.id,
            kind: timer.kind,
            at: timer.due,
        };
        match timer.every {
            Some(every) => timer.due += every,
            None => {
                self.timers.remove(idx);
            }
        }
        Some(fired)
    }

    /// Drop every timer. Safe to call any number of times.
    pub fn cancel_all(&mut self) {
        self.timers.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }
}
