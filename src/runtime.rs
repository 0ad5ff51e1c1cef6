use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crate::game::Game;
use crate::session::Session;

/// Unified event type consumed by the runner
#[derive(Clone, Debug)]
pub enum GameEvent<A> {
    Action(A),
    Tick,
}

/// Source of player input
pub trait EventSource<A>: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent<A>, RecvTimeoutError>;
}

/// Event source fed through an mpsc channel (a UI thread, a test, a bot)
pub struct ChannelEventSource<A> {
    rx: Receiver<GameEvent<A>>,
}

impl<A> ChannelEventSource<A> {
    pub fn new(rx: Receiver<GameEvent<A>>) -> Self {
        Self { rx }
    }
}

impl<A: Send + 'static> EventSource<A> for ChannelEventSource<A> {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent<A>, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Drives a session from wall-clock time and an event source.
///
/// Each step waits at most one tick for input, then advances the session by
/// the real time that passed since the previous step before applying the
/// input, so timers due before an action fire first.
pub struct Runner<E, T> {
    event_source: E,
    ticker: T,
    last: Option<Instant>,
}

impl<E, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
            last: None,
        }
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step<A>(&self) -> GameEvent<A>
    where
        E: EventSource<A>,
    {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => GameEvent::Tick,
        }
    }

    /// One step: wait for input, advance time, apply the input
    pub fn pump<G>(&mut self, session: &mut Session<G>)
    where
        G: Game,
        E: EventSource<G::Action>,
    {
        let event: GameEvent<G::Action> = self.step();
        let now = Instant::now();
        let elapsed = self.last.map_or(Duration::ZERO, |last| now - last);
        self.last = Some(now);

        session.advance(elapsed);
        if let GameEvent::Action(action) = event {
            session.act(action);
        }
    }

    /// Pump until the session leaves the running state or `max_steps` runs
    /// out. Returns true if the session ended.
    pub fn run_until_ended<G>(&mut self, session: &mut Session<G>, max_steps: usize) -> bool
    where
        G: Game,
        E: EventSource<G::Action>,
    {
        self.last = Some(Instant::now());
        for _ in 0..max_steps {
            if !session.is_running() {
                return true;
            }
            self.pump(session);
        }
        !session.is_running()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn step_returns_tick_on_timeout() {
        let (_tx, rx) = mpsc::channel::<GameEvent<u8>>();
        let es = ChannelEventSource::new(rx);
        let ticker = FixedTicker::new(Duration::from_millis(1));
        let runner = Runner::new(es, ticker);

        match runner.step::<u8>() {
            GameEvent::Tick => {}
            _ => panic!("expected Tick on timeout"),
        }
    }

    #[test]
    fn step_passes_through_actions() {
        let (tx, rx) = mpsc::channel();
        tx.send(GameEvent::Action(7u8)).unwrap();
        let es = ChannelEventSource::new(rx);
        let ticker = FixedTicker::new(Duration::from_millis(10));
        let runner = Runner::new(es, ticker);

        match runner.step::<u8>() {
            GameEvent::Action(7) => {}
            other => panic!("expected action, got {other:?}"),
        }
    }

    #[test]
    fn disconnected_source_degrades_to_ticks() {
        let (tx, rx) = mpsc::channel::<GameEvent<u8>>();
        drop(tx);
        let runner = Runner::new(ChannelEventSource::new(rx), FixedTicker::new(Duration::ZERO));
        assert!(matches!(runner.step::<u8>(), GameEvent::Tick));
    }
}
