//! # Lifecycle
//!
//! Cooperative shutdown and timeout primitives.
//!
//! ## Philosophy
//!
//! - **Explicit over implicit**: Shutdown is a value passed to the loops that
//!   must honor it, never a global flag
//! - **Consumed, not managed**: Serve loops and waiting callers only *observe*
//!   a [`CancellationToken`]; whoever owns the [`CancellationSource`] decides
//!   when the process stops
//! - **No async runtime required**: Waiting is a blocking, bounded wait that
//!   wakes immediately when cancellation is requested
//!
//! ## Core Concepts
//!
//! - `CancellationToken`: Cloneable handle to check (or wait for) cancellation
//! - `CancellationSource`: Controller that can trigger cancellation
//! - `CancellationReason`: Why cancellation occurred
//! - `Timeout`/`Deadline`: A relative limit and the instant it expires at

use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Reason for cancellation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancellationReason {
    /// User-initiated cancellation
    UserCancel,
    /// The hosting process is shutting down
    Shutdown,
}

impl fmt::Display for CancellationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancellationReason::UserCancel => write!(f, "user cancelled"),
            CancellationReason::Shutdown => write!(f, "shutdown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CancellationState {
    Active,
    Cancelled(CancellationReason),
}

/// Shared state between CancellationToken and CancellationSource
#[derive(Debug)]
struct SharedCancellationState {
    state: Mutex<CancellationState>,
    changed: Condvar,
}

impl SharedCancellationState {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(CancellationState::Active),
            changed: Condvar::new(),
        })
    }

    fn is_cancelled(&self) -> bool {
        matches!(*self.state.lock(), CancellationState::Cancelled(_))
    }

    fn reason(&self) -> Option<CancellationReason> {
        match &*self.state.lock() {
            CancellationState::Active => None,
            CancellationState::Cancelled(reason) => Some(reason.clone()),
        }
    }

    /// First reason wins; later calls are no-ops
    fn cancel(&self, reason: CancellationReason) {
        let mut state = self.state.lock();
        if *state == CancellationState::Active {
            *state = CancellationState::Cancelled(reason);
            self.changed.notify_all();
        }
    }

    /// A timeout too large to express as an instant waits without bound
    fn wait(&self, timeout: Duration) -> bool {
        let deadline = Timeout::after(timeout).to_deadline(Instant::now());
        let mut state = self.state.lock();
        while *state == CancellationState::Active {
            match deadline {
                Some(deadline) => {
                    if self.changed.wait_until(&mut state, deadline.instant()).timed_out() {
                        break;
                    }
                }
                None => self.changed.wait(&mut state),
            }
        }
        matches!(*state, CancellationState::Cancelled(_))
    }
}

/// A cloneable token that can be checked for cancellation
///
/// CancellationToken is passed to serve loops and waiting callers. It's
/// cheap to clone, check and share across threads.
///
/// ## Example
///
/// ```
/// use lifecycle::{CancellationSource, CancellationReason};
///
/// let source = CancellationSource::new();
/// let token = source.token();
///
/// assert!(!token.is_cancelled());
///
/// source.cancel(CancellationReason::Shutdown);
/// assert!(token.is_cancelled());
/// assert_eq!(token.reason(), Some(CancellationReason::Shutdown));
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    shared: Arc<SharedCancellationState>,
}

impl CancellationToken {
    /// Creates a new token that is never cancelled
    pub fn none() -> Self {
        Self {
            shared: SharedCancellationState::new(),
        }
    }

    /// Checks if cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.shared.is_cancelled()
    }

    /// Returns the reason for cancellation, if cancelled
    pub fn reason(&self) -> Option<CancellationReason> {
        self.shared.reason()
    }

    /// Blocks for at most `timeout`, returning early once cancelled
    ///
    /// Returns `true` if cancellation has been requested.
    pub fn wait_for_cancellation(&self, timeout: Duration) -> bool {
        self.shared.wait(timeout)
    }
}

/// A controller that can trigger cancellation
///
/// ## Example
///
/// ```
/// use lifecycle::{CancellationSource, CancellationReason};
///
/// let source = CancellationSource::new();
/// let token1 = source.token();
/// let token2 = source.token();
///
/// source.cancel(CancellationReason::UserCancel);
/// assert!(token1.is_cancelled());
/// assert!(token2.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationSource {
    shared: Arc<SharedCancellationState>,
}

impl CancellationSource {
    /// Creates a new cancellation source
    pub fn new() -> Self {
        Self {
            shared: SharedCancellationState::new(),
        }
    }

    /// Creates a token from this source
    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Cancels all tokens from this source and wakes their waiters
    pub fn cancel(&self, reason: CancellationReason) {
        self.shared.cancel(reason);
    }

    /// Checks if this source has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.shared.is_cancelled()
    }
}

impl Default for CancellationSource {
    fn default() -> Self {
        Self::new()
    }
}

/// The instant an operation times out
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline {
    instant: Instant,
}

impl Deadline {
    pub fn instant(&self) -> Instant {
        self.instant
    }

    /// Returns time remaining until the deadline, or `None` once it has passed
    pub fn time_remaining(&self, now: Instant) -> Option<Duration> {
        if now < self.instant {
            Some(self.instant.duration_since(now))
        } else {
            None
        }
    }
}

/// A relative timeout, turned into a [`Deadline`] when an operation starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeout {
    duration: Duration,
}

impl Timeout {
    pub fn after(duration: Duration) -> Self {
        Self { duration }
    }

    /// Converts this timeout to a deadline starting at `now`
    ///
    /// Returns `None` when the deadline lies beyond what an [`Instant`] can
    /// represent; such a timeout never expires.
    pub fn to_deadline(&self, now: Instant) -> Option<Deadline> {
        now.checked_add(self.duration)
            .map(|instant| Deadline { instant })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_cancellation_token_none() {
        let token = CancellationToken::none();
        assert!(!token.is_cancelled());
        assert_eq!(token.reason(), None);
    }

    #[test]
    fn test_cancellation_source_basic() {
        let source = CancellationSource::new();
        let token = source.token();

        assert!(!token.is_cancelled());
        assert!(!source.is_cancelled());

        source.cancel(CancellationReason::UserCancel);

        assert!(token.is_cancelled());
        assert!(source.is_cancelled());
        assert_eq!(token.reason(), Some(CancellationReason::UserCancel));
    }

    #[test]
    fn test_first_reason_wins() {
        let source = CancellationSource::new();
        source.cancel(CancellationReason::Shutdown);
        source.cancel(CancellationReason::UserCancel);
        assert_eq!(source.token().reason(), Some(CancellationReason::Shutdown));
        assert_eq!(CancellationReason::Shutdown.to_string(), "shutdown");
    }

    #[test]
    fn test_wait_times_out_when_active() {
        let token = CancellationToken::none();
        let started = Instant::now();
        assert!(!token.wait_for_cancellation(Duration::from_millis(20)));
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_wait_returns_immediately_when_cancelled() {
        let source = CancellationSource::new();
        source.cancel(CancellationReason::Shutdown);
        assert!(source.token().wait_for_cancellation(Duration::from_secs(60)));
    }

    #[test]
    fn test_wait_wakes_on_cancel_from_other_thread() {
        let source = CancellationSource::new();
        let token = source.token();

        let waiter = thread::spawn(move || {
            let started = Instant::now();
            let cancelled = token.wait_for_cancellation(Duration::from_secs(30));
            (cancelled, started.elapsed())
        });

        thread::sleep(Duration::from_millis(20));
        source.cancel(CancellationReason::Shutdown);

        let (cancelled, elapsed) = waiter.join().unwrap();
        assert!(cancelled);
        assert!(elapsed < Duration::from_secs(30));
    }

    #[test]
    fn test_unbounded_wait_ends_on_cancel() {
        let source = CancellationSource::new();
        let token = source.token();

        let waiter = thread::spawn(move || token.wait_for_cancellation(Duration::MAX));
        thread::sleep(Duration::from_millis(20));
        source.cancel(CancellationReason::Shutdown);

        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_timeout_to_deadline() {
        let now = Instant::now();
        let deadline = Timeout::after(Duration::from_millis(100))
            .to_deadline(now)
            .unwrap();

        assert_eq!(deadline.instant(), now + Duration::from_millis(100));
        assert_eq!(deadline.time_remaining(now), Some(Duration::from_millis(100)));
        assert_eq!(
            deadline.time_remaining(now + Duration::from_millis(100)),
            None
        );
        assert_eq!(
            deadline.time_remaining(now + Duration::from_millis(300)),
            None
        );
    }

    #[test]
    fn test_unrepresentable_timeout_has_no_deadline() {
        assert_eq!(Timeout::after(Duration::MAX).to_deadline(Instant::now()), None);
    }
}
