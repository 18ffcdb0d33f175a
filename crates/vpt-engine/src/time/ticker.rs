use super::{FrameClock, FrameTime};

/// Identifies one subscription of a [`Ticker`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TickerHandle(u64);

type Callback<C> = Box<dyn FnMut(&mut C, &FrameTime)>;

/// Drives per-frame callbacks from the display loop.
///
/// The host calls [`tick`](Self::tick) once per presented frame and passes the
/// state the callbacks operate on, so callbacks never capture it.
pub struct Ticker<C> {
    clock: FrameClock,
    next: u64,
    subscriptions: Vec<(TickerHandle, Callback<C>)>,
}

impl<C> Ticker<C> {
    pub fn new() -> Self {
        Self {
            clock: FrameClock::new(),
            next: 0,
            subscriptions: Vec::new(),
        }
    }

    pub fn add(&mut self, callback: impl FnMut(&mut C, &FrameTime) + 'static) -> TickerHandle {
        self.next += 1;
        let handle = TickerHandle(self.next);
        if self.subscriptions.is_empty() {
            self.clock.reset();
        }
        self.subscriptions.push((handle, Box::new(callback)));
        handle
    }

    /// Returns whether `handle` was registered.
    pub fn remove(&mut self, handle: TickerHandle) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|(h, _)| *h != handle);
        self.subscriptions.len() != before
    }

    pub fn contains(&self, handle: TickerHandle) -> bool {
        self.subscriptions.iter().any(|(h, _)| *h == handle)
    }

    pub fn is_idle(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Advances the clock and runs every subscription once, in registration order.
    pub fn tick(&mut self, target: &mut C) -> FrameTime {
        let time = self.clock.tick();
        for (_, callback) in &mut self.subscriptions {
            callback(target, &time);
        }
        time
    }
}

impl<C> Default for Ticker<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> std::fmt::Debug for Ticker<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ticker")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callbacks_run_in_registration_order() {
        let mut ticker = Ticker::<Vec<u32>>::new();
        ticker.add(|log, _| log.push(1));
        ticker.add(|log, _| log.push(2));

        let mut log = Vec::new();
        ticker.tick(&mut log);
        ticker.tick(&mut log);
        assert_eq!(log, vec![1, 2, 1, 2]);
    }

    #[test]
    fn removed_subscriptions_are_not_invoked() {
        let mut ticker = Ticker::<u32>::new();
        let a = ticker.add(|n, _| *n += 1);
        let b = ticker.add(|n, _| *n += 10);
        assert_ne!(a, b);

        assert!(ticker.remove(a));
        assert!(!ticker.remove(a));
        assert!(ticker.contains(b));

        let mut n = 0;
        ticker.tick(&mut n);
        assert_eq!(n, 10);
    }

    #[test]
    fn handles_are_never_reused() {
        let mut ticker = Ticker::<()>::new();
        let a = ticker.add(|_, _| {});
        ticker.remove(a);
        let b = ticker.add(|_, _| {});
        assert_ne!(a, b);
        assert!(!ticker.is_idle());
    }
}
