use std::collections::VecDeque;

/// State for one registered source: a bounded FIFO of pending messages plus
/// the bookkeeping that decides how many of them the source is currently
/// entitled to emit.
///
/// Owned by the registry; no synchronization of its own.
pub(crate) struct SourceState<M> {
    fifo: VecDeque<M>,
    capacity: usize,
    weight: f64,
    allocated_rate: f64,
    last_emit: f64,
}

impl<M> SourceState<M> {
    /// Fresh source: empty buffer, zero weight, no allocation yet, and a
    /// last-emission time of negative infinity so the first emission is
    /// limited only by backlog.
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            fifo: VecDeque::with_capacity(capacity),
            capacity,
            weight: 0.0,
            allocated_rate: 0.0,
            last_emit: f64::NEG_INFINITY,
        }
    }

    /// Append a message. At capacity the oldest message is dropped first —
    /// newest-biased retention, not an error.
    pub(crate) fn push(&mut self, message: M) {
        if self.fifo.len() == self.capacity {
            self.fifo.pop_front();
        }
        self.fifo.push_back(message);
    }

    /// How many messages this source is entitled to emit at `now`:
    /// `floor(min(elapsed * allocated_rate, backlog))`.
    ///
    /// A `now` earlier than the last emission yields 0 — out-of-order
    /// timestamps score as "nothing eligible yet" rather than erroring, so
    /// polling after a clock rewind is harmless.
    pub(crate) fn eligible(&self, now: f64) -> u64 {
        let elapsed = now - self.last_emit;
        if elapsed < 0.0 {
            return 0;
        }
        let credit = elapsed * self.allocated_rate;
        // A never-emitted source has infinite elapsed time; with a zero
        // allocated rate the product is NaN. No rate means no credit.
        if credit.is_nan() {
            return 0;
        }
        credit.min(self.fifo.len() as f64).floor() as u64
    }

    /// Remove and return the head of the FIFO, marking `now` as the last
    /// emission time. One message per call, however large the entitlement.
    pub(crate) fn pop_oldest(&mut self, now: f64) -> Option<M> {
        let message = self.fifo.pop_front()?;
        self.last_emit = now;
        Some(message)
    }

    pub(crate) fn weight(&self) -> f64 {
        self.weight
    }

    pub(crate) fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    pub(crate) fn allocated_rate(&self) -> f64 {
        self.allocated_rate
    }

    pub(crate) fn set_allocated_rate(&mut self, rate: f64) {
        self.allocated_rate = rate;
    }

    pub(crate) fn last_emit(&self) -> f64 {
        self.last_emit
    }

    pub(crate) fn backlog(&self) -> usize {
        self.fifo.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rated_source(capacity: usize, rate: f64) -> SourceState<u32> {
        let mut source = SourceState::new(capacity);
        source.set_allocated_rate(rate);
        source
    }

    #[test]
    fn push_beyond_capacity_drops_oldest() {
        let mut source = rated_source(3, 1.0);
        for i in 0..4 {
            source.push(i);
        }
        assert_eq!(source.backlog(), 3);
        // 0 was evicted; the newest three remain in FIFO order
        assert_eq!(source.pop_oldest(0.0), Some(1));
        assert_eq!(source.pop_oldest(0.0), Some(2));
        assert_eq!(source.pop_oldest(0.0), Some(3));
    }

    #[test]
    fn fresh_source_is_limited_only_by_backlog() {
        let mut source = rated_source(5, 2.0);
        source.push(1);
        source.push(2);
        // last_emit is -inf, so elapsed credit is unbounded
        assert_eq!(source.eligible(0.0), 2);
    }

    #[test]
    fn eligible_scales_with_elapsed_time() {
        let mut source = rated_source(10, 3.0);
        for i in 0..10 {
            source.push(i);
        }
        source.pop_oldest(0.0);
        assert_eq!(source.eligible(0.0), 0);
        assert_eq!(source.eligible(0.5), 1);
        assert_eq!(source.eligible(1.0), 3);
        assert_eq!(source.eligible(2.0), 6);
    }

    #[test]
    fn eligible_saturates_at_backlog() {
        let mut source = rated_source(5, 3.0);
        for i in 0..5 {
            source.push(i);
        }
        source.pop_oldest(0.0); // backlog now 4
        assert_eq!(source.eligible(100.0), 4);
    }

    #[test]
    fn eligible_is_monotonic_in_time() {
        let mut source = rated_source(8, 1.7);
        for i in 0..8 {
            source.push(i);
        }
        source.pop_oldest(0.0);
        let mut previous = 0;
        for step in 0..50 {
            let count = source.eligible(step as f64 * 0.1);
            assert!(count >= previous, "eligibility decreased at step {step}");
            previous = count;
        }
    }

    #[test]
    fn negative_elapsed_yields_zero() {
        let mut source = rated_source(5, 10.0);
        source.push(1);
        source.push(2);
        source.pop_oldest(10.0);
        // Polling before the last emission time scores nothing
        assert_eq!(source.eligible(5.0), 0);
        assert_eq!(source.eligible(10.0), 0);
        assert_eq!(source.eligible(11.0), 1);
    }

    #[test]
    fn zero_rate_source_is_never_eligible() {
        let mut source = rated_source(5, 0.0);
        source.push(1);
        // Never emitted: elapsed is infinite, rate is zero
        assert_eq!(source.eligible(1.0), 0);
        // And after an emission the finite product is zero too
        source.set_allocated_rate(1.0);
        source.pop_oldest(0.0);
        source.set_allocated_rate(0.0);
        source.push(2);
        assert_eq!(source.eligible(1_000.0), 0);
    }

    #[test]
    fn pop_marks_last_emit() {
        let mut source = rated_source(5, 1.0);
        source.push(7);
        source.push(8);
        assert_eq!(source.pop_oldest(3.0), Some(7));
        assert_eq!(source.last_emit(), 3.0);
        assert_eq!(source.pop_oldest(4.0), Some(8));
        assert_eq!(source.last_emit(), 4.0);
        assert_eq!(source.pop_oldest(5.0), None);
        // Popping an empty buffer does not advance the mark
        assert_eq!(source.last_emit(), 4.0);
    }

    #[test]
    fn pop_consumes_entitlement() {
        let mut source = rated_source(5, 5.0);
        for i in 0..5 {
            source.push(i);
        }
        source.pop_oldest(0.0);
        assert_eq!(source.eligible(1.0), 4);
        // Emitting one message resets the elapsed-time credit entirely
        source.pop_oldest(1.0);
        assert_eq!(source.eligible(1.0), 0);
    }
}
