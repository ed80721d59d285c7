/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Whether a periodic action with the given interval fires on `tick`.
///
/// An interval of 0 is treated as 1 (every tick).
#[inline]
pub fn fires_on(tick: Ticks, interval: Ticks) -> bool {
    tick % interval.max(1) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_one_fires_every_tick() {
        assert!((0..10).all(|t| fires_on(t, 1)));
    }

    #[test]
    fn interval_five_fires_on_multiples() {
        let fired: Vec<Ticks> = (0..16).filter(|&t| fires_on(t, 5)).collect();
        assert_eq!(fired, vec![0, 5, 10, 15]);
    }

    #[test]
    fn zero_interval_is_clamped() {
        assert!(fires_on(7, 0));
    }
}
