/// How the overall budget splits for the current registry size: the
/// weight-proportional remainder and the per-source floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RatePlan {
    /// Budget left to divide by weight after every source's floor is reserved.
    pub assignable: f64,
    /// The floor actually granted. Equals the configured min rate unless the
    /// floor alone exceeds the budget, in which case it degrades to an equal
    /// share of the overall rate.
    pub effective_min: f64,
    /// Set when the degraded equal-share mode was entered.
    pub overconstrained: bool,
}

/// Split `overall_rate` across `source_count` sources with a `min_rate`
/// floor each. The degraded case is signalled, never rejected.
pub(crate) fn plan(overall_rate: f64, min_rate: f64, source_count: usize) -> RatePlan {
    let mut assignable = overall_rate - source_count as f64 * min_rate;
    let mut effective_min = min_rate;
    let mut overconstrained = false;
    if assignable < 0.0 {
        effective_min = overall_rate / source_count as f64;
        assignable = 0.0;
        overconstrained = true;
    }
    RatePlan {
        assignable,
        effective_min,
        overconstrained,
    }
}

/// A single source's allocation under `plan`: its weight-share of the
/// assignable budget plus the floor. `weight_sum` must already be
/// normalized to 1.0 when all weights are zero.
pub(crate) fn share(plan: RatePlan, weight: f64, weight_sum: f64) -> f64 {
    plan.assignable * weight / weight_sum + plan.effective_min
}
