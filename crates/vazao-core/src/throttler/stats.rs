/// Snapshot of one registered source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceStats {
    pub key: String,
    pub weight: f64,
    pub allocated_rate: f64,
    pub backlog: usize,
    /// Negative infinity until the source's first emission.
    pub last_emit: f64,
}

/// Snapshot of the whole throttler, keyed in registry order.
#[derive(Debug, Clone, PartialEq)]
pub struct ThrottlerStats {
    pub overall_rate: f64,
    pub min_rate: f64,
    pub source_count: usize,
    pub per_source: Vec<SourceStats>,
}
