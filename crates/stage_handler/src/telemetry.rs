//! Per-frame counters and their JSON-line emission.
//!
//! Kept independent of `Stage` internals; callers pass the counters in
//! explicitly.

/// Snapshot of one frame's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    pub frame_index: u64,
    /// Items in the retained display list after this frame.
    pub display_items: u64,
    /// Nodes placed by the most recent layout pass.
    pub layout_nodes: u64,
    /// Live slots in the texture store, cached and raw.
    pub textures_live: u64,
    pub cache_entries: u64,
    pub in_flight: u64,
    pub requests_spawned: u64,
    pub requests_failed: u64,
    /// Frame rebuilds pushed past their budget window so far.
    pub rebuilds_deferred: u64,
    /// Time spent applying updates and rebuilding, in microseconds.
    pub tick_time_us: u64,
}

/// Render one stats snapshot as a single JSON object line.
#[must_use]
pub fn frame_stats_json(stats: &FrameStats) -> String {
    format!(
        "{{\"frame_index\":{},\"display_items\":{},\"layout_nodes\":{},\"textures_live\":{},\"cache_entries\":{},\"in_flight\":{},\"requests_spawned\":{},\"requests_failed\":{},\"rebuilds_deferred\":{},\"tick_time_us\":{}}}",
        stats.frame_index,
        stats.display_items,
        stats.layout_nodes,
        stats.textures_live,
        stats.cache_entries,
        stats.in_flight,
        stats.requests_spawned,
        stats.requests_failed,
        stats.rebuilds_deferred,
        stats.tick_time_us
    )
}

/// Print the line to stdout when telemetry is enabled.
#[allow(
    clippy::print_stdout,
    reason = "telemetry lines are consumed from stdout by external tooling"
)]
pub fn maybe_emit(enabled: bool, json_line: &str) {
    if enabled {
        println!("{json_line}");
    }
}
