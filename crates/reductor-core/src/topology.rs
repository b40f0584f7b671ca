//! Topology: performance vs. efficiency core classification.
//!
//! The canonical Apple Silicon 8-performance/8-efficiency cluster layout is
//! implemented exactly; `TopologyMap::detect` additionally sizes the map to
//! the host's actual core count so a `SchedulerState` running with fewer
//! than 16 cores still gets a consistent map, falling back to the
//! canonical 8+8 layout rules when the host doesn't match a known Apple
//! Silicon shape.

use crate::constants::{APPLE_SILICON_CACHE_LINE, MAX_CORES};

/// `CORE_TYPE ∈ {PERFORMANCE, EFFICIENCY, UNKNOWN}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CoreType {
    Performance = 0,
    Efficiency = 1,
    Unknown = 2,
}

/// `ProcessType` used by `get_optimal_core_apple_silicon`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ProcessType {
    CpuIntensive = 0,
    IoBound = 1,
    Mixed = 2,
}

/// `get_core_type_apple_silicon(core_id)`: cores `[0,8)` are
/// performance, `[8,16)` are efficiency, else unknown. This is the
/// canonical default the whole module is built from.
pub fn get_core_type_apple_silicon(core_id: usize) -> CoreType {
    match core_id {
        0..=7 => CoreType::Performance,
        8..=15 => CoreType::Efficiency,
        _ => CoreType::Unknown,
    }
}

/// `get_core_cluster_apple_silicon(core_id)`: P-cores → cluster
/// 0, E-cores → cluster 1, invalid → 0.
pub fn get_core_cluster_apple_silicon(core_id: usize) -> u8 {
    match get_core_type_apple_silicon(core_id) {
        CoreType::Performance => 0,
        CoreType::Efficiency => 1,
        CoreType::Unknown => 0,
    }
}

/// `is_performance_core_apple_silicon(core_id)`.
pub fn is_performance_core_apple_silicon(core_id: usize) -> bool {
    get_core_type_apple_silicon(core_id) == CoreType::Performance
}

/// `get_optimal_core_apple_silicon(process_type)`.
pub fn get_optimal_core_apple_silicon(process_type: ProcessType) -> usize {
    match process_type {
        ProcessType::CpuIntensive => 0,
        ProcessType::IoBound => 8,
        ProcessType::Mixed => 0,
    }
}

/// `get_cache_line_size_apple_silicon()`.
pub fn get_cache_line_size_apple_silicon() -> usize {
    APPLE_SILICON_CACHE_LINE
}

/// A `MAX_CORES`-entry topology map, immutable
/// once populated.
pub struct TopologyMap {
    core_types: Box<[CoreType]>,
}

impl TopologyMap {
    /// `detect_apple_silicon_core_types(map)`: populates every entry per
    /// the canonical rules above. An empty map trivially has nothing to
    /// populate and reports failure.
    pub fn detect(core_count: usize) -> Option<Self> {
        if core_count == 0 {
            return None;
        }
        let core_count = core_count.min(MAX_CORES);
        let core_types = (0..core_count)
            .map(get_core_type_apple_silicon)
            .collect::<Vec<_>>()
            .into_boxed_slice();
        log::info!("topology detected: {core_count} core(s)");
        Some(TopologyMap { core_types })
    }

    /// Size the map to the host's actual parallelism instead of a fixed
    /// count, falling back to `MAX_CORES` if it cannot be queried.
    pub fn detect_host() -> Option<Self> {
        let count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(MAX_CORES);
        Self::detect(count)
    }

    pub fn core_type(&self, core_id: usize) -> CoreType {
        self.core_types
            .get(core_id)
            .copied()
            .unwrap_or(CoreType::Unknown)
    }

    pub fn cluster(&self, core_id: usize) -> u8 {
        match self.core_type(core_id) {
            CoreType::Performance => 0,
            CoreType::Efficiency => 1,
            CoreType::Unknown => 0,
        }
    }

    pub fn len(&self) -> usize {
        self.core_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.core_types.is_empty()
    }
}

/// `optimize_for_apple_silicon()`: 1 on a supported host, 0
/// otherwise.
pub fn optimize_for_apple_silicon() -> bool {
    cfg!(target_arch = "aarch64") && cfg!(target_os = "macos")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_layout() {
        assert_eq!(get_core_type_apple_silicon(0), CoreType::Performance);
        assert_eq!(get_core_type_apple_silicon(7), CoreType::Performance);
        assert_eq!(get_core_type_apple_silicon(8), CoreType::Efficiency);
        assert_eq!(get_core_type_apple_silicon(15), CoreType::Efficiency);
        assert_eq!(get_core_type_apple_silicon(128), CoreType::Unknown);
    }

    #[test]
    fn cache_line_is_128() {
        assert_eq!(get_cache_line_size_apple_silicon(), 128);
    }

    #[test]
    fn detect_populates_canonical_clusters() {
        assert!(TopologyMap::detect(0).is_none());
        let map = TopologyMap::detect(16).unwrap();
        assert_eq!(map.cluster(0), 0);
        assert_eq!(map.cluster(8), 1);
    }

    #[test]
    fn optimal_core_contract() {
        assert_eq!(get_optimal_core_apple_silicon(ProcessType::CpuIntensive), 0);
        assert_eq!(get_optimal_core_apple_silicon(ProcessType::IoBound), 8);
        assert_eq!(get_optimal_core_apple_silicon(ProcessType::Mixed), 0);
    }
}
