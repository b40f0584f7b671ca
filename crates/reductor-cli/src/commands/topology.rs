use reductor_core::CoreType;
use reductor_core::topology::get_cache_line_size_apple_silicon;

/// Prints the per-core topology classification for `core_count` cores.
pub fn run(core_count: usize) {
    let Some(map) = reductor_core::TopologyMap::detect(core_count) else {
        eprintln!("cannot detect topology for 0 cores");
        return;
    };

    println!("cache line size: {} bytes\n", get_cache_line_size_apple_silicon());
    for core_id in 0..map.len() {
        let kind = match map.core_type(core_id) {
            CoreType::Performance => "performance",
            CoreType::Efficiency => "efficiency",
            CoreType::Unknown => "unknown",
        };
        println!("core {core_id:>3}  cluster {}  {kind}", map.cluster(core_id));
    }
}
