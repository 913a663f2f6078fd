//! CPU/GPU power model. Lookup tables carried over verbatim from the
//! original `const.go` (`MapGpuTypeEnergyConsumption`,
//! `MapCpuTypeEnergyConsumption`).

use crate::models::{NodeResource, MILLI};

struct PowerProfile {
    idle: f64,
    full: f64,
}

const GPU_POWER_TABLE: &[(&str, PowerProfile)] = &[
    ("T4", PowerProfile { idle: 10.0, full: 70.0 }),
    ("A10", PowerProfile { idle: 30.0, full: 150.0 }),
    ("P100", PowerProfile { idle: 30.0, full: 250.0 }),
    ("V100", PowerProfile { idle: 30.0, full: 300.0 }),
    ("A100", PowerProfile { idle: 50.0, full: 400.0 }),
];

struct CpuProfile {
    idle: f64,
    full: f64,
    #[allow(dead_code)]
    ncores: f64,
}

const CPU_POWER_TABLE: &[(&str, CpuProfile)] = &[
    ("", CpuProfile { idle: 35.0, full: 300.0, ncores: 32.0 }),
    ("Intel", CpuProfile { idle: 15.0, full: 200.0, ncores: 16.0 }),
];

fn gpu_profile(model: &str) -> &'static PowerProfile {
    GPU_POWER_TABLE
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, p)| p)
        .unwrap_or(&GPU_POWER_TABLE[4].1) // A100 is the densest profile; used only if an unknown model slips through Filter's type match.
}

fn cpu_profile(model: &str) -> &'static CpuProfile {
    CPU_POWER_TABLE
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, p)| p)
        .unwrap_or(&CPU_POWER_TABLE[0].1)
}

/// Linear interpolation between a CPU model's idle and full power, keyed by
/// utilisation `1 - milli_cpu_left / capacity` (spec §4.A).
pub fn cpu_power(node: &NodeResource) -> f64 {
    let profile = cpu_profile(&node.cpu_type);
    if node.milli_cpu_capacity == 0 {
        return profile.idle;
    }
    let utilisation =
        1.0 - (node.milli_cpu_left as f64 / node.milli_cpu_capacity as f64);
    let utilisation = utilisation.clamp(0.0, 1.0);
    profile.idle + utilisation * (profile.full - profile.idle)
}

/// Per-GPU power: idle iff the GPU is entirely free, full (TDP) otherwise —
/// a step function (spec §4.A, §9 documents linear-by-utilisation as an
/// extension point, not implemented here).
pub fn gpu_power(node: &NodeResource) -> f64 {
    let profile = gpu_profile(&node.gpu_type);
    node.milli_gpu_left_list
        .iter()
        .map(|&left| if left == MILLI { profile.idle } else { profile.full })
        .sum()
}

/// Total instantaneous node power: `CPU_power(node) + Σ_i GPU_power(node, i)`.
pub fn node_power(node: &NodeResource) -> f64 {
    cpu_power(node) + gpu_power(node)
}
