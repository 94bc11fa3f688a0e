use std::process::Command;

/// External resource-contention signal, sampled once per cycle.
///
/// Implementations return a utilization fraction in `[0, 1]`; the
/// discriminator forces the minimum rate above the configured limit.
pub trait LoadProbe {
    fn sample(&mut self) -> f64;
}

/// Probe for hosts without a meterable renderer: always idle.
#[derive(Debug, Default)]
pub struct IdleLoadProbe;

impl LoadProbe for IdleLoadProbe {
    fn sample(&mut self) -> f64 {
        0.0
    }
}

/// GPU memory utilization via `nvidia-smi`. Photogrammetry streaming pushes
/// VRAM toward full well before the renderer visibly stalls, which makes it
/// a usable overload signal. Any probe failure reads as idle.
#[derive(Debug, Default)]
pub struct GpuMemoryProbe;

impl GpuMemoryProbe {
    fn query(field: &str) -> Option<f64> {
        let output = Command::new("nvidia-smi")
            .args([format!("--query-gpu={field}"), String::from("--format=csv,noheader,nounits")])
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        String::from_utf8(output.stdout).ok()?.lines().next()?.trim().parse::<f64>().ok()
    }
}

impl LoadProbe for GpuMemoryProbe {
    fn sample(&mut self) -> f64 {
        match (Self::query("memory.free"), Self::query("memory.total")) {
            (Some(free), Some(total)) if total > 0.0 => (1.0 - free / total).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{IdleLoadProbe, LoadProbe};

    #[test]
    fn idle_probe_reads_zero() {
        assert_eq!(IdleLoadProbe.sample(), 0.0);
    }
}
