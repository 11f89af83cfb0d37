// Linux-specific fallbacks: thermal zones, pending-restart marker.

/// Highest CPU-ish thermal zone reading in °C, or the first readable zone
/// when none is labelled as CPU.
pub(super) fn read_thermal_zone_celsius() -> Option<f64> {
    if !cfg!(target_os = "linux") {
        return None;
    }
    let entries = std::fs::read_dir("/sys/class/thermal").ok()?;
    let mut cpu_zone: Option<f64> = None;
    let mut any_zone: Option<f64> = None;
    for entry in entries.flatten() {
        let path = entry.path();
        let is_zone = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("thermal_zone"));
        if !is_zone {
            continue;
        }
        let Some(celsius) = std::fs::read_to_string(path.join("temp"))
            .ok()
            .and_then(|s| parse_millidegrees(&s))
        else {
            continue;
        };
        let zone_type = std::fs::read_to_string(path.join("type")).unwrap_or_default();
        if is_cpu_zone(&zone_type) {
            cpu_zone = Some(cpu_zone.map_or(celsius, |c| c.max(celsius)));
        } else if any_zone.is_none() {
            any_zone = Some(celsius);
        }
    }
    cpu_zone.or(any_zone)
}

/// `Some(true)` when the distro has flagged that installed updates need a
/// restart. `None` where the platform has no such marker.
pub(super) fn restart_required() -> Option<bool> {
    if !cfg!(target_os = "linux") {
        return None;
    }
    Some(
        std::path::Path::new("/var/run/reboot-required").exists()
            || std::path::Path::new("/run/reboot-required").exists(),
    )
}

fn parse_millidegrees(s: &str) -> Option<f64> {
    let milli = s.trim().parse::<i64>().ok()?;
    let celsius = milli as f64 / 1000.0;
    (celsius > 0.0).then_some(celsius)
}

fn is_cpu_zone(zone_type: &str) -> bool {
    let t = zone_type.trim().to_lowercase();
    t.contains("x86_pkg_temp") || t.contains("cpu") || t.contains("soc") || t.contains("coretemp")
}
