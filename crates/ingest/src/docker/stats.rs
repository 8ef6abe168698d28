//! Container resource snapshot, passed through to rendering and to the
//! analysis context. Not part of the record model.

use bollard::models::ContainerStatsResponse;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerStats {
    pub container: String,
    pub cpu_percent: f64,
    pub memory_usage: u64,
    pub memory_limit: u64,
    pub memory_percent: f64,
    pub net_rx_bytes: u64,
    pub net_tx_bytes: u64,
    pub block_read_bytes: u64,
    pub block_write_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pids: Option<u64>,
}

impl ContainerStats {
    pub fn from_response(container: &str, stats: &ContainerStatsResponse) -> Self {
        let (memory_usage, memory_limit) = stats
            .memory_stats
            .as_ref()
            .map(|m| (m.usage.unwrap_or(0), m.limit.unwrap_or(0)))
            .unwrap_or((0, 0));
        let memory_percent = if memory_limit > 0 {
            memory_usage as f64 / memory_limit as f64 * 100.0
        } else {
            0.0
        };

        let (net_rx_bytes, net_tx_bytes) = stats
            .networks
            .as_ref()
            .map(|nets| {
                nets.values().fold((0u64, 0u64), |(rx, tx), n| {
                    (rx + n.rx_bytes.unwrap_or(0), tx + n.tx_bytes.unwrap_or(0))
                })
            })
            .unwrap_or((0, 0));

        let (block_read_bytes, block_write_bytes) = stats
            .blkio_stats
            .as_ref()
            .and_then(|b| b.io_service_bytes_recursive.as_ref())
            .map(|entries| {
                entries.iter().fold((0u64, 0u64), |(r, w), e| {
                    let v = e.value.unwrap_or(0);
                    match e.op.as_deref() {
                        Some("Read") | Some("read") => (r + v, w),
                        Some("Write") | Some("write") => (r, w + v),
                        _ => (r, w),
                    }
                })
            })
            .unwrap_or((0, 0));

        Self {
            container: container.to_string(),
            cpu_percent: calculate_cpu_percentage(stats),
            memory_usage,
            memory_limit,
            memory_percent,
            net_rx_bytes,
            net_tx_bytes,
            block_read_bytes,
            block_write_bytes,
            pids: stats.pids_stats.as_ref().and_then(|p| p.current),
        }
    }
}

/// One line of `docker stats --no-stream --format '{{json .}}'`.
#[derive(Debug, Deserialize)]
struct CliStats {
    #[serde(rename = "CPUPerc", default)]
    cpu: String,
    #[serde(rename = "MemUsage", default)]
    mem_usage: String,
    #[serde(rename = "MemPerc", default)]
    mem: String,
    #[serde(rename = "NetIO", default)]
    net_io: String,
    #[serde(rename = "BlockIO", default)]
    block_io: String,
    #[serde(rename = "PIDs", default)]
    pids: String,
}

impl ContainerStats {
    /// Parse the human-readable snapshot the `docker stats` CLI prints.
    /// Sizes are rounded to whole bytes; `--` fields read as zero.
    pub fn from_cli_json(container: &str, line: &str) -> Result<Self, serde_json::Error> {
        let cli: CliStats = serde_json::from_str(line)?;
        let (memory_usage, memory_limit) = parse_size_pair(&cli.mem_usage);
        let (net_rx_bytes, net_tx_bytes) = parse_size_pair(&cli.net_io);
        let (block_read_bytes, block_write_bytes) = parse_size_pair(&cli.block_io);
        Ok(Self {
            container: container.to_string(),
            cpu_percent: parse_percent(&cli.cpu),
            memory_usage,
            memory_limit,
            memory_percent: parse_percent(&cli.mem),
            net_rx_bytes,
            net_tx_bytes,
            block_read_bytes,
            block_write_bytes,
            pids: cli.pids.trim().parse().ok(),
        })
    }
}

fn parse_percent(s: &str) -> f64 {
    s.trim().trim_end_matches('%').parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// `"12.5MiB / 1.5GiB"`
fn parse_size_pair(s: &str) -> (u64, u64) {
    match s.split_once('/') {
        Some((a, b)) => (parse_size(a), parse_size(b)),
        None => (parse_size(s), 0),
    }
}

/// Decimal (`kB`, `MB`) and binary (`KiB`, `MiB`) units as printed by the CLI.
fn parse_size(s: &str) -> u64 {
    let s = s.trim();
    let split = s.find(|c: char| c.is_ascii_alphabetic()).unwrap_or(s.len());
    let (number, unit) = s.split_at(split);
    let Ok(value) = number.trim().parse::<f64>() else {
        return 0;
    };
    let scale = match unit.trim() {
        "" | "B" => 1.0,
        "kB" | "KB" => 1e3,
        "MB" => 1e6,
        "GB" => 1e9,
        "TB" => 1e12,
        "KiB" => 1024.0,
        "MiB" => 1024.0 * 1024.0,
        "GiB" => 1024.0 * 1024.0 * 1024.0,
        "TiB" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        _ => return 0,
    };
    (value * scale).round().max(0.0) as u64
}

/// `(cpu_delta / system_delta) * online_cpus * 100` between the current and
/// previous sample carried in one response.
pub fn calculate_cpu_percentage(stats: &ContainerStatsResponse) -> f64 {
    let (Some(cpu), Some(pre)) = (&stats.cpu_stats, &stats.precpu_stats) else {
        return 0.0;
    };

    let total = |s: &bollard::models::ContainerCpuStats| {
        s.cpu_usage.as_ref().and_then(|u| u.total_usage).unwrap_or(0)
    };
    let cpu_delta = total(cpu).saturating_sub(total(pre)) as f64;
    let system_delta = cpu
        .system_cpu_usage
        .unwrap_or(0)
        .saturating_sub(pre.system_cpu_usage.unwrap_or(0)) as f64;

    if system_delta <= 0.0 || cpu_delta <= 0.0 {
        return 0.0;
    }
    let cpus = cpu.online_cpus.unwrap_or(1).max(1) as f64;
    let pct = cpu_delta / system_delta * cpus * 100.0;
    if pct.is_finite() { pct } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::{ContainerCpuStats, ContainerCpuUsage, ContainerMemoryStats};

    fn cpu(total: u64, system: u64, cpus: u32) -> ContainerCpuStats {
        ContainerCpuStats {
            cpu_usage: Some(ContainerCpuUsage {
                total_usage: Some(total),
                percpu_usage: None,
                usage_in_kernelmode: None,
                usage_in_usermode: None,
            }),
            system_cpu_usage: Some(system),
            online_cpus: Some(cpus),
            throttling_data: None,
        }
    }

    #[test]
    fn test_cpu_percentage() {
        let stats = ContainerStatsResponse {
            cpu_stats: Some(cpu(200, 2000, 2)),
            precpu_stats: Some(cpu(100, 1000, 2)),
            ..Default::default()
        };
        let pct = calculate_cpu_percentage(&stats);
        assert!((pct - 20.0).abs() < 1e-9, "100/1000 * 2 cpus = 20%, got {}", pct);
    }

    #[test]
    fn test_cpu_percentage_missing_sample() {
        let stats = ContainerStatsResponse {
            cpu_stats: Some(cpu(200, 2000, 2)),
            ..Default::default()
        };
        assert_eq!(calculate_cpu_percentage(&stats), 0.0);
    }

    #[test]
    fn test_memory_percent() {
        let stats = ContainerStatsResponse {
            memory_stats: Some(ContainerMemoryStats {
                usage: Some(256),
                limit: Some(1024),
                ..Default::default()
            }),
            ..Default::default()
        };
        let s = ContainerStats::from_response("api", &stats);
        assert_eq!(s.container, "api");
        assert_eq!(s.memory_percent, 25.0);
        assert_eq!(s.cpu_percent, 0.0);
    }

    #[test]
    fn test_empty_response_is_zeroed() {
        let s = ContainerStats::from_response("idle", &ContainerStatsResponse::default());
        assert_eq!(s.memory_limit, 0);
        assert_eq!(s.memory_percent, 0.0, "no division by a zero limit");
        assert_eq!(s.pids, None);
    }

    #[test]
    fn test_from_cli_json() {
        let line = r#"{"BlockIO":"4.1MB / 0B","CPUPerc":"12.50%","Container":"web","ID":"4f9a1b2c3d5e","MemPerc":"25.00%","MemUsage":"256MiB / 1GiB","Name":"web","NetIO":"1.2kB / 648B","PIDs":"7"}"#;
        let s = ContainerStats::from_cli_json("web", line).unwrap();
        assert_eq!(s.cpu_percent, 12.5);
        assert_eq!(s.memory_usage, 256 * 1024 * 1024);
        assert_eq!(s.memory_limit, 1024 * 1024 * 1024);
        assert_eq!(s.memory_percent, 25.0);
        assert_eq!((s.net_rx_bytes, s.net_tx_bytes), (1200, 648));
        assert_eq!((s.block_read_bytes, s.block_write_bytes), (4_100_000, 0));
        assert_eq!(s.pids, Some(7));
    }

    #[test]
    fn test_from_cli_json_placeholders_are_zero() {
        let line = r#"{"CPUPerc":"--","MemPerc":"--","MemUsage":"-- / --","NetIO":"--","BlockIO":"--","PIDs":"--"}"#;
        let s = ContainerStats::from_cli_json("paused", line).unwrap();
        assert_eq!(s.cpu_percent, 0.0);
        assert_eq!(s.memory_limit, 0);
        assert_eq!(s.pids, None);
    }

    #[test]
    fn test_parse_size_units() {
        assert_eq!(parse_size("0B"), 0);
        assert_eq!(parse_size("1.5kB"), 1500);
        assert_eq!(parse_size("2KiB"), 2048);
        assert_eq!(parse_size("1TB"), 1_000_000_000_000);
        assert_eq!(parse_size("3 furlongs"), 0, "unknown units are ignored");
    }
}
