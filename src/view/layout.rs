//! Pure layout functions over the shared model.
use nodenexus_common::format::{
    format_bytes, format_load, format_percent, format_rate, format_uptime,
};
use nodenexus_common::model::{NodeSnapshot, TimeSeriesWindow};
use serde::Serialize;

use crate::charts::ChartFamily;
use crate::viewport::Viewport;

pub const SURFACE_HEIGHT: u32 = 300;

/// A display surface a chart can be bound to.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSpec {
    pub family: ChartFamily,
    pub full_width: bool,
    pub height: u32,
}

impl SurfaceSpec {
    /// Width in pixels for the given viewport. Half-width surfaces sit two
    /// per row.
    pub fn width(&self, viewport: Viewport) -> u32 {
        if self.full_width {
            viewport.width
        } else {
            viewport.width / 2
        }
    }
}

/// The surfaces present on a node page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartLayout {
    surfaces: Vec<SurfaceSpec>,
}

impl ChartLayout {
    pub fn surfaces(&self) -> &[SurfaceSpec] {
        &self.surfaces
    }

    pub fn surface(&self, family: ChartFamily) -> Option<&SurfaceSpec> {
        self.surfaces.iter().find(|s| s.family == family)
    }
}

/// Fixed families always get a half-width surface. The temperature surface
/// spans the row and only exists while the node reports sensors.
pub fn chart_layout(window: &TimeSeriesWindow) -> ChartLayout {
    let surfaces = ChartFamily::ALL
        .iter()
        .filter(|family| **family != ChartFamily::Temperature || !window.temperature.is_empty())
        .map(|family| SurfaceSpec {
            family: *family,
            full_width: *family == ChartFamily::Temperature,
            height: SURFACE_HEIGHT,
        })
        .collect();
    ChartLayout { surfaces }
}

/// Card text for one node.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NodeSummary {
    pub node_id: String,
    pub name: String,
    pub location: String,
    pub online: bool,
    pub uptime: String,
    pub cpu: String,
    pub memory: String,
    pub swap: String,
    pub disk: String,
    pub load: String,
    pub network_speed: String,
    pub network_total: String,
    pub disk_io: String,
    pub temperature: Option<String>,
}

pub fn node_summary(node: &NodeSnapshot) -> NodeSummary {
    let temperature = if node.sensors().next().is_some() {
        Some(
            node.sensors()
                .map(|(name, value)| format!("{name}: {value:.1}°C"))
                .collect::<Vec<_>>()
                .join(", "),
        )
    } else {
        None
    };

    NodeSummary {
        node_id: node.node_id.clone(),
        name: node.display_name().to_string(),
        location: node.location().to_string(),
        online: node.node_alive,
        uptime: format_uptime(node.host.uptime),
        cpu: format_percent(node.percent.cpu, 1),
        memory: format!(
            "{} ({} / {})",
            format_percent(node.percent.mem, 1),
            format_bytes(node.memory.used as f64),
            format_bytes(node.memory.total as f64)
        ),
        swap: format!(
            "{} ({} / {})",
            format_percent(node.percent.swap, 1),
            format_bytes(node.swap.used as f64),
            format_bytes(node.swap.total as f64)
        ),
        disk: format!(
            "{} ({} / {})",
            format_percent(node.percent.disk, 1),
            format_bytes(node.disk.used as f64),
            format_bytes(node.disk.total as f64)
        ),
        load: format_load(&node.load),
        network_speed: format!(
            "↓{} ↑{}",
            format_rate(node.network.rx as f64),
            format_rate(node.network.tx as f64)
        ),
        network_total: format!(
            "↓{} ↑{}",
            format_bytes(node.network.rb as f64),
            format_bytes(node.network.sb as f64)
        ),
        disk_io: format!(
            "R {} W {}",
            format_rate(node.disk.rx as f64),
            format_rate(node.disk.wx as f64)
        ),
        temperature,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodenexus_common::model::{HostFacts, NamedSeries, NetworkStat, UtilizationPercent};
    use std::collections::BTreeMap;

    #[test]
    fn temperature_surface_follows_sensors() {
        let mut window = TimeSeriesWindow::default();
        let layout = chart_layout(&window);
        assert_eq!(layout.surfaces().len(), 6);
        assert!(layout.surface(ChartFamily::Temperature).is_none());
        assert!(layout.surface(ChartFamily::Cpu).is_some());

        window.temperature.push(NamedSeries {
            name: "cpu0".into(),
            samples: Vec::new(),
        });
        let layout = chart_layout(&window);
        let temp = layout.surface(ChartFamily::Temperature).unwrap();
        assert!(temp.full_width);
        let viewport = Viewport { width: 1000, height: 700 };
        assert_eq!(temp.width(viewport), 1000);
        assert_eq!(layout.surface(ChartFamily::Load).unwrap().width(viewport), 500);
    }

    #[test]
    fn summary_strings() {
        let mut temperature = BTreeMap::new();
        temperature.insert("cpu0".to_string(), 48.0);
        let node = NodeSnapshot {
            node_id: "hk".into(),
            node_alive: true,
            host: HostFacts {
                uptime: 90_000,
                hostname: "hk-1".into(),
                ..Default::default()
            },
            percent: UtilizationPercent {
                cpu: 12.34,
                mem: 50.0,
                swap: 0.0,
                disk: 71.25,
            },
            network: NetworkStat {
                rx: 1024,
                tx: 0,
                sb: 0,
                rb: 1536,
            },
            temperature: Some(temperature),
            ..Default::default()
        };
        let summary = node_summary(&node);
        assert_eq!(summary.name, "hk-1");
        assert_eq!(summary.uptime, "1天1小时");
        assert_eq!(summary.cpu, "12.3%");
        assert_eq!(summary.network_speed, "↓1.00 KB/s ↑0 B/s");
        assert_eq!(summary.network_total, "↓1.50 KB ↑0 B");
        assert_eq!(summary.temperature.as_deref(), Some("cpu0: 48.0°C"));

        let offline = NodeSnapshot {
            node_id: "sg".into(),
            ..Default::default()
        };
        let summary = node_summary(&offline);
        assert!(!summary.online);
        assert_eq!(summary.temperature, None);
        assert_eq!(summary.memory, "0.0% (0 B / 0 B)");
    }
}
