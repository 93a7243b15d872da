//! Chart families, their option documents and the surfaces they render on.
pub mod backend;
pub mod manager;
pub mod options;

use nodenexus_common::model::TimeSeriesWindow;
use serde::Serialize;
use std::fmt;

pub use backend::{ChartBackend, ChartInstance, FileChartBackend};
pub use manager::{ChartSurfaceManager, RenderReport, SlotState};
pub use options::{build_option, ChartOption, ValueFormat};

/// One chart on the node page. Order of `ALL` is the page order.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ChartFamily {
    Cpu,
    Memory,
    Load,
    Swap,
    NetSpeed,
    DiskSpeed,
    Temperature,
}

impl ChartFamily {
    pub const ALL: [ChartFamily; 7] = [
        ChartFamily::Cpu,
        ChartFamily::Memory,
        ChartFamily::Load,
        ChartFamily::Swap,
        ChartFamily::NetSpeed,
        ChartFamily::DiskSpeed,
        ChartFamily::Temperature,
    ];

    /// Identifier of the display surface, also the file stem of its document.
    pub fn surface_id(self) -> &'static str {
        match self {
            ChartFamily::Cpu => "cpu",
            ChartFamily::Memory => "memory",
            ChartFamily::Load => "load",
            ChartFamily::Swap => "swap",
            ChartFamily::NetSpeed => "net_speed",
            ChartFamily::DiskSpeed => "disk_speed",
            ChartFamily::Temperature => "temperature",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ChartFamily::Cpu => "CPU使用率",
            ChartFamily::Memory => "内存使用率",
            ChartFamily::Load => "系统负载",
            ChartFamily::Swap => "交换分区使用率",
            ChartFamily::NetSpeed => "网络IO",
            ChartFamily::DiskSpeed => "磁盘IO",
            ChartFamily::Temperature => "温度监控",
        }
    }

    /// Whether `window` holds at least one sample for this family.
    pub fn has_data(self, window: &TimeSeriesWindow) -> bool {
        match self {
            ChartFamily::Cpu => !window.cpu.is_empty(),
            ChartFamily::Memory => !window.memory.is_empty(),
            ChartFamily::Load => !window.load.is_empty(),
            ChartFamily::Swap => !window.swap.is_empty(),
            ChartFamily::NetSpeed => !window.net_speed.is_empty(),
            ChartFamily::DiskSpeed => !window.disk_speed.is_empty(),
            ChartFamily::Temperature => window.temperature.iter().any(|s| !s.samples.is_empty()),
        }
    }
}

impl fmt::Display for ChartFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.surface_id())
    }
}
