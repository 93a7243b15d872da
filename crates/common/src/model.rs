use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Treats an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// --- Navigation ---

/// One configured node as listed by `GET /api/nodes`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct NodeMeta {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub reset_day: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct NodesIndex {
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub nodes: Vec<NodeMeta>,
}

// --- Overview snapshot ---

/// Utilization percentages in [0, 100].
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
#[serde(default)]
pub struct UtilizationPercent {
    pub cpu: f64,
    pub mem: f64,
    pub swap: f64,
    pub disk: f64,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
#[serde(default)]
pub struct LoadAverage {
    pub load1: f64,
    pub load5: f64,
    pub load15: f64,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
#[serde(default)]
pub struct UsageStat {
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

/// Disk capacity plus read (`rx`) / write (`wx`) rates in bytes per second.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
#[serde(default)]
pub struct DiskStat {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub rx: u64,
    pub wx: u64,
}

/// Instantaneous rates (`rx`/`tx`, bytes per second) and cumulative
/// sent/received byte totals (`sb`/`rb`).
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
#[serde(default)]
pub struct NetworkStat {
    pub rx: u64,
    pub tx: u64,
    pub sb: u64,
    pub rb: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct HostFacts {
    pub uptime: u64,
    pub hostname: String,
    pub platform: String,
    pub version: String,
    pub arch: String,
}

/// Point-in-time state of one node.
///
/// When `node_alive` is false the remaining fields carry the last values the
/// node reported, not zeros. Nodes that never reported omit most sub-records,
/// which then default to zero values.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct NodeSnapshot {
    pub node_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: NodeMeta,
    #[serde(default)]
    pub node_alive: bool,
    #[serde(rename = "Host", default, deserialize_with = "null_as_default")]
    pub host: HostFacts,
    #[serde(default, deserialize_with = "null_as_default")]
    pub percent: UtilizationPercent,
    #[serde(default, deserialize_with = "null_as_default")]
    pub load: LoadAverage,
    #[serde(default, deserialize_with = "null_as_default")]
    pub memory: UsageStat,
    #[serde(default, deserialize_with = "null_as_default")]
    pub swap: UsageStat,
    #[serde(default, deserialize_with = "null_as_default")]
    pub disk: DiskStat,
    #[serde(default, deserialize_with = "null_as_default")]
    pub network: NetworkStat,
    /// Report interval of the node agent, in seconds.
    #[serde(default)]
    pub interval: u64,
    /// Unix time of the last report.
    #[serde(default)]
    pub report: i64,
    #[serde(default)]
    pub temperature: Option<BTreeMap<String, f64>>,
}

impl NodeSnapshot {
    /// Label from the node metadata, falling back to the reported hostname.
    pub fn display_name(&self) -> &str {
        if self.metadata.label.is_empty() {
            &self.host.hostname
        } else {
            &self.metadata.label
        }
    }

    pub fn label(&self) -> &str {
        &self.metadata.label
    }

    pub fn location(&self) -> &str {
        &self.metadata.location
    }

    pub fn reset_day(&self) -> u32 {
        self.metadata.reset_day
    }

    /// Sensor readings ordered by sensor name; empty when the node reports none.
    pub fn sensors(&self) -> impl Iterator<Item = (&str, f64)> {
        self.temperature
            .iter()
            .flat_map(|m| m.iter())
            .map(|(name, value)| (name.as_str(), *value))
    }
}

/// Result of one overview poll. Always replaced as a whole.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct OverviewSet {
    pub update_at: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub nodes: Vec<NodeSnapshot>,
}

impl OverviewSet {
    pub fn node(&self, node_id: &str) -> Option<&NodeSnapshot> {
        self.nodes.iter().find(|n| n.node_id == node_id)
    }

    pub fn alive_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.node_alive).count()
    }
}

// --- Time series ---

/// Scalar sample: percentages for cpu/memory/swap, degrees Celsius for sensors.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PercentSample {
    pub time: String,
    pub value: f64,
}

/// Byte-rate sample in bytes per second.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct SpeedSample {
    pub time: String,
    pub rx: u64,
    pub tx: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct LoadSample {
    pub time: String,
    pub load1: f64,
    pub load5: f64,
    pub load15: f64,
}

/// Body of `GET /api/charts?id=<node>` as sent by the server.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct RawSeriesPayload {
    #[serde(default, deserialize_with = "null_as_default")]
    pub cpu: Vec<PercentSample>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub memory: Vec<PercentSample>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub swap: Vec<PercentSample>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub disk_speed: Vec<SpeedSample>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub net_speed: Vec<SpeedSample>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub load: Vec<LoadSample>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub temperature: HashMap<String, Vec<PercentSample>>,
}

/// One sensor's history inside the temperature family.
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct NamedSeries {
    pub name: String,
    pub samples: Vec<PercentSample>,
}

pub type TemperatureSeries = Vec<NamedSeries>;

/// Normalized per-node history. Fixed families keep the server order
/// (timestamp ascending); `temperature` is sorted by sensor name.
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct TimeSeriesWindow {
    pub node_id: String,
    /// Number of reconciliations that produced this window, starting at 1.
    pub generation: u64,
    pub cpu: Vec<PercentSample>,
    pub memory: Vec<PercentSample>,
    pub swap: Vec<PercentSample>,
    pub disk_speed: Vec<SpeedSample>,
    pub net_speed: Vec<SpeedSample>,
    pub load: Vec<LoadSample>,
    pub temperature: TemperatureSeries,
}

impl TimeSeriesWindow {
    pub fn sensor_names(&self) -> Vec<&str> {
        self.temperature.iter().map(|s| s.name.as_str()).collect()
    }

    /// Shared x-axis of the temperature chart: the first sensor's timestamps.
    pub fn temperature_axis(&self) -> Option<Vec<&str>> {
        self.temperature
            .first()
            .map(|s| s.samples.iter().map(|p| p.time.as_str()).collect())
    }

    /// True when no family carries a single sample.
    pub fn is_empty(&self) -> bool {
        self.cpu.is_empty()
            && self.memory.is_empty()
            && self.swap.is_empty()
            && self.disk_speed.is_empty()
            && self.net_speed.is_empty()
            && self.load.is_empty()
            && self.temperature.iter().all(|s| s.samples.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overview_tolerates_offline_nodes_and_null_temperature() {
        let raw = r#"{
            "update_at": 1700000000,
            "nodes": [
                {"node_id": "hk", "node_alive": false, "metadata": null, "temperature": null},
                {
                    "node_id": "sg",
                    "node_alive": true,
                    "percent": {"cpu": 12.5, "mem": 40.0, "swap": 0.0, "disk": 71.2},
                    "load": {"load1": 0.1, "load5": 0.2, "load15": 0.3},
                    "memory": {"total": 2048, "used": 1024, "free": 1024},
                    "swap": {"total": 0, "used": 0, "free": 0},
                    "disk": {"total": 10, "used": 5, "free": 5, "rx": 100, "wx": 200},
                    "network": {"rx": 1, "tx": 2, "sb": 3, "rb": 4},
                    "Host": {
                        "uptime": 3661,
                        "hostname": "sg-1",
                        "platform": "debian",
                        "version": "12",
                        "arch": "x86_64"
                    },
                    "interval": 2,
                    "report": 1699999999,
                    "temperature": {"cpu1": 50.0, "cpu0": 48.5},
                    "metadata": {"id": "sg", "label": "", "location": "SG", "reset_day": 1}
                }
            ]
        }"#;
        let set: OverviewSet = serde_json::from_str(raw).unwrap();
        assert_eq!(set.nodes.len(), 2);
        assert_eq!(set.alive_count(), 1);

        let offline = set.node("hk").unwrap();
        assert!(offline.temperature.is_none());
        assert_eq!(offline.sensors().count(), 0);

        let sg = set.node("sg").unwrap();
        assert_eq!(sg.display_name(), "sg-1");
        assert_eq!(sg.disk.wx, 200);
        let names: Vec<&str> = sg.sensors().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["cpu0", "cpu1"]);
    }

    #[test]
    fn series_payload_accepts_missing_and_null_families() {
        let raw = r#"{
            "cpu": [{"time": "2024-01-01 00:00:00", "value": 1.5}],
            "memory": null,
            "temperature": null
        }"#;
        let payload: RawSeriesPayload = serde_json::from_str(raw).unwrap();
        assert_eq!(payload.cpu.len(), 1);
        assert!(payload.memory.is_empty());
        assert!(payload.load.is_empty());
        assert!(payload.temperature.is_empty());
    }

    #[test]
    fn negative_byte_rate_is_rejected() {
        let raw = r#"{"disk_speed": [{"time": "t", "rx": -1, "tx": 0}]}"#;
        assert!(serde_json::from_str::<RawSeriesPayload>(raw).is_err());
    }

    #[test]
    fn window_temperature_axis_uses_first_sensor() {
        let window = TimeSeriesWindow {
            temperature: vec![
                NamedSeries {
                    name: "a".into(),
                    samples: vec![PercentSample { time: "t1".into(), value: 1.0 }],
                },
                NamedSeries {
                    name: "b".into(),
                    samples: vec![],
                },
            ],
            ..Default::default()
        };
        assert_eq!(window.temperature_axis(), Some(vec!["t1"]));
        assert_eq!(window.sensor_names(), vec!["a", "b"]);
        assert!(!window.is_empty());
        assert!(TimeSeriesWindow::default().is_empty());
    }
}
