//! Option documents for each chart family.
//!
//! The JSON field names follow the option layout line-chart libraries in the
//! browser expect (`xAxis`, `yAxis`, `areaStyle`, ...), so a static page can
//! hand a document to its renderer unchanged. Formatting callbacks cannot be
//! serialized; they are described by [`ValueFormat`] and the labels they would
//! produce are attached next to the raw values.
use nodenexus_common::format::{format_bytes, format_celsius, format_percent, format_rate};
use nodenexus_common::model::TimeSeriesWindow;
use serde::Serialize;

use crate::charts::ChartFamily;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ValueFormat {
    Plain,
    Percent,
    Bytes,
    BytesPerSecond,
    Load,
    Celsius,
}

impl ValueFormat {
    pub fn apply(self, value: f64) -> String {
        match self {
            ValueFormat::Plain => value.to_string(),
            ValueFormat::Percent => format_percent(value, 1),
            ValueFormat::Bytes => format_bytes(value),
            ValueFormat::BytesPerSecond => format_rate(value),
            ValueFormat::Load => format!("{value:.2}"),
            ValueFormat::Celsius => format_celsius(value),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Title {
    pub text: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub trigger: &'static str,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Grid {
    pub left: &'static str,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Legend {
    pub data: Vec<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CategoryAxis {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub data: Vec<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AxisLabel {
    pub width: u32,
    pub overflow: &'static str,
    pub value_format: ValueFormat,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValueAxis {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'static str>,
    pub axis_label: AxisLabel,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeriesTooltip {
    pub value_format: ValueFormat,
    /// One pre-formatted label per data point.
    pub labels: Vec<String>,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct AreaStyle {}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineSeries {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub data: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_style: Option<AreaStyle>,
    pub tooltip: SeriesTooltip,
}

impl LineSeries {
    fn new(name: &str, data: Vec<f64>, format: ValueFormat, area: bool) -> Self {
        let labels = data.iter().map(|v| format.apply(*v)).collect();
        Self {
            name: name.to_string(),
            kind: "line",
            data,
            area_style: area.then(AreaStyle::default),
            tooltip: SeriesTooltip {
                value_format: format,
                labels,
            },
        }
    }
}

/// Full option set for one chart. Applied whole on every update.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChartOption {
    pub title: Title,
    pub tooltip: Tooltip,
    pub grid: Grid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<Legend>,
    pub x_axis: CategoryAxis,
    pub y_axis: ValueAxis,
    pub series: Vec<LineSeries>,
}

impl ChartOption {
    fn new(
        family: ChartFamily,
        times: Vec<String>,
        y_axis: ValueAxis,
        series: Vec<LineSeries>,
    ) -> Self {
        let wide_labels = y_axis.axis_label.width > 50;
        Self {
            title: Title {
                text: family.title().to_string(),
            },
            tooltip: Tooltip { trigger: "axis" },
            grid: Grid {
                left: if wide_labels { "15%" } else { "10%" },
            },
            legend: None,
            x_axis: CategoryAxis {
                kind: "category",
                data: times,
            },
            y_axis,
            series,
        }
    }
}

fn percent_axis() -> ValueAxis {
    ValueAxis {
        kind: "value",
        min: Some(0.0),
        max: Some(100.0),
        name: Some("%"),
        axis_label: AxisLabel {
            width: 50,
            overflow: "break",
            value_format: ValueFormat::Plain,
        },
    }
}

fn rate_axis() -> ValueAxis {
    ValueAxis {
        kind: "value",
        min: None,
        max: None,
        name: None,
        axis_label: AxisLabel {
            width: 80,
            overflow: "break",
            value_format: ValueFormat::BytesPerSecond,
        },
    }
}

fn plain_axis(name: Option<&'static str>) -> ValueAxis {
    ValueAxis {
        kind: "value",
        min: None,
        max: None,
        name,
        axis_label: AxisLabel {
            width: 50,
            overflow: "break",
            value_format: ValueFormat::Plain,
        },
    }
}

fn family_axis(family: ChartFamily) -> ValueAxis {
    match family {
        ChartFamily::Cpu | ChartFamily::Memory | ChartFamily::Swap => percent_axis(),
        ChartFamily::NetSpeed | ChartFamily::DiskSpeed => rate_axis(),
        ChartFamily::Load => plain_axis(None),
        ChartFamily::Temperature => plain_axis(Some("°C")),
    }
}

/// Option set that renders as "no data": empty category axis, no series and,
/// for temperature, an empty legend.
fn empty_option(family: ChartFamily) -> ChartOption {
    let mut option = ChartOption::new(family, Vec::new(), family_axis(family), Vec::new());
    if family == ChartFamily::Temperature {
        option.legend = Some(Legend { data: Vec::new() });
    }
    option
}

/// Builds the full option set of `family` from `window`.
///
/// A family without samples, including a temperature family without
/// sensors, gets an empty option so a bound chart drops its old picture.
pub fn build_option(family: ChartFamily, window: &TimeSeriesWindow) -> ChartOption {
    if !family.has_data(window) {
        return empty_option(family);
    }
    match family {
        ChartFamily::Cpu | ChartFamily::Memory | ChartFamily::Swap => {
            let (samples, name) = match family {
                ChartFamily::Cpu => (&window.cpu, "CPU"),
                ChartFamily::Memory => (&window.memory, "内存"),
                _ => (&window.swap, "交换分区"),
            };
            let times = samples.iter().map(|s| s.time.clone()).collect();
            let data = samples.iter().map(|s| s.value).collect();
            ChartOption::new(
                family,
                times,
                family_axis(family),
                vec![LineSeries::new(name, data, ValueFormat::Percent, true)],
            )
        }
        ChartFamily::Load => {
            let times = window.load.iter().map(|s| s.time.clone()).collect();
            let series = vec![
                LineSeries::new(
                    "1分钟",
                    window.load.iter().map(|s| s.load1).collect(),
                    ValueFormat::Load,
                    false,
                ),
                LineSeries::new(
                    "5分钟",
                    window.load.iter().map(|s| s.load5).collect(),
                    ValueFormat::Load,
                    false,
                ),
                LineSeries::new(
                    "15分钟",
                    window.load.iter().map(|s| s.load15).collect(),
                    ValueFormat::Load,
                    false,
                ),
            ];
            ChartOption::new(family, times, family_axis(family), series)
        }
        ChartFamily::NetSpeed | ChartFamily::DiskSpeed => {
            let (samples, rx_name, tx_name) = if family == ChartFamily::NetSpeed {
                (&window.net_speed, "接收", "发送")
            } else {
                (&window.disk_speed, "读取", "写入")
            };
            let times = samples.iter().map(|s| s.time.clone()).collect();
            let series = vec![
                LineSeries::new(
                    rx_name,
                    samples.iter().map(|s| s.rx as f64).collect(),
                    ValueFormat::BytesPerSecond,
                    true,
                ),
                LineSeries::new(
                    tx_name,
                    samples.iter().map(|s| s.tx as f64).collect(),
                    ValueFormat::BytesPerSecond,
                    true,
                ),
            ];
            ChartOption::new(family, times, family_axis(family), series)
        }
        ChartFamily::Temperature => {
            let times = window
                .temperature_axis()
                .unwrap_or_default()
                .into_iter()
                .map(str::to_string)
                .collect();
            let series = window
                .temperature
                .iter()
                .map(|sensor| {
                    LineSeries::new(
                        &sensor.name,
                        sensor.samples.iter().map(|s| s.value).collect(),
                        ValueFormat::Celsius,
                        false,
                    )
                })
                .collect();
            let mut option = ChartOption::new(family, times, family_axis(family), series);
            option.legend = Some(Legend {
                data: window.sensor_names().into_iter().map(str::to_string).collect(),
            });
            option
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodenexus_common::model::{NamedSeries, PercentSample, SpeedSample};

    fn sample(time: &str, value: f64) -> PercentSample {
        PercentSample {
            time: time.into(),
            value,
        }
    }

    #[test]
    fn empty_family_renders_no_data() {
        let window = TimeSeriesWindow {
            cpu: vec![sample("t1", 10.0)],
            ..Default::default()
        };
        assert_eq!(build_option(ChartFamily::Cpu, &window).series.len(), 1);

        let memory = build_option(ChartFamily::Memory, &window);
        assert!(memory.x_axis.data.is_empty());
        assert!(memory.series.is_empty());
        assert_eq!(memory.y_axis.max, Some(100.0));

        let temperature = build_option(ChartFamily::Temperature, &window);
        assert!(temperature.series.is_empty());
        assert_eq!(temperature.legend, Some(Legend { data: Vec::new() }));
        let json = serde_json::to_value(&temperature).unwrap();
        assert_eq!(json["legend"]["data"], serde_json::json!([]));
        assert_eq!(json["xAxis"]["data"], serde_json::json!([]));
    }

    #[test]
    fn rate_chart_formats_labels() {
        let window = TimeSeriesWindow {
            disk_speed: vec![SpeedSample {
                time: "t1".into(),
                rx: 1536,
                tx: 0,
            }],
            ..Default::default()
        };
        let option = build_option(ChartFamily::DiskSpeed, &window);
        assert_eq!(option.grid.left, "15%");
        assert_eq!(option.series[0].name, "读取");
        assert_eq!(option.series[0].tooltip.labels, vec!["1.50 KB/s"]);
        assert_eq!(option.series[1].tooltip.labels, vec!["0 B/s"]);

        let json = serde_json::to_value(&option).unwrap();
        assert_eq!(json["yAxis"]["axisLabel"]["valueFormat"], "bytes_per_second");
        assert_eq!(json["xAxis"]["type"], "category");
        assert!(json["series"][0]["areaStyle"].is_object());
    }

    #[test]
    fn temperature_uses_sensor_legend_and_first_axis() {
        let window = TimeSeriesWindow {
            temperature: vec![
                NamedSeries {
                    name: "cpu0".into(),
                    samples: vec![sample("t1", 40.0), sample("t2", 41.0)],
                },
                NamedSeries {
                    name: "gpu0".into(),
                    samples: vec![sample("t1", 55.0)],
                },
            ],
            ..Default::default()
        };
        let option = build_option(ChartFamily::Temperature, &window);
        assert_eq!(option.x_axis.data, vec!["t1", "t2"]);
        assert_eq!(option.legend.unwrap().data, vec!["cpu0", "gpu0"]);
        assert_eq!(option.series.len(), 2);
        assert_eq!(option.series[1].tooltip.labels, vec!["55.0°C"]);
        assert_eq!(option.y_axis.name, Some("°C"));
    }
}
