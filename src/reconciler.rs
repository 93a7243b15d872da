//! Turns a raw `/api/charts` payload into the window the charts render from.
use nodenexus_common::model::{NamedSeries, RawSeriesPayload, TimeSeriesWindow};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Builds the next window for `node_id` from a freshly fetched payload.
///
/// Fixed families are taken as sent; any of them may be empty. The temperature
/// mapping becomes a list sorted by sensor name so legends keep a stable order
/// between polls. Nothing from `previous` is carried over except the
/// generation counter: a sensor that is missing from `raw` is gone.
pub fn reconcile(
    previous: Option<&TimeSeriesWindow>,
    raw: RawSeriesPayload,
    node_id: &str,
) -> TimeSeriesWindow {
    let RawSeriesPayload {
        cpu,
        memory,
        swap,
        disk_speed,
        net_speed,
        load,
        temperature,
    } = raw;

    let mut sensors: Vec<NamedSeries> = temperature
        .into_iter()
        .map(|(name, samples)| NamedSeries { name, samples })
        .collect();
    sensors.sort_by(|a, b| a.name.cmp(&b.name));

    if let Some(prev) = previous {
        log_sensor_changes(node_id, prev, &sensors);
    }

    let window = TimeSeriesWindow {
        node_id: node_id.to_string(),
        generation: previous.map_or(1, |p| p.generation.wrapping_add(1)),
        cpu,
        memory,
        swap,
        disk_speed,
        net_speed,
        load,
        temperature: sensors,
    };

    check_axis_lengths(&window);
    window
}

fn log_sensor_changes(node_id: &str, previous: &TimeSeriesWindow, current: &[NamedSeries]) {
    let before: BTreeSet<&str> = previous.temperature.iter().map(|s| s.name.as_str()).collect();
    let after: BTreeSet<&str> = current.iter().map(|s| s.name.as_str()).collect();

    let added: Vec<&str> = after.difference(&before).copied().collect();
    let removed: Vec<&str> = before.difference(&after).copied().collect();
    if !added.is_empty() || !removed.is_empty() {
        debug!(node_id, ?added, ?removed, "Temperature sensor set changed.");
    }
}

// The server reports fixed families on one shared axis. A mismatch is logged,
// never corrected: each chart still renders what it received.
fn check_axis_lengths(window: &TimeSeriesWindow) {
    let lengths = [
        ("cpu", window.cpu.len()),
        ("memory", window.memory.len()),
        ("swap", window.swap.len()),
        ("disk_speed", window.disk_speed.len()),
        ("net_speed", window.net_speed.len()),
        ("load", window.load.len()),
    ];
    let mut non_empty = lengths.iter().filter(|(_, len)| *len > 0);
    if let Some((_, expected)) = non_empty.next() {
        if let Some((family, len)) = non_empty.find(|(_, len)| len != expected) {
            warn!(
                node_id = %window.node_id,
                family,
                len,
                expected,
                "Fixed series families have different axis lengths."
            );
        }
    }
}
