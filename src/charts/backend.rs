use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::charts::{ChartFamily, ChartOption};
use crate::error::ChartError;
use crate::view::layout::SurfaceSpec;
use crate::viewport::Viewport;

/// Creates rendering instances on display surfaces.
pub trait ChartBackend: Send {
    fn init(
        &mut self,
        node_id: &str,
        surface: &SurfaceSpec,
        viewport: Viewport,
    ) -> Result<Box<dyn ChartInstance>, ChartError>;
}

/// A live chart bound to one surface.
pub trait ChartInstance: Send {
    /// Replaces the whole option set.
    fn set_option(&mut self, option: &ChartOption) -> Result<(), ChartError>;

    /// Recomputes layout for a new viewport.
    fn resize(&mut self, viewport: Viewport) -> Result<(), ChartError>;

    /// Shows `banner` over the chart, or clears it with `None`. The option
    /// set stays as it is.
    fn set_banner(&mut self, banner: Option<&str>) -> Result<(), ChartError>;

    fn dispose(&mut self);
}

/// Writes one JSON document per surface to `<output_dir>/<node_id>/<surface>.json`.
#[derive(Debug, Clone)]
pub struct FileChartBackend {
    output_dir: PathBuf,
}

impl FileChartBackend {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn document_path(&self, node_id: &str, family: ChartFamily) -> PathBuf {
        self.output_dir
            .join(node_id)
            .join(format!("{}.json", family.surface_id()))
    }
}

impl ChartBackend for FileChartBackend {
    fn init(
        &mut self,
        node_id: &str,
        surface: &SurfaceSpec,
        viewport: Viewport,
    ) -> Result<Box<dyn ChartInstance>, ChartError> {
        let dir = self.output_dir.join(node_id);
        fs::create_dir_all(&dir).map_err(|e| ChartError::Init {
            surface: surface.family.to_string(),
            reason: format!("cannot create {}: {e}", dir.display()),
        })?;
        Ok(Box::new(FileChartInstance {
            path: self.document_path(node_id, surface.family),
            node_id: node_id.to_string(),
            surface: *surface,
            viewport,
            option: None,
            banner: None,
        }))
    }
}

#[derive(Serialize)]
struct ChartDocument<'a> {
    node_id: &'a str,
    surface: ChartFamily,
    width: u32,
    height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    banner: Option<&'a str>,
    option: &'a ChartOption,
}

struct FileChartInstance {
    path: PathBuf,
    node_id: String,
    surface: SurfaceSpec,
    viewport: Viewport,
    option: Option<ChartOption>,
    banner: Option<String>,
}

impl FileChartInstance {
    fn write(&self) -> Result<(), ChartError> {
        let Some(option) = &self.option else {
            return Ok(());
        };
        let document = ChartDocument {
            node_id: &self.node_id,
            surface: self.surface.family,
            width: self.surface.width(self.viewport),
            height: self.surface.height,
            banner: self.banner.as_deref(),
            option,
        };
        let body = serde_json::to_vec_pretty(&document)?;
        write_replacing(&self.path, &body)?;
        debug!(path = %self.path.display(), "Chart document written.");
        Ok(())
    }
}

// Readers polling the file never see a partially written document.
fn write_replacing(path: &Path, body: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, body)?;
    fs::rename(&tmp, path)
}

impl ChartInstance for FileChartInstance {
    fn set_option(&mut self, option: &ChartOption) -> Result<(), ChartError> {
        self.option = Some(option.clone());
        self.write()
    }

    fn resize(&mut self, viewport: Viewport) -> Result<(), ChartError> {
        if self.viewport == viewport {
            return Ok(());
        }
        self.viewport = viewport;
        self.write()
    }

    fn set_banner(&mut self, banner: Option<&str>) -> Result<(), ChartError> {
        if self.banner.as_deref() == banner {
            return Ok(());
        }
        self.banner = banner.map(str::to_string);
        self.write()
    }

    fn dispose(&mut self) {
        self.option = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::build_option;
    use nodenexus_common::model::{PercentSample, TimeSeriesWindow};

    #[test]
    fn writes_and_resizes_document() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = FileChartBackend::new(dir.path());
        let surface = SurfaceSpec {
            family: ChartFamily::Cpu,
            full_width: false,
            height: 300,
        };
        let mut instance = backend
            .init("node-a", &surface, Viewport { width: 1200, height: 800 })
            .unwrap();

        let path = backend.document_path("node-a", ChartFamily::Cpu);
        assert!(!path.exists());

        let window = TimeSeriesWindow {
            cpu: vec![PercentSample {
                time: "2024-01-01 00:00:00".into(),
                value: 12.5,
            }],
            ..Default::default()
        };
        let option = build_option(ChartFamily::Cpu, &window);
        instance.set_option(&option).unwrap();

        let doc: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(doc["width"], 600);
        assert_eq!(doc["surface"], "cpu");
        assert_eq!(doc["option"]["series"][0]["data"][0], 12.5);

        instance.resize(Viewport { width: 800, height: 600 }).unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(doc["width"], 400);
    }

    #[test]
    fn banner_is_written_next_to_the_option() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = FileChartBackend::new(dir.path());
        let surface = SurfaceSpec {
            family: ChartFamily::Memory,
            full_width: false,
            height: 300,
        };
        let mut instance = backend.init("node-a", &surface, Viewport::default()).unwrap();
        let path = backend.document_path("node-a", ChartFamily::Memory);
        let read = || -> serde_json::Value {
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap()
        };

        let window = TimeSeriesWindow {
            memory: vec![PercentSample {
                time: "t1".into(),
                value: 30.0,
            }],
            ..Default::default()
        };
        instance.set_option(&build_option(ChartFamily::Memory, &window)).unwrap();
        assert!(read().get("banner").is_none());

        instance.set_banner(Some("Failed to load chart data")).unwrap();
        let doc = read();
        assert_eq!(doc["banner"], "Failed to load chart data");
        assert_eq!(doc["option"]["series"][0]["data"][0], 30.0);

        instance.set_banner(None).unwrap();
        assert!(read().get("banner").is_none());
    }
}
