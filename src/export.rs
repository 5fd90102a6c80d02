// proposal-pdf: turn a proposal into sections and a PDF artifact

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ::image::DynamicImage;
use log::info;

use crate::config::ProposalConfig;
use crate::error::AppError;
use crate::layout::{Layout, LayoutEngine, OverflowPolicy, PageGeometry, Section};
use crate::preview::{PreviewHandle, PreviewRegistry};
use crate::record::{CanBeAdapted, Record};
use crate::render::{self, DocumentHeader};

// ============================================================================
// Flattening
// ============================================================================

/// Ordered, non-empty sections of a proposal. Pure: the same record always
/// gives the same sections.
pub fn flatten(record: &Record) -> Vec<Section> {
    let audience = record
        .audience
        .selected()
        .map(|g| g.label().to_string())
        .collect::<Vec<_>>()
        .join(", ");

    let access = &record.accessibility;
    let mut disability_types: Vec<String> = access
        .disability_types
        .selected()
        .map(|d| d.label().to_string())
        .collect();
    let other = access.disability_types.other.trim();
    if !other.is_empty() {
        disability_types.push(format!("Other: {}", other));
    }

    let when = |choice: CanBeAdapted, value: String| {
        if access.can_be_adapted == choice {
            value
        } else {
            String::new()
        }
    };

    let sections = [
        ("Workshop / Activity Name", record.name.clone()),
        ("Rationale", record.rationale.clone()),
        ("Objectives", record.objectives.clone()),
        ("Audience", audience),
        ("Audience clarifications", record.audience.clarifications.clone()),
        ("Thematic axes", record.axes.clone()),
        ("Headcount", record.capacity.headcount.clone()),
        ("Duration", record.capacity.duration.clone()),
        ("Responsible parties", record.responsible_parties.clone()),
        ("Sequence - Opening", record.sequence.opening.clone()),
        ("Sequence - Development", record.sequence.development.clone()),
        ("Sequence - Closing", record.sequence.closing.clone()),
        ("Resources needed", record.resources.clone()),
        ("Logistics needed", record.logistics.clone()),
        (
            "Can the workshop be carried out by people with disabilities?",
            access.can_be_adapted.label().to_string(),
        ),
        (
            "What type of disability?",
            when(CanBeAdapted::Yes, disability_types.join(", ")),
        ),
        (
            "What would be needed to make it inclusive?",
            when(CanBeAdapted::No, access.what_would_be_needed.clone()),
        ),
        ("Which spaces of the hub take part?", record.spaces.clone()),
        (
            "What would be needed to integrate other spaces of the hub?",
            record.integration.clone(),
        ),
        ("Final notes", record.final_notes.clone()),
    ];

    sections
        .into_iter()
        .filter_map(|(title, value)| {
            let value = value.trim();
            (!value.is_empty()).then(|| Section::new(title, value))
        })
        .collect()
}

/// `Proposal_<OrgTag>_<name>_<year>.pdf`, with characters that are invalid
/// in file names replaced by `_`.
pub fn file_name(record: &Record, org_tag: &str, placeholder: &str) -> String {
    let name = record.name.trim();
    let name = if name.is_empty() { placeholder } else { name };
    let raw = format!("Proposal_{}_{}_{}.pdf", org_tag, name, record.year.trim());
    raw.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

// ============================================================================
// Exporter
// ============================================================================

/// Everything the exporter needs besides the record itself.
#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub brand_name: String,
    pub subtitle: String,
    pub org_tag: String,
    pub placeholder_name: String,
    pub overflow: OverflowPolicy,
    pub logo: Option<DynamicImage>,
}

impl ExportSettings {
    /// Settings from config; loads the logo when one is configured.
    pub fn from_config(config: &ProposalConfig, overflow: OverflowPolicy) -> Result<Self, AppError> {
        let logo = match &config.logo {
            Some(source) => Some(render::load_logo(source)?),
            None => None,
        };
        Ok(ExportSettings {
            brand_name: config.brand_name.clone(),
            subtitle: config.subtitle.clone(),
            org_tag: config.org_tag.clone(),
            placeholder_name: config.placeholder_name.clone(),
            overflow,
            logo,
        })
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        let config = ProposalConfig::default();
        ExportSettings {
            brand_name: config.brand_name,
            subtitle: config.subtitle,
            org_tag: config.org_tag,
            placeholder_name: config.placeholder_name,
            overflow: OverflowPolicy::default(),
            logo: None,
        }
    }
}

/// A built document. Download and preview share the same bytes.
#[derive(Debug, Clone)]
pub struct ExportedDocument {
    pub file_name: String,
    pub layout: Layout,
    bytes: Arc<Vec<u8>>,
}

impl ExportedDocument {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn page_count(&self) -> usize {
        self.layout.page_count()
    }

    /// Writes the document into `dir` under its file name.
    pub fn save_in(&self, dir: &Path) -> Result<PathBuf, AppError> {
        let path = dir.join(&self.file_name);
        self.save_as(&path)?;
        Ok(path)
    }

    pub fn save_as(&self, path: &Path) -> Result<(), AppError> {
        std::fs::write(path, self.bytes.as_slice())?;
        info!(
            "event=export_download status=ok path={} pages={}",
            path.display(),
            self.page_count()
        );
        Ok(())
    }

    /// Publishes the bytes for inline viewing.
    pub fn preview(&self, registry: &PreviewRegistry) -> PreviewHandle {
        registry.publish(Arc::clone(&self.bytes))
    }
}

#[derive(Debug, Clone, Default)]
pub struct DocumentExporter {
    settings: ExportSettings,
}

impl DocumentExporter {
    pub fn new(settings: ExportSettings) -> Self {
        DocumentExporter { settings }
    }

    pub fn file_name(&self, record: &Record) -> String {
        file_name(record, &self.settings.org_tag, &self.settings.placeholder_name)
    }

    /// Lays out the record without rendering it.
    pub fn layout(&self, record: &Record) -> Layout {
        let engine = LayoutEngine::new(PageGeometry::a4(), self.settings.overflow);
        engine.paginate(&flatten(record))
    }

    /// Single build routine behind both download and preview.
    pub fn build(&self, record: &Record) -> Result<ExportedDocument, AppError> {
        let layout = self.layout(record);
        let header = DocumentHeader {
            brand_name: self.settings.brand_name.clone(),
            subtitle: self.settings.subtitle.clone(),
            heading: format!("Activity Proposal {}", record.year.trim()),
            logo: self.settings.logo.clone(),
        };
        let bytes = render::render_pdf(&layout, &header)?;
        Ok(ExportedDocument {
            file_name: self.file_name(record),
            layout,
            bytes: Arc::new(bytes),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
