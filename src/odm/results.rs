//! Processing results: `all.zip` extraction and product lookup

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};

use super::client::OdmClient;
use super::task::TaskStatus;
use super::OdmError;

/// Result products probed at fixed paths inside the archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Product {
    Orthophoto,
    Dsm,
    Dtm,
    PointCloud,
}

impl Product {
    pub const ALL: [Product; 4] = [
        Product::Orthophoto,
        Product::Dsm,
        Product::Dtm,
        Product::PointCloud,
    ];

    pub fn relative_path(&self) -> &'static str {
        match self {
            Product::Orthophoto => "odm_orthophoto/odm_orthophoto.tif",
            Product::Dsm => "odm_dsm/odm_dsm.tif",
            Product::Dtm => "odm_dtm/odm_dtm.tif",
            Product::PointCloud => "odm_georeferenced_model/odm_georeferenced_model.las",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Product::Orthophoto => "Orthophoto",
            Product::Dsm => "DSM",
            Product::Dtm => "DTM",
            Product::PointCloud => "Point Cloud",
        }
    }
}

/// Which products to import; everything by default
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductSelection {
    pub orthophoto: bool,
    pub dsm: bool,
    pub dtm: bool,
    pub point_cloud: bool,
}

impl Default for ProductSelection {
    fn default() -> Self {
        Self {
            orthophoto: true,
            dsm: true,
            dtm: true,
            point_cloud: true,
        }
    }
}

impl ProductSelection {
    pub fn contains(&self, product: Product) -> bool {
        match product {
            Product::Orthophoto => self.orthophoto,
            Product::Dsm => self.dsm,
            Product::Dtm => self.dtm,
            Product::PointCloud => self.point_cloud,
        }
    }

    pub fn products(&self) -> Vec<Product> {
        Product::ALL.into_iter().filter(|p| self.contains(*p)).collect()
    }
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub imported: Vec<(Product, PathBuf)>,
    pub missing: Vec<Product>,
    /// Top-level directories of the archive, listed when the DTM is missing
    pub available_dirs: Vec<String>,
}

pub fn extract_archive(archive: &Path, dest: &Path) -> Result<(), OdmError> {
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)?;
    zip.extract(dest)?;
    Ok(())
}

pub fn probe(root: &Path, product: Product) -> Option<PathBuf> {
    let path = root.join(product.relative_path());
    path.is_file().then_some(path)
}

pub fn result_directories(root: &Path) -> Vec<String> {
    let mut dirs: Vec<String> = std::fs::read_dir(root)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().is_dir())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    dirs.sort();
    dirs
}

/// Copy every selected product found under `root` into `out_dir`
pub fn collect_products(root: &Path, selection: ProductSelection, out_dir: &Path) -> Result<ImportReport, OdmError> {
    std::fs::create_dir_all(out_dir)?;
    let mut report = ImportReport::default();

    for product in selection.products() {
        match probe(root, product) {
            Some(source) => {
                let file_name = source.file_name().unwrap_or_default();
                let target = out_dir.join(file_name);
                std::fs::copy(&source, &target)?;
                tracing::info!("{} imported to {}", product.label(), target.display());
                report.imported.push((product, target));
            }
            None => {
                tracing::warn!("{} not found in results ({})", product.label(), product.relative_path());
                if product == Product::Dtm {
                    report.available_dirs = result_directories(root);
                }
                report.missing.push(product);
            }
        }
    }

    Ok(report)
}

/// Download, extract and copy out the selected products of a completed task
///
/// The archive is unpacked in a temporary directory that is removed afterwards.
pub async fn import_results(
    client: &OdmClient,
    uuid: &str,
    selection: ProductSelection,
    out_dir: &Path,
) -> Result<ImportReport> {
    let info = client
        .get_task_info(uuid)
        .await
        .context("Could not get task information")?;
    if info.status != TaskStatus::Completed {
        bail!(
            "Task must be completed before importing results (currently {})",
            info.status
        );
    }

    let temp = tempfile::tempdir().context("Failed to create temporary directory")?;
    let archive = temp.path().join("results.zip");

    tracing::info!("Downloading results of {}", uuid);
    if !client.download_results(uuid, &archive).await {
        bail!("Failed to download results");
    }

    tracing::info!("Extracting results");
    let root = temp.path().to_path_buf();
    let extract_root = root.clone();
    tokio::task::spawn_blocking(move || extract_archive(&archive, &extract_root))
        .await
        .context("Extraction task panicked")?
        .context("Failed to extract results archive")?;

    let out_dir = out_dir.to_path_buf();
    let report = tokio::task::spawn_blocking(move || collect_products(&root, selection, &out_dir))
        .await
        .context("Import task panicked")??;

    Ok(report)
}
