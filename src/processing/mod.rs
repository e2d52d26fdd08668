//! Processing options, presets and their translation to NodeODM options

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::odm::TaskOption;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureQuality {
    Auto,
    High,
    Medium,
    Low,
}

impl FeatureQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureQuality::Auto => "auto",
            FeatureQuality::High => "high",
            FeatureQuality::Medium => "medium",
            FeatureQuality::Low => "low",
        }
    }

    /// NodeODM has no "auto" feature quality
    fn node_value(&self) -> &'static str {
        match self {
            FeatureQuality::Auto | FeatureQuality::High => "high",
            FeatureQuality::Medium => "medium",
            FeatureQuality::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraLens {
    Auto,
    Perspective,
    Fisheye,
    Spherical,
}

impl CameraLens {
    pub fn as_str(&self) -> &'static str {
        match self {
            CameraLens::Auto => "auto",
            CameraLens::Perspective => "perspective",
            CameraLens::Fisheye => "fisheye",
            CameraLens::Spherical => "spherical",
        }
    }
}

/// Three-step quality used for reconstruction and point cloud density
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    High,
    Medium,
    Low,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::High => "high",
            Level::Medium => "medium",
            Level::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileSize {
    #[serde(rename = "2048")]
    Px2048,
    #[serde(rename = "4096")]
    Px4096,
    #[serde(rename = "8192")]
    Px8192,
}

impl TileSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            TileSize::Px2048 => "2048",
            TileSize::Px4096 => "4096",
            TileSize::Px8192 => "8192",
        }
    }
}

/// Every user-facing processing setting in one record
///
/// Keys match the `options` object of saved project files. Missing keys
/// fall back to the values below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingOptions {
    pub feature_extraction: FeatureQuality,
    pub camera_lens: CameraLens,
    pub quality: u32,
    pub dsm: bool,
    pub dtm: bool,
    pub orthophoto: bool,
    pub reconstruction: Level,
    pub fov: u32,
    pub pointcloud_density: Level,
    pub outlier_removal: bool,
    pub deviation: u32,
    /// Orthophoto resolution in cm/pixel
    pub resolution: u32,
    pub tile_size: TileSize,
    pub texture_mesh: bool,
    pub generate_video: bool,
    pub generate_report: bool,
    /// 0 lets the node decide
    pub threads: u32,
    /// GB, 0 means no limit
    pub memory_limit: u32,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            feature_extraction: FeatureQuality::Auto,
            camera_lens: CameraLens::Auto,
            quality: 50,
            dsm: false,
            dtm: false,
            orthophoto: true,
            reconstruction: Level::High,
            fov: 60,
            pointcloud_density: Level::Medium,
            outlier_removal: false,
            deviation: 5,
            resolution: 24,
            tile_size: TileSize::Px2048,
            texture_mesh: true,
            generate_video: false,
            generate_report: true,
            threads: 0,
            memory_limit: 8,
        }
    }
}

impl ProcessingOptions {
    /// Build the `options` array for `/task/new`
    ///
    /// `dsm`/`dtm` are forwarded as-is; import selects products on its own.
    pub fn to_task_options(&self) -> Vec<TaskOption> {
        let mut options = Vec::new();

        if self.dsm {
            options.push(TaskOption::new("dsm", true));
        }
        if self.dtm {
            options.push(TaskOption::new("dtm", true));
        }
        if self.orthophoto {
            options.push(TaskOption::new("orthophoto-resolution", self.resolution.to_string()));
        }

        options.push(TaskOption::new("reconstruction-quality", self.reconstruction.as_str()));
        options.push(TaskOption::new("camera-lens", self.camera_lens.as_str()));
        options.push(TaskOption::new("point-cloud-quality", self.pointcloud_density.as_str()));
        options.push(TaskOption::new("camera-fov", self.fov.to_string()));

        if self.outlier_removal {
            options.push(TaskOption::new("use-3dmesh", true));
            options.push(TaskOption::new("pc-cleanup", true));
            options.push(TaskOption::new("pc-classify", true));
            options.push(TaskOption::new("pc-filter", self.deviation.to_string()));
        }

        options.push(TaskOption::new("mesh-size", self.tile_size.as_str()));
        if self.texture_mesh {
            options.push(TaskOption::new("textured-mesh", true));
        }
        if self.generate_report {
            options.push(TaskOption::new("build-overviews", true));
        }

        if self.threads > 0 {
            options.push(TaskOption::new("threads", self.threads.to_string()));
        }
        if self.memory_limit > 0 {
            options.push(TaskOption::new("max-memory", self.memory_limit.to_string()));
        }

        options.push(TaskOption::new("feature-quality", self.feature_extraction.node_value()));
        options
    }

    /// Human-readable `key: value` lines
    pub fn summary(&self) -> Vec<String> {
        let flag = |b: bool| if b { "yes" } else { "no" };
        vec![
            format!("feature extraction: {}", self.feature_extraction.as_str()),
            format!("camera lens:        {}", self.camera_lens.as_str()),
            format!("quality:            {}%", self.quality),
            format!("dsm / dtm / ortho:  {} / {} / {}", flag(self.dsm), flag(self.dtm), flag(self.orthophoto)),
            format!("reconstruction:     {}", self.reconstruction.as_str()),
            format!("field of view:      {}°", self.fov),
            format!("point cloud:        {}", self.pointcloud_density.as_str()),
            format!("outlier removal:    {} (deviation {})", flag(self.outlier_removal), self.deviation),
            format!("resolution:         {} cm/px", self.resolution),
            format!("tile size:          {} px", self.tile_size.as_str()),
            format!("texture / video / report: {} / {} / {}", flag(self.texture_mesh), flag(self.generate_video), flag(self.generate_report)),
            format!("threads / memory:   {} / {} GB", self.threads, self.memory_limit),
        ]
    }
}

/// Named processing presets; `Custom` keeps whatever is configured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Custom,
    Default,
    HighResolution,
    FastOrthophoto,
    Field,
    DsmDtm,
    Model3d,
}

impl Preset {
    pub const ALL: [Preset; 7] = [
        Preset::Custom,
        Preset::Default,
        Preset::HighResolution,
        Preset::FastOrthophoto,
        Preset::Field,
        Preset::DsmDtm,
        Preset::Model3d,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Preset::Custom => "Custom",
            Preset::Default => "Default",
            Preset::HighResolution => "High Resolution",
            Preset::FastOrthophoto => "Fast Orthophoto",
            Preset::Field => "Field",
            Preset::DsmDtm => "DSM+DTM",
            Preset::Model3d => "3D Model",
        }
    }

    pub fn next(&self) -> Preset {
        let index = Self::ALL.iter().position(|p| p == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    /// Fixed option set of a named preset; None for `Custom`
    pub fn options(&self) -> Option<ProcessingOptions> {
        let base = ProcessingOptions {
            feature_extraction: FeatureQuality::Medium,
            camera_lens: CameraLens::Auto,
            quality: 50,
            dsm: true,
            dtm: false,
            orthophoto: true,
            reconstruction: Level::High,
            fov: 60,
            pointcloud_density: Level::Medium,
            outlier_removal: false,
            deviation: 5,
            resolution: 24,
            tile_size: TileSize::Px2048,
            texture_mesh: true,
            generate_video: false,
            generate_report: true,
            threads: 0,
            memory_limit: 8,
        };

        let options = match self {
            Preset::Custom => return None,
            Preset::Default => base,
            Preset::HighResolution => ProcessingOptions {
                feature_extraction: FeatureQuality::High,
                quality: 25,
                dtm: true,
                pointcloud_density: Level::High,
                resolution: 12,
                ..base
            },
            Preset::FastOrthophoto => ProcessingOptions {
                feature_extraction: FeatureQuality::Low,
                quality: 75,
                dsm: false,
                reconstruction: Level::Medium,
                pointcloud_density: Level::Low,
                resolution: 48,
                tile_size: TileSize::Px4096,
                texture_mesh: false,
                generate_report: false,
                ..base
            },
            Preset::Field => ProcessingOptions {
                feature_extraction: FeatureQuality::High,
                camera_lens: CameraLens::Perspective,
                quality: 30,
                resolution: 16,
                texture_mesh: false,
                ..base
            },
            Preset::DsmDtm => ProcessingOptions {
                dtm: true,
                outlier_removal: true,
                deviation: 3,
                ..base
            },
            Preset::Model3d => ProcessingOptions {
                feature_extraction: FeatureQuality::High,
                quality: 30,
                pointcloud_density: Level::High,
                resolution: 16,
                memory_limit: 12,
                ..base
            },
        };
        Some(options)
    }

    /// Overwrite every field of `options` with the preset values
    ///
    /// Returns false (and leaves `options` alone) for `Custom`.
    pub fn apply(&self, options: &mut ProcessingOptions) -> bool {
        match self.options() {
            Some(preset) => {
                *options = preset;
                true
            }
            None => false,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Preset::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let names: Vec<&str> = Preset::ALL.iter().map(|p| p.name()).collect();
                anyhow::anyhow!("Unknown preset '{}' (expected one of: {})", wanted, names.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option<'a>(options: &'a [TaskOption], name: &str) -> Option<&'a serde_json::Value> {
        options.iter().find(|o| o.name == name).map(|o| &o.value)
    }

    #[test]
    fn test_named_presets_overwrite_every_field() {
        for preset in Preset::ALL.into_iter().filter(|p| *p != Preset::Custom) {
            let expected = preset.options().unwrap();

            let mut options = ProcessingOptions {
                feature_extraction: FeatureQuality::Auto,
                camera_lens: CameraLens::Spherical,
                quality: 99,
                dsm: false,
                dtm: false,
                orthophoto: false,
                reconstruction: Level::Low,
                fov: 1,
                pointcloud_density: Level::Low,
                outlier_removal: true,
                deviation: 77,
                resolution: 1,
                tile_size: TileSize::Px8192,
                texture_mesh: false,
                generate_video: true,
                generate_report: false,
                threads: 64,
                memory_limit: 1,
            };

            assert!(preset.apply(&mut options));
            assert_eq!(options, expected, "preset {}", preset);
        }
    }

    #[test]
    fn test_custom_changes_nothing() {
        let mut options = ProcessingOptions {
            quality: 13,
            threads: 3,
            ..ProcessingOptions::default()
        };
        let before = options.clone();
        assert!(!Preset::Custom.apply(&mut options));
        assert_eq!(options, before);
    }

    #[test]
    fn test_preset_table_values() {
        let fast = Preset::FastOrthophoto.options().unwrap();
        assert_eq!(fast.resolution, 48);
        assert_eq!(fast.tile_size, TileSize::Px4096);
        assert!(!fast.dsm);

        let model = Preset::Model3d.options().unwrap();
        assert_eq!(model.memory_limit, 12);

        let dsm_dtm = Preset::DsmDtm.options().unwrap();
        assert!(dsm_dtm.dtm && dsm_dtm.outlier_removal);
        assert_eq!(dsm_dtm.deviation, 3);

        assert_eq!(Preset::Field.options().unwrap().camera_lens, CameraLens::Perspective);
    }

    #[test]
    fn test_preset_names_parse() {
        for preset in Preset::ALL {
            assert_eq!(preset.name().parse::<Preset>().unwrap(), preset);
        }
        assert_eq!("dsm+dtm".parse::<Preset>().unwrap(), Preset::DsmDtm);
        assert!("Ultra".parse::<Preset>().is_err());
        assert_eq!(Preset::Model3d.next(), Preset::Custom);
    }

    #[test]
    fn test_task_options_for_default_preset() {
        let options = Preset::Default.options().unwrap().to_task_options();

        assert_eq!(option(&options, "dsm"), Some(&serde_json::json!(true)));
        assert_eq!(option(&options, "dtm"), None);
        assert_eq!(option(&options, "orthophoto-resolution"), Some(&serde_json::json!("24")));
        assert_eq!(option(&options, "feature-quality"), Some(&serde_json::json!("medium")));
        assert_eq!(option(&options, "mesh-size"), Some(&serde_json::json!("2048")));
        assert_eq!(option(&options, "max-memory"), Some(&serde_json::json!("8")));
        assert_eq!(option(&options, "threads"), None);
        assert_eq!(option(&options, "pc-filter"), None);
    }

    #[test]
    fn test_task_options_outlier_and_auto_quality() {
        let options = ProcessingOptions {
            outlier_removal: true,
            deviation: 3,
            threads: 4,
            orthophoto: false,
            ..ProcessingOptions::default()
        }
        .to_task_options();

        assert_eq!(option(&options, "pc-filter"), Some(&serde_json::json!("3")));
        assert_eq!(option(&options, "pc-cleanup"), Some(&serde_json::json!(true)));
        assert_eq!(option(&options, "threads"), Some(&serde_json::json!("4")));
        assert_eq!(option(&options, "orthophoto-resolution"), None);
        assert_eq!(option(&options, "feature-quality"), Some(&serde_json::json!("high")));
    }

    #[test]
    fn test_options_json_keys() {
        let value = serde_json::to_value(Preset::Default.options().unwrap()).unwrap();
        assert_eq!(value["feature_extraction"], "medium");
        assert_eq!(value["tile_size"], "2048");
        assert_eq!(value["memory_limit"], 8);

        let partial: ProcessingOptions =
            serde_json::from_str(r#"{"quality": 80, "camera_lens": "fisheye"}"#).unwrap();
        assert_eq!(partial.quality, 80);
        assert_eq!(partial.camera_lens, CameraLens::Fisheye);
        assert_eq!(partial.resolution, 24);
    }
}
