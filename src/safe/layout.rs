//! Where files go inside a SAFE directory.
//!
//! [`SafeLayout`] is read from the manifest of the product being rebuilt. [`AWS_L1C_LAYOUT`]
//! maps the flat AWS Sentinel-2 L1C download onto it.
use super::manifest::DataObject;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

/// Top level folder of a SAFE path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SafeGroup {
    Root,
    Datastrip,
    Granule,
    Html,
    Other(String),
}

impl SafeGroup {
    pub fn of(path: &Path) -> Self {
        let mut components = path.components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(first)), Some(_)) => match first.to_string_lossy().as_ref() {
                "DATASTRIP" => Self::Datastrip,
                "GRANULE" => Self::Granule,
                "HTML" => Self::Html,
                other => Self::Other(other.to_string()),
            },
            _ => Self::Root,
        }
    }
}

/// Manifest declared paths, grouped by top level folder.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SafeLayout {
    groups: BTreeMap<SafeGroup, Vec<PathBuf>>,
}

impl SafeLayout {
    pub fn from_hrefs<I, S>(hrefs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut layout = Self::default();
        for href in hrefs {
            let path = PathBuf::from(href.as_ref());
            layout
                .groups
                .entry(SafeGroup::of(&path))
                .or_default()
                .push(path);
        }
        layout
    }

    pub fn from_data_objects(data_objects: &[DataObject]) -> Self {
        Self::from_hrefs(data_objects.iter().map(|d| d.relative_href.as_str()))
    }

    pub fn group(&self, group: &SafeGroup) -> &[PathBuf] {
        self.groups.get(group).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn declares(&self, path: &Path) -> bool {
        self.group(&SafeGroup::of(path)).iter().any(|p| p == path)
    }

    /// Every folder holding a declared file.
    pub fn directories(&self) -> BTreeSet<PathBuf> {
        self.groups
            .iter()
            .filter(|(group, _)| **group != SafeGroup::Root)
            .flat_map(|(_, paths)| paths.iter())
            .filter_map(|path| path.parent().map(Path::to_path_buf))
            .collect()
    }

    /// First declared folder of `group` named `folder`, e.g. `GRANULE/<g>/QI_DATA`.
    pub fn folder(&self, group: &SafeGroup, folder: &str) -> Option<&Path> {
        self.group(group)
            .iter()
            .filter_map(|path| path.parent())
            .find(|parent| parent.file_name().is_some_and(|name| name == folder))
    }

    /// First declared file of `group` named `name`.
    pub fn file(&self, group: &SafeGroup, name: &str) -> Option<&Path> {
        self.group(group)
            .iter()
            .find(|path| path.file_name().is_some_and(|n| n == name))
            .map(PathBuf::as_path)
    }

    /// `DATASTRIP/<d>` or `GRANULE/<g>`, the product unit folder of `group`.
    pub fn unit_dir(&self, group: &SafeGroup) -> Option<PathBuf> {
        self.group(group)
            .iter()
            .find(|path| path.components().count() > 2)
            .map(|path| path.components().take(2).collect())
    }

    /// Declared images of `group`, those stored in an `IMG_DATA` folder.
    pub fn images(&self, group: &SafeGroup) -> Vec<&Path> {
        self.group(group)
            .iter()
            .filter(|path| {
                path.parent()
                    .and_then(Path::file_name)
                    .is_some_and(|name| name == "IMG_DATA")
            })
            .map(PathBuf::as_path)
            .collect()
    }
}

/// Where a placement rule puts its source files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Fixed name at the SAFE root.
    Root(&'static str),
    /// The declared file with this name, or a file of that name in the unit folder.
    UnitFile(SafeGroup, &'static str),
    /// A declared folder. Files keep their name, less the `strip` fragment, and are placed
    /// only when the manifest declares the result.
    Folder {
        group: SafeGroup,
        folder: &'static str,
        strip: Option<&'static str>,
    },
    /// Auxiliary file of the unit, beside its declared folders in `AUX_DATA`.
    Auxiliary(SafeGroup, &'static str),
    /// Declared `IMG_DATA` images, each read from `<source>/<band>` where `<band>` is the
    /// trailing `_`-separated part of the image name.
    BandImages(SafeGroup),
}

/// One row of a placement table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementRule {
    /// Glob pattern relative to the flat download, a folder for [`Destination::BandImages`].
    pub source: &'static str,
    pub destination: Destination,
    pub required: bool,
}

pub const AWS_L1C_LAYOUT_VERSION: u32 = 1;

/// Placement of the flat `products/` and `tiles/` downloads of an L1C product.
pub const AWS_L1C_LAYOUT: &[PlacementRule] = &[
    PlacementRule {
        source: "products/metadata.xml",
        destination: Destination::Root("MTD_MSIL1C.xml"),
        required: true,
    },
    PlacementRule {
        source: "products/inspire.xml",
        destination: Destination::Root("INSPIRE.xml"),
        required: false,
    },
    PlacementRule {
        source: "products/datastrip/*/metadata.xml",
        destination: Destination::UnitFile(SafeGroup::Datastrip, "MTD_DS.xml"),
        required: true,
    },
    PlacementRule {
        source: "products/datastrip/*/qi/*_report.xml",
        destination: Destination::Folder {
            group: SafeGroup::Datastrip,
            folder: "QI_DATA",
            strip: Some("_report"),
        },
        required: false,
    },
    PlacementRule {
        source: "tiles/qi/*.gml",
        destination: Destination::Folder {
            group: SafeGroup::Granule,
            folder: "QI_DATA",
            strip: None,
        },
        required: false,
    },
    PlacementRule {
        source: "tiles/qi/*.xml",
        destination: Destination::Folder {
            group: SafeGroup::Granule,
            folder: "QI_DATA",
            strip: None,
        },
        required: false,
    },
    PlacementRule {
        source: "tiles/auxiliary/ECMWFT",
        destination: Destination::Auxiliary(SafeGroup::Granule, "AUX_ECMWFT"),
        required: false,
    },
    PlacementRule {
        source: "tiles",
        destination: Destination::BandImages(SafeGroup::Granule),
        required: true,
    },
    PlacementRule {
        source: "tiles/metadata.xml",
        destination: Destination::UnitFile(SafeGroup::Granule, "MTD_TL.xml"),
        required: true,
    },
];
