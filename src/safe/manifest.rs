use crate::error::SafeConversionError;
use roxmltree::Node;
use std::fs;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILENAME: &str = "manifest.safe";

/// The `manifest.safe` of a SAFE product, kept as text until parsed.
pub struct Manifest {
    pub path: PathBuf,
    content: String,
}

impl Manifest {
    pub fn read(path: &Path) -> Result<Self, SafeConversionError> {
        if !path.is_file() {
            return Err(SafeConversionError::MissingManifest(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(|source| SafeConversionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            content,
        })
    }

    pub fn from_content(path: &Path, content: String) -> Self {
        Self {
            path: path.to_path_buf(),
            content,
        }
    }

    pub fn parse(&self) -> Result<Vec<DataObject>, SafeConversionError> {
        let mut data_objects: Vec<DataObject> = vec![];
        let doc = roxmltree::Document::parse(&self.content).map_err(|e| self.invalid(e.to_string()))?;

        let data_object_section = doc
            .descendants()
            .find(|n| n.has_tag_name("dataObjectSection"))
            .ok_or_else(|| self.invalid("unable to locate 'dataObjectSection' tag".to_string()))?;

        for data_object in data_object_section
            .children()
            .filter(|n| n.has_tag_name("dataObject"))
        {
            let d = DataObject::new(data_object).ok_or_else(|| {
                self.invalid(format!(
                    "dataObject {} has no fileLocation href",
                    data_object.attribute("ID").unwrap_or("without ID")
                ))
            })?;
            data_objects.push(d);
        }
        Ok(data_objects)
    }

    fn invalid(&self, reason: String) -> SafeConversionError {
        SafeConversionError::InvalidManifest {
            path: self.path.clone(),
            reason,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct DataObject {
    pub id: String,
    pub relative_href: String,
    pub filesize: Option<u64>,
    pub checksum_algorithm: Option<String>,
    pub checksum: Option<String>,
}

impl DataObject {
    fn new(data_object: Node) -> Option<Self> {
        let id = Self::extract_id(data_object)?;
        let relative_href = Self::extract_relative_href(data_object)?;

        Some(Self {
            id,
            relative_href,
            filesize: Self::extract_filesize(data_object),
            checksum_algorithm: Self::extract_checksum_algorithm(data_object),
            checksum: Self::extract_checksum(data_object),
        })
    }

    fn extract_id(data_object: Node) -> Option<String> {
        Some(data_object.attribute("ID")?.to_string())
    }

    fn extract_filesize(data_object: Node) -> Option<u64> {
        let byte_stream = data_object
            .children()
            .find(|n| n.has_tag_name("byteStream"))?;
        byte_stream.attribute("size")?.parse().ok()
    }

    fn extract_relative_href(data_object: Node) -> Option<String> {
        let file_location = data_object
            .descendants()
            .find(|n| n.has_tag_name("fileLocation"))?;
        let href = file_location.attribute("href")?;
        let relative_href = href.strip_prefix("./").unwrap_or(href);
        (!relative_href.is_empty()).then(|| relative_href.to_string())
    }

    fn extract_checksum_algorithm(data_object: Node) -> Option<String> {
        let checksum = data_object
            .descendants()
            .find(|n| n.has_tag_name("checksum"))?;
        Some(checksum.attribute("checksumName")?.to_string())
    }

    fn extract_checksum(data_object: Node) -> Option<String> {
        let checksum = data_object
            .descendants()
            .find(|n| n.has_tag_name("checksum"))?;
        Some(checksum.text()?.trim().to_string())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const GRANULE: &str = "L1C_T31TCJ_A018297_20181217T105436";
    pub(crate) const DATASTRIP: &str = "DS_MPS_20181217T112325_S20181217T105436";

    /// A trimmed L1C manifest declaring two bands.
    pub(crate) fn l1c_manifest() -> String {
        let objects = [
            ("S2_Level-1C_Product_Metadata", "./MTD_MSIL1C.xml".to_string()),
            ("INSPIRE_Metadata", "./INSPIRE.xml".to_string()),
            ("Manifest_HTML", "./HTML/UserProduct_index.html".to_string()),
            (
                "S2_Level-1C_Datastrip1_Metadata",
                format!("./DATASTRIP/{DATASTRIP}/MTD_DS.xml"),
            ),
            (
                "FORMAT_CORRECTNESS",
                format!("./DATASTRIP/{DATASTRIP}/QI_DATA/FORMAT_CORRECTNESS.xml"),
            ),
            (
                "S2_Level-1C_Tile1_Metadata",
                format!("./GRANULE/{GRANULE}/MTD_TL.xml"),
            ),
            (
                "MSK_CLOUDS_B00",
                format!("./GRANULE/{GRANULE}/QI_DATA/MSK_CLOUDS_B00.gml"),
            ),
            (
                "S2_Level-1C_Tile1_AUX_ECMWFT",
                format!("./GRANULE/{GRANULE}/AUX_DATA/AUX_ECMWFT"),
            ),
            (
                "IMG_DATA_Band_60m_1_Tile1_Data",
                format!("./GRANULE/{GRANULE}/IMG_DATA/T31TCJ_20181217T105441_B01.jp2"),
            ),
            (
                "IMG_DATA_Band_10m_1_Tile1_Data",
                format!("./GRANULE/{GRANULE}/IMG_DATA/T31TCJ_20181217T105441_B02.jp2"),
            ),
        ];
        let data_objects: String = objects
            .iter()
            .map(|(id, href)| {
                format!(
                    r#"<dataObject ID="{id}"><byteStream mimeType="application/xml" size="1024"><fileLocation locatorType="URL" href="{href}"/><checksum checksumName="MD5">0123456789abcdef</checksum></byteStream></dataObject>"#
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><xfdu:XFDU xmlns:xfdu="urn:ccsds:schema:xfdu:1"><metadataSection/><dataObjectSection>{data_objects}</dataObjectSection></xfdu:XFDU>"#
        )
    }

    #[test]
    fn test_parse() {
        let manifest = Manifest::from_content(Path::new("manifest.safe"), l1c_manifest());
        let data_objects = manifest.parse().unwrap();
        assert_eq!(data_objects.len(), 10);
        assert_eq!(
            data_objects[0],
            DataObject {
                id: "S2_Level-1C_Product_Metadata".to_string(),
                relative_href: "MTD_MSIL1C.xml".to_string(),
                filesize: Some(1024),
                checksum_algorithm: Some("MD5".to_string()),
                checksum: Some("0123456789abcdef".to_string()),
            }
        );
    }

    #[test]
    fn test_optional_fields() {
        let content = r#"<XFDU><dataObjectSection><dataObject ID="a"><byteStream><fileLocation href="./rep_info/S2_PDI.xsd"/></byteStream></dataObject></dataObjectSection></XFDU>"#;
        let manifest = Manifest::from_content(Path::new("manifest.safe"), content.to_string());
        let data_objects = manifest.parse().unwrap();
        assert_eq!(data_objects[0].relative_href, "rep_info/S2_PDI.xsd");
        assert_eq!(data_objects[0].filesize, None);
        assert_eq!(data_objects[0].checksum, None);
    }

    #[test]
    fn test_invalid() {
        let no_section = Manifest::from_content(Path::new("manifest.safe"), "<XFDU/>".to_string());
        assert!(matches!(
            no_section.parse(),
            Err(SafeConversionError::InvalidManifest { .. })
        ));

        let no_href = r#"<XFDU><dataObjectSection><dataObject ID="a"><byteStream/></dataObject></dataObjectSection></XFDU>"#;
        let manifest = Manifest::from_content(Path::new("manifest.safe"), no_href.to_string());
        assert!(manifest.parse().is_err());

        let missing = Manifest::read(Path::new("/nonexistent/manifest.safe"));
        assert!(matches!(missing, Err(SafeConversionError::MissingManifest(_))));
    }
}
