//! Contract of the backend that reads geodata files.
//!
//! The engine uses only [`GeodataService::get_geometry`]. The rest of the interface and the data
//! types are here so that a transport adapter can implement the whole backend in one place.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use geojson::{FeatureCollection, JsonObject};
use geoview_types::Extent;
use maybe_sync::{MaybeSend, MaybeSync};
use serde::{Deserialize, Serialize};

use crate::error::GeoviewError;
use crate::layer::Layer;
use crate::style::GeometryKind;

/// Summary of a single-layer vector source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorInfo {
    /// Source path.
    pub path: String,
    /// Number of features.
    #[serde(alias = "feature_count")]
    pub feature_count: usize,
    /// Geometry type name as reported by the backend, e.g. `"Multi Polygon"`.
    #[serde(alias = "geometry_type")]
    pub geometry_type: String,
    /// Attribute fields.
    #[serde(default)]
    pub fields: Vec<FieldInfo>,
    /// Extent in the source projection.
    pub extent: Extent,
    /// Projection code of the source.
    #[serde(default)]
    pub projection: Option<String>,
}

impl VectorInfo {
    /// Geometry kind guessed from the reported type name.
    pub fn geometry_kind(&self) -> Option<GeometryKind> {
        GeometryKind::from_type_name(&self.geometry_type)
    }

    /// Creates a vector layer for the source. Geometry is loaded on the first sync.
    pub fn to_layer(&self, id: impl Into<String>, name: impl Into<String>) -> Layer {
        let mut layer = Layer::vector(id, name, self.path.clone()).with_extent(self.extent);
        layer.source.projection = self.projection.clone();
        layer
    }
}

/// Attribute field of a vector source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldInfo {
    /// Field name.
    pub name: String,
    /// Field type name.
    #[serde(alias = "field_type", alias = "type")]
    pub field_type: String,
    /// Field width.
    #[serde(default)]
    pub width: Option<u32>,
    /// Field precision.
    #[serde(default)]
    pub precision: Option<u32>,
}

/// Page of an attribute table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeTable {
    /// Rows of the page.
    pub features: Vec<AttributeRow>,
    /// Total number of rows in the table.
    pub total: usize,
}

/// Row of an attribute table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeRow {
    /// Feature id.
    #[serde(default)]
    pub id: String,
    /// Attribute values.
    #[serde(default)]
    pub properties: JsonObject,
    /// Feature geometry, if requested.
    #[serde(default)]
    pub geometry: Option<geojson::Geometry>,
}

/// Summary of a multi-layer source (KML, geodatabase etc).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiLayerInfo {
    /// Number of layers.
    #[serde(alias = "layer_count")]
    pub layer_count: usize,
    /// Projection code of the source.
    #[serde(default)]
    pub projection: Option<String>,
    /// Layers of the source.
    pub layers: Vec<SubLayerInfo>,
}

/// Layer of a multi-layer source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubLayerInfo {
    /// Index of the layer in the source.
    pub index: u32,
    /// Layer name.
    pub name: String,
    /// Geometry type name.
    #[serde(alias = "geometry_type")]
    pub geometry_type: String,
    /// Number of features.
    #[serde(alias = "feature_count")]
    pub feature_count: usize,
    /// Extent in the source projection.
    #[serde(default)]
    pub extent: Option<Extent>,
    /// Feature dataset the layer belongs to, for geodatabases.
    #[serde(default, alias = "feature_dataset")]
    pub feature_dataset: Option<String>,
}

impl MultiLayerInfo {
    /// Builds a group layer for the source.
    ///
    /// Every sub-layer becomes a hidden vector layer with deferred loading, so that nothing is read
    /// until the user turns a layer on. Sub-layers of a feature dataset are grouped under a nested
    /// group named after the dataset. Layer ids are `{id}:{index}` and `{id}:{dataset}`.
    pub fn to_group(&self, id: &str, name: impl Into<String>, path: &str) -> Layer {
        let mut children: Vec<Layer> = vec![];
        for sub_layer in &self.layers {
            let mut layer = Layer::vector(
                format!("{id}:{}", sub_layer.index),
                sub_layer.name.clone(),
                path,
            )
            .with_sub_layer(sub_layer.index)
            .with_visible(false)
            .with_deferred_load(true);
            layer.extent = sub_layer.extent;
            layer.source.projection = self.projection.clone();

            let Some(dataset) = &sub_layer.feature_dataset else {
                children.push(layer);
                continue;
            };

            let group_id = format!("{id}:{dataset}");
            match children.iter_mut().find(|child| child.id == group_id) {
                Some(group) => group.children.push(layer),
                None => children.push(Layer::group(group_id, dataset.clone(), vec![layer])),
            }
        }

        Layer::group(id, name, children)
    }
}

/// Output format of [`GeodataService::export_vector`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExportFormat {
    /// KML.
    Kml,
    /// Zipped KML.
    Kmz,
    /// GeoJSON.
    GeoJson,
    /// ESRI shapefile.
    Shapefile,
    /// OGC GeoPackage.
    #[serde(rename = "GPKG")]
    GeoPackage,
}

impl ExportFormat {
    /// Name of the format driver used by the backend.
    pub fn driver_name(&self) -> &'static str {
        match self {
            Self::Kml => "KML",
            Self::Kmz => "LIBKML",
            Self::GeoJson => "GeoJSON",
            Self::Shapefile => "ESRI Shapefile",
            Self::GeoPackage => "GPKG",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = GeoviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "KML" => Ok(Self::Kml),
            "KMZ" => Ok(Self::Kmz),
            "GEOJSON" => Ok(Self::GeoJson),
            "SHAPEFILE" | "SHP" => Ok(Self::Shapefile),
            "GPKG" => Ok(Self::GeoPackage),
            _ => Err(GeoviewError::Generic(format!("unsupported export format {s}"))),
        }
    }
}

impl Display for ExportFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.driver_name())
    }
}

/// Backend that opens vector sources and reads their geometry and attributes.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait GeodataService: MaybeSend + MaybeSync {
    /// Reads the summary of a vector source.
    async fn open_vector(&self, path: &str) -> Result<VectorInfo, GeoviewError>;

    /// Reads all features of a source, or of one of its sub-layers.
    async fn get_geometry(
        &self,
        path: &str,
        sub_layer: Option<u32>,
    ) -> Result<FeatureCollection, GeoviewError>;

    /// Reads a page of the attribute table.
    async fn get_attribute_table(
        &self,
        path: &str,
        sub_layer: Option<u32>,
        offset: usize,
        limit: usize,
    ) -> Result<AttributeTable, GeoviewError>;

    /// Reads the summary of a multi-layer source.
    async fn open_multi_layer_vector(&self, path: &str) -> Result<MultiLayerInfo, GeoviewError>;

    /// Converts a source into another format.
    async fn export_vector(
        &self,
        input: &str,
        output: &str,
        format: ExportFormat,
        sub_layer: Option<u32>,
    ) -> Result<(), GeoviewError>;
}


#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::mock::MockGeodataService;
    use super::*;
    use crate::layer::LayerKind;

    #[test]
    fn decodes_backend_payloads() {
        let info: VectorInfo = serde_json::from_str(
            r#"{
                "path": "/data/rivers.shp",
                "feature_count": 12,
                "geometry_type": "Multi Line String",
                "fields": [{"name": "name", "type": "String", "width": 80, "precision": 0}],
                "extent": {"min_x": 73.5, "min_y": 18.1, "max_x": 135.1, "max_y": 53.6},
                "projection": "EPSG:4490"
            }"#,
        )
        .unwrap();

        assert_eq!(info.feature_count, 12);
        assert_eq!(info.geometry_kind(), Some(GeometryKind::Line));
        assert_eq!(info.fields[0].field_type, "String");

        let layer = info.to_layer("rivers", "Rivers");
        assert_eq!(layer.source.path.as_deref(), Some("/data/rivers.shp"));
        assert_eq!(layer.projection("EPSG:4326"), "EPSG:4490");
        assert_eq!(layer.extent, Some(info.extent));
    }

    #[test]
    fn multi_layer_source_becomes_group() {
        let info: MultiLayerInfo = serde_json::from_str(
            r#"{
                "layer_count": 3,
                "projection": "EPSG:4490",
                "layers": [
                    {"index": 0, "name": "roads", "geometry_type": "Line String", "feature_count": 5},
                    {"index": 1, "name": "parcels", "geometry_type": "Polygon", "feature_count": 7,
                     "feature_dataset": "cadastre"},
                    {"index": 2, "name": "buildings", "geometry_type": "Polygon", "feature_count": 2,
                     "feature_dataset": "cadastre"}
                ]
            }"#,
        )
        .unwrap();

        let group = info.to_group("gdb", "City", "/data/city.gdb");
        assert_eq!(group.kind, LayerKind::Group);
        assert_eq!(group.children.len(), 2);

        let roads = &group.children[0];
        assert_eq!(roads.id, "gdb:0");
        assert_eq!(roads.source.sub_layer, Some(0));
        assert!(roads.deferred_load);
        assert!(!roads.visible);

        let dataset = &group.children[1];
        assert!(dataset.is_group());
        assert_eq!(dataset.id, "gdb:cadastre");
        let ids: Vec<_> = dataset.children.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["gdb:1", "gdb:2"]);
    }

    #[test]
    fn export_formats() {
        assert_eq!("shp".parse::<ExportFormat>().unwrap(), ExportFormat::Shapefile);
        assert_eq!("GeoJSON".parse::<ExportFormat>().unwrap(), ExportFormat::GeoJson);
        assert_eq!(ExportFormat::Kmz.driver_name(), "LIBKML");
        assert_matches!("dxf".parse::<ExportFormat>(), Err(GeoviewError::Generic(_)));
        assert_eq!(
            serde_json::to_string(&ExportFormat::GeoPackage).unwrap(),
            r#""GPKG""#
        );
    }

    #[test]
    fn mock_records_geometry_requests() {
        let service = MockGeodataService::new().with_geometry(
            "/a.geojson",
            FeatureCollection {
                bbox: None,
                features: vec![],
                foreign_members: None,
            },
        );

        tokio_test::block_on(async {
            service.get_geometry("/a.geojson", Some(1)).await.unwrap();
            service.set_failing("/a.geojson", true);
            assert_matches!(
                service.get_geometry("/a.geojson", None).await,
                Err(GeoviewError::Fetch { .. })
            );
        });

        assert_eq!(
            service.calls(),
            vec![("/a.geojson".to_string(), Some(1)), ("/a.geojson".to_string(), None)]
        );
        assert_eq!(service.call_count("/a.geojson"), 2);
    }
}
