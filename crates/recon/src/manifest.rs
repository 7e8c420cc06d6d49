use serde::Serialize;

use crate::preview::PreviewSize;
use crate::suggest::{MEDIA_TYPE_ID, MEDIA_TYPE_NAME};

pub const PROTOCOL_VERSIONS: &[&str] = &["0.2"];
pub const SERVICE_NAME: &str = "Wikimedia Commons";
pub const IDENTIFIER_SPACE: &str = "https://commons.wikimedia.org/entity/";
pub const SCHEMA_SPACE: &str = "http://www.wikidata.org/prop/direct/";
pub const VIEW_URL: &str = "https://commons.wikimedia.org/entity/{{id}}";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub versions: Vec<String>,
    pub name: String,
    pub identifier_space: String,
    pub schema_space: String,
    pub view: View,
    pub default_types: Vec<TypeEntry>,
    pub preview: PreviewService,
    pub extend: ExtendService,
    pub suggest: SuggestServices,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct View {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeEntry {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewService {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceEndpoint {
    pub service_url: String,
    pub service_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtendService {
    pub propose_properties: ServiceEndpoint,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestServices {
    pub property: ServiceEndpoint,
    pub entity: ServiceEndpoint,
}

/// Manifest for the service mounted at `{service_url}/{lang}/api`.
pub fn build_manifest(service_url: &str, lang: &str, preview: PreviewSize) -> Manifest {
    let base = format!("{}/{lang}/api", service_url.trim_end_matches('/'));
    let endpoint = |path: &str| ServiceEndpoint { service_url: base.clone(), service_path: path.to_string() };

    Manifest {
        versions: PROTOCOL_VERSIONS.iter().map(|v| v.to_string()).collect(),
        name: SERVICE_NAME.to_string(),
        identifier_space: IDENTIFIER_SPACE.to_string(),
        schema_space: SCHEMA_SPACE.to_string(),
        view: View { url: VIEW_URL.to_string() },
        default_types: vec![TypeEntry { id: MEDIA_TYPE_ID.to_string(), name: MEDIA_TYPE_NAME.to_string() }],
        preview: PreviewService {
            url: format!("{base}/preview?id={{{{id}}}}"),
            width: preview.width,
            height: preview.height,
        },
        extend: ExtendService { propose_properties: endpoint("/propose_properties") },
        suggest: SuggestServices {
            property: endpoint("/suggest/properties"),
            entity: endpoint("/suggest/entity"),
        },
    }
}
