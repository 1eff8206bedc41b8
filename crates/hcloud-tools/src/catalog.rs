//! Read-only reference data: server types, images and locations.

use std::sync::Arc;

use async_trait::async_trait;
use hcloud_api::{HcloudClient, Image};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;
use crate::format::{format_images, format_locations, format_server_types, json_list};
use crate::tool::{ResponseFormat, Tool, ToolAnnotations, parse_args, schema_for};

pub fn tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(ListServerTypes),
        Arc::new(ListImages),
        Arc::new(ListLocations),
    ]
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FormatOnlyInput {
    #[serde(default)]
    pub response_format: ResponseFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    #[default]
    System,
    Snapshot,
    Backup,
    App,
}

impl ImageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Snapshot => "snapshot",
            Self::Backup => "backup",
            Self::App => "app",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    X86,
    Arm,
}

impl Architecture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::Arm => "arm",
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ListImagesInput {
    /// Image type to list. Defaults to `system` (official OS images).
    #[serde(default, rename = "type")]
    pub image_type: ImageType,
    /// Only list images for this CPU architecture.
    #[serde(default)]
    pub architecture: Option<Architecture>,
    #[serde(default)]
    pub response_format: ResponseFormat,
}

/// Keep only available images of the requested type.
pub fn filter_images(images: Vec<Image>, image_type: ImageType) -> Vec<Image> {
    images
        .into_iter()
        .filter(|i| i.is_available() && i.image_type == image_type.as_str())
        .collect()
}

pub struct ListServerTypes;

#[async_trait]
impl Tool for ListServerTypes {
    fn name(&self) -> &'static str {
        "hetzner_list_server_types"
    }

    fn title(&self) -> &'static str {
        "List Server Types"
    }

    fn description(&self) -> &'static str {
        "List available server types with vCPUs, memory, disk and hourly/monthly prices per \
         location. Use the type name (e.g. cx22) when creating a server."
    }

    fn annotations(&self) -> ToolAnnotations {
        ToolAnnotations::READ_ONLY
    }

    fn input_schema(&self) -> Value {
        schema_for::<FormatOnlyInput>()
    }

    async fn call(&self, client: &HcloudClient, args: Value) -> Result<String> {
        let input: FormatOnlyInput = parse_args(args)?;
        let types = client.list_server_types().await?;

        Ok(match input.response_format {
            ResponseFormat::Markdown => format_server_types(&types),
            ResponseFormat::Json => json_list("server_types", &types)?,
        })
    }
}

pub struct ListImages;

#[async_trait]
impl Tool for ListImages {
    fn name(&self) -> &'static str {
        "hetzner_list_images"
    }

    fn title(&self) -> &'static str {
        "List Images"
    }

    fn description(&self) -> &'static str {
        "List available OS images. Defaults to official system images; set type to list \
         snapshots, backups or app images instead."
    }

    fn annotations(&self) -> ToolAnnotations {
        ToolAnnotations::READ_ONLY
    }

    fn input_schema(&self) -> Value {
        schema_for::<ListImagesInput>()
    }

    async fn call(&self, client: &HcloudClient, args: Value) -> Result<String> {
        let input: ListImagesInput = parse_args(args)?;
        let images = client
            .list_images(
                Some(input.image_type.as_str()),
                input.architecture.as_ref().map(Architecture::as_str),
            )
            .await?;
        let images = filter_images(images, input.image_type);

        Ok(match input.response_format {
            ResponseFormat::Markdown => format_images(&images),
            ResponseFormat::Json => json_list("images", &images)?,
        })
    }
}

pub struct ListLocations;

#[async_trait]
impl Tool for ListLocations {
    fn name(&self) -> &'static str {
        "hetzner_list_locations"
    }

    fn title(&self) -> &'static str {
        "List Locations"
    }

    fn description(&self) -> &'static str {
        "List datacenter locations with city, country and network zone."
    }

    fn annotations(&self) -> ToolAnnotations {
        ToolAnnotations::READ_ONLY
    }

    fn input_schema(&self) -> Value {
        schema_for::<FormatOnlyInput>()
    }

    async fn call(&self, client: &HcloudClient, args: Value) -> Result<String> {
        let input: FormatOnlyInput = parse_args(args)?;
        let locations = client.list_locations().await?;

        Ok(match input.response_format {
            ResponseFormat::Markdown => format_locations(&locations),
            ResponseFormat::Json => json_list("locations", &locations)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToolRegistry;
    use crate::format::fixtures::{image_json, location_json};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn registry(server: &MockServer) -> ToolRegistry {
        let client = HcloudClient::new("test-token")
            .unwrap()
            .with_base_url(server.uri());
        ToolRegistry::new(Arc::new(client))
    }

    #[test]
    fn default_filter_keeps_available_system_images() {
        let images: Vec<Image> = serde_json::from_value(json!([
            image_json(1, "system", "available"),
            image_json(2, "system", "creating"),
            image_json(3, "snapshot", "available"),
            image_json(4, "system", "unavailable"),
        ]))
        .unwrap();

        let kept = filter_images(images, ImageType::default());
        let ids: Vec<i64> = kept.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[tokio::test]
    async fn list_images_defaults_to_system() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/images"))
            .and(query_param("type", "system"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "images": [
                    image_json(10, "system", "available"),
                    image_json(11, "system", "creating")
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let out = registry(&server)
            .call("hetzner_list_images", json!({"response_format": "json"}))
            .await
            .unwrap();

        let parsed: Value = serde_json::from_str(&out.text).unwrap();
        assert_eq!(parsed["total"], 1);
        assert_eq!(parsed["images"][0]["id"], 10);
        assert_eq!(parsed["images"][0]["type"], "system");
    }

    #[tokio::test]
    async fn list_images_rejects_unknown_type() {
        let server = MockServer::start().await;
        let result = registry(&server)
            .call("hetzner_list_images", json!({"type": "iso"}))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn locations_render_as_markdown() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/locations"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"locations": [location_json()]})),
            )
            .mount(&server)
            .await;

        let out = registry(&server)
            .call("hetzner_list_locations", json!({}))
            .await
            .unwrap();

        assert!(out.text.starts_with("# Locations (1)\n\n## fsn1 (ID: 1)"));
        assert!(out.text.contains("- **Network zone**: eu-central"));
    }

    #[tokio::test]
    async fn server_types_flag_deprecation_and_prices() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/server_types"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "server_types": [{
                    "id": 1,
                    "name": "cx11",
                    "description": "CX11",
                    "cores": 1,
                    "memory": 2.0,
                    "disk": 20,
                    "cpu_type": "shared",
                    "architecture": "x86",
                    "deprecated": true,
                    "prices": [{
                        "location": "fsn1",
                        "price_hourly": {"net": "0.0052", "gross": "0.0062"},
                        "price_monthly": {"net": "3.29", "gross": "3.9151"}
                    }]
                }]
            })))
            .mount(&server)
            .await;

        let out = registry(&server)
            .call("hetzner_list_server_types", json!({}))
            .await
            .unwrap();

        assert!(out.text.contains("## cx11 (ID: 1) [deprecated]"));
        assert!(out.text.contains("- **Price (fsn1)**: €0.01/hour, €3.92/month"));
    }
}
