//! The tool the model can call to put places on the map.

use roamer_model::{ModelTool, ToolCallRequest};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;

/// Name the model uses to call [`DisplayLocations`].
pub const DISPLAY_LOCATIONS: &str = "displayLocations";

const DESCRIPTION: &str = "\
Shows the given places on a map next to the conversation. Call it whenever \
you suggest concrete destinations, cities or landmarks.";

/// Arguments of a `displayLocations` call.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisplayLocations {
    /// Place names to show, e.g. "Paris, France".
    pub locations: Vec<String>,
    /// Map zoom level, 1 (world) to 18 (street).
    #[schemars(range(min = 1, max = 18))]
    pub zoom_level: Option<i32>,
}

impl DisplayLocations {
    /// Returns the tool definition sent to the model.
    pub fn definition() -> ModelTool {
        let mut parameters = schema_for!(DisplayLocations).to_value();
        // Providers reject the meta keys, the shape is all they need.
        if let Some(object) = parameters.as_object_mut() {
            object.remove("$schema");
            object.remove("title");
        }
        ModelTool {
            name: DISPLAY_LOCATIONS.to_owned(),
            description: DESCRIPTION.to_owned(),
            parameters,
        }
    }

    /// Extracts the arguments from a request.
    ///
    /// Returns `None` for other tools and for arguments that don't match
    /// the schema.
    pub fn from_request(req: &ToolCallRequest) -> Option<Self> {
        if req.name != DISPLAY_LOCATIONS {
            warn!("ignoring call to unknown tool: {}", req.name);
            return None;
        }
        match serde_json::from_value(req.arguments.clone()) {
            Ok(args) => Some(args),
            Err(err) => {
                warn!("ignoring malformed {DISPLAY_LOCATIONS} call: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn request(name: &str, arguments: serde_json::Value) -> ToolCallRequest {
        ToolCallRequest {
            id: "call:0".to_owned(),
            name: name.to_owned(),
            arguments,
        }
    }

    #[test]
    fn test_definition_schema() {
        let definition = DisplayLocations::definition();
        assert_eq!(definition.name, "displayLocations");

        let params = &definition.parameters;
        assert_eq!(params["type"], "object");
        assert_eq!(params["properties"]["locations"]["type"], "array");
        let zoom = &params["properties"]["zoomLevel"];
        assert_eq!(zoom["minimum"].as_f64(), Some(1.0));
        assert_eq!(zoom["maximum"].as_f64(), Some(18.0));
        assert_eq!(params["required"], json!(["locations"]));
        assert!(params.get("$schema").is_none());
    }

    #[test]
    fn test_from_request() {
        let args = DisplayLocations::from_request(&request(
            "displayLocations",
            json!({ "locations": ["Rome", "Florence"], "zoomLevel": 7 }),
        ));
        assert_eq!(
            args,
            Some(DisplayLocations {
                locations: vec!["Rome".to_owned(), "Florence".to_owned()],
                zoom_level: Some(7),
            })
        );

        let args = DisplayLocations::from_request(&request(
            "displayLocations",
            json!({ "locations": ["Rome"] }),
        ));
        assert_eq!(args.unwrap().zoom_level, None);
    }

    #[test]
    fn test_ignored_requests() {
        assert!(
            DisplayLocations::from_request(&request(
                "bookHotel",
                json!({ "locations": ["Rome"] }),
            ))
            .is_none()
        );
        assert!(
            DisplayLocations::from_request(&request(
                "displayLocations",
                json!({ "places": "Rome" }),
            ))
            .is_none()
        );
    }
}
