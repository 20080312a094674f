use serde_json::{Value, json};

/// Name of the only supported action
pub const GENERATE_IMAGE: &str = "generate_image";

/// Description of the tools this adapter exposes
pub fn tool_schema() -> Value {
    json!({
        GENERATE_IMAGE: {
            "description": "Generate an image based on a text prompt",
            "parameters": {
                "prompt": "Text description of the image to generate"
            }
        }
    })
}
