use pricepulse_contracts::errors::PipelineError;
use pricepulse_contracts::extract::{excerpt, extract_json_object};
use pricepulse_contracts::models::Capability;
use pricepulse_contracts::products::{Identity, InputKind, ProductInput};
use serde_json::{json, Map, Value};

use crate::pipeline::{event_payload, PricePipeline};
use crate::provider::{ContentPart, ContentRequest};
use crate::{META_INPUT_KIND, META_STAGE, META_SUBJECT};

const IDENTITY_JSON_CONTRACT: &str = "Reply ONLY with a single JSON object containing: \
\"name\" (string), \"brand\" (string) and \"imageUrl\" (string, a direct and valid URL of \
the product image; if no image is found, use an empty string \"\").";

pub fn identity_capability(kind: InputKind) -> Capability {
    match kind {
        InputKind::Url | InputKind::Text => Capability::Identify,
        InputKind::Image => Capability::IdentifyImage,
    }
}

pub fn identity_instruction(input: &ProductInput) -> String {
    match input.kind {
        InputKind::Url => format!(
            "Using search, analyze the content of this product URL and extract its details. \
             {IDENTITY_JSON_CONTRACT} URL: {}",
            input.value.trim()
        ),
        InputKind::Text => format!(
            "Using search, identify the product from this description and find its details. \
             {IDENTITY_JSON_CONTRACT} Description: \"{}\"",
            input.value.trim()
        ),
        InputKind::Image => format!(
            "Using search, identify the product in this image and find its details. \
             {IDENTITY_JSON_CONTRACT}"
        ),
    }
}

/// Builds the identification request: one text part for URL and TEXT
/// inputs, the inline image followed by the instruction for IMAGE inputs.
pub fn build_identity_request(
    input: &ProductInput,
    model: &str,
) -> Result<ContentRequest, PipelineError> {
    let instruction = identity_instruction(input);
    let mut metadata = Map::new();
    metadata.insert(META_STAGE.to_string(), json!("identity"));
    metadata.insert(META_INPUT_KIND.to_string(), json!(input.kind.as_str()));

    let parts = match input.kind {
        InputKind::Url | InputKind::Text => {
            metadata.insert(META_SUBJECT.to_string(), json!(input.value.trim()));
            vec![ContentPart::Text(instruction)]
        }
        InputKind::Image => {
            let payload = input.image_payload()?;
            vec![
                ContentPart::InlineData {
                    mime_type: payload.mime_type.to_string(),
                    data: payload.data.to_string(),
                },
                ContentPart::Text(instruction),
            ]
        }
    };

    Ok(ContentRequest {
        model: model.to_string(),
        parts,
        web_search: true,
        metadata,
    })
}

/// Decodes an identification reply; `None` when no JSON object is present.
pub fn identity_from_reply(text: &str) -> Option<Identity> {
    let object = extract_json_object(text)?;
    let field = |key: &str| {
        object
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default()
            .to_string()
    };
    Some(Identity {
        name: field("name"),
        brand: field("brand"),
        image_url: field("imageUrl"),
    })
}

impl PricePipeline {
    /// Identifies the product behind `input`. `Ok(None)` is the soft
    /// "could not identify" outcome; callers ask the user for other input.
    pub fn resolve_identity(
        &self,
        input: &ProductInput,
    ) -> Result<Option<Identity>, PipelineError> {
        let capability = identity_capability(input.kind);
        let request = build_identity_request(input, self.model_name(capability))?;
        self.events().record(
            "identity_request",
            event_payload(json!({
                "kind": input.kind.as_str(),
                "model": request.model,
            })),
        );

        let response = self.call(capability, &request)?;
        let text = response.text.trim();
        match identity_from_reply(text) {
            Some(identity) => {
                self.events().record(
                    "identity_resolved",
                    event_payload(json!({
                        "name": identity.name,
                        "brand": identity.brand,
                        "has_image": !identity.image_url.is_empty(),
                    })),
                );
                Ok(Some(identity))
            }
            None => {
                self.events().record(
                    "identity_unresolved",
                    event_payload(json!({ "reply_excerpt": excerpt(text, 240) })),
                );
                Ok(None)
            }
        }
    }
}
