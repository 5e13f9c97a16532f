//! Cloud API request and response bodies.

use serde::{Deserialize, Serialize};

pub const MESSAGING_PRODUCT: &str = "whatsapp";

#[derive(Debug, Serialize)]
pub struct MessageRequest<'a> {
    pub messaging_product: &'static str,
    pub to: &'a str,
    #[serde(flatten)]
    pub body: MessageBody<'a>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageBody<'a> {
    Template { template: TemplatePayload<'a> },
    Document { document: DocumentPayload<'a> },
}

#[derive(Debug, Serialize)]
pub struct TemplatePayload<'a> {
    pub name: &'a str,
    pub language: LanguagePayload<'a>,
}

#[derive(Debug, Serialize)]
pub struct LanguagePayload<'a> {
    pub code: &'a str,
}

#[derive(Debug, Serialize)]
pub struct DocumentPayload<'a> {
    pub id: &'a str,
    pub filename: &'a str,
    pub caption: &'a str,
}

impl<'a> MessageRequest<'a> {
    pub fn template(to: &'a str, name: &'a str, language: &'a str) -> Self {
        Self {
            messaging_product: MESSAGING_PRODUCT,
            to,
            body: MessageBody::Template {
                template: TemplatePayload {
                    name,
                    language: LanguagePayload { code: language },
                },
            },
        }
    }

    pub fn document(to: &'a str, media_id: &'a str, filename: &'a str, caption: &'a str) -> Self {
        Self {
            messaging_product: MESSAGING_PRODUCT,
            to,
            body: MessageBody::Document {
                document: DocumentPayload {
                    id: media_id,
                    filename,
                    caption,
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MediaResponse {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
pub struct MessageRef {
    pub id: Option<String>,
}

/// Media id from an upload response body, if the body carries a usable one.
pub fn media_id(body: &str) -> Option<String> {
    serde_json::from_str::<MediaResponse>(body)
        .ok()?
        .id
        .filter(|id| !id.is_empty())
}

/// Id of the first message in a send response body.
pub fn message_id(body: &str) -> Option<String> {
    serde_json::from_str::<MessagesResponse>(body)
        .ok()?
        .messages
        .into_iter()
        .next()?
        .id
        .filter(|id| !id.is_empty())
}
