use serde::{Deserialize, Serialize};

use crate::expenses::dto::SplitInput;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TemplateRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(flatten)]
    pub split: SplitInput,
}
