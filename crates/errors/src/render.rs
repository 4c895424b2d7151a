use serde::Serialize;

use crate::model::ErrorObj;

/// What a caller is allowed to see: the code and the user message.
#[derive(Debug, Serialize)]
pub struct PublicErrorView {
    pub code: &'static str,
    pub message: String,
}

impl ErrorObj {
    pub fn to_public(&self) -> PublicErrorView {
        PublicErrorView {
            code: self.code.as_str(),
            message: self.message_user.clone(),
        }
    }
}
