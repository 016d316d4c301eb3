use serde::{Deserialize, Serialize};

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_FAIL: &str = "fail";

/// Analysis request as received at the process boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub conversation_id: String,
    pub user_no: String,
    /// Raw transcript text.
    pub conversation: String,
    pub message_num: String,
}

/// Analysis response. Success and failure are distinguished only by the
/// `message` field plus empty-string sentinels; the wire shape is always
/// well-formed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub conversation_id: String,
    pub user_no: String,
    /// Category path, levels joined by `-`; empty on failure.
    pub category: String,
    /// Free-text summary; empty on failure.
    pub summary: String,
    pub message: String,
}

impl AnalyzeResponse {
    pub fn success(request: &AnalyzeRequest, category: String, summary: String) -> Self {
        Self {
            conversation_id: request.conversation_id.clone(),
            user_no: request.user_no.clone(),
            category,
            summary,
            message: STATUS_SUCCESS.to_string(),
        }
    }

    pub fn failure(request: &AnalyzeRequest) -> Self {
        Self {
            conversation_id: request.conversation_id.clone(),
            user_no: request.user_no.clone(),
            category: String::new(),
            summary: String::new(),
            message: STATUS_FAIL.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_camel_case_field_names() {
        let json = r#"{
            "conversationId": "c-1",
            "userNo": "u-9",
            "conversation": "客户：在吗",
            "messageNum": "1"
        }"#;
        let request: AnalyzeRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.conversation_id, "c-1");
        assert_eq!(request.user_no, "u-9");
    }

    #[test]
    fn test_failure_response_has_empty_sentinels() {
        let request = AnalyzeRequest {
            conversation_id: "c-1".to_string(),
            user_no: "u-9".to_string(),
            conversation: String::new(),
            message_num: "0".to_string(),
        };
        let response = AnalyzeResponse::failure(&request);

        assert_eq!(response.category, "");
        assert_eq!(response.summary, "");
        assert_eq!(response.message, STATUS_FAIL);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["conversationId"], "c-1");
        assert_eq!(json["userNo"], "u-9");
    }
}
