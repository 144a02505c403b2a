use serde::{Deserialize, Serialize};

/* Graph API page feed */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiFeedPage {
    #[serde(default)]
    pub data: Vec<ApiPost>,
    #[serde(default)]
    pub paging: Option<ApiPaging>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiPost {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub created_time: Option<String>, // "2025-09-30T21:58:12+0000"
    #[serde(default)]
    pub likes: Option<ApiLikes>,
}

impl ApiPost {
    pub fn like_count(&self) -> u64 {
        self.likes
            .as_ref()
            .and_then(|l| l.summary.as_ref())
            .map(|s| s.total_count)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiLikes {
    #[serde(default)]
    pub summary: Option<ApiLikesSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiLikesSummary {
    #[serde(default)]
    pub total_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiPaging {
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorEnvelope {
    pub error: serde_json::Value,
}

/* Text analytics v3.0 sentiment */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextDocument {
    pub id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SentimentRequest<'a> {
    pub documents: &'a [TextDocument],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentResponse {
    #[serde(default)]
    pub documents: Vec<DocumentSentiment>,
    #[serde(default)]
    pub errors: Vec<DocumentError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSentiment {
    pub id: String,
    pub sentiment: String, // positive | neutral | negative | mixed
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentError {
    pub id: String,
    #[serde(default)]
    pub error: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_page_tolerates_missing_fields() {
        let body = r#"{
            "data": [
                {"id": "1_2", "message": "Hola", "created_time": "2025-09-30T21:58:12+0000",
                 "likes": {"data": [], "summary": {"total_count": 7, "can_like": true}}},
                {"id": "1_3", "created_time": "2025-09-30T20:00:00+0000"}
            ],
            "paging": {"cursors": {"before": "a", "after": "b"}}
        }"#;
        let page: ApiFeedPage = serde_json::from_str(body).unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.data[0].like_count(), 7);
        assert_eq!(page.data[1].message, None);
        assert_eq!(page.data[1].like_count(), 0);
        assert!(page.paging.unwrap().next.is_none());
    }

    #[test]
    fn request_omits_unset_language() {
        let docs = vec![TextDocument { id: "0".into(), text: "hola".into(), language: None }];
        let v = serde_json::to_value(SentimentRequest { documents: &docs }).unwrap();
        assert_eq!(v, serde_json::json!({"documents": [{"id": "0", "text": "hola"}]}));
    }
}
