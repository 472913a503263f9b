use utoipa::{OpenApi, ToSchema};

#[allow(dead_code)]
#[derive(ToSchema)]
pub struct HealthOk {
    pub ok: bool,
}

#[allow(dead_code)]
#[derive(ToSchema)]
pub struct HttpInfo {
    pub bind: String,
    pub port: u16,
}

#[allow(dead_code)]
#[derive(ToSchema)]
pub struct GenerationInfo {
    #[schema(example = "gemini")]
    pub backend: String,
    #[schema(example = "standard")]
    pub instruction: String,
}

#[allow(dead_code)]
#[derive(ToSchema)]
pub struct AboutCounts {
    pub total: usize,
}

#[allow(dead_code)]
#[derive(ToSchema)]
pub struct AboutResponse {
    pub service: String,
    pub version: String,
    pub http: HttpInfo,
    pub generation: GenerationInfo,
    pub counts: AboutCounts,
    #[schema(example = json!(["GET /", "POST /ai/get-review"]))]
    pub endpoints: Vec<String>,
    #[schema(value_type = Vec<serde_json::Value>)]
    pub endpoints_meta: Vec<serde_json::Value>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::meta::root,
        crate::api::meta::healthz,
        crate::api::meta::about,
        crate::api::review::get_review,
    ),
    components(
        schemas(
            HealthOk,
            HttpInfo,
            GenerationInfo,
            AboutCounts,
            AboutResponse,
            crate::api::review::ReviewRequest,
            crate::api::review::ReviewResponse,
            crate::responses::ErrorBody,
        )
    ),
    tags(
        (name = "Meta", description = "Service metadata and health"),
        (name = "Review", description = "Code review generation")
    )
)]
pub struct ApiDoc;
