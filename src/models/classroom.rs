// Google Classroom API envelopes
//
// Course and CourseWork records are passed through untouched, so only the
// list wrappers and the error envelope are typed.

use serde::Deserialize;
use serde_json::Value;

/// `courses.list` response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCoursesResponse {
    #[serde(default)]
    pub courses: Vec<Value>,
}

/// `courses.courseWork.list` response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCourseWorkResponse {
    #[serde(default)]
    pub course_work: Vec<Value>,
}

/// Google API error body: `{"error": {"code", "message", "status", "errors"}}`
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleErrorEnvelope {
    pub error: GoogleError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleError {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub errors: Vec<GoogleErrorDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleErrorDetail {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl GoogleError {
    /// Human-readable reason: top-level message, else the first detail reason
    pub fn reason(&self) -> Option<String> {
        self.message
            .clone()
            .filter(|m| !m.is_empty())
            .or_else(|| self.errors.iter().find_map(|e| e.reason.clone()))
            .or_else(|| self.errors.iter().find_map(|e| e.message.clone()))
            .or_else(|| self.status.clone())
    }
}
