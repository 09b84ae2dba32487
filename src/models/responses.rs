// Gateway response payloads

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `GET /home` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoursesResponse {
    pub message: String,
    pub courses: Vec<Value>,
}

/// `GET /assignments` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentsResponse {
    pub message: String,
    pub assignments_by_course: Vec<AssignmentGroup>,
}

/// Assignments for a single course, or the reason they could not be fetched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentGroup {
    pub course_id: Option<String>,
    pub course_name: String,
    pub assignments: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
