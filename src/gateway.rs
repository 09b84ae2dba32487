// Classroom gateway
// Calls the Classroom API with a ready credential and shapes the responses

use serde_json::Value;
use std::sync::Arc;

use crate::auth::Credential;
use crate::error::Result;
use crate::http_client::{ClassroomApi, ClassroomError};
use crate::models::responses::{AssignmentGroup, AssignmentsResponse, CoursesResponse};

/// Maximum number of courses returned by `/home`
pub const HOME_COURSE_LIMIT: u32 = 10;

const UNNAMED_COURSE: &str = "Unnamed Course";

pub struct ClassroomGateway {
    api: Arc<dyn ClassroomApi>,
}

impl ClassroomGateway {
    pub fn new(api: Arc<dyn ClassroomApi>) -> Self {
        Self { api }
    }

    /// First page of courses, capped at [`HOME_COURSE_LIMIT`]
    pub async fn list_courses(&self, credential: &Credential) -> Result<CoursesResponse> {
        let token = credential.access_token()?;

        tracing::debug!("Calling Classroom API to list courses");
        let courses = self
            .api
            .list_courses(token, Some(HOME_COURSE_LIMIT))
            .await?;

        if courses.is_empty() {
            tracing::info!("No courses found");
            return Ok(CoursesResponse {
                message: "No courses found.".to_string(),
                courses: vec![],
            });
        }

        tracing::info!("Found {} courses", courses.len());
        Ok(CoursesResponse {
            message: "Courses fetched successfully".to_string(),
            courses,
        })
    }

    /// Course work for every course, one upstream call per course in order.
    /// A failing course is reported inside its group; only the initial
    /// course listing can fail the whole request.
    pub async fn list_assignments(&self, credential: &Credential) -> Result<AssignmentsResponse> {
        let token = credential.access_token()?;

        tracing::debug!("Calling Classroom API to list courses for assignments");
        let courses = self.api.list_courses(token, None).await?;

        if courses.is_empty() {
            tracing::info!("No courses found to fetch assignments from");
            return Ok(AssignmentsResponse {
                message: "No courses found to fetch assignments from.".to_string(),
                assignments_by_course: vec![],
            });
        }

        let mut assignments_by_course = Vec::with_capacity(courses.len());
        for course in &courses {
            assignments_by_course.push(self.fetch_course_assignments(token, course).await);
        }

        tracing::info!(
            "Fetched assignments for {} courses",
            assignments_by_course.len()
        );
        Ok(AssignmentsResponse {
            message: "Assignments fetched successfully".to_string(),
            assignments_by_course,
        })
    }

    async fn fetch_course_assignments(&self, token: &str, course: &Value) -> AssignmentGroup {
        let course_id = course.get("id").and_then(Value::as_str).map(str::to_string);
        let course_name = course
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(UNNAMED_COURSE)
            .to_string();

        let mut group = AssignmentGroup {
            course_id,
            course_name,
            assignments: vec![],
            message: None,
            error: None,
        };

        let Some(id) = group.course_id.clone() else {
            tracing::warn!("Course '{}' has no id, skipping", group.course_name);
            group.error = Some("An unexpected error occurred: course has no id".to_string());
            return group;
        };

        tracing::debug!(
            "Fetching assignments for course: {} (ID: {})",
            group.course_name,
            id
        );

        match self.api.list_course_work(token, &id).await {
            Ok(items) => {
                if items.is_empty() {
                    group.message =
                        Some(format!("No assignments found for course {}", group.course_name));
                }
                group.assignments = items;
            }
            Err(ClassroomError::Api { status, reason }) => {
                tracing::warn!(
                    "API error fetching assignments for course {}: {} - {}",
                    id,
                    status,
                    reason
                );
                group.error = Some(format!("Failed to fetch assignments: {}", reason));
            }
            Err(e) => {
                tracing::warn!("Unexpected error fetching assignments for course {}: {}", id, e);
                group.error = Some(format!("An unexpected error occurred: {}", e));
            }
        }

        group
    }
}
