use serde::Deserialize;

/// Google Classroom REST payloads, reduced to the fields the import uses.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Course {
    pub(crate) id: String,
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) section: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CourseListResponse {
    #[serde(default)]
    pub(crate) courses: Vec<Course>,
    #[serde(default)]
    pub(crate) next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CourseWork {
    pub(crate) id: String,
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) max_points: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CourseWorkListResponse {
    #[serde(default)]
    pub(crate) course_work: Vec<CourseWork>,
    #[serde(default)]
    pub(crate) next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StudentSubmission {
    pub(crate) id: String,
    pub(crate) user_id: String,
    #[serde(default)]
    pub(crate) assigned_grade: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmissionListResponse {
    #[serde(default)]
    pub(crate) student_submissions: Vec<StudentSubmission>,
    #[serde(default)]
    pub(crate) next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RosterStudent {
    pub(crate) user_id: String,
    pub(crate) profile: StudentProfile,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StudentProfile {
    #[serde(default)]
    pub(crate) name: Option<ProfileName>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProfileName {
    #[serde(default)]
    pub(crate) full_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RosterListResponse {
    #[serde(default)]
    pub(crate) students: Vec<RosterStudent>,
    #[serde(default)]
    pub(crate) next_page_token: Option<String>,
}

impl RosterStudent {
    pub(crate) fn display_name(&self) -> Option<&str> {
        self.profile
            .name
            .as_ref()
            .map(|name| name.full_name.as_str())
            .filter(|name| !name.trim().is_empty())
    }
}
