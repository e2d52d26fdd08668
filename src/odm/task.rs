use serde::{Deserialize, Serialize};
use std::fmt;

/// Remote task state as reported by NodeODM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Queued,
    Running,
    Failed,
    Completed,
    Canceled,
    Unknown(i64),
}

impl TaskStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            10 => TaskStatus::Queued,
            20 => TaskStatus::Running,
            30 => TaskStatus::Failed,
            40 => TaskStatus::Completed,
            50 => TaskStatus::Canceled,
            other => TaskStatus::Unknown(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            TaskStatus::Queued => 10,
            TaskStatus::Running => 20,
            TaskStatus::Failed => 30,
            TaskStatus::Completed => 40,
            TaskStatus::Canceled => 50,
            TaskStatus::Unknown(code) => *code,
        }
    }

    /// Polling stops once one of these is seen
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Canceled
        )
    }

    pub fn label(&self) -> String {
        match self {
            TaskStatus::Queued => "QUEUED".to_string(),
            TaskStatus::Running => "RUNNING".to_string(),
            TaskStatus::Failed => "FAILED".to_string(),
            TaskStatus::Completed => "COMPLETED".to_string(),
            TaskStatus::Canceled => "CANCELED".to_string(),
            TaskStatus::Unknown(code) => format!("UNKNOWN({})", code),
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Unknown(0)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// NodeODM sends either `{"code": 20}` or a bare integer
#[derive(Deserialize)]
#[serde(untagged)]
enum RawStatus {
    Code(i64),
    Object {
        #[serde(default)]
        code: i64,
        #[serde(default, rename = "errorMessage")]
        error_message: Option<String>,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTaskInfo {
    uuid: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    status: Option<RawStatus>,
    #[serde(default)]
    progress: f64,
    #[serde(default)]
    processing_time: i64,
    #[serde(default)]
    images_count: Option<u64>,
    #[serde(default)]
    date_created: Option<i64>,
}

/// Read-only view of a remote task
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawTaskInfo")]
pub struct TaskInfo {
    pub uuid: String,
    pub name: Option<String>,
    pub status: TaskStatus,
    pub progress: f64,
    /// Milliseconds; NodeODM reports -1 before processing starts
    pub processing_time: i64,
    pub images_count: Option<u64>,
    pub date_created: Option<i64>,
    pub error_message: Option<String>,
}

impl From<RawTaskInfo> for TaskInfo {
    fn from(raw: RawTaskInfo) -> Self {
        let (status, error_message) = match raw.status {
            Some(RawStatus::Code(code)) => (TaskStatus::from_code(code), None),
            Some(RawStatus::Object { code, error_message }) => {
                (TaskStatus::from_code(code), error_message)
            }
            None => (TaskStatus::default(), None),
        };

        Self {
            uuid: raw.uuid,
            name: raw.name,
            status,
            progress: raw.progress,
            processing_time: raw.processing_time,
            images_count: raw.images_count,
            date_created: raw.date_created,
            error_message,
        }
    }
}

impl TaskInfo {
    /// Placeholder used when the detail request for a listed task fails
    pub fn stub(uuid: &str) -> Self {
        Self {
            uuid: uuid.to_string(),
            name: Some("Task".to_string()),
            status: TaskStatus::Unknown(0),
            progress: 0.0,
            processing_time: 0,
            images_count: None,
            date_created: None,
            error_message: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Task")
    }

    /// Progress clamped to 0..=100 for gauges
    pub fn percent(&self) -> u16 {
        self.progress.clamp(0.0, 100.0) as u16
    }

    /// `name: LABEL (NN%)` with ` (MM:SS)` appended once processing time is known
    pub fn status_line(&self) -> String {
        let name = self.name.as_deref().unwrap_or("Unknown");
        let mut line = format!("{}: {} ({}%)", name, self.status, self.progress as i64);
        if let Some(elapsed) = format_processing_time(self.processing_time) {
            line.push_str(&format!(" ({})", elapsed));
        }
        line
    }

    /// List entry text, `name (ID: uuid) - LABEL`
    pub fn list_line(&self) -> String {
        format!("{} (ID: {}) - {}", self.display_name(), self.uuid, self.status)
    }
}

/// Format milliseconds as MM:SS, None when nothing has been processed yet
pub fn format_processing_time(ms: i64) -> Option<String> {
    if ms <= 0 {
        return None;
    }
    let minutes = ms / (1000 * 60);
    let seconds = (ms / 1000) % 60;
    Some(format!("{:02}:{:02}", minutes, seconds))
}

/// One entry of the `options` array sent to `/task/new`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskOption {
    pub name: String,
    pub value: serde_json::Value,
}

impl TaskOption {
    pub fn new(name: &str, value: impl Into<serde_json::Value>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels() {
        assert_eq!(TaskStatus::from_code(10).label(), "QUEUED");
        assert_eq!(TaskStatus::from_code(20).label(), "RUNNING");
        assert_eq!(TaskStatus::from_code(30).label(), "FAILED");
        assert_eq!(TaskStatus::from_code(40).label(), "COMPLETED");
        assert_eq!(TaskStatus::from_code(50).label(), "CANCELED");
        for code in [-1, 0, 15, 60, 999] {
            assert_eq!(TaskStatus::from_code(code).label(), format!("UNKNOWN({})", code));
            assert_eq!(TaskStatus::from_code(code).code(), code);
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Canceled.is_terminal());
        assert!(!TaskStatus::Queued.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(!TaskStatus::Unknown(0).is_terminal());
    }

    #[test]
    fn test_parse_status_object() {
        let info: TaskInfo = serde_json::from_str(
            r#"{"uuid":"abc","name":"Field A","status":{"code":30,"errorMessage":"out of memory"},
                "progress":42.7,"processingTime":125000,"imagesCount":18,"dateCreated":1700000000000}"#,
        )
        .unwrap();

        assert_eq!(info.status, TaskStatus::Failed);
        assert_eq!(info.error_message.as_deref(), Some("out of memory"));
        assert_eq!(info.images_count, Some(18));
        assert_eq!(info.percent(), 42);
        assert_eq!(info.status_line(), "Field A: FAILED (42%) (02:05)");
    }

    #[test]
    fn test_parse_bare_status_and_defaults() {
        let info: TaskInfo = serde_json::from_str(r#"{"uuid":"abc","status":20}"#).unwrap();
        assert_eq!(info.status, TaskStatus::Running);
        assert_eq!(info.status_line(), "Unknown: RUNNING (0%)");

        let info: TaskInfo = serde_json::from_str(r#"{"uuid":"abc"}"#).unwrap();
        assert_eq!(info.status, TaskStatus::Unknown(0));
        assert_eq!(info.display_name(), "Task");
    }

    #[test]
    fn test_missing_uuid_is_rejected() {
        assert!(serde_json::from_str::<TaskInfo>(r#"{"name":"x"}"#).is_err());
    }

    #[test]
    fn test_stub_record() {
        let stub = TaskInfo::stub("1234");
        assert_eq!(stub.list_line(), "Task (ID: 1234) - UNKNOWN(0)");
        assert_eq!(stub.progress, 0.0);
    }

    #[test]
    fn test_processing_time_format() {
        assert_eq!(format_processing_time(-1), None);
        assert_eq!(format_processing_time(0), None);
        assert_eq!(format_processing_time(59_999).as_deref(), Some("00:59"));
        assert_eq!(format_processing_time(3_600_000).as_deref(), Some("60:00"));
    }

    #[test]
    fn test_option_wire_format() {
        let options = vec![
            TaskOption::new("dsm", true),
            TaskOption::new("camera-fov", "60"),
        ];
        assert_eq!(
            serde_json::to_string(&options).unwrap(),
            r#"[{"name":"dsm","value":true},{"name":"camera-fov","value":"60"}]"#
        );
    }
}
