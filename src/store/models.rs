use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// Schedule-source day numbers run Monday=1 through Sunday=7.
    pub(crate) fn from_number(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Monday),
            2 => Some(Self::Tuesday),
            3 => Some(Self::Wednesday),
            4 => Some(Self::Thursday),
            5 => Some(Self::Friday),
            6 => Some(Self::Saturday),
            7 => Some(Self::Sunday),
            _ => None,
        }
    }

    pub(crate) fn spanish_name(self) -> &'static str {
        match self {
            Self::Monday => "lunes",
            Self::Tuesday => "martes",
            Self::Wednesday => "miércoles",
            Self::Thursday => "jueves",
            Self::Friday => "viernes",
            Self::Saturday => "sábado",
            Self::Sunday => "domingo",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum AttendanceStatus {
    #[serde(rename = "presente")]
    Present,
    #[serde(rename = "ausente")]
    Absent,
    #[serde(rename = "retardo")]
    Late,
    #[serde(rename = "justificado")]
    Justified,
    #[serde(rename = "pendiente")]
    Pending,
}

impl AttendanceStatus {
    pub(crate) fn as_wire(self) -> &'static str {
        match self {
            Self::Present => "presente",
            Self::Absent => "ausente",
            Self::Late => "retardo",
            Self::Justified => "justificado",
            Self::Pending => "pendiente",
        }
    }

    pub(crate) fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Student {
    pub(crate) id: String,
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) enrollment_id: Option<String>,
    #[serde(default)]
    pub(crate) repeating: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct EvaluationKind {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) weight: f64,
    pub(crate) partial: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Evaluation {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) max_score: f64,
    pub(crate) partial: u8,
    pub(crate) kind_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Group {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) subject: String,
    #[serde(default)]
    pub(crate) color: String,
    #[serde(default)]
    pub(crate) tutor_name: Option<String>,
    #[serde(default)]
    pub(crate) students: Vec<Student>,
    #[serde(default)]
    pub(crate) class_days: Vec<Weekday>,
    #[serde(default)]
    pub(crate) evaluation_kinds: Vec<EvaluationKind>,
    #[serde(default)]
    pub(crate) evaluations: Vec<Evaluation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct TutorshipEntry {
    #[serde(default)]
    pub(crate) strengths: String,
    #[serde(default)]
    pub(crate) opportunities: String,
    #[serde(default)]
    pub(crate) summary: String,
}

/// Attendance is keyed group → student → ISO date (`YYYY-MM-DD`) → status.
/// Grades are keyed group → student → evaluation → score.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct AppData {
    #[serde(default)]
    pub(crate) groups: Vec<Group>,
    #[serde(default)]
    pub(crate) attendance: HashMap<String, HashMap<String, BTreeMap<String, AttendanceStatus>>>,
    #[serde(default)]
    pub(crate) grades: HashMap<String, HashMap<String, HashMap<String, f64>>>,
    #[serde(default)]
    pub(crate) tutorship: HashMap<String, TutorshipEntry>,
}
