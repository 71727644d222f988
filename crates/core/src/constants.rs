use pathsim_types::Percentage;

/// Keyword for values that are generated at random.
pub const RANDOM: &str = "RANDOM";
/// Random result value within the normal range.
pub const NORMAL_VALUE: &str = "NORMAL";
/// Random result value above the normal range.
pub const ABNORMAL_HIGH: &str = "ABNORMAL_HIGH";
/// Random result value below the normal range.
pub const ABNORMAL_LOW: &str = "ABNORMAL_LOW";
/// Keyword for an explicitly empty value.
pub const EMPTY: &str = "EMPTY";
/// Keyword to set a date's time to midnight.
pub const MIDNIGHT: &str = "MIDNIGHT";

pub const NUMERICAL_VALUE_TYPE: &str = "NM";
pub const TEXTUAL_VALUE_TYPE: &str = "TX";

pub const TRIGGER_EVENTS: [&str; 3] = ["R01", "R03", "R32"];

pub const ABNORMAL_FLAG_LOW: &str = "LOW";
pub const ABNORMAL_FLAG_HIGH: &str = "HIGH";
pub const ABNORMAL_FLAG_NORMAL: &str = "NORMAL";
pub const ABNORMAL_FLAG_DEFAULT: &str = "DEFAULT";
pub const ABNORMAL_FLAG_VALUES: [&str; 5] = [
    ABNORMAL_FLAG_LOW,
    ABNORMAL_FLAG_HIGH,
    "",
    ABNORMAL_FLAG_NORMAL,
    ABNORMAL_FLAG_DEFAULT,
];

/// Marks the patient currently in use by the pathway.
pub const CURRENT_PATIENT: &str = "CURRENT";
/// Key of the single person added to pathways without a persons section.
pub const DEFAULT_PATIENT_ID: &str = "main-patient";

pub const TRACK_MODE: &str = "track";
pub const TRANSIT_MODE: &str = "transit";
pub const TEMPORARY_MODE: &str = "temporary";

pub const DOCUMENT_APPEND: &str = "append";
pub const DOCUMENT_OVERWRITE: &str = "overwrite";

pub const GENDER_MALE: &str = "M";
pub const GENDER_FEMALE: &str = "F";

/// Name given to a pathway parsed on its own without a name.
pub const UNKNOWN_PATHWAY_NAME: &str = "unknown_pathway";
pub const PATHWAY_EXTENSIONS: [&str; 3] = ["json", "yml", "yaml"];

pub const CONSULTANT_ID_PREFIX: &str = "C";
pub const CONSULTANT_ID_DIGITS: usize = 7;

/// Location every hospital must define.
pub const A_AND_E_LOCATION: &str = "ED";

pub const VALUE_GENERATION_ATTEMPTS: usize = 100;
pub const VALUE_DECIMALS: usize = 2;

/// Weight of pathways without an explicit percentage once the explicit ones reach 100.
pub const DEFAULT_PERCENTAGE: Percentage = Percentage::ONE;
pub const TOTAL_PERCENTAGE: f64 = 100.0;

/// Coding system of order profiles and test types that don't name their own.
pub const DEFAULT_CODING_SYSTEM: &str = "WinPath";
