//! Survey Schema Module
//! Declared column allow-list, display names and ordinal scales for the GSS 2018 extract.

/// Raw columns kept from the source file, in cleaned-table order.
pub const RAW_COLUMNS: [&str; 17] = [
    "id", "wtss", "sex", "educ", "region", "age", "coninc", "prestg10", "mapres10", "papres10",
    "sei10", "satjob", "fechld", "fefam", "fepol", "fepresch", "meovrwrk",
];

/// Raw name -> display name. `fehire` and `fejobaff` are not in the allow-list
/// and never match a column.
pub const RENAMES: [(&str, &str); 14] = [
    ("wtss", "weight"),
    ("educ", "education"),
    ("coninc", "income"),
    ("prestg10", "job_prestige"),
    ("mapres10", "mother_job_prestige"),
    ("papres10", "father_job_prestige"),
    ("sei10", "socioeconomic_index"),
    ("fechld", "relationship"),
    ("fefam", "male_breadwinner"),
    ("fehire", "hire_women"),
    ("fejobaff", "preference_hire_women"),
    ("fepol", "men_bettersuited"),
    ("fepresch", "child_suffer"),
    ("meovrwrk", "men_overwork"),
];

pub const SEX: &str = "sex";
pub const EDUCATION: &str = "education";
pub const AGE: &str = "age";
pub const INCOME: &str = "income";
pub const JOB_PRESTIGE: &str = "job_prestige";
pub const SOCIOECONOMIC_INDEX: &str = "socioeconomic_index";
pub const MALE_BREADWINNER: &str = "male_breadwinner";
pub const COUNT: &str = "count";
pub const PRESTIGE_BRACKET: &str = "prestige_bracket";

/// Cleaned columns coerced to Float64 at load time.
pub const NUMERIC_COLUMNS: [&str; 9] = [
    "id",
    "weight",
    EDUCATION,
    AGE,
    INCOME,
    JOB_PRESTIGE,
    "mother_job_prestige",
    "father_job_prestige",
    SOCIOECONOMIC_INDEX,
];

/// Top-coded age label and the value it stands for.
pub const AGE_SENTINEL: (&str, &str) = ("89 or older", "89");

/// Opinion questions start at this cleaned column index.
pub const QUESTION_START: usize = 11;

/// Cleaned column index range of the grouping categories (sex, education, region).
pub const GROUPING_RANGE: std::ops::Range<usize> = 2..5;

pub const AGREEMENT_SCALE: [&str; 4] = ["strongly agree", "agree", "disagree", "strongly disagree"];

/// Declared display order for a column's categories, if it has one.
pub fn ordinal_scale(column: &str) -> Option<&'static [&'static str]> {
    match column {
        MALE_BREADWINNER | "relationship" | "child_suffer" => Some(&AGREEMENT_SCALE),
        _ => None,
    }
}

/// Position of `value` on the column's ordinal scale.
pub fn ordinal_rank(column: &str, value: &str) -> Option<usize> {
    ordinal_scale(column)?.iter().position(|v| *v == value)
}

/// Display name for a raw column.
pub fn display_name(raw: &str) -> &str {
    RENAMES
        .iter()
        .find(|(from, _)| *from == raw)
        .map(|(_, to)| *to)
        .unwrap_or(raw)
}

/// Cleaned column names in declared order.
pub fn cleaned_columns() -> Vec<&'static str> {
    RAW_COLUMNS.iter().map(|raw| display_name(raw)).collect()
}
