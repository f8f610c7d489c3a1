//! Form answers collected by the wizard.
//!
//! [`FormAnswers`] is the single record every question edits. It is
//! mutated through [`AnswersPatch`] merges and is read in full only when
//! the calculation request is built.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

/// Youngest selectable age in years.
pub const MIN_AGE_YEARS: u8 = 25;

/// Oldest selectable age in years.
pub const MAX_AGE_YEARS: u8 = 65;

/// Largest month component of an age.
pub const MAX_AGE_MONTHS: u8 = 11;

/// Lower bound of the retirement age slider.
pub const MIN_RETIREMENT_AGE: u8 = 62;

/// Upper bound of the retirement age slider.
pub const MAX_RETIREMENT_AGE: u8 = 68;

/// Slider position before the user touches it.
pub const DEFAULT_RETIREMENT_AGE: u8 = 65;

// ---------------------------------------------------------------------------
// Gender
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "Masculino")]
    Male,
    #[serde(rename = "Femenino")]
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    /// Label shown to the user.
    pub fn label(self) -> &'static str {
        match self {
            Self::Male => "Masculino",
            Self::Female => "Femenino",
        }
    }

    /// Two-letter code expected by the calculation service.
    pub fn wire_code(self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
        }
    }

    /// Parse either the display label or the wire code.
    pub fn from_label(s: &str) -> Result<Self, CoreError> {
        match s.trim() {
            "Masculino" | "masculino" | "M" | "m" => Ok(Self::Male),
            "Femenino" | "femenino" | "F" | "f" => Ok(Self::Female),
            other => Err(CoreError::Validation(format!(
                "Invalid gender '{other}'. Must be one of: Masculino, Femenino"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Education level
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EducationLevel {
    #[serde(rename = "Básica")]
    Basic,
    #[serde(rename = "Media")]
    Secondary,
    #[serde(rename = "Técnica")]
    Technical,
    #[serde(rename = "Universitaria incompleta")]
    UniversityIncomplete,
    #[serde(rename = "Universitaria completa")]
    UniversityComplete,
    #[serde(rename = "Postgrado")]
    Postgraduate,
}

impl EducationLevel {
    /// Ordered the way the selector lists them, highest first.
    pub const ALL: [EducationLevel; 6] = [
        EducationLevel::Postgraduate,
        EducationLevel::UniversityComplete,
        EducationLevel::UniversityIncomplete,
        EducationLevel::Technical,
        EducationLevel::Secondary,
        EducationLevel::Basic,
    ];

    /// Label shown to the user; also the `nivel_estudios` wire value.
    pub fn label(self) -> &'static str {
        match self {
            Self::Basic => "Básica",
            Self::Secondary => "Media",
            Self::Technical => "Técnica",
            Self::UniversityIncomplete => "Universitaria incompleta",
            Self::UniversityComplete => "Universitaria completa",
            Self::Postgraduate => "Postgrado",
        }
    }

    pub fn from_label(s: &str) -> Result<Self, CoreError> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|level| level.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                CoreError::Validation(format!("Invalid education level '{s}'"))
            })
    }
}

// ---------------------------------------------------------------------------
// Answers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Age {
    pub years: u8,
    pub months: u8,
}

impl Default for Age {
    fn default() -> Self {
        Self {
            years: MIN_AGE_YEARS,
            months: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormAnswers {
    pub name: String,
    pub age: Age,
    pub gender: Option<Gender>,
    pub retirement_age: u8,
    /// Current individual-account balance in CLP.
    pub account_balance: u64,
    /// Gross monthly salary in CLP.
    pub gross_salary: u64,
    /// Desired monthly pension in today's CLP.
    pub ideal_pension: u64,
    pub education: Option<EducationLevel>,
}

impl Default for FormAnswers {
    fn default() -> Self {
        Self {
            name: String::new(),
            age: Age::default(),
            gender: None,
            retirement_age: DEFAULT_RETIREMENT_AGE,
            account_balance: 0,
            gross_salary: 0,
            ideal_pension: 0,
            education: None,
        }
    }
}

/// Partial update of [`FormAnswers`]. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswersPatch {
    pub name: Option<String>,
    pub age_years: Option<u8>,
    pub age_months: Option<u8>,
    pub gender: Option<Gender>,
    pub retirement_age: Option<u8>,
    pub account_balance: Option<u64>,
    pub gross_salary: Option<u64>,
    pub ideal_pension: Option<u64>,
    pub education: Option<EducationLevel>,
}

impl AnswersPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl FormAnswers {
    /// Merge a patch in place. Values are taken as given; validity is
    /// judged by the question registry when the user tries to advance.
    pub fn apply(&mut self, patch: AnswersPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(years) = patch.age_years {
            self.age.years = years;
        }
        if let Some(months) = patch.age_months {
            self.age.months = months;
        }
        if let Some(gender) = patch.gender {
            self.gender = Some(gender);
        }
        if let Some(age) = patch.retirement_age {
            self.retirement_age = age;
        }
        if let Some(balance) = patch.account_balance {
            self.account_balance = balance;
        }
        if let Some(salary) = patch.gross_salary {
            self.gross_salary = salary;
        }
        if let Some(pension) = patch.ideal_pension {
            self.ideal_pension = pension;
        }
        if let Some(level) = patch.education {
            self.education = Some(level);
        }
    }
}

/// Number of decimal digits in `value` (`0` has one digit).
pub fn digit_count(value: u64) -> usize {
    value.checked_ilog10().map_or(1, |d| d as usize + 1)
}
