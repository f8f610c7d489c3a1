//! Question registry for the pension wizard.
//!
//! The wizard asks a fixed, ordered list of questions. Each [`Question`]
//! knows its title, how to turn raw user input into an [`AnswersPatch`],
//! which inline errors to show, and whether the *whole* answers record
//! currently satisfies it.
//!
//! Validity never blocks typing. It only gates the wizard's "next" action,
//! and inline errors are reported only once `show_validation` is set by a
//! failed advance attempt.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::answers::{
    digit_count, AnswersPatch, EducationLevel, FormAnswers, Gender, MAX_AGE_MONTHS,
    MAX_AGE_YEARS, MAX_RETIREMENT_AGE, MIN_AGE_YEARS, MIN_RETIREMENT_AGE,
};
use crate::error::CoreError;
use crate::format::{format_clp, format_grouped};

/// Letters (including Latin-1 accented letters) and whitespace only.
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-zÀ-ÿ\s]*$").expect("valid regex"));

/// Minimum number of characters in a name.
pub const MIN_NAME_LEN: usize = 2;

/// Digit bound for the account balance input.
pub const MAX_BALANCE_DIGITS: usize = 9;

/// Digit bound for the salary and ideal pension inputs.
pub const MAX_MONTHLY_AMOUNT_DIGITS: usize = 7;

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Question {
    Name,
    Age,
    Gender,
    RetirementAge,
    AccountBalance,
    GrossSalary,
    IdealPension,
    Education,
}

/// The questions in the order the wizard asks them.
pub const QUESTIONS: [Question; 8] = [
    Question::Name,
    Question::Age,
    Question::Gender,
    Question::RetirementAge,
    Question::AccountBalance,
    Question::GrossSalary,
    Question::IdealPension,
    Question::Education,
];

/// Total number of questions.
pub const QUESTION_COUNT: usize = QUESTIONS.len();

/// Question at a 0-based step index.
pub fn question_at(index: usize) -> Option<Question> {
    QUESTIONS.get(index).copied()
}

/// Index of the first question the answers do not satisfy.
pub fn first_invalid(answers: &FormAnswers) -> Option<usize> {
    QUESTIONS.iter().position(|q| !q.is_valid(answers))
}

/// Whether every question is satisfied.
pub fn all_valid(answers: &FormAnswers) -> bool {
    first_invalid(answers).is_none()
}

// ---------------------------------------------------------------------------
// Inline errors
// ---------------------------------------------------------------------------

/// Form field an inline error is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    AgeYears,
    AgeMonths,
    Gender,
    RetirementAge,
    AccountBalance,
    GrossSalary,
    IdealPension,
    Education,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: Field,
    pub message: &'static str,
}

impl FieldError {
    fn new(field: Field, message: &'static str) -> Self {
        Self { field, message }
    }
}

// ---------------------------------------------------------------------------
// Question behaviour
// ---------------------------------------------------------------------------

impl Question {
    pub fn title(self) -> &'static str {
        match self {
            Self::Name => "¿Cuál es tu nombre?",
            Self::Age => "¿Cuál es tu edad?",
            Self::Gender => "¿Cuál es tu género?",
            Self::RetirementAge => "¿A qué edad planeas retirarte?",
            Self::AccountBalance => {
                "¿Cuál es tu total acumulado en tu cuenta de capitalización individual?"
            }
            Self::GrossSalary => "¿Cuál es tu salario bruto actual?",
            Self::IdealPension => {
                "Si te retiraras hoy, ¿cuál sería tu monto ideal de pensión mensual?"
            }
            Self::Education => "¿Cuál es tu nivel de estudios?",
        }
    }

    /// Helper text shown under the input, if any.
    pub fn hint(self) -> Option<&'static str> {
        match self {
            Self::Age => Some("Debes tener entre 25 y 65 años para usar esta herramienta"),
            Self::RetirementAge => Some("Elige una edad entre 62 y 68 años"),
            Self::AccountBalance => Some(
                "Puedes consultar el saldo de tu cuenta con tu Clave Única en la \
                 Superintendencia de Pensiones",
            ),
            Self::IdealPension => Some(
                "Indica el monto mensual que consideras necesario para mantener tu \
                 calidad de vida actual. Te recomendamos ser lo más realista posible.",
            ),
            _ => None,
        }
    }

    /// Whether the answers satisfy this question. Evaluated over the full
    /// record before the wizard allows moving forward.
    pub fn is_valid(self, answers: &FormAnswers) -> bool {
        match self {
            Self::Name => is_valid_name(&answers.name),
            Self::Age => {
                (MIN_AGE_YEARS..=MAX_AGE_YEARS).contains(&answers.age.years)
                    && answers.age.months <= MAX_AGE_MONTHS
            }
            Self::Gender => answers.gender.is_some(),
            Self::RetirementAge => true,
            Self::AccountBalance => {
                is_valid_amount(answers.account_balance, MAX_BALANCE_DIGITS)
            }
            Self::GrossSalary => {
                is_valid_amount(answers.gross_salary, MAX_MONTHLY_AMOUNT_DIGITS)
            }
            Self::IdealPension => {
                is_valid_amount(answers.ideal_pension, MAX_MONTHLY_AMOUNT_DIGITS)
            }
            Self::Education => answers.education.is_some(),
        }
    }

    /// Inline errors for this question's fields.
    ///
    /// Always empty while `show_validation` is false, so errors appear only
    /// after the user has tried to advance.
    pub fn field_errors(self, answers: &FormAnswers, show_validation: bool) -> Vec<FieldError> {
        if !show_validation || self.is_valid(answers) {
            return Vec::new();
        }
        match self {
            Self::Name if answers.name.is_empty() => {
                vec![FieldError::new(Field::Name, "Por favor, ingresa tu nombre")]
            }
            Self::Name => vec![FieldError::new(
                Field::Name,
                "Tu nombre debe tener al menos 2 letras",
            )],
            Self::Age => {
                let mut errors = Vec::new();
                if !(MIN_AGE_YEARS..=MAX_AGE_YEARS).contains(&answers.age.years) {
                    errors.push(FieldError::new(
                        Field::AgeYears,
                        "Por favor selecciona los años",
                    ));
                }
                if answers.age.months > MAX_AGE_MONTHS {
                    errors.push(FieldError::new(
                        Field::AgeMonths,
                        "Por favor selecciona los meses",
                    ));
                }
                errors
            }
            Self::Gender => vec![FieldError::new(Field::Gender, "Por favor, elige una opción")],
            Self::RetirementAge => Vec::new(),
            Self::AccountBalance => vec![FieldError::new(
                Field::AccountBalance,
                "Debes indicar un monto",
            )],
            Self::GrossSalary => vec![FieldError::new(
                Field::GrossSalary,
                "Por favor, ingresa tu salario bruto actual",
            )],
            Self::IdealPension => vec![FieldError::new(
                Field::IdealPension,
                "Debes ingresar un monto",
            )],
            Self::Education => vec![FieldError::new(Field::Education, "Debes elegir una opción")],
        }
    }

    /// Turn raw input for this question into a patch.
    ///
    /// Rejected input (a character the field does not accept, a number
    /// outside a selector's options, an amount longer than allowed) returns
    /// a validation error and must leave the answers untouched, the same way
    /// a keystroke the input refuses never reaches the form.
    pub fn accept_input(self, raw: &str) -> Result<AnswersPatch, CoreError> {
        let raw = raw.trim();
        let patch = match self {
            Self::Name => AnswersPatch {
                name: Some(accept_name_input(raw).ok_or_else(|| {
                    CoreError::Validation("Name may only contain letters and spaces".into())
                })?),
                ..Default::default()
            },
            Self::Age => {
                let (years, months) = parse_age_input(raw)?;
                AnswersPatch {
                    age_years: Some(years),
                    age_months: Some(months),
                    ..Default::default()
                }
            }
            Self::Gender => AnswersPatch {
                gender: Some(parse_choice(raw, &Gender::ALL, |g| g.label())?),
                ..Default::default()
            },
            Self::RetirementAge => {
                let age: u8 = raw.parse().map_err(|_| {
                    CoreError::Validation(format!("Invalid retirement age '{raw}'"))
                })?;
                AnswersPatch {
                    retirement_age: Some(clamp_retirement_age(age)),
                    ..Default::default()
                }
            }
            Self::AccountBalance => AnswersPatch {
                account_balance: Some(parse_amount(raw, MAX_BALANCE_DIGITS)?),
                ..Default::default()
            },
            Self::GrossSalary => AnswersPatch {
                gross_salary: Some(parse_amount(raw, MAX_MONTHLY_AMOUNT_DIGITS)?),
                ..Default::default()
            },
            Self::IdealPension => AnswersPatch {
                ideal_pension: Some(parse_amount(raw, MAX_MONTHLY_AMOUNT_DIGITS)?),
                ..Default::default()
            },
            Self::Education => AnswersPatch {
                education: Some(parse_choice(raw, &EducationLevel::ALL, |l| l.label())?),
                ..Default::default()
            },
        };
        Ok(patch)
    }

    /// Current answer rendered for the summary screen.
    pub fn display_answer(self, answers: &FormAnswers) -> String {
        match self {
            Self::Name => answers.name.clone(),
            Self::Age => format!("{} años y {} meses", answers.age.years, answers.age.months),
            Self::Gender => answers.gender.map(Gender::label).unwrap_or("-").to_string(),
            Self::RetirementAge => format!("{} años", answers.retirement_age),
            Self::AccountBalance => format_clp(answers.account_balance as f64),
            Self::GrossSalary => format_clp(answers.gross_salary as f64),
            Self::IdealPension => format_clp(answers.ideal_pension as f64),
            Self::Education => answers
                .education
                .map(EducationLevel::label)
                .unwrap_or("-")
                .to_string(),
        }
    }

    /// Input echo for amount fields (`5.000.000`), empty when unset.
    pub fn echo_amount(value: u64) -> String {
        if value == 0 {
            String::new()
        } else {
            format_grouped(value)
        }
    }
}

// ---------------------------------------------------------------------------
// Input rules
// ---------------------------------------------------------------------------

pub fn is_valid_name(name: &str) -> bool {
    name.chars().count() >= MIN_NAME_LEN && NAME_RE.is_match(name)
}

fn is_valid_amount(value: u64, max_digits: usize) -> bool {
    value > 0 && digit_count(value) <= max_digits
}

/// Accept a name keystroke: letters and spaces only, first character
/// upper-cased. Returns `None` when the input must be refused.
pub fn accept_name_input(raw: &str) -> Option<String> {
    if !NAME_RE.is_match(raw) {
        return None;
    }
    let mut chars = raw.chars();
    Some(match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    })
}

/// Parse an amount typed with any formatting (`$ 5.000.000`, `5000000`).
///
/// Non-digits are stripped; empty input means `0`. Returns `None` when the
/// digits exceed `max_digits`.
pub fn parse_amount_input(raw: &str, max_digits: usize) -> Option<u64> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() > max_digits {
        return None;
    }
    if digits.is_empty() {
        return Some(0);
    }
    digits.parse().ok()
}

pub fn clamp_retirement_age(age: u8) -> u8 {
    age.clamp(MIN_RETIREMENT_AGE, MAX_RETIREMENT_AGE)
}

fn parse_amount(raw: &str, max_digits: usize) -> Result<u64, CoreError> {
    parse_amount_input(raw, max_digits).ok_or_else(|| {
        CoreError::Validation(format!("Amount may have at most {max_digits} digits"))
    })
}

/// Parse `"30"`, `"30 6"`, `"30,6"` or `"30/6"` into years and months.
/// Only values offered by the age selectors are accepted.
fn parse_age_input(raw: &str) -> Result<(u8, u8), CoreError> {
    let mut parts = raw
        .split(|c: char| c.is_whitespace() || c == ',' || c == '/')
        .filter(|p| !p.is_empty());
    let invalid = || CoreError::Validation(format!("Invalid age '{raw}'"));

    let years: u8 = parts.next().ok_or_else(invalid)?.parse().map_err(|_| invalid())?;
    let months: u8 = match parts.next() {
        Some(m) => m.parse().map_err(|_| invalid())?,
        None => 0,
    };
    if parts.next().is_some() {
        return Err(invalid());
    }
    if !(MIN_AGE_YEARS..=MAX_AGE_YEARS).contains(&years) {
        return Err(CoreError::Validation(format!(
            "Years must be between {MIN_AGE_YEARS} and {MAX_AGE_YEARS}"
        )));
    }
    if months > MAX_AGE_MONTHS {
        return Err(CoreError::Validation(format!(
            "Months must be between 0 and {MAX_AGE_MONTHS}"
        )));
    }
    Ok((years, months))
}

/// Pick an option by its 1-based position or by its label.
fn parse_choice<T: Copy>(
    raw: &str,
    options: &[T],
    label: impl Fn(T) -> &'static str,
) -> Result<T, CoreError> {
    if let Ok(n) = raw.parse::<usize>() {
        if let Some(opt) = n.checked_sub(1).and_then(|i| options.get(i)) {
            return Ok(*opt);
        }
    }
    options
        .iter()
        .copied()
        .find(|opt| label(*opt).to_lowercase() == raw.to_lowercase())
        .ok_or_else(|| CoreError::Validation(format!("Unknown option '{raw}'")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answers::Age;

    fn complete() -> FormAnswers {
        FormAnswers {
            name: "Ana".into(),
            age: Age { years: 30, months: 0 },
            gender: Some(Gender::Female),
            retirement_age: 65,
            account_balance: 5_000_000,
            gross_salary: 1_200_000,
            ideal_pension: 800_000,
            education: Some(EducationLevel::UniversityComplete),
        }
    }

    fn with_age(years: u8, months: u8) -> FormAnswers {
        FormAnswers {
            age: Age { years, months },
            ..complete()
        }
    }

    // -- registry --

    #[test]
    fn registry_order_is_fixed() {
        assert_eq!(QUESTION_COUNT, 8);
        assert_eq!(question_at(0), Some(Question::Name));
        assert_eq!(question_at(4), Some(Question::AccountBalance));
        assert_eq!(question_at(7), Some(Question::Education));
        assert_eq!(question_at(8), None);
    }

    #[test]
    fn complete_answers_satisfy_every_question() {
        assert!(all_valid(&complete()));
        assert_eq!(first_invalid(&complete()), None);
    }

    #[test]
    fn default_answers_fail_at_name() {
        assert_eq!(first_invalid(&FormAnswers::default()), Some(0));
    }

    // -- name --

    #[test]
    fn name_rules() {
        assert!(is_valid_name("Ana"));
        assert!(is_valid_name("José María"));
        assert!(is_valid_name("Ñandú"));
        assert!(!is_valid_name("A"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("Ana3"));
        assert!(!is_valid_name("Ana-María"));
    }

    #[test]
    fn name_input_capitalizes_and_refuses_symbols() {
        assert_eq!(accept_name_input("ana").as_deref(), Some("Ana"));
        assert_eq!(accept_name_input("élise").as_deref(), Some("Élise"));
        assert_eq!(accept_name_input("").as_deref(), Some(""));
        assert_eq!(accept_name_input("ana1"), None);
    }

    // -- age --

    #[test]
    fn age_boundaries() {
        assert!(Question::Age.is_valid(&with_age(65, 0)));
        assert!(!Question::Age.is_valid(&with_age(65, 1)));
        assert!(Question::Age.is_valid(&with_age(25, 0)));
        assert!(Question::Age.is_valid(&with_age(64, 11)));
        assert!(!Question::Age.is_valid(&with_age(24, 11)));
        assert!(!Question::Age.is_valid(&with_age(66, 0)));
        assert!(!Question::Age.is_valid(&with_age(30, 12)));
    }

    #[test]
    fn age_validity_matches_rule_over_whole_grid() {
        for years in 0..=100u8 {
            for months in 0..=15u8 {
                let expected = (25..=65).contains(&years) && months <= 11;
                assert_eq!(
                    Question::Age.is_valid(&with_age(years, months)),
                    expected,
                    "years={years} months={months}"
                );
            }
        }
    }

    #[test]
    fn age_input_parsing() {
        assert_eq!(parse_age_input("30").unwrap(), (30, 0));
        assert_eq!(parse_age_input("30 6").unwrap(), (30, 6));
        assert_eq!(parse_age_input("30,11").unwrap(), (30, 11));
        assert!(parse_age_input("24").is_err());
        assert!(parse_age_input("30 12").is_err());
        assert!(parse_age_input("abc").is_err());
        assert!(parse_age_input("30 1 2").is_err());
    }

    // -- amounts --

    #[test]
    fn balance_requires_positive_and_nine_digits() {
        let mut a = complete();
        a.account_balance = 0;
        assert!(!Question::AccountBalance.is_valid(&a));
        a.account_balance = 999_999_999;
        assert!(Question::AccountBalance.is_valid(&a));
        a.account_balance = 1_000_000_000;
        assert!(!Question::AccountBalance.is_valid(&a));
    }

    #[test]
    fn salary_and_ideal_pension_allow_seven_digits() {
        let mut a = complete();
        a.gross_salary = 9_999_999;
        a.ideal_pension = 9_999_999;
        assert!(Question::GrossSalary.is_valid(&a));
        assert!(Question::IdealPension.is_valid(&a));
        a.gross_salary = 10_000_000;
        a.ideal_pension = 0;
        assert!(!Question::GrossSalary.is_valid(&a));
        assert!(!Question::IdealPension.is_valid(&a));
    }

    #[test]
    fn amount_input_strips_formatting() {
        assert_eq!(parse_amount_input("$ 5.000.000", 9), Some(5_000_000));
        assert_eq!(parse_amount_input("", 9), Some(0));
        assert_eq!(parse_amount_input("12345678", 7), None);
        assert_eq!(parse_amount_input("1234567", 7), Some(1_234_567));
    }

    // -- selections --

    #[test]
    fn gender_and_education_require_selection() {
        let mut a = complete();
        a.gender = None;
        a.education = None;
        assert!(!Question::Gender.is_valid(&a));
        assert!(!Question::Education.is_valid(&a));
    }

    #[test]
    fn retirement_age_is_always_valid_and_clamped() {
        assert!(Question::RetirementAge.is_valid(&FormAnswers::default()));
        assert_eq!(clamp_retirement_age(50), 62);
        assert_eq!(clamp_retirement_age(70), 68);
        assert_eq!(clamp_retirement_age(64), 64);
    }

    #[test]
    fn choice_by_index_or_label() {
        let p = Question::Gender.accept_input("2").unwrap();
        assert_eq!(p.gender, Some(Gender::Female));
        let p = Question::Gender.accept_input("masculino").unwrap();
        assert_eq!(p.gender, Some(Gender::Male));
        let p = Question::Education.accept_input("1").unwrap();
        assert_eq!(p.education, Some(EducationLevel::Postgraduate));
        let p = Question::Education.accept_input("universitaria completa").unwrap();
        assert_eq!(p.education, Some(EducationLevel::UniversityComplete));
        assert!(Question::Education.accept_input("7").is_err());
        assert!(Question::Gender.accept_input("0").is_err());
    }

    // -- inline errors --

    #[test]
    fn errors_hidden_until_validation_shown() {
        let a = FormAnswers::default();
        for q in QUESTIONS {
            assert!(q.field_errors(&a, false).is_empty());
        }
        let errors = Question::Name.field_errors(&a, true);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, Field::Name);
    }

    #[test]
    fn valid_question_reports_no_errors() {
        for q in QUESTIONS {
            assert!(q.field_errors(&complete(), true).is_empty());
        }
    }

    #[test]
    fn age_errors_name_the_bad_component() {
        let errors = Question::Age.field_errors(&with_age(30, 12), true);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, Field::AgeMonths);
    }

    // -- display --

    #[test]
    fn summary_display() {
        let a = complete();
        assert_eq!(Question::AccountBalance.display_answer(&a), "$5.000.000");
        assert_eq!(Question::Gender.display_answer(&a), "Femenino");
        assert_eq!(Question::Age.display_answer(&a), "30 años y 0 meses");
        assert_eq!(Question::echo_amount(0), "");
        assert_eq!(Question::echo_amount(1_200_000), "1.200.000");
    }
}
