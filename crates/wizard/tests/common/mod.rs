#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use pension_client::api::{ApiError, EmailDetails, EmailReceipt};
use pension_client::chat::{ChatError, ChatRequest};
use pension_client::services::{CalculationService, ChatService, ReportService};
use pension_core::answers::{AnswersPatch, EducationLevel, FormAnswers, Gender};
use pension_core::calculation::CalculationResult;
use pension_core::types::SessionId;
use pension_wizard::controller::{Services, WizardController};
use pension_wizard::state::WizardStore;
use pension_wizard::storage::Storage;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Every answer of the "Ana" scenario as one patch.
pub fn ana_patch() -> AnswersPatch {
    AnswersPatch {
        name: Some("Ana".into()),
        age_years: Some(30),
        age_months: Some(0),
        gender: Some(Gender::Female),
        retirement_age: Some(65),
        account_balance: Some(5_000_000),
        gross_salary: Some(1_200_000),
        ideal_pension: Some(800_000),
        education: Some(EducationLevel::UniversityComplete),
    }
}

pub fn ana_answers() -> FormAnswers {
    let mut answers = FormAnswers::default();
    answers.apply(ana_patch());
    answers
}

pub fn result_json() -> serde_json::Value {
    serde_json::json!({
        "pre_reforma": {
            "saldo_acumulado": {
                "saldo_cuenta_individual": 60000000.0,
                "aporte_trabajador": 30000000.0,
                "aporte_empleador": 0.0,
                "rentabilidad_acumulada": 25000000.0
            },
            "aporte_sis": 0.0,
            "pension_mensual_base": 300000.0,
            "pension_total": 400000.0,
            "pgu_aplicada": true
        },
        "post_reforma": {
            "saldo_acumulado": {
                "saldo_cuenta_individual": 75000000.0,
                "aporte_trabajador": 30000000.0,
                "aporte_empleador": 12000000.0,
                "rentabilidad_acumulada": 28000000.0
            },
            "aporte_sis": 1500000.0,
            "aporte_compensacion_expectativa_vida": 800000.0,
            "balance_fapp": 2000000.0,
            "bono_seguridad_previsional": 25000.0,
            "pension_mensual_base": 380000.0,
            "pension_adicional_compensacion": 15000.0,
            "pension_total": 500000.0,
            "pgu_aplicada": true
        },
        "pension_objetivo": {
            "valor_presente": 800000.0,
            "valor_futuro": 1900000.0,
            "tasa_inflacion_anual": 0.03,
            "brecha_mensual_post_reforma": 1400000.0
        },
        "metadata": {
            "nombre": "Ana",
            "edad": 30,
            "genero": "F",
            "edad_jubilacion": 65,
            "balance_actual": 5000000,
            "salario_mensual": 1200000,
            "estudios": "Universitaria completa",
            "expectativa_vida": 90
        }
    })
}

pub fn sample_result() -> CalculationResult {
    serde_json::from_value(result_json()).unwrap()
}

// ---------------------------------------------------------------------------
// Stub services
// ---------------------------------------------------------------------------

/// How the stub calculation service answers.
#[derive(Debug, Clone)]
pub enum CalcBehavior {
    Succeed(CalculationResult),
    Reject { status: u16, message: String },
    TimeOut,
    /// Never answers; only cancellation ends the call.
    Hang,
}

pub struct StubCalculation {
    pub behavior: Mutex<CalcBehavior>,
    pub calls: AtomicUsize,
    pub last_session: Mutex<Option<SessionId>>,
    /// Results the "server" knows by session id.
    pub stored: Mutex<HashMap<SessionId, CalculationResult>>,
    /// When set, session lookups fail with a transport-level error.
    pub lookup_fails: Mutex<bool>,
    pub lookups: AtomicUsize,
}

impl StubCalculation {
    pub fn new(behavior: CalcBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior: Mutex::new(behavior),
            calls: AtomicUsize::new(0),
            last_session: Mutex::new(None),
            stored: Mutex::new(HashMap::new()),
            lookup_fails: Mutex::new(false),
            lookups: AtomicUsize::new(0),
        })
    }

    pub fn succeeding() -> Arc<Self> {
        Self::new(CalcBehavior::Succeed(sample_result()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CalculationService for StubCalculation {
    async fn calculate(
        &self,
        _answers: &FormAnswers,
        session_id: &SessionId,
        cancel: &CancellationToken,
    ) -> Result<CalculationResult, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_session.lock().unwrap() = Some(session_id.clone());
        let behavior = self.behavior.lock().unwrap().clone();
        match behavior {
            CalcBehavior::Succeed(result) => {
                self.stored
                    .lock()
                    .unwrap()
                    .insert(session_id.clone(), result.clone());
                Ok(result)
            }
            CalcBehavior::Reject { status, message } => Err(ApiError::Rejected { status, message }),
            CalcBehavior::TimeOut => Err(ApiError::Timeout {
                after: std::time::Duration::from_secs(10),
            }),
            CalcBehavior::Hang => {
                cancel.cancelled().await;
                Err(ApiError::Cancelled)
            }
        }
    }

    async fn fetch_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<CalculationResult>, ApiError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if *self.lookup_fails.lock().unwrap() {
            return Err(ApiError::Rejected {
                status: 500,
                message: pension_client::api::GENERIC_SESSION_ERROR.into(),
            });
        }
        Ok(self.stored.lock().unwrap().get(session_id).cloned())
    }
}

#[derive(Default)]
pub struct StubReports {
    pub calls: AtomicUsize,
    pub session_missing: Mutex<bool>,
}

#[async_trait]
impl ReportService for StubReports {
    async fn send_email_report(
        &self,
        _session_id: &SessionId,
        email: &str,
        opt_in: bool,
    ) -> Result<EmailReceipt, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if *self.session_missing.lock().unwrap() {
            return Err(ApiError::SessionNotFound);
        }
        Ok(EmailReceipt {
            message: "Email enviado".into(),
            details: EmailDetails {
                email: email.to_string(),
                sent_date: "2025-01-10T12:00:00".into(),
                optin_comercial: opt_in,
            },
        })
    }
}

/// Chat agent that echoes, unless a scripted failure is queued.
#[derive(Default)]
pub struct StubChat {
    pub failures: Mutex<VecDeque<ChatError>>,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl StubChat {
    pub fn fail_next(&self, error: ChatError) {
        self.failures.lock().unwrap().push_back(error);
    }
}

#[async_trait]
impl ChatService for StubChat {
    async fn try_send(&self, request: &ChatRequest) -> Result<String, ChatError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(format!("eco: {}", request.user_message))
    }
}

pub struct Stubs {
    pub calculation: Arc<StubCalculation>,
    pub reports: Arc<StubReports>,
    pub chat: Arc<StubChat>,
}

impl Stubs {
    pub fn new(calculation: Arc<StubCalculation>) -> Self {
        Self {
            calculation,
            reports: Arc::default(),
            chat: Arc::default(),
        }
    }

    pub fn services(&self) -> Services {
        Services {
            calculation: self.calculation.clone(),
            reports: self.reports.clone(),
            chat: self.chat.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Controller helpers
// ---------------------------------------------------------------------------

/// Answer everything and walk to the summary.
pub fn walk_to_summary(controller: &mut WizardController) {
    controller.set_answer(ana_patch());
    for _ in 0..pension_core::questions::QUESTION_COUNT {
        controller.next().unwrap();
    }
}

/// A controller already showing a result.
pub async fn controller_in_results(storage: Storage, stubs: &Stubs) -> WizardController {
    let mut store = WizardStore::load(storage.clone());
    store.set_answer(ana_patch());
    store.record_result(sample_result());
    drop(store);

    let mut controller = WizardController::new(storage, stubs.services());
    controller.load().await;
    controller
}

// ---------------------------------------------------------------------------
// HTTP stub server
// ---------------------------------------------------------------------------

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_stub(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}
