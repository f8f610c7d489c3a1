//! Line-oriented terminal front-end.
//!
//! Renders the question, summary and results screens as text and maps
//! input lines onto [`WizardController`] actions. Input and output are
//! generic so the same loop runs against stdin/stdout or in-memory buffers.

use std::io::Write;

use pension_core::answers::{EducationLevel, Gender};
use pension_core::chat::agent_name;
use pension_core::questions::{Question, QUESTIONS, QUESTION_COUNT};
use pension_core::wizard::WizardPhase;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio_util::sync::CancellationToken;

use crate::controller::{EmailOutcome, WizardController};
use crate::intro::IntroEvent;

const BACK: &str = "<";
const QUIT: &str = "q";

pub struct Terminal<R, W> {
    lines: Lines<R>,
    out: W,
}

impl<R, W> Terminal<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(input: R, out: W) -> Self {
        Self {
            lines: input.lines(),
            out,
        }
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Drive `controller` until the user quits or input ends.
    pub async fn run(&mut self, controller: &mut WizardController) -> std::io::Result<()> {
        writeln!(self.out, "Calculadora de Pensiones")?;
        writeln!(
            self.out,
            "Conoce cómo la reforma previsional afectará tu pensión ('{QUIT}' para salir)"
        )?;

        loop {
            let keep_going = match controller.phase() {
                WizardPhase::Questioning(index) => self.question_screen(controller, index).await?,
                WizardPhase::Summary | WizardPhase::Calculating => {
                    self.summary_screen(controller).await?
                }
                WizardPhase::Results => self.results_screen(controller).await?,
            };
            if !keep_going {
                return Ok(());
            }
        }
    }

    // ---- screens ----

    async fn question_screen(
        &mut self,
        controller: &mut WizardController,
        index: usize,
    ) -> std::io::Result<bool> {
        let Some(question) = controller.phase().question() else {
            return Ok(false);
        };

        writeln!(self.out)?;
        writeln!(self.out, "Paso {} de {QUESTION_COUNT}", index + 1)?;
        writeln!(self.out, "{}", question.title())?;
        if let Some(hint) = question.hint() {
            writeln!(self.out, "  {hint}")?;
        }
        for (i, option) in options(question).iter().enumerate() {
            writeln!(self.out, "  {}) {option}", i + 1)?;
        }
        writeln!(self.out, "  Actual: {}", question.display_answer(controller.answers()))?;
        for error in controller.field_errors() {
            writeln!(self.out, "  ! {}", error.message)?;
        }
        write!(self.out, "> ")?;
        self.out.flush()?;

        let Some(line) = self.read_line().await? else {
            return Ok(false);
        };
        match line.as_str() {
            QUIT => return Ok(false),
            BACK => {
                if let Err(e) = controller.previous() {
                    writeln!(self.out, "{}", e.user_message())?;
                }
                return Ok(true);
            }
            "" => {}
            raw => {
                if let Err(e) = controller.answer_current(raw) {
                    writeln!(self.out, "{}", e.user_message())?;
                    return Ok(true);
                }
            }
        }

        // A blocked advance shows its inline errors on the next render.
        if let Err(e) = controller.next() {
            writeln!(self.out, "{}", e.user_message())?;
        }
        Ok(true)
    }

    async fn summary_screen(&mut self, controller: &mut WizardController) -> std::io::Result<bool> {
        writeln!(self.out)?;
        writeln!(self.out, "Resumen de tus respuestas")?;
        for (i, question) in QUESTIONS.iter().enumerate() {
            writeln!(
                self.out,
                "  {}. {}: {}",
                i + 1,
                question.title(),
                question.display_answer(controller.answers())
            )?;
        }
        if let Some(error) = &controller.progress().last_error {
            writeln!(self.out, "  ! {error}")?;
        }
        writeln!(
            self.out,
            "Enter para calcular, un número para editar esa respuesta, '{BACK}' para volver"
        )?;
        write!(self.out, "> ")?;
        self.out.flush()?;

        let Some(line) = self.read_line().await? else {
            return Ok(false);
        };
        match line.as_str() {
            QUIT => return Ok(false),
            BACK => {
                if let Err(e) = controller.previous() {
                    writeln!(self.out, "{}", e.user_message())?;
                }
            }
            "" => {
                writeln!(self.out, "Calculando...")?;
                self.out.flush()?;
                if let Err(e) = controller.calculate().await {
                    writeln!(self.out, "{}", e.user_message())?;
                }
            }
            raw => match raw.parse::<usize>() {
                Ok(n) if n >= 1 => {
                    if let Err(e) = controller.edit(n - 1) {
                        writeln!(self.out, "{}", e.user_message())?;
                    }
                }
                _ => writeln!(self.out, "Opción no válida")?,
            },
        }
        Ok(true)
    }

    async fn results_screen(&mut self, controller: &mut WizardController) -> std::io::Result<bool> {
        writeln!(self.out)?;
        if let Some(comparison) = controller.comparison() {
            for line in comparison.render_lines() {
                writeln!(self.out, "  {line}")?;
            }
        }
        writeln!(
            self.out,
            "'chat' para conversar, 'email <correo> [si]' para recibir el informe, \
             'r' para recalcular"
        )?;
        write!(self.out, "> ")?;
        self.out.flush()?;

        let Some(line) = self.read_line().await? else {
            return Ok(false);
        };
        let mut words = line.split_whitespace();
        match words.next().unwrap_or_default() {
            QUIT => return Ok(false),
            "r" => {
                if let Err(e) = controller.recalculate() {
                    writeln!(self.out, "{}", e.user_message())?;
                }
            }
            "chat" => return self.chat_screen(controller).await,
            "email" => {
                let address = words.next().unwrap_or_default();
                let opt_in = matches!(words.next(), Some("si" | "sí"));
                match controller.send_email_report(address, opt_in).await {
                    Ok(EmailOutcome::Sent(receipt)) => {
                        writeln!(self.out, "Informe enviado a {}", receipt.details.email)?
                    }
                    Ok(EmailOutcome::AlreadySent) => {
                        writeln!(self.out, "El informe ya fue enviado")?
                    }
                    Err(e) => writeln!(self.out, "{}", e.user_message())?,
                }
            }
            _ => writeln!(self.out, "Opción no válida")?,
        }
        Ok(true)
    }

    async fn chat_screen(&mut self, controller: &mut WizardController) -> std::io::Result<bool> {
        let agent = agent_name(controller.answers().gender);
        writeln!(self.out)?;
        writeln!(self.out, "Chat con {agent} (línea vacía para volver)")?;
        for message in controller.transcript().iter() {
            let speaker = if message.is_user { "Tú" } else { agent };
            writeln!(self.out, "{speaker}: {}", message.content)?;
        }

        let out = &mut self.out;
        let mut failed = None;
        let intro = controller
            .open_chat(&CancellationToken::new(), |event| {
                let written = match event {
                    IntroEvent::Typing => writeln!(out, "{agent} está escribiendo..."),
                    IntroEvent::Message(text) => writeln!(out, "{agent}: {text}"),
                };
                if let Err(e) = written.and_then(|_| out.flush()) {
                    if failed.is_none() {
                        failed = Some(e);
                    }
                }
            })
            .await;
        if let Some(e) = failed {
            return Err(e);
        }
        if let Err(e) = intro {
            writeln!(self.out, "{}", e.user_message())?;
            return Ok(true);
        }

        loop {
            write!(self.out, "Tú: ")?;
            self.out.flush()?;
            let Some(line) = self.read_line().await? else {
                return Ok(false);
            };
            if line.is_empty() {
                return Ok(true);
            }
            match controller.send_chat(&line).await {
                Ok(reply) => writeln!(self.out, "{agent}: {}", reply.content)?,
                Err(e) => writeln!(self.out, "{}", e.user_message())?,
            }
        }
    }

    async fn read_line(&mut self) -> std::io::Result<Option<String>> {
        Ok(self
            .lines
            .next_line()
            .await?
            .map(|line| line.trim().to_string()))
    }
}

/// Choices listed under a selector question; picked by number or label.
fn options(question: Question) -> Vec<&'static str> {
    match question {
        Question::Gender => Gender::ALL.iter().map(|g| g.label()).collect(),
        Question::Education => EducationLevel::ALL.iter().map(|l| l.label()).collect(),
        _ => Vec::new(),
    }
}
