//! Confirmation prompts shown before destructive or approval actions.

use std::fmt;

use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::prelude::*;
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::action::Action;
use crate::components::Component;
use crate::components::dialog_layout::split_dialog_area;
use crate::config::Styles;

const DISMISS_LABEL: &str = "Volver";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Danger,
    Success,
    Warning,
    Info,
}

/// Kind of absence request handled by the approval screens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Vacation request
    Vacaciones,
    /// Sick leave or other absence
    Baja,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vacaciones => "vacaciones",
            Self::Baja => "baja",
        }
    }

    fn title_noun(&self) -> &'static str {
        match self {
            Self::Vacaciones => "Vacaciones",
            Self::Baja => "Ausencia",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a confirmation dialog shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmRequest {
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub confirm_label: String,
}

impl ConfirmRequest {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
        confirm_label: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            severity,
            confirm_label: confirm_label.into(),
        }
    }

    /// Employee cancels a vacation request. Pending requests are withdrawn
    /// outright; approved ones need the cancellation approved.
    pub fn cancel_vacation(estado: &str, fechas: &str) -> Self {
        if estado == "pendiente" {
            Self::new(
                "Cancelar Solicitud",
                format!("¿Estás seguro de que deseas cancelar tu solicitud de vacaciones ({fechas})?"),
                Severity::Danger,
                "Cancelar",
            )
        } else {
            Self::new(
                "Solicitar Cancelación",
                format!(
                    "¿Estás seguro de que deseas solicitar la cancelación de tus vacaciones aprobadas ({fechas})?\n\nEsta acción requerirá aprobación."
                ),
                Severity::Danger,
                "Cancelar",
            )
        }
    }

    pub fn cancel_leave(fechas: &str) -> Self {
        Self::new(
            "Cancelar Solicitud de Baja",
            format!("¿Estás seguro de que deseas cancelar tu solicitud de baja/ausencia ({fechas})?"),
            Severity::Danger,
            "Cancelar",
        )
    }

    pub fn delete_clock_in(fecha: &str) -> Self {
        Self::new(
            "Eliminar Fichaje",
            format!(
                "¿Estás seguro de que deseas eliminar tu fichaje del {fecha}?\n\nEsta acción no se puede deshacer."
            ),
            Severity::Danger,
            "Eliminar",
        )
    }

    pub fn approve_request(kind: RequestKind, usuario: &str, fechas: &str, dias: &str) -> Self {
        Self::new(
            format!("Aprobar {}", kind.title_noun()),
            format!(
                "¿Aprobar la solicitud de {kind} de \"{usuario}\"?\n\nPeríodo: {fechas}\nDías: {dias}"
            ),
            Severity::Success,
            "Aprobar",
        )
    }

    pub fn reject_request(kind: RequestKind, usuario: &str, fechas: &str) -> Self {
        Self::new(
            format!("Rechazar {}", kind.title_noun()),
            format!(
                "¿Estás seguro de que deseas rechazar la solicitud de {kind} de \"{usuario}\"?\n\nPeríodo: {fechas}\n\nEsta acción notificará al empleado."
            ),
            Severity::Danger,
            "Rechazar",
        )
    }
}

/// Callback run when the user accepts a confirmation
pub type OnConfirm = Box<dyn FnOnce() + Send>;

/// Something able to ask the user for confirmation.
///
/// `on_confirm` runs only if the user accepts; dismissing drops it.
pub trait ConfirmModal {
    fn show(&mut self, request: ConfirmRequest, on_confirm: OnConfirm);
}

/// Ask for confirmation, then submit `form_id` through the action channel
pub fn confirm_then_submit<M: ConfirmModal + ?Sized>(
    modal: &mut M,
    request: ConfirmRequest,
    form_id: impl Into<String>,
    tx: UnboundedSender<Action>,
) {
    let form_id = form_id.into();
    modal.show(
        request,
        Box::new(move || {
            if let Err(e) = tx.send(Action::SubmitForm(form_id)) {
                warn!("Confirmed form submission was dropped: {e}");
            }
        }),
    );
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Confirm,
    Dismiss,
}

/// Terminal rendition of the confirmation modal
pub struct ConfirmDialog {
    request: Option<ConfirmRequest>,
    on_confirm: Option<OnConfirm>,
    focus: Focus,
    styles: Styles,
    pub show_instructions: bool,
}

impl fmt::Debug for ConfirmDialog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfirmDialog")
            .field("request", &self.request)
            .field("focus", &self.focus)
            .finish_non_exhaustive()
    }
}

impl Default for ConfirmDialog {
    fn default() -> Self {
        Self::new(Styles::default())
    }
}

impl ConfirmModal for ConfirmDialog {
    fn show(&mut self, request: ConfirmRequest, on_confirm: OnConfirm) {
        debug!("Showing confirmation '{}'", request.title);
        self.request = Some(request);
        self.on_confirm = Some(on_confirm);
        // Destructive prompts start on the safe choice
        self.focus = Focus::Dismiss;
    }
}

impl ConfirmDialog {
    pub fn new(styles: Styles) -> Self {
        Self {
            request: None,
            on_confirm: None,
            focus: Focus::Dismiss,
            styles,
            show_instructions: true,
        }
    }

    pub fn is_open(&self) -> bool {
        self.request.is_some()
    }

    pub fn request(&self) -> Option<&ConfirmRequest> {
        self.request.as_ref()
    }

    fn accept(&mut self) -> Option<Action> {
        self.request = None;
        if let Some(on_confirm) = self.on_confirm.take() {
            on_confirm();
        }
        Some(Action::ConfirmAccepted)
    }

    fn dismiss(&mut self) -> Option<Action> {
        self.request = None;
        self.on_confirm = None;
        Some(Action::DialogClose)
    }

    fn modal_area(&self, area: Rect, message: &str) -> Rect {
        let width = area.width.clamp(24, 60);
        let wrapped = textwrap::wrap(message, width.saturating_sub(4) as usize);
        let height = (wrapped.len() as u16)
            .saturating_add(6) // borders, padding, buttons
            .clamp(7, area.height.max(7));
        let x = area.x + area.width.saturating_sub(width) / 2;
        let y = area.y + area.height.saturating_sub(height) / 2;
        Rect { x, y, width, height }.intersection(area)
    }

    pub fn render(&self, area: Rect, buf: &mut Buffer) {
        let Some(request) = &self.request else { return };
        let accent = self.styles.for_severity(request.severity);
        let instructions = "Enter: elegir  ←/→: cambiar  y: confirmar  Esc: volver";
        let layout = split_dialog_area(area, self.show_instructions, Some(instructions));
        let modal = self.modal_area(layout.content_area, &request.message);

        Clear.render(modal, buf);
        let block = Block::default()
            .title(Line::from(format!(" {} ", request.title)).style(accent))
            .borders(Borders::ALL)
            .border_type(BorderType::Double)
            .border_style(Style::default().fg(accent.bg.unwrap_or(Color::White)));
        let inner = block.inner(modal);
        block.render(modal, buf);

        let body = Rect {
            height: inner.height.saturating_sub(2),
            ..inner
        };
        Paragraph::new(request.message.as_str())
            .wrap(Wrap { trim: false })
            .render(body, buf);

        let confirm = format!("[ {} ]", request.confirm_label);
        let dismiss = format!("[ {DISMISS_LABEL} ]");
        let (confirm_style, dismiss_style) = match self.focus {
            Focus::Confirm => (accent, Style::default().fg(Color::Gray)),
            Focus::Dismiss => (
                Style::default().fg(Color::Gray),
                Style::default().fg(Color::Black).bg(Color::White),
            ),
        };
        let buttons_y = inner.y + inner.height.saturating_sub(1);
        let dismiss_x = inner.x + inner.width.saturating_sub(dismiss.chars().count() as u16 + 1);
        let confirm_x = dismiss_x.saturating_sub(confirm.chars().count() as u16 + 2);
        buf.set_string(confirm_x, buttons_y, &confirm, confirm_style);
        buf.set_string(dismiss_x, buttons_y, &dismiss, dismiss_style);

        if let Some(inst_area) = layout.instructions_area {
            Paragraph::new(instructions)
                .block(Block::default().borders(Borders::ALL).title("Instrucciones"))
                .style(Style::default().fg(Color::Yellow))
                .wrap(Wrap { trim: true })
                .render(inst_area, buf);
        }
    }
}

impl Component for ConfirmDialog {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if key.kind != KeyEventKind::Press || !self.is_open() {
            return Ok(None);
        }
        let action = match key.code {
            KeyCode::Char('y') | KeyCode::Char('s') => self.accept(),
            KeyCode::Char('n') | KeyCode::Esc => self.dismiss(),
            KeyCode::Left | KeyCode::Right | KeyCode::Tab | KeyCode::BackTab => {
                self.focus = match self.focus {
                    Focus::Confirm => Focus::Dismiss,
                    Focus::Dismiss => Focus::Confirm,
                };
                None
            }
            KeyCode::Enter => match self.focus {
                Focus::Confirm => self.accept(),
                Focus::Dismiss => self.dismiss(),
            },
            _ => None,
        };
        Ok(action)
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()> {
        self.render(area, frame.buffer_mut());
        Ok(())
    }
}
