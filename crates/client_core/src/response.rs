//! Employee response to a single request: a correction comment or a
//! certification upload, with client-side attachment validation.

use std::collections::BTreeMap;
use std::sync::Arc;

use shared::{
    error::GatewayError,
    protocol::{FileCandidate, RequestSummary},
};
use thiserror::Error;
use tracing::{info, warn};

use crate::{FileProbe, RequestGateway, ScreenNavigator};

const COMMENT_MIN_CHARS: usize = 10;
const COMMENT_MAX_CHARS: usize = 250;
const MAX_FILE_SIZE_BYTES: u64 = 5 * 1024 * 1024;
const ALLOWED_EXTENSIONS: [&str; 4] = ["pdf", "jpg", "jpeg", "png"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseChoice {
    Correction,
    Certification,
}

/// Form slot a validation message is attached to. `File` carries the
/// position of the offending file within the selected batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FieldKey {
    Comment,
    File(usize),
}

/// Per-file rules, checked in order with the first failure winning. The
/// display texts are the product copy shown next to the upload control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AttachmentRuleViolation {
    #[error("El archivo está vacío (0KB)")]
    Empty,
    #[error("El archivo excede el tamaño máximo de 5MB")]
    OverSizeLimit,
    #[error("Formato no permitido. Solo se aceptan: .pdf, .jpg, .jpeg, .png")]
    DisallowedFormat,
    #[error("El archivo está corrupto o no se puede leer")]
    Unreadable,
}

#[derive(Debug, Error)]
pub enum ResponseOpenError {
    #[error("no request found for tracking number {tracking_number}")]
    NotFound { tracking_number: String },
    #[error("request {tracking_number} is in state \"{state_label}\" and does not accept a response")]
    NotRespondable {
        tracking_number: String,
        state_label: &'static str,
    },
    #[error(transparent)]
    Gateway(GatewayError),
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("a submission is already in flight")]
    AlreadySending,
    #[error("the form is not ready to submit")]
    NotReady,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    CorrectionReturned,
    CertificationSent,
}

/// One in-progress reply to one request. Created when the response screen
/// opens, torn down by the caller after a successful submission.
pub struct ResponseWorkflow {
    gateway: Arc<dyn RequestGateway>,
    navigator: Arc<dyn ScreenNavigator>,
    probe: Arc<dyn FileProbe>,
    request: RequestSummary,
    choice: Option<ResponseChoice>,
    comment: String,
    selected: Vec<FileCandidate>,
    field_errors: BTreeMap<FieldKey, String>,
    sending: bool,
}

impl std::fmt::Debug for ResponseWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseWorkflow")
            .field("request", &self.request)
            .field("choice", &self.choice)
            .field("comment", &self.comment)
            .field("selected", &self.selected)
            .field("field_errors", &self.field_errors)
            .field("sending", &self.sending)
            .finish_non_exhaustive()
    }
}

impl ResponseWorkflow {
    /// Loads the request and applies the same respondability gate the
    /// listing uses to enable the action.
    pub async fn open(
        gateway: Arc<dyn RequestGateway>,
        navigator: Arc<dyn ScreenNavigator>,
        probe: Arc<dyn FileProbe>,
        tracking_number: &str,
    ) -> Result<Self, ResponseOpenError> {
        let request = gateway
            .fetch_one(tracking_number)
            .await
            .map_err(|err| match err {
                GatewayError::NotFound { tracking_number } => {
                    ResponseOpenError::NotFound { tracking_number }
                }
                other => ResponseOpenError::Gateway(other),
            })?;

        if !request.state.accepts_response() {
            warn!(
                tracking_number,
                state = request.state.0,
                "response: request does not accept a response"
            );
            return Err(ResponseOpenError::NotRespondable {
                tracking_number: tracking_number.to_string(),
                state_label: request.state.label(),
            });
        }

        info!(tracking_number, "response: workflow opened");
        Ok(Self {
            gateway,
            navigator,
            probe,
            request,
            choice: None,
            comment: String::new(),
            selected: Vec::new(),
            field_errors: BTreeMap::new(),
            sending: false,
        })
    }

    pub fn request(&self) -> &RequestSummary {
        &self.request
    }

    pub fn choice(&self) -> Option<ResponseChoice> {
        self.choice
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn selected_files(&self) -> &[FileCandidate] {
        &self.selected
    }

    pub fn field_errors(&self) -> &BTreeMap<FieldKey, String> {
        &self.field_errors
    }

    pub fn comment_error(&self) -> Option<&str> {
        self.field_errors.get(&FieldKey::Comment).map(String::as_str)
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    /// Switching the reply type discards everything entered so far.
    pub fn set_response_choice(&mut self, choice: Option<ResponseChoice>) {
        self.choice = choice;
        self.comment.clear();
        self.selected.clear();
        self.field_errors.clear();
    }

    /// Stores the comment on every keystroke; in correction mode the length
    /// bounds are re-checked live and the violated bound's message recorded.
    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = comment.into();
        if self.choice != Some(ResponseChoice::Correction) {
            return;
        }
        let length = self.comment.chars().count();
        if length < COMMENT_MIN_CHARS {
            self.field_errors.insert(
                FieldKey::Comment,
                format!("El comentario debe tener al menos {COMMENT_MIN_CHARS} caracteres"),
            );
        } else if length > COMMENT_MAX_CHARS {
            self.field_errors.insert(
                FieldKey::Comment,
                format!("El comentario no puede exceder {COMMENT_MAX_CHARS} caracteres"),
            );
        } else {
            self.field_errors.remove(&FieldKey::Comment);
        }
    }

    /// A batch is all-or-nothing: one failing file keeps the whole batch out
    /// of the selection, and each failure is recorded keyed by its position
    /// in the batch. A fully valid batch replaces the previous selection.
    pub fn select_files(&mut self, batch: Vec<FileCandidate>) {
        let mut rejected = BTreeMap::new();
        for (position, candidate) in batch.iter().enumerate() {
            if let Err(violation) = self.validate_candidate(candidate) {
                warn!(
                    "response: rejected file {} at position {position}: {violation}",
                    candidate.name
                );
                rejected.insert(FieldKey::File(position), violation.to_string());
            }
        }

        if rejected.is_empty() {
            info!(files = batch.len(), "response: selection accepted");
            self.selected = batch;
            self.field_errors
                .retain(|key, _| !matches!(key, FieldKey::File(_)));
        } else {
            self.field_errors.extend(rejected);
        }
    }

    pub fn remove_file(&mut self, index: usize) {
        if index < self.selected.len() {
            self.selected.remove(index);
        }
    }

    pub fn is_ready(&self) -> bool {
        match self.choice {
            None => false,
            Some(ResponseChoice::Correction) => {
                let length = self.comment.chars().count();
                (COMMENT_MIN_CHARS..=COMMENT_MAX_CHARS).contains(&length)
                    && !self.field_errors.contains_key(&FieldKey::Comment)
            }
            Some(ResponseChoice::Certification) => {
                !self.selected.is_empty()
                    && !self
                        .field_errors
                        .keys()
                        .any(|key| matches!(key, FieldKey::File(_)))
            }
        }
    }

    /// Fires exactly one of the two submission actions. While a submission
    /// is in flight a second attempt is refused outright; the host keeps the
    /// form controls disabled off `is_sending`. A transport failure leaves
    /// every field untouched so the employee can retry.
    pub async fn submit(&mut self) -> Result<SubmitOutcome, SubmitError> {
        if self.sending {
            return Err(SubmitError::AlreadySending);
        }
        if !self.is_ready() {
            return Err(SubmitError::NotReady);
        }
        let Some(choice) = self.choice else {
            return Err(SubmitError::NotReady);
        };

        self.sending = true;
        let outcome = match choice {
            ResponseChoice::Correction => self
                .gateway
                .submit_correction(self.request.id, &self.comment)
                .await
                .map(|()| SubmitOutcome::CorrectionReturned),
            ResponseChoice::Certification => self
                .gateway
                .submit_certification(&self.request.tracking_number, &self.selected)
                .await
                .map(|()| SubmitOutcome::CertificationSent),
        };
        self.sending = false;

        match outcome {
            Ok(outcome) => {
                info!(
                    tracking_number = self.request.tracking_number.as_str(),
                    "response: submission accepted"
                );
                self.navigator.return_to_previous();
                Ok(outcome)
            }
            Err(err) => {
                warn!(
                    tracking_number = self.request.tracking_number.as_str(),
                    "response: submission failed: {err}"
                );
                Err(SubmitError::Gateway(err))
            }
        }
    }

    fn validate_candidate(
        &self,
        candidate: &FileCandidate,
    ) -> Result<(), AttachmentRuleViolation> {
        if candidate.size_bytes == 0 {
            return Err(AttachmentRuleViolation::Empty);
        }
        if candidate.size_bytes > MAX_FILE_SIZE_BYTES {
            return Err(AttachmentRuleViolation::OverSizeLimit);
        }

        let allowed = candidate
            .name
            .rsplit_once('.')
            .map(|(_, extension)| {
                let extension = extension.to_lowercase();
                ALLOWED_EXTENSIONS.contains(&extension.as_str())
            })
            .unwrap_or(false);
        if !allowed {
            return Err(AttachmentRuleViolation::DisallowedFormat);
        }

        if !self.probe.can_read(candidate) {
            return Err(AttachmentRuleViolation::Unreadable);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/response_tests.rs"]
mod tests;
