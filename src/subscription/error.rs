// src/subscription/error.rs
use std::fmt;

use thiserror::Error;

/// Language of user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    English,
    Portuguese,
}

impl Locale {
    /// "pt", "pt-BR", "pt_PT" → Portuguese; anything else → English.
    pub fn from_tag(tag: &str) -> Self {
        let t = tag.trim().to_ascii_lowercase();
        if t == "pt" || t.starts_with("pt-") || t.starts_with("pt_") {
            Locale::Portuguese
        } else {
            Locale::English
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    PermissionDenied,
    WorkerRegistrationTimeout,
    WorkerInactive,
    PushManagerUnavailable,
    SubscribeRejected,
    PersistFailed,
    UnsubscribeRejected,
}

impl FailureReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureReason::PermissionDenied => "permission-denied",
            FailureReason::WorkerRegistrationTimeout => "worker-registration-timeout",
            FailureReason::WorkerInactive => "worker-inactive",
            FailureReason::PushManagerUnavailable => "push-manager-unavailable",
            FailureReason::SubscribeRejected => "subscribe-rejected",
            FailureReason::PersistFailed => "persist-failed",
            FailureReason::UnsubscribeRejected => "unsubscribe-rejected",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lifecycle step failed and the user has to act (re-grant, reinstall, reload).
#[derive(Debug, Error)]
#[error("push subscription failed ({reason}): {detail}")]
pub struct SubscriptionError {
    pub reason: FailureReason,
    pub detail: String,
}

impl SubscriptionError {
    pub fn new(reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }

    /// Message meant to be shown to the user as-is.
    pub fn localized(&self, locale: Locale) -> &'static str {
        use FailureReason::*;
        match (locale, self.reason) {
            (Locale::English, PermissionDenied) => {
                "Notifications are blocked. Allow them in your browser or system settings and try again."
            }
            (Locale::English, WorkerRegistrationTimeout) => {
                "The app's background service did not start in time. Reload the app and try again."
            }
            (Locale::English, WorkerInactive) => {
                "The app's background service is not active yet. Reload the app and try again."
            }
            (Locale::English, PushManagerUnavailable) => {
                "This device cannot receive push notifications. Try reinstalling the app."
            }
            (Locale::English, SubscribeRejected) => {
                "The device refused the notification subscription. Try again later."
            }
            (Locale::English, PersistFailed) => {
                "Could not save your notification settings. Check your connection and try again."
            }
            (Locale::English, UnsubscribeRejected) => {
                "Could not turn notifications off. Try again."
            }
            (Locale::Portuguese, PermissionDenied) => {
                "As notificações estão bloqueadas. Permita-as nas configurações do navegador ou do sistema e tente novamente."
            }
            (Locale::Portuguese, WorkerRegistrationTimeout) => {
                "O serviço em segundo plano do app não iniciou a tempo. Recarregue o app e tente novamente."
            }
            (Locale::Portuguese, WorkerInactive) => {
                "O serviço em segundo plano do app ainda não está ativo. Recarregue o app e tente novamente."
            }
            (Locale::Portuguese, PushManagerUnavailable) => {
                "Este dispositivo não pode receber notificações push. Tente reinstalar o app."
            }
            (Locale::Portuguese, SubscribeRejected) => {
                "O dispositivo recusou a inscrição de notificações. Tente novamente mais tarde."
            }
            (Locale::Portuguese, PersistFailed) => {
                "Não foi possível salvar suas configurações de notificação. Verifique sua conexão e tente novamente."
            }
            (Locale::Portuguese, UnsubscribeRejected) => {
                "Não foi possível desativar as notificações. Tente novamente."
            }
        }
    }
}

/// Why the lifecycle was not even attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guidance {
    /// Runtime has no push support.
    PushUnsupported,
    /// Desktop browser tab: install the app first.
    InstallRequired,
}

impl Guidance {
    pub fn message(self, locale: Locale) -> &'static str {
        match (locale, self) {
            (Locale::English, Guidance::PushUnsupported) => {
                "This browser does not support push notifications."
            }
            (Locale::English, Guidance::InstallRequired) => {
                "Install the app (Add to Home Screen) or open it on your phone to enable notifications."
            }
            (Locale::Portuguese, Guidance::PushUnsupported) => {
                "Este navegador não suporta notificações push."
            }
            (Locale::Portuguese, Guidance::InstallRequired) => {
                "Instale o app (Adicionar à Tela de Início) ou abra-o no celular para ativar as notificações."
            }
        }
    }
}
