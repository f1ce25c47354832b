use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(RequestId);
id_newtype!(AttachmentId);

/// Raw workflow-state code as sent by the upstream service. The service owns
/// the table; codes outside it must flow through without panicking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateCode(pub i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestState {
    New,
    InReview,
    Completed,
    Rejected,
    AwaitingCitizen,
    CitizenReply,
}

/// Which listing tab a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Pending,
    Completed,
}

impl RequestState {
    pub fn from_code(code: StateCode) -> Option<Self> {
        match code.0 {
            1 => Some(Self::New),
            2 => Some(Self::InReview),
            3 => Some(Self::Completed),
            4 => Some(Self::Rejected),
            5 => Some(Self::AwaitingCitizen),
            6 => Some(Self::CitizenReply),
            _ => None,
        }
    }

    pub fn code(self) -> StateCode {
        match self {
            Self::New => StateCode(1),
            Self::InReview => StateCode(2),
            Self::Completed => StateCode(3),
            Self::Rejected => StateCode(4),
            Self::AwaitingCitizen => StateCode(5),
            Self::CitizenReply => StateCode(6),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::New => "Nueva",
            Self::InReview => "En revisión",
            Self::Completed => "Completada",
            Self::Rejected => "Rechazada",
            Self::AwaitingCitizen => "Espera respuesta usuario",
            Self::CitizenReply => "Respuesta de usuario",
        }
    }

    pub fn tab(self) -> Tab {
        match self {
            Self::New | Self::AwaitingCitizen | Self::CitizenReply => Tab::Pending,
            Self::InReview | Self::Completed | Self::Rejected => Tab::Completed,
        }
    }

    /// Rank used by the pending tab's default ordering: a citizen reply needs
    /// attention before a brand-new request, which comes before one still
    /// waiting on the citizen. Everything else shares rank 99.
    pub fn triage_priority(self) -> u8 {
        match self {
            Self::CitizenReply => 1,
            Self::New => 2,
            Self::AwaitingCitizen => 3,
            Self::InReview | Self::Completed | Self::Rejected => 99,
        }
    }

    /// States in which an employee response is allowed. Enforced both when
    /// enabling the listing action and when opening the response screen.
    pub fn accepts_response(self) -> bool {
        matches!(self, Self::New | Self::CitizenReply)
    }
}

impl StateCode {
    pub fn label(self) -> &'static str {
        match RequestState::from_code(self) {
            Some(state) => state.label(),
            None => "Desconocido",
        }
    }

    pub fn tab(self) -> Option<Tab> {
        RequestState::from_code(self).map(RequestState::tab)
    }

    pub fn triage_priority(self) -> u8 {
        match RequestState::from_code(self) {
            Some(state) => state.triage_priority(),
            None => 99,
        }
    }

    pub fn accepts_response(self) -> bool {
        RequestState::from_code(self).is_some_and(RequestState::accepts_response)
    }
}
