use thiserror::Error;

/// Rejected input. Every variant is recoverable and meant to be shown to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Este e-mail já está em uso.")]
    DuplicateEmail,
    #[error("Este código de organizador já está em uso.")]
    DuplicateOrganizerCode,
    #[error("O campo \"{0}\" não pode estar vazio.")]
    EmptyField(&'static str),
    #[error("O código de sorteio \"{0}\" já existe.")]
    DuplicateRaffleCode(String),
    #[error("{kind} não encontrado: {id:?}")]
    UnresolvedReference { kind: &'static str, id: String },
    #[error("Este e-mail já está cadastrado neste sorteio.")]
    DuplicateRegistration,
    #[error("A quantidade deve ser pelo menos 1.")]
    InvalidQuantity,
}

impl ValidationError {
    pub fn unresolved(kind: &'static str, id: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            kind,
            id: id.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("E-mail ou senha inválidos.")]
    InvalidCredentials,
    #[error("Nenhum organizador logado.")]
    NotLoggedIn,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} não encontrado: {key:?}")]
pub struct NotFound {
    pub kind: &'static str,
    pub key: String,
}

impl NotFound {
    pub fn new(kind: &'static str, key: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
        }
    }
}
