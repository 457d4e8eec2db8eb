use thiserror::Error;

/// Rule violations detectable from a record alone, before any backend is asked.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("post title must not be blank")]
    BlankTitle,
    #[error("tag name must not be blank")]
    BlankTagName,
    #[error("locale `{locale}` is not a language tag such as `en` or `pt-BR`")]
    InvalidLocale { locale: String },
}
