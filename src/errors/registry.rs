#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryErrorKind {
    #[error("Duplicate registration of `{name}` for type {type_name}")]
    Duplicate { type_name: &'static str, name: String },
    #[error("Duplicate service registration `{name}` in service context")]
    DuplicateService { name: String },
}
