#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TagErrorKind {
    #[error("Injection marker `{marker}` has an empty lookup name")]
    EmptyName { marker: String },
    #[error("Injection marker `{marker}` has unknown modifier `{modifier}`")]
    UnknownModifier { marker: String, modifier: String },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InjectErrorKind {
    #[error("Resource not found for field `{field}`: no {type_name} registered as `{name}`")]
    NotFound {
        field: &'static str,
        name: String,
        type_name: &'static str,
    },
}
