#[derive(thiserror::Error, Debug)]
pub enum ConfigErrorKind {
    #[error("Config path `{path}` is not a section, found {found}")]
    NotASection { path: String, found: &'static str },
    #[error("Config document can't be parsed")]
    Parse(#[source] serde_json::Error),
    #[error("Config path `{path}` can't be deserialized")]
    Deserialize {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
