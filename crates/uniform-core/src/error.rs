use thiserror::Error;

#[derive(Debug, Error)]
pub enum UniformError {
    #[error("unknown target environment: {0}")]
    UnknownEnvironment(String),

    #[error("missing environment variable {0}")]
    MissingEnvironmentVariable(String),

    #[error("pipeline resource has no declared name")]
    NamelessPipeline,

    #[error("unexpected configuration on action '{action}': change set name is '{found}'")]
    UnexpectedActionConfiguration { action: String, found: String },

    #[error("unknown stage {0}")]
    UnknownStage(String),

    #[error("unknown codebuild project: {0}")]
    UnknownCodeBuildProject(String),

    #[error("error transforming stage {stage}: expected {expected} actions but found {found}")]
    WrongActionCount {
        stage: String,
        expected: usize,
        found: usize,
    },

    #[error("malformed resource '{name}': {reason}")]
    MalformedResource { name: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, UniformError>;
