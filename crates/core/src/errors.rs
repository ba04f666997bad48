use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum FreshdError {
    #[error("存储操作失败: {0}")]
    StoreOperation(String),
    #[error("任务不存在: id={id}")]
    TaskNotFound { id: String },
    #[error("任务重复定义: id={id}")]
    TaskAlreadyDefined { id: String },
    #[error("年龄窗口表达式无效: '{spec}': {message}")]
    InvalidWindow { spec: String, message: String },
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("数据序列化错误: {0}")]
    Serialization(String),
    #[error("任务注册未能完成: {source}")]
    RegistrationFailed {
        #[source]
        source: Box<FreshdError>,
    },
    #[error("系统内部错误: {0}")]
    Internal(String),
}

pub type FreshdResult<T> = Result<T, FreshdError>;

impl FreshdError {
    pub fn store_error<S: Into<String>>(msg: S) -> Self {
        Self::StoreOperation(msg.into())
    }
    pub fn task_not_found<S: Into<String>>(id: S) -> Self {
        Self::TaskNotFound { id: id.into() }
    }
    pub fn task_already_defined<S: Into<String>>(id: S) -> Self {
        Self::TaskAlreadyDefined { id: id.into() }
    }
    pub fn invalid_window<S: Into<String>, M: Into<String>>(spec: S, message: M) -> Self {
        Self::InvalidWindow {
            spec: spec.into(),
            message: message.into(),
        }
    }
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }
    pub fn registration_failed(source: FreshdError) -> Self {
        Self::RegistrationFailed {
            source: Box::new(source),
        }
    }
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FreshdError::Configuration(_)
                | FreshdError::TaskAlreadyDefined { .. }
                | FreshdError::InvalidWindow { .. }
                | FreshdError::RegistrationFailed { .. }
                | FreshdError::Internal(_)
        )
    }
}

impl From<sqlx::Error> for FreshdError {
    fn from(err: sqlx::Error) -> Self {
        FreshdError::StoreOperation(err.to_string())
    }
}

impl From<serde_json::Error> for FreshdError {
    fn from(err: serde_json::Error) -> Self {
        FreshdError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for FreshdError {
    fn from(err: anyhow::Error) -> Self {
        FreshdError::Internal(err.to_string())
    }
}
