use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    #[error("Invalid column name: {0}")]
    InvalidColumn(String),

    #[error("Invalid page parameter: {0}")]
    InvalidPage(String),

    #[error("Invalid limit parameter: {0}")]
    InvalidLimit(String),
}
