pub mod core;

use derive_more::Display;
use snowflake::SnowflakeIdGenerator;
use std::{error::Error, sync::Arc};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

pub type BoxError = Box<dyn Error + Send + Sync>;

/// データアクセスエラー
#[derive(Display, Debug)]
pub enum DataAccessError {
    #[display(fmt = "Database connection error: {}", _0)]
    ConnectionError(BoxError),
    #[display(fmt = "Database query error: {}", _0)]
    QueryError(BoxError),
    #[display(fmt = "Data read error: {}", _0)]
    ReadError(BoxError),
    #[display(fmt = "Data write error: {}", _0)]
    WriteError(BoxError),
    #[display(fmt = "Client side error: {}", _0)]
    ClientSideError(BoxError),
}

impl DataAccessError {
    fn inner(&self) -> &BoxError {
        match self {
            Self::ConnectionError(e)
            | Self::QueryError(e)
            | Self::ReadError(e)
            | Self::WriteError(e)
            | Self::ClientSideError(e) => e,
        }
    }
}

impl Error for DataAccessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.inner().as_ref())
    }
}

pub struct IdGenerator(SnowflakeIdGenerator);

impl IdGenerator {
    pub fn new(gen: SnowflakeIdGenerator) -> Self {
        Self(gen)
    }

    pub fn generate(&mut self) -> u64 {
        self.0.generate() as u64
    }
}

impl From<SnowflakeIdGenerator> for IdGenerator {
    fn from(value: SnowflakeIdGenerator) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Display)]
#[display(fmt = "ID generator task is gone")]
pub struct IdGeneratorClosed;

impl Error for IdGeneratorClosed {}

/// ID生成タスク（tokioランタイム内で生成すること）
#[derive(Clone)]
pub struct IdGeneratorTask {
    _handle: Arc<JoinHandle<()>>,
    sender: mpsc::Sender<oneshot::Sender<u64>>,
}

impl IdGeneratorTask {
    pub fn spawn(mut gen: IdGenerator) -> Self {
        let (tx_async, mut rx_async) = mpsc::channel::<oneshot::Sender<u64>>(100);
        let handle = tokio::spawn(async move {
            while let Some(tx) = rx_async.recv().await {
                // 受信側が先に破棄されていても生成は続ける
                let _ = tx.send(gen.generate());
            }
        });
        Self {
            _handle: Arc::new(handle),
            sender: tx_async,
        }
    }

    pub async fn generate<T>(&self) -> Result<T, IdGeneratorClosed>
    where
        T: From<u64>,
    {
        let (tx, rx) = oneshot::channel::<u64>();
        self.sender.send(tx).await.map_err(|_| IdGeneratorClosed)?;
        rx.await.map(T::from).map_err(|_| IdGeneratorClosed)
    }
}

impl From<IdGeneratorClosed> for DataAccessError {
    fn from(value: IdGeneratorClosed) -> Self {
        DataAccessError::ClientSideError(Box::new(value))
    }
}
