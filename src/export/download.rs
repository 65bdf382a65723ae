//! Доставка готовых файлов пользователю.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use log::info;
use parking_lot::Mutex;

use crate::config::StudioConfig;
use crate::error::Result;

/// Готовый к скачиванию файл
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedFile {
    pub filename: String,
    pub mime: String,
    pub bytes: Bytes,
    /// Длительность содержимого
    pub duration: Duration,
}

/// Получатель готовых файлов
#[async_trait]
pub trait DownloadSink: Send + Sync {
    async fn deliver(&self, file: &ExportedFile) -> Result<()>;
}

/// Сохраняет файлы в каталог
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Каталог загрузок из конфигурации, если он задан
    pub fn from_config(config: &StudioConfig) -> Option<Self> {
        config.download_dir.as_deref().map(Self::new)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, file: &ExportedFile) -> PathBuf {
        self.dir.join(&file.filename)
    }
}

#[async_trait]
impl DownloadSink for DirectorySink {
    async fn deliver(&self, file: &ExportedFile) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create download directory {}", self.dir.display()))?;

        let path = self.path_for(file);
        tokio::fs::write(&path, &file.bytes)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;

        info!("Saved {} ({} bytes) to {}", file.filename, file.bytes.len(), path.display());
        Ok(())
    }
}

/// Держит файлы в памяти
#[derive(Default)]
pub struct MemorySink {
    files: Mutex<Vec<ExportedFile>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> Vec<ExportedFile> {
        self.files.lock().clone()
    }

    pub fn last(&self) -> Option<ExportedFile> {
        self.files.lock().last().cloned()
    }
}

#[async_trait]
impl DownloadSink for MemorySink {
    async fn deliver(&self, file: &ExportedFile) -> Result<()> {
        self.files.lock().push(file.clone());
        Ok(())
    }
}
