//! # Export модуль
//!
//! Скачивание озвучки в WAV и запись видео с озвучкой в реальном времени.

pub mod audio;
pub mod compositor;
pub mod container;
pub mod download;
pub mod filename;
pub mod recorder;

pub use audio::{WAV_MIME, export_audio};
pub use compositor::{DEFAULT_CAPTION, compose, cover_rect};
pub use container::{ContainerFormat, select_container};
pub use download::{DirectorySink, DownloadSink, ExportedFile, MemorySink};
pub use filename::{export_filename, sanitize_filename};
pub use recorder::{ExportRequest, RecordingSession, VideoExporter};
