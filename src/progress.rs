//! Модуль для отслеживания прогресса выполнения сценариев
//!
//! Реализация паттерна Observer: сценарии озвучки сообщают о текущем этапе
//! и его прогрессе, наблюдатели получают взвешенный общий прогресс.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::info;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Информация о прогрессе выполнения операции
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressInfo {
    /// Текущий этап операции
    pub step: String,
    /// Процент выполнения текущего этапа (0.0 - 100.0)
    pub step_progress: f32,
    /// Общий процент выполнения всей операции (0.0 - 100.0)
    pub total_progress: f32,
    /// Сообщение о состоянии для пользователя
    pub details: Option<String>,
}

impl ProgressInfo {
    pub fn new(step: impl Into<String>, step_progress: f32, total_progress: f32, details: Option<String>) -> Self {
        Self {
            step: step.into(),
            step_progress: step_progress.clamp(0.0, 100.0),
            total_progress: total_progress.clamp(0.0, 100.0),
            details,
        }
    }
}

/// Трейт для наблюдателя, получающего уведомления о прогрессе
pub trait ProgressObserver: Send + Sync {
    fn on_progress_update(&self, progress: ProgressInfo);
}

/// Трейт для объекта, отправляющего уведомления о прогрессе
pub trait ProgressReporter: Send + Sync {
    /// Добавить наблюдателя, возвращает его идентификатор
    fn add_observer(&self, observer: Box<dyn ProgressObserver>) -> usize;

    /// Удалить наблюдателя по идентификатору
    fn remove_observer(&self, id: usize) -> Option<Box<dyn ProgressObserver>>;

    /// Уведомить всех наблюдателей о прогрессе
    fn notify_progress(&self, progress: ProgressInfo);
}

/// Реализация ProgressReporter по умолчанию
pub struct DefaultProgressReporter {
    observers: RwLock<HashMap<usize, Box<dyn ProgressObserver>>>,
    next_id: AtomicUsize,
}

impl DefaultProgressReporter {
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(HashMap::new()),
            next_id: AtomicUsize::new(0),
        }
    }
}

impl Default for DefaultProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for DefaultProgressReporter {
    fn add_observer(&self, observer: Box<dyn ProgressObserver>) -> usize {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.observers.write().insert(id, observer);
        id
    }

    fn remove_observer(&self, id: usize) -> Option<Box<dyn ProgressObserver>> {
        self.observers.write().remove(&id)
    }

    fn notify_progress(&self, progress: ProgressInfo) {
        for observer in self.observers.read().values() {
            observer.on_progress_update(progress.clone());
        }
    }
}

/// Наблюдатель, пишущий прогресс в лог
pub struct LogObserver;

impl ProgressObserver for LogObserver {
    fn on_progress_update(&self, progress: ProgressInfo) {
        match &progress.details {
            Some(details) => info!("[{:.0}%] {}: {}", progress.total_progress, progress.step, details),
            None => info!("[{:.0}%] {}", progress.total_progress, progress.step),
        }
    }
}

/// Этапы сценария озвучки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessStep {
    /// Подготовка или генерация сценария
    Script,
    /// Перевод сценария
    Translation,
    /// Синтез речи
    Speech,
    /// Генерация изображения, видео и метаданных
    Visuals,
    /// Экспорт результата
    Export,
}

impl ProcessStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Script => "Script",
            Self::Translation => "Translation",
            Self::Speech => "Speech synthesis",
            Self::Visuals => "Visuals",
            Self::Export => "Export",
        }
    }

    /// Весовой коэффициент этапа (в процентах от общего процесса)
    pub fn weight(&self) -> f32 {
        match self {
            Self::Script => 10.0,
            Self::Translation => 10.0,
            Self::Speech => 35.0,
            Self::Visuals => 30.0,
            Self::Export => 15.0,
        }
    }
}

struct TrackerState {
    current_step: ProcessStep,
    step_progress: f32,
    total_progress: f32,
    completed_steps: HashMap<ProcessStep, f32>,
}

/// Трекер прогресса сценария
pub struct ProgressTracker {
    reporter: Option<Box<dyn ProgressReporter>>,
    state: RwLock<TrackerState>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            reporter: None,
            state: RwLock::new(TrackerState {
                current_step: ProcessStep::Script,
                step_progress: 0.0,
                total_progress: 0.0,
                completed_steps: HashMap::new(),
            }),
        }
    }

    /// Создать трекер с репортером
    pub fn with_reporter(reporter: Box<dyn ProgressReporter>) -> Self {
        let mut tracker = Self::new();
        tracker.reporter = Some(reporter);
        tracker
    }

    pub fn set_reporter(&mut self, reporter: Box<dyn ProgressReporter>) {
        self.reporter = Some(reporter);
    }

    /// Добавить наблюдателя
    pub fn add_observer(&self, observer: Box<dyn ProgressObserver>) -> Option<usize> {
        self.reporter.as_ref().map(|reporter| reporter.add_observer(observer))
    }

    pub fn current_step(&self) -> ProcessStep {
        self.state.read().current_step
    }

    pub fn total_progress(&self) -> f32 {
        self.state.read().total_progress
    }

    /// Установить текущий этап; предыдущий считается завершённым
    pub fn set_step(&self, step: ProcessStep, details: Option<String>) {
        {
            let mut state = self.state.write();
            if state.current_step != step {
                let previous = state.current_step;
                state.completed_steps.insert(previous, 100.0);
                state.current_step = step;
                state.step_progress = 0.0;
                Self::update_total_progress(&mut state);
            }
        }
        self.report_progress(details);
    }

    /// Обновить прогресс текущего этапа
    pub fn update_step_progress(&self, progress: f32, details: Option<String>) {
        {
            let mut state = self.state.write();
            state.step_progress = progress.clamp(0.0, 100.0);
            Self::update_total_progress(&mut state);
        }
        self.report_progress(details);
    }

    fn update_total_progress(state: &mut TrackerState) {
        let mut total = 0.0;
        let mut total_weight = 0.0;

        for (step, progress) in &state.completed_steps {
            if *step != state.current_step {
                total += step.weight() * progress / 100.0;
                total_weight += step.weight();
            }
        }
        total += state.current_step.weight() * state.step_progress / 100.0;
        total_weight += state.current_step.weight();

        state.total_progress = (total / total_weight * 100.0).clamp(0.0, 100.0);
    }

    fn report_progress(&self, details: Option<String>) {
        if let Some(reporter) = &self.reporter {
            let progress = {
                let state = self.state.read();
                ProgressInfo::new(
                    state.current_step.as_str(),
                    state.step_progress,
                    state.total_progress,
                    details,
                )
            };
            reporter.notify_progress(progress);
        }
    }

    /// Отметить завершение всего процесса
    pub fn complete(&self) {
        {
            let mut state = self.state.write();
            let current = state.current_step;
            state.completed_steps.insert(current, 100.0);
            state.step_progress = 100.0;
            state.total_progress = 100.0;
        }
        self.report_progress(Some("Done".to_string()));
    }

    /// Сбросить трекер в начальное состояние (после ошибки)
    pub fn reset(&self) {
        let mut state = self.state.write();
        state.current_step = ProcessStep::Script;
        state.step_progress = 0.0;
        state.total_progress = 0.0;
        state.completed_steps.clear();
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct TestObserver {
        updates: Arc<Mutex<Vec<ProgressInfo>>>,
    }

    impl TestObserver {
        fn new() -> (Self, Arc<Mutex<Vec<ProgressInfo>>>) {
            let updates = Arc::new(Mutex::new(Vec::new()));
            (Self { updates: updates.clone() }, updates)
        }
    }

    impl ProgressObserver for TestObserver {
        fn on_progress_update(&self, progress: ProgressInfo) {
            self.updates.lock().unwrap().push(progress);
        }
    }

    #[test]
    fn test_progress_tracker() {
        let reporter = DefaultProgressReporter::new();
        let (observer, updates) = TestObserver::new();
        reporter.add_observer(Box::new(observer));
        let tracker = ProgressTracker::with_reporter(Box::new(reporter));

        tracker.update_step_progress(50.0, None);
        {
            let updates = updates.lock().unwrap();
            assert_eq!(updates.len(), 1);
            assert_eq!(updates[0].step, ProcessStep::Script.as_str());
            assert_eq!(updates[0].step_progress, 50.0);
            assert!(updates[0].total_progress > 0.0);
        }

        tracker.set_step(ProcessStep::Speech, Some("Generating voiceover...".into()));
        {
            let updates = updates.lock().unwrap();
            assert_eq!(updates.len(), 2);
            assert_eq!(updates[1].step, ProcessStep::Speech.as_str());
            assert_eq!(updates[1].step_progress, 0.0);
            assert_eq!(updates[1].details.as_deref(), Some("Generating voiceover..."));
        }

        tracker.complete();
        {
            let updates = updates.lock().unwrap();
            assert_eq!(updates.len(), 3);
            assert_eq!(updates[2].total_progress, 100.0);
        }

        tracker.reset();
        assert_eq!(tracker.current_step(), ProcessStep::Script);
        assert_eq!(tracker.total_progress(), 0.0);
    }

    #[test]
    fn test_remove_observer() {
        let reporter = DefaultProgressReporter::new();
        let (observer, updates) = TestObserver::new();
        let id = reporter.add_observer(Box::new(observer));
        assert!(reporter.remove_observer(id).is_some());

        reporter.notify_progress(ProgressInfo::new("Export", 10.0, 10.0, None));
        assert!(updates.lock().unwrap().is_empty());
    }
}
