use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;

/// Фильтр по умолчанию, если RUST_LOG не задан
pub const DEFAULT_FILTER: &str = "warn,voxstudio=info";

fn builder() -> Builder {
    // Установка базового фильтра и переопределение через переменные окружения
    let env = Env::default().filter_or("RUST_LOG", DEFAULT_FILTER);
    let mut builder = Builder::from_env(env);

    // Явно подавляем логи от транспортных модулей
    builder
        .filter_module("mio", LevelFilter::Error)
        .filter_module("hyper", LevelFilter::Error)
        .filter_module("hyper_util", LevelFilter::Error)
        .filter_module("rustls", LevelFilter::Warn)
        .filter_module("reqwest", LevelFilter::Info)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .target(env_logger::Target::Stderr);
    builder
}

/// Инициализировать глобальный логгер. Паникует при повторной инициализации.
pub fn init_logger() {
    builder().init();
}

/// Инициализировать логгер, если он ещё не установлен (удобно в тестах)
pub fn try_init_logger() -> bool {
    builder().is_test(cfg!(test)).try_init().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_init_is_idempotent() {
        try_init_logger();
        assert!(!try_init_logger());
        log::info!("logger initialised");
    }
}
