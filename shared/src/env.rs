use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

// 開発環境か本番環境かを判定する
// ENV が未設定、または不明な値の場合はビルドプロファイルで決める
pub fn which() -> Environment {
    #[cfg(debug_assertions)]
    let default_env = Environment::Development;
    #[cfg(not(debug_assertions))]
    let default_env = Environment::Production;

    match env::var("ENV").as_deref() {
        Ok("production") => Environment::Production,
        Ok("development") => Environment::Development,
        _ => default_env,
    }
}
