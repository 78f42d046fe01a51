//! Carga de configuración del ledger desde variables de entorno.
//! Usa convención `LEDGER_PATH`.

use dotenvy::dotenv;
use once_cell::sync::Lazy;

use std::env;
use std::path::PathBuf;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub path: PathBuf,
}

impl LedgerConfig {
    /// `None` si `LEDGER_PATH` no está definido; el caller decide si eso es
    /// un error de uso (la CLI imprime usage y sale con código 2).
    pub fn from_env() -> Option<Self> {
        Lazy::force(&DOTENV_LOADED);
        env::var("LEDGER_PATH").ok().map(|p| Self { path: PathBuf::from(p) })
    }
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() { Lazy::force(&DOTENV_LOADED); }
