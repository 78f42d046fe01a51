//! Constantes observables del pipeline.

/// Prefijo de la línea terminal de éxito. Un suscriptor puede extraer el
/// handle de confirmación buscando `"LEDGER_CONFIRMATION: <tx>"` sin
/// necesidad de interpretar el resto del log.
pub const CONFIRMATION_MARKER: &str = "LEDGER_CONFIRMATION";

/// Prefijo aplicado a las líneas del canal de error del build tool.
pub const STDERR_PREFIX: &str = "[STDERR] ";

/// Techo por defecto para `AwaitingConfirmation` (segundos). Una escritura
/// que nunca confirma debe terminar en timeout para no bloquear la cola.
pub const DEFAULT_CONFIRM_TIMEOUT_SECS: u64 = 60;
