use prov_core::constants::DEFAULT_CONFIRM_TIMEOUT_SECS;
use prov_core::{LedgerBackend, LedgerError, PendingSubmission, SigningIdentity, SubmissionQueue,
                VerificationGate};
use prov_domain::{AccountId, ContentHash, ImageRef};
use prov_persistence::{FileLedger, LedgerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

// CLI mínima de gate de despliegue:
//   prov-cli register --image <NAME> --hash <HASH> --ledger <PATH> [--account <0xID>]
//   prov-cli verify   --image <NAME> --ledger <PATH> [--expected <HASH>]
// Flags ausentes caen a IMAGE_NAME / IMAGE_HASH / LEDGER_PATH / ACCOUNT_ID.
// Salidas: 0 éxito, 2 uso/validación, 4 rechazo o verificación fallida,
// 5 error de backend.

fn usage() {
    eprintln!("Uso: prov-cli register --image <NAME> --hash <HASH> --ledger <PATH> [--account <0xID>]");
    eprintln!("     prov-cli verify --image <NAME> --ledger <PATH> [--expected <HASH>]");
}

fn flag_or_env(flag: Option<String>, env_name: &str) -> Option<String> {
    flag.or_else(|| std::env::var(env_name).ok())
}

struct Flags {
    image: Option<String>,
    hash: Option<String>,
    ledger: Option<String>,
    account: Option<String>,
    expected: Option<String>,
}

fn parse_flags(args: &[String]) -> Flags {
    let mut flags = Flags { image: None, hash: None, ledger: None, account: None, expected: None };
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--image" => {
                i += 1;
                if i < args.len() { flags.image = Some(args[i].clone()); }
            }
            "--hash" => {
                i += 1;
                if i < args.len() { flags.hash = Some(args[i].clone()); }
            }
            "--ledger" => {
                i += 1;
                if i < args.len() { flags.ledger = Some(args[i].clone()); }
            }
            "--account" => {
                i += 1;
                if i < args.len() { flags.account = Some(args[i].clone()); }
            }
            "--expected" => {
                i += 1;
                if i < args.len() { flags.expected = Some(args[i].clone()); }
            }
            _ => {}
        }
        i += 1;
    }
    flags
}

async fn register_cmd(args: &[String]) -> i32 {
    let flags = parse_flags(args);
    let image = flag_or_env(flags.image, "IMAGE_NAME");
    let hash = flag_or_env(flags.hash, "IMAGE_HASH");
    let ledger = flags.ledger
                      .map(PathBuf::from)
                      .or_else(|| LedgerConfig::from_env().map(|c| c.path));
    let account = flag_or_env(flags.account, "ACCOUNT_ID");

    let (Some(image), Some(hash), Some(ledger), Some(account)) = (image, hash, ledger, account)
    else {
        usage();
        return 2;
    };

    let image = match ImageRef::new(&image) {
        Ok(i) => i,
        Err(e) => { eprintln!("[prov register] {e}"); return 2; }
    };
    let hash = match ContentHash::new(&hash) {
        Ok(h) => h,
        Err(e) => { eprintln!("[prov register] {e}"); return 2; }
    };
    let account = match AccountId::new(&account) {
        Ok(a) => a,
        Err(e) => { eprintln!("[prov register] {e}"); return 2; }
    };

    // Toda escritura pasa por la cola: la identidad firmante sólo vive en su
    // worker, también cuando el proceso hace un único envío.
    let backend: Arc<dyn LedgerBackend> = Arc::new(FileLedger::new(ledger));
    let queue = SubmissionQueue::spawn(backend,
                                       SigningIdentity::new(account),
                                       Duration::from_secs(DEFAULT_CONFIRM_TIMEOUT_SECS));

    let submission = PendingSubmission::new(Uuid::new_v4(), image.clone(), hash);
    let handle = match queue.enqueue(submission) {
        Ok(h) => h,
        Err(e) => { eprintln!("[prov register] {e}"); return 5; }
    };

    match handle.wait().await {
        Ok(tx) => {
            println!("registered {image} (tx {tx})");
            0
        }
        Err(e @ LedgerError::OwnershipConflict { .. }) => {
            eprintln!("[prov register] rejected: {e}");
            4
        }
        Err(e) => {
            eprintln!("[prov register] error: {e}");
            5
        }
    }
}

async fn verify_cmd(args: &[String]) -> i32 {
    let flags = parse_flags(args);
    let image = flag_or_env(flags.image, "IMAGE_NAME");
    let ledger = flags.ledger
                      .map(PathBuf::from)
                      .or_else(|| LedgerConfig::from_env().map(|c| c.path));
    let expected = flag_or_env(flags.expected, "IMAGE_HASH");

    let (Some(image), Some(ledger)) = (image, ledger) else {
        usage();
        return 2;
    };

    let image = match ImageRef::new(&image) {
        Ok(i) => i,
        Err(e) => { eprintln!("[prov verify] {e}"); return 2; }
    };

    let backend: Arc<dyn LedgerBackend> = Arc::new(FileLedger::new(ledger));
    let gate = VerificationGate::new(backend);

    let result = match gate.check(&image, expected.as_deref()).await {
        Ok(r) => r,
        Err(e) => { eprintln!("[prov verify] error: {e}"); return 5; }
    };

    if !result.found {
        eprintln!("[prov verify] {image} not found in ledger");
        return 4;
    }
    let hash = result.hash.as_ref().map(|h| h.as_str()).unwrap_or_default();
    let owner = result.owner.as_ref().map(|o| o.as_str()).unwrap_or_default();
    println!("found {image}: hash={hash} owner={owner}");

    match result.matched {
        Some(false) => {
            eprintln!("[prov verify] hash mismatch, deployment must be blocked");
            eprintln!("  expected: {}", expected.unwrap_or_default());
            eprintln!("  actual:   {hash}");
            4
        }
        // matched == Some(true) o verificación de existencia solamente
        _ => {
            println!("deployment authorized");
            0
        }
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        usage();
        std::process::exit(2);
    }
    let code = match args[1].as_str() {
        "register" => register_cmd(&args[2..]).await,
        "verify" => verify_cmd(&args[2..]).await,
        _ => {
            usage();
            2
        }
    };
    std::process::exit(code);
}
