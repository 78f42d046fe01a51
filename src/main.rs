use prov_adapters::{FixedHasher, ScriptedBuildTool};
use prov_core::{AttestationPipeline, BuildRequest, InMemoryLedger, JobState, LogSink,
                SigningIdentity, SubmissionQueue, VerificationGate};
use prov_domain::AccountId;
use std::sync::Arc;
use std::time::Duration;

/// Demo determinista del flujo completo: build guionado → hash fijo →
/// ledger en memoria → gate de verificación. Sin IO externo.
#[tokio::main]
async fn main() {
    let ledger = Arc::new(InMemoryLedger::new());
    let signer = SigningIdentity::new(AccountId::new("0xaaa").expect("demo account"));
    let queue = SubmissionQueue::spawn(ledger.clone(), signer, Duration::from_secs(5));

    let pipeline = AttestationPipeline::new(
        ScriptedBuildTool::succeeding(&["Step 1/2 : FROM alpine", "Step 2/2 : COPY . /app"]),
        FixedHasher::new("sha256:demo-aaa"),
        queue.clone(),
    );

    // Escenario 1: corrida exitosa, con el stream de log impreso en vivo.
    println!("--- escenario 1: build + atestación exitosa ---");
    let (sink, mut rx) = LogSink::channel();
    let printer = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            println!("[stream] {line}");
        }
    });
    let job = pipeline
        .run(BuildRequest { image_name: "demo:v1".into(), source_location: "./app".into() },
             Some(sink))
        .await
        .expect("valid demo request");
    let _ = printer.await;
    println!("estado terminal: {:?} (tx {:?})", job.state, job.submitted_tx);
    assert_eq!(job.state, JobState::Confirmed);

    // Escenario 2: build fallido, sin escritura al ledger.
    println!("--- escenario 2: build fallido ---");
    let failing = AttestationPipeline::new(ScriptedBuildTool::failing(&["Step 1/2 : FROM alpine"], 1),
                                           FixedHasher::new("sha256:demo-bbb"),
                                           queue.clone());
    let job = failing
        .run(BuildRequest { image_name: "other:v1".into(), source_location: "./app".into() }, None)
        .await
        .expect("valid demo request");
    println!("estado terminal: {:?}", job.state);
    assert_eq!(job.state, JobState::BuildFailed);

    // Escenario 3: gate de verificación antes de desplegar.
    println!("--- escenario 3: verificación ---");
    let gate = VerificationGate::new(ledger.clone());
    let name = prov_domain::ImageRef::new("demo:v1").expect("demo image");
    let ok = gate.check(&name, Some("sha256:demo-aaa")).await.expect("ledger reachable");
    println!("match esperado: {:?}", ok.matched);
    let bad = gate.check(&name, Some("sha256:tampered")).await.expect("ledger reachable");
    println!("match adulterado: {:?} (despliegue bloqueado)", bad.matched);
    let absent = gate.check(&prov_domain::ImageRef::new("other:v1").expect("demo image"), None)
                     .await
                     .expect("ledger reachable");
    println!("imagen sin atestación: found={}", absent.found);

    println!("--- trail de auditoría ---");
    for ev in ledger.events() {
        println!("{}", serde_json::to_string(&ev).expect("event serializes"));
    }
}
